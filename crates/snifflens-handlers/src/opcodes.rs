//! Wire opcode values for the supported client line.
//!
//! Values are stable across the eras this catalogue covers; format drift is
//! expressed through version ranges at registration, never through new
//! opcode numbers.

pub const CMSG_MINIMAP_PING: u32 = 0x0365;
pub const CMSG_REQUEST_PARTY_MEMBER_STATS: u32 = 0x0368;
pub const CMSG_UPDATE_RAID_TARGET: u32 = 0x0369;
pub const CMSG_DB_QUERY_BULK: u32 = 0x036d;

pub const SMSG_MINIMAP_PING: u32 = 0x0266;
pub const SMSG_PARTY_UPDATE: u32 = 0x026a;
pub const SMSG_PARTY_MEMBER_STATS: u32 = 0x026b;
pub const SMSG_ROLE_CHANGED_INFORM: u32 = 0x0270;
pub const SMSG_ROLE_POLL_INFORM: u32 = 0x0271;
pub const SMSG_GROUP_NEW_LEADER: u32 = 0x0273;
pub const SMSG_PARTY_INVITE: u32 = 0x0274;
pub const SMSG_READY_CHECK_STARTED: u32 = 0x0277;
pub const SMSG_READY_CHECK_RESPONSE: u32 = 0x0278;
pub const SMSG_READY_CHECK_COMPLETED: u32 = 0x0279;
pub const SMSG_RAID_MARKERS_CHANGED: u32 = 0x027b;
pub const SMSG_DB_REPLY: u32 = 0x0282;
pub const SMSG_HOTFIX_NOTIFY: u32 = 0x0283;
pub const SMSG_HOTFIX_NOTIFY_BLOB: u32 = 0x0284;
