use super::error::WireError;

/// Forward-only cursor over one packet payload.
///
/// Bit reads consume whole bytes lazily and hand bits out most-significant
/// first. Byte reads are little-endian and fail while bits of the current
/// byte are still pending; [`PacketReader::reset_bits`] discards the
/// remainder of a partially consumed byte at the points the layout marks.
///
/// # Examples
/// ```
/// use snifflens_core::PacketReader;
///
/// let payload = [0b1011_0000, 0x2a];
/// let mut reader = PacketReader::new(&payload);
/// assert_eq!(reader.read_bits("Flags", 4)?, 0b1011);
/// reader.reset_bits();
/// assert_eq!(reader.read_u8("Count")?, 0x2a);
/// assert_eq!(reader.remaining(), 0);
/// # Ok::<(), snifflens_core::WireError>(())
/// ```
pub struct PacketReader<'a> {
    payload: &'a [u8],
    pos: usize,
    bit_val: u8,
    bits_left: u8,
}

impl<'a> PacketReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            payload,
            pos: 0,
            bit_val: 0,
            bits_left: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes consumed so far, counting a partially read bit byte as consumed.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whole bytes left to read.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    /// Discard any unread bits of the current byte.
    ///
    /// Layouts call this exactly where the protocol realigns; byte reads do
    /// not realign on their own.
    pub fn reset_bits(&mut self) {
        self.bits_left = 0;
    }

    pub fn read_bit(&mut self, field: &'static str) -> Result<bool, WireError> {
        if self.bits_left == 0 {
            if self.remaining() == 0 {
                return Err(WireError::Truncated {
                    field,
                    offset: self.pos,
                    needed: 1,
                    remaining: 0,
                });
            }
            self.bit_val = self.payload[self.pos];
            self.pos += 1;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok((self.bit_val >> self.bits_left) & 1 == 1)
    }

    /// Read `count` bits (1..=64) as an unsigned value, high bit first.
    pub fn read_bits(&mut self, field: &'static str, count: u32) -> Result<u64, WireError> {
        if count == 0 || count > 64 {
            return Err(WireError::BitCount {
                field,
                requested: count,
            });
        }
        let mut value = 0u64;
        for shift in (0..count).rev() {
            if self.read_bit(field)? {
                value |= 1u64 << shift;
            }
        }
        Ok(value)
    }

    fn require_aligned(&self, field: &'static str) -> Result<(), WireError> {
        if self.bits_left != 0 {
            return Err(WireError::Misaligned {
                field,
                offset: self.pos,
                bits_left: self.bits_left,
            });
        }
        Ok(())
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], WireError> {
        self.require_aligned(field)?;
        if self.remaining() < len {
            return Err(WireError::Truncated {
                field,
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.payload[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        Ok(self.take(field, 1)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, WireError> {
        let bytes = self.take(field, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, WireError> {
        let bytes = self.take(field, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, WireError> {
        let bytes = self.take(field, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub fn read_i8(&mut self, field: &'static str) -> Result<i8, WireError> {
        Ok(self.read_u8(field)? as i8)
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16, WireError> {
        Ok(self.read_u16(field)? as i16)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, WireError> {
        Ok(self.read_u32(field)? as i32)
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, WireError> {
        Ok(self.read_u64(field)? as i64)
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, WireError> {
        let bytes = self.take(field, 4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Unix timestamp carried as a 32-bit signed integer on the wire.
    pub fn read_time(&mut self, field: &'static str) -> Result<i64, WireError> {
        Ok(i64::from(self.read_i32(field)?))
    }

    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], WireError> {
        self.take(field, len)
    }

    /// Exactly `len` bytes decoded as UTF-8, lossily.
    pub fn read_text(&mut self, field: &'static str, len: usize) -> Result<String, WireError> {
        let bytes = self.take(field, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// NUL-terminated text; consumes the terminator.
    pub fn read_cstring(&mut self, field: &'static str) -> Result<String, WireError> {
        self.require_aligned(field)?;
        let rest = &self.payload[self.pos..];
        let nul = rest
            .iter()
            .position(|&byte| byte == 0)
            .ok_or(WireError::Unterminated {
                field,
                offset: self.pos,
            })?;
        let text = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(text)
    }

    /// Packed identifier of up to `width` bytes (1..=16).
    ///
    /// The wire carries one presence bit per potential byte, packed into
    /// whole mask bytes, followed by only the bytes whose bit is set, in
    /// ascending byte position. Unset positions decode as zero.
    ///
    /// # Examples
    /// ```
    /// use snifflens_core::PacketReader;
    ///
    /// let payload = [0b0000_0001, 0x42];
    /// let mut reader = PacketReader::new(&payload);
    /// assert_eq!(reader.read_packed_id("OwnerId", 8)?, 0x42);
    /// # Ok::<(), snifflens_core::WireError>(())
    /// ```
    pub fn read_packed_id(&mut self, field: &'static str, width: usize) -> Result<u128, WireError> {
        if width == 0 || width > 16 {
            return Err(WireError::PackedWidth { field, width });
        }
        let mask_len = width.div_ceil(8);
        let mut masks = [0u8; 2];
        for mask in masks.iter_mut().take(mask_len) {
            *mask = self.read_u8(field)?;
        }
        let mut value = 0u128;
        for byte_index in 0..width {
            if masks[byte_index / 8] & (1 << (byte_index % 8)) != 0 {
                value |= u128::from(self.read_u8(field)?) << (byte_index * 8);
            }
        }
        Ok(value)
    }

    /// The 16-byte packed identifier form used for object ids.
    pub fn read_packed_guid(&mut self, field: &'static str) -> Result<u128, WireError> {
        self.read_packed_id(field, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BitWriter {
        bytes: Vec<u8>,
        cur: u8,
        used: u8,
    }

    impl BitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                cur: 0,
                used: 0,
            }
        }

        fn bit(&mut self, on: bool) {
            if on {
                self.cur |= 1 << (7 - self.used);
            }
            self.used += 1;
            if self.used == 8 {
                self.bytes.push(self.cur);
                self.cur = 0;
                self.used = 0;
            }
        }

        fn bits(&mut self, value: u64, count: u32) {
            for shift in (0..count).rev() {
                self.bit((value >> shift) & 1 == 1);
            }
        }

        fn finish(mut self) -> Vec<u8> {
            if self.used > 0 {
                self.bytes.push(self.cur);
            }
            self.bytes
        }
    }

    #[test]
    fn bits_round_trip_every_width() {
        for count in 1..=64u32 {
            let mask = if count == 64 {
                u64::MAX
            } else {
                (1u64 << count) - 1
            };
            let value = 0xDEAD_BEEF_CAFE_F00D & mask;

            let mut writer = BitWriter::new();
            writer.bits(value, count);
            let payload = writer.finish();

            let mut reader = PacketReader::new(&payload);
            assert_eq!(reader.read_bits("v", count).unwrap(), value, "width {count}");
        }
    }

    #[test]
    fn bits_fill_most_significant_first() {
        let payload = [0b1011_0001];
        let mut reader = PacketReader::new(&payload);
        assert!(reader.read_bit("a").unwrap());
        assert!(!reader.read_bit("b").unwrap());
        assert!(reader.read_bit("c").unwrap());
        assert_eq!(reader.read_bits("d", 5).unwrap(), 0b1_0001);
    }

    #[test]
    fn bits_span_byte_boundaries() {
        let mut writer = BitWriter::new();
        writer.bits(0b101, 3);
        writer.bits(0x1FFF, 13);
        let payload = writer.finish();

        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_bits("head", 3).unwrap(), 0b101);
        assert_eq!(reader.read_bits("len", 13).unwrap(), 0x1FFF);
    }

    #[test]
    fn reset_discards_partial_byte() {
        let payload = [0xFF, 0xAB];
        let mut reader = PacketReader::new(&payload);
        assert!(reader.read_bit("flag").unwrap());
        reader.reset_bits();
        // next byte read must see the next whole buffer byte, not a shifted view
        assert_eq!(reader.read_u8("value").unwrap(), 0xAB);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn byte_read_on_unaligned_cursor_fails() {
        let payload = [0xFF, 0x01];
        let mut reader = PacketReader::new(&payload);
        reader.read_bit("flag").unwrap();
        let err = reader.read_u8("value").unwrap_err();
        assert_eq!(
            err,
            WireError::Misaligned {
                field: "value",
                offset: 1,
                bits_left: 7,
            }
        );
    }

    #[test]
    fn little_endian_byte_order() {
        let payload = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_u16("a").unwrap(), 0x1234);
        assert_eq!(reader.read_u32("b").unwrap(), 0x1234_5678);
    }

    #[test]
    fn truncated_read_reports_context() {
        let payload = [0x01, 0x02];
        let mut reader = PacketReader::new(&payload);
        let err = reader.read_u32("Count").unwrap_err();
        assert_eq!(
            err,
            WireError::Truncated {
                field: "Count",
                offset: 0,
                needed: 4,
                remaining: 2,
            }
        );
    }

    #[test]
    fn bit_count_out_of_range_is_rejected() {
        let payload = [0u8; 16];
        let mut reader = PacketReader::new(&payload);
        assert!(matches!(
            reader.read_bits("v", 0),
            Err(WireError::BitCount { requested: 0, .. })
        ));
        assert!(matches!(
            reader.read_bits("v", 65),
            Err(WireError::BitCount { requested: 65, .. })
        ));
    }

    #[test]
    fn packed_id_single_low_byte() {
        let payload = [0b0000_0001, 0x42];
        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_packed_id("id", 8).unwrap(), 0x42);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn packed_guid_masks_then_ascending_bytes() {
        // byte 0 = 0x22, byte 1 = 0x11, byte 9 = 0x40
        let payload = [0b0000_0011, 0b0000_0010, 0x22, 0x11, 0x40];
        let mut reader = PacketReader::new(&payload);
        let value = reader.read_packed_guid("guid").unwrap();
        assert_eq!(value, (0x40u128 << 72) | 0x1122);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn packed_guid_zero_is_two_mask_bytes() {
        let payload = [0x00, 0x00];
        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_packed_guid("guid").unwrap(), 0);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn packed_width_out_of_range_is_rejected() {
        let payload = [0u8; 4];
        let mut reader = PacketReader::new(&payload);
        assert!(matches!(
            reader.read_packed_id("id", 17),
            Err(WireError::PackedWidth { width: 17, .. })
        ));
    }

    #[test]
    fn cstring_stops_at_nul() {
        let payload = [b'o', b'r', b'c', 0x00, 0x07];
        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_cstring("Name").unwrap(), "orc");
        assert_eq!(reader.read_u8("Level").unwrap(), 0x07);
    }

    #[test]
    fn cstring_without_terminator_fails() {
        let payload = [b'o', b'r', b'c'];
        let mut reader = PacketReader::new(&payload);
        assert_eq!(
            reader.read_cstring("Name").unwrap_err(),
            WireError::Unterminated {
                field: "Name",
                offset: 0,
            }
        );
    }

    #[test]
    fn time_is_signed_32_bit_little_endian() {
        let payload = 1_700_000_000i32.to_le_bytes();
        let mut reader = PacketReader::new(&payload);
        assert_eq!(reader.read_time("PushTime").unwrap(), 1_700_000_000);
    }
}
