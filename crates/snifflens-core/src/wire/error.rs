use thiserror::Error;

/// Errors raised by wire-level reads.
///
/// `Misaligned` and `BitCount` indicate routine defects rather than bad
/// captures: a byte-level read ran while bits of the current byte were
/// still pending, or a bit group was sized outside 1..=64.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("truncated payload at {field}: need {needed} bytes at offset {offset}, got {remaining}")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("misaligned read at {field}: {bits_left} bits pending before offset {offset}")]
    Misaligned {
        field: &'static str,
        offset: usize,
        bits_left: u8,
    },
    #[error("bit count {requested} out of range at {field}")]
    BitCount { field: &'static str, requested: u32 },
    #[error("packed id width {width} out of range at {field}")]
    PackedWidth { field: &'static str, width: usize },
    #[error("unterminated string at {field}: offset {offset}")]
    Unterminated { field: &'static str, offset: usize },
}
