/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a word
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;

/// The smallest region the region table accepts (256 bytes). Only tests go this small.
pub const MIN_LOG_BYTES_IN_REGION: usize = 8;
/// The largest region the region table accepts (1GB).
pub const MAX_LOG_BYTES_IN_REGION: usize = 30;
/// log2 of the default region size (1MB).
pub const DEFAULT_LOG_BYTES_IN_REGION: usize = LOG_BYTES_IN_MBYTE as usize;

/// Default capacity of a thread-local snapshot buffer, in entries.
pub const DEFAULT_SATB_BUFFER_SIZE: usize = BYTES_IN_KBYTE;
