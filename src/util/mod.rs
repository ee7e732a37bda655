//! Utilities used by the barriers: addresses, forwarding pointers, snapshot buffers, options and
//! statistics.

/// Address and object reference types.
pub mod address;
/// Constants.
pub mod constants;
/// Calculation, conversion and rounding for memory related numbers.
pub mod conversions;
/// The allocator seam for evacuation copies.
pub mod copy;
/// The optional built-in logger.
pub mod logger;
/// Forwarding pointer access.
pub mod object_forwarding;
/// Options for the barrier set.
pub mod options;
/// Snapshot-at-the-beginning buffers.
pub mod satb;
/// Barrier event counters.
pub mod statistics;
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ByteOffset;
pub use self::address::ByteSize;
pub use self::address::ObjectReference;
