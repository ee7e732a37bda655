//! Heap-wide structures the barriers consult and feed: the region table and the region
//! connection matrix.

pub mod connection_matrix;
pub mod region;

pub use self::connection_matrix::ConnectionMatrix;
pub use self::region::RegionTable;
