//! VMDK disk handling.
//!
//! Covers the monolithic-sparse source format (header parsing, grain
//! directory/table loading) and the stream-optimized output format (sector
//! codec, descriptor rendering, transcoding).

pub mod descriptor;
pub mod grain_table;
pub mod header;
pub mod sector;
pub mod transcode;

pub use descriptor::render as render_descriptor;
pub use grain_table::load_grain_tables;
pub use header::SparseHeader;
pub use sector::{MarkerType, SECTOR_SIZE};
pub use transcode::{transcode, transcode_paths};
