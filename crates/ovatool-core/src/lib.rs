//! OVATool Core Library
//!
//! Converts a monolithic-sparse VMDK into a stream-optimized OVA appliance:
//! parse the source sparse header, transcode grain-by-grain into a
//! DEFLATE-compressed stream-optimized VMDK, render an OVF envelope for it,
//! and package both into a USTAR archive.
//!
//! # Modules
//!
//! - `error` - Error types and Result alias
//! - `vmdk` - VMDK sparse format parsing, descriptor rendering, transcoding
//! - `ovf` - OVF descriptor generation
//! - `ova` - OVA archive creation and the top-level conversion entry point

pub mod error;
pub mod ova;
pub mod ovf;
pub mod vmdk;

pub use error::{Error, Result};
