//! # Printer Module
//!
//! Physical paper geometry shared by every layout.
//!
//! ## Modules
//!
//! - [`geometry`]: millimeter configuration to pixel measurements

pub mod geometry;

pub use geometry::{Geometry, PaperConfig};
