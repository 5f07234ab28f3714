//! Pixel-level pipeline stages
//!
//! Each stage is a plain function over an [`image::RgbaImage`] or an
//! [`crate::types::AlphaMap`]; [`crate::processor::AlphaProcessor`] wires
//! them together in order.

pub mod background;
pub mod bilateral;
pub mod classify;
pub mod composite;
pub mod feather;

pub use background::detect_background_color;
pub use bilateral::bilateral_denoise;
pub use classify::{classify, classify_with_stats, Classifier};
pub use composite::composite;
pub use feather::{feather, feather_in_place};
