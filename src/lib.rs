#![allow(missing_docs)]

pub mod error;
pub mod image;
pub mod patches;
pub mod pe;
pub mod report;
pub mod telemetry;

pub use error::DynpatchError;
pub use image::{ExeImage, IMAGE_BASE, file_offset_for};
pub use report::AppliedPatch;
