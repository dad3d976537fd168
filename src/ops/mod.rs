//! Reference operator implementations.

pub mod roiaware_pool3d;
