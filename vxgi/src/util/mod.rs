//! Utilities used throughout the crate.

pub mod bind_merge;
pub mod error_scope;
pub mod math;
pub mod mipmap;
pub mod typedefs;
