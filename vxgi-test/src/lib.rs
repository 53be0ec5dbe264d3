mod helpers;
mod runner;

pub use tokio::test as test_attr;

pub use helpers::{cube, scene, xy_quad, yz_quad};
pub use runner::{DepthReadback, TestRunner, VolumeReadback};
