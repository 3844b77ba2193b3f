pub mod blob;
pub mod filler;

pub use blob::{Blob, Shape};
pub use filler::{GaussianFiller, UniformFiller};
