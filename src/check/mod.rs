pub mod gradient;

pub use gradient::{GradientCheckError, GradientChecker};
