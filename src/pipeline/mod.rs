pub mod spec;

pub use spec::PipelineSpec;
