//! Worker Layer - Background Job Processing
//!
//! 实现 GenerationWorker 与生成流水线

mod generation_worker;
mod pipeline;

pub use generation_worker::{GenerationWorker, GenerationWorkerConfig};
pub use pipeline::{GenerationPipeline, PipelineError, FFMETADATA_FILE};
