pub mod config;
pub mod log;
mod orchestrator;
mod types;

pub use config::{parse_offsets, parse_polynomial, ReconstructionOptions};
pub use log::ProcessingLog;
pub use orchestrator::{
    analyze, estimate_circle_or_none, post_process, reconstruct, reconstruct_disks, Analysis,
    ProcessedDisk, ReconstructionOutput, Renditions,
};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
