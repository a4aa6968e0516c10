//! Core engine for molecular-dynamics run orchestration and trajectory
//! analysis: tolerant trajectory/velocity parsing, mean-square-displacement
//! and kinetic-energy series, input-script validation and patching, and the
//! subprocess execution pipeline with durable output storage.

pub mod domain;
pub mod modules;
pub mod storage;

pub use domain::{
    AnalysisReport, AnalysisResult, Frame, RunOutcome, SimError, SimErrorCategory, SimResult,
    Trajectory, VelocityFrame,
};
pub use modules::analysis::analyze;
pub use modules::execution::{
    EngineOutput, EngineRunner, ExecutionConfig, ExecutionPipeline, ProcessEngineRunner,
    cleanup_stale_runs,
};
pub use modules::serialization::SimulationResponse;
pub use modules::trajectory::parse_trajectory;
pub use modules::velocity::parse_velocity_file;
pub use storage::{ArtifactStore, FsArtifactStore, StoredArtifact};
