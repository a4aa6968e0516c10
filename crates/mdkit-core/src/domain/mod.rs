pub mod errors;

pub use errors::{ParserResult, SimError, SimErrorCategory, SimResult};

use std::collections::BTreeMap;

/// One snapshot of atomic positions, in stable atom order.
///
/// Atom order is the alignment key across frames: displacement and velocity
/// assignment both rely on index `a` in frame `i` naming the same atom as
/// index `a` in frame 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub symbols: Vec<String>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Option<Vec<[f64; 3]>>,
    /// Scalar kinetic-energy annotation carried by the source file, used as
    /// a fallback when per-atom velocities are unavailable.
    pub kinetic_energy_annotation: Option<f64>,
}

impl Frame {
    pub fn new(symbols: Vec<String>, positions: Vec<[f64; 3]>) -> Self {
        Self {
            symbols,
            positions,
            velocities: None,
            kinetic_energy_annotation: None,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }
}

/// Ordered frame sequence, produced once per analysis call and never mutated
/// after parse (velocity attachment happens before analysis begins).
pub type Trajectory = Vec<Frame>;

/// Per-timestep velocity records keyed by zero-based atom index.
///
/// Keys come from 1-based atom IDs in the dump file, converted by subtracting
/// one. Indices are expected (not required) to be dense `0..atom_count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityFrame {
    pub declared_atom_count: usize,
    pub components: BTreeMap<usize, [f64; 3]>,
}

impl VelocityFrame {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Velocity vectors in atom order, missing indices zero-filled the way
    /// the dump writer left them.
    pub fn dense_vectors(&self, atom_count: usize) -> Vec<[f64; 3]> {
        let mut vectors = vec![[0.0_f64; 3]; atom_count];
        for (index, velocity) in &self.components {
            if *index < atom_count {
                vectors[*index] = *velocity;
            }
        }
        vectors
    }
}

/// Numeric analysis payload for one trajectory.
///
/// `None` for a series means the whole quantity was unavailable; `None`
/// inside the kinetic-energy series marks a single missing frame. Missing is
/// never conflated with `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub msd: Option<Vec<f64>>,
    pub kinetic_energy: Option<Vec<Option<f64>>>,
    pub frame_count: usize,
    pub atom_count: usize,
}

/// Structured outcome of one analysis call. The orchestrator never lets an
/// error escape as anything other than `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Completed(AnalysisReport),
    Failed { error: String },
}

impl AnalysisResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error } => Some(error.as_str()),
        }
    }
}

/// Result of one execution-pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
    pub analysis: Option<AnalysisResult>,
    pub trajectory_file_id: Option<String>,
}

impl RunOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            analysis: None,
            trajectory_file_id: None,
        }
    }

    pub fn completed(analysis: AnalysisResult, trajectory_file_id: String) -> Self {
        Self {
            success: true,
            message: "Simulation completed successfully".to_string(),
            analysis: Some(analysis),
            trajectory_file_id: Some(trajectory_file_id),
        }
    }
}
