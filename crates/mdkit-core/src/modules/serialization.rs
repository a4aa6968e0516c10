//! Caller-facing response shape.
//!
//! This is the only place numbers cross into JSON, so it owns the one
//! normalization rule of that boundary: every non-finite value (NaN, ±∞)
//! becomes `null`, never a bare string or a panic.

use crate::domain::{AnalysisResult, RunOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msd: Option<Vec<Option<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinetic_energy: Option<Vec<Option<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atoms: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trajectory_file_id: Option<String>,
}

impl SimulationResponse {
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        match analysis {
            AnalysisResult::Completed(report) => Self {
                msd: report
                    .msd
                    .as_ref()
                    .map(|series| series.iter().map(|value| finite(*value)).collect()),
                kinetic_energy: report.kinetic_energy.as_ref().map(|series| {
                    series
                        .iter()
                        .map(|value| value.and_then(finite))
                        .collect()
                }),
                frames: Some(report.frame_count),
                atoms: Some(report.atom_count),
                ..Default::default()
            },
            AnalysisResult::Failed { error } => Self {
                error: Some(error.clone()),
                ..Default::default()
            },
        }
    }

    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let mut response = match &outcome.analysis {
            Some(analysis) => Self::from_analysis(analysis),
            None => Self::default(),
        };
        if !outcome.success && response.error.is_none() {
            response.error = Some(outcome.message.clone());
        }
        response.trajectory_file_id = outcome.trajectory_file_id.clone();
        response
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
