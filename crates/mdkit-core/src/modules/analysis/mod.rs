use crate::domain::{AnalysisReport, AnalysisResult};
use crate::modules::{physics, trajectory, velocity};
use std::path::Path;
use tracing::{info, warn};

/// Run the full analysis workflow over a trajectory file, optionally enriched
/// with a velocity dump.
///
/// Failure to parse the trajectory is the only fatal outcome; everything
/// downstream degrades per series or per frame instead of failing the run.
pub fn analyze(trajectory_path: &Path, velocity_path: Option<&Path>) -> AnalysisResult {
    let frames = match trajectory::parse_trajectory(trajectory_path) {
        Ok(frames) if !frames.is_empty() => frames,
        Ok(_) => {
            warn!(path = %trajectory_path.display(), "trajectory parsed to zero frames");
            return AnalysisResult::failed("Failed to parse trajectory file");
        }
        Err(error) => {
            warn!(path = %trajectory_path.display(), %error, "trajectory parse failed");
            return AnalysisResult::failed("Failed to parse trajectory file");
        }
    };

    let mut frames = frames;
    if let Some(path) = velocity_path {
        if let Some(velocity_frames) = velocity::parse_velocity_file(path) {
            attach_velocities(&mut frames, &velocity_frames);
        }
    }

    let atom_count = frames[0].atom_count();
    let frame_count = frames.len();
    let msd = physics::compute_msd(&frames);
    let kinetic_energy = physics::compute_kinetic_energy(&frames);

    info!(
        frames = frame_count,
        atoms = atom_count,
        msd = msd.is_some(),
        "analysis complete"
    );

    AnalysisResult::Completed(AnalysisReport {
        msd,
        kinetic_energy,
        frame_count,
        atom_count,
    })
}

/// Pair velocity frames with trajectory frames by position.
///
/// The pairing is all-or-nothing across the series: a frame-count mismatch
/// skips enrichment wholesale rather than guessing an alignment. Within a
/// matched series, a per-frame atom-count mismatch leaves only that frame
/// unenriched.
fn attach_velocities(
    frames: &mut [crate::domain::Frame],
    velocity_frames: &[crate::domain::VelocityFrame],
) {
    if frames.len() != velocity_frames.len() {
        warn!(
            trajectory_frames = frames.len(),
            velocity_frames = velocity_frames.len(),
            "velocity frame count does not match trajectory, skipping enrichment"
        );
        return;
    }

    for (index, (frame, velocities)) in frames.iter_mut().zip(velocity_frames).enumerate() {
        if velocities.declared_atom_count != frame.atom_count() {
            warn!(
                frame = index,
                atoms = frame.atom_count(),
                declared = velocities.declared_atom_count,
                "velocity frame atom count mismatch, leaving frame unenriched"
            );
            continue;
        }
        frame.velocities = Some(velocities.dense_vectors(frame.atom_count()));
    }
}
