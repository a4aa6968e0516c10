mod parser;

use crate::domain::{ParserResult, SimError, Trajectory};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Parse a trajectory file into an ordered frame sequence.
///
/// Format selection is an ordered strategy list: paths that look like the
/// simple coordinate format get the strict XYZ reader first, everything else
/// gets the strict vendor-dump reader first, and both fall back to the
/// tolerant line reader when the strict pass fails.
pub fn parse_trajectory(path: &Path) -> ParserResult<Trajectory> {
    let source = fs::read_to_string(path).map_err(|source| {
        SimError::io_system(
            "IO.TRAJECTORY_READ",
            format!("failed to read trajectory file '{}': {}", path.display(), source),
        )
    })?;

    let trajectory = if looks_like_xyz(path) {
        match parser::read_strict_xyz(&source) {
            Ok(frames) => {
                info!(frames = frames.len(), "read trajectory with strict XYZ reader");
                frames
            }
            Err(error) => {
                warn!(%error, "strict XYZ read failed, falling back to tolerant reader");
                parser::read_tolerant(&source)?
            }
        }
    } else {
        match parser::read_strict_dump(&source) {
            Ok(frames) => {
                info!(frames = frames.len(), "read trajectory with vendor dump reader");
                frames
            }
            Err(error) => {
                warn!(%error, "vendor dump read failed, falling back to tolerant reader");
                parser::read_tolerant(&source)?
            }
        }
    };

    Ok(enforce_uniform_atom_count(trajectory))
}

fn looks_like_xyz(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("xyz"))
        || path.to_string_lossy().ends_with(".xyz")
}

/// Every frame must carry the same atom count as the first; violating frames
/// are dropped with a warning, never fatal.
fn enforce_uniform_atom_count(trajectory: Trajectory) -> Trajectory {
    let Some(expected) = trajectory.first().map(|frame| frame.atom_count()) else {
        return trajectory;
    };

    let mut kept = Trajectory::with_capacity(trajectory.len());
    for (index, frame) in trajectory.into_iter().enumerate() {
        if frame.atom_count() == expected {
            kept.push(frame);
        } else {
            warn!(
                frame = index,
                atoms = frame.atom_count(),
                expected,
                "dropping frame with mismatched atom count"
            );
        }
    }
    kept
}
