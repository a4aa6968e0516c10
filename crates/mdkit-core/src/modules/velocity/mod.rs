mod parser;

use crate::domain::VelocityFrame;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Parse a velocity dump file into per-timestep frames.
///
/// Velocities are optional enrichment, so failure here is non-fatal: any
/// total failure (unreadable file, zero usable blocks) yields `None` and the
/// caller proceeds without velocities.
pub fn parse_velocity_file(path: &Path) -> Option<Vec<VelocityFrame>> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            warn!(
                path = %path.display(),
                %error,
                "failed to read velocity file"
            );
            return None;
        }
    };

    let frames = parser::read_velocity_blocks(&source);
    if frames.is_empty() {
        warn!(path = %path.display(), "no velocity blocks parsed");
        return None;
    }

    info!(frames = frames.len(), "parsed velocity frames");
    Some(frames)
}
