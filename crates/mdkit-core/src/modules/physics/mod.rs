mod masses;

use crate::domain::Frame;
use tracing::warn;

/// Mean square displacement relative to the initial frame.
///
/// `msd[i]` is the mean over atoms of the squared Euclidean displacement
/// between frame `i` and frame 0, so `msd[0]` is exactly zero. Returns `None`
/// when the series cannot be computed at all (empty trajectory, or a frame
/// whose atom count no longer matches frame 0).
pub fn compute_msd(trajectory: &[Frame]) -> Option<Vec<f64>> {
    let initial = &trajectory.first()?.positions;

    let mut msd = Vec::with_capacity(trajectory.len());
    for frame in trajectory {
        if frame.positions.len() != initial.len() {
            warn!(
                atoms = frame.positions.len(),
                expected = initial.len(),
                "frame atom count diverged from frame 0, MSD unavailable"
            );
            return None;
        }

        let total: f64 = frame
            .positions
            .iter()
            .zip(initial.iter())
            .map(|(position, origin)| {
                let dx = position[0] - origin[0];
                let dy = position[1] - origin[1];
                let dz = position[2] - origin[2];
                dx * dx + dy * dy + dz * dz
            })
            .sum();
        msd.push(total / initial.len() as f64);
    }
    Some(msd)
}

/// Per-frame kinetic energy, `0.5 * Σ m_a |v_a|²` where velocities exist.
///
/// A frame without velocities falls back to its scalar energy annotation;
/// with neither, the frame's value is explicitly missing (`None`), never
/// zero. The series itself is always produced, one entry per frame.
pub fn compute_kinetic_energy(trajectory: &[Frame]) -> Option<Vec<Option<f64>>> {
    let mut series = Vec::with_capacity(trajectory.len());

    for (index, frame) in trajectory.iter().enumerate() {
        let from_velocities = frame
            .velocities
            .as_ref()
            .filter(|velocities| velocities.len() == frame.atom_count())
            .map(|velocities| kinetic_energy_of(frame, velocities));

        let energy = match from_velocities.or(frame.kinetic_energy_annotation) {
            Some(energy) => Some(energy),
            None => {
                warn!(frame = index, "kinetic energy not available, marking missing");
                None
            }
        };
        series.push(energy);
    }

    Some(series)
}

fn kinetic_energy_of(frame: &Frame, velocities: &[[f64; 3]]) -> f64 {
    let mut energy = 0.0;
    for (symbol, velocity) in frame.symbols.iter().zip(velocities.iter()) {
        let mass = masses::atomic_mass(symbol).unwrap_or_else(|| {
            warn!(%symbol, "unknown chemical symbol, assuming unit mass");
            1.0
        });
        let speed_squared =
            velocity[0] * velocity[0] + velocity[1] * velocity[1] + velocity[2] * velocity[2];
        energy += 0.5 * mass * speed_squared;
    }
    energy
}
