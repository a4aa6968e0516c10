use crate::domain::VelocityFrame;
use tracing::warn;

/// Offsets of the id and velocity columns relative to the first data token.
/// The two fixed leading header words (`ITEM:` and `ATOMS`) are not counted,
/// hence the subtraction of 2 from each header position.
struct VelocityColumns {
    id: usize,
    vx: usize,
    vy: usize,
    vz: usize,
}

impl VelocityColumns {
    fn from_header(header: &str) -> Option<Self> {
        let tokens = header.split_whitespace().collect::<Vec<_>>();
        let offset_of = |name: &str| {
            tokens
                .iter()
                .position(|token| *token == name)
                .and_then(|index| index.checked_sub(2))
        };

        Some(Self {
            id: offset_of("id")?,
            vx: offset_of("vx")?,
            vy: offset_of("vy")?,
            vz: offset_of("vz")?,
        })
    }
}

/// Best-effort scan over per-timestep blocks. A malformed block is logged and
/// skipped; scanning always continues toward the next block marker.
pub(super) fn read_velocity_blocks(source: &str) -> Vec<VelocityFrame> {
    let lines = source.lines().collect::<Vec<_>>();
    let mut frames = Vec::new();
    let mut cursor = 0;

    while cursor < lines.len() {
        if !lines[cursor].contains("ITEM: TIMESTEP") {
            cursor += 1;
            continue;
        }
        // Marker plus the timestep value line.
        cursor += 2;

        if cursor >= lines.len() || !lines[cursor].contains("ITEM: NUMBER OF ATOMS") {
            warn!("velocity block without an atom-count section, skipping");
            continue;
        }
        cursor += 1;

        let Some(atom_count) = lines
            .get(cursor)
            .and_then(|line| line.trim().parse::<usize>().ok())
        else {
            warn!("velocity block with a non-numeric atom count, skipping");
            cursor += 1;
            continue;
        };
        cursor += 1;

        // Skip box bounds up to the per-atom data section, but never run
        // past the next block marker.
        while cursor < lines.len()
            && !lines[cursor].contains("ITEM: ATOMS")
            && !lines[cursor].contains("ITEM: TIMESTEP")
        {
            cursor += 1;
        }
        if cursor >= lines.len() || !lines[cursor].contains("ITEM: ATOMS") {
            warn!("velocity block without an ITEM: ATOMS section, skipping");
            continue;
        }

        let Some(columns) = VelocityColumns::from_header(lines[cursor]) else {
            warn!(
                header = lines[cursor].trim(),
                "velocity header is missing id/vx/vy/vz columns, skipping block"
            );
            cursor += 1;
            continue;
        };
        cursor += 1;

        let mut frame = VelocityFrame {
            declared_atom_count: atom_count,
            components: Default::default(),
        };
        let mut block_ok = true;
        for offset in 0..atom_count {
            let Some(parsed) = lines
                .get(cursor + offset)
                .and_then(|line| read_velocity_line(line, &columns))
            else {
                warn!(
                    line = cursor + offset,
                    "malformed velocity record, skipping block"
                );
                block_ok = false;
                break;
            };
            frame.components.insert(parsed.0, parsed.1);
        }
        cursor += atom_count;

        if block_ok {
            frames.push(frame);
        }
    }

    frames
}

fn read_velocity_line(line: &str, columns: &VelocityColumns) -> Option<(usize, [f64; 3])> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    // Source IDs are 1-based; storage keys are 0-based.
    let index = tokens
        .get(columns.id)?
        .parse::<usize>()
        .ok()?
        .checked_sub(1)?;
    let vx = tokens.get(columns.vx)?.parse::<f64>().ok()?;
    let vy = tokens.get(columns.vy)?.parse::<f64>().ok()?;
    let vz = tokens.get(columns.vz)?.parse::<f64>().ok()?;
    Some((index, [vx, vy, vz]))
}

#[cfg(test)]
mod tests {
    use super::read_velocity_blocks;

    const TWO_BLOCKS: &str = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n2\n\
ITEM: BOX BOUNDS pp pp pp\n0 10\n0 10\n0 10\n\
ITEM: ATOMS id vx vy vz\n1 0.1 0.2 0.3\n2 -0.1 0.0 0.5\n\
ITEM: TIMESTEP\n100\nITEM: NUMBER OF ATOMS\n2\n\
ITEM: BOX BOUNDS pp pp pp\n0 10\n0 10\n0 10\n\
ITEM: ATOMS id vx vy vz\n2 1.0 1.0 1.0\n1 2.0 2.0 2.0\n";

    #[test]
    fn blocks_are_read_in_file_order_with_zero_based_keys() {
        let frames = read_velocity_blocks(TWO_BLOCKS);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].components[&0], [0.1, 0.2, 0.3]);
        assert_eq!(frames[0].components[&1], [-0.1, 0.0, 0.5]);
        // IDs out of file order still land on their own index.
        assert_eq!(frames[1].components[&0], [2.0, 2.0, 2.0]);
        assert_eq!(frames[1].components[&1], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn column_offsets_follow_the_header_order() {
        let source = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n1\n\
ITEM: ATOMS vx vy vz id\n0.5 0.6 0.7 1\n";
        let frames = read_velocity_blocks(source);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].components[&0], [0.5, 0.6, 0.7]);
    }

    #[test]
    fn malformed_block_does_not_stop_later_blocks() {
        let source = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n2\n\
ITEM: ATOMS id vx vy vz\n1 bad 0.0 0.0\n2 0.0 0.0 0.0\n\
ITEM: TIMESTEP\n50\nITEM: NUMBER OF ATOMS\n1\n\
ITEM: ATOMS id vx vy vz\n1 0.25 0.0 0.0\n";
        let frames = read_velocity_blocks(source);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].declared_atom_count, 1);
        assert_eq!(frames[0].components[&0], [0.25, 0.0, 0.0]);
    }

    #[test]
    fn header_without_velocity_columns_skips_the_block() {
        let source = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n1\n\
ITEM: ATOMS id x y z\n1 0.0 0.0 0.0\n";
        assert!(read_velocity_blocks(source).is_empty());
    }
}
