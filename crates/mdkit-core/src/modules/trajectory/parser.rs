use crate::domain::{Frame, ParserResult, SimError, Trajectory};
use tracing::{debug, warn};

/// Numeric atom-type codes used by dump writers that never knew a chemical
/// symbol. Type 1 maps to Ar by convention (generic LJ runs); unknown codes
/// collapse to the placeholder symbol "X".
pub(super) fn symbol_from_type(atom_type: i64) -> &'static str {
    match atom_type {
        1 => "Ar",
        2 => "He",
        3 => "Li",
        4 => "Be",
        5 => "B",
        6 => "C",
        7 => "N",
        8 => "O",
        9 => "F",
        10 => "Ne",
        11 => "Na",
        12 => "Mg",
        13 => "Al",
        14 => "Si",
        15 => "P",
        16 => "S",
        17 => "Cl",
        18 => "Ar",
        19 => "K",
        20 => "Ca",
        _ => "X",
    }
}

fn no_frames_error() -> SimError {
    SimError::parse("PARSE.NO_FRAMES", "no frames parsed from trajectory file")
}

/// Strict multi-frame XYZ reader. Any structural deviation is an error so the
/// caller can fall back to the tolerant reader.
pub(super) fn read_strict_xyz(source: &str) -> ParserResult<Trajectory> {
    let lines = source.lines().collect::<Vec<_>>();
    let mut frames = Trajectory::new();
    let mut cursor = 0;

    while cursor < lines.len() {
        while cursor < lines.len() && lines[cursor].trim().is_empty() {
            cursor += 1;
        }
        if cursor >= lines.len() {
            break;
        }

        let atom_count = lines[cursor].trim().parse::<usize>().map_err(|_| {
            SimError::parse(
                "PARSE.XYZ_COUNT",
                format!("expected atom count, found '{}'", lines[cursor].trim()),
            )
        })?;
        cursor += 1;

        if cursor >= lines.len() {
            return Err(SimError::parse(
                "PARSE.XYZ_TRUNCATED",
                "file ends before the comment line",
            ));
        }
        cursor += 1;

        // The declared count is untrusted input; never reserve more than the
        // file can actually hold.
        let reserve = atom_count.min(lines.len().saturating_sub(cursor));
        let mut symbols = Vec::with_capacity(reserve);
        let mut positions = Vec::with_capacity(reserve);
        for _ in 0..atom_count {
            if cursor >= lines.len() {
                return Err(SimError::parse(
                    "PARSE.XYZ_TRUNCATED",
                    "file ends inside an atom block",
                ));
            }
            let (symbol, position) = read_strict_atom_line(lines[cursor])?;
            symbols.push(symbol);
            positions.push(position);
            cursor += 1;
        }

        frames.push(Frame::new(symbols, positions));
    }

    if frames.is_empty() {
        return Err(no_frames_error());
    }
    Ok(frames)
}

fn read_strict_atom_line(line: &str) -> ParserResult<(String, [f64; 3])> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 4 {
        return Err(SimError::parse(
            "PARSE.XYZ_ATOM_LINE",
            format!("atom line has {} tokens, expected at least 4", tokens.len()),
        ));
    }

    // Numeric type codes are not valid XYZ symbols; reject so the tolerant
    // reader gets a chance to map them.
    if tokens[0].parse::<i64>().is_ok() {
        return Err(SimError::parse(
            "PARSE.XYZ_SYMBOL",
            format!("numeric symbol '{}' in strict XYZ input", tokens[0]),
        ));
    }

    let position = parse_coordinates(&tokens[1..4]).ok_or_else(|| {
        SimError::parse(
            "PARSE.XYZ_COORDINATES",
            format!("non-numeric coordinates in line '{}'", line.trim()),
        )
    })?;
    Ok((tokens[0].to_string(), position))
}

/// Strict reader for the block-structured vendor dump format
/// (`ITEM: TIMESTEP` / `ITEM: NUMBER OF ATOMS` / `ITEM: ATOMS <columns>`).
pub(super) fn read_strict_dump(source: &str) -> ParserResult<Trajectory> {
    let lines = source.lines().collect::<Vec<_>>();
    let mut frames = Trajectory::new();
    let mut cursor = 0;

    while cursor < lines.len() {
        if !lines[cursor].contains("ITEM: TIMESTEP") {
            cursor += 1;
            continue;
        }
        // Timestep value line follows the marker.
        cursor += 2;

        while cursor < lines.len() && !lines[cursor].contains("ITEM: NUMBER OF ATOMS") {
            cursor += 1;
        }
        if cursor + 1 >= lines.len() {
            return Err(SimError::parse(
                "PARSE.DUMP_TRUNCATED",
                "dump block ends before its atom count",
            ));
        }
        cursor += 1;
        let atom_count = lines[cursor].trim().parse::<usize>().map_err(|_| {
            SimError::parse(
                "PARSE.DUMP_ATOM_COUNT",
                format!("expected atom count, found '{}'", lines[cursor].trim()),
            )
        })?;
        cursor += 1;

        while cursor < lines.len() && !lines[cursor].contains("ITEM: ATOMS") {
            cursor += 1;
        }
        if cursor >= lines.len() {
            return Err(SimError::parse(
                "PARSE.DUMP_TRUNCATED",
                "dump block has no ITEM: ATOMS section",
            ));
        }

        let columns = DumpColumns::from_header(lines[cursor])?;
        cursor += 1;

        let reserve = atom_count.min(lines.len().saturating_sub(cursor));
        let mut symbols = Vec::with_capacity(reserve);
        let mut positions = Vec::with_capacity(reserve);
        for _ in 0..atom_count {
            if cursor >= lines.len() {
                return Err(SimError::parse(
                    "PARSE.DUMP_TRUNCATED",
                    "dump block ends inside its atom section",
                ));
            }
            let (symbol, position) = columns.read_atom_line(lines[cursor])?;
            symbols.push(symbol);
            positions.push(position);
            cursor += 1;
        }

        frames.push(Frame::new(symbols, positions));
    }

    if frames.is_empty() {
        return Err(no_frames_error());
    }
    Ok(frames)
}

/// Column offsets within one `ITEM: ATOMS <columns>` header, relative to the
/// first data token (the two leading header words are not counted).
struct DumpColumns {
    symbol: Option<SymbolColumn>,
    x: usize,
}

enum SymbolColumn {
    Element(usize),
    Type(usize),
}

impl DumpColumns {
    fn from_header(header: &str) -> ParserResult<Self> {
        let tokens = header.split_whitespace().collect::<Vec<_>>();
        let offset_of = |predicate: fn(&str) -> bool| {
            tokens
                .iter()
                .position(|token| predicate(token))
                .and_then(|index| index.checked_sub(2))
        };

        let x = offset_of(|token| matches!(token, "x" | "xs" | "xu" | "xsu")).ok_or_else(|| {
            SimError::parse(
                "PARSE.DUMP_COLUMNS",
                format!("no position column in header '{}'", header.trim()),
            )
        })?;
        let symbol = offset_of(|token| token == "element")
            .map(SymbolColumn::Element)
            .or_else(|| offset_of(|token| token == "type").map(SymbolColumn::Type));

        Ok(Self { symbol, x })
    }

    fn read_atom_line(&self, line: &str) -> ParserResult<(String, [f64; 3])> {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < self.x + 3 {
            return Err(SimError::parse(
                "PARSE.DUMP_ATOM_LINE",
                format!("atom line '{}' is shorter than its header", line.trim()),
            ));
        }

        let position = parse_coordinates(&tokens[self.x..self.x + 3]).ok_or_else(|| {
            SimError::parse(
                "PARSE.DUMP_COORDINATES",
                format!("non-numeric coordinates in line '{}'", line.trim()),
            )
        })?;

        let symbol = match &self.symbol {
            Some(SymbolColumn::Element(offset)) => tokens
                .get(*offset)
                .map(|token| token.to_string())
                .unwrap_or_else(|| "X".to_string()),
            Some(SymbolColumn::Type(offset)) => tokens
                .get(*offset)
                .and_then(|token| token.parse::<i64>().ok())
                .map(symbol_from_type)
                .unwrap_or("X")
                .to_string(),
            None => "X".to_string(),
        };

        Ok((symbol, position))
    }
}

/// Tolerant line-oriented reader used as the last fallback for both formats.
///
/// Malformed atom lines are skipped without counting toward the frame, and
/// the cursor always advances by the declared atom count so one bad frame
/// shifts a frame boundary instead of desynchronizing the rest of the file.
/// A frame is kept only when every declared atom parsed.
pub(super) fn read_tolerant(source: &str) -> ParserResult<Trajectory> {
    let lines = source.lines().collect::<Vec<_>>();
    let total_lines = lines.len();
    let mut frames = Trajectory::new();
    let mut cursor = 0;

    while cursor < total_lines {
        while cursor < total_lines && lines[cursor].trim().is_empty() {
            cursor += 1;
        }
        if cursor >= total_lines {
            break;
        }

        let Ok(atom_count) = lines[cursor].trim().parse::<usize>() else {
            debug!(
                line = cursor,
                content = lines[cursor].trim(),
                "skipping non-numeric atom-count line"
            );
            cursor += 1;
            continue;
        };
        cursor += 1;

        // One comment line, then any blank lines after it.
        if cursor < total_lines {
            cursor += 1;
        }
        while cursor < total_lines && lines[cursor].trim().is_empty() {
            cursor += 1;
        }

        let reserve = atom_count.min(total_lines.saturating_sub(cursor));
        let mut symbols = Vec::with_capacity(reserve);
        let mut positions = Vec::with_capacity(reserve);
        for offset in 0..atom_count {
            if cursor + offset >= total_lines {
                warn!("unexpected end of file while reading atom data");
                break;
            }
            let line = lines[cursor + offset].trim();
            if line.is_empty() {
                continue;
            }
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            if tokens.len() < 4 {
                debug!(content = line, "skipped atom line with insufficient data");
                continue;
            }

            let symbol = match tokens[0].parse::<i64>() {
                Ok(atom_type) => symbol_from_type(atom_type).to_string(),
                Err(_) => tokens[0].to_string(),
            };
            let Some(position) = parse_coordinates(&tokens[1..4]) else {
                debug!(content = line, "skipped atom line with invalid coordinates");
                continue;
            };

            symbols.push(symbol);
            positions.push(position);
        }
        cursor += atom_count;

        if positions.len() == atom_count && symbols.len() == atom_count {
            frames.push(Frame::new(symbols, positions));
        } else {
            warn!(
                declared = atom_count,
                parsed = positions.len(),
                "frame dropped due to missing or invalid atom data"
            );
        }
    }

    if frames.is_empty() {
        warn!("no frames were parsed from the trajectory file");
        return Err(no_frames_error());
    }
    Ok(frames)
}

fn parse_coordinates(tokens: &[&str]) -> Option<[f64; 3]> {
    let x = tokens.first()?.parse::<f64>().ok()?;
    let y = tokens.get(1)?.parse::<f64>().ok()?;
    let z = tokens.get(2)?.parse::<f64>().ok()?;
    Some([x, y, z])
}
