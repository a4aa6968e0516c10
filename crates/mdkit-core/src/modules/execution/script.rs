//! Engine input-script inspection and patching.
//!
//! Everything here works on whole-line token scans. Scripts are small and the
//! command grammar is one directive per line, so no richer parsing is needed.

use tracing::warn;

/// Outcome of a pre-flight script check. Errors block execution, warnings
/// only surface in logs and CLI output.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Output files a script declares through its dump commands.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DumpFilenames {
    pub coordinate: Option<String>,
    pub velocity: Option<String>,
}

fn command_lines(source: &str) -> impl Iterator<Item = Vec<&str>> {
    source
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
}

fn has_command(source: &str, command: &str) -> bool {
    command_lines(source).any(|tokens| tokens[0] == command)
}

/// Pre-flight validation of an engine input script.
pub fn validate_script(source: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if source.trim().is_empty() {
        report.errors.push("Input file is empty".to_string());
        return report;
    }

    let missing = ["units", "atom_style", "run"]
        .iter()
        .filter(|command| !has_command(source, command))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        report
            .errors
            .push(format!("Missing required commands: {}", missing.join(", ")));
    }

    if !has_command(source, "dump") {
        report
            .errors
            .push("Missing dump command for trajectory output".to_string());
    }

    for command in ["read_data", "read_restart", "include", "read_dump"] {
        if has_command(source, command) {
            report.warnings.push(format!(
                "Script references an external file via '{command}', which must exist in the working directory"
            ));
        }
    }

    if has_command(source, "create_box") && !has_command(source, "mass") {
        report
            .warnings
            .push("No mass commands found, unit masses will be inserted".to_string());
    }

    report
}

/// Atom types the script declares through `create_box`, if any.
fn declared_type_count(source: &str) -> Option<usize> {
    command_lines(source)
        .find(|tokens| tokens[0] == "create_box")
        .and_then(|tokens| tokens.get(1)?.parse::<usize>().ok())
}

/// Guarantee atom masses exist before the engine runs.
///
/// Scripts carrying any `mass` directive pass through untouched. Otherwise
/// every type declared via `create_box` gets unit mass inserted: right after
/// the first `create_atoms` line when present, otherwise just before the
/// first `run` line, otherwise appended.
pub fn ensure_masses_set(source: &str) -> String {
    if has_command(source, "mass") {
        return source.to_string();
    }
    let Some(type_count) = declared_type_count(source) else {
        warn!("no create_box command, cannot infer atom types for mass patching");
        return source.to_string();
    };

    let mass_lines = (1..=type_count)
        .map(|atom_type| format!("mass {atom_type} 1.0"))
        .collect::<Vec<_>>();

    let lines = source.lines().collect::<Vec<_>>();
    let first_command = |command: &str| {
        lines.iter().position(|line| {
            line.split('#')
                .next()
                .unwrap_or("")
                .split_whitespace()
                .next()
                == Some(command)
        })
    };

    let mut patched = lines.iter().map(|line| line.to_string()).collect::<Vec<_>>();
    if let Some(anchor) = first_command("create_atoms") {
        let mut insertion = vec![String::new()];
        insertion.extend(mass_lines);
        patched.splice(anchor + 1..anchor + 1, insertion);
    } else if let Some(anchor) = first_command("run") {
        let mut insertion = mass_lines;
        insertion.push(String::new());
        patched.splice(anchor..anchor, insertion);
    } else {
        patched.push(String::new());
        patched.extend(mass_lines);
    }

    let mut result = patched.join("\n");
    if source.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Locate the output filenames the script's dump commands will produce.
///
/// The coordinate file comes from `dump <id> all xyz <every> <file>`; the
/// velocity file from `dump <id> all custom <every> <file> ...` whose column
/// list includes any velocity component.
pub fn detect_dump_filenames(source: &str) -> DumpFilenames {
    let mut filenames = DumpFilenames::default();

    for tokens in command_lines(source) {
        if tokens[0] != "dump" || tokens.len() < 6 || tokens[2] != "all" {
            continue;
        }
        match tokens[3] {
            "xyz" if filenames.coordinate.is_none() => {
                filenames.coordinate = Some(tokens[5].to_string());
            }
            "custom" if filenames.velocity.is_none() => {
                let columns = &tokens[6..];
                if ["vx", "vy", "vz"]
                    .iter()
                    .any(|column| columns.contains(column))
                {
                    filenames.velocity = Some(tokens[5].to_string());
                }
            }
            _ => {}
        }
    }

    filenames
}
