use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mdkit() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mdkit"))
}

fn parse_stdout(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|error| {
        panic!("stdout should be JSON ({error}): {stdout}");
    })
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn stage_trajectory(temp: &TempDir, frames: usize, atoms: usize) -> PathBuf {
    let path = temp.path().join("trajectory.xyz");
    let mut content = String::new();
    for frame in 0..frames {
        content.push_str(&format!("{atoms}\ntimestep {frame}\n"));
        for atom in 0..atoms {
            content.push_str(&format!("Ar {}.0 {}.0 0.0\n", frame, atom));
        }
    }
    write_file(&path, &content);
    path
}

const VALID_SCRIPT: &str = "\
units lj
atom_style atomic
create_box 1 box
create_atoms 1 box
mass 1 39.948
dump traj all xyz 100 trajectory.xyz
run 100
";

#[test]
fn validate_accepts_a_complete_script() {
    let temp = TempDir::new().expect("tempdir should be created");
    let script = temp.path().join("in.lammps");
    write_file(&script, VALID_SCRIPT);

    let output = mdkit()
        .arg("validate")
        .arg(&script)
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(0));
    let json = parse_stdout(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"].as_array().map(Vec::len), Some(0));
}

#[test]
fn validate_rejects_an_incomplete_script_with_exit_one() {
    let temp = TempDir::new().expect("tempdir should be created");
    let script = temp.path().join("in.lammps");
    write_file(&script, "dump traj all xyz 100 out.xyz\n");

    let output = mdkit()
        .arg("validate")
        .arg(&script)
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(1));
    let json = parse_stdout(&output);
    assert_eq!(json["valid"], false);
    assert_eq!(
        json["errors"][0],
        "Missing required commands: units, atom_style, run"
    );
}

#[test]
fn analyze_reports_series_and_counts() {
    let temp = TempDir::new().expect("tempdir should be created");
    let trajectory = stage_trajectory(&temp, 3, 2);

    let output = mdkit()
        .arg("analyze")
        .arg(&trajectory)
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(0));
    let json = parse_stdout(&output);
    assert_eq!(json["frames"], 3);
    assert_eq!(json["atoms"], 2);
    assert_eq!(json["msd"][0], 0.0);
}

#[test]
fn analyze_of_garbage_exits_one_with_the_error_field() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("garbage.xyz");
    write_file(&path, "no frames here\n");

    let output = mdkit()
        .arg("analyze")
        .arg(&path)
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(1));
    let json = parse_stdout(&output);
    assert_eq!(json["error"], "Failed to parse trajectory file");
}

#[test]
fn run_with_a_missing_script_fails_without_executing() {
    let temp = TempDir::new().expect("tempdir should be created");

    let output = mdkit()
        .arg("run")
        .arg(temp.path().join("absent.lammps"))
        .arg("--simulations-dir")
        .arg(temp.path().join("simulations"))
        .arg("--storage-dir")
        .arg(temp.path().join("storage"))
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(1));
    let json = parse_stdout(&output);
    let error = json["error"].as_str().expect("error should be set");
    assert!(error.starts_with("Input file not found: "));
}

#[cfg(unix)]
#[test]
fn run_drives_the_engine_and_prints_the_full_response() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("tempdir should be created");
    let script = temp.path().join("inputs/melt.lammps");
    write_file(&script, VALID_SCRIPT);

    // Engine stand-in: writes a two-frame trajectory into its working
    // directory and exits cleanly.
    let engine = temp.path().join("fake-lmp");
    write_file(
        &engine,
        "#!/bin/sh\nprintf '2\\nt0\\nAr 0.0 0.0 0.0\\nAr 1.0 0.0 0.0\\n2\\nt1\\nAr 0.5 0.0 0.0\\nAr 1.5 0.0 0.0\\n' > trajectory.xyz\n",
    );
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755))
        .expect("engine stand-in should be executable");

    let storage = temp.path().join("storage");
    let output = mdkit()
        .arg("run")
        .arg(&script)
        .arg("--engine")
        .arg(&engine)
        .arg("--simulations-dir")
        .arg(temp.path().join("simulations"))
        .arg("--storage-dir")
        .arg(&storage)
        .output()
        .expect("binary should run");

    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = parse_stdout(&output);
    assert_eq!(json["frames"], 2);
    assert_eq!(json["atoms"], 2);
    assert_eq!(json["msd"][1], 0.25);

    let id = json["trajectory_file_id"]
        .as_str()
        .expect("trajectory id should be set");
    assert!(storage.join(format!("trajectory_{id}.xyz")).is_file());
}

#[test]
fn cleanup_reports_removed_directories() {
    let temp = TempDir::new().expect("tempdir should be created");
    let simulations = temp.path().join("simulations");
    fs::create_dir_all(simulations.join("sim_stale")).expect("run dir should be created");

    let output = mdkit()
        .arg("cleanup")
        .arg("--simulations-dir")
        .arg(&simulations)
        .arg("--max-age-hours")
        .arg("0")
        .output()
        .expect("binary should run");

    assert_eq!(output.status.code(), Some(0));
    let json = parse_stdout(&output);
    assert_eq!(json["removed"], 1);
    assert!(!simulations.join("sim_stale").exists());
}

#[test]
fn unknown_subcommands_are_usage_errors() {
    let output = mdkit()
        .arg("frobnicate")
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
}
