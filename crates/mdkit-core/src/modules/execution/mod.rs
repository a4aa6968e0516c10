pub mod script;

use crate::domain::{RunOutcome, SimError, SimResult};
use crate::modules::analysis;
use crate::storage::{ArtifactStore, FsArtifactStore, fresh_id};
use globset::Glob;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name the staged input script takes inside the working directory.
const INPUT_SCRIPT_NAME: &str = "input.lammps";

/// Environment variable overriding the engine executable.
pub const ENGINE_ENV_VAR: &str = "MDKIT_ENGINE";

/// Captured result of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the pipeline and the external MD engine.
pub trait EngineRunner {
    /// Run the engine against the staged `input.lammps` inside `working_dir`.
    fn launch(&self, working_dir: &Path) -> SimResult<EngineOutput>;
}

/// Runs the real engine as a subprocess, `<engine> -in input.lammps`, with
/// the working directory set and no timeout.
pub struct ProcessEngineRunner {
    executable: String,
}

impl ProcessEngineRunner {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl EngineRunner for ProcessEngineRunner {
    fn launch(&self, working_dir: &Path) -> SimResult<EngineOutput> {
        let output = Command::new(&self.executable)
            .arg("-in")
            .arg(INPUT_SCRIPT_NAME)
            .current_dir(working_dir)
            .output()
            .map_err(|error| {
                SimError::execution(
                    "EXEC.LAUNCH",
                    format!("failed to launch engine '{}': {}", self.executable, error),
                )
            })?;

        Ok(EngineOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Pipeline configuration. Defaults suit a local run; the CLI overrides
/// per-flag.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub engine_executable: String,
    pub simulations_root: PathBuf,
    pub storage_root: PathBuf,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            engine_executable: env::var(ENGINE_ENV_VAR).unwrap_or_else(|_| "lmp".to_string()),
            simulations_root: PathBuf::from("simulations"),
            storage_root: PathBuf::from("storage"),
        }
    }
}

/// Working-directory guard for one run. The directory is transient and is
/// removed on all exit paths; removal failure is logged, never escalated.
struct SimulationRun {
    path: PathBuf,
}

impl SimulationRun {
    fn create(root: &Path) -> SimResult<Self> {
        let path = root.join(format!("sim_{}", fresh_id()));
        fs::create_dir_all(&path).map_err(|error| {
            SimError::io_system(
                "IO.WORKDIR",
                format!(
                    "failed to create working directory '{}': {}",
                    path.display(),
                    error
                ),
            )
        })?;
        Ok(Self { path })
    }
}

impl Drop for SimulationRun {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir_all(&self.path) {
            warn!(
                path = %self.path.display(),
                %error,
                "failed to remove working directory"
            );
        }
    }
}

/// End-to-end run of one input script: validate, patch, execute, discover
/// outputs, relocate them durably, analyze.
pub struct ExecutionPipeline<R, S> {
    config: ExecutionConfig,
    runner: R,
    store: S,
}

impl ExecutionPipeline<ProcessEngineRunner, FsArtifactStore> {
    /// Pipeline wired with the real subprocess runner and filesystem store.
    pub fn with_defaults(config: ExecutionConfig) -> Self {
        let runner = ProcessEngineRunner::new(config.engine_executable.clone());
        let store = FsArtifactStore::new(config.storage_root.clone());
        Self::new(config, runner, store)
    }
}

impl<R: EngineRunner, S: ArtifactStore> ExecutionPipeline<R, S> {
    pub fn new(config: ExecutionConfig, runner: R, store: S) -> Self {
        Self {
            config,
            runner,
            store,
        }
    }

    /// Run the full pipeline. All failure modes fold into a failed
    /// [`RunOutcome`] with a caller-facing message; nothing panics.
    pub fn run(&self, script_path: &Path) -> RunOutcome {
        let source = match fs::read_to_string(script_path) {
            Ok(source) => source,
            Err(_) => {
                return RunOutcome::failure(format!(
                    "Input file not found: {}",
                    script_path.display()
                ));
            }
        };

        let report = script::validate_script(&source);
        for warning in &report.warnings {
            warn!(%warning, "input script warning");
        }
        if !report.is_valid() {
            return RunOutcome::failure(report.errors.join("; "));
        }

        let patched = script::ensure_masses_set(&source);
        if patched != source {
            info!(path = %script_path.display(), "inserted unit masses into input script");
            if let Err(error) = fs::write(script_path, &patched) {
                return RunOutcome::failure(format!("Failed to update input file: {error}"));
            }
        }

        let expected = script::detect_dump_filenames(&patched);
        debug!(?expected, "dump filenames declared by the script");

        let run_dir = match SimulationRun::create(&self.config.simulations_root) {
            Ok(run_dir) => run_dir,
            Err(error) => return RunOutcome::failure(error.message().to_string()),
        };

        if let Err(error) = self.stage_inputs(script_path, &patched, &run_dir.path) {
            return RunOutcome::failure(error.message().to_string());
        }

        let output = match self.runner.launch(&run_dir.path) {
            Ok(output) => output,
            Err(error) => return RunOutcome::failure(error.message().to_string()),
        };
        if output.status_code != Some(0) {
            return RunOutcome::failure(format!(
                "Simulation failed with exit code {}: {}",
                output
                    .status_code
                    .map_or_else(|| "unknown".to_string(), |code| code.to_string()),
                output.stderr
            ));
        }
        debug!(stdout = output.stdout.len(), "engine finished");

        let Some(trajectory_file) =
            find_output(&run_dir.path, expected.coordinate.as_deref(), "*.xyz", &["dump"])
        else {
            return RunOutcome::failure("No trajectory files found");
        };
        let velocity_file = find_output(
            &run_dir.path,
            expected.velocity.as_deref(),
            "*.vel",
            &["dump", "vel"],
        );

        let trajectory = match self.store.store("trajectory", "xyz", &trajectory_file) {
            Ok(artifact) => artifact,
            Err(error) => return RunOutcome::failure(error.message().to_string()),
        };
        let velocity = velocity_file.and_then(|path| {
            self.store
                .store("velocity", "vel", &path)
                .map_err(|error| warn!(%error, "failed to store velocity output"))
                .ok()
        });

        let analysis = analysis::analyze(
            &trajectory.path,
            velocity.as_ref().map(|artifact| artifact.path.as_path()),
        );
        RunOutcome::completed(analysis, trajectory.id)
    }

    /// Stage the patched script as `input.lammps` plus every sibling file of
    /// the original script (auxiliary potentials and the like).
    fn stage_inputs(&self, script_path: &Path, patched: &str, run_dir: &Path) -> SimResult<()> {
        fs::write(run_dir.join(INPUT_SCRIPT_NAME), patched).map_err(|error| {
            SimError::io_system(
                "IO.STAGE_SCRIPT",
                format!("failed to stage input script: {error}"),
            )
        })?;

        let Some(parent) = script_path.parent() else {
            return Ok(());
        };
        let entries = match fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "could not enumerate script siblings");
                return Ok(());
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path == script_path || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            if let Err(error) = fs::copy(&path, run_dir.join(name)) {
                warn!(path = %path.display(), %error, "failed to copy auxiliary file");
            } else {
                debug!(path = %path.display(), "copied auxiliary file");
            }
        }
        Ok(())
    }
}

/// Pick the output file to use: a filename the script declared wins when it
/// exists, otherwise the candidates matching the glob or every name
/// substring, sorted by name, first one.
fn find_output(
    run_dir: &Path,
    declared: Option<&str>,
    pattern: &str,
    substrings: &[&str],
) -> Option<PathBuf> {
    if let Some(name) = declared {
        let candidate = run_dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        warn!(name, "declared dump file was not produced, falling back to discovery");
    }

    let matcher = Glob::new(pattern).ok()?.compile_matcher();
    let mut candidates = fs::read_dir(run_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            matcher.is_match(&name) || substrings.iter().all(|needle| name.contains(needle))
        })
        .collect::<Vec<_>>();
    candidates.sort();
    candidates.into_iter().next()
}

/// Delete `sim_*` working directories under `root` older than `max_age`.
/// Per-directory failures are logged and skipped. Returns how many
/// directories were removed.
pub fn cleanup_stale_runs(root: &Path, max_age: Duration) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(root = %root.display(), %error, "could not read simulations root");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_run_dir = path.is_dir()
            && path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("sim_"));
        if !is_run_dir {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age >= max_age);
        if !stale {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stale run directory");
                removed += 1;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to remove stale run directory");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::{
        EngineOutput, EngineRunner, ExecutionConfig, ExecutionPipeline, cleanup_stale_runs,
    };
    use crate::domain::SimResult;
    use crate::storage::FsArtifactStore;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Engine stand-in that counts invocations and writes canned outputs.
    struct StubEngine {
        invocations: AtomicUsize,
        exit_code: i32,
        stderr: String,
        outputs: Vec<(String, String)>,
    }

    impl StubEngine {
        fn succeeding(outputs: Vec<(String, String)>) -> Self {
            Self {
                invocations: AtomicUsize::new(0),
                exit_code: 0,
                stderr: String::new(),
                outputs,
            }
        }

        fn failing(exit_code: i32, stderr: &str) -> Self {
            Self {
                invocations: AtomicUsize::new(0),
                exit_code,
                stderr: stderr.to_string(),
                outputs: Vec::new(),
            }
        }

        fn invocation_count(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    impl EngineRunner for &StubEngine {
        fn launch(&self, working_dir: &Path) -> SimResult<EngineOutput> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            for (name, content) in &self.outputs {
                fs::write(working_dir.join(name), content).expect("stub output should be written");
            }
            Ok(EngineOutput {
                status_code: Some(self.exit_code),
                stdout: String::new(),
                stderr: self.stderr.clone(),
            })
        }
    }

    fn pipeline<'a>(
        temp: &TempDir,
        engine: &'a StubEngine,
    ) -> ExecutionPipeline<&'a StubEngine, FsArtifactStore> {
        let config = ExecutionConfig {
            engine_executable: "unused".to_string(),
            simulations_root: temp.path().join("simulations"),
            storage_root: temp.path().join("storage"),
        };
        let store = FsArtifactStore::new(config.storage_root.clone());
        ExecutionPipeline::new(config, engine, store)
    }

    fn stage_script(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("in.lammps");
        fs::write(&path, content).expect("script should be staged");
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

    fn xyz_frames(frames: usize, atoms: usize) -> String {
        let mut content = String::new();
        for frame in 0..frames {
            content.push_str(&format!("{atoms}\nframe {frame}\n"));
            for atom in 0..atoms {
                content.push_str(&format!("Ar {}.0 {}.0 0.0\n", frame, atom));
            }
        }
        content
    }

    #[test]
    fn missing_script_fails_without_invoking_the_engine() {
        let temp = TempDir::new().expect("tempdir should be created");
        let engine = StubEngine::succeeding(Vec::new());
        let outcome = pipeline(&temp, &engine).run(&temp.path().join("absent.lammps"));

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Input file not found: "));
        assert_eq!(engine.invocation_count(), 0);
    }

    #[test]
    fn empty_script_fails_validation_before_execution() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, "\n");
        let engine = StubEngine::succeeding(Vec::new());
        let outcome = pipeline(&temp, &engine).run(&script);

        assert_eq!(outcome.message, "Input file is empty");
        assert_eq!(engine.invocation_count(), 0);
    }

    #[test]
    fn missing_commands_fail_validation_before_execution() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, "dump traj all xyz 10 t.xyz\n");
        let engine = StubEngine::succeeding(Vec::new());
        let outcome = pipeline(&temp, &engine).run(&script);

        assert_eq!(
            outcome.message,
            "Missing required commands: units, atom_style, run"
        );
        assert_eq!(engine.invocation_count(), 0);
    }

    #[test]
    fn engine_failure_reports_exit_code_and_stderr_verbatim() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, VALID_SCRIPT);
        let engine = StubEngine::failing(7, "ERROR: Lost atoms\n");
        let outcome = pipeline(&temp, &engine).run(&script);

        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Simulation failed with exit code 7: ERROR: Lost atoms\n"
        );
        assert_eq!(engine.invocation_count(), 1);
    }

    #[test]
    fn run_without_outputs_reports_no_trajectory() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, VALID_SCRIPT);
        let engine = StubEngine::succeeding(Vec::new());
        let outcome = pipeline(&temp, &engine).run(&script);

        assert_eq!(outcome.message, "No trajectory files found");
    }

    #[test]
    fn successful_run_relocates_outputs_and_analyzes_them() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, VALID_SCRIPT);
        let engine = StubEngine::succeeding(vec![(
            "trajectory.xyz".to_string(),
            xyz_frames(3, 8),
        )]);
        let outcome = pipeline(&temp, &engine).run(&script);

        assert!(outcome.success, "message: {}", outcome.message);
        assert_eq!(outcome.message, "Simulation completed successfully");
        let report = outcome
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.report())
            .expect("analysis should complete");
        assert_eq!(report.frame_count, 3);
        assert_eq!(report.atom_count, 8);

        // Durable copy exists under the storage root after the working
        // directory is gone.
        let id = outcome.trajectory_file_id.expect("id should be attached");
        let stored = temp
            .path()
            .join("storage")
            .join(format!("trajectory_{id}.xyz"));
        assert!(stored.is_file());
        assert!(
            fs::read_dir(temp.path().join("simulations"))
                .map(|entries| entries.count() == 0)
                .unwrap_or(true)
        );
    }

    #[test]
    fn masses_are_patched_back_into_the_script() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(
            &temp,
            "units lj\natom_style atomic\ncreate_box 2 box\ncreate_atoms 1 box\n\
             dump traj all xyz 10 trajectory.xyz\nrun 10\n",
        );
        let engine = StubEngine::succeeding(vec![(
            "trajectory.xyz".to_string(),
            xyz_frames(1, 1),
        )]);
        pipeline(&temp, &engine).run(&script);

        let rewritten = fs::read_to_string(&script).expect("script should remain readable");
        assert!(rewritten.contains("mass 1 1.0"));
        assert!(rewritten.contains("mass 2 1.0"));
    }

    #[test]
    fn undeclared_dump_outputs_are_discovered_by_name() {
        let temp = TempDir::new().expect("tempdir should be created");
        // Script declares trajectory.xyz but the engine writes other names.
        let script = stage_script(&temp, VALID_SCRIPT);
        let engine = StubEngine::succeeding(vec![
            ("dump.positions".to_string(), xyz_frames(2, 2)),
            ("dump.vel.out".to_string(), "not a velocity file\n".to_string()),
        ]);
        let outcome = pipeline(&temp, &engine).run(&script);

        assert!(outcome.success, "message: {}", outcome.message);
    }

    #[test]
    fn sibling_files_ride_along_into_the_working_directory() {
        let temp = TempDir::new().expect("tempdir should be created");
        let script = stage_script(&temp, VALID_SCRIPT);
        fs::write(temp.path().join("Ar.eam"), "potential data\n")
            .expect("sibling should be staged");

        struct SiblingCheck {
            invocations: AtomicUsize,
        }
        impl EngineRunner for &SiblingCheck {
            fn launch(&self, working_dir: &Path) -> SimResult<EngineOutput> {
                self.invocations.fetch_add(1, Ordering::SeqCst);
                assert!(working_dir.join("Ar.eam").is_file());
                assert!(working_dir.join("input.lammps").is_file());
                fs::write(working_dir.join("trajectory.xyz"), xyz_frames(1, 1))
                    .expect("stub output should be written");
                Ok(EngineOutput {
                    status_code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }

        let check = SiblingCheck {
            invocations: AtomicUsize::new(0),
        };
        let config = ExecutionConfig {
            engine_executable: "unused".to_string(),
            simulations_root: temp.path().join("simulations"),
            storage_root: temp.path().join("storage"),
        };
        let store = FsArtifactStore::new(config.storage_root.clone());
        let outcome = ExecutionPipeline::new(config, &check, store).run(&script);

        assert!(outcome.success, "message: {}", outcome.message);
        assert_eq!(check.invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_removes_only_aged_run_directories() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::create_dir(temp.path().join("sim_old")).expect("run dir should be created");
        fs::create_dir(temp.path().join("unrelated")).expect("dir should be created");

        // Everything is "old" relative to a zero threshold.
        let removed = cleanup_stale_runs(temp.path(), Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(!temp.path().join("sim_old").exists());
        assert!(temp.path().join("unrelated").exists());

        // A generous threshold leaves fresh directories alone.
        fs::create_dir(temp.path().join("sim_fresh")).expect("run dir should be created");
        let removed = cleanup_stale_runs(temp.path(), Duration::from_secs(24 * 3600));
        assert_eq!(removed, 0);
        assert!(temp.path().join("sim_fresh").exists());
    }

    #[test]
    fn cleanup_of_a_missing_root_is_a_no_op() {
        let temp = TempDir::new().expect("tempdir should be created");
        assert_eq!(
            cleanup_stale_runs(&temp.path().join("absent"), Duration::ZERO),
            0
        );
    }
}
