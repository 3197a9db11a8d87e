//! Spawning the external test runner and user scripts.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::error::{CovtreeError, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

/// Run `program` with `args`, adding `env` on top of the inherited
/// environment, and capture both streams.
pub fn run(
    program: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    dir: Option<&Path>,
) -> Result<CommandOutput> {
    info!("running {} {}", program, args.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(args).envs(env);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .map_err(|e| CovtreeError::Command(format!("failed to spawn '{program}': {e}")))?;
    debug!("{program} exited with {}", output.status);

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

/// Run a command line through `sh -c`.
pub fn run_shell(command_line: &str, env: &BTreeMap<String, String>) -> Result<CommandOutput> {
    run("sh", &["-c".to_string(), command_line.to_string()], env, None)
}

/// Arguments for `go test` that write a cover profile covering every package
/// matched by `pattern`.
#[must_use]
pub fn go_test_coverage_args(pattern: &str, profile: &Path) -> Vec<String> {
    vec![
        "test".to_string(),
        "-v".to_string(),
        format!("-coverpkg={pattern}"),
        pattern.to_string(),
        format!("-coverprofile={}", profile.display()),
        pattern.to_string(),
    ]
}
