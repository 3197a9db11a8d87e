//! Command handler functions for the covtree CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::config::Config;
use crate::exec;
use crate::locate::{self, PackageLister};
use crate::model::format_percent;
use crate::report::{self, ReportOptions, ReportOutcome};
use crate::testlog::TestReport;

/// Name of the cover profile written into the coverage folder.
pub const PROFILE_FILE: &str = "coverage.out";

/// Printable output plus whether the command as a whole succeeded.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub output: String,
    pub success: bool,
}

/// Run the configured test command and summarise its log.
pub fn cmd_test(config: &Config) -> Result<CommandResult> {
    let out = exec::run_shell(&config.test.command, &config.env)?;
    if !out.stderr.trim().is_empty() {
        return Ok(CommandResult {
            output: out.stderr,
            success: false,
        });
    }

    let report = TestReport::parse(&out.stdout);
    Ok(CommandResult {
        output: report.render(config.test.output),
        success: out.success && report.all_passed(),
    })
}

/// Run a named script from the config.
pub fn cmd_run(config: &Config, name: &str) -> Result<CommandResult> {
    let command = config.script(name)?;
    let out = exec::run_shell(command, &config.env)?;

    let mut output = out.stdout;
    output.push_str(&out.stderr);
    Ok(CommandResult {
        output,
        success: out.success,
    })
}

/// Coverage folder of `config`, anchored at `working_dir`.
pub fn coverage_dir(config: &Config, working_dir: &Path) -> PathBuf {
    working_dir.join(&config.coverage_folder_path)
}

/// Empty the coverage folder so pages of folders that vanished since the
/// last run do not linger.
fn reset_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("Failed to clear {}", dir.display())),
    }
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Run the tests under coverage, unless `profile` names an existing cover
/// profile, then generate the HTML report from it.
pub fn cmd_report(
    config: &Config,
    working_dir: &Path,
    profile: Option<&Path>,
    lister: &dyn PackageLister,
) -> Result<(CommandResult, ReportOutcome)> {
    let out_dir = coverage_dir(config, working_dir);
    let mut output = String::new();
    let mut success = true;

    let profile_path = match profile {
        Some(path) => {
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            path.to_path_buf()
        }
        None => {
            reset_dir(&out_dir)?;
            let profile_path = out_dir.join(PROFILE_FILE);
            let go = locate::go_binary();
            let args = exec::go_test_coverage_args(config.package_pattern(), &profile_path);
            let run = exec::run(
                &go.to_string_lossy(),
                &args,
                &config.env,
                Some(working_dir),
            )?;

            let tests = TestReport::parse(&run.stdout);
            if !tests.packages.is_empty() {
                output.push_str(&tests.render(config.test.output));
            }
            if !run.success {
                warn!("go test exited with {:?}", run.code);
                success = false;
            }
            if !profile_path.is_file() {
                bail!("go test did not write a cover profile:\n{}", run.stderr);
            }
            profile_path
        }
    };

    let options = ReportOptions {
        output_dir: out_dir,
        working_dir: working_dir.to_path_buf(),
        ignore: config.ignore_rules(),
    };
    let outcome = report::generate(&profile_path, lister, &options)
        .with_context(|| format!("Failed to build report from {}", profile_path.display()))?;
    info!("report written to {}", options.output_dir.display());

    writeln!(
        output,
        "Coverage:   {} across {} file(s) in {} folder(s)",
        format_percent(outcome.coverage),
        outcome.files,
        outcome.folders
    )
    .unwrap();
    if outcome.ignored > 0 {
        writeln!(output, "Ignored:    {} file(s)", outcome.ignored).unwrap();
    }
    if outcome.writes.pages_failed > 0 {
        writeln!(
            output,
            "Failed:     {} page(s) could not be written",
            outcome.writes.pages_failed
        )
        .unwrap();
        success = false;
    }
    writeln!(output, "Report:     {}", outcome.index.display()).unwrap();

    Ok((CommandResult { output, success }, outcome))
}
