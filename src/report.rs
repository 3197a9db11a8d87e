//! The cover-profile to HTML-site pipeline:
//! parse → locate sources → annotate → build folder tree → write pages.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::annotate::annotate;
use crate::config::IgnoreRules;
use crate::error::{CovtreeError, Result};
use crate::locate::{FolderLocation, PackageLister, SourceLocator};
use crate::model::FileReport;
use crate::profile::{self, Profile};
use crate::render::{self, WriteSummary};
use crate::tree::{ReportTree, TreeBuilder};

/// Inputs of a report run besides the profile itself.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Root of the generated site.
    pub output_dir: PathBuf,
    /// Project directory; folder paths in the report are relative to it.
    pub working_dir: PathBuf,
    pub ignore: IgnoreRules,
}

/// What a report run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub folders: usize,
    pub files: usize,
    pub ignored: usize,
    /// Coverage over every reported file, `None` when nothing was reported.
    pub coverage: Option<f64>,
    pub index: PathBuf,
    pub writes: WriteSummary,
}

/// Generate the report for the profile at `profile_path`.
pub fn generate(
    profile_path: &Path,
    lister: &dyn PackageLister,
    options: &ReportOptions,
) -> Result<ReportOutcome> {
    let text = fs::read_to_string(profile_path).map_err(|source| CovtreeError::FileRead {
        path: profile_path.to_path_buf(),
        source,
    })?;
    let profiles = profile::parse(&text)?;
    if let Some(first) = profiles.first() {
        info!(
            "parsed {} file profile(s) in {} mode from {}",
            profiles.len(),
            first.mode,
            profile_path.display()
        );
    }

    let tree = build_tree(&profiles, lister, &options.working_dir, &options.ignore)?;
    let writes = render::write_report(&tree, &options.output_dir);

    Ok(ReportOutcome {
        folders: tree.folders().len(),
        files: tree.file_count(),
        ignored: profiles.len() - tree.file_count(),
        coverage: tree.overall(),
        index: options.output_dir.join("index.html"),
        writes,
    })
}

struct Job<'a> {
    profile: &'a Profile,
    path: PathBuf,
    location: FolderLocation,
}

/// Resolve, annotate and aggregate every profile into a finished tree.
pub fn build_tree(
    profiles: &[Profile],
    lister: &dyn PackageLister,
    working_dir: &Path,
    ignore: &IgnoreRules,
) -> Result<ReportTree> {
    let locator = SourceLocator::new(profiles, lister, working_dir)?;

    let mut jobs = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let path = locator.resolve(&profile.file_name)?;
        let location = FolderLocation::of_file(&path, working_dir);
        if ignore.excludes(&profile.file_name, &location.relative) {
            debug!("ignoring {}", profile.file_name);
            continue;
        }
        jobs.push(Job {
            profile,
            path,
            location,
        });
    }

    let mut builder = TreeBuilder::new();
    for report in annotate_all(jobs) {
        let (location, file) = report?;
        builder.insert_file(location, file);
    }
    Ok(builder.finish())
}

#[cfg(feature = "parallel")]
fn annotate_all(jobs: Vec<Job<'_>>) -> Vec<Result<(FolderLocation, FileReport)>> {
    use rayon::prelude::*;

    jobs.into_par_iter()
        .map(|job| -> Result<(FolderLocation, FileReport)> {
            Ok((job.location, file_report(job.profile, job.path)?))
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn annotate_all(jobs: Vec<Job<'_>>) -> Vec<Result<(FolderLocation, FileReport)>> {
    jobs.into_iter()
        .map(|job| -> Result<(FolderLocation, FileReport)> {
            Ok((job.location, file_report(job.profile, job.path)?))
        })
        .collect()
}

/// Read one source file and annotate it with its profile.
pub fn file_report(profile: &Profile, path: PathBuf) -> Result<FileReport> {
    let src = fs::read(&path).map_err(|source| CovtreeError::FileRead {
        path: path.clone(),
        source,
    })?;
    let body = annotate(&src, &profile.boundaries(&src))?;
    let (covered, total) = profile.statements();

    Ok(FileReport {
        name: profile.file_name.clone(),
        path,
        body,
        coverage: profile.percent_covered(),
        covered,
        total,
    })
}
