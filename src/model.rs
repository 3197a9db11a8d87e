//! Report-side data model shared by the aggregator and the renderer.
//! Profile parsing produces `profile::Profile`s; everything downstream of
//! annotation works on the types in this module.

use std::fmt;
use std::path::PathBuf;

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Arithmetic mean, or `None` for an empty input.
#[must_use]
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// One source file's render unit.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Profile-relative identifier, e.g. `example.com/mod/pkg/file.go`.
    pub name: String,
    /// Resolved filesystem path of the source.
    pub path: PathBuf,
    /// Annotated, escaped source produced by `annotate::annotate`.
    pub body: String,
    /// Statement coverage in percent (0..=100).
    pub coverage: f64,
    pub covered: u64,
    pub total: u64,
}

impl FileReport {
    /// Last path segment of the identifier, e.g. `file.go`.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Name of the rendered content page: source extension replaced by `.html`.
    /// A file whose stem is `index` keeps its extension so its page never
    /// replaces the folder's `index.html`.
    #[must_use]
    pub fn page_name(&self) -> String {
        let base = self.file_name();
        let stem = match base.rfind('.') {
            Some(dot) if dot > 0 => &base[..dot],
            _ => base,
        };
        if !stem.eq_ignore_ascii_case("index") {
            format!("{stem}.html")
        } else if stem.len() < base.len() {
            format!("{base}.html")
        } else {
            format!("{base}.src.html")
        }
    }
}

/// The three independent views of a folder's coverage. `None` is the
/// "no data" sentinel: no own files for `files`, no subfolders for
/// `folders`, and no files anywhere in the subtree for `total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateCoverage {
    /// Mean of this folder's own file coverages.
    pub files: Option<f64>,
    /// Mean of the direct subfolders' `total`s.
    pub folders: Option<f64>,
    /// Mean over every file in the subtree.
    pub total: Option<f64>,
}

/// Badge colour bucket for a coverage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageClass {
    Success,
    Alert,
    Error,
    None,
}

impl CoverageClass {
    #[must_use]
    pub fn of(coverage: Option<f64>) -> Self {
        match coverage {
            None => CoverageClass::None,
            Some(c) if c > 80.0 => CoverageClass::Success,
            Some(c) if c > 30.0 => CoverageClass::Alert,
            Some(_) => CoverageClass::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageClass::Success => "success",
            CoverageClass::Alert => "alert",
            CoverageClass::Error => "error",
            CoverageClass::None => "none",
        }
    }
}

impl fmt::Display for CoverageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a percentage the way every report page shows it.
#[must_use]
pub fn format_percent(coverage: Option<f64>) -> String {
    match coverage {
        Some(c) => format!("{c:.1}%"),
        None => "-".to_string(),
    }
}
