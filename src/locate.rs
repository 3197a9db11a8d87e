//! Resolution of profile file identifiers (`module/pkg/file.go`) to real
//! source paths, and of source paths to report-space folder locations.
//!
//! Package directories are looked up once, in a single batched
//! [`PackageLister`] call covering every package the profiles mention.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{CovtreeError, Result};
use crate::profile::Profile;

/// Metadata for one package, as reported by `go list -e -json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub import_path: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub error: Option<PackageError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageError {
    pub err: String,
}

/// Batched package metadata lookup.
pub trait PackageLister {
    /// List the packages with the given import paths in one query.
    fn list_packages(&self, import_paths: &[String]) -> Result<Vec<Package>>;
}

/// [`PackageLister`] backed by `go list -e -json`.
pub struct GoList {
    go: PathBuf,
    dir: PathBuf,
}

/// The `go` binary from `$GOROOT/bin` when set, else from `PATH`.
pub fn go_binary() -> PathBuf {
    std::env::var_os("GOROOT")
        .map(|root| PathBuf::from(root).join("bin").join("go"))
        .filter(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from("go"))
}

impl GoList {
    /// Run the query in `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            go: go_binary(),
            dir: dir.to_path_buf(),
        }
    }
}

impl PackageLister for GoList {
    fn list_packages(&self, import_paths: &[String]) -> Result<Vec<Package>> {
        info!("resolving {} package(s) with go list", import_paths.len());
        let output = Command::new(&self.go)
            .args(["list", "-e", "-json"])
            .args(import_paths)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| CovtreeError::Command(format!("cannot run go list: {e}")))?;
        if !output.status.success() {
            return Err(CovtreeError::Command(format!(
                "cannot run go list: {}\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        decode_package_stream(&output.stdout)
    }
}

/// `go list -json` prints one JSON object per package, back to back.
pub fn decode_package_stream(stdout: &[u8]) -> Result<Vec<Package>> {
    serde_json::Deserializer::from_slice(stdout)
        .into_iter::<Package>()
        .map(|pkg| pkg.map_err(CovtreeError::from))
        .collect()
}

/// Identifiers that are already filesystem paths skip package lookup.
fn is_path_like(file: &str) -> bool {
    file.starts_with('.') || Path::new(file).is_absolute()
}

fn package_of(file: &str) -> &str {
    file.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Maps profile identifiers to source files.
#[derive(Debug)]
pub struct SourceLocator {
    working_dir: PathBuf,
    packages: HashMap<String, Package>,
}

impl SourceLocator {
    /// Look up every package referenced by `profiles` in one batched call.
    pub fn new(profiles: &[Profile], lister: &dyn PackageLister, working_dir: &Path) -> Result<Self> {
        let wanted: BTreeSet<String> = profiles
            .iter()
            .map(|p| p.file_name.as_str())
            .filter(|f| !is_path_like(f))
            .map(|f| package_of(f).to_string())
            .collect();

        let packages = if wanted.is_empty() {
            HashMap::new()
        } else {
            let list: Vec<String> = wanted.into_iter().collect();
            lister
                .list_packages(&list)?
                .into_iter()
                .map(|pkg| (pkg.import_path.clone(), pkg))
                .collect()
        };
        debug!("package listing returned {} entries", packages.len());

        Ok(Self {
            working_dir: working_dir.to_path_buf(),
            packages,
        })
    }

    /// Absolute path of the source behind a profile identifier.
    pub fn resolve(&self, file: &str) -> Result<PathBuf> {
        if is_path_like(file) {
            return Ok(normalize(&self.working_dir.join(file)));
        }

        let package = package_of(file);
        let Some(pkg) = self.packages.get(package) else {
            return Err(CovtreeError::PackageNotFound(file.to_string()));
        };
        if !pkg.dir.is_empty() {
            let base = file.rsplit('/').next().unwrap_or(file);
            return Ok(PathBuf::from(&pkg.dir).join(base));
        }
        match &pkg.error {
            Some(e) => Err(CovtreeError::PackageResolution {
                package: package.to_string(),
                message: e.err.clone(),
            }),
            None => Err(CovtreeError::PackageNotFound(file.to_string())),
        }
    }
}

/// Drop `.` components and fold `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            c => out.push(c),
        }
    }
    out
}

/// Where a source file's folder sits in the report tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLocation {
    /// Report-space path, `/`-separated, empty for the top-level folder.
    pub relative: String,
    /// Filesystem directory, used for ancestry.
    pub absolute: PathBuf,
}

/// Report-space prefix for folders outside the working directory.
pub const EXTERNAL_PREFIX: &str = "_ext";

impl FolderLocation {
    /// Locate the folder of `file`. Folders under `working_dir` get a
    /// relative path with that prefix stripped; anything else keeps its full
    /// path minus the root, under [`EXTERNAL_PREFIX`], so it can never share
    /// a report folder with a project directory.
    pub fn of_file(file: &Path, working_dir: &Path) -> Self {
        let absolute = file.parent().map(Path::to_path_buf).unwrap_or_default();
        let (inner, external) = match absolute.strip_prefix(working_dir) {
            Ok(inner) => (inner, false),
            Err(_) => (absolute.as_path(), true),
        };
        let mut segments: Vec<String> = inner
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if external {
            segments.insert(0, EXTERNAL_PREFIX.to_string());
        }
        Self {
            relative: segments.join("/"),
            absolute,
        }
    }
}
