#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Once;

use covtree::error::Result;
use covtree::locate::{Package, PackageLister};
use tempfile::TempDir;

static LOGGER: Once = Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Answers package lookups from a fixed list, like `go list` would for a
/// module checked out under a temp dir.
pub struct StaticLister {
    pub packages: Vec<Package>,
}

impl PackageLister for StaticLister {
    fn list_packages(&self, import_paths: &[String]) -> Result<Vec<Package>> {
        Ok(import_paths
            .iter()
            .map(|path| {
                self.packages
                    .iter()
                    .find(|p| &p.import_path == path)
                    .cloned()
                    .unwrap_or_else(|| Package {
                        import_path: path.clone(),
                        ..Package::default()
                    })
            })
            .collect())
    }
}

pub const MAIN_GO: &str = "package main

func main() {
\tprintln(Add(1, 2))
}
";

pub const CALC_GO: &str = "package calc

func Add(a, b int) int {
\treturn a + b
}

func Sub(a, b int) int {
\treturn a - b
}
";

pub const UTIL_GO: &str = "package util

func Clamp(v, lo, hi int) int {
\tif v < lo {
\t\treturn lo
\t}
\tif v > hi {
\t\treturn hi
\t}
\treturn v
}
";

/// Profile for the sample module at `example.com/m`:
/// `main.go` 0%, `calc/calc.go` 50%, `internal/util/util.go` 60%.
pub const PROFILE: &str = "mode: count
example.com/m/main.go:3.13,5.2 1 0
example.com/m/calc/calc.go:3.24,5.2 1 4
example.com/m/calc/calc.go:7.24,9.2 1 0
example.com/m/internal/util/util.go:3.31,4.12 1 10
example.com/m/internal/util/util.go:4.12,6.3 1 0
example.com/m/internal/util/util.go:7.2,7.12 1 10
example.com/m/internal/util/util.go:7.12,9.3 1 0
example.com/m/internal/util/util.go:10.2,10.10 1 10
";

/// A temporary Go module with three packages. `internal/util` has no
/// `internal` folder above it in the report.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("calc")).unwrap();
        std::fs::create_dir_all(root.join("internal/util")).unwrap();
        std::fs::write(root.join("go.mod"), "module example.com/m\n").unwrap();
        std::fs::write(root.join("main.go"), MAIN_GO).unwrap();
        std::fs::write(root.join("calc/calc.go"), CALC_GO).unwrap();
        std::fs::write(root.join("internal/util/util.go"), UTIL_GO).unwrap();
        std::fs::write(root.join("coverage.out"), PROFILE).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn profile(&self) -> PathBuf {
        self.root().join("coverage.out")
    }

    pub fn output(&self) -> PathBuf {
        self.root().join("coverage")
    }

    pub fn lister(&self) -> StaticLister {
        let package = |import_path: &str, dir: &str| Package {
            import_path: import_path.to_string(),
            dir: self.root().join(dir).to_string_lossy().into_owned(),
            error: None,
        };
        StaticLister {
            packages: vec![
                package("example.com/m", ""),
                package("example.com/m/calc", "calc"),
                package("example.com/m/internal/util", "internal/util"),
            ],
        }
    }
}
