mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use covtree::config::IgnoreRules;
use covtree::error::CovtreeError;
use covtree::locate::Package;
use covtree::report::{self, ReportOptions};

use common::{Project, StaticLister};

fn options(project: &Project) -> ReportOptions {
    ReportOptions {
        output_dir: project.output(),
        working_dir: project.root().to_path_buf(),
        ignore: IgnoreRules::default(),
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

/// Every file under `dir` with its bytes, keyed by path relative to `dir`.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let bytes = fs::read(&path).unwrap();
                files.insert(path.strip_prefix(dir).unwrap().to_path_buf(), bytes);
            }
        }
    }
    files
}

/// Full pipeline: profile on disk → resolved sources → written site.
#[test]
fn generate_writes_folder_and_file_pages() {
    common::init_logging();
    let project = Project::new();

    let outcome = report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap();

    assert_eq!(outcome.folders, 3);
    assert_eq!(outcome.files, 3);
    assert_eq!(outcome.ignored, 0);
    assert_eq!(outcome.writes.pages_written, 6);
    assert_eq!(outcome.writes.pages_failed, 0);
    assert!((outcome.coverage.unwrap() - 110.0 / 3.0).abs() < 1e-9);

    let out = project.output();
    for page in [
        "index.html",
        "main.html",
        "calc/index.html",
        "calc/calc.html",
        "internal/util/index.html",
        "internal/util/util.html",
    ] {
        assert!(out.join(page).is_file(), "missing {page}");
    }
    assert!(!out.join("internal/index.html").exists());
}

#[test]
fn root_index_shows_aggregates_and_links() {
    let project = Project::new();
    report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap();

    let root = read(&project.output().join("index.html"));
    assert!(root.contains(r#"<p class="coverage-text coverage-alert">Total: 36.7%</p>"#));
    assert!(root.contains(r#"<p class="coverage-text coverage-error">Files: 0.0%</p>"#));
    assert!(root.contains(r#"<p class="coverage-text coverage-alert">Folders: 55.0%</p>"#));
    assert!(root.contains(r#"<a href="calc/index.html">calc</a>"#));
    assert!(root.contains(r#"<a href="internal/util/index.html">internal/util</a>"#));
    assert!(root.contains(r#"<a href="./main.html">main.go</a>"#));
    assert!(!root.contains("&larr;"));

    let util = read(&project.output().join("internal/util/index.html"));
    assert!(util.contains(r#"<a href="../../index.html">&larr;</a>"#));
    assert!(util.contains(r#"<a href="./util.html">util.go</a>"#));
    assert!(util.contains("Total: 60.0%"));
    assert!(util.contains("Folders: -"));
}

#[test]
fn content_page_is_annotated_and_escaped() {
    let project = Project::new();
    report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap();

    let util = read(&project.output().join("internal/util/util.html"));
    assert!(util.contains("3/5 statements"));
    assert!(util.contains(r#"<span class="cov10" title="10">"#));
    assert!(util.contains(r#"<span class="cov0" title="0">"#));
    assert!(util.contains("v &lt; lo"));
    assert!(util.contains("v &gt; hi"));
    assert!(!util.contains('\t'));
    let opened = util.matches("<span class=\"cov").count();
    let numbered = util.matches("<span class=\"line-no\">").count();
    assert_eq!(opened + numbered, util.matches("</span>").count());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let project = Project::new();
    let opts = options(&project);
    report::generate(&project.profile(), &project.lister(), &opts).unwrap();
    let first = snapshot(&project.output());
    assert_eq!(first.len(), 6);

    report::generate(&project.profile(), &project.lister(), &opts).unwrap();
    let second = snapshot(&project.output());
    assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
    for (page, bytes) in &first {
        assert!(second[page] == *bytes, "{} changed between runs", page.display());
    }
}

#[test]
fn index_source_keeps_folder_page() {
    let project = Project::new();
    fs::write(
        project.root().join("calc/index.go"),
        "package calc\n\nfunc Index() {\n}\n",
    )
    .unwrap();
    let mut profile = read(&project.profile());
    profile.push_str("example.com/m/calc/index.go:3.14,4.2 1 1\n");
    fs::write(project.profile(), profile).unwrap();

    let outcome = report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap();
    assert_eq!(outcome.writes.pages_written, 7);

    let folder = read(&project.output().join("calc/index.html"));
    assert!(folder.contains(r#"<a href="./calc.html">calc.go</a>"#));
    assert!(folder.contains(r#"<a href="./index.go.html">index.go</a>"#));
    assert!(!folder.contains("func Index"));

    let page = read(&project.output().join("calc/index.go.html"));
    assert!(page.contains("func Index()"));
}

#[test]
fn ignored_folders_and_files_are_left_out() {
    let project = Project::new();
    let opts = ReportOptions {
        ignore: IgnoreRules::new(&["internal/util".to_string(), "main.go".to_string()]),
        ..options(&project)
    };

    let outcome = report::generate(&project.profile(), &project.lister(), &opts).unwrap();

    assert_eq!(outcome.files, 1);
    assert_eq!(outcome.ignored, 2);
    assert_eq!(outcome.coverage, Some(50.0));
    assert!(!project.output().join("internal").exists());
    assert!(!project.output().join("main.html").exists());
    // no folder at the top level any more, so a landing page links the root
    let landing = read(&project.output().join("index.html"));
    assert!(landing.contains(r#"<a href="calc/index.html">calc</a>"#));
}

#[test]
fn unknown_package_is_reported() {
    let project = Project::new();
    let lister = StaticLister { packages: vec![] };

    let err = report::generate(&project.profile(), &lister, &options(&project)).unwrap_err();
    assert!(matches!(err, CovtreeError::PackageNotFound(_)), "{err}");
}

#[test]
fn package_error_is_reported() {
    let project = Project::new();
    let lister = StaticLister {
        packages: vec![Package {
            import_path: "example.com/m/calc".to_string(),
            dir: String::new(),
            error: Some(covtree::locate::PackageError {
                err: "no Go files".to_string(),
            }),
        }],
    };

    let err = report::generate(&project.profile(), &lister, &options(&project)).unwrap_err();
    match err {
        CovtreeError::PackageResolution { package, message } => {
            assert_eq!(package, "example.com/m/calc");
            assert_eq!(message, "no Go files");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_source_is_a_read_error() {
    let project = Project::new();
    fs::remove_file(project.root().join("calc/calc.go")).unwrap();

    let err = report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap_err();
    match err {
        CovtreeError::FileRead { path, .. } => assert!(path.ends_with("calc/calc.go")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_profile_is_a_parse_error() {
    let project = Project::new();
    fs::write(project.profile(), "mode: count\nexample.com/m/main.go:3.13,5.2 1\n").unwrap();

    let err = report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap_err();
    assert!(matches!(err, CovtreeError::Parse { line: 2, .. }), "{err}");
}

#[test]
fn empty_profile_writes_nothing() {
    let project = Project::new();
    fs::write(project.profile(), "mode: set\n").unwrap();

    let outcome = report::generate(&project.profile(), &project.lister(), &options(&project)).unwrap();
    assert_eq!(outcome.files, 0);
    assert_eq!(outcome.coverage, None);
    assert_eq!(outcome.writes.pages_written, 0);
}

#[test]
fn relative_identifiers_skip_package_lookup() {
    let project = Project::new();
    fs::write(
        project.profile(),
        "mode: set\n./calc/calc.go:3.24,5.2 1 1\n./calc/calc.go:7.24,9.2 1 1\n",
    )
    .unwrap();
    let lister = StaticLister { packages: vec![] };

    let outcome = report::generate(&project.profile(), &lister, &options(&project)).unwrap();
    assert_eq!(outcome.coverage, Some(100.0));
    assert!(project.output().join("calc/calc.html").is_file());
}
