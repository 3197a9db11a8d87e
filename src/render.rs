//! Static HTML output for a [`ReportTree`]: one `index.html` per folder and
//! one page per source file, laid out under the output root the same way the
//! folders are laid out in the project.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::annotate::escape_html;
use crate::error::{CovtreeError, Result};
use crate::model::{format_percent, CoverageClass, FileReport};
use crate::tree::{FolderId, ReportTree};

const INDEX: &str = "index.html";

/// Outcome of writing a report to disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub pages_written: usize,
    pub pages_failed: usize,
}

fn base_css() -> &'static str {
    r#"
body {
    background: rgb(29, 29, 29);
    color: rgb(150, 150, 150);
    margin: 0 16px;
}
body, pre {
    font-family: Menlo, Consolas, monospace;
    font-weight: bold;
}
a {
    color: rgb(124, 152, 255);
    text-decoration: none;
}
table {
    width: 100%;
    border-collapse: collapse;
}
td {
    padding: 3px 0;
}
.name-td {
    width: 350px;
}
.title {
    display: flex;
    align-items: center;
    column-gap: 10px;
    font-size: 12px;
}
.coverage-header {
    height: 40px;
    display: flex;
    align-items: center;
    column-gap: 10px;
    border-bottom: 1px solid rgb(113, 113, 113);
    margin-bottom: 12px;
}
.coverage-text {
    color: black;
    padding: 2px 5px;
}
.coverage-error { background-color: rgb(229, 85, 85); }
.coverage-alert { background-color: rgb(220, 207, 104); }
.coverage-success { background-color: rgb(57, 220, 57); }
.coverage-none { background-color: rgb(113, 113, 113); }
.line-no { color: rgb(80, 80, 80); user-select: none; }
.cov0 { color: rgb(192, 0, 0); }
"#
}

/// `.cov1` (rarely run) to `.cov10` (hottest) shade from grey to green.
fn intensity_css() -> String {
    let mut css = String::new();
    for bucket in 1..=10u32 {
        let step = bucket - 1;
        let (r, g, b) = (128 - 12 * step, 128 + 12 * step, 128 + 3 * step);
        writeln!(css, ".cov{bucket} {{ color: rgb({r}, {g}, {b}); }}").unwrap();
    }
    css
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{base}{intensity}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        base = base_css(),
        intensity = intensity_css(),
    )
}

fn badge(label: &str, coverage: Option<f64>) -> String {
    format!(
        r#"<p class="coverage-text coverage-{class}">{label}{value}</p>"#,
        class = CoverageClass::of(coverage),
        value = format_percent(coverage),
    )
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Link from the index page of folder `from` to the index page of folder
/// `to`, both given as report-relative paths.
#[must_use]
pub fn index_href(from: &str, to: &str) -> String {
    let from = segments(from);
    let to = segments(to);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut href = "../".repeat(from.len() - common);
    for segment in &to[common..] {
        href.push_str(segment);
        href.push('/');
    }
    href.push_str(INDEX);
    href
}

fn folder_label(relative_path: &str) -> &str {
    if relative_path.is_empty() {
        "/"
    } else {
        relative_path
    }
}

fn folder_rows(tree: &ReportTree, from: &str, ids: &[FolderId]) -> String {
    let mut rows = String::new();
    for &id in ids {
        let folder = tree.folder(id);
        let total = tree.subtree_total(id);
        writeln!(
            rows,
            r#"<tr><td class="name-td"><a href="{href}">{name}</a></td><td><span class="coverage-text coverage-{class}">{pct}</span></td></tr>"#,
            href = escape_html(&index_href(from, &folder.relative_path)),
            name = escape_html(folder_label(&folder.relative_path)),
            class = CoverageClass::of(total),
            pct = format_percent(total),
        )
        .unwrap();
    }
    rows
}

/// Render the index page of one folder.
#[must_use]
pub fn render_index(tree: &ReportTree, id: FolderId) -> String {
    let folder = tree.folder(id);
    let coverage = tree.coverage(id);
    let mut body = String::new();

    body.push_str(r#"<div class="title">"#);
    if let Some(parent) = folder.parent {
        let href = index_href(&folder.relative_path, &tree.folder(parent).relative_path);
        write!(body, r#"<a href="{}">&larr;</a>"#, escape_html(&href)).unwrap();
    }
    write!(body, "<p>{}</p></div>\n", escape_html(folder_label(&folder.relative_path))).unwrap();

    writeln!(
        body,
        r#"<div class="coverage-header"><p>Coverage</p>{}{}{}</div>"#,
        badge("Total: ", coverage.total),
        badge("Files: ", coverage.files),
        badge("Folders: ", coverage.folders),
    )
    .unwrap();

    if !folder.subfolders.is_empty() {
        writeln!(
            body,
            "<table><tbody>\n<tr><td class=\"name-td\">Subfolders</td><td>Coverage</td></tr>\n{}</tbody></table>\n<br/>",
            folder_rows(tree, &folder.relative_path, &folder.subfolders)
        )
        .unwrap();
    }

    body.push_str("<table><tbody>\n<tr><td class=\"name-td\">Files</td><td>Coverage</td></tr>\n");
    for file in &folder.files {
        writeln!(
            body,
            r#"<tr><td class="name-td"><a href="./{href}">{name}</a></td><td><span class="coverage-text coverage-{class}">{pct}</span></td></tr>"#,
            href = escape_html(&file.page_name()),
            name = escape_html(file.file_name()),
            class = CoverageClass::of(Some(file.coverage)),
            pct = format_percent(Some(file.coverage)),
        )
        .unwrap();
    }
    body.push_str("</tbody></table>");

    page(folder_label(&folder.relative_path), &body)
}

/// Render the root landing page used when no folder sits at the top level.
#[must_use]
pub fn render_landing(tree: &ReportTree) -> String {
    let mut body = String::new();
    writeln!(
        body,
        r#"<div class="title"><p>/</p></div>
<div class="coverage-header"><p>Coverage</p>{}</div>"#,
        badge("Total: ", tree.overall())
    )
    .unwrap();
    writeln!(
        body,
        "<table><tbody>\n<tr><td class=\"name-td\">Folders</td><td>Coverage</td></tr>\n{}</tbody></table>",
        folder_rows(tree, "", tree.roots())
    )
    .unwrap();
    page("/", &body)
}

/// Render the annotated source page of one file.
#[must_use]
pub fn render_content(file: &FileReport) -> String {
    let mut lines: Vec<&str> = file.body.split('\n').collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }
    let width = lines.len().to_string().len();

    let mut numbered = String::with_capacity(file.body.len() + lines.len() * (width + 32));
    for (i, line) in lines.iter().enumerate() {
        writeln!(
            numbered,
            r#"<span class="line-no">{:>width$}</span>    {line}"#,
            i + 1
        )
        .unwrap();
    }

    let body = format!(
        r#"<div class="title"><a href="./{INDEX}">&larr;</a><p>{name}</p></div>
<div class="coverage-header">{badge}<p>{covered}/{total} statements</p></div>
<pre>{numbered}</pre>"#,
        name = escape_html(&file.name),
        badge = badge("Coverage: ", Some(file.coverage)),
        covered = file.covered,
        total = file.total,
    );
    page(&file.name, &body)
}

/// Output directory of a folder's pages.
#[must_use]
pub fn folder_dir(out_dir: &Path, relative_path: &str) -> PathBuf {
    segments(relative_path)
        .into_iter()
        .fold(out_dir.to_path_buf(), |dir, segment| dir.join(segment))
}

fn write_page(path: &Path, contents: &str) -> Result<()> {
    let to_error = |source| CovtreeError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(to_error)?;
    }
    fs::write(path, contents).map_err(to_error)
}

/// Write every page of the tree under `out_dir`. A page that fails to write
/// is logged and counted; the remaining pages are still written.
pub fn write_report(tree: &ReportTree, out_dir: &Path) -> WriteSummary {
    let mut summary = WriteSummary::default();
    let mut record = |path: PathBuf, contents: String| match write_page(&path, &contents) {
        Ok(()) => {
            debug!("wrote {}", path.display());
            summary.pages_written += 1;
        }
        Err(e) => {
            error!("{e}");
            summary.pages_failed += 1;
        }
    };

    for (id, folder) in tree.folders().iter().enumerate() {
        let dir = folder_dir(out_dir, &folder.relative_path);
        record(dir.join(INDEX), render_index(tree, id));
        for file in &folder.files {
            record(dir.join(file.page_name()), render_content(file));
        }
    }
    if tree.find("").is_none() && !tree.roots().is_empty() {
        record(out_dir.join(INDEX), render_landing(tree));
    }

    info!(
        "wrote {} page(s) to {} ({} failed)",
        summary.pages_written,
        out_dir.display(),
        summary.pages_failed
    );
    summary
}
