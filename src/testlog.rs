//! Scraping of `go test -v` output into package/test results, including the
//! failure traces printed by testify assertions.

use std::fmt::Write;
use std::sync::OnceLock;

use console::style;
use regex::Regex;

use crate::config::OutputStyle;

/// Result of a single test function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub time: String,
}

/// Result line of a package (`ok` / `FAIL`) with the tests reported before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageResult {
    pub name: String,
    pub passed: bool,
    pub time: String,
    pub tests: Vec<TestResult>,
}

/// A testify failure trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestTrace {
    pub test_name: String,
    pub file_name: String,
    pub line_number: String,
    pub error_name: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub packages: Vec<PackageResult>,
    pub traces: Vec<TestTrace>,
}

fn unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"--- (PASS|FAIL): (\S+) \(([^)]*)\)").expect("unit pattern is valid")
    })
}

impl TestReport {
    pub fn parse(raw: &str) -> Self {
        let lines: Vec<&str> = raw.lines().collect();
        let mut report = TestReport::default();
        let mut units: Vec<TestResult> = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            let head = fields[0].trim();

            if fields.len() == 3 && (head == "ok" || head == "FAIL") {
                report.packages.push(PackageResult {
                    name: fields[1].trim().to_string(),
                    passed: head == "ok",
                    time: fields[2].trim().to_string(),
                    tests: std::mem::take(&mut units),
                });
            } else if let Some(caps) = unit_regex().captures(line) {
                units.push(TestResult {
                    name: caps[2].to_string(),
                    passed: &caps[1] == "PASS",
                    time: caps[3].to_string(),
                });
            } else if line.contains("Error Trace:") {
                report.traces.push(parse_trace(&lines[i..]));
            }
        }

        report
    }

    pub fn package_counts(&self) -> (usize, usize) {
        let failed = self.packages.iter().filter(|p| !p.passed).count();
        (failed, self.packages.len())
    }

    pub fn test_counts(&self) -> (usize, usize) {
        let tests = self.packages.iter().flat_map(|p| &p.tests);
        let (failed, total) = tests.fold((0, 0), |(f, t), test| (f + usize::from(!test.passed), t + 1));
        (failed, total)
    }

    pub fn all_passed(&self) -> bool {
        self.packages.iter().all(|p| p.passed)
    }

    /// Human-readable summary, coloured when the terminal supports it.
    pub fn render(&self, output: OutputStyle) -> String {
        let mut out = String::new();
        let name_width = self
            .packages
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);

        for pkg in &self.packages {
            let status = if pkg.passed {
                style("✓").green()
            } else {
                style("x").red()
            };
            writeln!(out, "{status}   {:<name_width$}   {}", pkg.name, pkg.time).unwrap();

            if output == OutputStyle::Testname {
                for test in &pkg.tests {
                    let status = if test.passed {
                        style("PASS").green()
                    } else {
                        style("FAIL").red()
                    };
                    writeln!(out, "|___ {status}   > {}   {}", test.name, test.time).unwrap();
                }
            }
        }

        if !self.traces.is_empty() {
            out.push_str("-----------------------\n\nError Traces\n");
            for t in &self.traces {
                writeln!(out, "{}", style(format!(" - {} -> {}", t.test_name, t.error_name)).red()).unwrap();
                writeln!(out, "{}", style(format!("\tExpected\t{}", t.expected)).yellow()).unwrap();
                writeln!(out, "{}", style(format!("\tActual  \t{}", t.actual)).red()).unwrap();
                writeln!(out, "\tFile    \t{}", t.file_name).unwrap();
                writeln!(out, "\tLine    \t{}\n", t.line_number).unwrap();
            }
            out.push_str("-----------------------\n");
        }

        out.push_str("--------------------\nSummary\n");
        if self.all_passed() {
            writeln!(out, "{}", style("All Passed").green()).unwrap();
        } else {
            let (failed, total) = match output {
                OutputStyle::Package => self.package_counts(),
                OutputStyle::Testname => self.test_counts(),
            };
            writeln!(
                out,
                "{}",
                style(format!("{failed} test(s) failed out of {total}")).red()
            )
            .unwrap();
        }
        out
    }
}

/// Read one testify trace starting at its `Error Trace:` line and ending at
/// the `Test:` line.
fn parse_trace(lines: &[&str]) -> TestTrace {
    let mut trace = TestTrace::default();

    if let Some(location) = lines[0].split('\t').nth(2) {
        let location = location.trim();
        match location.rsplit_once(':') {
            Some((file, line)) => {
                trace.file_name = file.to_string();
                trace.line_number = line.to_string();
            }
            None => trace.file_name = location.to_string(),
        }
    }

    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }
        let (label, value) = (fields[1].trim(), fields[2]);

        if label == "Error:" {
            trace.error_name = value.replace(':', "").trim().to_string();
        } else if label == "Test:" {
            trace.test_name = value.trim().to_string();
            break;
        } else if value.contains("expected:") {
            trace.expected = after_colon(value);
        } else if value.contains("actual  :") {
            trace.actual = after_colon(value);
        }
    }
    trace
}

fn after_colon(value: &str) -> String {
    value
        .split_once(": ")
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default()
}
