#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let report = covtree::testlog::TestReport::parse(s);
        let _ = report.render(covtree::config::OutputStyle::Testname);
    }
});
