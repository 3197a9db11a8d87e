#![no_main]
use libfuzzer_sys::fuzz_target;

// First line is a profile body for `f.go`, the rest is the source it covers.
fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let (head, src) = data.split_at(split);
    let Ok(head) = std::str::from_utf8(head) else {
        return;
    };
    let Ok(profiles) = covtree::profile::parse(&format!("mode: count\n{head}\n")) else {
        return;
    };
    for profile in &profiles {
        let boundaries = profile.boundaries(src);
        // boundaries derived from the source always annotate cleanly
        covtree::annotate::annotate(src, &boundaries).unwrap();
    }
});
