//! Opening the generated report in the user's browser.

use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

/// How long an opener may keep running before it is assumed to have handed
/// the URL to a browser.
const GRACE: Duration = Duration::from_secs(3);

/// Candidate opener commands, `$BROWSER` first.
fn openers(browser_env: Option<String>) -> Vec<Vec<String>> {
    let mut cmds = Vec::new();
    if let Some(browser) = browser_env.filter(|b| !b.trim().is_empty()) {
        cmds.push(vec![browser]);
    }
    if cfg!(target_os = "macos") {
        cmds.push(vec!["open".to_string()]);
    } else if cfg!(windows) {
        cmds.push(vec![
            "cmd".to_string(),
            "/c".to_string(),
            "start".to_string(),
        ]);
    } else {
        cmds.push(vec!["xdg-open".to_string()]);
    }
    cmds
}

/// Try to open `url` and report whether it succeeded.
pub fn open(url: &str) -> bool {
    for cmd in openers(std::env::var("BROWSER").ok()) {
        debug!("opening {url} with {}", cmd.join(" "));
        let child = Command::new(&cmd[0]).args(&cmd[1..]).arg(url).spawn();
        match child {
            Ok(mut child) => {
                if appears_successful(&mut child, GRACE) {
                    return true;
                }
            }
            Err(e) => debug!("{} failed to start: {e}", cmd[0]),
        }
    }
    warn!("could not open {url} in a browser");
    false
}

/// An opener that exits cleanly, or is still running after `timeout`, is
/// treated as a success.
fn appears_successful(child: &mut std::process::Child, timeout: Duration) -> bool {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) if started.elapsed() >= timeout => return true,
            Ok(None) => thread::sleep(Duration::from_millis(50)),
            Err(_) => return false,
        }
    }
}
