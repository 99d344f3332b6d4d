use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

/// Opens the authorize URL in the user's browser.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), String>;
}

/// Platform opener: `open` on macOS, `cmd /C start` on Windows, `xdg-open` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), String> {
        let mut command = if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(url);
            c
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]).arg(url);
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(url);
            c
        };
        spawn_reaped(&mut command).map(|_| ())
    }
}

/// Spawn `command` with null stdio and wait on it from a detached thread,
/// so the launcher never lingers as a zombie.
fn spawn_reaped(command: &mut Command) -> Result<JoinHandle<io::Result<ExitStatus>>, String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| e.to_string())?;
    Ok(std::thread::spawn(move || {
        let status = child.wait();
        if let Err(err) = &status {
            tracing::debug!(error = %err, "browser launcher wait failed");
        }
        status
    }))
}
