use std::process::{Child, Command, Stdio};

use tracing::debug;

/// Keeps the machine awake while alive, by holding a `systemd-inhibit` lock.
/// The lock is released when the guard is dropped, on every exit path.
pub struct InhibitGuard {
    child: Child,
}

impl InhibitGuard {
    /// Best effort: `None` when `systemd-inhibit` is unavailable.
    pub fn acquire(reason: &str) -> Option<Self> {
        let spawned = Command::new("systemd-inhibit")
            .arg("--what=idle:sleep")
            .arg(format!("--who={}", env!("CARGO_PKG_NAME")))
            .arg(format!("--why={}", reason))
            .args(["sleep", "infinity"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                debug!("Screen lock inhibited (pid {})", child.id());
                Some(InhibitGuard { child })
            }
            Err(e) => {
                debug!("Could not inhibit screen lock: {}", e);
                None
            }
        }
    }
}

impl Drop for InhibitGuard {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Inhibitor already gone: {}", e);
        }
        let _ = self.child.wait();
    }
}
