//! UI companion subprocess supervision, started on `startui`/`stopui`
//! control-plane messages. Mirrors the process-group isolation and
//! graceful-then-forceful shutdown the rest of this tree uses for child
//! processes.

use tokio::process::{Child, Command};
use tracing::{info, warn};

pub(crate) struct UiSupervisor {
    child: Option<Child>,
}

impl UiSupervisor {
    pub(crate) fn new() -> Self {
        Self { child: None }
    }

    pub(crate) fn start(&mut self, program: &str, args: &[String]) {
        if self.child.is_some() {
            info!("ui subprocess already running, ignoring startui");
            return;
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        match cmd.spawn() {
            Ok(child) => self.child = Some(child),
            Err(err) => warn!("failed to start ui subprocess: {err}"),
        }
    }

    pub(crate) async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGTERM);
            }
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            if child.try_wait().ok().flatten().is_none() {
                unsafe {
                    libc::kill(-(pid as i32), libc::SIGKILL);
                }
            }
        }
        #[cfg(not(unix))]
        let _ = child.kill().await;

        let _ = child.wait().await;
    }
}
