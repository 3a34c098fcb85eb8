//! Child process lifecycle for external tools
//!
//! Package managers, archive tools and the HDL installer run as children of
//! the installer. If the operator interrupts the run, those children must not
//! keep mutating the system behind our back, so:
//!
//! - every child gets a parent-death signal (`PR_SET_PDEATHSIG`)
//! - non-interactive children are put in their own process group
//! - live PIDs are tracked in a global registry
//! - SIGINT/SIGTERM/SIGHUP terminate tracked children, SIGTERM first and
//!   SIGKILL after a grace period, then the installer exits with 128+signal
//!
//! Interactive children (sudo password prompts, the HDL installer) stay in the
//! terminal's foreground process group so they can read from the tty.
//!
//! Nothing here undoes installation work; an interrupted run leaves whatever
//! state the completed steps produced.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child processes
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }

        tracing::info!("Terminating {} child process(es)...", self.pids.len());

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            // Group signal reaches grandchildren (dpkg under apt-get, tar under sudo)
            if send_signal_to_group(pid, Signal::SIGTERM).is_err() {
                if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                    tracing::warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                tracing::info!("All child processes terminated");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_process_alive(pid) {
                tracing::warn!("Process {} did not terminate, sending SIGKILL", pid);
                if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/pid/stat is the state; Z and X are not running
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// Install SIGINT/SIGTERM/SIGHUP handlers that terminate tracked children.
/// Call this once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            tracing::info!("Received {}, stopping child processes", signal_name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` lifecycle setup
pub trait ChildLifecycle {
    /// Deliver SIGTERM to the child if the installer dies first
    fn dies_with_parent(&mut self) -> &mut Self;

    /// Run the child as leader of its own process group (non-interactive only)
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl ChildLifecycle for std::process::Command {
    fn dies_with_parent(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no allocator state
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }

    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0)
    }
}
