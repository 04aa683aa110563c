use log::{debug, trace};
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

pub use sysinfo::Signal;

#[track_caller]
pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid).map(f)
}

pub(crate) fn format_command(argv: &[String]) -> String {
    argv.join(" ")
}

/// Whether `pid` names a running (not zombie, not dead) process.
pub fn is_process_alive(pid: u32) -> bool {
    with_process(pid, |p| {
        !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
    })
    .unwrap_or(false)
}

/// Deliver `signal` to `pid`, best effort.
///
/// Never fails: a missing process, an unsupported signal or a refused
/// delivery all return `false`. PIDs 0 and 1 are never signalled.
pub fn signal_pid(pid: u32, signal: Signal) -> bool {
    if pid <= 1 {
        debug!("Refusing to signal PID {pid}");
        return false;
    }

    with_process(pid, |p| match p.kill_with(signal) {
        Some(sent) => {
            debug!("Sent {signal:?} to PID {pid}: success={sent}");
            sent
        }
        None => {
            trace!("{signal:?} not supported on this platform");
            false
        }
    })
    .unwrap_or_else(|| {
        debug!("Process {pid} not found");
        false
    })
}
