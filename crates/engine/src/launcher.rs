// SPDX-License-Identifier: MIT

//! Child launcher: builds argv/environment/fds, forks, applies attributes
//! (uid/gid/chroot/cwd/rlimits/stdio) in the child, execs, and reports
//! exec failures back to the parent via a one-shot pipe (spec.md §4.3's
//! Starting/Running states, §9's fork-then-straight-line-child note).
//!
//! [`launch`] takes owned copies of everything the child needs before
//! forking — the child path touches no shared mutable state and ends in
//! either `execve` or `_exit`, per spec.md §9: "the child must not execute
//! any handler callbacks between fork and execve."

use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::resource::setrlimit;
use nix::unistd::{
    chdir, chroot, close, dup2, execve, fork, pipe, setgid, setgroups, setsid, setuid, write, ForkResult, Gid,
    Pid, Uid,
};
use thiserror::Error;

use crate::rlimit::RlimitKind;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("fork failed: {0}")]
    Fork(Errno),
    #[error("pipe failed: {0}")]
    Pipe(Errno),
}

/// Attributes applied to the child between `fork` and `execve`.
pub struct ChildSetup {
    pub program: CString,
    pub argv: Vec<CString>,
    pub envp: Vec<CString>,
    pub working_directory: Option<CString>,
    pub root_directory: Option<CString>,
    pub uid: Option<Uid>,
    pub gid: Option<Gid>,
    pub init_groups: bool,
    pub session_create: bool,
    pub umask: Option<u32>,
    pub low_priority_io: bool,
    pub nice: Option<i32>,
    /// Paths to open (create/append) and `dup2` onto fd 1 / fd 2. `None`
    /// leaves the inherited stdio fd alone.
    pub stdout_path: Option<CString>,
    pub stderr_path: Option<CString>,
    pub rlimits: Vec<(RlimitKind, u64, u64)>,
    /// Descriptors the child should keep open at their current numbers
    /// (socket-activation fds); cloexec is cleared on each.
    pub inherited_fds: Vec<RawFd>,
}

pub struct Launched {
    pub pid: Pid,
    /// The supervisor's read end of the exec-failure pipe.
    pub exec_fd: OwnedFd,
}

/// Forks and execs per `setup`. Only fork failure is reported here;
/// everything after fork is observed by the caller via the process-exit
/// event and `exec_fd`'s readability (spec.md §7).
pub fn launch(setup: ChildSetup) -> Result<Launched, LaunchError> {
    let (read_end, write_end) = pipe().map_err(LaunchError::Pipe)?;
    set_cloexec(write_end.as_raw_fd());

    // SAFETY: the child only calls async-signal-safe syscalls (or ones
    // documented safe post-fork-pre-exec: chdir, setuid/setgid, dup2,
    // setrlimit, execve) before exiting; `setup` is owned so nothing
    // shared with the parent's heap is touched.
    match unsafe { fork() }.map_err(LaunchError::Fork)? {
        ForkResult::Parent { child } => {
            drop(write_end);
            Ok(Launched {
                pid: child,
                exec_fd: read_end,
            })
        }
        ForkResult::Child => {
            drop(read_end);
            run_child(setup, write_end);
        }
    }
}

/// Straight-line child path: apply every attribute, then exec. On any
/// failure, write the errno to `report` and `_exit(127)`. Never returns.
fn run_child(setup: ChildSetup, report: OwnedFd) -> ! {
    if let Err(e) = apply_attributes(&setup) {
        report_and_exit(report, e);
    }

    let _ = execve(&setup.program, &setup.argv, &setup.envp);
    // execve only returns on failure.
    report_and_exit(report, Errno::last());
}

fn apply_attributes(setup: &ChildSetup) -> Result<(), Errno> {
    if setup.session_create {
        setsid().map_err(|_| Errno::last())?;
    }

    if let Some(root) = &setup.root_directory {
        chroot(root.as_c_str()).map_err(|_| Errno::last())?;
    }
    if let Some(cwd) = &setup.working_directory {
        chdir(cwd.as_c_str()).map_err(|_| Errno::last())?;
    } else if setup.root_directory.is_some() {
        chdir("/").map_err(|_| Errno::last())?;
    }

    if let Some(gid) = setup.gid {
        if setup.init_groups {
            // Best-effort supplementary groups; a failure here shouldn't
            // block launch the way a failed setgid/setuid should.
            let _ = setgroups(&[gid]);
        }
        setgid(gid).map_err(|_| Errno::last())?;
    }
    if let Some(uid) = setup.uid {
        setuid(uid).map_err(|_| Errno::last())?;
    }

    if let Some(mask) = setup.umask {
        // SAFETY: umask(2) is async-signal-safe and touches only this
        // process's state.
        unsafe {
            nix::libc::umask(mask as nix::libc::mode_t);
        }
    }

    if setup.low_priority_io {
        // SAFETY: ioprio_set via raw syscall; best-effort, failure is not
        // fatal to launch.
        unsafe {
            nix::libc::syscall(nix::libc::SYS_ioprio_set, 1 /* IOPRIO_WHO_PROCESS */, 0, 7 | (3 << 13));
        }
    }

    if let Some(nice) = setup.nice {
        // SAFETY: setpriority(2), async-signal-safe.
        unsafe {
            nix::libc::setpriority(nix::libc::PRIO_PROCESS, 0, nice as nix::libc::c_int);
        }
    }

    for (kind, soft, hard) in &setup.rlimits {
        setrlimit(kind.resource(), *soft, *hard).map_err(|_| Errno::last())?;
    }

    redirect_stdio(setup)?;

    for &fd in &setup.inherited_fds {
        clear_cloexec(fd);
    }

    Ok(())
}

fn redirect_stdio(setup: &ChildSetup) -> Result<(), Errno> {
    use nix::fcntl::{open, OFlag};
    use nix::sys::stat::Mode;

    if let Some(path) = &setup.stdout_path {
        let fd = open(path.as_c_str(), OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, Mode::from_bits_truncate(0o644))
            .map_err(|_| Errno::last())?;
        dup2(fd, 1).map_err(|_| Errno::last())?;
        let _ = close(fd);
    }
    if let Some(path) = &setup.stderr_path {
        let fd = open(path.as_c_str(), OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, Mode::from_bits_truncate(0o644))
            .map_err(|_| Errno::last())?;
        dup2(fd, 2).map_err(|_| Errno::last())?;
        let _ = close(fd);
    }
    Ok(())
}

fn report_and_exit(report: OwnedFd, errno: Errno) -> ! {
    let code = errno as i32;
    let bytes = code.to_ne_bytes();
    let _ = write(&report, &bytes);
    drop(report);
    // SAFETY: this is the async-signal-safe terminal step of the child
    // path; no destructors beyond what's already run matter past here.
    unsafe { nix::libc::_exit(127) }
}

fn set_cloexec(fd: RawFd) {
    if let Ok(flags) = fcntl(fd, FcntlArg::F_GETFD) {
        let _ = fcntl(fd, FcntlArg::F_SETFD(FdFlag::from_bits_truncate(flags) | FdFlag::FD_CLOEXEC));
    }
}

fn clear_cloexec(fd: RawFd) {
    if let Ok(flags) = fcntl(fd, FcntlArg::F_GETFD) {
        let _ = fcntl(fd, FcntlArg::F_SETFD(FdFlag::from_bits_truncate(flags) & !FdFlag::FD_CLOEXEC));
    }
}

/// Reads the exec-failure pipe after arming it for readability: `Ok(None)`
/// means EOF (the child exec'd successfully and the write end closed on
/// exec); `Ok(Some(errno))` means the child reported a failed `execve`.
pub fn read_exec_result(fd: &OwnedFd) -> nix::Result<Option<i32>> {
    let mut buf = [0u8; 4];
    let n = nix::unistd::read(fd.as_raw_fd(), &mut buf)?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(i32::from_ne_bytes(buf)))
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
