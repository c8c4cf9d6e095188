// SPDX-License-Identifier: MIT

//! Transferring [`OwnedFd`]s across a Unix stream socket via `SCM_RIGHTS`
//! ancillary data, per spec.md §6's "file descriptor (carried out-of-band
//! as ancillary data; a token in the in-band payload reserves its
//! position)".
//!
//! These functions work on a raw descriptor rather than a `tokio`
//! `UnixStream` directly: ancillary-data send/recv isn't exposed by
//! `tokio::net::UnixStream`, and the local control socket is low-volume
//! enough that a short synchronous `sendmsg`/`recvmsg` call on the raw fd
//! doesn't warrant a `spawn_blocking` hop.

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use nix::Error as NixError;

/// Ancillary buffer large enough for the handful of descriptors a single
/// message ever carries (socket groups are small; a manifest rarely
/// embeds more than a few listening sockets at once).
const MAX_FDS_PER_MESSAGE: usize = 16;

/// Sends `payload` with `fds` attached as `SCM_RIGHTS` ancillary data.
pub fn send_with_fds(sock: BorrowedFd<'_>, payload: &[u8], fds: &[BorrowedFd<'_>]) -> nix::Result<usize> {
    let iov = [IoSlice::new(payload)];
    if fds.is_empty() {
        return sendmsg::<()>(sock.as_raw_fd(), &iov, &[], MsgFlags::empty(), None);
    }
    let raw: Vec<_> = fds.iter().map(|fd| fd.as_raw_fd()).collect();
    let cmsg = [ControlMessage::ScmRights(&raw)];
    sendmsg::<()>(sock.as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None)
}

/// Receives into `buf`, returning the byte count and any descriptors that
/// arrived as `SCM_RIGHTS` ancillary data. Every returned descriptor has
/// close-on-exec set, per spec.md §6's decoder requirement.
pub fn recv_with_fds(sock: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<(usize, Vec<OwnedFd>)> {
    let mut iov = [IoSliceMut::new(buf)];
    let mut cmsg_space = nix::cmsg_space!([nix::libc::c_int; MAX_FDS_PER_MESSAGE]);
    let msg = recvmsg::<()>(
        sock.as_raw_fd(),
        &mut iov,
        Some(&mut cmsg_space),
        MsgFlags::empty(),
    )?;

    let mut fds = Vec::new();
    for cmsg in msg.cmsgs().map_err(|_| NixError::EINVAL)? {
        if let ControlMessageOwned::ScmRights(received) = cmsg {
            for raw in received {
                // SAFETY: `raw` was just handed to us by the kernel as a
                // freshly dup'd descriptor in this process; nothing else
                // holds or will close it.
                let owned = unsafe { OwnedFd::from_raw_fd(raw) };
                set_cloexec(&owned);
                fds.push(owned);
            }
        }
    }
    Ok((msg.bytes, fds))
}

fn set_cloexec(fd: &OwnedFd) {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    if let Ok(flags) = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFD) {
        let _ = fcntl(
            fd.as_raw_fd(),
            FcntlArg::F_SETFD(FdFlag::from_bits_truncate(flags) | FdFlag::FD_CLOEXEC),
        );
    }
}

#[cfg(test)]
#[path = "fdpass_tests.rs"]
mod tests;
