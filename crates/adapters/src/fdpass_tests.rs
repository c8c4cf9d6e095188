use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::net::UnixStream;

use super::*;

#[test]
fn round_trips_payload_without_fds() {
    let (a, b) = UnixStream::pair().expect("socketpair");
    let n = send_with_fds(a.as_fd(), b"hello", &[]).expect("send");
    assert_eq!(n, 5);

    let mut buf = [0u8; 16];
    let (len, fds) = recv_with_fds(b.as_fd(), &mut buf).expect("recv");
    assert_eq!(&buf[..len], b"hello");
    assert!(fds.is_empty());
}

#[test]
fn carries_a_descriptor_alongside_the_payload() {
    let (a, b) = UnixStream::pair().expect("socketpair");
    let (donor_a, donor_b) = UnixStream::pair().expect("donor pair");
    drop(donor_b);

    send_with_fds(a.as_fd(), b"fd-inline", &[donor_a.as_fd()]).expect("send");
    drop(donor_a);

    let mut buf = [0u8; 16];
    let (len, fds) = recv_with_fds(b.as_fd(), &mut buf).expect("recv");
    assert_eq!(&buf[..len], b"fd-inline");
    assert_eq!(fds.len(), 1);
}

#[test]
fn received_descriptor_has_close_on_exec_set() {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (a, b) = UnixStream::pair().expect("socketpair");
    let (donor_a, donor_b) = UnixStream::pair().expect("donor pair");
    drop(donor_b);

    send_with_fds(a.as_fd(), b"x", &[donor_a.as_fd()]).expect("send");
    drop(donor_a);

    let mut buf = [0u8; 4];
    let (_, fds) = recv_with_fds(b.as_fd(), &mut buf).expect("recv");
    let flags = fcntl(fds[0].as_raw_fd(), FcntlArg::F_GETFD).expect("fcntl");
    assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
}
