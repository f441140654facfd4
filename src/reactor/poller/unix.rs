use libc::{
    AF_UNIX, CLOCK_MONOTONIC, F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK,
    SOCK_STREAM, c_int, c_void, clock_gettime, close, fcntl, nfds_t, poll, pollfd, recv, send,
    socketpair, timespec,
};
use std::io;
use std::os::fd::RawFd;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL | libc::MSG_DONTWAIT;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = libc::MSG_DONTWAIT;

/// Receives from a socket into the given buffer.
///
/// Returns the number of bytes read, or a negative value on error.
/// The socket **must** be non-blocking.
pub(crate) fn sys_recv(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { recv(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len(), 0) }
}

/// Sends the buffer on a socket without blocking and without raising
/// `SIGPIPE` when the peer is gone.
///
/// Returns the number of bytes written, or a negative value on error.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe { send(fd, buffer.as_ptr() as *const c_void, buffer.len(), SEND_FLAGS) }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Marks a file descriptor close-on-exec.
pub(crate) fn sys_set_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFD, flags | FD_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Creates a connected pair of local stream sockets.
///
/// Both ends are non-blocking and close-on-exec. Returns `(receiver, sender)`;
/// the distinction is only a convention of the caller.
pub(crate) fn sys_socketpair() -> io::Result<(RawFd, RawFd)> {
    let mut fds: [c_int; 2] = [-1, -1];

    let rc = unsafe { socketpair(AF_UNIX, SOCK_STREAM, 0, fds.as_mut_ptr()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    for fd in fds {
        if let Err(e) = sys_set_nonblocking(fd).and_then(|_| sys_set_cloexec(fd)) {
            sys_close(fds[0]);
            sys_close(fds[1]);
            return Err(e);
        }
    }

    #[cfg(target_vendor = "apple")]
    {
        let yes: c_int = 1;
        unsafe {
            libc::setsockopt(
                fds[1],
                libc::SOL_SOCKET,
                libc::SO_NOSIGPIPE,
                &yes as *const _ as *const c_void,
                std::mem::size_of::<c_int>() as libc::socklen_t,
            );
        }
    }

    Ok((fds[0], fds[1]))
}

/// Blocks in `poll(2)` until a descriptor is ready or `timeout_ms` elapses.
///
/// A negative timeout blocks indefinitely. Returns the number of descriptors
/// with non-zero `revents`.
pub(crate) fn sys_poll(fds: &mut [pollfd], timeout_ms: c_int) -> io::Result<usize> {
    let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, timeout_ms) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// Reads the monotonic clock in microseconds.
///
/// Returns `0` if the clock cannot be read.
pub(crate) fn sys_monotonic_us() -> u64 {
    let mut ts = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    let rc = unsafe { clock_gettime(CLOCK_MONOTONIC, &mut ts) };
    if rc < 0 || ts.tv_sec < 0 {
        return 0;
    }

    ts.tv_sec as u64 * 1_000_000 + ts.tv_nsec as u64 / 1_000
}
