use microev::{Context, Error, Events, IoThread, RunFlags};

use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_read_and_write_reported_together() {
    let mut ctx = Context::new().unwrap();
    let (mut a, b) = UnixStream::pair().unwrap();
    a.write_all(b"hello").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    ctx.io_init(
        move |ctx, _w, events| {
            log.lock().unwrap().push(events);
            ctx.exit();
        },
        b.as_raw_fd(),
        Events::READ | Events::WRITE,
    )
    .unwrap();

    ctx.run(RunFlags::empty()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[Events::READ | Events::WRITE]);
}

#[test]
fn test_callback_reads_data() {
    let mut ctx = Context::new().unwrap();
    let (mut a, mut b) = UnixStream::pair().unwrap();
    let fd = b.as_raw_fd();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    ctx.io_init(
        move |ctx, _w, events| {
            assert!(events.contains(Events::READ));

            let mut buffer = [0u8; 64];
            let n = b.read(&mut buffer).unwrap();
            sink.lock().unwrap().extend_from_slice(&buffer[..n]);

            ctx.exit();
        },
        fd,
        Events::READ,
    )
    .unwrap();

    a.write_all(b"ping").unwrap();
    ctx.run(RunFlags::empty()).unwrap();

    assert_eq!(received.lock().unwrap().as_slice(), b"ping");
}

#[test]
fn test_stop_from_callback_ends_delivery() {
    let mut ctx = Context::new().unwrap();
    let (mut a, mut b) = UnixStream::pair().unwrap();
    let fd = b.as_raw_fd();

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let watcher = ctx
        .io_init(
            move |ctx, w, _events| {
                let mut buffer = [0u8; 64];
                let _ = b.read(&mut buffer).unwrap();

                seen.fetch_add(1, Ordering::SeqCst);
                ctx.io_stop(w).unwrap();
            },
            fd,
            Events::READ,
        )
        .unwrap();

    a.write_all(b"one").unwrap();
    ctx.run(RunFlags::empty()).unwrap();

    assert!(!ctx.is_active(watcher));
    assert_eq!(ctx.poller().unwrap().watched(), 0);

    a.write_all(b"two").unwrap();
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_peer_close_is_readable() {
    let mut ctx = Context::new().unwrap();
    let (a, mut b) = UnixStream::pair().unwrap();
    let fd = b.as_raw_fd();
    drop(a);

    let eof = Arc::new(Mutex::new(None));
    let slot = eof.clone();
    ctx.io_init(
        move |ctx, _w, events| {
            let mut buffer = [0u8; 8];
            let n = b.read(&mut buffer).unwrap();
            *slot.lock().unwrap() = Some((events, n));
            ctx.exit();
        },
        fd,
        Events::READ,
    )
    .unwrap();

    ctx.run(RunFlags::empty()).unwrap();

    let (events, n) = eof.lock().unwrap().expect("callback did not run");
    assert!(events.contains(Events::READ));
    assert!(!events.contains(Events::WRITE));
    assert_eq!(n, 0);

    // Linux reports POLLHUP once the peer of a stream socket is closed.
    #[cfg(target_os = "linux")]
    assert!(events.contains(Events::HUP));
}

#[test]
fn test_io_set_changes_interest() {
    let mut ctx = Context::new().unwrap();
    let (_a, b) = UnixStream::pair().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let watcher = ctx
        .io_init(
            move |ctx, _w, events| {
                log.lock().unwrap().push(events);
                ctx.exit();
            },
            b.as_raw_fd(),
            Events::READ,
        )
        .unwrap();

    ctx.io_set(watcher, b.as_raw_fd(), Events::WRITE).unwrap();
    assert!(ctx.is_active(watcher));
    assert_eq!(ctx.poller().unwrap().watched(), 1);

    ctx.run(RunFlags::empty()).unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &[Events::WRITE]);
}

#[test]
fn test_invalid_arguments_are_rejected() {
    let mut ctx = Context::new().unwrap();
    let (_a, b) = UnixStream::pair().unwrap();
    let fd = b.as_raw_fd();

    assert!(matches!(
        ctx.io_init(|_ctx, _w, _events| {}, -1, Events::READ),
        Err(Error::InvalidDescriptor(-1))
    ));
    assert!(matches!(
        ctx.io_init(|_ctx, _w, _events| {}, fd, Events::READ | Events::HUP),
        Err(Error::InvalidEvents(_))
    ));
    assert!(matches!(
        ctx.io_init(|_ctx, _w, _events| {}, fd, Events::empty()),
        Err(Error::InvalidEvents(0))
    ));

    let watcher = ctx
        .io_init(|_ctx, _w, _events| {}, fd, Events::READ | Events::ERROR)
        .unwrap();
    assert!(matches!(
        ctx.io_set(watcher, -3, Events::READ),
        Err(Error::InvalidDescriptor(-3))
    ));

    // Rejected calls leave the watcher started.
    assert!(ctx.is_active(watcher));
    assert!(!ctx.is_empty());

    let timer = ctx.timer_init(|_ctx, _w, _events| {}, 10, 0).unwrap();
    assert!(matches!(
        ctx.io_set(timer, fd, Events::READ),
        Err(Error::WrongKind { .. })
    ));
}

#[test]
fn test_context_without_poller() {
    let mut ctx = Context::builder().without_io().build().unwrap();
    let (_a, b) = UnixStream::pair().unwrap();

    assert!(ctx.poller().is_none());
    assert!(matches!(
        ctx.io_init(|_ctx, _w, _events| {}, b.as_raw_fd(), Events::READ),
        Err(Error::NoPoller)
    ));
}

#[test]
fn test_contexts_share_a_poller() {
    let poller = IoThread::builder().name("shared-poller").spawn().unwrap();
    let mut first = Context::builder().poller(poller.clone()).build().unwrap();
    let mut second = Context::builder().poller(poller.clone()).build().unwrap();

    let (_a1, b1) = UnixStream::pair().unwrap();
    let (_a2, b2) = UnixStream::pair().unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    for (ctx, stream) in [(&mut first, &b1), (&mut second, &b2)] {
        let seen = count.clone();
        ctx.io_init(
            move |ctx, _w, _events| {
                seen.fetch_add(1, Ordering::SeqCst);
                ctx.exit();
            },
            stream.as_raw_fd(),
            Events::WRITE,
        )
        .unwrap();
    }

    assert_eq!(poller.watched(), 2);

    first.run(RunFlags::empty()).unwrap();
    second.run(RunFlags::empty()).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(poller.watched(), 0);
    assert!(poller.is_alive());
}
