use microev::time::Clock;
use microev::{Context, Error, Events, RunFlags, Watcher};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    fn at_ms(ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(ms * 1000)))
    }

    fn set_ms(&self, ms: u64) {
        self.0.store(ms * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn context() -> Context {
    Context::builder().without_io().build().unwrap()
}

#[test]
fn test_one_shot_timer_fires_once() {
    let mut ctx = context();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let start = Instant::now();
    let log = fired.clone();
    let timer = ctx
        .timer_init(
            move |_ctx, _w, events| log.lock().unwrap().push((start.elapsed(), events)),
            50,
            0,
        )
        .unwrap();

    assert!(ctx.is_active(timer));

    // The loop ends on its own once the expired timer leaves the registry.
    ctx.run(RunFlags::empty()).unwrap();

    let fired = fired.lock().unwrap();
    assert_eq!(fired.len(), 1);
    assert!(fired[0].0 >= Duration::from_millis(50));
    assert_eq!(fired[0].1, Events::READ);
    assert!(!ctx.is_active(timer));
    assert!(ctx.is_empty());
}

#[test]
fn test_periodic_timer_with_zero_timeout() {
    let mut ctx = context();
    let ticks = Arc::new(Mutex::new(Vec::new()));

    let log = ticks.clone();
    ctx.timer_init(move |_ctx, _w, _events| log.lock().unwrap().push(Instant::now()), 0, 20)
        .unwrap();
    ctx.timer_init(|ctx, _w, _events| ctx.exit(), 100, 0).unwrap();

    let start = Instant::now();
    ctx.run(RunFlags::empty()).unwrap();

    let ticks = ticks.lock().unwrap();
    assert!(ticks.len() >= 3, "only {} ticks", ticks.len());
    assert!(ticks[0].duration_since(start) < Duration::from_millis(20));
    assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(ctx.is_empty());
}

#[test]
fn test_stop_sibling_from_callback() {
    let mut ctx = context();
    let sibling_calls = Arc::new(AtomicUsize::new(0));

    let calls = sibling_calls.clone();
    let sibling = ctx
        .timer_init(
            move |_ctx, _w, _events| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
            10,
            0,
        )
        .unwrap();

    // Created last, so visited first in the pass where both are due.
    ctx.timer_init(
        move |ctx, _w, _events| ctx.timer_stop(sibling).unwrap(),
        10,
        0,
    )
    .unwrap();

    ctx.run(RunFlags::empty()).unwrap();

    assert_eq!(sibling_calls.load(Ordering::SeqCst), 0);
    assert!(!ctx.is_active(sibling));
}

#[test]
fn test_periodic_timer_stops_itself() {
    let mut ctx = context();
    let count = Arc::new(AtomicUsize::new(0));

    let seen = count.clone();
    ctx.timer_init(
        move |ctx, w, _events| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                ctx.timer_stop(w).unwrap();
            }
        },
        5,
        5,
    )
    .unwrap();

    ctx.run(RunFlags::empty()).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_release_from_callback_invalidates_handle() {
    let mut ctx = context();
    let released: Arc<Mutex<Option<Watcher>>> = Arc::new(Mutex::new(None));

    let slot = released.clone();
    ctx.timer_init(
        move |ctx, w, _events| {
            ctx.release(w).unwrap();
            *slot.lock().unwrap() = Some(w);
        },
        5,
        5,
    )
    .unwrap();

    ctx.run(RunFlags::empty()).unwrap();

    let w = released.lock().unwrap().expect("callback did not run");
    assert!(!ctx.is_active(w));
    assert!(matches!(ctx.timer_set(w, 10, 0), Err(Error::InvalidWatcher)));
    assert!(matches!(ctx.release(w), Err(Error::InvalidWatcher)));
}

#[test]
fn test_zero_timeout_and_period_disarms() {
    let mut ctx = context();
    let timer = ctx.timer_init(|_ctx, _w, _events| {}, 0, 0).unwrap();

    assert!(!ctx.is_active(timer));
    assert!(ctx.is_empty());
    assert_eq!(ctx.timer_deadline(timer).unwrap(), None);

    ctx.timer_set(timer, 10, 0).unwrap();
    assert!(ctx.is_active(timer));

    ctx.timer_set(timer, 0, 0).unwrap();
    assert!(!ctx.is_active(timer));
}

#[test]
fn test_negative_values_are_rejected() {
    let mut ctx = context();

    assert!(matches!(
        ctx.timer_init(|_ctx, _w, _events| {}, -1, 0),
        Err(Error::OutOfRange { timeout: -1, period: 0 })
    ));

    let timer = ctx.timer_init(|_ctx, _w, _events| {}, 10, 0).unwrap();
    assert!(ctx.timer_set(timer, 10, -5).is_err());

    // Rejected calls leave the timer untouched.
    assert!(ctx.is_active(timer));
}

#[test]
fn test_timer_operations_check_kind() {
    let mut ctx = context();
    let event = ctx.event_init(|_ctx, _w, _events| {}).unwrap();

    assert!(matches!(
        ctx.timer_set(event, 10, 0),
        Err(Error::WrongKind { .. })
    ));
    assert!(matches!(ctx.timer_stop(event), Err(Error::WrongKind { .. })));
    assert!(matches!(
        ctx.timer_deadline(event),
        Err(Error::WrongKind { .. })
    ));
}

#[test]
fn test_manual_clock_drives_firing() {
    let clock = ManualClock::at_ms(1_000);
    let mut ctx = Context::builder()
        .without_io()
        .clock(clock.clone())
        .build()
        .unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let timer = ctx
        .timer_init(
            move |_ctx, _w, _events| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
            10,
            0,
        )
        .unwrap();

    // Dormant until the loop runs.
    assert_eq!(ctx.timer_deadline(timer).unwrap(), None);

    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(1_010));
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // Exactly at the deadline is not late enough.
    clock.set_ms(1_010);
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    clock.set_ms(1_011);
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!ctx.is_active(timer));
    assert_eq!(ctx.timer_deadline(timer).unwrap(), None);
}

#[test]
fn test_periodic_rearm_uses_fire_time() {
    let clock = ManualClock::at_ms(1_000);
    let mut ctx = Context::builder()
        .without_io()
        .clock(clock.clone())
        .build()
        .unwrap();

    let timer = ctx.timer_init(|_ctx, _w, _events| {}, 5, 10).unwrap();
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(1_005));

    clock.set_ms(1_030);
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(1_040));
    assert!(ctx.is_active(timer));
}

#[test]
fn test_set_while_running_arms_immediately() {
    let clock = ManualClock::at_ms(500);
    let mut ctx = Context::builder()
        .without_io()
        .clock(clock.clone())
        .build()
        .unwrap();

    let timer = ctx.timer_init(|_ctx, _w, _events| {}, 100, 0).unwrap();
    ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(600));

    clock.set_ms(550);
    ctx.timer_set(timer, 20, 0).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(570));

    // A started timer keeps its stored values.
    clock.set_ms(560);
    ctx.timer_stop(timer).unwrap();
    ctx.timer_start(timer).unwrap();
    assert_eq!(ctx.timer_deadline(timer).unwrap(), Some(580));
}
