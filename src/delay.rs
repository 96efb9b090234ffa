//! Timers for settling deferred values after a duration.
//!
//! Timers live in a thread-local heap and fire only when the owning thread
//! pumps them, from [`turn::block_on`](crate::turn::block_on) or from polling
//! a deferred value on an executor. Scheduling starts no background work; a
//! small helper pool exists only to deliver executor wakeups on time.

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BinaryHeap,
    fmt,
    sync::OnceLock,
    task::Waker,
    thread,
    time::{Duration, Instant},
};

use futures::executor::{ThreadPool, ThreadPoolBuilder};

use crate::deferred::Deferred;

struct Timer {
    due: Instant,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Comparing in reverse so the earliest deadline sits on top of the
    // max-heap; equal deadlines keep their scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

thread_local! {
    static TIMERS: RefCell<BinaryHeap<Timer>> = RefCell::new(BinaryHeap::new());
    static NEXT_SEQ: Cell<u64> = const { Cell::new(0) };
}

static WAKE_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Schedules `action` to run on this thread once `wait` has elapsed.
///
/// The action fires from the same pumping entry points that run the turn
/// queue. Equal deadlines fire in the order they were scheduled.
pub fn schedule(wait: Duration, action: impl FnOnce() + 'static) {
    let due = Instant::now() + wait;
    let seq = NEXT_SEQ.get();
    NEXT_SEQ.set(seq + 1);
    TIMERS.with(|timers| {
        timers.borrow_mut().push(Timer { due, seq, run: Box::new(action) });
    });
}

/// A deferred value that fulfills with `value` once `wait` has elapsed.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use latent::{delay, turn};
///
/// let ready = delay::value::<_, &str>(Duration::from_millis(5), "done");
/// assert_eq!(turn::block_on(&ready), Ok(Ok("done")));
/// ```
pub fn value<T, E>(wait: Duration, value: T) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    let (deferred, settler) = Deferred::pending();
    schedule(wait, move || settler.fulfill(value));
    deferred
}

/// A deferred value that rejects with `reason` once `wait` has elapsed.
pub fn failure<T, E>(wait: Duration, reason: E) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    let (deferred, settler) = Deferred::pending();
    schedule(wait, move || settler.reject(reason));
    deferred
}

/// A deferred value that fulfills with `()` once `wait` has elapsed, for
/// use as a pure pause inside a chain.
pub fn after<E>(wait: Duration) -> Deferred<(), E>
where
    E: Clone + fmt::Debug + 'static,
{
    value(wait, ())
}

/// Earliest pending deadline on this thread, if any.
pub(crate) fn next_due() -> Option<Instant> {
    TIMERS.with(|timers| timers.borrow().peek().map(|timer| timer.due))
}

/// Fires every timer whose deadline has passed, returning how many fired.
pub(crate) fn fire_due() -> usize {
    let mut fired = 0;
    loop {
        let now = Instant::now();
        let due = TIMERS.with(|timers| {
            let mut timers = timers.borrow_mut();
            if timers.peek().is_some_and(|timer| timer.due <= now) {
                timers.pop()
            } else {
                None
            }
        });
        match due {
            Some(timer) => {
                (timer.run)();
                fired += 1;
            }
            None => break,
        }
    }
    if fired > 0 {
        log::trace!("{fired} timers fired");
    }
    fired
}

/// Arms a wakeup for an executor-driven poll: a helper thread sleeps until
/// `due` and then wakes the task, which pumps the timers on its own thread.
pub(crate) fn arm_wake(due: Instant, waker: Waker) {
    let pool = WAKE_POOL.get_or_init(|| {
        ThreadPoolBuilder::new()
            .pool_size(8)
            .name_prefix("latent-wake-")
            .create()
            .expect("Thread pool creation failed")
    });
    pool.spawn_ok(async move {
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        waker.wake();
    });
}
