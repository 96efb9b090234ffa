//! The thread's turn queue: every reaction settles through here.
//!
//! Settling a deferred value never runs reactions inline. They are pushed
//! onto a single FIFO queue on the current thread and run when the queue is
//! pumped: explicitly with [`drain`], while blocking in [`block_on`], or as
//! part of polling a [`Deferred`](crate::Deferred) on an executor.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt, thread,
    time::Instant,
};

use crate::{deferred::Deferred, delay};

type Continuation = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Continuation>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

pub(crate) fn enqueue(continuation: impl FnOnce() + 'static) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(continuation)));
}

/// Error from [`block_on`] when the awaited value can no longer settle.
///
/// Raised when the turn queue is empty, no timer is pending, and the value
/// is still unsettled, so nothing left on this thread could ever settle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stalled;

impl fmt::Display for Stalled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred value stalled: turn queue empty and no timers pending")
    }
}

impl std::error::Error for Stalled {}

/// Runs queued reactions until the queue is empty, returning how many ran.
///
/// Reactions may enqueue further reactions; those run in the same call, in
/// the order they were enqueued. Calling `drain` from inside a reaction
/// returns `0` immediately, the outer drain is already pumping the queue.
///
/// # Example
///
/// ```
/// use latent::{turn, Deferred};
///
/// let value = Deferred::<i32, &str>::resolved(1).chain(|n| Ok(n + 1));
/// assert!(value.is_pending());
///
/// turn::drain();
/// assert_eq!(value.outcome(), Some(Ok(2)));
/// ```
pub fn drain() -> usize {
    if DRAINING.get() {
        return 0;
    }
    DRAINING.set(true);
    let _active = DrainScope;
    let mut ran = 0;
    while let Some(continuation) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        continuation();
        ran += 1;
    }
    if ran > 0 {
        log::trace!("turn queue drained, {ran} reactions ran");
    }
    ran
}

// Resets the reentrancy flag even when a reaction panics, so the queue
// stays usable on the unwound thread.
struct DrainScope;

impl Drop for DrainScope {
    fn drop(&mut self) {
        DRAINING.set(false);
    }
}

/// Runs reactions and due timers until both are exhausted.
pub(crate) fn checkpoint() {
    loop {
        drain();
        if delay::fire_due() == 0 {
            break;
        }
    }
}

/// Blocks the calling thread until `deferred` settles, pumping the turn
/// queue and sleeping until timers come due in between.
///
/// Returns the settlement, or [`Stalled`] when nothing on this thread can
/// settle the value anymore.
///
/// # Example
///
/// ```
/// use latent::{turn, Deferred};
///
/// let (value, settler) = Deferred::<i32, &str>::pending();
/// drop(settler);
///
/// assert_eq!(turn::block_on(&value), Err(turn::Stalled));
/// ```
pub fn block_on<T, E>(deferred: &Deferred<T, E>) -> Result<Result<T, E>, Stalled>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    loop {
        checkpoint();
        if let Some(settlement) = deferred.outcome() {
            return Ok(settlement);
        }
        match delay::next_due() {
            Some(due) => {
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }
            None => return Err(Stalled),
        }
    }
}
