//! Core deferred value type, its settlement capability, and chaining.
//!
//! A [`Deferred`] is a one-shot container that starts out pending and is later
//! settled exactly once, either with a value or with a rejection reason. All
//! bookkeeping lives on the current thread; handles are cheap reference-counted
//! clones and reactions run on the thread's turn queue, never inline with the
//! call that registered them.

use std::{
    cell::{Cell, RefCell},
    fmt, mem,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use crate::{delay, turn};

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

fn next_id() -> u64 {
    let id = NEXT_ID.get();
    NEXT_ID.set(id + 1);
    id
}

type Reaction<T, E> = Box<dyn FnOnce(Result<T, E>)>;

enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn tag(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        }
    }
}

struct Node<T, E> {
    id: u64,
    state: State<T, E>,
    // Set once a settlement capability has been used; later uses are ignored.
    committed: bool,
    // Tracks whether anyone ever looked at a rejection, for the drop warning.
    observed: bool,
    reason_text: Option<String>,
    reactions: Vec<Reaction<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Node<T, E> {
    fn settlement(&self) -> Option<Result<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        match &self.state {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}

impl<T, E> Drop for Node<T, E> {
    fn drop(&mut self) {
        if matches!(self.state, State::Rejected(_)) && !self.observed {
            let reason = self.reason_text.take().unwrap_or_default();
            log::warn!("deferred #{} dropped with unobserved rejection: {reason}", self.id);
        }
    }
}

/// A value that will be settled later, at most once, on the current thread.
///
/// A `Deferred<T, E>` is either *pending*, *fulfilled* with a `T`, or
/// *rejected* with an `E`. Once settled it never changes again. Reactions
/// registered with [`chain`](Deferred::chain), [`recover`](Deferred::recover),
/// or [`branch`](Deferred::branch) always run from the thread's turn queue,
/// so they observe the settlement strictly after the code that produced it
/// has returned, in the order they were registered.
///
/// Handles are reference-counted; cloning one is cheap and every clone
/// observes the same settlement. The type is deliberately not [`Send`]: all
/// scheduling happens on one thread and no locking is involved.
///
/// # Example
///
/// ```
/// use latent::{turn, Deferred};
///
/// let greeting = Deferred::new(|settler| {
///     settler.fulfill("hello");
///     Ok::<(), &str>(())
/// });
/// let shouted = greeting.chain(|text: &str| Ok(text.to_uppercase()));
///
/// assert_eq!(turn::block_on(&shouted), Ok(Ok(String::from("HELLO"))));
/// ```
pub struct Deferred<T, E> {
    node: Rc<RefCell<Node<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Deferred { node: Rc::clone(&self.node) }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("Deferred")
            .field("id", &node.id)
            .field("state", &node.state.tag())
            .finish()
    }
}

/// The capability to settle one [`Deferred`], handed to producers.
///
/// A `Settler` commits its deferred value at most once: whichever of
/// [`fulfill`](Settler::fulfill), [`reject`](Settler::reject), or
/// [`adopt`](Settler::adopt) runs first wins, and every later call on this
/// settler or any clone of it is silently ignored. Dropping a settler without
/// calling anything leaves the value pending.
pub struct Settler<T, E> {
    deferred: Deferred<T, E>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Settler { deferred: self.deferred.clone() }
    }
}

/// Conversion into a [`Deferred`], used by chaining handlers and adoption.
///
/// Handlers passed to [`Deferred::chain`] and friends can return either a
/// plain [`Result`], which settles the derived value immediately, or another
/// `Deferred`, which the derived value then tracks to completion.
pub trait IntoDeferred<T, E> {
    fn into_deferred(self) -> Deferred<T, E>;
}

impl<T, E> IntoDeferred<T, E> for Deferred<T, E> {
    fn into_deferred(self) -> Deferred<T, E> {
        self
    }
}

impl<T, E> IntoDeferred<T, E> for Result<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    fn into_deferred(self) -> Deferred<T, E> {
        let deferred = Deferred::fresh();
        deferred.complete(self);
        deferred
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Creates a deferred value and runs `producer` immediately with its
    /// [`Settler`].
    ///
    /// The producer is free to settle synchronously, to stash the settler
    /// somewhere and settle later, or to hand it to [`delay::schedule`].
    /// Returning `Err` rejects the value, unless the producer already
    /// committed a settlement, in which case the error is ignored.
    ///
    /// Even when the producer settles synchronously, reactions still run
    /// from the turn queue, never inside this call.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let refused: Deferred<i32, String> =
    ///     Deferred::new(|_settler| Err(String::from("not today")));
    ///
    /// assert_eq!(turn::block_on(&refused), Ok(Err(String::from("not today"))));
    /// ```
    ///
    /// [`delay::schedule`]: crate::delay::schedule
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce(Settler<T, E>) -> Result<(), E>,
    {
        let (deferred, settler) = Self::pending();
        let fallback = settler.clone();
        if let Err(reason) = producer(settler) {
            fallback.reject(reason);
        }
        deferred
    }

    /// Creates a pending deferred value together with its [`Settler`].
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let (value, settler) = Deferred::<u32, &str>::pending();
    /// settler.fulfill(7);
    /// settler.fulfill(8); // settled once already; ignored
    ///
    /// assert_eq!(turn::block_on(&value), Ok(Ok(7)));
    /// ```
    pub fn pending() -> (Self, Settler<T, E>) {
        let deferred = Self::fresh();
        let settler = Settler { deferred: deferred.clone() };
        (deferred, settler)
    }

    /// Creates a deferred value that is already fulfilled with `value`.
    ///
    /// Reactions chained onto it still run from the turn queue.
    pub fn resolved(value: T) -> Self {
        let deferred = Self::fresh();
        deferred.complete(Ok(value));
        deferred
    }

    /// Creates a deferred value that is already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        let deferred = Self::fresh();
        deferred.complete(Err(reason));
        deferred
    }

    /// Derives a new deferred value by transforming the fulfillment value.
    ///
    /// `on_fulfilled` runs from the turn queue once this value fulfills. It
    /// may return a plain [`Result`] or another [`Deferred`]; returning a
    /// deferred value makes the derived one track it, so nested deferred
    /// values flatten instead of stacking. If this value rejects, the handler
    /// is skipped and the rejection passes through unchanged.
    ///
    /// Registering multiple chains on the same value forks independent
    /// derived values; each handler receives its own clone of the
    /// fulfillment value.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let pipeline = Deferred::<i32, &str>::resolved(2)
    ///     .chain(|n| Ok(n + 3))
    ///     .chain(|n| Deferred::resolved(n * 10));
    ///
    /// assert_eq!(turn::block_on(&pipeline), Ok(Ok(50)));
    /// ```
    pub fn chain<U, R, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        R: IntoDeferred<U, E>,
        F: FnOnce(T) -> R + 'static,
    {
        let derived = Deferred::fresh();
        let target = derived.clone();
        self.subscribe(move |settlement| match settlement {
            Ok(value) => on_fulfilled(value).into_deferred().feed(&target),
            Err(reason) => target.complete(Err(reason)),
        });
        derived
    }

    /// Derives a new deferred value by handling a rejection.
    ///
    /// `on_rejected` runs from the turn queue once this value rejects; its
    /// return value settles the derived value, so returning `Ok` swallows the
    /// rejection and resumes the fulfillment path. If this value fulfills,
    /// the value passes through and the handler is skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let salvaged = Deferred::<i32, &str>::rejected("offline")
    ///     .recover(|_reason| Ok(0))
    ///     .chain(|n| Ok(n + 1));
    ///
    /// assert_eq!(turn::block_on(&salvaged), Ok(Ok(1)));
    /// ```
    pub fn recover<R, F>(&self, on_rejected: F) -> Deferred<T, E>
    where
        R: IntoDeferred<T, E>,
        F: FnOnce(E) -> R + 'static,
    {
        let derived = Deferred::fresh();
        let target = derived.clone();
        self.subscribe(move |settlement| match settlement {
            Ok(value) => target.complete(Ok(value)),
            Err(reason) => on_rejected(reason).into_deferred().feed(&target),
        });
        derived
    }

    /// Derives a new deferred value with a handler for each settlement arm.
    ///
    /// Exactly one of the two handlers runs, from the turn queue. Both feed
    /// the same derived value, which lets a rejection map to a fallback of
    /// the fulfillment type.
    pub fn branch<U, R, S, F, G>(&self, on_fulfilled: F, on_rejected: G) -> Deferred<U, E>
    where
        U: Clone + 'static,
        R: IntoDeferred<U, E>,
        S: IntoDeferred<U, E>,
        F: FnOnce(T) -> R + 'static,
        G: FnOnce(E) -> S + 'static,
    {
        let derived = Deferred::fresh();
        let target = derived.clone();
        self.subscribe(move |settlement| match settlement {
            Ok(value) => on_fulfilled(value).into_deferred().feed(&target),
            Err(reason) => on_rejected(reason).into_deferred().feed(&target),
        });
        derived
    }

    /// Returns the settlement if there is one, without running the turn queue.
    ///
    /// Reading a rejection through `outcome` counts as observing it, which
    /// suppresses the unobserved-rejection log warning for this value.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let value = Deferred::<i32, &str>::resolved(3).chain(|n| Ok(n * n));
    /// assert_eq!(value.outcome(), None);
    ///
    /// turn::drain();
    /// assert_eq!(value.outcome(), Some(Ok(9)));
    /// ```
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, E>> {
        let mut node = self.node.borrow_mut();
        let settlement = node.settlement();
        if let Some(Err(_)) = &settlement {
            node.observed = true;
        }
        settlement
    }

    /// Returns `true` while the value has not settled yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.node.borrow().state, State::Pending)
    }

    /// Returns `true` once the value has fulfilled or rejected.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    pub(crate) fn fresh() -> Self {
        Deferred {
            node: Rc::new(RefCell::new(Node {
                id: next_id(),
                state: State::Pending,
                committed: false,
                observed: false,
                reason_text: None,
                reactions: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Registers a reaction to run from the turn queue once this value
    /// settles. Runs immediately after the current turn if it already has.
    pub(crate) fn subscribe(&self, reaction: impl FnOnce(Result<T, E>) + 'static) {
        let mut node = self.node.borrow_mut();
        node.observed = true;
        match node.settlement() {
            None => node.reactions.push(Box::new(reaction)),
            Some(settlement) => {
                drop(node);
                turn::enqueue(move || reaction(settlement));
            }
        }
    }

    /// Settles this value, ignoring the call if it is already settled, and
    /// enqueues every registered reaction in registration order.
    pub(crate) fn complete(&self, settlement: Result<T, E>) {
        let mut node = self.node.borrow_mut();
        if !matches!(node.state, State::Pending) {
            return;
        }
        let reactions = mem::take(&mut node.reactions);
        let wakers = mem::take(&mut node.wakers);
        node.state = match &settlement {
            Ok(value) => State::Fulfilled(value.clone()),
            Err(reason) => {
                node.reason_text = Some(format!("{reason:?}"));
                State::Rejected(reason.clone())
            }
        };
        log::trace!(
            "deferred #{} {} with {} reactions queued",
            node.id,
            node.state.tag(),
            reactions.len(),
        );
        drop(node);
        for reaction in reactions {
            let each = settlement.clone();
            turn::enqueue(move || reaction(each));
        }
        for waker in wakers {
            waker.wake();
        }
    }

    /// Forwards this value's eventual settlement into `target`.
    pub(crate) fn feed(self, target: &Deferred<T, E>) {
        let target = target.clone();
        self.subscribe(move |settlement| target.complete(settlement));
    }
}

impl<T, E> Deferred<Deferred<T, E>, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Collapses one level of nesting by tracking the inner deferred value.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let nested: Deferred<Deferred<i32, &str>, &str> =
    ///     Deferred::resolved(Deferred::resolved(5));
    ///
    /// assert_eq!(turn::block_on(&nested.flatten()), Ok(Ok(5)));
    /// ```
    pub fn flatten(&self) -> Deferred<T, E> {
        self.chain(|inner| inner)
    }
}

impl<T, E> Settler<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Fulfills the deferred value, if no settlement was committed yet.
    pub fn fulfill(&self, value: T) {
        if self.commit() {
            self.deferred.complete(Ok(value));
        }
    }

    /// Rejects the deferred value, if no settlement was committed yet.
    pub fn reject(&self, reason: E) {
        if self.commit() {
            self.deferred.complete(Err(reason));
        }
    }

    /// Commits the deferred value to track `source`.
    ///
    /// The settlement of `source` becomes the settlement of this deferred
    /// value, whenever it arrives. Committing to a source that never settles
    /// leaves the value pending forever; [`turn::block_on`] reports that as
    /// [`Stalled`](crate::turn::Stalled).
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let (value, settler) = Deferred::<i32, &str>::pending();
    /// settler.adopt(Deferred::resolved(41).chain(|n| Ok(n + 1)));
    ///
    /// assert_eq!(turn::block_on(&value), Ok(Ok(42)));
    /// ```
    ///
    /// [`turn::block_on`]: crate::turn::block_on
    pub fn adopt(&self, source: impl IntoDeferred<T, E>) {
        if self.commit() {
            source.into_deferred().feed(&self.deferred);
        }
    }

    fn commit(&self) -> bool {
        let mut node = self.deferred.node.borrow_mut();
        if node.committed {
            return false;
        }
        node.committed = true;
        true
    }
}

impl<T, E> Future for Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    type Output = Result<T, E>;

    /// Polling first runs the turn queue and any due timers, so a deferred
    /// value can be awaited on an ordinary executor without a separate pump.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        turn::checkpoint();
        if let Some(settlement) = self.outcome() {
            return Poll::Ready(settlement);
        }
        self.node.borrow_mut().wakers.push(cx.waker().clone());
        if let Some(due) = delay::next_due() {
            delay::arm_wake(due, cx.waker().clone());
        }
        Poll::Pending
    }
}
