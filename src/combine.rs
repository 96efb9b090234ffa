//! Combinators that join several deferred values into one.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::deferred::Deferred;

struct Slots<V> {
    filled: Vec<Option<V>>,
    missing: usize,
}

impl<V> Slots<V> {
    fn new(len: usize) -> Self
    where
        V: Clone,
    {
        Slots { filled: vec![None; len], missing: len }
    }

    /// Records one settlement; yields the gathered values, in input order,
    /// once the last slot fills.
    fn fill(&mut self, index: usize, value: V) -> Option<Vec<V>> {
        self.filled[index] = Some(value);
        self.missing -= 1;
        if self.missing == 0 {
            Some(self.filled.drain(..).flatten().collect())
        } else {
            None
        }
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Combines every fulfillment into one `Vec`, or rejects with the first
    /// rejection.
    ///
    /// The output order mirrors the input order, not settlement order. An
    /// empty input fulfills with an empty `Vec` right away. Once a rejection
    /// wins, later settlements of the remaining inputs are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let gathered = Deferred::all([
    ///     Deferred::<i32, &str>::resolved(1),
    ///     Deferred::resolved(2),
    ///     Deferred::resolved(3),
    /// ]);
    ///
    /// assert_eq!(turn::block_on(&gathered), Ok(Ok(vec![1, 2, 3])));
    /// ```
    pub fn all(values: impl IntoIterator<Item = Deferred<T, E>>) -> Deferred<Vec<T>, E> {
        let values: Vec<_> = values.into_iter().collect();
        let combined = Deferred::fresh();
        if values.is_empty() {
            combined.complete(Ok(Vec::new()));
            return combined;
        }
        let slots = Rc::new(RefCell::new(Slots::new(values.len())));
        for (index, value) in values.into_iter().enumerate() {
            let slots = Rc::clone(&slots);
            let combined = combined.clone();
            value.subscribe(move |settlement| match settlement {
                Ok(value) => {
                    if let Some(gathered) = slots.borrow_mut().fill(index, value) {
                        combined.complete(Ok(gathered));
                    }
                }
                Err(reason) => combined.complete(Err(reason)),
            });
        }
        combined
    }

    /// Settles with the first input to settle, fulfillment or rejection.
    ///
    /// When several inputs are already settled, the earliest in input order
    /// wins. An empty input never settles; [`turn::block_on`] reports that
    /// as [`Stalled`](crate::turn::Stalled).
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use latent::{delay, turn, Deferred};
    ///
    /// let winner = Deferred::race([
    ///     delay::value(Duration::from_millis(50), "slow"),
    ///     delay::value::<_, &str>(Duration::from_millis(5), "quick"),
    /// ]);
    ///
    /// assert_eq!(turn::block_on(&winner), Ok(Ok("quick")));
    /// ```
    ///
    /// [`turn::block_on`]: crate::turn::block_on
    pub fn race(values: impl IntoIterator<Item = Deferred<T, E>>) -> Deferred<T, E> {
        let combined = Deferred::fresh();
        for value in values {
            let combined = combined.clone();
            value.subscribe(move |settlement| combined.complete(settlement));
        }
        combined
    }

    /// Waits for every input and collects each settlement as a `Result`.
    ///
    /// Never rejects; rejections are carried inside the output vector, in
    /// input order.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let report = Deferred::all_settled([
    ///     Deferred::<i32, &str>::resolved(1),
    ///     Deferred::rejected("broken"),
    /// ]);
    ///
    /// assert_eq!(turn::block_on(&report), Ok(Ok(vec![Ok(1), Err("broken")])));
    /// ```
    pub fn all_settled(
        values: impl IntoIterator<Item = Deferred<T, E>>,
    ) -> Deferred<Vec<Result<T, E>>, E> {
        let values: Vec<_> = values.into_iter().collect();
        let combined = Deferred::fresh();
        if values.is_empty() {
            combined.complete(Ok(Vec::new()));
            return combined;
        }
        let slots = Rc::new(RefCell::new(Slots::new(values.len())));
        for (index, value) in values.into_iter().enumerate() {
            let slots = Rc::clone(&slots);
            let combined = combined.clone();
            value.subscribe(move |settlement| {
                if let Some(gathered) = slots.borrow_mut().fill(index, settlement) {
                    combined.complete(Ok(gathered));
                }
            });
        }
        combined
    }

    /// Fulfills with the first fulfillment, or rejects with every reason,
    /// in input order, once all inputs have rejected.
    ///
    /// An empty input rejects with an empty `Vec` right away.
    ///
    /// # Example
    ///
    /// ```
    /// use latent::{turn, Deferred};
    ///
    /// let first = Deferred::any([
    ///     Deferred::<i32, &str>::rejected("down"),
    ///     Deferred::resolved(2),
    /// ]);
    ///
    /// assert_eq!(turn::block_on(&first), Ok(Ok(2)));
    /// ```
    pub fn any(values: impl IntoIterator<Item = Deferred<T, E>>) -> Deferred<T, Vec<E>> {
        let values: Vec<_> = values.into_iter().collect();
        let combined = Deferred::fresh();
        if values.is_empty() {
            combined.complete(Err(Vec::new()));
            return combined;
        }
        let slots = Rc::new(RefCell::new(Slots::new(values.len())));
        for (index, value) in values.into_iter().enumerate() {
            let slots = Rc::clone(&slots);
            let combined = combined.clone();
            value.subscribe(move |settlement| match settlement {
                Ok(value) => combined.complete(Ok(value)),
                Err(reason) => {
                    if let Some(reasons) = slots.borrow_mut().fill(index, reason) {
                        combined.complete(Err(reasons));
                    }
                }
            });
        }
        combined
    }
}
