//! Settling a deferred value from any future.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use pin_project_lite::pin_project;

use crate::deferred::{IntoDeferred, Settler};

pin_project! {
    /// A future that forwards the output of an inner future into a
    /// [`Settler`](crate::Settler).
    ///
    /// Created by [`SettleExt::settle`]. The inner output may be a plain
    /// `Result` or another deferred value; either way the settlement lands
    /// on the deferred value the settler belongs to, and consumers on the
    /// settler's thread observe it through the usual turn queue.
    #[must_use = "futures do nothing unless polled or .awaited"]
    pub struct Settling<F, T, E> {
        #[pin]
        future: F,
        settler: Option<Settler<T, E>>,
    }
}

impl<F, T, E> Future for Settling<F, T, E>
where
    F: Future,
    F::Output: IntoDeferred<T, E>,
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(output) => {
                if let Some(settler) = this.settler.take() {
                    settler.adopt(output);
                }
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Extend `Future` with deferred-value settlement.
pub trait SettleExt: Future {
    /// Wraps this future so that its output settles `settler`'s deferred
    /// value on completion.
    ///
    /// # Example
    ///
    /// ```
    /// use futures::executor::LocalPool;
    /// use latent::{turn, Deferred, SettleExt};
    ///
    /// let (value, settler) = Deferred::<i32, &str>::pending();
    ///
    /// let mut pool = LocalPool::new();
    /// pool.run_until(async { Ok::<i32, &str>(7) }.settle(settler));
    ///
    /// assert_eq!(turn::block_on(&value), Ok(Ok(7)));
    /// ```
    fn settle<T, E>(self, settler: Settler<T, E>) -> Settling<Self, T, E>
    where
        Self: Sized,
        Self::Output: IntoDeferred<T, E>,
    {
        Settling { future: self, settler: Some(settler) }
    }
}

impl<F> SettleExt for F where F: Future {}
