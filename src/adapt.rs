//! Bridges callback-style functions into deferred values.
//!
//! Many callback APIs follow one convention: the last argument is a
//! completion callback invoked with an optional error and a value. [`adapt`]
//! wraps such a function into one that returns a [`Deferred`] instead, with
//! the trailing callback replaced by a [`Done`] capability.

use std::fmt;

use crate::deferred::{Deferred, Settler};

/// Completion capability handed to an adapted function in place of its
/// trailing callback.
///
/// `Done` is consumed by [`call`](Done::call), so an adapted function can
/// report completion at most once.
pub struct Done<T, E> {
    settler: Settler<T, E>,
}

impl<T, E> Done<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Reports completion in the error-first style: `Some` error rejects
    /// and the value is ignored, `None` fulfills with `value`.
    pub fn call(self, error: Option<E>, value: T) {
        match error {
            Some(reason) => self.settler.reject(reason),
            None => self.settler.fulfill(value),
        }
    }
}

/// A function taking some leading arguments plus a trailing [`Done`].
///
/// Implemented for closures and functions with up to four leading
/// arguments. The argument list is modeled as a tuple so [`adapt`] stays
/// generic over arity.
pub trait CallbackFn<Args, T, E> {
    fn invoke(self, args: Args, done: Done<T, E>);
}

macro_rules! impl_callback_fn {
    ($($name:ident),*) => {
        impl<Fun, T, E, $($name),*> CallbackFn<($($name,)*), T, E> for Fun
        where
            Fun: FnOnce($($name,)* Done<T, E>),
        {
            #[allow(non_snake_case)]
            fn invoke(self, ($($name,)*): ($($name,)*), done: Done<T, E>) {
                self($($name,)* done)
            }
        }
    };
}

impl_callback_fn!();
impl_callback_fn!(A1);
impl_callback_fn!(A1, A2);
impl_callback_fn!(A1, A2, A3);
impl_callback_fn!(A1, A2, A3, A4);

/// Wraps a callback-style function into one returning a [`Deferred`].
///
/// The adapted function takes its leading arguments as a tuple, so a
/// one-argument function is called as `adapted((arg,))` and a zero-argument
/// one as `adapted(())`. The wrapped function body runs immediately on
/// call; only its completion is deferred.
///
/// # Example
///
/// ```
/// use latent::{adapt, turn, Done};
///
/// let measure = adapt(|key: String, done: Done<usize, String>| {
///     done.call(None, key.len());
/// });
///
/// let length = measure((String::from("deferred"),));
/// assert_eq!(turn::block_on(&length), Ok(Ok(8)));
/// ```
pub fn adapt<Fun, Args, T, E>(callback_style: Fun) -> impl FnOnce(Args) -> Deferred<T, E>
where
    Fun: CallbackFn<Args, T, E>,
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    move |args| {
        let (deferred, settler) = Deferred::pending();
        callback_style.invoke(args, Done { settler });
        deferred
    }
}
