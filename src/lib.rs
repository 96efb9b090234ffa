//! Deferred values for single-threaded cooperative control flow.
//!
//! `latent` provides a one-shot [`Deferred`] value that starts out pending
//! and is settled later, exactly once, with either a value or a rejection
//! reason. Reactions chained onto a value never run inline with the code
//! that settles it; they go through a single per-thread turn queue and run
//! in registration order, which keeps re-entrancy out of calling code.
//!
//! Features include:
//! - A `Deferred` value with `chain`, `recover`, and `branch` for building
//!   settlement pipelines, where a rejection skips ahead to the next
//!   rejection handler
//! - Combinators `all`, `race`, `all_settled`, and `any` for joining
//!   several deferred values into one
//! - An `adapt` bridge that turns error-first callback functions into
//!   functions returning deferred values
//! - Timers in [`delay`] for settling values after a duration
//! - A [`Future`] implementation plus [`SettleExt`] for moving between
//!   deferred values and ordinary async code on any executor
//!
//! Everything is scheduled on the creating thread; handles are cheap
//! reference-counted clones and nothing here is `Send`. Use
//! [`turn::block_on`] to drive a value to settlement from synchronous code,
//! or `.await` it inside an async block.
//!
//! # Example
//!
//! ```
//! use latent::{turn, Deferred};
//!
//! let total = Deferred::all([
//!     Deferred::<i32, &str>::resolved(20),
//!     Deferred::resolved(22),
//! ])
//! .chain(|parts| Ok(parts.into_iter().sum::<i32>()));
//!
//! assert_eq!(turn::block_on(&total), Ok(Ok(42)));
//! ```

pub mod adapt;
mod combine;
pub mod deferred;
pub mod delay;
pub mod settle_ext;
pub mod turn;

pub use adapt::{CallbackFn, Done, adapt};
pub use deferred::{Deferred, IntoDeferred, Settler};
pub use settle_ext::{SettleExt, Settling};
pub use turn::Stalled;
