//! Run with `RUST_LOG=trace` to watch the turn queue and timers at work,
//! and with `RUST_LOG=warn` to see the unobserved-rejection warning.

use std::time::Duration;

use latent::{delay, turn};

fn main() {
    env_logger::init();

    let ready = delay::value::<&str, String>(Duration::from_millis(25), "on time");
    println!("{:?}", turn::block_on(&ready));

    {
        let _ignored = delay::failure::<i32, String>(
            Duration::from_millis(10),
            String::from("nobody caught this"),
        );
        let gate = delay::after::<String>(Duration::from_millis(20));
        let _ = turn::block_on(&gate);
        // `_ignored` drops here with its rejection never looked at, which
        // logs a warning naming the lost reason.
    }

    println!("done");
}
