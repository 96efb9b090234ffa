use std::time::Duration;

use latent::{Deferred, delay, turn};

fn main() {
    let parts = Deferred::all([
        delay::value::<i32, String>(Duration::from_millis(30), 1),
        delay::value(Duration::from_millis(10), 2),
        delay::value(Duration::from_millis(20), 3),
    ]);
    println!("all -> {:?}", turn::block_on(&parts));

    let winner = Deferred::race([
        delay::value::<&str, String>(Duration::from_millis(25), "slow"),
        delay::value(Duration::from_millis(5), "quick"),
    ]);
    println!("race -> {:?}", turn::block_on(&winner));

    let first_up = Deferred::any([
        delay::failure::<i32, String>(Duration::from_millis(5), String::from("mirror down")),
        delay::value(Duration::from_millis(15), 7),
    ]);
    println!("any -> {:?}", turn::block_on(&first_up));

    let report = Deferred::all_settled([
        delay::value::<i32, String>(Duration::from_millis(5), 1),
        delay::failure(Duration::from_millis(10), String::from("flaky")),
    ]);
    println!("all_settled -> {:?}", turn::block_on(&report));
}
