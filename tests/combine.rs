use std::time::Duration;

use latent::{Deferred, Stalled, delay, turn};

#[test]
fn all_preserves_input_order() {
    let gathered = Deferred::all([
        delay::value::<i32, &str>(Duration::from_millis(30), 1),
        delay::value(Duration::from_millis(5), 2),
        Deferred::resolved(3),
    ]);

    assert_eq!(
        turn::block_on(&gathered),
        Ok(Ok(vec![1, 2, 3])),
        "Output order should follow input order, not settlement order"
    );
}

#[test]
fn all_rejects_with_the_first_rejection() {
    let gathered = Deferred::all([
        delay::value::<i32, &str>(Duration::from_millis(30), 1),
        delay::failure(Duration::from_millis(5), "early failure"),
        delay::failure(Duration::from_millis(60), "late failure"),
    ]);

    assert_eq!(
        turn::block_on(&gathered),
        Ok(Err("early failure")),
        "The first rejection in time should win"
    );
}

#[test]
fn all_of_nothing_fulfills_empty() {
    let gathered = Deferred::<i32, &str>::all([]);

    assert_eq!(turn::block_on(&gathered), Ok(Ok(Vec::new())));
}

#[test]
fn all_feeds_chains_like_any_other_value() {
    let total = Deferred::all([
        Deferred::<i32, &str>::resolved(20),
        delay::value(Duration::from_millis(5), 22),
    ])
    .chain(|parts| Ok(parts.into_iter().sum::<i32>()));

    assert_eq!(turn::block_on(&total), Ok(Ok(42)));
}

#[test]
fn race_settles_with_the_quickest_input() {
    let winner = Deferred::race([
        delay::value::<&str, &str>(Duration::from_millis(40), "slow"),
        delay::value(Duration::from_millis(5), "quick"),
    ]);

    assert_eq!(turn::block_on(&winner), Ok(Ok("quick")));
}

#[test]
fn race_can_settle_with_a_rejection() {
    let winner = Deferred::race([
        delay::value::<i32, &str>(Duration::from_millis(40), 1),
        delay::failure(Duration::from_millis(5), "fastest was a failure"),
    ]);

    assert_eq!(
        turn::block_on(&winner),
        Ok(Err("fastest was a failure")),
        "A rejection wins the race if it settles first"
    );
}

#[test]
fn race_ties_break_by_input_order() {
    let winner = Deferred::race([
        Deferred::<i32, &str>::resolved(1),
        Deferred::resolved(2),
    ]);

    assert_eq!(
        turn::block_on(&winner),
        Ok(Ok(1)),
        "With every input already settled, the first in input order wins"
    );
}

#[test]
fn race_losers_still_settle_their_own_values() {
    let quick = delay::value::<i32, &str>(Duration::from_millis(5), 1);
    let slow = delay::value::<i32, &str>(Duration::from_millis(25), 2);
    let winner = Deferred::race([quick.clone(), slow.clone()]);

    assert_eq!(turn::block_on(&winner), Ok(Ok(1)));
    assert_eq!(
        turn::block_on(&slow),
        Ok(Ok(2)),
        "Losing the race must not disturb the loser's own settlement"
    );
}

#[test]
fn race_of_nothing_never_settles() {
    let forever = Deferred::<i32, &str>::race([]);

    assert_eq!(turn::block_on(&forever), Err(Stalled));
}

#[test]
fn all_settled_reports_every_outcome() {
    let report = Deferred::all_settled([
        Deferred::<i32, &str>::resolved(1),
        Deferred::rejected("broken"),
        delay::value(Duration::from_millis(5), 3),
    ]);

    assert_eq!(
        turn::block_on(&report),
        Ok(Ok(vec![Ok(1), Err("broken"), Ok(3)])),
        "Rejections ride along inside the report instead of rejecting it"
    );
}

#[test]
fn any_takes_the_first_fulfillment() {
    let first = Deferred::any([
        delay::failure::<i32, &str>(Duration::from_millis(5), "one down"),
        delay::value(Duration::from_millis(15), 7),
        delay::value(Duration::from_millis(40), 9),
    ]);

    assert_eq!(
        turn::block_on(&first),
        Ok(Ok(7)),
        "Early rejections should not stop a later fulfillment from winning"
    );
}

#[test]
fn any_of_nothing_rejects_empty() {
    let none = Deferred::<i32, &str>::any([]);

    assert_eq!(
        turn::block_on(&none),
        Ok(Err(Vec::new())),
        "With no input that could ever fulfill, rejection is immediate"
    );
}

#[test]
fn any_rejects_with_every_reason_in_input_order() {
    let none = Deferred::any([
        delay::failure::<i32, &str>(Duration::from_millis(20), "first"),
        delay::failure(Duration::from_millis(5), "second"),
    ]);

    assert_eq!(
        turn::block_on(&none),
        Ok(Err(vec!["first", "second"])),
        "Reasons should be reported in input order once every input has rejected"
    );
}
