use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use latent::{Deferred, Stalled, delay, turn};

#[test]
fn settlement_waits_for_the_next_turn() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&order);

    let value = Deferred::<i32, &str>::resolved(1);
    let chained = value.chain(move |n| {
        seen.borrow_mut().push(format!("reaction {n}"));
        Ok(n)
    });
    order.borrow_mut().push(String::from("registered"));

    assert!(
        chained.is_pending(),
        "Reaction must not run inside the call that registered it"
    );
    turn::drain();
    assert_eq!(
        *order.borrow(),
        ["registered", "reaction 1"],
        "Reaction should run after the registering code finished"
    );
}

#[test]
fn reactions_run_in_registration_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let (value, settler) = Deferred::<i32, &str>::pending();

    for tag in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        value.chain(move |n| {
            order.borrow_mut().push(format!("{tag} saw {n}"));
            Ok(n)
        });
    }

    settler.fulfill(5);
    turn::drain();
    assert_eq!(
        *order.borrow(),
        ["first saw 5", "second saw 5", "third saw 5"],
        "Reactions should run in the order they were registered"
    );
}

#[test]
fn chained_pipeline_transforms_step_by_step() {
    let pipeline = Deferred::<i32, &str>::resolved(2)
        .chain(|n| Ok(n + 1))
        .chain(|n| Ok(n * 2))
        .chain(|n| Ok(format!("result: {n}")));

    assert_eq!(
        turn::block_on(&pipeline),
        Ok(Ok(String::from("result: 6"))),
        "Each handler should feed the next one"
    );
}

#[test]
fn returned_deferred_values_flatten_into_the_chain() {
    let total = delay::value::<i32, &str>(Duration::from_millis(5), 4)
        .chain(|n| delay::value(Duration::from_millis(5), n * 2))
        .chain(|n| Ok(n + 1));

    assert_eq!(
        turn::block_on(&total),
        Ok(Ok(9)),
        "A handler returning a deferred value should not nest the result"
    );
}

#[test]
fn chains_fork_independent_derived_values() {
    let base = Deferred::<String, &str>::resolved(String::from("hi"));
    let loud = base.chain(|mut s| {
        s.push('!');
        Ok(s)
    });
    let question = base.chain(|mut s| {
        s.push('?');
        Ok(s)
    });

    turn::drain();
    assert_eq!(loud.outcome(), Some(Ok(String::from("hi!"))));
    assert_eq!(
        question.outcome(),
        Some(Ok(String::from("hi?"))),
        "Each handler receives its own copy of the value"
    );
}

#[test]
fn chaining_after_settlement_still_defers() {
    let value = Deferred::<i32, &str>::resolved(8);
    turn::drain();

    let late = value.chain(|n| Ok(n / 2));
    assert!(
        late.is_pending(),
        "Reactions registered after settlement still wait for the next turn"
    );
    turn::drain();
    assert_eq!(late.outcome(), Some(Ok(4)));
}

#[test]
fn rejection_skips_every_fulfillment_handler() {
    let touched = Rc::new(Cell::new(0));
    let touched_one = Rc::clone(&touched);
    let touched_two = Rc::clone(&touched);

    let caught = Deferred::<i32, &str>::rejected("broken")
        .chain(move |n| {
            touched_one.set(touched_one.get() + 1);
            Ok(n)
        })
        .chain(move |n| {
            touched_two.set(touched_two.get() + 1);
            Ok(n)
        })
        .recover(|reason| {
            assert_eq!(reason, "broken", "The original reason should pass through untouched");
            Ok(-1)
        });

    assert_eq!(turn::block_on(&caught), Ok(Ok(-1)));
    assert_eq!(
        touched.get(),
        0,
        "Fulfillment handlers between the rejection and the recovery should be skipped"
    );
}

#[test]
fn recovery_resumes_the_fulfillment_path() {
    let resumed = Deferred::<i32, &str>::rejected("offline")
        .recover(|_| Ok(10))
        .chain(|n| Ok(n + 1));

    assert_eq!(
        turn::block_on(&resumed),
        Ok(Ok(11)),
        "Handlers after a recovery should see its fallback value"
    );
}

#[test]
fn recovered_chain_can_reject_again() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_cl = Rc::clone(&seen);

    let outcome = Deferred::<i32, String>::rejected(String::from("first failure"))
        .recover(|_| Ok(10))
        .chain(|n| if n > 5 { Err(format!("too big: {n}")) } else { Ok(n) })
        .recover(move |reason| {
            seen_cl.borrow_mut().push(reason);
            Ok(0)
        });

    assert_eq!(turn::block_on(&outcome), Ok(Ok(0)));
    assert_eq!(
        *seen.borrow(),
        ["too big: 10"],
        "The second recovery should see the new reason, not the recovered one"
    );
}

#[test]
fn recovery_is_skipped_on_fulfillment() {
    let recovered = Rc::new(Cell::new(false));
    let recovered_cl = Rc::clone(&recovered);

    let value = Deferred::<i32, &str>::resolved(3).recover(move |_| {
        recovered_cl.set(true);
        Ok(0)
    });

    assert_eq!(turn::block_on(&value), Ok(Ok(3)));
    assert!(!recovered.get(), "A fulfillment should pass a recovery handler by");
}

#[test]
fn branch_runs_exactly_one_arm() {
    let fulfilled = Deferred::<i32, &str>::resolved(1).branch(|n| Ok(n + 1), |_| Ok(-1));
    let rejected = Deferred::<i32, &str>::rejected("no").branch(|n| Ok(n + 1), |_| Ok(-1));

    turn::drain();
    assert_eq!(fulfilled.outcome(), Some(Ok(2)), "Fulfillment should take the first arm");
    assert_eq!(rejected.outcome(), Some(Ok(-1)), "Rejection should take the second arm");
}

#[test]
fn first_settlement_wins() {
    let (value, settler) = Deferred::<i32, &str>::pending();
    settler.fulfill(1);
    settler.reject("late");
    settler.fulfill(2);

    assert_eq!(
        turn::block_on(&value),
        Ok(Ok(1)),
        "Only the first settlement should count"
    );
}

#[test]
fn producer_error_rejects_the_value() {
    let value: Deferred<i32, String> = Deferred::new(|_| Err(String::from("setup failed")));

    assert_eq!(turn::block_on(&value), Ok(Err(String::from("setup failed"))));
}

#[test]
fn producer_error_after_settling_is_ignored() {
    let value = Deferred::new(|settler| {
        settler.fulfill(11);
        Err("too late")
    });

    assert_eq!(
        turn::block_on(&value),
        Ok(Ok(11)),
        "The committed settlement should win over the producer error"
    );
}

#[test]
fn adoption_commits_the_settler() {
    let (inner, inner_settler) = Deferred::<i32, &str>::pending();
    let (outer, outer_settler) = Deferred::<i32, &str>::pending();

    outer_settler.adopt(inner.clone());
    outer_settler.fulfill(99);
    turn::drain();
    assert!(
        outer.is_pending(),
        "After adopting, the outer value must wait for the adopted source"
    );

    inner_settler.fulfill(3);
    assert_eq!(
        turn::block_on(&outer),
        Ok(Ok(3)),
        "The adopted settlement should win over later direct calls"
    );
}

#[test]
fn adoption_flattens_through_any_depth() {
    let (innermost, innermost_settler) = Deferred::<i32, &str>::pending();
    let mut outermost = innermost;
    for _ in 0..4 {
        let (next, settler) = Deferred::<i32, &str>::pending();
        settler.adopt(outermost);
        outermost = next;
    }

    innermost_settler.fulfill(13);
    assert_eq!(
        turn::block_on(&outermost),
        Ok(Ok(13)),
        "The settlement should surface through every adoption layer as a plain value"
    );
}

#[test]
fn flatten_collapses_one_level() {
    let inner = delay::value::<i32, &str>(Duration::from_millis(5), 6);
    let nested: Deferred<Deferred<i32, &str>, &str> = Deferred::resolved(inner);

    assert_eq!(turn::block_on(&nested.flatten()), Ok(Ok(6)));
}

#[test]
fn settlement_state_is_observable() {
    let (value, settler) = Deferred::<i32, &str>::pending();
    assert!(value.is_pending());
    assert!(!value.is_settled());
    assert_eq!(value.outcome(), None);

    settler.fulfill(1);
    assert!(
        value.is_settled(),
        "The state flips as soon as the settler commits, even before any reaction runs"
    );
    assert_eq!(value.outcome(), Some(Ok(1)));
}

#[test]
fn a_single_drain_runs_reactions_enqueued_by_reactions() {
    let (value, settler) = Deferred::<i32, &str>::pending();
    let tail = value.chain(|n| Ok(n + 1)).chain(|n| Ok(n * 3));

    settler.fulfill(1);
    turn::drain();
    assert_eq!(
        tail.outcome(),
        Some(Ok(6)),
        "One drain should run the whole pipeline, including reactions it enqueued itself"
    );
}

#[test]
fn block_on_reports_a_stalled_value() {
    let (value, settler) = Deferred::<i32, &str>::pending();
    drop(settler);

    assert_eq!(
        turn::block_on(&value),
        Err(Stalled),
        "With no settler, no queued reactions, and no timers the value can never settle"
    );
}

#[test]
fn every_handle_observes_the_same_settlement() {
    let (value, settler) = Deferred::<String, &str>::pending();
    let twin = value.clone();

    settler.fulfill(String::from("shared"));
    assert_eq!(turn::block_on(&value), Ok(Ok(String::from("shared"))));
    assert_eq!(
        turn::block_on(&twin),
        Ok(Ok(String::from("shared"))),
        "Clones are handles onto one settlement, not copies of it"
    );
}
