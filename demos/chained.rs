use latent::{Deferred, turn};

fn main() {
    let report = Deferred::new(|settler| {
        settler.fulfill(7);
        Ok::<(), String>(())
    })
    .chain(|n| Ok(n * 6))
    .chain(|n| Ok(format!("the answer is {n}")));

    match turn::block_on(&report) {
        Ok(Ok(text)) => println!("fulfilled: {text}"),
        Ok(Err(reason)) => println!("rejected: {reason}"),
        Err(stalled) => println!("{stalled}"),
    }

    let retried = Deferred::<i32, String>::rejected(String::from("first try failed"))
        .recover(|reason| {
            println!("recovering from: {reason}");
            Ok(1)
        })
        .chain(|attempt| Ok(format!("succeeded on attempt {}", attempt + 1)));

    println!("{:?}", turn::block_on(&retried));
}
