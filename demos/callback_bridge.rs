use std::time::Duration;

use latent::{Done, adapt, delay, turn};

fn main() {
    let resolve_host = adapt(|host: &'static str, done: Done<&'static str, String>| {
        delay::schedule(Duration::from_millis(20), move || match host {
            "localhost" => done.call(None, "127.0.0.1"),
            _ => done.call(Some(format!("unknown host: {host}")), ""),
        });
    });

    let address = resolve_host(("localhost",)).chain(|ip| Ok(format!("resolved to {ip}")));
    println!("{:?}", turn::block_on(&address));

    let resolve_host = adapt(|host: &'static str, done: Done<&'static str, String>| {
        delay::schedule(Duration::from_millis(20), move || match host {
            "localhost" => done.call(None, "127.0.0.1"),
            _ => done.call(Some(format!("unknown host: {host}")), ""),
        });
    });

    let missing = resolve_host(("intranet",)).recover(|reason| {
        println!("lookup failed: {reason}");
        Ok("0.0.0.0")
    });
    println!("{:?}", turn::block_on(&missing));
}
