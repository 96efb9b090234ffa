use std::time::Duration;

use latent::{Deferred, SettleExt, delay};
use macro_rules_attribute::apply;
use smol_macros::main;

#[apply(main!)]
async fn main() {
    let doubled = delay::value::<i32, String>(Duration::from_millis(15), 21).chain(|n| Ok(n * 2));
    println!("doubled -> {:?}", doubled.await);

    let (value, settler) = Deferred::<String, String>::pending();
    async { Ok::<String, String>(String::from("settled from async")) }
        .settle(settler)
        .await;
    println!("adopted -> {:?}", value.await);
}
