//! Brute-forces a preimage of a given password hash over a configurable
//! alphabet and length range.

use std::env;

use starscodec::password;

fn main() {
    let mut args = env::args().skip(1);
    let target: u32 = args
        .next()
        .expect("usage: crack_password <target_hash> [max_len]")
        .parse()
        .expect("target hash must be a u32");
    let max_len: usize = args
        .next()
        .map(|s| s.parse().expect("max_len must be a positive integer"))
        .unwrap_or(4);

    let alphabet: Vec<u8> = (b'a'..=b'z').collect();
    let hits = password::search(target, &alphabet, 1, max_len, None);

    if hits.is_empty() {
        println!("no preimage found up to length {max_len}");
    } else {
        for hit in hits {
            println!("{} -> {}", hit.candidate, hit.hash);
        }
    }
}
