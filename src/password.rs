//! Password hash and its parallelisable brute-force preimage search.
//!
//! The hash is a small, deliberately weak 32-bit rolling hash; the search
//! is the crate's sole parallel subsystem, as the parser/store stay
//! single-threaded per the concurrency model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Compute the 32-bit password hash of an ASCII string of length >= 1.
///
/// ```text
/// h = ord(s[0])
/// for i in 1..=len(s)-1:
///     if (i-1) is even: h = (h * ord(s[i])) mod 2^32
///     else:             h = (h + ord(s[i])) mod 2^32
/// ```
pub fn hash(s: &str) -> u32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return 0;
    }
    let mut h: u32 = bytes[0] as u32;
    for i in 1..bytes.len() {
        let c = bytes[i] as u32;
        if (i - 1) % 2 == 0 {
            h = h.wrapping_mul(c);
        } else {
            h = h.wrapping_add(c);
        }
    }
    h
}

/// Enumerate `alphabet*` in length-then-lex order between `min_len` and
/// `max_len` inclusive, restricted to candidates whose first character's
/// index (into `alphabet`) is congruent to `lane_index` modulo
/// `lane_count`. This is the partitioning scheme worker lanes use to
/// divide the candidate space without overlap.
fn for_each_candidate_in_lane(
    alphabet: &[u8],
    min_len: usize,
    max_len: usize,
    lane_index: usize,
    lane_count: usize,
    cancelled: &AtomicBool,
    mut visit: impl FnMut(&[u8]),
) {
    let mut buf = vec![0u8; max_len.max(1)];
    for len in min_len.max(1)..=max_len {
        let first_choices: Vec<usize> = (0..alphabet.len())
            .filter(|&idx| idx % lane_count == lane_index)
            .collect();
        for &first in &first_choices {
            if cancelled.load(Ordering::Relaxed) {
                return;
            }
            buf[0] = alphabet[first];
            if len == 1 {
                visit(&buf[..1]);
                continue;
            }
            let mut rest = vec![0usize; len - 1];
            loop {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                for (k, &idx) in rest.iter().enumerate() {
                    buf[k + 1] = alphabet[idx];
                }
                visit(&buf[..len]);

                // Odometer increment over `rest`, least-significant position
                // last. Wrapping all the way back to all-zero means every
                // combination for this length has been visited.
                let mut k = rest.len();
                loop {
                    if k == 0 {
                        break;
                    }
                    k -= 1;
                    rest[k] += 1;
                    if rest[k] < alphabet.len() {
                        break;
                    }
                    rest[k] = 0;
                }
                if rest.iter().all(|&v| v == 0) {
                    break;
                }
            }
        }
    }
}

/// A found preimage: the candidate string and the hash it produced (equal
/// to the search target, recorded so callers do not need to re-hash).
#[derive(Debug, Clone)]
pub struct Hit {
    pub candidate: String,
    pub hash: u32,
}

/// Search `alphabet*` for strings of length `min_len..=max_len` whose hash
/// equals `target`. Partitions the leading character across
/// `lane_count` worker threads (default: available parallelism); each
/// lane owns its own hash state and result queue, sharing only the
/// cancellation flag. On the caller's first consumption is left to decide;
/// this function always runs to exhaustion or cancellation and returns all
/// hits found, in no particular order.
pub fn search(
    target: u32,
    alphabet: &[u8],
    min_len: usize,
    max_len: usize,
    lane_count: Option<usize>,
) -> Vec<Hit> {
    let lanes = lane_count.unwrap_or_else(|| {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }).max(1);
    let cancelled = Arc::new(AtomicBool::new(false));
    let alphabet = alphabet.to_vec();

    let handles: Vec<_> = (0..lanes)
        .map(|lane_index| {
            let alphabet = alphabet.clone();
            let cancelled = Arc::clone(&cancelled);
            thread::spawn(move || {
                let mut hits = Vec::new();
                for_each_candidate_in_lane(
                    &alphabet,
                    min_len,
                    max_len,
                    lane_index,
                    lanes,
                    &cancelled,
                    |candidate| {
                        let s = String::from_utf8_lossy(candidate).into_owned();
                        let h = hash(&s);
                        if h == target {
                            hits.push(Hit { candidate: s, hash: h });
                            // Stop the whole search promptly once a hit is
                            // found anywhere; other lanes observe this on
                            // their next candidate boundary.
                            cancelled.store(true, Ordering::Relaxed);
                        }
                    },
                );
                hits
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_algebra_pins_known_values() {
        assert_eq!(hash("hob"), 11642);
        assert_eq!(hash("a"), 97);
    }

    #[test]
    fn preimage_search_finds_known_collision() {
        let hits = search(11642, b"abcdefghijklmnopqrstuvwxyz", 1, 3, Some(2));
        assert!(hits.iter().any(|h| h.candidate == "hob"));
        for hit in &hits {
            assert_eq!(hash(&hit.candidate), 11642);
        }
    }

    #[test]
    fn search_with_longer_max_len_still_finds_hit_and_more() {
        let hits = search(11642, b"abcdefghijklmnopqrstuvwxyz", 1, 4, Some(4));
        assert!(hits.iter().any(|h| h.candidate == "hob"));
        assert!(!hits.is_empty());
    }
}
