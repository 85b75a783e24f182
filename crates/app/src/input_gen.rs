//! Sample message generation.
//!
//! When `--generate` is given, we build a message that exercises the
//! transformer: mostly lowercase letters with some uppercase, digits and
//! spaces mixed in, so both changed and unchanged characters show up in the
//! metrics.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Generate a reproducible message of exactly `len` ASCII characters.
pub fn generate_message(seed: u64, len: usize) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..len)
        .map(|_| {
            // 60% lowercase, 20% uppercase, 10% digits, 10% spaces
            let class: u8 = rng.gen_range(0..10);
            match class {
                0..=5 => pick(&mut rng, LOWER),
                6..=7 => pick(&mut rng, UPPER),
                8 => pick(&mut rng, DIGITS),
                _ => ' ',
            }
        })
        .collect()
}

fn pick(rng: &mut ChaCha8Rng, alphabet: &[u8]) -> char {
    char::from(alphabet[rng.gen_range(0..alphabet.len())])
}
