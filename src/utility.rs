//! Utility functions useful throughout the codebase.

use ethnum::U256;
use sha3::{Digest, Keccak256};

/// Renders `word` as a full-width, `0x`-prefixed, big-endian hex string.
#[must_use]
pub fn hex_word(word: U256) -> String {
    let mut value = String::from("0x");
    value.push_str(&hex::encode(word.to_be_bytes()));

    value
}

/// Computes the keccak-256 hash of the big-endian bytes of `word`.
///
/// This is the hash the EVM uses to derive the content location of
/// dynamically-sized storage data from its base slot.
#[allow(clippy::missing_panics_doc)] // Panics are guarded and should never happen
#[must_use]
pub fn keccak_word(word: U256) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(word.to_be_bytes());
    let hash = hasher.finalize().to_vec();

    U256::from_be_bytes(
        hash.as_slice()
            .try_into()
            .expect("The number of bytes in `hash` should be correct"),
    )
}
