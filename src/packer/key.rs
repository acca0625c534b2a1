//! This module contains the slot-key calculator: the mapping from a
//! variable's slot number to the storage key at which its content lives.

use ethnum::U256;

use crate::{
    layout::Variable,
    utility::{hex_word, keccak_word},
};

/// Calculates the storage key for `variable`.
///
/// For statically placed data the key is the slot number itself. For
/// dynamically sized data the content starts at the keccak-256 hash of
/// the slot number, which is how the EVM addresses dynamic storage.
#[must_use]
pub fn calc_slot_key(variable: &Variable) -> String {
    slot_key(variable.from_slot, variable.dynamic)
}

/// Calculates the storage key for data whose base slot is `from_slot`.
#[must_use]
pub fn slot_key(from_slot: u64, dynamic: bool) -> String {
    let slot = U256::from(from_slot);
    if dynamic {
        hex_word(keccak_word(slot))
    } else {
        hex_word(slot)
    }
}

#[cfg(test)]
mod test {
    use super::slot_key;

    #[test]
    fn static_keys_are_the_slot_number() {
        assert_eq!(
            slot_key(5, false),
            "0x0000000000000000000000000000000000000000000000000000000000000005"
        );
        assert_eq!(
            slot_key(0, false),
            "0x0000000000000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn dynamic_keys_are_the_keccak_of_the_slot() {
        let expected = [
            "0x290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563",
            "0xb10e2d527612073b26eecdfd717e6a320cf44b4afac2b0732d9fcbe2b7fa0cf6",
            "0x405787fa12a823e0f2b7631cc41b3ba8828b3321ca811111fa75cd3aa3bb5ace",
            "0xc2575a0e9e593c00f959f8c92f12db2869c3395a3b0502d05e2516446f71f85b",
            "0x8a35acfbc15ff81a39ae7d344fd709f28e8600b4aa8c65c6b64bfe7fe36bd19b",
        ];
        for (slot, key) in expected.iter().enumerate() {
            assert_eq!(slot_key(slot as u64, true), *key);
        }
    }

    #[test]
    fn dynamic_keys_are_reproducible() {
        assert_eq!(slot_key(5, true), slot_key(5, true));
    }
}
