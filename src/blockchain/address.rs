// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana address validation.
//!
//! An address is the base58 encoding of a 32-byte ed25519 public key, which
//! gives 32 to 44 characters.

/// Decoded public key length in bytes.
pub const PUBKEY_LEN: usize = 32;

const MIN_ADDRESS_CHARS: usize = 32;
const MAX_ADDRESS_CHARS: usize = 44;

/// Check that `address` is a well-formed Solana public key.
pub fn is_valid_address(address: &str) -> bool {
    if !(MIN_ADDRESS_CHARS..=MAX_ADDRESS_CHARS).contains(&address.len()) {
        return false;
    }
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == PUBKEY_LEN)
}
