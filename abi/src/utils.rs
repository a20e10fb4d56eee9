// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! Hex and hashing helpers shared by the codec and the contract facade.

use crate::error::Error;
use num_bigint::{BigInt, BigUint, Sign};
use sha3::{Digest, Keccak256};

/// Hash some bytes with keccak-256.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Decode a hex string, tolerating (and stripping) a leading `0x`.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, Error> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|_| Error::InvalidHex(s.to_string()))
}

/// Encode bytes as a lowercase `0x`-prefixed hex string.
pub fn to_hex_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes.as_ref()))
}

/// Left-zero-pad an unsigned big integer into a 32 byte slot.
/// Values wider than 256 bits are rejected.
pub(crate) fn uint_to_slot(n: &BigUint) -> Result<[u8; 32], Error> {
    let bytes = n.to_bytes_be();
    if bytes.len() > 32 {
        return Err(Error::NumberOutOfRange(n.to_string()));
    }
    let mut slot = [0u8; 32];
    slot[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(slot)
}

/// Two's-complement encode a signed big integer into a 32 byte slot
/// (negative values are offset by 2^256 before the unsigned encoding).
pub(crate) fn int_to_slot(n: &BigInt) -> Result<[u8; 32], Error> {
    let unsigned = if n.sign() == Sign::Minus {
        let offset = BigInt::from(two_to_the_256()) + n;
        offset
            .to_biguint()
            .ok_or_else(|| Error::NumberOutOfRange(n.to_string()))?
    } else {
        n.to_biguint()
            .expect("non-negative BigInt always converts; qed")
    };
    uint_to_slot(&unsigned).map_err(|_| Error::NumberOutOfRange(n.to_string()))
}

/// Interpret a 32 byte slot as an unsigned big-endian integer.
pub(crate) fn slot_to_uint(slot: &[u8]) -> BigUint {
    BigUint::from_bytes_be(slot)
}

/// Interpret a 32 byte slot as a two's-complement signed integer:
/// when bit 255 is set the value is `raw - 2^256`.
pub(crate) fn slot_to_int(slot: &[u8]) -> BigInt {
    let raw = BigUint::from_bytes_be(slot);
    if slot.first().is_some_and(|b| b & 0x80 != 0) {
        -BigInt::from(two_to_the_256() - raw)
    } else {
        BigInt::from(raw)
    }
}

fn two_to_the_256() -> BigUint {
    BigUint::from(1u8) << 256u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_of_known_input() {
        // keccak-256(""), a well known constant.
        assert_eq!(
            hex::encode(keccak256([])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hex_parsing_tolerates_prefix() {
        assert_eq!(parse_hex("0xff00").unwrap(), vec![0xff, 0x00]);
        assert_eq!(parse_hex("ff00").unwrap(), vec![0xff, 0x00]);
        assert!(parse_hex("0xf").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn signed_slots_round_trip() {
        for n in [-1i64, -1000, 0, 1, 1000] {
            let slot = int_to_slot(&BigInt::from(n)).unwrap();
            assert_eq!(slot_to_int(&slot), BigInt::from(n));
        }
        // -1 is all bits set.
        assert_eq!(int_to_slot(&BigInt::from(-1)).unwrap(), [0xff; 32]);
    }

    #[test]
    fn oversized_uint_is_rejected() {
        let too_big = BigUint::from(1u8) << 256u32;
        assert!(uint_to_slot(&too_big).is_err());
        let max = (BigUint::from(1u8) << 256u32) - 1u8;
        assert_eq!(uint_to_slot(&max).unwrap(), [0xff; 32]);
    }
}
