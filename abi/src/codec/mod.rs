// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The contract ABI codec: a recursive encoder/decoder for the 32-byte-slot
//! wire layout used by function calls, return data and event payloads.
//!
//! Values cross this boundary as [`serde_json::Value`]s: tuples are objects
//! keyed by field name, arrays are arrays, addresses and byte strings are
//! `0x`-prefixed hex strings, and integers are JSON numbers or (for values
//! that may exceed 64 bits) decimal strings.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::AbiField;
    use crate::types::TypeNode;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn params(fields: &[(&str, &str)]) -> TypeNode {
        let fields: Vec<_> = fields.iter().map(|(n, t)| AbiField::new(n, t)).collect();
        TypeNode::params(&fields).unwrap()
    }

    fn encode_hex(root: &TypeNode, value: &Value) -> String {
        hex::encode(encode(root, value).unwrap())
    }

    #[test]
    fn static_scalars_fill_whole_slots() {
        let root = params(&[("to", "address"), ("amount", "uint256")]);
        let encoded = encode_hex(
            &root,
            &json!({
                "to": "0x0000000000000000000000000000000000000001",
                "amount": 1000,
            }),
        );
        assert_eq!(
            encoded,
            "0000000000000000000000000000000000000000000000000000000000000001\
             00000000000000000000000000000000000000000000000000000000000003e8"
        );
    }

    #[test]
    fn dynamic_string_layout() {
        // f(string) with "dave": pointer, length, right-padded bytes.
        let root = params(&[("s", "string")]);
        let encoded = encode_hex(&root, &json!({ "s": "dave" }));
        assert_eq!(
            encoded,
            "0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000004\
             6461766500000000000000000000000000000000000000000000000000000000"
        );

        let decoded = decode(&root, &encode(&root, &json!({ "s": "dave" })).unwrap()).unwrap();
        assert_eq!(decoded, json!({ "s": "dave" }));
    }

    #[test]
    fn nested_dynamic_array_layout() {
        // g(uint256[][]) with [[1,2],[3]]: inner pointers are relative to
        // the element-area basis, not the start of the message.
        let root = params(&[("xs", "uint256[][]")]);
        let encoded = encode_hex(&root, &json!({ "xs": [[1, 2], [3]] }));
        assert_eq!(
            encoded,
            "0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000002\
             0000000000000000000000000000000000000000000000000000000000000040\
             00000000000000000000000000000000000000000000000000000000000000a0\
             0000000000000000000000000000000000000000000000000000000000000002\
             0000000000000000000000000000000000000000000000000000000000000001\
             0000000000000000000000000000000000000000000000000000000000000002\
             0000000000000000000000000000000000000000000000000000000000000001\
             0000000000000000000000000000000000000000000000000000000000000003"
        );

        let bytes = encode(&root, &json!({ "xs": [[1, 2], [3]] })).unwrap();
        let decoded = decode(&root, &bytes).unwrap();
        assert_eq!(decoded, json!({ "xs": [["1", "2"], ["3"]] }));
    }

    #[test]
    fn all_bits_set_is_minus_one_signed_and_max_unsigned() {
        let buf = [0xffu8; 32];

        let signed = params(&[("x", "int256")]);
        assert_eq!(decode(&signed, &buf).unwrap(), json!({ "x": "-1" }));

        let unsigned = params(&[("x", "uint256")]);
        assert_eq!(
            decode(&unsigned, &buf).unwrap(),
            json!({
                "x": "115792089237316195423570985008687907853269984665640564039457584007913129639935"
            })
        );
    }

    #[test]
    fn static_parameter_lists_round_trip() {
        let root = params(&[
            ("who", "address"),
            ("flag", "bool"),
            ("tag", "bytes4"),
            ("count", "uint64"),
            ("delta", "int256"),
        ]);
        let value = json!({
            "who": "0x00000000000000000000000000000000000000ff",
            "flag": true,
            "tag": "0xdeadbeef",
            "count": 42,
            "delta": "-100000000000000000000",
        });
        let bytes = encode(&root, &value).unwrap();
        assert_eq!(bytes.len() % 32, 0);

        // Integers come back as decimal strings.
        let expected = json!({
            "who": "0x00000000000000000000000000000000000000ff",
            "flag": true,
            "tag": "0xdeadbeef",
            "count": "42",
            "delta": "-100000000000000000000",
        });
        assert_eq!(decode(&root, &bytes).unwrap(), expected);
    }

    #[test]
    fn fixed_array_of_dynamic_elements_has_no_length_slot() {
        let root = params(&[("pair", "string[2]")]);
        let value = json!({ "pair": ["ab", "cdef"] });
        let bytes = encode(&root, &value).unwrap();

        // head pointer, then two element pointers, then two (length, data)
        // tails; no length slot for the array itself.
        assert_eq!(bytes.len(), 32 * 7);
        // The first slot of the tail is the first element pointer, not a
        // length.
        assert_eq!(bytes[32..64], crate::codec::encode::usize_slot(0x40));

        assert_eq!(decode(&root, &bytes).unwrap(), value);
    }

    #[test]
    fn dynamic_tuples_are_reached_through_a_pointer() {
        let fields = vec![
            AbiField::with_components(
                "t",
                "tuple",
                vec![AbiField::new("n", "uint256"), AbiField::new("s", "string")],
            ),
            AbiField::new("after", "bool"),
        ];
        let root = TypeNode::params(&fields).unwrap();
        let value = json!({
            "t": { "n": 7, "s": "hello world, this is longer than one slot.." },
            "after": true,
        });
        let bytes = encode(&root, &value).unwrap();
        assert_eq!(bytes.len() % 32, 0);

        let decoded = decode(&root, &bytes).unwrap();
        assert_eq!(
            decoded,
            json!({
                "t": { "n": "7", "s": "hello world, this is longer than one slot.." },
                "after": true,
            })
        );
    }

    #[test]
    fn dynamic_bytes_round_trip_as_hex() {
        let root = params(&[("data", "bytes")]);
        let value = json!({ "data": "0x0102030405" });
        let bytes = encode(&root, &value).unwrap();
        assert_eq!(bytes.len(), 32 * 3);
        assert_eq!(decode(&root, &bytes).unwrap(), value);
    }

    #[test]
    fn big_unsigned_values_cross_as_decimal_strings() {
        let root = params(&[("x", "uint256")]);
        let huge = "340282366920938463463374607431768211457"; // 2^128 + 1
        let bytes = encode(&root, &json!({ "x": huge })).unwrap();
        assert_eq!(decode(&root, &bytes).unwrap(), json!({ "x": huge }));
    }

    #[test]
    fn encoder_rejects_bad_values() {
        let uint = params(&[("x", "uint256")]);
        assert!(encode(&uint, &json!({ "x": -5 })).is_err());
        assert!(encode(&uint, &json!({ "x": "-5" })).is_err());
        assert!(encode(&uint, &json!({ "x": true })).is_err());
        assert!(encode(&uint, &json!({})).is_err());

        let address = params(&[("a", "address")]);
        // 0x prefix plus 40 hex digits is required.
        assert!(encode(&address, &json!({ "a": "0x01" })).is_err());
        assert!(
            encode(&address, &json!({ "a": "00000000000000000000000000000000000000ff" })).is_err()
        );

        let fixed = params(&[("b", "bytes4")]);
        assert!(encode(&fixed, &json!({ "b": "0x0102" })).is_err());

        let arr = params(&[("xs", "uint256[2]")]);
        assert!(encode(&arr, &json!({ "xs": [1] })).is_err());
    }

    #[test]
    fn decoder_rejects_truncated_buffers_and_wild_pointers() {
        let root = params(&[("x", "uint256")]);
        assert!(decode(&root, &[0u8; 31]).is_err());

        let dynamic = params(&[("s", "string")]);
        // A pointer way outside the buffer.
        let mut buf = [0u8; 32];
        buf[30] = 0x10;
        assert!(decode(&dynamic, &buf).is_err());
    }
}
