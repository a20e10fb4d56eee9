// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The parsed contract descriptor: function and event lookup, canonical
//! signatures, and the call-data and event entry points built on the codec.

use crate::codec;
use crate::error::Error;
use crate::types::TypeNode;
use crate::utils;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const LOG_TARGET: &str = "ethxt-abi";

/// One field of a function or event descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiField {
    /// The field name; may be empty, notably for unnamed outputs.
    #[serde(default)]
    pub name: String,
    /// The ABI type string, e.g. `uint256` or `tuple[2]`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Component fields, for tuples.
    #[serde(default)]
    pub components: Vec<AbiField>,
    /// For event fields only: whether the field is carried as a topic.
    #[serde(default)]
    pub indexed: bool,
}

impl AbiField {
    /// A field with no components.
    pub fn new(name: &str, ty: &str) -> Self {
        AbiField {
            name: name.to_string(),
            ty: ty.to_string(),
            components: Vec::new(),
            indexed: false,
        }
    }

    /// A tuple field with the given components.
    pub fn with_components(name: &str, ty: &str, components: Vec<AbiField>) -> Self {
        AbiField {
            components,
            ..AbiField::new(name, ty)
        }
    }
}

/// One item of the descriptor array. Items whose `type` is neither
/// `function` nor `event` (constructors, fallbacks, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct AbiItem {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    inputs: Vec<AbiField>,
    #[serde(default)]
    outputs: Vec<AbiField>,
}

/// A callable function: its selector plus parsed input and output trees.
#[derive(Debug, Clone)]
pub struct Function {
    /// The function name.
    pub name: String,
    /// First 4 bytes of keccak-256 of the canonical signature.
    pub selector: [u8; 4],
    inputs: TypeNode,
    outputs: TypeNode,
}

/// A decodable event: its topic-0 plus parsed indexed and non-indexed
/// field trees.
#[derive(Debug, Clone)]
pub struct Event {
    /// The event name.
    pub name: String,
    /// Full keccak-256 of the canonical signature.
    pub topic0: [u8; 32],
    indexed: TypeNode,
    non_indexed: TypeNode,
}

/// A decoded event: the event name and its arguments, indexed and
/// non-indexed fields merged into one object ordered by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// The event name.
    pub name: String,
    /// The merged arguments.
    pub args: Value,
}

/// A parsed contract ABI.
///
/// Construct one from the contract's descriptor JSON, then use it to build
/// call data and decode results and event payloads:
///
/// ```rust
/// use ethxt_abi::Abi;
/// use serde_json::json;
///
/// let abi = Abi::from_json(r#"[
///     {"type": "function", "name": "transfer", "inputs": [
///         {"name": "to", "type": "address"},
///         {"name": "amount", "type": "uint256"}
///     ], "outputs": [{"name": "", "type": "bool"}]}
/// ]"#).unwrap();
///
/// let data = abi.encode_function_data("transfer", &json!({
///     "to": "0x0000000000000000000000000000000000000001",
///     "amount": 1000,
/// })).unwrap();
/// assert_eq!(data[..4], [0xa9, 0x05, 0x9c, 0xbb]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Abi {
    functions: HashMap<String, Function>,
    events: HashMap<[u8; 32], Event>,
}

impl Abi {
    /// Parse a descriptor JSON string.
    pub fn from_json(abi: impl AsRef<str>) -> Result<Self, Error> {
        let items: Vec<AbiItem> = serde_json::from_str(abi.as_ref())?;
        Self::from_items(items)
    }

    /// Parse an already-deserialized descriptor value.
    pub fn from_value(abi: Value) -> Result<Self, Error> {
        let items: Vec<AbiItem> = serde_json::from_value(abi)?;
        Self::from_items(items)
    }

    fn from_items(items: Vec<AbiItem>) -> Result<Self, Error> {
        let mut abi = Abi::default();

        for item in items {
            match item.kind.as_str() {
                "function" => {
                    let sig = signature(&item.name, &item.inputs);
                    let hash = utils::keccak256(&sig);
                    let selector = hash[..4].try_into().expect("4 byte prefix; qed");

                    if abi.functions.contains_key(&item.name) {
                        tracing::warn!(
                            target: LOG_TARGET,
                            "Duplicate function name `{}` in ABI; keeping the first definition",
                            item.name
                        );
                        continue;
                    }

                    let function = Function {
                        selector,
                        inputs: TypeNode::params(&item.inputs)?,
                        outputs: TypeNode::params(&item.outputs)?,
                        name: item.name.clone(),
                    };
                    abi.functions.insert(item.name, function);
                }
                "event" => {
                    let sig = signature(&item.name, &item.inputs);
                    let topic0 = utils::keccak256(&sig);

                    let (indexed, non_indexed): (Vec<_>, Vec<_>) =
                        item.inputs.into_iter().partition(|f| f.indexed);

                    let event = Event {
                        topic0,
                        indexed: TypeNode::params(&indexed)?,
                        non_indexed: TypeNode::params(&non_indexed)?,
                        name: item.name,
                    };
                    abi.events.entry(topic0).or_insert(event);
                }
                _ => {}
            }
        }

        Ok(abi)
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Look up an event by its topic-0.
    pub fn event(&self, topic0: &[u8; 32]) -> Option<&Event> {
        self.events.get(topic0)
    }

    /// Build the call data for a function: its 4 byte selector followed by
    /// the ABI-encoded arguments. Arguments are an object keyed by input
    /// field name.
    pub fn encode_function_data(&self, name: &str, args: &Value) -> Result<Vec<u8>, Error> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;

        let mut data = function.selector.to_vec();
        data.extend_from_slice(&codec::encode(&function.inputs, args)?);
        Ok(data)
    }

    /// Decode the return data of a function. The result is always an
    /// object keyed by the (possibly empty) output names.
    pub fn decode_function_result(&self, name: &str, data: &[u8]) -> Result<Value, Error> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;

        codec::decode(&function.outputs, data)
    }

    /// Decode an event from its concatenated topics and its data payload.
    /// Topic-0 selects the event; indexed fields are decoded from the
    /// remaining topics and non-indexed fields from `data`.
    pub fn decode_event(&self, topics: &[u8], data: &[u8]) -> Result<DecodedEvent, Error> {
        let topic0: [u8; 32] = topics
            .get(..32)
            .ok_or(Error::BufferUnderrun)?
            .try_into()
            .expect("32 byte slice; qed");
        let event = self.events.get(&topic0).ok_or(Error::UnknownEvent(topic0))?;

        let mut args = codec::decode(&event.indexed, &topics[32..])?;
        let non_indexed = codec::decode(&event.non_indexed, data)?;

        // Both are objects by construction; the merged map stays ordered
        // by field name.
        let (Value::Object(merged), Value::Object(rest)) = (&mut args, non_indexed) else {
            unreachable!("parameter roots always decode to objects; qed")
        };
        for (key, value) in rest {
            merged.insert(key, value);
        }

        Ok(DecodedEvent {
            name: event.name.clone(),
            args,
        })
    }
}

/// The canonical signature `name(t1,t2,...)`, with tuples recursively
/// expanded to `(s1,s2,...)` followed by their trailing array modifiers.
fn signature(name: &str, fields: &[AbiField]) -> String {
    let mut out = String::from(name);
    out.push('(');
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match field.ty.strip_prefix("tuple") {
            Some(array_suffix) => {
                out.push_str(&signature("", &field.components));
                out.push_str(array_suffix);
            }
            None => out.push_str(&field.ty),
        }
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ERC20: &str = r#"[
        {
            "type": "function",
            "name": "transfer",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}]
        },
        {
            "type": "event",
            "name": "Transfer",
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        },
        {"type": "fallback"}
    ]"#;

    #[test]
    fn transfer_call_data_matches_the_known_layout() {
        let abi = Abi::from_json(ERC20).unwrap();
        let data = abi
            .encode_function_data(
                "transfer",
                &json!({
                    "to": "0x0000000000000000000000000000000000000001",
                    "amount": 1000,
                }),
            )
            .unwrap();

        assert_eq!(
            hex::encode(&data),
            "a9059cbb\
             0000000000000000000000000000000000000000000000000000000000000001\
             00000000000000000000000000000000000000000000000000000000000003e8"
        );
    }

    #[test]
    fn selector_depends_only_on_types() {
        let renamed = ERC20.replace("\"to\"", "\"recipient\"");
        let a = Abi::from_json(ERC20).unwrap();
        let b = Abi::from_json(renamed).unwrap();
        assert_eq!(
            a.function("transfer").unwrap().selector,
            b.function("transfer").unwrap().selector,
        );
    }

    #[test]
    fn tuple_signatures_expand_recursively() {
        let fields = vec![
            AbiField::with_components(
                "points",
                "tuple[2]",
                vec![AbiField::new("x", "uint256"), AbiField::new("y", "uint256")],
            ),
            AbiField::new("data", "bytes"),
        ];
        assert_eq!(
            signature("plot", &fields),
            "plot((uint256,uint256)[2],bytes)"
        );
    }

    #[test]
    fn duplicate_function_names_keep_the_first_definition() {
        let abi = Abi::from_json(
            r#"[
                {"type": "function", "name": "f",
                 "inputs": [{"name": "x", "type": "uint256"}], "outputs": []},
                {"type": "function", "name": "f",
                 "inputs": [{"name": "x", "type": "bool"}], "outputs": []}
            ]"#,
        )
        .unwrap();

        // The first definition's selector is keccak("f(uint256)")[..4].
        let expected: [u8; 4] = utils::keccak256("f(uint256)")[..4].try_into().unwrap();
        assert_eq!(abi.function("f").unwrap().selector, expected);
    }

    #[test]
    fn unknown_function_is_an_error() {
        let abi = Abi::from_json(ERC20).unwrap();
        assert!(matches!(
            abi.encode_function_data("mint", &json!({})),
            Err(Error::UnknownFunction(_))
        ));
        assert!(matches!(
            abi.decode_function_result("mint", &[]),
            Err(Error::UnknownFunction(_))
        ));
    }

    #[test]
    fn unnamed_single_output_decodes_under_the_empty_key() {
        let abi = Abi::from_json(ERC20).unwrap();
        let mut ret = [0u8; 32];
        ret[31] = 1;
        let decoded = abi.decode_function_result("transfer", &ret).unwrap();
        assert_eq!(decoded, json!({ "": true }));
    }

    #[test]
    fn transfer_event_decodes_with_merged_args() {
        let abi = Abi::from_json(ERC20).unwrap();

        // Transfer(address,address,uint256) has a well known topic-0.
        let topic0 = utils::keccak256("Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(topic0),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );

        let mut topics = topic0.to_vec();
        let mut from = [0u8; 32];
        from[31] = 0xaa;
        let mut to = [0u8; 32];
        to[31] = 0xbb;
        topics.extend_from_slice(&from);
        topics.extend_from_slice(&to);

        let mut data = [0u8; 32];
        data[31] = 0x05;

        let decoded = abi.decode_event(&topics, &data).unwrap();
        assert_eq!(decoded.name, "Transfer");
        assert_eq!(
            decoded.args,
            json!({
                "from": "0x00000000000000000000000000000000000000aa",
                "to": "0x00000000000000000000000000000000000000bb",
                "value": "5",
            })
        );
    }

    #[test]
    fn unknown_topic_is_an_error() {
        let abi = Abi::from_json(ERC20).unwrap();
        let topics = [0u8; 32];
        assert!(matches!(
            abi.decode_event(&topics, &[]),
            Err(Error::UnknownEvent(_))
        ));
    }
}
