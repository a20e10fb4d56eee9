// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! Encoding of JSON-shaped values into the 32-byte-slot ABI wire layout.
//!
//! The layout is two-pass by nature: every dynamic node owns a pointer slot
//! in its parent's head, and the pointer value is only known once the tail
//! lands. Rather than re-entering the recursion we queue a deferred task per
//! dynamic node (capturing the slot to patch and the offset basis the
//! pointer is measured from) and drain the queue FIFO after the static pass.
//! Tasks may enqueue further tasks for their own dynamic children.

use crate::error::Error;
use crate::types::{TypeKind, TypeNode};
use crate::utils;
use num_bigint::{BigInt, BigUint};
use serde_json::Value;
use std::collections::VecDeque;

/// Encode `value` against a parameter tree, producing a byte string that is
/// always a multiple of 32 bytes.
pub fn encode(root: &TypeNode, value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut pending = VecDeque::new();
    encode_node(root, value, 0, &mut out, &mut pending)?;
    while let Some(task) = pending.pop_front() {
        run_deferred(task, &mut out, &mut pending)?;
    }
    Ok(out)
}

/// A deferred tail encoding for one dynamic node.
struct Task<'a> {
    node: &'a TypeNode,
    value: &'a Value,
    /// Index of the 32 byte pointer slot to patch.
    slot: usize,
    /// The offset basis the patched pointer is measured from: the output
    /// length at the moment the parent began encoding its children.
    basis: usize,
}

fn encode_node<'a>(
    node: &'a TypeNode,
    value: &'a Value,
    basis: usize,
    out: &mut Vec<u8>,
    pending: &mut VecDeque<Task<'a>>,
) -> Result<(), Error> {
    if node.dynamic {
        // Reserve the pointer slot now; the tail is written later.
        let slot = out.len();
        out.extend_from_slice(&[0u8; 32]);
        pending.push_back(Task {
            node,
            value,
            slot,
            basis,
        });
        return Ok(());
    }

    match &node.kind {
        TypeKind::Array { elem, len } => {
            let items = expect_array(node, value, *len)?;
            for item in items {
                encode_node(elem, item, basis, out, pending)?;
            }
        }
        TypeKind::Tuple { components } => {
            for (component, item) in tuple_items(node, value, components)? {
                encode_node(component, item, basis, out, pending)?;
            }
        }
        TypeKind::Address => {
            let s = value.as_str().ok_or_else(|| value_shape(node, value))?;
            if s.len() != 42 || !s.starts_with("0x") {
                return Err(value_shape(node, value));
            }
            let bytes = utils::parse_hex(s)?;
            let mut slot = [0u8; 32];
            slot[12..].copy_from_slice(&bytes);
            out.extend_from_slice(&slot);
        }
        TypeKind::FixedBytes { byte_width } => {
            let s = value.as_str().ok_or_else(|| value_shape(node, value))?;
            let bytes = utils::parse_hex(s)?;
            if bytes.len() != *byte_width {
                return Err(value_shape(node, value));
            }
            append_padded(out, &bytes);
        }
        TypeKind::Bool => {
            let b = value.as_bool().ok_or_else(|| value_shape(node, value))?;
            out.extend_from_slice(&usize_slot(b as usize));
        }
        TypeKind::Uint { .. } => {
            let n = unsigned_value(node, value)?;
            out.extend_from_slice(&utils::uint_to_slot(&n)?);
        }
        TypeKind::Int { .. } => {
            let n = signed_value(node, value)?;
            out.extend_from_slice(&utils::int_to_slot(&n)?);
        }
        TypeKind::Bytes | TypeKind::String => {
            unreachable!("string and unsized bytes are always dynamic; qed")
        }
    }
    Ok(())
}

fn run_deferred<'a>(
    task: Task<'a>,
    out: &mut Vec<u8>,
    pending: &mut VecDeque<Task<'a>>,
) -> Result<(), Error> {
    let Task {
        node,
        value,
        slot,
        basis,
    } = task;

    // The tail starts here; patch the reserved slot with its offset
    // relative to the captured basis.
    let pointer = out.len() - basis;
    out[slot..slot + 32].copy_from_slice(&usize_slot(pointer));

    match &node.kind {
        TypeKind::Array { elem, len } => {
            let items = expect_array(node, value, *len)?;
            // Dynamic arrays carry their length; fixed-size arrays of
            // dynamic elements do not.
            if len.is_none() {
                out.extend_from_slice(&usize_slot(items.len()));
            }
            let new_basis = out.len();
            for item in items {
                encode_node(elem, item, new_basis, out, pending)?;
            }
        }
        TypeKind::Tuple { components } => {
            let items = tuple_items(node, value, components)?;
            let new_basis = out.len();
            for (component, item) in items {
                encode_node(component, item, new_basis, out, pending)?;
            }
        }
        TypeKind::String => {
            let s = value.as_str().ok_or_else(|| value_shape(node, value))?;
            out.extend_from_slice(&usize_slot(s.len()));
            append_padded(out, s.as_bytes());
        }
        TypeKind::Bytes => {
            let s = value.as_str().ok_or_else(|| value_shape(node, value))?;
            let bytes = utils::parse_hex(s)?;
            out.extend_from_slice(&usize_slot(bytes.len()));
            append_padded(out, &bytes);
        }
        _ => unreachable!("only dynamic nodes are deferred; qed"),
    }
    Ok(())
}

/// Append `data` and right-zero-pad the output to a 32 byte boundary.
fn append_padded(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    let partial = data.len() % 32;
    if partial != 0 {
        out.resize(out.len() + 32 - partial, 0);
    }
}

/// A 32 byte big-endian slot holding a small unsigned number.
pub(crate) fn usize_slot(n: usize) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[24..].copy_from_slice(&(n as u64).to_be_bytes());
    slot
}

fn expect_array<'v>(
    node: &TypeNode,
    value: &'v Value,
    declared_len: Option<usize>,
) -> Result<&'v Vec<Value>, Error> {
    let items = value.as_array().ok_or_else(|| value_shape(node, value))?;
    if let Some(k) = declared_len {
        if items.len() != k {
            return Err(value_shape(node, value));
        }
    }
    Ok(items)
}

/// Pair up tuple components with their values, looked up by field name.
fn tuple_items<'a>(
    node: &TypeNode,
    value: &'a Value,
    components: &'a [TypeNode],
) -> Result<Vec<(&'a TypeNode, &'a Value)>, Error> {
    let obj = value.as_object().ok_or_else(|| value_shape(node, value))?;
    components
        .iter()
        .map(|c| {
            let item = obj.get(&c.field_name).ok_or_else(|| Error::ValueShape {
                expected: format!("object with field `{}`", c.field_name),
                given: value.to_string(),
            })?;
            Ok((c, item))
        })
        .collect()
}

fn unsigned_value(node: &TypeNode, value: &Value) -> Result<BigUint, Error> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(BigUint::from)
            .ok_or_else(|| Error::NumberOutOfRange(n.to_string())),
        Value::String(s) => {
            let n = s
                .parse::<BigInt>()
                .map_err(|_| Error::NumberOutOfRange(s.clone()))?;
            n.to_biguint().ok_or_else(|| Error::NumberOutOfRange(s.clone()))
        }
        _ => Err(value_shape(node, value)),
    }
}

fn signed_value(node: &TypeNode, value: &Value) -> Result<BigInt, Error> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(BigInt::from(u))
            } else if let Some(i) = n.as_i64() {
                Ok(BigInt::from(i))
            } else {
                Err(Error::NumberOutOfRange(n.to_string()))
            }
        }
        Value::String(s) => s
            .parse::<BigInt>()
            .map_err(|_| Error::NumberOutOfRange(s.clone())),
        _ => Err(value_shape(node, value)),
    }
}

fn value_shape(node: &TypeNode, value: &Value) -> Error {
    Error::ValueShape {
        expected: node.describe(),
        given: value.to_string(),
    }
}
