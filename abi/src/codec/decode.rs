// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! Decoding of the 32-byte-slot ABI wire layout back into JSON-shaped
//! values.
//!
//! The decoder walks a buffer through a cursor. Following a dynamic pointer
//! reslices the buffer at the pointer target (leaving the outer cursor
//! parked just past the pointer slot), and an aggregate's tail establishes a
//! new offset basis by reslicing again at the current position, so inner
//! pointers are interpreted relative to the right area.

use crate::error::Error;
use crate::types::{TypeKind, TypeNode};
use crate::utils;
use serde_json::{Map, Value};

/// Decode `buffer` against a parameter tree.
pub fn decode(root: &TypeNode, buffer: &[u8]) -> Result<Value, Error> {
    let mut cursor = Cursor::new(buffer);
    decode_node(root, &mut cursor)
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Consume the next `n` bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).ok_or(Error::BufferUnderrun)?;
        let slice = self.buf.get(self.pos..end).ok_or(Error::BufferUnderrun)?;
        self.pos = end;
        Ok(slice)
    }

    /// Consume a 32 byte slot holding a small unsigned number (a pointer or
    /// a length). Anything that does not fit a u64 is out of range for any
    /// real buffer.
    fn take_usize(&mut self) -> Result<usize, Error> {
        let slot = self.take(32)?;
        if slot[..24].iter().any(|b| *b != 0) {
            return Err(Error::PointerOutOfRange);
        }
        let n = u64::from_be_bytes(slot[24..].try_into().expect("8 byte slice; qed"));
        Ok(n as usize)
    }

    /// Read a pointer slot and return a fresh cursor over the buffer from
    /// the pointer target onwards. This cursor keeps its position, parked
    /// just past the pointer slot.
    fn follow_pointer(&mut self) -> Result<Cursor<'a>, Error> {
        let ptr = self.take_usize()?;
        let tail = self.buf.get(ptr..).ok_or(Error::PointerOutOfRange)?;
        Ok(Cursor::new(tail))
    }

    /// A fresh cursor over everything from the current position: the new
    /// offset basis for an aggregate's elements.
    fn new_basis(&self) -> Cursor<'a> {
        Cursor::new(&self.buf[self.pos..])
    }
}

fn decode_node(node: &TypeNode, cursor: &mut Cursor) -> Result<Value, Error> {
    match &node.kind {
        TypeKind::Array { elem, len } => {
            if node.dynamic {
                let mut tail = cursor.follow_pointer()?;
                // T[k] with dynamic T has no length slot; the declared
                // cardinality is the length.
                let n = match len {
                    Some(k) => *k,
                    None => tail.take_usize()?,
                };
                let mut elems = tail.new_basis();
                let mut arr = Vec::new();
                for _ in 0..n {
                    arr.push(decode_node(elem, &mut elems)?);
                }
                Ok(Value::Array(arr))
            } else {
                let k = len.expect("static arrays have a declared length; qed");
                let mut arr = Vec::with_capacity(k);
                for _ in 0..k {
                    arr.push(decode_node(elem, cursor)?);
                }
                Ok(Value::Array(arr))
            }
        }
        TypeKind::Tuple { components } => {
            if node.dynamic {
                let mut tail = cursor.follow_pointer()?;
                decode_tuple(components, &mut tail)
            } else {
                decode_tuple(components, cursor)
            }
        }
        TypeKind::Address => {
            let slot = cursor.take(32)?;
            Ok(Value::String(utils::to_hex_prefixed(&slot[12..])))
        }
        TypeKind::Uint { .. } => {
            let slot = cursor.take(32)?;
            Ok(Value::String(utils::slot_to_uint(slot).to_str_radix(10)))
        }
        TypeKind::Int { .. } => {
            let slot = cursor.take(32)?;
            Ok(Value::String(utils::slot_to_int(slot).to_string()))
        }
        TypeKind::Bool => {
            let slot = cursor.take(32)?;
            Ok(Value::Bool(slot.iter().any(|b| *b != 0)))
        }
        TypeKind::FixedBytes { byte_width } => {
            let slot = cursor.take(32)?;
            let width = (*byte_width).min(32);
            Ok(Value::String(utils::to_hex_prefixed(&slot[..width])))
        }
        TypeKind::String => {
            let bytes = take_length_prefixed(cursor)?;
            Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        TypeKind::Bytes => {
            let bytes = take_length_prefixed(cursor)?;
            Ok(Value::String(utils::to_hex_prefixed(bytes)))
        }
    }
}

/// Tuples decode into an object keyed (and therefore ordered) by field name.
fn decode_tuple(components: &[TypeNode], cursor: &mut Cursor) -> Result<Value, Error> {
    let mut obj = Map::new();
    for component in components {
        let value = decode_node(component, cursor)?;
        obj.insert(component.field_name.clone(), value);
    }
    Ok(Value::Object(obj))
}

/// Follow a pointer to a `length ++ data` tail.
fn take_length_prefixed<'a>(cursor: &mut Cursor<'a>) -> Result<&'a [u8], Error> {
    let mut tail = cursor.follow_pointer()?;
    let len = tail.take_usize()?;
    tail.take(len)
}
