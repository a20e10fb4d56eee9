// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! This crate implements the contract ABI used by Ethereum compatible
//! chains: parsing contract descriptors, building call data, and encoding
//! and decoding the 32-byte-slot wire layout (nested tuples and arrays,
//! dynamic indirection, arbitrary-precision integers and byte strings).
//!
//! The entry point is [`Abi`], built from a contract's descriptor JSON.
//! Values cross the codec boundary as [`serde_json::Value`]s; integers that
//! may exceed 64 bits are exchanged as decimal strings.

pub mod codec;
pub mod contract;
pub mod error;
pub mod types;
pub mod utils;

// Expose the most common things at the top level:
pub use contract::{Abi, AbiField, DecodedEvent, Event, Function};
pub use error::Error;
pub use types::{TypeKind, TypeNode};
