// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! Types representing the errors that can be emitted while parsing ABI
//! descriptors and encoding or decoding ABI payloads.

/// This encapsulates any errors that could be emitted in this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The ABI descriptor JSON could not be deserialized.
    #[error("ABI error: cannot deserialize descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
    /// A type string contained unbalanced array brackets.
    #[error("ABI error: unbalanced array brackets in type: {0}")]
    UnbalancedBrackets(String),
    /// A fixed array cardinality could not be parsed as a decimal number.
    #[error("ABI error: malformed array length in type: {0}")]
    BadArrayLength(String),
    /// A scalar width suffix could not be parsed as a decimal number.
    #[error("ABI error: malformed width in type: {0}")]
    BadWidth(String),
    /// The base kind of a type string was not recognised.
    #[error("ABI error: unknown base kind: {0}")]
    UnknownBase(String),
    /// No function with this name exists in the descriptor.
    #[error("ABI error: unknown function: {0}")]
    UnknownFunction(String),
    /// No event matching this topic-0 exists in the descriptor.
    #[error("ABI error: unknown event topic: 0x{}", hex::encode(.0))]
    UnknownEvent([u8; 32]),
    /// A value handed to the encoder did not have the shape its type
    /// descriptor requires.
    #[error("ABI error: value does not match type {expected}: {given}")]
    ValueShape {
        /// The type string the value was encoded against.
        expected: String,
        /// A rendering of the offending value.
        given: String,
    },
    /// A numeric input could not be parsed or exceeded 32 bytes.
    #[error("ABI error: numeric value out of range: {0}")]
    NumberOutOfRange(String),
    /// A hex string input could not be decoded.
    #[error("ABI error: invalid hex input: {0}")]
    InvalidHex(String),
    /// The decode cursor ran off the end of the buffer.
    #[error("ABI error: buffer underrun while decoding")]
    BufferUnderrun,
    /// A dynamic-indirection pointer landed outside the buffer.
    #[error("ABI error: pointer target out of range")]
    PointerOutOfRange,
}
