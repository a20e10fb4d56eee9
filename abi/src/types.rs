// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! Parsed representations of ABI type strings.
//!
//! A [`TypeNode`] tree is built once per function or event when the
//! descriptor is parsed, and then drives both the encoder and the decoder.

use crate::contract::AbiField;
use crate::error::Error;

/// A node in a parsed ABI type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    /// The field name this node was declared with; empty for unnamed
    /// parameters and for array element nodes.
    pub field_name: String,
    /// What the node is.
    pub kind: TypeKind,
    /// Whether the encoded form of this subtree has a value-dependent
    /// length, requiring indirection through a pointer slot.
    pub dynamic: bool,
}

/// The base kind of a [`TypeNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// An unsigned integer. The width is in bytes, and is absent for a
    /// bare `uint` (the codec treats every integer as a 32 byte slot).
    Uint {
        /// Declared width in bytes, if any.
        byte_width: Option<usize>,
    },
    /// A signed (two's-complement) integer; width as for [`TypeKind::Uint`].
    Int {
        /// Declared width in bytes, if any.
        byte_width: Option<usize>,
    },
    /// A 20 byte account address.
    Address,
    /// A boolean, encoded as `uint` 0 or 1.
    Bool,
    /// A fixed-width byte string, `bytes1` ..= `bytes32`.
    FixedBytes {
        /// Declared width in bytes.
        byte_width: usize,
    },
    /// An unsized byte string. Always dynamic.
    Bytes,
    /// A UTF-8 text string. Always dynamic.
    String,
    /// An array of some element type.
    Array {
        /// The element type.
        elem: Box<TypeNode>,
        /// `Some(k)` for `T[k]`, `None` for the dynamic `T[]`.
        len: Option<usize>,
    },
    /// An ordered set of named components.
    Tuple {
        /// The component nodes, in declaration order.
        components: Vec<TypeNode>,
    },
}

impl TypeNode {
    /// Build the virtual root tuple for a parameter list. The root is
    /// never reached through a pointer, so its dynamism is forced off and
    /// callers provide the top-level offset basis.
    pub(crate) fn params(fields: &[AbiField]) -> Result<TypeNode, Error> {
        let components = fields
            .iter()
            .map(|f| TypeNode::parse(&f.name, &f.ty, &f.components))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeNode {
            field_name: String::new(),
            kind: TypeKind::Tuple { components },
            dynamic: false,
        })
    }

    /// Parse a single type string (with its tuple `components`, if any)
    /// into a node.
    pub(crate) fn parse(
        field_name: &str,
        ty: &str,
        components: &[AbiField],
    ) -> Result<TypeNode, Error> {
        // Array suffixes bind last: peel the outermost one and recurse on
        // the inner type.
        if let Some(inner) = ty.strip_suffix(']') {
            let open = inner
                .rfind('[')
                .ok_or_else(|| Error::UnbalancedBrackets(ty.to_string()))?;
            let len_spec = &inner[open + 1..];
            let len = if len_spec.is_empty() {
                None
            } else {
                let n = len_spec
                    .parse::<usize>()
                    .map_err(|_| Error::BadArrayLength(ty.to_string()))?;
                Some(n)
            };
            let elem = TypeNode::parse(field_name, &inner[..open], components)?;
            let dynamic = len.is_none() || elem.dynamic;
            return Ok(TypeNode {
                field_name: field_name.to_string(),
                kind: TypeKind::Array {
                    elem: Box::new(elem),
                    len,
                },
                dynamic,
            });
        }

        // Split the alphabetic base kind from the trailing digit run.
        let split = ty
            .find(|c: char| !c.is_ascii_lowercase())
            .unwrap_or(ty.len());
        let (base, width_spec) = ty.split_at(split);
        let width = if width_spec.is_empty() {
            None
        } else {
            let n = width_spec
                .parse::<usize>()
                .map_err(|_| Error::BadWidth(ty.to_string()))?;
            Some(n)
        };

        let (kind, dynamic) = match base {
            // uint/int widths are declared in bits.
            "uint" => (
                TypeKind::Uint {
                    byte_width: width.map(|w| w / 8),
                },
                false,
            ),
            "int" => (
                TypeKind::Int {
                    byte_width: width.map(|w| w / 8),
                },
                false,
            ),
            "address" => (TypeKind::Address, false),
            "bool" => (TypeKind::Bool, false),
            "bytes" => match width {
                Some(w) => (TypeKind::FixedBytes { byte_width: w }, false),
                None => (TypeKind::Bytes, true),
            },
            "string" => (TypeKind::String, true),
            "tuple" => {
                let components = components
                    .iter()
                    .map(|f| TypeNode::parse(&f.name, &f.ty, &f.components))
                    .collect::<Result<Vec<_>, _>>()?;
                let dynamic = components.iter().any(|c| c.dynamic);
                (TypeKind::Tuple { components }, dynamic)
            }
            _ => return Err(Error::UnknownBase(ty.to_string())),
        };

        Ok(TypeNode {
            field_name: field_name.to_string(),
            kind,
            dynamic,
        })
    }

    /// A human readable type string, used in value-shape error messages.
    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            TypeKind::Uint { byte_width } => match byte_width {
                Some(w) => format!("uint{}", w * 8),
                None => "uint".to_string(),
            },
            TypeKind::Int { byte_width } => match byte_width {
                Some(w) => format!("int{}", w * 8),
                None => "int".to_string(),
            },
            TypeKind::Address => "address".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::FixedBytes { byte_width } => format!("bytes{byte_width}"),
            TypeKind::Bytes => "bytes".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Array { elem, len } => match len {
                Some(k) => format!("{}[{k}]", elem.describe()),
                None => format!("{}[]", elem.describe()),
            },
            TypeKind::Tuple { components } => {
                let inner: Vec<_> = components.iter().map(|c| c.describe()).collect();
                format!("({})", inner.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ty: &str) -> Result<TypeNode, Error> {
        TypeNode::parse("x", ty, &[])
    }

    #[test]
    fn scalar_widths_are_in_bytes() {
        let node = parse("uint256").unwrap();
        assert_eq!(
            node.kind,
            TypeKind::Uint {
                byte_width: Some(32)
            }
        );
        assert!(!node.dynamic);

        let node = parse("int64").unwrap();
        assert_eq!(node.kind, TypeKind::Int { byte_width: Some(8) });

        // bytes widths are already in bytes.
        let node = parse("bytes32").unwrap();
        assert_eq!(node.kind, TypeKind::FixedBytes { byte_width: 32 });
        assert!(!node.dynamic);
    }

    #[test]
    fn bare_string_and_bytes_are_dynamic() {
        assert!(parse("string").unwrap().dynamic);
        assert!(parse("bytes").unwrap().dynamic);
        assert!(!parse("bool").unwrap().dynamic);
        assert!(!parse("address").unwrap().dynamic);
    }

    #[test]
    fn array_suffixes_nest_outermost_last() {
        // uint256[3][] is a dynamic array of uint256[3].
        let node = parse("uint256[3][]").unwrap();
        let TypeKind::Array { elem, len } = &node.kind else {
            panic!("expected array");
        };
        assert_eq!(*len, None);
        assert!(node.dynamic);
        let TypeKind::Array { elem: inner, len } = &elem.kind else {
            panic!("expected inner array");
        };
        assert_eq!(*len, Some(3));
        assert_eq!(
            inner.kind,
            TypeKind::Uint {
                byte_width: Some(32)
            }
        );
    }

    #[test]
    fn fixed_array_of_static_elements_is_static() {
        let node = parse("uint256[4]").unwrap();
        assert!(!node.dynamic);
        // ... but a fixed array of dynamic elements is dynamic.
        let node = parse("string[4]").unwrap();
        assert!(node.dynamic);
    }

    #[test]
    fn tuple_dynamism_is_inherited() {
        let static_fields = vec![
            AbiField::new("a", "uint256"),
            AbiField::new("b", "address"),
        ];
        let node = TypeNode::parse("t", "tuple", &static_fields).unwrap();
        assert!(!node.dynamic);

        let dynamic_fields = vec![AbiField::new("a", "uint256"), AbiField::new("b", "string")];
        let node = TypeNode::parse("t", "tuple", &dynamic_fields).unwrap();
        assert!(node.dynamic);
    }

    #[test]
    fn root_parameter_tuple_is_forced_static() {
        let fields = vec![AbiField::new("s", "string")];
        let root = TypeNode::params(&fields).unwrap();
        assert!(!root.dynamic);
    }

    #[test]
    fn malformed_type_strings_are_rejected() {
        assert!(matches!(parse("uint256]"), Err(Error::UnbalancedBrackets(_))));
        assert!(matches!(parse("uint256[x]"), Err(Error::BadArrayLength(_))));
        assert!(matches!(parse("foo"), Err(Error::UnknownBase(_))));
        assert!(matches!(parse("uint256x"), Err(Error::BadWidth(_))));
    }
}
