//! This module contains the parsed representation of attribute type
//! strings, and the parser that produces it.
//!
//! Attribute types arrive from the AST-conversion stage in a fixed textual
//! grammar (`"uint256"`, `"address[2][]"`, `"mapping(address=>uint256)"`).
//! Parsing each string once into a small tree removes all textual pattern
//! matching from the size and reference calculations.

use serde::{Deserialize, Serialize};

use crate::{
    constant::{ADDRESS_SIZE_BYTES, BOOL_SIZE_BYTES, BYTE_SIZE_BITS, SLOT_SIZE_BYTES},
    error::{Error, Result},
    model::UmlClass,
};

/// An elementary (value) type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementaryType {
    /// Booleans, stored as a single byte.
    Bool,

    /// A 160-bit account address.
    Address,

    /// A dynamically-sized UTF-8 string; its slot holds the length or
    /// short inline data.
    String,

    /// A dynamically-sized byte array; its slot holds the length or short
    /// inline data.
    Bytes,

    /// Unsigned integers of `bits` width, or the unsized `uint` alias when
    /// `None`.
    Uint { bits: Option<u32> },

    /// Signed integers of `bits` width, or the unsized `int` alias when
    /// `None`.
    Int { bits: Option<u32> },

    /// Signed fixed-point numbers of `bits` integer width, or the unsized
    /// `fixed` alias when `None`.
    Fixed { bits: Option<u32> },

    /// Unsigned fixed-point numbers of `bits` integer width, or the
    /// unsized `ufixed` alias when `None`.
    Ufixed { bits: Option<u32> },

    /// Byte arrays of a fixed `length` in bytes.
    FixedBytes { length: u32 },
}

impl ElementaryType {
    /// Parses `name` as an elementary type, returning `None` when it does
    /// not match any known primitive pattern.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "address" => Some(Self::Address),
            "string" => Some(Self::String),
            "bytes" => Some(Self::Bytes),
            "uint" => Some(Self::Uint { bits: None }),
            "int" => Some(Self::Int { bits: None }),
            "fixed" => Some(Self::Fixed { bits: None }),
            "ufixed" => Some(Self::Ufixed { bits: None }),
            _ => Self::parse_sized(name),
        }
    }

    /// Parses the sized primitive patterns: `uintN`, `intN`, `bytesN`,
    /// `fixedMxN` and `ufixedMxN`.
    fn parse_sized(name: &str) -> Option<Self> {
        if let Some(digits) = name.strip_prefix("uint") {
            return parse_width(digits).map(|bits| Self::Uint { bits: Some(bits) });
        }
        if let Some(digits) = name.strip_prefix("int") {
            return parse_width(digits).map(|bits| Self::Int { bits: Some(bits) });
        }
        if let Some(digits) = name.strip_prefix("bytes") {
            return parse_width(digits).map(|length| Self::FixedBytes { length });
        }
        if let Some(suffix) = name.strip_prefix("ufixed") {
            return parse_fixed_width(suffix).map(|bits| Self::Ufixed { bits: Some(bits) });
        }
        if let Some(suffix) = name.strip_prefix("fixed") {
            return parse_fixed_width(suffix).map(|bits| Self::Fixed { bits: Some(bits) });
        }

        None
    }

    /// Gets the number of bytes a value of this type occupies within a
    /// storage slot.
    #[must_use]
    pub fn storage_bytes(&self) -> u64 {
        match self {
            Self::Bool => BOOL_SIZE_BYTES,
            Self::Address => ADDRESS_SIZE_BYTES,
            Self::String | Self::Bytes => SLOT_SIZE_BYTES,
            Self::Uint { bits } | Self::Int { bits } | Self::Fixed { bits } | Self::Ufixed { bits } => {
                bits.map_or(SLOT_SIZE_BYTES, |bits| u64::from(bits).div_ceil(BYTE_SIZE_BITS))
            }
            Self::FixedBytes { length } => u64::from(*length),
        }
    }
}

/// Checks whether `name` is an elementary type name.
#[must_use]
pub fn is_elementary(name: &str) -> bool {
    ElementaryType::parse(name).is_some()
}

/// Parses a run of decimal digits as a declared bit or byte width.
fn parse_width(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// Parses the width suffix of a fixed-point type, keeping the integer
/// width and discarding the decimal count, which does not affect storage.
fn parse_fixed_width(suffix: &str) -> Option<u32> {
    match suffix.split_once('x') {
        Some((bits, decimals)) => {
            parse_width(decimals)?;
            parse_width(bits)
        }
        None => parse_width(suffix),
    }
}

/// One array dimension as written in the source.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// An empty dimension (`[]`), making the array dynamically sized.
    Dynamic,

    /// An integer-literal dimension (`[2]`).
    Literal(u64),

    /// An identifier dimension (`[N_COINS]`), resolved against the owning
    /// class's named constants.
    Named(String),
}

impl Dimension {
    /// Resolves this dimension to a fixed length, or `None` when the
    /// dimension is dynamic.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedArrayDimension`] when a named dimension has no
    /// matching numeric constant on `owning`.
    pub fn fixed_length(&self, owning: &UmlClass) -> Result<Option<u64>> {
        match self {
            Self::Dynamic => Ok(None),
            Self::Literal(length) => Ok(Some(*length)),
            Self::Named(name) => owning.constant_value(name).map(Some).ok_or_else(|| {
                Error::UnresolvedArrayDimension {
                    dimension: name.clone(),
                }
            }),
        }
    }
}

/// A parsed attribute type.
///
/// The outermost [`Self::Array`] node corresponds to the rightmost bracket
/// group in the source text: `address[2][]` is a dynamic array whose
/// elements have type `address[2]`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeName {
    /// An elementary value type.
    Elementary(ElementaryType),

    /// A reference to a struct, enum, contract, interface or library,
    /// possibly in `Library.Type` syntax.
    UserDefined(String),

    /// A fixed or dynamically sized array of `element`s.
    Array {
        element:   Box<TypeName>,
        dimension: Dimension,
    },

    /// A mapping from `key` to `value`.
    Mapping {
        key:   Box<TypeName>,
        value: Box<TypeName>,
    },
}

impl TypeName {
    /// Checks whether the type is an array whose outermost dimension is
    /// dynamic.
    #[must_use]
    pub fn is_dynamic_array(&self) -> bool {
        matches!(
            self,
            Self::Array {
                dimension: Dimension::Dynamic,
                ..
            }
        )
    }
}

/// Parses `typ` into a [`TypeName`] tree.
///
/// # Errors
///
/// [`Error::MalformedType`] when `typ` does not follow the textual type
/// grammar.
pub fn parse_type_name(typ: &str) -> Result<TypeName> {
    let (parsed, rest) = parse_prefix(typ.trim(), typ)?;
    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(malformed(typ))
    }
}

fn malformed(typ: &str) -> Error {
    Error::MalformedType {
        typ: typ.to_string(),
    }
}

/// Parses one type from the front of `input`, returning it together with
/// the unconsumed remainder. `source` is the full original string, kept
/// for error reporting.
fn parse_prefix<'a>(input: &'a str, source: &str) -> Result<(TypeName, &'a str)> {
    if let Some(rest) = input.strip_prefix("mapping(") {
        let (key, rest) = parse_prefix(rest, source)?;
        let rest = rest.strip_prefix("=>").ok_or_else(|| malformed(source))?;
        let (value, rest) = parse_prefix(rest, source)?;
        let rest = rest.strip_prefix(')').ok_or_else(|| malformed(source))?;
        let mapping = TypeName::Mapping {
            key:   Box::new(key),
            value: Box::new(value),
        };
        return parse_dimensions(mapping, rest, source);
    }

    let end = input
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(input.len());
    if end == 0 {
        return Err(malformed(source));
    }
    let (name, rest) = input.split_at(end);
    let base = match ElementaryType::parse(name) {
        Some(elementary) => TypeName::Elementary(elementary),
        None => TypeName::UserDefined(name.to_string()),
    };

    parse_dimensions(base, rest, source)
}

/// Parses any trailing `[...]` dimension groups onto `base`.
fn parse_dimensions<'a>(
    base: TypeName,
    input: &'a str,
    source: &str,
) -> Result<(TypeName, &'a str)> {
    let mut parsed = base;
    let mut rest = input;
    while let Some(inner) = rest.strip_prefix('[') {
        let end = inner.find(']').ok_or_else(|| malformed(source))?;
        let dimension = parse_dimension(&inner[..end], source)?;
        parsed = TypeName::Array {
            element: Box::new(parsed),
            dimension,
        };
        rest = &inner[end + 1..];
    }

    Ok((parsed, rest))
}

/// Parses the text between one pair of square brackets.
fn parse_dimension(text: &str, source: &str) -> Result<Dimension> {
    if text.is_empty() {
        return Ok(Dimension::Dynamic);
    }
    if text.bytes().all(|byte| byte.is_ascii_digit()) {
        return text
            .parse()
            .map(Dimension::Literal)
            .map_err(|_| malformed(source));
    }
    if text.chars().all(is_identifier_char) {
        return Ok(Dimension::Named(text.to_string()));
    }

    Err(malformed(source))
}

/// The characters that may appear in a (possibly qualified) identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}
