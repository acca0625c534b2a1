//! This module contains constants that are needed throughout the codebase.

/// The width of a storage slot on the EVM in bytes.
pub const SLOT_SIZE_BYTES: u64 = 32;

/// The width of a byte in bits.
pub const BYTE_SIZE_BITS: u64 = 8;

/// The number of bytes a `bool` occupies in storage.
pub const BOOL_SIZE_BYTES: u64 = 1;

/// The number of bytes an `address` occupies in storage.
pub const ADDRESS_SIZE_BYTES: u64 = 20;

/// The number of bytes an enum value occupies in storage.
///
/// Enums are stored as the smallest unsigned integer wide enough for their
/// member count; the layout models the common up-to-256-member case.
pub const ENUM_SIZE_BYTES: u64 = 1;

/// The number of bytes a reference to a contract, abstract contract,
/// interface or library occupies in storage. These are all address-like
/// when used as a variable type.
pub const CONTRACT_REFERENCE_SIZE_BYTES: u64 = 20;

/// The largest element size that can share a slot with neighbouring array
/// elements. Anything larger than this, up to a full slot, is padded out
/// to the full slot.
pub const PACKED_ELEMENT_MAX_BYTES: u64 = 16;

/// The default maximum depth of user-type nesting (structs containing
/// structs, arrays of structs, and so on) before a layout computation is
/// aborted as cyclic.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;
