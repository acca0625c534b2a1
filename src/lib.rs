//! This library computes the [EVM](https://ethereum.org/en/developers/docs/evm/)
//! storage layout of a smart contract from a parsed model of its classes:
//! which slot each state variable occupies, at which byte offset, over how
//! many bytes, and whether its content actually lives at a derived
//! location instead. The computation reproduces the Solidity compiler's
//! packing rules exactly — a layout that is plausible but one byte off is
//! worse than no layout at all.
//!
//! # How it Works
//!
//! From a very high level, a layout is computed as follows:
//!
//! 1. An external AST-conversion stage supplies a set of
//!    [`model::UmlClass`]es: contracts, structs, enums, interfaces and
//!    libraries with ordered attributes, inheritance associations, and
//!    named numeric constants.
//! 2. Each attribute's declared type string is parsed once into a
//!    [`types::TypeName`] tree, eliminating textual pattern matching from
//!    everything downstream.
//! 3. The [`packer::Packer`] walks the requested contract's attributes,
//!    inherited bases first, sizing each one via the calculator in
//!    [`packer::sizing`] and placing it with the compiler's left-to-right
//!    bin packing rule.
//! 4. Attributes whose types refer to structs or arrays get nested
//!    storages built by the resolver in [`packer::reference`], rebased
//!    onto their containing slot.
//! 5. Dynamically located data is keyed by the keccak of its base slot in
//!    [`packer::key`], and everything is returned as a [`StorageLayout`]
//!    ready for rendering or on-chain value fetching.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct
//! a packer over your class set and ask it for a contract's layout.
//!
//! ```
//! use solidity_storage_layout as ssl;
//! use solidity_storage_layout::model::{Attribute, ClassStereotype, UmlClass};
//!
//! let classes = vec![UmlClass::new("Token", ClassStereotype::Contract).with_attributes(vec![
//!     Attribute::elementary("totalSupply", "uint256"),
//!     Attribute::elementary("owner", "address"),
//!     Attribute::elementary("paused", "bool"),
//! ])];
//!
//! let layout = ssl::new(&classes).layout("Token").unwrap();
//! let root = layout.root();
//!
//! assert_eq!(root.variables.len(), 3);
//! assert_eq!(root.variables[0].from_slot, 0);
//! assert_eq!(root.variables[1].from_slot, 1);
//! assert_eq!(root.variables[2].byte_offset, 20);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod error;
pub mod layout;
pub mod model;
pub mod packer;
pub mod types;
pub mod utility;

// Re-exports to provide the library interface.
pub use layout::StorageLayout;
pub use packer::new;
