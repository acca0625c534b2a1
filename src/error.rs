//! This module contains the primary error type for layout computation and
//! the result alias used across the crate.

use thiserror::Error;

/// The result type for layout computations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while computing a storage layout.
///
/// Every variant is fatal to the in-flight computation: the packer never
/// returns a partial layout, as a wrong-but-plausible layout is worse than
/// a refusal. The host layer is responsible for catching, logging and
/// exiting non-zero.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The requested root contract is absent from the class set.
    #[error("Failed to find contract with name {name:?}")]
    ContractNotFound { name: String },

    /// An inheritance association's target class cannot be resolved.
    #[error("Failed to find parent contract {parent:?} of {child:?}")]
    ParentNotFound { parent: String, child: String },

    /// A struct, enum or contract name referenced by an attribute's type
    /// cannot be matched to any class.
    #[error("Failed to find user defined type {typ:?}")]
    UnresolvedUserType { typ: String },

    /// A non-literal array dimension identifier has no matching named
    /// numeric constant on the owning class.
    #[error("Could not size fixed sized array with dimension {dimension:?}")]
    UnresolvedArrayDimension { dimension: String },

    /// An elementary type string does not match any known primitive
    /// pattern.
    #[error("Failed to size elementary type {typ:?}")]
    InvalidElementaryType { typ: String },

    /// An attribute reached the calculator with a classification that does
    /// not fit its type string.
    #[error("Attribute {name:?} of type {typ:?} does not fit its declared classification")]
    InvalidTypeClassification { name: String, typ: String },

    /// A type string could not be parsed into a type tree.
    #[error("Malformed type string {typ:?}")]
    MalformedType { typ: String },

    /// User-type nesting exceeded the configured depth limit, which points
    /// to a cyclic type definition in the input.
    #[error("Nesting depth limit of {limit} exceeded while resolving {name:?}")]
    CyclicTypeDetected { name: String, limit: usize },
}
