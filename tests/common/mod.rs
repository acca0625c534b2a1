//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]
#![allow(unused)] // Not every helper is used from every test binary

use solidity_storage_layout::model::{
    Association, Attribute, ClassStereotype, NamedConstant, UmlClass,
};

/// Creates an inheritance (realization) association targeting `name`.
pub fn inherits(name: &str) -> Association {
    Association {
        target_class_name: name.to_string(),
        realization:       true,
    }
}

/// Creates a contract class named `name` with the provided `attributes`.
pub fn contract(name: &str, attributes: Vec<Attribute>) -> UmlClass {
    UmlClass::new(name, ClassStereotype::Contract).with_attributes(attributes)
}

/// Creates a struct class named `name` with the provided `attributes`.
pub fn struct_class(name: &str, attributes: Vec<Attribute>) -> UmlClass {
    UmlClass::new(name, ClassStereotype::Struct).with_attributes(attributes)
}

/// Builds the three-level inheritance chain: `C` inherits `B` inherits
/// `A`, each level declaring one variable.
pub fn inheritance_chain() -> Vec<UmlClass> {
    vec![
        contract("A", vec![Attribute::elementary("x", "uint128")]),
        contract("B", vec![Attribute::elementary("y", "uint128")])
            .with_associations(vec![inherits("A")]),
        contract("C", vec![Attribute::elementary("z", "address")])
            .with_associations(vec![inherits("B")]),
    ]
}

/// Builds a diamond: `Child` inherits `Left` and `Right`, which both
/// inherit `Base`.
pub fn diamond() -> Vec<UmlClass> {
    vec![
        contract("Base", vec![Attribute::elementary("total", "uint256")]),
        contract("Left", vec![Attribute::elementary("l", "uint128")])
            .with_associations(vec![inherits("Base")]),
        contract("Right", vec![Attribute::elementary("r", "uint128")])
            .with_associations(vec![inherits("Base")]),
        contract("Child", vec![Attribute::elementary("c", "address")])
            .with_associations(vec![inherits("Left"), inherits("Right")]),
    ]
}
