//! This module contains the input class model for layout computation.
//!
//! Instances of these types are produced by an AST-conversion stage from
//! parsed contract source. The layout computation only ever reads them: it
//! walks ordered attribute lists, inheritance associations, and named
//! numeric constants used to size fixed arrays.

use serde::{Deserialize, Serialize};

/// The stereotype of a class in the model.
///
/// Contracts, abstract contracts, interfaces and libraries are address-like
/// when used as the type of a storage variable. Structs contribute their
/// packed members, and enums are stored as a single byte.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStereotype {
    Contract,
    Abstract,
    Interface,
    Library,
    Struct,
    Enum,
}

/// The classification of an attribute's declared type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// A value type such as `uint256`, `address` or `bytes4`.
    Elementary,
    /// A reference to a struct, enum, contract, interface or library.
    UserDefined,
    /// A fixed or dynamically sized array.
    Array,
    /// A `mapping(K => V)`.
    Mapping,
    /// An external or internal function type.
    Function,
}

/// A state variable declaration on a class.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Attribute {
    /// The declared name of the variable.
    pub name: String,

    /// The declared type in the textual grammar: `"uint256"`,
    /// `"address[2][]"`, `"mapping(address=>uint256)"`.
    #[serde(rename = "type")]
    pub typ: String,

    /// The classification of [`Self::typ`].
    pub kind: AttributeKind,

    /// True for `constant` and `immutable` declarations, which are
    /// compiled into code and occupy no storage slot.
    pub constant: bool,
}

impl Attribute {
    /// Constructs a new non-constant attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, typ: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            kind,
            constant: false,
        }
    }

    /// Constructs an attribute of an elementary type.
    #[must_use]
    pub fn elementary(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self::new(name, typ, AttributeKind::Elementary)
    }

    /// Constructs an attribute of a user-defined type.
    #[must_use]
    pub fn user_defined(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self::new(name, typ, AttributeKind::UserDefined)
    }

    /// Constructs an attribute of an array type.
    #[must_use]
    pub fn array(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self::new(name, typ, AttributeKind::Array)
    }

    /// Constructs an attribute of a mapping type.
    #[must_use]
    pub fn mapping(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self::new(name, typ, AttributeKind::Mapping)
    }
}

/// A named numeric constant declared on a class, used to resolve
/// identifier array dimensions such as `address[N_COINS]`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct NamedConstant {
    pub name:  String,
    pub value: u64,
}

/// A directed association from one class to another.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Association {
    /// The name of the class the association points at.
    pub target_class_name: String,

    /// True when the association is an inheritance (realization) edge.
    /// Only realization edges participate in slot continuation.
    pub realization: bool,
}

/// A contract, interface, library, struct or enum in the model.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UmlClass {
    /// The declared name of the class.
    pub name: String,

    /// What kind of class this is.
    pub stereotype: ClassStereotype,

    /// The state variable declarations, in declaration order.
    pub attributes: Vec<Attribute>,

    /// The named numeric constants declared on the class.
    pub constants: Vec<NamedConstant>,

    /// The associations from this class to others, including inheritance.
    pub associations: Vec<Association>,
}

impl UmlClass {
    /// Constructs a new class with no attributes, constants or
    /// associations.
    #[must_use]
    pub fn new(name: impl Into<String>, stereotype: ClassStereotype) -> Self {
        Self {
            name: name.into(),
            stereotype,
            attributes: Vec::new(),
            constants: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Sets the class's attributes to `attributes`.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the class's named constants to `constants`.
    #[must_use]
    pub fn with_constants(mut self, constants: Vec<NamedConstant>) -> Self {
        self.constants = constants;
        self
    }

    /// Sets the class's associations to `associations`.
    #[must_use]
    pub fn with_associations(mut self, associations: Vec<Association>) -> Self {
        self.associations = associations;
        self
    }

    /// Gets the immediate parent contracts this class inherits from.
    ///
    /// Grandparent associations are not included; the packer walks them
    /// recursively.
    #[must_use]
    pub fn parent_contracts(&self) -> Vec<&Association> {
        self.associations
            .iter()
            .filter(|association| association.realization)
            .collect()
    }

    /// Gets the value of the named constant `name`, if the class declares
    /// one.
    #[must_use]
    pub fn constant_value(&self, name: &str) -> Option<u64> {
        self.constants
            .iter()
            .find(|constant| constant.name == name)
            .map(|constant| constant.value)
    }

    /// Checks whether this class is named by `typ`, either directly or as
    /// the segment after the `.` in `Library.Type` syntax.
    #[must_use]
    pub fn matches_type_name(&self, typ: &str) -> bool {
        self.name == typ || typ.split('.').nth(1).is_some_and(|name| name == self.name)
    }
}

/// Finds the class named by `typ` among `classes`.
#[must_use]
pub fn find_class<'a>(classes: &'a [UmlClass], typ: &str) -> Option<&'a UmlClass> {
    classes.iter().find(|class| class.matches_type_name(typ))
}
