//! This module contains the type-size calculator: the mapping from a
//! declared attribute type to its storage byte footprint and dynamism.
//!
//! The rules here reproduce the Solidity compiler's storage encoding. A
//! single byte of error anywhere in this module silently corrupts every
//! downstream slot assignment, so the arithmetic is covered by the vector
//! tables in the test module below.

use crate::{
    constant::{
        CONTRACT_REFERENCE_SIZE_BYTES, DEFAULT_MAX_NESTING_DEPTH, ENUM_SIZE_BYTES,
        PACKED_ELEMENT_MAX_BYTES, SLOT_SIZE_BYTES,
    },
    error::{Error, Result},
    model::{find_class, Attribute, AttributeKind, ClassStereotype, UmlClass},
    types::{parse_type_name, TypeName},
};

/// The storage footprint of one attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StorageSize {
    /// The number of bytes the attribute occupies inline.
    pub bytes: u64,

    /// True when the attribute's content lives at a derived location; the
    /// inline bytes then hold the length, or a key base, rather than the
    /// content itself.
    pub dynamic: bool,
}

impl StorageSize {
    /// A statically-placed footprint of `bytes` bytes.
    const fn fixed(bytes: u64) -> Self {
        Self {
            bytes,
            dynamic: false,
        }
    }

    /// A one-slot footprint whose content is stored at a derived location.
    const fn dynamic_slot() -> Self {
        Self {
            bytes:   SLOT_SIZE_BYTES,
            dynamic: true,
        }
    }
}

/// Calculates the storage footprint of `attribute` as declared on
/// `owning`, resolving user-defined type names against `classes`.
///
/// # Errors
///
/// - [`Error::InvalidElementaryType`] when an elementary type string does
///   not match any known primitive pattern.
/// - [`Error::UnresolvedUserType`] when a user-defined type name matches
///   no class.
/// - [`Error::UnresolvedArrayDimension`] when an identifier dimension has
///   no matching named constant on `owning`.
/// - [`Error::InvalidTypeClassification`] when the attribute's declared
///   classification does not fit its type string.
/// - [`Error::MalformedType`] when a type string cannot be parsed at all.
/// - [`Error::CyclicTypeDetected`] when user-type nesting exceeds the
///   default depth limit.
pub fn calc_storage_byte_size(
    attribute: &Attribute,
    owning: &UmlClass,
    classes: &[UmlClass],
) -> Result<StorageSize> {
    byte_size_with_limit(attribute, owning, classes, 0, DEFAULT_MAX_NESTING_DEPTH)
}

/// As [`calc_storage_byte_size`], tracking the recursion `depth` against
/// the caller's `limit`.
pub(crate) fn byte_size_with_limit(
    attribute: &Attribute,
    owning: &UmlClass,
    classes: &[UmlClass],
    depth: usize,
    limit: usize,
) -> Result<StorageSize> {
    if depth > limit {
        return Err(Error::CyclicTypeDetected {
            name: attribute.typ.clone(),
            limit,
        });
    }
    match attribute.kind {
        // One slot holding a key base; the content is addressed elsewhere.
        AttributeKind::Mapping | AttributeKind::Function => Ok(StorageSize::dynamic_slot()),
        AttributeKind::Elementary => elementary_size(attribute),
        AttributeKind::UserDefined => user_defined_size(&attribute.typ, owning, classes, depth, limit),
        AttributeKind::Array => array_size(attribute, owning, classes, depth, limit),
    }
}

fn elementary_size(attribute: &Attribute) -> Result<StorageSize> {
    match parse_type_name(&attribute.typ) {
        Ok(TypeName::Elementary(elementary)) => Ok(StorageSize::fixed(elementary.storage_bytes())),
        _ => Err(Error::InvalidElementaryType {
            typ: attribute.typ.clone(),
        }),
    }
}

/// Calculates the footprint of a reference to the user-defined type `typ`:
/// one byte for enums, an address for contract-like classes, and the
/// packed member total for structs.
fn user_defined_size(
    typ: &str,
    owning: &UmlClass,
    classes: &[UmlClass],
    depth: usize,
    limit: usize,
) -> Result<StorageSize> {
    let class = find_class(classes, typ).ok_or_else(|| Error::UnresolvedUserType {
        typ: typ.to_string(),
    })?;
    match class.stereotype {
        ClassStereotype::Enum => Ok(StorageSize::fixed(ENUM_SIZE_BYTES)),
        ClassStereotype::Contract
        | ClassStereotype::Abstract
        | ClassStereotype::Interface
        | ClassStereotype::Library => Ok(StorageSize::fixed(CONTRACT_REFERENCE_SIZE_BYTES)),
        ClassStereotype::Struct => struct_size(class, owning, classes, depth, limit),
    }
}

/// Calculates the packed byte size of a struct.
///
/// Members pack in declaration order: a member that does not fit in the
/// remainder of the current slot opens a new one, array- and struct-typed
/// members always start at a slot boundary, and the total is rounded up to
/// whole slots.
fn struct_size(
    class: &UmlClass,
    owning: &UmlClass,
    classes: &[UmlClass],
    depth: usize,
    limit: usize,
) -> Result<StorageSize> {
    let mut bytes = 0_u64;
    for member in &class.attributes {
        if starts_at_slot_boundary(member, classes)? {
            bytes = round_up_to_slot(bytes);
        }
        let member_size = byte_size_with_limit(member, owning, classes, depth + 1, limit)?;
        let slot_end = round_up_to_slot(bytes);
        if member_size.bytes <= slot_end - bytes {
            bytes += member_size.bytes;
        } else {
            bytes = slot_end + member_size.bytes;
        }
    }

    Ok(StorageSize::fixed(round_up_to_slot(bytes)))
}

/// Checks whether a struct member must start at a fresh slot boundary:
/// arrays and struct-typed members do.
fn starts_at_slot_boundary(member: &Attribute, classes: &[UmlClass]) -> Result<bool> {
    match member.kind {
        AttributeKind::Array => Ok(true),
        AttributeKind::UserDefined => {
            let class = find_class(classes, &member.typ).ok_or_else(|| Error::UnresolvedUserType {
                typ: member.typ.clone(),
            })?;
            Ok(class.stereotype == ClassStereotype::Struct)
        }
        _ => Ok(false),
    }
}

/// Calculates the footprint of an array attribute.
///
/// Dimensions are read from the outermost (rightmost) bracket inwards. A
/// dynamic outermost dimension makes the whole array one dynamic slot; a
/// dynamic inner dimension leaves one slot per remaining element; when
/// every dimension is fixed the innermost run is rounded up to whole slots
/// and multiplied out by the outer dimensions.
fn array_size(
    attribute: &Attribute,
    owning: &UmlClass,
    classes: &[UmlClass],
    depth: usize,
    limit: usize,
) -> Result<StorageSize> {
    let parsed = parse_type_name(&attribute.typ)?;
    if !matches!(parsed, TypeName::Array { .. }) {
        return Err(Error::InvalidTypeClassification {
            name: attribute.name.clone(),
            typ:  attribute.typ.clone(),
        });
    }

    let mut dimensions = 0_usize;
    let mut fixed_lengths = Vec::new();
    let mut saw_dynamic = false;
    let mut element = &parsed;
    while let TypeName::Array {
        element: inner,
        dimension,
    } = element
    {
        dimensions += 1;
        // Dimensions inside a dynamic one are never resolved, so an
        // unresolvable identifier there is not an error.
        if !saw_dynamic {
            match dimension.fixed_length(owning)? {
                Some(length) => fixed_lengths.push(length),
                None => saw_dynamic = true,
            }
        }
        element = inner;
    }

    let Some((&innermost, outer_lengths)) = fixed_lengths.split_last() else {
        // A dynamic outermost dimension: the slot holds the length and the
        // content starts at the keccak of the slot number.
        return Ok(StorageSize::dynamic_slot());
    };
    if fixed_lengths.len() < dimensions {
        // An inner dimension is dynamic, so each remaining element is a
        // one-slot dynamic array.
        let elements = fixed_lengths.iter().product::<u64>();
        return Ok(StorageSize::fixed(SLOT_SIZE_BYTES * elements));
    }

    let mut element_bytes = element_size(element, owning, classes, depth, limit)?;
    if element_bytes > PACKED_ELEMENT_MAX_BYTES && element_bytes < SLOT_SIZE_BYTES {
        element_bytes = SLOT_SIZE_BYTES;
    }
    let innermost_bytes = round_up_to_slot(element_bytes * innermost);
    let outer_elements = outer_lengths.iter().product::<u64>();

    Ok(StorageSize::fixed(innermost_bytes * outer_elements))
}

/// Calculates the byte size of the base element of a fully-fixed array.
fn element_size(
    element: &TypeName,
    owning: &UmlClass,
    classes: &[UmlClass],
    depth: usize,
    limit: usize,
) -> Result<u64> {
    match element {
        TypeName::Elementary(elementary) => Ok(elementary.storage_bytes()),
        TypeName::UserDefined(name) => {
            Ok(user_defined_size(name, owning, classes, depth + 1, limit)?.bytes)
        }
        // Mapping elements each occupy one slot; a nested array cannot
        // appear here as the caller strips every array layer.
        TypeName::Mapping { .. } | TypeName::Array { .. } => Ok(SLOT_SIZE_BYTES),
    }
}

const fn round_up_to_slot(bytes: u64) -> u64 {
    bytes.div_ceil(SLOT_SIZE_BYTES) * SLOT_SIZE_BYTES
}

#[cfg(test)]
mod test {
    use super::{calc_storage_byte_size, StorageSize};
    use crate::{
        error::Error,
        model::{Attribute, AttributeKind, ClassStereotype, NamedConstant, UmlClass},
        types::is_elementary,
    };

    /// Builds the class set the vectors below resolve against.
    fn fixture_classes() -> Vec<UmlClass> {
        vec![
            UmlClass::new("TwoSlots", ClassStereotype::Struct).with_attributes(vec![
                Attribute::elementary("param1", "uint256"),
                Attribute::elementary("param2", "address"),
            ]),
            UmlClass::new("IERC20", ClassStereotype::Interface),
            UmlClass::new("Severity", ClassStereotype::Enum),
        ]
    }

    /// Builds an owning class carrying the `N_COINS` constant.
    fn owning_class() -> UmlClass {
        UmlClass::new("Test", ClassStereotype::Contract).with_constants(vec![NamedConstant {
            name:  "N_COINS".to_string(),
            value: 2,
        }])
    }

    fn size_of(kind: AttributeKind, typ: &str) -> StorageSize {
        let attribute = Attribute::new("varName", typ, kind);
        calc_storage_byte_size(&attribute, &owning_class(), &fixture_classes())
            .unwrap_or_else(|error| panic!("sizing {typ:?} failed: {error}"))
    }

    #[test]
    fn sizes_elementary_types() {
        let vectors: &[(&str, u64)] = &[
            ("address", 20),
            ("bool", 1),
            ("int", 32),
            ("uint", 32),
            ("int256", 32),
            ("uint256", 32),
            ("uint8", 1),
            ("int8", 1),
            ("uint32", 4),
            ("int32", 4),
            ("uint72", 9),
            ("bytes", 32),
            ("bytes32", 32),
            ("bytes1", 1),
            ("bytes31", 31),
            ("string", 32),
            ("fixed128x18", 16),
        ];
        for (typ, expected) in vectors {
            let size = size_of(AttributeKind::Elementary, typ);
            assert_eq!(size.bytes, *expected, "elementary type {typ}");
            assert!(!size.dynamic, "elementary type {typ}");
        }
    }

    #[test]
    fn rejects_unknown_elementary_types() {
        let attribute = Attribute::elementary("varName", "uint8x");
        let result = calc_storage_byte_size(&attribute, &owning_class(), &[]);
        assert!(matches!(
            result,
            Err(Error::InvalidElementaryType { .. })
        ));
    }

    #[test]
    fn sizes_fixed_arrays() {
        let vectors: &[(&str, u64)] = &[
            ("address[1]", 32),
            ("address[2]", 64),
            ("address[4]", 128),
            ("address[2][2]", 128),
            ("address[32]", 1024),
            ("address[N_COINS]", 64),
            ("address[N_COINS][N_COINS]", 128),
            ("uint8[33][2][2]", 256),
            ("bytes1[1]", 32),
            ("bytes1[2]", 32),
            ("bytes1[16]", 32),
            ("bytes1[17]", 32),
            ("bytes1[32]", 32),
            ("bytes1[33]", 64),
            ("bytes16[2]", 32),
            ("bytes17[2]", 64),
            ("bytes30[2]", 64),
            ("bytes30[6][2]", 384),
            ("bytes30[2][6]", 384),
            ("bytes32[1]", 32),
            ("bytes32[2]", 64),
            ("bool[1]", 32),
            ("bool[16]", 32),
            ("bool[32]", 32),
            ("bool[33]", 64),
            ("bool[2][3]", 96),
            ("bool[3][2]", 64),
            ("bool[33][3]", 192),
            ("bool[33][2]", 128),
            ("bool[33][2][2]", 256),
            ("TwoSlots[3][4]", 768),
            ("TwoSlots[4][3]", 768),
            ("IERC20[3]", 96),
        ];
        for (typ, expected) in vectors {
            let size = size_of(AttributeKind::Array, typ);
            assert_eq!(size.bytes, *expected, "array type {typ}");
            assert!(!size.dynamic, "array type {typ}");
        }
    }

    #[test]
    fn a_dynamic_outermost_dimension_makes_the_array_dynamic() {
        for typ in [
            "address[]",
            "address[2][]",
            "address[3][2][]",
            "bytes32[]",
            "bool[2][]",
            "bool[][2][]",
            "bool[64][64][]",
            "TwoSlots[3][]",
            "TwoSlots[][]",
            "TwoSlots[4][3][]",
        ] {
            let size = size_of(AttributeKind::Array, typ);
            assert_eq!(size.bytes, 32, "array type {typ}");
            assert!(size.dynamic, "array type {typ}");
        }
    }

    #[test]
    fn a_dynamic_inner_dimension_leaves_one_slot_per_element() {
        let vectors: &[(&str, u64)] = &[
            ("address[][2]", 64),
            ("address[][10]", 320),
            ("address[][][2]", 64),
            ("address[][4][3]", 384),
            ("address[][3][][2]", 64),
            ("address[][2][2][2]", 256),
            ("bool[][2]", 64),
            ("bool[][16]", 512),
            ("bool[][33]", 1056),
            ("bool[][2][3]", 192),
            ("bool[][][2][3]", 192),
            ("bool[][][3]", 96),
            ("bool[][4][3]", 384),
            ("bool[][64][64]", 131_072),
            ("bool[64][][64]", 2048),
            ("TwoSlots[][3]", 96),
            ("TwoSlots[][4][3]", 384),
        ];
        for (typ, expected) in vectors {
            let size = size_of(AttributeKind::Array, typ);
            assert_eq!(size.bytes, *expected, "array type {typ}");
            assert!(!size.dynamic, "array type {typ}");
        }
    }

    #[test]
    fn rejects_unresolved_array_dimensions() {
        let attribute = Attribute::array("coins", "address[N_TOKENS]");
        let result = calc_storage_byte_size(&attribute, &owning_class(), &[]);
        assert_eq!(
            result,
            Err(Error::UnresolvedArrayDimension {
                dimension: "N_TOKENS".to_string()
            })
        );
    }

    #[test]
    fn dimensions_inside_a_dynamic_one_are_never_resolved() {
        let attribute = Attribute::array("coins", "address[N_TOKENS][]");
        let size = calc_storage_byte_size(&attribute, &owning_class(), &[]).unwrap();
        assert!(size.dynamic);
    }

    #[test]
    fn sizes_mappings_and_functions_as_one_dynamic_slot() {
        let mapping = size_of(AttributeKind::Mapping, "mapping(address=>uint256)");
        assert_eq!(mapping.bytes, 32);
        assert!(mapping.dynamic);

        let function = Attribute::new(
            "callback",
            "function(uint256) external",
            AttributeKind::Function,
        );
        let size = calc_storage_byte_size(&function, &owning_class(), &[]).unwrap();
        assert_eq!(size.bytes, 32);
        assert!(size.dynamic);
    }

    #[test]
    fn sizes_user_defined_references() {
        assert_eq!(size_of(AttributeKind::UserDefined, "Severity").bytes, 1);
        assert_eq!(size_of(AttributeKind::UserDefined, "IERC20").bytes, 20);
        assert_eq!(size_of(AttributeKind::UserDefined, "TwoSlots").bytes, 64);
    }

    #[test]
    fn rejects_unresolved_user_types() {
        let attribute = Attribute::user_defined("reserve", "ReserveData");
        let result = calc_storage_byte_size(&attribute, &owning_class(), &[]);
        assert_eq!(
            result,
            Err(Error::UnresolvedUserType {
                typ: "ReserveData".to_string()
            })
        );
    }

    /// Packs a one-off struct out of `types` and sizes a reference to it,
    /// mirroring how member classification is derived from the type text.
    fn struct_of(types: &[&str]) -> u64 {
        let attributes = types
            .iter()
            .enumerate()
            .map(|(index, &typ)| {
                let kind = if typ.ends_with(']') {
                    AttributeKind::Array
                } else if is_elementary(typ.split('[').next().unwrap_or(typ)) {
                    AttributeKind::Elementary
                } else {
                    AttributeKind::UserDefined
                };
                Attribute::new(format!("member{index}"), typ, kind)
            })
            .collect();
        let mut classes = fixture_classes();
        classes.push(
            UmlClass::new("Probe", ClassStereotype::Struct).with_attributes(attributes),
        );

        let attribute = Attribute::user_defined("probe", "Probe");
        calc_storage_byte_size(&attribute, &owning_class(), &classes)
            .unwrap_or_else(|error| panic!("sizing struct of {types:?} failed: {error}"))
            .bytes
    }

    #[test]
    fn sizes_struct_member_packing() {
        assert_eq!(struct_of(&["address", "address", "address"]), 96);
        assert_eq!(struct_of(&["address", "bytes12", "bytes12", "address"]), 64);
        assert_eq!(struct_of(&["IERC20"]), 32);
        assert_eq!(struct_of(&["IERC20", "IERC20", "IERC20"]), 96);
        assert_eq!(struct_of(&["IERC20[3]"]), 96);
        assert_eq!(struct_of(&["IERC20", "bytes12", "bytes12", "IERC20"]), 64);
        assert_eq!(struct_of(&["bytes31", "bytes2", "bytes31"]), 96);
        assert_eq!(struct_of(&["uint256", "bytes32"]), 64);
        assert_eq!(struct_of(&["bool", "uint8"]), 32);
        assert_eq!(struct_of(&["bool[12]", "uint8[12]"]), 64);
        assert_eq!(struct_of(&["bytes30", "bytes30", "bytes30"]), 96);
    }

    #[test]
    fn array_and_struct_members_start_at_slot_boundaries() {
        assert_eq!(struct_of(&["uint256[]", "bytes32[2]"]), 96);
        assert_eq!(struct_of(&["uint256[2]", "bytes32[2]"]), 128);
        assert_eq!(struct_of(&["bool", "bool[2]", "bool"]), 96);
        assert_eq!(struct_of(&["bool", "bool[33]", "bool"]), 128);
        assert_eq!(struct_of(&["uint16", "bytes30[2]", "uint16"]), 128);
        assert_eq!(struct_of(&["TwoSlots"]), 64);
        assert_eq!(struct_of(&["TwoSlots[2]", "address"]), 160);
        assert_eq!(struct_of(&["TwoSlots[]", "address"]), 64);
        assert_eq!(struct_of(&["bool", "TwoSlots", "bool"]), 128);
        assert_eq!(struct_of(&["address", "TwoSlots[]"]), 64);
    }

    #[test]
    fn enum_members_pack_like_single_bytes() {
        assert_eq!(struct_of(&["Severity"]), 32);
        assert_eq!(struct_of(&["Severity", "Severity"]), 32);
        assert_eq!(struct_of(&["Severity", "Severity", "bytes30"]), 32);
        assert_eq!(struct_of(&["Severity", "Severity", "bytes31"]), 64);
        assert_eq!(struct_of(&["bool", "Severity", "bool"]), 32);
    }

    #[test]
    fn detects_cyclic_struct_definitions() {
        let classes = vec![
            UmlClass::new("Ouroboros", ClassStereotype::Struct)
                .with_attributes(vec![Attribute::user_defined("tail", "Ouroboros")]),
        ];
        let attribute = Attribute::user_defined("snake", "Ouroboros");
        let result = calc_storage_byte_size(&attribute, &owning_class(), &classes);
        assert!(matches!(result, Err(Error::CyclicTypeDetected { .. })));
    }
}
