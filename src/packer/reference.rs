//! This module contains the reference resolver: the construction of nested
//! storage layouts for variables whose types refer to structs, to arrays,
//! or to mappings of structs.

use crate::{
    error::{Error, Result},
    layout::{Storage, StorageId, StorageKind, Variable},
    model::{find_class, Attribute, AttributeKind, ClassStereotype, UmlClass},
    packer::{
        anchor_reference_storage, key::calc_slot_key, next_position, sizing, Packer,
    },
    types::{parse_type_name, TypeName},
};

impl Packer<'_> {
    /// Builds the nested storage referenced by `attribute`, if its type
    /// has one, appending it and any deeper storages to `storages`.
    ///
    /// Struct references and arrays always produce a nested storage. Enum,
    /// contract, interface and library references produce none, as do
    /// mappings whose value type is not a struct.
    ///
    /// Every reference produces its own storage instance, even when two
    /// variables share a type: nested layouts are rebased onto their
    /// containing variable's slot, so they cannot be shared.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedUserType`] when a referenced name matches no
    /// class, plus anything the size calculator raises for element types.
    pub(crate) fn parse_reference_storage(
        &mut self,
        attribute: &Attribute,
        owning: &UmlClass,
        storages: &mut Vec<Storage>,
        depth: usize,
    ) -> Result<Option<StorageId>> {
        match attribute.kind {
            AttributeKind::UserDefined => {
                let class = find_class(self.classes, &attribute.typ).ok_or_else(|| {
                    Error::UnresolvedUserType {
                        typ: attribute.typ.clone(),
                    }
                })?;
                if class.stereotype == ClassStereotype::Struct {
                    let id =
                        self.pack_struct_storage(class, attribute.typ.clone(), storages, depth)?;
                    Ok(Some(id))
                } else {
                    Ok(None)
                }
            }
            AttributeKind::Mapping => self.mapping_reference(attribute, storages, depth),
            AttributeKind::Array => {
                let id = self.pack_array_storage(attribute, owning, storages, depth)?;
                Ok(Some(id))
            }
            AttributeKind::Elementary | AttributeKind::Function => Ok(None),
        }
    }

    /// Builds the nested storage for a mapping whose final value type is a
    /// struct.
    ///
    /// The value of a mapping may itself be a mapping, or an array of
    /// structs; both are stripped down to the base type.
    fn mapping_reference(
        &mut self,
        attribute: &Attribute,
        storages: &mut Vec<Storage>,
        depth: usize,
    ) -> Result<Option<StorageId>> {
        let parsed = parse_type_name(&attribute.typ)?;
        let mut base = &parsed;
        loop {
            match base {
                TypeName::Mapping { value, .. } => base = value,
                TypeName::Array { element, .. } => base = element,
                TypeName::Elementary(_) | TypeName::UserDefined(_) => break,
            }
        }

        if let TypeName::UserDefined(name) = base {
            let class = find_class(self.classes, name).ok_or_else(|| Error::UnresolvedUserType {
                typ: name.clone(),
            })?;
            if class.stereotype == ClassStereotype::Struct {
                let id = self.pack_struct_storage(class, class.name.clone(), storages, depth)?;
                return Ok(Some(id));
            }
        }

        Ok(None)
    }

    /// Packs the attributes of the struct `class` into a fresh
    /// `Struct`-kind storage named `name`, laid out as if it started at
    /// slot 0.
    fn pack_struct_storage(
        &mut self,
        class: &UmlClass,
        name: String,
        storages: &mut Vec<Storage>,
        depth: usize,
    ) -> Result<StorageId> {
        let mut variables = Vec::new();
        self.parse_variables(class, &mut variables, storages, &mut Vec::new(), depth + 1)?;

        let id = self.ids.next_storage_id();
        storages.push(Storage {
            id,
            name,
            kind: StorageKind::Struct,
            variables,
            array_length: None,
            array_dynamic: None,
            slot_key: None,
        });

        Ok(id)
    }

    /// Packs the elements of an array attribute into a fresh `Array`-kind
    /// storage laid out as if it started at slot 0: one variable per
    /// element position for fixed arrays, a single representative element
    /// for dynamic ones.
    fn pack_array_storage(
        &mut self,
        attribute: &Attribute,
        owning: &UmlClass,
        storages: &mut Vec<Storage>,
        depth: usize,
    ) -> Result<StorageId> {
        let parsed = parse_type_name(&attribute.typ)?;
        let TypeName::Array { element, dimension } = parsed else {
            return Err(Error::InvalidTypeClassification {
                name: attribute.name.clone(),
                typ:  attribute.typ.clone(),
            });
        };

        let array_length = dimension.fixed_length(owning)?;
        let dynamic = array_length.is_none();

        let element_attribute = Attribute::new(
            attribute.name.clone(),
            element_type_text(&attribute.typ),
            element_kind(&element),
        );
        let element_size = sizing::byte_size_with_limit(
            &element_attribute,
            owning,
            self.classes,
            depth + 1,
            self.config.max_nesting_depth,
        )?;
        let no_inline_value = element_attribute.kind == AttributeKind::Mapping
            || (element_attribute.kind == AttributeKind::Array && !element_size.dynamic);

        let element_count = array_length.unwrap_or(1);
        let mut variables: Vec<Variable> = Vec::new();
        for index in 0..element_count {
            let reference_storage_id =
                self.parse_reference_storage(&element_attribute, owning, storages, depth + 1)?;

            let (from_slot, to_slot, byte_offset) = next_position(&variables, element_size.bytes);
            let mut variable = Variable {
                id: self.ids.next_variable_id(),
                from_slot,
                to_slot,
                byte_size: element_size.bytes,
                byte_offset,
                typ: element_attribute.typ.clone(),
                dynamic: element_size.dynamic,
                no_inline_value,
                name: index.to_string(),
                contract_name: owning.name.clone(),
                reference_storage_id,
                slot_key: None,
                value: None,
            };
            if variable.dynamic && element_attribute.kind == AttributeKind::Array {
                variable.slot_key = Some(calc_slot_key(&variable));
            }
            anchor_reference_storage(storages, &variable);

            variables.push(variable);
        }

        let id = self.ids.next_storage_id();
        storages.push(Storage {
            id,
            name: attribute.typ.clone(),
            kind: StorageKind::Array,
            variables,
            array_length,
            array_dynamic: Some(dynamic),
            slot_key: None,
        });

        Ok(id)
    }
}

/// Strips the rightmost bracket group off an array type's text, yielding
/// the element type text.
fn element_type_text(typ: &str) -> String {
    match typ.rfind('[') {
        Some(index) => typ[..index].to_string(),
        None => typ.to_string(),
    }
}

/// Classifies a parsed element type the way the AST-conversion stage
/// classifies attributes.
fn element_kind(element: &TypeName) -> AttributeKind {
    match element {
        TypeName::Elementary(_) => AttributeKind::Elementary,
        TypeName::UserDefined(_) => AttributeKind::UserDefined,
        TypeName::Array { .. } => AttributeKind::Array,
        TypeName::Mapping { .. } => AttributeKind::Mapping,
    }
}

#[cfg(test)]
mod test {
    use super::{element_kind, element_type_text};
    use crate::{
        model::AttributeKind,
        types::parse_type_name,
    };

    #[test]
    fn strips_one_bracket_level() {
        assert_eq!(element_type_text("address[2]"), "address");
        assert_eq!(element_type_text("address[2][]"), "address[2]");
        assert_eq!(element_type_text("address[][3]"), "address[]");
        assert_eq!(element_type_text("Position[N_COINS]"), "Position");
    }

    #[test]
    fn classifies_elements_like_the_conversion_stage() {
        let cases = [
            ("address", AttributeKind::Elementary),
            ("Position", AttributeKind::UserDefined),
            ("address[2]", AttributeKind::Array),
            ("mapping(address=>uint256)", AttributeKind::Mapping),
        ];
        for (typ, expected) in cases {
            let parsed = parse_type_name(typ).unwrap();
            assert_eq!(element_kind(&parsed), expected, "element type {typ}");
        }
    }
}
