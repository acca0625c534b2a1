//! This module contains the slot packer: the engine that walks a
//! contract's attributes, inherited bases first, and assigns each one a
//! slot range and byte offset following the EVM's storage packing rules.
//!
//! Packing never reorders variables. Each attribute either continues in
//! the remaining bytes of the current slot or opens a fresh one, exactly
//! as the compiler lays contracts out.

pub mod key;
pub mod reference;
pub mod sizing;

use itertools::Itertools;

use crate::{
    constant::{DEFAULT_MAX_NESTING_DEPTH, SLOT_SIZE_BYTES},
    error::{Error, Result},
    layout::{IdAllocator, Storage, StorageId, StorageKind, StorageLayout, Variable},
    model::{find_class, AttributeKind, UmlClass},
    packer::key::calc_slot_key,
};

/// Creates a new packer over the provided `classes` with the default
/// configuration.
#[must_use]
pub fn new(classes: &[UmlClass]) -> Packer {
    Packer::new(classes, Config::default())
}

/// The configuration for the packer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum depth of user-type nesting before a layout computation
    /// is aborted with [`Error::CyclicTypeDetected`].
    ///
    /// Defaults to [`DEFAULT_MAX_NESTING_DEPTH`].
    pub max_nesting_depth: usize,
}

impl Config {
    /// Sets the `max_nesting_depth` config parameter to `value`.
    #[must_use]
    pub fn with_max_nesting_depth(mut self, value: usize) -> Config {
        self.max_nesting_depth = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// The `Packer` computes storage layouts for the contracts in a class set.
///
/// It owns the id arena for the layouts it produces: successive calls to
/// [`Self::layout`] on one packer yield globally unique ids, while two
/// separately constructed packers produce identical, deterministic layouts
/// for the same input.
#[derive(Debug)]
pub struct Packer<'a> {
    /// The classes that attribute types resolve against.
    classes: &'a [UmlClass],

    /// The configuration of the packer.
    config: Config,

    /// The id arena for produced storages and variables.
    ids: IdAllocator,
}

impl<'a> Packer<'a> {
    /// Constructs a new packer over `classes`, configured by `config`.
    #[must_use]
    pub fn new(classes: &'a [UmlClass], config: Config) -> Self {
        let ids = IdAllocator::new();
        Self {
            classes,
            config,
            ids,
        }
    }

    /// Computes the storage layout of the contract named `contract_name`.
    ///
    /// The returned layout holds the contract's own storage first,
    /// followed by one storage for every nested struct or array reached
    /// from its variables.
    ///
    /// # Errors
    ///
    /// [`Error::ContractNotFound`] when `contract_name` is absent from the
    /// class set, [`Error::ParentNotFound`] when an inheritance edge
    /// cannot be resolved, and any error the size calculator or reference
    /// resolver raises. No partial layout is ever returned.
    pub fn layout(&mut self, contract_name: &str) -> Result<StorageLayout> {
        let class = self
            .classes
            .iter()
            .find(|class| class.name == contract_name)
            .ok_or_else(|| Error::ContractNotFound {
                name: contract_name.to_string(),
            })?;

        let mut variables = Vec::new();
        let mut storages = Vec::new();
        self.parse_variables(class, &mut variables, &mut storages, &mut Vec::new(), 0)?;

        let root = Storage {
            id: self.ids.next_storage_id(),
            name: contract_name.to_string(),
            kind: StorageKind::Contract,
            variables,
            array_length: None,
            array_dynamic: None,
            slot_key: None,
        };
        storages.insert(0, root);

        Ok(StorageLayout::new(storages))
    }

    /// Recursively packs the storage variables of `class` into
    /// `variables`, bases before derived, appending any nested storages
    /// discovered along the way to `storages`.
    ///
    /// `inherited` tracks the contract names already packed, so a diamond
    /// base contributes its variables exactly once: the first path to
    /// reach it wins, consistent with linearised inheritance.
    pub(crate) fn parse_variables(
        &mut self,
        class: &UmlClass,
        variables: &mut Vec<Variable>,
        storages: &mut Vec<Storage>,
        inherited: &mut Vec<String>,
        depth: usize,
    ) -> Result<()> {
        if depth > self.config.max_nesting_depth {
            return Err(Error::CyclicTypeDetected {
                name:  class.name.clone(),
                limit: self.config.max_nesting_depth,
            });
        }

        let new_parents = class
            .parent_contracts()
            .into_iter()
            .filter(|parent| !inherited.iter().any(|name| *name == parent.target_class_name))
            .collect_vec();
        inherited.extend(
            new_parents
                .iter()
                .map(|parent| parent.target_class_name.clone()),
        );
        for parent in new_parents {
            let parent_class = find_class(self.classes, &parent.target_class_name).ok_or_else(
                || Error::ParentNotFound {
                    parent: parent.target_class_name.clone(),
                    child:  class.name.clone(),
                },
            )?;
            self.parse_variables(parent_class, variables, storages, inherited, depth + 1)?;
        }

        for attribute in &class.attributes {
            // Constants and immutables are compiled into code and occupy
            // no storage slot.
            if attribute.constant {
                continue;
            }

            let size = sizing::byte_size_with_limit(
                attribute,
                class,
                self.classes,
                depth,
                self.config.max_nesting_depth,
            )?;
            let no_inline_value = attribute.kind == AttributeKind::Mapping
                || (attribute.kind == AttributeKind::Array && !size.dynamic);
            let reference_storage_id =
                self.parse_reference_storage(attribute, class, storages, depth)?;

            let (from_slot, to_slot, byte_offset) = next_position(variables, size.bytes);
            let mut variable = Variable {
                id: self.ids.next_variable_id(),
                from_slot,
                to_slot,
                byte_size: size.bytes,
                byte_offset,
                typ: attribute.typ.clone(),
                dynamic: size.dynamic,
                no_inline_value,
                name: attribute.name.clone(),
                contract_name: class.name.clone(),
                reference_storage_id,
                slot_key: None,
                value: None,
            };
            if variable.dynamic && attribute.kind == AttributeKind::Array {
                variable.slot_key = Some(calc_slot_key(&variable));
            }
            anchor_reference_storage(storages, &variable);

            variables.push(variable);
        }

        Ok(())
    }
}

/// Computes the placement of a new variable of `byte_size` bytes after the
/// already-placed `variables`: its slot range and the byte offset within
/// its first slot.
///
/// A variable that does not fit in the remaining bytes of the current slot
/// opens a fresh one spanning as many slots as its size requires.
fn next_position(variables: &[Variable], byte_size: u64) -> (u64, u64, u64) {
    let (last_to_slot, next_offset) = variables
        .last()
        .map_or((0, 0), |last| (last.to_slot, last.byte_offset + last.byte_size));

    if next_offset + byte_size > SLOT_SIZE_BYTES {
        let from_slot = if variables.is_empty() {
            0
        } else {
            last_to_slot + 1
        };
        let to_slot = from_slot + (byte_size - 1) / SLOT_SIZE_BYTES;
        (from_slot, to_slot, 0)
    } else {
        (last_to_slot, last_to_slot, next_offset)
    }
}

/// Connects a newly placed `variable` to its nested storage, if it has
/// one.
///
/// Statically placed variables drag the nested layout into position by
/// rebasing its slots onto their own; dynamically placed ones record the
/// derived key on it instead, since their content is hash-addressed.
fn anchor_reference_storage(storages: &mut [Storage], variable: &Variable) {
    let Some(reference) = variable.reference_storage_id else {
        return;
    };
    if variable.dynamic {
        if let Some(storage) = storage_mut(storages, reference) {
            storage.slot_key = variable.slot_key.clone();
        }
    } else {
        shift_storage_slots(storages, reference, variable.from_slot);
    }
}

/// Rebases the slots of the storage identified by `id`, and recursively of
/// every statically placed storage it references, forward by `slots`.
///
/// Nested layouts are packed as if they started at slot 0 and shifted into
/// place once their containing variable's slot is known. Variables
/// carrying a derived key have the key recomputed from the shifted slot;
/// the recursion does not descend into hash-addressed storages, whose
/// internal slots stay relative to their derived start.
pub fn shift_storage_slots(storages: &mut [Storage], id: StorageId, slots: u64) {
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        let mut rekeyed = Vec::new();
        if let Some(storage) = storage_mut(storages, current) {
            for variable in &mut storage.variables {
                variable.from_slot += slots;
                variable.to_slot += slots;
                if variable.slot_key.is_some() {
                    let slot_key = calc_slot_key(variable);
                    variable.slot_key = Some(slot_key.clone());
                    if let Some(child) = variable.reference_storage_id {
                        rekeyed.push((child, slot_key));
                    }
                } else if let Some(child) = variable.reference_storage_id {
                    if !variable.dynamic {
                        pending.push(child);
                    }
                }
            }
        }
        for (child, slot_key) in rekeyed {
            if let Some(storage) = storage_mut(storages, child) {
                storage.slot_key = Some(slot_key);
            }
        }
    }
}

/// Gets a mutable reference to the storage with the provided `id`.
fn storage_mut(storages: &mut [Storage], id: StorageId) -> Option<&mut Storage> {
    storages.iter_mut().find(|storage| storage.id == id)
}
