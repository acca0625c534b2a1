//! This module contains the definitions for the layout representation
//! types produced by the packer, and the id arena they draw from.

use serde::{Deserialize, Serialize};

/// The identifier of a [`Storage`] within one layout computation.
pub type StorageId = usize;

/// The identifier of a [`Variable`] within one layout computation.
pub type VariableId = usize;

/// The computed storage layout for one contract.
///
/// The contract's own storage is always the first element; the nested
/// struct and array storages referenced from its variables follow, in the
/// order they were discovered.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StorageLayout {
    storages: Vec<Storage>,
}

impl StorageLayout {
    /// Wraps `storages` into a layout. The contract root must already be
    /// at index 0.
    pub(crate) fn new(storages: Vec<Storage>) -> Self {
        Self { storages }
    }

    /// Gets the contract-level root storage.
    #[allow(clippy::missing_panics_doc)] // The packer always places the root at index 0
    #[must_use]
    pub fn root(&self) -> &Storage {
        self.storages
            .first()
            .expect("A layout always contains its root storage")
    }

    /// Gets all storages in this layout, root first.
    #[must_use]
    pub fn storages(&self) -> &Vec<Storage> {
        &self.storages
    }

    /// Gets the storage with the provided `id`, if any.
    #[must_use]
    pub fn storage(&self, id: StorageId) -> Option<&Storage> {
        self.storages.iter().find(|storage| storage.id == id)
    }
}

/// Additional utility functions to enable cleaner testing with computed
/// layouts.
impl StorageLayout {
    /// Gets the number of storages in the layout.
    #[must_use]
    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }

    /// Gets the root variable with the provided `name`, if any.
    #[must_use]
    pub fn root_variable(&self, name: &str) -> Option<&Variable> {
        self.root().variable(name)
    }

    /// Checks that the root storage holds a variable `name` starting at
    /// `from_slot` and `byte_offset`.
    #[must_use]
    pub fn has_root_variable_at(&self, name: &str, from_slot: u64, byte_offset: u64) -> bool {
        self.root_variable(name).is_some_and(|variable| {
            variable.from_slot == from_slot && variable.byte_offset == byte_offset
        })
    }

    /// Gets the nested storage referenced by the root variable `name`, if
    /// there is one.
    #[must_use]
    pub fn reference_storage_of(&self, name: &str) -> Option<&Storage> {
        self.storage(self.root_variable(name)?.reference_storage_id?)
    }
}

/// The kind of container a [`Storage`] describes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// A contract's top-level storage.
    Contract,

    /// The layout of a struct referenced by an outer variable.
    Struct,

    /// The layout of a fixed or dynamic array referenced by an outer
    /// variable.
    Array,
}

/// One packed container: a contract's top-level storage, or a nested
/// struct or array referenced from an outer variable.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Storage {
    /// The unique id of this storage within its layout.
    pub id: StorageId,

    /// The display name: the contract name, or the referencing attribute's
    /// type text.
    pub name: String,

    /// The kind of container described.
    #[serde(rename = "type")]
    pub kind: StorageKind,

    /// The packed variables, in declaration order.
    pub variables: Vec<Variable>,

    /// The element count, for fixed-size array storages.
    pub array_length: Option<u64>,

    /// Whether an array storage is dynamically sized.
    pub array_dynamic: Option<bool>,

    /// The derived storage key at which a dynamically-located storage's
    /// content starts.
    pub slot_key: Option<String>,
}

impl Storage {
    /// Gets the variable with the provided `name`, if any.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// Gets the highest slot number used by this storage's variables.
    #[must_use]
    pub fn last_slot(&self) -> Option<u64> {
        self.variables.iter().map(|variable| variable.to_slot).max()
    }
}

/// One packed storage variable.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Variable {
    /// The unique id of this variable within its layout.
    pub id: VariableId,

    /// The first slot the variable occupies.
    pub from_slot: u64,

    /// The last slot the variable occupies, inclusive.
    pub to_slot: u64,

    /// The number of bytes the variable occupies inline.
    pub byte_size: u64,

    /// The byte offset of the variable within [`Self::from_slot`],
    /// counting from the least-significant end of the slot word.
    pub byte_offset: u64,

    /// The declared type text, for display.
    #[serde(rename = "type")]
    pub typ: String,

    /// True when the variable's content lives at a derived location rather
    /// than inline in its slot range.
    pub dynamic: bool,

    /// True when the variable has no single-word inline value that can be
    /// fetched from [`Self::from_slot`]: mappings, and statically-sized
    /// arrays.
    pub no_inline_value: bool,

    /// The declared variable name, or the element index inside an array
    /// storage.
    pub name: String,

    /// The name of the class that declared the variable.
    pub contract_name: String,

    /// The storage describing the variable's nested struct or array
    /// layout, if it has one.
    pub reference_storage_id: Option<StorageId>,

    /// The derived storage key, for dynamic arrays.
    pub slot_key: Option<String>,

    /// The raw 32-byte value fetched from the chain, merged in by the
    /// host. Always `None` when the layout is first computed.
    pub value: Option<String>,
}

/// Allocates storage and variable ids for one packing arena.
///
/// Each packer owns its allocator, so ids are deterministic for a given
/// class set and are never shared between unrelated computations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdAllocator {
    next_storage:  StorageId,
    next_variable: VariableId,
}

impl IdAllocator {
    /// Creates an allocator with both counters at their starting value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_storage:  1,
            next_variable: 1,
        }
    }

    /// Allocates the next storage id.
    pub fn next_storage_id(&mut self) -> StorageId {
        let id = self.next_storage;
        self.next_storage += 1;
        id
    }

    /// Allocates the next variable id.
    pub fn next_variable_id(&mut self) -> VariableId {
        let id = self.next_variable;
        self.next_variable += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
