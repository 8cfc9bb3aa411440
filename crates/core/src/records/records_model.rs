use serde::{Deserialize, Serialize};

use crate::stores::{names, BackupTarget};

/// Mutation kinds that produce a mirror record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOperation {
    Add,
    Edit,
    Delete,
}

/// Mirror store plus operation tag for one mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorSpec {
    pub store: &'static str,
    pub tag: &'static str,
}

impl MirrorSpec {
    pub fn target(&self) -> BackupTarget {
        BackupTarget::new(self.store, self.tag)
    }
}

/// Array field whose elements draw IDs from their own sequence (e.g. horses inside a client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSequence {
    pub field: &'static str,
    pub key_path: &'static str,
    pub counter: &'static str,
}

/// Everything the coordinator needs to know about one entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFamily {
    pub name: &'static str,
    pub store: &'static str,
    pub key_path: &'static str,
    pub counter: &'static str,
    pub nested: Option<NestedSequence>,
    pub add: MirrorSpec,
    pub edit: MirrorSpec,
    pub delete: MirrorSpec,
}

impl EntityFamily {
    pub fn mirror(&self, operation: RecordOperation) -> MirrorSpec {
        match operation {
            RecordOperation::Add => self.add,
            RecordOperation::Edit => self.edit,
            RecordOperation::Delete => self.delete,
        }
    }

    /// Every store a mutation of this family may touch, declared up front.
    pub fn transaction_scope(&self, backup: Option<&BackupTarget>) -> Vec<String> {
        let mut scope = vec![self.store.to_string(), self.counter.to_string()];
        if let Some(nested) = self.nested {
            scope.push(nested.counter.to_string());
        }
        if let Some(target) = backup {
            if !scope.contains(&target.store) {
                scope.push(target.store.clone());
            }
        }
        scope
    }
}

pub static CLIENT_FAMILY: EntityFamily = EntityFamily {
    name: "client",
    store: names::CLIENTS,
    key_path: "cID",
    counter: names::MAX_CLIENT_ID,
    nested: Some(NestedSequence {
        field: "horses",
        key_path: "hID",
        counter: names::MAX_HORSE_ID,
    }),
    add: MirrorSpec {
        store: names::ADD_CLIENT,
        tag: "add_client",
    },
    edit: MirrorSpec {
        store: names::EDIT_CLIENT,
        tag: "edit_client",
    },
    delete: MirrorSpec {
        store: names::DELETE_CLIENT,
        tag: "delete_client",
    },
};

pub static TRIMMING_FAMILY: EntityFamily = EntityFamily {
    name: "trimming",
    store: names::TRIMMING_INFO,
    key_path: "trimID",
    counter: names::MAX_TRIM_ID,
    nested: None,
    add: MirrorSpec {
        store: names::ADD_TRIMMING,
        tag: "add_trimming",
    },
    edit: MirrorSpec {
        store: names::EDIT_TRIMMING,
        tag: "edit_trimming",
    },
    delete: MirrorSpec {
        store: names::DELETE_TRIMMING,
        tag: "delete_trimming",
    },
};

pub static NOTE_FAMILY: EntityFamily = EntityFamily {
    name: "note",
    store: names::PERSONAL_NOTES,
    key_path: "noteID",
    counter: names::MAX_NOTE_ID,
    nested: None,
    add: MirrorSpec {
        store: names::ADD_NOTE,
        tag: "add_note",
    },
    edit: MirrorSpec {
        store: names::EDIT_NOTE,
        tag: "edit_note",
    },
    delete: MirrorSpec {
        store: names::DELETE_NOTE,
        tag: "delete_note",
    },
};

/// Where the mirror record of a mutation goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MirrorPolicy {
    /// The family's own mirror store and tag for the operation.
    #[default]
    FamilyDefault,
    Custom(BackupTarget),
    /// No mirror record: the change is never pushed.
    LocalOnly,
}

/// Per-call options of a coordinated mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOptions {
    pub mirror: MirrorPolicy,
    pub wait_for_completion: bool,
}

impl MutationOptions {
    pub fn local_only() -> Self {
        Self {
            mirror: MirrorPolicy::LocalOnly,
            wait_for_completion: false,
        }
    }

    pub fn with_backup(store: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            mirror: MirrorPolicy::Custom(BackupTarget::new(store, tag)),
            wait_for_completion: false,
        }
    }

    pub fn verified(mut self) -> Self {
        self.wait_for_completion = true;
        self
    }

    pub fn resolve(&self, family: &EntityFamily, operation: RecordOperation) -> Option<BackupTarget> {
        match &self.mirror {
            MirrorPolicy::FamilyDefault => Some(family.mirror(operation).target()),
            MirrorPolicy::Custom(target) => Some(target.clone()),
            MirrorPolicy::LocalOnly => None,
        }
    }
}
