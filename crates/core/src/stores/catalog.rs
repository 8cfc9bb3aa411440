//! Fixed store catalog of the local database.

use super::{IndexDescriptor, StoreDescriptor, StoreKind};

/// Current schema version. Bumping it makes the next open run the upgrade step.
pub const SCHEMA_VERSION: i64 = 1;

/// Store names.
pub mod names {
    pub const CLIENTS: &str = "clients";
    pub const TRIMMING_INFO: &str = "trimming_info";
    pub const PERSONAL_NOTES: &str = "personal_notes";
    pub const MILEAGE: &str = "mileage";
    pub const SETTINGS: &str = "settings";

    pub const MAX_CLIENT_ID: &str = "max_client_id";
    pub const MAX_HORSE_ID: &str = "max_horse_id";
    pub const MAX_TRIM_ID: &str = "max_trim_id";
    pub const MAX_NOTE_ID: &str = "max_note_id";
    pub const MAX_MILEAGE_ID: &str = "max_mileage_id";

    pub const ADD_CLIENT: &str = "ADDCLIENT";
    pub const EDIT_CLIENT: &str = "EDITCLIENT";
    pub const DELETE_CLIENT: &str = "DELETECLIENT";
    pub const ADD_TRIMMING: &str = "ADDTRIMMING";
    pub const EDIT_TRIMMING: &str = "EDITTRIMMING";
    pub const DELETE_TRIMMING: &str = "DELETETRIMMING";
    pub const ADD_NOTE: &str = "ADDNOTE";
    pub const EDIT_NOTE: &str = "EDITNOTE";
    pub const DELETE_NOTE: &str = "DELETENOTE";
    pub const EDIT_SETTINGS: &str = "EDITSETTINGS";

    pub const ERROR_QUEUE: &str = "error_queue";
}

const NO_INDEXES: &[IndexDescriptor] = &[];

const fn primary(
    name: &'static str,
    key_path: &'static str,
    indexes: &'static [IndexDescriptor],
) -> StoreDescriptor {
    StoreDescriptor {
        name,
        kind: StoreKind::Primary,
        key_path: Some(key_path),
        auto_increment: false,
        indexes,
        since_version: 1,
    }
}

const fn counter(name: &'static str, key_path: &'static str) -> StoreDescriptor {
    StoreDescriptor {
        name,
        kind: StoreKind::Counter,
        key_path: Some(key_path),
        auto_increment: false,
        indexes: NO_INDEXES,
        since_version: 1,
    }
}

const fn mirror(name: &'static str) -> StoreDescriptor {
    StoreDescriptor {
        name,
        kind: StoreKind::Mirror,
        key_path: None,
        auto_increment: true,
        indexes: NO_INDEXES,
        since_version: 1,
    }
}

/// Every store of schema version [`SCHEMA_VERSION`].
pub static STORE_CATALOG: &[StoreDescriptor] = &[
    primary(
        names::CLIENTS,
        "cID",
        &[
            IndexDescriptor {
                name: "client_name",
                key_path: "client_name",
            },
            IndexDescriptor {
                name: "phone",
                key_path: "phone",
            },
        ],
    ),
    primary(
        names::TRIMMING_INFO,
        "trimID",
        &[
            IndexDescriptor {
                name: "cID",
                key_path: "cID",
            },
            IndexDescriptor {
                name: "trim_date",
                key_path: "trim_date",
            },
        ],
    ),
    primary(
        names::PERSONAL_NOTES,
        "noteID",
        &[IndexDescriptor {
            name: "note_date",
            key_path: "note_date",
        }],
    ),
    primary(
        names::MILEAGE,
        "mileageID",
        &[IndexDescriptor {
            name: "mileage_date",
            key_path: "mileage_date",
        }],
    ),
    StoreDescriptor {
        name: names::SETTINGS,
        kind: StoreKind::Settings,
        key_path: Some("userID"),
        auto_increment: false,
        indexes: NO_INDEXES,
        since_version: 1,
    },
    counter(names::MAX_CLIENT_ID, "cID"),
    counter(names::MAX_HORSE_ID, "hID"),
    counter(names::MAX_TRIM_ID, "trimID"),
    counter(names::MAX_NOTE_ID, "noteID"),
    counter(names::MAX_MILEAGE_ID, "mileageID"),
    mirror(names::ADD_CLIENT),
    mirror(names::EDIT_CLIENT),
    mirror(names::DELETE_CLIENT),
    mirror(names::ADD_TRIMMING),
    mirror(names::EDIT_TRIMMING),
    mirror(names::DELETE_TRIMMING),
    mirror(names::ADD_NOTE),
    mirror(names::EDIT_NOTE),
    mirror(names::DELETE_NOTE),
    mirror(names::EDIT_SETTINGS),
    StoreDescriptor {
        name: names::ERROR_QUEUE,
        kind: StoreKind::ErrorQueue,
        key_path: None,
        auto_increment: true,
        indexes: &[IndexDescriptor {
            name: "queued_at",
            key_path: "queuedAt",
        }],
        since_version: 1,
    },
];

/// Looks up a store in the default catalog.
pub fn descriptor(name: &str) -> Option<&'static StoreDescriptor> {
    STORE_CATALOG.iter().find(|store| store.name == name)
}

/// Names of every mirror store in the default catalog.
pub fn mirror_store_names() -> Vec<&'static str> {
    STORE_CATALOG
        .iter()
        .filter(|store| store.kind == StoreKind::Mirror)
        .map(|store| store.name)
        .collect()
}
