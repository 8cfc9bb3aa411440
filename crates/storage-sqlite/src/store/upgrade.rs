//! Schema upgrade: creates every store the target version needs, exactly once.

use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use log::info;

use trimlog_core::errors::{Error, Result};
use trimlog_core::stores::{StoreDescriptor, STORE_CATALOG};

use super::model::StoreCatalogDB;
use super::transaction::{json_path, quote_identifier};
use crate::errors::StorageError;
use crate::schema::store_catalog;

#[derive(QueryableByName)]
struct UserVersionRow {
    #[diesel(sql_type = BigInt)]
    user_version: i64,
}

pub(crate) fn stored_version(conn: &mut SqliteConnection) -> Result<i64> {
    let row = diesel::sql_query("PRAGMA user_version")
        .get_result::<UserVersionRow>(conn)
        .map_err(StorageError::from)?;
    Ok(row.user_version)
}

fn create_store(conn: &mut SqliteConnection, desc: &StoreDescriptor) -> Result<()> {
    let table = quote_identifier(desc.name);
    let ddl = if desc.auto_increment {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (record_key INTEGER PRIMARY KEY AUTOINCREMENT, record_value TEXT NOT NULL)",
            table
        )
    } else {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (record_key NOT NULL PRIMARY KEY, record_value TEXT NOT NULL)",
            table
        )
    };
    diesel::sql_query(ddl)
        .execute(conn)
        .map_err(StorageError::from)?;

    for idx in desc.indexes {
        let index_name = quote_identifier(&format!("{}__{}", desc.name, idx.name));
        diesel::sql_query(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (json_extract(record_value, '{}'))",
            index_name,
            table,
            json_path(idx.key_path)
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    }
    Ok(())
}

/// Creates missing stores up to `target` and stamps the version. Idempotent per store name.
pub(crate) fn upgrade(conn: &mut SqliteConnection, target: i64) -> std::result::Result<usize, StorageError> {
    conn.immediate_transaction::<usize, StorageError, _>(|conn| {
        let mut created = 0;
        for desc in STORE_CATALOG.iter().filter(|d| d.since_version <= target) {
            create_store(conn, desc)?;
            created += diesel::insert_or_ignore_into(store_catalog::table)
                .values(StoreCatalogDB::from_descriptor(desc, target))
                .execute(conn)?;
        }
        diesel::sql_query(format!("PRAGMA user_version = {}", target)).execute(conn)?;
        Ok(created)
    })
}

/// Maps an upgrade failure onto the connection state it leaves behind.
pub(crate) fn upgrade_error(err: StorageError) -> Error {
    if err.is_lock_contention() {
        Error::Blocked(format!("another connection holds the database: {}", err))
    } else {
        Error::connection(format!("schema upgrade failed: {}", err))
    }
}

pub(crate) fn created_stores(conn: &mut SqliteConnection) -> Result<Vec<StoreCatalogDB>> {
    Ok(store_catalog::table
        .order(store_catalog::store_name.asc())
        .select(StoreCatalogDB::as_select())
        .load::<StoreCatalogDB>(conn)
        .map_err(StorageError::from)?)
}

pub(crate) fn log_upgrade(from: i64, to: i64, created: usize) {
    info!(
        "Local store upgraded from version {} to {} ({} store(s) registered)",
        from, to, created
    );
}
