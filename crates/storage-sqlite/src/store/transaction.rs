//! Store operations bound to one open SQLite transaction.

use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Double, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use serde_json::{Map, Value};

use trimlog_core::errors::{Error, Result, ValidationError};
use trimlog_core::stores::{descriptor, StoreDescriptor, StoreKey, TxMode};

use crate::errors::StorageError;

type BoxedQuery<'f> = BoxedSqlQuery<'f, Sqlite, SqlQuery>;

pub(crate) fn quote_identifier(value: &str) -> String {
    format!("`{}`", value.replace('`', "``"))
}

pub(crate) fn escape_sqlite_str(value: &str) -> String {
    value.replace('\'', "''")
}

pub(crate) fn json_path(key_path: &str) -> String {
    format!("$.{}", escape_sqlite_str(key_path))
}

fn bind_key<'f>(query: BoxedQuery<'f>, key: &StoreKey) -> BoxedQuery<'f> {
    match key {
        StoreKey::Int(v) => query.bind::<BigInt, _>(*v),
        StoreKey::Text(v) => query.bind::<Text, _>(v.clone()),
    }
}

/// Binds a JSON scalar the way `json_extract` returns it.
fn bind_index_value<'f>(query: BoxedQuery<'f>, store: &str, value: &Value) -> Result<BoxedQuery<'f>> {
    match value {
        Value::Bool(v) => Ok(query.bind::<BigInt, _>(i64::from(*v))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(query.bind::<BigInt, _>(i)),
            None => Ok(query.bind::<Double, _>(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => Ok(query.bind::<Text, _>(s.clone())),
        Value::Null => Err(ValidationError::MissingKey(store.to_string()).into()),
        Value::Array(_) | Value::Object(_) => Err(Error::invalid_input(format!(
            "index lookups on '{}' need a scalar value",
            store
        ))),
    }
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub(crate) fn set_path(record: &mut Value, path: &str, value: Value) {
    let mut current = record;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[derive(QueryableByName)]
struct RecordRow {
    #[diesel(sql_type = Nullable<BigInt>)]
    key_int: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    key_text: Option<String>,
    #[diesel(sql_type = Text)]
    record_value: String,
}

impl RecordRow {
    fn into_entry(self, store: &str) -> Result<(StoreKey, Value)> {
        let key = match (self.key_int, self.key_text) {
            (Some(v), _) => StoreKey::Int(v),
            (None, Some(v)) => StoreKey::Text(v),
            (None, None) => {
                return Err(Error::transaction(format!(
                    "store '{}' holds a record with an unsupported key type",
                    store
                )))
            }
        };
        Ok((key, serde_json::from_str(&self.record_value)?))
    }
}

#[derive(QueryableByName)]
struct RowIdRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    c: i64,
}

const SELECT_ENTRY: &str = "SELECT CASE WHEN typeof(record_key) = 'integer' THEN record_key END AS key_int, \
     CASE WHEN typeof(record_key) = 'text' THEN record_key END AS key_text, record_value";

/// A transaction over a fixed, declared set of stores.
///
/// Every store must be named when the transaction is opened; touching any other store, or
/// writing through a read-only transaction, fails with `Error::Transaction`.
pub struct StoreTx<'c> {
    conn: &'c mut SqliteConnection,
    scope: Vec<String>,
    mode: TxMode,
}

impl<'c> StoreTx<'c> {
    pub fn new(conn: &'c mut SqliteConnection, stores: &[String], mode: TxMode) -> Result<Self> {
        if stores.is_empty() {
            return Err(ValidationError::MissingStoreName.into());
        }
        for store in stores {
            if store.trim().is_empty() {
                return Err(ValidationError::MissingStoreName.into());
            }
            if descriptor(store).is_none() {
                return Err(ValidationError::UnknownStore(store.clone()).into());
            }
        }
        Ok(Self {
            conn,
            scope: stores.to_vec(),
            mode,
        })
    }

    pub fn mode(&self) -> TxMode {
        self.mode
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    fn store(&self, store: &str) -> Result<&'static StoreDescriptor> {
        if store.trim().is_empty() {
            return Err(ValidationError::MissingStoreName.into());
        }
        let desc =
            descriptor(store).ok_or_else(|| ValidationError::UnknownStore(store.to_string()))?;
        if !self.scope.iter().any(|s| s == store) {
            return Err(Error::transaction(format!(
                "store '{}' was not declared when the transaction was opened",
                store
            )));
        }
        Ok(desc)
    }

    fn writable(&self, store: &str) -> Result<&'static StoreDescriptor> {
        let desc = self.store(store)?;
        if self.mode == TxMode::ReadOnly {
            return Err(Error::transaction(format!(
                "cannot write to '{}' in a read-only transaction",
                store
            )));
        }
        Ok(desc)
    }

    /// Inserts a new record; fails if the key already exists.
    pub fn add(&mut self, store: &str, record: Value, key: Option<StoreKey>) -> Result<StoreKey> {
        self.write_record(store, record, key, false)
    }

    /// Inserts or replaces a record.
    pub fn put(&mut self, store: &str, record: Value, key: Option<StoreKey>) -> Result<StoreKey> {
        self.write_record(store, record, key, true)
    }

    /// Empties the store, then writes `record` as its only entry.
    pub fn put_clear_first(
        &mut self,
        store: &str,
        record: Value,
        key: Option<StoreKey>,
    ) -> Result<StoreKey> {
        self.clear(store)?;
        self.put(store, record, key)
    }

    fn write_record(
        &mut self,
        store: &str,
        mut record: Value,
        key: Option<StoreKey>,
        replace: bool,
    ) -> Result<StoreKey> {
        let desc = self.writable(store)?;
        if record.is_null() {
            return Err(ValidationError::MissingPayload(store.to_string()).into());
        }

        let resolved = match desc.key_path {
            Some(_) => desc.key_of(&record),
            None => key,
        };
        if resolved.is_none() && !desc.auto_increment {
            return Err(ValidationError::MissingKey(store.to_string()).into());
        }

        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        let table = quote_identifier(store);
        let written = match resolved {
            Some(key) => {
                let sql = format!(
                    "{} INTO {} (record_key, record_value) VALUES (?, ?)",
                    verb, table
                );
                let query = bind_key(diesel::sql_query(sql).into_boxed(), &key)
                    .bind::<Text, _>(record.to_string());
                query.execute(&mut *self.conn).map_err(StorageError::from)?;
                key
            }
            None => {
                let sql = format!(
                    "{} INTO {} (record_key, record_value) VALUES (NULL, ?)",
                    verb, table
                );
                diesel::sql_query(sql)
                    .bind::<Text, _>(record.to_string())
                    .execute(&mut *self.conn)
                    .map_err(StorageError::from)?;
                let row_id = diesel::sql_query("SELECT last_insert_rowid() AS id")
                    .get_result::<RowIdRow>(&mut *self.conn)
                    .map_err(StorageError::from)?
                    .id;
                if let Some(path) = desc.key_path {
                    set_path(&mut record, path, Value::from(row_id));
                    diesel::sql_query(format!(
                        "UPDATE {} SET record_value = ? WHERE record_key = ?",
                        table
                    ))
                    .bind::<Text, _>(record.to_string())
                    .bind::<BigInt, _>(row_id)
                    .execute(&mut *self.conn)
                    .map_err(StorageError::from)?;
                }
                StoreKey::Int(row_id)
            }
        };
        Ok(written)
    }

    pub fn get(&mut self, store: &str, key: &StoreKey) -> Result<Option<Value>> {
        self.store(store)?;
        let sql = format!(
            "SELECT record_value FROM {} WHERE record_key = ?",
            quote_identifier(store)
        );

        #[derive(QueryableByName)]
        struct ValueRow {
            #[diesel(sql_type = Text)]
            record_value: String,
        }

        let row = bind_key(diesel::sql_query(sql).into_boxed(), key)
            .get_result::<ValueRow>(&mut *self.conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.record_value)?)),
            None => Ok(None),
        }
    }

    pub fn get_all(&mut self, store: &str) -> Result<Vec<Value>> {
        Ok(self
            .get_all_entries(store)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Key and record pairs in key order.
    pub fn get_all_entries(&mut self, store: &str) -> Result<Vec<(StoreKey, Value)>> {
        self.store(store)?;
        let sql = format!(
            "{} FROM {} ORDER BY record_key",
            SELECT_ENTRY,
            quote_identifier(store)
        );
        diesel::sql_query(sql)
            .load::<RecordRow>(&mut *self.conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| row.into_entry(store))
            .collect()
    }

    pub fn get_all_by_index(&mut self, store: &str, index: &str, value: &Value) -> Result<Vec<Value>> {
        let desc = self.store(store)?;
        let idx = desc.index(index).ok_or_else(|| ValidationError::UnknownIndex {
            store: store.to_string(),
            index: index.to_string(),
        })?;
        let sql = format!(
            "{} FROM {} WHERE json_extract(record_value, '{}') = ? ORDER BY record_key",
            SELECT_ENTRY,
            quote_identifier(store),
            json_path(idx.key_path)
        );
        let query = bind_index_value(diesel::sql_query(sql).into_boxed(), store, value)?;
        query
            .load::<RecordRow>(&mut *self.conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| row.into_entry(store).map(|(_, value)| value))
            .collect()
    }

    /// Returns whether a record was removed.
    pub fn delete(&mut self, store: &str, key: &StoreKey) -> Result<bool> {
        self.writable(store)?;
        let sql = format!(
            "DELETE FROM {} WHERE record_key = ?",
            quote_identifier(store)
        );
        let affected = bind_key(diesel::sql_query(sql).into_boxed(), key)
            .execute(&mut *self.conn)
            .map_err(StorageError::from)?;
        Ok(affected > 0)
    }

    pub fn clear(&mut self, store: &str) -> Result<()> {
        self.writable(store)?;
        diesel::sql_query(format!("DELETE FROM {}", quote_identifier(store)))
            .execute(&mut *self.conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Highest key in the store (reverse cursor).
    pub fn last_key(&mut self, store: &str) -> Result<Option<StoreKey>> {
        self.store(store)?;
        let sql = format!(
            "{} FROM {} ORDER BY record_key DESC LIMIT 1",
            SELECT_ENTRY,
            quote_identifier(store)
        );
        let row = diesel::sql_query(sql)
            .get_result::<RecordRow>(&mut *self.conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|row| row.into_entry(store).map(|(key, _)| key))
            .transpose()
    }

    pub fn count(&mut self, store: &str) -> Result<usize> {
        self.store(store)?;
        let row = diesel::sql_query(format!(
            "SELECT COUNT(*) AS c FROM {}",
            quote_identifier(store)
        ))
        .get_result::<CountRow>(&mut *self.conn)
        .map_err(StorageError::from)?;
        Ok(usize::try_from(row.c).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_path_creates_nested_objects() {
        let mut record = json!({ "name": "x" });
        set_path(&mut record, "meta.id", json!(4));
        assert_eq!(record, json!({ "name": "x", "meta": { "id": 4 } }));

        set_path(&mut record, "cID", json!(9));
        assert_eq!(record["cID"], json!(9));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("ADDCLIENT"), "`ADDCLIENT`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(json_path("client_name"), "$.client_name");
    }
}
