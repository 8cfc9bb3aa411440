//! ID allocation from single-record counter stores.
//!
//! Both functions must run inside the same transaction as the writes that consume the ID.
//! Two allocations without an intervening `record_issued_id` return the same value.

use serde_json::{Map, Value};

use trimlog_core::errors::{Error, Result, ValidationError};
use trimlog_core::stores::{descriptor, StoreKey};

use super::transaction::{set_path, StoreTx};

/// Next free ID of a sequence: last counter key + 1, or 1 for an empty counter store.
pub fn next_id(tx: &mut StoreTx<'_>, counter_store: &str) -> Result<i64> {
    match tx.last_key(counter_store)? {
        None => Ok(1),
        Some(StoreKey::Int(last)) => Ok(last + 1),
        Some(StoreKey::Text(other)) => Err(Error::transaction(format!(
            "counter store '{}' holds non-integer key '{}'",
            counter_store, other
        ))),
    }
}

/// Replaces the counter record with `{key_path: id}` unless the counter is already higher.
///
/// Returns the counter value left in the store.
pub fn record_issued_id(tx: &mut StoreTx<'_>, counter_store: &str, id: i64) -> Result<i64> {
    let key_path = descriptor(counter_store)
        .and_then(|d| d.key_path)
        .ok_or_else(|| ValidationError::UnknownStore(counter_store.to_string()))?;

    if let Some(StoreKey::Int(current)) = tx.last_key(counter_store)? {
        if current >= id {
            return Ok(current);
        }
    }

    let mut record = Value::Object(Map::new());
    set_path(&mut record, key_path, Value::from(id));
    tx.put_clear_first(counter_store, record, None)?;
    Ok(id)
}
