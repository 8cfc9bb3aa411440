use serde_json::Value;

use super::{NewNote, PersonalNote};
use crate::errors::Result;
use crate::records::{MutationOptions, RecordCoordinator, NOTE_FAMILY};
use crate::stores::StoreKey;

fn decode(record: Value) -> Result<PersonalNote> {
    Ok(serde_json::from_value(record)?)
}

pub struct NoteService {
    records: RecordCoordinator,
}

impl NoteService {
    pub fn new(records: RecordCoordinator) -> Self {
        Self { records }
    }

    pub async fn add_note(&self, note: NewNote, options: MutationOptions) -> Result<PersonalNote> {
        let record = serde_json::to_value(note)?;
        decode(self.records.insert(&NOTE_FAMILY, record, options).await?)
    }

    pub async fn update_note(
        &self,
        note: PersonalNote,
        options: MutationOptions,
    ) -> Result<PersonalNote> {
        let key = StoreKey::Int(note.note_id);
        let patch = serde_json::to_value(note)?;
        decode(self.records.update(&NOTE_FAMILY, key, patch, options).await?)
    }

    pub async fn delete_note(
        &self,
        note_id: i64,
        options: MutationOptions,
    ) -> Result<Option<PersonalNote>> {
        self.records
            .delete(&NOTE_FAMILY, StoreKey::Int(note_id), options)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn list_notes(&self) -> Result<Vec<PersonalNote>> {
        self.records
            .list(&NOTE_FAMILY)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}
