mod notes_model;
mod notes_service;

pub use notes_model::*;
pub use notes_service::NoteService;
