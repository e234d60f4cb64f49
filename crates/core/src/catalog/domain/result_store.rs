use std::path::PathBuf;

use thiserror::Error;

use super::person_record::{PersonId, PersonRecord};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no person with id {0}")]
    NotFound(PersonId),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Durable home of confirmed persons and their face crops.
///
/// Shared across runs, so implementations serialize their own writes and
/// take `&self`.
pub trait ResultStore: Send + Sync {
    /// Inserts `record`, replacing any record with the same id.
    fn put_record(&self, record: &PersonRecord) -> Result<(), StoreError>;

    fn get_record(&self, id: &PersonId) -> Result<PersonRecord, StoreError>;

    /// Stores the crop for `id` and returns the reference to put in
    /// [`PersonRecord::image`].
    fn put_face_crop(&self, id: &PersonId, crop: &Frame) -> Result<String, StoreError>;

    fn get_face_crop(&self, id: &PersonId) -> Result<Frame, StoreError>;

    /// Every stored record, ordered by entry time then id.
    fn list_records(&self) -> Result<Vec<PersonRecord>, StoreError>;

    fn clear_all(&self) -> Result<(), StoreError>;
}

/// Catalog ordering shared by the store implementations.
pub fn sort_records(records: &mut [PersonRecord]) {
    records.sort_by(|a, b| {
        a.entry_time
            .cmp(&b.entry_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
