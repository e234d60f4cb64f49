use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::catalog::domain::person_record::{PersonId, PersonRecord};
use crate::catalog::domain::result_store::{sort_records, ResultStore, StoreError};
use crate::shared::frame::Frame;

#[derive(Default)]
struct Inner {
    records: HashMap<PersonId, PersonRecord>,
    crops: HashMap<PersonId, Frame>,
}

/// Process-local store for dry runs and tests.
#[derive(Default)]
pub struct InMemoryResultStore {
    inner: Mutex<Inner>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ResultStore for InMemoryResultStore {
    fn put_record(&self, record: &PersonRecord) -> Result<(), StoreError> {
        self.inner()?
            .records
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get_record(&self, id: &PersonId) -> Result<PersonRecord, StoreError> {
        self.inner()?
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn put_face_crop(&self, id: &PersonId, crop: &Frame) -> Result<String, StoreError> {
        self.inner()?.crops.insert(id.clone(), crop.clone());
        Ok(format!("memory:{id}"))
    }

    fn get_face_crop(&self, id: &PersonId) -> Result<Frame, StoreError> {
        self.inner()?
            .crops
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn list_records(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let mut records: Vec<PersonRecord> = self.inner()?.records.values().cloned().collect();
        sort_records(&mut records);
        Ok(records)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let mut inner = self.inner()?;
        inner.records.clear();
        inner.crops.clear();
        Ok(())
    }
}
