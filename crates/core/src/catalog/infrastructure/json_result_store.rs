use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::catalog::domain::person_record::{PersonId, PersonRecord};
use crate::catalog::domain::result_store::{sort_records, ResultStore, StoreError};
use crate::shared::constants::{CATALOG_FILE_NAME, FACES_DIR_NAME};
use crate::shared::frame::Frame;

/// File-backed store rooted at a data directory:
///
/// ```text
/// <root>/detections.json            pretty JSON array of PersonRecord
/// <root>/faces/person_<id>.jpg      one crop per person
/// ```
///
/// The catalog is rewritten through a temp file and renamed into place, so
/// readers never see a half-written `detections.json`.
pub struct JsonResultStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonResultStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let faces = root.join(FACES_DIR_NAME);
        fs::create_dir_all(&faces).map_err(|e| io_err(&faces, e))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE_NAME)
    }

    fn face_reference(id: &PersonId) -> String {
        format!("{FACES_DIR_NAME}/person_{id}.jpg")
    }

    fn face_path(&self, id: &PersonId) -> PathBuf {
        self.root.join(Self::face_reference(id))
    }

    fn read_catalog(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let path = self.catalog_path();
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn write_catalog(&self, records: &[PersonRecord]) -> Result<(), StoreError> {
        let path = self.catalog_path();
        let temp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(records)?;

        let mut file = fs::File::create(&temp).map_err(|e| io_err(&temp, e))?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .map_err(|e| io_err(&temp, e))?;
        drop(file);

        fs::rename(&temp, &path).map_err(|e| io_err(&path, e))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.lock.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ResultStore for JsonResultStore {
    fn put_record(&self, record: &PersonRecord) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut records = self.read_catalog()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        sort_records(&mut records);
        self.write_catalog(&records)
    }

    fn get_record(&self, id: &PersonId) -> Result<PersonRecord, StoreError> {
        let _guard = self.guard()?;
        self.read_catalog()?
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn put_face_crop(&self, id: &PersonId, crop: &Frame) -> Result<String, StoreError> {
        let _guard = self.guard()?;
        let path = self.face_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        crop.to_rgb_image().save(&path)?;
        Ok(Self::face_reference(id))
    }

    fn get_face_crop(&self, id: &PersonId) -> Result<Frame, StoreError> {
        let _guard = self.guard()?;
        let path = self.face_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let img = image::open(&path)?.to_rgb8();
        Ok(Frame::from_rgb_image(img, 0))
    }

    fn list_records(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let _guard = self.guard()?;
        let mut records = self.read_catalog()?;
        sort_records(&mut records);
        Ok(records)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let catalog = self.catalog_path();
        match fs::remove_file(&catalog) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&catalog, e)),
        }

        let faces = self.root.join(FACES_DIR_NAME);
        if faces.exists() {
            fs::remove_dir_all(&faces).map_err(|e| io_err(&faces, e))?;
        }
        fs::create_dir_all(&faces).map_err(|e| io_err(&faces, e))
    }
}

fn io_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
