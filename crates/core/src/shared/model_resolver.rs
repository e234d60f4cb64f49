use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::constants::{
    AGE_MODEL_NAME, AGE_MODEL_URL, APP_DIR_NAME, FACE_MODEL_NAME, FACE_MODEL_URL,
    GENDER_MODEL_NAME, GENDER_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create model directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Progress callback shared across several downloads: `(model_name, downloaded, total)`.
pub type NamedProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// A model the pipeline needs, with the URL it is fetched from when missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub url: &'static str,
}

pub const FACE_MODEL: ModelSpec = ModelSpec {
    name: FACE_MODEL_NAME,
    url: FACE_MODEL_URL,
};
pub const AGE_MODEL: ModelSpec = ModelSpec {
    name: AGE_MODEL_NAME,
    url: AGE_MODEL_URL,
};
pub const GENDER_MODEL: ModelSpec = ModelSpec {
    name: GENDER_MODEL_NAME,
    url: GENDER_MODEL_URL,
};

/// On-disk paths of the three models a run loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub face: PathBuf,
    pub age: PathBuf,
    pub gender: PathBuf,
}

/// Where models are looked up and downloaded to.
#[derive(Clone, Debug, Default)]
pub struct ModelLocations {
    /// Overrides the platform cache directory when set.
    pub cache_dir: Option<PathBuf>,
    /// Read-only directory checked after the cache (pre-packaged installs).
    pub bundled_dir: Option<PathBuf>,
}

impl ModelLocations {
    pub fn cache_dir(&self) -> Result<PathBuf, ModelResolveError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => model_cache_dir(),
        }
    }

    /// Resolve a model file by name, checking local locations before downloading.
    ///
    /// Resolution order:
    /// 1. Cache directory (override or platform-specific)
    /// 2. Bundled directory
    /// 3. Download from URL into the cache
    pub fn resolve(
        &self,
        model: ModelSpec,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.find_local(model.name)? {
            return Ok(path);
        }

        let cache_dir = self.cache_dir()?;
        fs::create_dir_all(&cache_dir).map_err(|e| ModelResolveError::CacheDir {
            path: cache_dir.clone(),
            source: e,
        })?;
        let cached_path = cache_dir.join(model.name);
        log::info!("Downloading {} from {}", model.name, model.url);
        download(model.url, &cached_path, progress)?;
        Ok(cached_path)
    }

    /// Path of an already-present copy of `name`, without touching the network.
    pub fn find_local(&self, name: &str) -> Result<Option<PathBuf>, ModelResolveError> {
        let cached_path = self.cache_dir()?.join(name);
        if cached_path.exists() {
            return Ok(Some(cached_path));
        }

        if let Some(dir) = &self.bundled_dir {
            let bundled_path = dir.join(name);
            if bundled_path.exists() {
                return Ok(Some(bundled_path));
            }
        }

        Ok(None)
    }

    /// Resolves the face, age and gender models, downloading whichever are
    /// missing. `progress` receives the model name with each byte update.
    pub fn resolve_all(
        &self,
        progress: Option<NamedProgressFn>,
    ) -> Result<ModelPaths, ModelResolveError> {
        let fetch = |model: ModelSpec| -> Result<PathBuf, ModelResolveError> {
            let cb = progress.clone().map(|p| {
                Box::new(move |done, total| p(model.name, done, total)) as ProgressFn
            });
            self.resolve(model, cb)
        };
        Ok(ModelPaths {
            face: fetch(FACE_MODEL)?,
            age: fetch(AGE_MODEL)?,
            gender: fetch(GENDER_MODEL)?,
        })
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceCensus/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceCensus/models/` or `~/.cache/FaceCensus/models/`
/// - Windows: `%LOCALAPPDATA%/FaceCensus/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Only complete downloads ever carry the final name.
    let temp_path = dest.with_extension("part");
    let write_err = |e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let chunk_size = 1024 * 1024;
    for chunk in bytes.chunks(chunk_size) {
        if let Err(e) = file.write_all(chunk) {
            drop(file);
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
