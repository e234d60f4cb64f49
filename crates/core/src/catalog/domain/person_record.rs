use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::labels::{AgeBucket, Gender};

const RUN_ID_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid person id {0:?}: expected <12 hex chars>-<track number>")]
pub struct InvalidPersonId(pub String);

/// Namespace for the track ids of one processing run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Fresh id: the first 12 hex digits of a v4 UUID.
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(hex[..RUN_ID_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunId {
    type Err = InvalidPersonId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == RUN_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidPersonId(s.to_string()))
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique person id: the run that produced it plus the track id
/// within that run. Rendered as `"<run>-<track>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonId {
    pub run: RunId,
    pub track: u64,
}

impl PersonId {
    pub fn new(run: RunId, track: u64) -> Self {
        Self { run, track }
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.run, self.track)
    }
}

impl FromStr for PersonId {
    type Err = InvalidPersonId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPersonId(s.to_string());
        let (run, track) = s.split_once('-').ok_or_else(invalid)?;
        let run = run.parse::<RunId>().map_err(|_| invalid())?;
        let track = track.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { run, track })
    }
}

impl TryFrom<String> for PersonId {
    type Error = InvalidPersonId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PersonId> for String {
    fn from(id: PersonId) -> Self {
        id.to_string()
    }
}

/// One uniquely identified person, emitted when a track confirms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    /// Store reference to the face crop; `None` when the crop could not be
    /// persisted.
    pub image: Option<String>,
    pub gender: Gender,
    pub age: AgeBucket,
    pub entry_time: DateTime<Utc>,
    /// Decode index of the frame in which the track first appeared.
    pub first_frame: usize,
}
