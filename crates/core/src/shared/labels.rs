use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Output order of the gender classifier head.
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

/// One age-range label such as `"(25-32)"`.
///
/// The set of valid buckets is whatever the age model was trained on, so the
/// label is carried verbatim rather than parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeBucket(String);

impl AgeBucket {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw or confirmed (age, gender) label.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Prediction {
    pub age: AgeBucket,
    pub gender: Gender,
}

impl Prediction {
    pub fn new(age: impl Into<String>, gender: Gender) -> Self {
        Self {
            age: AgeBucket::new(age),
            gender,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.gender, self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"Female\"");
        let g: Gender = serde_json::from_str("\"Male\"").unwrap();
        assert_eq!(g, Gender::Male);
    }

    #[test]
    fn test_age_bucket_is_transparent() {
        let a = AgeBucket::new("(25-32)");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"(25-32)\"");
        assert_eq!(a.to_string(), "(25-32)");
    }

    #[test]
    fn test_prediction_display() {
        let p = Prediction::new("(8-12)", Gender::Male);
        assert_eq!(p.to_string(), "Male (8-12)");
    }
}
