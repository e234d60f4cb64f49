/// Fixed-size voting window that freezes one label per track.
///
/// Raw predictions are appended until the window holds `capacity` entries.
/// The append that fills it resolves age and gender independently by
/// majority vote (ties go to the most recent observation), and from then on
/// the stabilizer ignores further input.
use std::collections::HashMap;
use std::hash::Hash;

use crate::shared::labels::Prediction;

#[derive(Clone, Debug)]
pub struct Stabilizer {
    window: Vec<Prediction>,
    capacity: usize,
    confirmed: Option<Prediction>,
}

impl Stabilizer {
    /// `capacity` of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: Vec::with_capacity(capacity),
            capacity,
            confirmed: None,
        }
    }

    /// Appends `prediction` unless already confirmed. Returns the confirmed
    /// label only on the call that fills the window.
    pub fn record(&mut self, prediction: Prediction) -> Option<Prediction> {
        if self.confirmed.is_some() {
            return None;
        }

        self.window.push(prediction);
        if self.window.len() < self.capacity {
            return None;
        }

        let (Some(age), Some(gender)) = (
            majority(self.window.iter().map(|p| &p.age)),
            majority(self.window.iter().map(|p| &p.gender)),
        ) else {
            return None;
        };
        let label = Prediction {
            age: age.clone(),
            gender: *gender,
        };
        self.confirmed = Some(label.clone());
        Some(label)
    }

    pub fn confirmed(&self) -> Option<&Prediction> {
        self.confirmed.as_ref()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.is_some()
    }

    pub fn window(&self) -> &[Prediction] {
        &self.window
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Most frequent value; among equally frequent values, the one seen last.
fn majority<'a, T, I>(values: I) -> Option<&'a T>
where
    T: Eq + Hash + 'a,
    I: DoubleEndedIterator<Item = &'a T> + Clone,
{
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for v in values.clone() {
        *counts.entry(v).or_insert(0) += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);

    values
        .rev()
        .find(|v| counts.get(v).copied() == Some(best))
}
