use std::collections::BTreeMap;

use crate::schema::{Category, ScoreDocument};

/// Per-category score samples collected across a batch.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    samples: BTreeMap<Category, Vec<f64>>,
}

impl AggregateReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one successfully graded document in, one sample per category.
    pub fn record(&mut self, document: &ScoreDocument) {
        for category in Category::ALL {
            self.samples
                .entry(category)
                .or_default()
                .push(document.score(category));
        }
    }

    pub fn samples(&self, category: Category) -> &[f64] {
        self.samples
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of documents folded in so far.
    pub fn len(&self) -> usize {
        self.samples(Category::OverallGrade).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arithmetic mean per category. Categories without samples are omitted.
    pub fn finalize(&self) -> BTreeMap<Category, f64> {
        self.samples
            .iter()
            .filter(|(_, scores)| !scores.is_empty())
            .map(|(category, scores)| {
                let sum: f64 = scores.iter().sum();
                (*category, sum / scores.len() as f64)
            })
            .collect()
    }
}
