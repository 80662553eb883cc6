//! Bijective mapping between label strings and contiguous class indices
//!
//! Classes are assigned in sorted label order, so the index layout is
//! reproducible across runs on the same label set. The mapping is persisted
//! as JSON next to the exported model.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{RepError, Result};

/// Maps distinct label strings to contiguous class indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Build an encoder from raw labels. Duplicates collapse, classes sort.
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = labels.into_iter().collect();
        LabelEncoder {
            classes: distinct.into_iter().map(String::from).collect(),
        }
    }

    /// Class names in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Label string to class index
    pub fn transform(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| RepError::UnknownLabel(label.to_string()))
    }

    /// Class index back to label string
    pub fn inverse(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let encoder = serde_json::from_reader(BufReader::new(file))?;
        Ok(encoder)
    }
}
