use crate::error::LabelError;
use std::path::Path;

/// Class names, where line N of the source names class N.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Blank lines stay in the table as empty labels so later lines keep
    /// their index.
    pub fn from_content(content: &str) -> Result<Self, LabelError> {
        if content.trim().is_empty() {
            return Err(LabelError::Empty);
        }
        let labels = content.lines().map(|line| line.trim().to_string()).collect();
        Ok(Self { labels })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_content(&content)?;
        log::info!("loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    /// Label for `index`, or `""` past the end of the table.
    pub fn get(&self, index: usize) -> &str {
        self.labels.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<String> for LabelTable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
