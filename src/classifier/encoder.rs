//! Label encoder: class names sorted and mapped to their rank

use crate::error::AssistantError;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map_err(|_| AssistantError::ClassifierError(format!("Unseen label '{}'", label)))
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                AssistantError::ClassifierError(format!(
                    "Class index {} out of range ({} classes)",
                    index,
                    self.classes.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["small_talk", "get_stat", "get_chart", "get_stat"]);
        assert_eq!(encoder.classes(), ["get_chart", "get_stat", "small_talk"]);
    }

    #[test]
    fn test_transform_and_inverse() {
        let encoder = LabelEncoder::fit(["small_talk", "get_stat", "get_chart"]);
        assert_eq!(encoder.transform("get_stat").unwrap(), 1);
        assert_eq!(encoder.inverse_transform(2).unwrap(), "small_talk");

        assert!(encoder.transform("weather").is_err());
        assert!(encoder.inverse_transform(3).is_err());
    }
}
