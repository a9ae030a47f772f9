use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LabelError;

/// Label order the bundled dataset produces when its class folders are sorted.
pub const CLASS_LABELS: [&str; 4] = ["glioma", "meningioma", "no_tumor", "pituitary"];

pub const FALLBACK_DESCRIPTION: &str = "No details available.";

/// Human readable explanation shown next to a prediction.
pub fn description(label: &str) -> &'static str {
    match label {
        "glioma" => "Gliomas are tumors that originate in the glial cells of the brain.",
        "meningioma" => {
            "Meningiomas arise from the protective membranes (meninges) surrounding the brain."
        }
        "no_tumor" => "No brain tumor detected in the uploaded scan.",
        "pituitary" => {
            "Pituitary tumors develop in the pituitary gland, which controls hormone production."
        }
        _ => FALLBACK_DESCRIPTION,
    }
}

/// Ordered index -> label table.
///
/// The trainer writes it into the artifact and the classifier reads it back, so
/// output index `i` of the network always means `labels[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassLabelSet {
    labels: Vec<String>,
}

impl ClassLabelSet {
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }
        for (index, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(LabelError::Blank(index));
            }
            if labels[..index].contains(label) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }
        Ok(Self { labels })
    }

    /// The four tumor categories in their canonical order.
    pub fn canonical() -> Self {
        Self {
            labels: CLASS_LABELS.iter().map(|label| label.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn is_canonical(&self) -> bool {
        self.iter().eq(CLASS_LABELS.iter().copied())
    }
}

impl TryFrom<Vec<String>> for ClassLabelSet {
    type Error = LabelError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<ClassLabelSet> for Vec<String> {
    fn from(set: ClassLabelSet) -> Self {
        set.labels
    }
}

impl fmt::Display for ClassLabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(", "))
    }
}
