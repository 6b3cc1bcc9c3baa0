use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const FALLBACK_LABELS: [&str; 4] = ["glioma", "meningioma", "notumor", "pituitary"];

/// Label meaning no tumor was found in the scan.
pub const NO_FINDING_LABEL: &str = "notumor";

/// Ordered class names, index-aligned with the model output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
	labels: Vec<String>,
}

impl LabelMap {
	pub fn fallback() -> Self {
		Self {
			labels: FALLBACK_LABELS.iter().map(|label| label.to_string()).collect(),
		}
	}

	/// Reads a JSON array of label names, falling back to [`FALLBACK_LABELS`] on any failure.
	pub fn load<P: AsRef<Path>>(path: P) -> Self {
		let path = path.as_ref();
		match Self::read(path) {
			Ok(map) => {
				info!("Loaded {} labels from {}", map.len(), path.display());
				map
			}
			Err(reason) => {
				warn!("Using built-in labels, {} unusable: {}", path.display(), reason);
				Self::fallback()
			}
		}
	}

	fn read(path: &Path) -> Result<Self, String> {
		let raw = fs::read_to_string(path).map_err(|err| err.to_string())?;
		let labels: Vec<String> = serde_json::from_str(&raw).map_err(|err| err.to_string())?;

		if labels.is_empty() {
			return Err("label list is empty".to_string());
		}

		let mut seen = HashSet::with_capacity(labels.len());
		if let Some(dup) = labels.iter().find(|label| !seen.insert(label.as_str())) {
			return Err(format!("duplicate label {dup:?}"));
		}

		Ok(Self { labels })
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn get(&self, index: usize) -> Option<&str> {
		self.labels.get(index).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(String::as_str)
	}

	pub fn is_no_finding(label: &str) -> bool {
		label == NO_FINDING_LABEL
	}
}
