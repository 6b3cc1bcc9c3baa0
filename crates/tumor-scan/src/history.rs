use crate::infer::{Prediction, ResultType};
use serde::{Deserialize, Serialize};

pub const MAX_HISTORY_ITEMS: usize = 10;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
	/// Name the client uploaded the scan under.
	pub filename: String,
	/// Unique name the scan is stored under.
	pub filepath: String,
	pub timestamp: String,
	pub result: String,
	pub result_type: ResultType,
	pub confidence: f64,
}

impl HistoryItem {
	pub fn new(filename: &str, stored_name: &str, prediction: &Prediction) -> Self {
		Self {
			filename: filename.to_string(),
			filepath: stored_name.to_string(),
			timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
			result: prediction.result.clone(),
			result_type: prediction.result_type,
			confidence: prediction.confidence,
		}
	}
}

/// Past predictions of one session, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
	items: Vec<HistoryItem>,
}

impl History {
	pub fn push(&mut self, item: HistoryItem) {
		self.items.insert(0, item);
		self.items.truncate(MAX_HISTORY_ITEMS);
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	pub fn items(&self) -> &[HistoryItem] {
		&self.items
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

impl From<Vec<HistoryItem>> for History {
	fn from(mut items: Vec<HistoryItem>) -> Self {
		items.truncate(MAX_HISTORY_ITEMS);
		Self { items }
	}
}
