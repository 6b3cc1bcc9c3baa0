use crate::data::ScanBatch;
use crate::error::ScanError;
use crate::labels::LabelMap;
use crate::model::Classifier;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
	Healthy,
	Tumor,
}

/// Per-class percentages, serialized as a JSON object in label order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities(pub Vec<(String, f64)>);

impl Serialize for ClassProbabilities {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.0.len()))?;
		for (label, percent) in &self.0 {
			map.serialize_entry(label, percent)?;
		}
		map.end()
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
	pub result: String,
	pub result_type: ResultType,
	pub predicted_class: String,
	pub confidence: f64,
	pub class_probabilities: ClassProbabilities,
}

/// Decodes the image at `path` and classifies it.
pub fn predict_file<P: AsRef<Path>>(path: P, classifier: &dyn Classifier, labels: &LabelMap) -> Result<Prediction, ScanError> {
	let batch = ScanBatch::open(path)?;
	predict(&batch, classifier, labels)
}

pub fn predict(batch: &ScanBatch, classifier: &dyn Classifier, labels: &LabelMap) -> Result<Prediction, ScanError> {
	let scores = classifier.scores(batch)?;

	if scores.len() != labels.len() {
		return Err(ScanError::ScoreCount { got: scores.len(), expected: labels.len() });
	}
	if scores.iter().any(|score| !score.is_finite()) {
		return Err(ScanError::Inference("model produced a non-finite score".to_string()));
	}

	// first maximum wins on ties
	let (index, score) = scores
		.iter()
		.copied()
		.enumerate()
		.fold((0, f32::NEG_INFINITY), |best, (i, s)| if s > best.1 { (i, s) } else { best });

	let predicted_class = labels
		.get(index)
		.ok_or(ScanError::ScoreCount { got: scores.len(), expected: labels.len() })?
		.to_string();

	let class_probabilities = ClassProbabilities(
		labels.iter().zip(&scores).map(|(label, score)| (label.to_string(), percent(*score))).collect(),
	);

	let (result, result_type) = if LabelMap::is_no_finding(&predicted_class) {
		("No Tumor".to_string(), ResultType::Healthy)
	} else {
		(format!("Tumor Detected: {}", title_case(&predicted_class)), ResultType::Tumor)
	};

	Ok(Prediction {
		result,
		result_type,
		predicted_class,
		confidence: percent(score),
		class_probabilities,
	})
}

fn percent(score: f32) -> f64 {
	(score as f64 * 100.0).clamp(0.0, 100.0)
}

fn title_case(label: &str) -> String {
	label
		.split(|c: char| c == '_' || c == ' ')
		.filter(|word| !word.is_empty())
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<String>>()
		.join(" ")
}
