use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Invalid value for {0}")]
	InvalidValue(&'static str),
}

/// Failures while bringing up the classifier. All of these abort startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
	#[error("Model file not found at {0}")]
	Missing(PathBuf),
	#[error("Model file {path} could not be read: {reason}")]
	Malformed { path: PathBuf, reason: String },
	#[error("Model config {path} could not be read: {reason}")]
	Config { path: PathBuf, reason: String },
	#[error("Model has {model} outputs but {labels} labels are configured")]
	LabelMismatch { model: usize, labels: usize },
}

#[derive(Debug, Error)]
pub enum ScanError {
	#[error("{0}")]
	Image(#[from] image::ImageError),
	#[error("{0}")]
	Inference(String),
	#[error("model returned {got} scores for {expected} labels")]
	ScoreCount { got: usize, expected: usize },
	#[error("{0}")]
	Io(#[from] std::io::Error),
}
