use crate::data::ScanBatch;
use crate::error::{ModelLoadError, ScanError};
use crate::labels::LabelMap;
use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Tensor};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::softmax;
use log::info;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

#[cfg(not(feature = "tch"))]
pub type InferenceBackend = burn::backend::NdArray;
#[cfg(feature = "tch")]
pub type InferenceBackend = burn_tch::LibTorch;

pub type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Module)]
pub struct TumorNet<B: Backend> {
	activation: Relu,
	dropout: Dropout,
	pool: MaxPool2d,
	conv1: Conv2d<B>,
	conv2: Conv2d<B>,
	conv3: Conv2d<B>,
	fc1: Linear<B>,
	fc2: Linear<B>,
}

impl <B: Backend> TumorNet<B> {
	/// Class scores for a `[batch, 3, side, side]` input, softmax-normalized per row.
	pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
		let x = self.conv1.forward(images);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv2.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv3.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = x.flatten(1, 3);

		let x = self.fc1.forward(x);
		let x = self.activation.forward(x);
		let x = self.dropout.forward(x);

		softmax(self.fc2.forward(x), 1)
	}
}

#[derive(Debug, Config)]
pub struct TumorNetConfig {
	#[config(default = 4)]
	pub num_classes: usize,
	#[config(default = 128)]
	pub side_length: usize,
	#[config(default = 0.5)]
	pub dropout: f64,
	#[config(default = 128)]
	pub hidden_size: usize,
}

impl TumorNetConfig {
	pub fn init<B: Backend>(&self, device: &B::Device) -> TumorNet<B> {
		let conv1 = Conv2dConfig::new([3, 32], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let conv2 = Conv2dConfig::new([32, 64], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let conv3 = Conv2dConfig::new([64, 128], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

		// three 2x2 pools
		let pooled = self.side_length / 8;
		let fc1 = LinearConfig::new(128 * pooled * pooled, self.hidden_size).init(device);
		let fc2 = LinearConfig::new(self.hidden_size, self.num_classes).init(device);

		TumorNet {
			activation: Relu::new(),
			dropout: DropoutConfig::new(self.dropout).init(),
			pool,
			conv1,
			conv2,
			conv3,
			fc1,
			fc2,
		}
	}
}

/// Anything that can turn a preprocessed scan into one score per label.
pub trait Classifier: Send + Sync {
	fn scores(&self, batch: &ScanBatch) -> Result<Vec<f32>, ScanError>;
}

pub struct BurnClassifier<B: Backend> {
	model: Mutex<TumorNet<B>>,
	device: B::Device,
}

impl <B: Backend> BurnClassifier<B> {
	pub fn new(model: TumorNet<B>, device: B::Device) -> Self {
		Self { model: Mutex::new(model), device }
	}

	/// Loads trained weights, failing if they don't line up with `labels`.
	pub fn load<P: AsRef<Path>, C: AsRef<Path>>(
		model_path: P,
		config_path: C,
		labels: &LabelMap,
		device: B::Device,
	) -> Result<Self, ModelLoadError> {
		let model_path = model_path.as_ref();
		let config_path = config_path.as_ref();

		if !model_path.is_file() {
			return Err(ModelLoadError::Missing(model_path.to_path_buf()));
		}

		let config = if config_path.is_file() {
			TumorNetConfig::load(config_path).map_err(|err| ModelLoadError::Config {
				path: config_path.to_path_buf(),
				reason: format!("{err:?}"),
			})?
		} else {
			TumorNetConfig::new().with_num_classes(labels.len())
		};

		if config.num_classes != labels.len() {
			return Err(ModelLoadError::LabelMismatch { model: config.num_classes, labels: labels.len() });
		}

		let model = config
			.init::<B>(&device)
			.load_file(model_path, &ModelRecorder::new(), &device)
			.map_err(|err| ModelLoadError::Malformed {
				path: model_path.to_path_buf(),
				reason: format!("{err:?}"),
			})?;

		info!("Model loaded from {} ({} classes)", model_path.display(), config.num_classes);

		Ok(Self::new(model, device))
	}
}

impl <B: Backend> Classifier for BurnClassifier<B> {
	fn scores(&self, batch: &ScanBatch) -> Result<Vec<f32>, ScanError> {
		let input = batch.to_tensor::<B>(&self.device);

		// the weights are never mutated, a poisoned lock is still usable
		let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
		let output = panic::catch_unwind(AssertUnwindSafe(|| model.forward(input)))
			.map_err(|_| ScanError::Inference("forward pass panicked".to_string()))?;
		drop(model);

		output
			.into_data()
			.convert::<f32>()
			.to_vec::<f32>()
			.map_err(|err| ScanError::Inference(format!("{err:?}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::SIDE_LENGTH;
	use burn::backend::NdArray;
	use image::{Rgb, RgbImage};

	fn save_untrained(dir: &Path, classes: usize) -> std::path::PathBuf {
		let device = Default::default();
		let path = dir.join("tumor_net.mpk");
		TumorNetConfig::new()
			.with_num_classes(classes)
			.init::<NdArray>(&device)
			.save_file(&path, &ModelRecorder::new())
			.unwrap();
		path
	}

	#[test]
	fn loaded_model_emits_a_distribution_per_label() {
		let dir = tempfile::tempdir().unwrap();
		let path = save_untrained(dir.path(), 4);

		let classifier = BurnClassifier::<NdArray>::load(
			&path,
			dir.path().join("config.json"),
			&LabelMap::fallback(),
			Default::default(),
		)
		.unwrap();

		let batch = ScanBatch::from_rgb(RgbImage::from_pixel(32, 32, Rgb([90, 90, 90])), SIDE_LENGTH);
		let scores = classifier.scores(&batch).unwrap();

		assert_eq!(scores.len(), 4);
		assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-4);
	}

	#[test]
	fn missing_weights_are_fatal() {
		let dir = tempfile::tempdir().unwrap();
		let result = BurnClassifier::<NdArray>::load(
			dir.path().join("nope.mpk"),
			dir.path().join("config.json"),
			&LabelMap::fallback(),
			Default::default(),
		);

		assert!(matches!(result, Err(ModelLoadError::Missing(_))));
	}

	#[test]
	fn corrupt_weights_are_fatal() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tumor_net.mpk");
		std::fs::write(&path, b"garbage").unwrap();

		let result = BurnClassifier::<NdArray>::load(
			&path,
			dir.path().join("config.json"),
			&LabelMap::fallback(),
			Default::default(),
		);

		assert!(matches!(result, Err(ModelLoadError::Malformed { .. })));
	}

	#[test]
	fn config_must_agree_with_labels() {
		let dir = tempfile::tempdir().unwrap();
		let path = save_untrained(dir.path(), 3);
		let config_path = dir.path().join("config.json");
		TumorNetConfig::new().with_num_classes(3).save(&config_path).unwrap();

		let result = BurnClassifier::<NdArray>::load(&path, &config_path, &LabelMap::fallback(), Default::default());

		assert!(matches!(result, Err(ModelLoadError::LabelMismatch { model: 3, labels: 4 })));
	}
}
