use crate::error::ScanError;
use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use image::{imageops, RgbImage};
use std::path::Path;

/// Side length of the square images the model was trained on.
pub const SIDE_LENGTH: u32 = 128;

/// A single preprocessed scan: `[1, side, side, 3]` in row-major HWC order, values in [0, 1].
#[derive(Debug, Clone)]
pub struct ScanBatch {
	pub pixels: Vec<f32>,
	pub side: usize,
}

impl ScanBatch {
	pub fn open<A: AsRef<Path>>(path: A) -> Result<Self, ScanError> {
		let image = image::ImageReader::open(path)?
			.with_guessed_format()?
			.decode()?
			.to_rgb8();

		Ok(Self::from_rgb(image, SIDE_LENGTH))
	}

	pub fn from_rgb(mut image: RgbImage, side: u32) -> Self {
		if image.width() != side || image.height() != side {
			// Nearest matches the loader the weights were trained with
			image = imageops::resize(&image, side, side, imageops::FilterType::Nearest);
		}

		let pixels = image.into_raw().into_iter().map(|x| (x as f32) / 255.0).collect();

		Self { pixels, side: side as usize }
	}

	pub fn shape(&self) -> [usize; 4] {
		[1, self.side, self.side, 3]
	}

	/// Converts to the `[1, 3, side, side]` layout burn's convolutions expect.
	pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
		let data = TensorData::new(self.pixels.clone(), self.shape()).convert::<B::FloatElem>();
		Tensor::<B, 4>::from_data(data, device).permute([0, 3, 1, 2])
	}
}
