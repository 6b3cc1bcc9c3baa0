use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SECRET_KEY: &str = "dev-key-change-in-production";

#[derive(Clone, Debug)]
pub struct Config {
	pub secret_key: String,
	pub host: String,
	pub port: u16,
	pub model_path: PathBuf,
	pub model_config: PathBuf,
	pub labels_path: PathBuf,
	pub static_dir: PathBuf,
	pub max_upload_bytes: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			secret_key: DEFAULT_SECRET_KEY.to_string(),
			host: "0.0.0.0".to_string(),
			port: 5000,
			model_path: PathBuf::from("model/tumor_net.mpk"),
			model_config: PathBuf::from("model/config.json"),
			labels_path: PathBuf::from("model/labels.json"),
			static_dir: PathBuf::from("static"),
			max_upload_bytes: 10 * 1024 * 1024,
		}
	}
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
		let defaults = Self::default();

		Ok(Self {
			secret_key: lookup("SECRET_KEY").unwrap_or(defaults.secret_key),
			host: lookup("HOST").unwrap_or(defaults.host),
			port: match lookup("PORT") {
				Some(port) => port.parse().map_err(|_| ConfigError::InvalidValue("PORT"))?,
				None => defaults.port,
			},
			model_path: lookup("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
			model_config: lookup("MODEL_CONFIG").map(PathBuf::from).unwrap_or(defaults.model_config),
			labels_path: lookup("LABELS_PATH").map(PathBuf::from).unwrap_or(defaults.labels_path),
			static_dir: lookup("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
			max_upload_bytes: match lookup("MAX_UPLOAD_BYTES") {
				Some(bytes) => bytes.parse().map_err(|_| ConfigError::InvalidValue("MAX_UPLOAD_BYTES"))?,
				None => defaults.max_upload_bytes,
			},
		})
	}

	pub fn uploads_dir(&self) -> PathBuf {
		self.static_dir.join("uploads")
	}

	pub fn uses_default_secret(&self) -> bool {
		self.secret_key == DEFAULT_SECRET_KEY
	}
}
