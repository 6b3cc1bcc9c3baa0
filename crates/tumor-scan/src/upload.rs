use log::warn;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// URL prefix the static directory is served under.
pub const STATIC_ROUTE: &str = "/static";

/// Lowercased extension of `filename` if it is an accepted image type.
pub fn allowed_extension(filename: &str) -> Option<String> {
	let (_, ext) = filename.rsplit_once('.')?;
	let ext = ext.to_ascii_lowercase();
	ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// A scan written to the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
	pub name: String,
	pub path: PathBuf,
}

impl StoredUpload {
	pub fn url(&self) -> String {
		format!("{STATIC_ROUTE}/uploads/{}", self.name)
	}

	/// Best-effort removal, failures are only logged.
	pub async fn remove(&self) {
		match tokio::fs::remove_file(&self.path).await {
			Ok(()) => {}
			Err(err) if err.kind() == io::ErrorKind::NotFound => {}
			Err(err) => warn!("Failed to remove {}: {}", self.path.display(), err),
		}
	}
}

#[derive(Debug, Clone)]
pub struct UploadStore {
	dir: PathBuf,
}

impl UploadStore {
	pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
		let dir = dir.as_ref().to_path_buf();
		std::fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Picks a fresh `<uuid>.<ext>` name inside the uploads directory.
	pub fn reserve(&self, ext: &str) -> StoredUpload {
		let name = format!("{}.{}", Uuid::new_v4(), ext);
		let path = self.dir.join(&name);
		StoredUpload { name, path }
	}

	/// Writes `bytes` to `upload`, removing any partial file if the write fails.
	pub async fn write(&self, upload: &StoredUpload, bytes: &[u8]) -> io::Result<()> {
		if let Err(err) = tokio::fs::write(&upload.path, bytes).await {
			upload.remove().await;
			return Err(err);
		}
		Ok(())
	}
}
