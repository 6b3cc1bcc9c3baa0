use crate::labels::LabelMap;
use crate::model::Classifier;
use crate::session::SessionKey;
use crate::upload::UploadStore;
use std::sync::Arc;

/// Shared, read-only handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
	pub classifier: Arc<dyn Classifier>,
	pub labels: Arc<LabelMap>,
	pub uploads: UploadStore,
	pub session: SessionKey,
}

impl AppState {
	pub fn new(classifier: Arc<dyn Classifier>, labels: LabelMap, uploads: UploadStore, session: SessionKey) -> Self {
		Self {
			classifier,
			labels: Arc::new(labels),
			uploads,
			session,
		}
	}
}
