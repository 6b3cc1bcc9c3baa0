use crate::history::{History, HistoryItem};
use crate::infer::{self, Prediction};
use crate::page;
use crate::session::SessionHistory;
use crate::state::AppState;
use crate::upload::{allowed_extension, STATIC_ROUTE};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::handler::Handler;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::any::Any;
use std::path::Path;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

pub const NO_FILE: &str = "No file selected";
pub const INVALID_TYPE: &str = "Invalid file type. Please upload a valid image file.";

#[derive(Debug, Serialize)]
pub struct Failure {
	success: bool,
	error: String,
}

impl Failure {
	pub fn new<S: Into<String>>(error: S) -> Self {
		Self { success: false, error: error.into() }
	}
}

impl IntoResponse for Failure {
	fn into_response(self) -> Response {
		Json(self).into_response()
	}
}

#[derive(Debug, Serialize)]
struct Ack {
	success: bool,
}

#[derive(Debug, Serialize)]
struct Scanned {
	success: bool,
	#[serde(flatten)]
	prediction: Prediction,
	filepath: String,
}

pub fn router<P: AsRef<Path>>(state: AppState, static_dir: P, max_upload_bytes: usize) -> Router {
	// Missing static files get the same index-at-404 page as unknown routes.
	let assets = ServeDir::new(static_dir.as_ref()).not_found_service(not_found.with_state(state.clone()));

	Router::new()
		.route("/", get(index))
		.route("/upload", post(upload))
		.route("/reset", post(reset))
		.route("/clear_history", post(clear_history))
		.nest_service(STATIC_ROUTE, assets)
		.fallback(not_found)
		.layer(DefaultBodyLimit::max(max_upload_bytes))
		.layer(CatchPanicLayer::custom(internal_error))
		.with_state(state)
}

async fn index(SessionHistory(history): SessionHistory) -> Html<String> {
	Html(page::index(&history))
}

async fn not_found(SessionHistory(history): SessionHistory) -> (StatusCode, Html<String>) {
	(StatusCode::NOT_FOUND, Html(page::index(&history)))
}

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
	let detail = panic
		.downcast_ref::<String>()
		.map(String::as_str)
		.or_else(|| panic.downcast_ref::<&str>().copied())
		.unwrap_or("unknown panic");
	error!("Request handler panicked: {}", detail);

	(StatusCode::INTERNAL_SERVER_ERROR, Failure::new("Internal server error")).into_response()
}

async fn reset() -> Json<Ack> {
	Json(Ack { success: true })
}

async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
	let cookie = state.session.cookie(&History::default());
	([(SET_COOKIE, cookie)], Json(Ack { success: true }))
}

/// A validated `file` field, read fully into memory.
struct Incoming {
	filename: String,
	ext: String,
	bytes: Bytes,
}

async fn read_file_field(multipart: Result<Multipart, MultipartRejection>) -> Result<Incoming, Failure> {
	let mut multipart = multipart.map_err(|_| Failure::new(NO_FILE))?;

	loop {
		let field = match multipart.next_field().await {
			Ok(Some(field)) => field,
			Ok(None) => return Err(Failure::new(NO_FILE)),
			Err(err) => return Err(Failure::new(format!("Upload failed: {err}"))),
		};

		if field.name() != Some("file") {
			continue;
		}

		let filename = field.file_name().unwrap_or_default().to_string();
		if filename.is_empty() {
			return Err(Failure::new(NO_FILE));
		}

		let ext = allowed_extension(&filename).ok_or_else(|| Failure::new(INVALID_TYPE))?;

		let bytes = field
			.bytes()
			.await
			.map_err(|err| Failure::new(format!("Upload failed: {err}")))?;

		return Ok(Incoming { filename, ext, bytes });
	}
}

async fn upload(
	State(state): State<AppState>,
	SessionHistory(mut history): SessionHistory,
	multipart: Result<Multipart, MultipartRejection>,
) -> Response {
	let incoming = match read_file_field(multipart).await {
		Ok(incoming) => incoming,
		Err(failure) => return failure.into_response(),
	};

	let stored = state.uploads.reserve(&incoming.ext);
	if let Err(err) = state.uploads.write(&stored, &incoming.bytes).await {
		error!("Failed to store {}: {}", incoming.filename, err);
		return Failure::new(format!("Upload failed: {err}")).into_response();
	}

	let classifier = state.classifier.clone();
	let labels = state.labels.clone();
	let path = stored.path.clone();
	let outcome = tokio::task::spawn_blocking(move || infer::predict_file(&path, classifier.as_ref(), &labels)).await;

	match outcome {
		Ok(Ok(prediction)) => {
			info!(
				"{} stored as {}: {} ({:.2}%)",
				incoming.filename, stored.name, prediction.predicted_class, prediction.confidence
			);

			history.push(HistoryItem::new(&incoming.filename, &stored.name, &prediction));
			debug!("Session history holds {} scans", history.len());
			let cookie = state.session.cookie(&history);

			let body = Scanned { success: true, prediction, filepath: stored.url() };
			([(SET_COOKIE, cookie)], Json(body)).into_response()
		}
		Ok(Err(err)) => {
			warn!("Prediction failed for {}: {}", incoming.filename, err);
			stored.remove().await;
			Failure::new(format!("Prediction failed: {err}")).into_response()
		}
		Err(err) => {
			error!("Prediction worker for {} died: {}", incoming.filename, err);
			stored.remove().await;
			Failure::new(format!("Upload failed: {err}")).into_response()
		}
	}
}
