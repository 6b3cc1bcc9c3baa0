//! Client-side session: the history travels in an HMAC-signed cookie.

use crate::history::{History, HistoryItem};
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use log::{debug, warn};
use sha2::Sha256;
use std::convert::Infallible;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "session";

// browsers drop larger cookies
const MAX_COOKIE_BYTES: usize = 4093;

#[derive(Clone)]
pub struct SessionKey {
	secret: Vec<u8>,
}

impl SessionKey {
	pub fn new(secret: &str) -> Self {
		Self { secret: secret.as_bytes().to_vec() }
	}

	fn mac(&self) -> HmacSha256 {
		HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
	}

	/// Encodes `history` as `payload.signature`, both base64url.
	pub fn seal(&self, history: &History) -> String {
		let json = serde_json::to_vec(history).unwrap_or_else(|_| b"[]".to_vec());
		let payload = URL_SAFE_NO_PAD.encode(json);

		let mut mac = self.mac();
		mac.update(payload.as_bytes());
		let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

		format!("{payload}.{signature}")
	}

	/// Returns `None` when the value was not produced by [`SessionKey::seal`] with this key.
	pub fn open(&self, value: &str) -> Option<History> {
		let (payload, signature) = value.split_once('.')?;
		let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

		let mut mac = self.mac();
		mac.update(payload.as_bytes());
		mac.verify_slice(&signature).ok()?;

		let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
		let items: Vec<HistoryItem> = serde_json::from_slice(&json).ok()?;
		Some(History::from(items))
	}

	/// `Set-Cookie` value persisting `history`.
	pub fn cookie(&self, history: &History) -> String {
		let value = self.seal(history);
		if value.len() > MAX_COOKIE_BYTES {
			warn!("Session cookie is {} bytes, browsers may drop it", value.len());
		}
		format!("{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax")
	}
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|header| header.to_str().ok())
		.flat_map(|header| header.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(key, _)| *key == name)
		.map(|(_, value)| value)
}

/// History carried by the request's session cookie, empty when absent or tampered with.
pub struct SessionHistory(pub History);

impl FromRequestParts<AppState> for SessionHistory {
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let history = match cookie_value(&parts.headers, COOKIE_NAME) {
			Some(value) => state.session.open(value).unwrap_or_else(|| {
				debug!("Ignoring session cookie with bad signature");
				History::default()
			}),
			None => History::default(),
		};

		Ok(Self(history))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::infer::ResultType;
	use axum::http::HeaderValue;

	fn history() -> History {
		let mut history = History::default();
		history.push(HistoryItem {
			filename: "brain1.png".to_string(),
			filepath: "0b9d.png".to_string(),
			timestamp: "2026-10-17 10:00:00".to_string(),
			result: "No Tumor".to_string(),
			result_type: ResultType::Healthy,
			confidence: 93.25,
		});
		history
	}

	#[test]
	fn sealed_history_opens_with_same_key() {
		let key = SessionKey::new("secret");
		let sealed = key.seal(&history());

		assert_eq!(key.open(&sealed), Some(history()));
	}

	#[test]
	fn other_keys_and_edits_are_rejected() {
		let key = SessionKey::new("secret");
		let sealed = key.seal(&history());

		assert_eq!(SessionKey::new("other").open(&sealed), None);

		let (payload, signature) = sealed.split_once('.').unwrap();
		let forged = URL_SAFE_NO_PAD.encode(b"[]");
		assert_eq!(key.open(&format!("{forged}.{signature}")), None);
		assert_eq!(key.open(payload), None);
		assert_eq!(key.open(""), None);
	}

	#[test]
	fn finds_cookie_among_others() {
		let mut headers = HeaderMap::new();
		headers.append(COOKIE, HeaderValue::from_static("theme=dark; session=abc.def"));
		headers.append(COOKIE, HeaderValue::from_static("other=1"));

		assert_eq!(cookie_value(&headers, COOKIE_NAME), Some("abc.def"));
		assert_eq!(cookie_value(&headers, "missing"), None);
	}

	#[test]
	fn cookie_carries_attributes() {
		let cookie = SessionKey::new("k").cookie(&History::default());
		assert!(cookie.starts_with("session="));
		assert!(cookie.ends_with("; Path=/; HttpOnly; SameSite=Lax"));
	}
}
