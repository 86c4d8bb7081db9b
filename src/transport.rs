//! Transport primitives for API calls issued by the session client.
//!
//! The module exposes [`ApiTransport`] alongside the owned [`ApiRequest`] and
//! [`ApiResponse`] values so downstream crates can plug in custom HTTP stacks (or scripted
//! fakes in tests) without losing the pipeline's bearer handling. A transport only moves
//! bytes: it must not interpret status codes, attach credentials, or retry. Every status,
//! including 401, is returned as an [`ApiResponse`] so the pipeline can classify it.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared between
/// the pipeline, the refresh protocol, and background session checks.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and returns the raw response, whatever its status.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Owned description of an outgoing API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(url: Url) -> Self {
		Self::new(Method::PUT, url)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::DELETE, url)
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::InvalidBody)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Sets (or replaces) a header.
	pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attaches `token` as an `Authorization: Bearer` credential, replacing any previous one.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> Result<(), ConfigError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Returns `true` if an `Authorization` header is present.
	pub fn has_credential(&self) -> bool {
		self.headers.contains_key(AUTHORIZATION)
	}
}

/// Raw response returned by an [`ApiTransport`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response from its parts.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Builds a JSON response, mostly useful for scripted transports.
	pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
		let mut response = Self::new(status, body.to_string());

		response.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for the authorization failure that triggers session recovery.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Retry-After hint expressed as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn decode<T>(&self, url: &Url) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = if self.body.is_empty() { b"null".as_slice() } else { self.body.as_slice() };
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { url: url.to_string(), source })
	}

	/// Extracts a human-readable message from an error body.
	///
	/// The backend answers with `{"message": ..}`, `{"msg": ..}` (JWT middleware) or
	/// `{"error": ..}`; anything else falls back to the trimmed body text or the status
	/// reason.
	pub fn error_message(&self) -> String {
		const MESSAGE_KEYS: [&str; 3] = ["message", "msg", "error"];
		const MAX_BODY_PREVIEW: usize = 256;

		if let Ok(serde_json::Value::Object(map)) =
			serde_json::from_slice::<serde_json::Value>(&self.body)
		{
			for key in MESSAGE_KEYS {
				if let Some(serde_json::Value::String(message)) = map.get(key) {
					return message.clone();
				}
			}
		}

		let text = String::from_utf8_lossy(&self.body);
		let text = text.trim();

		if text.is_empty() {
			return self.status.canonical_reason().unwrap_or("Unknown status").to_owned();
		}

		text.chars().take(MAX_BODY_PREVIEW).collect()
	}

	/// Converts a non-recovered response into [`Error::Api`].
	pub fn into_error(self, url: &Url) -> Error {
		Error::Api {
			status: self.status.as_u16(),
			url: url.to_string(),
			message: self.error_message(),
			retry_after: self.retry_after(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with the given request timeout; the session layer itself never times
	/// out requests.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder =
				client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
