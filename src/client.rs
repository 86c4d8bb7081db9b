//! Session-aware API client: the request pipeline and the refresh coordination around it.
//!
//! [`SessionClient`] is instantiated once per application and shared behind an [`Arc`].
//! Every resource call goes through [`SessionClient::send`], which attaches the stored
//! access token, forgives earlier refresh attempts on success, and recovers from a 401 by
//! joining (or leading) a single coordinated refresh before replaying the request.

pub mod coordinator;

mod metrics;
mod refresh;

pub use coordinator::{RefreshCoordinator, RefreshState};
pub use metrics::RefreshMetrics;

// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	client::coordinator::RefreshTicket,
	config::ClientConfig,
	error::SessionError,
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::TokenStore,
	transport::{ApiRequest, ApiResponse, ApiTransport},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

/// Owns the transport, token store and refresh state shared by every API call.
pub struct SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Token store read before each request and written by login, logout and refresh.
	pub store: Arc<dyn TokenStore>,
	/// Endpoint layout and refresh policy.
	pub config: ClientConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	coordinator: RefreshCoordinator,
}
impl<T> SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let coordinator = RefreshCoordinator::new(config.refresh_ceiling);

		Self {
			transport: transport.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			coordinator,
		}
	}

	/// Current refresh phase.
	pub fn refresh_state(&self) -> RefreshState {
		self.coordinator.state()
	}

	/// Refresh attempts since the last successful response.
	pub fn refresh_attempts(&self) -> u32 {
		self.coordinator.attempts()
	}

	/// Builds a request for a path relative to the configured base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		Ok(ApiRequest::new(method, self.config.resolve(path)?))
	}

	/// Sends a request through the pipeline.
	///
	/// Returns the 2xx response, or [`Error::Api`] for any other status that was not
	/// recovered. A 401 triggers one coordinated refresh and a replay with the new token;
	/// if the refresh fails the caller receives the [`SessionError`] instead of the 401.
	/// Network errors and other statuses are never retried.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "send");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		let is_refresh_exchange = self.config.is_refresh_endpoint(&request.url);
		let mut replay_token = None;
		let mut caught_up = false;

		loop {
			let mut outgoing = request.clone();
			let token = match replay_token.take() {
				Some(token) => Some(token),
				None => self.store.get(TokenKind::Access).await?,
			};

			if let Some(token) = &token {
				outgoing.set_bearer(token)?;
			}

			tracing::debug!(
				method = %outgoing.method,
				url = %outgoing.url,
				authenticated = token.is_some(),
				"Dispatching request."
			);

			let response = self.transport.send(outgoing).await?;

			if response.is_success() {
				self.coordinator.record_success();

				return Ok(response);
			}
			if !response.is_unauthorized() || is_refresh_exchange {
				return Err(response.into_error(&request.url));
			}

			// A refresh that settled while this request was in flight already stored a newer
			// token; replay with it once instead of starting another cycle.
			let newer = match &token {
				Some(sent) if !caught_up =>
					self.store.get(TokenKind::Access).await?.filter(|current| current != sent),
				_ => None,
			};

			if let Some(newer) = newer {
				tracing::debug!(url = %request.url, "Replaying with the token stored since dispatch.");

				caught_up = true;
				replay_token = Some(newer);

				continue;
			}

			tracing::debug!(url = %request.url, "Request was unauthorized; recovering the session.");

			replay_token = Some(self.refresh().await?);
		}
	}

	/// Obtains a fresh access token through the coordinator.
	///
	/// Joins the in-flight refresh if there is one, otherwise runs the refresh protocol as
	/// leader. On failure both tokens are cleared before queued requests are released, and
	/// once the attempt ceiling is reached no refresh runs at all. A refresh superseded by a
	/// new login clears nothing.
	pub async fn refresh(&self) -> Result<TokenSecret, SessionError> {
		match self.coordinator.acquire() {
			RefreshTicket::Queued(waiter) => {
				self.refresh_metrics.record_queued();
				tracing::debug!("Refresh already in flight; waiting for its outcome.");

				waiter.await.unwrap_or(Err(SessionError::RefreshAbandoned))
			},
			RefreshTicket::Exhausted { ceiling } => {
				self.refresh_metrics.record_ceiling_hit();
				tracing::warn!(ceiling, "Refresh attempts exhausted; ending the session.");
				self.clear_tokens().await;

				Err(SessionError::RefreshCeilingExceeded { ceiling })
			},
			RefreshTicket::Leader(lease) => {
				let outcome = self.run_refresh_protocol().await;

				// A superseded refresh must leave the newer pair in place.
				if matches!(&outcome, Err(e) if *e != SessionError::RefreshSuperseded) {
					self.clear_tokens().await;
				}

				let released = lease.settle(&outcome);

				tracing::debug!(released, success = outcome.is_ok(), "Refresh cycle settled.");

				outcome
			},
		}
	}

	/// Returns `true` if both halves of the credential pair are stored.
	pub async fn has_tokens(&self) -> Result<bool> {
		let access = self.store.get(TokenKind::Access).await?;
		let refresh = self.store.get(TokenKind::Refresh).await?;

		Ok(access.is_some() && refresh.is_some())
	}

	/// Returns `true` if either token is stored.
	pub async fn has_any_token(&self) -> Result<bool> {
		Ok(self.store.get(TokenKind::Access).await?.is_some()
			|| self.store.get(TokenKind::Refresh).await?.is_some())
	}

	/// Removes both tokens. Store failures are logged, never returned.
	pub async fn clear_tokens(&self) {
		if let Err(e) = self.store.clear().await {
			tracing::warn!(error = %e, "Failed to clear session tokens.");
		}
	}

	/// Sends a `GET` and decodes the JSON response.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute_json(self.request(Method::GET, path)?).await
	}

	/// Sends a `POST` with a JSON body and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute_json(self.request(Method::POST, path)?.with_json(body)?).await
	}

	/// Sends a `PUT` with a JSON body and decodes the JSON response.
	pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute_json(self.request(Method::PUT, path)?.with_json(body)?).await
	}

	/// Sends a `DELETE` and decodes the JSON response.
	pub async fn delete_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute_json(self.request(Method::DELETE, path)?).await
	}

	pub(crate) fn forgive_refresh_attempts(&self) {
		self.coordinator.record_success();
	}

	pub(crate) async fn execute_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let url = request.url.clone();

		self.send(request).await?.decode(&url)
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestTransport> {
	/// Creates a client that provisions its own reqwest-backed transport.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_state", &self.coordinator.state())
			.field("refresh_attempts", &self.coordinator.attempts())
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::{_preludet::*, auth::CredentialPair};

	#[tokio::test]
	async fn unauthenticated_failure_without_refresh_token_stays_local() {
		let server = MockServer::start_async().await;
		let probe = server
			.mock_async(|when, then| {
				when.method(GET).path("/api/protected");
				then.status(401).json_body(serde_json::json!({ "msg": "Missing Authorization Header" }));
			})
			.await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/api/refresh");
				then.status(200).json_body(serde_json::json!({ "access_token": "unused" }));
			})
			.await;
		let (client, _store) = build_reqwest_test_client(test_config(&server.base_url()));
		let request = client.request(http::Method::GET, "/protected").expect("Path should resolve.");
		let err = client.send(request).await.expect_err("Nothing can recover this request.");

		assert!(matches!(err, Error::Session(SessionError::NoRefreshToken)));
		assert_eq!(client.refresh_attempts(), 1);
		probe.assert_calls_async(1).await;
		refresh.assert_calls_async(0).await;
	}

	#[tokio::test]
	async fn debug_output_omits_tokens() {
		let (client, store) = build_reqwest_test_client(test_config("http://127.0.0.1:9"));

		store.set(CredentialPair::new("access-1", "refresh-1")).await.expect("Seeding should succeed.");

		let rendered = format!("{client:?}");

		assert!(rendered.contains("http://127.0.0.1:9/api/"));
		assert!(rendered.contains("Idle"));
		assert!(!rendered.contains("access-1"));
		assert!(client.has_tokens().await.expect("Store read should succeed."));
	}
}
