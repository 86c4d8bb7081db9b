//! Refresh protocol and credential exchange.
//!
//! Both calls go straight to the transport. Routing them through the pipeline would let
//! a 401 from the refresh endpoint trigger another refresh, and would turn a rejected
//! password into a refresh attempt.

// crates.io
use http::{HeaderValue, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, LoginCredentials, TokenKind, TokenSecret},
	client::SessionClient,
	error::SessionError,
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::CompareAndSwapOutcome,
	transport::{ApiRequest, ApiTransport},
};

#[derive(Deserialize)]
struct RefreshGrant {
	// Any `refresh_token` in the body is ignored; refresh tokens are not rotated.
	#[serde(default)]
	access_token: Option<TokenSecret>,
}

impl<T> SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Exchanges username/password for a fresh credential pair.
	///
	/// The tokens are returned, not stored; [`Session::sign_in`](crate::session::Session::sign_in)
	/// stores them. A 401 from the login endpoint becomes [`Error::InvalidCredentials`].
	pub async fn exchange_credentials(&self, credentials: &LoginCredentials) -> Result<CredentialPair> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "exchange_credentials");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result: Result<CredentialPair> = span
			.instrument(async move {
				let url = self.config.endpoints.login.clone();
				let request = ApiRequest::post(url.clone()).with_json(credentials)?;
				let response = self.transport.send(request).await?;

				if response.is_unauthorized() {
					return Err(Error::InvalidCredentials { reason: response.error_message() });
				}
				if !response.is_success() {
					return Err(response.into_error(&url));
				}

				let pair: CredentialPair = response.decode(&url)?;

				if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
					return Err(Error::InvalidCredentials {
						reason: "Login response did not include both tokens".into(),
					});
				}

				self.coordinator.record_success();
				tracing::info!(username = %credentials.username, "Credential exchange succeeded.");

				Ok(pair)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Runs the refresh protocol once: reads the refresh token, posts it as a bearer
	/// credential, and stores the returned access token.
	///
	/// The new token is stored only if the refresh token it was minted for is still stored.
	/// A logout during the exchange yields [`SessionError::NoRefreshToken`]; a new login
	/// yields [`SessionError::RefreshSuperseded`].
	///
	/// Callers must hold a [`RefreshLease`](crate::client::coordinator::RefreshLease).
	pub(crate) async fn run_refresh_protocol(&self) -> Result<TokenSecret, SessionError> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "run_refresh_protocol");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result: Result<TokenSecret, SessionError> = span
			.instrument(async move {
				let refresh_token = self
					.store
					.get(TokenKind::Refresh)
					.await?
					.filter(|token| !token.is_empty())
					.ok_or(SessionError::NoRefreshToken)?;
				let url = self.config.endpoints.refresh.clone();
				let mut request = ApiRequest::post(url.clone())
					.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

				request.set_bearer(&refresh_token).map_err(|e| unavailable(&e))?;
				tracing::info!("Refreshing the access token.");

				let response = self.transport.send(request).await.map_err(|e| unavailable(&e))?;

				if !response.is_success() {
					return Err(SessionError::RefreshRejected {
						status: response.status.as_u16(),
						message: response.error_message(),
					});
				}

				let grant: RefreshGrant = response.decode(&url).map_err(|e| unavailable(&e))?;
				let access_token = grant.access_token.filter(|token| !token.is_empty()).ok_or_else(
					|| SessionError::RefreshRejected {
						status: response.status.as_u16(),
						message: "No access token returned by refresh endpoint".into(),
					},
				)?;

				match self.store.compare_and_swap_access(&refresh_token, access_token.clone()).await? {
					CompareAndSwapOutcome::Updated => Ok(access_token),
					CompareAndSwapOutcome::Missing => Err(SessionError::NoRefreshToken),
					CompareAndSwapOutcome::RefreshMismatch => Err(SessionError::RefreshSuperseded),
				}
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				tracing::info!("Access token refreshed.");
			},
			Err(e) => {
				self.refresh_metrics.record_failure();
				tracing::warn!(error = %e, "Access token refresh failed.");
			},
		}

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}
}

fn unavailable(error: &dyn StdError) -> SessionError {
	let mut message = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		message = format!("{}: {cause}", message.trim_end_matches('.'));
		source = cause.source();
	}

	SessionError::RefreshUnavailable { message }
}
