//! Observable session context layered over a [`SessionClient`].
//!
//! [`Session`] publishes [`SessionState`] on a watch channel and navigation decisions as
//! [`Redirect`] signals on a broadcast channel. After [`Session::teardown`] both channels
//! go quiet, so late check results never reach a host that has already gone away.

mod watchdog;

pub use watchdog::WatchdogHandle;

// crates.io
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, CredentialPair, LoginCredentials, TokenKind},
	client::SessionClient,
	config::CheckStrategy,
	error::SessionError,
	obs::{self, OpKind, OpOutcome, OpSpan},
	transport::{ApiRequest, ApiTransport},
};

/// Snapshot of the session as seen by the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
	/// Whether the stored credentials were valid at the last reconciliation.
	pub is_authenticated: bool,
	/// `true` only until the first reconciliation finishes.
	pub loading: bool,
}
impl Default for SessionState {
	fn default() -> Self {
		Self { is_authenticated: false, loading: true }
	}
}

/// Navigation decision emitted by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Redirect {
	/// Go to the authenticated landing area.
	Landing,
	/// Go to the login surface.
	Login,
}

/// Application-wide session context.
pub struct Session<T>
where
	T: ?Sized + ApiTransport,
{
	client: Arc<SessionClient<T>>,
	state: watch::Sender<SessionState>,
	redirects: broadcast::Sender<Redirect>,
	check_guard: AsyncMutex<()>,
	shutdown: CancellationToken,
}
impl<T> Session<T>
where
	T: ?Sized + ApiTransport,
{
	const REDIRECT_CAPACITY: usize = 16;

	/// Creates a session in the initial `loading` state.
	pub fn new(client: Arc<SessionClient<T>>) -> Self {
		let (state, _) = watch::channel(SessionState::default());
		let (redirects, _) = broadcast::channel(Self::REDIRECT_CAPACITY);

		Self {
			client,
			state,
			redirects,
			check_guard: AsyncMutex::new(()),
			shutdown: CancellationToken::new(),
		}
	}

	/// Client shared by this session.
	pub fn client(&self) -> &Arc<SessionClient<T>> {
		&self.client
	}

	/// Latest published state.
	pub fn state(&self) -> SessionState {
		*self.state.borrow()
	}

	/// Subscribes to state changes.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.state.subscribe()
	}

	/// Subscribes to redirect signals emitted after this call.
	pub fn redirects(&self) -> broadcast::Receiver<Redirect> {
		self.redirects.subscribe()
	}

	/// Returns `true` once [`Session::teardown`] has run.
	pub fn is_torn_down(&self) -> bool {
		self.shutdown.is_cancelled()
	}

	/// Runs the initial reconciliation, ending the `loading` phase.
	pub async fn mount(&self) -> bool {
		self.check_auth().await
	}

	/// Stores an already validated credential pair and enters the authenticated state.
	///
	/// No request is made; use [`Session::sign_in`] to exchange a username and password.
	pub async fn login(&self, pair: CredentialPair) -> Result<()> {
		self.client.store.set(pair).await?;
		self.publish(SessionState { is_authenticated: true, loading: false });
		self.signal(Redirect::Landing);

		tracing::info!("Session started.");

		Ok(())
	}

	/// Exchanges credentials with the login endpoint, then behaves like [`Session::login`].
	pub async fn sign_in(&self, credentials: LoginCredentials) -> Result<()> {
		let pair = self.client.exchange_credentials(&credentials).await?;

		self.login(pair).await
	}

	/// Clears both tokens and enters the signed-out state. Never fails.
	pub async fn logout(&self) {
		self.client.clear_tokens().await;
		self.publish(SessionState { is_authenticated: false, loading: false });
		self.signal(Redirect::Login);

		tracing::info!("Session ended.");
	}

	/// Reconciles the published state with the backend and returns the result.
	///
	/// Overlapping checks run one at a time so their results publish in order.
	pub async fn check_auth(&self) -> bool {
		const KIND: OpKind = OpKind::CheckAuth;

		let _guard = self.check_guard.lock().await;
		let span = OpSpan::new(KIND, "check_auth");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let authenticated = span.instrument(self.reconcile()).await;

		obs::record_op_outcome(
			KIND,
			if authenticated { OpOutcome::Success } else { OpOutcome::Failure },
		);
		self.publish(SessionState { is_authenticated: authenticated, loading: false });

		authenticated
	}

	/// Silences state and redirect publication and stops every watchdog spawned from this
	/// session.
	pub fn teardown(&self) {
		self.shutdown.cancel();

		tracing::debug!("Session torn down.");
	}

	async fn reconcile(&self) -> bool {
		match self.client.has_any_token().await {
			Ok(true) => {},
			Ok(false) => return false,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read session tokens.");

				return false;
			},
		}

		match self.client.config.check_strategy {
			CheckStrategy::Probe => self.probe().await,
			CheckStrategy::LocalExpiry => self.check_local_expiry().await,
		}
	}

	async fn probe(&self) -> bool {
		let request = ApiRequest::get(self.client.config.endpoints.probe.clone());

		match self.client.send(request).await {
			Ok(_) => true,
			Err(e) if e.is_session_terminal() => {
				tracing::warn!(error = %e, "Session probe ended the session.");

				false
			},
			Err(e) => {
				tracing::warn!(error = %e, "Session probe failed; trusting stored tokens.");

				self.client.has_tokens().await.unwrap_or(false)
			},
		}
	}

	async fn check_local_expiry(&self) -> bool {
		let access = match self.client.store.get(TokenKind::Access).await {
			Ok(access) => access,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read the access token.");

				return false;
			},
		};

		if let Some(token) = access {
			match AccessClaims::decode(&token) {
				Ok(claims) if !claims.is_expired() => return true,
				Ok(_) => tracing::debug!("Access token expired; refreshing."),
				Err(e) => {
					tracing::warn!(error = %e, "Access token is undecodable; ending the session.");
					self.client.clear_tokens().await;

					return false;
				},
			}
		}

		match self.client.refresh().await {
			Ok(_) => {
				self.client.forgive_refresh_attempts();

				true
			},
			Err(SessionError::RefreshSuperseded) => {
				tracing::debug!("Proactive refresh was superseded by a new login.");

				self.client.has_tokens().await.unwrap_or(false)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Proactive refresh ended the session.");

				false
			},
		}
	}

	fn publish(&self, state: SessionState) {
		if self.is_torn_down() {
			return;
		}

		self.state.send_replace(state);
	}

	fn signal(&self, redirect: Redirect) {
		if self.is_torn_down() {
			return;
		}

		// No subscriber means nobody is navigating; the signal is dropped.
		let _ = self.redirects.send(redirect);
	}
}
impl<T> Debug for Session<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("state", &self.state())
			.field("torn_down", &self.is_torn_down())
			.field("client", &self.client)
			.finish()
	}
}
