//! Client configuration: backend endpoints, refresh ceiling, and session-check policy.
//!
//! Every relative API path is resolved against [`ClientConfig::base_url`], so the concrete
//! `/api` prefix of a deployment lives in one place.

/// Builder API for assembling validated client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// How [`Session::check_auth`](crate::session::Session::check_auth) reconciles state with the
/// backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStrategy {
	#[default]
	/// Issue one authenticated probe through the request pipeline and trust its outcome.
	Probe,
	/// Decode the access token's `exp` locally; refresh through the coordinator if expired.
	LocalExpiry,
}

/// Endpoints the session layer calls outside of ordinary resource traffic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
	/// Credential exchange (`POST`, body `{username, password}`).
	pub login: Url,
	/// Access-token refresh (`POST`, bearer refresh token).
	pub refresh: Url,
	/// Lightweight authenticated endpoint used by session checks.
	pub probe: Url,
}

/// Immutable configuration consumed by [`SessionClient`](crate::client::SessionClient).
///
/// Deserialized values pass through the same normalization and validation as
/// [`ClientConfigBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
	/// Base URL every relative path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Session endpoints resolved against the base URL.
	pub endpoints: SessionEndpoints,
	/// Maximum refresh attempts before the session is terminated.
	pub refresh_ceiling: u32,
	/// Interval between periodic session checks.
	pub check_interval: StdDuration,
	/// Session-check policy.
	pub check_strategy: CheckStrategy,
	/// Whether plain-HTTP endpoints on non-loopback hosts were accepted.
	pub allow_insecure_http: bool,
}
impl ClientConfig {
	/// Default refresh attempt ceiling.
	pub const DEFAULT_REFRESH_CEILING: u32 = 5;
	/// Default periodic session-check interval.
	pub const DEFAULT_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(30);

	/// Creates a new builder rooted at `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a relative API path (leading `/` optional) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		join_path(&self.base_url, "api", path)
	}

	/// Returns `true` if `url` addresses the refresh endpoint.
	pub fn is_refresh_endpoint(&self, url: &Url) -> bool {
		url.scheme() == self.endpoints.refresh.scheme()
			&& url.host_str() == self.endpoints.refresh.host_str()
			&& url.port_or_known_default() == self.endpoints.refresh.port_or_known_default()
			&& url.path().trim_end_matches('/') == self.endpoints.refresh.path().trim_end_matches('/')
	}
}

impl TryFrom<RawClientConfig> for ClientConfig {
	type Error = ConfigError;

	fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
		let config = Self {
			base_url: builder::normalize_base(raw.base_url)?,
			endpoints: raw.endpoints,
			refresh_ceiling: raw.refresh_ceiling,
			check_interval: raw.check_interval,
			check_strategy: raw.check_strategy,
			allow_insecure_http: raw.allow_insecure_http,
		};

		config.validate()?;

		Ok(config)
	}
}

// Unchecked wire form of `ClientConfig`.
#[derive(Deserialize)]
struct RawClientConfig {
	base_url: Url,
	endpoints: SessionEndpoints,
	#[serde(default = "default_refresh_ceiling")]
	refresh_ceiling: u32,
	#[serde(default = "default_check_interval")]
	check_interval: StdDuration,
	#[serde(default)]
	check_strategy: CheckStrategy,
	#[serde(default)]
	allow_insecure_http: bool,
}

fn default_refresh_ceiling() -> u32 {
	ClientConfig::DEFAULT_REFRESH_CEILING
}

fn default_check_interval() -> StdDuration {
	ClientConfig::DEFAULT_CHECK_INTERVAL
}

pub(crate) fn join_path(base: &Url, endpoint: &'static str, path: &str) -> Result<Url, ConfigError> {
	base.join(path.trim_start_matches('/'))
		.map_err(|source| ConfigError::InvalidUrl { endpoint, source })
}
