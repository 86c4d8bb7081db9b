// self
use crate::{
	_prelude::*,
	config::{CheckStrategy, ClientConfig, SessionEndpoints, join_path},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL every relative path is resolved against.
	pub base_url: Url,
	/// Login path relative to the base URL.
	pub login_path: String,
	/// Refresh path relative to the base URL.
	pub refresh_path: String,
	/// Probe path relative to the base URL.
	pub probe_path: String,
	/// Maximum refresh attempts before the session is terminated.
	pub refresh_ceiling: u32,
	/// Interval between periodic session checks.
	pub check_interval: StdDuration,
	/// Session-check policy.
	pub check_strategy: CheckStrategy,
	/// Accepts plain-HTTP endpoints on non-loopback hosts.
	pub allow_insecure_http: bool,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the default endpoint layout.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			login_path: "login".into(),
			refresh_path: "refresh".into(),
			probe_path: "protected".into(),
			refresh_ceiling: ClientConfig::DEFAULT_REFRESH_CEILING,
			check_interval: ClientConfig::DEFAULT_CHECK_INTERVAL,
			check_strategy: CheckStrategy::default(),
			allow_insecure_http: false,
		}
	}

	/// Overrides the login path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the probe path used by session checks.
	pub fn probe_path(mut self, path: impl Into<String>) -> Self {
		self.probe_path = path.into();

		self
	}

	/// Overrides the refresh attempt ceiling (defaults to 5).
	pub fn refresh_ceiling(mut self, ceiling: u32) -> Self {
		self.refresh_ceiling = ceiling;

		self
	}

	/// Overrides the periodic session-check interval (defaults to 30 seconds).
	pub fn check_interval(mut self, interval: StdDuration) -> Self {
		self.check_interval = interval;

		self
	}

	/// Overrides the session-check policy.
	pub fn check_strategy(mut self, strategy: CheckStrategy) -> Self {
		self.check_strategy = strategy;

		self
	}

	/// Allows plain-HTTP endpoints on hosts other than loopback.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = normalize_base(self.base_url)?;
		let endpoints = SessionEndpoints {
			login: join_path(&base_url, "login", &self.login_path)?,
			refresh: join_path(&base_url, "refresh", &self.refresh_path)?,
			probe: join_path(&base_url, "probe", &self.probe_path)?,
		};
		let config = ClientConfig {
			base_url,
			endpoints,
			refresh_ceiling: self.refresh_ceiling,
			check_interval: self.check_interval,
			check_strategy: self.check_strategy,
			allow_insecure_http: self.allow_insecure_http,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	pub(crate) fn validate(&self) -> Result<(), ConfigError> {
		if self.refresh_ceiling == 0 {
			return Err(ConfigError::ZeroRefreshCeiling);
		}
		if self.check_interval.is_zero() {
			return Err(ConfigError::ZeroCheckInterval);
		}
		if !self.allow_insecure_http {
			validate_endpoint("base", &self.base_url)?;
			validate_endpoint("login", &self.endpoints.login)?;
			validate_endpoint("refresh", &self.endpoints.refresh)?;
			validate_endpoint("probe", &self.endpoints.probe)?;
		}

		Ok(())
	}
}

/// Rejects non-hierarchical URLs and appends the trailing `/` relative joins rely on.
pub(crate) fn normalize_base(mut base_url: Url) -> Result<Url, ConfigError> {
	if base_url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { url: base_url.to_string() });
	}
	if !base_url.path().ends_with('/') {
		let path = format!("{}/", base_url.path());

		base_url.set_path(&path);
	}

	Ok(base_url)
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	if url.scheme() == "https" || is_loopback(url) {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
