//! Session-aware API client for the flashcards study service. It attaches bearer tokens,
//! coordinates a single-flight token refresh with request queuing, and exposes an observable
//! session context.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod obs;
pub mod session;
pub mod store;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		client::SessionClient,
		config::ClientConfig,
		store::{MemoryStore, TokenStore},
		transport::ReqwestTransport,
	};

	/// Session client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = SessionClient<ReqwestTransport>;

	/// Builds a configuration rooted at `{server}/api/` with the default endpoint layout.
	pub fn test_config(server_url: &str) -> ClientConfig {
		let base = Url::parse(&format!("{server_url}/api/"))
			.expect("Failed to parse mock server base URL.");

		ClientConfig::builder(base).build().expect("Failed to build test client configuration.")
	}

	/// Constructs a [`SessionClient`] backed by an in-memory store and the reqwest transport
	/// used across integration tests.
	pub fn build_reqwest_test_client(config: ClientConfig) -> (Arc<ReqwestTestClient>, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let client = SessionClient::with_transport(config, store, ReqwestTransport::default());

		(Arc::new(client), store_backend)
	}

	/// Produces an unsigned JWT-shaped token whose payload carries the provided `exp` claim.
	pub fn fake_jwt(subject: &str, exp: OffsetDateTime) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let payload = serde_json::json!({ "sub": subject, "exp": exp.unix_timestamp() });
		let payload = URL_SAFE_NO_PAD.encode(payload.to_string());

		format!("{header}.{payload}.signature")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, flashcards_session as _, httpmock as _};
