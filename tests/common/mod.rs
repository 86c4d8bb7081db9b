//! Scripted in-process backend shared by the concurrency tests.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use flashcards_session::{
	client::{RefreshState, SessionClient},
	config::ClientConfig,
	store::{MemoryStore, TokenStore},
	transport::{ApiRequest, ApiResponse, ApiTransport, TransportFuture},
	url::Url,
};
use http::{StatusCode, header::AUTHORIZATION};
use serde_json::json;
use tokio::sync::Semaphore;

/// How the scripted backend answers the refresh exchange.
#[derive(Clone, Debug)]
pub enum RefreshReply {
	/// Grant the given access token.
	Grant(String),
	/// Reject with the given status.
	Reject(u16),
}

/// In-process backend used for deterministic concurrency tests.
///
/// Resource requests succeed only with `Bearer <valid token>`. Refresh exchanges can be
/// held until [`ScriptedBackend::release_refresh`] is called.
#[derive(Debug)]
pub struct ScriptedBackend {
	valid_token: Mutex<String>,
	refresh_reply: Mutex<RefreshReply>,
	hold_refresh: bool,
	refresh_gate: Semaphore,
	refresh_calls: AtomicUsize,
	resource_credentials: Mutex<Vec<Option<String>>>,
}
impl ScriptedBackend {
	pub fn new(valid_token: &str, refresh_reply: RefreshReply) -> Self {
		Self {
			valid_token: Mutex::new(valid_token.into()),
			refresh_reply: Mutex::new(refresh_reply),
			hold_refresh: false,
			refresh_gate: Semaphore::new(0),
			refresh_calls: AtomicUsize::new(0),
			resource_credentials: Mutex::new(Vec::new()),
		}
	}

	/// Parks every refresh exchange until released.
	pub fn holding_refresh(mut self) -> Self {
		self.hold_refresh = true;

		self
	}

	pub fn release_refresh(&self) {
		self.refresh_gate.add_permits(1);
	}

	pub fn set_valid_token(&self, token: &str) {
		*self.valid_token.lock().expect("Valid token lock poisoned.") = token.into();
	}

	pub fn set_refresh_reply(&self, reply: RefreshReply) {
		*self.refresh_reply.lock().expect("Refresh reply lock poisoned.") = reply;
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	/// `Authorization` values seen on resource requests, in arrival order.
	pub fn resource_credentials(&self) -> Vec<Option<String>> {
		self.resource_credentials.lock().expect("Credential log lock poisoned.").clone()
	}

	async fn answer(&self, request: ApiRequest) -> ApiResponse {
		let credential = request
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);

		if request.url.path().ends_with("/refresh") {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			if self.hold_refresh {
				self.refresh_gate
					.acquire()
					.await
					.expect("Refresh gate should stay open for the test.")
					.forget();
			}

			let reply = self.refresh_reply.lock().expect("Refresh reply lock poisoned.").clone();

			return match reply {
				RefreshReply::Grant(token) => {
					self.set_valid_token(&token);

					ApiResponse::json(StatusCode::OK, &json!({ "access_token": token }))
				},
				RefreshReply::Reject(status) => ApiResponse::json(
					StatusCode::from_u16(status).expect("Scripted status should be valid."),
					&json!({ "msg": "Token has been revoked" }),
				),
			};
		}

		self.resource_credentials
			.lock()
			.expect("Credential log lock poisoned.")
			.push(credential.clone());

		let expected =
			format!("Bearer {}", self.valid_token.lock().expect("Valid token lock poisoned."));

		if credential.as_deref() == Some(expected.as_str()) {
			ApiResponse::json(StatusCode::OK, &json!({ "path": request.url.path() }))
		} else {
			ApiResponse::json(StatusCode::UNAUTHORIZED, &json!({ "msg": "Token has expired" }))
		}
	}
}
impl ApiTransport for ScriptedBackend {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move { Ok(self.answer(request).await) })
	}
}

/// Client wired to a [`ScriptedBackend`] through a shared handle.
pub fn scripted_client(
	backend: Arc<ScriptedBackend>,
	config: ClientConfig,
) -> (Arc<SessionClient<ScriptedBackend>>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let client =
		SessionClient::with_transport(config, store.clone() as Arc<dyn TokenStore>, backend);

	(Arc::new(client), store)
}

/// Configuration for the scripted backend; no server is contacted.
pub fn scripted_config(ceiling: u32) -> ClientConfig {
	let base = Url::parse("https://flashcards.test/api/").expect("Scripted base URL should parse.");

	ClientConfig::builder(base)
		.refresh_ceiling(ceiling)
		.build()
		.expect("Scripted configuration should build.")
}

/// Waits until the coordinator reports `queued` parked requests.
pub async fn wait_for_queue<T>(client: &SessionClient<T>, queued: usize)
where
	T: ?Sized + ApiTransport,
{
	let expected = RefreshState::Refreshing { queued };

	tokio::time::timeout(Duration::from_secs(5), async {
		while client.refresh_state() != expected {
			tokio::time::sleep(Duration::from_millis(2)).await;
		}
	})
	.await
	.unwrap_or_else(|_| panic!("Coordinator never reached {expected:?}: {:?}.", client.refresh_state()));
}

/// Waits until the backend has received `calls` refresh exchanges.
pub async fn wait_for_refresh_calls(backend: &ScriptedBackend, calls: usize) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while backend.refresh_calls() < calls {
			tokio::time::sleep(Duration::from_millis(2)).await;
		}
	})
	.await
	.unwrap_or_else(|_| panic!("Backend never saw {calls} refresh calls: {}.", backend.refresh_calls()));
}
