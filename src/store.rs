//! Storage contracts and built-in store implementations for the session's credential pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Process-wide key/value persistence for the access and refresh tokens.
///
/// Stores perform no validation of token content, and every mutation must be visible to the
/// next read from any component sharing the store.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the stored token of the given kind, if present.
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists both halves of a credential pair, replacing any previous values.
	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Replaces only the access token, keeping the stored refresh token.
	fn set_access(&self, access_token: TokenSecret) -> StoreFuture<'_, ()>;

	/// Replaces the access token only while the stored refresh token still equals
	/// `expected_refresh`.
	///
	/// The check and the write happen atomically, so a refresh that settles after a logout
	/// or a new login cannot write its token into a pair it no longer belongs to.
	fn compare_and_swap_access<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
		access_token: TokenSecret,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Removes both tokens.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Result of an access-token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh token matched and the access token was replaced.
	Updated,
	/// A different refresh token is stored; nothing was written.
	RefreshMismatch,
	/// No refresh token is stored; nothing was written.
	Missing,
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Snapshot of both token slots, serialized under the stable `access_token` and
/// `refresh_token` keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSlots {
	/// Stored access token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Stored refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
}
impl TokenSlots {
	/// Returns the slot for the requested kind.
	pub fn get(&self, kind: TokenKind) -> Option<&TokenSecret> {
		match kind {
			TokenKind::Access => self.access_token.as_ref(),
			TokenKind::Refresh => self.refresh_token.as_ref(),
		}
	}

	/// Fills both slots from a credential pair.
	pub fn set(&mut self, pair: CredentialPair) {
		self.access_token = Some(pair.access_token);
		self.refresh_token = Some(pair.refresh_token);
	}

	/// Replaces the access token if the stored refresh token equals `expected_refresh`.
	pub fn compare_and_swap_access(
		&mut self,
		expected_refresh: &TokenSecret,
		access_token: TokenSecret,
	) -> CompareAndSwapOutcome {
		match &self.refresh_token {
			None => CompareAndSwapOutcome::Missing,
			Some(current) if current != expected_refresh => CompareAndSwapOutcome::RefreshMismatch,
			Some(_) => {
				self.access_token = Some(access_token);

				CompareAndSwapOutcome::Updated
			},
		}
	}

	/// Empties both slots.
	pub fn clear(&mut self) {
		self.access_token = None;
		self.refresh_token = None;
	}

	/// Returns `true` when neither slot holds a token.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}
}
