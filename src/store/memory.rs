//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	store::{CompareAndSwapOutcome, StoreFuture, TokenSlots, TokenStore},
};

/// Thread-safe storage backend that keeps tokens in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<TokenSlots>>);
impl MemoryStore {
	/// Creates a store pre-seeded with a credential pair.
	pub fn with_pair(pair: CredentialPair) -> Self {
		let mut slots = TokenSlots::default();

		slots.set(pair);

		Self(Arc::new(RwLock::new(slots)))
	}

	/// Returns a copy of both slots for inspection.
	pub fn snapshot(&self) -> TokenSlots {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().get(kind).cloned()) })
	}

	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().set(pair);

			Ok(())
		})
	}

	fn set_access(&self, access_token: TokenSecret) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().access_token = Some(access_token);

			Ok(())
		})
	}

	fn compare_and_swap_access<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
		access_token: TokenSecret,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let slots = self.0.clone();

		Box::pin(async move {
			Ok(slots.write().compare_and_swap_access(expected_refresh, access_token))
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().clear();

			Ok(())
		})
	}
}
