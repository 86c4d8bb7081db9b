//! Durable file-backed [`TokenStore`] so a session survives process restarts.

// std
#[cfg(unix)] use std::os::unix::fs::OpenOptionsExt;
use std::{
	fs::{self, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	store::{CompareAndSwapOutcome, StoreError, StoreFuture, TokenSlots, TokenStore},
};

/// Persists both tokens to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<TokenSlots>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the path backing this store.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<TokenSlots, StoreError> {
		if !path.exists() {
			return Ok(TokenSlots::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(TokenSlots::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &TokenSlots) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize token snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut options = OpenOptions::new();

			options.write(true).create(true).truncate(true);

			// Tokens are credentials; keep the snapshot readable by the owner only.
			#[cfg(unix)]
			options.mode(0o600);

			let mut file = options.open(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mutate(&self, apply: impl FnOnce(&mut TokenSlots)) -> Result<(), StoreError> {
		self.mutate_if(|slots| {
			apply(slots);

			true
		})
		.map(|_| ())
	}

	// Persists only when `apply` reports a change; the snapshot stays untouched otherwise.
	fn mutate_if(&self, apply: impl FnOnce(&mut TokenSlots) -> bool) -> Result<bool, StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		if !apply(&mut next) {
			return Ok(false);
		}

		self.persist_locked(&next)?;
		*guard = next;

		Ok(true)
	}
}
impl TokenStore for FileStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().get(kind).cloned()) })
	}

	fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|slots| slots.set(pair)) })
	}

	fn set_access(&self, access_token: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|slots| slots.access_token = Some(access_token)) })
	}

	fn compare_and_swap_access<'a>(
		&'a self,
		expected_refresh: &'a TokenSecret,
		access_token: TokenSecret,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut outcome = CompareAndSwapOutcome::Missing;

			self.mutate_if(|slots| {
				outcome = slots.compare_and_swap_access(expected_refresh, access_token);

				outcome == CompareAndSwapOutcome::Updated
			})?;

			Ok(outcome)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(TokenSlots::clear) })
	}
}
