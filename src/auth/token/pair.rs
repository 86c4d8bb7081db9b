//! Access/refresh credential pairs and the stable storage keys they live under.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Identifies one half of a [`CredentialPair`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Short-lived bearer credential attached to API requests.
	#[serde(rename = "access_token")]
	Access,
	/// Long-lived credential exchanged for new access tokens.
	#[serde(rename = "refresh_token")]
	Refresh,
}
impl TokenKind {
	/// Returns the stable storage key for this token kind.
	pub const fn storage_key(self) -> &'static str {
		match self {
			TokenKind::Access => "access_token",
			TokenKind::Refresh => "refresh_token",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.storage_key())
	}
}

/// Access and refresh tokens issued together by the login endpoint.
///
/// Both halves are set and cleared together; only a refresh replaces the access token on
/// its own.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret; callers must avoid logging it.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Builds a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Returns the secret for the requested half.
	pub fn get(&self, kind: TokenKind) -> &TokenSecret {
		match kind {
			TokenKind::Access => &self.access_token,
			TokenKind::Refresh => &self.refresh_token,
		}
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_payload_deserializes_into_pair() {
		let pair: CredentialPair =
			serde_json::from_str(r#"{"access_token":"a-1","refresh_token":"r-1"}"#)
				.expect("Login payload should deserialize.");

		assert_eq!(pair.get(TokenKind::Access).expose(), "a-1");
		assert_eq!(pair.get(TokenKind::Refresh).expose(), "r-1");
		assert!(!format!("{pair:?}").contains("a-1"));
	}

	#[test]
	fn storage_keys_are_stable() {
		assert_eq!(TokenKind::Access.storage_key(), "access_token");
		assert_eq!(TokenKind::Refresh.to_string(), "refresh_token");
		assert_eq!(
			serde_json::to_string(&TokenKind::Refresh).expect("Token kind should serialize."),
			"\"refresh_token\""
		);
	}
}
