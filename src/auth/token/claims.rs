//! Local decoding of the expiry claim embedded in JWT access tokens.
//!
//! Signatures are never verified here; the backend remains the authority on validity. The
//! decoded `exp` only lets the session decide whether a refresh is due without a round-trip.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors raised while decoding access-token claims.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token does not have the `header.payload.signature` shape.
	#[error("Access token is not a JWT.")]
	Malformed,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	Encoding(#[from] base64::DecodeError),
	/// Payload segment is not the expected JSON object.
	#[error("Access token payload could not be parsed.")]
	Payload(#[from] serde_json::Error),
	/// `exp` is outside the representable date range.
	#[error("Access token expiry {exp} is out of range.")]
	ExpiryOutOfRange {
		/// Raw `exp` claim value.
		exp: i64,
	},
}

/// Registered claims the client reads from an access token.
///
/// Numeric dates may be integers or fractional seconds; fractions are truncated toward the
/// past.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
	/// Expiry as seconds since the Unix epoch.
	#[serde(deserialize_with = "numeric_date")]
	pub exp: i64,
	/// Issued-at as seconds since the Unix epoch, when present.
	#[serde(default, deserialize_with = "optional_numeric_date")]
	pub iat: Option<i64>,
	/// Subject (the backend's user id), when present.
	#[serde(default)]
	pub sub: Option<String>,
}
impl AccessClaims {
	/// Decodes the payload segment of `token` without verifying its signature.
	pub fn decode(token: &TokenSecret) -> Result<Self, ClaimsError> {
		let mut segments = token.expose().split('.');
		let payload = match (segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
			_ => return Err(ClaimsError::Malformed),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Returns the expiry instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime, ClaimsError> {
		OffsetDateTime::from_unix_timestamp(self.exp)
			.map_err(|_| ClaimsError::ExpiryOutOfRange { exp: self.exp })
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.exp <= instant.unix_timestamp()
	}

	/// Returns `true` if the token has expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
	Seconds(i64),
	Fractional(f64),
}
impl NumericDate {
	fn seconds(self) -> i64 {
		match self {
			Self::Seconds(seconds) => seconds,
			// Saturating cast; `expires_at` still rejects out-of-range values.
			Self::Fractional(seconds) => seconds.floor() as i64,
		}
	}
}

fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: serde::Deserializer<'de>,
{
	NumericDate::deserialize(deserializer).map(NumericDate::seconds)
}

fn optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::<NumericDate>::deserialize(deserializer)?.map(NumericDate::seconds))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token_with_payload(payload: &str) -> TokenSecret {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(payload);

		TokenSecret::new(format!("{header}.{payload}.sig"))
	}

	#[test]
	fn decodes_expiry_from_payload() {
		let token = token_with_payload(r#"{"sub":"user-1","exp":1735693200,"iat":1735689600}"#);
		let claims = AccessClaims::decode(&token).expect("Claims should decode.");

		assert_eq!(claims.iat, Some(1_735_689_600));
		assert_eq!(claims.sub.as_deref(), Some("user-1"));
		assert_eq!(
			claims.expires_at().expect("Expiry should be in range."),
			macros::datetime!(2025-01-01 01:00 UTC)
		);
		assert!(!claims.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(claims.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn accepts_fractional_numeric_dates() {
		let token = token_with_payload(r#"{"exp":1735693200.75,"iat":1735689600.5}"#);
		let claims = AccessClaims::decode(&token).expect("Fractional dates should decode.");

		assert_eq!(claims.exp, 1_735_693_200);
		assert_eq!(claims.iat, Some(1_735_689_600));
		assert!(claims.sub.is_none());
	}

	#[test]
	fn tolerates_padded_payloads() {
		let token = TokenSecret::new(format!(
			"h.{}==.s",
			URL_SAFE_NO_PAD.encode(r#"{"exp":1}"#).trim_end_matches('=')
		));

		assert_eq!(AccessClaims::decode(&token).expect("Claims should decode.").exp, 1);
	}

	#[test]
	fn rejects_tokens_without_payload() {
		assert!(matches!(
			AccessClaims::decode(&TokenSecret::new("opaque-token")),
			Err(ClaimsError::Malformed)
		));
		assert!(matches!(
			AccessClaims::decode(&TokenSecret::new("a.!!!.c")),
			Err(ClaimsError::Encoding(_))
		));
		assert!(matches!(
			AccessClaims::decode(&token_with_payload(r#"{"sub":"no-exp"}"#)),
			Err(ClaimsError::Payload(_))
		));
	}
}
