//! Username/password credentials submitted to the login and registration endpoints.

// self
use crate::_prelude::*;

/// Login form payload. The password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
	/// Username or email address; the backend accepts either.
	pub username: String,
	password: String,
}
impl LoginCredentials {
	/// Creates a new credential set.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into() }
	}

	/// Returns the password. Callers must avoid logging this string.
	pub fn expose_password(&self) -> &str {
		&self.password
	}
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Registration form payload. The password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
	/// Requested username; must be unique.
	pub username: String,
	/// Contact email; must be unique.
	pub email: String,
	password: String,
}
impl Registration {
	/// Creates a new registration request.
	pub fn new(
		username: impl Into<String>,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		Self { username: username.into(), email: email.into(), password: password.into() }
	}

	/// Credentials for signing in once the account exists.
	pub fn login_credentials(&self) -> LoginCredentials {
		LoginCredentials::new(self.username.clone(), self.password.clone())
	}
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}
