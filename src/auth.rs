//! Auth-domain credential models: redacted secrets, credential pairs, and token claims.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::{claims::*, pair::*, secret::*};
