//! Token models persisted by stores and attached by the request pipeline.

pub mod claims;
pub mod pair;
pub mod secret;
