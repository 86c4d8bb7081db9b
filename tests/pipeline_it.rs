#![cfg(feature = "reqwest")]

// std
use std::time::Duration;
// crates.io
use flashcards_session::{
	_preludet::*,
	auth::{CredentialPair, LoginCredentials, TokenKind},
	error::{Error, SessionError},
	store::TokenStore,
	transport::ApiRequest,
};
use httpmock::prelude::*;
use serde_json::{Value, json};

#[tokio::test]
async fn attaches_stored_access_token() {
	let server = MockServer::start_async().await;
	let groups = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups").header("authorization", "Bearer access-1");
			then.status(200).json_body(json!([{
				"group_id": "g-1",
				"group_name": "Anatomy",
				"creator_id": "u-1",
				"time_created": "2024-10-01T09:00:00",
				"time_updated": "2024-10-01T09:00:00"
			}]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200).json_body(json!({ "access_token": "unused" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("access-1", "refresh-1")).await.expect("Seeding should succeed.");

	let fetched = client.user_groups().await.expect("Authorized request should succeed.");

	assert_eq!(fetched.len(), 1);
	assert_eq!(fetched[0].group_name, "Anatomy");
	groups.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn unauthorized_request_is_refreshed_and_replayed() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups").header("authorization", "Bearer stale");
			then.status(401).json_body(json!({ "msg": "Token has expired" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups").header("authorization", "Bearer fresh");
			then.status(200).json_body(json!([]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/refresh")
				.header("authorization", "Bearer refresh-1")
				.header("content-type", "application/json");
			then.status(200)
				.json_body(json!({ "access_token": "fresh", "refresh_token": "ignored" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("stale", "refresh-1")).await.expect("Seeding should succeed.");

	let fetched = client.user_groups().await.expect("Recovered request should succeed.");

	assert!(fetched.is_empty());
	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	let snapshot = store.snapshot();

	assert_eq!(snapshot.access_token.as_ref().map(|token| token.expose()), Some("fresh"));
	assert_eq!(snapshot.refresh_token.as_ref().map(|token| token.expose()), Some("refresh-1"));
	assert_eq!(client.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn overlapping_failures_trigger_a_single_refresh() {
	let server = MockServer::start_async().await;
	let mut rejected = Vec::new();
	let mut accepted = Vec::new();

	for group_id in ["g-1", "g-2"] {
		let path = format!("/api/groups/{group_id}");

		rejected.push(
			server
				.mock_async(|when, then| {
					when.method(GET).path(path.as_str()).header("authorization", "Bearer stale");
					then.status(401).json_body(json!({ "msg": "Token has expired" }));
				})
				.await,
		);
		accepted.push(
			server
				.mock_async(|when, then| {
					when.method(GET).path(path.as_str()).header("authorization", "Bearer fresh");
					then.status(200).json_body(json!({
						"group_id": group_id,
						"group_name": "Anatomy",
						"creator_id": "u-1"
					}));
				})
				.await,
		);
	}

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200)
				.delay(Duration::from_millis(400))
				.json_body(json!({ "access_token": "fresh" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("stale", "refresh-1")).await.expect("Seeding should succeed.");

	let (a, b) = tokio::join!(client.group("g-1"), client.group("g-2"));

	assert_eq!(a.expect("First request should be replayed.").group_id, "g-1");
	assert_eq!(b.expect("Second request should be replayed.").group_id, "g-2");

	for mock in rejected.iter().chain(accepted.iter()) {
		mock.assert_calls_async(1).await;
	}

	refresh.assert_calls_async(1).await;
	assert_eq!(client.refresh_metrics.queued(), 1);
}

#[tokio::test]
async fn refresh_endpoint_rejection_is_not_recovered() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(401).json_body(json!({ "msg": "Token has been revoked" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("stale", "refresh-1")).await.expect("Seeding should succeed.");

	let request = ApiRequest::post(client.config.endpoints.refresh.clone());
	let err = client.send(request).await.expect_err("A 401 from the refresh URL must surface.");

	assert!(
		matches!(&err, Error::Api { status: 401, message, .. } if message == "Token has been revoked"),
		"Unexpected error: {err:?}."
	);
	refresh.assert_calls_async(1).await;
	assert_eq!(client.refresh_attempts(), 0);
	assert!(!store.snapshot().is_empty(), "Tokens are untouched when no refresh ran.");
}

#[tokio::test]
async fn non_authorization_failures_pass_through() {
	let server = MockServer::start_async().await;
	let failing = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/groups/g-1");
			then.status(403).json_body(json!({ "message": "User is not the creator of the group" }));
		})
		.await;
	let throttled = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cards/flashcard");
			then.status(429).header("retry-after", "120").body("slow down");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200).json_body(json!({ "access_token": "unused" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("access-1", "refresh-1")).await.expect("Seeding should succeed.");

	let err = client.delete_group("g-1").await.expect_err("A 403 must surface unchanged.");

	assert!(matches!(
		&err,
		Error::Api { status: 403, message, .. } if message == "User is not the creator of the group"
	));
	assert_eq!(err.status(), Some(403));

	let err = client.random_card().await.expect_err("A 429 must surface unchanged.");

	assert!(matches!(
		&err,
		Error::Api { status: 429, message, retry_after: Some(delay), .. }
			if message == "slow down" && *delay == time::Duration::seconds(120)
	));
	failing.assert_calls_async(1).await;
	throttled.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn network_failures_are_not_retried() {
	let (client, store) = build_reqwest_test_client(test_config("http://127.0.0.1:9"));

	store.set(CredentialPair::new("access-1", "refresh-1")).await.expect("Seeding should succeed.");

	let err = client
		.get_json::<Value>("user/groups")
		.await
		.expect_err("An unreachable backend must surface a transport error.");

	assert!(matches!(err, Error::Transport(_)), "Unexpected error: {err:?}.");
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn login_exchange_maps_rejection_to_invalid_credentials() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/login")
				.json_body(json!({ "username": "ada", "password": "wrong" }));
			then.status(401).json_body(json!({ "message": "Invalid credentials" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200).json_body(json!({ "access_token": "unused" }));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let err = client
		.exchange_credentials(&LoginCredentials::new("ada", "wrong"))
		.await
		.expect_err("Wrong password should be rejected.");

	assert!(
		matches!(&err, Error::InvalidCredentials { reason } if reason == "Invalid credentials"),
		"Unexpected error: {err:?}."
	);
	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
	assert!(store.get(TokenKind::Access).await.expect("Store read should succeed.").is_none());
}

#[tokio::test]
async fn login_exchange_returns_both_tokens() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200)
				.json_body(json!({ "access_token": "access-1", "refresh_token": "refresh-1" }));
		})
		.await;
	let (client, _store) = build_reqwest_test_client(test_config(&server.base_url()));
	let pair = client
		.exchange_credentials(&LoginCredentials::new("ada", "secret"))
		.await
		.expect("Login should succeed.");

	assert_eq!(pair.access_token.expose(), "access-1");
	assert_eq!(pair.refresh_token.expose(), "refresh-1");
	login.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_without_access_token_is_rejected() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups");
			then.status(401).json_body(json!({ "msg": "Token has expired" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200).json_body(json!({}));
		})
		.await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	store.set(CredentialPair::new("stale", "refresh-1")).await.expect("Seeding should succeed.");

	let err = client.user_groups().await.expect_err("An empty grant cannot recover the request.");

	assert_eq!(
		err.to_string(),
		SessionError::RefreshRejected {
			status: 200,
			message: "No access token returned by refresh endpoint".into(),
		}
		.to_string()
	);
	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	assert!(store.snapshot().is_empty());
}
