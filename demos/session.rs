//! Demonstrates a full session against a mock flashcard service: sign in, list groups,
//! recover transparently from an expired access token, then draw a quiz card.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use flashcards_session::{
	api::QuizPrompt,
	auth::LoginCredentials,
	client::SessionClient,
	config::ClientConfig,
	session::Session,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200)
				.json_body(json!({ "access_token": "demo-expired", "refresh_token": "demo-refresh" }));
		})
		.await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups").header("authorization", "Bearer demo-expired");
			then.status(401).json_body(json!({ "msg": "Token has expired" }));
		})
		.await;
	let groups = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/groups").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!([{ "group_id": "g-1", "group_name": "Anatomy" }]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh").header("authorization", "Bearer demo-refresh");
			then.status(200).json_body(json!({ "access_token": "demo-access" }));
		})
		.await;
	let card = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cards/flashcard");
			then.status(200).json_body(json!({
				"card_id": "c-1",
				"question": "Largest bone in the human body?",
				"correct_answer": "Femur",
				"incorrect_answer": "Tibia"
			}));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.url("/api/"))?).build()?;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let session = Arc::new(Session::new(Arc::new(SessionClient::new(config, store))));
	let mut redirects = session.redirects();

	session.sign_in(LoginCredentials::new("ada", "correct horse")).await?;

	println!("Redirect after sign-in: {:?}.", redirects.recv().await?);

	for group in session.client().user_groups().await? {
		println!("Subscribed to {} ({}).", group.group_name, group.group_id);
	}

	let prompt = QuizPrompt::shuffled(&session.client().random_card().await?);

	println!("{}", prompt.question);

	for (index, choice) in prompt.choices.iter().enumerate() {
		println!("  {index}: {choice}");
	}

	println!("Correct choice: {}.", prompt.correct_index());
	println!("Refresh cycles: {}.", session.client().refresh_metrics.attempts());

	let watchdog = session.spawn_watchdog();

	session.logout().await;
	watchdog.shutdown().await;

	for mock in [&login, &expired, &groups, &refresh, &card] {
		mock.assert_async().await;
	}

	Ok(())
}
