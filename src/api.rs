//! Typed wrappers over the flashcard service's resource endpoints.
//!
//! Every call goes through [`SessionClient::send`], so an expired access token is
//! refreshed and the call replayed without the caller noticing.

pub mod quiz;
pub mod types;

pub use quiz::*;
pub use types::*;

// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	auth::Registration,
	client::SessionClient,
	transport::{ApiRequest, ApiTransport},
};

#[derive(Serialize)]
struct GroupNameBody<'a> {
	group_name: &'a str,
}

#[derive(Serialize)]
struct UserIdsBody<'a> {
	user_ids: &'a [String],
}

#[derive(Serialize)]
struct BulkCardsBody<'a> {
	group_id: &'a str,
	cards: &'a [BulkCard],
}

impl<T> SessionClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates an account.
	///
	/// Registration needs no session, so the call bypasses the pipeline; a taken username
	/// or email comes back as [`Error::Api`] with status 409.
	pub async fn register(&self, registration: &Registration) -> Result<RegisteredUser> {
		let url = self.config.resolve("register")?;
		let request = ApiRequest::post(url.clone()).with_json(registration)?;
		let response = self.transport.send(request).await?;

		if !response.is_success() {
			return Err(response.into_error(&url));
		}

		tracing::info!(username = %registration.username, "Account registered.");

		response.decode(&url)
	}

	/// Groups the signed-in user is subscribed to.
	pub async fn user_groups(&self) -> Result<Vec<GroupData>> {
		self.get_json("user/groups").await
	}

	/// Looks up display details for the given user ids.
	pub async fn user_details(&self, user_ids: &[String]) -> Result<UserDirectory> {
		self.post_json("user/details", &UserIdsBody { user_ids }).await
	}

	/// Every group on the service, with subscriber ids.
	pub async fn groups(&self) -> Result<Vec<GroupData>> {
		self.get_json("groups").await
	}

	/// Fetches one group.
	pub async fn group(&self, group_id: &str) -> Result<GroupData> {
		self.get_json(&format!("groups/{group_id}")).await
	}

	/// Searches groups by name; each hit says whether the user is already subscribed.
	pub async fn search_groups(&self, group_name: &str) -> Result<Vec<GroupSearchData>> {
		let mut request = self.request(Method::GET, "groups/search")?;

		request.url.query_pairs_mut().append_pair("group_name", group_name);

		self.execute_json(request).await
	}

	/// Creates a group owned by the signed-in user.
	pub async fn create_group(&self, group_name: &str) -> Result<CreatedGroup> {
		self.post_json("groups", &GroupNameBody { group_name }).await
	}

	/// Renames a group; only its creator may do so.
	pub async fn rename_group(&self, group_id: &str, group_name: &str) -> Result<MessageResponse> {
		self.put_json(&format!("groups/{group_id}"), &GroupNameBody { group_name }).await
	}

	/// Deletes a group and its cards; only its creator may do so.
	pub async fn delete_group(&self, group_id: &str) -> Result<MessageResponse> {
		self.delete_json(&format!("groups/{group_id}")).await
	}

	/// Subscribes the signed-in user to a group.
	pub async fn join_group(&self, group_id: &str) -> Result<MessageResponse> {
		self.post_empty(&format!("groups/{group_id}/join")).await
	}

	/// Unsubscribes the signed-in user from a group.
	pub async fn leave_group(&self, group_id: &str) -> Result<MessageResponse> {
		self.post_empty(&format!("groups/{group_id}/leave")).await
	}

	/// Cards belonging to a group.
	pub async fn group_cards(&self, group_id: &str) -> Result<Vec<CardData>> {
		self.get_json(&format!("groups/{group_id}/cards")).await
	}

	/// Creates a card in a group the user is subscribed to.
	pub async fn create_card(&self, card: &NewCard) -> Result<CreatedCard> {
		self.post_json("cards", card).await
	}

	/// Fetches one card from a group the user is subscribed to.
	pub async fn card(&self, card_id: &str) -> Result<CardData> {
		self.get_json(&format!("cards/{card_id}")).await
	}

	/// Updates a card's question and/or correct answer.
	pub async fn update_card(&self, card_id: &str, update: &CardUpdate) -> Result<MessageResponse> {
		self.put_json(&format!("cards/{card_id}"), update).await
	}

	/// Deletes a card.
	pub async fn delete_card(&self, card_id: &str) -> Result<MessageResponse> {
		self.delete_json(&format!("cards/{card_id}")).await
	}

	/// Draws a random card from the user's subscribed groups.
	pub async fn random_card(&self) -> Result<CardData> {
		self.get_json("cards/flashcard").await
	}

	/// Creates many cards in one group with a single request.
	pub async fn create_cards_bulk(&self, group_id: &str, cards: &[BulkCard]) -> Result<MessageResponse> {
		self.post_json("cards/bulk", &BulkCardsBody { group_id, cards }).await
	}

	async fn post_empty(&self, path: &str) -> Result<MessageResponse> {
		self.execute_json(self.request(Method::POST, path)?).await
	}
}
