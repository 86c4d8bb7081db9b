//! Resource payloads exchanged with the flashcard service.
//!
//! Identifiers and timestamps are kept as the strings the service sends.

// self
use crate::_prelude::*;

/// A study group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
	/// Group identifier.
	pub group_id: String,
	/// Display name.
	pub group_name: String,
	/// Identifier of the user who created the group.
	#[serde(default)]
	pub creator_id: Option<String>,
	/// Creation timestamp.
	#[serde(default)]
	pub time_created: Option<String>,
	/// Last update timestamp.
	#[serde(default)]
	pub time_updated: Option<String>,
	/// Subscriber ids; only the group listing sends them.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub subscribers: Vec<String>,
}

/// A group returned by search, annotated with the caller's membership.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSearchData {
	/// The group itself.
	#[serde(flatten)]
	pub group: GroupData,
	/// Whether the signed-in user already belongs to the group.
	#[serde(default)]
	pub subscribed: bool,
}

/// Public profile of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
	/// User identifier.
	pub user_id: String,
	/// Username.
	pub username: String,
	/// Email address.
	#[serde(default)]
	pub email: Option<String>,
}

/// User profiles keyed by user id.
pub type UserDirectory = HashMap<String, UserData>;

/// A flashcard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
	/// Card identifier.
	pub card_id: String,
	/// Prompt shown to the learner.
	pub question: String,
	/// Expected answer.
	#[serde(default)]
	pub correct_answer: Option<String>,
	/// Distractor shown next to the correct answer in quiz mode.
	#[serde(default)]
	pub incorrect_answer: Option<String>,
	/// Owning group.
	#[serde(default)]
	pub group_id: Option<String>,
	/// Author.
	#[serde(default)]
	pub creator_id: Option<String>,
	/// Creation timestamp.
	#[serde(default)]
	pub time_created: Option<String>,
	/// Last update timestamp.
	#[serde(default)]
	pub time_updated: Option<String>,
	/// Last editor.
	#[serde(default)]
	pub updated_by_id: Option<String>,
}

/// Body for creating one card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewCard {
	/// Prompt shown to the learner.
	pub question: String,
	/// Expected answer.
	pub correct_answer: String,
	/// Group the card is added to.
	pub group_id: String,
	/// Optional distractor for quiz mode.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub incorrect_answer: Option<String>,
}

/// Partial card update; absent fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CardUpdate {
	/// New prompt.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub question: Option<String>,
	/// New expected answer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub correct_answer: Option<String>,
}

/// One entry of a bulk import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCard {
	/// Prompt shown to the learner.
	pub question: String,
	/// Expected answer.
	pub correct_answer: String,
}

/// Response to card creation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedCard {
	/// Identifier of the new card.
	pub card_id: String,
}

/// Response to account registration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
	/// Identifier of the new account.
	pub user_id: String,
}

/// Response to group creation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedGroup {
	/// Identifier of the new group.
	pub group_id: String,
}

/// Acknowledgement carrying a human-readable message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
	/// Message text; empty when the service sent none.
	#[serde(default)]
	pub message: String,
}
