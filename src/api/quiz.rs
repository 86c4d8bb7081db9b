//! Quiz-mode prompt: a question with the correct answer and a distractor in random order.

// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, api::CardData};

/// Placeholder shown for an answer the card does not carry.
pub const MISSING_ANSWER: &str = "ERROR: NO DATA";

/// Two-choice prompt built from a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuizPrompt {
	/// Card the prompt was built from.
	pub card_id: String,
	/// Question text.
	pub question: String,
	/// Both answers, in display order.
	pub choices: [String; 2],
	correct_index: usize,
}
impl QuizPrompt {
	/// Builds a prompt, placing the correct answer at a position drawn from `rng`.
	pub fn from_card<R>(card: &CardData, rng: &mut R) -> Self
	where
		R: Rng,
	{
		let answer = |value: &Option<String>| {
			value.as_deref().filter(|text| !text.is_empty()).unwrap_or(MISSING_ANSWER).to_owned()
		};
		let correct = answer(&card.correct_answer);
		let incorrect = answer(&card.incorrect_answer);
		let correct_index = usize::from(rng.random_bool(0.5));
		let choices = if correct_index == 0 { [correct, incorrect] } else { [incorrect, correct] };

		Self { card_id: card.card_id.clone(), question: card.question.clone(), choices, correct_index }
	}

	/// Builds a prompt using the thread-local generator.
	pub fn shuffled(card: &CardData) -> Self {
		Self::from_card(card, &mut rand::rng())
	}

	/// Position of the correct answer in [`QuizPrompt::choices`].
	pub fn correct_index(&self) -> usize {
		self.correct_index
	}

	/// Returns `true` if `choice` selects the correct answer.
	pub fn is_correct(&self, choice: usize) -> bool {
		choice == self.correct_index
	}
}
