//! Catalog of binary questions the rounds draw from.

use indexmap::IndexSet;
use rand::seq::IteratorRandom;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// A two-option question shown to the whole room.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Question {
    /// Stable identifier within this server run.
    pub id: Uuid,
    /// The question text.
    pub prompt: String,
    /// Text behind choice A.
    pub option_a: String,
    /// Text behind choice B.
    pub option_b: String,
}

/// Source of questions for new rounds.
///
/// `sample_unused` must never hand out a question whose id is in `used`;
/// exhaustion is a normal outcome the caller turns into an early game end.
pub trait QuestionSource: Send + Sync {
    /// Pick a random question not yet played in the room.
    fn sample_unused(&self, used: &IndexSet<Uuid>) -> Option<Question>;
    /// Look up a question by id.
    fn question(&self, id: Uuid) -> Option<&Question>;
    /// Total catalog size.
    fn len(&self) -> usize;
    /// Whether the catalog is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Question catalog baked into the binary.
#[derive(Debug)]
pub struct BuiltinQuestionBank {
    questions: Vec<Question>,
}

impl BuiltinQuestionBank {
    /// Build the catalog shipped with the server.
    pub fn new() -> Self {
        Self {
            questions: seed_questions(),
        }
    }

    #[cfg(test)]
    fn with_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

impl Default for BuiltinQuestionBank {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSource for BuiltinQuestionBank {
    fn sample_unused(&self, used: &IndexSet<Uuid>) -> Option<Question> {
        self.questions
            .iter()
            .filter(|question| !used.contains(&question.id))
            .choose(&mut rand::rng())
            .cloned()
    }

    fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    fn len(&self) -> usize {
        self.questions.len()
    }
}

fn question(prompt: &str, option_a: &str, option_b: &str) -> Question {
    Question {
        id: Uuid::new_v4(),
        prompt: prompt.to_string(),
        option_a: option_a.to_string(),
        option_b: option_b.to_string(),
    }
}

/// Built-in catalog. Ids are minted at startup, so rooms only reference
/// questions within the same server run, which matches the in-memory store.
fn seed_questions() -> Vec<Question> {
    vec![
        question(
            "Would they rather live by the sea or in the mountains?",
            "By the sea",
            "In the mountains",
        ),
        question(
            "Morning person or night owl?",
            "Morning person",
            "Night owl",
        ),
        question(
            "Would they rather give up coffee or give up dessert?",
            "Give up coffee",
            "Give up dessert",
        ),
        question(
            "Would they rather be able to fly or be invisible?",
            "Fly",
            "Be invisible",
        ),
        question(
            "Cats or dogs?",
            "Cats",
            "Dogs",
        ),
        question(
            "Would they rather rewatch a favorite film or try a new one?",
            "Rewatch a favorite",
            "Try a new one",
        ),
        question(
            "Plan every detail of a trip, or improvise it?",
            "Plan everything",
            "Improvise",
        ),
        question(
            "Would they rather cook dinner or wash the dishes?",
            "Cook dinner",
            "Wash the dishes",
        ),
        question(
            "Would they rather read the book or watch the adaptation?",
            "Read the book",
            "Watch the adaptation",
        ),
        question(
            "Window seat or aisle seat?",
            "Window seat",
            "Aisle seat",
        ),
        question(
            "Would they rather speak every language or play every instrument?",
            "Speak every language",
            "Play every instrument",
        ),
        question(
            "Would they rather have a rewind button or a pause button for life?",
            "Rewind button",
            "Pause button",
        ),
        question(
            "Sweet breakfast or savory breakfast?",
            "Sweet",
            "Savory",
        ),
        question(
            "Would they rather always be ten minutes early or ten minutes late?",
            "Ten minutes early",
            "Ten minutes late",
        ),
        question(
            "Board games night or movie night?",
            "Board games",
            "Movie night",
        ),
        question(
            "Would they rather live without music or without television?",
            "Without music",
            "Without television",
        ),
        question(
            "Text or call?",
            "Text",
            "Call",
        ),
        question(
            "Would they rather explore space or the deep ocean?",
            "Space",
            "Deep ocean",
        ),
        question(
            "Summer or winter?",
            "Summer",
            "Winter",
        ),
        question(
            "Would they rather never wait in line again or never hit traffic again?",
            "Never wait in line",
            "Never hit traffic",
        ),
        question(
            "Would they rather host the party or be a guest?",
            "Host the party",
            "Be a guest",
        ),
        question(
            "City break or countryside retreat?",
            "City break",
            "Countryside retreat",
        ),
        question(
            "Would they rather know the future or change the past?",
            "Know the future",
            "Change the past",
        ),
        question(
            "Would they rather give a speech or sing karaoke?",
            "Give a speech",
            "Sing karaoke",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_a_full_game() {
        // A four-player game needs twelve distinct questions.
        let bank = BuiltinQuestionBank::new();
        assert!(bank.len() >= 12);
    }

    #[test]
    fn sampling_skips_used_questions_until_exhausted() {
        let bank = BuiltinQuestionBank::with_questions(vec![
            question("One?", "A", "B"),
            question("Two?", "A", "B"),
        ]);
        let mut used = IndexSet::new();

        let first = bank.sample_unused(&used).unwrap();
        used.insert(first.id);
        let second = bank.sample_unused(&used).unwrap();
        assert_ne!(first.id, second.id);
        used.insert(second.id);

        assert!(bank.sample_unused(&used).is_none());
    }

    #[test]
    fn lookup_by_id() {
        let bank = BuiltinQuestionBank::new();
        let sampled = bank.sample_unused(&IndexSet::new()).unwrap();
        let found = bank.question(sampled.id).unwrap();
        assert_eq!(found.prompt, sampled.prompt);
        assert!(bank.question(Uuid::new_v4()).is_none());
    }
}
