//! Request and response types of the tvoc web API.
//!
//! This crate is shared between the backend and the integration tests, so
//! both sides agree on the JSON shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The difficulty buckets used by vocabulary, lessons and questions.
///
/// Persisted as lowercase text, so the string representations must stay
/// stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameKind {
    VocabQuiz,
    ArrangeSentence,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ArrangeSentence,
    Listening,
}

/// The direction of a quiz question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptKind {
    /// The prompt is the Thai word, the options are translations.
    WordToTranslation,
    /// The prompt is the translation, the options are Thai words.
    TranslationToWord,
}

/// The body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusResponse {
    pub service: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyResponse {
    pub id: i64,
    pub word: String,
    pub romanization: String,
    pub translation: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub example_sentence: Option<String>,
    pub example_translation: Option<String>,
    pub frequency: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVocabulary {
    pub word: String,
    pub romanization: String,
    pub translation: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub example_sentence: Option<String>,
    pub example_translation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateVocabulary {
    pub word: Option<String>,
    pub romanization: Option<String>,
    pub translation: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub example_sentence: Option<String>,
    pub example_translation: Option<String>,
}

impl UpdateVocabulary {
    /// Returns true if the update does not change any field.
    pub fn is_noop(&self) -> bool {
        self.word.is_none()
            && self.romanization.is_none()
            && self.translation.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
            && self.example_sentence.is_none()
            && self.example_translation.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomVocabularyQuery {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A lesson with its questions joined in at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonWithQuestions {
    #[serde(flatten)]
    pub lesson: LessonResponse,
    pub questions: Vec<QuestionResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLesson {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub difficulty: Difficulty,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateLesson {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub position: Option<i32>,
}

impl UpdateLesson {
    pub fn is_noop(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
            && self.position.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: i64,
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub correct_answer: String,
    pub choices: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateQuestion {
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub correct_answer: String,
    pub choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuestion {
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: Option<QuestionKind>,
    pub difficulty: Option<Difficulty>,
    pub prompt: Option<String>,
    pub correct_answer: Option<String>,
    pub choices: Option<Vec<String>>,
}

impl UpdateQuestion {
    pub fn is_noop(&self) -> bool {
        self.lesson_id.is_none()
            && self.vocabulary_id.is_none()
            && self.kind.is_none()
            && self.difficulty.is_none()
            && self.prompt.is_none()
            && self.correct_answer.is_none()
            && self.choices.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionFilter {
    pub lesson_id: Option<i64>,
    pub kind: Option<QuestionKind>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabQuizQuery {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub count: Option<i64>,
}

/// One multiple-choice quiz question.
///
/// `options` always contains four entries: the correct answer at
/// `correct_index` and three distractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub vocabulary_id: i64,
    pub prompt_kind: PromptKind,
    pub prompt: String,
    /// Romanization of the prompt, present when the prompt is Thai script.
    pub prompt_romanization: Option<String>,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabQuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitGameResult {
    pub user_id: String,
    pub game_kind: GameKind,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_spent_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResultResponse {
    pub id: i64,
    pub user_id: String,
    pub game_kind: GameKind,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_spent_seconds: i32,
    pub diamonds_earned: i32,
    pub xp_earned: i32,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitGameResultResponse {
    pub result: GameResultResponse,
    pub progress: ProgressResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameResultsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub user_id: String,
    pub total_diamonds: i64,
    pub total_xp: i64,
    pub games_played: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_played_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProgress {
    pub total_diamonds: Option<i64>,
    pub total_xp: Option<i64>,
    pub games_played: Option<i32>,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl UpdateProgress {
    pub fn is_noop(&self) -> bool {
        self.total_diamonds.is_none()
            && self.total_xp.is_none()
            && self.games_played.is_none()
            && self.current_streak.is_none()
            && self.longest_streak.is_none()
            && self.last_played_at.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrangeSentenceQuery {
    pub count: Option<i64>,
}

/// One arrange-the-sentence round. The tokens are shuffled; the correct
/// order is not included, grading happens server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangeSentenceItem {
    pub question_id: i64,
    pub prompt: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangeSentenceResponse {
    pub sentences: Vec<ArrangeSentenceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitArrangement {
    pub question_id: i64,
    pub arranged_tokens: Vec<String>,
    pub user_id: Option<String>,
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementGrade {
    pub correct: bool,
    pub correct_sentence: String,
    pub diamonds_earned: i32,
    pub xp_earned: i32,
    /// Updated progress, present when the submission carried a `user_id`.
    pub progress: Option<ProgressResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsResponse {
    pub audio_base64: String,
    pub mime_type: String,
    pub provider: String,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_string_round_trip() {
        use std::str::FromStr;

        for difficulty in [
            Difficulty::Beginner,
            Difficulty::Intermediate,
            Difficulty::Advanced,
        ] {
            let as_string = difficulty.to_string();
            assert_eq!(as_string, as_string.to_lowercase());
            assert_eq!(Difficulty::from_str(&as_string).unwrap(), difficulty);
        }

        assert!(Difficulty::from_str("expert").is_err());
    }

    #[test]
    fn test_game_kind_matches_serde_representation() {
        let json = serde_json::to_string(&GameKind::VocabQuiz).unwrap();
        assert_eq!(json, "\"vocab_quiz\"");
        assert_eq!(GameKind::VocabQuiz.to_string(), "vocab_quiz");

        let parsed: GameKind = serde_json::from_str("\"arrange_sentence\"").unwrap();
        assert_eq!(parsed, GameKind::ArrangeSentence);
    }

    #[test]
    fn test_update_vocabulary_noop() {
        assert!(UpdateVocabulary::default().is_noop());
        assert!(!UpdateVocabulary {
            translation: Some("water".to_string()),
            ..Default::default()
        }
        .is_noop());
    }

    #[test]
    fn test_lesson_with_questions_flattens() {
        let lesson = LessonWithQuestions {
            lesson: LessonResponse {
                id: 1,
                title: "Greetings".to_string(),
                description: String::new(),
                category: "basics".to_string(),
                difficulty: Difficulty::Beginner,
                position: 0,
                created_at: Default::default(),
                updated_at: Default::default(),
            },
            questions: Vec::new(),
        };

        let json: serde_json::Value = serde_json::to_value(&lesson).unwrap();
        assert_eq!(json["title"], "Greetings");
        assert!(json["questions"].as_array().unwrap().is_empty());
        assert!(json.get("lesson").is_none());
    }

    #[test]
    fn test_quiz_question_shape() {
        let question = QuizQuestion {
            vocabulary_id: 7,
            prompt_kind: PromptKind::WordToTranslation,
            prompt: "น้ำ".to_string(),
            prompt_romanization: Some("nam".to_string()),
            options: vec![
                "water".to_string(),
                "rice".to_string(),
                "fire".to_string(),
                "dog".to_string(),
            ],
            correct_index: 0,
            correct_answer: "water".to_string(),
        };

        let json: serde_json::Value = serde_json::to_value(&question).unwrap();
        assert_eq!(json["prompt_kind"], "word_to_translation");
        assert_eq!(json["options"].as_array().unwrap().len(), 4);
        assert_eq!(json["correct_index"], 0);
    }

    #[test]
    fn test_submit_arrangement_optional_fields() {
        let json = r#"{"question_id":3,"arranged_tokens":["ผม","ชื่อ","มาก"]}"#;
        let parsed: SubmitArrangement = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.question_id, 3);
        assert_eq!(parsed.arranged_tokens.len(), 3);
        assert!(parsed.user_id.is_none());
        assert!(parsed.time_spent_seconds.is_none());
    }
}
