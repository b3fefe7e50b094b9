use api_types::{
    Difficulty, GameKind, GameResultResponse, LessonResponse, ProgressResponse, QuestionKind,
    QuestionResponse, VocabularyResponse,
};
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};

use crate::error::{TvocError, TvocResult};

#[derive(Insertable, Queryable, Selectable, Identifiable, AsChangeset, Clone, Debug)]
#[diesel(table_name = crate::database::schema::job_queue)]
#[diesel(primary_key(name))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduledJob {
    pub scheduled_execution_time: DateTime<Utc>,
    pub name: String,
    pub in_progress: bool,
}

impl ScheduledJob {
    /// Sets `in_progress` to `true`, but panics if it was set to true already.
    pub fn set_in_progress(mut self) -> Self {
        assert!(!self.in_progress);
        self.in_progress = true;
        self
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::vocabulary)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Vocabulary {
    pub id: i64,
    pub word: String,
    pub romanization: String,
    pub translation: String,
    pub category: String,
    pub difficulty: String,
    pub example_sentence: Option<String>,
    pub example_translation: Option<String>,
    pub frequency: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::database::schema::vocabulary)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewVocabulary<'a> {
    pub word: &'a str,
    pub romanization: &'a str,
    pub translation: &'a str,
    pub category: &'a str,
    pub difficulty: &'a str,
    pub example_sentence: Option<&'a str>,
    pub example_translation: Option<&'a str>,
}

/// Partial update of a vocabulary entry. `None` fields are left unchanged.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::database::schema::vocabulary)]
pub struct VocabularyChangeset<'a> {
    pub word: Option<&'a str>,
    pub romanization: Option<&'a str>,
    pub translation: Option<&'a str>,
    pub category: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub example_sentence: Option<&'a str>,
    pub example_translation: Option<&'a str>,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::database::schema::lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewLesson<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub difficulty: &'a str,
    pub position: i32,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::database::schema::lessons)]
pub struct LessonChangeset<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub position: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Question {
    pub id: i64,
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: String,
    pub difficulty: String,
    pub prompt: String,
    pub correct_answer: String,
    pub choices: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::database::schema::questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewQuestion<'a> {
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: &'a str,
    pub difficulty: &'a str,
    pub prompt: &'a str,
    pub correct_answer: &'a str,
    pub choices: Vec<String>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::database::schema::questions)]
pub struct QuestionChangeset<'a> {
    pub lesson_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub kind: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub correct_answer: Option<&'a str>,
    pub choices: Option<Vec<String>>,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::user_progress)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserProgress {
    pub user_id: String,
    pub total_diamonds: i64,
    pub total_xp: i64,
    pub games_played: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_played_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update image of a progress row. `updated_at` is maintained by
/// the database.
#[derive(Insertable, AsChangeset, Clone, Debug)]
#[diesel(table_name = crate::database::schema::user_progress)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserProgressUpsert {
    pub user_id: String,
    pub total_diamonds: i64,
    pub total_xp: i64,
    pub games_played: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_played_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::game_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GameResult {
    pub id: i64,
    pub user_id: String,
    pub game_kind: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_spent_seconds: i32,
    pub diamonds_earned: i32,
    pub xp_earned: i32,
    pub played_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::database::schema::game_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewGameResult<'a> {
    pub user_id: &'a str,
    pub game_kind: &'a str,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_spent_seconds: i32,
    pub diamonds_earned: i32,
    pub xp_earned: i32,
}

fn parse_db_enum<T: std::str::FromStr>(column: &'static str, value: &str) -> TvocResult<T> {
    T::from_str(value).map_err(|_| TvocError::MalformedDatabaseValue {
        column,
        value: value.to_string(),
    })
}

impl TryFrom<Vocabulary> for VocabularyResponse {
    type Error = TvocError;

    fn try_from(vocabulary: Vocabulary) -> TvocResult<Self> {
        Ok(Self {
            difficulty: parse_db_enum::<Difficulty>("difficulty", &vocabulary.difficulty)?,
            id: vocabulary.id,
            word: vocabulary.word,
            romanization: vocabulary.romanization,
            translation: vocabulary.translation,
            category: vocabulary.category,
            example_sentence: vocabulary.example_sentence,
            example_translation: vocabulary.example_translation,
            frequency: vocabulary.frequency,
            created_at: vocabulary.created_at,
            updated_at: vocabulary.updated_at,
        })
    }
}

impl TryFrom<Lesson> for LessonResponse {
    type Error = TvocError;

    fn try_from(lesson: Lesson) -> TvocResult<Self> {
        Ok(Self {
            difficulty: parse_db_enum::<Difficulty>("difficulty", &lesson.difficulty)?,
            id: lesson.id,
            title: lesson.title,
            description: lesson.description,
            category: lesson.category,
            position: lesson.position,
            created_at: lesson.created_at,
            updated_at: lesson.updated_at,
        })
    }
}

impl TryFrom<Question> for QuestionResponse {
    type Error = TvocError;

    fn try_from(question: Question) -> TvocResult<Self> {
        Ok(Self {
            kind: parse_db_enum::<QuestionKind>("kind", &question.kind)?,
            difficulty: parse_db_enum::<Difficulty>("difficulty", &question.difficulty)?,
            id: question.id,
            lesson_id: question.lesson_id,
            vocabulary_id: question.vocabulary_id,
            prompt: question.prompt,
            correct_answer: question.correct_answer,
            choices: question.choices,
            created_at: question.created_at,
            updated_at: question.updated_at,
        })
    }
}

impl From<UserProgress> for ProgressResponse {
    fn from(progress: UserProgress) -> Self {
        Self {
            user_id: progress.user_id,
            total_diamonds: progress.total_diamonds,
            total_xp: progress.total_xp,
            games_played: progress.games_played,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            last_played_at: progress.last_played_at,
            updated_at: progress.updated_at,
        }
    }
}

impl TryFrom<GameResult> for GameResultResponse {
    type Error = TvocError;

    fn try_from(game_result: GameResult) -> TvocResult<Self> {
        Ok(Self {
            game_kind: parse_db_enum::<GameKind>("game_kind", &game_result.game_kind)?,
            id: game_result.id,
            user_id: game_result.user_id,
            total_questions: game_result.total_questions,
            correct_answers: game_result.correct_answers,
            time_spent_seconds: game_result.time_spent_seconds,
            diamonds_earned: game_result.diamonds_earned,
            xp_earned: game_result.xp_earned,
            played_at: game_result.played_at,
        })
    }
}
