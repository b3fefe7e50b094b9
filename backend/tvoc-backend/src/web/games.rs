use api_types::{
    GameResultResponse, GameResultsQuery, SubmitGameResult, SubmitGameResultResponse,
    VocabQuizQuery, VocabQuizResponse,
};
use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use diesel_async::AsyncPgConnection;
use tracing::instrument;

use crate::{
    database::model::{GameResult, NewGameResult, UserProgress, UserProgressUpsert, Vocabulary},
    error::{TvocError, TvocResult, UserError},
    model::{
        quiz::build_quiz_questions,
        scoring::{advance_streak, compute_award, GameAward},
    },
};

use super::{clamp_page_limit, WebConfiguration, WebDatabaseConnectionPool};

/// How many rows beyond the requested question count are loaded as
/// distractor candidates.
const DISTRACTOR_POOL_MARGIN: i64 = 200;

/// Generate a multiple-choice vocabulary quiz.
///
/// Sampling and the frequency increments of the used entries happen in one
/// serializable transaction.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn generate_vocab_quiz(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Query(query): Query<VocabQuizQuery>,
) -> TvocResult<Json<VocabQuizResponse>> {
    let count = configuration.clamp_question_count(query.count);
    let query = &query;

    let quiz_questions = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;
                    use rand::{rngs::StdRng, SeedableRng};

                    let mut pool_query = vocabulary.into_boxed();
                    if let Some(filter_category) = &query.category {
                        pool_query = pool_query.filter(category.eq(filter_category));
                    }
                    if let Some(filter_difficulty) = &query.difficulty {
                        pool_query = pool_query.filter(difficulty.eq(filter_difficulty.as_ref()));
                    }

                    // The matching entries double as the distractor pool.
                    // The pool is bounded, so an unfiltered request does not
                    // load the whole table.
                    let sampled: Vec<Vocabulary> = pool_query
                        .select(Vocabulary::as_select())
                        .order(crate::database::random())
                        .limit(count.saturating_add(DISTRACTOR_POOL_MARGIN))
                        .load(database_connection)
                        .await?;

                    let mut rng = StdRng::from_entropy();
                    let entry_count = (count as usize).min(sampled.len());
                    let quiz_questions =
                        build_quiz_questions(&sampled[..entry_count], &sampled, &mut rng);

                    if quiz_questions.is_empty() {
                        return Err(TvocError::from(UserError::NotEnoughVocabulary).into());
                    }

                    let used_ids: Vec<i64> = quiz_questions
                        .iter()
                        .map(|question| question.vocabulary_id)
                        .collect();
                    diesel::update(vocabulary.filter(id.eq_any(&used_ids)))
                        .set(frequency.eq(frequency + 1))
                        .execute(database_connection)
                        .await?;

                    Ok(quiz_questions)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(Json(VocabQuizResponse {
        questions: quiz_questions,
    }))
}

/// Store a finished game and apply its award to the user's progress, both in
/// one serializable transaction.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn submit_game_result(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Json(submission): Json<SubmitGameResult>,
) -> TvocResult<Json<SubmitGameResultResponse>> {
    if submission.total_questions <= 0 {
        return Err(UserError::NonPositiveQuestionCount.into());
    }
    // No game is ever served with more questions than the configured
    // maximum, and the bound keeps the award arithmetic within i32.
    if i64::from(submission.total_questions) > configuration.quiz_maximum_question_count {
        return Err(UserError::TooManyQuestions {
            count: submission.total_questions,
            maximum: configuration.quiz_maximum_question_count,
        }
        .into());
    }
    if submission.correct_answers < 0 || submission.correct_answers > submission.total_questions {
        return Err(UserError::CorrectAnswersOutOfRange.into());
    }
    if submission.time_spent_seconds < 0 {
        return Err(UserError::NegativeTimeSpent.into());
    }

    let award = compute_award(
        submission.total_questions,
        submission.correct_answers,
        submission.time_spent_seconds,
    );
    let now = Utc::now();
    let submission = &submission;

    let (stored_result, progress) = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::game_results::dsl::*;
                    use diesel::SelectableHelper;
                    use diesel_async::RunQueryDsl;

                    let new_game_result = NewGameResult {
                        user_id: &submission.user_id,
                        game_kind: submission.game_kind.as_ref(),
                        total_questions: submission.total_questions,
                        correct_answers: submission.correct_answers,
                        time_spent_seconds: submission.time_spent_seconds,
                        diamonds_earned: award.diamonds,
                        xp_earned: award.xp,
                    };

                    let stored_result: GameResult = diesel::insert_into(game_results)
                        .values(&new_game_result)
                        .returning(GameResult::as_returning())
                        .get_result(database_connection)
                        .await?;

                    let progress = apply_award_to_progress(
                        database_connection,
                        &submission.user_id,
                        award,
                        true,
                        now,
                    )
                    .await?;

                    Ok((stored_result, progress))
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(Json(SubmitGameResultResponse {
        result: stored_result.try_into()?,
        progress: progress.into(),
    }))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn list_game_results(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(target_user_id): Path<String>,
    Query(query): Query<GameResultsQuery>,
) -> TvocResult<Json<Vec<GameResultResponse>>> {
    let limit = clamp_page_limit(query.limit);
    let target_user_id = &target_user_id;

    let results = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::game_results::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(game_results
                        .filter(user_id.eq(target_user_id.as_str()))
                        .select(GameResult::as_select())
                        .order((played_at.desc(), id.desc()))
                        .limit(limit)
                        .load(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(Json(
        results
            .into_iter()
            .map(GameResultResponse::try_from)
            .collect::<TvocResult<_>>()?,
    ))
}

/// Add an award to a user's progress, advancing the streak.
///
/// Must run inside a serializable transaction, the caller owns the retry
/// handling.
pub(super) async fn apply_award_to_progress(
    database_connection: &mut AsyncPgConnection,
    user_id: &str,
    award: GameAward,
    count_game: bool,
    now: DateTime<Utc>,
) -> Result<UserProgress, diesel::result::Error> {
    use crate::database::schema::user_progress;
    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
    use diesel_async::RunQueryDsl;

    let existing: Option<UserProgress> = user_progress::table
        .find(user_id)
        .select(UserProgress::as_select())
        .first(database_connection)
        .await
        .optional()?;

    let (current_streak, longest_streak) = advance_streak(
        existing
            .as_ref()
            .map_or(0, |progress| progress.current_streak),
        existing
            .as_ref()
            .map_or(0, |progress| progress.longest_streak),
        existing
            .as_ref()
            .and_then(|progress| progress.last_played_at),
        now,
    );

    let upsert = UserProgressUpsert {
        user_id: user_id.to_string(),
        total_diamonds: existing.as_ref().map_or(0, |progress| progress.total_diamonds)
            + i64::from(award.diamonds),
        total_xp: existing.as_ref().map_or(0, |progress| progress.total_xp)
            + i64::from(award.xp),
        games_played: existing.as_ref().map_or(0, |progress| progress.games_played)
            + i32::from(count_game),
        current_streak,
        longest_streak,
        last_played_at: Some(now),
    };

    diesel::insert_into(user_progress::table)
        .values(&upsert)
        .on_conflict(user_progress::user_id)
        .do_update()
        .set(&upsert)
        .returning(UserProgress::as_returning())
        .get_result(database_connection)
        .await
}
