use std::str::FromStr;

use api_types::{
    ArrangeSentenceItem, ArrangeSentenceQuery, ArrangeSentenceResponse, ArrangementGrade,
    Difficulty, ProgressResponse, QuestionKind, SubmitArrangement,
};
use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tracing::instrument;

use crate::{
    database::model::{Question, UserProgress},
    error::{TvocError, TvocResult, UserError},
    model::{
        arrange::{grade, shuffle_tokens, tokenize},
        scoring::arrangement_award,
    },
};

use super::{games::apply_award_to_progress, WebConfiguration, WebDatabaseConnectionPool};

/// Serve a round of arrange-the-sentence questions of one difficulty.
///
/// The token shuffle happens outside the transaction, so a retried
/// transaction does not reshuffle.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn generate_arrange_sentence(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(requested_difficulty): Path<String>,
    Query(query): Query<ArrangeSentenceQuery>,
) -> TvocResult<Json<ArrangeSentenceResponse>> {
    let requested_difficulty =
        Difficulty::from_str(&requested_difficulty).map_err(|_| UserError::InvalidDifficulty {
            value: requested_difficulty.clone(),
        })?;
    let count = configuration.clamp_question_count(query.count);

    let sampled = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(questions
                        .filter(kind.eq(QuestionKind::ArrangeSentence.as_ref()))
                        .filter(difficulty.eq(requested_difficulty.as_ref()))
                        .select(Question::as_select())
                        .order(crate::database::random())
                        .limit(count)
                        .load::<Question>(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    if sampled.is_empty() {
        return Err(UserError::NoArrangeSentenceQuestions {
            difficulty: requested_difficulty.to_string(),
        }
        .into());
    }

    let mut rng = StdRng::from_entropy();
    let sentences = sampled
        .into_iter()
        .map(|question| {
            let tokens = tokenize(&question.correct_answer);
            ArrangeSentenceItem {
                question_id: question.id,
                prompt: question.prompt,
                tokens: shuffle_tokens(&tokens, &mut rng),
            }
        })
        .collect();

    Ok(Json(ArrangeSentenceResponse { sentences }))
}

/// Grade an arrangement.
///
/// When the submission carries a user id, a correct arrangement's award is
/// applied to that user's progress in the same transaction.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn submit_arrangement(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Json(submission): Json<SubmitArrangement>,
) -> TvocResult<Json<ArrangementGrade>> {
    if submission.time_spent_seconds.unwrap_or(0) < 0 {
        return Err(UserError::NegativeTimeSpent.into());
    }

    let now = Utc::now();
    let submission = &submission;

    let (question, correct, progress) = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let question: Question = questions
                        .find(submission.question_id)
                        .select(Question::as_select())
                        .first(database_connection)
                        .await
                        .optional()?
                        .ok_or_else(|| {
                            TvocError::from(UserError::QuestionNotFound {
                                id: submission.question_id,
                            })
                        })?;

                    let correct = grade(&question.correct_answer, &submission.arranged_tokens);

                    let progress: Option<UserProgress> = match &submission.user_id {
                        Some(submission_user_id) if correct => Some(
                            apply_award_to_progress(
                                database_connection,
                                submission_user_id,
                                arrangement_award(true),
                                false,
                                now,
                            )
                            .await?,
                        ),
                        Some(submission_user_id) => {
                            use crate::database::schema::user_progress;

                            user_progress::table
                                .find(submission_user_id.as_str())
                                .select(UserProgress::as_select())
                                .first(database_connection)
                                .await
                                .optional()?
                        }
                        None => None,
                    };

                    Ok((question, correct, progress))
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    let award = arrangement_award(correct);
    Ok(Json(ArrangementGrade {
        correct,
        correct_sentence: question.correct_answer,
        diamonds_earned: award.diamonds,
        xp_earned: award.xp,
        progress: progress.map(ProgressResponse::from),
    }))
}
