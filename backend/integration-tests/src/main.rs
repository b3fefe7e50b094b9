use std::time::{SystemTime, UNIX_EPOCH};

use api_types::{
    ArrangeSentenceResponse, ArrangementGrade, CreateLesson, CreateQuestion, CreateVocabulary,
    Difficulty, GameKind, GameResultResponse, LessonWithQuestions, ProgressResponse,
    QuestionKind, QuestionResponse, ServiceStatusResponse, SubmitArrangement, SubmitGameResult,
    SubmitGameResultResponse, TtsRequest, UpdateLesson, UpdateProgress, UpdateVocabulary,
    VocabQuizResponse, VocabularyResponse,
};
use log::info;
use reqwest::StatusCode;
use simplelog::TermLogger;

use crate::util::{assert_json_response, assert_response_status, HttpClient};

mod util;

fn initialise_logging() {
    TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    info!("Logging initialised");
}

#[tokio::main]
async fn main() {
    initialise_logging();
    let client = HttpClient::new().await;

    // Make the test data of this run unique, so reruns against the same
    // database do not collide.
    let run_id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string();

    test_service_status(&client).await;
    test_vocabulary_crud(&client, &run_id).await;
    test_random_vocabulary(&client, &run_id).await;
    test_vocab_quiz(&client, &run_id).await;
    test_lessons_and_questions(&client, &run_id).await;
    test_arrange_sentence_flow(&client, &run_id).await;
    test_game_results_and_progress(&client, &run_id).await;
    test_tts_validation(&client).await;

    info!("Finished");
}

async fn create_vocabulary_entry(
    client: &HttpClient,
    word: String,
    translation: &str,
    category: &str,
    difficulty: Difficulty,
) -> VocabularyResponse {
    let response = client
        .post(
            "/vocabulary",
            CreateVocabulary {
                word,
                romanization: "rom".to_owned(),
                translation: translation.to_owned(),
                category: category.to_owned(),
                difficulty,
                example_sentence: None,
                example_translation: None,
            },
        )
        .await;
    assert_json_response(response, StatusCode::CREATED).await
}

async fn test_service_status(client: &HttpClient) {
    let status: ServiceStatusResponse =
        assert_json_response(client.get("/").await, StatusCode::OK).await;
    assert_eq!(status.service, "tvoc-backend");
    assert_eq!(status.status, "ok");

    info!("Service status ok");
}

async fn test_vocabulary_crud(client: &HttpClient, run_id: &str) {
    let category = format!("crud-{run_id}");

    let first = create_vocabulary_entry(
        client,
        format!("a-น้ำ-{run_id}"),
        "water",
        &category,
        Difficulty::Beginner,
    )
    .await;
    let second = create_vocabulary_entry(
        client,
        format!("b-ข้าว-{run_id}"),
        "rice",
        &category,
        Difficulty::Beginner,
    )
    .await;
    assert_eq!(first.frequency, 0);

    // Creating the same word again is a conflict.
    let response = client
        .post(
            "/vocabulary",
            CreateVocabulary {
                word: format!("a-น้ำ-{run_id}"),
                romanization: "nam".to_owned(),
                translation: "water".to_owned(),
                category: category.clone(),
                difficulty: Difficulty::Beginner,
                example_sentence: None,
                example_translation: None,
            },
        )
        .await;
    assert_response_status(response, StatusCode::CONFLICT).await;

    // Listing is ordered by word.
    let listed: Vec<VocabularyResponse> = assert_json_response(
        client
            .get(&format!("/vocabulary?category={category}"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(
        listed.iter().map(|entry| entry.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    // Fetch and update one entry.
    let fetched: VocabularyResponse = assert_json_response(
        client.get(&format!("/vocabulary/{}", first.id)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(fetched.translation, "water");

    let updated: VocabularyResponse = assert_json_response(
        client
            .put(
                &format!("/vocabulary/{}", first.id),
                UpdateVocabulary {
                    translation: Some("cold water".to_owned()),
                    ..Default::default()
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated.translation, "cold water");
    assert_eq!(updated.word, fetched.word);

    // An update without any fields is rejected.
    let response = client
        .put(
            &format!("/vocabulary/{}", first.id),
            UpdateVocabulary::default(),
        )
        .await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    // Unknown ids are not found.
    let response = client.get("/vocabulary/999999999").await;
    assert_response_status(response, StatusCode::NOT_FOUND).await;

    // Delete.
    let response = client.delete(&format!("/vocabulary/{}", second.id)).await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;
    let response = client.get(&format!("/vocabulary/{}", second.id)).await;
    assert_response_status(response, StatusCode::NOT_FOUND).await;

    info!("Vocabulary CRUD ok");
}

async fn test_random_vocabulary(client: &HttpClient, run_id: &str) {
    let category = format!("random-{run_id}");
    for (word, translation) in [("หมา", "dog"), ("แมว", "cat"), ("นก", "bird")] {
        create_vocabulary_entry(
            client,
            format!("{word}-{run_id}"),
            translation,
            &category,
            Difficulty::Beginner,
        )
        .await;
    }

    let sample: Vec<VocabularyResponse> = assert_json_response(
        client
            .get(&format!("/vocabulary/random?category={category}&count=2"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(sample.len(), 2);
    assert!(sample.iter().all(|entry| entry.category == category));

    info!("Random vocabulary ok");
}

async fn test_vocab_quiz(client: &HttpClient, run_id: &str) {
    let category = format!("quiz-{run_id}");
    for (word, translation) in [
        ("หนึ่ง", "one"),
        ("สอง", "two"),
        ("สาม", "three"),
        ("สี่", "four"),
        ("ห้า", "five"),
    ] {
        create_vocabulary_entry(
            client,
            format!("{word}-{run_id}"),
            translation,
            &category,
            Difficulty::Beginner,
        )
        .await;
    }

    let quiz: VocabQuizResponse = assert_json_response(
        client
            .get(&format!("/game/vocab-quiz?category={category}&count=3"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(quiz.questions.len(), 3);
    for question in &quiz.questions {
        assert_eq!(question.options.len(), 4);
        assert_eq!(
            question.options[question.correct_index],
            question.correct_answer
        );
        let mut distinct = question.options.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 4);
    }

    // Serving the quiz counts towards the frequency of the used entries.
    let listed: Vec<VocabularyResponse> = assert_json_response(
        client
            .get(&format!("/vocabulary?category={category}"))
            .await,
        StatusCode::OK,
    )
    .await;
    let total_frequency: i32 = listed.iter().map(|entry| entry.frequency).sum();
    assert_eq!(total_frequency, 3);

    // A category with a single entry cannot produce distractors.
    let thin_category = format!("thin-{run_id}");
    create_vocabulary_entry(
        client,
        format!("เดียว-{run_id}"),
        "single",
        &thin_category,
        Difficulty::Beginner,
    )
    .await;
    let response = client
        .get(&format!("/game/vocab-quiz?category={thin_category}"))
        .await;
    assert_response_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;

    info!("Vocabulary quiz ok");
}

async fn test_lessons_and_questions(client: &HttpClient, run_id: &str) {
    let category = format!("lesson-{run_id}");

    let lesson: LessonWithQuestions = {
        let lesson: api_types::LessonResponse = assert_json_response(
            client
                .post(
                    "/lessons",
                    CreateLesson {
                        title: format!("Greetings {run_id}"),
                        description: None,
                        category: category.clone(),
                        difficulty: Difficulty::Beginner,
                        position: Some(1),
                    },
                )
                .await,
            StatusCode::CREATED,
        )
        .await;
        assert_eq!(lesson.description, "");

        let question: QuestionResponse = assert_json_response(
            client
                .post(
                    "/questions",
                    CreateQuestion {
                        lesson_id: Some(lesson.id),
                        vocabulary_id: None,
                        kind: QuestionKind::MultipleChoice,
                        difficulty: Difficulty::Beginner,
                        prompt: "hello".to_owned(),
                        correct_answer: "สวัสดี".to_owned(),
                        choices: Some(vec![
                            "สวัสดี".to_owned(),
                            "ขอบคุณ".to_owned(),
                            "ลาก่อน".to_owned(),
                            "สบายดี".to_owned(),
                        ]),
                    },
                )
                .await,
            StatusCode::CREATED,
        )
        .await;
        assert_eq!(question.lesson_id, Some(lesson.id));

        assert_json_response(
            client.get(&format!("/lessons/{}", lesson.id)).await,
            StatusCode::OK,
        )
        .await
    };
    assert_eq!(lesson.questions.len(), 1);
    assert_eq!(lesson.questions[0].choices.len(), 4);

    // Listing questions by lesson.
    let questions: Vec<QuestionResponse> = assert_json_response(
        client
            .get(&format!("/questions?lesson_id={}", lesson.lesson.id))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(questions.len(), 1);

    let updated: api_types::LessonResponse = assert_json_response(
        client
            .put(
                &format!("/lessons/{}", lesson.lesson.id),
                UpdateLesson {
                    position: Some(7),
                    ..Default::default()
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated.position, 7);

    let response = client
        .put(
            &format!("/lessons/{}", lesson.lesson.id),
            UpdateLesson::default(),
        )
        .await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    // Deleting the lesson detaches its questions instead of deleting them.
    let response = client.delete(&format!("/lessons/{}", lesson.lesson.id)).await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;

    let detached: QuestionResponse = assert_json_response(
        client
            .get(&format!("/questions/{}", lesson.questions[0].id))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(detached.lesson_id, None);

    // Clean up.
    let response = client
        .delete(&format!("/questions/{}", detached.id))
        .await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;

    info!("Lessons and questions ok");
}

async fn test_arrange_sentence_flow(client: &HttpClient, run_id: &str) {
    let question: QuestionResponse = assert_json_response(
        client
            .post(
                "/questions",
                CreateQuestion {
                    lesson_id: None,
                    vocabulary_id: None,
                    kind: QuestionKind::ArrangeSentence,
                    difficulty: Difficulty::Advanced,
                    prompt: "My name is Somchai".to_owned(),
                    correct_answer: "ผม ชื่อ สมชาย".to_owned(),
                    choices: None,
                },
            )
            .await,
        StatusCode::CREATED,
    )
    .await;

    let round: ArrangeSentenceResponse = assert_json_response(
        client.get("/arrange-sentence/advanced?count=50").await,
        StatusCode::OK,
    )
    .await;
    let item = round
        .sentences
        .iter()
        .find(|item| item.question_id == question.id)
        .expect("the new question should be part of a full sample");
    let mut tokens = item.tokens.clone();
    tokens.sort();
    assert_eq!(tokens, vec!["ชื่อ", "ผม", "สมชาย"]);

    let response = client.get("/arrange-sentence/expert").await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    // A correct arrangement earns diamonds and touches the progress.
    let user_id = format!("arrange-user-{run_id}");
    let grade: ArrangementGrade = assert_json_response(
        client
            .post(
                "/arrange-sentence/submit",
                SubmitArrangement {
                    question_id: question.id,
                    arranged_tokens: vec![
                        "ผม".to_owned(),
                        "ชื่อ".to_owned(),
                        "สมชาย".to_owned(),
                    ],
                    user_id: Some(user_id.clone()),
                    time_spent_seconds: Some(12),
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert!(grade.correct);
    assert_eq!(grade.correct_sentence, "ผม ชื่อ สมชาย");
    assert_eq!(grade.diamonds_earned, 2);
    assert_eq!(grade.xp_earned, 10);
    let progress = grade.progress.expect("progress should be returned");
    assert_eq!(progress.total_diamonds, 2);
    assert_eq!(progress.games_played, 0);
    assert_eq!(progress.current_streak, 1);

    // An incorrect arrangement earns nothing.
    let grade: ArrangementGrade = assert_json_response(
        client
            .post(
                "/arrange-sentence/submit",
                SubmitArrangement {
                    question_id: question.id,
                    arranged_tokens: vec![
                        "ชื่อ".to_owned(),
                        "ผม".to_owned(),
                        "สมชาย".to_owned(),
                    ],
                    user_id: Some(user_id.clone()),
                    time_spent_seconds: None,
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert!(!grade.correct);
    assert_eq!(grade.diamonds_earned, 0);
    assert_eq!(
        grade.progress.expect("progress should be returned").total_diamonds,
        2
    );

    let response = client
        .post(
            "/arrange-sentence/submit",
            SubmitArrangement {
                question_id: 999999999,
                arranged_tokens: vec!["ผม".to_owned()],
                user_id: None,
                time_spent_seconds: None,
            },
        )
        .await;
    assert_response_status(response, StatusCode::NOT_FOUND).await;

    // Clean up.
    let response = client.delete(&format!("/questions/{}", question.id)).await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;
    let response = client.delete(&format!("/progress/{user_id}")).await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;

    info!("Arrange sentence flow ok");
}

async fn test_game_results_and_progress(client: &HttpClient, run_id: &str) {
    let user_id = format!("game-user-{run_id}");

    // 8 of 10 correct in two minutes: no bonuses.
    let submitted: SubmitGameResultResponse = assert_json_response(
        client
            .post(
                "/game/results",
                SubmitGameResult {
                    user_id: user_id.clone(),
                    game_kind: GameKind::VocabQuiz,
                    total_questions: 10,
                    correct_answers: 8,
                    time_spent_seconds: 120,
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(submitted.result.diamonds_earned, 16);
    assert_eq!(submitted.result.xp_earned, 80);
    assert_eq!(submitted.progress.total_diamonds, 16);
    assert_eq!(submitted.progress.total_xp, 80);
    assert_eq!(submitted.progress.games_played, 1);
    assert_eq!(submitted.progress.current_streak, 1);

    // A perfect and fast game earns both bonuses.
    let submitted: SubmitGameResultResponse = assert_json_response(
        client
            .post(
                "/game/results",
                SubmitGameResult {
                    user_id: user_id.clone(),
                    game_kind: GameKind::ArrangeSentence,
                    total_questions: 5,
                    correct_answers: 5,
                    time_spent_seconds: 30,
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(submitted.result.diamonds_earned, 25);
    assert_eq!(submitted.result.xp_earned, 70);
    assert_eq!(submitted.progress.total_diamonds, 41);
    assert_eq!(submitted.progress.total_xp, 150);
    assert_eq!(submitted.progress.games_played, 2);
    // Same day, so the streak does not grow.
    assert_eq!(submitted.progress.current_streak, 1);
    assert_eq!(submitted.progress.longest_streak, 1);

    // The history is newest first.
    let results: Vec<GameResultResponse> = assert_json_response(
        client.get(&format!("/game/results/{user_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].game_kind, GameKind::ArrangeSentence);
    assert_eq!(results[1].game_kind, GameKind::VocabQuiz);

    let results: Vec<GameResultResponse> = assert_json_response(
        client
            .get(&format!("/game/results/{user_id}?limit=1"))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(results.len(), 1);

    // Invalid submissions are rejected, including counts past the configured
    // maximum, whose awards would not fit the scoring arithmetic.
    for (total_questions, correct_answers, time_spent_seconds) in [
        (0, 0, 10),
        (5, 6, 10),
        (5, -1, 10),
        (5, 3, -1),
        (51, 51, 10),
        (2_000_000_000, 2_000_000_000, 120),
    ] {
        let response = client
            .post(
                "/game/results",
                SubmitGameResult {
                    user_id: user_id.clone(),
                    game_kind: GameKind::VocabQuiz,
                    total_questions,
                    correct_answers,
                    time_spent_seconds,
                },
            )
            .await;
        assert_response_status(response, StatusCode::BAD_REQUEST).await;
    }

    // The progress endpoint returns the same numbers.
    let progress: ProgressResponse = assert_json_response(
        client.get(&format!("/progress/{user_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(progress.total_diamonds, 41);
    assert_eq!(progress.games_played, 2);

    // Partial progress update.
    let progress: ProgressResponse = assert_json_response(
        client
            .put(
                &format!("/progress/{user_id}"),
                UpdateProgress {
                    total_diamonds: Some(100),
                    ..Default::default()
                },
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(progress.total_diamonds, 100);
    assert_eq!(progress.total_xp, 150);

    let response = client
        .put(&format!("/progress/{user_id}"), UpdateProgress::default())
        .await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    // Reset.
    let response = client.delete(&format!("/progress/{user_id}")).await;
    assert_response_status(response, StatusCode::NO_CONTENT).await;
    let response = client.get(&format!("/progress/{user_id}")).await;
    assert_response_status(response, StatusCode::NOT_FOUND).await;

    info!("Game results and progress ok");
}

async fn test_tts_validation(client: &HttpClient) {
    let response = client
        .post(
            "/tts",
            TtsRequest {
                text: "   ".to_owned(),
            },
        )
        .await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    let response = client
        .post(
            "/tts",
            TtsRequest {
                text: "ก".repeat(600),
            },
        )
        .await;
    assert_response_status(response, StatusCode::BAD_REQUEST).await;

    // The test environment configures no provider keys.
    let response = client
        .post(
            "/tts",
            TtsRequest {
                text: "สวัสดีครับ".to_owned(),
            },
        )
        .await;
    assert_response_status(response, StatusCode::SERVICE_UNAVAILABLE).await;

    info!("Text-to-speech validation ok");
}
