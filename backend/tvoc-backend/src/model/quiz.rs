//! Multiple-choice question assembly for the vocabulary quiz.

use api_types::{PromptKind, QuizQuestion};
use rand::{seq::SliceRandom, Rng};

use crate::database::model::Vocabulary;

/// The number of incorrect options per question.
pub const DISTRACTOR_COUNT: usize = 3;

/// Build one multiple-choice question per sampled vocabulary entry.
///
/// The prompt direction is chosen at random per question. Distractors are
/// drawn from `distractor_pool`, excluding the entry itself, and must be
/// non-empty, distinct from the correct answer and from each other. Entries
/// for which not enough distractors can be found are skipped.
///
/// The correct option's index is sampled uniformly from all four positions.
pub fn build_quiz_questions(
    entries: &[Vocabulary],
    distractor_pool: &[Vocabulary],
    rng: &mut impl Rng,
) -> Vec<QuizQuestion> {
    entries
        .iter()
        .filter_map(|entry| build_quiz_question(entry, distractor_pool, rng))
        .collect()
}

fn build_quiz_question(
    entry: &Vocabulary,
    distractor_pool: &[Vocabulary],
    rng: &mut impl Rng,
) -> Option<QuizQuestion> {
    let prompt_kind = if rng.gen_bool(0.5) {
        PromptKind::WordToTranslation
    } else {
        PromptKind::TranslationToWord
    };

    let (prompt, prompt_romanization, correct_answer) = match prompt_kind {
        PromptKind::WordToTranslation => (
            entry.word.clone(),
            Some(entry.romanization.clone()),
            entry.translation.clone(),
        ),
        PromptKind::TranslationToWord => (entry.translation.clone(), None, entry.word.clone()),
    };

    let mut candidates: Vec<String> = Vec::new();
    for other in distractor_pool {
        if other.id == entry.id {
            continue;
        }

        let candidate = match prompt_kind {
            PromptKind::WordToTranslation => &other.translation,
            PromptKind::TranslationToWord => &other.word,
        };

        if candidate.is_empty()
            || candidate == &correct_answer
            || candidates.contains(candidate)
        {
            continue;
        }

        candidates.push(candidate.clone());
    }

    if candidates.len() < DISTRACTOR_COUNT {
        return None;
    }

    candidates.shuffle(rng);
    candidates.truncate(DISTRACTOR_COUNT);

    let correct_index = rng.gen_range(0..=DISTRACTOR_COUNT);
    let mut options = candidates;
    options.insert(correct_index, correct_answer.clone());

    Some(QuizQuestion {
        vocabulary_id: entry.id,
        prompt_kind,
        prompt,
        prompt_romanization,
        options,
        correct_index,
        correct_answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn vocabulary(id: i64, word: &str, romanization: &str, translation: &str) -> Vocabulary {
        Vocabulary {
            id,
            word: word.to_string(),
            romanization: romanization.to_string(),
            translation: translation.to_string(),
            category: "basics".to_string(),
            difficulty: "beginner".to_string(),
            example_sentence: None,
            example_translation: None,
            frequency: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn pool() -> Vec<Vocabulary> {
        vec![
            vocabulary(1, "น้ำ", "nam", "water"),
            vocabulary(2, "ข้าว", "khao", "rice"),
            vocabulary(3, "ไฟ", "fai", "fire"),
            vocabulary(4, "หมา", "ma", "dog"),
            vocabulary(5, "แมว", "maeo", "cat"),
        ]
    }

    #[test]
    fn test_question_shape_invariants() {
        let pool = pool();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let questions = build_quiz_questions(&pool[..2], &pool, &mut rng);
            assert_eq!(questions.len(), 2);

            for question in &questions {
                assert_eq!(question.options.len(), DISTRACTOR_COUNT + 1);
                assert_eq!(
                    question.options[question.correct_index],
                    question.correct_answer
                );

                // The correct answer appears exactly once and the options are distinct.
                let distinct: HashSet<_> = question.options.iter().collect();
                assert_eq!(distinct.len(), question.options.len());

                match question.prompt_kind {
                    PromptKind::WordToTranslation => {
                        assert!(question.prompt_romanization.is_some())
                    }
                    PromptKind::TranslationToWord => {
                        assert!(question.prompt_romanization.is_none())
                    }
                }
            }
        }
    }

    #[test]
    fn test_correct_index_covers_all_positions() {
        let pool = pool();
        let mut seen_indices = HashSet::new();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            for question in build_quiz_questions(&pool[..1], &pool, &mut rng) {
                seen_indices.insert(question.correct_index);
            }
        }

        assert_eq!(seen_indices, HashSet::from([0, 1, 2, 3]));
    }

    #[test]
    fn test_entry_is_skipped_when_pool_is_too_thin() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(0);

        // Only two other entries, so no three distractors exist.
        let questions = build_quiz_questions(&pool[..1], &pool[..3], &mut rng);
        assert!(questions.is_empty());
    }

    #[test]
    fn test_duplicate_translations_are_not_used_twice() {
        let mut pool = pool();
        // Two entries translating to the same English word.
        pool.push(vocabulary(6, "สุนัข", "sunak", "dog"));

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for question in build_quiz_questions(&pool[..1], &pool, &mut rng) {
                let distinct: HashSet<_> = question.options.iter().collect();
                assert_eq!(distinct.len(), question.options.len());
            }
        }
    }

    #[test]
    fn test_distractors_never_include_the_entry_itself() {
        let pool = pool();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for question in build_quiz_questions(&pool, &pool, &mut rng) {
                let entry = pool
                    .iter()
                    .find(|entry| entry.id == question.vocabulary_id)
                    .unwrap();
                let own_answer = match question.prompt_kind {
                    PromptKind::WordToTranslation => &entry.translation,
                    PromptKind::TranslationToWord => &entry.word,
                };
                assert_eq!(
                    question
                        .options
                        .iter()
                        .filter(|option| option == &own_answer)
                        .count(),
                    1
                );
            }
        }
    }
}
