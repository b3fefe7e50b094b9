//! Tokenisation, shuffling and grading for the arrange-the-sentence game.
//!
//! Sentences are stored as space-separated tokens. Thai script has no
//! spaces, so content authors segment the stored sentences manually.

use rand::{seq::SliceRandom, Rng};

/// How often a shuffle that reproduced the original order is repeated
/// before giving up and serving it anyway.
const MAXIMUM_RESHUFFLE_ATTEMPTS: usize = 10;

/// Split a stored sentence into its tokens.
pub fn tokenize(sentence: &str) -> Vec<String> {
    sentence.split_whitespace().map(str::to_string).collect()
}

/// Shuffle the tokens of a sentence uniformly.
///
/// If the shuffle comes out in the original order it is repeated a bounded
/// number of times. Sentences of fewer than two tokens are returned as-is.
pub fn shuffle_tokens(tokens: &[String], rng: &mut impl Rng) -> Vec<String> {
    let mut shuffled = tokens.to_vec();
    if tokens.len() < 2 {
        return shuffled;
    }

    for _ in 0..MAXIMUM_RESHUFFLE_ATTEMPTS {
        shuffled.shuffle(rng);
        if shuffled != tokens {
            break;
        }
    }

    shuffled
}

/// Grade an arrangement against the stored sentence.
pub fn grade(correct_answer: &str, arranged_tokens: &[String]) -> bool {
    tokenize(correct_answer) == arranged_tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("ผม ชื่อ สมชาย"), vec!["ผม", "ชื่อ", "สมชาย"]);
        assert_eq!(tokenize("  ผม  ชื่อ "), vec!["ผม", "ชื่อ"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_shuffle_permutes_without_losing_tokens() {
        let tokens = tokenize("หนึ่ง สอง สาม สี่ ห้า หก");

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let shuffled = shuffle_tokens(&tokens, &mut rng);

            let mut sorted_original = tokens.clone();
            let mut sorted_shuffled = shuffled.clone();
            sorted_original.sort();
            sorted_shuffled.sort();
            assert_eq!(sorted_original, sorted_shuffled);
        }
    }

    #[test]
    fn test_shuffle_usually_changes_the_order() {
        let tokens = tokenize("หนึ่ง สอง สาม สี่ ห้า หก");
        let mut unchanged = 0;

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            if shuffle_tokens(&tokens, &mut rng) == tokens {
                unchanged += 1;
            }
        }

        // With six tokens and bounded reshuffling, reproducing the original
        // order should be vanishingly rare.
        assert_eq!(unchanged, 0);
    }

    #[test]
    fn test_single_token_is_served_as_is() {
        let tokens = tokenize("สวัสดี");
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(shuffle_tokens(&tokens, &mut rng), tokens);
    }

    #[test]
    fn test_grading() {
        let correct = "ผม ชื่อ สมชาย";
        assert!(grade(correct, &tokenize("ผม ชื่อ สมชาย")));
        assert!(!grade(correct, &tokenize("ชื่อ ผม สมชาย")));
        assert!(!grade(correct, &tokenize("ผม ชื่อ")));
        assert!(!grade(correct, &[]));
    }
}
