// src/grading.rs

use std::collections::HashMap;

use serde::Serialize;

/// The score computed for one submission.
///
/// `total` is the assessment's full question count, not the number of
/// answers handed in: skipped questions count against the participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub correct: i64,
    pub total: i64,
    pub score_pct: i64,
    pub score10: f64,
}

/// Grades a set of submitted answers against the correct-choice map.
///
/// An answer counts as correct when the map holds its question id and the
/// stored choice id matches. Answers for unknown question ids neither score
/// nor penalize. A zero-question assessment grades to 0 across the board.
/// Rounding is `f64::round` (half away from zero) for the percentage, and
/// to one decimal for the 0-10 score.
pub fn grade(
    correct_choice_by_question: &HashMap<i64, i64>,
    answers: &[(i64, i64)],
    total_question_count: i64,
) -> Score {
    let correct = answers
        .iter()
        .filter(|(question_id, choice_id)| {
            correct_choice_by_question.get(question_id) == Some(choice_id)
        })
        .count() as i64;

    if total_question_count <= 0 {
        return Score {
            correct,
            total: 0,
            score_pct: 0,
            score10: 0.0,
        };
    }

    let ratio = correct as f64 / total_question_count as f64;
    let score_pct = (ratio * 100.0).round() as i64;
    let score10 = (ratio * 100.0).round() / 10.0;

    Score {
        correct,
        total: total_question_count,
        score_pct,
        score10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pairs: &[(i64, i64)]) -> HashMap<i64, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_grade_all_correct() {
        let correct = key(&[(1, 11), (2, 22), (3, 33), (4, 44)]);
        let answers = vec![(1, 11), (2, 22), (3, 33), (4, 44)];

        let score = grade(&correct, &answers, 4);
        assert_eq!(score.correct, 4);
        assert_eq!(score.total, 4);
        assert_eq!(score.score_pct, 100);
        assert_eq!(score.score10, 10.0);
    }

    #[test]
    fn test_grade_three_of_four() {
        let correct = key(&[(1, 11), (2, 22), (3, 33), (4, 44)]);
        let answers = vec![(1, 11), (2, 22), (3, 33), (4, 99)];

        let score = grade(&correct, &answers, 4);
        assert_eq!(score.correct, 3);
        assert_eq!(score.total, 4);
        assert_eq!(score.score_pct, 75);
        assert_eq!(score.score10, 7.5);
    }

    #[test]
    fn test_grade_order_independent() {
        let correct = key(&[(1, 11), (2, 22), (3, 33)]);
        let a = vec![(1, 11), (2, 99), (3, 33)];
        let b = vec![(3, 33), (1, 11), (2, 99)];

        assert_eq!(grade(&correct, &a, 3), grade(&correct, &b, 3));
    }

    #[test]
    fn test_grade_unknown_question_ids_ignored() {
        let correct = key(&[(1, 11), (2, 22)]);
        // Question 777 does not exist in the key: no credit, no penalty.
        let answers = vec![(1, 11), (777, 11)];

        let score = grade(&correct, &answers, 2);
        assert_eq!(score.correct, 1);
        assert_eq!(score.score_pct, 50);
        assert_eq!(score.score10, 5.0);
    }

    #[test]
    fn test_grade_skipped_questions_count_against_total() {
        let correct = key(&[(1, 11), (2, 22), (3, 33), (4, 44)]);
        // Only one question answered out of four.
        let answers = vec![(1, 11)];

        let score = grade(&correct, &answers, 4);
        assert_eq!(score.correct, 1);
        assert_eq!(score.total, 4);
        assert_eq!(score.score_pct, 25);
        assert_eq!(score.score10, 2.5);
    }

    #[test]
    fn test_grade_zero_questions_is_zero_not_panic() {
        let correct = HashMap::new();
        let score = grade(&correct, &[], 0);
        assert_eq!(score.correct, 0);
        assert_eq!(score.total, 0);
        assert_eq!(score.score_pct, 0);
        assert_eq!(score.score10, 0.0);
    }

    #[test]
    fn test_grade_one_decimal_rounding() {
        let correct = key(&[(1, 1), (2, 2), (3, 3)]);
        // 1/3: 33.333...% -> 33, and 3.333... -> 3.3
        let score = grade(&correct, &[(1, 1)], 3);
        assert_eq!(score.score_pct, 33);
        assert_eq!(score.score10, 3.3);

        // 2/3: 66.666...% -> 67, and 6.666... -> 6.7
        let score = grade(&correct, &[(1, 1), (2, 2)], 3);
        assert_eq!(score.score_pct, 67);
        assert_eq!(score.score10, 6.7);
    }
}
