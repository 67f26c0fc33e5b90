/// Quiz grading and attempt submission
///
/// A question counts as correct only when the set of selected options equals
/// the set of options flagged correct. There is no partial credit, and an
/// unanswered question is simply wrong.
///
/// ```text
/// score  = round(100 * correct / total)
/// passed = score >= passing_score
/// ```
///
/// The first passing attempt of a student on a quiz awards
/// `quiz_pass_points` from the platform settings.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::models::quiz::{CreateAttempt, QuestionWithOptions, Quiz, QuizAttempt};
use crate::models::setting::{PlatformSetting, SettingKey};

/// Error type for grading and submission
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("Quiz not found")]
    QuizNotFound,

    #[error("Quiz is not published")]
    NotPublished,

    #[error("Quiz has no questions")]
    NoQuestions,

    #[error("Question {0} does not belong to this quiz")]
    UnknownQuestion(Uuid),

    #[error("Option {option_id} does not belong to question {question_id}")]
    UnknownOption { question_id: Uuid, option_id: Uuid },

    #[error("Question {0} was answered more than once")]
    DuplicateAnswer(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Selected options for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    #[serde(default)]
    pub option_ids: Vec<Uuid>,
}

/// Result of grading, before anything is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub correct_count: i32,
    pub total_questions: i32,
    pub score: i32,
    pub passed: bool,
    /// Every (question, option) pair selected, deduplicated
    pub selections: Vec<(Uuid, Uuid)>,
}

/// `round(100 * correct / total)`, rounding halves up
pub fn percent_score(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let (correct, total) = (i64::from(correct), i64::from(total));
    ((200 * correct + total) / (2 * total)) as i32
}

/// Grades `answers` against the quiz's questions
///
/// # Errors
///
/// - [`GradingError::NoQuestions`] if the quiz is empty
/// - [`GradingError::UnknownQuestion`] / [`GradingError::UnknownOption`] for IDs
///   that are not part of the quiz
/// - [`GradingError::DuplicateAnswer`] if a question appears twice
pub fn grade(
    questions: &[QuestionWithOptions],
    answers: &[AnswerSubmission],
    passing_score: i32,
) -> Result<GradeOutcome, GradingError> {
    if questions.is_empty() {
        return Err(GradingError::NoQuestions);
    }

    let by_id: HashMap<Uuid, &QuestionWithOptions> =
        questions.iter().map(|q| (q.question.id, q)).collect();

    let mut seen = HashSet::new();
    let mut selected: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();

    for answer in answers {
        let question = by_id
            .get(&answer.question_id)
            .ok_or(GradingError::UnknownQuestion(answer.question_id))?;

        if !seen.insert(answer.question_id) {
            return Err(GradingError::DuplicateAnswer(answer.question_id));
        }

        let chosen = selected.entry(answer.question_id).or_default();
        for option_id in &answer.option_ids {
            if !question.options.iter().any(|o| o.id == *option_id) {
                return Err(GradingError::UnknownOption {
                    question_id: answer.question_id,
                    option_id: *option_id,
                });
            }
            chosen.insert(*option_id);
        }
    }

    let correct_count = questions
        .iter()
        .filter(|q| {
            let expected: BTreeSet<Uuid> = q
                .options
                .iter()
                .filter(|o| o.is_correct)
                .map(|o| o.id)
                .collect();
            selected.get(&q.question.id).is_some_and(|s| *s == expected)
        })
        .count() as i32;

    let total_questions = questions.len() as i32;
    let score = percent_score(correct_count, total_questions);

    let selections = questions
        .iter()
        .filter_map(|q| selected.get(&q.question.id).map(|s| (q.question.id, s)))
        .flat_map(|(qid, s)| s.iter().map(move |oid| (qid, *oid)))
        .collect();

    Ok(GradeOutcome {
        correct_count,
        total_questions,
        score,
        passed: score >= passing_score,
        selections,
    })
}

/// Stored attempt plus what it earned
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub attempt: QuizAttempt,
    /// True when this was the student's first passing attempt
    pub first_pass: bool,
}

/// Grades and stores an attempt
///
/// The attempt, its answers and any points award commit together. The
/// student's profile row is locked first so two concurrent passing attempts
/// cannot both collect the award.
pub async fn submit_attempt(
    pool: &PgPool,
    quiz_id: Uuid,
    student_id: Uuid,
    answers: &[AnswerSubmission],
    time_taken_seconds: Option<i32>,
) -> Result<SubmissionResult, GradingError> {
    let quiz = Quiz::find_by_id(pool, quiz_id)
        .await?
        .ok_or(GradingError::QuizNotFound)?;

    if !quiz.is_published {
        return Err(GradingError::NotPublished);
    }

    let questions = Quiz::load_questions(pool, quiz_id).await?;
    let outcome = grade(&questions, answers, quiz.passing_score)?;

    let mut tx = pool.begin().await?;

    Profile::lock_for_update(&mut *tx, student_id).await?;

    let already_passed = QuizAttempt::has_passed(&mut *tx, quiz_id, student_id).await?;
    let first_pass = outcome.passed && !already_passed;

    let points_awarded = if first_pass {
        PlatformSetting::get_i64(&mut *tx, SettingKey::QuizPassPoints).await? as i32
    } else {
        0
    };

    let attempt = QuizAttempt::insert(
        &mut *tx,
        CreateAttempt {
            quiz_id,
            student_id,
            score: outcome.score,
            correct_count: outcome.correct_count,
            total_questions: outcome.total_questions,
            passed: outcome.passed,
            time_taken_seconds,
            points_awarded,
        },
    )
    .await?;

    QuizAttempt::insert_answers(&mut *tx, attempt.id, &outcome.selections).await?;

    if points_awarded > 0 {
        Profile::adjust_points(&mut *tx, student_id, points_awarded).await?;
    }

    tx.commit().await?;

    info!(
        quiz_id = %quiz_id,
        student_id = %student_id,
        score = attempt.score,
        passed = attempt.passed,
        points_awarded,
        "Quiz attempt recorded"
    );

    Ok(SubmissionResult {
        attempt,
        first_pass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{QuizOption, QuizQuestion};
    use chrono::Utc;

    /// Builds a question whose options are flagged by `correct`
    fn question(correct: &[bool]) -> QuestionWithOptions {
        let id = Uuid::new_v4();
        QuestionWithOptions {
            question: QuizQuestion {
                id,
                quiz_id: Uuid::nil(),
                prompt: "?".to_string(),
                position: 0,
                created_at: Utc::now(),
            },
            options: correct
                .iter()
                .enumerate()
                .map(|(i, c)| QuizOption {
                    id: Uuid::new_v4(),
                    question_id: id,
                    label: format!("option {}", i),
                    is_correct: *c,
                    position: i as i32,
                })
                .collect(),
        }
    }

    fn pick(q: &QuestionWithOptions, indexes: &[usize]) -> AnswerSubmission {
        AnswerSubmission {
            question_id: q.question.id,
            option_ids: indexes.iter().map(|i| q.options[*i].id).collect(),
        }
    }

    #[test]
    fn test_percent_score_rounding() {
        assert_eq!(percent_score(0, 3), 0);
        assert_eq!(percent_score(1, 3), 33);
        assert_eq!(percent_score(2, 3), 67);
        assert_eq!(percent_score(1, 8), 13);
        assert_eq!(percent_score(3, 3), 100);
        assert_eq!(percent_score(0, 0), 0);
    }

    #[test]
    fn test_all_correct_scores_100() {
        let qs = vec![question(&[true, false]), question(&[false, true, false])];
        let answers = vec![pick(&qs[0], &[0]), pick(&qs[1], &[1])];

        let outcome = grade(&qs, &answers, 60).unwrap();
        assert_eq!(outcome.correct_count, 2);
        assert_eq!(outcome.score, 100);
        assert!(outcome.passed);
        assert_eq!(outcome.selections.len(), 2);
    }

    #[test]
    fn test_multi_select_requires_exact_set() {
        let qs = vec![question(&[true, true, false])];

        let partial = grade(&qs, &[pick(&qs[0], &[0])], 50).unwrap();
        assert_eq!(partial.correct_count, 0);

        let extra = grade(&qs, &[pick(&qs[0], &[0, 1, 2])], 50).unwrap();
        assert_eq!(extra.correct_count, 0);

        let exact = grade(&qs, &[pick(&qs[0], &[1, 0])], 50).unwrap();
        assert_eq!(exact.correct_count, 1);
    }

    #[test]
    fn test_unanswered_questions_are_wrong() {
        let qs = vec![question(&[true, false]), question(&[true, false])];
        let outcome = grade(&qs, &[pick(&qs[0], &[0])], 60).unwrap();

        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.score, 50);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_passing_threshold_is_inclusive() {
        let qs = vec![question(&[true, false]), question(&[true, false])];
        let outcome = grade(&qs, &[pick(&qs[0], &[0])], 50).unwrap();
        assert!(outcome.passed);
    }

    #[test]
    fn test_empty_quiz_is_rejected() {
        assert!(matches!(grade(&[], &[], 60), Err(GradingError::NoQuestions)));
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let qs = vec![question(&[true, false])];

        let foreign = AnswerSubmission {
            question_id: Uuid::new_v4(),
            option_ids: vec![],
        };
        assert!(matches!(
            grade(&qs, &[foreign], 60),
            Err(GradingError::UnknownQuestion(_))
        ));

        let bad_option = AnswerSubmission {
            question_id: qs[0].question.id,
            option_ids: vec![Uuid::new_v4()],
        };
        assert!(matches!(
            grade(&qs, &[bad_option], 60),
            Err(GradingError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_option_from_other_question_is_rejected() {
        let qs = vec![question(&[true, false]), question(&[true, false])];
        let crossed = AnswerSubmission {
            question_id: qs[0].question.id,
            option_ids: vec![qs[1].options[0].id],
        };
        assert!(matches!(
            grade(&qs, &[crossed], 60),
            Err(GradingError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_duplicate_answers_are_rejected() {
        let qs = vec![question(&[true, false])];
        let answers = vec![pick(&qs[0], &[0]), pick(&qs[0], &[1])];
        assert!(matches!(
            grade(&qs, &answers, 60),
            Err(GradingError::DuplicateAnswer(_))
        ));
    }
}
