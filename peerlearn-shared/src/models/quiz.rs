/// Quizzes, their questions and options, and student attempts
///
/// A quiz belongs to a subject and is authored by the subject's teacher.
/// Each question has at least two options and at least one flagged correct;
/// a question may have several correct options, in which case a student must
/// pick exactly that set. Grading lives in [`crate::grading`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE quizzes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
///     created_by UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     time_limit_minutes INTEGER CHECK (time_limit_minutes > 0),
///     passing_score INTEGER NOT NULL DEFAULT 60 CHECK (passing_score BETWEEN 0 AND 100),
///     is_published BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE quiz_questions (id, quiz_id, prompt, position, created_at);
/// CREATE TABLE quiz_options (id, question_id, label, is_correct, position);
/// CREATE TABLE quiz_attempts (id, quiz_id, student_id, score, correct_count,
///                             total_questions, passed, time_taken_seconds,
///                             points_awarded, created_at);
/// CREATE TABLE quiz_answers (attempt_id, question_id, option_id,
///                            PRIMARY KEY (attempt_id, question_id, option_id));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub const MIN_OPTIONS_PER_QUESTION: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Informational; the countdown runs on the client
    pub time_limit_minutes: Option<i32>,
    /// Minimum score (0-100) that counts as a pass
    pub passing_score: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateQuiz {
    pub subject_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub passing_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub prompt: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub label: String,
    pub is_correct: bool,
    pub position: i32,
}

/// Option for a new question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOption {
    pub label: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Question together with its options, in position order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub options: Vec<QuizOption>,
}

/// Option as shown to a student taking the quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentOption {
    pub id: Uuid,
    pub label: String,
}

/// Question as shown to a student; correctness flags are stripped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentQuestion {
    pub id: Uuid,
    pub prompt: String,
    pub position: i32,
    pub options: Vec<StudentOption>,
}

impl From<QuestionWithOptions> for StudentQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        Self {
            id: q.question.id,
            prompt: q.question.prompt,
            position: q.question.position,
            options: q
                .options
                .into_iter()
                .map(|o| StudentOption {
                    id: o.id,
                    label: o.label,
                })
                .collect(),
        }
    }
}

/// Why a new question was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
    #[error("A question needs at least 2 options")]
    TooFewOptions,

    #[error("A question needs at least one correct option")]
    NoCorrectOption,

    #[error("Option labels must not be empty")]
    EmptyLabel,
}

/// Checks the option list of a new question
pub fn validate_options(options: &[NewOption]) -> Result<(), QuestionError> {
    if options.len() < MIN_OPTIONS_PER_QUESTION {
        return Err(QuestionError::TooFewOptions);
    }
    if options.iter().any(|o| o.label.trim().is_empty()) {
        return Err(QuestionError::EmptyLabel);
    }
    if !options.iter().any(|o| o.is_correct) {
        return Err(QuestionError::NoCorrectOption);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub passed: bool,
    pub time_taken_seconds: Option<i32>,
    pub points_awarded: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttempt {
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub passed: bool,
    pub time_taken_seconds: Option<i32>,
    pub points_awarded: i32,
}

const QUIZ_COLUMNS: &str = "id, subject_id, created_by, title, description, time_limit_minutes, \
     passing_score, is_published, created_at, updated_at";

const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, score, correct_count, total_questions, \
     passed, time_taken_seconds, points_awarded, created_at";

impl Quiz {
    pub async fn create(pool: &PgPool, data: CreateQuiz) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO quizzes (subject_id, created_by, title, description,
                                 time_limit_minutes, passing_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        );

        sqlx::query_as::<_, Quiz>(&sql)
            .bind(data.subject_id)
            .bind(data.created_by)
            .bind(data.title)
            .bind(data.description)
            .bind(data.time_limit_minutes)
            .bind(data.passing_score)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS);

        sqlx::query_as::<_, Quiz>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Quizzes of a subject; unpublished ones only when `include_drafts`
    pub async fn list_for_subject(
        pool: &PgPool,
        subject_id: Uuid,
        include_drafts: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM quizzes WHERE subject_id = $1 AND (is_published OR $2) \
             ORDER BY created_at DESC",
            QUIZ_COLUMNS
        );

        sqlx::query_as::<_, Quiz>(&sql)
            .bind(subject_id)
            .bind(include_drafts)
            .fetch_all(pool)
            .await
    }

    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE quizzes SET is_published = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            QUIZ_COLUMNS
        );

        sqlx::query_as::<_, Quiz>(&sql)
            .bind(id)
            .bind(published)
            .fetch_optional(pool)
            .await
    }

    pub async fn question_count(pool: &PgPool, quiz_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(pool)
            .await
    }

    /// Adds a question and its options atomically
    ///
    /// The question is appended after the current last position. Callers
    /// validate the options with [`validate_options`] first.
    pub async fn add_question(
        pool: &PgPool,
        quiz_id: Uuid,
        prompt: &str,
        options: &[NewOption],
    ) -> Result<QuestionWithOptions, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let question = sqlx::query_as::<_, QuizQuestion>(
            r#"
            INSERT INTO quiz_questions (quiz_id, prompt, position)
            VALUES ($1, $2, (SELECT COALESCE(MAX(position) + 1, 0) FROM quiz_questions WHERE quiz_id = $1))
            RETURNING id, quiz_id, prompt, position, created_at
            "#,
        )
        .bind(quiz_id)
        .bind(prompt)
        .fetch_one(&mut *tx)
        .await?;

        let mut inserted = Vec::with_capacity(options.len());
        for (position, option) in options.iter().enumerate() {
            let row = sqlx::query_as::<_, QuizOption>(
                r#"
                INSERT INTO quiz_options (question_id, label, is_correct, position)
                VALUES ($1, $2, $3, $4)
                RETURNING id, question_id, label, is_correct, position
                "#,
            )
            .bind(question.id)
            .bind(option.label.trim())
            .bind(option.is_correct)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        tx.commit().await?;

        Ok(QuestionWithOptions {
            question,
            options: inserted,
        })
    }

    /// Removes a question (its options cascade)
    pub async fn delete_question(
        pool: &PgPool,
        quiz_id: Uuid,
        question_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM quiz_questions WHERE id = $1 AND quiz_id = $2")
            .bind(question_id)
            .bind(quiz_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All questions of a quiz with their options, in position order
    pub async fn load_questions(
        pool: &PgPool,
        quiz_id: Uuid,
    ) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
        let questions = sqlx::query_as::<_, QuizQuestion>(
            r#"
            SELECT id, quiz_id, prompt, position, created_at
            FROM quiz_questions WHERE quiz_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(pool)
        .await?;

        let options = sqlx::query_as::<_, QuizOption>(
            r#"
            SELECT o.id, o.question_id, o.label, o.is_correct, o.position
            FROM quiz_options o
            JOIN quiz_questions q ON q.id = o.question_id
            WHERE q.quiz_id = $1
            ORDER BY o.position ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(pool)
        .await?;

        let mut by_question: HashMap<Uuid, Vec<QuizOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }
}

impl QuizAttempt {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        data: CreateAttempt,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO quiz_attempts (quiz_id, student_id, score, correct_count, total_questions,
                                       passed, time_taken_seconds, points_awarded)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );

        sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(data.quiz_id)
            .bind(data.student_id)
            .bind(data.score)
            .bind(data.correct_count)
            .bind(data.total_questions)
            .bind(data.passed)
            .bind(data.time_taken_seconds)
            .bind(data.points_awarded)
            .fetch_one(executor)
            .await
    }

    /// Records the selected options of an attempt in one statement
    pub async fn insert_answers(
        executor: impl PgExecutor<'_>,
        attempt_id: Uuid,
        selections: &[(Uuid, Uuid)],
    ) -> Result<u64, sqlx::Error> {
        if selections.is_empty() {
            return Ok(0);
        }

        let (question_ids, option_ids): (Vec<Uuid>, Vec<Uuid>) = selections.iter().copied().unzip();

        let result = sqlx::query(
            r#"
            INSERT INTO quiz_answers (attempt_id, question_id, option_id)
            SELECT $1, q, o FROM UNNEST($2::uuid[], $3::uuid[]) AS t(q, o)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(attempt_id)
        .bind(question_ids)
        .bind(option_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Whether the student already has a passing attempt
    pub async fn has_passed(
        executor: impl PgExecutor<'_>,
        quiz_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2 AND passed
            )
            "#,
        )
        .bind(quiz_id)
        .bind(student_id)
        .fetch_one(executor)
        .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        quiz_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2 \
             ORDER BY created_at DESC",
            ATTEMPT_COLUMNS
        );

        sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(quiz_id)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_quiz(pool: &PgPool, quiz_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 ORDER BY created_at DESC",
            ATTEMPT_COLUMNS
        );

        sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(quiz_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_attempts")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(label: &str, is_correct: bool) -> NewOption {
        NewOption {
            label: label.to_string(),
            is_correct,
        }
    }

    #[test]
    fn test_validate_options() {
        assert!(validate_options(&[opt("a", true), opt("b", false)]).is_ok());
        assert!(validate_options(&[opt("a", true), opt("b", true)]).is_ok());

        assert_eq!(
            validate_options(&[opt("a", true)]),
            Err(QuestionError::TooFewOptions)
        );
        assert_eq!(
            validate_options(&[opt("a", false), opt("b", false)]),
            Err(QuestionError::NoCorrectOption)
        );
        assert_eq!(
            validate_options(&[opt("a", true), opt("  ", false)]),
            Err(QuestionError::EmptyLabel)
        );
    }

    #[test]
    fn test_student_view_hides_correct_flag() {
        let question_id = Uuid::new_v4();
        let question = QuestionWithOptions {
            question: QuizQuestion {
                id: question_id,
                quiz_id: Uuid::new_v4(),
                prompt: "2 + 2?".to_string(),
                position: 0,
                created_at: Utc::now(),
            },
            options: vec![QuizOption {
                id: Uuid::new_v4(),
                question_id,
                label: "4".to_string(),
                is_correct: true,
                position: 0,
            }],
        };

        let json = serde_json::to_value(StudentQuestion::from(question)).unwrap();
        assert_eq!(json["prompt"], "2 + 2?");
        assert!(json["options"][0].get("is_correct").is_none());
        assert_eq!(json["options"][0]["label"], "4");
    }
}
