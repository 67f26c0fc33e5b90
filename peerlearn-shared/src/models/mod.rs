/// Database models for PeerLearn
///
/// One module per table (or tightly-coupled table group). Each model is a
/// `sqlx::FromRow` struct with its queries as associated async functions.
/// Functions that take `impl PgExecutor<'_>` can run either on the pool or
/// inside a caller's transaction (`&mut *tx`).
///
/// # Models
///
/// - `profile`, `role`, `university`: accounts and who they are
/// - `subject`, `subject_price`, `subscription`, `subject_post`: the catalogue
/// - `session`, `enrollment`, `review`, `reminder`: live tutoring
/// - `note`, `todo`, `quiz`: study tools
/// - `chat`, `notification`: messaging
/// - `teacher_application`, `earning`, `withdrawal`: teaching and payouts
/// - `setting`, `storage_object`: platform configuration and file metadata
///
/// # Example
///
/// ```no_run
/// use peerlearn_shared::models::profile::Profile;
/// use peerlearn_shared::models::role::UserRole;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(profile) = Profile::find_by_email(&pool, "ada@example.com").await? {
///     let roles = UserRole::roles_for(&pool, profile.id).await?;
///     println!("{} has roles {:?}", profile.full_name, roles);
/// }
/// # Ok(())
/// # }
/// ```

pub mod chat;
pub mod earning;
pub mod enrollment;
pub mod note;
pub mod notification;
pub mod profile;
pub mod quiz;
pub mod reminder;
pub mod review;
pub mod role;
pub mod session;
pub mod setting;
pub mod storage_object;
pub mod subject;
pub mod subject_post;
pub mod subject_price;
pub mod subscription;
pub mod teacher_application;
pub mod todo;
pub mod university;
pub mod withdrawal;
