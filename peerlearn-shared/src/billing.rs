/// Subject subscriptions paid with points
///
/// One transaction does the whole payment:
///
/// 1. lock the student's profile row and read the balance
/// 2. check the subject is subscribable and has a price
/// 3. deduct the price
/// 4. create or extend the subscription
/// 5. credit the teacher, minus the platform commission
///
/// Anything failing rolls the lot back.

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::earning::{CreateEarning, TeacherEarning, SOURCE_SUBSCRIPTION};
use crate::models::profile::Profile;
use crate::models::setting::{PlatformSetting, SettingKey};
use crate::models::subject::Subject;
use crate::models::subject_price::SubjectPrice;
use crate::models::subscription::{next_expiry, Subscription};
use crate::wallet::split_commission;

/// Error type for subscription payments
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Subject not found")]
    SubjectNotFound,

    #[error("Subject is not open for subscriptions")]
    SubjectUnavailable,

    #[error("Subject has no price")]
    NoPrice,

    #[error("You cannot subscribe to your own subject")]
    OwnSubject,

    #[error("Insufficient points: need {required}, have {available}")]
    InsufficientPoints { required: i32, available: i32 },

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionReceipt {
    pub subscription: Subscription,
    pub points_paid: i32,
    pub remaining_points: i32,
}

/// Pays for one period of `subject_id` out of the student's points
pub async fn subscribe(
    pool: &PgPool,
    subject_id: Uuid,
    student_id: Uuid,
) -> Result<SubscriptionReceipt, SubscriptionError> {
    let subject = Subject::find_by_id(pool, subject_id)
        .await?
        .ok_or(SubscriptionError::SubjectNotFound)?;

    if subject.teacher_id == student_id {
        return Err(SubscriptionError::OwnSubject);
    }
    if !subject.is_public() {
        return Err(SubscriptionError::SubjectUnavailable);
    }

    let mut tx = pool.begin().await?;

    let balance = Profile::lock_for_update(&mut *tx, student_id)
        .await?
        .ok_or(SubscriptionError::ProfileNotFound)?;

    let price = SubjectPrice::find(&mut *tx, subject_id)
        .await?
        .ok_or(SubscriptionError::NoPrice)?;

    if balance < price.price_points {
        return Err(SubscriptionError::InsufficientPoints {
            required: price.price_points,
            available: balance,
        });
    }

    let remaining_points = Profile::adjust_points(&mut *tx, student_id, -price.price_points).await?;

    let current = Subscription::find(&mut *tx, subject_id, student_id).await?;
    let expires_at = next_expiry(
        Utc::now(),
        current.map(|s| s.expires_at),
        price.duration_days,
    );

    let subscription = Subscription::upsert(
        &mut *tx,
        subject_id,
        student_id,
        price.price_points,
        expires_at,
    )
    .await?;

    if price.price_points > 0 {
        let percent = PlatformSetting::get_i64(&mut *tx, SettingKey::CommissionPercent).await?;
        let gross = i64::from(price.price_points);
        let (commission, net) = split_commission(gross, percent);

        TeacherEarning::insert(
            &mut *tx,
            CreateEarning {
                teacher_id: subject.teacher_id,
                subscription_id: Some(subscription.id),
                source: SOURCE_SUBSCRIPTION.to_string(),
                gross_amount: gross,
                commission_amount: commission,
                net_amount: net,
            },
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        subject_id = %subject_id,
        student_id = %student_id,
        points = price.price_points,
        expires_at = %subscription.expires_at,
        "Subscription paid"
    );

    Ok(SubscriptionReceipt {
        subscription,
        points_paid: price.price_points,
        remaining_points,
    })
}
