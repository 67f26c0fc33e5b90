/// Teacher wallet: balance arithmetic and withdrawal requests
///
/// ```text
/// available = sum(earnings.net_amount)
///           - sum(withdrawals where status in {pending, approved, paid})
/// ```
///
/// A withdrawal request re-computes `available` inside a transaction that
/// holds the teacher's profile row lock, so two concurrent requests are
/// checked one after the other and cannot overdraw the wallet together.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::earning::TeacherEarning;
use crate::models::profile::Profile;
use crate::models::setting::{PlatformSetting, SettingKey};
use crate::models::withdrawal::{CreateWithdrawal, WithdrawalRequest, WithdrawalTotals};

/// Error type for wallet operations
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Minimum withdrawal is {minimum}")]
    BelowMinimum { minimum: i64 },

    #[error("Requested {requested} but only {available} is available")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Wallet overview shown to a teacher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub total_earned: i64,
    pub pending_withdrawals: i64,
    pub approved_withdrawals: i64,
    pub paid_out: i64,
    pub available: i64,
}

impl WalletSummary {
    pub fn from_totals(total_earned: i64, withdrawals: WithdrawalTotals) -> Self {
        Self {
            total_earned,
            pending_withdrawals: withdrawals.pending,
            approved_withdrawals: withdrawals.approved,
            paid_out: withdrawals.paid,
            available: total_earned - withdrawals.reserved(),
        }
    }
}

/// Splits a payment into (commission, net) for `commission_percent`
///
/// The commission is rounded down; the teacher keeps the remainder.
pub fn split_commission(gross: i64, commission_percent: i64) -> (i64, i64) {
    let percent = commission_percent.clamp(0, 100);
    let commission = gross * percent / 100;
    (commission, gross - commission)
}

/// Checks a withdrawal amount against the rules
pub fn check_withdrawal(amount: i64, minimum: i64, available: i64) -> Result<(), WalletError> {
    if amount <= 0 {
        return Err(WalletError::NonPositiveAmount);
    }
    if amount < minimum {
        return Err(WalletError::BelowMinimum { minimum });
    }
    if amount > available {
        return Err(WalletError::InsufficientBalance {
            requested: amount,
            available,
        });
    }
    Ok(())
}

pub async fn summary(pool: &PgPool, teacher_id: Uuid) -> Result<WalletSummary, WalletError> {
    let earned = TeacherEarning::total_net(pool, teacher_id).await?;
    let withdrawals = WithdrawalRequest::totals_for_teacher(pool, teacher_id).await?;
    Ok(WalletSummary::from_totals(earned, withdrawals))
}

/// Files a withdrawal request after checking the balance under a row lock
pub async fn request_withdrawal(
    pool: &PgPool,
    data: CreateWithdrawal,
) -> Result<WithdrawalRequest, WalletError> {
    if data.amount <= 0 {
        return Err(WalletError::NonPositiveAmount);
    }

    let mut tx = pool.begin().await?;

    Profile::lock_for_update(&mut *tx, data.teacher_id)
        .await?
        .ok_or(WalletError::ProfileNotFound)?;

    let minimum = PlatformSetting::get_i64(&mut *tx, SettingKey::MinWithdrawal).await?;
    let earned = TeacherEarning::total_net(&mut *tx, data.teacher_id).await?;
    let withdrawals = WithdrawalRequest::totals_for_teacher(&mut *tx, data.teacher_id).await?;
    let available = WalletSummary::from_totals(earned, withdrawals).available;

    check_withdrawal(data.amount, minimum, available)?;

    let request = WithdrawalRequest::insert(&mut *tx, data).await?;
    tx.commit().await?;

    info!(
        withdrawal_id = %request.id,
        teacher_id = %request.teacher_id,
        amount = request.amount,
        "Withdrawal requested"
    );

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_commission() {
        assert_eq!(split_commission(100, 20), (20, 80));
        assert_eq!(split_commission(99, 20), (19, 80));
        assert_eq!(split_commission(50, 0), (0, 50));
        assert_eq!(split_commission(50, 100), (50, 0));
        assert_eq!(split_commission(50, 150), (50, 0));
    }

    #[test]
    fn test_summary_available() {
        let summary = WalletSummary::from_totals(
            1000,
            WithdrawalTotals {
                pending: 100,
                approved: 200,
                paid: 300,
            },
        );
        assert_eq!(summary.available, 400);
        assert_eq!(summary.paid_out, 300);
    }

    #[test]
    fn test_check_withdrawal() {
        assert!(check_withdrawal(150, 100, 200).is_ok());
        assert!(check_withdrawal(200, 100, 200).is_ok());

        assert!(matches!(
            check_withdrawal(0, 100, 200),
            Err(WalletError::NonPositiveAmount)
        ));
        assert!(matches!(
            check_withdrawal(50, 100, 200),
            Err(WalletError::BelowMinimum { minimum: 100 })
        ));
        assert!(matches!(
            check_withdrawal(201, 100, 200),
            Err(WalletError::InsufficientBalance {
                requested: 201,
                available: 200
            })
        ));
    }
}
