use storely_core::models::QuotaAccount;
use storely_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Trait for per-owner quota accounting
///
/// Every mutation is a single atomic statement; callers never read-modify-write.
#[async_trait::async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Create the owner's account with `default_limit` if it does not exist yet.
    async fn ensure_account(
        &self,
        owner_id: Uuid,
        default_limit: i64,
    ) -> Result<QuotaAccount, AppError>;

    /// Add `amount` to `storage_used` iff the result stays within `storage_limit`.
    ///
    /// Fails with `QuotaExceeded` and leaves the account untouched otherwise.
    async fn reserve(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError>;

    /// Subtract `amount` from `storage_used`, floored at zero.
    async fn release(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError>;

    async fn get(&self, owner_id: Uuid) -> Result<Option<QuotaAccount>, AppError>;
}

pub(crate) fn ensure_non_negative(amount: i64) -> Result<(), AppError> {
    if amount < 0 {
        return Err(AppError::InvalidInput(format!(
            "Quota amount must not be negative, got {}",
            amount
        )));
    }
    Ok(())
}

pub(crate) fn account_not_found(owner_id: Uuid) -> AppError {
    AppError::NotFound(format!("Quota account not found for owner {}", owner_id))
}

/// Repository for quota accounts
#[derive(Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuotaLedger for QuotaRepository {
    #[tracing::instrument(skip(self), fields(db.table = "quota_accounts", owner_id = %owner_id))]
    async fn ensure_account(
        &self,
        owner_id: Uuid,
        default_limit: i64,
    ) -> Result<QuotaAccount, AppError> {
        sqlx::query(
            r#"
            INSERT INTO quota_accounts (owner_id, storage_used, storage_limit)
            VALUES ($1, 0, $2)
            ON CONFLICT (owner_id) DO NOTHING
            "#,
        )
        .bind(owner_id)
        .bind(default_limit)
        .execute(&self.pool)
        .await?;

        self.get(owner_id)
            .await?
            .ok_or_else(|| account_not_found(owner_id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_accounts", owner_id = %owner_id))]
    async fn reserve(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError> {
        ensure_non_negative(amount)?;

        // Concurrent reservations serialize on the row lock and re-check the predicate.
        // `limit - amount` cannot overflow bigint for non-negative operands.
        let reserved = sqlx::query_as::<Postgres, QuotaAccount>(
            r#"
            UPDATE quota_accounts
            SET storage_used = storage_used + $2, updated_at = NOW()
            WHERE owner_id = $1 AND storage_used <= storage_limit - $2
            RETURNING owner_id, storage_used, storage_limit, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(account) = reserved {
            return Ok(account);
        }

        let current = self
            .get(owner_id)
            .await?
            .ok_or_else(|| account_not_found(owner_id))?;

        Err(AppError::QuotaExceeded {
            used: current.storage_used,
            requested: amount,
            limit: current.storage_limit,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_accounts", owner_id = %owner_id))]
    async fn release(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError> {
        ensure_non_negative(amount)?;

        sqlx::query_as::<Postgres, QuotaAccount>(
            r#"
            UPDATE quota_accounts
            SET storage_used = GREATEST(storage_used - $2, 0), updated_at = NOW()
            WHERE owner_id = $1
            RETURNING owner_id, storage_used, storage_limit, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| account_not_found(owner_id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_accounts", owner_id = %owner_id))]
    async fn get(&self, owner_id: Uuid) -> Result<Option<QuotaAccount>, AppError> {
        let row = sqlx::query_as::<Postgres, QuotaAccount>(
            r#"
            SELECT owner_id, storage_used, storage_limit, updated_at
            FROM quota_accounts
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
