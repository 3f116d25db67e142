use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-owner storage accounting row.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QuotaAccount {
    pub owner_id: Uuid,
    pub storage_used: i64,
    pub storage_limit: i64,
    pub updated_at: DateTime<Utc>,
}

impl QuotaAccount {
    /// Bytes still available before a reservation is refused.
    pub fn available(&self) -> i64 {
        self.storage_limit - self.storage_used
    }
}

/// Quota snapshot returned by the storage health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageHealth {
    pub storage_used: i64,
    pub storage_limit: i64,
    pub available_balance: i64,
}

impl From<&QuotaAccount> for StorageHealth {
    fn from(account: &QuotaAccount) -> Self {
        StorageHealth {
            storage_used: account.storage_used,
            storage_limit: account.storage_limit,
            available_balance: account.available(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_health_available_balance() {
        let account = QuotaAccount {
            owner_id: Uuid::new_v4(),
            storage_used: 300,
            storage_limit: 1000,
            updated_at: Utc::now(),
        };
        let health = StorageHealth::from(&account);
        assert_eq!(health.available_balance, 700);

        let json = serde_json::to_value(health).unwrap();
        assert_eq!(json["storageUsed"], 300);
        assert_eq!(json["availableBalance"], 700);
    }
}
