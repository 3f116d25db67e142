//! In-memory ledgers.
//!
//! Same contracts as the PostgreSQL repositories, backed by maps behind tokio locks.
//! Used by coordinator and API tests and for running without a database.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use storely_core::models::{ChunkRecord, FileRecord, NewChunk, NewFileRecord, QuotaAccount};
use storely_core::AppError;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::chunk::ChunkLedger;
use super::file::FileRecordStore;
use super::quota::{account_not_found, ensure_non_negative, QuotaLedger};

#[derive(Default)]
pub struct InMemoryFileRecordStore {
    records: RwLock<HashMap<Uuid, FileRecord>>,
}

impl InMemoryFileRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FileRecordStore for InMemoryFileRecordStore {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::InvalidInput(format!(
                "File record {} already exists",
                record.id
            )));
        }
        let record = record.into_record(Utc::now());
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn mark_complete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) => {
                if !record.complete {
                    record.complete = true;
                    record.updated_at = Utc::now();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        let records = self.records.read().await;
        let mut owned: Vec<FileRecord> = records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }
}

#[derive(Default)]
pub struct InMemoryChunkLedger {
    chunks: RwLock<HashMap<Uuid, BTreeMap<i32, ChunkRecord>>>,
}

impl InMemoryChunkLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ChunkLedger for InMemoryChunkLedger {
    async fn upsert_chunk(&self, chunk: NewChunk) -> Result<(), AppError> {
        let mut chunks = self.chunks.write().await;
        let file_id = chunk.file_id;
        let index = chunk.chunk_index;
        chunks
            .entry(file_id)
            .or_default()
            .insert(index, chunk.into_record(Utc::now()));
        Ok(())
    }

    async fn count_chunks(&self, file_id: Uuid) -> Result<u32, AppError> {
        let chunks = self.chunks.read().await;
        Ok(chunks.get(&file_id).map(|c| c.len() as u32).unwrap_or(0))
    }

    async fn present_indices(&self, file_id: Uuid) -> Result<Vec<u32>, AppError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .get(&file_id)
            .map(|c| c.keys().map(|i| (*i).max(0) as u32).collect())
            .unwrap_or_default())
    }

    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, AppError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .get(&file_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, AppError> {
        let mut chunks = self.chunks.write().await;
        Ok(chunks.remove(&file_id).map(|c| c.len() as u64).unwrap_or(0))
    }
}

#[derive(Default)]
pub struct InMemoryQuotaLedger {
    accounts: Mutex<HashMap<Uuid, QuotaAccount>>,
}

impl InMemoryQuotaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite an account with explicit usage and limit.
    pub async fn set_account(&self, owner_id: Uuid, storage_used: i64, storage_limit: i64) {
        self.accounts.lock().await.insert(
            owner_id,
            QuotaAccount {
                owner_id,
                storage_used,
                storage_limit,
                updated_at: Utc::now(),
            },
        );
    }
}

#[async_trait::async_trait]
impl QuotaLedger for InMemoryQuotaLedger {
    async fn ensure_account(
        &self,
        owner_id: Uuid,
        default_limit: i64,
    ) -> Result<QuotaAccount, AppError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(owner_id).or_insert_with(|| QuotaAccount {
            owner_id,
            storage_used: 0,
            storage_limit: default_limit,
            updated_at: Utc::now(),
        });
        Ok(account.clone())
    }

    async fn reserve(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError> {
        ensure_non_negative(amount)?;
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&owner_id)
            .ok_or_else(|| account_not_found(owner_id))?;

        let reserved = account
            .storage_used
            .checked_add(amount)
            .filter(|total| *total <= account.storage_limit);
        let Some(storage_used) = reserved else {
            return Err(AppError::QuotaExceeded {
                used: account.storage_used,
                requested: amount,
                limit: account.storage_limit,
            });
        };

        account.storage_used = storage_used;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn release(&self, owner_id: Uuid, amount: i64) -> Result<QuotaAccount, AppError> {
        ensure_non_negative(amount)?;
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&owner_id)
            .ok_or_else(|| account_not_found(owner_id))?;

        account.storage_used = (account.storage_used - amount).max(0);
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn get(&self, owner_id: Uuid) -> Result<Option<QuotaAccount>, AppError> {
        Ok(self.accounts.lock().await.get(&owner_id).cloned())
    }
}
