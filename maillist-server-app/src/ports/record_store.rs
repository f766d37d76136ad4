use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::domain::subscriber::{SubscriberRecord, SubscriberUpdate};

pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record not found")]
    NotFound,
    #[error("storage backend error: {0}")]
    Storage(String),
}

/// Key-value persistence for subscriber records, keyed by email.
#[async_trait::async_trait]
pub trait RecordStore {
    /// Inserts the record, overwriting any existing record with the same email.
    async fn add(&self, record: &SubscriberRecord) -> RecordStoreResult<()>;
    /// Absence is a normal outcome, reported as `None`.
    async fn get_by_email(&self, email: &str) -> RecordStoreResult<Option<SubscriberRecord>>;
    /// Returns at most `limit` records; `limit == 0` returns all of them.
    async fn get_all(&self, limit: u32) -> RecordStoreResult<Vec<SubscriberRecord>>;
    /// Removing an email that is not stored succeeds.
    async fn remove(&self, email: &str) -> RecordStoreResult<()>;
    /// Merges the set fields of `update` into the stored record.
    async fn update(&self, email: &str, update: &SubscriberUpdate) -> RecordStoreResult<()>;
}

#[derive(Clone, Default)]
pub struct MockRecordStore {
    pub records: Arc<Mutex<BTreeMap<String, SubscriberRecord>>>,
    pub fail_writes: Arc<AtomicBool>,
    pub fail_removes: Arc<AtomicBool>,
}

#[allow(unused)]
impl MockRecordStore {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, email: &str) -> bool {
        self.records.lock().unwrap().contains_key(email)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn add(&self, record: &SubscriberRecord) -> RecordStoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Storage("store offline".to_string()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> RecordStoreResult<Option<SubscriberRecord>> {
        Ok(self.records.lock().unwrap().get(email).cloned())
    }

    async fn get_all(&self, limit: u32) -> RecordStoreResult<Vec<SubscriberRecord>> {
        let records = self.records.lock().unwrap();
        let take = if limit == 0 {
            records.len()
        } else {
            limit as usize
        };
        Ok(records.values().take(take).cloned().collect())
    }

    async fn remove(&self, email: &str) -> RecordStoreResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Storage("store offline".to_string()));
        }
        self.records.lock().unwrap().remove(email);
        Ok(())
    }

    async fn update(&self, email: &str, update: &SubscriberUpdate) -> RecordStoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Storage("store offline".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(email) else {
            return Err(RecordStoreError::NotFound);
        };
        if let Some(group) = &update.group {
            record.group = Some(group.clone());
        }
        Ok(())
    }
}
