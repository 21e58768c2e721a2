//! Credential resolution: opaque bearer key -> SHA-256 hash -> tenant.
//! The core never sees or stores the raw key.

use crate::api_key::{ApiKeyManager, ApiKeyMetadata, ApiKeyScope};
use chrono::Utc;
use gateway_core::types::TokenUsage;
use gateway_core::{CredentialStore, ResolvedCredential, UsageCounterStore};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("internal credential store error: {0}")]
    Internal(String),
}

/// In-memory `CredentialStore`, keyed by the SHA-256 hex digest of the raw
/// key, matching `ApiKeyManager::hash_key`. Suitable for tests and local
/// development; a production deployment swaps in an implementation backed
/// by whatever store the external tenant/account service exposes, behind
/// the same trait.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    by_hash: RwLock<HashMap<String, ApiKeyMetadata>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key's metadata under its hash, as issued by the external
    /// account-management service this core only consumes a lookup from.
    pub async fn insert(&self, metadata: ApiKeyMetadata) {
        self.by_hash
            .write()
            .await
            .insert(metadata.key_hash.clone(), metadata);
    }

    pub async fn metadata_by_hash(&self, hash: &str) -> Option<ApiKeyMetadata> {
        self.by_hash.read().await.get(hash).cloned()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    type Error = CredentialStoreError;

    async fn lookup_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<ResolvedCredential>, Self::Error> {
        let store = self.by_hash.read().await;
        Ok(store.get(hash).map(|metadata| ResolvedCredential {
            tenant_id: metadata
                .tenant_id
                .clone()
                .unwrap_or_else(|| metadata.user_id.clone()),
            tenant_name: metadata.name.clone(),
            key_id: metadata.id.clone(),
            active: metadata.is_valid(),
        }))
    }
}

#[derive(Debug, Error)]
pub enum UsageStoreError {
    #[error("internal usage store error: {0}")]
    Internal(String),
}

#[derive(Debug, Default, Clone, Copy)]
struct UsageTotals {
    input: u64,
    output: u64,
    requests: u64,
}

/// In-memory per-`(key_id, model)` usage accounting. Writes are serialized
/// behind a single lock per key; suitable for tests and local development,
/// same caveat as `InMemoryCredentialStore`.
#[derive(Debug, Default)]
pub struct InMemoryUsageCounterStore {
    by_key: RwLock<HashMap<String, HashMap<String, UsageTotals>>>,
    last_used: RwLock<HashMap<String, chrono::DateTime<Utc>>>,
}

impl InMemoryUsageCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn totals(&self, key_id: &str, model: &str) -> Option<(u64, u64, u64)> {
        self.by_key
            .read()
            .await
            .get(key_id)
            .and_then(|by_model| by_model.get(model))
            .map(|t| (t.input, t.output, t.requests))
    }

    pub async fn last_used_at(&self, key_id: &str) -> Option<chrono::DateTime<Utc>> {
        self.last_used.read().await.get(key_id).copied()
    }
}

#[async_trait::async_trait]
impl UsageCounterStore for InMemoryUsageCounterStore {
    type Error = UsageStoreError;

    async fn incr_usage(
        &self,
        key_id: &str,
        model: &str,
        usage: TokenUsage,
    ) -> Result<(), Self::Error> {
        let mut store = self.by_key.write().await;
        let totals = store
            .entry(key_id.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default();
        totals.input += usage.input as u64;
        totals.output += usage.output as u64;
        totals.requests += 1;
        Ok(())
    }

    async fn touch_last_used(&self, key_id: &str) -> Result<(), Self::Error> {
        self.last_used
            .write()
            .await
            .insert(key_id.to_string(), Utc::now());
        Ok(())
    }
}

/// Hash a presented key the same way `ApiKeyManager` hashes at issuance time,
/// so a lookup by hash round-trips.
pub fn hash_presented_key(key: &str) -> String {
    Arc::new(ApiKeyManager::new()).hash_key(key)
}

/// Whether the resolved key carries the scope required for a given route.
pub fn has_required_scope(metadata: &ApiKeyMetadata, required: ApiKeyScope) -> bool {
    metadata.has_scope(&required)
}
