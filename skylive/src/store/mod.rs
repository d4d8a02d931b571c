//! Account store collaborator.
//!
//! The authoritative per-pilot tracker configuration lives in an
//! external document store owned by the account-management layer. The
//! engine only needs one capability from it: load every account. The
//! trait keeps that seam injectable; [`MemoryAccountStore`] backs the
//! CLI's account file and the tests.

use std::future::Future;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::PilotId;

/// Errors from the external account store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("account store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data the engine cannot interpret.
    #[error("malformed account data: {0}")]
    Malformed(String),
}

/// Per-provider account configuration as persisted by the account layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerAccount {
    pub enabled: bool,
    pub account: String,
}

/// One pilot's persisted configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotAccount {
    /// Stable pilot id, the store's key.
    pub id: PilotId,

    /// Display name.
    pub name: String,

    /// Whether positions may be shared with partners.
    #[serde(default)]
    pub share: bool,

    /// Whether the pilot is visible at all.
    #[serde(default)]
    pub enabled: bool,

    /// Satellite-style tracker configuration.
    #[serde(default)]
    pub flymaster: Option<TrackerAccount>,

    /// Web-service tracker configuration.
    #[serde(default)]
    pub skylines: Option<TrackerAccount>,
}

/// Read capability over the authoritative account store.
pub trait AccountStore: Send + Sync {
    /// Loads every pilot account.
    fn load_accounts(&self)
        -> impl Future<Output = Result<Vec<PilotAccount>, StoreError>> + Send;
}

/// In-memory store, mutable from tests and loadable from a JSON file.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<PilotAccount>>,
}

impl MemoryAccountStore {
    pub fn new(accounts: Vec<PilotAccount>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    /// Parses the JSON account-file format: an array of pilot accounts.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let accounts: Vec<PilotAccount> =
            serde_json::from_str(json).map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(Self::new(accounts))
    }

    /// Replaces the stored accounts.
    pub fn set_accounts(&self, accounts: Vec<PilotAccount>) {
        *self.accounts.write() = accounts;
    }
}

impl AccountStore for MemoryAccountStore {
    async fn load_accounts(&self) -> Result<Vec<PilotAccount>, StoreError> {
        Ok(self.accounts.read().clone())
    }
}

impl<S: AccountStore> AccountStore for std::sync::Arc<S> {
    async fn load_accounts(&self) -> Result<Vec<PilotAccount>, StoreError> {
        self.as_ref().load_accounts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_accounts() {
        let store = MemoryAccountStore::new(vec![PilotAccount {
            id: 1,
            name: "Ada".into(),
            enabled: true,
            ..PilotAccount::default()
        }]);
        let accounts = store.load_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Ada");
    }

    #[tokio::test]
    async fn set_accounts_replaces_contents() {
        let store = MemoryAccountStore::default();
        store.set_accounts(vec![PilotAccount { id: 2, ..PilotAccount::default() }]);
        assert_eq!(store.load_accounts().await.unwrap()[0].id, 2);
    }

    #[test]
    fn from_json_parses_account_file() {
        let json = r#"[
            {"id": 1, "name": "Ada", "enabled": true,
             "flymaster": {"enabled": true, "account": "123456"}},
            {"id": 2, "name": "Grace"}
        ]"#;
        let store = MemoryAccountStore::from_json(json).unwrap();
        let accounts = store.accounts.read();
        assert_eq!(accounts.len(), 2);
        assert_eq!(
            accounts[0].flymaster.as_ref().unwrap().account,
            "123456"
        );
        assert!(!accounts[1].enabled);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            MemoryAccountStore::from_json("{"),
            Err(StoreError::Malformed(_))
        ));
    }
}
