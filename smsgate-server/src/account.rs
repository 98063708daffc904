//! Account directory and phone number ownership.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An API account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub auth_id: String,
}

/// Lookup interface consumed by the authentication layer and the SMS
/// services.
///
/// The in-memory [`MemoryDirectory`] is the default; a database-backed
/// variant slots in without touching callers.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Resolves a username to its account, if one exists.
    async fn find_by_username(&self, username: &str) -> Option<Account>;

    /// Whether `number` is provisioned for the given account.
    async fn owns_number(&self, account_id: i64, number: &str) -> bool;
}

/// Seed record for one account and its provisioned numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSeed {
    pub id: i64,
    pub username: String,
    pub auth_id: String,
    #[serde(default)]
    pub numbers: Vec<String>,
}

/// In-memory account directory, seeded at startup.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    accounts: HashMap<String, Account>,
    numbers: HashSet<(i64, String)>,
}

impl MemoryDirectory {
    pub fn from_seeds(seeds: impl IntoIterator<Item = AccountSeed>) -> Self {
        let mut directory = MemoryDirectory::default();
        for seed in seeds {
            for number in &seed.numbers {
                directory.numbers.insert((seed.id, number.clone()));
            }
            directory.accounts.insert(
                seed.username.clone(),
                Account {
                    id: seed.id,
                    username: seed.username,
                    auth_id: seed.auth_id,
                },
            );
        }
        directory
    }

    /// Loads seed records from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading accounts file {}", path.display()))?;
        let seeds: Vec<AccountSeed> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing accounts file {}", path.display()))?;
        Ok(Self::from_seeds(seeds))
    }

    /// Built-in accounts for local development.
    pub fn dev_directory() -> Self {
        Self::from_seeds([
            AccountSeed {
                id: 1,
                username: "acme".into(),
                auth_id: "20S0KPNOIM".into(),
                numbers: vec!["14152243533".into(), "14153273479".into()],
            },
            AccountSeed {
                id: 2,
                username: "globex".into(),
                auth_id: "54P2EOKQ3F".into(),
                numbers: vec!["441632960961".into()],
            },
        ])
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Option<Account> {
        self.accounts.get(username).cloned()
    }

    async fn owns_number(&self, account_id: i64, number: &str) -> bool {
        self.numbers.contains(&(account_id, number.to_string()))
    }
}
