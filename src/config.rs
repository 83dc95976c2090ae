use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use crate::db::PgRecordStore;
use crate::memory::MemoryStore;
use crate::store::RecordStore;

/// Runtime settings shared by every subcommand. Flags win over environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Postgres connection string for the claims database
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "CLAIMS_DB_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,

    /// Deadline for one lookup, covering every store read it makes
    #[arg(long, env = "CLAIMS_REQUEST_TIMEOUT_SECS", default_value_t = 15, global = true)]
    pub timeout_secs: u64,

    /// Serve reads from a JSON fixture instead of Postgres
    #[arg(long, env = "CLAIMS_FIXTURE", global = true)]
    pub fixture: Option<PathBuf>,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub async fn open_store(&self) -> anyhow::Result<Box<dyn RecordStore>> {
        if let Some(path) = &self.fixture {
            tracing::info!(fixture = %path.display(), "using fixture record store");
            return Ok(Box::new(MemoryStore::from_json_file(path)?));
        }

        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set, or pass --fixture for an offline store")?;
        let store = PgRecordStore::connect(database_url, self.max_connections).await?;
        Ok(Box::new(store))
    }
}
