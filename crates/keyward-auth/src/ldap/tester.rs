//! Pre-flight check of a candidate directory configuration

use crate::ldap::client::DirectoryClient;
use crate::ldap::types::{ConnectionReport, UserQuery};
use keyward_core::{DirectoryConfig, Result};
use tracing::{info, instrument};

/// Verifies a directory configuration before it becomes active.
///
/// One bind with the candidate's search identity, then one presence search
/// limited to a single entry. Nothing is stored and the active provider is
/// left alone.
#[derive(Clone, Default)]
pub struct ConnectionTester {
    client: DirectoryClient,
}

impl ConnectionTester {
    pub fn new(client: DirectoryClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self, candidate), fields(url = %candidate.url))]
    pub async fn test_connection(&self, candidate: &DirectoryConfig) -> Result<ConnectionReport> {
        let mut conn = self.client.bind(candidate).await?;

        let query = UserQuery::sample(candidate);
        let result = self.client.search(&mut conn, &query).await;
        let bound_as = conn.bound_as().map(str::to_string);
        conn.release().await;

        let entries = result?;
        info!("Directory connection test passed for {}", candidate.url);

        Ok(ConnectionReport {
            url: candidate.url.clone(),
            bound_as,
            filter: query.filter(),
            entries_sampled: entries.len(),
        })
    }
}
