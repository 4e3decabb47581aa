//! # Ingestion Orchestrator
//!
//! Drives one pass: list, fan out activity fetches, join, then reconcile
//! the leaderboard and activity inside a single transaction.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::github::{GitHubClient, GitHubError};
use crate::ingestion::{
    ActivityFetcher, ActivityRecord, GitHubActivityFetcher, GitHubRepositoryLister,
    IngestionError, PassResult, PassStage, ReconciliationStore, RepositoryLister, StorageError,
};

pub struct IngestionOrchestrator {
    db: Arc<DatabaseConnection>,
    lister: Arc<dyn RepositoryLister>,
    fetcher: Arc<dyn ActivityFetcher>,
    store: ReconciliationStore,
    window_days: u32,
}

impl IngestionOrchestrator {
    pub fn new(
        db: Arc<DatabaseConnection>,
        lister: Arc<dyn RepositoryLister>,
        fetcher: Arc<dyn ActivityFetcher>,
        window_days: u32,
    ) -> Self {
        Self {
            db,
            lister,
            fetcher,
            store: ReconciliationStore::new(),
            window_days,
        }
    }

    /// Wire the GitHub-backed lister and fetcher from configuration.
    pub fn from_config(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
    ) -> Result<Self, GitHubError> {
        let client = GitHubClient::from_config(config)?;
        let lister = GitHubRepositoryLister::new(client.clone(), config.ingestion.listing_limit);
        let fetcher = GitHubActivityFetcher::new(client, &config.ingestion);

        Ok(Self::new(
            db,
            Arc::new(lister),
            Arc::new(fetcher),
            config.ingestion.activity_days,
        ))
    }

    /// Run one pass. Nothing is written unless the pass reaches `Committed`.
    #[instrument(skip_all, fields(window_days = self.window_days))]
    pub async fn run_ingestion_pass(&self) -> Result<PassResult, IngestionError> {
        let started = Instant::now();
        let mut stage = PassStage::Idle;

        let result = self.execute_pass(&mut stage).await;
        if result.is_err() {
            transition(&mut stage, PassStage::Aborted);
        }

        let outcome = match &result {
            Ok(_) => "committed",
            Err(err) => err.kind(),
        };
        counter!("ingestion_passes_total", "outcome" => outcome).increment(1);
        histogram!("ingestion_pass_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(summary) => info!(
                repositories = summary.repositories_processed,
                activity_records = summary.activity_records_saved,
                degraded = summary.degraded_repositories,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Ingestion pass committed"
            ),
            Err(err) => error!(error = %err, stage = %stage, "Ingestion pass aborted"),
        }

        result
    }

    async fn execute_pass(&self, stage: &mut PassStage) -> Result<PassResult, IngestionError> {
        transition(stage, PassStage::Listing);
        let listed = self.lister.list_top_repositories().await?;

        let mut seen = HashSet::new();
        let repositories: Vec<_> = listed
            .into_iter()
            .filter(|repo| seen.insert(repo.full_name.clone()))
            .collect();

        if repositories.is_empty() {
            return Err(IngestionError::EmptyListing);
        }

        transition(stage, PassStage::Fetching);
        let mut handles = Vec::with_capacity(repositories.len());
        for repo in &repositories {
            let fetcher = Arc::clone(&self.fetcher);
            let name = repo.full_name.clone();
            let window_days = self.window_days;

            let handle =
                tokio::spawn(async move { fetcher.fetch_activity(&name, window_days).await });
            handles.push((repo.full_name.clone(), handle));
        }

        let mut records = Vec::new();
        let mut degraded_repositories = 0;
        for (name, handle) in handles {
            match handle.await {
                Ok(fetch) => {
                    if fetch.is_degraded() {
                        degraded_repositories += 1;
                    }
                    records.extend(
                        fetch
                            .into_activity()
                            .into_iter()
                            .map(|daily| ActivityRecord::from_daily(&name, daily)),
                    );
                }
                Err(join_err) => {
                    degraded_repositories += 1;
                    warn!(repo = %name, error = %join_err, "Activity task failed to complete");
                }
            }
        }

        transition(stage, PassStage::Reconciling);
        let txn = self.db.begin().await.map_err(|source| StorageError {
            operation: "begin transaction",
            source,
        })?;

        let diff = match self.store.upsert_leaderboard(&txn, &repositories).await {
            Ok(diff) => diff,
            Err(err) => {
                rollback(txn).await;
                return Err(err.into());
            }
        };

        let activity_records_saved = match self.store.replace_activity(&txn, &records).await {
            Ok(saved) => saved,
            Err(err) => {
                rollback(txn).await;
                return Err(err.into());
            }
        };

        txn.commit().await.map_err(|source| StorageError {
            operation: "commit transaction",
            source,
        })?;
        transition(stage, PassStage::Committed);

        info!(
            inserted = diff.inserted,
            updated = diff.updated,
            removed = diff.removed,
            "Leaderboard changes"
        );

        Ok(PassResult {
            repositories_processed: repositories.len(),
            activity_records_saved,
            degraded_repositories,
        })
    }
}

fn transition(stage: &mut PassStage, next: PassStage) {
    info!(from = %stage, to = %next, "Ingestion stage");
    *stage = next;
}

async fn rollback(txn: DatabaseTransaction) {
    if let Err(err) = txn.rollback().await {
        error!(error = %err, "Failed to roll back ingestion transaction");
    }
}
