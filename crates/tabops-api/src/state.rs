//! Application state for the API server

use std::sync::Arc;
use std::time::Instant;

use tabops_config::AppConfig;
use tabops_core::{
    AssetRetriever, AuditEngine, ContentMutator, MonitorSettings, Notifier, RevisionHistory,
    SessionProvider, SiteContext, SiteMonitor, SnapshotStore,
};

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Project and content mutations
    pub mutator: ContentMutator,
    /// Package and view downloads
    pub retriever: Arc<AssetRetriever>,
    /// Revision lookups
    pub history: Arc<RevisionHistory>,
    /// Snapshot audits; one engine so runs are serialized
    pub audit: Arc<AuditEngine>,
    /// Monitoring checks
    pub monitor: Arc<SiteMonitor>,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Wire every component to one session provider.
    ///
    /// `alerts` receives audit and Pulse failures, `chat` the activity report.
    pub fn new(
        config: AppConfig,
        sessions: Arc<dyn SessionProvider>,
        alerts: Arc<dyn Notifier>,
        chat: Arc<dyn Notifier>,
    ) -> Self {
        let ctx = SiteContext::new(sessions, config.server.site_id.clone());
        let monitor_settings = MonitorSettings {
            download_dir: config.storage.download_dir.clone(),
            slack_webhook_url: config.slack.webhook_url.clone(),
            pulse_datasource: config.pulse.datasource_name.clone(),
        };

        Self {
            mutator: ContentMutator::new(ctx.clone()),
            retriever: Arc::new(AssetRetriever::new(
                ctx.clone(),
                config.storage.download_dir.clone(),
            )),
            history: Arc::new(RevisionHistory::new(ctx.clone())),
            audit: Arc::new(AuditEngine::new(
                ctx.clone(),
                SnapshotStore::new(config.storage.snapshot_dir.clone()),
                Arc::clone(&alerts),
            )),
            monitor: Arc::new(SiteMonitor::new(ctx, monitor_settings, alerts, chat)),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
