use std::sync::Arc;

use bondly_infra::{
    AutoApprovalSweeper, ContractService, EscrowService, InMemoryStore, MilestoneService,
    WebhookProcessor,
};
use bondly_jobs::{InMemoryJobStore, PipelineSteps};

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Shared secret for `POST /cron/auto-approve` (bearer token).
    pub cron_secret: String,
    /// Payment-provider webhook endpoint secret.
    pub webhook_secret: String,
    /// Feature flag for the async job queue endpoints.
    pub async_jobs_enabled: bool,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let cron_secret = std::env::var("CRON_SECRET").unwrap_or_else(|_| {
            tracing::warn!("CRON_SECRET not set; using insecure dev default");
            "dev-cron-secret".to_string()
        });
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set; using insecure dev default");
            "whsec_dev".to_string()
        });
        let async_jobs_enabled = std::env::var("ASYNC_JOBS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            cron_secret,
            webhook_secret,
            async_jobs_enabled,
        }
    }
}

/// Everything the handlers need, shared as one `Arc` extension.
pub struct AppServices {
    pub contracts: ContractService,
    pub milestones: MilestoneService,
    pub escrow: EscrowService,
    pub webhook: WebhookProcessor,
    pub sweeper: AutoApprovalSweeper,
    pub store: Arc<InMemoryStore>,
    pub jobs: Arc<InMemoryJobStore>,
    pub pipeline: PipelineSteps,
    pub config: ApiConfig,
}

/// Wire the in-memory stack. A Postgres deployment would build the same
/// services over `PostgresStore` here instead.
pub fn build_services(config: ApiConfig) -> AppServices {
    let store = InMemoryStore::arc();

    let contracts = ContractService::new(store.clone());
    let milestones = MilestoneService::new(store.clone(), store.clone());
    let escrow = EscrowService::new(store.clone(), store.clone());
    let webhook = WebhookProcessor::new(escrow.clone(), config.webhook_secret.clone());
    let sweeper = AutoApprovalSweeper::new(store.clone(), milestones.clone());

    AppServices {
        contracts,
        milestones,
        escrow,
        webhook,
        sweeper,
        store,
        jobs: InMemoryJobStore::arc(),
        pipeline: PipelineSteps::default(),
        config,
    }
}
