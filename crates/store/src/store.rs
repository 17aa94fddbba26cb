use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use proposey_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, TracingAuditSink};
use proposey_core::config::{AppConfig, StorageBackend};
use proposey_core::document::DocumentBuilder;
use proposey_core::domain::acceptance::{AcceptanceRequest, AcceptanceState};
use proposey_core::domain::proposal::{
    ProposalConfig, ProposalDefaults, ProposalId, ProposalInput, ProposalRecord, ProposalSummary,
    RenderedDocument,
};
use proposey_core::errors::ApplicationError;
use proposey_core::pricing::{PricingCalculator, PricingEngine};
use proposey_core::workflow::{
    AcceptanceAction, AcceptanceEvent, AcceptanceWorkflow, WorkflowContext,
};

use crate::repositories::{
    FileProposalRepository, InMemoryProposalRepository, ProposalRepository, RepositoryError,
};

const MAX_ID_ATTEMPTS: usize = 8;

/// Caller identity and correlation id threaded through logs and audit events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    pub actor: String,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self { correlation_id: format!("req-{}", Uuid::new_v4().simple()), actor: actor.into() }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    fn audit(&self, id: &ProposalId) -> AuditContext {
        AuditContext::new(id.clone(), self.correlation_id.clone(), self.actor.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Create directly in `Shared` instead of `Draft`.
    pub share: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    pub default_tax_rate: Decimal,
    pub valid_days: u32,
    pub base_url: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { default_tax_rate: Decimal::ZERO, valid_days: 30, base_url: None }
    }
}

impl StoreSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_tax_rate: config.pricing.default_tax_rate,
            valid_days: config.document.valid_days,
            base_url: config.links.base_url.clone(),
        }
    }
}

/// Where a client views and downloads a shared proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub proposal_id: ProposalId,
    pub state: AcceptanceState,
    pub client_path: String,
    pub pdf_path: String,
    pub client_url: Option<String>,
    pub pdf_url: Option<String>,
    pub shared_at: DateTime<Utc>,
}

impl ShareLink {
    fn new(
        record: &ProposalRecord,
        base_url: Option<&str>,
        shared_at: DateTime<Utc>,
    ) -> Self {
        let client_path = format!("/proposal/{}", record.id);
        let pdf_path = format!("/api/proposal/{}/pdf", record.id);
        let absolute = |path: &str| base_url.map(|base| format!("{}{path}", base.trim_end_matches('/')));
        Self {
            proposal_id: record.id.clone(),
            state: record.state,
            client_url: absolute(&client_path),
            pdf_url: absolute(&pdf_path),
            client_path,
            pdf_path,
            shared_at,
        }
    }
}

pub struct ProposalStore {
    repository: Arc<dyn ProposalRepository>,
    builder: DocumentBuilder,
    pricing: Arc<dyn PricingEngine>,
    workflow: AcceptanceWorkflow,
    audit: Arc<dyn AuditSink>,
    settings: StoreSettings,
}

impl ProposalStore {
    pub fn new(
        repository: Arc<dyn ProposalRepository>,
        builder: DocumentBuilder,
        settings: StoreSettings,
    ) -> Self {
        Self {
            repository,
            builder,
            pricing: Arc::new(PricingCalculator),
            workflow: AcceptanceWorkflow::new(),
            audit: Arc::new(TracingAuditSink),
            settings,
        }
    }

    /// Builds the repository, brand and page geometry described by `config`.
    pub async fn open(config: &AppConfig) -> Result<Self, ApplicationError> {
        let repository: Arc<dyn ProposalRepository> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryProposalRepository::default()),
            StorageBackend::File => {
                Arc::new(FileProposalRepository::open(&config.storage.data_dir).await?)
            }
        };
        let brand =
            config.brand().map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let builder = DocumentBuilder::new(brand, config.page_geometry())?;
        Ok(Self::new(repository, builder, StoreSettings::from_config(config)))
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn create(
        &self,
        input: ProposalInput,
        options: CreateOptions,
        ctx: &RequestContext,
    ) -> Result<ProposalRecord, ApplicationError> {
        let now = Utc::now();
        let defaults = ProposalDefaults {
            tax_rate: self.settings.default_tax_rate,
            valid_days: self.settings.valid_days,
            today: now.date_naive(),
        };
        let config = ProposalConfig::from_input(input, &defaults, self.pricing.as_ref())?;
        let state = self.workflow.initial_state(options.share);

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ProposalId::generate();
            let document = self.builder.render(&id, &config, state, None)?;
            let record = ProposalRecord {
                id,
                config: config.clone(),
                document,
                created_at: now,
                state,
                shared_at: options.share.then_some(now),
                evidence: None,
            };

            match self.repository.insert(record.clone()).await {
                Ok(()) => {
                    self.record_created(&record, ctx);
                    return Ok(record);
                }
                Err(RepositoryError::Conflict(id)) => {
                    tracing::debug!(
                        event_name = "proposal.id_collision",
                        correlation_id = %ctx.correlation_id,
                        proposal_id = %id,
                        "generated id already taken, retrying"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(ApplicationError::Storage(format!(
            "could not allocate a unique proposal id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    pub async fn get(&self, id: &ProposalId) -> Result<ProposalRecord, ApplicationError> {
        self.repository.find_by_id(id).await?.ok_or_else(|| ApplicationError::not_found(id))
    }

    /// A client-facing read. Records a view event and never changes state.
    pub async fn get_for_client(
        &self,
        id: &ProposalId,
        ctx: &RequestContext,
    ) -> Result<ProposalRecord, ApplicationError> {
        let record = self.get(id).await?;
        self.audit.emit(
            ctx.audit(id)
                .event("proposal.viewed", AuditCategory::Access, AuditOutcome::Success)
                .with_metadata("state", record.state.as_str()),
        );
        Ok(record)
    }

    pub async fn document(&self, id: &ProposalId) -> Result<RenderedDocument, ApplicationError> {
        Ok(self.get(id).await?.document)
    }

    /// Newest first; ids break ties so the order is stable for a snapshot.
    pub async fn list(&self) -> Result<Vec<ProposalSummary>, ApplicationError> {
        let mut summaries = self.repository.list().await?;
        summaries.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(summaries)
    }

    /// Moves a draft to `Shared` and returns its links. Sharing again keeps the
    /// original `shared_at`.
    pub async fn share(
        &self,
        id: &ProposalId,
        ctx: &RequestContext,
    ) -> Result<ShareLink, ApplicationError> {
        let _lease = self.repository.lock_record(id).await?;
        let mut record = self.get(id).await?;
        let audit = ctx.audit(id);
        let outcome = self.workflow.apply_with_audit(
            record.state,
            AcceptanceEvent::LinkGenerated,
            &WorkflowContext { proposal_id: id.clone() },
            self.audit.as_ref(),
            &audit,
        )?;

        if outcome.from != outcome.to {
            let now = Utc::now();
            record.state = outcome.to;
            record.shared_at = Some(now);
            self.repository.save(record.clone()).await?;

            tracing::info!(
                event_name = "proposal.shared",
                correlation_id = %ctx.correlation_id,
                proposal_id = %id,
                "proposal shared"
            );
            self.audit.emit(
                audit.event("proposal.shared", AuditCategory::Lifecycle, AuditOutcome::Success),
            );
        }

        let shared_at = record.shared_at.unwrap_or(record.created_at);
        Ok(ShareLink::new(&record, self.settings.base_url.as_deref(), shared_at))
    }

    /// Records a client acceptance, re-renders the signature page and replaces
    /// the stored document. At most one acceptance succeeds per proposal.
    pub async fn update_acceptance(
        &self,
        id: &ProposalId,
        request: AcceptanceRequest,
        ctx: &RequestContext,
    ) -> Result<ProposalRecord, ApplicationError> {
        let _lease = self.repository.lock_record(id).await?;
        let mut record = self.get(id).await?;
        let audit = ctx.audit(id);
        let context = WorkflowContext { proposal_id: id.clone() };

        let accepted = self.workflow.accept(
            record.state,
            request,
            Utc::now(),
            &context,
            self.audit.as_ref(),
            &audit,
        );
        let (outcome, evidence) = match accepted {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(
                    event_name = "proposal.acceptance_rejected",
                    correlation_id = %ctx.correlation_id,
                    proposal_id = %id,
                    state = record.state.as_str(),
                    error = %error,
                    "acceptance rejected"
                );
                return Err(error.into());
            }
        };

        if outcome.requires(AcceptanceAction::RerenderDocument) {
            record.document = self.builder.render(id, &record.config, outcome.to, Some(&evidence))?;
            tracing::info!(
                event_name = "proposal.rendered",
                correlation_id = %ctx.correlation_id,
                proposal_id = %id,
                page_count = record.document.page_count(),
                digest = record.document.digest(),
                "document re-rendered"
            );
        }
        let signer = evidence.signer_name.clone();
        let method = evidence.method.label();
        record.state = outcome.to;
        record.evidence = Some(evidence);
        self.repository.save(record.clone()).await?;

        tracing::info!(
            event_name = "proposal.accepted",
            correlation_id = %ctx.correlation_id,
            proposal_id = %id,
            signer = %signer,
            method,
            "proposal accepted"
        );
        self.audit.emit(
            audit
                .event("proposal.accepted", AuditCategory::Lifecycle, AuditOutcome::Success)
                .with_metadata("signer", signer)
                .with_metadata("method", method)
                .with_metadata("document_digest", record.document.digest()),
        );
        Ok(record)
    }

    fn record_created(&self, record: &ProposalRecord, ctx: &RequestContext) {
        tracing::info!(
            event_name = "proposal.created",
            correlation_id = %ctx.correlation_id,
            proposal_id = %record.id,
            state = record.state.as_str(),
            total = %record.config.pricing.total,
            page_count = record.document.page_count(),
            "proposal created"
        );
        self.audit.emit(
            ctx.audit(&record.id)
                .event("proposal.created", AuditCategory::Lifecycle, AuditOutcome::Success)
                .with_metadata("state", record.state.as_str())
                .with_metadata("total", record.config.pricing.total.to_string())
                .with_metadata("page_count", record.document.page_count().to_string()),
        );
    }
}
