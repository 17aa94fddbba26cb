pub mod audit;
pub mod config;
pub mod document;
pub mod domain;
pub mod errors;
pub mod layout;
pub mod pricing;
pub mod workflow;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, StorageBackend};
pub use document::{Brand, DocumentBuilder, ImageRef};
pub use domain::acceptance::{
    AcceptanceEvidence, AcceptanceMethod, AcceptanceRequest, AcceptanceState,
};
pub use domain::proposal::{
    ProposalConfig, ProposalDefaults, ProposalId, ProposalInput, ProposalRecord, ProposalSnapshot,
    ProposalSummary, RenderedDocument,
};
pub use errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};
pub use layout::{LayoutEngine, PageGeometry, PageSize};
pub use pricing::{LineItem, PricingCalculation, PricingCalculator, PricingEngine};
pub use workflow::{AcceptanceEvent, AcceptanceWorkflow};
