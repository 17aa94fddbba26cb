use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::image::ImageRef;
use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceState};
use crate::errors::DomainError;
use crate::pricing::tax::resolve_tax_rate;
use crate::pricing::{LineItem, PaymentSchedule, PricingCalculation, PricingEngine};

const PROPOSAL_ID_LEN: usize = 12;
pub const MAX_VALID_DAYS: u32 = 365;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl ProposalId {
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..PROPOSAL_ID_LEN].to_string())
    }

    /// Accepts only ids shaped like generated ones, so an id is always safe to use
    /// as a storage key or file name.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        let well_formed = value.len() == PROPOSAL_ID_LEN
            && value.bytes().all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if !well_formed {
            return Err(DomainError::invalid_input(format!(
                "proposal id `{value}` must be {PROPOSAL_ID_LEN} lowercase hex characters"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub company: String,
    pub contact: String,
    pub title: String,
    pub phone: String,
    pub email: String,
}

impl ClientInfo {
    /// Company if present, otherwise the contact person.
    pub fn display_name(&self) -> &str {
        if self.company.trim().is_empty() {
            self.contact.trim()
        } else {
            self.company.trim()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub section: String,
    pub description: String,
}

impl ProjectInfo {
    pub fn full_address(&self) -> String {
        let street = self.address.trim();
        let city = self.city.trim();
        let region = [self.state.trim(), self.zip.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [street, city, region.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeItem {
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// Inbound creation payload. Totals are never accepted from the caller; they are
/// derived from `line_items` when the proposal is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalInput {
    pub client: ClientInfo,
    pub project: ProjectInfo,
    pub line_items: Vec<LineItem>,
    pub tax_rate: Option<Decimal>,
    pub scope: Vec<ScopeItem>,
    pub deposit_percent: Option<Decimal>,
    pub terms: String,
    pub proposal_date: Option<NaiveDate>,
    pub valid_days: Option<u32>,
    #[serde(skip)]
    pub image: Option<ImageRef>,
    pub image_caption: Option<String>,
}

/// Values filled in when the input leaves them out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDefaults {
    pub tax_rate: Decimal,
    pub valid_days: u32,
    pub today: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalConfig {
    pub client: ClientInfo,
    pub project: ProjectInfo,
    pub pricing: PricingCalculation,
    pub payment_schedule: Option<PaymentSchedule>,
    pub scope: Vec<ScopeItem>,
    pub terms: String,
    pub proposal_date: NaiveDate,
    pub valid_days: u32,
    pub image: Option<ImageRef>,
    pub image_caption: Option<String>,
}

impl ProposalConfig {
    pub fn from_input<P>(
        input: ProposalInput,
        defaults: &ProposalDefaults,
        pricing: &P,
    ) -> Result<Self, DomainError>
    where
        P: PricingEngine + ?Sized,
    {
        if input.client.display_name().is_empty() {
            return Err(DomainError::invalid_input("client company or contact name is required"));
        }
        let valid_days = input.valid_days.unwrap_or(defaults.valid_days);
        if valid_days == 0 || valid_days > MAX_VALID_DAYS {
            return Err(DomainError::invalid_input(format!(
                "valid_days must be between 1 and {MAX_VALID_DAYS}"
            )));
        }
        if let Some(image) = &input.image {
            if !image.has_data() {
                return Err(DomainError::invalid_input("image reference carries no bytes"));
            }
            image.embedding()?;
        }

        let proposal_date = input.proposal_date.unwrap_or(defaults.today);
        if expiry(proposal_date, valid_days).is_none() {
            return Err(DomainError::invalid_input(format!(
                "proposal date {proposal_date} plus {valid_days} days is past the supported calendar"
            )));
        }

        let tax_rate = resolve_tax_rate(input.tax_rate, Some(input.project.state.as_str()), defaults.tax_rate);
        let pricing = pricing.compute(&input.line_items, tax_rate)?;
        let payment_schedule = input
            .deposit_percent
            .map(|percent| PaymentSchedule::for_pricing(&pricing, percent))
            .transpose()?;

        let mut project = input.project;
        if project.name.trim().is_empty() {
            project.name = "Project".to_string();
        }

        Ok(Self {
            client: input.client,
            project,
            pricing,
            payment_schedule,
            scope: input.scope,
            terms: input.terms.trim().to_string(),
            proposal_date,
            valid_days,
            image: input.image,
            image_caption: input.image_caption.filter(|caption| !caption.trim().is_empty()),
        })
    }

    /// `P-YYYY-MMDD`, derived from the proposal date.
    pub fn proposal_number(&self) -> String {
        let date = self.proposal_date;
        format!("P-{}-{:02}{:02}", date.year(), date.month(), date.day())
    }

    pub fn valid_through(&self) -> NaiveDate {
        expiry(self.proposal_date, self.valid_days).unwrap_or(NaiveDate::MAX)
    }
}

fn expiry(date: NaiveDate, valid_days: u32) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(i64::from(valid_days)))
}

/// A finished, immutable document artifact. Cloning shares the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    bytes: Arc<Vec<u8>>,
    page_count: usize,
    digest: String,
}

impl RenderedDocument {
    pub fn new(bytes: Vec<u8>, page_count: usize) -> Self {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        Self { bytes: Arc::new(bytes), page_count, digest }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            page_count: self.page_count,
            byte_len: self.bytes.len(),
            digest: self.digest.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub page_count: usize,
    pub byte_len: usize,
    pub digest: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub config: ProposalConfig,
    pub document: RenderedDocument,
    pub created_at: DateTime<Utc>,
    pub state: AcceptanceState,
    pub shared_at: Option<DateTime<Utc>>,
    pub evidence: Option<AcceptanceEvidence>,
}

impl ProposalRecord {
    pub fn snapshot(&self) -> ProposalSnapshot {
        ProposalSnapshot {
            id: self.id.clone(),
            state: self.state,
            created_at: self.created_at,
            shared_at: self.shared_at,
            config: self.config.clone(),
            evidence: self.evidence.clone(),
            document: self.document.metadata(),
        }
    }

    pub fn summary(&self) -> ProposalSummary {
        ProposalSummary {
            id: self.id.clone(),
            project_name: self.config.project.name.clone(),
            client: self.config.client.display_name().to_string(),
            state: self.state,
            total: self.config.pricing.total,
            page_count: self.document.page_count(),
            created_at: self.created_at,
            shared_at: self.shared_at,
            accepted_at: self.evidence.as_ref().map(|evidence| evidence.accepted_at),
        }
    }
}

/// JSON view of a record without binary blobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    pub id: ProposalId,
    pub state: AcceptanceState,
    pub created_at: DateTime<Utc>,
    pub shared_at: Option<DateTime<Utc>>,
    pub config: ProposalConfig,
    pub evidence: Option<AcceptanceEvidence>,
    pub document: DocumentMetadata,
}

impl ProposalSnapshot {
    pub fn summary(&self) -> ProposalSummary {
        ProposalSummary {
            id: self.id.clone(),
            project_name: self.config.project.name.clone(),
            client: self.config.client.display_name().to_string(),
            state: self.state,
            total: self.config.pricing.total,
            page_count: self.document.page_count,
            created_at: self.created_at,
            shared_at: self.shared_at,
            accepted_at: self.evidence.as_ref().map(|evidence| evidence.accepted_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub id: ProposalId,
    pub project_name: String,
    pub client: String,
    pub state: AcceptanceState,
    pub total: Decimal,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
    pub shared_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
}
