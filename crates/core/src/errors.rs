use thiserror::Error;

use crate::domain::acceptance::AcceptanceState;
use crate::domain::proposal::ProposalId;
use crate::workflow::AcceptanceEvent;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("content block {block_index} ({kind}) needs {required}pt but a page holds {available}pt")]
    LayoutOverflow { block_index: usize, kind: &'static str, required: String, available: String },
    #[error("transition {event:?} is not allowed from {state:?}")]
    InvalidState { state: AcceptanceState, event: AcceptanceEvent },
    #[error("proposal `{proposal_id}` has already been accepted")]
    AlreadyAccepted { proposal_id: ProposalId },
}

impl DomainError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn layout_overflow(
        block_index: usize,
        kind: &'static str,
        required: f32,
        available: f32,
    ) -> Self {
        Self::LayoutOverflow {
            block_index,
            kind,
            required: format!("{required:.2}"),
            available: format!("{available:.2}"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("proposal `{proposal_id}` was not found")]
    NotFound { proposal_id: ProposalId },
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Names of the error kinds as surfaced to the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    LayoutOverflow,
    NotFound,
    InvalidState,
    AlreadyAccepted,
    Storage,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInputError",
            Self::LayoutOverflow => "LayoutOverflowError",
            Self::NotFound => "NotFoundError",
            Self::InvalidState => "InvalidStateError",
            Self::AlreadyAccepted => "AlreadyAcceptedError",
            Self::Storage => "StorageError",
            Self::Configuration => "ConfigurationError",
        }
    }
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(DomainError::InvalidInput(_)) => ErrorKind::InvalidInput,
            Self::Domain(DomainError::LayoutOverflow { .. }) => ErrorKind::LayoutOverflow,
            Self::Domain(DomainError::InvalidState { .. }) => ErrorKind::InvalidState,
            Self::Domain(DomainError::AlreadyAccepted { .. }) => ErrorKind::AlreadyAccepted,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn not_found(proposal_id: &ProposalId) -> Self {
        Self::NotFound { proposal_id: proposal_id.clone() }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested proposal could not be found.",
            Self::Conflict { .. } => "This proposal has already been accepted.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        let message = value.to_string();
        match value {
            ApplicationError::Domain(DomainError::InvalidInput(_))
            | ApplicationError::Domain(DomainError::InvalidState { .. }) => {
                Self::BadRequest { message, correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::AlreadyAccepted { .. }) => {
                Self::Conflict { message, correlation_id: unassigned() }
            }
            ApplicationError::NotFound { .. } => {
                Self::NotFound { message, correlation_id: unassigned() }
            }
            ApplicationError::Storage(_) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::LayoutOverflow { .. })
            | ApplicationError::Configuration(_) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}
