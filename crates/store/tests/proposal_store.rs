use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use proposey_core::audit::InMemoryAuditSink;
use proposey_core::document::{Brand, DocumentBuilder};
use proposey_core::domain::acceptance::{AcceptanceMethod, AcceptanceRequest, AcceptanceState};
use proposey_core::domain::proposal::{ClientInfo, ProjectInfo, ProposalId, ProposalInput};
use proposey_core::errors::{ApplicationError, DomainError, ErrorKind};
use proposey_core::layout::{PageGeometry, PageSize};
use proposey_core::pricing::LineItem;
use proposey_store::{
    CreateOptions, FileProposalRepository, InMemoryProposalRepository, ProposalRepository,
    ProposalStore, RequestContext, StoreSettings,
};

fn builder() -> DocumentBuilder {
    DocumentBuilder::new(Brand::default(), PageGeometry::new(PageSize::Letter, 54.0, 30.0, 24.0))
        .expect("builder")
}

fn store_with(repository: Arc<dyn ProposalRepository>) -> (ProposalStore, InMemoryAuditSink) {
    let audit = InMemoryAuditSink::default();
    let settings = StoreSettings {
        base_url: Some("https://proposals.example.com/".to_string()),
        ..StoreSettings::default()
    };
    let store = ProposalStore::new(repository, builder(), settings)
        .with_audit_sink(Arc::new(audit.clone()));
    (store, audit)
}

fn memory_store() -> (ProposalStore, InMemoryAuditSink) {
    store_with(Arc::new(InMemoryProposalRepository::default()))
}

fn input() -> ProposalInput {
    ProposalInput {
        client: ClientInfo { company: "Acme Property".to_string(), ..ClientInfo::default() },
        project: ProjectInfo { name: "Riverside Ducts".to_string(), ..ProjectInfo::default() },
        line_items: vec![
            LineItem::new("Duct cleaning", Decimal::ONE, Decimal::new(45_000, 2)),
            LineItem::new("Vent sealing", Decimal::new(3, 0), Decimal::new(6_000, 2)),
        ],
        tax_rate: Some(Decimal::new(8, 2)),
        ..ProposalInput::default()
    }
}

fn ctx() -> RequestContext {
    RequestContext::new("test-operator")
}

fn signer() -> AcceptanceRequest {
    AcceptanceRequest::new("Dana Client", AcceptanceMethod::TypedName)
}

#[tokio::test]
async fn create_prices_renders_and_persists() {
    let (store, audit) = memory_store();

    let record = store.create(input(), CreateOptions::default(), &ctx()).await.expect("create");

    assert_eq!(record.state, AcceptanceState::Draft);
    assert_eq!(record.config.pricing.subtotal, Decimal::new(63_000, 2));
    assert_eq!(record.config.pricing.tax, Decimal::new(5_040, 2));
    assert_eq!(record.config.pricing.total, Decimal::new(68_040, 2));
    assert!(record.document.bytes().starts_with(b"%PDF-1.4"));
    assert!(record.document.page_count() >= 1);
    assert_eq!(store.get(&record.id).await.expect("get"), record);
    assert_eq!(audit.events_named("proposal.created").len(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_input_without_persisting() {
    let (store, _audit) = memory_store();
    let mut bad = input();
    bad.line_items[0].quantity = Decimal::NEGATIVE_ONE;

    let error = store.create(bad, CreateOptions::default(), &ctx()).await.expect_err("negative");
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert!(store.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (store, _audit) = memory_store();
    let missing = ProposalId::parse("ffffffffffff").expect("id");

    assert_eq!(store.get(&missing).await.expect_err("get").kind(), ErrorKind::NotFound);
    assert_eq!(store.share(&missing, &ctx()).await.expect_err("share").kind(), ErrorKind::NotFound);
    let error = store.update_acceptance(&missing, signer(), &ctx()).await.expect_err("accept");
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn accepting_a_draft_is_an_invalid_state() {
    let (store, _audit) = memory_store();
    let record = store.create(input(), CreateOptions::default(), &ctx()).await.expect("create");

    let error = store.update_acceptance(&record.id, signer(), &ctx()).await.expect_err("draft");
    assert!(matches!(
        error,
        ApplicationError::Domain(DomainError::InvalidState { state: AcceptanceState::Draft, .. })
    ));
    assert_eq!(store.get(&record.id).await.expect("get").state, AcceptanceState::Draft);
}

#[tokio::test]
async fn share_then_accept_once() {
    let (store, audit) = memory_store();
    let record = store.create(input(), CreateOptions::default(), &ctx()).await.expect("create");

    let link = store.share(&record.id, &ctx()).await.expect("share");
    assert_eq!(link.state, AcceptanceState::Shared);
    assert_eq!(link.client_path, format!("/proposal/{}", record.id));
    assert_eq!(link.pdf_path, format!("/api/proposal/{}/pdf", record.id));
    assert_eq!(
        link.client_url.as_deref(),
        Some(format!("https://proposals.example.com/proposal/{}", record.id).as_str())
    );

    let again = store.share(&record.id, &ctx()).await.expect("share again");
    assert_eq!(again.shared_at, link.shared_at);

    let accepted = store.update_acceptance(&record.id, signer(), &ctx()).await.expect("accept");
    assert_eq!(accepted.state, AcceptanceState::Accepted);
    let evidence = accepted.evidence.as_ref().expect("evidence");
    assert_eq!(evidence.signer_name, "Dana Client");
    assert_ne!(accepted.document.digest(), record.document.digest());

    let duplicate = store.update_acceptance(&record.id, signer(), &ctx()).await.expect_err("dup");
    assert_eq!(duplicate.kind(), ErrorKind::AlreadyAccepted);

    let stored = store.get(&record.id).await.expect("get");
    assert_eq!(stored.state, AcceptanceState::Accepted);
    assert_eq!(stored.evidence, accepted.evidence);
    assert_eq!(stored.document, accepted.document);

    assert_eq!(audit.events_named("proposal.shared").len(), 1);
    assert_eq!(audit.events_named("proposal.accepted").len(), 1);
    assert_eq!(audit.events_named("workflow.transition_rejected").len(), 1);
}

#[tokio::test]
async fn server_clock_wins_over_client_reported_date() {
    let (store, _audit) = memory_store();
    let record = store
        .create(input(), CreateOptions { share: true }, &ctx())
        .await
        .expect("create shared");
    assert!(record.shared_at.is_some());

    let mut request = signer();
    request.client_reported_date = Some("1999-01-01".to_string());
    let before = chrono::Utc::now();
    let accepted = store.update_acceptance(&record.id, request, &ctx()).await.expect("accept");

    let evidence = accepted.evidence.expect("evidence");
    assert!(evidence.accepted_at >= before);
    assert_eq!(evidence.client_reported_date.as_deref(), Some("1999-01-01"));
}

#[tokio::test]
async fn blank_signer_is_rejected_before_any_transition() {
    let (store, audit) = memory_store();
    let record =
        store.create(input(), CreateOptions { share: true }, &ctx()).await.expect("create");

    let request = AcceptanceRequest::new("   ", AcceptanceMethod::ClickThrough);
    let error = store.update_acceptance(&record.id, request, &ctx()).await.expect_err("blank");

    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(store.get(&record.id).await.expect("get").state, AcceptanceState::Shared);
    assert!(audit.events_named("workflow.transition_applied").is_empty());
}

#[tokio::test]
async fn client_reads_are_audited_and_never_mutate() {
    let (store, audit) = memory_store();
    let record =
        store.create(input(), CreateOptions { share: true }, &ctx()).await.expect("create");

    let viewed = store.get_for_client(&record.id, &ctx()).await.expect("view");

    assert_eq!(viewed, record);
    assert_eq!(audit.events_named("proposal.viewed").len(), 1);
}

#[tokio::test]
async fn list_is_newest_first() {
    let (store, _audit) = memory_store();
    let first = store.create(input(), CreateOptions::default(), &ctx()).await.expect("first");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = store.create(input(), CreateOptions::default(), &ctx()).await.expect("second");

    let ids: Vec<ProposalId> =
        store.list().await.expect("list").into_iter().map(|summary| summary.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let id = {
        let repository = FileProposalRepository::open(dir.path()).await.expect("open");
        let (store, _audit) = store_with(Arc::new(repository));
        let record =
            store.create(input(), CreateOptions { share: true }, &ctx()).await.expect("create");
        store.update_acceptance(&record.id, signer(), &ctx()).await.expect("accept");
        record.id
    };

    let repository = FileProposalRepository::open(dir.path()).await.expect("reopen");
    let (store, _audit) = store_with(Arc::new(repository));
    let record = store.get(&id).await.expect("get");

    assert_eq!(record.state, AcceptanceState::Accepted);
    assert_eq!(record.evidence.expect("evidence").signer_name, "Dana Client");
    let document = store.document(&id).await.expect("document");
    assert!(document.bytes().windows(15).any(|window| window == b"/s/ Dana Client"));
}

#[tokio::test]
async fn create_reports_storage_error_when_the_medium_rejects_writes() {
    let dir = TempDir::new().expect("tempdir");
    let repository = FileProposalRepository::open(dir.path()).await.expect("open");
    let (store, audit) = store_with(Arc::new(repository));
    let documents = dir.path().join("documents");
    std::fs::remove_dir_all(&documents).expect("remove documents dir");
    std::fs::write(&documents, b"not a directory").expect("block documents dir");

    let error = store.create(input(), CreateOptions::default(), &ctx()).await.expect_err("unwritable");

    assert_eq!(error.kind(), ErrorKind::Storage);
    assert!(store.list().await.expect("list").is_empty());
    assert!(audit.events_named("proposal.created").is_empty());
}
