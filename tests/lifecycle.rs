//! Tests for validation, sharing, and expiry of signed files

mod utils;

use assert_let_bind::assert_let;
use chrono::TimeDelta;
use vercre_sign::test_utils::Provider;
use vercre_sign::types::ReapReport;
use vercre_sign::Error;

#[tokio::test]
async fn tampered_file() {
    utils::init_tracer();
    let endpoint = utils::endpoint(Provider::new());
    let file_id = utils::contract(&endpoint).await;
    let claim = utils::verified(&endpoint, &file_id).await;
    endpoint.sign(&claim).await.expect("should sign");

    let record = utils::file(endpoint.provider(), &file_id).await.expect("should exist");
    let mut bytes = utils::contract_bytes();
    bytes[1024] ^= 0x01;
    endpoint.provider().blobs.tamper(&record.stored_path, bytes);

    assert_let!(Err(Error::HashMismatch(_)), endpoint.check(&file_id).await);

    // restoring the bytes restores the signature
    endpoint.provider().blobs.tamper(&record.stored_path, utils::contract_bytes());
    endpoint.check(&file_id).await.expect("should be unchanged");
}

#[tokio::test]
async fn send_link() {
    utils::init_tracer();
    let endpoint = utils::endpoint(Provider::new());
    let file_id = utils::contract(&endpoint).await;

    let result = endpoint.send_link(&file_id, "bob@example.com", "https://sign.example").await;
    assert_let!(Err(Error::NotSigned(_)), result);

    let claim = utils::verified(&endpoint, &file_id).await;
    endpoint.sign(&claim).await.expect("should sign");

    let result = endpoint.send_link(&file_id, "  ", "https://sign.example").await;
    assert_let!(Err(Error::InvalidRequest(_)), result);

    endpoint
        .send_link(&file_id, "bob@example.com", "https://sign.example/")
        .await
        .expect("should send");
    let sent = endpoint.provider().notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "bob@example.com");
    assert_eq!(
        sent[0].1,
        format!(
            "You have received a signed file: contract.pdf. \
             Verify and download it here: https://sign.example/verify/{file_id}"
        )
    );

    endpoint.provider().notifier.fail(true);
    let result = endpoint.send_link(&file_id, "bob@example.com", "https://sign.example").await;
    assert_let!(Err(Error::DeliveryFailed(_)), result);

    // delivery failure leaves the signature untouched
    endpoint.check(&file_id).await.expect("should still be signed");
}

#[tokio::test]
async fn reaper_is_idempotent() {
    utils::init_tracer();
    let endpoint = utils::endpoint(Provider::new());

    let old = utils::contract(&endpoint).await;
    let claim = utils::verified(&endpoint, &old).await;
    endpoint.sign(&claim).await.expect("should sign");

    endpoint.provider().clock.advance(TimeDelta::hours(23));
    let fresh = utils::contract(&endpoint).await;
    endpoint.provider().clock.advance(TimeDelta::hours(2));

    let report = endpoint.reap().await.expect("should reap");
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_retained, 0);
    assert_eq!(report.sessions_purged, 1);

    assert!(utils::file(endpoint.provider(), &old).await.is_none());
    assert_let!(Err(Error::FileNotFound(_)), endpoint.check(&old).await);
    assert!(utils::file(endpoint.provider(), &fresh).await.is_some());

    let report = endpoint.reap().await.expect("should reap");
    assert_eq!(report, ReapReport::default());
}

#[tokio::test]
async fn reaper_tolerates_missing_blob() {
    utils::init_tracer();
    let endpoint = utils::endpoint(Provider::new());
    let file_id = utils::contract(&endpoint).await;
    let record = utils::file(endpoint.provider(), &file_id).await.expect("should exist");

    vercre_sign::provider::BlobStore::delete(endpoint.provider(), &record.stored_path)
        .await
        .expect("should delete");
    assert!(!endpoint.provider().blobs.contains(&record.stored_path));

    endpoint.provider().clock.advance(TimeDelta::hours(25));
    let report = endpoint.reap().await.expect("should reap");
    assert_eq!(report.files_removed, 1);
    assert!(utils::file(endpoint.provider(), &file_id).await.is_none());
}

#[tokio::test]
async fn expired_file_refuses_requests() {
    utils::init_tracer();
    let endpoint = utils::endpoint(Provider::new());
    let file_id = utils::contract(&endpoint).await;

    endpoint.provider().clock.advance(TimeDelta::hours(25));
    assert_let!(Err(Error::RetentionExpired(_)), endpoint.issue_request(&file_id).await);
}
