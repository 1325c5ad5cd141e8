#![allow(missing_docs)]
#![allow(dead_code)]

use vercre_sign::model::{FileRecord, Session};
use vercre_sign::provider::StateStore;
use vercre_sign::test_utils::{sample, Provider};
pub use vercre_sign::test_utils::init_tracer;
use vercre_sign::types::VerifiedClaim;
use vercre_sign::{registry, session, Config, Endpoint};

pub const HOLDER: &str = "did:example:alice";

pub fn endpoint(provider: Provider) -> Endpoint<Provider> {
    Endpoint::new(provider, Config::default())
}

/// Upload a 10 KB `contract.pdf`.
pub async fn contract(endpoint: &Endpoint<Provider>) -> String {
    endpoint.upload("contract.pdf", contract_bytes()).await.expect("should upload").file_id
}

pub fn contract_bytes() -> Vec<u8> {
    (0..10_240_u32).map(|i| (i % 251) as u8).collect()
}

/// Issue a request for the file and verify a JSON presentation for `HOLDER`.
pub async fn verified(endpoint: &Endpoint<Provider>, file_id: &str) -> VerifiedClaim {
    let issued = endpoint.issue_request(file_id).await.expect("should issue");
    let vp = sample::json_vp(HOLDER, &issued.request_object.nonce);
    endpoint.verify(&sample::response(&issued.state, vp)).await.expect("should verify")
}

pub async fn session(provider: &Provider, token: &str) -> Session {
    StateStore::get::<Session>(provider, &session::key(token))
        .await
        .expect("should read")
        .expect("session should exist")
}

pub async fn file(provider: &Provider, file_id: &str) -> Option<FileRecord> {
    StateStore::get::<FileRecord>(provider, &registry::key(file_id)).await.expect("should read")
}
