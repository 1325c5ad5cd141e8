//! # Document Signing Server
//!
//! A demo HTTP front end for `vercre-sign`. Files are uploaded, signed once
//! the holder presents a credential from their Wallet, and can then be shared
//! and verified by anyone holding the file id.
//!
//! Configuration is read from the environment:
//!
//! * `LISTEN_ADDR` - address to bind (default `0.0.0.0:8080`)
//! * `BASE_URL` - externally visible URL of the server
//! * `DATA_DIR` - where uploads, state and the proof signing key are kept
//!   (default `./data`)
//! * `CREDENTIAL_TYPE` - credential the holder must present
//!
//! The proof signing key is generated into `DATA_DIR/signing.key` on first
//! start. Anyone who can read that file can forge proofs.

mod provider;

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vercre_sign::types::{
    CheckResponse, IssueResponse, ResponseRequest, ResponseResponse, SignStatus,
    UploadResponse,
};
use vercre_sign::wallet::EncodeForWallet;
use vercre_sign::{Config, Endpoint, Error};

use crate::provider::Provider;

type AppState = Endpoint<Provider>;

const REAP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[allow(clippy::needless_return)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let listen = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));
    let credential_type = env::var("CREDENTIAL_TYPE").unwrap_or_else(|_| "SwissEID".into());

    let config = Config::builder()
        .client_id(base_url.clone())
        .response_uri(format!("{base_url}/callback"))
        .request_uri_base(base_url)
        .credential_type(credential_type.clone())
        .build()?;
    let max_upload = usize::try_from(config.max_upload_bytes)?;

    let provider = Provider::new(data_dir, &credential_type, &config.client_id).await?;
    let endpoint = Endpoint::new(provider, config);

    tokio::spawn(reaper(endpoint.clone()));

    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

    let router = Router::new()
        .route("/upload", post(upload))
        .route("/sign/:file_id", post(sign))
        .route("/request/:state", get(request_object))
        .route("/callback", post(callback))
        .route("/status/:file_id", get(status))
        .route("/share/:file_id", get(share))
        .route("/send-link/:file_id", post(send_link))
        .route("/verify/:file_id", get(verify))
        .route("/download/:file_id", get(download))
        .layer(DefaultBodyLimit::max(max_upload + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(endpoint);

    let listener = TcpListener::bind(&listen).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

// Sweep expired files and sessions on a fixed interval.
async fn reaper(endpoint: AppState) {
    let mut interval = tokio::time::interval(REAP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = endpoint.reap().await {
            tracing::error!("reaper sweep failed: {e}");
        }
    }
}

// Upload endpoint (multipart, field `file`)
#[axum::debug_handler]
async fn upload(
    State(endpoint): State<AppState>, mut multipart: Multipart,
) -> AxResult<UploadResponse> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return AxResult(Err(Error::InvalidRequest("no file part".into()))),
            Err(e) => return AxResult(Err(Error::InvalidRequest(e.to_string()))),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return AxResult(Err(Error::InvalidRequest(e.to_string()))),
        };
        return endpoint.upload(&name, bytes.to_vec()).await.into();
    }
}

#[derive(Serialize)]
struct SignResponse {
    #[serde(flatten)]
    request: IssueResponse,
    qr_code: String,
}

// Start a signing session
#[axum::debug_handler]
async fn sign(
    State(endpoint): State<AppState>, Path(file_id): Path<String>,
) -> AxResult<SignResponse> {
    let request = match endpoint.issue_request(&file_id).await {
        Ok(request) => request,
        Err(e) => return AxResult(Err(e)),
    };
    let qr_code = match request.to_qrcode() {
        Ok(qr_code) => qr_code,
        Err(e) => return AxResult(Err(Error::ServerError(e.to_string()))),
    };
    AxResult(Ok(SignResponse { request, qr_code }))
}

// Retrieve Authorization Request Object endpoint
#[axum::debug_handler]
async fn request_object(State(endpoint): State<AppState>, Path(state): Path<String>) -> Response {
    match endpoint.request_object(&state).await {
        Ok(jwt) => {
            ([(header::CONTENT_TYPE, "application/oauth-authz-req+jwt")], jwt).into_response()
        }
        Err(e) => AxResult::<()>(Err(e)).into_response(),
    }
}

// Wallet Authorization response endpoint
#[axum::debug_handler]
async fn callback(
    State(endpoint): State<AppState>, Form(form): Form<HashMap<String, String>>,
) -> AxResult<ResponseResponse> {
    let request = match ResponseRequest::form_decode(&form) {
        Ok(request) => request,
        Err(e) => return AxResult(Err(Error::MalformedArtifact(e.to_string()))),
    };
    endpoint.callback(&request).await.into()
}

#[axum::debug_handler]
async fn status(
    State(endpoint): State<AppState>, Path(file_id): Path<String>,
) -> AxResult<SignStatus> {
    endpoint.sign_status(&file_id).await.into()
}

// Details needed to share a signed file
#[axum::debug_handler]
async fn share(State(endpoint): State<AppState>, Path(file_id): Path<String>) -> Response {
    match endpoint.sign_status(&file_id).await {
        Ok(status) if status.status == "signed" => {
            let verify_url = format!("{}/verify/{file_id}", endpoint.config().request_uri_base);
            Json(json!({"status": status, "verify_url": verify_url})).into_response()
        }
        Ok(_) => AxResult::<()>(Err(Error::NotSigned(format!("file {file_id} is not signed"))))
            .into_response(),
        Err(e) => AxResult::<()>(Err(e)).into_response(),
    }
}

#[derive(Deserialize)]
struct SendLinkRequest {
    recipient: String,
}

#[axum::debug_handler]
async fn send_link(
    State(endpoint): State<AppState>, Path(file_id): Path<String>,
    Json(request): Json<SendLinkRequest>,
) -> AxResult<serde_json::Value> {
    let base_url = endpoint.config().request_uri_base.clone();
    endpoint
        .send_link(&file_id, &request.recipient, &base_url)
        .await
        .map(|()| json!({"sent": true}))
        .into()
}

#[axum::debug_handler]
async fn verify(
    State(endpoint): State<AppState>, Path(file_id): Path<String>,
) -> AxResult<CheckResponse> {
    endpoint.check(&file_id).await.into()
}

#[axum::debug_handler]
async fn download(State(endpoint): State<AppState>, Path(file_id): Path<String>) -> Response {
    let mut download = match endpoint.download(&file_id).await {
        Ok(download) => download,
        Err(e) => return AxResult::<()>(Err(e)).into_response(),
    };
    let mut bytes = Vec::new();
    if let Err(e) = download.reader.read_to_end(&mut bytes).await {
        return AxResult::<()>(Err(Error::StorageFailure(e.to_string()))).into_response();
    }

    let disposition = format!("attachment; filename=\"{}\"", download.record.original_name);
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response()
}

// ----------------------------------------------------------------------------
// Axum Response
// ----------------------------------------------------------------------------

/// Axum response wrapper
pub struct AxResult<T>(vercre_sign::Result<T>);

impl<T> IntoResponse for AxResult<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self.0 {
            Ok(v) => (StatusCode::OK, Json(json!(v))),
            Err(e) => (status_code(&e), Json(e.to_json())),
        }
        .into_response()
    }
}

impl<T> From<vercre_sign::Result<T>> for AxResult<T> {
    fn from(val: vercre_sign::Result<T>) -> Self {
        Self(val)
    }
}

const fn status_code(err: &Error) -> StatusCode {
    match err {
        Error::UnknownSession(_) | Error::FileNotFound(_) => StatusCode::NOT_FOUND,
        Error::SessionExpired(_) | Error::RetentionExpired(_) => StatusCode::GONE,
        Error::AlreadySigned(_) => StatusCode::CONFLICT,
        Error::HashMismatch(_) | Error::NotSigned(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::MalformedArtifact(_) | Error::NonceMismatch(_) | Error::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::CredentialInvalid(_) => StatusCode::FORBIDDEN,
        Error::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        Error::StorageFailure(_) | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
