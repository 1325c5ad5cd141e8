//! # Wallet Invocation
//!
//! Builds the URI that hands a presentation request to the Wallet and
//! renders it as a scannable QR code.
//!
//! The Request Object is passed by reference: the Wallet URI carries only
//! `client_id` and a `request_uri` from which the Wallet fetches the signed
//! Request Object. This keeps the QR code small enough to scan reliably.
//!
//! ```http
//! openid4vp://authorize?client_id=https%3A%2F%2Fsign.example.com&request_uri=https%3A%2F%2Fsign.example.com%2Frequest%2F<state>
//! ```

use std::io::Cursor;

use anyhow::anyhow;
use base64ct::{Base64, Encoding};
use qrcode::QrCode;

use crate::config::Config;
use crate::types::IssueResponse;

/// URI the Wallet fetches the Request Object for `state` from.
#[must_use]
pub fn request_uri(config: &Config, state: &str) -> String {
    format!("{}/request/{state}", config.request_uri_base.trim_end_matches('/'))
}

/// URI that invokes the Wallet for `state`.
#[must_use]
pub fn wallet_uri(config: &Config, state: &str) -> String {
    format!(
        "{}?client_id={}&request_uri={}",
        config.wallet_scheme,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&request_uri(config, state))
    )
}

/// Render `uri` as a QR code, returned as a PNG data URI.
///
/// # Errors
///
/// Returns an error if the URI is too long to encode or the image cannot be
/// written.
pub fn to_qrcode(uri: &str) -> anyhow::Result<String> {
    let qr_code = QrCode::new(uri).map_err(|e| anyhow!("Failed to create QR code: {e}"))?;

    // write image to buffer
    let img_buf = qr_code.render::<image::Luma<u8>>().build();
    let mut buffer: Vec<u8> = Vec::new();
    let mut writer = Cursor::new(&mut buffer);
    img_buf
        .write_to(&mut writer, image::ImageFormat::Png)
        .map_err(|e| anyhow!("Failed to create QR code: {e}"))?;

    Ok(format!("data:image/png;base64,{}", Base64::encode_string(buffer.as_slice())))
}

/// Types that can be handed to a Wallet as a QR code.
pub trait EncodeForWallet {
    /// Render as a PNG data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the QR code cannot be generated.
    fn to_qrcode(&self) -> anyhow::Result<String>;
}

impl EncodeForWallet for IssueResponse {
    fn to_qrcode(&self) -> anyhow::Result<String> {
        to_qrcode(&self.wallet_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_reference_uri() {
        let config = Config::builder()
            .client_id("https://sign.example.com")
            .request_uri_base("https://sign.example.com/")
            .build()
            .expect("should build");

        assert_eq!(request_uri(&config, "abc"), "https://sign.example.com/request/abc");
        assert_eq!(
            wallet_uri(&config, "abc"),
            "openid4vp://authorize?client_id=https%3A%2F%2Fsign.example.com&request_uri=https%3A%2F%2Fsign.example.com%2Frequest%2Fabc"
        );
    }

    #[test]
    fn qrcode_png() {
        let qr = to_qrcode("openid4vp://authorize?request_uri=x").expect("should render");
        let data = qr.strip_prefix("data:image/png;base64,").expect("should be a data uri");
        let png = Base64::decode_vec(data).expect("should be base64");
        assert_eq!(&png[1..4], b"PNG");
    }
}
