//! Application server (VAPID, RFC 8292) public key handling.
//!
//! The page receives the server's public key as URL-safe base64 and must hand
//! the platform the raw bytes: a 65-byte uncompressed SEC1 P-256 point
//! (`0x04 || x || y`).

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};

/// Length of an uncompressed SEC1 P-256 point.
const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Validated application server public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidPublicKey {
    bytes: Vec<u8>,
}

impl VapidPublicKey {
    /// Decode and validate a URL-safe base64 public key.
    ///
    /// Padding is optional, and the standard alphabet (`+`, `/`) is accepted
    /// as well since keys are often pasted from other tools.
    pub fn from_base64url(encoded: &str) -> Result<Self> {
        let bytes = url_b64_to_bytes(encoded)?;
        anyhow::ensure!(
            bytes.len() == UNCOMPRESSED_POINT_LEN && bytes[0] == 0x04,
            "VAPID public key must be 65-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        );
        p256::PublicKey::from_sec1_bytes(&bytes)
            .context("VAPID public key is not a point on P-256")?;
        Ok(Self { bytes })
    }

    /// Raw key bytes for `applicationServerKey`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the raw key bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Convert URL-safe base64 (with or without padding) to raw bytes.
pub fn url_b64_to_bytes(encoded: &str) -> Result<Vec<u8>> {
    let normalized: String = encoded
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    BASE64URL
        .decode(normalized.as_bytes())
        .context("Invalid base64url for VAPID public key")
}
