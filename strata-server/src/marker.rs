//! Pagination markers
//!
//! Encodes a row key into an opaque marker and back. The key bytes are masked
//! and followed by a truncated SHA-256 tag, so clients can neither read the
//! key nor forge a marker for an arbitrary position.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_LEN: usize = 8;
const TAG_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker is empty")]
    Empty,

    #[error("marker is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("marker has wrong length: {0} bytes")]
    Length(usize),

    #[error("marker failed integrity check")]
    Tampered,
}

/// Reversible row key <-> marker transform keyed by a server secret
#[derive(Clone)]
pub struct MarkerCodec {
    secret: Vec<u8>,
    mask: [u8; KEY_LEN],
}

impl MarkerCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref().to_vec();

        let mut hasher = Sha256::new();
        hasher.update(b"strata-marker-mask");
        hasher.update(&secret);
        let digest = hasher.finalize();

        let mut mask = [0u8; KEY_LEN];
        mask.copy_from_slice(&digest[..KEY_LEN]);

        Self { secret, mask }
    }

    pub fn encode(&self, key: i64) -> String {
        let plain = key.to_be_bytes();

        let mut raw = [0u8; KEY_LEN + TAG_LEN];
        for (i, byte) in plain.iter().enumerate() {
            raw[i] = byte ^ self.mask[i];
        }
        raw[KEY_LEN..].copy_from_slice(&self.tag(&plain));

        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(&self, marker: &str) -> Result<i64, MarkerError> {
        if marker.is_empty() {
            return Err(MarkerError::Empty);
        }

        let raw = URL_SAFE_NO_PAD.decode(marker)?;
        if raw.len() != KEY_LEN + TAG_LEN {
            return Err(MarkerError::Length(raw.len()));
        }

        let mut plain = [0u8; KEY_LEN];
        for (i, byte) in raw[..KEY_LEN].iter().enumerate() {
            plain[i] = byte ^ self.mask[i];
        }

        if raw[KEY_LEN..] != self.tag(&plain) {
            return Err(MarkerError::Tampered);
        }

        Ok(i64::from_be_bytes(plain))
    }

    fn tag(&self, plain: &[u8; KEY_LEN]) -> [u8; TAG_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(plain);
        let digest = hasher.finalize();

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

impl std::fmt::Debug for MarkerCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerCodec").finish_non_exhaustive()
    }
}
