//! HMAC signatures over the parameters carried in redirect URLs.
//!
//! Call state lives only in query strings, so anyone could forge a poll with a
//! chosen filename or attempt count. Each link carries `sig`, an HMAC-SHA256 of
//! its parameters in a fixed order, and handlers refuse links that do not verify.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct ParamSigner {
    key: Arc<Vec<u8>>,
}

impl std::fmt::Debug for ParamSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSigner").finish_non_exhaustive()
    }
}

impl ParamSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: Arc::new(secret.as_ref().to_vec()),
        }
    }

    /// Per-process secret for when none is configured
    pub fn ephemeral() -> Self {
        Self::new(uuid::Uuid::new_v4().as_bytes())
    }

    fn mac(&self, params: &[(&str, &str)]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        for (k, v) in params {
            mac.update(k.as_bytes());
            mac.update(b"=");
            mac.update(v.as_bytes());
            mac.update(b"\n");
        }
        mac
    }

    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        hex::encode(self.mac(params).finalize().into_bytes())
    }

    /// Constant-time check of a hex signature
    pub fn verify(&self, params: &[(&str, &str)], sig: &str) -> bool {
        match hex::decode(sig) {
            Ok(bytes) => self.mac(params).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }
}
