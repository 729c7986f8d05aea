use sha2::{Digest, Sha256};
use std::fmt;

/// Signs canonical query strings with the shared private key.
///
/// The signature is `hex(SHA256(private_key || query))`. There is no nonce or
/// timestamp, so a given query always produces the same signature.
#[derive(Clone)]
pub struct Signer {
    private_key: String,
}

impl Signer {
    /// Create a signer for the given private key
    pub fn new(private_key: impl Into<String>) -> Self {
        Signer {
            private_key: private_key.into(),
        }
    }

    /// Generate the lowercase hex signature for a canonical query string
    ///
    /// # Arguments
    /// * `query` - Form-encoded request fields, excluding `sign` and `authmode`
    pub fn sign(&self, query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.private_key.as_bytes());
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// Implement Debug manually to avoid exposing the secret key
impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("private_key", &"<redacted>")
            .finish()
    }
}
