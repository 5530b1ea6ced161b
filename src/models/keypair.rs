use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized form of the store keypair, kept under the reserved key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeyPair {
    pub algorithm: String,
    /// Base64 X25519 public key.
    pub public: String,
    /// Base64 X25519 private key.
    pub private: String,
    pub created_at: DateTime<Utc>,
}
