//! Store keypair management and password sealing.
//!
//! Each store carries one X25519 keypair under the reserved key. A password
//! is sealed to the store's public key: an ephemeral X25519 exchange feeds
//! HKDF-SHA256, which keys AES-256-GCM with a random nonce. The recipient
//! public key is bound as associated data, so a token copied into a store
//! with a different keypair fails to open instead of yielding garbage.
//!
//! Token layout: `v1:` + base64(ephemeral public (32) | nonce (12) | ciphertext + tag).

use crate::constants;
use crate::core::store::{AccessMode, CredentialStore};
use crate::error::{Result, VaultError};
use crate::models::entry::SealedPassword;
use crate::models::keypair::StoredKeyPair;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

pub const ALGORITHM: &str = "x25519-hkdf-sha256-aes256gcm";

const TOKEN_PREFIX: &str = "v1:";
const HKDF_INFO: &[u8] = b"logonmgr password v1";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub struct KeyPair {
    public: PublicKey,
    private: StaticSecret,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        let private = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&private);
        Self { public, private }
    }

    /// Short hex fingerprint of the public key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.public.as_bytes());
        format!("{:064x}", digest)[..16].to_string()
    }

    pub fn seal(&self, plaintext: &str) -> Result<SealedPassword> {
        encrypt(plaintext, &self.public)
    }

    pub fn open(&self, sealed: &SealedPassword) -> Result<Zeroizing<String>> {
        decrypt(sealed, &self.private)
    }

    pub fn to_stored(&self, created_at: DateTime<Utc>) -> StoredKeyPair {
        let private = Zeroizing::new(self.private.to_bytes());
        StoredKeyPair {
            algorithm: ALGORITHM.to_string(),
            public: STANDARD.encode(self.public.as_bytes()),
            private: STANDARD.encode(&private[..]),
            created_at,
        }
    }

    pub fn from_stored(stored: &StoredKeyPair) -> Result<Self> {
        if stored.algorithm != ALGORITHM {
            return Err(VaultError::Crypto(format!(
                "unsupported key algorithm '{}'",
                stored.algorithm
            )));
        }
        let private = decode_key(&stored.private, "private")?;
        let public = decode_key(&stored.public, "public")?;
        let private = StaticSecret::from(*private);
        let derived = PublicKey::from(&private);
        if derived.as_bytes() != &*public {
            return Err(VaultError::Crypto(
                "stored public key does not match private key".into(),
            ));
        }
        Ok(Self {
            public: derived,
            private,
        })
    }
}

fn decode_key(encoded: &str, which: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded)
            .map_err(|e| VaultError::Crypto(format!("decode {} key: {}", which, e)))?,
    );
    if bytes.len() != KEY_LEN {
        return Err(VaultError::Crypto(format!(
            "{} key has {} bytes, expected {}",
            which,
            bytes.len(),
            KEY_LEN
        )));
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Return the store's keypair, generating and persisting one on first use.
pub fn ensure_keys(store: &mut CredentialStore) -> Result<KeyPair> {
    if let Some(stored) = store.keypair_slot()? {
        return KeyPair::from_stored(&stored);
    }
    if store.mode() == AccessMode::ReadOnly {
        return Err(VaultError::store_open(
            store.path(),
            "store has no keypair (open it read-write once to create one)",
        ));
    }
    let keypair = KeyPair::generate();
    store.set_keypair_slot(&keypair.to_stored(Utc::now()))?;
    tracing::info!(fingerprint = %keypair.fingerprint(), "generated new store keypair");
    Ok(keypair)
}

fn derive_key(
    shared: &[u8],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut salt = [0u8; 2 * KEY_LEN];
    salt[..KEY_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[KEY_LEN..].copy_from_slice(recipient.as_bytes());
    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| VaultError::Crypto(format!("derive key: {}", e)))?;
    Ok(okm)
}

pub fn encrypt(plaintext: &str, public: &PublicKey) -> Result<SealedPassword> {
    if plaintext.len() > constants::MAX_PASSWORD_SIZE {
        return Err(VaultError::Crypto(format!(
            "password exceeds maximum size ({} bytes, max {} bytes)",
            plaintext.len(),
            constants::MAX_PASSWORD_SIZE
        )));
    }

    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(public);
    if !shared.was_contributory() {
        return Err(VaultError::Crypto("public key is a low-order point".into()));
    }
    let key = derive_key(shared.as_bytes(), &ephemeral_public, public)?;

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| VaultError::Crypto(format!("create cipher: {}", e)))?;
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_bytes(),
                aad: public.as_bytes(),
            },
        )
        .map_err(|_| VaultError::Crypto("encryption failed".into()))?;

    let mut token = Vec::with_capacity(KEY_LEN + NONCE_LEN + ciphertext.len());
    token.extend_from_slice(ephemeral_public.as_bytes());
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext);
    Ok(SealedPassword(format!(
        "{}{}",
        TOKEN_PREFIX,
        STANDARD.encode(token)
    )))
}

pub fn decrypt(sealed: &SealedPassword, private: &StaticSecret) -> Result<Zeroizing<String>> {
    let encoded = sealed
        .as_str()
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| VaultError::Crypto("unrecognized ciphertext format".into()))?;
    let token = STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::Crypto(format!("decode ciphertext: {}", e)))?;
    if token.len() < KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(VaultError::Crypto("ciphertext too short".into()));
    }

    let mut ephemeral = [0u8; KEY_LEN];
    ephemeral.copy_from_slice(&token[..KEY_LEN]);
    let ephemeral_public = PublicKey::from(ephemeral);
    let nonce = &token[KEY_LEN..KEY_LEN + NONCE_LEN];
    let ciphertext = &token[KEY_LEN + NONCE_LEN..];

    let recipient = PublicKey::from(private);
    let shared = private.diffie_hellman(&ephemeral_public);
    let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| VaultError::Crypto(format!("create cipher: {}", e)))?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: recipient.as_bytes(),
                },
            )
            .map_err(|_| {
                VaultError::Crypto(
                    "password was not sealed by this store's keypair or is corrupted".into(),
                )
            })?,
    );
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| VaultError::Crypto("decrypted password is not UTF-8".into()))?;
    Ok(Zeroizing::new(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let keys = KeyPair::generate();
        let long = "x".repeat(4096);
        for password in ["secret", "", "pä$$wörd with spaces|and pipes", long.as_str()] {
            let sealed = keys.seal(password).unwrap();
            assert_ne!(sealed.as_str(), password);
            assert_eq!(keys.open(&sealed).unwrap().as_str(), password);
        }
    }

    #[test]
    fn test_sealing_is_randomized() {
        let keys = KeyPair::generate();
        let a = keys.seal("same").unwrap();
        let b = keys.seal("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_foreign_keypair_fails() {
        let ours = KeyPair::generate();
        let theirs = KeyPair::generate();
        let sealed = theirs.seal("secret").unwrap();
        assert!(matches!(ours.open(&sealed), Err(VaultError::Crypto(_))));
    }

    #[test]
    fn test_tampered_token_fails() {
        let keys = KeyPair::generate();
        let sealed = keys.seal("secret").unwrap();
        let mut bytes = STANDARD
            .decode(sealed.as_str().strip_prefix(TOKEN_PREFIX).unwrap())
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = SealedPassword(format!("{}{}", TOKEN_PREFIX, STANDARD.encode(bytes)));
        assert!(matches!(keys.open(&tampered), Err(VaultError::Crypto(_))));
    }

    #[test]
    fn test_malformed_tokens_fail() {
        let keys = KeyPair::generate();
        for bad in ["", "plaintext", "v1:!!!", "v1:AAAA"] {
            let err = keys.open(&SealedPassword(bad.into())).unwrap_err();
            assert!(matches!(err, VaultError::Crypto(_)), "{}", bad);
        }
    }

    #[test]
    fn test_oversized_password_rejected() {
        let keys = KeyPair::generate();
        let big = "x".repeat(constants::MAX_PASSWORD_SIZE + 1);
        assert!(matches!(keys.seal(&big), Err(VaultError::Crypto(_))));
    }

    #[test]
    fn test_stored_round_trip_keeps_decrypting() {
        let keys = KeyPair::generate();
        let sealed = keys.seal("secret").unwrap();
        let restored = KeyPair::from_stored(&keys.to_stored(Utc::now())).unwrap();
        assert_eq!(restored.fingerprint(), keys.fingerprint());
        assert_eq!(restored.open(&sealed).unwrap().as_str(), "secret");
    }

    #[test]
    fn test_from_stored_rejects_mismatch() {
        let a = KeyPair::generate().to_stored(Utc::now());
        let b = KeyPair::generate().to_stored(Utc::now());
        let mixed = StoredKeyPair {
            public: b.public,
            ..a
        };
        assert!(matches!(
            KeyPair::from_stored(&mixed),
            Err(VaultError::Crypto(_))
        ));
    }

    #[test]
    fn test_ensure_keys_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logons.db");
        let mut store = CredentialStore::open(&path, AccessMode::ReadWrite).unwrap();
        let first = ensure_keys(&mut store).unwrap();
        let second = ensure_keys(&mut store).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
        store.close().unwrap();

        let mut store = CredentialStore::open(&path, AccessMode::ReadOnly).unwrap();
        let reopened = ensure_keys(&mut store).unwrap();
        assert_eq!(reopened.fingerprint(), first.fingerprint());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_ensure_keys_read_only_without_keypair() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logons.db");
        std::fs::write(&path, r#"{"format":"logonmgr-store","version":1,"records":{}}"#).unwrap();
        let mut store = CredentialStore::open(&path, AccessMode::ReadOnly).unwrap();
        let err = ensure_keys(&mut store).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
