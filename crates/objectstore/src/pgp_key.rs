//! PGP encryption for super-store payloads (spec §4.8 step 5).
//!
//! Grounded on `superstore_utils.py`'s `get_pgp_key_from_secret_manager` /
//! `encrypt_string_with_pgp`: the public key is fetched once from the
//! secret store and cached for the process lifetime (spec §9 Design Note
//! "Singleton lifecycles" -- an explicit once-initialized cache object, not
//! a module-level `@lru_cache`).

use pgp::composed::{Deserializable, Message, SignedPublicKey};
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use tokio::sync::OnceCell;

use engine_core::error::{Error, Result};
use engine_core::secrets::SecretProvider;

/// Caches the super-store PGP public key, fetched once via a
/// [`SecretProvider`] and reused for every subsequent encrypt call.
pub struct PgpEncryptor {
    secret_id: String,
    cached: OnceCell<SignedPublicKey>,
}

impl PgpEncryptor {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            cached: OnceCell::new(),
        }
    }

    async fn public_key(&self, secrets: &dyn SecretProvider) -> Result<&SignedPublicKey> {
        self.cached
            .get_or_try_init(|| async {
                let armored = secrets.get_secret(&self.secret_id).await?;
                let (key, _headers) = SignedPublicKey::from_armor_single(armored.as_bytes())
                    .map_err(|e| Error::encryption(format!("invalid PGP public key: {e}")))?;
                Ok::<_, Error>(key)
            })
            .await
    }

    /// Encrypts `plaintext` to the cached public key and returns the
    /// ASCII-armored ciphertext bytes (gzipped by the caller afterwards,
    /// spec §4.8 step 5).
    pub async fn encrypt(&self, secrets: &dyn SecretProvider, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.public_key(secrets).await?;

        let message = Message::new_literal_bytes("", plaintext);
        let mut rng = rand::thread_rng();
        let encrypted = message
            .encrypt_to_keys_seipdv1(&mut rng, SymmetricKeyAlgorithm::AES256, &[key])
            .map_err(|e| Error::encryption(format!("pgp encrypt failed: {e}")))?;

        let armored = encrypted
            .to_armored_bytes(None.into())
            .map_err(|e| Error::encryption(format!("pgp armor failed: {e}")))?;

        Ok(armored)
    }
}
