// ABOUTME: Random-bytes source, opaque token minting, and client secret hashing
// ABOUTME: Provides PKCE challenge computation with constant-time comparison
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret and token generation primitives.
//!
//! Randomness is injected through [`RandomSource`] so tests can supply
//! deterministic bytes without weakening production entropy: codes, tokens,
//! and client secrets are all 32 random bytes (256 bits, above the 192-bit
//! floor) encoded as unpadded base64url.

use crate::models::PkceMethod;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroize;

/// Number of random bytes backing codes, tokens, and client secrets.
const OPAQUE_VALUE_BYTES: usize = 32;

/// Number of random bytes in a secret-hash salt.
const SALT_BYTES: usize = 16;

/// Injected source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes.
    ///
    /// # Errors
    /// Returns an error if the underlying RNG fails; the server cannot
    /// operate securely without working randomness, so callers propagate
    /// this rather than falling back.
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Production random source backed by `ring`'s `SystemRandom`.
pub struct SystemRandomSource {
    rng: SystemRandom,
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRandomSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.rng
            .fill(dest)
            .map_err(|_| anyhow!("system RNG failure: cannot generate secure random bytes"))
    }
}

/// A plaintext client secret, returned exactly once at create/rotate time.
///
/// The buffer is wiped when the value is dropped.
pub struct PlaintextSecret(String);

impl PlaintextSecret {
    /// Read the secret. Callers hand this to the registering client and
    /// must not persist it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, taking ownership of the plaintext.
    #[must_use]
    pub fn into_string(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl Drop for PlaintextSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for PlaintextSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlaintextSecret(..)")
    }
}

/// Mints opaque codes, tokens, and client credentials.
pub struct SecretFactory {
    rng: Box<dyn RandomSource>,
}

impl SecretFactory {
    #[must_use]
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self { rng }
    }

    /// Factory wired to the system RNG.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SystemRandomSource::new()))
    }

    /// Generate an opaque 256-bit value for codes and tokens.
    ///
    /// # Errors
    /// Propagates RNG failure.
    pub fn opaque_value(&self) -> Result<String> {
        let mut bytes = [0u8; OPAQUE_VALUE_BYTES];
        self.rng.fill(&mut bytes)?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Generate a public client identifier.
    #[must_use]
    pub fn client_public_id(&self) -> String {
        format!("app_{}", Uuid::new_v4().simple())
    }

    /// Generate a high-entropy plaintext client secret.
    ///
    /// # Errors
    /// Propagates RNG failure.
    pub fn client_secret(&self) -> Result<PlaintextSecret> {
        Ok(PlaintextSecret(self.opaque_value()?))
    }

    /// Hash a client secret for storage as `hex(salt)$hex(sha256(salt || secret))`.
    ///
    /// # Errors
    /// Propagates RNG failure while drawing the salt.
    pub fn hash_secret(&self, secret: &str) -> Result<String> {
        let mut salt = [0u8; SALT_BYTES];
        self.rng.fill(&mut salt)?;
        Ok(format!(
            "{}${}",
            hex::encode(salt),
            hex::encode(digest_with_salt(&salt, secret))
        ))
    }
}

/// Verify a candidate secret against a stored `salt$hash` value.
///
/// The hash comparison runs in constant time with respect to the digest
/// contents.
#[must_use]
pub fn verify_secret(stored: &str, candidate: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(stored_hash)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    let computed = digest_with_salt(&salt, candidate);
    computed.as_slice().ct_eq(&stored_hash).into()
}

fn digest_with_salt(salt: &[u8], secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Compute the S256 PKCE challenge for a verifier: base64url(sha256(verifier)).
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify a PKCE code verifier against a stored challenge in constant time.
#[must_use]
pub fn verify_pkce(method: PkceMethod, stored_challenge: &str, verifier: &str) -> bool {
    let computed = match method {
        PkceMethod::S256 => s256_challenge(verifier),
        PkceMethod::Plain => verifier.to_owned(),
    };
    computed
        .as_bytes()
        .ct_eq(stored_challenge.as_bytes())
        .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FixedRandom(u8);

    impl RandomSource for FixedRandom {
        fn fill(&self, dest: &mut [u8]) -> Result<()> {
            dest.fill(self.0);
            Ok(())
        }
    }

    #[test]
    fn test_opaque_value_length() {
        let factory = SecretFactory::new(Box::new(FixedRandom(7)));
        let value = factory.opaque_value().unwrap();
        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(value.len(), 43);
    }

    #[test]
    fn test_secret_hash_round_trip() {
        let factory = SecretFactory::new(Box::new(FixedRandom(1)));
        let secret = factory.client_secret().unwrap();
        let stored = factory.hash_secret(secret.expose()).unwrap();

        assert!(verify_secret(&stored, secret.expose()));
        assert!(!verify_secret(&stored, "not-the-secret"));
        assert!(!verify_secret("malformed", secret.expose()));
    }

    #[test]
    fn test_s256_challenge_known_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            s256_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verify_pkce_plain() {
        assert!(verify_pkce(PkceMethod::Plain, "abc123", "abc123"));
        assert!(!verify_pkce(PkceMethod::Plain, "abc123", "abc124"));
    }
}
