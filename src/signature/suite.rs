use oxigraph::model::Quad;
use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::{PublicKey, SecretKey};
use rand_core::OsRng;
use secrecy::SecretString;
use sha2::{Digest, Sha512};

use crate::error::{ContextError, Result};
use crate::rdf::canon::hash_quads;

/// Signing capability used by the signature engine.
///
/// Keys are imported from JSON Web Keys. Messages handed to `sign` and
/// `verify` are the textual graph digests produced by `digest`.
pub trait CryptoSuite: Send + Sync + 'static {
    type PrivateKey: Clone + Send + Sync + 'static;
    type PublicKey: Send + Sync;

    /// Value of `sig:cryptosuite` in proofs.
    const NAME: &'static str;
    /// Value of `sig:hashMethod` in proofs.
    const HASH_METHOD: &'static str;

    fn import_private_key(&self, jwk: &str) -> Result<Self::PrivateKey>;
    fn import_public_key(&self, jwk: &str) -> Result<Self::PublicKey>;

    fn digest(&self, quads: &[Quad]) -> Result<String> {
        hash_quads(quads)
    }

    fn sign(&self, key: &Self::PrivateKey, message: &[u8]) -> Result<Vec<u8>>;

    /// `false` for any signature that does not check out, malformed ones
    /// included.
    fn verify(&self, key: &Self::PublicKey, message: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA over NIST P-384 with SHA-512, signatures in the fixed 96 byte
/// `r || s` form. Interoperates with WebCrypto `{ name: "ECDSA", hash:
/// "SHA-512" }` on `P-384` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaP384;

impl CryptoSuite for EcdsaP384 {
    type PrivateKey = SigningKey;
    type PublicKey = VerifyingKey;

    const NAME: &'static str = "ECDSA";
    const HASH_METHOD: &'static str = "SHA-512";

    fn import_private_key(&self, jwk: &str) -> Result<SigningKey> {
        let secret = SecretKey::from_jwk_str(jwk)
            .map_err(|e| ContextError::InvalidKey(format!("P-384 private JWK: {e}")))?;
        Ok(SigningKey::from(&secret))
    }

    fn import_public_key(&self, jwk: &str) -> Result<VerifyingKey> {
        let public = PublicKey::from_jwk_str(jwk)
            .map_err(|e| ContextError::InvalidKey(format!("P-384 public JWK: {e}")))?;
        Ok(VerifyingKey::from(&public))
    }

    fn sign(&self, key: &SigningKey, message: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = key
            .sign_prehash(&Sha512::digest(message))
            .map_err(|e| ContextError::Internal(format!("ECDSA signing failed: {e}")))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify_prehash(&Sha512::digest(message), &signature)
            .is_ok()
    }
}

/// A freshly generated key pair, both halves as JWK text.
pub struct KeyPair {
    pub private_jwk: SecretString,
    pub public_jwk: String,
}

pub fn generate_key_pair() -> KeyPair {
    let secret = SecretKey::random(&mut OsRng);
    KeyPair {
        private_jwk: SecretString::from(secret.to_jwk_string().to_string()),
        public_jwk: secret.public_key().to_jwk_string(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use secrecy::ExposeSecret;

    use super::{CryptoSuite, EcdsaP384, generate_key_pair};

    #[test]
    fn sign_and_verify_messages() -> Result<()> {
        let pair = generate_key_pair();
        let suite = EcdsaP384;
        let private = suite.import_private_key(pair.private_jwk.expose_secret())?;
        let public = suite.import_public_key(&pair.public_jwk)?;

        let signature = suite.sign(&private, b"graph digest")?;
        assert_eq!(signature.len(), 96);
        assert!(suite.verify(&public, b"graph digest", &signature));
        assert!(!suite.verify(&public, b"other digest", &signature));
        assert!(!suite.verify(&public, b"graph digest", &signature[..95]));

        let other = suite.import_public_key(&generate_key_pair().public_jwk)?;
        assert!(!suite.verify(&other, b"graph digest", &signature));
        Ok(())
    }

    #[test]
    fn jwk_import() -> Result<()> {
        let pair = generate_key_pair();
        assert!(pair.public_jwk.contains("\"crv\":\"P-384\""));
        assert!(!pair.public_jwk.contains("\"d\""));
        // a private JWK also carries the public point
        EcdsaP384.import_public_key(pair.private_jwk.expose_secret())?;
        assert!(EcdsaP384.import_private_key(&pair.public_jwk).is_err());
        assert!(EcdsaP384.import_public_key("{\"kty\":\"EC\"}").is_err());
        Ok(())
    }
}
