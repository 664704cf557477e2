//! Stable crypto façade over the primitive library: signing, ephemeral ECDH,
//! key derivation, and authenticated encryption. No component outside this
//! module touches `ed25519_dalek`, `x25519_dalek`, `hkdf`, `sha2`, or
//! `chacha20poly1305` directly.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret as XSecret};

pub const X25519_KEY_LEN: usize = 32;
pub const AEAD_NONCE_LEN: usize = 24;
pub const AEAD_TAG_LEN: usize = 16;
pub const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("aead open failed")]
    AeadOpenFailed,
}

/// Sign `msg` with a long-term Ed25519 secret key.
pub fn sign(e_priv: &SigningKey, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
    e_priv.sign(msg).to_bytes()
}

/// Verify a detached signature against a known public key.
pub fn verify(pubkey: &VerifyingKey, msg: &[u8], sig: &[u8]) -> Result<(), CryptoError> {
    let sig_bytes: [u8; SIGNATURE_LEN] = sig.try_into().map_err(|_| CryptoError::InvalidSignature)?;
    let sig = Signature::from_bytes(&sig_bytes);
    pubkey.verify(msg, &sig).map_err(|_| CryptoError::InvalidSignature)
}

/// Parse a 32-byte Ed25519 public key received over the wire.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, CryptoError> {
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

/// A fresh ephemeral X25519 key pair, used once per onion layer.
pub struct Ephemeral {
    secret: XSecret,
    pub public: XPublicKey,
}

pub fn x25519_ephemeral() -> Ephemeral {
    let secret = XSecret::random_from_rng(OsRng);
    let public = XPublicKey::from(&secret);
    Ephemeral { secret, public }
}

impl Ephemeral {
    /// Compute the shared secret between this ephemeral key and a peer's
    /// long-term (or ephemeral) public key.
    pub fn shared_with(&self, peer_pub: &XPublicKey) -> [u8; 32] {
        self.secret.diffie_hellman(peer_pub).to_bytes()
    }
}

/// ECDH between a long-term secret and a peer ephemeral public key — the
/// receiving side of [`Ephemeral::shared_with`].
pub fn x25519_shared(my_priv: &XSecret, peer_pub: &XPublicKey) -> [u8; 32] {
    my_priv.diffie_hellman(peer_pub).to_bytes()
}

/// HKDF-SHA256 with an all-zero salt and a single 32-byte output block.
/// Both endpoints of a layer must agree on `info` bit-for-bit, so this
/// function is the only place that string gets built.
pub fn hkdf_sha256(ikm: &[u8], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(&[0u8; 32]), ikm);
    let mut out = [0u8; 32];
    hk.expand(info, &mut out).expect("32 bytes is a valid HKDF-SHA256 output length");
    out
}

/// Seal `plaintext` under `key`/`nonce` with no associated data. Output is
/// `tag(16) || ciphertext`, per the wire layout — RustCrypto's `encrypt`
/// appends the tag, so it is moved to the front here.
pub fn aead_seal(key: &[u8; 32], nonce: &[u8; AEAD_NONCE_LEN], plaintext: &[u8]) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let ct_then_tag = cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .expect("aead seal cannot fail for a freshly generated nonce");
    let split_at = ct_then_tag.len() - AEAD_TAG_LEN;
    let (ct, tag) = ct_then_tag.split_at(split_at);
    let mut out = Vec::with_capacity(ct_then_tag.len());
    out.extend_from_slice(tag);
    out.extend_from_slice(ct);
    out
}

/// Open a buffer produced by [`aead_seal`] (`tag(16) || ciphertext` on the
/// wire). Any tag mismatch (forged or corrupted ciphertext, wrong key)
/// yields `Err` — callers treat this as a silent drop, not a propagated
/// error.
pub fn aead_open(key: &[u8; 32], nonce: &[u8; AEAD_NONCE_LEN], ct: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ct.len() < AEAD_TAG_LEN {
        return Err(CryptoError::AeadOpenFailed);
    }
    let (tag, ciphertext) = ct.split_at(AEAD_TAG_LEN);
    let mut ct_then_tag = Vec::with_capacity(ct.len());
    ct_then_tag.extend_from_slice(ciphertext);
    ct_then_tag.extend_from_slice(tag);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce), ct_then_tag.as_slice())
        .map_err(|_| CryptoError::AeadOpenFailed)
}

/// `n` cryptographically strong random bytes.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

pub fn random_nonce() -> [u8; AEAD_NONCE_LEN] {
    let mut nonce = [0u8; AEAD_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// SHA-256 digest, used by the replay cache over whole reassembled
/// datagrams.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let sk = SigningKey::generate(&mut OsRng);
        let msg = b"hello beacon";
        let sig = sign(&sk, msg);
        assert!(verify(&sk.verifying_key(), msg, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_flipped_bit() {
        let sk = SigningKey::generate(&mut OsRng);
        let msg = b"hello beacon";
        let mut sig = sign(&sk, msg);
        sig[0] ^= 0x01;
        assert!(verify(&sk.verifying_key(), msg, &sig).is_err());
    }

    #[test]
    fn ecdh_agrees_both_directions() {
        let a = x25519_ephemeral();
        let b_secret = XSecret::random_from_rng(OsRng);
        let b_pub = XPublicKey::from(&b_secret);
        let shared_a = a.shared_with(&b_pub);
        let shared_b = x25519_shared(&b_secret, &a.public);
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn aead_round_trip() {
        let key = [7u8; 32];
        let nonce = random_nonce();
        let pt = b"layer plaintext";
        let ct = aead_seal(&key, &nonce, pt);
        let recovered = aead_open(&key, &nonce, &ct).unwrap();
        assert_eq!(recovered, pt);
    }

    #[test]
    fn aead_open_rejects_tampered_ciphertext() {
        let key = [7u8; 32];
        let nonce = random_nonce();
        let mut ct = aead_seal(&key, &nonce, b"layer plaintext");
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(aead_open(&key, &nonce, &ct).is_err());
    }

    #[test]
    fn hkdf_is_deterministic_given_same_inputs() {
        let ikm = [1u8; 32];
        let a = hkdf_sha256(&ikm, b"layer:node-b");
        let b = hkdf_sha256(&ikm, b"layer:node-b");
        assert_eq!(a, b);
        let c = hkdf_sha256(&ikm, b"layer:node-c");
        assert_ne!(a, c);
    }
}
