// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use aes_gcm::{
    aead::{Aead, Payload},
    Aes256Gcm,
    Key,
    KeyInit,
    Nonce,
};
use bls12_381::G1Affine;
use hkdf::Hkdf;
use rand_core::CryptoRngCore;
use sha3::Sha3_256;
use snafu::prelude::*;
use zeroize::Zeroizing;

use crate::{
    domains,
    hashing::{self, DIGEST_BYTES},
    oracle::KemMaterial,
};

/// Number of bytes in a capsule nonce.
pub const NONCE_BYTES: usize = 12;

/// Number of bytes in the AES-GCM authentication tag.
pub const TAG_BYTES: usize = 16;

/// The authenticated encryption envelope around a payload.
///
/// The symmetric key is derived from a hop's KEM material with HKDF-SHA3-256, salted and
/// AAD-bound to the hop's `r1` point, so a key derived for one hop cannot open a capsule bound to
/// a different hop even if the KEM material were somehow reused. The associated data is a
/// protocol-hash digest, not caller-supplied bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Capsule {
    nonce: [u8; NONCE_BYTES],
    aad: [u8; DIGEST_BYTES],
    ciphertext: Vec<u8>,
}

/// Errors that can arise relating to [`Capsule`].
#[derive(Debug, Snafu)]
pub enum CapsuleError {
    /// Key derivation failed.
    #[snafu(display("Key derivation failed"))]
    KeyDerivation,
    /// Encryption failed.
    #[snafu(display("Encryption failed"))]
    EncryptionFailed,
    /// The authentication tag did not verify.
    ///
    /// The ciphertext, associated data, nonce or derived key is wrong; there is no way to tell
    /// which, and no partial plaintext is ever released.
    #[snafu(display("The authentication tag did not verify"))]
    AuthenticationFailed,
}

/// Derive the AES key for a `(context, kem)` binding.
fn derive_key(
    context: &G1Affine,
    kem: &KemMaterial,
) -> Result<Zeroizing<[u8; 32]>, CapsuleError> {
    let salt = hashing::protocol_hash(&[domains::SALT, &context.to_compressed(), domains::KEM]);

    let mut key = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha3_256>::new(Some(&salt), kem)
        .expand(domains::KEM, key.as_mut_slice())
        .map_err(|_| CapsuleError::KeyDerivation)?;

    Ok(key)
}

/// Compute the associated-data digest for a context.
fn associated_data(context: &G1Affine) -> [u8; DIGEST_BYTES] {
    hashing::protocol_hash(&[domains::AAD, &context.to_compressed(), domains::MSG])
}

impl Capsule {
    /// Seal a plaintext under a hop's `(context, kem)` binding.
    ///
    /// The context is the hop's `r1` point; the KEM material is the 32-byte pairing hash the
    /// oracle produced for the hop. A fresh random nonce is drawn per call; nonce reuse under the
    /// same derived key voids AES-GCM's guarantees.
    pub fn encrypt<R: CryptoRngCore>(
        context: &G1Affine,
        kem: &KemMaterial,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Self, CapsuleError> {
        let mut nonce = [0u8; NONCE_BYTES];
        rng.fill_bytes(&mut nonce);

        Self::encrypt_with_nonce(context, kem, plaintext, nonce)
    }

    /// Seal with an explicit nonce.
    ///
    /// Only [`Capsule::encrypt`] and pinned regression vectors call this; nonces must never be
    /// chosen by protocol logic.
    fn encrypt_with_nonce(
        context: &G1Affine,
        kem: &KemMaterial,
        plaintext: &[u8],
        nonce: [u8; NONCE_BYTES],
    ) -> Result<Self, CapsuleError> {
        let key = derive_key(context, kem)?;
        let aad = associated_data(context);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| CapsuleError::EncryptionFailed)?;

        Ok(Self {
            nonce,
            aad,
            ciphertext,
        })
    }

    /// Open this capsule under a hop's `(context, kem)` binding.
    ///
    /// Authentication covers the ciphertext and the stored associated data; any mismatch in
    /// either, in the nonce, or in the derived key is [`CapsuleError::AuthenticationFailed`].
    /// Callers must not retry with alternate keys; a failure means the input history is wrong.
    pub fn decrypt(
        &self,
        context: &G1Affine,
        kem: &KemMaterial,
    ) -> Result<Vec<u8>, CapsuleError> {
        let key = derive_key(context, kem)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
        cipher
            .decrypt(
                Nonce::from_slice(&self.nonce),
                Payload {
                    msg: &self.ciphertext,
                    aad: &self.aad,
                },
            )
            .map_err(|_| CapsuleError::AuthenticationFailed)
    }

    /// Rotate this capsule onto a new hop's `(context, kem)` binding.
    ///
    /// Opens under the old binding and reseals under the new one with a fresh nonce. Used when
    /// the transfer step rewrites the envelope for its successor instead of leaving the chain to
    /// recover the original KEM material.
    pub fn reencrypt<R: CryptoRngCore>(
        &self,
        old_context: &G1Affine,
        old_kem: &KemMaterial,
        new_context: &G1Affine,
        new_kem: &KemMaterial,
        rng: &mut R,
    ) -> Result<Self, CapsuleError> {
        let plaintext = Zeroizing::new(self.decrypt(old_context, old_kem)?);
        Self::encrypt(new_context, new_kem, &plaintext, rng)
    }

    /// Get the nonce.
    pub fn nonce(&self) -> &[u8; NONCE_BYTES] {
        &self.nonce
    }

    /// Get the associated-data digest.
    pub fn aad(&self) -> &[u8; DIGEST_BYTES] {
        &self.aad
    }

    /// Get the ciphertext, including the trailing authentication tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub(crate) fn from_parts(
        nonce: [u8; NONCE_BYTES],
        aad: [u8; DIGEST_BYTES],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            nonce,
            aad,
            ciphertext,
        }
    }
}

#[cfg(test)]
mod test {
    use rand_chacha::ChaCha12Rng;
    use rand_core::SeedableRng;

    use super::*;

    fn context() -> G1Affine {
        G1Affine::generator()
    }

    #[test]
    fn capsule_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(41);
        let kem = [0x5a; 32];

        let capsule = Capsule::encrypt(&context(), &kem, b"three may keep a secret", &mut rng)
            .unwrap();
        assert_eq!(
            capsule.decrypt(&context(), &kem).unwrap(),
            b"three may keep a secret"
        );
    }

    #[test]
    fn every_single_bit_flip_is_an_authentication_failure() {
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let kem = [0x5a; 32];
        let capsule = Capsule::encrypt(&context(), &kem, b"hi!", &mut rng).unwrap();

        // Nonce
        for byte in 0..NONCE_BYTES {
            let mut bad = capsule.clone();
            bad.nonce[byte] ^= 1;
            assert!(bad.decrypt(&context(), &kem).is_err());
        }

        // Associated data
        for byte in 0..DIGEST_BYTES {
            let mut bad = capsule.clone();
            bad.aad[byte] ^= 1;
            assert!(bad.decrypt(&context(), &kem).is_err());
        }

        // Ciphertext and tag
        for byte in 0..capsule.ciphertext.len() {
            let mut bad = capsule.clone();
            bad.ciphertext[byte] ^= 1;
            assert!(bad.decrypt(&context(), &kem).is_err());
        }
    }

    #[test]
    fn wrong_kem_and_wrong_context_fail() {
        let mut rng = ChaCha12Rng::seed_from_u64(43);
        let kem = [0x5a; 32];
        let capsule = Capsule::encrypt(&context(), &kem, b"hi!", &mut rng).unwrap();

        assert!(capsule.decrypt(&context(), &[0x5b; 32]).is_err());

        let other_context: G1Affine =
            (bls12_381::G1Projective::generator() * bls12_381::Scalar::from(2u64)).into();
        assert!(capsule.decrypt(&other_context, &kem).is_err());
    }

    #[test]
    fn reencryption_moves_the_binding() {
        let mut rng = ChaCha12Rng::seed_from_u64(44);
        let old_kem = [0x01; 32];
        let new_kem = [0x02; 32];
        let new_context: G1Affine =
            (bls12_381::G1Projective::generator() * bls12_381::Scalar::from(7u64)).into();

        let capsule = Capsule::encrypt(&context(), &old_kem, b"hi!", &mut rng).unwrap();
        let rotated = capsule
            .reencrypt(&context(), &old_kem, &new_context, &new_kem, &mut rng)
            .unwrap();

        assert_eq!(rotated.decrypt(&new_context, &new_kem).unwrap(), b"hi!");
        assert!(rotated.decrypt(&context(), &old_kem).is_err());
    }

    #[test]
    fn sealing_matches_the_pinned_vector() {
        // context = canonical G1 generator, kem = 00..1f, fixed nonce; locks the whole KDF and
        // AEAD wiring
        let kem: [u8; 32] = core::array::from_fn(|i| i as u8);
        let nonce: [u8; NONCE_BYTES] = core::array::from_fn(|i| i as u8);

        let capsule = Capsule::encrypt_with_nonce(&context(), &kem, b"hi!", nonce).unwrap();

        assert_eq!(
            hex::encode(capsule.aad()),
            "e67a21cf267e67847d3bc08962509786c7832ce0b5e190c928a3fff4"
        );
        assert_eq!(
            hex::encode(capsule.ciphertext()),
            "89698877d2fb069e960f1b7c2e652515f93a1e"
        );
    }
}
