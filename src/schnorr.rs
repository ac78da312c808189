// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use rand_core::CryptoRngCore;
use snafu::prelude::*;

use crate::{domains, hashing, register::Register};

/// A non-interactive Schnorr proof of knowledge of a register's secret.
///
/// Commit `t = [k]g` for a fresh random `k`, derive the challenge
/// `c = H(tag || g || t || u)` and respond with `z = k + c*x`. The proof reveals nothing about `x`
/// and verifies against the public `(g, u)` alone, so it can be checked on chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchnorrProof {
    response: Scalar,
    commitment: G1Affine,
}

/// Errors that can arise relating to [`SchnorrProof`].
#[derive(Debug, Snafu)]
pub enum SchnorrError {
    /// The register does not hold the secret being proven.
    #[snafu(display("The register does not hold the secret being proven"))]
    MissingSecret,
    /// Proof construction failed and must be retried with fresh randomness.
    #[snafu(display("Proof construction failed; retry with fresh randomness"))]
    ProofConstruction,
    /// The proof did not verify against the register.
    #[snafu(display("The proof did not verify against the register"))]
    VerificationFailed,
}

impl SchnorrProof {
    /// Prove knowledge of `register`'s secret.
    ///
    /// The nonce `k` is drawn fresh on every call and never cached; reusing a nonce across two
    /// proofs recovers the secret from two linear equations.
    pub fn prove<R: CryptoRngCore>(
        register: &Register,
        rng: &mut R,
    ) -> Result<Self, SchnorrError> {
        let secret = register.secret().map_err(|_| SchnorrError::MissingSecret)?;

        let k = Scalar::random(rng);
        if bool::from(k.is_zero()) {
            return Err(SchnorrError::ProofConstruction);
        }

        let commitment: G1Affine = (G1Projective::from(register.generator()) * k).into();
        let c = challenge(register, &commitment);

        Ok(Self {
            response: k + c * secret,
            commitment,
        })
    }

    /// Verify this proof against a register's public data.
    ///
    /// Checks `[z]g == t + [c]u`. The on-chain validator performs the same check over the same
    /// transcript; this implementation exists for off-chain callers and self-checks.
    pub fn verify(&self, register: &Register) -> Result<(), SchnorrError> {
        let c = challenge(register, &self.commitment);

        let lhs = G1Projective::from(register.generator()) * self.response;
        let rhs = G1Projective::from(self.commitment)
            + G1Projective::from(register.public_value()) * c;

        if lhs == rhs {
            Ok(())
        } else {
            Err(SchnorrError::VerificationFailed)
        }
    }

    /// Get the response scalar `z`.
    pub fn response(&self) -> &Scalar {
        &self.response
    }

    /// Get the commitment point `t`.
    pub fn commitment(&self) -> &G1Affine {
        &self.commitment
    }

    pub(crate) fn from_parts(response: Scalar, commitment: G1Affine) -> Self {
        Self {
            response,
            commitment,
        }
    }
}

/// The Fiat-Shamir challenge for a Schnorr transcript.
fn challenge(register: &Register, commitment: &G1Affine) -> Scalar {
    hashing::hash_to_scalar(&[
        domains::SCHNORR,
        &register.generator().to_compressed(),
        &commitment.to_compressed(),
        &register.public_value().to_compressed(),
    ])
}
