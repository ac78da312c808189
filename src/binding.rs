// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use rand_core::CryptoRngCore;
use snafu::prelude::*;

use crate::{
    domains,
    hashing,
    level::{HalfLevel, HopSecrets},
    register::Register,
    token::TokenId,
};

/// A two-secret sigma proof binding a level's hop secrets to the level and its token.
///
/// Proves knowledge of `(a, r)` such that the level's public points satisfy `r1 = [r]g` and
/// `r2 = [a]g + [r]u`, with the token identity folded into the Fiat-Shamir transcript. A proof
/// built for one token fails verification against any other, so level material cannot be replayed
/// across listings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindingProof {
    response_a: Scalar,
    response_r: Scalar,
    commitment_1: G1Affine,
    commitment_2: G1Affine,
}

/// Errors that can arise relating to [`BindingProof`].
#[derive(Debug, Snafu)]
pub enum BindingError {
    /// Proof construction failed and must be retried with fresh randomness.
    #[snafu(display("Proof construction failed; retry with fresh randomness"))]
    ProofConstruction,
    /// The proof did not verify against the level and token.
    #[snafu(display("The proof did not verify against the level and token"))]
    VerificationFailed,
}

impl BindingProof {
    /// Prove that `secrets` built `level` for `register` and `token`.
    ///
    /// The blinding pair `(rho, alpha)` is drawn fresh per call; as with any sigma protocol,
    /// reuse across two challenges solves for both secrets.
    pub fn prove<R: CryptoRngCore>(
        secrets: &HopSecrets,
        level: &HalfLevel,
        register: &Register,
        token: &TokenId,
        rng: &mut R,
    ) -> Result<Self, BindingError> {
        let rho = Scalar::random(&mut *rng);
        let alpha = Scalar::random(&mut *rng);
        if bool::from(rho.is_zero()) || bool::from(alpha.is_zero()) {
            return Err(BindingError::ProofConstruction);
        }

        let g = G1Projective::from(register.generator());
        let u = G1Projective::from(register.public_value());

        let commitment_1: G1Affine = (g * rho).into();
        let commitment_2: G1Affine = (g * alpha + u * rho).into();

        let c = challenge(register, &commitment_1, &commitment_2, level, token);

        Ok(Self {
            response_a: alpha + c * secrets.a(),
            response_r: rho + c * secrets.r(),
            commitment_1,
            commitment_2,
        })
    }

    /// Verify this proof against a level, register and token.
    ///
    /// Checks `[z_r]g == t1 + [c]r1` and `[z_a]g + [z_r]u == t2 + [c]r2`, the same equations the
    /// on-chain validator enforces.
    pub fn verify(
        &self,
        level: &HalfLevel,
        register: &Register,
        token: &TokenId,
    ) -> Result<(), BindingError> {
        let c = challenge(register, &self.commitment_1, &self.commitment_2, level, token);

        let g = G1Projective::from(register.generator());
        let u = G1Projective::from(register.public_value());

        let lhs_1 = g * self.response_r;
        let rhs_1 = G1Projective::from(self.commitment_1) + G1Projective::from(level.r1()) * c;

        let lhs_2 = g * self.response_a + u * self.response_r;
        let rhs_2 = G1Projective::from(self.commitment_2) + G1Projective::from(level.r2_g1()) * c;

        if lhs_1 == rhs_1 && lhs_2 == rhs_2 {
            Ok(())
        } else {
            Err(BindingError::VerificationFailed)
        }
    }

    /// Get the response scalar `z_a`.
    pub fn response_a(&self) -> &Scalar {
        &self.response_a
    }

    /// Get the response scalar `z_r`.
    pub fn response_r(&self) -> &Scalar {
        &self.response_r
    }

    /// Get the commitment point `t1`.
    pub fn commitment_1(&self) -> &G1Affine {
        &self.commitment_1
    }

    /// Get the commitment point `t2`.
    pub fn commitment_2(&self) -> &G1Affine {
        &self.commitment_2
    }

    pub(crate) fn from_parts(
        response_a: Scalar,
        response_r: Scalar,
        commitment_1: G1Affine,
        commitment_2: G1Affine,
    ) -> Self {
        Self {
            response_a,
            response_r,
            commitment_1,
            commitment_2,
        }
    }
}

/// The Fiat-Shamir challenge for a binding transcript.
///
/// The token identity sits at the end of the transcript, after the level's public points; every
/// byte of it shifts the challenge.
fn challenge(
    register: &Register,
    commitment_1: &G1Affine,
    commitment_2: &G1Affine,
    level: &HalfLevel,
    token: &TokenId,
) -> Scalar {
    hashing::hash_to_scalar(&[
        domains::BINDING,
        &register.generator().to_compressed(),
        &register.public_value().to_compressed(),
        &commitment_1.to_compressed(),
        &commitment_2.to_compressed(),
        &level.r1().to_compressed(),
        &level.r2_g1().to_compressed(),
        token.as_bytes(),
    ])
}

#[cfg(test)]
mod test {
    use rand_chacha::ChaCha12Rng;
    use rand_core::SeedableRng;

    use super::*;
    use crate::params::PublicParams;

    fn fixture(seed: u64) -> (PublicParams, Register, HopSecrets, HalfLevel, TokenId) {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let params = PublicParams::load().unwrap();
        let owner = Register::random(&mut rng);
        let secrets = HopSecrets::random(&mut rng).unwrap();
        let token = TokenId::new([0x42; 32]);
        let level = HalfLevel::entry(&params, &secrets, &owner, &token).unwrap();
        (params, owner, secrets, level, token)
    }

    #[test]
    fn proof_round_trips() {
        let (_, owner, secrets, level, token) = fixture(21);
        let mut rng = ChaCha12Rng::seed_from_u64(210);

        let proof = BindingProof::prove(&secrets, &level, &owner, &token, &mut rng).unwrap();
        assert!(proof.verify(&level, &owner, &token).is_ok());
        assert!(proof.verify(&level, &owner.to_public(), &token).is_ok());
    }

    #[test]
    fn proof_is_bound_to_its_token() {
        let (_, owner, secrets, level, token) = fixture(22);
        let mut rng = ChaCha12Rng::seed_from_u64(220);

        let proof = BindingProof::prove(&secrets, &level, &owner, &token, &mut rng).unwrap();

        // Replaying against a different token with otherwise-identical points must fail
        let other_token = TokenId::new([0x43; 32]);
        assert!(proof.verify(&level, &owner, &other_token).is_err());
    }

    #[test]
    fn tampered_responses_fail() {
        let (_, owner, secrets, level, token) = fixture(23);
        let mut rng = ChaCha12Rng::seed_from_u64(230);

        let proof = BindingProof::prove(&secrets, &level, &owner, &token, &mut rng).unwrap();

        let bad = BindingProof::from_parts(
            proof.response_a + Scalar::ONE,
            proof.response_r,
            proof.commitment_1,
            proof.commitment_2,
        );
        assert!(bad.verify(&level, &owner, &token).is_err());

        let bad = BindingProof::from_parts(
            proof.response_a,
            proof.response_r + Scalar::ONE,
            proof.commitment_1,
            proof.commitment_2,
        );
        assert!(bad.verify(&level, &owner, &token).is_err());
    }

    #[test]
    fn wrong_secrets_fail() {
        let (_, owner, _, level, token) = fixture(24);
        let mut rng = ChaCha12Rng::seed_from_u64(240);

        let other_secrets = HopSecrets::random(&mut rng).unwrap();
        let proof = BindingProof::prove(&other_secrets, &level, &owner, &token, &mut rng).unwrap();
        assert!(proof.verify(&level, &owner, &token).is_err());
    }
}
