// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use ff::Field;
use rand_core::CryptoRngCore;
use snafu::prelude::*;

use crate::{
    domains,
    hashing,
    oracle::KemMaterial,
    params::PublicParams,
    register::Register,
    token::TokenId,
};

/// The fresh secret pair `(a, r)` behind one re-encryption hop.
///
/// `a` keys the hop (the KEM material is a pairing hash of `[a]G1`) and `r` blinds the level's
/// public points. Both are drawn fresh per hop and never reused: the same pair under two
/// challenges hands an observer two equations in two unknowns.
pub struct HopSecrets {
    a: Scalar,
    r: Scalar,
}

/// The public key material recorded for a hop whose successor has not yet been published.
///
/// A listing's first hop starts life as a half level, as does each subsequent hop at the moment
/// it is created; the next ownership transfer upgrades it to a [`FullLevel`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HalfLevel {
    r1: G1Affine,
    r2_g1: G1Affine,
    commitment: G2Affine,
}

/// A hop that has been superseded: a [`HalfLevel`] completed with the rekey point installed by
/// the following transfer.
///
/// The upgrade is purely additive; `r1`, `r2` and the commitment are carried over unchanged, so a
/// full level always agrees with the half level it came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FullLevel {
    r1: G1Affine,
    r2_g1: G1Affine,
    r2_g2: G2Affine,
    commitment: G2Affine,
}

/// Errors that can arise relating to levels.
#[derive(Debug, Snafu)]
pub enum LevelError {
    /// A scalar was zero or out of range.
    #[snafu(display("A scalar was zero or out of range"))]
    InvalidScalar,
    /// The owner register does not hold its secret.
    #[snafu(display("The owner register does not hold its secret"))]
    MissingSecret,
}

impl HopSecrets {
    /// Build hop secrets from explicit scalars, rejecting zero.
    pub fn new(a: Scalar, r: Scalar) -> Result<Self, LevelError> {
        if bool::from(a.is_zero()) || bool::from(r.is_zero()) {
            return Err(LevelError::InvalidScalar);
        }

        Ok(Self { a, r })
    }

    /// Draw a fresh random hop secret pair.
    pub fn random<R: CryptoRngCore>(rng: &mut R) -> Result<Self, LevelError> {
        Self::new(Scalar::random(&mut *rng), Scalar::random(&mut *rng))
    }

    /// Get the KEM secret `a`.
    pub fn a(&self) -> &Scalar {
        &self.a
    }

    /// Get the blinding secret `r`.
    pub fn r(&self) -> &Scalar {
        &self.r
    }
}

impl HalfLevel {
    /// Build the entry level a seller records at listing time.
    ///
    /// With secrets `(a, r)` and the seller's secret `sk`:
    /// `r1 = [r]G1`, `r2 = [a + r*sk]G1` and the commitment is
    /// `[r]([c_a]H1 + [c_b]H2 + H3)` over the transcript-derived coefficients. The trailing basis
    /// point marks the entry hop; the on-chain circuit distinguishes it from later hops.
    pub fn entry(
        params: &PublicParams,
        secrets: &HopSecrets,
        owner: &Register,
        token: &TokenId,
    ) -> Result<Self, LevelError> {
        let sk = owner.secret().map_err(|_| LevelError::MissingSecret)?;

        let r1: G1Affine = (G1Projective::generator() * secrets.r).into();
        let r2_g1: G1Affine = (G1Projective::generator() * (secrets.a + secrets.r * sk)).into();
        let commitment = commit(params, &r1, &r2_g1, token, true, &secrets.r);

        Ok(Self { r1, r2_g1, commitment })
    }

    /// Build the level a transfer records against the target owner's public value.
    ///
    /// `r1 = [r]G1`, `r2 = [a]G1 + [r]u` for the target's public value `u`, and the commitment
    /// omits the entry marker: `[r]([c_a]H1 + [c_b]H2)`.
    pub fn hop(
        params: &PublicParams,
        secrets: &HopSecrets,
        target: &Register,
        token: &TokenId,
    ) -> Result<Self, LevelError> {
        let r1: G1Affine = (G1Projective::generator() * secrets.r).into();
        let r2_g1: G1Affine = (G1Projective::generator() * secrets.a
            + G1Projective::from(target.public_value()) * secrets.r)
            .into();
        let commitment = commit(params, &r1, &r2_g1, token, false, &secrets.r);

        Ok(Self { r1, r2_g1, commitment })
    }

    /// Upgrade this level with the rekey point produced by the following transfer.
    ///
    /// All other fields carry over verbatim.
    pub fn into_full(self, rekey: G2Affine) -> FullLevel {
        FullLevel {
            r1: self.r1,
            r2_g1: self.r2_g1,
            r2_g2: rekey,
            commitment: self.commitment,
        }
    }

    /// Get the blinded point `r1`.
    pub fn r1(&self) -> &G1Affine {
        &self.r1
    }

    /// Get the G1 key component `r2`.
    pub fn r2_g1(&self) -> &G1Affine {
        &self.r2_g1
    }

    /// Get the level commitment.
    pub fn commitment(&self) -> &G2Affine {
        &self.commitment
    }

    pub(crate) fn from_parts(r1: G1Affine, r2_g1: G1Affine, commitment: G2Affine) -> Self {
        Self { r1, r2_g1, commitment }
    }
}

impl FullLevel {
    /// Get the blinded point `r1`.
    pub fn r1(&self) -> &G1Affine {
        &self.r1
    }

    /// Get the G1 key component `r2`.
    pub fn r2_g1(&self) -> &G1Affine {
        &self.r2_g1
    }

    /// Get the rekey point installed by the following transfer.
    pub fn r2_g2(&self) -> &G2Affine {
        &self.r2_g2
    }

    /// Get the level commitment.
    pub fn commitment(&self) -> &G2Affine {
        &self.commitment
    }

    pub(crate) fn from_parts(
        r1: G1Affine,
        r2_g1: G1Affine,
        r2_g2: G2Affine,
        commitment: G2Affine,
    ) -> Self {
        Self { r1, r2_g1, r2_g2, commitment }
    }
}

/// Compute a level commitment.
///
/// The coefficients fold the level's own public points and the token identity into the
/// commitment, so a commitment cannot be detached from its level or its token:
/// `c_a = H(tag || r1)`, `c_b = H(tag || r1 || r2 || token)`.
fn commit(
    params: &PublicParams,
    r1: &G1Affine,
    r2_g1: &G1Affine,
    token: &TokenId,
    entry: bool,
    r: &Scalar,
) -> G2Affine {
    let r1_bytes = r1.to_compressed();
    let r2_bytes = r2_g1.to_compressed();

    let coeff_a = hashing::hash_to_scalar(&[domains::HASH_TO_INT, &r1_bytes]);
    let coeff_b = hashing::hash_to_scalar(&[
        domains::HASH_TO_INT,
        &r1_bytes,
        &r2_bytes,
        token.as_bytes(),
    ]);

    let basis = params.commitment_basis();
    let mut point = G2Projective::from(basis[0]) * coeff_a + G2Projective::from(basis[1]) * coeff_b;
    if entry {
        point += G2Projective::from(basis[2]);
    }

    (point * r).into()
}

/// Derive the hop-key scalar from a hop's KEM material.
pub fn hop_key(kem: &KemMaterial) -> Scalar {
    hashing::scalar_from_be_wide(kem)
}

/// Compute the rekey point a transfer installs into the superseded level.
///
/// `[hk]G2 - [sk]H0`: the new hop's key shifted by the outgoing owner's secret against the
/// decryption base. During the decryption walk the `[sk]H0` term cancels the outgoing owner's
/// contribution, which is what lets the chain be walked without any historical secret.
pub fn rekey_point(params: &PublicParams, hop_key: &Scalar, owner_secret: &Scalar) -> G2Affine {
    (G2Projective::generator() * hop_key
        - G2Projective::from(params.decryption_base()) * owner_secret)
        .into()
}

/// Compute the public witness point `[hk]G1` for the external proving step.
pub fn witness_point(hop_key: &Scalar) -> G1Affine {
    (G1Projective::generator() * hop_key).into()
}
