// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use bls12_381::{G2Affine, G2Projective, Scalar};
use ff::Field;
use snafu::prelude::*;

use crate::{
    capsule::{Capsule, CapsuleError},
    level::{self, FullLevel, HalfLevel},
    oracle::{OracleError, PairingOracle},
    params::PublicParams,
};

/// The ordered level history the decryption engine walks for one token.
///
/// The head is the newest hop, the one not yet superseded by a later transfer; the tail holds the
/// superseded hops in reverse order of creation, ending at the listing's entry hop. Each tail
/// level carries the rekey point its successor installed, which is what lets the walk continue
/// backwards without any historical secret.
///
/// The ledger's history for a token is append-only; this view of it is read-only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionPath {
    head: HalfLevel,
    tail: Vec<FullLevel>,
}

/// Errors that can arise during the decryption walk.
#[derive(Debug, Snafu)]
pub enum EngineError {
    /// The final owner's secret was zero or out of range.
    #[snafu(display("The final owner's secret was zero or out of range"))]
    InvalidScalar,
    /// The pairing-hash backend failed; the walk is pure and may be retried.
    #[snafu(display("The pairing-hash backend failed"))]
    Oracle {
        /// The backend failure.
        source: OracleError,
    },
    /// The recovered key material did not open the capsule.
    ///
    /// A missing, reordered or tampered level diverges the chained hash from the one used at
    /// encryption time; the authentication tag is the sole correctness oracle, so the failure
    /// always surfaces here and never as wrong plaintext.
    #[snafu(display("The recovered key material did not open the capsule"))]
    Decryption {
        /// The capsule failure.
        source: CapsuleError,
    },
}

impl DecryptionPath {
    /// Assemble a path from the newest hop and the superseded hops walking back to the listing.
    pub fn new(head: HalfLevel, tail: Vec<FullLevel>) -> Self {
        Self { head, tail }
    }

    /// Get the newest hop.
    pub fn head(&self) -> &HalfLevel {
        &self.head
    }

    /// Get the superseded hops, most recent first.
    pub fn tail(&self) -> &[FullLevel] {
        &self.tail
    }

    /// Number of hops in the path.
    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    /// A path always holds at least its head.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Recover the plaintext as the final owner.
    ///
    /// Starting from `shared = [b]H0`, each hop's pairing hash divides the previous owner's
    /// contribution back out; between hops the recovered material is lifted back to G2 as the next
    /// `shared`. The last hop reached is the listing's entry hop, whose `r1` and key material
    /// bind the capsule.
    ///
    /// The hops of one path are inherently sequential; paths for distinct tokens are fully
    /// independent and may be walked in parallel.
    pub fn recover<O: PairingOracle + ?Sized>(
        &self,
        secret: &Scalar,
        capsule: &Capsule,
        params: &PublicParams,
        oracle: &O,
    ) -> Result<Vec<u8>, EngineError> {
        if bool::from(secret.is_zero()) {
            return Err(EngineError::InvalidScalar);
        }

        let mut shared: G2Affine =
            (G2Projective::from(params.decryption_base()) * secret).into();
        let mut kem = oracle
            .decrypt_to_hash(self.head.r1(), self.head.r2_g1(), None, &shared)
            .context(OracleSnafu)?;
        let mut context = self.head.r1();

        for hop in &self.tail {
            shared = (G2Projective::generator() * level::hop_key(&kem)).into();
            kem = oracle
                .decrypt_to_hash(hop.r1(), hop.r2_g1(), Some(hop.r2_g2()), &shared)
                .context(OracleSnafu)?;
            context = hop.r1();
        }

        capsule.decrypt(context, &kem).context(DecryptionSnafu)
    }
}
