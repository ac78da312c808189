// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use std::{
    path::PathBuf,
    process::Command,
};

use bls12_381::{G1Affine, G2Affine, Scalar};
use snafu::prelude::*;

use crate::hashing;

/// The 32-byte shared secret derived from a bilinear pairing.
pub type KemMaterial = [u8; 32];

/// The pairing-hash capability this crate calls but does not implement.
///
/// Both operations hash a pairing-target-group element in the exact field-tower encoding the
/// external zero-knowledge verifier computes over the same values. That encoding is owned by the
/// proving backend; a backend whose encoding diverges by so much as coefficient order produces
/// KEM material that silently fails capsule authentication rather than crashing, so any backend
/// must be validated against conformance vectors before use.
///
/// All operations here are pure; a failed call may be retried wholesale.
pub trait PairingOracle {
    /// Hash the pairing of `[a]G1` against the decryption base.
    ///
    /// This is the KEM material for a hop with secret `a`.
    fn gt_to_hash(&self, a: &Scalar) -> Result<KemMaterial, OracleError>;

    /// Hash the pairing ratio for one step of the decryption walk.
    ///
    /// Computes `H(e(r2_g1, H0) * e(r1, r2_g2)? / e(r1, shared))`; the optional `r2_g2` term is
    /// present for superseded hops and absent for the newest one.
    fn decrypt_to_hash(
        &self,
        r1: &G1Affine,
        r2_g1: &G1Affine,
        r2_g2: Option<&G2Affine>,
        shared: &G2Affine,
    ) -> Result<KemMaterial, OracleError>;
}

/// Errors that can arise at the oracle boundary.
#[derive(Debug, Snafu)]
pub enum OracleError {
    /// The backend did not respond.
    ///
    /// Oracle calls are pure, so the caller may retry the whole hop computation.
    #[snafu(display("The pairing-hash backend did not respond: {reason}"))]
    Unavailable {
        /// What went wrong with the round-trip.
        reason: String,
    },
    /// The backend responded with something other than a 32-byte hash.
    #[snafu(display("The pairing-hash backend returned a malformed response"))]
    MalformedResponse,
}

/// A pairing-hash backend reached by spawning the proving toolchain's binary.
///
/// Speaks the backend's CLI over hex-encoded compressed points and scalars:
/// `hash -a <scalar_hex>` and `decrypt -r1 <g1> -g1b <g1> [-g2b <g2>] -shared <g2>`, one
/// bounded-latency blocking round-trip per call. No timeout is imposed here; cancellation policy
/// belongs to the caller.
pub struct SnarkOracle {
    binary: PathBuf,
}

impl SnarkOracle {
    /// Build an oracle around the backend binary at `binary`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<KemMaterial, OracleError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| OracleError::Unavailable {
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OracleError::Unavailable {
                reason: format!("backend exited with {}", output.status),
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| OracleError::MalformedResponse)?;
        let bytes = hex::decode(stdout.trim()).map_err(|_| OracleError::MalformedResponse)?;
        bytes.try_into().map_err(|_| OracleError::MalformedResponse)
    }
}

impl PairingOracle for SnarkOracle {
    fn gt_to_hash(&self, a: &Scalar) -> Result<KemMaterial, OracleError> {
        let a_hex = hex::encode(hashing::scalar_to_bytes_min(a));
        self.run(&["hash", "-a", &a_hex])
    }

    fn decrypt_to_hash(
        &self,
        r1: &G1Affine,
        r2_g1: &G1Affine,
        r2_g2: Option<&G2Affine>,
        shared: &G2Affine,
    ) -> Result<KemMaterial, OracleError> {
        let r1_hex = hex::encode(r1.to_compressed());
        let r2_g1_hex = hex::encode(r2_g1.to_compressed());
        let shared_hex = hex::encode(shared.to_compressed());

        match r2_g2 {
            None => self.run(&["decrypt", "-r1", &r1_hex, "-g1b", &r2_g1_hex, "-shared", &shared_hex]),
            Some(r2_g2) => {
                let r2_g2_hex = hex::encode(r2_g2.to_compressed());
                self.run(&[
                    "decrypt",
                    "-r1",
                    &r1_hex,
                    "-g1b",
                    &r2_g1_hex,
                    "-g2b",
                    &r2_g2_hex,
                    "-shared",
                    &shared_hex,
                ])
            },
        }
    }
}

/// A deterministic in-process oracle for tests.
///
/// Computes the same pairing products as a real backend but hashes the target-group element
/// through its `Debug` rendering, which is stable within a build of the curve crate and nothing
/// more. Artifacts produced against it do not interoperate with any external verifier; that is
/// exactly what makes it safe to keep in the test tree.
#[cfg(test)]
pub(crate) mod stub {
    use blake2::{digest::consts::U32, Blake2b, Digest};
    use bls12_381::{pairing, G1Projective, Gt};

    use super::*;
    use crate::{domains, params::PublicParams};

    pub(crate) struct StubOracle {
        params: PublicParams,
    }

    impl StubOracle {
        pub(crate) fn new() -> Self {
            Self {
                params: PublicParams::load().unwrap(),
            }
        }

        fn hash_gt(value: &Gt) -> KemMaterial {
            let mut hasher = Blake2b::<U32>::new();
            hasher.update(domains::F12);
            hasher.update(format!("{value:?}").as_bytes());
            hasher.finalize().into()
        }
    }

    impl PairingOracle for StubOracle {
        fn gt_to_hash(&self, a: &Scalar) -> Result<KemMaterial, OracleError> {
            let qa: G1Affine = (G1Projective::generator() * a).into();
            Ok(Self::hash_gt(&pairing(&qa, self.params.decryption_base())))
        }

        fn decrypt_to_hash(
            &self,
            r1: &G1Affine,
            r2_g1: &G1Affine,
            r2_g2: Option<&G2Affine>,
            shared: &G2Affine,
        ) -> Result<KemMaterial, OracleError> {
            let mut acc = pairing(r2_g1, self.params.decryption_base());
            if let Some(r2_g2) = r2_g2 {
                acc += pairing(r1, r2_g2);
            }
            acc -= pairing(r1, shared);

            Ok(Self::hash_gt(&acc))
        }
    }

    #[test]
    fn stub_is_deterministic_and_input_sensitive() {
        let oracle = StubOracle::new();

        let one = oracle.gt_to_hash(&Scalar::from(5u64)).unwrap();
        let two = oracle.gt_to_hash(&Scalar::from(5u64)).unwrap();
        let three = oracle.gt_to_hash(&Scalar::from(6u64)).unwrap();

        assert_eq!(one, two);
        assert_ne!(one, three);
    }

    #[test]
    fn half_step_inverts_the_entry_pairing() {
        // For an entry hop, e(r2, H0) / e(r1, [sk]H0) collapses to e([a]G1, H0)
        use ff::Field;
        use rand_chacha::ChaCha12Rng;
        use rand_core::SeedableRng;

        let mut rng = ChaCha12Rng::seed_from_u64(51);
        let oracle = StubOracle::new();

        let sk = Scalar::random(&mut rng);
        let a = Scalar::random(&mut rng);
        let r = Scalar::random(&mut rng);

        let r1: G1Affine = (G1Projective::generator() * r).into();
        let r2: G1Affine = (G1Projective::generator() * (a + r * sk)).into();
        let shared: G2Affine =
            (bls12_381::G2Projective::from(oracle.params.decryption_base()) * sk).into();

        assert_eq!(
            oracle.decrypt_to_hash(&r1, &r2, None, &shared).unwrap(),
            oracle.gt_to_hash(&a).unwrap(),
        );
    }
}
