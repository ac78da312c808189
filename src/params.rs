// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use bls12_381::G2Affine;
use snafu::prelude::*;

/// The fixed decryption base `H0`, compressed.
const DECRYPTION_BASE_HEX: &str = "a5acbe8bdb762cf7b4bfa9171b9ffa23b6ed710b290280b271a0258e285354aac338bb9e5a9ee41b4454e4c410f40eea16c82b493986bfc754aa789e1408b2b526f8b92e9ddcd4eee1a6c4daa84d561a6ceb452afc4559fe81a1c7f3f26715db";

/// The fixed commitment basis `H1..H3`, compressed.
const COMMITMENT_BASIS_HEX: [&str; 3] = [
    "a1dcce801cd2950dcad45faa854382bbe39f5f84d1855ed4ad2d5d2a8e94b67b2d126fbafbcd1a4f15b82f793f5c8cc80d5638f2260b3e3d0c3bcf1b45f7cc0f72f5a8d7a6d6e6615f7d72ab7e70dcbb56d1fefdb72c65f7bc5f073373cc99a7",
    "a8a54abec2b6379d1aa238de61a783f704255e14cd02c8385e9bb2e648e33ea9fc271a62ff5669defdc59cfee7414102180a831c7be88ea85bc81e0ec3a929bf63766ede414ee0aac2b66a3e7e20c631453aa11aa20eb7945349e4df933dc7dd",
    "872fd1490d93c0895b3dd1cef1874eca2457b1615e0a5a9cee4ddf14da09a0d51987ce3806d2e87f33139b261ee26ce00e71c41a7c75c158896db6a477e8b4b10b40bda60f8a0a7e0aa7e2a3b3652c9000508a15a24c9f5b3c4cfb84ef72c9a6",
];

/// Fixed public protocol parameters.
///
/// Four G2 points are protocol-wide constants, analogous to a trusted setup's public output: the
/// *decryption base* `H0` pairs against every hop's key material, and the three-point *commitment
/// basis* `H1..H3` anchors each level's commitment. They never change and are not derived from any
/// transaction; [`PublicParams::load`] only decodes and subgroup-checks the embedded encodings.
#[derive(Clone, Eq, PartialEq)]
pub struct PublicParams {
    decryption_base: G2Affine,
    commitment_basis: [G2Affine; 3],
}

/// Errors that can arise relating to [`PublicParams`].
#[derive(Debug, Snafu)]
pub enum ParamsError {
    /// A parameter point failed to decode.
    #[snafu(display("A parameter point failed to decode"))]
    InvalidPoint,
}

fn decode_g2(hex_point: &str) -> Result<G2Affine, ParamsError> {
    let bytes = hex::decode(hex_point).map_err(|_| ParamsError::InvalidPoint)?;
    let compressed: [u8; 96] = bytes.try_into().map_err(|_| ParamsError::InvalidPoint)?;
    Option::from(G2Affine::from_compressed(&compressed)).ok_or(ParamsError::InvalidPoint)
}

impl PublicParams {
    /// Decode and validate the protocol parameters.
    ///
    /// This is pure data; load once and share freely. Decoding performs the full compressed-point
    /// subgroup check, so a corrupted build of the constants fails here rather than producing
    /// malformed artifacts downstream.
    pub fn load() -> Result<Self, ParamsError> {
        let decryption_base = decode_g2(DECRYPTION_BASE_HEX)?;
        let commitment_basis = [
            decode_g2(COMMITMENT_BASIS_HEX[0])?,
            decode_g2(COMMITMENT_BASIS_HEX[1])?,
            decode_g2(COMMITMENT_BASIS_HEX[2])?,
        ];

        Ok(Self {
            decryption_base,
            commitment_basis,
        })
    }

    /// Get the decryption base `H0`.
    ///
    /// This is the G2 point every hop's key material is paired against.
    pub fn decryption_base(&self) -> &G2Affine {
        &self.decryption_base
    }

    /// Get the commitment basis `H1..H3`.
    pub fn commitment_basis(&self) -> &[G2Affine; 3] {
        &self.commitment_basis
    }
}

#[cfg(test)]
mod test {
    use group::Group;

    use super::*;

    #[test]
    fn parameters_decode_to_distinct_nonidentity_points() {
        let params = PublicParams::load().unwrap();

        let mut points = vec![*params.decryption_base()];
        points.extend_from_slice(params.commitment_basis());

        for point in &points {
            assert!(!bool::from(bls12_381::G2Projective::from(point).is_identity()));
        }
        for (i, a) in points.iter().enumerate() {
            for b in points.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
