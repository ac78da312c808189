// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use blake2::{digest::consts::U28, Blake2b, Digest};
use bls12_381::Scalar;

/// Number of bytes in a protocol hash digest.
///
/// This width is shared with the on-chain verifier; the capsule's associated data is one of these
/// digests verbatim.
pub const DIGEST_BYTES: usize = 28;

type Blake2b224 = Blake2b<U28>;

/// Compute the protocol hash over a domain-separated transcript.
///
/// The caller passes the domain tag as the first part; parts are concatenated without framing, so
/// transcripts with variable-length parts must be fixed by construction (compressed points and the
/// token identity all have pinned widths).
pub(crate) fn protocol_hash(parts: &[&[u8]]) -> [u8; DIGEST_BYTES] {
    let mut hasher = Blake2b224::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hash a domain-separated transcript to a scalar.
///
/// The digest is read as a big-endian integer; a 224-bit value is always below the BLS12-381 group
/// order, so the reduction is canonical and no bias correction is needed.
pub(crate) fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    scalar_from_be_wide(&protocol_hash(parts))
}

/// Interpret up to 64 big-endian bytes as a scalar, reduced modulo the group order.
///
/// Used for challenge digests and for mapping the oracle's 32-byte KEM output to the hop-key
/// scalar.
pub(crate) fn scalar_from_be_wide(bytes: &[u8]) -> Scalar {
    debug_assert!(bytes.len() <= 64);
    let mut wide = [0u8; 64];
    for (le, be) in wide.iter_mut().zip(bytes.iter().rev()) {
        *le = *be;
    }
    Scalar::from_bytes_wide(&wide)
}

/// Encode a scalar as minimal-length big-endian bytes.
///
/// Leading zero bytes are stripped; the zero scalar encodes as a single zero byte so the encoding
/// is never empty.
pub(crate) fn scalar_to_bytes_min(scalar: &Scalar) -> Vec<u8> {
    let le = scalar.to_bytes();
    let mut be: Vec<u8> = le.iter().rev().copied().collect();
    let first_nonzero = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    be.drain(..first_nonzero);
    be
}

/// Decode a scalar from minimal-length big-endian bytes.
///
/// Returns `None` for the empty encoding, a non-minimal encoding (leading zero byte on a
/// multi-byte value), or a value at or above the group order.
pub(crate) fn scalar_from_bytes_min(bytes: &[u8]) -> Option<Scalar> {
    if bytes.is_empty() || bytes.len() > 32 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == 0 {
        return None;
    }
    let mut le = [0u8; 32];
    for (l, b) in le.iter_mut().zip(bytes.iter().rev()) {
        *l = *b;
    }
    Scalar::from_bytes(&le).into()
}
