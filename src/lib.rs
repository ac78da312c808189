// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

//! A proxy re-encryption toolkit for selling access to encrypted data on a UTxO ledger.
//!
//! # Overview
//!
//! Palimpsest lets a seller publish an encrypted payload on chain and later hand the ability to
//! decrypt it to a buyer, without ever revealing a secret key. Ownership moves through *hops*: at
//! listing time the seller records an initial [`HalfLevel`] and seals the payload in a [`Capsule`];
//! every accepted sale appends a fresh level targeting the buyer's public [`Register`] and upgrades
//! the previous level with a rekey point, turning it into a [`FullLevel`]. The final owner walks the
//! whole chain of levels with the [`DecryptionPath`] engine and recovers the plaintext; everyone
//! else recovers nothing.
//!
//! More formally, let `G1`/`G2` be the BLS12-381 generators and `H0..H3` the fixed public G2 points
//! carried by [`PublicParams`]. A hop with secrets `(a, r)` targeting a public value `u` publishes
//!
//! `r1 = [r]G1`, `r2 = [a]G1 + [r]u`, `commitment = [r]([c_a]H1 + [c_b]H2 (+ H3))`
//!
//! together with a [`BindingProof`] that `(a, r)` are known and bound to a specific token identity.
//! The symmetric key sealing the payload is a hash of the pairing `e([a]G1, H0)`; the chained
//! decryption walk divides the previous owner's contribution back out at every hop, so only the
//! final owner's secret is ever needed.
//!
//! # Implementation notes
//!
//! This implementation makes several opinionated choices:
//! - It uses the [`bls12_381`](https://crates.io/crates/bls12_381) crate for group operations.
//! - Fiat-Shamir challenges, level-commitment coefficients and key-derivation salts all come from
//!   domain-separated BLAKE2b-224; the 28-byte output matches the on-chain verifier.
//! - Payloads are sealed with AES-256-GCM under a key derived via HKDF-SHA3-256.
//! - The one operation the crate cannot perform bit-for-bit compatibly with the external
//!   zero-knowledge verifier, hashing a pairing output in the verifier's field-tower encoding, is
//!   delegated to a [`PairingOracle`] backend.
//!
//! # Warning
//!
//! While this implementation is written with security in mind, it is currently **experimental** and
//! not suitable for production use.
//!
//! # Example
//!
//! Key ownership and payload sealing, end to end:
//!
//! ```
//! use palimpsest::{Capsule, Register, SchnorrProof};
//! use rand_core::OsRng;
//!
//! let mut rng = OsRng;
//!
//! // A seller identity is a discrete-log keypair; prove knowledge of its secret
//! let seller = Register::random(&mut rng);
//! let proof = SchnorrProof::prove(&seller, &mut rng).unwrap();
//! assert!(proof.verify(&seller).is_ok());
//!
//! // Seal a payload against a hop context and key material from the pairing oracle
//! let kem = [7u8; 32];
//! let context = *seller.public_value();
//! let capsule = Capsule::encrypt(&context, &kem, b"the goods", &mut rng).unwrap();
//! assert_eq!(capsule.decrypt(&context, &kem).unwrap(), b"the goods");
//!
//! // The wrong key material is an authentication failure, never wrong plaintext
//! assert!(capsule.decrypt(&context, &[8u8; 32]).is_err());
//! ```
//!
//! See [`market`] for the listing/bid/transfer artifact bundles and [`DecryptionPath`] for the
//! recursive decryption walk.

/// Binding proofs tying hop secrets to a level and token.
pub mod binding;
pub use binding::BindingProof;
/// The authenticated encryption envelope around the payload.
pub mod capsule;
pub use capsule::Capsule;
/// Ledger wire format for every protocol artifact.
pub mod datum;
pub use datum::Data;
/// The recursive decryption engine.
pub mod engine;
pub use engine::DecryptionPath;
/// Packaging for the external proving backend's artifacts.
pub mod groth;
/// Domain-separated hashing and scalar encoding.
pub(crate) mod hashing;
/// Re-encryption levels and their builders.
pub mod level;
pub use level::{FullLevel, HalfLevel, HopSecrets};
/// Artifact bundles for listing, bidding and ownership transfer.
pub mod market;
/// The pairing-hash oracle boundary.
pub mod oracle;
pub use oracle::{PairingOracle, SnarkOracle};
/// Fixed public protocol parameters.
pub mod params;
pub use params::PublicParams;
/// The canonical CBOR payload schema sealed inside a capsule.
pub mod payload;
pub use payload::Payload;
/// Discrete-log keypairs and deterministic identity derivation.
pub mod register;
pub use register::Register;
/// Schnorr proofs of key ownership.
pub mod schnorr;
pub use schnorr::SchnorrProof;
/// Token identities.
pub mod token;
pub use token::TokenId;

/// Domain separators used for hashing operations.
///
/// Every tag must match the on-chain verifier byte for byte; a single differing tag silently
/// produces non-interoperable artifacts rather than an error.
pub(crate) mod domains {
    // Identity derivation
    pub(crate) const KEY: &[u8] = b"ED25519|To|BLS12381|v1|";

    // Pairing-output encoding, owned by the oracle backend
    pub(crate) const F12: &[u8] = b"F12|To|Hex|v1|";

    // Capsule key derivation
    pub(crate) const SALT: &[u8] = b"SLT|ECIES|AES-GCM|v1|";
    pub(crate) const KEM: &[u8] = b"KEM|ECIES|AES-GCM|v1|";
    pub(crate) const AAD: &[u8] = b"AAD|ECIES|AES-GCM|v1|";
    pub(crate) const MSG: &[u8] = b"MSG|ECIES|AES-GCM|v1|";

    // Proof transcripts
    pub(crate) const SCHNORR: &[u8] = b"SCHNORR|PROOF|v1|";
    pub(crate) const BINDING: &[u8] = b"BINDING|PROOF|v1|";

    // Level-commitment coefficients
    pub(crate) const HASH_TO_INT: &[u8] = b"HASH|To|Int|v1|";
}
