// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

//! Artifact bundles for the three marketplace transactions.
//!
//! The ledger state machine decides *when* a listing, bid or transfer happens and who may trigger
//! it; these builders only produce the cryptographic artifacts each transition publishes. Every
//! builder is pure apart from its randomness and oracle round-trips, so a failed attempt can be
//! discarded and rebuilt wholesale.

use bls12_381::G1Affine;
use rand_core::CryptoRngCore;
use snafu::prelude::*;
use zeroize::Zeroizing;

use crate::{
    binding::{BindingError, BindingProof},
    capsule::{Capsule, CapsuleError},
    level::{self, FullLevel, HalfLevel, HopSecrets, LevelError},
    oracle::{OracleError, PairingOracle},
    params::PublicParams,
    register::{Register, RegisterError},
    schnorr::{SchnorrError, SchnorrProof},
    token::TokenId,
};

/// Errors that can arise while building transaction artifacts.
#[derive(Debug, Snafu)]
pub enum MarketError {
    /// A register operation failed.
    #[snafu(display("A register operation failed"))]
    Register {
        /// The underlying failure.
        source: RegisterError,
    },
    /// A level could not be built.
    #[snafu(display("A level could not be built"))]
    Level {
        /// The underlying failure.
        source: LevelError,
    },
    /// An ownership proof could not be built.
    #[snafu(display("An ownership proof could not be built"))]
    Ownership {
        /// The underlying failure.
        source: SchnorrError,
    },
    /// A binding proof could not be built.
    #[snafu(display("A binding proof could not be built"))]
    Binding {
        /// The underlying failure.
        source: BindingError,
    },
    /// The payload could not be sealed.
    #[snafu(display("The payload could not be sealed"))]
    Seal {
        /// The underlying failure.
        source: CapsuleError,
    },
    /// The pairing-hash backend failed.
    #[snafu(display("The pairing-hash backend failed"))]
    Oracle {
        /// The underlying failure.
        source: OracleError,
    },
}

/// Everything a seller publishes to open a listing.
pub struct ListingArtifacts {
    /// The seller's public register.
    pub register: Register,
    /// Proof that the seller knows the register's secret.
    pub ownership: SchnorrProof,
    /// The listing's entry level.
    pub level: HalfLevel,
    /// The sealed payload, bound to the entry level.
    pub capsule: Capsule,
    /// Proof binding the entry secrets to the level and token.
    pub binding: BindingProof,
}

impl ListingArtifacts {
    /// Build the artifacts for a new listing.
    ///
    /// Samples fresh hop secrets, obtains the KEM material for them from the oracle, records the
    /// entry level and seals `plaintext` against it.
    pub fn create<R: CryptoRngCore, O: PairingOracle + ?Sized>(
        params: &PublicParams,
        oracle: &O,
        owner: &Register,
        token: &TokenId,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Self, MarketError> {
        let secrets = HopSecrets::random(rng).context(LevelSnafu)?;
        let kem = oracle.gt_to_hash(secrets.a()).context(OracleSnafu)?;

        let ownership = SchnorrProof::prove(owner, rng).context(OwnershipSnafu)?;
        let level = HalfLevel::entry(params, &secrets, owner, token).context(LevelSnafu)?;
        let capsule = Capsule::encrypt(level.r1(), &kem, plaintext, rng).context(SealSnafu)?;
        let binding =
            BindingProof::prove(&secrets, &level, owner, token, rng).context(BindingSnafu)?;

        Ok(Self {
            register: owner.to_public(),
            ownership,
            level,
            capsule,
            binding,
        })
    }
}

/// Everything a bidder publishes to place a bid: an identity and proof of its secret.
pub struct BidArtifacts {
    /// The bidder's public register.
    pub register: Register,
    /// Proof that the bidder knows the register's secret.
    pub ownership: SchnorrProof,
}

impl BidArtifacts {
    /// Build the artifacts for a bid.
    pub fn create<R: CryptoRngCore>(
        bidder: &Register,
        rng: &mut R,
    ) -> Result<Self, MarketError> {
        let ownership = SchnorrProof::prove(bidder, rng).context(OwnershipSnafu)?;

        Ok(Self {
            register: bidder.to_public(),
            ownership,
        })
    }
}

/// Everything an accepted sale publishes to move ownership one hop.
///
/// The external proving step separately attests that these artifacts were computed correctly from
/// the outgoing owner's secrets and the buyer's public register; this bundle carries only what
/// the ledger records.
pub struct TransferArtifacts {
    /// The fresh hop targeting the buyer.
    pub level: HalfLevel,
    /// The previously-newest level, upgraded with the rekey point.
    pub predecessor: FullLevel,
    /// The public witness point `[hk]G1` for the proving step.
    pub witness: G1Affine,
    /// Proof binding the hop secrets to the new level and token.
    pub binding: BindingProof,
    /// The new hop's KEM material, for callers that rotate the capsule onto this hop.
    pub kem_material: Zeroizing<[u8; 32]>,
}

impl TransferArtifacts {
    /// Build the artifacts for an ownership transfer.
    ///
    /// `previous` is the level being superseded; it is consumed and returned upgraded, its other
    /// fields untouched. The outgoing owner must hold their secret; the buyer register only needs
    /// its public half.
    pub fn create<R: CryptoRngCore, O: PairingOracle + ?Sized>(
        params: &PublicParams,
        oracle: &O,
        outgoing: &Register,
        buyer: &Register,
        previous: HalfLevel,
        token: &TokenId,
        rng: &mut R,
    ) -> Result<Self, MarketError> {
        let outgoing_secret = outgoing.secret().context(RegisterSnafu)?;

        let secrets = HopSecrets::random(rng).context(LevelSnafu)?;
        let kem = oracle.gt_to_hash(secrets.a()).context(OracleSnafu)?;
        let hop_key = level::hop_key(&kem);

        let level = HalfLevel::hop(params, &secrets, buyer, token).context(LevelSnafu)?;
        let binding =
            BindingProof::prove(&secrets, &level, buyer, token, rng).context(BindingSnafu)?;

        let rekey = level::rekey_point(params, &hop_key, outgoing_secret);
        let witness = level::witness_point(&hop_key);
        let predecessor = previous.into_full(rekey);

        Ok(Self {
            level,
            predecessor,
            witness,
            binding,
            kem_material: Zeroizing::new(kem),
        })
    }

    /// Get the rekey point installed into the superseded level.
    pub fn rekey(&self) -> &bls12_381::G2Affine {
        self.predecessor.r2_g2()
    }
}

#[cfg(test)]
mod test {
    use rand_chacha::ChaCha12Rng;
    use rand_core::SeedableRng;

    use super::*;
    use crate::{engine::DecryptionPath, oracle::stub::StubOracle};

    #[test]
    fn listing_artifacts_hang_together() {
        let mut rng = ChaCha12Rng::seed_from_u64(71);
        let params = PublicParams::load().unwrap();
        let oracle = StubOracle::new();
        let seller = Register::random(&mut rng);
        let token = TokenId::new([7; 32]);

        let listing =
            ListingArtifacts::create(&params, &oracle, &seller, &token, b"wares", &mut rng)
                .unwrap();

        assert!(listing.ownership.verify(&listing.register).is_ok());
        assert!(listing
            .binding
            .verify(&listing.level, &listing.register, &token)
            .is_ok());
        assert!(listing.register.secret().is_err());

        // The seller can open their own unsold listing
        let path = DecryptionPath::new(listing.level.clone(), Vec::new());
        let recovered = path
            .recover(seller.secret().unwrap(), &listing.capsule, &params, &oracle)
            .unwrap();
        assert_eq!(recovered, b"wares");
    }

    #[test]
    fn a_transfer_hands_decryption_to_the_buyer() {
        let mut rng = ChaCha12Rng::seed_from_u64(72);
        let params = PublicParams::load().unwrap();
        let oracle = StubOracle::new();
        let seller = Register::random(&mut rng);
        let buyer = Register::random(&mut rng);
        let token = TokenId::new([8; 32]);

        let listing =
            ListingArtifacts::create(&params, &oracle, &seller, &token, b"sold", &mut rng)
                .unwrap();
        let bid = BidArtifacts::create(&buyer, &mut rng).unwrap();
        assert!(bid.ownership.verify(&bid.register).is_ok());

        let transfer = TransferArtifacts::create(
            &params,
            &oracle,
            &seller,
            &bid.register,
            listing.level.clone(),
            &token,
            &mut rng,
        )
        .unwrap();

        // The binding proof targets the buyer's register
        assert!(transfer
            .binding
            .verify(&transfer.level, &bid.register, &token)
            .is_ok());

        // The superseded level kept its public fields
        assert_eq!(transfer.predecessor.r1(), listing.level.r1());
        assert_eq!(transfer.predecessor.r2_g1(), listing.level.r2_g1());

        // The buyer walks the two-hop path; the seller no longer can
        let path = DecryptionPath::new(
            transfer.level.clone(),
            vec![transfer.predecessor.clone()],
        );
        let recovered = path
            .recover(buyer.secret().unwrap(), &listing.capsule, &params, &oracle)
            .unwrap();
        assert_eq!(recovered, b"sold");
        assert!(path
            .recover(seller.secret().unwrap(), &listing.capsule, &params, &oracle)
            .is_err());
    }

    #[test]
    fn a_rotated_capsule_opens_with_a_single_hop() {
        let mut rng = ChaCha12Rng::seed_from_u64(73);
        let params = PublicParams::load().unwrap();
        let oracle = StubOracle::new();
        let seller = Register::random(&mut rng);
        let buyer = Register::random(&mut rng);
        let token = TokenId::new([9; 32]);

        let listing =
            ListingArtifacts::create(&params, &oracle, &seller, &token, b"rotated", &mut rng)
                .unwrap();
        let transfer = TransferArtifacts::create(
            &params,
            &oracle,
            &seller,
            &buyer.to_public(),
            listing.level.clone(),
            &token,
            &mut rng,
        )
        .unwrap();

        // The outgoing owner recovers the plaintext and reseals it for the new hop
        let old_path = DecryptionPath::new(listing.level.clone(), Vec::new());
        let plaintext = old_path
            .recover(seller.secret().unwrap(), &listing.capsule, &params, &oracle)
            .unwrap();
        let rotated =
            Capsule::encrypt(transfer.level.r1(), &transfer.kem_material, &plaintext, &mut rng)
                .unwrap();

        // The buyer opens it through the single fresh hop
        let path = DecryptionPath::new(transfer.level.clone(), Vec::new());
        let recovered = path
            .recover(buyer.secret().unwrap(), &rotated, &params, &oracle)
            .unwrap();
        assert_eq!(recovered, b"rotated");
    }
}
