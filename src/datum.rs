// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

//! The ledger wire format.
//!
//! Every artifact is serialized as a constructor-tagged record: a constructor index plus an
//! ordered field list, rendered in the ledger CLI's JSON encoding
//! (`{"constructor": i, "fields": [...]}` with `{"bytes": ...}`, `{"int": ...}` and
//! `{"list": [...]}` leaves). Field widths are fixed and validated on decode: G1 points are 48
//! compressed bytes, G2 points 96, nonces 12, the associated-data digest 28, and scalars are
//! minimal big-endian with a single zero byte for zero.

use bls12_381::{G1Affine, G2Affine, Scalar};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use snafu::prelude::*;

use crate::{
    binding::BindingProof,
    capsule::{Capsule, NONCE_BYTES},
    groth::{GrothProof, PublicInputs},
    hashing::{self, DIGEST_BYTES},
    level::{FullLevel, HalfLevel},
    register::Register,
    schnorr::SchnorrProof,
    token::TokenId,
};

/// A node of ledger data: a constructor-tagged record or one of its leaves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Data {
    /// A tagged record with ordered fields.
    Constr {
        /// The constructor index.
        tag: u64,
        /// The ordered field list.
        fields: Vec<Data>,
    },
    /// A byte string.
    Bytes(Vec<u8>),
    /// An integer; ledger integers exceed machine width, so the JSON number is kept as-is.
    Int(serde_json::Number),
    /// A list of nodes.
    List(Vec<Data>),
}

/// Errors that can arise while encoding or decoding ledger data.
#[derive(Debug, Snafu)]
pub enum DatumError {
    /// The data did not have the expected shape.
    #[snafu(display("Unexpected data shape: {reason}"))]
    UnexpectedShape {
        /// What was wrong.
        reason: &'static str,
    },
    /// A byte field had the wrong length.
    #[snafu(display("Expected a {expected}-byte field, found {actual} bytes"))]
    InvalidLength {
        /// The required width.
        expected: usize,
        /// The width found.
        actual: usize,
    },
    /// A point failed to decode or sat outside the prime-order subgroup.
    #[snafu(display("A point failed to decode"))]
    InvalidPoint,
    /// A scalar encoding was non-minimal or out of range.
    #[snafu(display("A scalar encoding was non-minimal or out of range"))]
    InvalidScalar,
    /// The JSON text was not valid.
    #[snafu(display("The JSON text was not valid"))]
    Json,
}

impl Data {
    /// Shorthand for a tagged record.
    pub fn constr(tag: u64, fields: Vec<Data>) -> Self {
        Self::Constr { tag, fields }
    }

    /// Shorthand for a byte-string leaf.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Render as the ledger CLI's JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Constr { tag, fields } => serde_json::json!({
                "constructor": tag,
                "fields": fields.iter().map(Self::to_json).collect::<Vec<Value>>(),
            }),
            Self::Bytes(bytes) => serde_json::json!({ "bytes": hex::encode(bytes) }),
            Self::Int(number) => serde_json::json!({ "int": number }),
            Self::List(items) => serde_json::json!({
                "list": items.iter().map(Self::to_json).collect::<Vec<Value>>(),
            }),
        }
    }

    /// Parse from the ledger CLI's JSON value.
    pub fn from_json(value: &Value) -> Result<Self, DatumError> {
        let object = value.as_object().ok_or(DatumError::UnexpectedShape {
            reason: "expected an object node",
        })?;

        if let Some(tag) = object.get("constructor") {
            let tag = tag.as_u64().ok_or(DatumError::UnexpectedShape {
                reason: "constructor index must be an unsigned integer",
            })?;
            let fields = object
                .get("fields")
                .and_then(Value::as_array)
                .ok_or(DatumError::UnexpectedShape {
                    reason: "a constructor node requires a field list",
                })?
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<Data>, DatumError>>()?;
            return Ok(Self::Constr { tag, fields });
        }
        if let Some(bytes) = object.get("bytes") {
            let bytes = bytes.as_str().ok_or(DatumError::UnexpectedShape {
                reason: "a bytes node holds a hex string",
            })?;
            let bytes = hex::decode(bytes).map_err(|_| DatumError::UnexpectedShape {
                reason: "a bytes node holds a hex string",
            })?;
            return Ok(Self::Bytes(bytes));
        }
        if let Some(number) = object.get("int") {
            let number = number.as_number().ok_or(DatumError::UnexpectedShape {
                reason: "an int node holds an integer",
            })?;
            return Ok(Self::Int(number.clone()));
        }
        if let Some(items) = object.get("list") {
            let items = items.as_array().ok_or(DatumError::UnexpectedShape {
                reason: "a list node holds an array",
            })?;
            let items = items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<Data>, DatumError>>()?;
            return Ok(Self::List(items));
        }

        Err(DatumError::UnexpectedShape {
            reason: "unknown node kind",
        })
    }

    /// Render as a JSON string.
    pub fn to_json_string(&self) -> String {
        // A Value made of maps, strings and numbers cannot fail to serialize
        self.to_json().to_string()
    }

    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, DatumError> {
        let value: Value = serde_json::from_str(text).map_err(|_| DatumError::Json)?;
        Self::from_json(&value)
    }

    /// Expect a tagged record with a specific constructor index, yielding its fields.
    pub(crate) fn expect_constr(&self, tag: u64, arity: usize) -> Result<&[Data], DatumError> {
        match self {
            Self::Constr {
                tag: found,
                fields,
            } if *found == tag && fields.len() == arity => Ok(fields),
            _ => Err(DatumError::UnexpectedShape {
                reason: "wrong constructor index or arity",
            }),
        }
    }

    /// Expect a byte-string leaf of an exact width.
    pub(crate) fn expect_bytes(&self, width: usize) -> Result<&[u8], DatumError> {
        match self {
            Self::Bytes(bytes) if bytes.len() == width => Ok(bytes),
            Self::Bytes(bytes) => Err(DatumError::InvalidLength {
                expected: width,
                actual: bytes.len(),
            }),
            _ => Err(DatumError::UnexpectedShape {
                reason: "expected a bytes node",
            }),
        }
    }

    /// Expect a byte-string leaf of any width.
    pub(crate) fn expect_any_bytes(&self) -> Result<&[u8], DatumError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            _ => Err(DatumError::UnexpectedShape {
                reason: "expected a bytes node",
            }),
        }
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

fn decode_g1(bytes: &[u8]) -> Result<G1Affine, DatumError> {
    let compressed: [u8; 48] = bytes.try_into().map_err(|_| DatumError::InvalidLength {
        expected: 48,
        actual: bytes.len(),
    })?;
    Option::from(G1Affine::from_compressed(&compressed)).ok_or(DatumError::InvalidPoint)
}

fn decode_g2(bytes: &[u8]) -> Result<G2Affine, DatumError> {
    let compressed: [u8; 96] = bytes.try_into().map_err(|_| DatumError::InvalidLength {
        expected: 96,
        actual: bytes.len(),
    })?;
    Option::from(G2Affine::from_compressed(&compressed)).ok_or(DatumError::InvalidPoint)
}

fn decode_scalar(bytes: &[u8]) -> Result<Scalar, DatumError> {
    hashing::scalar_from_bytes_min(bytes).ok_or(DatumError::InvalidScalar)
}

impl Register {
    /// Encode the public register as ledger data. The secret is never written.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(self.generator().to_compressed().to_vec()),
            Data::bytes(self.public_value().to_compressed().to_vec()),
        ])
    }

    /// Decode a public register from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 2)?;
        let generator = decode_g1(fields[0].expect_bytes(48)?)?;
        let public_value = decode_g1(fields[1].expect_bytes(48)?)?;
        Ok(Self::from_public(generator, public_value))
    }
}

impl SchnorrProof {
    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(hashing::scalar_to_bytes_min(self.response())),
            Data::bytes(self.commitment().to_compressed().to_vec()),
        ])
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 2)?;
        let response = decode_scalar(fields[0].expect_any_bytes()?)?;
        let commitment = decode_g1(fields[1].expect_bytes(48)?)?;
        Ok(Self::from_parts(response, commitment))
    }
}

impl BindingProof {
    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(hashing::scalar_to_bytes_min(self.response_a())),
            Data::bytes(hashing::scalar_to_bytes_min(self.response_r())),
            Data::bytes(self.commitment_1().to_compressed().to_vec()),
            Data::bytes(self.commitment_2().to_compressed().to_vec()),
        ])
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 4)?;
        let response_a = decode_scalar(fields[0].expect_any_bytes()?)?;
        let response_r = decode_scalar(fields[1].expect_any_bytes()?)?;
        let commitment_1 = decode_g1(fields[2].expect_bytes(48)?)?;
        let commitment_2 = decode_g1(fields[3].expect_bytes(48)?)?;
        Ok(Self::from_parts(response_a, response_r, commitment_1, commitment_2))
    }
}

impl HalfLevel {
    /// Encode as ledger data. The absent rekey slot is the empty alternative constructor.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(self.r1().to_compressed().to_vec()),
            Data::constr(0, vec![
                Data::bytes(self.r2_g1().to_compressed().to_vec()),
                Data::constr(1, Vec::new()),
            ]),
            Data::bytes(self.commitment().to_compressed().to_vec()),
        ])
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 3)?;
        let r1 = decode_g1(fields[0].expect_bytes(48)?)?;

        let r2 = fields[1].expect_constr(0, 2)?;
        let r2_g1 = decode_g1(r2[0].expect_bytes(48)?)?;
        r2[1].expect_constr(1, 0)?;

        let commitment = decode_g2(fields[2].expect_bytes(96)?)?;
        Ok(Self::from_parts(r1, r2_g1, commitment))
    }
}

impl FullLevel {
    /// Encode as ledger data. The rekey slot holds the installed G2 point.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(self.r1().to_compressed().to_vec()),
            Data::constr(0, vec![
                Data::bytes(self.r2_g1().to_compressed().to_vec()),
                Data::constr(0, vec![Data::bytes(self.r2_g2().to_compressed().to_vec())]),
            ]),
            Data::bytes(self.commitment().to_compressed().to_vec()),
        ])
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 3)?;
        let r1 = decode_g1(fields[0].expect_bytes(48)?)?;

        let r2 = fields[1].expect_constr(0, 2)?;
        let r2_g1 = decode_g1(r2[0].expect_bytes(48)?)?;
        let rekey = r2[1].expect_constr(0, 1)?;
        let r2_g2 = decode_g2(rekey[0].expect_bytes(96)?)?;

        let commitment = decode_g2(fields[2].expect_bytes(96)?)?;
        Ok(Self::from_parts(r1, r2_g1, r2_g2, commitment))
    }
}

impl Capsule {
    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(self.nonce().to_vec()),
            Data::bytes(self.aad().to_vec()),
            Data::bytes(self.ciphertext().to_vec()),
        ])
    }

    /// Decode from ledger data.
    ///
    /// The ciphertext must at least hold its trailing authentication tag.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 3)?;
        let nonce: [u8; NONCE_BYTES] = fields[0]
            .expect_bytes(NONCE_BYTES)?
            .try_into()
            .map_err(|_| DatumError::InvalidPoint)?;
        let aad: [u8; DIGEST_BYTES] = fields[1]
            .expect_bytes(DIGEST_BYTES)?
            .try_into()
            .map_err(|_| DatumError::InvalidPoint)?;
        let ciphertext = fields[2].expect_any_bytes()?;
        if ciphertext.len() < crate::capsule::TAG_BYTES {
            return Err(DatumError::InvalidLength {
                expected: crate::capsule::TAG_BYTES,
                actual: ciphertext.len(),
            });
        }
        Ok(Self::from_parts(nonce, aad, ciphertext.to_vec()))
    }
}

impl TokenId {
    /// Encode as a ledger byte-string leaf.
    pub fn to_data(&self) -> Data {
        Data::bytes(self.as_bytes().to_vec())
    }

    /// Decode from a ledger byte-string leaf.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let bytes = data.expect_bytes(32)?;
        Self::from_slice(bytes).map_err(|_| DatumError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })
    }
}

/// The listing's externally-enforced sale state, carried here for wire compatibility only.
///
/// The ledger validator owns the transitions; this crate only encodes and decodes the record. A
/// `Pending` sale is not yet final: its level may still be superseded or cancelled externally.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// No accepted sale in flight.
    Open,
    /// An accepted sale awaiting its proof-checked settlement.
    Pending {
        /// The settlement proof from the external backend.
        proof: GrothProof,
        /// The proof's public-input vector, opaque to this crate.
        public_inputs: PublicInputs,
        /// The slot after which the pending sale lapses.
        expiry: u64,
    },
}

impl Status {
    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        match self {
            Self::Open => Data::constr(0, Vec::new()),
            Self::Pending {
                proof,
                public_inputs,
                expiry,
            } => Data::constr(1, vec![
                proof.to_data(),
                public_inputs.to_data(),
                Data::Int((*expiry).into()),
            ]),
        }
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        if data.expect_constr(0, 0).is_ok() {
            return Ok(Self::Open);
        }

        let fields = data.expect_constr(1, 3)?;
        let proof = GrothProof::from_data(&fields[0])?;
        let public_inputs = PublicInputs::from_data(&fields[1])?;
        let expiry = match &fields[2] {
            Data::Int(number) => number.as_u64().ok_or(DatumError::UnexpectedShape {
                reason: "expiry must be an unsigned slot number",
            })?,
            _ => {
                return Err(DatumError::UnexpectedShape {
                    reason: "expected an int node",
                })
            },
        };

        Ok(Self::Pending {
            proof,
            public_inputs,
            expiry,
        })
    }
}

#[cfg(test)]
mod test {
    use bls12_381::G1Affine;
    use rand_chacha::ChaCha12Rng;
    use rand_core::SeedableRng;

    use super::*;
    use crate::{
        level::HopSecrets,
        params::PublicParams,
        register::Register,
    };

    fn fixture() -> (Register, HalfLevel, TokenId) {
        let mut rng = ChaCha12Rng::seed_from_u64(81);
        let params = PublicParams::load().unwrap();
        let owner = Register::random(&mut rng);
        let secrets = HopSecrets::random(&mut rng).unwrap();
        let token = TokenId::new([0x11; 32]);
        let level = HalfLevel::entry(&params, &secrets, &owner, &token).unwrap();
        (owner, level, token)
    }

    #[test]
    fn register_round_trips_without_its_secret() {
        let (owner, _, _) = fixture();

        let data = owner.to_data();
        let decoded = Register::from_data(&data).unwrap();

        assert_eq!(decoded.public_value(), owner.public_value());
        assert!(decoded.secret().is_err());

        // And through JSON text
        let reparsed = Data::from_json_str(&data.to_json_string()).unwrap();
        assert_eq!(reparsed, data);
    }

    #[test]
    fn levels_round_trip_and_preserve_the_rekey_slot() {
        let (_, level, _) = fixture();

        let decoded = HalfLevel::from_data(&level.to_data()).unwrap();
        assert_eq!(decoded, level);

        let full = level.into_full(bls12_381::G2Affine::generator());
        let decoded = FullLevel::from_data(&full.to_data()).unwrap();
        assert_eq!(decoded, full);

        // A half level does not parse as full, nor vice versa
        assert!(FullLevel::from_data(&decoded.to_data()).is_ok());
        assert!(HalfLevel::from_data(&full.to_data()).is_err());
    }

    #[test]
    fn proofs_round_trip() {
        let mut rng = ChaCha12Rng::seed_from_u64(82);
        let (owner, level, token) = fixture();

        let schnorr = SchnorrProof::prove(&owner, &mut rng).unwrap();
        assert_eq!(SchnorrProof::from_data(&schnorr.to_data()).unwrap(), schnorr);

        let secrets = HopSecrets::random(&mut rng).unwrap();
        let binding =
            BindingProof::prove(&secrets, &level, &owner, &token, &mut rng).unwrap();
        assert_eq!(BindingProof::from_data(&binding.to_data()).unwrap(), binding);
    }

    #[test]
    fn capsules_round_trip() {
        let mut rng = ChaCha12Rng::seed_from_u64(83);
        let capsule =
            Capsule::encrypt(&G1Affine::generator(), &[1u8; 32], b"wire", &mut rng).unwrap();
        assert_eq!(Capsule::from_data(&capsule.to_data()).unwrap(), capsule);
    }

    #[test]
    fn byte_widths_are_enforced() {
        // A truncated point is a length error, not a parse-and-hope
        let bad = Data::constr(0, vec![
            Data::bytes(vec![0u8; 47]),
            Data::bytes(vec![0u8; 48]),
        ]);
        assert!(matches!(
            Register::from_data(&bad),
            Err(DatumError::InvalidLength { expected: 48, actual: 47 }),
        ));

        // An all-zero token is fine; a short one is not
        assert!(TokenId::from_data(&Data::bytes(vec![0u8; 32])).is_ok());
        assert!(TokenId::from_data(&Data::bytes(vec![0u8; 31])).is_err());
    }

    #[test]
    fn non_subgroup_points_are_rejected() {
        // 48 bytes that are not a valid compressed point
        let bad = Data::constr(0, vec![
            Data::bytes(vec![0xffu8; 48]),
            Data::bytes(G1Affine::generator().to_compressed().to_vec()),
        ]);
        assert!(matches!(
            Register::from_data(&bad),
            Err(DatumError::InvalidPoint),
        ));
    }

    #[test]
    fn non_minimal_scalars_are_rejected() {
        let (owner, _, _) = fixture();
        let mut rng = ChaCha12Rng::seed_from_u64(84);
        let schnorr = SchnorrProof::prove(&owner, &mut rng).unwrap();

        let mut padded = hashing::scalar_to_bytes_min(schnorr.response());
        padded.insert(0, 0);
        let bad = Data::constr(0, vec![
            Data::bytes(padded),
            Data::bytes(schnorr.commitment().to_compressed().to_vec()),
        ]);
        assert!(matches!(
            SchnorrProof::from_data(&bad),
            Err(DatumError::InvalidScalar),
        ));
    }

    #[test]
    fn open_status_round_trips() {
        let status = Status::Open;
        assert_eq!(Status::from_data(&status.to_data()).unwrap(), status);
    }
}
