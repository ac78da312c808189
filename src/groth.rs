// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

//! Packaging for the external proving backend's artifacts.
//!
//! The settlement proof for an ownership transfer is produced by an external Groth16-style
//! backend. This crate neither constructs nor verifies it; it only carries the proof object, its
//! public-input vector and the verification key between the backend's JSON output and the
//! ledger's tagged records, byte for byte. The public-input layout is a contract owned by the
//! circuit definition and is deliberately not interpreted here.

use serde::Deserialize;
use serde_json::Number;
use snafu::prelude::*;

use crate::datum::{Data, DatumError};

/// A settlement proof, opaque beyond its byte layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrothProof {
    /// The `piA` proof element.
    pub pi_a: Vec<u8>,
    /// The `piB` proof element.
    pub pi_b: Vec<u8>,
    /// The `piC` proof element.
    pub pi_c: Vec<u8>,
    /// Commitment points, when the circuit uses committed witnesses.
    pub commitments: Vec<Vec<u8>>,
    /// The proof of knowledge for the commitments, when present.
    pub commitment_pok: Vec<u8>,
}

/// A proof's public-input vector and commitment wires, opaque ordered integers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicInputs {
    /// The public inputs, with the backend's leading constant-one input stripped.
    pub inputs: Vec<Number>,
    /// The commitment wire values, when present.
    pub commitment_wires: Vec<Number>,
}

/// A verification key for the settlement circuit, opaque beyond its byte layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationKey {
    /// The number of public inputs the circuit exposes.
    pub n_public: u64,
    /// The `alpha` element.
    pub alpha: Vec<u8>,
    /// The `beta` element.
    pub beta: Vec<u8>,
    /// The `gamma` element.
    pub gamma: Vec<u8>,
    /// The `delta` element.
    pub delta: Vec<u8>,
    /// The input-commitment bases, one per public input plus the constant.
    pub ic: Vec<Vec<u8>>,
    /// Pedersen keys for committed witnesses, when present.
    pub commitment_keys: Vec<CommitmentKey>,
}

/// One Pedersen commitment key from the verification key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentKey {
    /// The `g` element.
    pub g: Vec<u8>,
    /// The `gSigmaNeg` element.
    pub g_sigma_neg: Vec<u8>,
}

/// Errors that can arise while repackaging backend artifacts.
#[derive(Debug, Snafu)]
pub enum GrothError {
    /// The backend JSON did not parse.
    #[snafu(display("The backend JSON did not parse"))]
    BackendJson,
    /// A backend field held something other than hex bytes.
    #[snafu(display("A backend field held something other than hex bytes"))]
    BackendHex,
    /// A backend integer did not parse.
    #[snafu(display("A backend integer did not parse"))]
    BackendInteger,
}

#[derive(Deserialize)]
struct BackendProof {
    #[serde(rename = "piA")]
    pi_a: String,
    #[serde(rename = "piB")]
    pi_b: String,
    #[serde(rename = "piC")]
    pi_c: String,
    #[serde(default)]
    commitments: Vec<String>,
    #[serde(rename = "commitmentPok", default)]
    commitment_pok: String,
}

#[derive(Deserialize)]
struct BackendPublic {
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(rename = "commitmentWire", default)]
    commitment_wire: Option<String>,
}

#[derive(Deserialize)]
struct BackendVk {
    #[serde(rename = "nPublic")]
    n_public: u64,
    #[serde(rename = "vkAlpha")]
    alpha: String,
    #[serde(rename = "vkBeta")]
    beta: String,
    #[serde(rename = "vkGamma")]
    gamma: String,
    #[serde(rename = "vkDelta")]
    delta: String,
    #[serde(rename = "vkIC")]
    ic: Vec<String>,
    #[serde(rename = "commitmentKeys", default)]
    commitment_keys: Vec<BackendCommitmentKey>,
}

#[derive(Deserialize)]
struct BackendCommitmentKey {
    g: String,
    #[serde(rename = "gSigmaNeg")]
    g_sigma_neg: String,
}

fn unhex(field: &str) -> Result<Vec<u8>, GrothError> {
    hex::decode(field).map_err(|_| GrothError::BackendHex)
}

fn integer(field: &str) -> Result<Number, GrothError> {
    field.parse().map_err(|_| GrothError::BackendInteger)
}

impl GrothProof {
    /// Parse the backend's `proof.json`.
    pub fn from_backend_json(text: &str) -> Result<Self, GrothError> {
        let raw: BackendProof =
            serde_json::from_str(text).map_err(|_| GrothError::BackendJson)?;

        Ok(Self {
            pi_a: unhex(&raw.pi_a)?,
            pi_b: unhex(&raw.pi_b)?,
            pi_c: unhex(&raw.pi_c)?,
            commitments: raw
                .commitments
                .iter()
                .map(|c| unhex(c))
                .collect::<Result<Vec<Vec<u8>>, GrothError>>()?,
            commitment_pok: unhex(&raw.commitment_pok)?,
        })
    }

    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::bytes(self.pi_a.clone()),
            Data::bytes(self.pi_b.clone()),
            Data::bytes(self.pi_c.clone()),
            Data::List(self.commitments.iter().cloned().map(Data::Bytes).collect()),
            Data::bytes(self.commitment_pok.clone()),
        ])
    }

    /// Decode from ledger data.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let fields = data.expect_constr(0, 5)?;
        let commitments = match &fields[3] {
            Data::List(items) => items
                .iter()
                .map(|item| item.expect_any_bytes().map(<[u8]>::to_vec))
                .collect::<Result<Vec<Vec<u8>>, DatumError>>()?,
            _ => {
                return Err(DatumError::UnexpectedShape {
                    reason: "expected a list of commitment points",
                })
            },
        };

        Ok(Self {
            pi_a: fields[0].expect_any_bytes()?.to_vec(),
            pi_b: fields[1].expect_any_bytes()?.to_vec(),
            pi_c: fields[2].expect_any_bytes()?.to_vec(),
            commitments,
            commitment_pok: fields[4].expect_any_bytes()?.to_vec(),
        })
    }
}

impl PublicInputs {
    /// Parse the backend's `public.json`.
    ///
    /// The backend emits the constant `1` as its first input; the on-chain verifier handles that
    /// term through the verification key instead, so it is stripped here.
    pub fn from_backend_json(text: &str) -> Result<Self, GrothError> {
        let raw: BackendPublic =
            serde_json::from_str(text).map_err(|_| GrothError::BackendJson)?;

        let inputs = raw
            .inputs
            .get(1..)
            .unwrap_or_default()
            .iter()
            .map(|v| integer(v))
            .collect::<Result<Vec<Number>, GrothError>>()?;
        let commitment_wires = match &raw.commitment_wire {
            Some(wire) => vec![integer(wire)?],
            None => Vec::new(),
        };

        Ok(Self {
            inputs,
            commitment_wires,
        })
    }

    /// Encode the input vector as ledger data.
    pub fn to_data(&self) -> Data {
        Data::List(self.inputs.iter().cloned().map(Data::Int).collect())
    }

    /// Encode the commitment wires as ledger data.
    pub fn wires_to_data(&self) -> Data {
        Data::List(self.commitment_wires.iter().cloned().map(Data::Int).collect())
    }

    /// Decode an input vector from ledger data; wires travel separately.
    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let items = match data {
            Data::List(items) => items,
            _ => {
                return Err(DatumError::UnexpectedShape {
                    reason: "expected a list of public inputs",
                })
            },
        };

        let inputs = items
            .iter()
            .map(|item| match item {
                Data::Int(number) => Ok(number.clone()),
                _ => Err(DatumError::UnexpectedShape {
                    reason: "public inputs are integers",
                }),
            })
            .collect::<Result<Vec<Number>, DatumError>>()?;

        Ok(Self {
            inputs,
            commitment_wires: Vec::new(),
        })
    }
}

impl VerificationKey {
    /// Parse the backend's `vk.json`.
    pub fn from_backend_json(text: &str) -> Result<Self, GrothError> {
        let raw: BackendVk = serde_json::from_str(text).map_err(|_| GrothError::BackendJson)?;

        Ok(Self {
            n_public: raw.n_public,
            alpha: unhex(&raw.alpha)?,
            beta: unhex(&raw.beta)?,
            gamma: unhex(&raw.gamma)?,
            delta: unhex(&raw.delta)?,
            ic: raw
                .ic
                .iter()
                .map(|ic| unhex(ic))
                .collect::<Result<Vec<Vec<u8>>, GrothError>>()?,
            commitment_keys: raw
                .commitment_keys
                .iter()
                .map(|key| {
                    Ok(CommitmentKey {
                        g: unhex(&key.g)?,
                        g_sigma_neg: unhex(&key.g_sigma_neg)?,
                    })
                })
                .collect::<Result<Vec<CommitmentKey>, GrothError>>()?,
        })
    }

    /// Encode as ledger data.
    pub fn to_data(&self) -> Data {
        Data::constr(0, vec![
            Data::Int(self.n_public.into()),
            Data::bytes(self.alpha.clone()),
            Data::bytes(self.beta.clone()),
            Data::bytes(self.gamma.clone()),
            Data::bytes(self.delta.clone()),
            Data::List(self.ic.iter().cloned().map(Data::Bytes).collect()),
            Data::List(
                self.commitment_keys
                    .iter()
                    .map(|key| {
                        Data::constr(0, vec![
                            Data::bytes(key.g.clone()),
                            Data::bytes(key.g_sigma_neg.clone()),
                        ])
                    })
                    .collect(),
            ),
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PROOF_JSON: &str = r#"{
        "piA": "aabb",
        "piB": "ccdd",
        "piC": "eeff",
        "commitments": ["0102", "0304"],
        "commitmentPok": "0506"
    }"#;

    #[test]
    fn proof_repackages_faithfully() {
        let proof = GrothProof::from_backend_json(PROOF_JSON).unwrap();
        assert_eq!(proof.pi_a, vec![0xaa, 0xbb]);
        assert_eq!(proof.commitments.len(), 2);

        let decoded = GrothProof::from_data(&proof.to_data()).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn proof_without_commitments_defaults_cleanly() {
        let proof =
            GrothProof::from_backend_json(r#"{"piA": "aa", "piB": "bb", "piC": "cc"}"#).unwrap();
        assert!(proof.commitments.is_empty());
        assert!(proof.commitment_pok.is_empty());
    }

    #[test]
    fn the_constant_one_input_is_stripped() {
        let public = PublicInputs::from_backend_json(
            r#"{"inputs": ["1", "42", "98765432109876543210987654321098765432109876543210"],
                "commitmentWire": "7"}"#,
        )
        .unwrap();

        assert_eq!(public.inputs.len(), 2);
        assert_eq!(public.inputs[0].to_string(), "42");
        // Full precision survives the trip
        assert_eq!(
            public.inputs[1].to_string(),
            "98765432109876543210987654321098765432109876543210"
        );
        assert_eq!(public.commitment_wires.len(), 1);

        let decoded = PublicInputs::from_data(&public.to_data()).unwrap();
        assert_eq!(decoded.inputs, public.inputs);
    }

    #[test]
    fn verification_key_repackages() {
        let vk = VerificationKey::from_backend_json(
            r#"{
                "nPublic": 36,
                "vkAlpha": "01",
                "vkBeta": "02",
                "vkGamma": "03",
                "vkDelta": "04",
                "vkIC": ["05", "06"],
                "commitmentKeys": [{"g": "07", "gSigmaNeg": "08"}]
            }"#,
        )
        .unwrap();

        assert_eq!(vk.n_public, 36);
        assert_eq!(vk.ic.len(), 2);

        let data = vk.to_data();
        let json = data.to_json_string();
        assert!(json.contains("\"constructor\":0"));
    }

    #[test]
    fn malformed_backend_output_is_rejected() {
        assert!(GrothProof::from_backend_json("not json").is_err());
        assert!(GrothProof::from_backend_json(r#"{"piA": "zz", "piB": "", "piC": ""}"#).is_err());
        assert!(PublicInputs::from_backend_json(r#"{"inputs": ["1", "forty-two"]}"#).is_err());
    }
}
