// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeMap;

use ciborium::value::{Integer, Value};
use snafu::prelude::*;

/// Reserved payload map keys.
const KEY_LOCATOR: u64 = 0;
const KEY_SECRET: u64 = 1;
const KEY_DIGEST: u64 = 2;

/// The structured plaintext sealed inside a capsule.
///
/// A canonical-CBOR map from small integer keys to byte strings:
/// `{0 => locator, ?1 => secret, ?2 => digest, *int => bstr}`. The locator addresses the actual
/// content (an IPFS CID, a URL, or the data inline); the optional secret and digest carry an
/// off-chain access key and an integrity hash. Extension keys start at 3. Canonical encoding (RFC
/// 8949 §4.2) keeps the bytes identical across every producer, which matters because the AEAD tag
/// is computed over them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Payload {
    locator: Vec<u8>,
    secret: Option<Vec<u8>>,
    digest: Option<Vec<u8>>,
    extensions: BTreeMap<u64, Vec<u8>>,
}

/// Errors that can arise relating to [`Payload`].
#[derive(Debug, Snafu)]
pub enum PayloadError {
    /// An extension key collided with a reserved key.
    #[snafu(display("Extension key {key} collides with a reserved key"))]
    ReservedKey {
        /// The offending key.
        key: u64,
    },
    /// The bytes were not a payload-shaped CBOR map.
    #[snafu(display("The bytes were not a payload-shaped CBOR map: {reason}"))]
    Malformed {
        /// What was wrong.
        reason: &'static str,
    },
}

impl Payload {
    /// Build a payload from its content locator.
    pub fn new(locator: impl Into<Vec<u8>>) -> Self {
        Self {
            locator: locator.into(),
            ..Self::default()
        }
    }

    /// Attach an off-chain access secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Attach a content integrity digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<Vec<u8>>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Attach an extension field; keys below 3 are reserved.
    pub fn with_extension(
        mut self,
        key: u64,
        value: impl Into<Vec<u8>>,
    ) -> Result<Self, PayloadError> {
        if key <= KEY_DIGEST {
            return Err(PayloadError::ReservedKey { key });
        }
        self.extensions.insert(key, value.into());
        Ok(self)
    }

    /// Get the content locator.
    pub fn locator(&self) -> &[u8] {
        &self.locator
    }

    /// Get the off-chain access secret, if present.
    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }

    /// Get the content integrity digest, if present.
    pub fn digest(&self) -> Option<&[u8]> {
        self.digest.as_deref()
    }

    /// Get the extension fields.
    pub fn extensions(&self) -> &BTreeMap<u64, Vec<u8>> {
        &self.extensions
    }

    /// Encode as canonical CBOR.
    ///
    /// Keys are written in ascending numeric order, which for small non-negative integers is the
    /// canonical byte order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        entries.push((
            Value::Integer(Integer::from(KEY_LOCATOR)),
            Value::Bytes(self.locator.clone()),
        ));
        if let Some(secret) = &self.secret {
            entries.push((
                Value::Integer(Integer::from(KEY_SECRET)),
                Value::Bytes(secret.clone()),
            ));
        }
        if let Some(digest) = &self.digest {
            entries.push((
                Value::Integer(Integer::from(KEY_DIGEST)),
                Value::Bytes(digest.clone()),
            ));
        }
        for (key, value) in &self.extensions {
            entries.push((
                Value::Integer(Integer::from(*key)),
                Value::Bytes(value.clone()),
            ));
        }

        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut bytes).map_err(|_| {
            PayloadError::Malformed {
                reason: "encoding failed",
            }
        })?;
        Ok(bytes)
    }

    /// Decode and validate a payload map.
    ///
    /// Requires a CBOR map with integer keys and byte-string values and a present locator;
    /// anything else is rejected outright.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            ciborium::de::from_reader(bytes).map_err(|_| PayloadError::Malformed {
                reason: "not CBOR",
            })?;
        let entries = match value {
            Value::Map(entries) => entries,
            _ => {
                return Err(PayloadError::Malformed {
                    reason: "expected a map",
                })
            },
        };

        let mut payload = Self::default();
        let mut saw_locator = false;
        for (key, value) in entries {
            let key = match key {
                Value::Integer(key) => {
                    u64::try_from(i128::from(key)).map_err(|_| PayloadError::Malformed {
                        reason: "keys must be non-negative integers",
                    })?
                },
                _ => {
                    return Err(PayloadError::Malformed {
                        reason: "keys must be integers",
                    })
                },
            };
            let value = match value {
                Value::Bytes(value) => value,
                _ => {
                    return Err(PayloadError::Malformed {
                        reason: "values must be byte strings",
                    })
                },
            };

            match key {
                KEY_LOCATOR => {
                    payload.locator = value;
                    saw_locator = true;
                },
                KEY_SECRET => payload.secret = Some(value),
                KEY_DIGEST => payload.digest = Some(value),
                _ => {
                    payload.extensions.insert(key, value);
                },
            }
        }

        if !saw_locator {
            return Err(PayloadError::Malformed {
                reason: "missing locator",
            });
        }
        Ok(payload)
    }
}
