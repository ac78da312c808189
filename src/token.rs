// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

use snafu::prelude::*;

/// A token identity.
///
/// Thirty-two bytes naming one listed asset for its whole lifetime. The identity is bound verbatim
/// into every binding-proof transcript and both level-commitment coefficients, which is what stops
/// proof and ciphertext material from being replayed across tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TokenId([u8; 32]);

/// Errors that can arise relating to [`TokenId`].
#[derive(Debug, Snafu)]
pub enum TokenError {
    /// A token identity had the wrong length.
    #[snafu(display("A token identity must be exactly 32 bytes"))]
    InvalidLength,
}

impl TokenId {
    /// Build a token identity from its raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a token identity from a byte slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TokenError> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| TokenError::InvalidLength)?;
        Ok(Self(bytes))
    }

    /// Get the identity bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for TokenId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slice_parsing_checks_length() {
        assert!(TokenId::from_slice(&[0u8; 32]).is_ok());
        assert!(TokenId::from_slice(&[0u8; 31]).is_err());
        assert!(TokenId::from_slice(&[0u8; 33]).is_err());
    }
}
