// This file is part of anchor-whitelist.
// Copyright (C) 2025 anchor-whitelist contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use derive_more::{Deref, From, Into};
use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};
use thiserror::Error;

/// A fixed-width byte array, displayed as `0x` prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, From, Into)]
pub struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> ByteArray<N> {
    pub const ZERO: Self = Self([0; N]);

    /// Reinterpret the given bytes as a fixed-width value: shorter input is left-padded with
    /// zeros, longer input is cropped from the left, i.e. only the last `N` bytes are kept.
    pub fn from_slice_padded(bytes: &[u8]) -> Self {
        let mut array = [0; N];

        let bytes = if bytes.len() > N {
            &bytes[bytes.len() - N..]
        } else {
            bytes
        };
        array[N - bytes.len()..].copy_from_slice(bytes);

        Self(array)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl<const N: usize> Default for ByteArray<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> AsRef<[u8]> for ByteArray<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> TryFrom<&[u8]> for ByteArray<N> {
    type Error = ByteArrayLenError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array = <[u8; N]>::try_from(bytes).map_err(|_| ByteArrayLenError {
            expected: N,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl<const N: usize> FromStr for ByteArray<N> {
    type Err = ParseByteArrayError;

    /// Parse hex, with or without `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = const_hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let array = Self::try_from(bytes.as_slice())?;
        Ok(array)
    }
}

impl<const N: usize> Display for ByteArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", const_hex::encode_prefixed(self.0))
    }
}

impl<const N: usize> Debug for ByteArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected} bytes, but was {actual}")]
pub struct ByteArrayLenError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Error)]
pub enum ParseByteArrayError {
    #[error("cannot hex-decode byte array")]
    Hex(#[from] const_hex::FromHexError),

    #[error(transparent)]
    Len(#[from] ByteArrayLenError),
}

#[cfg(test)]
mod tests {
    use crate::domain::{ByteArray, ByteArrayLenError, ParseByteArrayError};
    use assert_matches::assert_matches;

    #[test]
    fn test_display_from_str() {
        let array = ByteArray([0xab, 0x01, 0x00, 0xff]);
        assert_eq!(array.to_string(), "0xab0100ff");

        let parsed = "0xab0100ff".parse::<ByteArray<4>>();
        assert_matches!(parsed, Ok(a) if a == array);

        let parsed = "ab0100ff".parse::<ByteArray<4>>();
        assert_matches!(parsed, Ok(a) if a == array);

        let parsed = "0xab01".parse::<ByteArray<4>>();
        assert_matches!(
            parsed,
            Err(ParseByteArrayError::Len(ByteArrayLenError {
                expected: 4,
                actual: 2
            }))
        );

        let parsed = "0xzz0100ff".parse::<ByteArray<4>>();
        assert_matches!(parsed, Err(ParseByteArrayError::Hex(_)));
    }

    #[test]
    fn test_from_slice_padded() {
        assert_eq!(ByteArray::<4>::from_slice_padded(&[]), ByteArray::ZERO);
        assert_eq!(
            ByteArray::<4>::from_slice_padded(&[1, 2]),
            ByteArray([0, 0, 1, 2])
        );
        assert_eq!(
            ByteArray::<4>::from_slice_padded(&[1, 2, 3, 4]),
            ByteArray([1, 2, 3, 4])
        );
        assert_eq!(
            ByteArray::<4>::from_slice_padded(&[1, 2, 3, 4, 5, 6]),
            ByteArray([3, 4, 5, 6])
        );
    }
}
