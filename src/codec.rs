// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Base64url-nopad codec used by disclosures, digests and the JWT envelope.
//!
//! This is a thin, deliberately narrow wrapper around [`multibase`]'s
//! `Base64Url` base, so that the rest of the crate depends on a single
//! contract (bijective modulo padding, [`Error::MalformedEncoding`] on
//! anything else) rather than on `multibase` directly.

use crate::Error;

/// Encodes `bytes` as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
  multibase::Base::Base64Url.encode(bytes)
}

/// Decodes unpadded base64url `input` back into bytes.
///
/// ## Error
/// Returns [`Error::MalformedEncoding`] if `input` contains characters
/// outside the base64url alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, Error> {
  multibase::Base::Base64Url
    .decode(input)
    .map_err(|e| Error::MalformedEncoding(e.to_string()))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn round_trip() {
    let bytes = b"hello sd-jwt";
    let encoded = encode(bytes);
    assert_eq!(decode(&encoded).unwrap(), bytes);
  }

  #[test]
  fn rejects_garbage() {
    assert!(decode("not!valid!base64!").is_err());
  }
}
