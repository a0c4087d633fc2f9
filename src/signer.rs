// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::error::Error as StdError;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

pub type JsonObject = Map<String, Value>;

/// Produces the signature over an issuer-signed JWT or a key binding JWT.
///
/// Implementations are expected to read the signing algorithm from
/// `header["alg"]`; this crate does not constrain which algorithms are
/// supported, leaving that choice (and key management) to the caller.
#[async_trait]
pub trait JwtSigner: Sync {
  type Error: StdError;

  /// Signs the compact-serialization-encoded `header.payload` and returns
  /// the raw signature bytes.
  async fn sign(&self, header: &JsonObject, payload: &JsonObject) -> Result<Vec<u8>, Self::Error>;
}

/// Verifies the signature produced by a [`JwtSigner`].
///
/// Used by holders and verifiers that need to check an issuer-signed JWT or
/// a key binding JWT before trusting its claims; this crate itself never
/// calls it, since disclosure and claim recreation do not depend on
/// signature validity.
#[async_trait]
pub trait JwtSignatureVerifier: Sync {
  type Error: StdError;

  /// Verifies `signature` over `header.payload`.
  async fn verify(&self, header: &JsonObject, payload: &JsonObject, signature: &[u8]) -> Result<(), Self::Error>;
}
