// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::hasher::Hasher;
use crate::jwt::Jwt;

/// A key binding JWT, confirming a holder's control of the key referenced by
/// an SD-JWT's `cnf` claim.
///
/// It is just a [`Jwt`] over [`KeyBindingJwtClaims`]: the compact
/// serialization, parsing and `typ: kb+jwt` header conventions are identical
/// to any other JWT, so there is nothing key-binding-specific to add beyond
/// the claim set itself.
pub type KeyBindingJwt = Jwt<KeyBindingJwtClaims>;

/// Claim set for a key binding JWT, as defined in
/// <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-key-binding-jwt>.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyBindingJwtClaims {
  pub iat: i64,
  pub aud: String,
  pub nonce: String,
  pub sd_hash: String,
  #[serde(flatten)]
  pub properties: BTreeMap<String, Value>,
}

impl KeyBindingJwtClaims {
  /// The `typ` header value a key binding JWT is required to carry.
  pub const KB_JWT_HEADER_TYP: &'static str = "kb+jwt";

  /// Creates a new [`KeyBindingJwtClaims`], computing `sd_hash` over the
  /// issuer-signed JWT and its disclosures per
  /// <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-key-binding-jwt-and-sd-jwt>.
  pub fn new(hasher: &dyn Hasher, jwt: &str, disclosures: &[String], nonce: String, aud: String, iat: i64) -> Self {
    let disclosures = disclosures.iter().join("~");
    let presentation = format!("{jwt}~{disclosures}~");
    let sd_hash = hasher.encoded_digest(&presentation);
    Self {
      iat,
      aud,
      nonce,
      sd_hash,
      properties: BTreeMap::new(),
    }
  }
}

/// The confirmation method conveyed by an SD-JWT's `cnf` claim, as defined
/// by <https://www.rfc-editor.org/rfc/rfc7800.html#section-3.2>.
///
/// Only the `jwk` confirmation method is modeled: it is the only one used by
/// the SD-JWT key binding flow. Other `cnf` members (`jwe`, `jku`, `kid`)
/// are out of scope.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequiredKeyBinding {
  /// The holder's public key, as a JSON Web Key.
  pub jwk: Value,
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::hasher::Sha256Hasher;

  #[test]
  fn sd_hash_is_deterministic() {
    let hasher = Sha256Hasher::new();
    let a = KeyBindingJwtClaims::new(&hasher, "header.payload.sig", &["disclosure".to_string()], "n".into(), "aud".into(), 1);
    let b = KeyBindingJwtClaims::new(&hasher, "header.payload.sig", &["disclosure".to_string()], "n".into(), "aud".into(), 1);
    assert_eq!(a.sd_hash, b.sd_hash);
  }

  #[test]
  fn header_typ_has_no_stray_whitespace() {
    assert_eq!(KeyBindingJwtClaims::KB_JWT_HEADER_TYP, "kb+jwt");
  }
}
