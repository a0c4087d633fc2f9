// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::claim_path::ClaimPath;
use crate::claim_path::ClaimPathElement;
use crate::decoder::recreate_claims;
use crate::decoder::RecreatedClaims;
use crate::decoder::UnusedDisclosurePolicy;
use crate::disclosure::Disclosure;
use crate::encoder::ARRAY_DIGEST_KEY;
use crate::encoder::DIGESTS_KEY;
use crate::hasher::Hasher;
use crate::hasher::HasherRegistry;
use crate::jwt::Jwt;
use crate::key_binding_jwt_claims::KeyBindingJwt;
use crate::key_binding_jwt_claims::RequiredKeyBinding;
use crate::Error;
use crate::JsonObject;
use crate::Result;

/// The `typ` header value of an SD-JWT issuer-signed JWT, per
/// <https://www.ietf.org/archive/id/draft-ietf-oauth-sd-jwt-vc-06.html#name-media-type>.
pub const SD_JWT_HEADER_TYP: &str = "dc+sd-jwt";

/// The hash algorithm assumed when `_sd_alg` is absent, per
/// <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-hash-function-claim>.
pub(crate) const DEFAULT_HASH_ALG: &str = "sha-256";

/// The claim set of an SD-JWT's issuer-signed JWT, exactly as it appears on
/// the wire: concealed claims are still digests under `_sd`, and well-known
/// claims such as `iss`, `vct` or `cnf` live alongside arbitrary issuer
/// claims in `properties`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SdJwtClaims {
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub _sd: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub _sd_alg: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cnf: Option<RequiredKeyBinding>,
  #[serde(flatten)]
  properties: JsonObject,
}

impl Deref for SdJwtClaims {
  type Target = JsonObject;
  fn deref(&self) -> &Self::Target {
    &self.properties
  }
}

/// An SD-JWT, in the combined format
/// `<Issuer-signed JWT>~<Disclosure 1>~<Disclosure 2>~...~<Disclosure N>~<optional Key Binding JWT>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SdJwt {
  /// The JWT part.
  jwt: Jwt<SdJwtClaims>,
  /// The disclosures part.
  disclosures: Vec<Disclosure>,
  /// The optional key binding JWT.
  key_binding_jwt: Option<KeyBindingJwt>,
}

impl SdJwt {
  /// Creates a new [`SdJwt`] from its components.
  pub(crate) fn new(jwt: Jwt<SdJwtClaims>, disclosures: Vec<Disclosure>, key_binding_jwt: Option<KeyBindingJwt>) -> Self {
    Self {
      jwt,
      disclosures,
      key_binding_jwt,
    }
  }

  pub fn header(&self) -> &JsonObject {
    &self.jwt.header
  }

  pub fn claims(&self) -> &SdJwtClaims {
    &self.jwt.claims
  }

  pub fn disclosures(&self) -> &[Disclosure] {
    &self.disclosures
  }

  pub fn required_key_bind(&self) -> Option<&RequiredKeyBinding> {
    self.claims().cnf.as_ref()
  }

  pub fn key_binding_jwt(&self) -> Option<&KeyBindingJwt> {
    self.key_binding_jwt.as_ref()
  }

  /// Removes the disclosure for the claim at `path`, concealing it again in
  /// a derived presentation.
  ///
  /// Returns the disclosures that are no longer needed: the one for `path`
  /// itself, plus any disclosure nested underneath it (concealing a claim
  /// necessarily conceals its descendants too).
  ///
  /// Returns an empty vector if the claim at `path` was already concealed.
  ///
  /// ## Error
  /// [`Error::UnsupportedAlgorithm`] if `hasher` does not match the
  /// algorithm this SD-JWT was issued with. [`Error::InvalidPath`] if `path`
  /// does not address a concealable claim. [`Error::MalformedClaimPath`] if
  /// `path` ends in a wildcard selector.
  pub fn conceal(&mut self, path: &ClaimPath, hasher: &dyn Hasher) -> Result<Vec<Disclosure>> {
    let required_alg = self.claims()._sd_alg.as_deref().unwrap_or(DEFAULT_HASH_ALG);
    let provided_alg = hasher.alg_name();
    if required_alg != provided_alg {
      return Err(Error::UnsupportedAlgorithm(format!(
        "the provided hasher uses algorithm \"{provided_alg}\", but algorithm \"{required_alg}\" is required"
      )));
    }

    let mut disclosures: HashMap<String, Disclosure> = self
      .disclosures
      .drain(..)
      .map(|disclosure| (hasher.encoded_digest(&disclosure.encode()), disclosure))
      .collect();

    let object = {
      let sd = std::mem::take(&mut self.jwt.claims._sd).into_iter().map(Value::String).collect();
      let mut object = Value::Object(std::mem::take(&mut self.jwt.claims.properties));
      object.as_object_mut().unwrap().insert(DIGESTS_KEY.to_string(), Value::Array(sd));
      object
    };

    let result = (|| {
      let digests_to_remove = conceal_path(&object, path.elements(), &disclosures)?
        .into_iter()
        .map(ToOwned::to_owned)
        .collect_vec();

      Ok(
        digests_to_remove
          .into_iter()
          .flat_map(|digest| disclosures.remove(&digest))
          .collect(),
      )
    })();

    self.disclosures = disclosures.into_values().collect();

    let Value::Object(mut object) = object else { unreachable!() };
    let Value::Array(sd) = object.remove(DIGESTS_KEY).unwrap() else {
      unreachable!()
    };
    self.jwt.claims._sd = sd
      .into_iter()
      .map(|value| match value {
        Value::String(s) => s,
        _ => unreachable!(),
      })
      .collect();
    self.jwt.claims.properties = object;

    result
  }

  pub fn attach_key_binding_jwt(&mut self, kb_jwt: KeyBindingJwt) {
    self.key_binding_jwt = Some(kb_jwt);
  }

  /// Serializes the components into the final SD-JWT combined format.
  pub fn presentation(&self) -> String {
    let disclosures = self.disclosures.iter().map(Disclosure::encode).join("~");
    let key_binding_jwt = self.key_binding_jwt.as_ref().map(ToString::to_string).unwrap_or_default();
    format!("{}~{}~{}", self.jwt, disclosures, key_binding_jwt)
  }

  /// Parses an SD-JWT combined-format string into its components.
  pub fn parse(sd_jwt: &str) -> Result<Self> {
    tracing::debug!("parse");

    let sd_segments: Vec<&str> = sd_jwt.split('~').collect();
    let num_of_segments = sd_segments.len();
    if num_of_segments < 2 {
      tracing::warn!("parse: less than 2 segments");
      return Err(Error::MalformedSdJwt("less than 2 segments".to_string()));
    }

    let includes_key_binding = sd_jwt.chars().next_back().is_some_and(|c| c != '~');
    if includes_key_binding && num_of_segments < 3 {
      tracing::warn!("parse: less than 3 segments with a key binding JWT present");
      return Err(Error::MalformedSdJwt(
        "less than 3 segments with a key binding JWT present".to_string(),
      ));
    }

    let jwt = sd_segments[0].parse()?;
    let disclosures = sd_segments[1..num_of_segments - 1]
      .iter()
      .map(|s| Disclosure::parse(s))
      .try_collect()?;
    let key_binding_jwt = includes_key_binding.then(|| sd_segments[num_of_segments - 1].parse()).transpose()?;

    Ok(Self {
      jwt,
      disclosures,
      key_binding_jwt,
    })
  }

  /// Recreates the claim set by substituting every digest with the
  /// plaintext value carried by its matching disclosure.
  ///
  /// ## Error
  /// See [`recreate_claims`].
  pub fn into_disclosed_claims(self, hashers: &HasherRegistry, policy: UnusedDisclosurePolicy) -> Result<RecreatedClaims> {
    let SdJwt { jwt, disclosures, .. } = self;
    let object = serde_json::to_value(&jwt.claims)
      .ok()
      .and_then(|v| v.as_object().cloned())
      .expect("SdJwtClaims always serializes to a JSON object");
    recreate_claims(&object, &disclosures, hashers, policy)
  }
}

impl Display for SdJwt {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.presentation())
  }
}

impl FromStr for SdJwt {
  type Err = Error;
  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

/// Finds the digests of the claim addressed by `path` -- and every
/// descendant digest nested beneath it -- so that [`SdJwt::conceal`] can
/// drop exactly those disclosures.
fn conceal_path<'o>(object: &'o Value, path: &[ClaimPathElement], disclosures: &HashMap<String, Disclosure>) -> Result<Vec<&'o str>> {
  let (head, tail) = path
    .split_first()
    .ok_or_else(|| Error::InvalidPath("claim path must not be empty".to_string()))?;
  let has_next = !tail.is_empty();

  match head {
    ClaimPathElement::AllArrayElements => Err(Error::MalformedClaimPath(
      "cannot conceal a claim through a wildcard selector".to_string(),
    )),
    ClaimPathElement::Claim(name) => {
      let Value::Object(object) = object else {
        return Err(Error::PathTypeMismatch(format!("expected an object to select claim {name:?}")));
      };
      if has_next {
        let next = object
          .get(name)
          .or_else(|| find_disclosure(object, name, disclosures).and_then(|digest| disclosures.get(digest)).map(|d| &d.claim_value))
          .ok_or_else(|| Error::InvalidPath(format!("{name} does not exist or is not concealable")))?;
        conceal_path(next, tail, disclosures)
      } else {
        let digest = find_disclosure(object, name, disclosures)
          .ok_or_else(|| Error::InvalidPath(format!("{name} does not exist or is not concealable")))?;
        let disclosure = disclosures.get(digest).expect("digest came from this map");
        let mut nested: Vec<&str> = descendant_digests(&disclosure.claim_value, disclosures).collect();
        nested.push(digest);
        Ok(nested)
      }
    }
    ClaimPathElement::ArrayElement(index) => {
      let Value::Array(array) = object else {
        return Err(Error::PathTypeMismatch(format!("expected an array to select index {index}")));
      };
      let index = *index as usize;
      if has_next {
        let next = array
          .get(index)
          .ok_or_else(|| Error::InvalidPath(format!("index {index} does not exist")))?;
        conceal_path(next, tail, disclosures)
      } else {
        let digest = array
          .get(index)
          .and_then(Value::as_object)
          .and_then(|entry| find_disclosure(entry, "", disclosures))
          .ok_or_else(|| Error::InvalidPath(format!("index {index} does not exist or is not concealable")))?;
        let disclosure = disclosures.get(digest).expect("digest came from this map");
        let mut nested: Vec<&str> = descendant_digests(&disclosure.claim_value, disclosures).collect();
        nested.push(digest);
        Ok(nested)
      }
    }
  }
}

/// Looks up the digest disclosing attribute `key` of `object`, or (if `key`
/// is empty) the digest disclosing `object` itself as a `{"...": digest}`
/// array entry.
fn find_disclosure<'o>(object: &'o JsonObject, key: &str, disclosures: &HashMap<String, Disclosure>) -> Option<&'o str> {
  let as_array_entry = || {
    object
      .get(ARRAY_DIGEST_KEY)
      .and_then(Value::as_str)
      .filter(|_| object.len() == 1)
  };

  object
    .get(DIGESTS_KEY)
    .and_then(Value::as_array)
    .into_iter()
    .flatten()
    .flat_map(Value::as_str)
    .find(|digest| {
      disclosures
        .get(*digest)
        .and_then(|disclosure| disclosure.claim_name.as_deref())
        .is_some_and(|name| name == key)
    })
    .or_else(as_array_entry)
}

/// Collects every digest reachable from `start` that has a matching
/// disclosure, used to cascade a conceal operation onto descendants.
fn descendant_digests<'v>(start: &'v Value, disclosures: &HashMap<String, Disclosure>) -> Box<dyn Iterator<Item = &'v str> + 'v> {
  match start {
    Value::Object(object) => {
      let direct = object
        .get(DIGESTS_KEY)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(Value::as_str)
        .filter(|digest| disclosures.contains_key(*digest));
      let nested = object.values().flat_map(|v| descendant_digests(v, disclosures));
      Box::new(direct.chain(nested))
    }
    Value::Array(array) => {
      let mut digests = Vec::new();
      for value in array {
        match value.get(ARRAY_DIGEST_KEY).and_then(Value::as_str) {
          Some(digest) if disclosures.contains_key(digest) => digests.push(digest),
          _ => digests.extend(descendant_digests(value, disclosures)),
        }
      }
      Box::new(digests.into_iter())
    }
    _ => Box::new(std::iter::empty()),
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const SD_JWT: &str = "eyJhbGciOiAiRVMyNTYiLCAidHlwIjogImV4YW1wbGUrc2Qtand0In0.eyJfc2QiOiBbIkM5aW5wNllvUmFFWFI0Mjd6WUpQN1FyazFXSF84YmR3T0FfWVVyVW5HUVUiLCAiS3VldDF5QWEwSElRdlluT1ZkNTloY1ZpTzlVZzZKMmtTZnFZUkJlb3d2RSIsICJNTWxkT0ZGekIyZDB1bWxtcFRJYUdlcmhXZFVfUHBZZkx2S2hoX2ZfOWFZIiwgIlg2WkFZT0lJMnZQTjQwVjd4RXhad1Z3ejd5Um1MTmNWd3Q1REw4Ukx2NGciLCAiWTM0em1JbzBRTExPdGRNcFhHd2pCZ0x2cjE3eUVoaFlUMEZHb2ZSLWFJRSIsICJmeUdwMFdUd3dQdjJKRFFsbjFsU2lhZW9iWnNNV0ExMGJRNTk4OS05RFRzIiwgIm9tbUZBaWNWVDhMR0hDQjB1eXd4N2ZZdW8zTUhZS08xNWN6LVJaRVlNNVEiLCAiczBCS1lzTFd4UVFlVTh0VmxsdE03TUtzSVJUckVJYTFQa0ptcXhCQmY1VSJdLCAiaXNzIjogImh0dHBzOi8vaXNzdWVyLmV4YW1wbGUuY29tIiwgImlhdCI6IDE2ODMwMDAwMDAsICJleHAiOiAxODgzMDAwMDAwLCAiYWRkcmVzcyI6IHsiX3NkIjogWyI2YVVoelloWjdTSjFrVm1hZ1FBTzN1MkVUTjJDQzFhSGhlWnBLbmFGMF9FIiwgIkF6TGxGb2JrSjJ4aWF1cFJFUHlvSnotOS1OU2xkQjZDZ2pyN2ZVeW9IemciLCAiUHp6Y1Z1MHFiTXVCR1NqdWxmZXd6a2VzRDl6dXRPRXhuNUVXTndrclEtayIsICJiMkRrdzBqY0lGOXJHZzhfUEY4WmN2bmNXN3p3Wmo1cnlCV3ZYZnJwemVrIiwgImNQWUpISVo4VnUtZjlDQ3lWdWIyVWZnRWs4anZ2WGV6d0sxcF9KbmVlWFEiLCAiZ2xUM2hyU1U3ZlNXZ3dGNVVEWm1Xd0JUdzMyZ25VbGRJaGk4aEdWQ2FWNCIsICJydkpkNmlxNlQ1ZWptc0JNb0d3dU5YaDlxQUFGQVRBY2k0MG9pZEVlVnNBIiwgInVOSG9XWWhYc1poVkpDTkUyRHF5LXpxdDd0NjlnSkt5NVFhRnY3R3JNWDQiXX0sICJfc2RfYWxnIjogInNoYS0yNTYifQ.gR6rSL7urX79CNEvTQnP1MH5xthG11ucIV44SqKFZ4Pvlu_u16RfvXQd4k4CAIBZNKn2aTI18TfvFwV97gJFoA~WyJHMDJOU3JRZmpGWFE3SW8wOXN5YWpBIiwgInJlZ2lvbiIsICJcdTZlMmZcdTUzM2EiXQ~WyJsa2x4RjVqTVlsR1RQVW92TU5JdkNBIiwgImNvdW50cnkiLCAiSlAiXQ~";

  #[test]
  fn parse() {
    let sd_jwt = SdJwt::parse(SD_JWT).unwrap();
    assert_eq!(sd_jwt.disclosures.len(), 2);
    assert!(sd_jwt.key_binding_jwt.is_none());
  }

  #[test]
  fn round_trip_ser_des() {
    let sd_jwt = SdJwt::parse(SD_JWT).unwrap();
    assert_eq!(&sd_jwt.to_string(), SD_JWT);
  }

  #[test]
  fn rejects_too_few_segments() {
    assert!(matches!(SdJwt::parse("only-one-segment"), Err(Error::MalformedSdJwt(_))));
  }

  #[test]
  fn conceal_nested_claim_drops_its_disclosure() {
    let mut sd_jwt = SdJwt::parse(SD_JWT).unwrap();
    let hasher = crate::hasher::Sha256Hasher::new();
    let removed = sd_jwt.conceal(&ClaimPath::root("address").claim("country"), &hasher).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(sd_jwt.disclosures().len(), 1);
  }
}
