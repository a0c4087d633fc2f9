// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Map as JsonObject;
use serde_json::Value;

use crate::claim_path::ClaimPath;
use crate::disclosure::Disclosure;
use crate::encoder::ARRAY_DIGEST_KEY;
use crate::encoder::DIGESTS_KEY;
use crate::encoder::SD_ALG;
use crate::hasher::Hasher;
use crate::hasher::HasherRegistry;
use crate::Error;
use crate::Result;

/// What to do when the disclosures supplied alongside an SD-JWT outnumber
/// the digests actually referenced by the claim set.
///
/// The specification recommends rejecting such SD-JWTs outright, since an
/// unused disclosure usually indicates the presenter stripped a disclosure
/// from a related digest without removing it from the disclosure list, or
/// is attempting to smuggle claims the verifier never asked to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnusedDisclosurePolicy {
  /// Reject the SD-JWT if any disclosure was not consumed while
  /// recreating the claim set.
  #[default]
  Strict,
  /// Silently ignore unused disclosures.
  Lenient,
}

/// The result of substituting every digest an issuer concealed with the
/// plaintext claim supplied by a matching [`Disclosure`].
#[derive(Debug, Clone)]
pub struct RecreatedClaims {
  /// The claim set with every resolvable digest replaced by its disclosed
  /// value. `_sd` and `_sd_alg` no longer appear.
  pub claims: JsonObject,
  /// For every claim recreated from a disclosure, the disclosure itself
  /// together with every disclosure consumed while recreating its
  /// descendants, in the order they were encountered.
  pub disclosures_per_claim: IndexMap<ClaimPath, Vec<Disclosure>>,
}

/// Recreates the claims of an SD-JWT by substituting `_sd` digests and
/// `{"...": digest}` array placeholders with the values carried by
/// `disclosures`.
///
/// The hash function is determined by the top-level `_sd_alg` claim,
/// defaulting to `sha-256` if absent, per
/// <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-hash-function-claim>.
///
/// ## Error
/// Returns [`Error::UnsupportedAlgorithm`] if the hasher named by `_sd_alg`
/// is not in `hashers`, [`Error::DuplicateDisclosures`] if `disclosures`
/// contains the same encoded disclosure twice, [`Error::NonUniqueDigests`]
/// if a digest is referenced more than once while recreating the claim
/// tree, [`Error::DuplicateClaim`] if a disclosed claim name collides with
/// a claim already present in the object, and [`Error::UnusedDisclosure`]
/// (under [`UnusedDisclosurePolicy::Strict`]) if any disclosure is never
/// consumed.
pub fn recreate_claims(
  object: &JsonObject,
  disclosures: &[Disclosure],
  hashers: &HasherRegistry,
  policy: UnusedDisclosurePolicy,
) -> Result<RecreatedClaims> {
  tracing::debug!("recreate_claims");

  let hasher = determine_hasher(object, hashers)?;

  let mut seen_encodings: HashSet<String> = HashSet::new();
  let mut digest_map: HashMap<String, Disclosure> = HashMap::new();
  for disclosure in disclosures {
    let encoded = disclosure.encode();
    if !seen_encodings.insert(encoded.clone()) {
      return Err(Error::DuplicateDisclosures(encoded));
    }
    let digest = hasher.encoded_digest(&encoded);
    if digest_map.insert(digest.clone(), disclosure.clone()).is_some() {
      return Err(Error::NonUniqueDigests(digest));
    }
  }

  let mut processed: HashSet<String> = HashSet::new();
  let mut per_claim: IndexMap<ClaimPath, Vec<Disclosure>> = IndexMap::new();
  let (mut claims, _) = decode_object(None, object, &digest_map, hasher, &mut processed, &mut per_claim)?;
  claims.remove(SD_ALG);

  if policy == UnusedDisclosurePolicy::Strict && processed.len() != disclosures.len() {
    let unused = disclosures.len() - processed.len();
    tracing::warn!("recreate_claims: {unused} unused disclosure(s)");
    return Err(Error::UnusedDisclosure(unused));
  }

  Ok(RecreatedClaims {
    claims,
    disclosures_per_claim: per_claim,
  })
}

/// Like [`recreate_claims`], but additionally invokes `visitor` once per
/// recreated claim with its path and the disclosures that produced it, for
/// callers that want streaming notification rather than the final
/// [`RecreatedClaims::disclosures_per_claim`] map.
pub fn recreate_claims_with_visitor<F>(
  object: &JsonObject,
  disclosures: &[Disclosure],
  hashers: &HasherRegistry,
  policy: UnusedDisclosurePolicy,
  mut visitor: F,
) -> Result<RecreatedClaims>
where
  F: FnMut(&ClaimPath, &[Disclosure]),
{
  let recreated = recreate_claims(object, disclosures, hashers, policy)?;
  for (path, claim_disclosures) in &recreated.disclosures_per_claim {
    visitor(path, claim_disclosures);
  }
  Ok(recreated)
}

fn determine_hasher<'h>(object: &JsonObject, hashers: &'h HasherRegistry) -> Result<&'h dyn Hasher> {
  let alg = match object.get(SD_ALG) {
    Some(value) => value
      .as_str()
      .ok_or_else(|| Error::DataTypeMismatch(format!("{SD_ALG} is not a string")))?,
    None => "sha-256",
  };
  hashers.get(alg)
}

fn child_path(current: Option<&ClaimPath>, name: &str) -> ClaimPath {
  match current {
    Some(path) => path.claim(name),
    None => ClaimPath::root(name),
  }
}

/// Builds the path to array element `index`. Arrays are never the root of
/// an SD-JWT claim set, so `current` is always `Some` in practice; falling
/// back to a synthetic root keeps this total rather than panicking.
fn array_element_path(current: Option<&ClaimPath>, index: u32) -> ClaimPath {
  match current {
    Some(path) => path.array_element(index),
    None => ClaimPath::root(index.to_string()).array_element(index),
  }
}

fn decode_object(
  current_path: Option<&ClaimPath>,
  object: &JsonObject,
  digests: &HashMap<String, Disclosure>,
  hasher: &dyn Hasher,
  processed: &mut HashSet<String>,
  per_claim: &mut IndexMap<ClaimPath, Vec<Disclosure>>,
) -> Result<(JsonObject, Vec<Disclosure>)> {
  let mut output = object.clone();
  let mut own_consumed: Vec<Disclosure> = Vec::new();

  if let Some(sd_value) = object.get(DIGESTS_KEY) {
    let sd_array = sd_value
      .as_array()
      .ok_or_else(|| Error::DataTypeMismatch(format!("{DIGESTS_KEY} is not an array")))?;

    for digest_value in sd_array {
      let digest = digest_value
        .as_str()
        .ok_or_else(|| Error::DataTypeMismatch(format!("{digest_value} is not a string")))?
        .to_string();

      if processed.contains(&digest) {
        return Err(Error::NonUniqueDigests(digest));
      }

      let Some(disclosure) = digests.get(&digest) else {
        continue;
      };
      let name = disclosure
        .claim_name
        .clone()
        .ok_or_else(|| Error::MalformedSdJwt(format!("digest {digest} resolves to an array-element disclosure")))?;

      if output.contains_key(&name) {
        return Err(Error::DuplicateClaim(name));
      }
      processed.insert(digest.clone());

      let path = child_path(current_path, &name);
      let (recreated_value, mut nested_consumed) = decode_value(Some(&path), &disclosure.claim_value, digests, hasher, processed, per_claim)?;

      let mut entry = vec![disclosure.clone()];
      entry.append(&mut nested_consumed.clone());
      per_claim.insert(path, entry);

      own_consumed.push(disclosure.clone());
      own_consumed.append(&mut nested_consumed);

      output.insert(name, recreated_value);
    }
    output.remove(DIGESTS_KEY);
  }

  let plain_keys: Vec<String> = output
    .iter()
    .filter(|(key, _)| *key != DIGESTS_KEY)
    .map(|(key, _)| key.clone())
    .collect();
  for key in plain_keys {
    if digest_disclosed(object, &key, digests) {
      // Already handled above while iterating `_sd`.
      continue;
    }
    let value = output.get(&key).expect("key collected from output").clone();
    let path = child_path(current_path, &key);
    let (decoded_value, mut nested_consumed) = decode_value(Some(&path), &value, digests, hasher, processed, per_claim)?;
    output.insert(key, decoded_value);
    own_consumed.append(&mut nested_consumed);
  }

  Ok((output, own_consumed))
}

/// `true` if `key` was populated by resolving a digest in `object`'s `_sd`
/// array (as opposed to being present in the object verbatim), used to
/// avoid re-decoding a freshly disclosed value as if it were a plain claim.
fn digest_disclosed(object: &JsonObject, key: &str, _digests: &HashMap<String, Disclosure>) -> bool {
  !object.contains_key(key)
}

fn decode_array(
  current_path: Option<&ClaimPath>,
  array: &[Value],
  digests: &HashMap<String, Disclosure>,
  hasher: &dyn Hasher,
  processed: &mut HashSet<String>,
  per_claim: &mut IndexMap<ClaimPath, Vec<Disclosure>>,
) -> Result<(Vec<Value>, Vec<Disclosure>)> {
  let mut output: Vec<Value> = Vec::new();
  let mut own_consumed: Vec<Disclosure> = Vec::new();

  for value in array {
    if let Some(object) = value.as_object() {
      if let Some(digest_value) = object.get(ARRAY_DIGEST_KEY) {
        if object.len() != 1 {
          return Err(Error::InvalidArrayDisclosureObject);
        }
        let digest = digest_value
          .as_str()
          .ok_or_else(|| Error::DataTypeMismatch(format!("{ARRAY_DIGEST_KEY} is not a string")))?
          .to_string();

        if processed.contains(&digest) {
          return Err(Error::NonUniqueDigests(digest));
        }

        let Some(disclosure) = digests.get(&digest) else {
          continue;
        };
        if disclosure.claim_name.is_some() {
          return Err(Error::MalformedSdJwt(
            "array digest resolves to an object-property disclosure".to_string(),
          ));
        }
        processed.insert(digest.clone());

        let path = array_element_path(current_path, output.len() as u32);
        let (recreated_value, mut nested_consumed) =
          decode_value(Some(&path), &disclosure.claim_value, digests, hasher, processed, per_claim)?;

        let mut entry = vec![disclosure.clone()];
        entry.append(&mut nested_consumed.clone());
        per_claim.insert(path, entry);

        own_consumed.push(disclosure.clone());
        own_consumed.append(&mut nested_consumed);
        output.push(recreated_value);
      } else {
        let path = array_element_path(current_path, output.len() as u32);
        let (decoded_object, mut nested_consumed) = decode_object(Some(&path), object, digests, hasher, processed, per_claim)?;
        own_consumed.append(&mut nested_consumed);
        output.push(Value::Object(decoded_object));
      }
    } else if let Some(nested_array) = value.as_array() {
      let path = array_element_path(current_path, output.len() as u32);
      let (decoded_array, mut nested_consumed) = decode_array(Some(&path), nested_array, digests, hasher, processed, per_claim)?;
      own_consumed.append(&mut nested_consumed);
      output.push(Value::Array(decoded_array));
    } else {
      output.push(value.clone());
    }
  }

  Ok((output, own_consumed))
}

fn decode_value(
  current_path: Option<&ClaimPath>,
  value: &Value,
  digests: &HashMap<String, Disclosure>,
  hasher: &dyn Hasher,
  processed: &mut HashSet<String>,
  per_claim: &mut IndexMap<ClaimPath, Vec<Disclosure>>,
) -> Result<(Value, Vec<Disclosure>)> {
  match value {
    Value::Object(object) => {
      let (decoded, consumed) = decode_object(current_path, object, digests, hasher, processed, per_claim)?;
      Ok((Value::Object(decoded), consumed))
    }
    Value::Array(array) => {
      let (decoded, consumed) = decode_array(current_path, array, digests, hasher, processed, per_claim)?;
      Ok((Value::Array(decoded), consumed))
    }
    other => Ok((other.clone(), Vec::new())),
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::claim_path::ClaimPath;
  use crate::disclosable::DisclosableValue;
  use crate::encoder::create_sd_jwt;
  use crate::hasher::Sha256Hasher;
  use crate::salt::RandSaltProvider;

  fn registry() -> HasherRegistry {
    HasherRegistry::with_sha256()
  }

  #[test]
  fn recreates_concealed_top_level_claim() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value", "other": "visible"}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();

    let recreated = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Strict).unwrap();
    assert_eq!(recreated.claims["id"], json!("did:value"));
    assert_eq!(recreated.claims["other"], json!("visible"));
    assert!(recreated.claims.get("_sd_alg").is_none());
    assert!(recreated.disclosures_per_claim.contains_key(&ClaimPath::root("id")));
  }

  #[test]
  fn recreates_concealed_array_entry() {
    let mut tree = DisclosableValue::from_value(json!({"claim": ["a", "b"]}));
    tree.make_concealable(&ClaimPath::root("claim").array_element(0)).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();

    let recreated = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Strict).unwrap();
    assert_eq!(recreated.claims["claim"], json!(["a", "b"]));
  }

  #[test]
  fn strict_policy_rejects_unused_disclosures() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value", "tst": "tst-value"}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    tree.make_concealable(&ClaimPath::root("tst")).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (mut payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();

    // Drop one digest from `_sd` so its disclosure becomes unused.
    let sd = payload.get_mut("_sd").unwrap().as_array_mut().unwrap();
    sd.truncate(1);

    let result = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Strict);
    assert!(matches!(result, Err(Error::UnusedDisclosure(1))));
  }

  #[test]
  fn lenient_policy_ignores_unused_disclosures() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value", "tst": "tst-value"}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    tree.make_concealable(&ClaimPath::root("tst")).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (mut payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();

    let sd = payload.get_mut("_sd").unwrap().as_array_mut().unwrap();
    sd.truncate(1);

    let result = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Lenient);
    assert!(result.is_ok());
  }

  #[test]
  fn rejects_claim_name_collision() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value"}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (mut payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();
    payload.insert("id".to_string(), json!("id-value"));

    let result = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Strict);
    assert!(matches!(result, Err(Error::DuplicateClaim(_))));
  }

  #[test]
  fn rejects_duplicate_digest_reference() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value"}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (mut payload, disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();
    let digest = payload["_sd"][0].clone();
    payload
      .get_mut("_sd")
      .unwrap()
      .as_array_mut()
      .unwrap()
      .push(digest);

    let result = recreate_claims(&payload, &disclosures, &registry(), UnusedDisclosurePolicy::Strict);
    assert!(matches!(result, Err(Error::NonUniqueDigests(_))));
  }

  #[test]
  fn unknown_hash_algorithm_is_rejected() {
    let payload = json!({"_sd_alg": "sha-384", "_sd": []});
    let result = recreate_claims(payload.as_object().unwrap(), &[], &registry(), UnusedDisclosurePolicy::Strict);
    assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
  }

  #[test]
  fn no_disclosures_recreates_the_never_selectively_disclosed_subset() {
    let mut tree = DisclosableValue::from_value(json!({"id": "did:value", "always": "kept", "arr": ["a", "b"]}));
    tree.make_concealable(&ClaimPath::root("id")).unwrap();
    tree.make_concealable(&ClaimPath::root("arr").array_element(0)).unwrap();
    let DisclosableValue::Obj(object) = tree else { panic!() };
    let hasher = Sha256Hasher::new();
    let salts = RandSaltProvider::new();
    let (payload, _disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();

    // Recreating against an empty disclosure set is the identity on the
    // never-selectively-disclosed subset: every digest placeholder is left
    // unresolved and dropped, and `_sd`/`_sd_alg` are stripped.
    let recreated = recreate_claims(&payload, &[], &registry(), UnusedDisclosurePolicy::Strict).unwrap();
    let expected = json!({"always": "kept", "arr": ["b"]}).as_object().unwrap().clone();
    assert_eq!(recreated.claims, expected);
    assert!(recreated.disclosures_per_claim.is_empty());
  }
}
