// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde_json::Map as JsonObject;
use serde_json::Value;

use crate::decoy::DecoyGenerator;
use crate::decoy::RandDecoyGenerator;
use crate::disclosable::Disclosable;
use crate::disclosable::DisclosableArray;
use crate::disclosable::DisclosableObject;
use crate::disclosable::DisclosableValue;
use crate::disclosure::Disclosure;
use crate::hasher::Hasher;
use crate::salt::SaltProvider;
use crate::Result;

pub(crate) const DIGESTS_KEY: &str = "_sd";
pub(crate) const ARRAY_DIGEST_KEY: &str = "...";
pub(crate) const SD_ALG: &str = "_sd_alg";

/// Folds a [`DisclosableObject`] built by an issuer into the SD-JWT claim
/// set and the flat list of [`Disclosure`]s that accompany it: every node
/// tagged [`Disclosable::AlwaysSelectively`] is replaced by a digest (an
/// entry of `_sd` for object attributes, a `{"...": digest}` placeholder for
/// array elements) and its corresponding `Disclosure` is emitted.
///
/// `_sd_alg` is added iff at least one disclosure was produced.
pub fn create_sd_jwt(object: &DisclosableObject, hasher: &dyn Hasher, salts: &dyn SaltProvider) -> Result<(JsonObject, Vec<Disclosure>)> {
  let (mut payload, disclosures) = encode_object(object, hasher, salts)?;
  if !disclosures.is_empty() {
    payload.insert(SD_ALG.to_string(), Value::String(hasher.alg_name().to_string()));
  }
  Ok((payload, disclosures))
}

fn encode_object(object: &DisclosableObject, hasher: &dyn Hasher, salts: &dyn SaltProvider) -> Result<(JsonObject, Vec<Disclosure>)> {
  let mut output = JsonObject::new();
  let mut digests: Vec<String> = Vec::new();
  let mut disclosures: Vec<Disclosure> = Vec::new();

  for (name, element) in &object.content {
    match element {
      Disclosable::AlwaysSelectively(value) => {
        let (encoded_value, mut child_disclosures) = encode_value(value, hasher, salts)?;
        let disclosure = Disclosure::object_property(salts.next(), name.clone(), encoded_value)?;
        digests.push(hasher.encoded_digest(&disclosure.encode()));
        disclosures.push(disclosure);
        disclosures.append(&mut child_disclosures);
      }
      Disclosable::NeverSelectively(value) => {
        let (encoded_value, mut child_disclosures) = encode_value(value, hasher, salts)?;
        output.insert(name.clone(), encoded_value);
        disclosures.append(&mut child_disclosures);
      }
    }
  }

  if let Some(minimum) = object.minimum_digests {
    let decoy_count = (minimum as usize).saturating_sub(digests.len());
    let generator = RandDecoyGenerator::for_object();
    digests.extend(generator.generate(hasher, salts, decoy_count));
  }

  if !digests.is_empty() {
    digests.sort_unstable();
    output.insert(
      DIGESTS_KEY.to_string(),
      Value::Array(digests.into_iter().map(Value::String).collect()),
    );
  }

  Ok((output, disclosures))
}

fn encode_array(array: &DisclosableArray, hasher: &dyn Hasher, salts: &dyn SaltProvider) -> Result<(Vec<Value>, Vec<Disclosure>)> {
  let mut output: Vec<Value> = Vec::new();
  let mut disclosures: Vec<Disclosure> = Vec::new();

  for element in &array.content {
    match element {
      Disclosable::AlwaysSelectively(value) => {
        let (encoded_value, mut child_disclosures) = encode_value(value, hasher, salts)?;
        let disclosure = Disclosure::array_element(salts.next(), encoded_value);
        let digest = hasher.encoded_digest(&disclosure.encode());
        output.push(serde_json::json!({ ARRAY_DIGEST_KEY: digest }));
        disclosures.push(disclosure);
        disclosures.append(&mut child_disclosures);
      }
      Disclosable::NeverSelectively(value) => {
        let (encoded_value, mut child_disclosures) = encode_value(value, hasher, salts)?;
        output.push(encoded_value);
        disclosures.append(&mut child_disclosures);
      }
    }
  }

  if let Some(minimum) = array.minimum_digests {
    let decoy_count = (minimum as usize).saturating_sub(output.len());
    let generator = RandDecoyGenerator::for_array();
    for digest in generator.generate(hasher, salts, decoy_count) {
      output.push(serde_json::json!({ ARRAY_DIGEST_KEY: digest }));
    }
  }

  Ok((output, disclosures))
}

fn encode_value(value: &DisclosableValue, hasher: &dyn Hasher, salts: &dyn SaltProvider) -> Result<(Value, Vec<Disclosure>)> {
  match value {
    DisclosableValue::Id(value) => Ok((value.clone(), Vec::new())),
    DisclosableValue::Obj(object) => {
      let (encoded, disclosures) = encode_object(object, hasher, salts)?;
      Ok((Value::Object(encoded), disclosures))
    }
    DisclosableValue::Arr(array) => {
      let (encoded, disclosures) = encode_array(array, hasher, salts)?;
      Ok((Value::Array(encoded), disclosures))
    }
  }
}
