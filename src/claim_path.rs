// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Typed addressing into nested JSON: object keys, array indices and the
//! array wildcard, as used by the SD-JWT VC "claim path" concept
//! (<https://www.ietf.org/archive/id/draft-ietf-oauth-sd-jwt-vc/>).

use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;

use crate::Error;

/// A single step of a [`ClaimPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimPathElement {
  /// Selects an object attribute by name.
  Claim(String),
  /// Selects an array element by index.
  ArrayElement(u32),
  /// Selects every element of an array (the SD-JWT VC wildcard, serialized
  /// as `null`).
  AllArrayElements,
}

impl ClaimPathElement {
  /// `p ⊇ q` for a single element: [`Self::AllArrayElements`] contains any
  /// [`Self::ArrayElement`]; otherwise elements must be equal.
  fn contains(&self, other: &ClaimPathElement) -> bool {
    match (self, other) {
      (ClaimPathElement::AllArrayElements, ClaimPathElement::ArrayElement(_)) => true,
      _ => self == other,
    }
  }
}

impl Serialize for ClaimPathElement {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      ClaimPathElement::Claim(name) => serializer.serialize_str(name),
      ClaimPathElement::ArrayElement(index) => serializer.serialize_u32(*index),
      ClaimPathElement::AllArrayElements => serializer.serialize_none(),
    }
  }
}

impl<'de> Deserialize<'de> for ClaimPathElement {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
      Value::Null => Ok(ClaimPathElement::AllArrayElements),
      Value::String(name) => Ok(ClaimPathElement::Claim(name)),
      Value::Number(n) => {
        let index = n
          .as_u64()
          .and_then(|v| u32::try_from(v).ok())
          .ok_or_else(|| D::Error::custom(format!("claim path index out of range: {n}")))?;
        Ok(ClaimPathElement::ArrayElement(index))
      }
      other => Err(D::Error::custom(format!(
        "claim path element must be a string, an integer or null, found {other}"
      ))),
    }
  }
}

/// A non-empty ordered sequence of [`ClaimPathElement`]s identifying a claim
/// inside nested JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ClaimPathElement>", into = "Vec<ClaimPathElement>")]
pub struct ClaimPath(Vec<ClaimPathElement>);

impl ClaimPath {
  /// Creates a single-element, root [`ClaimPath`] selecting object attribute
  /// `name`.
  pub fn root(name: impl Into<String>) -> Self {
    Self(vec![ClaimPathElement::Claim(name.into())])
  }

  /// Creates a [`ClaimPath`] from a non-empty vector of elements.
  ///
  /// ## Error
  /// Returns [`Error::MalformedClaimPath`] if `elements` is empty.
  pub fn new(elements: Vec<ClaimPathElement>) -> Result<Self, Error> {
    if elements.is_empty() {
      return Err(Error::MalformedClaimPath("a claim path must not be empty".to_string()));
    }
    Ok(Self(elements))
  }

  /// Returns a new path with `element` appended.
  pub fn child(&self, element: ClaimPathElement) -> Self {
    let mut elements = self.0.clone();
    elements.push(element);
    Self(elements)
  }

  /// Returns a new path identifying object attribute `name` nested under
  /// `self`.
  pub fn claim(&self, name: impl Into<String>) -> Self {
    self.child(ClaimPathElement::Claim(name.into()))
  }

  /// Returns a new path identifying array element `index` nested under
  /// `self`.
  pub fn array_element(&self, index: u32) -> Self {
    self.child(ClaimPathElement::ArrayElement(index))
  }

  /// The elements of this path.
  pub fn elements(&self) -> &[ClaimPathElement] {
    &self.0
  }

  /// The first element of the path.
  pub fn head(&self) -> &ClaimPathElement {
    // Invariant: `ClaimPath` is always non-empty.
    &self.0[0]
  }

  /// All elements after the first, possibly empty.
  pub fn tail(&self) -> &[ClaimPathElement] {
    &self.0[1..]
  }

  /// The last element of the path.
  pub fn last(&self) -> &ClaimPathElement {
    // Invariant: `ClaimPath` is always non-empty.
    self.0.last().expect("claim path is non-empty")
  }

  /// The path without its last element, or `None` for single-element paths.
  pub fn parent(&self) -> Option<ClaimPath> {
    if self.0.len() <= 1 {
      None
    } else {
      Some(ClaimPath(self.0[..self.0.len() - 1].to_vec()))
    }
  }

  /// `true` iff `self ⊇ other`: same length, and each position of `self`
  /// contains the corresponding position of `other`.
  pub fn contains(&self, other: &ClaimPath) -> bool {
    self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.contains(b))
  }

  /// Traverses `json` following this path, per the selection algorithm of
  /// the specification: a missing object key or array index yields
  /// `Ok(None)`; a type mismatch between the path and the JSON shape is
  /// [`Error::PathTypeMismatch`]; [`ClaimPathElement::AllArrayElements`]
  /// with a non-empty tail maps the remaining selection over every element
  /// and returns a JSON array of results, while with an empty tail it
  /// returns the array itself.
  pub fn select<'v>(&self, json: &'v Value) -> Result<Option<Value>, Error> {
    select(json, &self.0)
  }
}

impl TryFrom<Vec<ClaimPathElement>> for ClaimPath {
  type Error = Error;

  fn try_from(elements: Vec<ClaimPathElement>) -> Result<Self, Self::Error> {
    Self::new(elements)
  }
}

impl From<ClaimPath> for Vec<ClaimPathElement> {
  fn from(path: ClaimPath) -> Self {
    path.0
  }
}

fn select(json: &Value, path: &[ClaimPathElement]) -> Result<Option<Value>, Error> {
  let Some((head, tail)) = path.split_first() else {
    return Ok(Some(json.clone()));
  };

  match head {
    ClaimPathElement::Claim(name) => match json {
      Value::Object(object) => match object.get(name) {
        Some(value) => select(value, tail),
        None => Ok(None),
      },
      _ => Err(Error::PathTypeMismatch(format!(
        "expected an object to select claim {name:?}, found {}",
        type_name(json)
      ))),
    },
    ClaimPathElement::ArrayElement(index) => match json {
      Value::Array(array) => match array.get(*index as usize) {
        Some(value) => select(value, tail),
        None => Ok(None),
      },
      _ => Err(Error::PathTypeMismatch(format!(
        "expected an array to select index {index}, found {}",
        type_name(json)
      ))),
    },
    ClaimPathElement::AllArrayElements => match json {
      Value::Array(array) => {
        if tail.is_empty() {
          Ok(Some(json.clone()))
        } else {
          let mapped = array
            .iter()
            .map(|element| select(element, tail))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|v| v.unwrap_or(Value::Null))
            .collect();
          Ok(Some(Value::Array(mapped)))
        }
      }
      _ => Err(Error::PathTypeMismatch(format!(
        "expected an array for the wildcard element, found {}",
        type_name(json)
      ))),
    },
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// Fails unless every one of `paths` begins with [`ClaimPathElement::Claim`].
///
/// Used when validating type-metadata definitions, whose paths are always
/// rooted at an object attribute (arrays and wildcards only ever appear
/// after the first element).
pub fn ensure_object_attributes(paths: &[ClaimPath]) -> Result<(), Error> {
  for path in paths {
    if !matches!(path.head(), ClaimPathElement::Claim(_)) {
      return Err(Error::MalformedClaimPath(format!(
        "path must begin with an object attribute: {path:?}"
      )));
    }
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use serde_json::json;

  #[test]
  fn claim_path_json_round_trip() {
    // F. `[["address", null, "country"]]` parses to Claim("address") ▸ AllArrayElements ▸ Claim("country").
    let value = json!(["address", null, "country"]);
    let path: ClaimPath = serde_json::from_value(value.clone()).unwrap();
    assert_eq!(
      path.elements(),
      &[
        ClaimPathElement::Claim("address".to_string()),
        ClaimPathElement::AllArrayElements,
        ClaimPathElement::Claim("country".to_string()),
      ]
    );
    assert_eq!(serde_json::to_value(&path).unwrap(), value);
  }

  #[test]
  fn rejects_empty_path() {
    assert!(ClaimPath::new(vec![]).is_err());
  }

  #[test]
  fn parent_head_tail_last() {
    let path = ClaimPath::root("address").claim("country");
    assert_eq!(path.head(), &ClaimPathElement::Claim("address".to_string()));
    assert_eq!(path.last(), &ClaimPathElement::Claim("country".to_string()));
    assert_eq!(path.tail(), &[ClaimPathElement::Claim("country".to_string())]);
    assert_eq!(path.parent(), Some(ClaimPath::root("address")));
    assert_eq!(ClaimPath::root("address").parent(), None);
  }

  #[test]
  fn containment() {
    let wildcard = ClaimPath::root("nationalities").child(ClaimPathElement::AllArrayElements);
    let indexed = ClaimPath::root("nationalities").array_element(2);
    assert!(wildcard.contains(&indexed));
    assert!(!indexed.contains(&wildcard));
    assert!(wildcard.contains(&wildcard));
  }

  #[test]
  fn select_missing_key_is_none() {
    let json = json!({"a": 1});
    let path = ClaimPath::root("b");
    assert_eq!(path.select(&json).unwrap(), None);
  }

  #[test]
  fn select_type_mismatch_errors() {
    let json = json!({"a": 1});
    let path = ClaimPath::root("a").claim("b");
    assert!(matches!(path.select(&json), Err(Error::PathTypeMismatch(_))));
  }

  #[test]
  fn select_wildcard_with_tail_maps_over_elements() {
    let json = json!({"addresses": [{"country": "DE"}, {"country": "FR"}]});
    let path = ClaimPath::root("addresses").child(ClaimPathElement::AllArrayElements).claim("country");
    assert_eq!(path.select(&json).unwrap(), Some(json!(["DE", "FR"])));
  }

  #[test]
  fn select_wildcard_without_tail_returns_array() {
    let json = json!({"addresses": [1, 2, 3]});
    let path = ClaimPath::root("addresses").child(ClaimPathElement::AllArrayElements);
    assert_eq!(path.select(&json).unwrap(), Some(json!([1, 2, 3])));
  }

  #[test]
  fn ensure_object_attributes_rejects_array_rooted_paths() {
    let path = ClaimPath::new(vec![ClaimPathElement::ArrayElement(0)]).unwrap();
    assert!(ensure_object_attributes(&[path]).is_err());
  }
}
