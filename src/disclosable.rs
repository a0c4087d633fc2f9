// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The tree model issuers build before encoding: an ordinary JSON tree with
//! some nodes tagged as selectively disclosable.

use indexmap::IndexMap;
use serde_json::Map as JsonObject;
use serde_json::Value;

use crate::claim_path::ClaimPath;
use crate::claim_path::ClaimPathElement;
use crate::Error;

/// Tags a node of a [`DisclosableValue`] tree with whether it may be
/// concealed behind a digest.
///
/// Unlike [`crate::definition::Disclosability`], this has only two states:
/// at issuance time a claim either is or is not turned into a disclosure,
/// there is no "either way is fine" state (that ambiguity belongs to the
/// definition validator that a *holder* or *verifier* applies later).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosable<T> {
  /// The node is always selectively disclosable: at encoding time it is
  /// replaced by a digest and an accompanying [`crate::Disclosure`] is
  /// produced.
  AlwaysSelectively(T),
  /// The node is never selectively disclosable: it is encoded in place,
  /// though nested descendants may still be marked disclosable.
  NeverSelectively(T),
}

impl<T> Disclosable<T> {
  /// Borrows the wrapped value regardless of disclosability.
  pub fn get(&self) -> &T {
    match self {
      Disclosable::AlwaysSelectively(v) | Disclosable::NeverSelectively(v) => v,
    }
  }

  /// Consumes `self`, returning the wrapped value.
  pub fn into_inner(self) -> T {
    match self {
      Disclosable::AlwaysSelectively(v) | Disclosable::NeverSelectively(v) => v,
    }
  }

  /// `true` if this node will be concealed behind a digest at encoding
  /// time.
  pub fn is_concealable(&self) -> bool {
    matches!(self, Disclosable::AlwaysSelectively(_))
  }
}

/// One entry of a [`DisclosableObject`] or [`DisclosableArray`]: a value,
/// tagged with whether it is itself concealable.
pub type DisclosableElement = Disclosable<DisclosableValue>;

/// A node of the tree an issuer builds before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DisclosableValue {
  /// A leaf or an opaque JSON value none of whose descendants are
  /// selectively disclosable.
  Id(Value),
  /// A JSON object, some of whose attributes may be concealable.
  Obj(DisclosableObject),
  /// A JSON array, some of whose elements may be concealable.
  Arr(DisclosableArray),
}

/// A JSON object in the issuance tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisclosableObject {
  /// Attributes, in insertion order (preserved in the eventual `_sd`
  /// ordering computation and in iteration for testing).
  pub content: IndexMap<String, DisclosableElement>,
  /// If set, pads the object's `_sd` array with decoy digests until it
  /// contains at least this many entries.
  pub minimum_digests: Option<u32>,
}

/// A JSON array in the issuance tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisclosableArray {
  /// Elements, in array order.
  pub content: Vec<DisclosableElement>,
  /// If set, pads the array with decoy `{"...": digest}` entries until it
  /// contains at least this many entries.
  pub minimum_digests: Option<u32>,
}

impl DisclosableObject {
  /// Creates an empty object with no minimum digest padding.
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts `value`, tagged `disclosable`, under `name`.
  pub fn insert(&mut self, name: impl Into<String>, disclosable: Disclosable<DisclosableValue>) {
    self.content.insert(name.into(), disclosable);
  }
}

impl DisclosableArray {
  /// Creates an empty array with no minimum digest padding.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `value`, tagged `disclosable`.
  pub fn push(&mut self, disclosable: Disclosable<DisclosableValue>) {
    self.content.push(disclosable);
  }
}

impl DisclosableValue {
  /// Builds a tree in which no node is selectively disclosable, mirroring
  /// `value`'s own shape. A later call to [`Self::make_concealable`] turns
  /// specific nodes on.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::Object(object) => {
        let mut disclosable = DisclosableObject::new();
        for (key, value) in object {
          disclosable.insert(key, Disclosable::NeverSelectively(Self::from_value(value)));
        }
        DisclosableValue::Obj(disclosable)
      }
      Value::Array(array) => {
        let mut disclosable = DisclosableArray::new();
        for value in array {
          disclosable.push(Disclosable::NeverSelectively(Self::from_value(value)));
        }
        DisclosableValue::Arr(disclosable)
      }
      other => DisclosableValue::Id(other),
    }
  }

  /// Converts the tree back to a plain [`Value`], discarding all
  /// disclosability tags. Used by callers that need a preview of the
  /// un-concealed claim set.
  pub fn to_value(&self) -> Value {
    match self {
      DisclosableValue::Id(value) => value.clone(),
      DisclosableValue::Obj(object) => {
        Value::Object(object.content.iter().map(|(k, v)| (k.clone(), v.get().to_value())).collect())
      }
      DisclosableValue::Arr(array) => Value::Array(array.content.iter().map(|v| v.get().to_value()).collect()),
    }
  }

  /// Marks the node addressed by `path` (relative to `self`) as always
  /// selectively disclosable.
  ///
  /// ## Error
  /// Returns [`Error::InvalidPath`] if `path` does not address an existing
  /// node, or [`Error::PathTypeMismatch`] if a path segment disagrees with
  /// the tree's shape (an object key into an array, and so on).
  pub fn make_concealable(&mut self, path: &ClaimPath) -> Result<(), Error> {
    mark(self, path.elements())
  }

  /// Borrows the node addressed by `path`.
  ///
  /// ## Error
  /// Returns [`Error::InvalidPath`]/[`Error::PathTypeMismatch`] per the
  /// same rules as [`Self::make_concealable`].
  pub fn get_node(&self, path: &ClaimPath) -> Result<&DisclosableValue, Error> {
    navigate(self, path.elements())
  }

  /// The number of this node's immediate children currently tagged
  /// [`Disclosable::AlwaysSelectively`]. `0` for a leaf.
  pub fn concealable_child_count(&self) -> u32 {
    match self {
      DisclosableValue::Obj(object) => object.content.values().filter(|e| e.is_concealable()).count() as u32,
      DisclosableValue::Arr(array) => array.content.iter().filter(|e| e.is_concealable()).count() as u32,
      DisclosableValue::Id(_) => 0,
    }
  }
}

fn navigate<'v>(node: &'v DisclosableValue, path: &[ClaimPathElement]) -> Result<&'v DisclosableValue, Error> {
  let Some((head, tail)) = path.split_first() else {
    return Ok(node);
  };

  let next = match head {
    ClaimPathElement::Claim(name) => {
      let DisclosableValue::Obj(object) = node else {
        return Err(Error::PathTypeMismatch(format!(
          "expected an object to select claim {name:?}"
        )));
      };
      object
        .content
        .get(name)
        .map(Disclosable::get)
        .ok_or_else(|| Error::InvalidPath(format!("no such claim: {name}")))?
    }
    ClaimPathElement::ArrayElement(index) => {
      let DisclosableValue::Arr(array) = node else {
        return Err(Error::PathTypeMismatch(format!("expected an array to select index {index}")));
      };
      array
        .content
        .get(*index as usize)
        .map(Disclosable::get)
        .ok_or_else(|| Error::InvalidPath(format!("index out of bounds: {index}")))?
    }
    ClaimPathElement::AllArrayElements => {
      return Err(Error::InvalidPath(
        "cannot navigate through a wildcard selector".to_string(),
      ))
    }
  };
  navigate(next, tail)
}

fn mark(node: &mut DisclosableValue, path: &[ClaimPathElement]) -> Result<(), Error> {
  let Some((head, tail)) = path.split_first() else {
    return Ok(());
  };

  match head {
    ClaimPathElement::Claim(name) => {
      let DisclosableValue::Obj(object) = node else {
        return Err(Error::PathTypeMismatch(format!(
          "expected an object to select claim {name:?}"
        )));
      };
      let entry = object
        .content
        .get_mut(name)
        .ok_or_else(|| Error::InvalidPath(format!("no such claim: {name}")))?;
      if tail.is_empty() {
        set_concealable(entry);
        Ok(())
      } else {
        mark(inner_mut(entry), tail)
      }
    }
    ClaimPathElement::ArrayElement(index) => {
      let DisclosableValue::Arr(array) = node else {
        return Err(Error::PathTypeMismatch(format!("expected an array to select index {index}")));
      };
      let entry = array
        .content
        .get_mut(*index as usize)
        .ok_or_else(|| Error::InvalidPath(format!("index out of bounds: {index}")))?;
      if tail.is_empty() {
        set_concealable(entry);
        Ok(())
      } else {
        mark(inner_mut(entry), tail)
      }
    }
    ClaimPathElement::AllArrayElements => {
      let DisclosableValue::Arr(array) = node else {
        return Err(Error::PathTypeMismatch(
          "expected an array to select the wildcard element".to_string(),
        ));
      };
      for entry in &mut array.content {
        if tail.is_empty() {
          set_concealable(entry);
        } else {
          mark(inner_mut(entry), tail)?;
        }
      }
      Ok(())
    }
  }
}

fn inner_mut(entry: &mut DisclosableElement) -> &mut DisclosableValue {
  match entry {
    Disclosable::AlwaysSelectively(v) | Disclosable::NeverSelectively(v) => v,
  }
}

fn set_concealable(entry: &mut DisclosableElement) {
  let value = std::mem::replace(entry, Disclosable::NeverSelectively(DisclosableValue::Id(Value::Null))).into_inner();
  *entry = Disclosable::AlwaysSelectively(value);
}

/// Sets the minimum-digest padding target for the object or array addressed
/// by `path` (or the root, if `path` is `None`).
///
/// ## Error
/// Returns [`Error::InvalidPath`]/[`Error::PathTypeMismatch`] per the same
/// rules as [`DisclosableValue::make_concealable`], plus
/// [`Error::DataTypeMismatch`] if the addressed node is a leaf rather than
/// an object or array.
pub fn set_minimum_digests(root: &mut DisclosableValue, path: Option<&ClaimPath>, minimum_digests: u32) -> Result<(), Error> {
  let node = match path {
    Some(path) => navigate_mut(root, path.elements())?,
    None => root,
  };
  match node {
    DisclosableValue::Obj(object) => {
      object.minimum_digests = Some(minimum_digests);
      Ok(())
    }
    DisclosableValue::Arr(array) => {
      array.minimum_digests = Some(minimum_digests);
      Ok(())
    }
    DisclosableValue::Id(_) => Err(Error::DataTypeMismatch(
      "minimum digest count can only be set on an object or array".to_string(),
    )),
  }
}

fn navigate_mut<'v>(node: &'v mut DisclosableValue, path: &[ClaimPathElement]) -> Result<&'v mut DisclosableValue, Error> {
  let Some((head, tail)) = path.split_first() else {
    return Ok(node);
  };

  let next = match head {
    ClaimPathElement::Claim(name) => {
      let DisclosableValue::Obj(object) = node else {
        return Err(Error::PathTypeMismatch(format!(
          "expected an object to select claim {name:?}"
        )));
      };
      inner_mut(
        object
          .content
          .get_mut(name)
          .ok_or_else(|| Error::InvalidPath(format!("no such claim: {name}")))?,
      )
    }
    ClaimPathElement::ArrayElement(index) => {
      let DisclosableValue::Arr(array) = node else {
        return Err(Error::PathTypeMismatch(format!("expected an array to select index {index}")));
      };
      inner_mut(
        array
          .content
          .get_mut(*index as usize)
          .ok_or_else(|| Error::InvalidPath(format!("index out of bounds: {index}")))?,
      )
    }
    ClaimPathElement::AllArrayElements => {
      return Err(Error::InvalidPath(
        "cannot set minimum digests through a wildcard selector".to_string(),
      ))
    }
  };
  navigate_mut(next, tail)
}

/// Converts a plain [`JsonObject`] into a root [`DisclosableValue::Obj`]
/// with nothing marked concealable, a convenience for callers building a
/// tree from an existing payload.
pub fn object_from_json(object: JsonObject) -> DisclosableObject {
  let mut disclosable = DisclosableObject::new();
  for (key, value) in object {
    disclosable.insert(key, Disclosable::NeverSelectively(DisclosableValue::from_value(value)));
  }
  disclosable
}
