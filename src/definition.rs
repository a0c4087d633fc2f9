// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Declarative, definition-based validation of a recreated SD-JWT payload.
//!
//! A [`SdJwtDefinition`] is isomorphic to a [`crate::disclosable::DisclosableObject`],
//! parameterised over [`AttributeMetadata`] instead of leaf JSON values: it
//! says, for every attribute a credential is expected to carry, whether it
//! must, may, or must not be selectively disclosed. [`validate`] walks it
//! against a recreated payload and a path-to-disclosures index, collecting
//! every violation rather than stopping at the first.

use indexmap::IndexMap;
use serde_json::Map as JsonObject;
use serde_json::Value;

use crate::claim_path::ClaimPath;
use crate::disclosure::Disclosure;
use crate::Error;

/// Well-known top-level claims that are always permitted, whether or not a
/// [`SdJwtDefinition`] enumerates them.
///
/// Covers the registered JWT claims of <https://www.rfc-editor.org/rfc/rfc7519.html#section-4.1>
/// plus the SD-JWT VC type claims of
/// <https://www.ietf.org/archive/id/draft-ietf-oauth-sd-jwt-vc/>.
pub const DEFAULT_WELL_KNOWN_CLAIMS: &[&str] =
  &["iss", "sub", "aud", "exp", "nbf", "iat", "jti", "vct", "vct#integrity", "cnf", "status", "_sd", "_sd_alg"];

/// How a [`SdJwtDefinition`] entry expects an attribute to be disclosed.
///
/// A superset of [`crate::disclosable::Disclosable`]'s two states: a
/// definition may also leave the choice open to the issuer with
/// [`Disclosability::MayBeSd`], in which case no accounting check is
/// performed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosability {
  /// The attribute must appear behind a disclosure.
  MustBeSd,
  /// The attribute must appear in plain, undisclosed form.
  MustNotBeSd,
  /// Either is acceptable; disclosure accounting is not checked.
  MayBeSd,
}

/// The shape a [`SdJwtDefinition`] entry expects its attribute to have.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionNode {
  /// A scalar or opaque value; no further recursion.
  Value,
  /// A JSON object, validated attribute by attribute.
  Obj(DefinitionObject),
  /// A JSON array, validated against a single, uniform element descriptor.
  Arr(DefinitionArray),
}

/// One entry of a [`DefinitionObject`] or the element descriptor of a
/// [`DefinitionArray`]: a disclosability marker plus the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionEntry {
  pub disclosability: Disclosability,
  pub node: DefinitionNode,
}

impl DefinitionEntry {
  /// Creates a new entry for a scalar attribute.
  pub fn value(disclosability: Disclosability) -> Self {
    Self {
      disclosability,
      node: DefinitionNode::Value,
    }
  }

  /// Creates a new entry for a nested object attribute.
  pub fn object(disclosability: Disclosability, object: DefinitionObject) -> Self {
    Self {
      disclosability,
      node: DefinitionNode::Obj(object),
    }
  }

  /// Creates a new entry for an array attribute, describing every element
  /// with a single, uniform `element` descriptor.
  pub fn array(disclosability: Disclosability, element: DefinitionEntry) -> Self {
    Self {
      disclosability,
      node: DefinitionNode::Arr(DefinitionArray { element: Box::new(element) }),
    }
  }
}

/// The expected attributes of a JSON object, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefinitionObject {
  pub content: IndexMap<String, DefinitionEntry>,
}

impl DefinitionObject {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declares `name` as an expected attribute of this object.
  pub fn insert(&mut self, name: impl Into<String>, entry: DefinitionEntry) {
    self.content.insert(name.into(), entry);
  }
}

/// The element descriptor of an array attribute.
///
/// Per the uniform-array policy, every element of the array is validated
/// against the same `element` descriptor; arrays whose elements do not
/// actually share a shape are not rejected for it (a documented
/// limitation), they are just validated against whichever mismatches they
/// happen to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionArray {
  pub element: Box<DefinitionEntry>,
}

/// A declarative credential definition: the root object a recreated SD-JWT
/// payload is validated against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SdJwtDefinition {
  pub root: DefinitionObject,
}

impl SdJwtDefinition {
  pub fn new(root: DefinitionObject) -> Self {
    Self { root }
  }
}

/// A single way a recreated payload fails to conform to a [`SdJwtDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  /// Claim recreation itself failed; no further structural checks were
  /// possible.
  DisclosureInconsistencies(String),
  /// An attribute present in the payload has no matching entry in the
  /// definition.
  UnknownClaim(ClaimPath),
  /// The definition expects an object or array at `path`, but the
  /// recreated value is not, or vice versa.
  WrongClaimType(ClaimPath),
  /// The attribute at `path` is disclosed in a way its definition
  /// forbids.
  IncorrectlyDisclosedClaim(ClaimPath),
}

/// The outcome of validating a recreated payload against a [`SdJwtDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
  /// The payload conforms to the definition.
  Valid,
  /// The payload does not conform; every violation found, in the order
  /// encountered during traversal.
  Invalid(Vec<Violation>),
}

impl ValidationResult {
  /// `true` iff this is [`Self::Valid`].
  pub fn is_valid(&self) -> bool {
    matches!(self, ValidationResult::Valid)
  }
}

/// Validates `recreated` against `definition`, using `disclosures_per_claim`
/// to decide, for every attribute, whether it was disclosed.
///
/// Well-known top-level claims ([`DEFAULT_WELL_KNOWN_CLAIMS`]) are exempt
/// from unknown-attribute checks, whether or not the definition enumerates
/// them.
pub fn validate(
  definition: &SdJwtDefinition,
  recreated: &JsonObject,
  disclosures_per_claim: &IndexMap<ClaimPath, Vec<Disclosure>>,
) -> ValidationResult {
  let stripped: JsonObject = recreated
    .iter()
    .filter(|(key, _)| !DEFAULT_WELL_KNOWN_CLAIMS.contains(&key.as_str()))
    .map(|(key, value)| (key.clone(), value.clone()))
    .collect();

  let mut violations = Vec::new();
  validate_object(&definition.root, &stripped, None, disclosures_per_claim, &mut violations);

  if violations.is_empty() {
    ValidationResult::Valid
  } else {
    ValidationResult::Invalid(violations)
  }
}

/// Recreates `disclosures` against `object`, then validates the result
/// against `definition`.
///
/// A convenience for callers that want a single verdict covering both
/// cryptographic recreation and structural conformance: a recreation
/// failure surfaces as a single [`Violation::DisclosureInconsistencies`]
/// rather than as a separate [`Error`].
pub fn recreate_and_validate(
  definition: &SdJwtDefinition,
  object: &JsonObject,
  disclosures: &[Disclosure],
  hashers: &crate::hasher::HasherRegistry,
  policy: crate::decoder::UnusedDisclosurePolicy,
) -> ValidationResult {
  match crate::decoder::recreate_claims(object, disclosures, hashers, policy) {
    Ok(recreated) => validate(definition, &recreated.claims, &recreated.disclosures_per_claim),
    Err(error) => ValidationResult::Invalid(vec![Violation::DisclosureInconsistencies(error.to_string())]),
  }
}

fn validate_object(
  definition: &DefinitionObject,
  payload: &JsonObject,
  parent: Option<&ClaimPath>,
  disclosures_per_claim: &IndexMap<ClaimPath, Vec<Disclosure>>,
  violations: &mut Vec<Violation>,
) {
  for (key, entry) in &definition.content {
    let Some(value) = payload.get(key) else {
      continue;
    };
    let path = child_path(parent, key);
    validate_entry(entry, value, &path, parent, disclosures_per_claim, violations);
  }

  for key in payload.keys() {
    if !definition.content.contains_key(key) {
      violations.push(Violation::UnknownClaim(child_path(parent, key)));
    }
  }
}

fn validate_entry(
  entry: &DefinitionEntry,
  value: &Value,
  path: &ClaimPath,
  parent: Option<&ClaimPath>,
  disclosures_per_claim: &IndexMap<ClaimPath, Vec<Disclosure>>,
  violations: &mut Vec<Violation>,
) {
  if !disclosure_accounting_holds(entry.disclosability, path, parent, disclosures_per_claim) {
    violations.push(Violation::IncorrectlyDisclosedClaim(path.clone()));
  }

  match (&entry.node, value) {
    (DefinitionNode::Obj(object_def), Value::Object(object)) => {
      validate_object(object_def, object, Some(path), disclosures_per_claim, violations);
    }
    (DefinitionNode::Obj(_), _) => violations.push(Violation::WrongClaimType(path.clone())),
    (DefinitionNode::Arr(array_def), Value::Array(array)) => {
      for (index, element) in array.iter().enumerate() {
        let element_path = path.array_element(index as u32);
        validate_entry(&array_def.element, element, &element_path, Some(path), disclosures_per_claim, violations);
      }
    }
    (DefinitionNode::Arr(_), _) => violations.push(Violation::WrongClaimType(path.clone())),
    (DefinitionNode::Value, _) => {}
  }
}

/// `path`'s attribute is selectively disclosed iff its disclosure count
/// strictly exceeds its parent's, taking `∅` (count `0`) for the root.
fn disclosure_accounting_holds(
  disclosability: Disclosability,
  path: &ClaimPath,
  parent: Option<&ClaimPath>,
  disclosures_per_claim: &IndexMap<ClaimPath, Vec<Disclosure>>,
) -> bool {
  if disclosability == Disclosability::MayBeSd {
    return true;
  }

  let own = disclosures_per_claim.get(path).map_or(0, Vec::len);
  let parent_count = parent.and_then(|p| disclosures_per_claim.get(p)).map_or(0, Vec::len);
  let is_disclosed = own > parent_count;

  match disclosability {
    Disclosability::MustBeSd => is_disclosed,
    Disclosability::MustNotBeSd => !is_disclosed,
    Disclosability::MayBeSd => unreachable!("handled above"),
  }
}

fn child_path(parent: Option<&ClaimPath>, key: &str) -> ClaimPath {
  match parent {
    Some(path) => path.claim(key),
    None => ClaimPath::root(key),
  }
}
