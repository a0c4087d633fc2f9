// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use serde_json::Value;

use crate::codec;
use crate::Error;

/// Claim names that are illegal inside a disclosure because they are used by
/// the SD-JWT wire format itself.
pub const RESERVED_CLAIM_NAMES: [&str; 3] = ["_sd", "_sd_alg", "..."];

/// A disclosure: the base64url-nopad encoding of `[salt, name, value]` (an
/// object-property disclosure) or `[salt, value]` (an array-element
/// disclosure).
///
/// See: <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-disclosures>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
  /// The salt value.
  pub salt: String,
  /// The claim name; `None` for array-element disclosures.
  pub claim_name: Option<String>,
  /// The claim value, which can be of any JSON type.
  pub claim_value: Value,
}

impl Disclosure {
  /// Creates an object-property disclosure.
  ///
  /// ## Error
  /// Returns [`Error::ReservedClaimName`] if `name` is `_sd`, `_sd_alg`, or
  /// `...`.
  pub fn object_property(salt: String, name: String, value: Value) -> Result<Self, Error> {
    if RESERVED_CLAIM_NAMES.contains(&name.as_str()) {
      return Err(Error::ReservedClaimName(name));
    }
    Ok(Self {
      salt,
      claim_name: Some(name),
      claim_value: value,
    })
  }

  /// Creates an array-element disclosure. Always succeeds: array-element
  /// disclosures carry no name to collide with a reserved claim.
  pub fn array_element(salt: String, value: Value) -> Self {
    Self {
      salt,
      claim_name: None,
      claim_value: value,
    }
  }

  /// `true` if this is an object-property disclosure.
  pub fn is_object_property(&self) -> bool {
    self.claim_name.is_some()
  }

  /// Returns the base64url-nopad encoded form of this disclosure.
  pub fn encode(&self) -> String {
    self.to_string()
  }

  /// Parses a base64url-nopad encoded disclosure.
  ///
  /// ## Error
  /// Returns [`Error::MalformedEncoding`] if `disclosure` is not valid
  /// base64url, or [`Error::MalformedDisclosure`] if the decoded bytes are
  /// not a 2- or 3-element JSON array of the expected shape, or if an
  /// object-property disclosure names a reserved claim.
  pub fn parse(disclosure: &str) -> Result<Self, Error> {
    let bytes = codec::decode(disclosure)?;
    let decoded: Vec<Value> = serde_json::from_slice(&bytes)
      .map_err(|e| Error::MalformedDisclosure(format!("not a JSON array: {e}")))?;

    match decoded.len() {
      2 => {
        let salt = expect_string(&decoded[0], "salt")?;
        Ok(Self {
          salt,
          claim_name: None,
          claim_value: decoded[1].clone(),
        })
      }
      3 => {
        let salt = expect_string(&decoded[0], "salt")?;
        let name = expect_string(&decoded[1], "claim name")?;
        if RESERVED_CLAIM_NAMES.contains(&name.as_str()) {
          return Err(Error::ReservedClaimName(name));
        }
        Ok(Self {
          salt,
          claim_name: Some(name),
          claim_value: decoded[2].clone(),
        })
      }
      n => Err(Error::MalformedDisclosure(format!(
        "expected an array of 2 or 3 elements, found {n}"
      ))),
    }
  }
}

fn expect_string(value: &Value, what: &str) -> Result<String, Error> {
  value
    .as_str()
    .map(str::to_owned)
    .ok_or_else(|| Error::MalformedDisclosure(format!("{what} is not a string")))
}

impl Display for Disclosure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let array = if let Some(name) = &self.claim_name {
      serde_json::json!([self.salt, name, self.claim_value])
    } else {
      serde_json::json!([self.salt, self.claim_value])
    };
    // `Value` serialization cannot fail for well-formed in-memory trees.
    let json = serde_json::to_vec(&array).expect("disclosure array serializes");
    f.write_str(&codec::encode(json))
  }
}

#[cfg(test)]
mod test {
  use super::Disclosure;
  use crate::Error;

  // Test values from:
  // https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#appendix-A.2-7
  #[test]
  fn test_parsing() {
    let disclosure = Disclosure::object_property(
      "2GLC42sKQveCfGfryNRN9w".to_string(),
      "time".to_owned(),
      "2012-04-23T18:25Z".to_owned().into(),
    )
    .unwrap();

    let parsed = Disclosure::parse("WyIyR0xDNDJzS1F2ZUNmR2ZyeU5STjl3IiwgInRpbWUiLCAiMjAxMi0wNC0yM1QxODoyNVoiXQ");
    assert_eq!(parsed.unwrap(), disclosure);
  }

  // Test values from:
  // https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-05.html#section-5.5-25
  #[test]
  fn test_creating() {
    let disclosure = Disclosure::array_element("lklxF5jMYlGTPUovMNIvCA".to_owned(), "US".to_owned().into());
    assert_eq!(
      "WyJsa2x4RjVqTVlsR1RQVW92TU5JdkNBIiwgIlVTIl0".to_owned(),
      disclosure.to_string()
    );
  }

  #[test]
  fn rejects_reserved_claim_names() {
    for reserved in ["_sd", "_sd_alg", "..."] {
      assert!(matches!(
        Disclosure::object_property("salt".to_owned(), reserved.to_owned(), "v".into()),
        Err(Error::ReservedClaimName(_))
      ));
    }
  }

  #[test]
  fn rejects_malformed_arity() {
    let one_element = crate::codec::encode(serde_json::to_vec(&serde_json::json!(["only-salt"])).unwrap());
    assert!(matches!(
      Disclosure::parse(&one_element),
      Err(Error::MalformedDisclosure(_))
    ));
  }

  #[test]
  fn round_trips_through_encode_and_parse() {
    let disclosure = Disclosure::object_property("salt123456789012345".to_owned(), "family_name".to_owned(), "Doe".into())
      .unwrap();
    let parsed = Disclosure::parse(&disclosure.encode()).unwrap();
    assert_eq!(disclosure, parsed);
  }
}
