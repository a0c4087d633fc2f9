// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value;

use crate::claim_path::ClaimPath;
use crate::claim_path::ClaimPathElement;
use crate::disclosable::object_from_json;
use crate::disclosable::set_minimum_digests;
use crate::disclosable::DisclosableObject;
use crate::disclosable::DisclosableValue;
use crate::disclosure::Disclosure;
use crate::encoder::create_sd_jwt;
use crate::hasher::Hasher;
use crate::jwt::Jwt;
use crate::key_binding_jwt_claims::RequiredKeyBinding;
use crate::salt::RandSaltProvider;
use crate::salt::SaltProvider;
use crate::salt::DEFAULT_SALT_SIZE;
use crate::sd_jwt::SdJwt;
use crate::sd_jwt::SdJwtClaims;
use crate::sd_jwt::SD_JWT_HEADER_TYP;
use crate::signer::JwtSigner;
use crate::Error;
use crate::Result;

#[cfg(feature = "sha")]
use crate::hasher::Sha256Hasher;

/// Builder for an issuable SD-JWT.
///
/// Attributes are marked concealable by [JSON Pointer](https://datatracker.ietf.org/doc/html/rfc6901)
/// for ergonomics; internally each pointer is resolved to a typed
/// [`ClaimPath`] against the issuance tree.
pub struct SdJwtBuilder<H: Hasher> {
  root: DisclosableValue,
  hasher: H,
  salts: RandSaltProvider,
  key_bind: Option<RequiredKeyBinding>,
}

#[cfg(feature = "sha")]
impl SdJwtBuilder<Sha256Hasher> {
  /// Creates a new [`SdJwtBuilder`] with the `sha-256` hash function.
  ///
  /// ## Error
  /// Returns [`Error::DataTypeMismatch`] if `object` does not serialize to
  /// a JSON object.
  pub fn new<T: Serialize>(object: T) -> Result<Self> {
    Self::new_with_hasher(object, Sha256Hasher::new())
  }
}

impl<H: Hasher> SdJwtBuilder<H> {
  /// Creates a new [`SdJwtBuilder`] with a custom hash function.
  pub fn new_with_hasher<T: Serialize>(object: T, hasher: H) -> Result<Self> {
    Self::new_with_hasher_and_salt_size(object, hasher, DEFAULT_SALT_SIZE)
  }

  /// Creates a new [`SdJwtBuilder`] with a custom hash function and salt
  /// size.
  ///
  /// ## Error
  /// Returns [`Error::InvalidSaltSize`] if `salt_size < 16`.
  pub fn new_with_hasher_and_salt_size<T: Serialize>(object: T, hasher: H, salt_size: usize) -> Result<Self> {
    let value = serde_json::to_value(object).map_err(|e| Error::Unspecified(e.to_string()))?;
    let Value::Object(object) = value else {
      return Err(Error::DataTypeMismatch("expected a JSON object".to_string()));
    };
    Ok(Self {
      root: DisclosableValue::Obj(object_from_json(object)),
      hasher,
      salts: RandSaltProvider::with_salt_size(salt_size)?,
      key_bind: None,
    })
  }

  /// Marks the claim at `pointer` as concealable.
  ///
  /// ## Example
  /// ```rust,ignore
  /// let builder = SdJwtBuilder::new(obj)?
  ///   .make_concealable("/id")?       // conceals "id": "did:value"
  ///   .make_concealable("/claim1/abc")? // conceals "abc": true
  ///   .make_concealable("/claim2/0")?;  // conceals the first element of "claim2"
  /// ```
  ///
  /// ## Error
  /// Returns [`Error::InvalidPath`] if `pointer` is not a valid JSON
  /// Pointer, or if it does not address an existing claim.
  pub fn make_concealable(mut self, pointer: &str) -> Result<Self> {
    let path = claim_path_from_pointer(pointer)?;
    self.root.make_concealable(&path)?;
    Ok(self)
  }

  /// Pads the object or array at `pointer` (or the root object, for `""`)
  /// with `number_of_decoys` extra decoy digests, on top of whichever
  /// claims are already marked concealable there.
  pub fn add_decoys(mut self, pointer: &str, number_of_decoys: usize) -> Result<Self> {
    let path = (!pointer.is_empty()).then(|| claim_path_from_pointer(pointer)).transpose()?;
    let existing = match &path {
      Some(path) => self.root.get_node(path)?.concealable_child_count(),
      None => self.root.concealable_child_count(),
    };
    set_minimum_digests(&mut self.root, path.as_ref(), existing + number_of_decoys as u32)?;
    Ok(self)
  }

  /// Requires a proof of possession of a given key from the holder.
  ///
  /// Adds a `cnf` claim as specified in
  /// <https://www.rfc-editor.org/rfc/rfc7800.html#section-3>.
  pub fn require_key_binding(mut self, key_bind: RequiredKeyBinding) -> Self {
    self.key_bind = Some(key_bind);
    self
  }

  /// Creates and signs the SD-JWT with the given `signer`, using `alg` as
  /// the JWS header's `alg` value.
  pub async fn finish<S>(self, signer: &S, alg: &str) -> Result<SdJwt>
  where
    S: JwtSigner,
  {
    tracing::debug!("finish");

    let SdJwtBuilder {
      root,
      hasher,
      salts,
      key_bind,
    } = self;

    let DisclosableValue::Obj(object) = root else {
      unreachable!("the builder's root is always an object");
    };
    let (mut payload, disclosures) = create_sd_jwt(&object, &hasher, &salts)?;

    if let Some(key_bind) = key_bind {
      let key_bind = serde_json::to_value(key_bind).map_err(|e| Error::DeserializationError(e.to_string()))?;
      payload.insert("cnf".to_string(), key_bind);
    }

    let Value::Object(header) = serde_json::json!({
      "typ": SD_JWT_HEADER_TYP,
      "alg": alg,
    }) else {
      unreachable!();
    };

    let jws = signer
      .sign(&header, &payload)
      .await
      .map_err(|e| anyhow::anyhow!("signing failed: {e}"))
      .and_then(|bytes| String::from_utf8(bytes).context("JWS signature is not valid UTF-8"))
      .map_err(|e| {
        tracing::warn!("finish::sign failed: {e}");
        Error::JwsSignerFailure(e.to_string())
      })?;

    let claims = serde_json::from_value::<SdJwtClaims>(Value::Object(payload))
      .map_err(|e| Error::DeserializationError(format!("invalid SD-JWT claims: {e}")))?;
    let jwt = Jwt {
      header,
      claims,
      signature: jws,
    };

    Ok(SdJwt::new(jwt, disclosures, None))
  }
}

/// Converts a JSON Pointer into a [`ClaimPath`], treating numeric segments
/// as array indices and everything else as object attribute names.
fn claim_path_from_pointer(pointer: &str) -> Result<ClaimPath> {
  let pointer: json_pointer::JsonPointer<String, Vec<String>> = pointer
    .parse()
    .map_err(|_| Error::InvalidPath(format!("{pointer} is not a valid JSON Pointer")))?;

  let elements = pointer
    .iter()
    .map(|segment| match segment.parse::<u32>() {
      Ok(index) => ClaimPathElement::ArrayElement(index),
      Err(_) => ClaimPathElement::Claim(segment.to_string()),
    })
    .collect();

  ClaimPath::new(elements)
}
