// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::codec;
use crate::Error;

/// Used to implement hash functions to be used for encoding/decoding.
///
/// ## Note
///
/// Implementations of this trait are expected only for algorithms listed in
/// the IANA "Named Information Hash Algorithm" registry.
/// See [Hash Function Claim](https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html#name-hash-function-claim)
pub trait Hasher: Sync + Send {
  /// Digests input to produce a unique fixed-size hash value in bytes.
  fn digest(&self, input: &[u8]) -> Vec<u8>;

  /// Returns the IANA "Hash Name String" identifying this hash function.
  fn alg_name(&self) -> &'static str;

  /// Returns the base64url-nopad encoded digest of an already base64url
  /// encoded `disclosure`.
  ///
  /// "The digest MUST be taken over the US-ASCII bytes of the
  /// base64url-encoded Disclosure" -- filtering is a no-op in practice since
  /// base64url output is always ASCII, but it documents the requirement.
  fn encoded_digest(&self, disclosure: &str) -> String {
    let ascii_bytes: Vec<u8> = disclosure.bytes().filter(u8::is_ascii).collect();
    codec::encode(self.digest(&ascii_bytes))
  }
}

/// An implementation of [`Hasher`] that uses the `sha-256` hash function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Sha256Hasher {
  pub const ALG_NAME: &'static str = "sha-256";

  /// Creates a new [`Sha256Hasher`].
  pub fn new() -> Self {
    Self
  }
}

#[cfg(feature = "sha")]
impl Hasher for Sha256Hasher {
  fn digest(&self, input: &[u8]) -> Vec<u8> {
    let mut digest: [u8; crypto::hashes::sha::SHA256_LEN] = Default::default();
    crypto::hashes::sha::SHA256(input, &mut digest);
    digest.to_vec()
  }

  fn alg_name(&self) -> &'static str {
    Self::ALG_NAME
  }
}

/// A lookup table of [`Hasher`]s keyed by their [`Hasher::alg_name`].
///
/// Shared by [`crate::recreate_claims`] and the definition validator so both
/// resolve the `_sd_alg` claim the same way.
#[derive(Default)]
pub struct HasherRegistry {
  hashers: BTreeMap<String, Box<dyn Hasher>>,
}

impl HasherRegistry {
  /// Creates an empty registry.
  pub fn new() -> Self {
    Self { hashers: BTreeMap::new() }
  }

  /// Creates a registry pre-populated with [`Sha256Hasher`].
  #[cfg(feature = "sha")]
  pub fn with_sha256() -> Self {
    let mut registry = Self::new();
    registry.add(Box::new(Sha256Hasher::new()));
    registry
  }

  /// Registers `hasher`, replacing any previous hasher for the same
  /// [`Hasher::alg_name`] and returning it.
  pub fn add(&mut self, hasher: Box<dyn Hasher>) -> Option<Box<dyn Hasher>> {
    self.hashers.insert(hasher.alg_name().to_string(), hasher)
  }

  /// Removes the hasher registered for `alg`, if any.
  pub fn remove(&mut self, alg: &str) -> Option<Box<dyn Hasher>> {
    self.hashers.remove(alg)
  }

  /// Looks up the hasher for `alg`.
  ///
  /// ## Error
  /// Returns [`Error::UnsupportedAlgorithm`] if no hasher is registered.
  pub fn get(&self, alg: &str) -> Result<&dyn Hasher, Error> {
    self
      .hashers
      .get(alg)
      .map(AsRef::as_ref)
      .ok_or_else(|| Error::UnsupportedAlgorithm(alg.to_string()))
  }
}

#[cfg(feature = "sha")]
impl Default for HasherRegistry {
  fn default() -> Self {
    Self::with_sha256()
  }
}
