// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use rand::Rng;

use crate::codec;
use crate::Disclosure;
use crate::Hasher;
use crate::SaltProvider;

/// Generates decoy digests: hashes of random, never-disclosed values added
/// to `_sd` arrays (and to arrays, as `{"...": digest}` entries) so an
/// observer cannot tell the real count of selectively disclosable claims
/// from the digest count alone.
pub trait DecoyGenerator: Sync + Send {
  /// Produces `n` decoy digests under `hasher`.
  fn generate(&self, hasher: &dyn Hasher, salt_provider: &dyn SaltProvider, n: usize) -> Vec<String>;
}

/// The production [`DecoyGenerator`]: each decoy is the digest of a
/// [`Disclosure`] built from random salt, random claim name (for object
/// properties) and a random string value -- structurally indistinguishable
/// from a real disclosure's digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandDecoyGenerator {
  array_entry: bool,
}

impl RandDecoyGenerator {
  /// Creates a generator producing decoys shaped like object-property
  /// disclosures.
  pub fn for_object() -> Self {
    Self { array_entry: false }
  }

  /// Creates a generator producing decoys shaped like array-element
  /// disclosures.
  pub fn for_array() -> Self {
    Self { array_entry: true }
  }
}

impl DecoyGenerator for RandDecoyGenerator {
  fn generate(&self, hasher: &dyn Hasher, salt_provider: &dyn SaltProvider, n: usize) -> Vec<String> {
    (0..n)
      .map(|_| {
        let mut rng = rand::thread_rng();
        let salt = salt_provider.next();
        let value_len = rng.gen_range(20..=100);
        let value = codec::encode((0..value_len).map(|_| rng.gen::<u8>()).collect::<Vec<u8>>());
        let disclosure = if self.array_entry {
          Disclosure::array_element(salt, value.into())
        } else {
          let name_len = rng.gen_range(4..=10);
          let name = codec::encode((0..name_len).map(|_| rng.gen::<u8>()).collect::<Vec<u8>>());
          // A random name could in principle collide with a reserved claim name; retry with a
          // plain value-only fallback rather than propagating an error from a decoy.
          Disclosure::object_property(salt.clone(), name, value.clone().into())
            .unwrap_or_else(|_| Disclosure::array_element(salt, value.into()))
        };
        hasher.encoded_digest(&disclosure.encode())
      })
      .collect()
  }
}
