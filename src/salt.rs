// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use rand::Rng;

use crate::codec;
use crate::Error;

/// Default size, in bytes, of the random data backing a [`Disclosure`](crate::Disclosure)'s salt.
///
/// 30 bytes of randomness base64url-encodes to a 40-character salt, well
/// above the specification's 128-bit-of-entropy floor.
pub const DEFAULT_SALT_SIZE: usize = 30;

/// Supplies the per-disclosure randomness used to defeat dictionary attacks
/// against low-entropy claim values.
///
/// ## Contract
/// Successive calls must be indistinguishable from uniform random and must
/// not repeat with non-negligible probability. Implementations must be safe
/// to call concurrently from independent threads (core operations may be
/// invoked from any thread).
pub trait SaltProvider: Sync + Send {
  /// Returns a freshly generated, base64url-nopad encoded salt.
  fn next(&self) -> String;
}

/// The production [`SaltProvider`], backed by a thread-local CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RandSaltProvider {
  salt_size: usize,
}

impl RandSaltProvider {
  /// Creates a provider generating salts of [`DEFAULT_SALT_SIZE`] bytes.
  pub fn new() -> Self {
    Self { salt_size: DEFAULT_SALT_SIZE }
  }

  /// Creates a provider generating salts of `salt_size` bytes.
  ///
  /// ## Error
  /// Returns [`Error::InvalidSaltSize`] if `salt_size < 16`.
  pub fn with_salt_size(salt_size: usize) -> Result<Self, Error> {
    if salt_size < 16 {
      return Err(Error::InvalidSaltSize);
    }
    Ok(Self { salt_size })
  }
}

impl Default for RandSaltProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl SaltProvider for RandSaltProvider {
  fn next(&self) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..self.salt_size).map(|_| rng.gen()).collect();
    codec::encode(bytes)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn salts_do_not_repeat() {
    let provider = RandSaltProvider::new();
    let a = provider.next();
    let b = provider.next();
    assert_ne!(a, b);
  }

  #[test]
  fn rejects_short_salts() {
    assert!(matches!(RandSaltProvider::with_salt_size(8), Err(Error::InvalidSaltSize)));
  }
}
