// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T> = ::core::result::Result<T, Error>;

/// The flat, non-overlapping error taxonomy used across the crate.
///
/// Every fatal condition named by the specification's error table has a
/// dedicated variant; definition-validation violations are never surfaced
/// through this enum (see [`crate::Violation`]), since they are collected
/// rather than thrown.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[non_exhaustive]
pub enum Error {
  #[error("base64url decoding failed: {0}")]
  MalformedEncoding(String),

  #[error("malformed disclosure: {0}")]
  MalformedDisclosure(String),

  #[error("{0} is a reserved claim name and cannot be disclosed")]
  ReservedClaimName(String),

  #[error("no hasher registered for hashing algorithm {0}")]
  UnsupportedAlgorithm(String),

  #[error("digest {0} is produced by more than one disclosure")]
  NonUniqueDigests(String),

  #[error("disclosure {0} appears more than once in the disclosure set")]
  DuplicateDisclosures(String),

  #[error("claim {0} is already present in the reconstructed object")]
  DuplicateClaim(String),

  #[error("{0} disclosure(s) were never referenced by a digest")]
  UnusedDisclosure(usize),

  #[error("path {0} does not match the shape of the underlying JSON")]
  PathTypeMismatch(String),

  #[error("malformed claim path: {0}")]
  MalformedClaimPath(String),

  #[error("malformed SD-JWT compact serialization: {0}")]
  MalformedSdJwt(String),

  #[error("data type is not expected: {0}")]
  DataTypeMismatch(String),

  #[error("array disclosure object contains keys other than `...`")]
  InvalidArrayDisclosureObject,

  #[error("invalid path: {0}")]
  InvalidPath(String),

  #[error("invalid input: {0}")]
  DeserializationError(String),

  #[error("index {0} is out of bounds for the provided array")]
  IndexOutOfBounds(usize),

  #[error("salt size must be greater or equal to 16 bytes")]
  InvalidSaltSize,

  #[error("signer failed to produce a JWS: {0}")]
  JwsSignerFailure(String),

  #[error("{0}")]
  Unspecified(String),
}
