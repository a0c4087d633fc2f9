//! Selective Disclosure JWT (SD-JWT) and SD-JWT VC core library.
//!
//! Builds and consumes the selective-disclosure mechanism of
//! <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-07.html>:
//! marking claims concealable at issuance ([`builder`]/[`encoder`]),
//! recreating them from a holder-presented disclosure set ([`decoder`]),
//! and checking a recreated payload against a declarative credential
//! definition ([`definition`]).

mod builder;
mod claim_path;
mod codec;
mod decoder;
mod decoy;
mod definition;
mod disclosable;
mod disclosure;
mod encoder;
mod error;
mod hasher;
mod jwt;
mod key_binding_jwt_claims;
mod salt;
mod sd_jwt;
mod signer;

pub use builder::*;
pub use claim_path::ClaimPath;
pub use claim_path::ClaimPathElement;
pub use decoder::RecreatedClaims;
pub use decoder::UnusedDisclosurePolicy;
pub use decoder::recreate_claims;
pub use decoder::recreate_claims_with_visitor;
pub use decoy::DecoyGenerator;
pub use decoy::RandDecoyGenerator;
pub use definition::recreate_and_validate;
pub use definition::validate;
pub use definition::DefinitionArray;
pub use definition::DefinitionEntry;
pub use definition::DefinitionNode;
pub use definition::DefinitionObject;
pub use definition::Disclosability;
pub use definition::SdJwtDefinition;
pub use definition::ValidationResult;
pub use definition::Violation;
pub use definition::DEFAULT_WELL_KNOWN_CLAIMS;
pub use disclosable::object_from_json;
pub use disclosable::set_minimum_digests;
pub use disclosable::Disclosable;
pub use disclosable::DisclosableArray;
pub use disclosable::DisclosableElement;
pub use disclosable::DisclosableObject;
pub use disclosable::DisclosableValue;
pub use disclosure::Disclosure;
pub use disclosure::RESERVED_CLAIM_NAMES;
pub use encoder::create_sd_jwt;
pub use error::Error;
pub use error::Result;
pub use hasher::Hasher;
pub use hasher::HasherRegistry;
#[cfg(feature = "sha")]
pub use hasher::Sha256Hasher;
pub use jwt::FlattenedJwsJson;
pub use jwt::Jwt;
pub use jwt::JwsJson;
pub use jwt::JwsSignature;
pub use key_binding_jwt_claims::KeyBindingJwt;
pub use key_binding_jwt_claims::KeyBindingJwtClaims;
pub use key_binding_jwt_claims::RequiredKeyBinding;
pub use salt::RandSaltProvider;
pub use salt::SaltProvider;
pub use salt::DEFAULT_SALT_SIZE;
pub use sd_jwt::SdJwt;
pub use sd_jwt::SdJwtClaims;
pub use sd_jwt::SD_JWT_HEADER_TYP;
pub use signer::JsonObject;
pub use signer::JwtSignatureVerifier;
pub use signer::JwtSigner;
