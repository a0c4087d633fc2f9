// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use async_trait::async_trait;
use josekit::jws::JwsSigner;
use josekit::jws::HS256;
use multibase::Base;
use sd_jwt_core::JsonObject;
use sd_jwt_core::JwtSigner;
use sd_jwt_core::SdJwt;
use sd_jwt_core::SdJwtBuilder;
use serde_json::json;

/// Adapts a `josekit` HMAC signer to this crate's [`JwtSigner`] trait.
///
/// A [`JwtSigner`] is expected to return the literal text of the compact
/// serialization's signature segment, not raw signature bytes, so this
/// builds the `header.payload` signing input itself and base64url-encodes
/// the raw HMAC output before handing it back.
struct Hs256Signer {
  key: &'static [u8],
}

#[async_trait]
impl JwtSigner for Hs256Signer {
  type Error = josekit::JoseError;

  async fn sign(&self, header: &JsonObject, payload: &JsonObject) -> Result<Vec<u8>, Self::Error> {
    let header_b64 = Base::Base64Url.encode(serde_json::to_vec(header).expect("header serializes"));
    let payload_b64 = Base::Base64Url.encode(serde_json::to_vec(payload).expect("payload serializes"));
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signer = HS256.signer_from_bytes(self.key)?;
    let signature = signer.sign(signing_input.as_bytes())?;
    Ok(Base::Base64Url.encode(signature).into_bytes())
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  let object = json!({
    "sub": "user_42",
    "given_name": "John",
    "family_name": "Doe",
    "email": "johndoe@example.com",
    "phone_number": "+1-202-555-0101",
    "phone_number_verified": true,
    "address": {
      "street_address": "123 Main St",
      "locality": "Anytown",
      "region": "Anystate",
      "country": "US"
    },
    "birthdate": "1940-01-01",
    "updated_at": 1570000000,
    "nationalities": [
      "US",
      "DE"
    ]
  });

  let key = b"0123456789ABCDEF0123456789ABCDEF";
  let signer = Hs256Signer { key };

  let sd_jwt: SdJwt = SdJwtBuilder::new(object)?
    .make_concealable("/email")?
    .make_concealable("/phone_number")?
    .make_concealable("/address/street_address")?
    .make_concealable("/address")?
    .make_concealable("/nationalities/0")?
    .finish(&signer, "HS256")
    .await?;

  println!("encoded object: {}", serde_json::to_string_pretty(sd_jwt.claims())?);

  let presentation = sd_jwt.to_string();

  // Decoding the SD-JWT. Verifying the signature is outside the scope of
  // this library; a caller would check `sd_jwt.header()`/`sd_jwt.claims()`
  // against the JWS segments of `presentation` with whichever
  // `JwtSignatureVerifier` fits their keys.
  let sd_jwt: SdJwt = presentation.parse()?;
  let decoded = sd_jwt.into_disclosed_claims(&Default::default(), Default::default())?;
  println!("decoded object: {}", serde_json::to_string_pretty(&decoded.claims)?);
  Ok(())
}
