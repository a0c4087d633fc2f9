// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use josekit::jws::JwsSigner;
use josekit::jws::HS256;
use multibase::Base;
use sd_jwt_core::ClaimPath;
use sd_jwt_core::HasherRegistry;
use sd_jwt_core::JsonObject;
use sd_jwt_core::JwtSigner;
use sd_jwt_core::SdJwt;
use sd_jwt_core::SdJwtBuilder;
use sd_jwt_core::UnusedDisclosurePolicy;
use serde_json::json;
use serde_json::Value;

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

// Values taken from https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-06.html#appendix-A.2
#[tokio::test]
async fn test_complex_structure() {
  let object = json!({
    "verified_claims": {
      "verification": {
        "trust_framework": "de_aml",
        "time": "2012-04-23T18:25Z",
        "verification_process": "f24c6f-6d3f-4ec5-973e-b0d8506f3bc7",
        "evidence": [
          {
            "type": "document",
            "method": "pipp",
            "time": "2012-04-22T11:30Z",
            "document": {
              "type": "idcard",
              "issuer": {
                "name": "Stadt Augsburg",
                "country": "DE"
              },
              "number": "53554554",
              "date_of_issuance": "2010-03-23",
              "date_of_expiry": "2020-03-22"
            }
          },
          "evidence2"
        ]
      },
      "claims": {
        "given_name": "Max",
        "family_name": "Müller",
        "nationalities": [
          "DE"
        ],
        "birthdate": "1956-01-28",
        "place_of_birth": {
          "country": "IS",
          "locality": "Þykkvabæjarklaustur"
        },
        "address": {
          "locality": "Maxstadt",
          "postal_code": "12344",
          "country": "DE",
          "street_address": "Weidenstraße 22"
        }
      }
    },
    "birth_middle_name": "Timotheus",
    "salutation": "Dr.",
    "msisdn": "49123456789"
  });

  let key = b"0123456789ABCDEF0123456789ABCDEF";
  let signer = Hs256Signer { key };

  let sd_jwt: SdJwt = SdJwtBuilder::new(object.clone())
    .unwrap()
    .make_concealable("/verified_claims/verification/time")
    .unwrap()
    .make_concealable("/verified_claims/verification/evidence/0")
    .unwrap()
    .make_concealable("/verified_claims/verification/evidence/1")
    .unwrap()
    .make_concealable("/verified_claims/verification/evidence")
    .unwrap()
    .make_concealable("/verified_claims/claims/place_of_birth/locality")
    .unwrap()
    .make_concealable("/verified_claims/claims")
    .unwrap()
    .finish(&signer, "HS256")
    .await
    .unwrap();

  println!("encoded object: {}", serde_json::to_string_pretty(sd_jwt.claims()).unwrap());

  let presentation = sd_jwt.to_string();
  let sd_jwt: SdJwt = presentation.parse().unwrap();
  let decoded = sd_jwt
    .into_disclosed_claims(&HasherRegistry::with_sha256(), UnusedDisclosurePolicy::Strict)
    .unwrap();

  assert_eq!(Value::Object(decoded.claims), object);
}

#[test]
fn concealed_object_in_array() {
  use sd_jwt_core::create_sd_jwt;
  use sd_jwt_core::object_from_json;
  use sd_jwt_core::recreate_claims;
  use sd_jwt_core::DisclosableValue;
  use sd_jwt_core::RandSaltProvider;
  use sd_jwt_core::Sha256Hasher;

  let nested_object = object_from_json(json!({"test1": 123}).as_object().unwrap().clone());
  let mut nested = DisclosableValue::Obj(nested_object);
  nested.make_concealable(&ClaimPath::root("test1")).unwrap();
  let DisclosableValue::Obj(nested) = nested else { panic!() };

  let hasher = Sha256Hasher::new();
  let salts = RandSaltProvider::new();
  let (nested_payload, mut disclosures) = create_sd_jwt(&nested, &hasher, &salts).unwrap();

  let object = json!({"test2": ["value1", nested_payload]});
  let expected = json!({"test2": ["value1", {"test1": 123}]});

  let mut tree = DisclosableValue::from_value(object);
  tree.make_concealable(&ClaimPath::root("test2").array_element(1)).unwrap();
  let DisclosableValue::Obj(object) = tree else { panic!() };
  let (payload, mut outer_disclosures) = create_sd_jwt(&object, &hasher, &salts).unwrap();
  disclosures.append(&mut outer_disclosures);

  let decoded = recreate_claims(&payload, &disclosures, &HasherRegistry::with_sha256(), UnusedDisclosurePolicy::Strict).unwrap();
  assert_eq!(Value::Object(decoded.claims), expected);
}

// Values taken from https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-06.html#name-example-2-handling-structur
#[test]
fn decode() {
  let sd_jwt = "eyJhbGciOiAiRVMyNTYifQ.eyJfc2QiOiBbIkM5aW5wNllvUmFFWFI0Mjd6WUpQN1FyazFXSF84YmR3T0FfWVVyVW5HUVUiLCAiS3VldDF5QWEwSElRdlluT1ZkNTloY1ZpTzlVZzZKMmtTZnFZUkJlb3d2RSIsICJNTWxkT0ZGekIyZDB1bWxtcFRJYUdlcmhXZFVfUHBZZkx2S2hoX2ZfOWFZIiwgIlg2WkFZT0lJMnZQTjQwVjd4RXhad1Z3ejd5Um1MTmNWd3Q1REw4Ukx2NGciLCAiWTM0em1JbzBRTExPdGRNcFhHd2pCZ0x2cjE3eUVoaFlUMEZHb2ZSLWFJRSIsICJmeUdwMFdUd3dQdjJKRFFsbjFsU2lhZW9iWnNNV0ExMGJRNTk4OS05RFRzIiwgIm9tbUZBaWNWVDhMR0hDQjB1eXd4N2ZZdW8zTUhZS08xNWN6LVJaRVlNNVEiLCAiczBCS1lzTFd4UVFlVTh0VmxsdE03TUtzSVJUckVJYTFQa0ptcXhCQmY1VSJdLCAiaXNzIjogImh0dHBzOi8vaXNzdWVyLmV4YW1wbGUuY29tIiwgImlhdCI6IDE2ODMwMDAwMDAsICJleHAiOiAxODgzMDAwMDAwLCAiYWRkcmVzcyI6IHsiX3NkIjogWyI2YVVoelloWjdTSjFrVm1hZ1FBTzN1MkVUTjJDQzFhSGhlWnBLbmFGMF9FIiwgIkF6TGxGb2JrSjJ4aWF1cFJFUHlvSnotOS1OU2xkQjZDZ2pyN2ZVeW9IemciLCAiUHp6Y1Z1MHFiTXVCR1NqdWxmZXd6a2VzRDl6dXRPRXhuNUVXTndrclEtayIsICJiMkRrdzBqY0lGOXJHZzhfUEY4WmN2bmNXN3p3Wmo1cnlCV3ZYZnJwemVrIiwgImNQWUpISVo4VnUtZjlDQ3lWdWIyVWZnRWs4anZ2WGV6d0sxcF9KbmVlWFEiLCAiZ2xUM2hyU1U3ZlNXZ3dGNVVEWm1Xd0JUdzMyZ25VbGRJaGk4aEdWQ2FWNCIsICJydkpkNmlxNlQ1ZWptc0JNb0d3dU5YaDlxQUFGQVRBY2k0MG9pZEVlVnNBIiwgInVOSG9XWWhYc1poVkpDTkUyRHF5LXpxdDd0NjlnSkt5NVFhRnY3R3JNWDQiXX0sICJfc2RfYWxnIjogInNoYS0yNTYifQ.IjE4EfnYu1RZ1uz6yqtFh5Lppq36VC4VeSr-hLDFpZ9zqBNmMrT5JHLLXTuMJqKQp3NIzDsLaft4GK5bYyfqhg~WyJHMDJOU3JRZmpGWFE3SW8wOXN5YWpBIiwgInJlZ2lvbiIsICJcdTZlMmZcdTUzM2EiXQ~WyJsa2x4RjVqTVlsR1RQVW92TU5JdkNBIiwgImNvdW50cnkiLCAiSlAiXQ~";
  let sd_jwt: SdJwt = SdJwt::parse(sd_jwt).unwrap();
  let decoded = sd_jwt
    .into_disclosed_claims(&HasherRegistry::with_sha256(), UnusedDisclosurePolicy::Strict)
    .unwrap();
  let expected_object = json!({
    "address": {
      "country": "JP",
      "region": "港区"
    },
    "iss": "https://issuer.example.com",
    "iat": 1683000000,
    "exp": 1883000000
  })
  .as_object()
  .unwrap()
  .clone();
  assert_eq!(expected_object, decoded.claims);
  assert!(decoded.disclosures_per_claim.contains_key(&ClaimPath::root("address").claim("region")));
  assert!(decoded.disclosures_per_claim.contains_key(&ClaimPath::root("address").claim("country")));
}
