//! Stand-in Okta authorization server for adapter tests

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::now_unix;

pub(crate) const KEY_ID: &str = "portal-test-key";
pub(crate) const CLIENT_ID: &str = "0oa-client";
pub(crate) const TOKEN_PATH: &str = "/oauth2/v1/token";
pub(crate) const KEYS_PATH: &str = "/oauth2/v1/keys";

const PRIVATE_KEY_PEM: &str = include_str!("testdata/rsa_private.pem");

/// Public half of `PRIVATE_KEY_PEM`, base64url
const MODULUS: &str = "rHARhC2nScwBRdjXmqvB2XUGRtczvJeuyIFuPGGOp7eULX6UbmJt-LApe7EpbYF3M4CxBAp33TiszUXUNHbOMec0jauA-yZ14qjwvpFVNykqhgGLTQgQ0oIpxb4cGj20ZM5tZ9xp2DVfqZeOMczwAfVFF_Hc_bSV-4t_jaTzydt2RZwPT2R2-rPYqEY_H8nPVOWnzjnSM4q1Q8u-Nz3WyK0os74v5NJywQhSDb0KoFXWMd_pSv0nhDdZQqHOuk3_0ImmHwNBpe5uD4Ambk1MO7f7qxyG-IX1s9wGxLRDnViMedAL-Td-v73cUxQhPYuO4GEUrRxYvCz9w8O17n7ZqQ";
const EXPONENT: &str = "AQAB";

/// Key set publishing the test key under each of `kids`
pub(crate) fn jwks(kids: &[&str]) -> Value {
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": kid,
                "n": MODULUS,
                "e": EXPONENT
            })
        })
        .collect();
    json!({ "keys": keys })
}

/// ID token claims for Jane Doe issued by `issuer` to the test client
pub(crate) fn id_claims(issuer: &str) -> Value {
    json!({
        "iss": issuer,
        "aud": CLIENT_ID,
        "sub": "00u1jane",
        "name": "Jane Doe",
        "email": "jane@x.com",
        "groups": ["Everyone", "Content Editors"],
        "iat": now_unix(),
        "exp": now_unix() + 3600
    })
}

/// RS256-sign `claims` with the test key
pub(crate) fn sign_id_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Body of a successful token endpoint response
pub(crate) fn token_response(access_token: &str, id_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "openid profile email",
        "id_token": id_token
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Serve the test key set from the keys endpoint
pub(crate) async fn mount_jwks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(&[KEY_ID])))
        .mount(server)
        .await;
}
