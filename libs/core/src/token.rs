use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::LeanIxError;

/// `expires_in` value of a client that never authenticated.
pub const NEVER_AUTHENTICATED: i64 = -1;

/// OAuth2 access token as returned by the LeanIX token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessToken {
    pub access_token: String,
    pub expired: bool,
    pub expires_in: i64,
    pub scope: String,
    pub token_type: String,
}

impl Default for AccessToken {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            expired: true,
            expires_in: NEVER_AUTHENTICATED,
            scope: String::new(),
            token_type: String::new(),
        }
    }
}

impl AccessToken {
    pub fn is_default(&self) -> bool {
        self.expires_in == NEVER_AUTHENTICATED
    }

    /// Parses a token endpoint body; `access_token` and a non-negative
    /// `expires_in` are required.
    pub fn from_token_response(body: &str) -> Result<Self, LeanIxError> {
        let response: TokenResponse = serde_json::from_str(body).map_err(LeanIxError::Payload)?;
        if response.expires_in < 0 {
            return Err(LeanIxError::Payload(serde::de::Error::custom(format!(
                "negative expires_in {}",
                response.expires_in
            ))));
        }
        Ok(Self {
            access_token: response.access_token,
            expired: response.expired,
            expires_in: response.expires_in,
            scope: response.scope,
            token_type: response.token_type,
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    token_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Permission {
    pub workspace_id: String,
    pub workspace_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Principal {
    pub permission: Permission,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a LeanIX access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtClaims {
    pub exp: i64,
    #[serde(rename = "instanceUrl")]
    pub instance_url: String,
    pub iss: String,
    pub jti: String,
    pub sub: String,
    pub principal: Principal,
}

impl Default for JwtClaims {
    fn default() -> Self {
        Self {
            exp: -1,
            instance_url: String::new(),
            iss: String::new(),
            jti: String::new(),
            sub: String::new(),
            principal: Principal::default(),
        }
    }
}

impl JwtClaims {
    /// Parses `instance_url`, the base of every GraphQL call.
    pub fn instance_url(&self) -> Result<Url, LeanIxError> {
        Url::parse(&self.instance_url)
            .map_err(|_| LeanIxError::InvalidInstanceUrl(self.instance_url.clone()))
    }
}

/// Decodes the claims of `token` without verifying its signature.
///
/// The token is only ever sent back to the instance that issued it, so the
/// claims are read for routing (instance url, workspace) and not trusted for
/// authorization.
pub fn decode_claims(token: &str) -> Result<JwtClaims, LeanIxError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<JwtClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(LeanIxError::Jwt)
}

/// Token and claims published together after each successful authentication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: AccessToken,
    pub claims: JwtClaims,
}
