//! AWS Cognito user pool client.
//!
//! Talks to the Cognito Identity Provider JSON API directly with `reqwest`:
//! every operation is a `POST /` with an `X-Amz-Target` header naming the
//! action. Only unauthenticated public-client actions are used, so no AWS
//! request signing is involved.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AuthError, IdentityProvider, Session};

/// Prefix for the `X-Amz-Target` header.
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Error kind for a sign-in against an account awaiting its code.
const USER_NOT_CONFIRMED: &str = "UserNotConfirmedException";

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpRequest<'a> {
    client_id: &'a str,
    username: &'a str,
    password: &'a str,
    user_attributes: Vec<AttributeType<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_confirmed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfirmSignUpRequest<'a> {
    client_id: &'a str,
    username: &'a str,
    confirmation_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Error body Cognito returns with every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

pub struct CognitoIdentityProvider {
    client: Client,
    endpoint: String,
    client_id: String,
}

impl CognitoIdentityProvider {
    /// Client for the regional Cognito endpoint.
    pub fn new(region: &str, client_id: impl Into<String>) -> Result<Self, AuthError> {
        Self::with_endpoint(
            format!("https://cognito-idp.{}.amazonaws.com", region),
            client_id,
        )
    }

    /// Client for an explicit endpoint (local emulators, tests).
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        })
    }

    /// Invoke one Cognito action. A rejection from the service is turned into
    /// an `AuthError` by `reject`, which receives the service's message.
    /// An unconfirmed account is always `NotConfirmed`.
    async fn call<B, T>(
        &self,
        action: &str,
        body: &B,
        reject: fn(String) -> AuthError,
    ) -> Result<T, AuthError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        debug!(action, "Calling Cognito");
        let payload = serde_json::to_vec(body)
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .header(header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                AuthError::InvalidResponse(format!("Failed to parse {} response: {}", action, e))
            });
        }

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(err) => {
                debug!(action, kind = %short_kind(&err.kind), %status, "Cognito rejected request");
                let kind = short_kind(&err.kind);
                let message = match (err.message.is_empty(), kind.is_empty()) {
                    (false, _) => err.message,
                    (true, false) => kind.to_string(),
                    (true, true) => status.to_string(),
                };
                if kind == USER_NOT_CONFIRMED {
                    return Err(AuthError::NotConfirmed(message));
                }
                Err(reject(message))
            }
            Err(_) => Err(AuthError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                truncate_body(&text)
            ))),
        }
    }

    async fn initiate_auth(
        &self,
        flow: &str,
        parameters: HashMap<&str, &str>,
    ) -> Result<AuthenticationResult, AuthError> {
        let request = InitiateAuthRequest {
            auth_flow: flow,
            client_id: &self.client_id,
            auth_parameters: parameters,
        };
        let response: InitiateAuthResponse = self
            .call("InitiateAuth", &request, AuthError::Authentication)
            .await?;

        match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => Ok(result),
            (None, Some(challenge)) => Err(AuthError::Authentication(format!(
                "Additional sign-in step required: {}",
                challenge
            ))),
            (None, None) => Err(AuthError::InvalidResponse(
                "InitiateAuth returned neither tokens nor a challenge".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let request = SignUpRequest {
            client_id: &self.client_id,
            username: email,
            password,
            user_attributes: vec![AttributeType {
                name: "email",
                value: email,
            }],
        };
        let response: SignUpResponse = self
            .call("SignUp", &request, AuthError::Registration)
            .await?;
        debug!(user_confirmed = response.user_confirmed, "Sign-up accepted");
        Ok(())
    }

    async fn confirm(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let request = ConfirmSignUpRequest {
            client_id: &self.client_id,
            username: email,
            confirmation_code: code,
        };
        let _: IgnoredAny = self
            .call("ConfirmSignUp", &request, AuthError::Confirmation)
            .await?;
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let parameters = HashMap::from([("USERNAME", email), ("PASSWORD", password)]);
        let result = self.initiate_auth("USER_PASSWORD_AUTH", parameters).await?;

        let session = match result {
            AuthenticationResult {
                id_token: Some(id),
                access_token: Some(access),
                refresh_token: Some(refresh),
            } => Session::new(id, access, refresh),
            _ => {
                return Err(AuthError::InvalidResponse(
                    "Sign-in response is missing tokens".to_string(),
                ))
            }
        };
        info!("Signed in with Cognito");
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let parameters = HashMap::from([("REFRESH_TOKEN", refresh_token)]);
        let result = self.initiate_auth("REFRESH_TOKEN_AUTH", parameters).await?;

        // Cognito only returns a refresh token when rotation is enabled.
        match (result.id_token, result.access_token) {
            (Some(id), Some(access)) => Ok(Session::new(
                id,
                access,
                result
                    .refresh_token
                    .unwrap_or_else(|| refresh_token.to_string()),
            )),
            _ => Err(AuthError::InvalidResponse(
                "Refresh response is missing tokens".to_string(),
            )),
        }
    }
}

/// `__type` is sometimes namespaced (`com.amazonaws...#NotAuthorizedException`).
fn short_kind(kind: &str) -> &str {
    kind.rsplit('#').next().unwrap_or(kind)
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}
