//! Sign-in, sign-up and sign-out flows.
//!
//! These produce the credential pair the pipeline consumes: a successful
//! login writes both credentials, sign-out removes both.

use {
    serde::{Deserialize, Deserializer, Serialize},
    storefront_credentials::CredentialPair,
    tracing::{debug, info},
};

use crate::{endpoints, error::ApiError, pipeline::ApiClient};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid token response")]
    InvalidTokenResponse,

    #[error("failed to persist credentials: {0}")]
    Persist(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
    fn persist(e: anyhow::Error) -> Self {
        Self::Persist(e.into())
    }
}

/// Account returned by the login endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Option<String>,
    refresh: Option<String>,
    #[serde(default, deserialize_with = "lenient_user")]
    user: Option<User>,
}

/// A `user` object we cannot read must not cost the issued credentials.
fn lenient_user<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<User>, D::Error> {
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            debug!(error = %e, "ignoring unreadable user in token response");
            Ok(None)
        },
    }
}

#[derive(Debug, Serialize)]
struct SignUp<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
}

/// Identity asserted by Google sign-in. Either the ID token (`credential`)
/// or the profile fields are forwarded, whichever the caller has.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl ApiClient {
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Option<User>, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.login(endpoints::SIGN_IN, &body).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        let body = SignUp {
            email,
            password,
            first_name,
            last_name,
        };
        self.login(endpoints::SIGN_UP, &body).await
    }

    pub async fn google_login(
        &self,
        identity: &GoogleIdentity,
    ) -> Result<Option<User>, AuthError> {
        self.login(endpoints::GOOGLE_LOGIN, identity).await
    }

    /// Forget both credentials. No network call.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store().clear().map_err(AuthError::persist)?;
        info!("signed out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub async fn send_password_reset_code(&self, email: &str) -> Result<(), AuthError> {
        self.post(endpoints::SEND_PASSCODE, &serde_json::json!({ "email": email }))
            .await?;
        Ok(())
    }

    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let body = serde_json::json!({
            "email": email,
            "code": code,
            "new_password": new_password,
        });
        self.post(endpoints::RESET_PASSWORD, &body).await?;
        Ok(())
    }

    async fn login<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<User>, AuthError> {
        let resp: TokenResponse = self.post(path, body).await?.json()?;
        let (Some(access), Some(refresh)) = (resp.access, resp.refresh) else {
            return Err(AuthError::InvalidTokenResponse);
        };
        if access.is_empty() || refresh.is_empty() {
            return Err(AuthError::InvalidTokenResponse);
        }

        self.store()
            .write(&CredentialPair::new(access, refresh))
            .map_err(AuthError::persist)?;
        info!(path, "signed in");
        Ok(resp.user)
    }
}
