use crate::error::{Result, WalletError};
use crate::rest::BackendHttpClient;
use crate::types::*;

impl BackendHttpClient {
    // --- Session ---

    /// POST login - Exchange username and password for an auth token.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.post("login", request, None)
            .await
            .map_err(|e| match e {
                WalletError::Http {
                    status: 400 | 401 | 404,
                    ..
                } => WalletError::InvalidCredentials,
                other => other,
            })
    }

    /// POST signup - Register a new account holding the given secret key.
    pub async fn signup(&self, request: &SignupRequest) -> Result<TokenResponse> {
        self.post("signup", request, None)
            .await
            .map_err(|e| match e {
                WalletError::Http { status: 400, message } if message.contains("already exists") => {
                    WalletError::UsernameTaken
                }
                other => other,
            })
    }

    /// POST recover - Reset the password of the account owning the secret key.
    pub async fn recover(&self, request: &RecoverRequest) -> Result<TokenResponse> {
        self.post("recover", request, None)
            .await
            .map_err(|e| match e {
                WalletError::Http {
                    status: 400 | 404,
                    ..
                } => WalletError::UnknownPublicKey,
                other => other,
            })
    }

    /// POST logout/ - Invalidate the auth token.
    pub async fn logout(&self, token: &str) -> Result<MessageResponse> {
        self.post("logout/", &serde_json::json!({}), Some(token))
            .await
    }

    // --- Lookup ---

    /// POST check-public-key - Whether an account exists for a public key.
    ///
    /// `public_key` is the JSON byte array form produced by
    /// [`crate::keys::public_key_payload`].
    pub async fn check_public_key(&self, public_key: &str) -> Result<bool> {
        let request = CheckPublicKeyRequest {
            public_key: public_key.to_string(),
        };
        match self
            .post::<_, MessageResponse>("check-public-key", &request, None)
            .await
        {
            Ok(_) => Ok(true),
            Err(WalletError::Http { status: 400, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// GET get-user - Username of the token's owner.
    pub async fn get_user(&self, token: &str) -> Result<UserInfo> {
        self.get("get-user", Some(token))
            .await
            .map_err(|e| match e {
                WalletError::Http {
                    status: 401 | 403, ..
                } => WalletError::NoSession,
                other => other,
            })
    }
}
