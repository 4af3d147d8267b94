//! Account flows: the create/confirm/recover wizard and the backend calls
//! that turn a derived keypair into an authenticated [`Session`].

use std::fmt;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, warn};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::keys::{derive_keypair, generate_mnemonic, phrases_match, public_key_payload};
use crate::rest::BackendHttpClient;
use crate::session::{decode_secret_key, encode_secret_key, Session, SessionStore};
use crate::types::{LoginRequest, RecoverRequest, SignupRequest, UserInfo};
use crate::utils::shorten_address;

/// Minimum password length accepted at signup and recovery.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Check a new password and its confirmation.
pub fn validate_password(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(WalletError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

/// Screens of the account wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStep {
    Login,
    /// Shows a freshly generated phrase.
    Create,
    /// User re-enters the phrase.
    Confirm,
    /// Username/password for the new account.
    CreateFinish,
    /// User enters an existing phrase.
    Recover,
    /// New password for the recovered account.
    RecoverFinish,
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStep::Login => "login",
            AuthStep::Create => "create",
            AuthStep::Confirm => "confirm",
            AuthStep::CreateFinish => "create-finish",
            AuthStep::Recover => "recover",
            AuthStep::RecoverFinish => "recover-finish",
        };
        f.write_str(name)
    }
}

/// State machine behind account creation and recovery.
///
/// `CreateFinish` is reachable only through [`AuthWizard::confirm_phrase`]
/// with the exact generated phrase, and `RecoverFinish` only through
/// [`AuthWizard::accept_recovery`] once the backend knows the derived key.
pub struct AuthWizard {
    step: AuthStep,
    history: Vec<AuthStep>,
    phrase: Option<Vec<String>>,
    keypair: Option<Keypair>,
}

impl AuthWizard {
    pub fn new() -> Self {
        Self {
            step: AuthStep::Login,
            history: Vec::new(),
            phrase: None,
            keypair: None,
        }
    }

    pub fn step(&self) -> AuthStep {
        self.step
    }

    /// The generated phrase, once `Create` has been entered.
    pub fn phrase(&self) -> Option<&[String]> {
        self.phrase.as_deref()
    }

    /// Public key derived so far, if any.
    pub fn pubkey(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(|k| k.pubkey())
    }

    /// Navigate explicitly. Only `Login`, `Create` and `Recover` can be
    /// entered from anywhere; `Confirm` only from `Create`.
    pub fn goto(&mut self, to: AuthStep) -> Result<()> {
        let allowed = match to {
            AuthStep::Login | AuthStep::Create | AuthStep::Recover => true,
            AuthStep::Confirm => self.step == AuthStep::Create,
            AuthStep::CreateFinish | AuthStep::RecoverFinish => false,
        };
        if !allowed {
            return Err(WalletError::InvalidStep {
                from: self.step,
                to,
            });
        }
        if to == AuthStep::Create && self.phrase.is_none() {
            self.phrase = Some(generate_mnemonic()?);
        }
        if matches!(to, AuthStep::Login | AuthStep::Create | AuthStep::Recover) {
            self.keypair = None;
        }
        self.enter(to);
        Ok(())
    }

    /// Return to the previous step. Stays put at the first step.
    pub fn back(&mut self) -> AuthStep {
        if let Some(previous) = self.history.pop() {
            if matches!(self.step, AuthStep::CreateFinish | AuthStep::RecoverFinish) {
                self.keypair = None;
            }
            self.step = previous;
        }
        self.step
    }

    /// Compare the re-entered phrase with the generated one. On an exact
    /// match the keypair is derived and the wizard moves to `CreateFinish`;
    /// otherwise the step is unchanged.
    pub fn confirm_phrase(&mut self, entered: &[String]) -> Result<Pubkey> {
        self.expect_step(AuthStep::Confirm, AuthStep::CreateFinish)?;
        let expected = self.phrase.as_deref().ok_or(WalletError::InvalidStep {
            from: self.step,
            to: AuthStep::CreateFinish,
        })?;
        if !phrases_match(expected, entered) {
            return Err(WalletError::PhraseMismatch);
        }
        let keypair = derive_keypair(expected)?;
        let pubkey = keypair.pubkey();
        self.keypair = Some(keypair);
        self.enter(AuthStep::CreateFinish);
        info!(wallet = %shorten_address(&pubkey.to_string()), "phrase confirmed");
        Ok(pubkey)
    }

    /// Derive the keypair for a recovery phrase. The wizard stays at
    /// `Recover` until [`AuthWizard::accept_recovery`].
    pub fn derive_recovery(&mut self, words: &[String]) -> Result<Pubkey> {
        self.expect_step(AuthStep::Recover, AuthStep::RecoverFinish)?;
        let keypair = derive_keypair(words)?;
        let pubkey = keypair.pubkey();
        self.keypair = Some(keypair);
        Ok(pubkey)
    }

    /// Move to `RecoverFinish` if the backend recognized the derived key.
    pub fn accept_recovery(&mut self, registered: bool) -> Result<()> {
        self.expect_step(AuthStep::Recover, AuthStep::RecoverFinish)?;
        if self.keypair.is_none() {
            return Err(WalletError::InvalidStep {
                from: self.step,
                to: AuthStep::RecoverFinish,
            });
        }
        if !registered {
            self.keypair = None;
            return Err(WalletError::UnknownPublicKey);
        }
        self.enter(AuthStep::RecoverFinish);
        Ok(())
    }

    /// Hand out the derived keypair at a finishing step.
    pub fn into_keypair(self) -> Result<Keypair> {
        match (self.step, self.keypair) {
            (AuthStep::CreateFinish | AuthStep::RecoverFinish, Some(keypair)) => Ok(keypair),
            (from, _) => Err(WalletError::InvalidStep {
                from,
                to: AuthStep::Login,
            }),
        }
    }

    fn expect_step(&self, expected: AuthStep, to: AuthStep) -> Result<()> {
        if self.step != expected {
            return Err(WalletError::InvalidStep {
                from: self.step,
                to,
            });
        }
        Ok(())
    }

    fn enter(&mut self, to: AuthStep) {
        if to != self.step {
            self.history.push(self.step);
            self.step = to;
        }
    }
}

impl Default for AuthWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuthWizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthWizard")
            .field("step", &self.step)
            .field("history", &self.history)
            .field("has_phrase", &self.phrase.is_some())
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Backend orchestration
// ---------------------------------------------------------------------------

/// Turns credentials and derived keypairs into stored sessions.
#[derive(Debug, Clone)]
pub struct AuthService {
    backend: BackendHttpClient,
    store: SessionStore,
}

impl AuthService {
    pub fn new(backend: BackendHttpClient, store: SessionStore) -> Self {
        Self { backend, store }
    }

    /// Backend client and session store from configuration.
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        Ok(Self::new(
            BackendHttpClient::with_timeout(&config.backend_url, config.request_timeout)?,
            SessionStore::new(&config.session_path),
        ))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Log in with username and password.
    ///
    /// The secret key comes from the backend response when present and from
    /// the locally stored session otherwise.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response = self
            .backend
            .login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        let keypair = match response.private_key.as_deref() {
            Some(secret) => decode_secret_key(secret)?,
            None => match self.store.load() {
                Ok(Some(previous)) => previous.into_keypair(),
                Ok(None) => return Err(WalletError::MissingSecretKey),
                Err(e) => {
                    warn!(error = %e, "stored session unreadable");
                    return Err(WalletError::MissingSecretKey);
                }
            },
        };

        let session = Session::new(keypair, Some(response.token));
        self.store.save(&session)?;
        info!(username, "logged in");
        Ok(session)
    }

    /// Register a new account for a confirmed keypair.
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
        keypair: Keypair,
    ) -> Result<Session> {
        validate_password(password, confirmation)?;
        let response = self
            .backend
            .signup(&SignupRequest {
                username: username.to_string(),
                password: password.to_string(),
                private_key: encode_secret_key(&keypair).to_string(),
            })
            .await?;

        let session = Session::new(keypair, Some(response.token));
        self.store.save(&session)?;
        info!(username, wallet = %shorten_address(&session.pubkey().to_string()), "account created");
        Ok(session)
    }

    /// Whether the backend has an account for `pubkey`.
    pub async fn is_registered(&self, pubkey: &Pubkey) -> Result<bool> {
        self.backend
            .check_public_key(&public_key_payload(pubkey))
            .await
    }

    /// Check the wizard's derived key with the backend and advance it to
    /// `RecoverFinish` on success.
    pub async fn check_recovery(&self, wizard: &mut AuthWizard) -> Result<()> {
        let pubkey = wizard.pubkey().ok_or(WalletError::InvalidStep {
            from: wizard.step(),
            to: AuthStep::RecoverFinish,
        })?;
        let registered = self.is_registered(&pubkey).await?;
        wizard.accept_recovery(registered)
    }

    /// Set a new password for the account owning `keypair`.
    pub async fn recover(
        &self,
        password: &str,
        confirmation: &str,
        keypair: Keypair,
    ) -> Result<Session> {
        validate_password(password, confirmation)?;
        let response = self
            .backend
            .recover(&RecoverRequest {
                password: password.to_string(),
                private_key: encode_secret_key(&keypair).to_string(),
            })
            .await?;

        let session = Session::new(keypair, Some(response.token));
        self.store.save(&session)?;
        info!(wallet = %shorten_address(&session.pubkey().to_string()), "wallet recovered");
        Ok(session)
    }

    /// Invalidate the backend token and remove the stored session.
    ///
    /// The local session is cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.store.load()? {
            if let Some(token) = session.token() {
                if let Err(e) = self.backend.logout(token).await {
                    warn!(error = %e, "backend logout failed");
                }
            }
        }
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }

    /// Username for the stored session's token.
    pub async fn current_user(&self) -> Result<UserInfo> {
        let session = self.store.require()?;
        let token = session.token().ok_or(WalletError::NoSession)?;
        self.backend.get_user(token).await
    }
}
