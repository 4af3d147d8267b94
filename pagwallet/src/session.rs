//! Active session: the single signing keypair plus the backend auth token,
//! persisted to a local file between invocations.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, WalletError};
use crate::utils::shorten_address;

/// The authenticated wallet session.
///
/// Holds exactly one secret key; every signing path borrows it from here.
pub struct Session {
    keypair: Keypair,
    token: Option<String>,
}

impl Session {
    pub fn new(keypair: Keypair, token: Option<String>) -> Self {
        Self { keypair, token }
    }

    /// Rebuild a session from a base64-encoded 64-byte secret key.
    pub fn from_encoded_secret(secret_b64: &str, token: Option<String>) -> Result<Self> {
        Ok(Self::new(decode_secret_key(secret_b64)?, token))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn into_keypair(self) -> Keypair {
        self.keypair
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Base64 of the 64-byte keypair, the form sent to the backend and stored on disk.
    pub fn encoded_secret(&self) -> Zeroizing<String> {
        encode_secret_key(&self.keypair)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pubkey", &self.pubkey().to_string())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Encode a keypair as base64 of its 64 bytes (secret || public).
pub fn encode_secret_key(keypair: &Keypair) -> Zeroizing<String> {
    let bytes = Zeroizing::new(keypair.to_bytes());
    Zeroizing::new(BASE64.encode(&bytes[..]))
}

/// Decode a base64 64-byte secret key.
///
/// # Errors
///
/// Returns `WalletError::InvalidSecretKey` for bad base64, a wrong length, or
/// a public half that does not match the secret half.
pub fn decode_secret_key(secret_b64: &str) -> Result<Keypair> {
    let bytes = Zeroizing::new(
        BASE64
            .decode(secret_b64.trim())
            .map_err(|e| WalletError::InvalidSecretKey(format!("base64: {e}")))?,
    );
    if bytes.len() != 64 {
        return Err(WalletError::InvalidSecretKey(format!(
            "expected 64 bytes, got {}",
            bytes.len()
        )));
    }
    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&bytes[..32]);
    let keypair = crate::keys::keypair_from_secret(&secret)?;
    if keypair.pubkey().to_bytes()[..] != bytes[32..] {
        return Err(WalletError::InvalidSecretKey(
            "public key does not match secret key".into(),
        ));
    }
    Ok(keypair)
}

/// On-disk form of a session.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredSession {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    token: Option<String>,
    #[serde(rename = "secretKey")]
    secret_key: String,
}

/// File-backed session persistence.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, if one exists.
    pub fn load(&self) -> Result<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => Zeroizing::new(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSession = serde_json::from_str(&raw)?;
        let session = Session::from_encoded_secret(&stored.secret_key, stored.token.clone())?;
        debug!(
            path = %self.path.display(),
            wallet = %shorten_address(&session.pubkey().to_string()),
            "session loaded"
        );
        Ok(Some(session))
    }

    /// Load the stored session or fail with `WalletError::NoSession`.
    pub fn require(&self) -> Result<Session> {
        self.load()?.ok_or(WalletError::NoSession)
    }

    /// Persist a session, replacing whatever was stored before.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredSession {
            token: session.token.clone(),
            secret_key: session.encoded_secret().to_string(),
        };
        let body = Zeroizing::new(serde_json::to_string_pretty(&stored)?);
        write_private(&self.path, body.as_bytes())?;
        info!(
            wallet = %shorten_address(&session.pubkey().to_string()),
            "session stored"
        );
        Ok(())
    }

    /// Remove the stored session. Missing files are not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; an existing file keeps its own.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}
