//! Mnemonic generation and deterministic keypair derivation.
//!
//! A wallet is a BIP-39 English phrase of [`MNEMONIC_WORDS`] words. The
//! keypair is derived from the first 32 bytes of the BIP-39 seed (empty
//! passphrase), used directly as an ed25519 secret.

use bip39::Mnemonic;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use zeroize::Zeroizing;

use crate::error::{Result, WalletError};

/// Number of words in a generated or recovered phrase.
pub const MNEMONIC_WORDS: usize = 12;

/// Generate a fresh 12-word phrase from OS randomness.
pub fn generate_mnemonic() -> Result<Vec<String>> {
    let mut entropy = Zeroizing::new([0u8; 16]);
    OsRng.fill_bytes(entropy.as_mut());

    let mnemonic = Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(split_words(&mnemonic.to_string()))
}

/// Validate a phrase against the BIP-39 wordlist and checksum.
pub fn validate_mnemonic(words: &[String]) -> Result<Mnemonic> {
    if words.len() != MNEMONIC_WORDS {
        return Err(WalletError::PhraseLength {
            expected: MNEMONIC_WORDS,
            actual: words.len(),
        });
    }
    Mnemonic::parse(words.join(" ")).map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Derive the wallet keypair for a phrase.
///
/// # Errors
///
/// Returns `WalletError::InvalidMnemonic` or `WalletError::PhraseLength` if
/// the phrase does not validate; nothing is derived in that case.
pub fn derive_keypair(words: &[String]) -> Result<Keypair> {
    let mnemonic = validate_mnemonic(words)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));
    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&seed[..32]);
    keypair_from_secret(&secret)
}

/// Build a Solana keypair from a 32-byte ed25519 secret.
pub fn keypair_from_secret(secret: &[u8; 32]) -> Result<Keypair> {
    let signing_key = SigningKey::from_bytes(secret);
    let mut keypair_bytes = Zeroizing::new([0u8; 64]);
    keypair_bytes[..32].copy_from_slice(&signing_key.to_bytes());
    keypair_bytes[32..].copy_from_slice(signing_key.verifying_key().as_bytes());
    Keypair::from_bytes(&keypair_bytes[..])
        .map_err(|e| WalletError::InvalidSecretKey(e.to_string()))
}

/// Split free text (typed or pasted) into phrase words.
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Parse a pasted recovery phrase; it must contain exactly 12 words.
pub fn parse_phrase_input(text: &str) -> Result<Vec<String>> {
    let words = split_words(text);
    if words.len() != MNEMONIC_WORDS {
        return Err(WalletError::PhraseLength {
            expected: MNEMONIC_WORDS,
            actual: words.len(),
        });
    }
    Ok(words)
}

/// Exact, word-for-word phrase comparison. Surrounding whitespace of each
/// entered word is ignored; case is not.
pub fn phrases_match(expected: &[String], entered: &[String]) -> bool {
    expected.len() == entered.len()
        && expected
            .iter()
            .zip(entered)
            .all(|(want, got)| want == got.trim())
}

/// Body value for the backend's `check-public-key` lookup: the public key as
/// a JSON array of its 32 bytes, e.g. `[12,250,...]`.
pub fn public_key_payload(pubkey: &Pubkey) -> String {
    let bytes = pubkey.to_bytes();
    let parts: Vec<String> = bytes.iter().map(u8::to_string).collect();
    format!("[{}]", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signer;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic_is_valid() {
        let words = generate_mnemonic().unwrap();
        assert_eq!(words.len(), MNEMONIC_WORDS);
        assert!(validate_mnemonic(&words).is_ok());
    }

    #[test]
    fn test_generate_mnemonic_is_random() {
        assert_ne!(generate_mnemonic().unwrap(), generate_mnemonic().unwrap());
    }

    #[test]
    fn test_derive_keypair_deterministic() {
        let words = split_words(ABANDON);
        let a = derive_keypair(&words).unwrap();
        let b = derive_keypair(&words).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_derive_keypair_uses_seed_prefix() {
        let words = split_words(ABANDON);
        let seed = Mnemonic::parse(ABANDON).unwrap().to_seed("");
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&seed[..32]);
        let expected = SigningKey::from_bytes(&secret).verifying_key().to_bytes();

        let keypair = derive_keypair(&words).unwrap();
        assert_eq!(keypair.pubkey().to_bytes(), expected);
    }

    #[test]
    fn test_invalid_checksum_rejected() {
        let words = split_words(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
        );
        assert!(matches!(
            derive_keypair(&words),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_unknown_word_rejected() {
        let mut words = split_words(ABANDON);
        words[3] = "notaword".into();
        assert!(matches!(
            validate_mnemonic(&words),
            Err(WalletError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let words = split_words("abandon about");
        assert!(matches!(
            validate_mnemonic(&words),
            Err(WalletError::PhraseLength {
                expected: 12,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_parse_phrase_input() {
        assert_eq!(parse_phrase_input(&format!("  {ABANDON}\n")).unwrap().len(), 12);
        assert!(parse_phrase_input("abandon abandon").is_err());
    }

    #[test]
    fn test_phrases_match_exact() {
        let expected = split_words(ABANDON);
        assert!(phrases_match(&expected, &expected.clone()));

        for i in 0..expected.len() {
            let mut entered = expected.clone();
            entered[i] = "zoo".into();
            assert!(!phrases_match(&expected, &entered), "word {i} differs");
        }
    }

    #[test]
    fn test_phrases_match_is_case_sensitive_and_length_checked() {
        let expected = split_words(ABANDON);
        let mut upper = expected.clone();
        upper[0] = "Abandon".into();
        assert!(!phrases_match(&expected, &upper));
        assert!(!phrases_match(&expected, &expected[..11]));
    }

    #[test]
    fn test_public_key_payload_format() {
        let key = Pubkey::new_from_array([1u8; 32]);
        let payload = public_key_payload(&key);
        assert!(payload.starts_with("[1,1,"));
        assert!(payload.ends_with(",1]"));
        let parsed: Vec<u8> = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed, vec![1u8; 32]);
    }
}
