//! Integration tests for phrase handling and key derivation.
//!
//! Uses the standard all-`abandon` BIP-39 phrase so derivation can be checked
//! for determinism without touching the network.

use pagwallet::keys::*;
use pagwallet::session::{decode_secret_key, encode_secret_key};
use pagwallet::{AuthStep, AuthWizard, WalletError};
use solana_sdk::signature::Signer;

/// Helper: the 12-word test phrase from the BIP-39 vectors.
fn abandon_phrase() -> Vec<String> {
    split_words(
        "abandon abandon abandon abandon abandon abandon \
         abandon abandon abandon abandon abandon about",
    )
}

#[test]
fn test_derivation_is_deterministic() {
    let a = derive_keypair(&abandon_phrase()).unwrap();
    let b = derive_keypair(&abandon_phrase()).unwrap();
    assert_eq!(a.pubkey(), b.pubkey());
    assert_eq!(a.to_bytes(), b.to_bytes());
}

#[test]
fn test_different_phrases_give_different_keys() {
    let generated = generate_mnemonic().unwrap();
    let a = derive_keypair(&abandon_phrase()).unwrap();
    let b = derive_keypair(&generated).unwrap();
    assert_ne!(a.pubkey(), b.pubkey());
}

#[test]
fn test_generated_phrase_validates() {
    let words = generate_mnemonic().unwrap();
    assert_eq!(words.len(), MNEMONIC_WORDS);
    validate_mnemonic(&words).unwrap();
}

#[test]
fn test_bad_checksum_is_rejected() {
    let mut words = abandon_phrase();
    words[11] = "abandon".into();
    let err = derive_keypair(&words).unwrap_err();
    assert!(matches!(err, WalletError::InvalidMnemonic(_)));
}

#[test]
fn test_unknown_word_is_rejected() {
    let mut words = abandon_phrase();
    words[3] = "notaword".into();
    assert!(matches!(
        validate_mnemonic(&words),
        Err(WalletError::InvalidMnemonic(_))
    ));
}

#[test]
fn test_pasted_phrase_needs_twelve_words() {
    let err = parse_phrase_input("abandon abandon about").unwrap_err();
    assert!(matches!(
        err,
        WalletError::PhraseLength {
            expected: 12,
            actual: 3
        }
    ));
    let words = parse_phrase_input("  abandon abandon abandon abandon abandon abandon\n\
        abandon abandon abandon abandon abandon about  ")
        .unwrap();
    assert_eq!(words, abandon_phrase());
}

#[test]
fn test_phrase_comparison_is_case_sensitive() {
    let expected = abandon_phrase();
    let mut entered = expected.clone();
    assert!(phrases_match(&expected, &entered));
    entered[0] = "Abandon".into();
    assert!(!phrases_match(&expected, &entered));
}

#[test]
fn test_secret_key_encoding_round_trips_through_derived_key() {
    let keypair = derive_keypair(&abandon_phrase()).unwrap();
    let encoded = encode_secret_key(&keypair);
    let decoded = decode_secret_key(&encoded).unwrap();
    assert_eq!(decoded.pubkey(), keypair.pubkey());
}

#[test]
fn test_public_key_payload_is_byte_array() {
    let keypair = derive_keypair(&abandon_phrase()).unwrap();
    let payload = public_key_payload(&keypair.pubkey());
    let bytes: Vec<u8> = serde_json::from_str(&payload).unwrap();
    assert_eq!(bytes, keypair.pubkey().to_bytes().to_vec());
}

#[test]
fn test_recovery_wizard_derives_same_key_as_phrase() {
    let mut wizard = AuthWizard::new();
    wizard.goto(AuthStep::Recover).unwrap();
    let pubkey = wizard.derive_recovery(&abandon_phrase()).unwrap();
    assert_eq!(pubkey, derive_keypair(&abandon_phrase()).unwrap().pubkey());
    assert_eq!(wizard.step(), AuthStep::Recover);
}

#[test]
fn test_create_wizard_confirms_its_own_phrase() {
    let mut wizard = AuthWizard::new();
    wizard.goto(AuthStep::Create).unwrap();
    let phrase = wizard.phrase().unwrap().to_vec();
    wizard.goto(AuthStep::Confirm).unwrap();

    let pubkey = wizard.confirm_phrase(&phrase).unwrap();
    assert_eq!(wizard.step(), AuthStep::CreateFinish);
    assert_eq!(pubkey, derive_keypair(&phrase).unwrap().pubkey());
}
