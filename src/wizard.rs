//! Interactive steps of account creation and recovery.
//!
//! Each function drives the [`AuthWizard`] through the steps that only need
//! the terminal; the backend calls happen in `main`.

use std::io::{BufRead, Write};

use pagwallet::auth::validate_password;
use pagwallet::keys::{parse_phrase_input, split_words};
use pagwallet::{AuthStep, AuthWizard, WalletError};
use tracing::debug;

use crate::error::Result;
use crate::prompt::Prompter;

/// Show the generated phrase and ask for it back until it matches.
///
/// An empty answer goes back and shows the phrase again. Returns with the
/// wizard at `CreateFinish`.
pub fn confirm_new_phrase<R: BufRead, W: Write>(
    wizard: &mut AuthWizard,
    prompt: &mut Prompter<R, W>,
) -> Result<()> {
    wizard.goto(AuthStep::Create)?;
    loop {
        debug!(step = %wizard.step(), "wizard");
        match wizard.step() {
            AuthStep::Create => {
                let phrase = wizard.phrase().map(|p| p.join(" ")).unwrap_or_default();
                prompt.say("Your recovery phrase:")?;
                prompt.say(&format!("\n    {phrase}\n"))?;
                prompt.say("Write it down. It is the only way to recover this wallet.")?;
                prompt.ask("Press Enter once it is saved")?;
                wizard.goto(AuthStep::Confirm)?;
            }
            AuthStep::Confirm => {
                let entered = prompt.ask("Type the phrase to confirm (empty to show it again)")?;
                if entered.trim().is_empty() {
                    wizard.back();
                    continue;
                }
                match wizard.confirm_phrase(&split_words(&entered)) {
                    Ok(pubkey) => prompt.say(&format!("Phrase confirmed. Address: {pubkey}"))?,
                    Err(WalletError::PhraseMismatch) => {
                        prompt.say("Phrases don't match, try again.")?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            AuthStep::CreateFinish => return Ok(()),
            other => {
                return Err(WalletError::InvalidStep {
                    from: other,
                    to: AuthStep::CreateFinish,
                }
                .into())
            }
        }
    }
}

/// Ask for a pasted 12-word phrase until one derives a key. Leaves the
/// wizard at `Recover` with the derived key, ready for the backend check.
pub fn enter_recovery_phrase<R: BufRead, W: Write>(
    wizard: &mut AuthWizard,
    prompt: &mut Prompter<R, W>,
) -> Result<()> {
    wizard.goto(AuthStep::Recover)?;
    loop {
        let text = prompt.ask("Recovery phrase (12 words)")?;
        let derived = parse_phrase_input(&text).and_then(|words| wizard.derive_recovery(&words));
        match derived {
            Ok(pubkey) => {
                prompt.say(&format!("Address: {pubkey}"))?;
                return Ok(());
            }
            Err(e @ (WalletError::PhraseLength { .. } | WalletError::InvalidMnemonic(_))) => {
                prompt.say(&e.to_string())?
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Ask for a new password and its confirmation until both pass the rules.
pub fn new_password<R: BufRead, W: Write>(prompt: &mut Prompter<R, W>) -> Result<(String, String)> {
    loop {
        let password = prompt.ask_secret("Password")?;
        let confirmation = prompt.ask_secret("Confirm password")?;
        match validate_password(&password, &confirmation) {
            Ok(()) => return Ok((password, confirmation)),
            Err(e @ (WalletError::PasswordMismatch | WalletError::PasswordTooShort(_))) => {
                prompt.say(&e.to_string())?
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::io::Cursor;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    fn prompter(input: String) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.into_bytes()), Vec::new())
    }

    /// The phrase is generated when the wizard enters `Create`, so the
    /// scripted input is built from a wizard already at that step.
    fn wizard_with_phrase() -> (AuthWizard, String) {
        let mut wizard = AuthWizard::new();
        wizard.goto(AuthStep::Create).unwrap();
        let phrase = wizard.phrase().unwrap().join(" ");
        (wizard, phrase)
    }

    #[test]
    fn test_confirm_after_a_mismatch() {
        let (mut wizard, phrase) = wizard_with_phrase();
        let mut prompt = prompter(format!("\n{ABANDON}\n{phrase}\n"));
        confirm_new_phrase(&mut wizard, &mut prompt).unwrap();
        assert_eq!(wizard.step(), AuthStep::CreateFinish);

        let out = String::from_utf8(prompt.into_output()).unwrap();
        assert!(out.contains("Phrases don't match"));
        assert!(out.contains(&phrase));
    }

    #[test]
    fn test_empty_answer_shows_phrase_again() {
        let (mut wizard, phrase) = wizard_with_phrase();
        let mut prompt = prompter(format!("\n\n\n{phrase}\n"));
        confirm_new_phrase(&mut wizard, &mut prompt).unwrap();
        let out = String::from_utf8(prompt.into_output()).unwrap();
        assert_eq!(out.matches("Your recovery phrase:").count(), 2);
    }

    #[test]
    fn test_confirm_stops_at_end_of_input() {
        let (mut wizard, _) = wizard_with_phrase();
        let mut prompt = prompter(format!("\n{ABANDON}\n"));
        let err = confirm_new_phrase(&mut wizard, &mut prompt).unwrap_err();
        assert!(matches!(err, CliError::InputClosed));
        assert_eq!(wizard.step(), AuthStep::Confirm);
    }

    #[test]
    fn test_recovery_phrase_is_reasked_until_valid() {
        let mut wizard = AuthWizard::new();
        let mut prompt = prompter(format!("abandon about\n{ABANDON}\n"));
        enter_recovery_phrase(&mut wizard, &mut prompt).unwrap();
        assert_eq!(wizard.step(), AuthStep::Recover);
        assert!(wizard.pubkey().is_some());

        let out = String::from_utf8(prompt.into_output()).unwrap();
        assert!(out.contains("must be 12 words long, got 2"));
    }

    #[test]
    fn test_new_password_rules() {
        let mut prompt = prompter("short\nshort\nlongenough\ndifferent1\nlongenough\nlongenough\n".into());
        let (password, confirmation) = new_password(&mut prompt).unwrap();
        assert_eq!(password, "longenough");
        assert_eq!(confirmation, "longenough");

        let out = String::from_utf8(prompt.into_output()).unwrap();
        assert!(out.contains("at least 8 characters"));
        assert!(out.contains("passwords don't match"));
    }
}
