//! Transfers, token creation and airdrops: preflight checks, instruction
//! building, signing with the session key and confirmed submission.

use std::fmt;

use rust_decimal::Decimal;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_pod::optional_keys::OptionalNonZeroPubkey;
use spl_token_2022::extension::{metadata_pointer, ExtensionType};
use spl_token_2022::state::Mint;
use spl_token_metadata_interface::state::{Field, TokenMetadata};
use tracing::{debug, info};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::rpc::{submit_and_confirm, ChainRpc, RpcCaller};
use crate::types::{CreatedToken, NewToken, TokenHolding, TransferReceipt};
use crate::utils::{parse_address, parse_amount, shorten_address, to_base_units, NATIVE_DECIMALS};

/// Smallest amount a transfer may move (0.01).
pub const MIN_TRANSFER_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// SOL balance below which fees may not be covered (0.01).
pub const MIN_FEE_BALANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimals of tokens minted by [`Submitter::create_token`].
pub const NEW_TOKEN_DECIMALS: u8 = 9;

/// Metadata key set on newly created tokens.
pub const DESCRIPTION_FIELD: &str = "description";

// ---------------------------------------------------------------------------
// Preflight
// ---------------------------------------------------------------------------

/// Warnings that do not block a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    LowFeeBalance {
        balance: Decimal,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::InsufficientFunds {
                available,
                requested,
            } => write!(f, "Insufficient funds: {requested} requested, {available} available"),
            Advisory::LowFeeBalance { balance } => write!(
                f,
                "SOL balance {balance} may not cover the transaction fee (keep at least {MIN_FEE_BALANCE})"
            ),
        }
    }
}

/// A validated transfer request.
#[derive(Debug, Clone, PartialEq)]
pub struct SendCheck {
    pub recipient: Pubkey,
    pub amount: Decimal,
    pub advisories: Vec<Advisory>,
}

fn check_common(amount: &str, recipient: &str) -> Result<(Pubkey, Decimal)> {
    let recipient = parse_address(recipient)?;
    let amount = parse_amount(amount)?;
    if amount < MIN_TRANSFER_AMOUNT {
        return Err(WalletError::AmountBelowMinimum {
            amount,
            minimum: MIN_TRANSFER_AMOUNT,
        });
    }
    Ok((recipient, amount))
}

fn fee_advisory(sol_balance: Option<Decimal>) -> Option<Advisory> {
    sol_balance
        .filter(|b| *b < MIN_FEE_BALANCE)
        .map(|balance| Advisory::LowFeeBalance { balance })
}

/// Validate a native transfer against the last known balance.
///
/// Address and amount errors stop the transfer; a short balance only adds
/// advisories.
pub fn check_native_send(
    amount: &str,
    recipient: &str,
    last_balance: Option<Decimal>,
) -> Result<SendCheck> {
    let (recipient, amount) = check_common(amount, recipient)?;
    to_base_units(amount, NATIVE_DECIMALS)?;

    let mut advisories = Vec::new();
    if let Some(available) = last_balance.filter(|b| *b < amount) {
        advisories.push(Advisory::InsufficientFunds {
            available,
            requested: amount,
        });
    }
    advisories.extend(fee_advisory(last_balance));
    Ok(SendCheck {
        recipient,
        amount,
        advisories,
    })
}

/// Validate a token transfer against the holding and the SOL fee balance.
pub fn check_token_send(
    amount: &str,
    recipient: &str,
    holding: &TokenHolding,
    sol_balance: Option<Decimal>,
) -> Result<SendCheck> {
    let (recipient, amount) = check_common(amount, recipient)?;
    to_base_units(amount, u32::from(holding.decimals))?;

    let mut advisories = Vec::new();
    if holding.amount < amount {
        advisories.push(Advisory::InsufficientFunds {
            available: holding.amount,
            requested: amount,
        });
    }
    advisories.extend(fee_advisory(sol_balance));
    Ok(SendCheck {
        recipient,
        amount,
        advisories,
    })
}

/// Validate the parameters of a new token.
pub fn check_new_token(token: &NewToken) -> Result<()> {
    if token.name.trim().is_empty() {
        return Err(WalletError::Validation("token name is required".into()));
    }
    if token.symbol.trim().is_empty() {
        return Err(WalletError::Validation("token symbol is required".into()));
    }
    if token.supply <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(
            "initial supply must be greater than zero".into(),
        ));
    }
    to_base_units(token.supply, u32::from(NEW_TOKEN_DECIMALS))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction builders
// ---------------------------------------------------------------------------

/// A single system transfer of `amount` SOL.
pub fn native_transfer_instructions(
    from: &Pubkey,
    to: &Pubkey,
    amount: Decimal,
) -> Result<Vec<Instruction>> {
    let lamports = to_base_units(amount, NATIVE_DECIMALS)?;
    Ok(vec![system_instruction::transfer(from, to, lamports)])
}

/// `transfer_checked` between associated token accounts, creating the
/// recipient's account first when it does not exist yet.
///
/// The amount is scaled with the token's own decimals.
pub fn token_transfer_instructions(
    owner: &Pubkey,
    recipient: &Pubkey,
    holding: &TokenHolding,
    amount: Decimal,
    recipient_account_exists: bool,
) -> Result<Vec<Instruction>> {
    let mint = parse_address(&holding.mint)?;
    let source = parse_address(&holding.account)?;
    let program_id = &holding.program_id;
    let destination = get_associated_token_address_with_program_id(recipient, &mint, program_id);
    let raw = to_base_units(amount, u32::from(holding.decimals))?;

    let mut instructions = Vec::with_capacity(2);
    if !recipient_account_exists {
        instructions.push(create_associated_token_account_idempotent(
            owner, recipient, &mint, program_id,
        ));
    }
    instructions.push(
        spl_token_2022::instruction::transfer_checked(
            program_id,
            &source,
            &mint,
            &destination,
            owner,
            &[],
            raw,
            holding.decimals,
        )
        .map_err(|e| WalletError::Instruction(format!("transfer_checked: {e}")))?,
    );
    Ok(instructions)
}

/// Space of a mint with a metadata pointer, and the extra bytes its embedded
/// metadata will take once initialized.
pub fn mint_sizes(payer: &Pubkey, mint: &Pubkey, token: &NewToken) -> Result<(usize, usize)> {
    let space = ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])
        .map_err(|e| WalletError::Instruction(format!("mint size: {e}")))?;
    let metadata = token_metadata(payer, mint, token)?;
    let metadata_len = metadata
        .tlv_size_of()
        .map_err(|e| WalletError::Instruction(format!("metadata size: {e}")))?;
    Ok((space, metadata_len))
}

fn token_metadata(payer: &Pubkey, mint: &Pubkey, token: &NewToken) -> Result<TokenMetadata> {
    let update_authority = OptionalNonZeroPubkey::try_from(Some(*payer))
        .map_err(|e| WalletError::Instruction(format!("update authority: {e}")))?;
    Ok(TokenMetadata {
        update_authority,
        mint: *mint,
        name: token.name.clone(),
        symbol: token.symbol.clone(),
        uri: String::new(),
        additional_metadata: vec![(DESCRIPTION_FIELD.to_string(), token.description.clone())],
    })
}

/// Instructions for a Token-2022 mint carrying its own metadata, plus the
/// payer's associated account and the initial supply.
///
/// `mint_lamports` must cover the rent of the mint including the metadata.
pub fn create_token_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    token: &NewToken,
    mint_space: usize,
    mint_lamports: u64,
) -> Result<Vec<Instruction>> {
    let program_id = spl_token_2022::id();
    let supply = to_base_units(token.supply, u32::from(NEW_TOKEN_DECIMALS))?;
    let token_account = get_associated_token_address_with_program_id(payer, mint, &program_id);
    let ix_err = |what: &str, e: solana_sdk::program_error::ProgramError| {
        WalletError::Instruction(format!("{what}: {e}"))
    };

    Ok(vec![
        system_instruction::create_account(
            payer,
            mint,
            mint_lamports,
            mint_space as u64,
            &program_id,
        ),
        metadata_pointer::instruction::initialize(&program_id, mint, Some(*payer), Some(*mint))
            .map_err(|e| ix_err("metadata pointer", e))?,
        spl_token_2022::instruction::initialize_mint(
            &program_id,
            mint,
            payer,
            None,
            NEW_TOKEN_DECIMALS,
        )
        .map_err(|e| ix_err("initialize mint", e))?,
        spl_token_metadata_interface::instruction::initialize(
            &program_id,
            mint,
            payer,
            mint,
            payer,
            token.name.clone(),
            token.symbol.clone(),
            String::new(),
        ),
        spl_token_metadata_interface::instruction::update_field(
            &program_id,
            mint,
            payer,
            Field::Key(DESCRIPTION_FIELD.to_string()),
            token.description.clone(),
        ),
        create_associated_token_account_idempotent(payer, payer, mint, &program_id),
        spl_token_2022::instruction::mint_to(&program_id, mint, &token_account, payer, &[], supply)
            .map_err(|e| ix_err("mint to", e))?,
    ])
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Signs with the session keypair and submits through a [`ChainRpc`].
pub struct Submitter<'a, R> {
    rpc: &'a R,
    signer: &'a Keypair,
    config: &'a WalletConfig,
}

impl<'a, R: ChainRpc> Submitter<'a, R> {
    pub fn new(rpc: &'a R, signer: &'a Keypair, config: &'a WalletConfig) -> Self {
        Self {
            rpc,
            signer,
            config,
        }
    }

    fn caller(&self) -> RpcCaller<'a, R> {
        RpcCaller::new(self.rpc, self.config.request_timeout, self.config.retry)
    }

    /// Sign once with the session key (plus `extra_signers`) and submit.
    async fn sign_and_submit(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
        commitment: CommitmentConfig,
    ) -> Result<Signature> {
        let blockhash = self
            .caller()
            .call("getLatestBlockhash", |rpc| rpc.latest_blockhash())
            .await?;

        let mut signers: Vec<&Keypair> = Vec::with_capacity(1 + extra_signers.len());
        signers.push(self.signer);
        signers.extend_from_slice(extra_signers);

        let mut transaction = Transaction::new_with_payer(instructions, Some(&self.signer.pubkey()));
        transaction
            .try_sign(&signers[..], blockhash)
            .map_err(|e| WalletError::Instruction(format!("sign: {e}")))?;

        submit_and_confirm(
            self.rpc,
            &transaction,
            commitment,
            &self.config.retry,
            self.config.request_timeout,
            self.config.confirm_timeout,
        )
        .await
    }

    /// Send native SOL.
    pub async fn send_sol(&self, check: &SendCheck) -> Result<TransferReceipt> {
        let from = self.signer.pubkey();
        let instructions = native_transfer_instructions(&from, &check.recipient, check.amount)?;
        let signature = self
            .sign_and_submit(&instructions, &[], self.config.commitment)
            .await?;
        info!(
            %signature,
            amount = %check.amount,
            to = %shorten_address(&check.recipient.to_string()),
            "SOL sent"
        );
        Ok(TransferReceipt {
            signature: signature.to_string(),
        })
    }

    /// Send a fungible token from `holding`.
    pub async fn send_token(&self, check: &SendCheck, holding: &TokenHolding) -> Result<TransferReceipt> {
        let owner = self.signer.pubkey();
        let mint = parse_address(&holding.mint)?;
        let destination =
            get_associated_token_address_with_program_id(&check.recipient, &mint, &holding.program_id);
        let destination = &destination;
        let exists = self
            .caller()
            .call("getAccountInfo", move |rpc| rpc.account_exists(destination))
            .await?;
        debug!(%destination, exists, "recipient token account");

        let instructions =
            token_transfer_instructions(&owner, &check.recipient, holding, check.amount, exists)?;
        let signature = self
            .sign_and_submit(&instructions, &[], self.config.commitment)
            .await?;
        info!(
            %signature,
            amount = %check.amount,
            mint = %shorten_address(&holding.mint),
            to = %shorten_address(&check.recipient.to_string()),
            "token sent"
        );
        Ok(TransferReceipt {
            signature: signature.to_string(),
        })
    }

    /// Mint a new Token-2022 token with embedded metadata and credit the
    /// initial supply to the session wallet, in one transaction.
    pub async fn create_token(&self, token: &NewToken) -> Result<CreatedToken> {
        check_new_token(token)?;
        let payer = self.signer.pubkey();
        let mint = Keypair::new();
        let mint_pubkey = mint.pubkey();

        let (space, metadata_len) = mint_sizes(&payer, &mint_pubkey, token)?;
        let rent_len = space + metadata_len;
        let lamports = self
            .caller()
            .call("getMinimumBalanceForRentExemption", move |rpc| {
                rpc.rent_exemption(rent_len)
            })
            .await?;

        let instructions = create_token_instructions(&payer, &mint_pubkey, token, space, lamports)?;
        let signature = self
            .sign_and_submit(&instructions, &[&mint], CommitmentConfig::finalized())
            .await?;
        let token_account =
            get_associated_token_address_with_program_id(&payer, &mint_pubkey, &spl_token_2022::id());
        info!(%signature, mint = %mint_pubkey, symbol = %token.symbol, "token created");
        Ok(CreatedToken {
            mint: mint_pubkey,
            token_account,
            signature: signature.to_string(),
        })
    }

    /// Request `sol` whole SOL from the faucet and wait for finalization.
    pub async fn airdrop(&self, sol: u64) -> Result<TransferReceipt> {
        let to = self.signer.pubkey();
        let lamports = to_base_units(Decimal::from(sol), NATIVE_DECIMALS)?;
        let to_ref = &to;
        let signature = self
            .caller()
            .call("requestAirdrop", move |rpc| rpc.airdrop(to_ref, lamports))
            .await?;
        crate::rpc::confirm_signature(
            self.rpc,
            &signature,
            CommitmentConfig::finalized(),
            self.config.confirm_timeout,
        )
        .await?;
        info!(%signature, sol, "airdrop finalized");
        Ok(TransferReceipt {
            signature: signature.to_string(),
        })
    }
}
