//! Token-2022 mint creation with an embedded metadata extension.

use log::info;
use serde::Serialize;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};
use spl_pod::optional_keys::OptionalNonZeroPubkey;
use spl_token_2022::{
    extension::{metadata_pointer, ExtensionType},
    instruction::{initialize_mint, mint_to, set_authority, AuthorityType},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;

use super::{build_error, PendingTransaction};
use crate::{
    error::{DashboardError, Result},
    rpc::LedgerClient,
    wallet::WalletSigner,
};

pub const MAX_DECIMALS: u8 = 9;

#[derive(Clone, Debug, Default)]
pub struct TokenCreationRequest {
    pub name: String,
    pub symbol: String,
    /// Metadata document URI (see `metadata::publish_token_metadata`).
    pub uri: String,
    pub description: String,
    /// Whole tokens; scaled by `10^decimals` before minting.
    pub initial_supply: u64,
    pub decimals: u8,
    pub retain_mint_authority: bool,
    pub retain_freeze_authority: bool,
}

impl TokenCreationRequest {
    /// Check every field and return the supply in base units.
    pub fn validate(&self) -> Result<u64> {
        for (value, field) in [(&self.name, "Name"), (&self.symbol, "Symbol"), (&self.uri, "Metadata URI")] {
            if value.trim().is_empty() {
                return Err(DashboardError::validation(format!("{field} is required")));
            }
        }
        if self.decimals > MAX_DECIMALS {
            return Err(DashboardError::validation(format!(
                "Decimals must be between 0 and {MAX_DECIMALS}"
            )));
        }
        if self.initial_supply == 0 {
            return Err(DashboardError::validation("Initial supply must be greater than zero"));
        }
        10u64
            .checked_pow(self.decimals as u32)
            .and_then(|scale| self.initial_supply.checked_mul(scale))
            .ok_or_else(|| {
                DashboardError::validation(format!(
                    "Initial supply {} does not fit at {} decimals",
                    self.initial_supply, self.decimals
                ))
            })
    }

    fn metadata(&self, mint: &Pubkey) -> Result<TokenMetadata> {
        Ok(TokenMetadata {
            update_authority: OptionalNonZeroPubkey::try_from(Some(*mint)).map_err(build_error)?,
            mint: *mint,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            uri: self.uri.clone(),
            additional_metadata: vec![("description".to_string(), self.description.clone())],
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CreatedToken {
    pub mint: String,
    pub associated_account: String,
    pub signature: String,
}

/// Bytes allocated for the mint account (base mint plus metadata pointer).
pub fn mint_account_space() -> Result<usize> {
    ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])
        .map_err(build_error)
}

/// Bytes the mint will hold once the metadata is written; rent is paid on this.
pub fn rent_space(req: &TokenCreationRequest, mint: &Pubkey) -> Result<usize> {
    let metadata_len = req.metadata(mint)?.tlv_size_of().map_err(build_error)?;
    Ok(mint_account_space()? + metadata_len)
}

/// The creation instruction sequence. The order is fixed: the account must
/// exist before its extensions are initialised, the pointer before the mint,
/// the mint before the metadata, and revocation (if any) goes last.
pub fn creation_instructions(
    req: &TokenCreationRequest,
    payer: &Pubkey,
    mint: &Pubkey,
    lamports: u64,
) -> Result<Vec<Instruction>> {
    let raw_supply = req.validate()?;
    let program = spl_token_2022::id();
    let ata = get_associated_token_address_with_program_id(payer, mint, &program);
    let freeze_authority = req.retain_freeze_authority.then_some(payer);

    let mut ixs = vec![
        system_instruction::create_account(payer, mint, lamports, mint_account_space()? as u64, &program),
        metadata_pointer::instruction::initialize(&program, mint, Some(*payer), Some(*mint))
            .map_err(build_error)?,
        initialize_mint(&program, mint, payer, freeze_authority, req.decimals).map_err(build_error)?,
        spl_token_metadata_interface::instruction::initialize(
            &program,
            mint,
            mint,
            mint,
            payer,
            req.name.clone(),
            req.symbol.clone(),
            req.uri.clone(),
        ),
        create_associated_token_account(payer, payer, mint, &program),
        mint_to(&program, mint, &ata, payer, &[], raw_supply).map_err(build_error)?,
    ];

    if !req.retain_mint_authority {
        ixs.push(
            set_authority(&program, mint, None, AuthorityType::MintTokens, payer, &[])
                .map_err(build_error)?,
        );
    }
    Ok(ixs)
}

pub async fn create_token(
    ledger: &dyn LedgerClient,
    signer: &dyn WalletSigner,
    req: &TokenCreationRequest,
) -> Result<CreatedToken> {
    if !signer.is_connected() {
        return Err(DashboardError::WalletNotConnected);
    }
    req.validate()?;

    let payer = signer.pubkey();
    let mint = Keypair::new();
    let mint_pubkey = mint.pubkey();

    let lamports = ledger
        .minimum_balance_for_rent_exemption(rent_space(req, &mint_pubkey)?)
        .await
        .map_err(|e| DashboardError::connectivity("Failed to compute rent", e))?;
    let instructions = creation_instructions(req, &payer, &mint_pubkey, lamports)?;
    info!(
        "[CREATE_TOKEN] {} ({}) mint {mint_pubkey}, {} instructions, rent {lamports}",
        req.name,
        req.symbol,
        instructions.len()
    );

    let signature: Signature = PendingTransaction::new(instructions, payer)
        .with_co_signer(mint)
        .submit(ledger, signer)
        .await?;

    let ata = get_associated_token_address_with_program_id(&payer, &mint_pubkey, &spl_token_2022::id());
    info!("[CREATE_TOKEN] token created with mint address {mint_pubkey}");
    Ok(CreatedToken {
        mint: mint_pubkey.to_string(),
        associated_account: ata.to_string(),
        signature: signature.to_string(),
    })
}
