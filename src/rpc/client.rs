//! [`LedgerClient`] over the non-blocking Solana JSON-RPC client.

use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use solana_account_decoder::UiAccountData;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
    rpc_request::{RpcError, TokenAccountsFilter},
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::{
    account::Account,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use spl_token_2022::extension::StateWithExtensions;

use super::{AccountSnapshot, LedgerClient, OwnedTokenAccount, Rejected};

pub struct RpcLedger {
    client: RpcClient,
    poll_interval: Duration,
}

impl RpcLedger {
    pub fn new(url: String, poll_interval: Duration) -> Self {
        debug!("[RPC] client for {url}");
        Self {
            client: RpcClient::new_with_commitment(url, CommitmentConfig::confirmed()),
            poll_interval,
        }
    }
}

/* --------------------------------------------------------------------- */
/*  jsonParsed token account shape                                       */
/* --------------------------------------------------------------------- */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTokenInfo {
    mint: String,
    token_amount: ParsedTokenAmount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAmount {
    amount: String,
    decimals: u8,
}

fn normalize_keyed_account(keyed: &RpcKeyedAccount) -> Result<OwnedTokenAccount> {
    let address = Pubkey::from_str(&keyed.pubkey)
        .with_context(|| format!("bad account address {}", keyed.pubkey))?;

    if let UiAccountData::Json(parsed) = &keyed.account.data {
        let info: ParsedTokenInfo = serde_json::from_value(parsed.parsed["info"].clone())
            .with_context(|| format!("unexpected parsed layout for {address}"))?;
        return Ok(OwnedTokenAccount {
            address,
            mint: Pubkey::from_str(&info.mint)?,
            amount: info.token_amount.amount.parse()?,
            decimals: Some(info.token_amount.decimals),
        });
    }

    let account: Account = keyed
        .account
        .decode()
        .ok_or_else(|| anyhow!("cannot decode account data for {address}"))?;
    let state = StateWithExtensions::<spl_token_2022::state::Account>::unpack(&account.data)
        .map_err(|e| anyhow!("{address} is not a token account: {e}"))?;
    Ok(OwnedTokenAccount {
        address,
        mint: state.base.mint,
        amount: state.base.amount,
        decimals: None,
    })
}

/// Undecodable entries are logged and skipped so one bad account does not
/// hide the rest of the wallet.
fn normalize_keyed_accounts(keyed: &[RpcKeyedAccount]) -> Vec<OwnedTokenAccount> {
    keyed
        .iter()
        .filter_map(|entry| match normalize_keyed_account(entry) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("[RPC] skipping token account {}: {e:#}", entry.pubkey);
                None
            }
        })
        .collect()
}

fn snapshot(account: Account) -> AccountSnapshot {
    AccountSnapshot {
        owner: account.owner,
        lamports: account.lamports,
        data: account.data,
    }
}

/// Split node refusals from transport failures.
fn classify_send_error(err: ClientError) -> anyhow::Error {
    if let Some(tx_err) = err.get_transaction_error() {
        let raw = serde_json::to_string(&tx_err).unwrap_or_else(|_| tx_err.to_string());
        return Rejected(raw).into();
    }
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError { message, .. }) = err.kind() {
        return Rejected(message.clone()).into();
    }
    err.into()
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn endpoint(&self) -> String {
        self.client.url()
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<OwnedTokenAccount>> {
        let keyed = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(*token_program))
            .await?;
        debug!("[RPC] {} token accounts for {owner} under {token_program}", keyed.len());
        Ok(normalize_keyed_accounts(&keyed))
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>> {
        let resp = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(resp.value.map(snapshot))
    }

    async fn multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountSnapshot>>> {
        let accounts = self.client.get_multiple_accounts(addresses).await?;
        Ok(accounts.into_iter().map(|a| a.map(snapshot)).collect())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok(self
            .client
            .get_latest_blockhash_with_commitment(self.client.commitment())
            .await?)
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self
            .client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await?)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(classify_send_error)?;
        info!("[RPC] submitted {signature}");
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<Option<TransactionError>> {
        let commitment = self.client.commitment();
        loop {
            let statuses = self.client.get_signature_statuses(&[*signature]).await?.value;
            if let Some(Some(status)) = statuses.into_iter().next() {
                if status.satisfies_commitment(commitment) {
                    return Ok(status.err);
                }
            }

            let height = self.client.get_block_height().await?;
            if height > last_valid_block_height {
                return Err(anyhow!(
                    "transaction {signature} expired: block height {height} passed {last_valid_block_height}"
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        Ok(self.client.request_airdrop(address, lamports).await?)
    }
}
