//! Non-fungible holdings.
//!
//! Legacy token accounts holding exactly one unit are treated as NFT
//! candidates. Their Metaplex metadata accounts are fetched in batches and
//! only the fixed-layout prefix (name, symbol, uri) is decoded.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use borsh::BorshDeserialize;
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use solana_sdk::{pubkey, pubkey::Pubkey};

use super::HoldingsSource;
use crate::rpc::{AccountSnapshot, LedgerClient};

pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// `getMultipleAccounts` accepts at most this many keys per call.
const BATCH: usize = 100;

/// Discriminator of a v1 metadata account.
const KEY_METADATA_V1: u8 = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NftHolding {
    /// Metadata account address.
    pub address: String,
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

#[derive(BorshDeserialize)]
struct MetadataPrefix {
    key: u8,
    _update_authority: [u8; 32],
    mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
}

fn clean(s: String) -> String {
    s.trim_end_matches('\0').to_string()
}

/// Decode the leading fields of a metadata account. Trailing data (creators,
/// collection, ...) is ignored.
pub fn decode_metadata(address: &Pubkey, data: &[u8]) -> Result<NftHolding> {
    let prefix = MetadataPrefix::deserialize(&mut &data[..])
        .map_err(|e| anyhow!("undecodable metadata at {address}: {e}"))?;
    if prefix.key != KEY_METADATA_V1 {
        return Err(anyhow!("{address} is not a metadata account (key {})", prefix.key));
    }
    Ok(NftHolding {
        address: address.to_string(),
        mint: Pubkey::new_from_array(prefix.mint).to_string(),
        name: clean(prefix.name),
        symbol: clean(prefix.symbol),
        uri: clean(prefix.uri),
    })
}

pub struct NftSource;

#[async_trait]
impl HoldingsSource for NftSource {
    type Item = NftHolding;
    const LABEL: &'static str = "NFTs";

    async fn load(&self, ledger: &dyn LedgerClient, owner: &Pubkey) -> Result<Vec<NftHolding>> {
        let accounts = ledger.token_accounts_by_owner(owner, &spl_token::id()).await?;
        let addresses: Vec<Pubkey> = accounts
            .iter()
            .filter(|acc| acc.amount == 1 && acc.decimals.unwrap_or(0) == 0)
            .map(|acc| metadata_address(&acc.mint))
            .collect();
        debug!("[HOLDINGS] {} NFT candidates for {owner}", addresses.len());

        let batches = join_all(
            addresses
                .chunks(BATCH)
                .map(|chunk| ledger.multiple_accounts(chunk)),
        )
        .await;

        let mut items = Vec::new();
        for (chunk, batch) in addresses.chunks(BATCH).zip(batches) {
            let batch: Vec<Option<AccountSnapshot>> = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("[HOLDINGS] dropping {} metadata lookups: {e:#}", chunk.len());
                    continue;
                }
            };
            for (address, account) in chunk.iter().zip(batch) {
                let Some(account) = account else {
                    continue;
                };
                match decode_metadata(address, &account.data) {
                    Ok(nft) => items.push(nft),
                    Err(e) => warn!("[HOLDINGS] dropping {address}: {e:#}"),
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use borsh::BorshSerialize;

    use super::*;
    use crate::{rpc::OwnedTokenAccount, testing::MockLedger};

    #[derive(BorshSerialize)]
    struct Prefix {
        key: u8,
        update_authority: [u8; 32],
        mint: [u8; 32],
        name: String,
        symbol: String,
        uri: String,
    }

    fn pad(s: &str, len: usize) -> String {
        let mut out = s.to_string();
        out.extend(std::iter::repeat('\0').take(len - s.len()));
        out
    }

    fn metadata_bytes(mint: &Pubkey, name: &str) -> Vec<u8> {
        let mut data = borsh::to_vec(&Prefix {
            key: KEY_METADATA_V1,
            update_authority: Pubkey::new_unique().to_bytes(),
            mint: mint.to_bytes(),
            name: pad(name, 32),
            symbol: pad("NFT", 10),
            uri: pad("https://arweave.net/abc", 200),
        })
        .unwrap();
        // seller fee, creators option, ...
        data.extend_from_slice(&[0xf4, 0x01, 0, 1, 1]);
        data
    }

    fn single(mint: Pubkey, amount: u64) -> OwnedTokenAccount {
        OwnedTokenAccount {
            address: Pubkey::new_unique(),
            mint,
            amount,
            decimals: Some(0),
        }
    }

    #[test]
    fn padding_is_trimmed() {
        let mint = Pubkey::new_unique();
        let addr = metadata_address(&mint);
        let nft = decode_metadata(&addr, &metadata_bytes(&mint, "Ape #1")).unwrap();
        assert_eq!(nft.name, "Ape #1");
        assert_eq!(nft.symbol, "NFT");
        assert_eq!(nft.uri, "https://arweave.net/abc");
        assert_eq!(nft.mint, mint.to_string());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let mint = Pubkey::new_unique();
        let mut data = metadata_bytes(&mint, "x");
        data[0] = 6;
        assert!(decode_metadata(&Pubkey::new_unique(), &data).is_err());
    }

    #[tokio::test]
    async fn only_single_unit_accounts_with_metadata_are_listed() {
        let owner = Pubkey::new_unique();
        let (nft, fungible, bare, junk) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let ledger = MockLedger::new().with_token_accounts(
            owner,
            spl_token::id(),
            vec![single(nft, 1), single(fungible, 500), single(bare, 1), single(junk, 1)],
        );
        ledger.insert_account(
            metadata_address(&nft),
            TOKEN_METADATA_PROGRAM_ID,
            metadata_bytes(&nft, "Kept"),
        );
        ledger.insert_account(
            metadata_address(&fungible),
            TOKEN_METADATA_PROGRAM_ID,
            metadata_bytes(&fungible, "Fungible"),
        );
        ledger.insert_account(metadata_address(&junk), TOKEN_METADATA_PROGRAM_ID, vec![4, 1, 2]);

        let items = NftSource.load(&ledger, &owner).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Kept");
        assert_eq!(items[0].address, metadata_address(&nft).to_string());
    }
}
