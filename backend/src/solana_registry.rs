use crate::{
    error::{Result, SyncError},
    registry_client::{Nonce, RegistryClient},
    types::{RateRecord, TxHandle},
};
use anchor_lang::{AccountDeserialize, InstructionData, ToAccountMetas};
use async_trait::async_trait;
use rate_registry::{error::RegistryError, state::RateRegistry};
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};
use tracing::debug;

/// Registry client for one Solana cluster
pub struct SolanaRegistryClient {
    rpc_client: RpcClient,
    registry: Pubkey,
    owner: Keypair,
}

impl SolanaRegistryClient {
    pub fn new(rpc_url: &str, registry: Pubkey, owner: Keypair) -> Self {
        Self {
            rpc_client: RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed()),
            registry,
            owner,
        }
    }

    fn set_exchange_rate_instruction(&self, wei_per_cent: u64, timestamp: i64) -> Instruction {
        Instruction {
            program_id: rate_registry::ID,
            accounts: rate_registry::accounts::OwnerOnly {
                registry: self.registry,
                owner: self.owner.pubkey(),
            }
            .to_account_metas(None),
            data: rate_registry::instruction::SetExchangeRate {
                wei_per_cent,
                timestamp,
            }
            .data(),
        }
    }
}

#[async_trait]
impl RegistryClient for SolanaRegistryClient {
    async fn read_record(&self) -> Result<RateRecord> {
        let account_data = self
            .rpc_client
            .get_account_data(&self.registry)
            .await
            .map_err(|e| SyncError::RpcError(format!("Failed to fetch registry {}: {}", self.registry, e)))?;

        let registry = RateRegistry::try_deserialize(&mut account_data.as_slice())
            .map_err(|e| SyncError::ParseError(format!("Failed to parse registry {}: {}", self.registry, e)))?;

        debug!(
            registry = %self.registry,
            wei_per_cent = registry.wei_per_cent,
            last_updated = registry.last_updated,
            delegating = registry.is_delegating(),
            "Read registry"
        );

        Ok(RateRecord::from(&registry))
    }

    async fn latest_nonce(&self) -> Result<Nonce> {
        self.rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| SyncError::RpcError(format!("Failed to fetch blockhash: {}", e)))
    }

    async fn submit_rate(&self, wei_per_cent: u64, timestamp: i64, nonce: Nonce) -> Result<TxHandle> {
        let instruction = self.set_exchange_rate_instruction(wei_per_cent, timestamp);
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.owner.pubkey()),
            &[&self.owner],
            nonce,
        );

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(map_client_error)?;

        Ok(TxHandle(signature.to_string()))
    }
}

/// Turn a failed transaction into the registry rejection that caused it, if
/// the program returned one of its own error codes.
fn map_client_error(error: ClientError) -> SyncError {
    if let Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) =
        error.get_transaction_error()
    {
        if let Some(rejection) = RegistryError::from_code(code) {
            return rejection.into();
        }
    }

    SyncError::RpcError(error.to_string())
}
