use crate::error::{Result, SyncError};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_FEED_URL: &str = "https://api.coinmarketcap.com/v1/ticker/ethereum/";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ticker endpoint returning `[{ price_usd, last_updated }]`
    pub feed_url: String,

    /// Time between poll cycles
    pub poll_interval: Duration,

    /// Networks to keep in sync, in update order
    pub networks: Vec<NetworkConfig>,

    /// Status server host
    pub server_host: String,

    /// Status server port
    pub server_port: u16,
}

/// Connection details for one ledger network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,

    /// Solana RPC endpoint
    pub rpc_url: String,

    /// Address of the deployed registry account
    pub registry_address: Pubkey,

    /// Keypair file of the registry owner
    pub keypair_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from a variable map.
    ///
    /// Per-network keys are `<NAME>_RPC_URL`, `<NAME>_REGISTRY_ADDRESS` and
    /// `<NAME>_KEYPAIR_PATH`, where `<NAME>` is the network name upper-cased
    /// with `-` replaced by `_`.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| SyncError::ConfigError(format!("{} must be set", key)));

        let networks = require("NETWORKS")?
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| -> Result<NetworkConfig> {
                let prefix = env_prefix(name);
                let address = require(&format!("{}_REGISTRY_ADDRESS", prefix))?;

                Ok(NetworkConfig {
                    name: name.to_string(),
                    rpc_url: require(&format!("{}_RPC_URL", prefix))?,
                    registry_address: Pubkey::from_str(&address).map_err(|e| {
                        SyncError::ConfigError(format!("Invalid registry address for {}: {}", name, e))
                    })?,
                    keypair_path: PathBuf::from(require(&format!("{}_KEYPAIR_PATH", prefix))?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if networks.is_empty() {
            return Err(SyncError::ConfigError("NETWORKS lists no networks".to_string()));
        }

        let poll_interval_secs: u64 = get("POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .map_err(|e| SyncError::ConfigError(format!("Invalid POLL_INTERVAL_SECONDS: {}", e)))?;
        if poll_interval_secs == 0 {
            return Err(SyncError::ConfigError("POLL_INTERVAL_SECONDS must be positive".to_string()));
        }

        Ok(Config {
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            networks,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: get("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|e| SyncError::ConfigError(format!("Invalid SERVER_PORT: {}", e)))?,
        })
    }
}

fn env_prefix(network: &str) -> String {
    network.to_uppercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_networks_in_order_with_defaults() {
        let devnet = Pubkey::new_unique();
        let local = Pubkey::new_unique();
        let devnet_str = devnet.to_string();
        let local_str = local.to_string();

        let config = Config::from_vars(&vars(&[
            ("NETWORKS", "devnet, local-validator"),
            ("DEVNET_RPC_URL", "https://api.devnet.solana.com"),
            ("DEVNET_REGISTRY_ADDRESS", devnet_str.as_str()),
            ("DEVNET_KEYPAIR_PATH", "/keys/devnet.json"),
            ("LOCAL_VALIDATOR_RPC_URL", "http://127.0.0.1:8899"),
            ("LOCAL_VALIDATOR_REGISTRY_ADDRESS", local_str.as_str()),
            ("LOCAL_VALIDATOR_KEYPAIR_PATH", "/keys/local.json"),
        ]))
        .unwrap();

        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.networks[0].name, "devnet");
        assert_eq!(config.networks[0].registry_address, devnet);
        assert_eq!(config.networks[1].name, "local-validator");
        assert_eq!(config.networks[1].rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.networks[1].keypair_path, PathBuf::from("/keys/local.json"));

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn test_missing_network_keys() {
        let result = Config::from_vars(&vars(&[("NETWORKS", "devnet"), ("DEVNET_RPC_URL", "http://x")]));
        assert!(matches!(result, Err(SyncError::ConfigError(msg)) if msg.contains("DEVNET_REGISTRY_ADDRESS")));

        let result = Config::from_vars(&vars(&[]));
        assert!(matches!(result, Err(SyncError::ConfigError(msg)) if msg.contains("NETWORKS")));
    }

    #[test]
    fn test_invalid_values() {
        let key = Pubkey::new_unique().to_string();
        let base = [
            ("NETWORKS", "devnet"),
            ("DEVNET_RPC_URL", "http://x"),
            ("DEVNET_REGISTRY_ADDRESS", key.as_str()),
            ("DEVNET_KEYPAIR_PATH", "/k.json"),
        ];

        let mut bad_interval = vars(&base);
        bad_interval.insert("POLL_INTERVAL_SECONDS".to_string(), "0".to_string());
        assert!(Config::from_vars(&bad_interval).is_err());

        let mut bad_address = vars(&base);
        bad_address.insert("DEVNET_REGISTRY_ADDRESS".to_string(), "not-a-key".to_string());
        assert!(Config::from_vars(&bad_address).is_err());
    }
}
