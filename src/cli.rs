use clap::{Args, Parser, Subcommand};
use ethers::types::{Address, U256};
use std::path::PathBuf;

use crate::core::config::{parse_address, ConfigOverrides};
use crate::core::domain::BreedingInfo;
use crate::service::BreedingScenario;

/// BC24 contract client (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "bc24", about = "Invoke the BC24 breeding-record contract", disable_help_subcommand = true)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// TOML config file (falls back to BC24_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint, e.g. http://127.0.0.1:8545
    #[arg(long = "rpc-url", global = true)]
    pub rpc_url: Option<String>,

    /// Contract artifact containing the `abi`
    #[arg(long, global = true)]
    pub artifact: Option<PathBuf>,

    /// Deployed contract address
    #[arg(long, global = true)]
    pub contract: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mint a token, attach breeding info and read it back (default)
    Run(RunArgs),
    /// Check the node connection and sender account
    Status,
    /// List the functions declared by the artifact
    Functions,
    /// Read-only call
    Call {
        function: String,
        args: Vec<String>,
    },
    /// Signed transaction
    Send {
        function: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Recipient of the new token (defaults to the sender)
    #[arg(long, value_parser = parse_owner)]
    pub owner: Option<Address>,
    #[arg(long = "token-id", default_value = "0", value_parser = parse_uint)]
    pub token_id: U256,
    #[arg(long, default_value = "Cow")]
    pub species: String,
    #[arg(long, default_value = "Zurich")]
    pub location: String,
    #[arg(long, default_value = "male")]
    pub sex: String,
    #[arg(long, default_value = "300", value_parser = parse_uint)]
    pub weight: U256,
    #[arg(long, default_value = "healthy")]
    pub health: String,
}

impl Default for RunArgs {
    fn default() -> Self {
        let scenario = BreedingScenario::default();
        Self {
            owner: scenario.token_owner,
            token_id: scenario.token_id,
            species: scenario.info.species,
            location: scenario.info.location,
            sex: scenario.info.sex,
            weight: scenario.info.weight,
            health: scenario.info.health_status,
        }
    }
}

impl RunArgs {
    pub fn scenario(&self) -> BreedingScenario {
        BreedingScenario {
            token_owner: self.owner,
            token_id: self.token_id,
            info: BreedingInfo {
                species: self.species.clone(),
                location: self.location.clone(),
                sex: self.sex.clone(),
                weight: self.weight,
                health_status: self.health.clone(),
            },
        }
    }
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rpc_url: self.rpc_url.clone(),
            artifact_path: self.artifact.clone(),
            contract_address: self.contract.clone(),
        }
    }
}

fn parse_uint(raw: &str) -> Result<U256, String> {
    U256::from_dec_str(raw.trim()).map_err(|e| format!("expected an unsigned decimal integer: {}", e))
}

fn parse_owner(raw: &str) -> Result<Address, String> {
    parse_address(raw, "owner address").map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_defaults_to_run() {
        let cli = Cli::try_parse_from(["bc24"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
        assert_eq!(RunArgs::default().scenario(), BreedingScenario::default());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "bc24", "run", "--token-id", "7", "--species", "Goat", "--weight", "55",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                let scenario = args.scenario();
                assert_eq!(scenario.token_id, U256::from(7));
                assert_eq!(scenario.info.species, "Goat");
                assert_eq!(scenario.info.location, "Zurich");
                assert_eq!(scenario.info.weight, U256::from(55));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bad_numbers_and_addresses_are_rejected() {
        assert!(Cli::try_parse_from(["bc24", "run", "--weight", "-1"]).is_err());
        assert!(Cli::try_parse_from(["bc24", "run", "--owner", "0x1234"]).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bc24", "call", "getMetaData", "0", "--rpc-url", "http://node:8545", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.overrides().rpc_url.as_deref(), Some("http://node:8545"));
        match cli.command {
            Some(Commands::Call { function, args }) => {
                assert_eq!(function, "getMetaData");
                assert_eq!(args, vec!["0".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
