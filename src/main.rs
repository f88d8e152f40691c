// src/main.rs
//! BC24 client entry point.
use anyhow::{Context, Result};
use bc24_client::blockchain::ContractInvoker;
use bc24_client::cli::{Cli, Commands, RunArgs};
use bc24_client::contract::artifact::is_read_only;
use bc24_client::core::config::InvocationConfig;
use bc24_client::core::domain::{render_tokens, token_to_json, ConnectionStatus, Invocation, InvocationResult};
use bc24_client::core::errors::InvokeError;
use bc24_client::security::AccountCredential;
use bc24_client::service::{self, SequenceReport};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const RULE: &str = "--------------------------------------------------";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting bc24 v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dispatch(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = InvocationConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    let json_output = cli.json;

    match cli.command {
        None => run_sequence(&config, &RunArgs::default(), json_output).await,
        Some(Commands::Run(args)) => run_sequence(&config, &args, json_output).await,
        Some(Commands::Status) => status(&config, json_output).await,
        Some(Commands::Functions) => functions(&config, json_output),
        Some(Commands::Call { function, args }) => invoke(&config, &function, &args, false, json_output).await,
        Some(Commands::Send { function, args }) => invoke(&config, &function, &args, true, json_output).await,
    }
}

async fn run_sequence(config: &InvocationConfig, args: &RunArgs, json_output: bool) -> Result<()> {
    let scenario = args.scenario();
    let report = service::run(config, &scenario).await?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print_report(&report, &scenario.token_id.to_string());
    }
    Ok(())
}

fn print_report(report: &SequenceReport, token_id: &str) {
    println!("Connection Successful (chain ID {})", report.chain_id);
    println!("{}", RULE);
    println!("createToken      tx {}{}", report.create_token.tx_hash, block_suffix(report.create_token.block_number));
    println!(
        "addBreedingInfo  tx {}{}",
        report.add_breeding_info.tx_hash,
        block_suffix(report.add_breeding_info.block_number)
    );
    println!("{}", RULE);
    println!("getMetaData({}) = {}", token_id, render_tokens(&report.metadata));
}

fn block_suffix(block: Option<u64>) -> String {
    block.map(|b| format!(" (block {})", b)).unwrap_or_default()
}

async fn status(config: &InvocationConfig, json_output: bool) -> Result<()> {
    let client = service::connect(config)?;
    let chain_id = match client.connection_status().await {
        ConnectionStatus::Connected { chain_id } => chain_id,
        ConnectionStatus::Unreachable { reason } => {
            return Err(InvokeError::ConnectionFailure { endpoint: config.endpoint.clone(), reason }.into())
        }
    };
    let block = client.block_number().await?;

    // The key is optional here; without it only the configured sender can be reported.
    let sender = match AccountCredential::from_env(&config.private_key_env, config.sender) {
        Ok(credential) => Some(credential.address()),
        Err(e) => {
            info!("No signing credential: {}", e);
            config.sender
        }
    };
    let nonce = match sender {
        Some(address) => Some(client.get_nonce(address).await?),
        None => None,
    };

    if json_output {
        let value = json!({
            "endpoint": config.endpoint,
            "chain_id": chain_id,
            "block_number": block,
            "sender": sender.map(|a| ethers::utils::to_checksum(&a, None)),
            "nonce": nonce,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("Connection Successful");
    println!("{}", RULE);
    println!("endpoint  {}", config.endpoint);
    println!("chain ID  {}", chain_id);
    println!("block     {}", block);
    if let (Some(address), Some(nonce)) = (sender, nonce) {
        println!("sender    {} (nonce {})", ethers::utils::to_checksum(&address, None), nonce);
    }
    Ok(())
}

fn functions(config: &InvocationConfig, json_output: bool) -> Result<()> {
    let handle = service::bind_contract(config)?;
    let interface = handle.interface();
    let mut listed: Vec<(String, bool)> =
        interface.functions().map(|f| (f.signature(), is_read_only(f))).collect();
    listed.sort();

    if json_output {
        let value: Vec<_> = listed
            .iter()
            .map(|(signature, read_only)| json!({ "signature": signature, "read_only": read_only }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if let Some(name) = interface.contract_name() {
        println!("{} at {:?}", name, handle.address());
        println!("{}", RULE);
    }
    for (signature, read_only) in listed {
        println!("{:<6} {}", if read_only { "call" } else { "send" }, signature);
    }
    Ok(())
}

async fn invoke(
    config: &InvocationConfig,
    function: &str,
    raw_args: &[String],
    signed: bool,
    json_output: bool,
) -> Result<()> {
    let handle = service::bind_contract(config)?;
    let args = handle.tokenize_args(function, raw_args)?;
    let read_only = handle.interface().overload(function, args.len()).map(is_read_only)?;
    if signed == read_only {
        let hint = if read_only { "use `call`" } else { "use `send`" };
        anyhow::bail!("{} is {}; {}", function, if read_only { "read-only" } else { "state-changing" }, hint);
    }

    let credential = if signed {
        Some(AccountCredential::from_env(&config.private_key_env, config.sender)?)
    } else {
        None
    };
    let client = service::connect(config)?;
    if signed {
        if let ConnectionStatus::Unreachable { reason } = client.connection_status().await {
            return Err(InvokeError::ConnectionFailure { endpoint: config.endpoint.clone(), reason }.into());
        }
    }

    let mut invocation = Invocation::new(function, args);
    if let Some(sender) = credential.as_ref().map(|c| c.address()).or(config.sender) {
        invocation = invocation.with_sender(sender);
    }

    match service::invoke(&client, &handle, &invocation, credential.as_ref()).await? {
        InvocationResult::Call(tokens) if json_output => {
            let value: Vec<_> = tokens.iter().map(token_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        InvocationResult::Call(tokens) => println!("{}", render_tokens(&tokens)),
        InvocationResult::Transaction(outcome) if json_output => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        InvocationResult::Transaction(outcome) => {
            println!("{} tx {}{}", function, outcome.tx_hash, block_suffix(outcome.block_number));
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
