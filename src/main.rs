//! hive-broadcaster command line.
//!
//! ```text
//! hive-broadcaster [--config FILE] [--node URL]... <command>
//!
//!   properties                      dynamic global properties
//!   tapos                           current reference block
//!   call <api> <method> [params]    any allow-listed RPC method
//!   vote | transfer | post          signed broadcasts (keys from HIVE_*_KEY)
//!   custom-json <id> <json>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use hive_broadcaster::blockchain::{Amount, KeyRing};
use hive_broadcaster::config::loader::load_config;
use hive_broadcaster::observability::logging::init_logging;
use hive_broadcaster::rpc::{HttpTransport, Strictness};
use hive_broadcaster::{ClientConfig, ClientResult, HiveClient};

#[derive(Parser)]
#[command(name = "hive-broadcaster")]
#[command(about = "Sign and broadcast Hive transactions with node failover", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "HIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Node to use instead of the configured list (repeatable, tried in order)
    #[arg(short, long = "node")]
    nodes: Vec<String>,

    /// Acting account for broadcasts
    #[arg(short, long, env = "HIVE_ACCOUNT")]
    account: Option<String>,

    /// Wait for block inclusion
    #[arg(long)]
    synchronous: bool,

    /// Ask the node to verify authority before submitting
    #[arg(long)]
    verify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dynamic global properties
    Properties,
    /// Show the reference block a transaction would use now
    Tapos,
    /// Call an RPC method directly
    Call {
        api: String,
        method: String,
        /// JSON params (array for condenser_api, object otherwise)
        params: Option<String>,
        /// Print null instead of failing on transport/RPC errors
        #[arg(long)]
        lenient: bool,
    },
    /// Vote on a post or comment
    Vote {
        author: String,
        permlink: String,
        #[arg(short, long, default_value_t = 10000, allow_hyphen_values = true)]
        weight: i16,
    },
    /// Transfer HIVE or HBD, e.g. "1.000 HIVE"
    Transfer {
        to: String,
        amount: String,
        #[arg(short, long, default_value = "")]
        memo: String,
    },
    /// Publish a post (permlink derived from the title)
    Post {
        title: String,
        body: String,
        /// Repeatable; the first tag is the category when no community is given
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        community: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Broadcast a custom_json operation
    CustomJson {
        id: String,
        json: String,
        /// Sign with active authority (puts the account in required_auths)
        #[arg(long)]
        active: bool,
    },
}

fn load(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if !cli.nodes.is_empty() {
        config.nodes = cli.nodes.clone();
    }
    if cli.account.is_some() {
        config.account = cli.account.clone();
    }
    if cli.synchronous {
        config.broadcast.synchronous = true;
    }
    if cli.verify {
        config.broadcast.verify = true;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_json(text: &str) -> ClientResult<Value> {
    Ok(serde_json::from_str(text)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    init_logging(&config.observability);

    tracing::debug!(nodes = config.nodes.len(), "Configuration loaded");

    let keys = match &cli.command {
        Commands::Vote { .. }
        | Commands::Transfer { .. }
        | Commands::Post { .. }
        | Commands::CustomJson { .. } => {
            KeyRing::from_env()?
        }
        _ => KeyRing::new(),
    };

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let client = HiveClient::with_transport(&config, keys, transport).await?;
    let options = client.broadcast_options();

    match cli.command {
        Commands::Properties => {
            let props = client
                .rpc()
                .get_dynamic_global_properties(Strictness::Strict)
                .await?;
            print_json(&props)?;
        }
        Commands::Tapos => {
            print_json(&client.reference_block().await?)?;
        }
        Commands::Call {
            api,
            method,
            params,
            lenient,
        } => {
            let params = params.as_deref().map(parse_json).transpose()?;
            let strictness = if lenient {
                Strictness::Lenient
            } else {
                Strictness::Strict
            };
            let result = client.rpc().call(&api, &method, params, strictness).await?;
            print_json(&result)?;
        }
        Commands::Vote {
            author,
            permlink,
            weight,
        } => {
            print_json(&client.vote(&author, &permlink, weight, &options).await?)?;
        }
        Commands::Transfer { to, amount, memo } => {
            let amount: Amount = amount.parse()?;
            print_json(&client.transfer(&to, &amount, &memo, &options).await?)?;
        }
        Commands::Post {
            title,
            body,
            tags,
            community,
            description,
        } => {
            let receipt = client
                .new_post(&title, &body, &description, &tags, community.as_deref(), &options)
                .await?;
            print_json(&receipt)?;
        }
        Commands::CustomJson { id, json, active } => {
            let data = parse_json(&json)?;
            let required_auths = if active {
                vec![client.account()?.to_string()]
            } else {
                Vec::new()
            };
            print_json(&client.custom_json(&id, &data, &required_auths, &options).await?)?;
        }
    }

    Ok(())
}
