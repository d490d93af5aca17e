//! # blackholed CLI
//!
//! The same binary runs the daemon and queries a running instance over its JSON-RPC API.
//! It uses the default API endpoint (localhost:8080),
//! but you can point to a remote daemon using the `--host` and `--port` options.
//!
//! ## Run
//! ```sh
//! $ blackholed run ./demos/config.toml -vv
//! ```
//!
//! ## Routes
//! ```sh
//! $ blackholed show routes
//!  Prefix           Next Hop   Age       AS Path  Communities
//! -------------------------------------------------------------
//!  1.2.3.4/32       192.0.2.1  00:12:04           65535:666
//!  5.6.7.0/24       192.0.2.1  00:12:04           65535:666
//!  2001:db8::1/128  192.0.2.1  00:02:10           65000:666
//! ```
//!
//! Only self-originated (or only learned) prefixes:
//! ```sh
//! $ blackholed show routes outbound
//! $ blackholed show routes inbound
//! ```
//!
//! ## Feed stats
//! ```sh
//! $ blackholed show stats
//!  Feed                                       Active Routes
//! -----------------------------------------------------------
//!  https://www.spamhaus.org/drop/drop.txt    1241
//!  https://feeds.example.net/blackhole-v6.txt  12
//!
//! Total active routes: 1253
//! ```
//!
//! Any `show` command prints JSON instead of a table with `--json`.

use std::error::Error;

use clap::Parser;
use colored::*;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::Serialize;

use crate::api::ApiClient;

mod display;
mod table;

use display::{FeedStatsRow, PrefixRow, RouteRow};
use table::{OutputFormat, OutputTable, ToRow};

#[derive(Parser, Debug)]
#[clap(name = "blackholed", rename_all = "kebab-case")]
/// Announce blackhole feeds as BGP routes
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    #[clap(long, default_value = "127.0.0.1", global = true)]
    pub host: String,
    #[clap(short, long, default_value_t = 8080, global = true)]
    pub port: u16,
    /// Print query output as JSON
    #[clap(long, global = true)]
    pub json: bool,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Run the blackhole daemon
    Run(RunOptions),
    /// View routes & feed stats of a running daemon
    #[clap(alias = "s", subcommand)]
    Show(Show),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to config.toml
    pub config_path: String,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Show {
    #[clap(alias = "r")]
    Routes(RouteOptions),
    /// Active routes per feed
    #[clap(alias = "f", visible_alias = "feeds")]
    Stats,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RouteOptions {
    #[clap(subcommand)]
    filter: Option<RouteFilter>,
}

#[derive(Parser, Debug, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum RouteFilter {
    /// Learned routes (next-hop is not this router)
    Inbound,
    /// Originated routes (next-hop is this router)
    Outbound,
    /// Every active route with attributes
    All,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_rows<T>(rows: impl IntoIterator<Item = T>, output: OutputFormat) -> Result<(), Box<dyn Error>>
where
    T: ToRow + Serialize,
{
    print!("{}", OutputTable::new(rows).render(output)?);
    Ok(())
}

async fn show_routes(
    client: &HttpClient,
    filter: &RouteFilter,
    output: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let prefixes = match filter {
        RouteFilter::Inbound => client.show_routes_inbound().await?,
        RouteFilter::Outbound => client.show_routes_outbound().await?,
        RouteFilter::All => {
            let routes = client.show_routes().await?;
            return print_rows(routes.into_iter().map(RouteRow), output);
        }
    };
    print_rows(prefixes.into_iter().map(PrefixRow), output)
}

async fn run_cmd(args: &Args) -> Result<(), Box<dyn Error>> {
    let client = {
        let base = format!("http://{}:{}", args.host, args.port);
        HttpClientBuilder::default().build(base)?
    };
    match &args.cmd {
        Command::Show(Show::Routes(options)) => {
            let filter = options.filter.as_ref().unwrap_or(&RouteFilter::All);
            show_routes(&client, filter, OutputFormat::from(args.json)).await?;
        }
        Command::Show(Show::Stats) => {
            let stats = client.show_feed_stats().await?;
            if args.json {
                return print_json(&stats);
            }
            let mut feeds: Vec<_> = stats.feeds.into_iter().collect();
            feeds.sort();
            print_rows(
                feeds.into_iter().map(|(url, count)| FeedStatsRow(url, count)),
                OutputFormat::Table,
            )?;
            println!("\nTotal active routes: {}", stats.total);
        }
        Command::Run(_) => {
            return Err("The run command is handled by the daemon entrypoint".into());
        }
    }
    Ok(())
}

/// Interactive commands (other than running the daemon)
pub async fn query_daemon(args: &Args) {
    if let Err(err) = run_cmd(args).await {
        eprintln!("{}", err.to_string().red());
    }
}
