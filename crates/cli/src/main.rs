//! `dory` — inspect the vault index and run one-shot queries from a
//! terminal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dory_index::{IndexHandle, VaultIndex};
use dory_llm::GeneratorClient;
use dory_qa::{
    answer_query, extract_price_items, filter_price_items, price_candidates, SessionStore,
    Settings,
};

#[derive(Parser, Debug)]
#[command(name = "dory", version, about = "Vault question answering")]
struct Cli {
    /// Vault root; overrides DORY_VAULT and the config file.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the index and print note/section counts.
    Stats,
    /// Rank sections against a query.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Extract price items the way a price query would.
    Prices { query: String },
    /// Run one query through the full pipeline.
    Ask {
        text: String,
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long, default_value = "cli")]
        channel: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(vault) = cli.vault {
        settings.vault_path = Some(vault);
    }

    match cli.command {
        Command::Stats => stats(&settings),
        Command::Search { query, top_k } => search(&settings, &query, top_k),
        Command::Prices { query } => prices(&settings, &query),
        Command::Ask {
            text,
            user,
            channel,
        } => ask(&settings, &text, &user, &channel),
    }
}

fn build_index(settings: &Settings) -> VaultIndex {
    VaultIndex::build(settings.vault_path.as_deref())
}

fn stats(settings: &Settings) -> Result<()> {
    let index = build_index(settings);
    match index.root() {
        Some(root) => println!("vault: {}", root.display()),
        None => println!("vault: (not configured)"),
    }
    println!("notes: {}", index.notes().count());
    println!("sections: {}", index.sections().len());
    Ok(())
}

fn search(settings: &Settings, query: &str, top_k: usize) -> Result<()> {
    let index = build_index(settings);
    let hits = index.find_sections(query, top_k);
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, section) in hits.iter().enumerate() {
        println!(
            "{}. [{:.1}] {}#{} (lines {}-{})",
            i + 1,
            section.score,
            section.path,
            section.heading,
            section.line_start,
            section.line_end
        );
    }
    Ok(())
}

fn prices(settings: &Settings, query: &str) -> Result<()> {
    let index = build_index(settings);
    let (candidates, alias_paths) = price_candidates(&index, query, settings.max_snippets * 4);
    let mut items = extract_price_items(&candidates);
    if alias_paths.is_empty() {
        items = filter_price_items(items, query);
    }
    if items.is_empty() {
        println!("No price items.");
        return Ok(());
    }
    for item in items {
        println!(
            "{} — {}  ({}#{} lines {}-{})",
            item.name, item.price, item.path, item.heading, item.line_start, item.line_end
        );
    }
    Ok(())
}

fn ask(settings: &Settings, text: &str, user: &str, channel: &str) -> Result<()> {
    let generator = GeneratorClient::new(settings.generator_config())?;
    let index = IndexHandle::eager(settings.vault_path.clone());
    let store = SessionStore::open(&settings.session_path, settings.session_max_turns);
    let reply = answer_query(&index, &store, &generator, settings, user, channel, text)?;
    println!("{reply}");
    Ok(())
}
