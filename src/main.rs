//! Tagq CLI application entry point
//!
//! Command-line front end for the tagq query engine. Posts are imported from a
//! JSON catalog into an embedded database and searched with booru-style queries.
//!
//! # Usage
//!
//! ```bash
//! # Load posts, users, pools and aliases
//! tagq import catalog.json
//!
//! # Search anonymously or as a user
//! tagq search "cat_ears -dog rating:s order:score"
//! tagq search "fav:alice" --as alice
//!
//! # Inspect how a query is interpreted
//! tagq explain "~cat ~dog order:rank"
//! tagq normalize "Dog cat dog"
//!
//! # Quiet mode (only output ids)
//! tagq -q search cat
//! ```
//!
//! # Configuration
//!
//! Engine limits are read from the user's config directory
//! (`~/.config/tagq/config.toml` on Linux). Set `RUST_LOG=debug` to trace the
//! query pipeline.

use tagq::{
    TagqError,
    cli::{Cli, Commands},
    commands,
    config::EngineConfig,
    db::Database,
    output,
};

type Result<T> = std::result::Result<T, TagqError>;

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::load()?;

    if let Commands::Config { command } = &cli.command {
        return commands::config(&config, *command);
    }

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database.clone())
        .unwrap_or_else(EngineConfig::default_database_path);
    log::debug!("opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    match &cli.command {
        Commands::Import { file } => commands::import(&db, file, cli.quiet),
        Commands::Search {
            query,
            user,
            hide_deleted,
        } => commands::search(
            &db,
            &config,
            query,
            user.as_deref(),
            *hide_deleted,
            cli.quiet,
        ),
        Commands::Explain { query } => commands::explain(&db, &config, query, cli.quiet),
        Commands::Normalize { query } => commands::normalize(&db, &config, query),
        Commands::Config { command } => commands::config(&config, *command),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli) {
        eprintln!("{}", output::error(&e.to_string()));
        std::process::exit(1);
    }
}
