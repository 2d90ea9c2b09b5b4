//! Config command - inspect configuration

use crate::{TagqError, cli::ConfigCommands, config::EngineConfig};

type Result<T> = std::result::Result<T, TagqError>;

/// Execute a config subcommand
///
/// # Errors
/// Returns `TagqError::ConfigError` if the configuration cannot be rendered or
/// the config directory cannot be determined.
pub fn execute(config: &EngineConfig, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => print!("{}", config.to_toml()?),
        ConfigCommands::Path => println!("{}", EngineConfig::config_path()?.display()),
    }
    Ok(())
}
