//! Command implementations
//!
//! Each command is a module with an execute function that takes parsed CLI args
//! and executes the operation against the database.

pub mod config;
pub mod explain;
pub mod import;
pub mod normalize;
pub mod search;

pub use config::execute as config;
pub use explain::execute as explain;
pub use import::execute as import;
pub use normalize::execute as normalize;
pub use search::execute as search;
