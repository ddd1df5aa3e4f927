//! Command implementations dispatched from `main` (§6.5).

mod batch;
mod serve;

pub use batch::cmd_batch;
pub use serve::cmd_serve;

use centsible_core::{Config, Database, Result, SearchClient};

/// Builds the core handles shared by both subcommands from a resolved
/// `Config`.
pub fn open(config: &Config) -> Result<(Database, SearchClient)> {
    let db = Database::new(&config.store_path)?;
    let search = SearchClient::new(config.search_endpoint.as_deref(), &config.search_model);
    Ok((db, search))
}
