//! Default file locations under the user's home directory.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory holding the socket and database, relative to $HOME.
const DATA_DIR_NAME: &str = ".studysmart";

/// Returns the application data directory (~/.studysmart).
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Returns the default daemon socket path.
pub fn default_socket_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("studysmart.sock"))
}

/// Returns the default database path.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("studysmart.db"))
}
