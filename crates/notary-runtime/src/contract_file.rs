//! Deployed contract address persisted between runs.
//!
//! The file holds a single `0x`-prefixed address and a trailing newline.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use shared_types::{parse_address, to_prefixed_hex, Address};
use tracing::info;

/// `None` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<Address>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }
    };
    let address = parse_address(contents.trim())
        .with_context(|| format!("{} does not hold a contract address", path.display()))?;
    Ok(Some(address))
}

pub fn save(path: &Path, address: &Address) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", to_prefixed_hex(address)))
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), contract = %to_prefixed_hex(address), "Saved contract address");
    Ok(())
}
