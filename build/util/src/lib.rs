// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

///
/// Reads and parses a JSON document.  This will fail if the file doesn't
/// exist or doesn't parse; the error names the offending path.  Note that
/// -- thanks to the magic of Serde -- `T` need not describe the entire
/// document, but only those parts that the caller cares about.  Catalog
/// files in particular carry rendering metadata that the allocator never
/// looks at, so types used here should generally *not* set
/// `deny_unknown_fields`.
///
pub fn json_from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    log::debug!("--- json from {} ({} bytes) ---", path.display(), text.len());
    let rval = serde_json::from_str(&text)
        .with_context(|| format!("could not parse {}", path.display()))?;
    Ok(rval)
}

/// Reads and parses a TOML document. See `json_from_path` for details.
pub fn toml_from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    log::debug!("--- toml from {} ---", path.display());
    log::debug!("{}", text);
    toml_from_str(&text)
        .with_context(|| format!("could not parse {}", path.display()))
}

/// Parses TOML text that isn't backed by a file (e.g. a built-in default).
pub fn toml_from_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(toml::from_str(text)?)
}

/// Equivalent to `json_from_path`, but uses `T::default()` if the file is
/// missing. If the file exists and fails to parse, this still fails with
/// `Err`.
pub fn json_from_path_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T> {
    if !path.exists() {
        log::debug!("--- {} not present, using default ---", path.display());
        return Ok(T::default());
    }
    json_from_path(path)
}

/// Serializes `value` as pretty-printed JSON, creating parent directories
/// as needed.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("could not create {}", parent.display())
        })?;
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    std::fs::write(path, text)
        .with_context(|| format!("could not write {}", path.display()))
}
