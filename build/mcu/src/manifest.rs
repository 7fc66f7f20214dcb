// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::package::Package;
use crate::template::Templates;
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const TEMPLATES_FILE: &str = "devicetree-templates.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub mcus: Vec<McuEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McuEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
    #[serde(default)]
    pub supports_non_secure: bool,
    #[serde(default, rename = "supportsFLPR")]
    pub supports_flpr: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageEntry {
    /// File stem of the package file under the MCU's directory.
    pub file: String,
    pub name: String,
}

/// A catalog directory: `manifest.json` at the top, one directory per MCU
/// holding `<package>.json` files and `devicetree-templates.json`.
#[derive(Clone, Debug)]
pub struct CatalogDir {
    root: PathBuf,
    manifest: Manifest,
}

impl CatalogDir {
    /// Reads the manifest.  A missing manifest is fatal.
    pub fn open(root: &Path) -> Result<Self> {
        let manifest = build_util::json_from_path(&root.join(MANIFEST_FILE))?;
        Ok(CatalogDir { root: root.to_owned(), manifest })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn mcu(&self, id: &str) -> Result<&McuEntry> {
        self.manifest.mcus.iter().find(|m| m.id == id).ok_or_else(|| {
            let known: Vec<_> =
                self.manifest.mcus.iter().map(|m| m.id.as_str()).collect();
            anyhow!("MCU '{id}' is not in the manifest (known: {known:?})")
        })
    }

    pub fn package_path(&self, mcu: &McuEntry, pkg: &PackageEntry) -> PathBuf {
        self.root.join(&mcu.id).join(format!("{}.json", pkg.file))
    }

    pub fn templates_path(&self, mcu: &McuEntry) -> PathBuf {
        self.root.join(&mcu.id).join(TEMPLATES_FILE)
    }

    /// Picks `file` among the MCU's packages, or the first package if no
    /// file is given.
    pub fn package_entry<'a>(
        &self,
        mcu: &'a McuEntry,
        file: Option<&str>,
    ) -> Result<&'a PackageEntry> {
        match file {
            Some(f) => match mcu.packages.iter().find(|p| p.file == f) {
                Some(p) => Ok(p),
                None => bail!("package '{f}' is not listed for {}", mcu.id),
            },
            None => match mcu.packages.first() {
                Some(p) => Ok(p),
                None => bail!("no packages listed for {}", mcu.id),
            },
        }
    }

    pub fn load_package(
        &self,
        mcu: &McuEntry,
        pkg: &PackageEntry,
    ) -> Result<Package> {
        let path = self.package_path(mcu, pkg);
        if !path.exists() {
            bail!("package file not found: {}", path.display());
        }
        Package::from_path(&path)
    }

    /// Loads the MCU's device-tree templates; they are required.
    pub fn load_templates(&self, mcu: &McuEntry) -> Result<Templates> {
        let path = self.templates_path(mcu);
        if !path.exists() {
            bail!("device-tree templates not found: {}", path.display());
        }
        build_util::json_from_path(&path)
    }

    /// Like `load_templates`, but an MCU without templates gets an empty
    /// set.
    pub fn load_templates_or_default(
        &self,
        mcu: &McuEntry,
    ) -> Result<Templates> {
        build_util::json_from_path_or_default(&self.templates_path(mcu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(path: &Path, value: serde_json::Value) {
        build_util::write_json(path, &value).unwrap();
    }

    #[test]
    fn open_and_load() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join(MANIFEST_FILE),
            json!({ "mcus": [{
                "id": "nrf54l15",
                "name": "nRF54L15",
                "supportsFLPR": true,
                "packages": [{ "file": "QFAA-QFN48", "name": "QFN48" }],
            }]}),
        );
        write(
            &dir.path().join("nrf54l15/QFAA-QFN48.json"),
            json!({ "pins": [{ "name": "P1.04", "functions": ["Digital I/O"] }] }),
        );

        let cat = CatalogDir::open(dir.path()).unwrap();
        let mcu = cat.mcu("nrf54l15").unwrap();
        assert!(mcu.supports_flpr);
        assert!(!mcu.supports_non_secure);
        let entry = cat.package_entry(mcu, None).unwrap();
        let pkg = cat.load_package(mcu, entry).unwrap();
        assert_eq!(pkg.pins.len(), 1);
        assert!(pkg.peripheral("HFXO").is_some());

        assert!(cat.load_templates(mcu).is_err());
        assert!(cat.load_templates_or_default(mcu).unwrap().is_empty());
        assert!(cat.package_entry(mcu, Some("WLCSP")).is_err());
        assert!(cat.mcu("nrf52840").is_err());
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CatalogDir::open(dir.path()).is_err());
    }
}
