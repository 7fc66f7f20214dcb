// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ahead-of-time checks over catalog data.
//!
//! Live allocation assumes well-formed catalogs (and merely treats a bad
//! pattern as "no candidates"); this is where such defects get reported.

use crate::manifest::CatalogDir;
use crate::package::Package;
use crate::template::Templates;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Defect {
    #[error("MCU {mcu} has no packages listed in manifest")]
    NoPackages { mcu: String },
    #[error("package file missing: {file} (listed in manifest)")]
    MissingPackageFile { file: String },
    #[error("{file}: {error}")]
    Unparseable { file: String, error: String },
    #[error("{file}: pins array is empty")]
    NoPins { file: String },
    #[error("{file}: duplicate packagePinId \"{id}\" in pins array")]
    DuplicatePackagePinId { file: String, id: String },
    #[error("{file}: duplicate pin name \"{name}\"")]
    DuplicatePinName { file: String, name: String },
    #[error("{file}: duplicate peripheral id \"{id}\"")]
    DuplicatePeripheral { file: String, id: String },
    #[error("{file}: {peripheral} declares signal {signal} more than once")]
    DuplicateSignal { file: String, peripheral: String, signal: String },
    #[error(
        "{file}: {peripheral}.{signal} has invalid allowedGpio pattern \
         \"{pattern}\""
    )]
    InvalidPattern {
        file: String,
        peripheral: String,
        signal: String,
        pattern: String,
    },
}

/// Outcome of validating a whole catalog directory.
#[derive(Debug, Default)]
pub struct Report {
    pub files_checked: usize,
    pub files_passed: usize,
    pub defects: Vec<Defect>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.defects.is_empty()
    }
}

/// Structural checks on one parsed package file.  `file` labels the
/// defects.
pub fn validate_package(file: &str, pkg: &Package) -> Vec<Defect> {
    let mut out = vec![];
    let file = file.to_string();

    if pkg.pins.is_empty() {
        out.push(Defect::NoPins { file: file.clone() });
    }

    let mut pin_ids = HashSet::new();
    let mut pin_names = HashSet::new();
    for pin in &pkg.pins {
        if let Some(id) = &pin.package_pin_id {
            if !pin_ids.insert(id) {
                out.push(Defect::DuplicatePackagePinId {
                    file: file.clone(),
                    id: id.clone(),
                });
            }
        }
        // Compare canonically so that `P1.4` and `P1.04` collide.
        let key =
            pin.id().map_or_else(|| pin.name.clone(), |id| id.to_string());
        if !pin_names.insert(key) {
            out.push(Defect::DuplicatePinName {
                file: file.clone(),
                name: pin.name.clone(),
            });
        }
    }

    let mut periph_ids = HashSet::new();
    for periph in &pkg.soc_peripherals {
        if !periph_ids.insert(&periph.id) {
            out.push(Defect::DuplicatePeripheral {
                file: file.clone(),
                id: periph.id.clone(),
            });
        }
        let mut signals = HashSet::new();
        for signal in &periph.signals {
            if !signals.insert(&signal.name) {
                out.push(Defect::DuplicateSignal {
                    file: file.clone(),
                    peripheral: periph.id.clone(),
                    signal: signal.name.clone(),
                });
            }
            let patterns = signal.allowed_gpio.iter().zip(signal.patterns());
            for (raw, parsed) in patterns {
                if parsed.is_err() {
                    out.push(Defect::InvalidPattern {
                        file: file.clone(),
                        peripheral: periph.id.clone(),
                        signal: signal.name.clone(),
                        pattern: raw.clone(),
                    });
                }
            }
        }
    }

    out
}

/// Cross-references the manifest against the files on disk, then parses and
/// checks every listed package (and the MCU's templates, when present).
pub fn validate_catalog(cat: &CatalogDir) -> Report {
    let mut report = Report::default();

    for mcu in &cat.manifest().mcus {
        log::info!("MCU: {} ({})", mcu.id, mcu.name);
        if mcu.packages.is_empty() {
            report.defects.push(Defect::NoPackages { mcu: mcu.id.clone() });
            continue;
        }

        for pkg in &mcu.packages {
            let label = format!("{}/{}.json", mcu.id, pkg.file);
            let path = cat.package_path(mcu, pkg);
            if !path.exists() {
                report.defects.push(Defect::MissingPackageFile { file: label });
                continue;
            }

            report.files_checked += 1;
            let parsed: anyhow::Result<Package> =
                build_util::json_from_path(&path);
            let defects = match parsed {
                Ok(pkg) => validate_package(&label, &pkg),
                Err(e) => vec![Defect::Unparseable {
                    file: label.clone(),
                    error: format!("{e:#}"),
                }],
            };
            if defects.is_empty() {
                log::info!("  PASS: {label}");
                report.files_passed += 1;
            } else {
                log::error!("  FAIL: {label}");
            }
            report.defects.extend(defects);
        }

        let templates = cat.templates_path(mcu);
        if templates.exists() {
            if let Err(e) = build_util::json_from_path::<Templates>(&templates)
            {
                report.defects.push(Defect::Unparseable {
                    file: format!("{}/{}", mcu.id, crate::TEMPLATES_FILE),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    report
}
