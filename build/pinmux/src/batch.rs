// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generation of synthetic test boards from the catalog.
//!
//! Every (MCU, configuration) pair gets its own fresh `Allocation`, fed the
//! configuration's peripherals through `auto_select`.  A board that can't
//! have all of its peripherals is skipped, not failed: not every MCU has
//! every peripheral.

use crate::snapshot::Snapshot;
use crate::{AllocError, Allocation};
use anyhow::{Context, Result};
use build_mcu::{CatalogDir, LoadCapacitors, McuEntry, Package, Templates};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File written into each board directory.
pub const BOARD_FILE: &str = "pinmux.json";

const BUILTIN_CONFIGS: &str = include_str!("../default-configs.toml");

/// The board matrix, read from TOML.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BoardConfigs {
    /// MCUs that get no boards at all.
    #[serde(default)]
    pub skip_mcus: Vec<String>,
    /// UART added to every board of an MCU with a FLPR core.
    #[serde(default)]
    pub flpr_console: Option<String>,
    /// Internal load capacitance per oscillator; oscillators not listed use
    /// their catalog default.
    #[serde(default)]
    pub oscillator_femtofarad: BTreeMap<String, u32>,
    /// Configuration name to the peripherals it enables.
    pub configs: IndexMap<String, Vec<String>>,
}

impl BoardConfigs {
    pub fn builtin() -> Result<Self> {
        build_util::toml_from_str(BUILTIN_CONFIGS)
            .context("built-in board configurations")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        build_util::toml_from_path(path)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoardOutcome {
    Generated(Snapshot),
    /// `peripheral` couldn't be placed; the whole configuration is dropped.
    Skipped { peripheral: String, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub mcus: usize,
    pub boards: usize,
    pub skipped: usize,
    /// MCUs whose package or template files could not be loaded.
    pub failed_mcus: Vec<String>,
}

pub fn board_name(mcu: &str, config: &str) -> String {
    format!("test_board_{mcu}_{config}")
}

/// Selects one peripheral the way the generator does.  Routed peripherals
/// need a device-tree template; without one they're unavailable.
fn place(
    alloc: &mut Allocation<'_>,
    configs: &BoardConfigs,
    id: &str,
) -> std::result::Result<(), String> {
    let Some(p) = alloc.package().peripheral(id) else {
        return Err("not in this package".to_string());
    };
    let r = if p.is_oscillator() {
        let config = match configs.oscillator_femtofarad.get(id) {
            Some(&femtofarad) => LoadCapacitors::Internal { femtofarad },
            None => p.default_oscillator_config(),
        };
        alloc.configure_oscillator(id, config)
    } else if p.is_fixed() {
        alloc.enable_fixed(id)
    } else if alloc.templates().and_then(|t| t.for_peripheral(id)).is_none() {
        return Err("no device-tree template".to_string());
    } else {
        alloc.auto_select(id)
    };
    r.map_err(|e| e.to_string())
}

/// Builds one board.  Oscillators and fixed-pin peripherals go in first,
/// since their pins are not negotiable; the rest follow in configuration
/// order.
pub fn generate_board(
    package: &Package,
    templates: &Templates,
    mcu: &McuEntry,
    ids: &[String],
    configs: &BoardConfigs,
) -> std::result::Result<BoardOutcome, AllocError> {
    let mut alloc = Allocation::new(package, Some(templates));
    let (pinned, routed): (Vec<&String>, Vec<&String>) =
        ids.iter().partition(|id| {
            package
                .peripheral(id)
                .is_some_and(|p| p.is_oscillator() || p.is_fixed())
        });

    for id in pinned.into_iter().chain(routed) {
        if let Err(reason) = place(&mut alloc, configs, id) {
            return Ok(BoardOutcome::Skipped {
                peripheral: id.clone(),
                reason,
            });
        }
        log::debug!("  {id}: {:?}", alloc.selection(id));
    }

    if mcu.supports_flpr {
        if let Some(id) = &configs.flpr_console {
            match place(&mut alloc, configs, id) {
                Ok(()) => {
                    log::debug!("  {id} (FLPR): {:?}", alloc.selection(id));
                }
                Err(e) => log::warn!(
                    "could not configure {id} for the FLPR core of {}: {e}",
                    mcu.id
                ),
            }
        }
    }

    let console = alloc.selected_uarts().first().map(|s| s.to_string());
    alloc.set_console(console.as_deref())?;
    Ok(BoardOutcome::Generated(alloc.snapshot()))
}

fn load(
    cat: &CatalogDir,
    mcu: &McuEntry,
) -> Result<(String, Package, Templates)> {
    let entry = cat.package_entry(mcu, None)?;
    let package = cat.load_package(mcu, entry)?;
    let templates = cat.load_templates(mcu)?;
    Ok((entry.file.clone(), package, templates))
}

/// Generates every configured board for every MCU in the catalog, writing
/// `<out>/test_board_<mcu>_<config>/pinmux.json`.
///
/// An MCU whose files can't be loaded is logged and recorded in the
/// summary; the other MCUs are still generated.  Only a failure to write
/// output is returned as an error.
pub fn generate_all(
    cat: &CatalogDir,
    out: &Path,
    configs: &BoardConfigs,
) -> Result<GenerateSummary> {
    let mut summary = GenerateSummary::default();

    for mcu in &cat.manifest().mcus {
        if configs.skip_mcus.contains(&mcu.id) {
            log::info!("skipping {}: listed in skip-mcus", mcu.id);
            continue;
        }
        log::info!(
            "MCU {} (non-secure: {}, FLPR: {})",
            mcu.id,
            mcu.supports_non_secure,
            mcu.supports_flpr
        );
        summary.mcus += 1;

        let (file, package, templates) = match load(cat, mcu) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("{}: {e:#}", mcu.id);
                summary.failed_mcus.push(mcu.id.clone());
                continue;
            }
        };

        for (name, ids) in &configs.configs {
            let board = board_name(&mcu.id, name);
            match generate_board(&package, &templates, mcu, ids, configs)? {
                BoardOutcome::Generated(mut snapshot) => {
                    snapshot.mcu = Some(mcu.id.clone());
                    snapshot.package = Some(file.clone());
                    let path: PathBuf = out.join(&board).join(BOARD_FILE);
                    build_util::write_json(&path, &snapshot)?;
                    log::info!("  {board}: {}", path.display());
                    summary.boards += 1;
                }
                BoardOutcome::Skipped { peripheral, reason } => {
                    log::info!(
                        "  skipping config {name}: {peripheral} unavailable \
                         for {} ({reason})",
                        mcu.id
                    );
                    summary.skipped += 1;
                }
            }
        }
    }

    log::info!(
        "MCUs processed: {}, boards generated: {}, skipped: {}",
        summary.mcus,
        summary.boards,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use crate::selected::Record;
    use build_mcu::{HFXO, LFXO};
    use indoc::indoc;
    use serde_json::json;

    fn mcu(flpr: bool) -> McuEntry {
        serde_json::from_value(json!({
            "id": "nrf54l15",
            "name": "nRF54L15",
            "packages": [{ "file": "QFAA", "name": "QFN48" }],
            "supportsFLPR": flpr,
        }))
        .unwrap()
    }

    fn records(outcome: &BoardOutcome) -> Vec<&str> {
        match outcome {
            BoardOutcome::Generated(s) => {
                s.selected_peripherals.iter().map(|r| r.id.as_str()).collect()
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn builtin_matrix() {
        let c = BoardConfigs::builtin().unwrap();
        assert_eq!(c.skip_mcus, ["nrf54lv10a"]);
        assert_eq!(c.flpr_console.as_deref(), Some("UARTE30"));
        assert_eq!(c.oscillator_femtofarad[LFXO], 17000);
        let names: Vec<_> = c.configs.keys().map(String::as_str).collect();
        assert_eq!(names, ["minimal", "spi_i2c", "pwm_adc", "full"]);
        assert_eq!(c.configs["full"].len(), 8);
    }

    #[test]
    fn unknown_keys_are_refused() {
        let text = indoc! {r#"
            skip-mcu = ["nrf54lv10a"]

            [configs]
            minimal = ["HFXO", "UARTE20"]
        "#};
        assert!(build_util::toml_from_str::<BoardConfigs>(text).is_err());

        let text = indoc! {r#"
            [configs]
            minimal = ["HFXO", "UARTE20"]
        "#};
        let c: BoardConfigs = build_util::toml_from_str(text).unwrap();
        assert!(c.flpr_console.is_none());
        assert!(c.skip_mcus.is_empty());
    }

    #[test]
    fn full_board() {
        let package = fixture::package();
        let templates = fixture::templates();
        let configs = BoardConfigs::builtin().unwrap();
        let outcome = generate_board(
            &package,
            &templates,
            &mcu(false),
            &configs.configs["full"],
            &configs,
        )
        .unwrap();
        assert_eq!(
            records(&outcome),
            [
                HFXO,
                LFXO,
                "NFCT",
                "UARTE20",
                "SPIM/SPIS21",
                "TWIM/TWIS22",
                "PWM20",
                "SAADC",
            ]
        );
        let BoardOutcome::Generated(snapshot) = outcome else {
            unreachable!()
        };
        assert_eq!(snapshot.console_uart.as_deref(), Some("UARTE20"));

        let lfxo = &snapshot.selected_peripherals[1];
        assert_eq!(
            lfxo.config,
            Some(json!({
                "loadCapacitors": "internal",
                "loadCapacitanceFemtofarad": 17000,
            }))
        );
        let spi = &snapshot.selected_peripherals[4];
        assert_eq!(spi.chip_select.as_deref(), Some("P2.00"));
        let twi = &snapshot.selected_peripherals[5];
        assert_eq!(
            twi.pin_functions.as_ref().unwrap().get("P1.09").unwrap(),
            "SCL"
        );
        let saadc = &snapshot.selected_peripherals[7];
        assert!(saadc.pin_functions.as_ref().unwrap().is_empty());
    }

    #[test]
    fn unavailable_peripherals_skip_the_board() {
        let package = fixture::package();
        let mut templates = fixture::templates();
        let configs = BoardConfigs::builtin().unwrap();
        let outcome = generate_board(
            &package,
            &templates,
            &mcu(false),
            &configs.configs["pwm_adc"],
            &configs,
        )
        .unwrap();
        assert_eq!(
            outcome,
            BoardOutcome::Skipped {
                peripheral: "PWM21".into(),
                reason: "not in this package".into(),
            }
        );

        templates.templates.shift_remove("TWIM/TWIS22");
        let outcome = generate_board(
            &package,
            &templates,
            &mcu(false),
            &configs.configs["spi_i2c"],
            &configs,
        )
        .unwrap();
        assert!(matches!(
            outcome,
            BoardOutcome::Skipped { ref peripheral, .. }
                if peripheral == "TWIM/TWIS22"
        ));
    }

    #[test]
    fn flpr_console_is_best_effort() {
        let package = fixture::package();
        let templates = fixture::templates();
        let configs = BoardConfigs::builtin().unwrap();

        let minimal = generate_board(
            &package,
            &templates,
            &mcu(true),
            &configs.configs["minimal"],
            &configs,
        )
        .unwrap();
        assert_eq!(records(&minimal), [HFXO, "UARTE20", "UARTE30"]);

        // Port 0 is all taken by the LFXO and the NFC antenna.
        let full = generate_board(
            &package,
            &templates,
            &mcu(true),
            &configs.configs["full"],
            &configs,
        )
        .unwrap();
        assert!(!records(&full).contains(&"UARTE30"));
    }

    fn write(path: &Path, value: serde_json::Value) {
        build_util::write_json(path, &value).unwrap();
    }

    #[test]
    fn whole_catalog() {
        let catalog = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let root = catalog.path();
        write(
            &root.join(build_mcu::MANIFEST_FILE),
            json!({ "mcus": [
                { "id": "nrf54l15", "name": "nRF54L15", "supportsFLPR": true,
                  "packages": [{ "file": "QFAA", "name": "QFN48" }] },
                { "id": "nrf54lv10a", "name": "nRF54LV10A",
                  "packages": [{ "file": "QFAA", "name": "QFN48" }] },
                { "id": "nrf54lm20a", "name": "nRF54LM20A",
                  "packages": [{ "file": "QFAA", "name": "QFN48" }] },
            ]}),
        );
        write(&root.join("nrf54l15/QFAA.json"), fixture::package_json());
        write(
            &root.join("nrf54l15").join(build_mcu::TEMPLATES_FILE),
            fixture::templates_json(),
        );
        // nrf54lm20a has a package but no templates.
        write(&root.join("nrf54lm20a/QFAA.json"), fixture::package_json());

        let cat = CatalogDir::open(root).unwrap();
        let configs = BoardConfigs::builtin().unwrap();
        let summary = generate_all(&cat, out.path(), &configs).unwrap();
        assert_eq!(
            summary,
            GenerateSummary {
                mcus: 2,
                boards: 3,
                skipped: 1,
                failed_mcus: vec!["nrf54lm20a".into()],
            }
        );

        // Each board starts from scratch, so UARTE20 lands on the same pins
        // whatever came before it.
        let mut uarte20: Option<Record> = None;
        for config in ["minimal", "spi_i2c", "full"] {
            let path = out
                .path()
                .join(board_name("nrf54l15", config))
                .join(BOARD_FILE);
            let snapshot = Snapshot::from_path(&path).unwrap();
            assert_eq!(snapshot.mcu.as_deref(), Some("nrf54l15"));
            assert_eq!(snapshot.package.as_deref(), Some("QFAA"));
            let record = snapshot
                .selected_peripherals
                .iter()
                .find(|r| r.id == "UARTE20")
                .unwrap()
                .clone();
            match &uarte20 {
                Some(first) => assert_eq!(&record, first),
                None => uarte20 = Some(record),
            }

            let package = fixture::package();
            let templates = fixture::templates();
            let mut alloc = Allocation::new(&package, Some(&templates));
            alloc.apply_snapshot(&snapshot).unwrap();
            alloc.check_invariants().unwrap();
        }
        assert!(!out
            .path()
            .join(board_name("nrf54l15", "pwm_adc"))
            .exists());
        assert!(!out
            .path()
            .join(board_name("nrf54lv10a", "minimal"))
            .exists());
    }
}
