// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{bail, Context, Result};
use build_mcu::{validate_catalog, CatalogDir, Devkit, Package, Templates};
use build_pinmux::batch::{self, BoardConfigs};
use build_pinmux::{Allocation, AllocError, Snapshot};
use clap::{Args, Parser, Subcommand};
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[clap(max_term_width = 80, about = "MCU pin planner")]
struct Cli {
    #[clap(subcommand)]
    cmd: Cmd,
}

/// Which package of which MCU to work on.
#[derive(Debug, Args)]
struct Target {
    /// Catalog directory (holding manifest.json)
    #[clap(long)]
    catalog: PathBuf,
    /// MCU id, as listed in the manifest
    #[clap(long)]
    mcu: String,
    /// Package file stem; defaults to the MCU's first package
    #[clap(long)]
    package: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Check every package listed in a catalog
    Validate {
        /// Catalog directory (holding manifest.json)
        #[clap(long)]
        catalog: PathBuf,
    },
    /// Generate test boards for every MCU in a catalog
    Generate {
        /// Catalog directory (holding manifest.json)
        #[clap(long)]
        catalog: PathBuf,
        /// Directory the board directories are written into
        #[clap(long)]
        out: PathBuf,
        /// Board configurations (TOML); the built-in matrix if omitted
        #[clap(long)]
        configs: Option<PathBuf>,
    },
    /// Apply a saved selection and print the pins it uses
    Check {
        #[clap(flatten)]
        target: Target,
        /// Snapshot file (JSON)
        snapshot: PathBuf,
    },
    /// List the pins each signal of a peripheral could go to
    Candidates {
        #[clap(flatten)]
        target: Target,
        /// Reference board (JSON) whose pins are taken first
        #[clap(long)]
        devkit: Option<PathBuf>,
        /// Peripheral id, e.g. UARTE20
        peripheral: String,
    },
}

struct Loaded {
    package: Package,
    templates: Templates,
}

impl Target {
    fn load(&self) -> Result<Loaded> {
        let cat = CatalogDir::open(&self.catalog)?;
        let mcu = cat.mcu(&self.mcu)?;
        let entry = cat.package_entry(mcu, self.package.as_deref())?;
        let package = cat.load_package(mcu, entry)?;
        let templates = cat.load_templates_or_default(mcu)?;
        Ok(Loaded { package, templates })
    }
}

fn load_devkit(path: &Path, mcu: &str) -> Result<Devkit> {
    let devkit = Devkit::from_path(path)?;
    if !devkit.supports(mcu) {
        bail!(
            "{} ({}) is not made for {mcu}",
            path.display(),
            devkit.description
        );
    }
    Ok(devkit)
}

fn validate(catalog: &Path, output: &mut String) -> Result<()> {
    let cat = CatalogDir::open(catalog)?;
    let report = validate_catalog(&cat);
    for defect in &report.defects {
        writeln!(output, "{defect}")?;
    }
    writeln!(
        output,
        "{} of {} package files passed",
        report.files_passed, report.files_checked
    )?;
    if !report.is_ok() {
        print!("{output}");
        bail!("{} defect(s) in {}", report.defects.len(), catalog.display());
    }
    Ok(())
}

fn generate(
    catalog: &Path,
    out: &Path,
    configs: Option<&Path>,
    output: &mut String,
) -> Result<()> {
    let cat = CatalogDir::open(catalog)?;
    let configs = match configs {
        Some(path) => BoardConfigs::from_path(path)?,
        None => BoardConfigs::builtin()?,
    };
    let summary = batch::generate_all(&cat, out, &configs)?;
    writeln!(
        output,
        "{} boards generated for {} MCUs, {} configurations skipped",
        summary.boards, summary.mcus, summary.skipped
    )?;
    if !summary.failed_mcus.is_empty() {
        print!("{output}");
        bail!("could not load {}", summary.failed_mcus.join(", "));
    }
    Ok(())
}

fn check(target: &Target, path: &Path, output: &mut String) -> Result<()> {
    let loaded = target.load()?;
    let snapshot = Snapshot::from_path(path)?;
    if let Some(mcu) = &snapshot.mcu {
        if *mcu != target.mcu {
            log::warn!("{} was saved for {mcu}", path.display());
        }
    }

    let mut alloc = Allocation::new(&loaded.package, Some(&loaded.templates));
    alloc
        .apply_snapshot(&snapshot)
        .with_context(|| format!("{} rejected", path.display()))?;

    for (pin, used) in alloc.used_pins() {
        writeln!(
            output,
            "{pin:<8} {:<14} {:<6} {:?}{}",
            used.owner,
            used.function,
            used.kind,
            if used.mandatory { "" } else { " (optional)" },
        )?;
    }
    if let Some(console) = alloc.console() {
        writeln!(output, "console: {console}")?;
    }
    Ok(())
}

fn candidates(
    target: &Target,
    id: &str,
    devkit: Option<&Path>,
    output: &mut String,
) -> Result<()> {
    let loaded = target.load()?;
    let mut alloc = Allocation::new(&loaded.package, Some(&loaded.templates));
    if let Some(path) = devkit {
        let devkit = load_devkit(path, &target.mcu)?;
        alloc
            .apply_devkit(&devkit)
            .with_context(|| format!("{} rejected", path.display()))?;
    }
    let plan = match alloc.begin_selection(id) {
        Ok(plan) => plan,
        Err(AllocError::UnknownPeripheral(_)) => {
            bail!("{}", loaded.package.peripheral_suggestion(id));
        }
        Err(e) => return Err(e.into()),
    };

    for choice in &plan.signals {
        write!(output, "{}", choice.signal.name)?;
        if choice.mandatory {
            write!(output, " (mandatory)")?;
        }
        if choice.chip_select {
            write!(output, " (chip select)")?;
        }
        writeln!(output, ":")?;
        if choice.candidates.is_empty() {
            writeln!(output, "    no candidates")?;
        }
        for c in &choice.candidates {
            match &c.owner {
                Some(owner) if !c.free => {
                    writeln!(output, "    {:<8} used by {owner}", c.pin.name)?
                }
                _ => writeln!(output, "    {}", c.pin.name)?,
            }
        }
    }
    Ok(())
}

fn run(cmd: &Cmd, output: &mut String) -> Result<()> {
    match cmd {
        Cmd::Validate { catalog } => validate(catalog, output),
        Cmd::Generate { catalog, out, configs } => {
            generate(catalog, out, configs.as_deref(), output)
        }
        Cmd::Check { target, snapshot } => check(target, snapshot, output),
        Cmd::Candidates { target, devkit, peripheral } => {
            candidates(target, peripheral, devkit.as_deref(), output)
        }
    }
}

fn main() -> Result<()> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let cli = Cli::parse();
    let mut output = String::new();
    run(&cli.cmd, &mut output)?;
    print!("{output}");

    Ok(())
}
