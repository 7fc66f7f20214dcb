// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::assign::{self, is_routed, routes_chip_select, AutoAssignment};
use crate::resolve::{allows, candidates};
use crate::selected::{
    FixedSelection, GenericSelection, PeripheralConfig, PinKind,
    SelectedPeripheral, UsedPin,
};
use crate::AllocError;
use anyhow::bail;
use build_mcu::{
    BaseAddress, LoadCapacitors, Package, Peripheral, PeripheralTemplate,
    PeripheralType, Pin, Signal, Templates, CHIP_SELECT, HFXO, UART_RXD,
};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

/// Owner recorded for the high-frequency crystal terminals.
pub const SYSTEM_CRYSTAL_OWNER: &str = "32MHz Crystal";

/// Functions of the two crystal terminals, in catalog order.
const CRYSTAL_FUNCTIONS: [&str; 2] = ["XC1", "XC2"];

/// Which mandatory signals a routed placement insists on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Required {
    /// Every mandatory signal with allowed pins.
    All,
    /// Only those the device-tree template routes; used when nobody chose
    /// the pins (auto-selection, replaying generated boards).
    Routed,
}

/// Pins requested for a routed peripheral.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinSelection {
    /// Pin name to signal name.  A chip select may be given here or in
    /// `chip_select`, but not both.
    pub pin_functions: IndexMap<String, String>,
    pub chip_select: Option<String>,
    pub config: PeripheralConfig,
}

/// What `begin_selection` hands a driver: every signal of the peripheral with
/// its candidates and who currently holds each of them.
#[derive(Clone, Debug)]
pub struct SelectionPlan<'a> {
    pub peripheral: &'a Peripheral,
    pub signals: Vec<SignalChoice<'a>>,
}

#[derive(Clone, Debug)]
pub struct SignalChoice<'a> {
    pub signal: &'a Signal,
    /// Mandatory, and something routing deals with.
    pub mandatory: bool,
    /// The signal goes into the dedicated chip-select slot.
    pub chip_select: bool,
    /// Pin the peripheral holds for this signal right now, if selected.
    pub current: Option<String>,
    pub candidates: Vec<Candidate<'a>>,
}

#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub pin: &'a Pin,
    pub owner: Option<String>,
    /// Unowned, or owned by the peripheral being selected.
    pub free: bool,
}

/// Pin and base-address occupancy for one chip package.
///
/// This is the only place selections are recorded, and every mutation goes
/// through a `&mut self` method that either applies completely or returns an
/// error with nothing changed.  Independent boards use independent
/// `Allocation`s.
#[derive(Clone, Debug)]
pub struct Allocation<'a> {
    pub(crate) package: &'a Package,
    pub(crate) templates: Option<&'a Templates>,
    pub(crate) selected: IndexMap<String, SelectedPeripheral>,
    pub(crate) used_pins: BTreeMap<String, UsedPin>,
    pub(crate) used_addresses: BTreeMap<BaseAddress, String>,
    pub(crate) console: Option<String>,
}

/// How the catalog says a peripheral is configured, for error messages.
pub(crate) fn catalog_kind(p: &Peripheral) -> &'static str {
    if p.is_oscillator() {
        "an oscillator"
    } else if p.is_fixed() {
        "a fixed-pin peripheral"
    } else {
        "a routed peripheral"
    }
}

impl<'a> Allocation<'a> {
    /// Creates the allocation for a freshly loaded package: system pins
    /// reserved and the high-frequency oscillator in place.
    pub fn new(package: &'a Package, templates: Option<&'a Templates>) -> Self {
        let mut out = Allocation {
            package,
            templates,
            selected: IndexMap::new(),
            used_pins: BTreeMap::new(),
            used_addresses: BTreeMap::new(),
            console: None,
        };
        out.reset();
        out
    }

    /// Drops every selection and re-establishes the load-time state.
    pub fn reset(&mut self) {
        let package = self.package;
        self.selected.clear();
        self.used_pins.clear();
        self.used_addresses.clear();
        self.console = None;

        if let Some(pins) = package.crystal_pins() {
            for (pin, function) in pins.into_iter().zip(CRYSTAL_FUNCTIONS) {
                self.used_pins.insert(
                    pin.name.clone(),
                    UsedPin {
                        owner: SYSTEM_CRYSTAL_OWNER.to_string(),
                        function: function.to_string(),
                        mandatory: false,
                        kind: PinKind::System,
                    },
                );
            }
        }

        let config = package
            .peripheral(HFXO)
            .map_or_else(LoadCapacitors::default, |p| {
                p.default_oscillator_config()
            });
        self.place_oscillator(HFXO, config);
    }

    pub fn package(&self) -> &'a Package {
        self.package
    }

    pub fn templates(&self) -> Option<&'a Templates> {
        self.templates
    }

    /// Selected peripherals, in selection order.
    pub fn selected(&self) -> impl Iterator<Item = &SelectedPeripheral> {
        self.selected.values()
    }

    pub fn selection(&self, id: &str) -> Option<&SelectedPeripheral> {
        self.selected.get(id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains_key(id)
    }

    pub fn used_pins(&self) -> &BTreeMap<String, UsedPin> {
        &self.used_pins
    }

    pub fn used_addresses(&self) -> &BTreeMap<BaseAddress, String> {
        &self.used_addresses
    }

    pub fn is_used(&self, pin: &str) -> bool {
        self.used_pins.contains_key(pin)
    }

    pub(crate) fn peripheral(
        &self,
        id: &str,
    ) -> Result<&'a Peripheral, AllocError> {
        let package = self.package;
        package
            .peripheral(id)
            .ok_or_else(|| AllocError::UnknownPeripheral(id.to_string()))
    }

    pub(crate) fn template(&self, id: &str) -> Option<&'a PeripheralTemplate> {
        self.templates.and_then(|t| t.for_peripheral(id))
    }

    pub(crate) fn lookup_pin(&self, name: &str) -> Result<&'a Pin, AllocError> {
        let package = self.package;
        package
            .pin(name)
            .ok_or_else(|| AllocError::UnknownPin(name.to_string()))
    }

    pub(crate) fn is_uart(&self, p: &Peripheral) -> bool {
        p.kind == PeripheralType::Uart
            || self.template(&p.id).is_some_and(|t| t.is_uart())
    }

    fn wrong_kind(&self, p: &Peripheral) -> AllocError {
        AllocError::WrongKind {
            peripheral: p.id.clone(),
            kind: catalog_kind(p),
        }
    }

    pub(crate) fn check_address(
        &self,
        p: &Peripheral,
    ) -> Result<(), AllocError> {
        if let Some(address) = p.base_address {
            match self.used_addresses.get(&address) {
                Some(owner) if *owner != p.id => {
                    return Err(AllocError::AddressConflict {
                        address,
                        owner: owner.clone(),
                    });
                }
                _ => (),
            }
        }
        Ok(())
    }

    /// Fails if `pin` is held by anyone but `id`.
    pub(crate) fn check_free(
        &self,
        pin: &str,
        id: &str,
    ) -> Result<(), AllocError> {
        match self.used_pins.get(pin) {
            Some(used) if used.owner != id => Err(AllocError::PinAlreadyUsed {
                pin: pin.to_string(),
                owner: used.owner.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn claim(
        &mut self,
        pin: &Pin,
        owner: &str,
        function: &str,
        mandatory: bool,
        kind: PinKind,
    ) {
        self.used_pins.insert(
            pin.name.clone(),
            UsedPin {
                owner: owner.to_string(),
                function: function.to_string(),
                mandatory,
                kind,
            },
        );
    }

    /// Releases everything `id` holds, leaving its record in place.  Only
    /// pins the record accounts for, and only while `id` still owns them,
    /// are touched.
    pub(crate) fn release(&mut self, id: &str) {
        let pins: Vec<String> = match self.selected.get(id) {
            None => return,
            Some(SelectedPeripheral::Oscillator(_)) => self
                .oscillator_pins(id)
                .into_iter()
                .map(|(pin, _)| pin.name.clone())
                .collect(),
            Some(other) => {
                other.named_pins().into_iter().map(str::to_string).collect()
            }
        };
        for pin in pins {
            if self.used_pins.get(&pin).is_some_and(|u| {
                u.owner == id && u.kind != PinKind::System
            }) {
                self.used_pins.remove(&pin);
            }
        }
        self.used_addresses.retain(|_, owner| owner != id);
    }

    /// Lists, per signal, where a routed peripheral could go.  Nothing is
    /// changed; a base-address conflict is refused here already.
    pub fn begin_selection(
        &self,
        id: &str,
    ) -> Result<SelectionPlan<'a>, AllocError> {
        let package = self.package;
        let p = self.peripheral(id)?;
        if p.is_oscillator() || p.is_fixed() {
            return Err(self.wrong_kind(p));
        }
        self.check_address(p)?;

        let template = self.template(id);
        let separate_cs = routes_chip_select(p, template);
        let current = match self.selected.get(id) {
            Some(SelectedPeripheral::Generic(g)) => Some(g),
            _ => None,
        };

        let signals = p
            .signals
            .iter()
            .map(|signal| {
                let chip_select = separate_cs && signal.name == CHIP_SELECT;
                let current = current.and_then(|g| {
                    if chip_select {
                        g.chip_select.clone()
                    } else {
                        g.pin_functions
                            .iter()
                            .find(|(_, s)| **s == signal.name)
                            .map(|(pin, _)| pin.clone())
                    }
                });
                let candidates = candidates(signal, &package.pins)
                    .into_iter()
                    .map(|pin| {
                        let owner = self
                            .used_pins
                            .get(&pin.name)
                            .map(|u| u.owner.clone());
                        let free = owner.as_deref().map_or(true, |o| o == id);
                        Candidate { pin, owner, free }
                    })
                    .collect();
                SignalChoice {
                    signal,
                    mandatory: signal.is_mandatory
                        && !signal.allowed_gpio.is_empty(),
                    chip_select,
                    current,
                    candidates,
                }
            })
            .collect();

        Ok(SelectionPlan { peripheral: p, signals })
    }

    /// Checks and records a routed peripheral's pins, replacing whatever it
    /// held before.  On error nothing changes.
    ///
    /// Checks run in this order: the peripheral itself and its base address;
    /// each requested pin against its signal's candidates; mandatory signals
    /// (a UART's `disable_rx` excuses RXD); and finally pin ownership,
    /// including the extra chip-select GPIOs, which are checked but not
    /// reserved.
    ///
    /// Every mandatory signal that has allowed pins must be given, whatever
    /// the device-tree template routes.
    pub fn commit(
        &mut self,
        id: &str,
        selection: &PinSelection,
    ) -> Result<(), AllocError> {
        self.place_routed(id, selection, Required::All)
    }

    pub(crate) fn place_routed(
        &mut self,
        id: &str,
        selection: &PinSelection,
        required: Required,
    ) -> Result<(), AllocError> {
        let p = self.peripheral(id)?;
        if p.is_oscillator() || p.is_fixed() {
            return Err(self.wrong_kind(p));
        }
        self.check_address(p)?;

        let template = self.template(id);
        let separate_cs = routes_chip_select(p, template);
        let mut claims: Vec<(&'a Pin, &'a Signal)> = vec![];
        let mut chip_select: Option<(&'a Pin, &'a Signal)> = None;
        let mut chosen: BTreeSet<&'a str> = BTreeSet::new();

        let requested = selection
            .chip_select
            .iter()
            .map(|pin| (pin.as_str(), CHIP_SELECT))
            .chain(
                selection
                    .pin_functions
                    .iter()
                    .map(|(pin, signal)| (pin.as_str(), signal.as_str())),
            );
        for (pin_name, signal_name) in requested {
            let signal = p.signal(signal_name).ok_or_else(|| {
                AllocError::UnknownSignal {
                    peripheral: id.to_string(),
                    signal: signal_name.to_string(),
                }
            })?;
            let pin = self.lookup_pin(pin_name)?;
            if !allows(signal, pin) {
                return Err(AllocError::PinNotAllowed {
                    peripheral: id.to_string(),
                    signal: signal.name.clone(),
                    pin: pin.name.clone(),
                });
            }
            if !chosen.insert(&signal.name) {
                return Err(AllocError::SignalAssignedTwice {
                    peripheral: id.to_string(),
                    signal: signal.name.clone(),
                });
            }
            let mut picked = claims.iter().chain(&chip_select);
            if picked.any(|(q, _)| q.name == pin.name) {
                return Err(AllocError::PinAlreadyUsed {
                    pin: pin.name.clone(),
                    owner: id.to_string(),
                });
            }
            if separate_cs && signal.name == CHIP_SELECT {
                chip_select = Some((pin, signal));
            } else {
                claims.push((pin, signal));
            }
        }

        let disable_rx = selection.config.disable_rx && self.is_uart(p);
        let missing: Vec<String> = p
            .signals
            .iter()
            .filter(|s| s.is_mandatory && !s.allowed_gpio.is_empty())
            .filter(|s| {
                required == Required::All
                    || is_routed(s, template, separate_cs)
            })
            .filter(|s| !(disable_rx && s.name == UART_RXD))
            .filter(|s| !chosen.contains(s.name.as_str()))
            .map(|s| s.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(AllocError::MissingMandatorySignal {
                peripheral: id.to_string(),
                signals: missing,
            });
        }

        for (pin, _) in claims.iter().chain(&chip_select) {
            self.check_free(&pin.name, id)?;
        }

        let mut extra_cs: Vec<String> = vec![];
        for name in &selection.config.extra_cs_gpios {
            let pin = self.lookup_pin(name)?;
            if pin.routable_id().is_none() {
                return Err(AllocError::PinNotAllowed {
                    peripheral: id.to_string(),
                    signal: CHIP_SELECT.to_string(),
                    pin: pin.name.clone(),
                });
            }
            if extra_cs.contains(&pin.name) {
                return Err(AllocError::DuplicateCsGpio {
                    peripheral: id.to_string(),
                    pin: pin.name.clone(),
                });
            }
            let mut picked = claims.iter().chain(&chip_select);
            if picked.any(|(q, _)| q.name == pin.name) {
                return Err(AllocError::PinAlreadyUsed {
                    pin: pin.name.clone(),
                    owner: id.to_string(),
                });
            }
            self.check_free(&pin.name, id)?;
            extra_cs.push(pin.name.clone());
        }

        self.release(id);
        let mut pin_functions = IndexMap::new();
        for (pin, signal) in claims.iter().chain(&chip_select) {
            let mandatory = signal.is_mandatory;
            self.claim(pin, id, &signal.name, mandatory, PinKind::Peripheral);
        }
        for (pin, signal) in &claims {
            pin_functions.insert(pin.name.clone(), signal.name.clone());
        }
        if let Some(address) = p.base_address {
            self.used_addresses.insert(address, id.to_string());
        }
        log::debug!("{id}: {pin_functions:?}");
        self.selected.insert(
            id.to_string(),
            SelectedPeripheral::Generic(GenericSelection {
                id: id.to_string(),
                pin_functions,
                chip_select: chip_select.map(|(pin, _)| pin.name.clone()),
                config: PeripheralConfig {
                    disable_rx: selection.config.disable_rx,
                    extra_cs_gpios: extra_cs,
                    note: selection.config.note.clone(),
                },
            }),
        );
        self.reconcile_console();
        Ok(())
    }

    /// Picks pins for `id` the way the batch generator does, treating pins
    /// `id` already holds as free.
    pub fn auto_assign(&self, id: &str) -> Result<AutoAssignment, AllocError> {
        let package = self.package;
        let p = self.peripheral(id)?;
        assign::auto_assign(p, self.template(id), &package.pins, |pin| {
            self.used_pins.get(pin).is_some_and(|u| u.owner != id)
        })
    }

    /// Selects `id` without a human choosing anything: oscillators get their
    /// default configuration, fixed-pin peripherals are switched on, and
    /// routed peripherals are auto-assigned and then committed.
    pub fn auto_select(&mut self, id: &str) -> Result<(), AllocError> {
        let p = self.peripheral(id)?;
        if p.is_oscillator() {
            return self.configure_oscillator(id, p.default_oscillator_config());
        }
        if p.is_fixed() {
            return self.enable_fixed(id);
        }
        self.check_address(p)?;
        let assigned = self.auto_assign(id)?;
        self.place_routed(
            id,
            &PinSelection {
                pin_functions: assigned.pin_functions,
                chip_select: assigned.chip_select,
                config: PeripheralConfig::default(),
            },
            Required::Routed,
        )
    }

    /// Switches on a fixed-pin peripheral: every signal takes the pin named
    /// by its first pattern.
    pub fn enable_fixed(&mut self, id: &str) -> Result<(), AllocError> {
        let package = self.package;
        let p = self.peripheral(id)?;
        if !p.is_fixed() {
            return Err(self.wrong_kind(p));
        }
        self.check_address(p)?;

        let mut claims = vec![];
        for signal in &p.signals {
            let pin = signal
                .fixed_pin()
                .and_then(|pin| package.pin_by_id(pin))
                .ok_or_else(|| AllocError::Unresolvable {
                    peripheral: id.to_string(),
                    signal: signal.name.clone(),
                })?;
            self.check_free(&pin.name, id)?;
            claims.push((pin, signal));
        }

        self.release(id);
        let mut pin_functions = IndexMap::new();
        for (pin, signal) in claims {
            self.claim(pin, id, &signal.name, true, PinKind::Peripheral);
            pin_functions.insert(pin.name.clone(), signal.name.clone());
        }
        if let Some(address) = p.base_address {
            self.used_addresses.insert(address, id.to_string());
        }
        self.selected.insert(
            id.to_string(),
            SelectedPeripheral::Fixed(FixedSelection {
                id: id.to_string(),
                pin_functions,
            }),
        );
        Ok(())
    }

    /// Deselects `id`, releasing its pins and base address.  System pins are
    /// never touched, and the high-frequency oscillator can't be removed.
    pub fn remove(&mut self, id: &str) -> Result<(), AllocError> {
        if id == HFXO {
            return Err(AllocError::NotRemovable(id.to_string()));
        }
        if !self.selected.contains_key(id) {
            return Err(AllocError::NotSelected(id.to_string()));
        }
        self.release(id);
        self.selected.shift_remove(id);
        self.reconcile_console();
        log::debug!("{id}: removed");
        Ok(())
    }

    /// Ids of the selected UARTs, in selection order.
    pub fn selected_uarts(&self) -> Vec<&str> {
        self.selected
            .keys()
            .map(String::as_str)
            .filter(|id| self.is_selected_uart(id))
            .collect()
    }

    pub(crate) fn is_selected_uart(&self, id: &str) -> bool {
        matches!(self.selected.get(id), Some(SelectedPeripheral::Generic(_)))
            && self.package.peripheral(id).is_some_and(|p| self.is_uart(p))
    }

    /// The UART used as serial console; `None` means RTT.
    pub fn console(&self) -> Option<&str> {
        self.console.as_deref()
    }

    pub fn set_console(&mut self, id: Option<&str>) -> Result<(), AllocError> {
        match id {
            Some(id) if !self.is_selected_uart(id) => {
                Err(AllocError::InvalidConsole(id.to_string()))
            }
            _ => {
                self.console = id.map(str::to_string);
                Ok(())
            }
        }
    }

    /// Keeps the console choice if it still names a selected UART; a stale
    /// choice falls back to the first selected UART.  With no UART
    /// selected, the console is RTT.
    pub fn reconcile_console(&mut self) {
        let first = self.selected_uarts().first().map(|s| s.to_string());
        match (&self.console, first) {
            (_, None) => self.console = None,
            (Some(c), Some(first)) if !self.is_selected_uart(c) => {
                self.console = Some(first);
            }
            _ => (),
        }
    }

    /// Cross-checks the used-pin and used-address tables against the
    /// selected records.
    pub fn check_invariants(&self) -> anyhow::Result<()> {
        let package = self.package;
        let hfxo = self.selected.get(HFXO);
        if !matches!(hfxo, Some(SelectedPeripheral::Oscillator(_))) {
            bail!("{HFXO} is not selected");
        }

        let mut expected: BTreeMap<&str, &str> = BTreeMap::new();
        for (id, record) in &self.selected {
            if record.id() != id {
                bail!("record {} is filed under {id}", record.id());
            }
            let pins: Vec<&str> = match record {
                SelectedPeripheral::Oscillator(_) => self
                    .oscillator_pins(id)
                    .into_iter()
                    .map(|(pin, _)| pin.name.as_str())
                    .filter(|pin| !self.is_system(pin))
                    .collect(),
                other => other.named_pins(),
            };
            for pin in pins {
                if let Some(prev) = expected.insert(pin, id.as_str()) {
                    bail!("pin {pin} is named by both {prev} and {id}");
                }
            }
        }

        for (pin, used) in &self.used_pins {
            if used.kind == PinKind::System {
                if self.selected.contains_key(&used.owner) {
                    bail!("system pin {pin} is owned by {}", used.owner);
                }
                continue;
            }
            match expected.get(pin.as_str()) {
                Some(owner) if *owner == used.owner => (),
                _ => bail!(
                    "{} holds {pin} without a record naming it",
                    used.owner
                ),
            }
        }
        for (pin, owner) in &expected {
            match self.used_pins.get(*pin) {
                Some(u) if u.owner == *owner && u.kind != PinKind::System => (),
                _ => bail!("{owner} names {pin} but does not hold it"),
            }
        }

        for (address, owner) in &self.used_addresses {
            let base = package.peripheral(owner).and_then(|p| p.base_address);
            if !self.selected.contains_key(owner) || base != Some(*address) {
                bail!("address {address} is claimed by {owner}");
            }
        }
        for (id, record) in &self.selected {
            if matches!(record, SelectedPeripheral::Oscillator(_))
                || matches!(record, SelectedPeripheral::Gpio(_))
            {
                continue;
            }
            let base = package.peripheral(id).and_then(|p| p.base_address);
            if let Some(address) = base {
                if self.used_addresses.get(&address) != Some(id) {
                    bail!("{id} does not hold its base address {address}");
                }
            }
        }

        if let Some(c) = &self.console {
            if !self.is_selected_uart(c) {
                bail!("console {c} is not a selected UART");
            }
        }
        Ok(())
    }

    pub(crate) fn is_system(&self, pin: &str) -> bool {
        self.used_pins
            .get(pin)
            .is_some_and(|u| u.kind == PinKind::System)
    }
}
