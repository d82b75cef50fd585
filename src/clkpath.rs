// SPDX-License-Identifier: MIT

//! Clock path control: moving clock domains between the VCO (PLL) path, the
//! ALT path and a gated ALT path, and back to whatever they ran on before.

use crate::error::{Error, Result};
use crate::fatal;
use crate::hal::{Bus, Hal};
use crate::poll::{poll_until, CLK_SWITCH_TIMEOUT_NS, FAST_POLL_INTERVAL_NS};
use crate::regs;
use bitflags::bitflags;
use log::debug;

bitflags! {
    /// Set of clock domains.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClkDomains: u32 {
        const GPC = 1 << ClkDomain::Gpc as u32;
        const XBAR = 1 << ClkDomain::Xbar as u32;
        const SYS = 1 << ClkDomain::Sys as u32;
        const LTC = 1 << ClkDomain::Ltc as u32;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum ClkDomain {
    Gpc = 0,
    Xbar = 1,
    Sys = 2,
    Ltc = 3,
}

impl ClkDomain {
    pub const ALL: [ClkDomain; 4] = [ClkDomain::Gpc, ClkDomain::Xbar, ClkDomain::Sys, ClkDomain::Ltc];

    /// Gating order. XBAR goes last since it fans out to the others and must
    /// stay alive while they are reached; ungating walks this backwards.
    const GATE_ORDER: [ClkDomain; 4] = [ClkDomain::Gpc, ClkDomain::Ltc, ClkDomain::Sys, ClkDomain::Xbar];

    pub fn bit(self) -> ClkDomains {
        ClkDomains::from_bits_retain(1 << self as u32)
    }

    /// Select register and bit choosing VCO over ALT for this domain.
    pub(crate) fn sel_vco(self) -> (u32, u32) {
        match self {
            ClkDomain::Gpc => (regs::TRIM_GPC_BCAST_SEL_VCO, 1 << 0),
            ClkDomain::Xbar => (regs::TRIM_SYS_SEL_VCO, 1 << 1),
            ClkDomain::Sys => (regs::TRIM_SYS_SEL_VCO, 1 << 0),
            ClkDomain::Ltc => (regs::TRIM_SYS_SEL_VCO, 1 << 2),
        }
    }
}

/// Clock path. `Original` is only meaningful as a power-up target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClkPath {
    Gated,
    Alt,
    Vco,
    Original,
}

/// Select registers captured on the first power-down off VCO.
#[derive(Debug, Default, Copy, Clone)]
struct ClkPathCache {
    sel_vco: u32,
    gpc_sel_vco: u32,
    valid: bool,
}

impl ClkPathCache {
    fn was_on_vco(&self, dom: ClkDomain) -> bool {
        let (reg, bit) = dom.sel_vco();
        let val = if reg == regs::TRIM_GPC_BCAST_SEL_VCO {
            self.gpc_sel_vco
        } else {
            self.sel_vco
        };
        val & bit != 0
    }
}

pub struct ClockPathController {
    supported: ClkDomains,
    cache: ClkPathCache,
}

impl ClockPathController {
    pub fn new(supported: ClkDomains) -> ClockPathController {
        ClockPathController {
            supported,
            cache: ClkPathCache::default(),
        }
    }

    pub fn supported(&self) -> ClkDomains {
        self.supported
    }

    /// Whether a power-down has captured paths not yet restored.
    pub fn cache_valid(&self) -> bool {
        self.cache.valid
    }

    /// Current hardware path of `dom`.
    pub fn path<H: Hal + ?Sized>(&self, hal: &H, dom: ClkDomain) -> ClkPath {
        let (reg, bit) = dom.sel_vco();
        if hal.read32(Bus::Bar0, reg) & bit != 0 {
            ClkPath::Vco
        } else if hal.read32(Bus::Bar0, regs::trim_alt_gate(dom as u32)) & regs::TRIM_ALT_GATE_GATED != 0 {
            ClkPath::Gated
        } else {
            ClkPath::Alt
        }
    }

    /// Moves `mask` onto the ALT path, gating it too for `ClkPath::Gated`.
    pub fn power_down<H: Hal + ?Sized>(&mut self, hal: &H, mask: ClkDomains, target: ClkPath) -> Result {
        if !matches!(target, ClkPath::Alt | ClkPath::Gated) {
            return Err(Error::InvalidInput);
        }
        let mask = mask & self.supported;
        if mask.is_empty() {
            return Ok(());
        }

        let on_vco = self.vco_domains(hal) & mask;
        if !on_vco.is_empty() {
            if !self.cache.valid {
                self.cache = ClkPathCache {
                    sel_vco: hal.read32(Bus::Bar0, regs::TRIM_SYS_SEL_VCO),
                    gpc_sel_vco: hal.read32(Bus::Bar0, regs::TRIM_GPC_BCAST_SEL_VCO),
                    valid: true,
                };
                debug!(
                    "clk: cached sel_vco {:#x} gpc_sel_vco {:#x}",
                    self.cache.sel_vco, self.cache.gpc_sel_vco
                );
            }
            self.ungate_alt(hal, mask);
            self.switch(hal, on_vco, ClkPath::Alt);
        }

        if target == ClkPath::Gated {
            self.gate_alt(hal, mask);
        }
        Ok(())
    }

    /// Brings `mask` back onto ALT, or onto the path each domain held before
    /// the last power-down for `ClkPath::Original`.
    pub fn power_up<H: Hal + ?Sized>(&mut self, hal: &H, mask: ClkDomains, target: ClkPath) -> Result {
        if !matches!(target, ClkPath::Alt | ClkPath::Original) {
            return Err(Error::InvalidInput);
        }
        let mask = mask & self.supported;
        if mask.is_empty() {
            return Ok(());
        }

        self.ungate_alt(hal, mask);

        if target == ClkPath::Original {
            let mut to_vco = ClkDomains::empty();
            if self.cache.valid {
                for dom in ClkDomain::ALL {
                    if mask.contains(dom.bit()) && self.cache.was_on_vco(dom) {
                        to_vco |= dom.bit();
                    }
                }
            }
            self.switch(hal, to_vco, ClkPath::Vco);
            self.gate_alt(hal, to_vco);
            self.cache.valid = false;
        }
        Ok(())
    }

    fn vco_domains<H: Hal + ?Sized>(&self, hal: &H) -> ClkDomains {
        let sys = hal.read32(Bus::Bar0, regs::TRIM_SYS_SEL_VCO);
        let gpc = hal.read32(Bus::Bar0, regs::TRIM_GPC_BCAST_SEL_VCO);
        let mut on_vco = ClkDomains::empty();
        for dom in ClkDomain::ALL {
            let (reg, bit) = dom.sel_vco();
            let val = if reg == regs::TRIM_GPC_BCAST_SEL_VCO { gpc } else { sys };
            if val & bit != 0 {
                on_vco |= dom.bit();
            }
        }
        on_vco
    }

    /// Switches `doms` to `path` (ALT or VCO) and waits for every linear
    /// divider to follow. A divider that never follows is fatal.
    fn switch<H: Hal + ?Sized>(&self, hal: &H, doms: ClkDomains, path: ClkPath) {
        if doms.is_empty() {
            return;
        }
        let to_vco = path == ClkPath::Vco;

        for reg in [regs::TRIM_SYS_SEL_VCO, regs::TRIM_GPC_BCAST_SEL_VCO] {
            let bits = ClkDomain::ALL
                .iter()
                .filter(|d| doms.contains(d.bit()))
                .map(|d| d.sel_vco())
                .filter(|(r, _)| *r == reg)
                .fold(0, |acc, (_, bit)| acc | bit);
            if bits == 0 {
                continue;
            }
            if to_vco {
                hal.rmw32(Bus::Bar0, reg, 0, bits);
            } else {
                hal.rmw32(Bus::Bar0, reg, bits, 0);
            }
        }

        for dom in ClkDomain::ALL {
            if !doms.contains(dom.bit()) {
                continue;
            }
            let status = regs::trim_ldiv_status(dom as u32);
            let res = poll_until(hal, CLK_SWITCH_TIMEOUT_NS, FAST_POLL_INTERVAL_NS, || {
                let on_vco = hal.read32(Bus::Bar0, status) & regs::TRIM_LDIV_STATUS_VCO != 0;
                (on_vco == to_vco).then_some(())
            });
            if res.is_err() {
                fatal!(hal, "clk: {:?} divider stuck switching to {:?}", dom, path);
            }
        }
        debug!("clk: {:?} -> {:?}", doms, path);
    }

    fn gate_alt<H: Hal + ?Sized>(&self, hal: &H, doms: ClkDomains) {
        for dom in ClkDomain::GATE_ORDER {
            if doms.contains(dom.bit()) {
                hal.rmw32(Bus::Bar0, regs::trim_alt_gate(dom as u32), 0, regs::TRIM_ALT_GATE_GATED);
            }
        }
    }

    fn ungate_alt<H: Hal + ?Sized>(&self, hal: &H, doms: ClkDomains) {
        for dom in ClkDomain::GATE_ORDER.iter().rev() {
            if doms.contains(dom.bit()) {
                hal.rmw32(Bus::Bar0, regs::trim_alt_gate(*dom as u32), regs::TRIM_ALT_GATE_GATED, 0);
            }
        }
    }
}
