// SPDX-License-Identifier: MIT

//! Engine-level clock gating (ELCG).
//!
//! Gating stays armed only while nobody objects to it. Every feature that
//! needs an engine clock running records its own reason bit; hardware is
//! forced to RUN from the first reason until the last one is cleared.

use crate::error::{Error, Result};
use crate::hal::{Bus, Hal};
use crate::regs;
use bitflags::bitflags;
use log::debug;

/// Upper bound of the gate-control array across supported chips.
pub const MAX_ELCG_ENGINES: usize = 16;

bitflags! {
    /// Reasons for keeping ELCG disabled on an engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElcgReason: u32 {
        const GR_PG = 1 << 0;
        const GR_RG = 1 << 1;
        const DI = 1 << 2;
        const MS = 1 << 3;
        /// Requested by the driver.
        const RPC = 1 << 4;
        const PERF = 1 << 5;
    }
}

#[derive(Debug, Default, Copy, Clone)]
struct GateCtrlSnapshot {
    depth: u32,
    saved: u32,
}

pub struct ElcgController {
    engine_count: u32,
    reasons: [ElcgReason; MAX_ELCG_ENGINES],
    snapshot_supported: bool,
    snapshots: [GateCtrlSnapshot; MAX_ELCG_ENGINES],
}

impl ElcgController {
    pub fn new(engine_count: u32, snapshot_supported: bool) -> ElcgController {
        ElcgController {
            engine_count: engine_count.min(MAX_ELCG_ENGINES as u32),
            reasons: [ElcgReason::empty(); MAX_ELCG_ENGINES],
            snapshot_supported,
            snapshots: [GateCtrlSnapshot::default(); MAX_ELCG_ENGINES],
        }
    }

    fn index(&self, engine: u32) -> Result<usize> {
        if engine < self.engine_count {
            Ok(engine as usize)
        } else {
            Err(Error::InvalidInput)
        }
    }

    /// Reasons currently keeping ELCG off on `engine`.
    pub fn reasons(&self, engine: u32) -> Result<ElcgReason> {
        Ok(self.reasons[self.index(engine)?])
    }

    /// Whether hardware gating is armed on `engine`.
    pub fn is_armed<H: Hal + ?Sized>(&self, hal: &H, engine: u32) -> Result<bool> {
        self.index(engine)?;
        let val = hal.read32(Bus::Bar0, regs::therm_gate_ctrl(engine));
        Ok(val & regs::GATE_CTRL_ENG_CLK_MASK == regs::GATE_CTRL_ENG_CLK_AUTO)
    }

    /// Records `reason`, forcing the engine clock on if it is the first one.
    pub fn disable<H: Hal + ?Sized>(&mut self, hal: &H, engine: u32, reason: ElcgReason) -> Result {
        let idx = self.index(engine)?;
        if reason.is_empty() {
            return Err(Error::InvalidInput);
        }

        if self.reasons[idx].is_empty() {
            hal.rmw32(
                Bus::Bar0,
                regs::therm_gate_ctrl(engine),
                regs::GATE_CTRL_ENG_CLK_MASK | regs::GATE_CTRL_ENG_PWR_MASK,
                regs::GATE_CTRL_ENG_CLK_RUN | regs::GATE_CTRL_ENG_PWR_ON,
            );
            debug!("elcg: engine {} forced on by {:?}", engine, reason);
        }
        self.reasons[idx] |= reason;
        Ok(())
    }

    /// Drops `reason`, re-arming gating once no reason is left.
    pub fn enable<H: Hal + ?Sized>(&mut self, hal: &H, engine: u32, reason: ElcgReason) -> Result {
        let idx = self.index(engine)?;
        if reason.is_empty() {
            return Err(Error::InvalidInput);
        }

        self.reasons[idx].remove(reason);
        if self.reasons[idx].is_empty() {
            hal.rmw32(
                Bus::Bar0,
                regs::therm_gate_ctrl(engine),
                regs::GATE_CTRL_ENG_CLK_MASK,
                regs::GATE_CTRL_ENG_CLK_AUTO,
            );
            debug!("elcg: engine {} armed", engine);
        }
        Ok(())
    }

    /// Captures the whole gate-control register and forces engine and
    /// blocking clocks to run. Nests; only the outermost call captures.
    pub fn war_save<H: Hal + ?Sized>(&mut self, hal: &H, engine: u32) -> Result {
        if !self.snapshot_supported {
            return Err(Error::NotSupported);
        }
        let idx = self.index(engine)?;
        let snap = &mut self.snapshots[idx];

        if snap.depth == 0 {
            let addr = regs::therm_gate_ctrl(engine);
            snap.saved = hal.read32(Bus::Bar0, addr);
            let forced = (snap.saved & !(regs::GATE_CTRL_ENG_CLK_MASK | regs::GATE_CTRL_BLK_CLK_MASK))
                | regs::GATE_CTRL_ENG_CLK_RUN
                | regs::GATE_CTRL_BLK_CLK_RUN;
            hal.write32(Bus::Bar0, addr, forced);
            debug!("elcg: engine {} gate ctrl {:#x} saved", engine, snap.saved);
        }
        snap.depth = snap.depth.checked_add(1).ok_or(Error::InvalidInput)?;
        Ok(())
    }

    /// Undoes one [`war_save`](Self::war_save); the outermost one writes the
    /// captured value back unchanged.
    pub fn war_restore<H: Hal + ?Sized>(&mut self, hal: &H, engine: u32) -> Result {
        if !self.snapshot_supported {
            return Err(Error::NotSupported);
        }
        let idx = self.index(engine)?;
        let snap = &mut self.snapshots[idx];

        if snap.depth == 0 {
            return Err(Error::InvalidInput);
        }
        snap.depth -= 1;
        if snap.depth == 0 {
            hal.write32(Bus::Bar0, regs::therm_gate_ctrl(engine), snap.saved);
            debug!("elcg: engine {} gate ctrl {:#x} restored", engine, snap.saved);
        }
        Ok(())
    }
}
