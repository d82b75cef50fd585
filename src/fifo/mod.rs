// SPDX-License-Identifier: MIT

//! Removing in-flight work from the host front-end.
//!
//! Two chip-family strategies sit behind one entry point. They are picked
//! from the chip configuration and never mixed: only the PBDMA-granular one
//! looks at engine context status as a second resolution step.

use crate::engine::{EngineId, EngineInfo, EngineTable};
use crate::error::Result;
use crate::hal::{Bus, Hal};
use crate::holdoff::{HoldoffAggregator, HoldoffClient};
use crate::hw::{ChipConfig, Features, PreemptStrategy};
use crate::regs;
use log::debug;

mod pbdma;
mod runlist;

/// Caller-side context for a preempt.
#[derive(Debug, Copy, Clone)]
pub struct PreemptCtx {
    /// Holdoff slot the caller engaged; the preempt releases the engine's
    /// bit in it so hardware can finish.
    pub holdoff_client: HoldoffClient,
}

pub struct FifoPreemptionSequencer {
    strategy: PreemptStrategy,
    features: Features,
    seq_task_priority: u32,
    max_pbdma: u32,
}

impl FifoPreemptionSequencer {
    pub fn new(cfg: &ChipConfig) -> FifoPreemptionSequencer {
        FifoPreemptionSequencer {
            strategy: cfg.preempt,
            features: cfg.features,
            seq_task_priority: cfg.seq_task_priority,
            max_pbdma: cfg.max_pbdma,
        }
    }

    pub fn strategy(&self) -> PreemptStrategy {
        self.strategy
    }

    /// Preempts whatever `engine` is running. Errors are recoverable and
    /// leave the host in a state the caller can roll back from.
    pub fn preempt<H: Hal + ?Sized>(
        &self,
        hal: &H,
        engines: &EngineTable,
        holdoff: &mut HoldoffAggregator,
        engine: EngineId,
        ctx: &PreemptCtx,
    ) -> Result {
        let info = engines.get(engine)?;
        debug!("fifo: preempt {:?} ({:?})", engine, self.strategy);
        match self.strategy {
            PreemptStrategy::Pbdma => pbdma::preempt(self, hal, holdoff, info, ctx),
            PreemptStrategy::Runlist => runlist::preempt(self, hal, holdoff, info, ctx),
        }
    }

    /// Disables scheduling on the engine's runlist. Returns whether it was
    /// already disabled by someone else.
    pub fn sched_disable<H: Hal + ?Sized>(&self, hal: &H, info: &EngineInfo) -> bool {
        let (addr, bit) = self.sched_disable_reg(info);
        let val = hal.read32(Bus::Bar0, addr);
        if val & bit != 0 {
            return true;
        }
        hal.write32(Bus::Bar0, addr, val | bit);
        false
    }

    pub fn sched_enable<H: Hal + ?Sized>(&self, hal: &H, info: &EngineInfo) {
        let (addr, bit) = self.sched_disable_reg(info);
        hal.rmw32(Bus::Bar0, addr, bit, 0);
    }

    fn sched_disable_reg(&self, info: &EngineInfo) -> (u32, u32) {
        match self.strategy {
            PreemptStrategy::Pbdma => (regs::FIFO_SCHED_DISABLE, 1 << info.runlist),
            PreemptStrategy::Runlist => (info.rl_priv_base + regs::RL_SCHED_DISABLE, 1),
        }
    }
}

/// Gives the engine's holdoff bit back so a pending preempt can complete.
fn release_holdoff<H: Hal + ?Sized>(
    hal: &H,
    holdoff: &mut HoldoffAggregator,
    info: &EngineInfo,
    ctx: &PreemptCtx,
) -> Result {
    let mask = holdoff.mask(ctx.holdoff_client) & !info.holdoff_mask();
    holdoff.set(hal, ctx.holdoff_client, mask)
}
