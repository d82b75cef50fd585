// SPDX-License-Identifier: MIT

//! Whole-runlist preemption for runlist-granular hosts.

use super::{release_holdoff, FifoPreemptionSequencer, PreemptCtx};
use crate::engine::EngineInfo;
use crate::error::{Error, Result};
use crate::hal::{Bus, Hal};
use crate::holdoff::HoldoffAggregator;
use crate::hw::Features;
use crate::poll::{poll_until, POLL_INTERVAL_NS, PREEMPT_PENDING_TIMEOUT_NS};
use crate::regs;
use log::{debug, warn};

pub(super) fn preempt<H: Hal + ?Sized>(
    seq: &FifoPreemptionSequencer,
    hal: &H,
    holdoff: &mut HoldoffAggregator,
    info: &EngineInfo,
    ctx: &PreemptCtx,
) -> Result {
    let base = info.rl_priv_base;

    // New work would land right behind the preempt; let the caller retry.
    let eng = hal.read32(Bus::Bar0, base + regs::rl_engine_status(info.rl_engine_id));
    let submit = hal.read32(Bus::Bar0, base + regs::RL_SUBMIT_INFO);
    if eng & regs::RL_ENGINE_STATUS_BUSY != 0 || submit & regs::RL_SUBMIT_INFO_PENDING != 0 {
        debug!("fifo: runlist {} not idle", info.runlist);
        return Err(Error::Busy);
    }
    let intr = hal.read32(Bus::Bar0, base + regs::RL_INTR_0);
    if intr & regs::rl_intr_engine_stall(info.rl_engine_id) != 0 {
        warn!("fifo: stalling interrupt pending on runlist {}", info.runlist);
        return Err(Error::Busy);
    }

    let juggle_intr = !seq.features.contains(Features::NEW_HOST_SEQUENCE);
    if juggle_intr {
        holdoff.intr_disable(hal, info.holdoff_mask());
    }

    let res = issue(hal, holdoff, info, ctx);

    if juggle_intr {
        holdoff.intr_enable(hal, info.holdoff_mask());
    }
    res
}

fn issue<H: Hal + ?Sized>(
    hal: &H,
    holdoff: &mut HoldoffAggregator,
    info: &EngineInfo,
    ctx: &PreemptCtx,
) -> Result {
    let addr = info.rl_priv_base + regs::RL_PREEMPT;
    hal.write32(Bus::Bar0, addr, regs::RL_PREEMPT_TYPE_RUNLIST);
    debug!("fifo: preempt runlist {}", info.runlist);

    release_holdoff(hal, holdoff, info, ctx)?;

    poll_until(hal, PREEMPT_PENDING_TIMEOUT_NS, POLL_INTERVAL_NS, || {
        (hal.read32(Bus::Bar0, addr) & regs::RL_PREEMPT_PENDING == 0).then_some(())
    })
    .inspect_err(|_| warn!("fifo: runlist {} preempt still pending", info.runlist))
}
