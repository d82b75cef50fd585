// SPDX-License-Identifier: MIT

//! Channel/TSG preemption for PBDMA-granular hosts.

use super::{release_holdoff, FifoPreemptionSequencer, PreemptCtx};
use crate::engine::EngineInfo;
use crate::error::{Error, Result};
use crate::hal::{Bus, Hal};
use crate::holdoff::HoldoffAggregator;
use crate::hw::Features;
use crate::poll::{
    poll_until, retry_until_stable, FAST_POLL_INTERVAL_NS, MAX_RESOLVE_ATTEMPTS,
    PBDMA_PREEMPT_ACK_TIMEOUT_NS, POLL_INTERVAL_NS, PREEMPT_PENDING_TIMEOUT_NS,
};
use crate::regs;
use crate::rtos::PriorityBoost;
use log::{debug, warn};

/// A channel or TSG as the host reports it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) struct ChanId {
    pub(super) id: u32,
    pub(super) tsg: bool,
}

/// Decodes the channel/TSG a PBDMA or engine status word is working on.
///
/// While loading or switching the incoming one is what has to go, otherwise
/// the resident one.
pub(super) fn decode_status(val: u32) -> Option<ChanId> {
    let ctxsw = (val >> regs::CHAN_STATUS_CTXSW_SHIFT) & regs::CHAN_STATUS_CTXSW_MASK;
    match ctxsw {
        regs::CHAN_STATUS_CTXSW_VALID | regs::CHAN_STATUS_CTXSW_SAVE => Some(ChanId {
            id: (val >> regs::CHAN_STATUS_ID_SHIFT) & regs::CHAN_STATUS_ID_MASK,
            tsg: val & regs::CHAN_STATUS_ID_TYPE_TSG != 0,
        }),
        regs::CHAN_STATUS_CTXSW_LOAD | regs::CHAN_STATUS_CTXSW_SWITCH => Some(ChanId {
            id: (val >> regs::CHAN_STATUS_NEXT_ID_SHIFT) & regs::CHAN_STATUS_ID_MASK,
            tsg: val & regs::CHAN_STATUS_NEXT_ID_TYPE_TSG != 0,
        }),
        _ => None,
    }
}

/// Channels already preempted in one pass, at most one per PBDMA.
#[derive(Default)]
struct Preempted {
    ids: [Option<ChanId>; u32::BITS as usize],
}

impl Preempted {
    fn contains(&self, chan: ChanId) -> bool {
        self.ids.iter().flatten().any(|c| *c == chan)
    }

    fn insert(&mut self, chan: ChanId) {
        if let Some(slot) = self.ids.iter_mut().find(|c| c.is_none()) {
            *slot = Some(chan);
        }
    }
}

/// Reads `addr` until two consecutive decodes agree.
fn resolve<H: Hal + ?Sized>(hal: &H, addr: u32) -> Result<Option<ChanId>> {
    retry_until_stable(MAX_RESOLVE_ATTEMPTS, || decode_status(hal.read32(Bus::Bar0, addr)))
        .inspect_err(|_| warn!("fifo: status {:#x} never settled", addr))
}

pub(super) fn preempt<H: Hal + ?Sized>(
    seq: &FifoPreemptionSequencer,
    hal: &H,
    holdoff: &mut HoldoffAggregator,
    info: &EngineInfo,
    ctx: &PreemptCtx,
) -> Result {
    let intr = hal.read32(Bus::Bar0, regs::FIFO_INTR_PBDMA_ID) & info.pbdma_mask;
    if intr != 0 {
        warn!("fifo: stalling interrupt pending on pbdma {:#x}", intr);
        return Err(Error::Busy);
    }

    let mut preempted = Preempted::default();

    for pbdma in (0..seq.max_pbdma).filter(|p| info.pbdma_mask & (1 << p) != 0) {
        if let Some(chan) = resolve(hal, regs::pbdma_status(pbdma))? {
            if !preempted.contains(chan) {
                preempt_chan(seq, hal, holdoff, info, ctx, chan)?;
                preempted.insert(chan);
            }
        }
    }

    // The engine may still hold a context the PBDMAs already moved past.
    if let Some(chan) = resolve(hal, regs::fifo_engine_status(info.fifo_engine))? {
        if !preempted.contains(chan) {
            preempt_chan(seq, hal, holdoff, info, ctx, chan)?;
        }
    }
    Ok(())
}

fn preempt_chan<H: Hal + ?Sized>(
    seq: &FifoPreemptionSequencer,
    hal: &H,
    holdoff: &mut HoldoffAggregator,
    info: &EngineInfo,
    ctx: &PreemptCtx,
    chan: ChanId,
) -> Result {
    // The background sequencer task must not run while the preempt is in
    // flight; it may disable the framebuffer underneath us.
    let _boost = PriorityBoost::above(hal, seq.seq_task_priority);

    let mut req = chan.id & regs::FIFO_PREEMPT_ID_MASK;
    if chan.tsg {
        req |= regs::FIFO_PREEMPT_TYPE_TSG;
    }
    hal.write32(Bus::Bar0, regs::FIFO_PREEMPT, req);
    debug!("fifo: preempt {:?}", chan);

    if seq.features.contains(Features::PBDMA_PREEMPT_POLL) {
        let mask = info.pbdma_mask;
        let seen = poll_until(hal, PBDMA_PREEMPT_ACK_TIMEOUT_NS, FAST_POLL_INTERVAL_NS, || {
            (0..seq.max_pbdma)
                .filter(|p| mask & (1 << p) != 0)
                .any(|p| hal.read32(Bus::Bar0, regs::pbdma_status(p)) & regs::PBDMA_STATUS_PREEMPT_SEEN != 0)
                .then_some(())
        });
        if seen.is_err() {
            debug!("fifo: pbdma {:#x} did not report the preempt", mask);
        }
    }

    release_holdoff(hal, holdoff, info, ctx)?;

    poll_until(hal, PREEMPT_PENDING_TIMEOUT_NS, POLL_INTERVAL_NS, || {
        (hal.read32(Bus::Bar0, regs::FIFO_PREEMPT) & regs::FIFO_PREEMPT_PENDING == 0).then_some(())
    })
    .inspect_err(|_| warn!("fifo: preempt of {:?} still pending", chan))
}
