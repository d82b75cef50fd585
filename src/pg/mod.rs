// SPDX-License-Identifier: MIT

//! GR power gating.
//!
//! Saving walks GR from busy-capable to unbound and quiet in a fixed order,
//! re-checking idleness wherever new work could have slipped in. Every step
//! that changes shared state advances an [`AbortStage`]; a failure rolls back
//! everything done up to that stage through the ladder in [`abort`].
//! Restoring mirrors the save.

use crate::elcg::ElcgController;
use crate::engine::{EngineId, EngineTable};
use crate::fifo::FifoPreemptionSequencer;
use crate::hal::{Bus, Hal};
use crate::holdoff::HoldoffAggregator;
use crate::hw::{ChipConfig, Features};
use crate::regs;
use bitflags::bitflags;
use log::debug;

mod abort;
pub(crate) mod fecs;
mod restore;
mod save;

pub use abort::{rollback_steps, Rollback};

bitflags! {
    /// Why the last save attempt was abandoned.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AbortReason: u32 {
        const INTR_PENDING = 1 << 0;
        const IDLE_FLIPPED = 1 << 1;
        const WAKEUP_PENDING = 1 << 2;
        const MUTEX_ACQUIRE = 1 << 3;
        const HOLDOFF_ENGAGE = 1 << 4;
        const PREEMPT = 1 << 5;
        const HOLDOFF_REENGAGE = 1 << 6;
        const UNBIND = 1 << 7;
        const SUBUNIT_BUSY = 1 << 8;
    }
}

/// How far a save attempt got. Later stages compare greater.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AbortStage {
    /// Overlay attached and ELCG held off.
    PgOn,
    /// FIFO and GR mutexes claimed (or partially claimed).
    MutexAcquire,
    SchedDisable,
    HoldoffEngage,
    Preempt,
    HoldoffReengage,
    GlobalStateSave,
}

/// Entry/exit bookkeeping, kept for diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PgStats {
    pub entries: u32,
    pub exits: u32,
    pub aborts: u32,
    pub last_abort_reason: AbortReason,
    pub last_abort_stage: Option<AbortStage>,
}

impl PgStats {
    const fn new() -> PgStats {
        PgStats {
            entries: 0,
            exits: 0,
            aborts: 0,
            last_abort_reason: AbortReason::empty(),
            last_abort_stage: None,
        }
    }
}

/// Shared components a save or restore drives.
pub struct Resources<'a> {
    pub engines: &'a EngineTable,
    pub holdoff: &'a mut HoldoffAggregator,
    pub elcg: &'a mut ElcgController,
    pub fifo: &'a FifoPreemptionSequencer,
}

/// Per-attempt state. Cleared at the start of every save.
#[derive(Debug, Default)]
struct SequencerState {
    /// Scheduling was already disabled by someone else; leave it that way.
    skip_sched_enable: bool,
    /// We disabled scheduling and have not re-enabled it yet.
    sched_disabled: bool,
    holdoff_mask: u32,
}

pub struct EnginePowerGateSequencer {
    cfg: &'static ChipConfig,
    engine: EngineId,
    state: SequencerState,
    wakeup_pending: bool,
    gated: bool,
    stats: PgStats,
}

impl EnginePowerGateSequencer {
    pub fn new(cfg: &'static ChipConfig, engine: EngineId) -> EnginePowerGateSequencer {
        EnginePowerGateSequencer {
            cfg,
            engine,
            state: SequencerState::default(),
            wakeup_pending: false,
            gated: false,
            stats: PgStats::new(),
        }
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// Whether the engine is currently power-gated.
    pub fn is_gated(&self) -> bool {
        self.gated
    }

    pub fn stats(&self) -> &PgStats {
        &self.stats
    }

    /// Flags work queued for the engine. An in-flight or following save
    /// gives up at its next idle check on chips that look at this.
    pub fn notify_wakeup(&mut self) {
        self.wakeup_pending = true;
    }

    /// Checks nothing new arrived for the engine.
    fn idle_check<H: Hal + ?Sized>(&mut self, hal: &H) -> core::result::Result<(), AbortReason> {
        let ctrl = self.cfg.gr_pg_ctrl;
        if hal.read32(Bus::Csb, regs::pg_intr_stat(ctrl)) != 0 {
            return Err(AbortReason::INTR_PENDING);
        }
        if hal.read32(Bus::Csb, regs::pg_stat(ctrl)) & regs::PG_STAT_IDLE_FLIPPED != 0 {
            return Err(AbortReason::IDLE_FLIPPED);
        }
        if self.cfg.features.contains(Features::WAKEUP_PENDING_CHECK) && self.wakeup_pending {
            self.wakeup_pending = false;
            return Err(AbortReason::WAKEUP_PENDING);
        }
        Ok(())
    }

    fn priv_blocker_set<H: Hal + ?Sized>(&self, hal: &H, engage: bool) {
        if !self.cfg.features.contains(Features::PRIV_BLOCKER) {
            return;
        }
        let mode = if engage {
            regs::PRIV_BLOCKER_MODE_BLOCK_ALL
        } else {
            regs::PRIV_BLOCKER_MODE_NONE
        };
        hal.write32(Bus::Csb, regs::priv_blocker_ctrl(self.cfg.gr_priv_blocker), mode);
        debug!("pg: priv blocker mode {}", mode);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::engine::EngineInfo;
    use crate::fake::{FakeHal, FAKE_RL_BASE};

    pub(crate) const GR_INFO: EngineInfo = EngineInfo {
        fifo_engine: 0,
        runlist: 1,
        pbdma_mask: 0b1,
        rl_priv_base: FAKE_RL_BASE,
        rl_engine_id: 0,
        holdoff_bit: 0,
    };

    /// Everything a save or restore needs, over a fake GPU.
    pub(crate) struct Rig {
        pub(crate) hal: FakeHal,
        pub(crate) engines: EngineTable,
        pub(crate) holdoff: HoldoffAggregator,
        pub(crate) elcg: ElcgController,
        pub(crate) fifo: FifoPreemptionSequencer,
        pub(crate) pg: EnginePowerGateSequencer,
    }

    impl Rig {
        pub(crate) fn new(cfg: &'static ChipConfig) -> Rig {
            let hal = FakeHal::gpu();
            for eng in 0..cfg.elcg_engine_count {
                hal.set(Bus::Bar0, regs::therm_gate_ctrl(eng), regs::GATE_CTRL_ENG_CLK_AUTO);
            }
            Rig {
                hal,
                engines: EngineTable::from_entries(&[(EngineId::Gr, GR_INFO)]),
                holdoff: HoldoffAggregator::new(),
                elcg: ElcgController::new(
                    cfg.elcg_engine_count,
                    cfg.features.contains(Features::GATE_CTRL_WAR),
                ),
                fifo: FifoPreemptionSequencer::new(cfg),
                pg: EnginePowerGateSequencer::new(cfg, EngineId::Gr),
            }
        }

        pub(crate) fn save(&mut self) -> crate::Result {
            let mut res = Resources {
                engines: &self.engines,
                holdoff: &mut self.holdoff,
                elcg: &mut self.elcg,
                fifo: &self.fifo,
            };
            self.pg.save(&self.hal, &mut res)
        }

        pub(crate) fn restore(&mut self) -> crate::Result {
            let mut res = Resources {
                engines: &self.engines,
                holdoff: &mut self.holdoff,
                elcg: &mut self.elcg,
                fifo: &self.fifo,
            };
            self.pg.restore(&self.hal, &mut res)
        }

        pub(crate) fn gr_armed(&self) -> bool {
            self.elcg.is_armed(&self.hal, self.pg.cfg.elcg_gr_engine).unwrap()
        }

        /// No GR mutex or FIFO mutex is held.
        pub(crate) fn mutexes_free(&self) -> bool {
            [0, 1]
                .iter()
                .all(|idx| self.hal.get(Bus::Csb, regs::mutex(*idx)) == regs::MUTEX_VALUE_INITIAL_LOCK)
        }
    }
}
