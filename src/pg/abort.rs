// SPDX-License-Identifier: MIT

//! The save rollback ladder.
//!
//! Each rollback action belongs to the stage that made it necessary. An
//! abort at stage `s` runs, in ladder order, every action whose stage is at
//! or below `s`, so everything done so far is undone no matter where the
//! save stopped.

use super::{AbortReason, AbortStage, EnginePowerGateSequencer, Resources};
use crate::elcg::ElcgReason;
use crate::engine::EngineInfo;
use crate::hal::Hal;
use crate::holdoff::HoldoffClient;
use crate::rtos::MutexGuard;
use log::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rollback {
    ReleaseHoldoff,
    SchedEnable,
    ReleaseGrMutex,
    ReleaseFifoMutex,
    DetachOverlay,
    DisengagePrivBlocker,
    RearmElcg,
}

const LADDER: [(Rollback, AbortStage); 7] = [
    (Rollback::ReleaseHoldoff, AbortStage::HoldoffEngage),
    (Rollback::SchedEnable, AbortStage::SchedDisable),
    (Rollback::ReleaseGrMutex, AbortStage::MutexAcquire),
    (Rollback::ReleaseFifoMutex, AbortStage::MutexAcquire),
    (Rollback::DetachOverlay, AbortStage::PgOn),
    (Rollback::DisengagePrivBlocker, AbortStage::PgOn),
    (Rollback::RearmElcg, AbortStage::PgOn),
];

/// Rollback actions an abort at `stage` runs, in execution order.
pub fn rollback_steps(stage: AbortStage) -> impl Iterator<Item = Rollback> {
    LADDER
        .into_iter()
        .filter(move |(_, from)| stage >= *from)
        .map(|(step, _)| step)
}

/// Mutexes claimed by the attempt in flight.
pub(super) struct Held<'a, H: Hal + ?Sized> {
    pub(super) fifo: Option<MutexGuard<'a, H>>,
    pub(super) gr: Option<MutexGuard<'a, H>>,
}

impl<H: Hal + ?Sized> Held<'_, H> {
    pub(super) fn none() -> Self {
        Held { fifo: None, gr: None }
    }
}

impl EnginePowerGateSequencer {
    /// Records the abort and unwinds the attempt from `stage`.
    pub(super) fn abort<'a, H: Hal + ?Sized>(
        &mut self,
        hal: &'a H,
        res: &mut Resources<'_>,
        held: &mut Held<'a, H>,
        info: &EngineInfo,
        stage: AbortStage,
        reason: AbortReason,
    ) {
        warn!("pg: {:?} save aborted at {:?} ({:?})", self.engine, stage, reason);
        self.stats.aborts = self.stats.aborts.wrapping_add(1);
        self.stats.last_abort_reason = reason;
        self.stats.last_abort_stage = Some(stage);

        for step in rollback_steps(stage) {
            debug!("pg: rollback {:?}", step);
            match step {
                Rollback::ReleaseHoldoff => {
                    // Clearing never polls, so this cannot fail.
                    let _ = res.holdoff.set(hal, HoldoffClient::GrPg, 0);
                    self.state.holdoff_mask = 0;
                }
                Rollback::SchedEnable => {
                    if self.state.sched_disabled && !self.state.skip_sched_enable {
                        res.fifo.sched_enable(hal, info);
                    }
                    self.state.sched_disabled = false;
                }
                Rollback::ReleaseGrMutex => drop(held.gr.take()),
                Rollback::ReleaseFifoMutex => drop(held.fifo.take()),
                Rollback::DetachOverlay => hal.overlay_detach(self.cfg.gr_overlay_id),
                Rollback::DisengagePrivBlocker => self.priv_blocker_set(hal, false),
                Rollback::RearmElcg => {
                    let _ = res
                        .elcg
                        .enable(hal, self.cfg.elcg_gr_engine, ElcgReason::GR_PG)
                        .inspect_err(|e| warn!("pg: re-arming ELCG failed: {}", e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Bus, TaskControl};
    use crate::hw::ga10x::HWCONFIG_GA10X;
    use crate::hw::gp10x::HWCONFIG_GP10X;
    use crate::hw::ChipConfig;
    use crate::pg::testutil::{Rig, GR_INFO};
    use crate::regs;
    use crate::Error;

    #[test]
    fn ladder_is_cumulative() {
        let pg_on: Vec<_> = rollback_steps(AbortStage::PgOn).collect();
        assert_eq!(
            pg_on,
            [Rollback::DetachOverlay, Rollback::DisengagePrivBlocker, Rollback::RearmElcg]
        );

        let all: Vec<_> = rollback_steps(AbortStage::GlobalStateSave).collect();
        assert_eq!(all, LADDER.map(|(step, _)| step));

        // Each later stage runs a superset, preserving order.
        let stages = [
            AbortStage::PgOn,
            AbortStage::MutexAcquire,
            AbortStage::SchedDisable,
            AbortStage::HoldoffEngage,
            AbortStage::Preempt,
            AbortStage::HoldoffReengage,
            AbortStage::GlobalStateSave,
        ];
        for pair in stages.windows(2) {
            let lo: Vec<_> = rollback_steps(pair[0]).collect();
            let hi: Vec<_> = rollback_steps(pair[1]).collect();
            assert!(lo.iter().all(|s| hi.contains(s)));
            let filtered: Vec<_> = hi.iter().filter(|s| lo.contains(s)).copied().collect();
            assert_eq!(filtered, lo);
        }
    }

    /// Injects a failure that trips the save at one stage.
    fn inject(rig: &Rig, cfg: &ChipConfig, stage: AbortStage) {
        let intr = regs::pg_intr_stat(cfg.gr_pg_ctrl);
        match stage {
            AbortStage::PgOn => rig.hal.set(Bus::Csb, intr, 1),
            AbortStage::MutexAcquire => rig.hal.set(Bus::Csb, regs::mutex(1), 0x42),
            AbortStage::SchedDisable => {
                rig.hal.queue(Bus::Csb, intr, &[0]);
                rig.hal.set(Bus::Csb, intr, 1);
            }
            AbortStage::HoldoffEngage => rig.hal.clear_reaction(Bus::Csb, regs::HOLDOFF_MASK),
            AbortStage::Preempt => rig.hal.set(Bus::Bar0, regs::FIFO_INTR_PBDMA_ID, 0b1),
            AbortStage::HoldoffReengage => {
                rig.hal.queue(Bus::Csb, intr, &[0, 0, 0]);
                rig.hal.set(Bus::Csb, intr, 1);
            }
            AbortStage::GlobalStateSave => {
                rig.hal.set(Bus::Bar0, regs::GR_STATUS, regs::GR_STATUS_SUBUNITS_BUSY)
            }
        }
    }

    #[test]
    fn every_abort_leaves_engine_active() {
        let cases = [
            (AbortStage::PgOn, AbortReason::INTR_PENDING),
            (AbortStage::MutexAcquire, AbortReason::MUTEX_ACQUIRE),
            (AbortStage::SchedDisable, AbortReason::INTR_PENDING),
            (AbortStage::HoldoffEngage, AbortReason::HOLDOFF_ENGAGE),
            (AbortStage::Preempt, AbortReason::PREEMPT),
            (AbortStage::HoldoffReengage, AbortReason::INTR_PENDING),
            (AbortStage::GlobalStateSave, AbortReason::SUBUNIT_BUSY),
        ];

        for (stage, reason) in cases {
            let mut rig = Rig::new(&HWCONFIG_GP10X);
            inject(&rig, &HWCONFIG_GP10X, stage);

            assert!(rig.save().is_err(), "{:?}", stage);
            let stats = rig.pg.stats();
            assert_eq!(stats.last_abort_stage, Some(stage));
            assert_eq!(stats.last_abort_reason, reason, "{:?}", stage);
            assert_eq!((stats.aborts, stats.entries), (1, 0));

            if stage == AbortStage::MutexAcquire {
                // The contending owner keeps its claim; ours was dropped.
                assert_eq!(rig.hal.get(Bus::Csb, regs::mutex(1)), 0x42);
                assert_eq!(
                    rig.hal.get(Bus::Csb, regs::mutex(0)),
                    regs::MUTEX_VALUE_INITIAL_LOCK
                );
            } else {
                assert!(rig.mutexes_free(), "{:?}", stage);
            }
            assert_eq!(rig.holdoff.aggregate(), 0, "{:?}", stage);
            assert_eq!(rig.hal.get(Bus::Csb, regs::HOLDOFF_MASK), 0, "{:?}", stage);
            assert_eq!(rig.hal.get(Bus::Bar0, regs::FIFO_SCHED_DISABLE), 0, "{:?}", stage);
            assert!(rig.hal.overlays().is_empty(), "{:?}", stage);
            assert!(rig.gr_armed(), "{:?}", stage);
            assert!(!rig.pg.is_gated());
        }
    }

    #[test]
    fn mutex_release_order() {
        let mut rig = Rig::new(&HWCONFIG_GP10X);
        let intr = regs::pg_intr_stat(HWCONFIG_GP10X.gr_pg_ctrl);
        rig.hal.queue(Bus::Csb, intr, &[0]);
        rig.hal.set(Bus::Csb, intr, 1);
        rig.hal.clear_writes();

        assert_eq!(rig.save(), Err(Error::Busy));
        let releases: Vec<u32> = rig
            .hal
            .writes()
            .iter()
            .filter(|(bus, addr, val)| {
                *bus == Bus::Csb
                    && (*addr == regs::mutex(0) || *addr == regs::mutex(1))
                    && *val == regs::MUTEX_VALUE_INITIAL_LOCK
            })
            .map(|(_, addr, _)| *addr)
            .collect();
        assert_eq!(releases, [regs::mutex(1), regs::mutex(0)]);
    }

    #[test]
    fn foreign_sched_disable_survives_abort() {
        let mut rig = Rig::new(&HWCONFIG_GP10X);
        let bit = 1 << GR_INFO.runlist;
        rig.hal.set(Bus::Bar0, regs::FIFO_SCHED_DISABLE, bit);
        rig.hal.set(Bus::Bar0, regs::FIFO_INTR_PBDMA_ID, 0b1);

        assert_eq!(rig.save(), Err(Error::Busy));
        assert_eq!(rig.hal.get(Bus::Bar0, regs::FIFO_SCHED_DISABLE), bit);
        assert!(rig.hal.writes_to(Bus::Bar0, regs::FIFO_SCHED_DISABLE).is_empty());
    }

    #[test]
    fn priv_blocker_disengaged_on_abort() {
        let mut rig = Rig::new(&HWCONFIG_GA10X);
        let blocker = regs::priv_blocker_ctrl(HWCONFIG_GA10X.gr_priv_blocker);
        rig.hal.set(Bus::Csb, blocker, regs::PRIV_BLOCKER_MODE_BLOCK_ALL);
        rig.hal.set(Bus::Csb, regs::pg_stat(HWCONFIG_GA10X.gr_pg_ctrl), regs::PG_STAT_IDLE_FLIPPED);

        assert_eq!(rig.save(), Err(Error::Busy));
        assert_eq!(rig.pg.stats().last_abort_reason, AbortReason::IDLE_FLIPPED);
        assert_eq!(rig.hal.get(Bus::Csb, blocker), regs::PRIV_BLOCKER_MODE_NONE);
        assert_eq!(rig.hal.priority(), 1);
    }
}
