// SPDX-License-Identifier: MIT

use super::abort::Held;
use super::{fecs, AbortReason, AbortStage, EnginePowerGateSequencer, Resources, SequencerState};
use crate::elcg::ElcgReason;
use crate::engine::EngineInfo;
use crate::error::{Error, Result};
use crate::fifo::PreemptCtx;
use crate::hal::{Bus, Hal};
use crate::holdoff::HoldoffClient;
use crate::hw::Features;
use crate::poll::{poll_until, POLL_INTERVAL_NS, SUBUNIT_IDLE_TIMEOUT_NS, UNBIND_TIMEOUT_NS};
use crate::regs;
use crate::rtos::{MutexGuard, MutexId};
use log::{debug, info, warn};

/// Where and why a save step failed.
struct Abort {
    stage: AbortStage,
    reason: AbortReason,
    err: Error,
}

impl Abort {
    fn at(stage: AbortStage, reason: AbortReason) -> impl FnOnce(Error) -> Abort {
        move |err| Abort { stage, reason, err }
    }
}

impl EnginePowerGateSequencer {
    /// Power-gates the engine.
    ///
    /// On success the engine is unbound and quiet, its holdoff stays engaged
    /// and ELCG stays off until [`restore`](Self::restore). On failure the
    /// attempt is rolled back and the engine is left as it was.
    pub fn save<H: Hal + ?Sized>(&mut self, hal: &H, res: &mut Resources<'_>) -> Result {
        if self.gated {
            debug!("pg: {:?} already gated", self.engine);
            return Ok(());
        }
        let info = *res.engines.get(self.engine)?;
        self.state = SequencerState::default();

        res.elcg.disable(hal, self.cfg.elcg_gr_engine, ElcgReason::GR_PG)?;
        hal.overlay_attach(self.cfg.gr_overlay_id);

        let mut held = Held::none();
        if let Err(abort) = self.save_steps(hal, res, &mut held, &info) {
            self.abort(hal, res, &mut held, &info, abort.stage, abort.reason);
            return Err(abort.err);
        }

        self.priv_blocker_set(hal, true);
        drop(held.gr.take());
        drop(held.fifo.take());
        hal.overlay_detach(self.cfg.gr_overlay_id);

        self.gated = true;
        self.stats.entries = self.stats.entries.wrapping_add(1);
        info!("pg: {:?} gated", self.engine);
        Ok(())
    }

    fn checkpoint<H: Hal + ?Sized>(
        &mut self,
        hal: &H,
        stage: AbortStage,
    ) -> core::result::Result<(), Abort> {
        self.idle_check(hal).map_err(|reason| Abort {
            stage,
            reason,
            err: Error::Busy,
        })
    }

    fn save_steps<'a, H: Hal + ?Sized>(
        &mut self,
        hal: &'a H,
        res: &mut Resources<'_>,
        held: &mut Held<'a, H>,
        info: &EngineInfo,
    ) -> core::result::Result<(), Abort> {
        self.checkpoint(hal, AbortStage::PgOn)?;

        let on_mutex = || Abort::at(AbortStage::MutexAcquire, AbortReason::MUTEX_ACQUIRE);
        held.fifo = Some(MutexGuard::acquire(hal, MutexId::Fifo).map_err(on_mutex())?);
        held.gr = Some(MutexGuard::acquire(hal, MutexId::Gr).map_err(on_mutex())?);

        if res.fifo.sched_disable(hal, info) {
            debug!("pg: scheduler already disabled, leaving it");
            self.state.skip_sched_enable = true;
        } else {
            self.state.sched_disabled = true;
        }
        self.checkpoint(hal, AbortStage::SchedDisable)?;

        self.state.holdoff_mask = info.holdoff_mask();
        res.holdoff
            .set(hal, HoldoffClient::GrPg, self.state.holdoff_mask)
            .map_err(Abort::at(AbortStage::HoldoffEngage, AbortReason::HOLDOFF_ENGAGE))?;
        self.checkpoint(hal, AbortStage::HoldoffEngage)?;

        let ctx = PreemptCtx {
            holdoff_client: HoldoffClient::GrPg,
        };
        res.fifo
            .preempt(hal, res.engines, res.holdoff, self.engine, &ctx)
            .map_err(Abort::at(AbortStage::Preempt, AbortReason::PREEMPT))?;

        // The preempt gave the holdoff bit back; nothing may sneak in now.
        res.holdoff
            .set(hal, HoldoffClient::GrPg, self.state.holdoff_mask)
            .map_err(Abort::at(AbortStage::HoldoffReengage, AbortReason::HOLDOFF_REENGAGE))?;
        if self.state.sched_disabled {
            res.fifo.sched_enable(hal, info);
            self.state.sched_disabled = false;
        }
        self.checkpoint(hal, AbortStage::HoldoffReengage)?;

        if self.cfg.features.contains(Features::GLOBAL_STATE_SAVE) {
            self.global_state_save(hal, res);
        }

        self.unbind(hal)
            .map_err(Abort::at(AbortStage::GlobalStateSave, AbortReason::UNBIND))?;
        poll_until(hal, SUBUNIT_IDLE_TIMEOUT_NS, POLL_INTERVAL_NS, || {
            (hal.read32(Bus::Bar0, regs::GR_STATUS) & regs::GR_STATUS_SUBUNITS_BUSY == 0).then_some(())
        })
        .map_err(Abort::at(AbortStage::GlobalStateSave, AbortReason::SUBUNIT_BUSY))?;

        Ok(())
    }

    /// Failure here is logged only; the save goes on without it.
    fn global_state_save<H: Hal + ?Sized>(&mut self, hal: &H, res: &mut Resources<'_>) {
        let gr = self.cfg.elcg_gr_engine;
        let war = self.cfg.features.contains(Features::GATE_CTRL_WAR)
            && res.elcg.war_save(hal, gr).is_ok();

        if let Err(e) = fecs::global_state_save(hal, self.cfg.fecs_mailbox) {
            warn!("pg: {:?} global state save failed: {}", self.engine, e);
        }

        if war {
            let _ = res.elcg.war_restore(hal, gr);
        }
    }

    fn unbind<H: Hal + ?Sized>(&self, hal: &H) -> Result {
        hal.write32(Bus::Bar0, regs::MMU_BIND_IMB, regs::MMU_BIND_IMB_UNBIND);
        hal.write32(Bus::Bar0, regs::MMU_BIND, regs::MMU_BIND_TRIGGER);
        poll_until(hal, UNBIND_TIMEOUT_NS, POLL_INTERVAL_NS, || {
            (hal.read32(Bus::Bar0, regs::MMU_BIND) & regs::MMU_BIND_TRIGGER == 0).then_some(())
        })
        .inspect_err(|_| warn!("pg: {:?} unbind did not complete", self.engine))
    }
}
