// SPDX-License-Identifier: MIT

//! The power-management context owned by the PMU's power task.
//!
//! Created once at init and passed by reference to every operation; it is
//! the only place holdoff, ELCG and clock-path state live.

use crate::clkpath::ClockPathController;
use crate::cmd::{driver_elcg_reason, Action, Command};
use crate::elcg::ElcgController;
use crate::engine::{EngineId, EngineTable};
use crate::error::{Error, Result, Status};
use crate::fifo::FifoPreemptionSequencer;
use crate::hal::Hal;
use crate::holdoff::HoldoffAggregator;
use crate::hw::{self, ChipConfig, Features};
use crate::pg::{EnginePowerGateSequencer, Resources};
use log::{debug, info, warn};

pub struct PowerContext {
    cfg: &'static ChipConfig,
    engines: EngineTable,
    holdoff: HoldoffAggregator,
    elcg: ElcgController,
    clk: ClockPathController,
    fifo: FifoPreemptionSequencer,
    gr: EnginePowerGateSequencer,
}

impl PowerContext {
    pub fn new<H: Hal + ?Sized>(hal: &H, chip_id: u32) -> Result<PowerContext> {
        let cfg = hw::config_for(chip_id)
            .inspect_err(|_| warn!("lpwr: unknown chip {:#x}", chip_id))?;
        Ok(PowerContext::with_engines(cfg, EngineTable::scan(hal, cfg)))
    }

    /// Builds a context around an already-known engine table.
    pub fn with_engines(cfg: &'static ChipConfig, engines: EngineTable) -> PowerContext {
        info!("lpwr: {} ({:?} preemption)", cfg.name, cfg.preempt);
        if !engines.contains(EngineId::Gr) {
            warn!("lpwr: no GR engine in device info, GR PG unavailable");
        }

        PowerContext {
            cfg,
            engines,
            holdoff: HoldoffAggregator::new(),
            elcg: ElcgController::new(
                cfg.elcg_engine_count,
                cfg.features.contains(Features::GATE_CTRL_WAR),
            ),
            clk: ClockPathController::new(cfg.clk_domains),
            fifo: FifoPreemptionSequencer::new(cfg),
            gr: EnginePowerGateSequencer::new(cfg, EngineId::Gr),
        }
    }

    pub fn config(&self) -> &'static ChipConfig {
        self.cfg
    }

    pub fn engines(&self) -> &EngineTable {
        &self.engines
    }

    pub fn holdoff(&self) -> &HoldoffAggregator {
        &self.holdoff
    }

    pub fn elcg(&self) -> &ElcgController {
        &self.elcg
    }

    pub fn clk(&self) -> &ClockPathController {
        &self.clk
    }

    pub fn gr(&self) -> &EnginePowerGateSequencer {
        &self.gr
    }

    fn split(&mut self) -> (&mut EnginePowerGateSequencer, Resources<'_>) {
        (
            &mut self.gr,
            Resources {
                engines: &self.engines,
                holdoff: &mut self.holdoff,
                elcg: &mut self.elcg,
                fifo: &self.fifo,
            },
        )
    }

    pub fn gr_pg_save<H: Hal + ?Sized>(&mut self, hal: &H) -> Result {
        let (gr, mut res) = self.split();
        gr.save(hal, &mut res)
    }

    pub fn gr_pg_restore<H: Hal + ?Sized>(&mut self, hal: &H) -> Result {
        let (gr, mut res) = self.split();
        gr.restore(hal, &mut res)
    }

    /// Checks `engine` is one this build power-gates.
    fn check_pg_engine(&self, engine: u32) -> Result {
        if EngineId::try_from(engine)? != self.gr.engine() {
            return Err(Error::NotSupported);
        }
        Ok(())
    }

    pub fn notify_wakeup(&mut self, engine: u32) -> Result {
        self.check_pg_engine(engine)?;
        self.gr.notify_wakeup();
        Ok(())
    }

    /// Runs one driver command.
    pub fn dispatch<H: Hal + ?Sized>(&mut self, hal: &H, cmd: Command) -> Status {
        debug!("lpwr: {:?}", cmd);
        let res = match cmd.action {
            Action::ElcgEnable(reason) => driver_elcg_reason(reason)
                .and_then(|reason| self.elcg.enable(hal, cmd.engine, reason)),
            Action::ElcgDisable(reason) => driver_elcg_reason(reason)
                .and_then(|reason| self.elcg.disable(hal, cmd.engine, reason)),
            Action::PgEnter => self
                .check_pg_engine(cmd.engine)
                .and_then(|()| self.gr_pg_save(hal)),
            Action::PgExit => self
                .check_pg_engine(cmd.engine)
                .and_then(|()| self.gr_pg_restore(hal)),
            Action::ClkPowerDown(mask, target) => self.clk.power_down(hal, mask, target),
            Action::ClkPowerUp(mask, target) => self.clk.power_up(hal, mask, target),
        };
        if let Err(e) = res {
            debug!("lpwr: {:?} failed: {}", cmd.action, e);
        }
        res.into()
    }
}
