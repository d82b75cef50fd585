// SPDX-License-Identifier: MIT

use super::{fecs, EnginePowerGateSequencer, Resources};
use crate::elcg::ElcgReason;
use crate::error::Result;
use crate::fatal;
use crate::hal::{Bus, Hal};
use crate::holdoff::HoldoffClient;
use crate::hw::Features;
use crate::poll::{poll_until, POLL_INTERVAL_NS, RESTORE_ACK_TIMEOUT_NS};
use crate::regs;
use log::{debug, info, warn};

impl EnginePowerGateSequencer {
    /// Brings a gated engine back. A restore the hardware does not
    /// acknowledge halts the firmware; there is no state to fall back to.
    pub fn restore<H: Hal + ?Sized>(&mut self, hal: &H, res: &mut Resources<'_>) -> Result {
        if !self.gated {
            debug!("pg: {:?} not gated", self.engine);
            return Ok(());
        }
        res.engines.get(self.engine)?;

        hal.overlay_attach(self.cfg.gr_overlay_id);

        hal.rmw32(Bus::Bar0, regs::PMC_ENABLE, regs::PMC_ENABLE_GR, 0);
        hal.rmw32(Bus::Bar0, regs::PMC_ENABLE, 0, regs::PMC_ENABLE_GR);

        let ctrl = regs::pg_restore_ctrl(self.cfg.gr_pg_ctrl);
        hal.write32(Bus::Csb, ctrl, regs::PG_RESTORE_REQ);
        let acked = poll_until(hal, RESTORE_ACK_TIMEOUT_NS, POLL_INTERVAL_NS, || {
            (hal.read32(Bus::Csb, ctrl) & regs::PG_RESTORE_ACK != 0).then_some(())
        });
        if acked.is_err() {
            fatal!(hal, "pg: {:?} register restore not acked", self.engine);
        }

        if self.cfg.features.contains(Features::GLOBAL_STATE_SAVE) {
            if let Err(e) = fecs::global_state_restore(hal, self.cfg.fecs_mailbox) {
                warn!("pg: {:?} global state restore failed: {}", self.engine, e);
            }
        }

        res.holdoff.set(hal, HoldoffClient::GrPg, 0)?;
        self.state.holdoff_mask = 0;
        self.priv_blocker_set(hal, false);
        res.elcg.enable(hal, self.cfg.elcg_gr_engine, ElcgReason::GR_PG)?;

        hal.overlay_detach(self.cfg.gr_overlay_id);

        self.gated = false;
        self.wakeup_pending = false;
        self.stats.exits = self.stats.exits.wrapping_add(1);
        info!("pg: {:?} restored", self.engine);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::ga10x::HWCONFIG_GA10X;
    use crate::hw::gp10x::HWCONFIG_GP10X;
    use crate::pg::testutil::Rig;

    #[test]
    fn restore_mirrors_save() {
        let mut rig = Rig::new(&HWCONFIG_GA10X);
        rig.hal.set(Bus::Bar0, regs::PMC_ENABLE, regs::PMC_ENABLE_GR | 1);
        rig.save().unwrap();
        rig.hal.clear_writes();

        rig.restore().unwrap();
        assert!(!rig.pg.is_gated());
        assert_eq!(rig.pg.stats().exits, 1);

        assert_eq!(
            rig.hal.writes_to(Bus::Bar0, regs::PMC_ENABLE),
            [1, regs::PMC_ENABLE_GR | 1]
        );
        assert_eq!(
            rig.hal.writes_to(Bus::Fecs, regs::FECS_METHOD_PUSH),
            [fecs::METHOD_GLOBAL_STATE_RESTORE]
        );
        assert_eq!(rig.hal.get(Bus::Csb, regs::HOLDOFF_MASK), 0);
        assert_eq!(
            rig.hal.get(Bus::Csb, regs::priv_blocker_ctrl(HWCONFIG_GA10X.gr_priv_blocker)),
            regs::PRIV_BLOCKER_MODE_NONE
        );
        assert!(rig.gr_armed());
        assert!(rig.hal.overlays().is_empty());
    }

    #[test]
    fn cycles() {
        let mut rig = Rig::new(&HWCONFIG_GP10X);
        for _ in 0..3 {
            rig.save().unwrap();
            rig.restore().unwrap();
        }
        let stats = rig.pg.stats();
        assert_eq!((stats.entries, stats.exits, stats.aborts), (3, 3, 0));
        assert!(rig.mutexes_free());
    }

    #[test]
    fn restore_without_save_is_noop() {
        let mut rig = Rig::new(&HWCONFIG_GP10X);
        rig.restore().unwrap();
        assert!(rig.hal.writes().is_empty());
        assert_eq!(rig.pg.stats().exits, 0);
    }

    #[test]
    #[should_panic(expected = "firmware halted")]
    fn unacked_restore_halts() {
        let mut rig = Rig::new(&HWCONFIG_GP10X);
        rig.save().unwrap();
        rig.hal.clear_reaction(Bus::Csb, regs::pg_restore_ctrl(HWCONFIG_GP10X.gr_pg_ctrl));
        let _ = rig.restore();
    }
}
