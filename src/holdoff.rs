// SPDX-License-Identifier: MIT

//! Holdoff: blocking register-method delivery to engines.
//!
//! Several features ask for holdoff independently. Each owns one slot; the
//! hardware always sees the OR of all slots.

use crate::error::{Error, Result};
use crate::hal::{Bus, Hal};
use crate::poll::{poll_until, FAST_POLL_INTERVAL_NS, HOLDOFF_ENGAGE_TIMEOUT_NS};
use crate::regs;
use log::{debug, warn};

/// Holdoff requesters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum HoldoffClient {
    /// GR power gating.
    GrPg = 0,
    /// GR render gating.
    GrRg = 1,
    /// Memory subsystem gating.
    Ms = 2,
}

impl HoldoffClient {
    pub const COUNT: usize = 3;
}

pub struct HoldoffAggregator {
    masks: [u32; HoldoffClient::COUNT],
}

impl Default for HoldoffAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldoffAggregator {
    pub const fn new() -> HoldoffAggregator {
        HoldoffAggregator {
            masks: [0; HoldoffClient::COUNT],
        }
    }

    /// Last mask requested by `client`.
    pub fn mask(&self, client: HoldoffClient) -> u32 {
        self.masks[client as usize]
    }

    /// OR of every client's mask.
    pub fn aggregate(&self) -> u32 {
        self.masks.iter().fold(0, |acc, m| acc | m)
    }

    /// Replaces `client`'s mask and programs the aggregate.
    ///
    /// For a non-empty `mask`, waits for hardware to acknowledge holdoff on
    /// every requested bit and checks those engines are idle. On `Timeout`
    /// the new aggregate stays programmed; undoing it is up to the caller.
    pub fn set<H: Hal + ?Sized>(&mut self, hal: &H, client: HoldoffClient, mask: u32) -> Result {
        self.masks[client as usize] = mask;
        let aggregate = self.aggregate();
        hal.write32(Bus::Csb, regs::HOLDOFF_MASK, aggregate);
        debug!("holdoff: {:?} mask {:#x} aggregate {:#x}", client, mask, aggregate);

        if mask == 0 {
            return Ok(());
        }

        poll_until(hal, HOLDOFF_ENGAGE_TIMEOUT_NS, FAST_POLL_INTERVAL_NS, || {
            (hal.read32(Bus::Csb, regs::HOLDOFF_ENGAGED) & mask == mask).then_some(())
        })
        .inspect_err(|_| warn!("holdoff: {:?} engage {:#x} not acked", client, mask))?;

        let idle = hal.read32(Bus::Csb, regs::HOLDOFF_ENG_IDLE);
        if idle & mask != mask {
            warn!(
                "holdoff: {:?} engines {:#x} busy under holdoff",
                client,
                mask & !idle
            );
            return Err(Error::Timeout);
        }
        Ok(())
    }

    /// Masks holdoff interrupts for `mask`.
    pub fn intr_disable<H: Hal + ?Sized>(&self, hal: &H, mask: u32) {
        hal.rmw32(Bus::Csb, regs::HOLDOFF_INTR_EN, mask, 0);
    }

    /// Unmasks holdoff interrupts for `mask`.
    pub fn intr_enable<H: Hal + ?Sized>(&self, hal: &H, mask: u32) {
        hal.rmw32(Bus::Csb, regs::HOLDOFF_INTR_EN, 0, mask);
    }
}
