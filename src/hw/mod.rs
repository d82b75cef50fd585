// SPDX-License-Identifier: MIT

//! Per-chip-family hardware configuration.
//!
//! Each supported family gets one static [`ChipConfig`]. Nothing in here is
//! read from hardware; the dynamic part (the engine table) lives in
//! [`crate::engine`].

use crate::clkpath::ClkDomains;
use crate::error::{Error, Result};
use bitflags::bitflags;

pub(crate) mod ga10x;
pub(crate) mod gp10x;

/// How in-flight work is removed from the host front-end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PreemptStrategy {
    /// Channel/TSG preempt resolved through PBDMA and engine status.
    Pbdma,
    /// Whole-runlist preempt.
    Runlist,
}

bitflags! {
    /// Optional behavior enabled per chip family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        /// Host handles holdoff interrupts around a runlist preempt natively.
        const NEW_HOST_SEQUENCE = 1 << 0;
        /// Wait for the PBDMA to observe a channel/TSG preempt request.
        const PBDMA_PREEMPT_POLL = 1 << 1;
        /// Abort a save when the PG task has a wakeup queued.
        const WAKEUP_PENDING_CHECK = 1 << 2;
        /// Block priv access to GR while it is power-gated.
        const PRIV_BLOCKER = 1 << 3;
        /// Gate-control snapshot around the blocking clock-gating workaround.
        const GATE_CTRL_WAR = 1 << 4;
        /// Save and restore FECS global state around PG.
        const GLOBAL_STATE_SAVE = 1 << 5;
    }
}

/// Static hardware configuration for a chip family.
#[derive(Debug)]
pub struct ChipConfig {
    /// Family name, for logs.
    pub name: &'static str,
    /// Architecture/implementation id as reported by the boot registers.
    pub chip_id: u32,
    pub preempt: PreemptStrategy,
    pub features: Features,

    /// Number of engines the ELCG gate-control array covers.
    pub elcg_engine_count: u32,
    /// ELCG index of the GR engine.
    pub elcg_gr_engine: u32,
    /// Clock domains whose path this family lets us switch.
    pub clk_domains: ClkDomains,

    /// Priority of the background sequencer task the preempt must not be
    /// starved by.
    pub seq_task_priority: u32,
    /// Number of PBDMAs behind the host.
    pub max_pbdma: u32,
    /// Rows in the device info table.
    pub device_info_rows: u32,

    /// PG controller id of GR.
    pub gr_pg_ctrl: u32,
    /// Priv blocker instance covering GR.
    pub gr_priv_blocker: u32,
    /// Transient code resource used by the GR save/restore paths.
    pub gr_overlay_id: u32,
    /// FECS mailbox index used by the global state handshake.
    pub fecs_mailbox: u32,
}

const CONFIGS: &[&ChipConfig] = &[&gp10x::HWCONFIG_GP10X, &ga10x::HWCONFIG_GA10X];

/// Looks up the configuration for `chip_id`.
pub fn config_for(chip_id: u32) -> Result<&'static ChipConfig> {
    CONFIGS
        .iter()
        .copied()
        .find(|cfg| cfg.chip_id == chip_id)
        .ok_or(Error::NotSupported)
}
