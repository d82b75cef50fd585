// SPDX-License-Identifier: MIT

//! Hardware configuration for the PBDMA-granular family.

use super::*;

pub(crate) const HWCONFIG_GP10X: ChipConfig = ChipConfig {
    name: "gp10x",
    chip_id: 0x130,
    preempt: PreemptStrategy::Pbdma,
    features: Features::PBDMA_PREEMPT_POLL
        .union(Features::GATE_CTRL_WAR)
        .union(Features::GLOBAL_STATE_SAVE),

    elcg_engine_count: 9,
    elcg_gr_engine: 0,
    clk_domains: ClkDomains::GPC.union(ClkDomains::XBAR).union(ClkDomains::SYS),

    seq_task_priority: 3,
    max_pbdma: 4,
    device_info_rows: 64,

    gr_pg_ctrl: 0,
    gr_priv_blocker: 0,
    gr_overlay_id: 0x21,
    fecs_mailbox: 7,
};
