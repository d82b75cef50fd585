// SPDX-License-Identifier: MIT

//! Hardware configuration for the runlist-granular family.

use super::*;

pub(crate) const HWCONFIG_GA10X: ChipConfig = ChipConfig {
    name: "ga10x",
    chip_id: 0x170,
    preempt: PreemptStrategy::Runlist,
    features: Features::NEW_HOST_SEQUENCE
        .union(Features::WAKEUP_PENDING_CHECK)
        .union(Features::PRIV_BLOCKER)
        .union(Features::GLOBAL_STATE_SAVE),

    elcg_engine_count: 16,
    elcg_gr_engine: 0,
    clk_domains: ClkDomains::all(),

    seq_task_priority: 4,
    max_pbdma: 14,
    device_info_rows: 256,

    gr_pg_ctrl: 0,
    gr_priv_blocker: 0,
    gr_overlay_id: 0x34,
    fecs_mailbox: 7,
};
