// SPDX-License-Identifier: MIT

//! Register map used by the sequencers.
//!
//! Only the fields the sequences depend on are described. Offsets are grouped
//! by the bus they live on.

// ---- CSB (PMU local) ----

/// Hardware mutex token generator. Reads return a fresh token.
pub(crate) const MUTEX_ID: u32 = 0x0488;
/// Write a token here to return it to the generator.
pub(crate) const MUTEX_ID_RELEASE: u32 = 0x048c;
pub(crate) const MUTEX_ID_VALUE_INIT: u32 = 0x00;
pub(crate) const MUTEX_ID_VALUE_NOT_AVAIL: u32 = 0xff;
pub(crate) const fn mutex(idx: u32) -> u32 {
    0x0580 + idx * 4
}
pub(crate) const MUTEX_VALUE_INITIAL_LOCK: u32 = 0x00;

/// Aggregated holdoff request, one bit per holdoff engine.
pub(crate) const HOLDOFF_MASK: u32 = 0x0a78;
/// Holdoff entry acknowledge, one bit per holdoff engine.
pub(crate) const HOLDOFF_ENGAGED: u32 = 0x0a7c;
/// Engine idle status, one bit per holdoff engine (set = idle).
pub(crate) const HOLDOFF_ENG_IDLE: u32 = 0x0a80;
/// Holdoff interrupt enable, one bit per holdoff engine.
pub(crate) const HOLDOFF_INTR_EN: u32 = 0x0a84;

/// Pending PG interrupts for a PG controller.
pub(crate) const fn pg_intr_stat(ctrl: u32) -> u32 {
    0x06a0 + ctrl * 4
}
/// PG controller status.
pub(crate) const fn pg_stat(ctrl: u32) -> u32 {
    0x06c0 + ctrl * 4
}
pub(crate) const PG_STAT_IDLE_FLIPPED: u32 = 1 << 0;

/// Microcode mailbox driving the register-list restore.
pub(crate) const fn pg_restore_ctrl(ctrl: u32) -> u32 {
    0x06e0 + ctrl * 4
}
pub(crate) const PG_RESTORE_REQ: u32 = 1 << 0;
pub(crate) const PG_RESTORE_ACK: u32 = 1 << 16;

/// Priv blocker mode per blocker instance.
pub(crate) const fn priv_blocker_ctrl(idx: u32) -> u32 {
    0x0740 + idx * 4
}
pub(crate) const PRIV_BLOCKER_MODE_NONE: u32 = 0;
pub(crate) const PRIV_BLOCKER_MODE_BLOCK_ALL: u32 = 2;

// ---- BAR0: host / FIFO ----

/// Per-runlist scheduler disable (PBDMA-granular chips).
pub(crate) const FIFO_SCHED_DISABLE: u32 = 0x2630;

/// Channel/TSG preempt (PBDMA-granular chips).
pub(crate) const FIFO_PREEMPT: u32 = 0x2634;
pub(crate) const FIFO_PREEMPT_ID_MASK: u32 = 0xfff;
pub(crate) const FIFO_PREEMPT_PENDING: u32 = 1 << 20;
pub(crate) const FIFO_PREEMPT_TYPE_TSG: u32 = 1 << 24;

/// Stalling interrupt pending, one bit per PBDMA.
pub(crate) const FIFO_INTR_PBDMA_ID: u32 = 0x25a0;

pub(crate) const fn fifo_engine_status(eng: u32) -> u32 {
    0x2640 + eng * 8
}
pub(crate) const fn pbdma_status(pbdma: u32) -> u32 {
    0x3080 + pbdma * 4
}

/// Layout shared by PBDMA status and engine status words.
pub(crate) const CHAN_STATUS_ID_SHIFT: u32 = 0;
pub(crate) const CHAN_STATUS_ID_TYPE_TSG: u32 = 1 << 12;
pub(crate) const CHAN_STATUS_NEXT_ID_SHIFT: u32 = 16;
pub(crate) const CHAN_STATUS_NEXT_ID_TYPE_TSG: u32 = 1 << 28;
pub(crate) const CHAN_STATUS_ID_MASK: u32 = 0xfff;
pub(crate) const CHAN_STATUS_CTXSW_SHIFT: u32 = 13;
pub(crate) const CHAN_STATUS_CTXSW_MASK: u32 = 0x7;
pub(crate) const CHAN_STATUS_CTXSW_VALID: u32 = 1;
pub(crate) const CHAN_STATUS_CTXSW_LOAD: u32 = 5;
pub(crate) const CHAN_STATUS_CTXSW_SAVE: u32 = 6;
pub(crate) const CHAN_STATUS_CTXSW_SWITCH: u32 = 7;
/// PBDMA has seen a pending preempt request.
pub(crate) const PBDMA_STATUS_PREEMPT_SEEN: u32 = 1 << 31;

/// Runlist-relative registers (runlist-granular chips), offsets from the
/// runlist priv base.
pub(crate) const RL_SCHED_DISABLE: u32 = 0x094;
pub(crate) const RL_PREEMPT: u32 = 0x098;
pub(crate) const RL_PREEMPT_TYPE_RUNLIST: u32 = 1 << 24;
pub(crate) const RL_PREEMPT_PENDING: u32 = 1 << 20;
pub(crate) const RL_INTR_0: u32 = 0x100;
/// Stalling interrupt bits of `RL_INTR_0` for a runlist engine.
pub(crate) const fn rl_intr_engine_stall(rl_eng: u32) -> u32 {
    1 << (rl_eng * 4)
}
pub(crate) const fn rl_engine_status(rl_eng: u32) -> u32 {
    0x200 + rl_eng * 64
}
pub(crate) const RL_ENGINE_STATUS_BUSY: u32 = 1 << 0;
/// Runlist submit state: set while the runlist holds schedulable work.
pub(crate) const RL_SUBMIT_INFO: u32 = 0x08c;
pub(crate) const RL_SUBMIT_INFO_PENDING: u32 = 1 << 0;

/// Device info table row.
pub(crate) const fn device_info(row: u32) -> u32 {
    0x22700 + row * 4
}

// ---- BAR0: GR ----

pub(crate) const PMC_ENABLE: u32 = 0x0200;
pub(crate) const PMC_ENABLE_GR: u32 = 1 << 12;

pub(crate) const GR_STATUS: u32 = 0x400700;
/// Busy bits of the GR subunits that must quiesce after unbind.
pub(crate) const GR_STATUS_SUBUNITS_BUSY: u32 = 0x0000_ffff;

/// GR instance bind/unbind.
pub(crate) const MMU_BIND_IMB: u32 = 0x100cc0;
pub(crate) const MMU_BIND: u32 = 0x100cc4;
pub(crate) const MMU_BIND_TRIGGER: u32 = 1 << 31;
pub(crate) const MMU_BIND_IMB_UNBIND: u32 = 1 << 0;

// ---- BAR0: clocks ----

pub(crate) const THERM_GATE_CTRL_BASE: u32 = 0x20200;
pub(crate) const fn therm_gate_ctrl(eng: u32) -> u32 {
    THERM_GATE_CTRL_BASE + eng * 4
}
pub(crate) const GATE_CTRL_ENG_CLK_MASK: u32 = 0x3;
pub(crate) const GATE_CTRL_ENG_CLK_RUN: u32 = 0x0;
pub(crate) const GATE_CTRL_ENG_CLK_AUTO: u32 = 0x1;
pub(crate) const GATE_CTRL_ENG_PWR_MASK: u32 = 0x3 << 3;
pub(crate) const GATE_CTRL_ENG_PWR_ON: u32 = 0x2 << 3;
/// Blocking-clock-gating field touched by the gate-control workaround.
pub(crate) const GATE_CTRL_BLK_CLK_MASK: u32 = 0x3 << 16;
pub(crate) const GATE_CTRL_BLK_CLK_RUN: u32 = 0x0 << 16;

/// Domains selected through the SYS trim block, one bit each.
pub(crate) const TRIM_SYS_SEL_VCO: u32 = 0x137100;
/// Domains selected through the GPC broadcast trim block, one bit each.
pub(crate) const TRIM_GPC_BCAST_SEL_VCO: u32 = 0x132100;

/// ALT path clock gate for a domain.
pub(crate) const fn trim_alt_gate(dom: u32) -> u32 {
    0x137200 + dom * 0x20
}
pub(crate) const TRIM_ALT_GATE_GATED: u32 = 1 << 0;

/// Linear divider status for a domain.
pub(crate) const fn trim_ldiv_status(dom: u32) -> u32 {
    0x137204 + dom * 0x20
}
pub(crate) const TRIM_LDIV_STATUS_VCO: u32 = 1 << 0;

// ---- FECS ----

pub(crate) const FECS_METHOD_DATA: u32 = 0x409500;
pub(crate) const FECS_METHOD_PUSH: u32 = 0x409504;
pub(crate) const fn fecs_ctxsw_mailbox(idx: u32) -> u32 {
    0x409800 + idx * 4
}
