// SPDX-License-Identifier: MIT

//! Engine identifiers and the host/FIFO coordinates discovered for them.
//!
//! The table is filled once at init by walking the device info table and is
//! read-only afterwards.
//!
//! Device info rows are chained: bit 31 set means the next row belongs to
//! the same engine. Bits 1:0 give the row kind:
//!
//! - `1` engine type: type in 9:2, FIFO engine id in 17:10, holdoff bit in
//!   25:18.
//! - `2` runlist (PBDMA-granular chips): runlist in 7:2, PBDMA mask in 23:8.
//! - `3` runlist priv (runlist-granular chips): runlist in 7:2, runlist
//!   engine id in 11:8, 4K-aligned priv base in 30:12.

use crate::error::{Error, Result};
use crate::hal::{Bus, Hal};
use crate::hw::ChipConfig;
use crate::regs;
use log::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum EngineId {
    Gr = 0,
    Ce0 = 1,
    Ce1 = 2,
    Ce2 = 3,
    Nvdec = 4,
    Nvenc = 5,
    Nvjpg = 6,
    Sec2 = 7,
}

impl EngineId {
    pub const COUNT: usize = 8;

    /// Maps the device info engine type code.
    fn from_device_type(ty: u32) -> Option<EngineId> {
        Some(match ty {
            0x00 => EngineId::Gr,
            0x01 => EngineId::Ce0,
            0x02 => EngineId::Ce1,
            0x03 => EngineId::Ce2,
            0x10 => EngineId::Nvdec,
            0x11 => EngineId::Nvenc,
            0x12 => EngineId::Nvjpg,
            0x13 => EngineId::Sec2,
            _ => return None,
        })
    }
}

impl TryFrom<u32> for EngineId {
    type Error = Error;

    fn try_from(val: u32) -> Result<EngineId> {
        Ok(match val {
            0 => EngineId::Gr,
            1 => EngineId::Ce0,
            2 => EngineId::Ce1,
            3 => EngineId::Ce2,
            4 => EngineId::Nvdec,
            5 => EngineId::Nvenc,
            6 => EngineId::Nvjpg,
            7 => EngineId::Sec2,
            _ => return Err(Error::InvalidInput),
        })
    }
}

/// Host coordinates of one engine.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    /// Host scheduler engine id.
    pub fifo_engine: u32,
    pub runlist: u32,
    /// PBDMAs serving the engine (PBDMA-granular chips).
    pub pbdma_mask: u32,
    /// Runlist register block (runlist-granular chips).
    pub rl_priv_base: u32,
    /// Engine index within its runlist (runlist-granular chips).
    pub rl_engine_id: u32,
    /// Bit of this engine in the holdoff registers.
    pub holdoff_bit: u32,
}

impl EngineInfo {
    pub fn holdoff_mask(&self) -> u32 {
        1 << self.holdoff_bit
    }
}

const ROW_CHAIN: u32 = 1 << 31;
const ROW_KIND_MASK: u32 = 0x3;
const ROW_KIND_ENGINE_TYPE: u32 = 1;
const ROW_KIND_RUNLIST: u32 = 2;
const ROW_KIND_RL_PRIV: u32 = 3;

#[derive(Debug)]
pub struct EngineTable {
    entries: [Option<EngineInfo>; EngineId::COUNT],
}

impl EngineTable {
    pub const fn empty() -> EngineTable {
        EngineTable {
            entries: [None; EngineId::COUNT],
        }
    }

    /// Builds a table from already-known entries.
    pub fn from_entries(entries: &[(EngineId, EngineInfo)]) -> EngineTable {
        let mut table = EngineTable::empty();
        for (id, info) in entries {
            table.entries[*id as usize] = Some(*info);
        }
        table
    }

    /// Walks the device info table.
    pub fn scan<H: Hal + ?Sized>(hal: &H, cfg: &ChipConfig) -> EngineTable {
        let mut table = EngineTable::empty();
        let mut id: Option<EngineId> = None;
        let mut info = EngineInfo::default();
        let mut has_type = false;

        for row in 0..cfg.device_info_rows {
            let val = hal.read32(Bus::Bar0, regs::device_info(row));
            match val & ROW_KIND_MASK {
                ROW_KIND_ENGINE_TYPE => {
                    let ty = (val >> 2) & 0xff;
                    id = EngineId::from_device_type(ty);
                    if id.is_none() {
                        debug!("engine: skipping device type {:#x}", ty);
                    }
                    has_type = true;
                    info.fifo_engine = (val >> 10) & 0xff;
                    info.holdoff_bit = (val >> 18) & 0x1f;
                }
                ROW_KIND_RUNLIST => {
                    info.runlist = (val >> 2) & 0x3f;
                    info.pbdma_mask = (val >> 8) & 0xffff;
                }
                ROW_KIND_RL_PRIV => {
                    info.runlist = (val >> 2) & 0x3f;
                    info.rl_engine_id = (val >> 8) & 0xf;
                    info.rl_priv_base = val & 0x7fff_f000;
                }
                _ => {}
            }

            if val & ROW_CHAIN == 0 {
                if let Some(eng) = id.take() {
                    if table.entries[eng as usize].is_some() {
                        warn!("engine: duplicate {:?} in device info", eng);
                    } else {
                        debug!("engine: {:?} {:?}", eng, info);
                        table.entries[eng as usize] = Some(info);
                    }
                } else if has_type {
                    debug!("engine: dropping unknown entry at row {}", row);
                }
                info = EngineInfo::default();
                has_type = false;
            }
        }
        table
    }

    pub fn get(&self, id: EngineId) -> Result<&EngineInfo> {
        self.entries[id as usize].as_ref().ok_or(Error::InvalidInput)
    }

    pub fn contains(&self, id: EngineId) -> bool {
        self.entries[id as usize].is_some()
    }
}
