// SPDX-License-Identifier: MIT

//! Driver commands and the C entry points that feed them in.

use crate::clkpath::{ClkDomains, ClkPath};
use crate::elcg::ElcgReason;
use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    ElcgEnable(ElcgReason),
    ElcgDisable(ElcgReason),
    PgEnter,
    PgExit,
    ClkPowerDown(ClkDomains, ClkPath),
    ClkPowerUp(ClkDomains, ClkPath),
}

/// A request from the driver. `engine` is the ELCG index for ELCG actions
/// and an [`EngineId`](crate::engine::EngineId) for PG actions; clock
/// actions ignore it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Command {
    pub engine: u32,
    pub action: Action,
}

const ACTION_ELCG_ENABLE: u32 = 0;
const ACTION_ELCG_DISABLE: u32 = 1;
const ACTION_PG_ENTER: u32 = 2;
const ACTION_PG_EXIT: u32 = 3;
const ACTION_CLK_POWER_DOWN: u32 = 4;
const ACTION_CLK_POWER_UP: u32 = 5;

/// Checks an ELCG reason is the driver's own. The other reasons belong to
/// firmware clients and only they may set or clear them.
pub(crate) fn driver_elcg_reason(reason: ElcgReason) -> Result<ElcgReason> {
    if reason != ElcgReason::RPC {
        return Err(Error::InvalidInput);
    }
    Ok(reason)
}

impl TryFrom<u32> for ClkPath {
    type Error = Error;

    fn try_from(val: u32) -> Result<ClkPath> {
        Ok(match val {
            0 => ClkPath::Gated,
            1 => ClkPath::Alt,
            2 => ClkPath::Vco,
            3 => ClkPath::Original,
            _ => return Err(Error::InvalidInput),
        })
    }
}

impl Command {
    /// Builds a command from the fields the C side already decoded.
    pub fn from_raw(engine: u32, action: u32, arg0: u32, arg1: u32) -> Result<Command> {
        let reason = || {
            ElcgReason::from_bits(arg0)
                .ok_or(Error::InvalidInput)
                .and_then(driver_elcg_reason)
        };
        let clocks = || ClkDomains::from_bits(arg0).ok_or(Error::InvalidInput);

        let action = match action {
            ACTION_ELCG_ENABLE => Action::ElcgEnable(reason()?),
            ACTION_ELCG_DISABLE => Action::ElcgDisable(reason()?),
            ACTION_PG_ENTER => Action::PgEnter,
            ACTION_PG_EXIT => Action::PgExit,
            ACTION_CLK_POWER_DOWN => Action::ClkPowerDown(clocks()?, arg1.try_into()?),
            ACTION_CLK_POWER_UP => Action::ClkPowerUp(clocks()?, arg1.try_into()?),
            _ => return Err(Error::NotSupported),
        };
        Ok(Command { engine, action })
    }
}

#[cfg(not(test))]
mod ffi {
    use super::Command;
    use crate::error::{Error, Status};
    use crate::hal::FirmwareHal;
    use crate::print;
    use crate::PowerContext;
    use core::ptr::addr_of_mut;
    use cty::{c_int, c_uint};
    use log::LevelFilter;

    static mut CONTEXT: Option<PowerContext> = None;

    unsafe fn context() -> Option<&'static mut PowerContext> {
        unsafe { (*addr_of_mut!(CONTEXT)).as_mut() }
    }

    fn level(level: c_uint) -> LevelFilter {
        match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Sets up logging and the power context. Must run once, from the power
    /// task, before any other `lpwr_` call.
    #[no_mangle]
    pub unsafe extern "C" fn lpwr_init(chip_id: c_uint, log_level: c_uint) -> c_int {
        print::init(level(log_level));
        match PowerContext::new(&FirmwareHal, chip_id) {
            Ok(ctx) => {
                unsafe { *addr_of_mut!(CONTEXT) = Some(ctx) };
                Status::Ok.into()
            }
            Err(e) => Status::from(e).into(),
        }
    }

    #[no_mangle]
    pub unsafe extern "C" fn lpwr_command(
        engine: c_uint,
        action: c_uint,
        arg0: c_uint,
        arg1: c_uint,
    ) -> c_int {
        let Some(ctx) = (unsafe { context() }) else {
            return Status::from(Error::NotSupported).into();
        };
        match Command::from_raw(engine, action, arg0, arg1) {
            Ok(cmd) => ctx.dispatch(&FirmwareHal, cmd).into(),
            Err(e) => Status::from(e).into(),
        }
    }

    /// Called from the event path when work is queued for `engine`.
    #[no_mangle]
    pub unsafe extern "C" fn lpwr_notify_wakeup(engine: c_uint) -> c_int {
        let Some(ctx) = (unsafe { context() }) else {
            return Status::from(Error::NotSupported).into();
        };
        Status::from(ctx.notify_wakeup(engine)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        assert_eq!(
            Command::from_raw(0, ACTION_PG_ENTER, 0, 0),
            Ok(Command {
                engine: 0,
                action: Action::PgEnter
            })
        );
        assert_eq!(
            Command::from_raw(3, ACTION_ELCG_DISABLE, ElcgReason::RPC.bits(), 0).map(|c| c.action),
            Ok(Action::ElcgDisable(ElcgReason::RPC))
        );
        assert_eq!(
            Command::from_raw(0, ACTION_CLK_POWER_UP, 0b101, 3).map(|c| c.action),
            Ok(Action::ClkPowerUp(ClkDomains::GPC | ClkDomains::SYS, ClkPath::Original))
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(Command::from_raw(0, 99, 0, 0), Err(Error::NotSupported));
        assert_eq!(
            Command::from_raw(0, ACTION_ELCG_ENABLE, 1 << 30, 0),
            Err(Error::InvalidInput)
        );
        for reason in [ElcgReason::GR_PG, ElcgReason::DI, ElcgReason::RPC | ElcgReason::MS] {
            assert_eq!(
                Command::from_raw(0, ACTION_ELCG_ENABLE, reason.bits(), 0),
                Err(Error::InvalidInput)
            );
        }
        assert_eq!(
            Command::from_raw(0, ACTION_CLK_POWER_DOWN, 0b1, 7),
            Err(Error::InvalidInput)
        );
        assert_eq!(
            Command::from_raw(0, ACTION_CLK_POWER_DOWN, 1 << 9, 0),
            Err(Error::InvalidInput)
        );
    }
}
