// SPDX-License-Identifier: MIT

//! Error and status types shared by every sequencing component.

use core::fmt;

/// Recoverable failures. Fatal conditions never show up here, they go
/// through [`fatal!`](crate::fatal) and halt the firmware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bounded poll did not observe the expected hardware value.
    Timeout,
    /// A resolve loop did not converge within its attempt budget.
    RetryExhausted,
    /// Caller supplied an id outside the valid range.
    InvalidInput,
    /// Feature absent on this chip, or an id this build does not know.
    NotSupported,
    /// Hardware is legitimately not ready (pending interrupt, new work,
    /// contended mutex).
    Busy,
}

pub type Result<T = ()> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::Timeout => "timeout",
            Error::RetryExhausted => "retry exhausted",
            Error::InvalidInput => "invalid input",
            Error::NotSupported => "not supported",
            Error::Busy => "busy",
        };
        f.write_str(s)
    }
}

/// Status code returned across the C boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Timeout = -1,
    RetryExhausted = -2,
    InvalidInput = -3,
    NotSupported = -4,
    Busy = -5,
}

impl From<Error> for Status {
    fn from(err: Error) -> Status {
        match err {
            Error::Timeout => Status::Timeout,
            Error::RetryExhausted => Status::RetryExhausted,
            Error::InvalidInput => Status::InvalidInput,
            Error::NotSupported => Status::NotSupported,
            Error::Busy => Status::Busy,
        }
    }
}

impl From<Result> for Status {
    fn from(res: Result) -> Status {
        match res {
            Ok(()) => Status::Ok,
            Err(e) => e.into(),
        }
    }
}

impl From<Status> for cty::c_int {
    fn from(status: Status) -> cty::c_int {
        status as cty::c_int
    }
}

/// Logs and halts. Used where the hardware is in a state with no safe
/// rollback, so nothing is unwound.
#[macro_export]
macro_rules! fatal {
    ($hal:expr, $($arg:tt)*) => {{
        log::error!($($arg)*);
        $crate::hal::TaskControl::halt($hal)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(Status::from(Ok(())), Status::Ok);
        assert_eq!(Status::from(Err(Error::Timeout)), Status::Timeout);
        assert_eq!(cty::c_int::from(Status::Busy), -5);
        assert_eq!(cty::c_int::from(Status::from(Error::NotSupported)), -4);
    }
}
