// SPDX-License-Identifier: MIT

//! Bounded polling against live hardware state.

use crate::error::{Error, Result};
use crate::hal::Timer;

/// Preempt-pending clear, both channel/TSG and runlist preempts.
pub const PREEMPT_PENDING_TIMEOUT_NS: u64 = 1_000_000;
/// PBDMA observing a channel/TSG preempt request.
pub const PBDMA_PREEMPT_ACK_TIMEOUT_NS: u64 = 50_000;
/// Holdoff entry acknowledge.
pub const HOLDOFF_ENGAGE_TIMEOUT_NS: u64 = 50_000;
/// Linear divider reflecting an ALT/VCO switch.
pub const CLK_SWITCH_TIMEOUT_NS: u64 = 10_000;
/// FECS global-state mailbox handshake.
pub const FECS_MAILBOX_TIMEOUT_NS: u64 = 100_000;
/// Register-list restore acknowledge.
pub const RESTORE_ACK_TIMEOUT_NS: u64 = 2_000_000;
/// GR instance unbind completion.
pub const UNBIND_TIMEOUT_NS: u64 = 500_000;
/// GR subunits going idle after unbind.
pub const SUBUNIT_IDLE_TIMEOUT_NS: u64 = 1_000_000;
/// Cooperative hardware mutex claim.
pub const MUTEX_ACQUIRE_TIMEOUT_NS: u64 = 100_000;

/// Default spacing between two polls.
pub const POLL_INTERVAL_NS: u64 = 1_000;
/// Tight spacing for the short clock and holdoff polls.
pub const FAST_POLL_INTERVAL_NS: u64 = 100;

/// Channel/TSG id resolution attempts against PBDMA or engine status.
pub const MAX_RESOLVE_ATTEMPTS: u32 = 10;

/// Evaluates `f` until it yields a value or `timeout_ns` has elapsed.
///
/// `f` is always evaluated at least once, and once more after the deadline
/// passes, so a value that shows up during the last delay is not lost.
pub fn poll_until<T, H, F>(hal: &H, timeout_ns: u64, interval_ns: u64, mut f: F) -> Result<T>
where
    H: Timer + ?Sized,
    F: FnMut() -> Option<T>,
{
    let start = hal.now_ns();
    loop {
        if let Some(val) = f() {
            return Ok(val);
        }
        if hal.now_ns().saturating_sub(start) >= timeout_ns {
            return f().ok_or(Error::Timeout);
        }
        hal.delay_ns(interval_ns);
    }
}

/// Reads until two consecutive reads agree.
///
/// Performs at most `max_attempts` reads; `RetryExhausted` if none of the
/// consecutive pairs matched.
pub fn retry_until_stable<T, F>(max_attempts: u32, mut read: F) -> Result<T>
where
    T: PartialEq,
    F: FnMut() -> T,
{
    if max_attempts == 0 {
        return Err(Error::RetryExhausted);
    }
    let mut prev = read();
    for _ in 1..max_attempts {
        let cur = read();
        if cur == prev {
            return Ok(cur);
        }
        prev = cur;
    }
    Err(Error::RetryExhausted)
}
