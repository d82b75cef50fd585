// SPDX-License-Identifier: MIT

//! Scoped RTOS disciplines: priority boosts and the cooperative hardware
//! mutexes shared with the driver.

use crate::error::{Error, Result};
use crate::hal::{Bus, Hal, TaskControl};
use crate::poll::{poll_until, MUTEX_ACQUIRE_TIMEOUT_NS, POLL_INTERVAL_NS};
use crate::regs;
use log::{debug, warn};

/// Keeps the current task above `floor` until dropped.
pub struct PriorityBoost<'a, H: TaskControl + ?Sized> {
    hal: &'a H,
    prev: Option<u32>,
}

impl<'a, H: TaskControl + ?Sized> PriorityBoost<'a, H> {
    /// Raises the calling task to `floor + 1` unless it already runs above
    /// `floor`.
    pub fn above(hal: &'a H, floor: u32) -> PriorityBoost<'a, H> {
        let cur = hal.priority();
        let prev = if cur <= floor {
            hal.set_priority(floor + 1);
            Some(cur)
        } else {
            None
        };
        PriorityBoost { hal, prev }
    }
}

impl<H: TaskControl + ?Sized> Drop for PriorityBoost<'_, H> {
    fn drop(&mut self) {
        if let Some(prev) = self.prev {
            self.hal.set_priority(prev);
        }
    }
}

/// Hardware mutexes. The acquisition order is `Fifo` before `Gr`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum MutexId {
    Fifo = 0,
    Gr = 1,
}

/// A held hardware mutex, released on drop.
pub struct MutexGuard<'a, H: Hal + ?Sized> {
    hal: &'a H,
    id: MutexId,
    token: u32,
}

impl<H: Hal + ?Sized> core::fmt::Debug for MutexGuard<'_, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutexGuard")
            .field("id", &self.id)
            .field("token", &self.token)
            .finish()
    }
}

impl<'a, H: Hal + ?Sized> MutexGuard<'a, H> {
    /// Claims `id`, retrying until another owner lets go or the acquire
    /// timeout expires.
    pub fn acquire(hal: &'a H, id: MutexId) -> Result<MutexGuard<'a, H>> {
        let token = hal.read32(Bus::Csb, regs::MUTEX_ID) & 0xff;
        if token == regs::MUTEX_ID_VALUE_INIT || token == regs::MUTEX_ID_VALUE_NOT_AVAIL {
            warn!("mutex: no token available for {:?}", id);
            return Err(Error::Busy);
        }

        let addr = regs::mutex(id as u32);
        let res = poll_until(hal, MUTEX_ACQUIRE_TIMEOUT_NS, POLL_INTERVAL_NS, || {
            hal.write32(Bus::Csb, addr, token);
            (hal.read32(Bus::Csb, addr) == token).then_some(())
        });
        if let Err(e) = res {
            hal.write32(Bus::Csb, regs::MUTEX_ID_RELEASE, token);
            warn!("mutex: {:?} held by {:#x}", id, hal.read32(Bus::Csb, addr));
            return Err(e);
        }

        debug!("mutex: {:?} acquired, token {:#x}", id, token);
        Ok(MutexGuard { hal, id, token })
    }

    pub fn id(&self) -> MutexId {
        self.id
    }
}

impl<H: Hal + ?Sized> Drop for MutexGuard<'_, H> {
    fn drop(&mut self) {
        let addr = regs::mutex(self.id as u32);
        if self.hal.read32(Bus::Csb, addr) == self.token {
            self.hal.write32(Bus::Csb, addr, regs::MUTEX_VALUE_INITIAL_LOCK);
        }
        self.hal.write32(Bus::Csb, regs::MUTEX_ID_RELEASE, self.token);
        debug!("mutex: {:?} released", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHal;

    #[test]
    fn boost_restores_priority() {
        let hal = FakeHal::new();
        hal.set_priority(2);
        {
            let _boost = PriorityBoost::above(&hal, 3);
            assert_eq!(hal.priority(), 4);
        }
        assert_eq!(hal.priority(), 2);
        assert_eq!(hal.priorities(), [2, 4, 2]);
    }

    #[test]
    fn boost_is_noop_when_already_above() {
        let hal = FakeHal::new();
        hal.set_priority(6);
        drop(PriorityBoost::above(&hal, 3));
        assert_eq!(hal.priorities(), [6]);
    }

    #[test]
    fn mutex_released_on_drop() {
        let hal = FakeHal::gpu();
        {
            let guard = MutexGuard::acquire(&hal, MutexId::Gr).unwrap();
            assert_eq!(hal.get(Bus::Csb, regs::mutex(1)), guard.token);
        }
        assert_eq!(hal.get(Bus::Csb, regs::mutex(1)), regs::MUTEX_VALUE_INITIAL_LOCK);
        assert_eq!(hal.writes_to(Bus::Csb, regs::MUTEX_ID_RELEASE).len(), 1);
    }

    #[test]
    fn contended_mutex_times_out() {
        let hal = FakeHal::gpu();
        hal.set(Bus::Csb, regs::mutex(0), 0x42);
        assert_eq!(
            MutexGuard::acquire(&hal, MutexId::Fifo).err(),
            Some(Error::Timeout)
        );
        assert_eq!(hal.get(Bus::Csb, regs::mutex(0)), 0x42);
        assert_eq!(hal.writes_to(Bus::Csb, regs::MUTEX_ID_RELEASE).len(), 1);
    }

    #[test]
    fn no_token_is_busy() {
        let hal = FakeHal::new();
        hal.set(Bus::Csb, regs::MUTEX_ID, regs::MUTEX_ID_VALUE_NOT_AVAIL);
        assert_eq!(
            MutexGuard::acquire(&hal, MutexId::Fifo).err(),
            Some(Error::Busy)
        );
    }
}
