// SPDX-License-Identifier: MIT

//! Interfaces to the services the C firmware provides: register buses, the
//! timer and the RTOS task controls.

/// Register address spaces reachable from the PMU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Bus {
    /// Privileged space behind the FECS falcon.
    Fecs,
    /// PMU-local CSB space.
    Csb,
    /// General BAR0 space.
    Bar0,
}

pub trait RegisterPort {
    fn read32(&self, bus: Bus, addr: u32) -> u32;
    fn write32(&self, bus: Bus, addr: u32, val: u32);

    /// Read-modify-write. Returns the value written.
    fn rmw32(&self, bus: Bus, addr: u32, clear: u32, set: u32) -> u32 {
        let val = (self.read32(bus, addr) & !clear) | set;
        self.write32(bus, addr, val);
        val
    }
}

pub trait Timer {
    /// Monotonic time in nanoseconds.
    fn now_ns(&self) -> u64;
    /// Busy-waits for at least `ns` nanoseconds.
    fn delay_ns(&self, ns: u64);
}

pub trait TaskControl {
    fn priority(&self) -> u32;
    fn set_priority(&self, priority: u32);
    /// Makes the transient code resource `id` resident.
    fn overlay_attach(&self, id: u32);
    fn overlay_detach(&self, id: u32);
    /// Stops the firmware. Never returns.
    fn halt(&self) -> !;
}

pub trait Hal: RegisterPort + Timer + TaskControl {}

impl<T: RegisterPort + Timer + TaskControl> Hal for T {}

#[cfg(not(test))]
pub use self::firmware::FirmwareHal;

#[cfg(not(test))]
mod firmware {
    use super::*;
    use cty::{c_uint, c_ulonglong};

    extern "C" {
        fn pmu_fecs_read32(addr: c_uint) -> c_uint;
        fn pmu_fecs_write32(addr: c_uint, val: c_uint);
        fn pmu_csb_read32(addr: c_uint) -> c_uint;
        fn pmu_csb_write32(addr: c_uint, val: c_uint);
        fn pmu_bar0_read32(addr: c_uint) -> c_uint;
        fn pmu_bar0_write32(addr: c_uint, val: c_uint);
        fn pmu_timer_ns() -> c_ulonglong;
        fn pmu_delay_ns(ns: c_ulonglong);
        fn pmu_task_priority_get() -> c_uint;
        fn pmu_task_priority_set(priority: c_uint);
        fn pmu_overlay_attach(id: c_uint);
        fn pmu_overlay_detach(id: c_uint);
        fn pmu_halt() -> !;
    }

    /// The HAL backed by the C firmware's bus and RTOS primitives.
    pub struct FirmwareHal;

    impl RegisterPort for FirmwareHal {
        fn read32(&self, bus: Bus, addr: u32) -> u32 {
            unsafe {
                match bus {
                    Bus::Fecs => pmu_fecs_read32(addr),
                    Bus::Csb => pmu_csb_read32(addr),
                    Bus::Bar0 => pmu_bar0_read32(addr),
                }
            }
        }

        fn write32(&self, bus: Bus, addr: u32, val: u32) {
            unsafe {
                match bus {
                    Bus::Fecs => pmu_fecs_write32(addr, val),
                    Bus::Csb => pmu_csb_write32(addr, val),
                    Bus::Bar0 => pmu_bar0_write32(addr, val),
                }
            }
        }
    }

    impl Timer for FirmwareHal {
        fn now_ns(&self) -> u64 {
            unsafe { pmu_timer_ns() }
        }

        fn delay_ns(&self, ns: u64) {
            unsafe { pmu_delay_ns(ns) }
        }
    }

    impl TaskControl for FirmwareHal {
        fn priority(&self) -> u32 {
            unsafe { pmu_task_priority_get() }
        }

        fn set_priority(&self, priority: u32) {
            unsafe { pmu_task_priority_set(priority) }
        }

        fn overlay_attach(&self, id: u32) {
            unsafe { pmu_overlay_attach(id) }
        }

        fn overlay_detach(&self, id: u32) {
            unsafe { pmu_overlay_detach(id) }
        }

        fn halt(&self) -> ! {
            unsafe { pmu_halt() }
        }
    }
}
