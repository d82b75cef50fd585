// SPDX-License-Identifier: MIT
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

//! Engine power-gating and clock-gating sequencer for the GPU power
//! management microcontroller.
//!
//! The C side of the firmware owns the RTOS, the register bus primitives and
//! the driver command decoding. This crate owns the sequencing: holdoff,
//! ELCG, clock paths, FIFO preemption and the GR power-gate save/restore
//! state machine.

pub mod clkpath;
pub mod cmd;
pub mod context;
pub mod elcg;
pub mod engine;
pub mod error;
pub mod fifo;
pub mod hal;
pub mod holdoff;
pub mod hw;
pub mod pg;
pub mod poll;
pub mod print;
pub mod regs;
pub mod rtos;

#[cfg(test)]
pub(crate) mod fake;

pub use context::PowerContext;
pub use error::{Error, Result, Status};

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &::core::panic::PanicInfo) -> ! {
    println!("{}", info);
    hal::TaskControl::halt(&hal::FirmwareHal)
}
