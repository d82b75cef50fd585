// SPDX-License-Identifier: MIT

//! FECS global state handshake.
//!
//! A method and its data are pushed to FECS; it answers by writing a fixed
//! value to one of its context-switch mailboxes.

use crate::error::Result;
use crate::hal::{Bus, Hal};
use crate::poll::{poll_until, FECS_MAILBOX_TIMEOUT_NS, POLL_INTERVAL_NS};
use crate::regs;
use log::{debug, warn};

pub(crate) const METHOD_GLOBAL_STATE_SAVE: u32 = 0x38;
pub(crate) const METHOD_GLOBAL_STATE_RESTORE: u32 = 0x39;

const MAILBOX_CLEAR: u32 = 0;
const MAILBOX_SAVE_DONE: u32 = 0x1;
const MAILBOX_RESTORE_DONE: u32 = 0x2;

/// Mailbox value FECS reports once `method` completed.
pub(crate) fn expected_ack(method: u32) -> Option<u32> {
    match method {
        METHOD_GLOBAL_STATE_SAVE => Some(MAILBOX_SAVE_DONE),
        METHOD_GLOBAL_STATE_RESTORE => Some(MAILBOX_RESTORE_DONE),
        _ => None,
    }
}

fn handshake<H: Hal + ?Sized>(hal: &H, mailbox: u32, method: u32, data: u32) -> Result {
    let ack = expected_ack(method).ok_or(crate::Error::InvalidInput)?;
    let mbox = regs::fecs_ctxsw_mailbox(mailbox);

    hal.write32(Bus::Fecs, mbox, MAILBOX_CLEAR);
    hal.write32(Bus::Fecs, regs::FECS_METHOD_DATA, data);
    hal.write32(Bus::Fecs, regs::FECS_METHOD_PUSH, method);

    poll_until(hal, FECS_MAILBOX_TIMEOUT_NS, POLL_INTERVAL_NS, || {
        (hal.read32(Bus::Fecs, mbox) == ack).then_some(())
    })
    .inspect_err(|_| {
        warn!(
            "fecs: method {:#x} not acked, mailbox {:#x}",
            method,
            hal.read32(Bus::Fecs, mbox)
        )
    })?;
    debug!("fecs: method {:#x} done", method);
    Ok(())
}

pub(crate) fn global_state_save<H: Hal + ?Sized>(hal: &H, mailbox: u32) -> Result {
    handshake(hal, mailbox, METHOD_GLOBAL_STATE_SAVE, 0)
}

pub(crate) fn global_state_restore<H: Hal + ?Sized>(hal: &H, mailbox: u32) -> Result {
    handshake(hal, mailbox, METHOD_GLOBAL_STATE_RESTORE, 0)
}
