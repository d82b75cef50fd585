// SPDX-License-Identifier: MIT

//! Host-side HAL used by the unit tests.
//!
//! Registers behave as plain memory unless a test queues read values or
//! installs a write reaction. [`FakeHal::gpu`] installs reactions that make
//! the usual acknowledge bits come back immediately.

use crate::clkpath::ClkDomain;
use crate::hal::{Bus, RegisterPort, TaskControl, Timer};
use crate::pg::fecs;
use crate::regs;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

pub(crate) type Regs = HashMap<(Bus, u32), u32>;

type WriteReaction = Box<dyn Fn(&mut Regs, u32, u32)>;
type ReadHook = Box<dyn FnMut() -> u32>;

/// Runlist priv base used by the fake engine tables.
pub(crate) const FAKE_RL_BASE: u32 = 0x0008_0000;

pub(crate) struct FakeHal {
    regs: RefCell<Regs>,
    queued: RefCell<HashMap<(Bus, u32), VecDeque<u32>>>,
    read_hooks: RefCell<HashMap<(Bus, u32), ReadHook>>,
    reactions: RefCell<HashMap<(Bus, u32), WriteReaction>>,
    reads: RefCell<HashMap<(Bus, u32), u32>>,
    writes: RefCell<Vec<(Bus, u32, u32)>>,
    now: Cell<u64>,
    priority: Cell<u32>,
    priorities: RefCell<Vec<u32>>,
    overlays: RefCell<Vec<u32>>,
}

impl FakeHal {
    pub(crate) fn new() -> FakeHal {
        FakeHal {
            regs: RefCell::new(HashMap::new()),
            queued: RefCell::new(HashMap::new()),
            read_hooks: RefCell::new(HashMap::new()),
            reactions: RefCell::new(HashMap::new()),
            reads: RefCell::new(HashMap::new()),
            writes: RefCell::new(Vec::new()),
            now: Cell::new(0),
            priority: Cell::new(1),
            priorities: RefCell::new(Vec::new()),
            overlays: RefCell::new(Vec::new()),
        }
    }

    /// A fake with hardware that acknowledges every request right away.
    pub(crate) fn gpu() -> FakeHal {
        let hal = FakeHal::new();

        let token = Cell::new(0u32);
        hal.on_read(Bus::Csb, regs::MUTEX_ID, move || {
            token.set(token.get() % 0xfe + 1);
            token.get()
        });
        for idx in 0..8 {
            hal.on_write(Bus::Csb, regs::mutex(idx), move |r, old, new| {
                if old != regs::MUTEX_VALUE_INITIAL_LOCK && new != regs::MUTEX_VALUE_INITIAL_LOCK {
                    r.insert((Bus::Csb, regs::mutex(idx)), old);
                }
            });
        }

        hal.set(Bus::Csb, regs::HOLDOFF_ENG_IDLE, !0);
        hal.on_write(Bus::Csb, regs::HOLDOFF_MASK, |r, _, new| {
            r.insert((Bus::Csb, regs::HOLDOFF_ENGAGED), new);
        });

        hal.on_write(Bus::Bar0, regs::FIFO_PREEMPT, |r, _, new| {
            r.insert((Bus::Bar0, regs::FIFO_PREEMPT), new & !regs::FIFO_PREEMPT_PENDING);
            for pbdma in 0..16 {
                r.insert((Bus::Bar0, regs::pbdma_status(pbdma)), regs::PBDMA_STATUS_PREEMPT_SEEN);
            }
            for eng in 0..16 {
                r.insert((Bus::Bar0, regs::fifo_engine_status(eng)), 0);
            }
        });
        hal.on_write(Bus::Bar0, FAKE_RL_BASE + regs::RL_PREEMPT, |r, _, new| {
            r.insert(
                (Bus::Bar0, FAKE_RL_BASE + regs::RL_PREEMPT),
                new & !regs::RL_PREEMPT_PENDING,
            );
        });

        let sel_reaction = |sel_reg: u32| {
            move |r: &mut Regs, _: u32, new: u32| {
                for dom in ClkDomain::ALL {
                    let (reg, bit) = dom.sel_vco();
                    if reg == sel_reg {
                        let status = if new & bit != 0 { regs::TRIM_LDIV_STATUS_VCO } else { 0 };
                        r.insert((Bus::Bar0, regs::trim_ldiv_status(dom as u32)), status);
                    }
                }
            }
        };
        hal.on_write(Bus::Bar0, regs::TRIM_SYS_SEL_VCO, sel_reaction(regs::TRIM_SYS_SEL_VCO));
        hal.on_write(
            Bus::Bar0,
            regs::TRIM_GPC_BCAST_SEL_VCO,
            sel_reaction(regs::TRIM_GPC_BCAST_SEL_VCO),
        );

        for ctrl in 0..4 {
            hal.on_write(Bus::Csb, regs::pg_restore_ctrl(ctrl), move |r, _, new| {
                if new & regs::PG_RESTORE_REQ != 0 {
                    r.insert((Bus::Csb, regs::pg_restore_ctrl(ctrl)), regs::PG_RESTORE_ACK);
                }
            });
        }

        hal.on_write(Bus::Fecs, regs::FECS_METHOD_PUSH, |r, _, new| {
            if let Some(ack) = fecs::expected_ack(new) {
                for idx in 0..16 {
                    r.insert((Bus::Fecs, regs::fecs_ctxsw_mailbox(idx)), ack);
                }
            }
        });

        hal.on_write(Bus::Bar0, regs::MMU_BIND, |r, _, new| {
            r.insert((Bus::Bar0, regs::MMU_BIND), new & !regs::MMU_BIND_TRIGGER);
        });

        hal
    }

    pub(crate) fn set(&self, bus: Bus, addr: u32, val: u32) {
        self.regs.borrow_mut().insert((bus, addr), val);
    }

    pub(crate) fn get(&self, bus: Bus, addr: u32) -> u32 {
        self.regs.borrow().get(&(bus, addr)).copied().unwrap_or(0)
    }

    /// Values returned by the next reads of `addr`, before falling back to
    /// the register contents.
    pub(crate) fn queue(&self, bus: Bus, addr: u32, vals: &[u32]) {
        self.queued
            .borrow_mut()
            .entry((bus, addr))
            .or_default()
            .extend(vals.iter().copied());
    }

    pub(crate) fn on_read(&self, bus: Bus, addr: u32, f: impl FnMut() -> u32 + 'static) {
        self.read_hooks.borrow_mut().insert((bus, addr), Box::new(f));
    }

    /// Runs `f(regs, old, new)` after every write to `addr`. Replaces any
    /// reaction already installed there.
    pub(crate) fn on_write(&self, bus: Bus, addr: u32, f: impl Fn(&mut Regs, u32, u32) + 'static) {
        self.reactions.borrow_mut().insert((bus, addr), Box::new(f));
    }

    /// Drops the reaction on `addr`, leaving plain memory behavior.
    pub(crate) fn clear_reaction(&self, bus: Bus, addr: u32) {
        self.reactions.borrow_mut().remove(&(bus, addr));
    }

    pub(crate) fn read_count(&self, bus: Bus, addr: u32) -> u32 {
        self.reads.borrow().get(&(bus, addr)).copied().unwrap_or(0)
    }

    pub(crate) fn writes(&self) -> Vec<(Bus, u32, u32)> {
        self.writes.borrow().clone()
    }

    pub(crate) fn writes_to(&self, bus: Bus, addr: u32) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(b, a, _)| *b == bus && *a == addr)
            .map(|(_, _, v)| *v)
            .collect()
    }

    pub(crate) fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    pub(crate) fn priorities(&self) -> Vec<u32> {
        self.priorities.borrow().clone()
    }

    pub(crate) fn overlays(&self) -> Vec<u32> {
        self.overlays.borrow().clone()
    }
}

impl RegisterPort for FakeHal {
    fn read32(&self, bus: Bus, addr: u32) -> u32 {
        *self.reads.borrow_mut().entry((bus, addr)).or_default() += 1;
        if let Some(val) = self
            .queued
            .borrow_mut()
            .get_mut(&(bus, addr))
            .and_then(|q| q.pop_front())
        {
            return val;
        }
        if let Some(hook) = self.read_hooks.borrow_mut().get_mut(&(bus, addr)) {
            return hook();
        }
        self.get(bus, addr)
    }

    fn write32(&self, bus: Bus, addr: u32, val: u32) {
        self.writes.borrow_mut().push((bus, addr, val));
        let mut regs = self.regs.borrow_mut();
        let old = regs.insert((bus, addr), val).unwrap_or(0);
        if let Some(f) = self.reactions.borrow().get(&(bus, addr)) {
            f(&mut regs, old, val);
        }
    }
}

impl Timer for FakeHal {
    fn now_ns(&self) -> u64 {
        self.now.get()
    }

    fn delay_ns(&self, ns: u64) {
        self.now.set(self.now.get() + ns);
    }
}

impl TaskControl for FakeHal {
    fn priority(&self) -> u32 {
        self.priority.get()
    }

    fn set_priority(&self, priority: u32) {
        self.priorities.borrow_mut().push(priority);
        self.priority.set(priority);
    }

    fn overlay_attach(&self, id: u32) {
        self.overlays.borrow_mut().push(id);
    }

    fn overlay_detach(&self, id: u32) {
        let mut overlays = self.overlays.borrow_mut();
        if let Some(pos) = overlays.iter().position(|o| *o == id) {
            overlays.remove(pos);
        }
    }

    fn halt(&self) -> ! {
        panic!("firmware halted");
    }
}
