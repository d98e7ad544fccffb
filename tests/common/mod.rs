// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side board for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use snode::hw::{
    AnalogInputs, Board, BufferBank, CanBuffers, Flash, FlowControl, NvmError, Page, Parts,
    PowerMonitor, PowerSample, ResetFlags, ServoOutput, System, PAGE_WORDS,
};
use snode::protocol::id::CanId;
use snode::protocol::messages::{payload_from_bytes, payload_to_bytes};
use snode::protocol::{NodeId, Receive, Transmit};
use snode::Node;

/// Ordered record of flash and flow-control calls, shared between the mocks.
pub type EventLog = Rc<RefCell<Vec<&'static str>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Page of RAM standing in for the configuration flash.
pub struct RamFlash {
    pub page: Page,
    pub fail_erase: Option<u16>,
    pub fail_program: Option<u16>,
    pub erases: usize,
    pub programs: usize,
    log: EventLog,
}

impl RamFlash {
    pub fn blank(log: EventLog) -> Self {
        Self {
            page: [0xFFFF; PAGE_WORDS],
            fail_erase: None,
            fail_program: None,
            erases: 0,
            programs: 0,
            log,
        }
    }
}

impl Flash for RamFlash {
    fn read_page(&self, _address: u32, page: &mut Page) {
        *page = self.page;
    }

    fn erase_page(&mut self, _address: u32) -> Result<(), NvmError> {
        self.log.borrow_mut().push("erase");
        self.erases += 1;
        if let Some(bits) = self.fail_erase {
            return Err(NvmError::Erase(bits));
        }
        self.page = [0xFFFF; PAGE_WORDS];
        Ok(())
    }

    fn program_page(&mut self, _address: u32, page: &Page) -> Result<(), NvmError> {
        self.log.borrow_mut().push("program");
        self.programs += 1;
        if let Some(bits) = self.fail_program {
            return Err(NvmError::Program(bits));
        }
        self.page = *page;
        Ok(())
    }
}

pub struct MockSystem {
    pub flags: ResetFlags,
    pub serial: u32,
    pub feeds: usize,
    pub delays: Vec<u32>,
    pub resets: usize,
    log: EventLog,
}

impl MockSystem {
    pub fn new(log: EventLog) -> Self {
        Self {
            flags: ResetFlags::default(),
            serial: 0xDEAD_BEEF,
            feeds: 0,
            delays: Vec::new(),
            resets: 0,
            log,
        }
    }
}

impl FlowControl for MockSystem {
    fn disable_interrupts(&mut self) {
        self.log.borrow_mut().push("disable_interrupts");
    }

    fn enable_interrupts(&mut self) {
        self.log.borrow_mut().push("enable_interrupts");
    }

    fn stop_tick(&mut self) {
        self.log.borrow_mut().push("stop_tick");
    }

    fn start_tick(&mut self) {
        self.log.borrow_mut().push("start_tick");
    }

    fn suspend_watchdog(&mut self) {
        self.log.borrow_mut().push("suspend_watchdog");
    }

    fn resume_watchdog(&mut self) {
        self.log.borrow_mut().push("resume_watchdog");
    }
}

impl System for MockSystem {
    fn feed_watchdog(&mut self) {
        self.feeds += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn reset_flags(&mut self) -> ResetFlags {
        self.flags
    }

    fn serial_number(&self) -> u32 {
        self.serial
    }
}

#[derive(Default)]
pub struct MockServo {
    pub pulses: Vec<u16>,
}

impl ServoOutput for MockServo {
    fn set_pulse_us(&mut self, pulse_us: u16) {
        self.pulses.push(pulse_us);
    }
}

#[derive(Default)]
pub struct MockPower {
    pub sample: PowerSample,
}

impl PowerMonitor for MockPower {
    fn sample(&mut self) -> PowerSample {
        self.sample
    }
}

#[derive(Default)]
pub struct MockAnalog {
    pub raw: [u16; 2],
}

impl AnalogInputs for MockAnalog {
    fn vsense(&mut self) -> [u16; 2] {
        self.raw
    }
}

pub struct MockBoard;

impl Board for MockBoard {
    type Can = BufferBank;
    type Flash = RamFlash;
    type System = MockSystem;
    type Servo = MockServo;
    type Power = MockPower;
    type Analog = MockAnalog;
}

pub struct Harness {
    pub node: Node<MockBoard>,
    pub log: EventLog,
}

/// Node on a blank configuration page.
pub fn boot() -> Harness {
    boot_with(|_, _| {})
}

/// Node brought up after `setup` has adjusted the flash and system mocks.
pub fn boot_with(setup: impl FnOnce(&mut RamFlash, &mut MockSystem)) -> Harness {
    let log = event_log();
    let mut flash = RamFlash::blank(log.clone());
    let mut system = MockSystem::new(log.clone());
    setup(&mut flash, &mut system);

    let parts = Parts::<MockBoard> {
        can: BufferBank::new(),
        flash,
        system,
        servo: MockServo::default(),
        power: MockPower::default(),
        analog: MockAnalog::default(),
    };
    Harness {
        node: Node::new(parts),
        log,
    }
}

/// A frame taken off the transmit side of the bank.
#[derive(Debug)]
pub struct Sent<M> {
    pub id: CanId,
    pub len: usize,
    pub msg: M,
}

/// Deliver `msg` as sent by the FMU to node `dest`. Returns the buffer it landed in.
pub fn deliver<M: Receive>(bank: &mut BufferBank, dest: NodeId, msg: &M) -> Option<u8> {
    let raw = M::KIND.accepted_id(dest).to_raw();
    bank.deliver(raw, &payload_to_bytes(&msg.to_payload()))
}

/// Take a pending `M` off its transmit buffer, as the controller would.
pub fn take<M: Transmit>(bank: &mut BufferBank) -> Option<Sent<M>> {
    let index = M::KIND.descriptor().buffer;
    if !bank.tx_requested(index) {
        return None;
    }
    let frame = bank.tx_frame(index)?;
    bank.ack_tx(index);

    let bxcan::Id::Extended(id) = frame.id() else {
        panic!("standard id on buffer {index}");
    };
    let data = frame.data().map(|d| d.to_vec()).unwrap_or_default();
    Some(Sent {
        id: CanId::from(id),
        len: data.len(),
        msg: M::from_payload(&payload_from_bytes(&data)),
    })
}

/// Acknowledge every pending transmit buffer and return them in the order the controller would
/// send them.
pub fn drain(bank: &mut BufferBank) -> Vec<u8> {
    let mut order = Vec::new();
    while let Some(index) = bank.next_tx() {
        bank.ack_tx(index);
        order.push(index);
    }
    order
}
