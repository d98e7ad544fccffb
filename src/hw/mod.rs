// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Hardware Interfaces
//!
//! The node logic talks to the MCU only through the traits in this module. The message buffer
//! bank in [`bank`] is plain memory and is shared by the firmware and the host tests; everything
//! else with an STM32F7 implementation is behind the `stm32f7` feature.
//!
//! | Trait | STM32F7 implementation |
//! | ----- | ---------------------- |
//! | [`CanBuffers`] | [`can::CanBus`] (bxcan + [`BufferBank`]) |
//! | [`Flash`] | [`flash::SectorFlash`] |
//! | [`System`] | [`system::Platform`] |
//! | [`ServoOutput`] | [`pwm::ServoPwm`] |
//! | [`AnalogInputs`] | [`adc::VsenseAdc`] |
//! | [`PowerMonitor`] | [`crate::drivers::Ina219`] |

use crate::protocol::catalog::TxPriority;

pub mod bank;

#[cfg(feature = "stm32f7")]
pub mod adc;
#[cfg(feature = "stm32f7")]
pub mod can;
#[cfg(feature = "stm32f7")]
pub mod flash;
#[cfg(feature = "stm32f7")]
pub mod pins;
#[cfg(feature = "stm32f7")]
pub mod pwm;
#[cfg(feature = "stm32f7")]
pub mod system;

pub use bank::BufferBank;

// -------------------------------------------------------------------------------------------------
// Message buffers
// -------------------------------------------------------------------------------------------------

/// Number of message buffers.
pub const BUFFER_COUNT: usize = 16;

/// 16-bit words per message buffer: three header words followed by the payload.
pub const BUFFER_WORDS: usize = 8;

/// Memory of one message buffer.
pub type Buffer = [u16; BUFFER_WORDS];

/// Per-buffer control of a message buffer peripheral.
///
/// Buffers are numbered `0..BUFFER_COUNT`. A transmit buffer is handed to the bus by setting its
/// request flag; the bus clears the flag once the frame has left. A receive buffer's full flag is
/// set by the bus when an accepted frame lands in it and cleared by software after the payload
/// has been copied out.
pub trait CanBuffers {
    fn buffer(&self, index: u8) -> &Buffer;
    fn buffer_mut(&mut self, index: u8) -> &mut Buffer;

    fn tx_requested(&self, index: u8) -> bool;
    fn request_tx(&mut self, index: u8);
    fn set_tx_priority(&mut self, index: u8, priority: TxPriority);

    fn rx_full(&self, index: u8) -> bool;
    fn release_rx(&mut self, index: u8);

    /// Route extended frames with `raw_id & mask == accept & mask` into buffer `index`.
    fn set_filter(&mut self, index: u8, accept: u32, mask: u32);
}

// -------------------------------------------------------------------------------------------------
// Non-volatile memory
// -------------------------------------------------------------------------------------------------

/// 16-bit words per configuration page.
pub const PAGE_WORDS: usize = 512;

/// Contents of one configuration page.
pub type Page = [u16; PAGE_WORDS];

/// Flash erase/program failure.
///
/// Erase and program faults carry the raw status bits read back from the flash controller.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NvmError {
    Erase(u16),
    Program(u16),
    /// Programmed data did not read back as written.
    Verify,
}

impl NvmError {
    /// Status word relayed to the requester.
    pub fn detail(&self) -> u16 {
        match *self {
            NvmError::Erase(bits) | NvmError::Program(bits) => bits,
            NvmError::Verify => 0xFFFF,
        }
    }
}

/// Page-granular non-volatile storage.
pub trait Flash {
    fn read_page(&self, address: u32, page: &mut Page);
    fn erase_page(&mut self, address: u32) -> Result<(), NvmError>;
    fn program_page(&mut self, address: u32, page: &Page) -> Result<(), NvmError>;
}

// -------------------------------------------------------------------------------------------------
// System services
// -------------------------------------------------------------------------------------------------

/// Controls that must be held off while the CPU stalls on flash.
pub trait FlowControl {
    fn disable_interrupts(&mut self);
    fn enable_interrupts(&mut self);
    fn stop_tick(&mut self);
    fn start_tick(&mut self);
    fn suspend_watchdog(&mut self);
    fn resume_watchdog(&mut self);
}

/// Scoped stall: interrupts masked, periodic tick stopped and watchdog service suspended for as
/// long as the guard lives. All three are re-armed in reverse order when it drops.
pub struct Stall<'a, F: FlowControl + ?Sized> {
    flow: &'a mut F,
}

impl<'a, F: FlowControl + ?Sized> Stall<'a, F> {
    pub fn new(flow: &'a mut F) -> Self {
        flow.suspend_watchdog();
        flow.stop_tick();
        flow.disable_interrupts();
        Self { flow }
    }
}

impl<F: FlowControl + ?Sized> Drop for Stall<'_, F> {
    fn drop(&mut self) {
        self.flow.enable_interrupts();
        self.flow.start_tick();
        self.flow.resume_watchdog();
    }
}

/// Reset flags latched by the MCU at the last reset.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetFlags {
    pub power_on: bool,
    pub brown_out: bool,
    pub software: bool,
    /// Watchdog timeout, lockup or other software fault.
    pub fault: bool,
    pub pin: bool,
    /// Raw flag bits as read from the reset controller.
    pub raw: u16,
}

/// Platform services used by the executive.
pub trait System: FlowControl {
    fn feed_watchdog(&mut self);
    fn delay_ms(&mut self, ms: u32);
    /// Request a device reset. On hardware this does not return.
    fn reset(&mut self);
    /// Flags of the last reset. The platform clears them after reading at boot.
    fn reset_flags(&mut self) -> ResetFlags;
    fn serial_number(&self) -> u32;
}

// -------------------------------------------------------------------------------------------------
// Servo I/O
// -------------------------------------------------------------------------------------------------

/// Servo pulse output.
pub trait ServoOutput {
    fn set_pulse_us(&mut self, pulse_us: u16);
}

/// One reading of the servo supply.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PowerSample {
    pub bus_voltage_mv: u16,
    pub current_raw: u16,
}

/// Servo supply monitor. Reads that fail return zeros.
pub trait PowerMonitor {
    fn sample(&mut self) -> PowerSample;
}

/// Raw 12-bit voltage sense channels.
pub trait AnalogInputs {
    fn vsense(&mut self) -> [u16; 2];
}

/// The set of peripherals a node runs on.
pub trait Board {
    type Can: CanBuffers;
    type Flash: Flash;
    type System: System;
    type Servo: ServoOutput;
    type Power: PowerMonitor;
    type Analog: AnalogInputs;
}

/// Owned peripherals of a [`Board`].
pub struct Parts<B: Board> {
    pub can: B::Can,
    pub flash: B::Flash,
    pub system: B::System,
    pub servo: B::Servo,
    pub power: B::Power,
    pub analog: B::Analog,
}
