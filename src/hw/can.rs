// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Controller Area Network (CAN) abstraction layer.
//!
//! - `CanBus` wraps a HAL `can::Can` instance in `bxcan::Can` and pairs it with a [`BufferBank`].
//! - The hardware filter passes everything into FIFO0; the bank applies the per-buffer acceptance
//!   filters.
//! - Requesting a transmit buffer pushes it to a free mailbox straight away; [`CanBus::poll`] moves
//!   received frames into the bank and retries anything still waiting for a mailbox.

use bxcan::{self, Frame};
use stm32f7xx_hal::can as hal_can;

use crate::hw::bank::BufferBank;
use crate::hw::{Buffer, CanBuffers};
use crate::protocol::catalog::{TxKind, TxPriority};
use crate::protocol::id::{BufferHeader, HEADER_WORDS};

/// Wrapper around a bxcan CAN instance built from a HAL CAN peripheral.
pub struct CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    can: bxcan::Can<hal_can::Can<I>>,
    bank: BufferBank,
}

impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    /// Create and enable a bxcan instance from a HAL CAN peripheral.
    ///
    /// * `hal_can` – the HAL CAN wrapper
    /// * `btr` – value for the CAN_BTR register (bit timing), see `params::CAN_BTR`
    pub fn new(hal_can: hal_can::Can<I>, btr: u32) -> Self {
        let can = bxcan::Can::builder(hal_can)
            .set_bit_timing(btr)
            .set_loopback(false)
            .set_silent(false)
            .enable();

        Self {
            can,
            bank: BufferBank::new(),
        }
    }

    /// Access the underlying bxcan instance for advanced configuration.
    pub fn inner(&mut self) -> &mut bxcan::Can<hal_can::Can<I>> {
        &mut self.can
    }

    #[inline]
    pub fn bank(&self) -> &BufferBank {
        &self.bank
    }

    /// Service the controller: drain the receive FIFO, then refill the transmit mailboxes.
    pub fn poll(&mut self) {
        loop {
            match self.can.receive() {
                Ok(frame) => {
                    if self.bank.deliver_frame(&frame).is_none() {
                        trace!("rx frame not accepted");
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => warn!("rx fifo overrun"),
            }
        }

        self.pump_tx();
    }

    /// Hand requested buffers to free mailboxes in priority order.
    fn pump_tx(&mut self) {
        while let Some(index) = self.bank.next_tx() {
            let Some(frame) = self.bank.tx_frame(index) else {
                self.bank.ack_tx(index);
                continue;
            };

            match self.can.transmit(&frame) {
                Ok(status) => {
                    self.bank.ack_tx(index);
                    if let Some(old) = status.dequeued_frame() {
                        self.requeue(old);
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(never)) => match never {},
            }
        }
    }

    /// A lower priority frame was pushed out of its mailbox; request its buffer again.
    fn requeue(&mut self, frame: &Frame) {
        let bxcan::Id::Extended(id) = frame.id() else {
            return;
        };
        let raw = id.as_raw();
        let index = TxKind::ALL
            .iter()
            .map(|kind| kind.descriptor().buffer)
            .find(|&i| {
                let buf = self.bank.buffer(i);
                let mut header = [0; HEADER_WORDS];
                header.copy_from_slice(&buf[..HEADER_WORDS]);
                BufferHeader(header).raw_id() == raw
            });
        if let Some(index) = index {
            self.bank.request_tx(index);
        }
    }
}

/// Extra helpers for CAN instances that own filters (e.g., CAN1 on STM32F7).
impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance + bxcan::FilterOwner,
{
    /// Configure filter bank 0 to pass every frame into FIFO0.
    ///
    /// This must be called on CAN1 (the filter owner).
    pub fn configure_accept_all_filter(&mut self) {
        let regs = unsafe { &*stm32f7xx_hal::pac::CAN1::ptr() };

        // Enter filter init mode
        regs.fmr.modify(|_, w| w.finit().set_bit());

        // Clear all filter banks (disable all)
        regs.fa1r.reset();
        regs.fm1r.reset();
        regs.fs1r.reset();
        regs.ffa1r.reset();

        // Bank 0: 32-bit scale, mask mode, FIFO0
        regs.fs1r.modify(|r, w| unsafe { w.bits(r.bits() | 1) });

        // Mask of zero accepts everything
        regs.fb[0].fr1.write(|w| unsafe { w.bits(0) });
        regs.fb[0].fr2.write(|w| unsafe { w.bits(0) });

        regs.fa1r.modify(|r, w| unsafe { w.bits(r.bits() | 1) });

        // Leave filter init mode (FINIT = 0)
        regs.fmr.modify(|_, w| w.finit().clear_bit());
    }
}

impl<I> CanBuffers for CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    #[inline]
    fn buffer(&self, index: u8) -> &Buffer {
        self.bank.buffer(index)
    }

    #[inline]
    fn buffer_mut(&mut self, index: u8) -> &mut Buffer {
        self.bank.buffer_mut(index)
    }

    #[inline]
    fn tx_requested(&self, index: u8) -> bool {
        self.bank.tx_requested(index)
    }

    fn request_tx(&mut self, index: u8) {
        self.bank.request_tx(index);
        self.pump_tx();
    }

    fn set_tx_priority(&mut self, index: u8, priority: TxPriority) {
        self.bank.set_tx_priority(index, priority);
    }

    #[inline]
    fn rx_full(&self, index: u8) -> bool {
        self.bank.rx_full(index)
    }

    #[inline]
    fn release_rx(&mut self, index: u8) {
        self.bank.release_rx(index);
    }

    fn set_filter(&mut self, index: u8, accept: u32, mask: u32) {
        self.bank.set_filter(index, accept, mask);
    }
}
