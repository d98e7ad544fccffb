// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Message buffer bank in RAM.
//!
//! Holds sixteen 8-word buffers together with their transmit request and receive full flags,
//! priorities and acceptance filters. The CAN controller side moves frames in and out through
//! [`BufferBank::deliver_frame`], [`BufferBank::next_tx`] and [`BufferBank::ack_tx`]; the node side
//! uses the [`CanBuffers`] trait.

use bxcan::{Data, ExtendedId, Frame, Id};

use crate::hw::{Buffer, CanBuffers, BUFFER_COUNT};
use crate::protocol::catalog::TxPriority;
use crate::protocol::id::{BufferHeader, HEADER_WORDS};
use crate::protocol::messages::{payload_from_bytes, payload_to_bytes, Payload, PAYLOAD_WORDS};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Filter {
    accept: u32,
    mask: u32,
}

impl Filter {
    #[inline]
    fn matches(&self, raw_id: u32) -> bool {
        (raw_id ^ self.accept) & self.mask == 0
    }
}

pub struct BufferBank {
    words: [Buffer; BUFFER_COUNT],
    tx_request: u16,
    rx_full: u16,
    priority: [TxPriority; BUFFER_COUNT],
    filters: [Option<Filter>; BUFFER_COUNT],
}

impl Default for BufferBank {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
const fn bit(index: u8) -> u16 {
    1 << (index as u32 % BUFFER_COUNT as u32)
}

impl BufferBank {
    pub const fn new() -> Self {
        Self {
            words: [[0; 8]; BUFFER_COUNT],
            tx_request: 0,
            rx_full: 0,
            priority: [0; BUFFER_COUNT],
            filters: [None; BUFFER_COUNT],
        }
    }

    /// Requested buffer to hand to the controller next: highest priority first, then lowest index.
    pub fn next_tx(&self) -> Option<u8> {
        (0..BUFFER_COUNT as u8)
            .filter(|&i| self.tx_request & bit(i) != 0)
            .fold(None, |best: Option<u8>, i| match best {
                Some(b) if self.priority[b as usize] >= self.priority[i as usize] => Some(b),
                _ => Some(i),
            })
    }

    /// The frame has been accepted by the controller; clear its request flag.
    #[inline]
    pub fn ack_tx(&mut self, index: u8) {
        self.tx_request &= !bit(index);
    }

    /// Frame image of a transmit buffer.
    pub fn tx_frame(&self, index: u8) -> Option<Frame> {
        let buf = self.buffer(index);
        let header = BufferHeader([buf[0], buf[1], buf[2]]);
        let mut payload: Payload = [0; PAYLOAD_WORDS];
        payload.copy_from_slice(&buf[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS]);

        let bytes = payload_to_bytes(&payload);
        let len = (header.dlc() as usize).min(bytes.len());
        let data = Data::new(&bytes[..len])?;
        let id = ExtendedId::new(header.raw_id())?;
        Some(Frame::new_data(id, data))
    }

    /// Store a received frame in the first empty buffer whose filter accepts it.
    ///
    /// If every accepting buffer is full the lowest one is overwritten. Returns the buffer used,
    /// or `None` if no filter accepts the frame.
    pub fn deliver(&mut self, raw_id: u32, data: &[u8]) -> Option<u8> {
        let mut fallback = None;
        let mut target = None;
        for i in 0..BUFFER_COUNT as u8 {
            let Some(filter) = self.filters[i as usize] else {
                continue;
            };
            if !filter.matches(raw_id) {
                continue;
            }
            if fallback.is_none() {
                fallback = Some(i);
            }
            if !self.rx_full(i) {
                target = Some(i);
                break;
            }
        }

        let index = target.or(fallback)?;
        let header = BufferHeader::data_frame(raw_id, data.len() as u8);
        let payload = payload_from_bytes(data);

        let buf = &mut self.words[index as usize];
        buf[..HEADER_WORDS].copy_from_slice(&header.words());
        buf[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS].copy_from_slice(&payload);
        self.rx_full |= bit(index);
        Some(index)
    }

    /// Store a bxcan frame. Standard and remote frames are never accepted.
    pub fn deliver_frame(&mut self, frame: &Frame) -> Option<u8> {
        let Id::Extended(id) = frame.id() else {
            return None;
        };
        let data = frame.data()?;
        self.deliver(id.as_raw(), data)
    }
}

impl CanBuffers for BufferBank {
    #[inline]
    fn buffer(&self, index: u8) -> &Buffer {
        &self.words[index as usize]
    }

    #[inline]
    fn buffer_mut(&mut self, index: u8) -> &mut Buffer {
        &mut self.words[index as usize]
    }

    #[inline]
    fn tx_requested(&self, index: u8) -> bool {
        self.tx_request & bit(index) != 0
    }

    #[inline]
    fn request_tx(&mut self, index: u8) {
        self.tx_request |= bit(index);
    }

    fn set_tx_priority(&mut self, index: u8, priority: TxPriority) {
        self.priority[index as usize] = priority & 0b11;
    }

    #[inline]
    fn rx_full(&self, index: u8) -> bool {
        self.rx_full & bit(index) != 0
    }

    #[inline]
    fn release_rx(&mut self, index: u8) {
        self.rx_full &= !bit(index);
    }

    fn set_filter(&mut self, index: u8, accept: u32, mask: u32) {
        self.filters[index as usize] = Some(Filter { accept, mask });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxcan::StandardId;

    const ID_A: u32 = 0x0015_8025;
    const MASK: u32 = 0x1FFF_FC7F;

    fn bank_with_filters(buffers: &[u8], accept: u32) -> BufferBank {
        let mut bank = BufferBank::new();
        for &b in buffers {
            bank.set_filter(b, accept, MASK);
        }
        bank
    }

    #[test]
    fn fills_first_empty_accepting_buffer() {
        let mut bank = bank_with_filters(&[8, 9, 10], ID_A);
        assert_eq!(bank.deliver(ID_A, &[1, 0]), Some(8));
        assert_eq!(bank.deliver(ID_A, &[2, 0]), Some(9));
        bank.release_rx(8);
        assert_eq!(bank.deliver(ID_A, &[3, 0]), Some(8));
        assert_eq!(bank.deliver(ID_A, &[4, 0]), Some(10));
        // All full: the lowest is overwritten.
        assert_eq!(bank.deliver(ID_A, &[5, 0]), Some(8));
        assert_eq!(bank.buffer(8)[HEADER_WORDS], 5);
    }

    #[test]
    fn filter_ignores_reserved_bits_only() {
        let mut bank = bank_with_filters(&[11], ID_A);
        assert_eq!(bank.deliver(ID_A | (0b101 << 7), &[]), Some(11));
        assert_eq!(bank.deliver(ID_A ^ 1, &[]), None);
        assert_eq!(bank.deliver(ID_A ^ (1 << 10), &[]), None);
    }

    #[test]
    fn received_header_carries_id_and_length() {
        let mut bank = bank_with_filters(&[12], ID_A);
        bank.deliver(ID_A, &[0x34, 0x12, 0x78]);
        let buf = bank.buffer(12);
        let header = BufferHeader([buf[0], buf[1], buf[2]]);
        assert_eq!(header.raw_id(), ID_A);
        assert_eq!(header.dlc(), 3);
        assert_eq!(&buf[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS], &[0x1234, 0x0078, 0, 0]);
    }

    #[test]
    fn standard_and_remote_frames_are_dropped() {
        let mut bank = bank_with_filters(&[8], 0);
        let std = Frame::new_data(StandardId::new(0x15).unwrap(), [0u8; 2]);
        assert_eq!(bank.deliver_frame(&std), None);

        let ext = ExtendedId::new(ID_A).unwrap();
        let remote = Frame::new_remote(ext, 2);
        let mut bank = bank_with_filters(&[8], ID_A);
        assert_eq!(bank.deliver_frame(&remote), None);
        assert_eq!(bank.deliver_frame(&Frame::new_data(ext, [9u8])), Some(8));
    }

    #[test]
    fn tx_order_is_priority_then_index() {
        let mut bank = BufferBank::new();
        for (i, p) in [(0, 3), (1, 3), (2, 1), (4, 0)] {
            bank.set_tx_priority(i, p);
        }
        assert_eq!(bank.next_tx(), None);

        bank.request_tx(4);
        bank.request_tx(2);
        assert_eq!(bank.next_tx(), Some(2));
        bank.request_tx(1);
        bank.request_tx(0);
        assert_eq!(bank.next_tx(), Some(0));
        bank.ack_tx(0);
        assert_eq!(bank.next_tx(), Some(1));
        bank.ack_tx(1);
        bank.ack_tx(2);
        assert_eq!(bank.next_tx(), Some(4));
        assert!(bank.tx_requested(4));
    }

    #[test]
    fn tx_frame_uses_header_length() {
        let mut bank = BufferBank::new();
        let header = BufferHeader::data_frame(ID_A, 3);
        let buf = bank.buffer_mut(5);
        buf[..HEADER_WORDS].copy_from_slice(&header.words());
        buf[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS].copy_from_slice(&[0x0000, 0x002A, 0xFFFF, 0xFFFF]);

        let frame = bank.tx_frame(5).unwrap();
        assert_eq!(frame.id(), Id::Extended(ExtendedId::new(ID_A).unwrap()));
        assert_eq!(&frame.data().unwrap()[..], &[0x00, 0x00, 0x2A]);
    }
}
