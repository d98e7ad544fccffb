// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! 29-bit extended identifier layout and its hardware buffer header encoding.
//!
//! ```text
//!  28        19 18 17 16      10 9   7 6       0
//! +------------+-----+----------+-----+---------+
//! | data_type  | tsf |  src_id  | res | dest_id |
//! +------------+-----+----------+-----+---------+
//! ```
//!
//! The message buffers hold the identifier split as an 11/12/6-bit triple across the first three
//! header words, which does not line up with the logical fields above:
//!
//! ```text
//! word 0:  ---- -SSS SSSS SSSS  SRR IDE      (S = id bits 28-18)
//! word 1:  ---- HHHH HHHH HHHH               (H = id bits 17-6)
//! word 2:  LLLL LLRT ---B DDDD               (L = id bits 5-0, R = RTR, T = RB1, B = RB0, D = DLC)
//! ```

use bxcan::ExtendedId;

/// Identifier of a node on the bus (7 bits).
pub type NodeId = u8;

/// Node id of the flight management unit; every service request comes from it.
pub const FMU_NODE_ID: NodeId = 0;

/// Mask for a 7-bit node id.
pub const NODE_ID_MASK: u8 = 0x7F;

const DEST_SHIFT: u32 = 0;
const SRC_SHIFT: u32 = 10;
const TSF_SHIFT: u32 = 17;
const DATA_TYPE_SHIFT: u32 = 19;

const DATA_TYPE_MASK: u32 = 0x3FF;
const TSF_MASK: u32 = 0x3;
const NODE_MASK: u32 = NODE_ID_MASK as u32;

/// Mask of all identifier bits except the reserved bits 9-7.
pub const ACCEPT_MASK: u32 = 0x1FFF_FC7F;

/// Number of 16-bit header words at the start of each message buffer.
pub const HEADER_WORDS: usize = 3;

/// Protocol-level transfer kind (identifier bits 18-17).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferType {
    ServiceResponse = 0b00,
    ServiceRequest = 0b01,
    Broadcast = 0b10,
    Unicast = 0b11,
}

impl TransferType {
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => TransferType::ServiceResponse,
            0b01 => TransferType::ServiceRequest,
            0b10 => TransferType::Broadcast,
            _ => TransferType::Unicast,
        }
    }
}

/// Logical fields of an extended identifier.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CanId {
    pub data_type: u16,
    pub transfer_type: TransferType,
    pub src: NodeId,
    pub dest: NodeId,
}

impl CanId {
    pub const fn new(data_type: u16, transfer_type: TransferType, src: NodeId, dest: NodeId) -> Self {
        Self {
            data_type,
            transfer_type,
            src,
            dest,
        }
    }

    /// Same identifier with the source node replaced.
    #[inline]
    pub const fn with_src(mut self, src: NodeId) -> Self {
        self.src = src;
        self
    }

    /// Same identifier with the destination node replaced.
    #[inline]
    pub const fn with_dest(mut self, dest: NodeId) -> Self {
        self.dest = dest;
        self
    }

    /// Pack into the 29-bit raw value. Reserved bits are zero.
    pub const fn to_raw(&self) -> u32 {
        ((self.data_type as u32 & DATA_TYPE_MASK) << DATA_TYPE_SHIFT)
            | ((self.transfer_type as u32 & TSF_MASK) << TSF_SHIFT)
            | ((self.src as u32 & NODE_MASK) << SRC_SHIFT)
            | ((self.dest as u32 & NODE_MASK) << DEST_SHIFT)
    }

    /// Unpack a raw identifier. Bits above 28 and the reserved bits are ignored.
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            data_type: ((raw >> DATA_TYPE_SHIFT) & DATA_TYPE_MASK) as u16,
            transfer_type: TransferType::from_bits(((raw >> TSF_SHIFT) & TSF_MASK) as u8),
            src: ((raw >> SRC_SHIFT) & NODE_MASK) as u8,
            dest: ((raw >> DEST_SHIFT) & NODE_MASK) as u8,
        }
    }

    /// Identifier as a bxcan extended id.
    pub fn to_extended(&self) -> ExtendedId {
        // SAFETY: `to_raw` never sets bits above 28.
        unsafe { ExtendedId::new_unchecked(self.to_raw()) }
    }
}

impl From<CanId> for ExtendedId {
    fn from(id: CanId) -> Self {
        id.to_extended()
    }
}

impl From<ExtendedId> for CanId {
    fn from(id: ExtendedId) -> Self {
        CanId::from_raw(id.as_raw())
    }
}

/// Identifier split the way the buffer header stores it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdTriple {
    /// Bits 28-18 (11 bits).
    pub sid: u16,
    /// Bits 17-6 (12 bits).
    pub eid_hi: u16,
    /// Bits 5-0 (6 bits).
    pub eid_lo: u8,
}

impl IdTriple {
    pub const fn split(raw: u32) -> Self {
        Self {
            sid: ((raw >> 18) & 0x7FF) as u16,
            eid_hi: ((raw >> 6) & 0xFFF) as u16,
            eid_lo: (raw & 0x3F) as u8,
        }
    }

    pub const fn join(&self) -> u32 {
        ((self.sid as u32 & 0x7FF) << 18) | ((self.eid_hi as u32 & 0xFFF) << 6) | (self.eid_lo as u32 & 0x3F)
    }
}

const IDE: u16 = 1 << 0;
const SRR: u16 = 1 << 1;
const RTR: u16 = 1 << 9;
const DLC_MASK: u16 = 0x000F;

/// The three header words of a message buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferHeader(pub [u16; HEADER_WORDS]);

impl BufferHeader {
    /// Header for an extended data frame. SRR and IDE are recessive, RTR/RB0/RB1 dominant.
    pub const fn data_frame(raw_id: u32, dlc: u8) -> Self {
        let t = IdTriple::split(raw_id);
        Self([
            (t.sid << 2) | SRR | IDE,
            t.eid_hi,
            ((t.eid_lo as u16) << 10) | (dlc as u16 & DLC_MASK),
        ])
    }

    #[inline]
    pub const fn words(&self) -> [u16; HEADER_WORDS] {
        self.0
    }

    pub const fn id_triple(&self) -> IdTriple {
        IdTriple {
            sid: (self.0[0] >> 2) & 0x7FF,
            eid_hi: self.0[1] & 0xFFF,
            eid_lo: ((self.0[2] >> 10) & 0x3F) as u8,
        }
    }

    #[inline]
    pub const fn raw_id(&self) -> u32 {
        self.id_triple().join()
    }

    #[inline]
    pub const fn dlc(&self) -> u8 {
        (self.0[2] & DLC_MASK) as u8
    }

    #[inline]
    pub const fn is_extended(&self) -> bool {
        self.0[0] & IDE != 0
    }

    #[inline]
    pub const fn is_remote(&self) -> bool {
        self.0[2] & RTR != 0
    }
}
