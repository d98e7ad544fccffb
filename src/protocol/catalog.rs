// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Static message catalog.
//!
//! One descriptor per logical message type: its identifier template, its data length and the
//! hardware message buffer(s) it is bound to. The binding tables are the contract with the
//! message buffer peripheral and must match its buffer numbering.

use crate::protocol::id::{CanId, NodeId, TransferType, FMU_NODE_ID};
use crate::protocol::messages::{Payload, SELECTOR_NODE_ID};

/// Message types this node transmits.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxKind {
    ServoStatus = 0,
    VsenseData = 1,
    NodeStatus = 2,
    NodeVersion = 3,
    ConfigWriteResponse = 4,
    ConfigReadResponse = 5,
}

/// Message types this node receives.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxKind {
    ServoCommand = 0,
    ConfigWriteRequest = 1,
    ConfigReadRequest = 2,
}

/// How the data length code of a transmitted message is determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataLength {
    /// Same length for every instance of the message.
    Fixed(u8),
    /// Selector (2 bytes) plus a value whose width depends on the selector in payload word 0.
    BySelector,
}

/// Data length of a read response carrying the 1-byte node id.
pub const READ_RESPONSE_NODE_ID_LEN: u8 = 2 + 1;
/// Data length of a read response carrying a 4-byte coefficient.
pub const READ_RESPONSE_COEFF_LEN: u8 = 2 + 4;

/// Hardware transmit priority (0 = lowest, 3 = highest).
pub type TxPriority = u8;

pub struct TxDescriptor {
    /// Identifier with `src` left at zero; it is filled in at send time.
    pub template: CanId,
    pub length: DataLength,
    pub buffer: u8,
    pub priority: TxPriority,
}

pub struct RxDescriptor {
    /// Accepted identifier with `dest` left at zero; the node id is latched in at init.
    pub accept: CanId,
    /// Buffers serving this message, in the order they are drained.
    pub buffers: &'static [u8],
}

const TX_TABLE: [TxDescriptor; TxKind::COUNT] = [
    // ServoStatus
    TxDescriptor {
        template: CanId::new(20, TransferType::Broadcast, 0, 0),
        length: DataLength::Fixed(8),
        buffer: 0,
        priority: 3,
    },
    // VsenseData
    TxDescriptor {
        template: CanId::new(21, TransferType::Broadcast, 0, 0),
        length: DataLength::Fixed(8),
        buffer: 1,
        priority: 3,
    },
    // NodeStatus
    TxDescriptor {
        template: CanId::new(770, TransferType::Broadcast, 0, 0),
        length: DataLength::Fixed(4),
        buffer: 2,
        priority: 1,
    },
    // NodeVersion
    TxDescriptor {
        template: CanId::new(771, TransferType::Broadcast, 0, 0),
        length: DataLength::Fixed(8),
        buffer: 3,
        priority: 1,
    },
    // ConfigWriteResponse
    TxDescriptor {
        template: CanId::new(800, TransferType::ServiceResponse, 0, FMU_NODE_ID),
        length: DataLength::Fixed(6),
        buffer: 4,
        priority: 0,
    },
    // ConfigReadResponse
    TxDescriptor {
        template: CanId::new(801, TransferType::ServiceResponse, 0, FMU_NODE_ID),
        length: DataLength::BySelector,
        buffer: 5,
        priority: 0,
    },
];

/// Three buffers absorb jitter between the command sender and the node's tick.
const SERVO_COMMAND_BUFFERS: [u8; 3] = [8, 9, 10];
const CONFIG_WRITE_BUFFERS: [u8; 1] = [11];
const CONFIG_READ_BUFFERS: [u8; 1] = [12];

const RX_TABLE: [RxDescriptor; RxKind::COUNT] = [
    // ServoCommand
    RxDescriptor {
        accept: CanId::new(10, TransferType::Unicast, FMU_NODE_ID, 0),
        buffers: &SERVO_COMMAND_BUFFERS,
    },
    // ConfigWriteRequest
    RxDescriptor {
        accept: CanId::new(800, TransferType::ServiceRequest, FMU_NODE_ID, 0),
        buffers: &CONFIG_WRITE_BUFFERS,
    },
    // ConfigReadRequest
    RxDescriptor {
        accept: CanId::new(801, TransferType::ServiceRequest, FMU_NODE_ID, 0),
        buffers: &CONFIG_READ_BUFFERS,
    },
];

impl TxKind {
    pub const COUNT: usize = 6;

    pub const ALL: [TxKind; TxKind::COUNT] = [
        TxKind::ServoStatus,
        TxKind::VsenseData,
        TxKind::NodeStatus,
        TxKind::NodeVersion,
        TxKind::ConfigWriteResponse,
        TxKind::ConfigReadResponse,
    ];

    #[inline]
    pub fn descriptor(self) -> &'static TxDescriptor {
        &TX_TABLE[self as usize]
    }

    /// Identifier for this message as sent by `src`.
    #[inline]
    pub fn id(self, src: NodeId) -> CanId {
        self.descriptor().template.with_src(src)
    }

    /// Data length code for this message carrying `payload`.
    pub fn data_len(self, payload: &Payload) -> u8 {
        match self.descriptor().length {
            DataLength::Fixed(len) => len,
            DataLength::BySelector if payload[0] == SELECTOR_NODE_ID => READ_RESPONSE_NODE_ID_LEN,
            DataLength::BySelector => READ_RESPONSE_COEFF_LEN,
        }
    }
}

impl RxKind {
    pub const COUNT: usize = 3;

    pub const ALL: [RxKind; RxKind::COUNT] = [
        RxKind::ServoCommand,
        RxKind::ConfigWriteRequest,
        RxKind::ConfigReadRequest,
    ];

    #[inline]
    pub fn descriptor(self) -> &'static RxDescriptor {
        &RX_TABLE[self as usize]
    }

    /// Identifier accepted for this message on node `node`.
    #[inline]
    pub fn accepted_id(self, node: NodeId) -> CanId {
        self.descriptor().accept.with_dest(node)
    }
}
