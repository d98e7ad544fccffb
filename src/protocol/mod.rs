// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # CAN Protocol
//!
//! - [`id`] - 29-bit identifier fields and the buffer header encoding.
//! - [`catalog`] - static binding of message types to identifiers and buffers.
//! - [`messages`] - typed payloads.
//! - [`mux`] - typed access to the message buffers.

pub mod catalog;
pub mod id;
pub mod messages;
pub mod mux;

pub use catalog::{RxKind, TxKind};
pub use id::{CanId, NodeId, TransferType, FMU_NODE_ID};
pub use messages::{Message, Payload, Receive, Transmit};
pub use mux::CanMux;
