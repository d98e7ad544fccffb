// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Payload layouts of every message on the node's bus.
//!
//! Each payload is four 16-bit words. Multi-byte fields are little-endian: byte `2n` of the
//! frame is the low byte of word `n`. A 32-bit field starting at byte 2 therefore occupies
//! words 1 (low half) and 2 (high half).

use crate::protocol::catalog::{RxKind, TxKind};

/// Number of payload words in a message buffer.
pub const PAYLOAD_WORDS: usize = 4;

/// Raw payload of one message.
pub type Payload = [u16; PAYLOAD_WORDS];

/// Configuration selector addressing the node identity.
pub const SELECTOR_NODE_ID: u16 = 0;

/// Conversion between a typed message and its payload words.
pub trait Message: Sized {
    fn to_payload(&self) -> Payload;
    fn from_payload(payload: &Payload) -> Self;
}

/// A message this node transmits.
pub trait Transmit: Message {
    const KIND: TxKind;
}

/// A message this node receives.
pub trait Receive: Message {
    const KIND: RxKind;
}

#[inline]
fn split_u32(value: u32) -> (u16, u16) {
    (value as u16, (value >> 16) as u16)
}

#[inline]
fn join_u32(lo: u16, hi: u16) -> u32 {
    lo as u32 | ((hi as u32) << 16)
}

#[inline]
fn pack_bytes(lo: u8, hi: u8) -> u16 {
    lo as u16 | ((hi as u16) << 8)
}

/// Servo command mode carried in `ServoCommand::cmd_type`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandMode {
    /// Drive the commanded pulse width directly.
    Pwm,
    /// Correct the commanded position through the PWM polynomial.
    Position,
}

impl CommandMode {
    pub const PWM: u16 = 0;
    pub const POSITION: u16 = 1;

    /// Anything that is not a position command is treated as a PWM command.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            CommandMode::POSITION => CommandMode::Position,
            _ => CommandMode::Pwm,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Transmitted messages
// -------------------------------------------------------------------------------------------------

/// Servo output state, broadcast every tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServoStatus {
    pub cmd_type_echo: u16,
    /// Pulse width actually driven, in microseconds.
    pub pwm_act: u16,
    pub servo_voltage: u16,
    pub servo_current: u16,
}

impl Message for ServoStatus {
    fn to_payload(&self) -> Payload {
        [
            self.cmd_type_echo,
            self.pwm_act,
            self.servo_voltage,
            self.servo_current,
        ]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            cmd_type_echo: p[0],
            pwm_act: p[1],
            servo_voltage: p[2],
            servo_current: p[3],
        }
    }
}

impl Transmit for ServoStatus {
    const KIND: TxKind = TxKind::ServoStatus;
}

/// Raw and corrected voltage sense readings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VsenseData {
    pub vsense1_raw: u16,
    pub vsense1_cor: i16,
    pub vsense2_raw: u16,
    pub vsense2_cor: i16,
}

impl Message for VsenseData {
    fn to_payload(&self) -> Payload {
        [
            self.vsense1_raw,
            self.vsense1_cor as u16,
            self.vsense2_raw,
            self.vsense2_cor as u16,
        ]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            vsense1_raw: p[0],
            vsense1_cor: p[1] as i16,
            vsense2_raw: p[2],
            vsense2_cor: p[3] as i16,
        }
    }
}

impl Transmit for VsenseData {
    const KIND: TxKind = TxKind::VsenseData;
}

/// Why the node last came out of reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStatus {
    pub reset_condition: u16,
    pub reset_detail: u16,
}

impl Message for NodeStatus {
    fn to_payload(&self) -> Payload {
        [self.reset_condition, self.reset_detail, 0, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            reset_condition: p[0],
            reset_detail: p[1],
        }
    }
}

impl Transmit for NodeStatus {
    const KIND: TxKind = TxKind::NodeStatus;
}

/// Node type, firmware version and serial number.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeVersion {
    pub node_type: u8,
    pub rev: u8,
    pub minor: u8,
    pub major: u8,
    pub serial: u32,
}

impl Message for NodeVersion {
    fn to_payload(&self) -> Payload {
        let (lo, hi) = split_u32(self.serial);
        [
            pack_bytes(self.node_type, self.rev),
            pack_bytes(self.minor, self.major),
            lo,
            hi,
        ]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            node_type: p[0] as u8,
            rev: (p[0] >> 8) as u8,
            minor: p[1] as u8,
            major: (p[1] >> 8) as u8,
            serial: join_u32(p[2], p[3]),
        }
    }
}

impl Transmit for NodeVersion {
    const KIND: TxKind = TxKind::NodeVersion;
}

/// Outcome of a configuration write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigWriteResponse {
    pub selector: u16,
    pub fault: bool,
    /// Hardware status bits of the failed flash operation, zero on success.
    pub fault_detail: u16,
}

impl Message for ConfigWriteResponse {
    fn to_payload(&self) -> Payload {
        [self.selector, self.fault as u16, self.fault_detail, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            selector: p[0],
            fault: p[1] != 0,
            fault_detail: p[2],
        }
    }
}

impl Transmit for ConfigWriteResponse {
    const KIND: TxKind = TxKind::ConfigWriteResponse;
}

/// A configuration value as carried on the wire.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    /// 1-byte node identity (selector 0).
    NodeId(u8),
    /// 4-byte signed correction coefficient (every other selector).
    Coefficient(i32),
}

impl ConfigValue {
    fn to_raw(self) -> u32 {
        match self {
            ConfigValue::NodeId(id) => id as u32,
            ConfigValue::Coefficient(c) => c as u32,
        }
    }

    /// Interpret the raw value field according to `selector`.
    pub fn from_raw(selector: u16, raw: u32) -> Self {
        if selector == SELECTOR_NODE_ID {
            ConfigValue::NodeId(raw as u8)
        } else {
            ConfigValue::Coefficient(raw as i32)
        }
    }
}

/// Value of one configuration selector.
///
/// `value` is `None` for selectors outside the defined table; the value bytes are then zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConfigReadResponse {
    pub selector: u16,
    pub value: Option<ConfigValue>,
}

impl Message for ConfigReadResponse {
    fn to_payload(&self) -> Payload {
        let (lo, hi) = split_u32(self.value.map_or(0, ConfigValue::to_raw));
        [self.selector, lo, hi, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            selector: p[0],
            value: Some(ConfigValue::from_raw(p[0], join_u32(p[1], p[2]))),
        }
    }
}

impl Transmit for ConfigReadResponse {
    const KIND: TxKind = TxKind::ConfigReadResponse;
}

// -------------------------------------------------------------------------------------------------
// Received messages
// -------------------------------------------------------------------------------------------------

/// Servo set-point from the FMU.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServoCommand {
    pub cmd_type: u16,
    /// Commanded pulse width in microseconds (PWM mode).
    pub cmd_pwm: u16,
    /// Commanded position in milli-radians (position mode).
    pub cmd_pos: i16,
}

impl ServoCommand {
    #[inline]
    pub const fn mode(&self) -> CommandMode {
        CommandMode::from_raw(self.cmd_type)
    }
}

impl Message for ServoCommand {
    fn to_payload(&self) -> Payload {
        [self.cmd_type, self.cmd_pwm, self.cmd_pos as u16, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            cmd_type: p[0],
            cmd_pwm: p[1],
            cmd_pos: p[2] as i16,
        }
    }
}

impl Receive for ServoCommand {
    const KIND: RxKind = RxKind::ServoCommand;
}

/// Request to persist one configuration value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigWriteRequest {
    pub selector: u16,
    /// Value bytes 2..6 of the frame. Only the low byte is meaningful for the node id.
    pub raw_value: u32,
}

impl ConfigWriteRequest {
    pub fn new(selector: u16, value: ConfigValue) -> Self {
        Self {
            selector,
            raw_value: value.to_raw(),
        }
    }

    #[inline]
    pub fn value(&self) -> ConfigValue {
        ConfigValue::from_raw(self.selector, self.raw_value)
    }
}

impl Message for ConfigWriteRequest {
    fn to_payload(&self) -> Payload {
        let (lo, hi) = split_u32(self.raw_value);
        [self.selector, lo, hi, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self {
            selector: p[0],
            raw_value: join_u32(p[1], p[2]),
        }
    }
}

impl Receive for ConfigWriteRequest {
    const KIND: RxKind = RxKind::ConfigWriteRequest;
}

/// Request for the current value of one configuration selector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigReadRequest {
    pub selector: u16,
}

impl Message for ConfigReadRequest {
    fn to_payload(&self) -> Payload {
        [self.selector, 0, 0, 0]
    }

    fn from_payload(p: &Payload) -> Self {
        Self { selector: p[0] }
    }
}

impl Receive for ConfigReadRequest {
    const KIND: RxKind = RxKind::ConfigReadRequest;
}

/// Payload bytes of a frame in wire order.
pub fn payload_to_bytes(payload: &Payload) -> [u8; 2 * PAYLOAD_WORDS] {
    let mut bytes = [0u8; 2 * PAYLOAD_WORDS];
    for (chunk, word) in bytes.chunks_exact_mut(2).zip(payload.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

/// Payload words from frame bytes; missing bytes read as zero.
pub fn payload_from_bytes(bytes: &[u8]) -> Payload {
    let mut padded = [0u8; 2 * PAYLOAD_WORDS];
    let len = bytes.len().min(padded.len());
    padded[..len].copy_from_slice(&bytes[..len]);

    let mut payload = [0u16; PAYLOAD_WORDS];
    for (word, chunk) in payload.iter_mut().zip(padded.chunks_exact(2)) {
        *word = u16::from_le_bytes([chunk[0], chunk[1]]);
    }
    payload
}
