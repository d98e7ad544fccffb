// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Compile-time parameters of the servo node.

use crate::protocol::id::NodeId;

// Executive

/// Period of the executive tick.
pub const TICK_MS: u32 = 10;

/// VsenseData is broadcast every this many ticks.
pub const VSENSE_PERIOD_TICKS: u16 = 1;

/// NodeStatus is broadcast every this many ticks.
pub const NODE_STATUS_PERIOD_TICKS: u16 = 10;

/// NodeVersion is broadcast every this many ticks (500 ms).
pub const NODE_VERSION_PERIOD_TICKS: u16 = 50;

/// Time given to the write response to leave its buffer before resetting into a new identity.
pub const IDENTITY_RESET_DELAY_MS: u32 = 10;

// Identification

/// Node type reported in NodeVersion; 1 identifies a servo node.
pub const NODE_TYPE: u8 = 1;

pub const FW_VERSION_MAJOR: u8 = 1;
pub const FW_VERSION_MINOR: u8 = 0;
pub const FW_VERSION_REV: u8 = 0;

// Servo

/// Pulse width at zero position and default PWM command.
pub const PWM_CENTER_US: u16 = 1500;

/// Pulse width change for a position of +/-1 rad on a blank part.
pub const PWM_HALF_SPAN_US: u16 = 500;

/// The PWM polynomial yields the pulse width in units of 1/100 µs.
pub const PWM_COEFF_DIV: i32 = 100;

/// PWM polynomial on a blank part: `y = 150000 + 50000 * x`, i.e. 1500 µs +/- 500 µs per rad.
pub const FACTORY_PWM_COEFFS: [i32; 6] = [
    PWM_CENTER_US as i32 * PWM_COEFF_DIV,
    PWM_HALF_SPAN_US as i32 * PWM_COEFF_DIV,
    0,
    0,
    0,
    0,
];

pub const PWM_MIN_US: u16 = 1000;
pub const PWM_MAX_US: u16 = 2000;

/// Servo frame period (50 Hz).
pub const PWM_PERIOD_US: u32 = 20_000;

/// Commanded positions are clamped to +/- this many milli-radians.
pub const POSITION_LIMIT_MRAD: i16 = 1000;

// Configuration record

/// Identity used while the configuration page is blank.
pub const FACTORY_NODE_ID: NodeId = 1;

/// Flash address of the configuration page (sector 11, see `memory.x`).
pub const CONFIG_PAGE_ADDR: u32 = 0x081C_0000;

// Peripherals

/// CAN_BTR for 1 Mbit/s at 54 MHz APB1: prescaler 3, BS1 = 15 tq, BS2 = 2 tq, SJW = 1 tq.
pub const CAN_BTR: u32 = 0x001E_0002;

/// INA219 calibration for a 0.01 Ω shunt and 1 mA current LSB.
pub const INA219_CALIBRATION: u16 = 4096;

/// ADC channels of the two voltage sense inputs.
pub const VSENSE_CHANNELS: [u8; 2] = [3, 4];

/// Independent watchdog reload value at LSI / 32 (about 1 ms per count).
pub const WATCHDOG_RELOAD: u16 = 250;
