// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Servo CAN Node Firmware
//!
//! This crate contains the firmware of a servo actuator node on a shared CAN bus, written in Rust,
//! targeting an STM32F777 MCU. The node takes position/PWM commands, drives a servo pulse output,
//! reports status and telemetry, and serves a remote configuration table kept in flash.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | Hardware traits, the message buffer bank and the STM32F7 implementations |
//! | [`drivers`] | Device-level drivers (INA219) |
//! | [`protocol`] | CAN identifiers, message catalog and buffer multiplexer |
//! | [`config`] | Persisted configuration record and its read/write service |
//! | [`control`] | Servo command handling |
//! | [`telemetry`] | Voltage sense, node status and node version broadcasts |
//! | [`fixed`] | Fixed-point polynomial evaluation |
//! | [`node`] | The executive tick tying everything together |
//! | [`params`] | Compile-time parameters |
//!
//! Everything except the STM32F7 modules in [`hw`] is plain `no_std` code that builds and tests
//! on the host.
//!
//! ## Getting Started
//!
//! Run the tests on the host:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features stm32f7 --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod config;
pub mod control;
pub mod drivers;
pub mod fixed;
pub mod hw;
pub mod node;
pub mod params;
pub mod protocol;
pub mod telemetry;

pub use node::{Node, TickReport};
