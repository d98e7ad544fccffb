// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control
//!
//! - [`servo`] - servo command latching, position correction and pulse output.

pub mod servo;

pub use servo::Servo;
