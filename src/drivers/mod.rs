// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the raw `hw/` layer and below the
//! node logic.
//!
//! ## Existing drivers
//!
//! - [`ina219`] – TI INA219 I2C current/power monitor on the servo supply
//!
//! The INA219 driver only needs `embedded-hal` I2C traits, so it builds without the `stm32f7`
//! feature.

pub mod ina219;

pub use ina219::Ina219;
