// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Configuration Store
//!
//! - [`record`] - page layout and selector table of the persisted record.
//! - [`store`] - the write/read service on top of flash.

pub mod record;
pub mod store;

pub use record::{CoeffSet, Coefficients, ConfigRecord, Selector};
pub use store::{ConfigStore, ServiceReport};
