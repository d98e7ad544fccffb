// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Persisted configuration record and its selector table.
//!
//! The record fills exactly one flash page so that erasing it never touches anything else:
//!
//! ```text
//! word  0        node id (low byte)
//! words 1-12     PWM coefficients        6 x i32, low half first
//! words 13-24    VSENSE-1 coefficients   6 x i32
//! words 25-36    VSENSE-2 coefficients   6 x i32
//! words 37-511   reserved, carried over unchanged on every rewrite
//! ```

use crate::fixed::Q30;
use crate::hw::{Page, PAGE_WORDS};
use crate::params::{FACTORY_NODE_ID, FACTORY_PWM_COEFFS};
use crate::protocol::id::{NodeId, NODE_ID_MASK};
use crate::protocol::messages::ConfigValue;

/// Coefficients per correction polynomial.
pub const COEFF_COUNT: usize = 6;

/// One correction polynomial, lowest order first, in Q30.
pub type Coefficients = [i32; COEFF_COUNT];

const NODE_ID_WORD: usize = 0;
const COEFF_WORDS: usize = 2 * COEFF_COUNT;

/// Words at the start of the page that hold defined fields.
pub const RECORD_WORDS: usize = 1 + 3 * COEFF_WORDS;

const ERASED: u16 = 0xFFFF;

/// Identity polynomial `y = x`.
const IDENTITY: Coefficients = [0, 1 << Q30, 0, 0, 0, 0];

/// The three coefficient arrays of the record.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoeffSet {
    Pwm,
    Vsense1,
    Vsense2,
}

impl CoeffSet {
    pub const ALL: [CoeffSet; 3] = [CoeffSet::Pwm, CoeffSet::Vsense1, CoeffSet::Vsense2];

    #[inline]
    const fn first_word(self) -> usize {
        1 + self as usize * COEFF_WORDS
    }

    #[inline]
    const fn first_selector(self) -> u16 {
        1 + (self as u16) * COEFF_COUNT as u16
    }
}

/// A decoded configuration selector.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    NodeId,
    Coefficient(CoeffSet, usize),
}

impl Selector {
    /// Highest defined selector.
    pub const MAX: u16 = 3 * COEFF_COUNT as u16;

    /// `None` for selectors outside `0..=MAX`.
    pub fn from_raw(raw: u16) -> Option<Self> {
        if raw == 0 {
            return Some(Selector::NodeId);
        }
        CoeffSet::ALL.into_iter().find_map(|set| {
            let index = raw.checked_sub(set.first_selector())? as usize;
            (index < COEFF_COUNT).then_some(Selector::Coefficient(set, index))
        })
    }

    pub fn to_raw(self) -> u16 {
        match self {
            Selector::NodeId => 0,
            Selector::Coefficient(set, index) => set.first_selector() + index as u16,
        }
    }
}

/// Working copy of the configuration page.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    page: Page,
}

impl core::fmt::Debug for ConfigRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigRecord")
            .field("node_id", &self.node_id())
            .field("pwm", &self.coefficients(CoeffSet::Pwm))
            .field("vsense1", &self.coefficients(CoeffSet::Vsense1))
            .field("vsense2", &self.coefficients(CoeffSet::Vsense2))
            .finish()
    }
}

impl ConfigRecord {
    /// Record shipped on a blank part: factory identity, the default pulse mapping and identity
    /// polynomials on both sense inputs.
    pub fn factory() -> Self {
        let mut rec = Self {
            page: [ERASED; PAGE_WORDS],
        };
        rec.page[NODE_ID_WORD] = FACTORY_NODE_ID as u16;
        rec.set_coefficients(CoeffSet::Pwm, &FACTORY_PWM_COEFFS);
        rec.set_coefficients(CoeffSet::Vsense1, &IDENTITY);
        rec.set_coefficients(CoeffSet::Vsense2, &IDENTITY);
        rec
    }

    /// Interpret a page read back from flash. An erased page yields [`ConfigRecord::factory`].
    pub fn from_page(page: &Page) -> Self {
        if page[..RECORD_WORDS].iter().all(|&w| w == ERASED) {
            return Self::factory();
        }
        Self { page: *page }
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn node_id(&self) -> NodeId {
        (self.page[NODE_ID_WORD] as u8) & NODE_ID_MASK
    }

    /// Raw node id byte as stored, without masking.
    fn node_id_byte(&self) -> u8 {
        self.page[NODE_ID_WORD] as u8
    }

    pub fn set_node_id(&mut self, id: u8) {
        // High byte is padding and is written as zero.
        self.page[NODE_ID_WORD] = id as u16;
    }

    pub fn coefficient(&self, set: CoeffSet, index: usize) -> i32 {
        let w = set.first_word() + 2 * index;
        (self.page[w] as u32 | (self.page[w + 1] as u32) << 16) as i32
    }

    pub fn set_coefficient(&mut self, set: CoeffSet, index: usize, value: i32) {
        let w = set.first_word() + 2 * index;
        self.page[w] = value as u16;
        self.page[w + 1] = (value as u32 >> 16) as u16;
    }

    pub fn coefficients(&self, set: CoeffSet) -> Coefficients {
        core::array::from_fn(|i| self.coefficient(set, i))
    }

    pub fn set_coefficients(&mut self, set: CoeffSet, coeffs: &Coefficients) {
        for (i, &c) in coeffs.iter().enumerate() {
            self.set_coefficient(set, i, c);
        }
    }

    /// Current value of a selector.
    pub fn get(&self, selector: Selector) -> ConfigValue {
        match selector {
            Selector::NodeId => ConfigValue::NodeId(self.node_id_byte()),
            Selector::Coefficient(set, index) => ConfigValue::Coefficient(self.coefficient(set, index)),
        }
    }

    /// Store `value` under `selector`. The value is interpreted with the selector's own width.
    pub fn set(&mut self, selector: Selector, value: ConfigValue) {
        let raw = match value {
            ConfigValue::NodeId(id) => id as i32,
            ConfigValue::Coefficient(c) => c,
        };
        match selector {
            Selector::NodeId => self.set_node_id(raw as u8),
            Selector::Coefficient(set, index) => self.set_coefficient(set, index, raw),
        }
    }
}
