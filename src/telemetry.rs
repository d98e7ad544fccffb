// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Periodic broadcasts: voltage sense data, node status and node version.

use crate::config::record::{CoeffSet, Coefficients};
use crate::config::store::ConfigStore;
use crate::fixed::{self, Q30};
use crate::hw::{CanBuffers, Flash, ResetFlags};
use crate::params::{
    FW_VERSION_MAJOR, FW_VERSION_MINOR, FW_VERSION_REV, NODE_STATUS_PERIOD_TICKS, NODE_TYPE,
    NODE_VERSION_PERIOD_TICKS, VSENSE_PERIOD_TICKS,
};
use crate::protocol::id::NodeId;
use crate::protocol::messages::{NodeStatus, NodeVersion, VsenseData};
use crate::protocol::mux::CanMux;

/// Shift from a 12-bit ADC count to Q30 full scale.
const ADC_TO_Q30_SHIFT: u32 = Q30 - 12;

/// Shift from the Q30 corrected value to the Q15 value on the wire.
const Q30_TO_Q15_SHIFT: u32 = Q30 - 15;

/// Rolled-up cause of the last reset, as reported in NodeStatus.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ResetCondition {
    Unknown = 0,
    PowerOn = 1,
    BrownOut = 2,
    Software = 3,
    Fault = 4,
}

impl ResetCondition {
    /// Several flags are usually set at once (a power-on also reports a brown-out), so the first
    /// match in this order wins: power-on, brown-out, software, fault.
    pub fn from_flags(flags: &ResetFlags) -> Self {
        if flags.power_on {
            ResetCondition::PowerOn
        } else if flags.brown_out {
            ResetCondition::BrownOut
        } else if flags.software {
            ResetCondition::Software
        } else if flags.fault {
            ResetCondition::Fault
        } else {
            ResetCondition::Unknown
        }
    }
}

/// Fires once every `period` calls to [`RateLimiter::tick`].
#[derive(Copy, Clone, Debug)]
pub struct RateLimiter {
    period: u16,
    count: u16,
}

impl RateLimiter {
    pub const fn new(period: u16) -> Self {
        Self { period, count: 0 }
    }

    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.period {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

/// Corrected voltage sense value in Q15.
pub fn correct_vsense(raw: u16, coeffs: &Coefficients) -> i16 {
    let x = ((raw & 0x0FFF) as i32) << ADC_TO_Q30_SHIFT;
    let y = fixed::evaluate(x, Q30, coeffs) >> Q30_TO_Q15_SHIFT;
    y.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

pub struct Telemetry {
    status: NodeStatus,
    version: NodeVersion,
    vsense_rate: RateLimiter,
    status_rate: RateLimiter,
    version_rate: RateLimiter,
}

impl Telemetry {
    pub fn new(reset: ResetFlags, serial: u32) -> Self {
        let condition = ResetCondition::from_flags(&reset);
        info!("reset condition {} (flags {=u16:#x})", condition, reset.raw);

        Self {
            status: NodeStatus {
                reset_condition: condition as u16,
                reset_detail: reset.raw,
            },
            version: NodeVersion {
                node_type: NODE_TYPE,
                rev: FW_VERSION_REV,
                minor: FW_VERSION_MINOR,
                major: FW_VERSION_MAJOR,
                serial,
            },
            vsense_rate: RateLimiter::new(VSENSE_PERIOD_TICKS),
            status_rate: RateLimiter::new(NODE_STATUS_PERIOD_TICKS),
            version_rate: RateLimiter::new(NODE_VERSION_PERIOD_TICKS),
        }
    }

    #[inline]
    pub fn node_status(&self) -> &NodeStatus {
        &self.status
    }

    #[inline]
    pub fn node_version(&self) -> &NodeVersion {
        &self.version
    }

    /// Correct both sense channels and broadcast them when due.
    pub fn service_vsense<B, F>(
        &mut self,
        mux: &mut CanMux<B>,
        store: &ConfigStore<F>,
        raw: [u16; 2],
    ) -> Option<VsenseData>
    where
        B: CanBuffers,
        F: Flash,
    {
        if !self.vsense_rate.tick() {
            return None;
        }

        let data = VsenseData {
            vsense1_raw: raw[0],
            vsense1_cor: correct_vsense(raw[0], &store.coefficients(CoeffSet::Vsense1)),
            vsense2_raw: raw[1],
            vsense2_cor: correct_vsense(raw[1], &store.coefficients(CoeffSet::Vsense2)),
        };
        mux.send(store.node_id(), &data);
        Some(data)
    }

    pub fn service_status<B: CanBuffers>(&mut self, mux: &mut CanMux<B>, src: NodeId) -> bool {
        self.status_rate.tick() && mux.send(src, &self.status)
    }

    pub fn service_version<B: CanBuffers>(&mut self, mux: &mut CanMux<B>, src: NodeId) -> bool {
        self.version_rate.tick() && mux.send(src, &self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: i32 = 1 << Q30;
    const IDENTITY: Coefficients = [0, ONE, 0, 0, 0, 0];

    fn flags(power_on: bool, brown_out: bool, software: bool, fault: bool) -> ResetFlags {
        ResetFlags {
            power_on,
            brown_out,
            software,
            fault,
            ..Default::default()
        }
    }

    #[test]
    fn reset_condition_priority() {
        use ResetCondition::*;
        assert_eq!(ResetCondition::from_flags(&flags(true, true, true, true)), PowerOn);
        assert_eq!(ResetCondition::from_flags(&flags(false, true, true, true)), BrownOut);
        assert_eq!(ResetCondition::from_flags(&flags(false, false, true, true)), Software);
        assert_eq!(ResetCondition::from_flags(&flags(false, false, false, true)), Fault);
        assert_eq!(ResetCondition::from_flags(&flags(false, false, false, false)), Unknown);

        let pin_only = ResetFlags {
            pin: true,
            ..Default::default()
        };
        assert_eq!(ResetCondition::from_flags(&pin_only), Unknown);
    }

    #[test]
    fn rate_limiter_fires_on_period() {
        let mut r = RateLimiter::new(50);
        let fired: usize = (0..150).filter(|_| r.tick()).count();
        assert_eq!(fired, 3);

        let mut r = RateLimiter::new(1);
        assert!((0..10).all(|_| r.tick()));
    }

    #[test]
    fn rate_limiter_first_fire_is_after_a_full_period() {
        let mut r = RateLimiter::new(3);
        assert!(!r.tick());
        assert!(!r.tick());
        assert!(r.tick());
    }

    #[test]
    fn vsense_identity_scales_to_q15() {
        assert_eq!(correct_vsense(0, &IDENTITY), 0);
        assert_eq!(correct_vsense(2048, &IDENTITY), 2048 << 3);
        assert_eq!(correct_vsense(4095, &IDENTITY), 4095 << 3);
    }

    #[test]
    fn vsense_saturates() {
        // y = 0.5 + x
        let coeffs = [ONE / 2, ONE, 0, 0, 0, 0];
        assert_eq!(correct_vsense(4095, &coeffs), i16::MAX);
        let coeffs = [-(ONE + ONE / 2), 0, 0, 0, 0, 0];
        assert_eq!(correct_vsense(0, &coeffs), i16::MIN);
    }

    #[test]
    fn vsense_ignores_bits_above_twelve() {
        assert_eq!(correct_vsense(0xF000 | 100, &IDENTITY), correct_vsense(100, &IDENTITY));
    }
}
