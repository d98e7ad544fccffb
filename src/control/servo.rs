// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Servo command handling.
//!
//! The node keeps the last command it received. In position mode the commanded angle goes through
//! the PWM correction polynomial:
//!
//! ```text
//! x     = clamp(cmd_pos, ±1000 mrad) as Q30 radians
//! y     = Σ pwm_coeff[i] * x^i                         (1/100 µs)
//! pulse = y / 100                                      (clamped to PWM_MIN_US..=PWM_MAX_US)
//! ```
//!
//! The coefficients therefore carry the pulse width directly: `c0` is the pulse at zero position
//! and `c1` the change per radian, both in 1/100 µs. In PWM mode the commanded pulse is clamped and
//! used as is.

use crate::config::record::{CoeffSet, Coefficients};
use crate::config::store::ConfigStore;
use crate::fixed::{self, Q30};
use crate::hw::{CanBuffers, Flash, PowerSample, ServoOutput};
use crate::params::{POSITION_LIMIT_MRAD, PWM_CENTER_US, PWM_COEFF_DIV, PWM_MAX_US, PWM_MIN_US};
use crate::protocol::messages::{CommandMode, ServoCommand, ServoStatus};
use crate::protocol::mux::CanMux;

const MRAD_PER_RAD: i64 = 1000;

/// Commanded position as Q30 radians, clamped to the allowed range.
pub fn position_to_q30(cmd_pos_mrad: i16) -> i32 {
    let mrad = cmd_pos_mrad.clamp(-POSITION_LIMIT_MRAD, POSITION_LIMIT_MRAD) as i64;
    ((mrad << Q30) / MRAD_PER_RAD) as i32
}

/// Pulse width for a polynomial output in 1/100 µs.
pub fn output_to_pulse(y: i32) -> u16 {
    (y / PWM_COEFF_DIV).clamp(PWM_MIN_US as i32, PWM_MAX_US as i32) as u16
}

#[inline]
pub fn clamp_pulse(pulse_us: u16) -> u16 {
    pulse_us.clamp(PWM_MIN_US, PWM_MAX_US)
}

pub struct Servo {
    command: ServoCommand,
    pulse_us: u16,
}

impl Default for Servo {
    fn default() -> Self {
        Self::new()
    }
}

impl Servo {
    /// PWM mode at the center pulse.
    pub const fn new() -> Self {
        Self {
            command: ServoCommand {
                cmd_type: CommandMode::PWM,
                cmd_pwm: PWM_CENTER_US,
                cmd_pos: 0,
            },
            pulse_us: PWM_CENTER_US,
        }
    }

    #[inline]
    pub fn command(&self) -> &ServoCommand {
        &self.command
    }

    /// Pulse width currently driven.
    #[inline]
    pub fn pulse_us(&self) -> u16 {
        self.pulse_us
    }

    #[inline]
    pub fn latch(&mut self, cmd: ServoCommand) {
        self.command = cmd;
    }

    /// Recompute the pulse for the latched command.
    pub fn update(&mut self, pwm_coeffs: &Coefficients) -> u16 {
        self.pulse_us = match self.command.mode() {
            CommandMode::Position => {
                let x = position_to_q30(self.command.cmd_pos);
                output_to_pulse(fixed::evaluate(x, Q30, pwm_coeffs))
            }
            CommandMode::Pwm => clamp_pulse(self.command.cmd_pwm),
        };
        self.pulse_us
    }

    /// Consume the newest command, drive the output and report it.
    pub fn service<B, F, O>(
        &mut self,
        mux: &mut CanMux<B>,
        store: &ConfigStore<F>,
        output: &mut O,
        power: PowerSample,
    ) -> ServoStatus
    where
        B: CanBuffers,
        F: Flash,
        O: ServoOutput,
    {
        if let Some(cmd) = mux.recv::<ServoCommand>() {
            trace!("servo command type {=u16}", cmd.cmd_type);
            self.latch(cmd);
        }

        let pulse = self.update(&store.coefficients(CoeffSet::Pwm));
        output.set_pulse_us(pulse);

        let status = ServoStatus {
            cmd_type_echo: self.command.cmd_type,
            pwm_act: pulse,
            servo_voltage: power.bus_voltage_mv,
            servo_current: power.current_raw,
        };
        mux.send(store.node_id(), &status);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FACTORY_PWM_COEFFS;

    const ONE: i32 = 1 << Q30;

    fn position(mrad: i16) -> ServoCommand {
        ServoCommand {
            cmd_type: CommandMode::POSITION,
            cmd_pwm: 0,
            cmd_pos: mrad,
        }
    }

    fn constant(c0: i32) -> Coefficients {
        [c0, 0, 0, 0, 0, 0]
    }

    #[test]
    fn starts_centered_in_pwm_mode() {
        let mut servo = Servo::new();
        assert_eq!(servo.command().mode(), CommandMode::Pwm);
        assert_eq!(servo.update(&FACTORY_PWM_COEFFS), PWM_CENTER_US);
    }

    #[test]
    fn pwm_command_is_clamped() {
        let mut servo = Servo::new();
        for (cmd, want) in [(1200, 1200), (500, PWM_MIN_US), (2500, PWM_MAX_US)] {
            servo.latch(ServoCommand {
                cmd_type: CommandMode::PWM,
                cmd_pwm: cmd,
                cmd_pos: 0,
            });
            assert_eq!(servo.update(&FACTORY_PWM_COEFFS), want);
        }
    }

    #[test]
    fn factory_polynomial_maps_range_onto_span() {
        let mut servo = Servo::new();
        for (mrad, want) in [(0, 1500), (1000, 2000), (-1000, 1000), (500, 1750), (-250, 1375)] {
            servo.latch(position(mrad));
            let got = servo.update(&FACTORY_PWM_COEFFS);
            assert!(
                (got as i32 - want as i32).abs() <= 1,
                "{mrad} mrad: got {got}, want {want}"
            );
        }
    }

    #[test]
    fn position_is_clamped_before_correction() {
        assert_eq!(position_to_q30(1000), ONE);
        assert_eq!(position_to_q30(i16::MAX), ONE);
        assert_eq!(position_to_q30(i16::MIN), -ONE);
    }

    #[test]
    fn output_is_in_hundredths_of_a_microsecond() {
        let mut servo = Servo::new();
        for mrad in [0, 400, -700] {
            servo.latch(position(mrad));
            assert_eq!(servo.update(&constant(180_000)), 1800);
        }
        assert_eq!(output_to_pulse(123_499), 1234);
    }

    #[test]
    fn corrected_output_is_clamped() {
        let mut servo = Servo::new();
        servo.latch(position(0));
        assert_eq!(servo.update(&constant(250_000)), PWM_MAX_US);
        assert_eq!(servo.update(&constant(50_000)), PWM_MIN_US);
        assert_eq!(servo.update(&constant(-150_000)), PWM_MIN_US);

        // 1500 µs + 800 µs/rad at +1 rad
        servo.latch(position(1000));
        assert_eq!(servo.update(&[150_000, 80_000, 0, 0, 0, 0]), PWM_MAX_US);
    }
}
