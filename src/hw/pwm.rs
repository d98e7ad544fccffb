// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Servo pulse output on TIM4 channel 1 (PD12).
//!
//! The timer counts microseconds and wraps every [`PWM_PERIOD_US`], so the compare value is the
//! pulse width directly.

use stm32f7xx_hal::pac;

use crate::hw::ServoOutput;
use crate::params::{PWM_CENTER_US, PWM_PERIOD_US};

const TICK_HZ: u32 = 1_000_000;

// TIM_CCMR1 output compare, channel 1
const OC1PE: u32 = 1 << 3;
const OC1M_PWM1: u32 = 0b110 << 4;
const OC1_FIELDS: u32 = 0xFF | (1 << 16);

pub struct ServoPwm {
    tim: pac::TIM4,
}

impl ServoPwm {
    /// Configure TIM4 for a 50 Hz frame with 1 µs resolution, starting at the center pulse.
    ///
    /// * `timer_clk_hz` – TIM4 kernel clock (APB1 timer clock)
    pub fn tim4(tim4: pac::TIM4, timer_clk_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());

        let tim = tim4;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        tim.psc.write(|w| unsafe { w.bits(timer_clk_hz / TICK_HZ - 1) });
        tim.arr.write(|w| unsafe { w.bits(PWM_PERIOD_US - 1) });
        tim.ccr1.write(|w| unsafe { w.bits(PWM_CENTER_US as u32) });

        // CH1: PWM mode 1, preload
        tim.ccmr1_output()
            .modify(|r, w| unsafe { w.bits((r.bits() & !OC1_FIELDS) | OC1M_PWM1 | OC1PE) });

        // Active high, enabled
        tim.ccer
            .modify(|_, w| w.cc1p().clear_bit().cc1e().set_bit());

        // Auto-reload preload, then latch everything with an update event
        tim.cr1.modify(|_, w| w.arpe().set_bit());
        tim.egr.write(|w| w.ug().set_bit());

        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Consume the wrapper and return the underlying timer peripheral.
    #[inline]
    pub fn free(self) -> pac::TIM4 {
        self.tim
    }
}

impl ServoOutput for ServoPwm {
    #[inline]
    fn set_pulse_us(&mut self, pulse_us: u16) {
        self.tim.ccr1.write(|w| unsafe { w.bits(pulse_us as u32) });
    }
}
