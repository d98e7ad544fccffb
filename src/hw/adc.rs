// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Voltage sense sampling on ADC1 using direct PAC register access.
//!
//! Blocking single-channel conversions, 12-bit right-aligned, software triggered.

use stm32f7xx_hal::pac;

use crate::hw::AnalogInputs;
use crate::params::VSENSE_CHANNELS;

/// Longest sample time (480 cycles).
const SMP_MAX: u32 = 0b111;

pub struct VsenseAdc {
    adc: pac::ADC1,
    channels: [u8; 2],
}

impl VsenseAdc {
    /// Create and initialize ADC1 for the sense channels in `params`.
    pub fn adc1(adc1: pac::ADC1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        // ADC prescaler: PCLK2 / 4
        common.ccr.modify(|_, w| w.adcpre().div4());

        let adc = adc1;

        // Power off to configure
        adc.cr2.modify(|_, w| w.adon().clear_bit());

        adc.cr1.modify(|_, w| w.res().bits(0b00));
        adc.cr2.modify(|_, w| {
            w.cont().clear_bit();
            w.align().right();
            w.exten().disabled();
            w
        });

        // Long sample time on the sense channels (SMPR2 covers channels 0..=9)
        let smp = VSENSE_CHANNELS
            .iter()
            .filter(|&&ch| ch <= 9)
            .fold(0, |acc, &ch| acc | SMP_MAX << (3 * ch as u32));
        adc.smpr2.modify(|r, w| unsafe { w.bits(r.bits() | smp) });

        // Sequence length = 1 conversion
        adc.sqr1.modify(|_, w| w.l().bits(0));

        adc.cr2.modify(|_, w| w.adon().set_bit());

        Self {
            adc,
            channels: VSENSE_CHANNELS,
        }
    }

    /// Convert a single channel.
    pub fn read(&mut self, channel: u8) -> u16 {
        self.adc
            .sqr3
            .modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });

        self.adc.cr2.modify(|_, w| w.swstart().set_bit());

        while self.adc.sr.read().eoc().bit_is_clear() {}

        self.adc.dr.read().data().bits() as u16
    }

    #[inline]
    pub fn free(self) -> pac::ADC1 {
        self.adc
    }
}

impl AnalogInputs for VsenseAdc {
    fn vsense(&mut self) -> [u16; 2] {
        let [a, b] = self.channels;
        [self.read(a), self.read(b)]
    }
}
