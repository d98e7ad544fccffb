// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SysTick, independent watchdog, reset flags and device identity.
//!
//! The independent watchdog cannot be stopped once started. While a flash stall is in progress its
//! timeout is stretched to the maximum (about 32 s) and restored afterwards.

use cortex_m::peripheral::{syst::SystClkSource, SCB, SYST};
use stm32f7xx_hal::pac;

use crate::hw::{FlowControl, ResetFlags, System};
use crate::params::{TICK_MS, WATCHDOG_RELOAD};

// IWDG_KR
const KEY_RELOAD: u32 = 0xAAAA;
const KEY_ACCESS: u32 = 0x5555;
const KEY_START: u32 = 0xCCCC;

/// LSI / 32
const IWDG_PR_RUN: u32 = 0b011;
/// LSI / 256
const IWDG_PR_STALL: u32 = 0b111;
const IWDG_RLR_MAX: u32 = 0x0FFF;

// RCC_CSR
const CSR_RMVF: u32 = 1 << 24;
const CSR_BORRSTF: u32 = 1 << 25;
const CSR_PINRSTF: u32 = 1 << 26;
const CSR_PORRSTF: u32 = 1 << 27;
const CSR_SFTRSTF: u32 = 1 << 28;
const CSR_IWDGRSTF: u32 = 1 << 29;
const CSR_WWDGRSTF: u32 = 1 << 30;
const CSR_LPWRRSTF: u32 = 1 << 31;

/// 96-bit unique device ID.
const UID_BASE: usize = 0x1FF0_F420;

pub struct Platform {
    syst: SYST,
    iwdg: pac::IWDG,
    sysclk_hz: u32,
    reset_flags: ResetFlags,
}

impl Platform {
    /// Latch and clear the reset flags, start the tick and start the watchdog.
    pub fn new(syst: SYST, iwdg: pac::IWDG, sysclk_hz: u32) -> Self {
        let reset_flags = take_reset_flags();

        let mut platform = Self {
            syst,
            iwdg,
            sysclk_hz,
            reset_flags,
        };

        platform.syst.set_clock_source(SystClkSource::Core);
        platform.syst.set_reload(sysclk_hz / 1000 * TICK_MS - 1);
        platform.syst.clear_current();
        platform.syst.enable_counter();

        platform.iwdg.kr.write(|w| unsafe { w.bits(KEY_START) });
        platform.set_watchdog(IWDG_PR_RUN, WATCHDOG_RELOAD as u32);

        platform
    }

    /// True once per tick period.
    #[inline]
    pub fn tick_elapsed(&mut self) -> bool {
        self.syst.has_wrapped()
    }

    fn set_watchdog(&mut self, prescaler: u32, reload: u32) {
        // PVU and RVU must be clear before the registers can be updated.
        while self.iwdg.sr.read().bits() & 0b11 != 0 {}
        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_ACCESS) });
        self.iwdg.pr.write(|w| unsafe { w.bits(prescaler) });
        self.iwdg.rlr.write(|w| unsafe { w.bits(reload) });
        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_RELOAD) });
    }
}

fn take_reset_flags() -> ResetFlags {
    let rcc = unsafe { &*pac::RCC::ptr() };
    let csr = rcc.csr.read().bits();
    rcc.csr.modify(|r, w| unsafe { w.bits(r.bits() | CSR_RMVF) });

    ResetFlags {
        power_on: csr & CSR_PORRSTF != 0,
        brown_out: csr & CSR_BORRSTF != 0,
        software: csr & CSR_SFTRSTF != 0,
        fault: csr & (CSR_IWDGRSTF | CSR_WWDGRSTF | CSR_LPWRRSTF) != 0,
        pin: csr & CSR_PINRSTF != 0,
        raw: (csr >> 24) as u16,
    }
}

impl FlowControl for Platform {
    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn enable_interrupts(&mut self) {
        unsafe { cortex_m::interrupt::enable() };
    }

    fn stop_tick(&mut self) {
        self.syst.disable_counter();
    }

    fn start_tick(&mut self) {
        self.syst.clear_current();
        self.syst.enable_counter();
    }

    fn suspend_watchdog(&mut self) {
        self.set_watchdog(IWDG_PR_STALL, IWDG_RLR_MAX);
    }

    fn resume_watchdog(&mut self) {
        self.set_watchdog(IWDG_PR_RUN, WATCHDOG_RELOAD as u32);
    }
}

impl System for Platform {
    #[inline]
    fn feed_watchdog(&mut self) {
        self.iwdg.kr.write(|w| unsafe { w.bits(KEY_RELOAD) });
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            cortex_m::asm::delay(self.sysclk_hz / 1000);
        }
    }

    fn reset(&mut self) {
        SCB::sys_reset();
    }

    fn reset_flags(&mut self) -> ResetFlags {
        self.reset_flags
    }

    fn serial_number(&self) -> u32 {
        let uid = UID_BASE as *const u32;
        (0..3).fold(0, |acc, i| acc ^ unsafe { core::ptr::read_volatile(uid.add(i)) })
    }
}
