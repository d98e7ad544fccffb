// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! The node executive.
//!
//! [`Node::tick`] is called once per tick period by whatever owns the timer (the firmware's
//! SysTick loop or a test). Each call runs every service to completion, in this order:
//!
//! 1. sample the analog inputs and the servo supply
//! 2. configuration store (one write, then one read)
//! 3. servo command and output
//! 4. voltage sense data
//! 5. node status
//! 6. node version
//! 7. watchdog feed

use crate::config::store::{ConfigStore, ServiceReport};
use crate::control::servo::Servo;
use crate::hw::{AnalogInputs, Board, Parts, PowerMonitor, System};
use crate::params::CONFIG_PAGE_ADDR;
use crate::protocol::messages::{ServoStatus, VsenseData};
use crate::protocol::mux::CanMux;
use crate::telemetry::Telemetry;

/// What one tick did, for tests and tracing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub config: ServiceReport,
    pub servo: ServoStatus,
    pub vsense: Option<VsenseData>,
    pub node_status_sent: bool,
    pub node_version_sent: bool,
}

pub struct Node<B: Board> {
    mux: CanMux<B::Can>,
    store: ConfigStore<B::Flash>,
    system: B::System,
    servo_out: B::Servo,
    power: B::Power,
    analog: B::Analog,
    servo: Servo,
    telemetry: Telemetry,
}

impl<B: Board> Node<B> {
    /// Bring the node up on `parts`, with the configuration page at the default address.
    pub fn new(parts: Parts<B>) -> Self {
        Self::with_config_address(parts, CONFIG_PAGE_ADDR)
    }

    /// Bring the node up with the configuration page at `address`.
    ///
    /// The persisted identity is latched into the receive filters here and the reset flags are
    /// consumed.
    pub fn with_config_address(parts: Parts<B>, address: u32) -> Self {
        let Parts {
            can,
            flash,
            mut system,
            servo,
            power,
            analog,
        } = parts;

        let store = ConfigStore::new(flash, address);
        let node_id = store.node_id();
        let mux = CanMux::new(can, node_id);

        let reset = system.reset_flags();
        let telemetry = Telemetry::new(reset, system.serial_number());
        info!("node {=u8} up", node_id);

        Self {
            mux,
            store,
            system,
            servo_out: servo,
            power,
            analog,
            servo: Servo::new(),
            telemetry,
        }
    }

    /// Run one executive cycle.
    pub fn tick(&mut self) -> TickReport {
        let vsense_raw = self.analog.vsense();
        let power = self.power.sample();

        let config = self.store.service(&mut self.mux, &mut self.system);

        let servo = self
            .servo
            .service(&mut self.mux, &self.store, &mut self.servo_out, power);

        let vsense = self
            .telemetry
            .service_vsense(&mut self.mux, &self.store, vsense_raw);

        let src = self.store.node_id();
        let node_status_sent = self.telemetry.service_status(&mut self.mux, src);
        let node_version_sent = self.telemetry.service_version(&mut self.mux, src);

        self.system.feed_watchdog();

        TickReport {
            config,
            servo,
            vsense,
            node_status_sent,
            node_version_sent,
        }
    }

    /// Identity the receive filters were set up with.
    #[inline]
    pub fn node_id(&self) -> u8 {
        self.mux.node_id()
    }

    #[inline]
    pub fn can(&self) -> &B::Can {
        self.mux.buffers()
    }

    #[inline]
    pub fn can_mut(&mut self) -> &mut B::Can {
        self.mux.buffers_mut()
    }

    #[inline]
    pub fn store(&self) -> &ConfigStore<B::Flash> {
        &self.store
    }

    #[inline]
    pub fn flash_mut(&mut self) -> &mut B::Flash {
        self.store.flash_mut()
    }

    #[inline]
    pub fn system(&self) -> &B::System {
        &self.system
    }

    #[inline]
    pub fn system_mut(&mut self) -> &mut B::System {
        &mut self.system
    }

    #[inline]
    pub fn servo_output(&self) -> &B::Servo {
        &self.servo_out
    }

    #[inline]
    pub fn power_mut(&mut self) -> &mut B::Power {
        &mut self.power
    }

    #[inline]
    pub fn analog_mut(&mut self) -> &mut B::Analog {
        &mut self.analog
    }

    #[inline]
    pub fn servo(&self) -> &Servo {
        &self.servo
    }

    #[inline]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}
