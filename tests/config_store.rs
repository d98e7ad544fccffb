// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Remote configuration service, driven through the node tick.

mod common;

use common::{boot, boot_with, deliver, drain, take, Harness};
use snode::config::record::{CoeffSet, ConfigRecord};
use snode::params::{FACTORY_NODE_ID, FACTORY_PWM_COEFFS, IDENTITY_RESET_DELAY_MS};
use snode::protocol::id::TransferType;
use snode::protocol::messages::{
    ConfigReadRequest, ConfigReadResponse, ConfigValue, ConfigWriteRequest, ConfigWriteResponse,
};

fn write(h: &mut Harness, selector: u16, value: ConfigValue) -> ConfigWriteResponse {
    let dest = h.node.node_id();
    deliver(h.node.can_mut(), dest, &ConfigWriteRequest::new(selector, value))
        .expect("write request accepted");
    h.node.tick();
    let sent = take::<ConfigWriteResponse>(h.node.can_mut()).expect("write response sent");
    drain(h.node.can_mut());
    assert_eq!(sent.len, 6);
    sent.msg
}

fn read(h: &mut Harness, selector: u16) -> (ConfigReadResponse, usize) {
    let dest = h.node.node_id();
    deliver(h.node.can_mut(), dest, &ConfigReadRequest { selector })
        .expect("read request accepted");
    h.node.tick();
    let sent = take::<ConfigReadResponse>(h.node.can_mut()).expect("read response sent");
    drain(h.node.can_mut());
    (sent.msg, sent.len)
}

#[test]
fn blank_page_serves_factory_record() {
    let mut h = boot();
    assert_eq!(h.node.node_id(), FACTORY_NODE_ID);

    deliver(h.node.can_mut(), FACTORY_NODE_ID, &ConfigReadRequest { selector: 0 });
    h.node.tick();
    let sent = take::<ConfigReadResponse>(h.node.can_mut()).expect("read response sent");

    assert_eq!(sent.len, 3);
    assert_eq!(sent.msg.value, Some(ConfigValue::NodeId(FACTORY_NODE_ID)));
    assert_eq!(sent.id.data_type, 801);
    assert_eq!(sent.id.transfer_type, TransferType::ServiceResponse);
    assert_eq!(sent.id.src, FACTORY_NODE_ID);
    assert_eq!(sent.id.dest, 0);

    let (resp, len) = read(&mut h, 1);
    assert_eq!(len, 6);
    assert_eq!(resp.value, Some(ConfigValue::Coefficient(FACTORY_PWM_COEFFS[0])));

    let (resp, _) = read(&mut h, 8);
    assert_eq!(resp.value, Some(ConfigValue::Coefficient(1 << 30)));
}

#[test]
fn every_coefficient_selector_round_trips() {
    let mut h = boot();

    for selector in 1..=18u16 {
        let value = (selector as i32 - 9) * 123_457;
        let resp = write(&mut h, selector, ConfigValue::Coefficient(value));
        assert_eq!(resp.selector, selector);
        assert!(!resp.fault, "selector {selector}");
        assert_eq!(resp.fault_detail, 0);

        let (resp, len) = read(&mut h, selector);
        assert_eq!(resp.selector, selector);
        assert_eq!(resp.value, Some(ConfigValue::Coefficient(value)));
        assert_eq!(len, 6);
    }

    let record = h.node.store().record();
    for (set, first) in [(CoeffSet::Pwm, 1), (CoeffSet::Vsense1, 7), (CoeffSet::Vsense2, 13)] {
        for i in 0..6 {
            let selector = first + i as i32;
            assert_eq!(record.coefficient(set, i), (selector - 9) * 123_457);
        }
    }
}

#[test]
fn vsense2_selectors_do_not_touch_vsense1() {
    let mut h = boot();
    write(&mut h, 13, ConfigValue::Coefficient(-42));

    let record = h.node.store().record();
    assert_eq!(record.coefficient(CoeffSet::Vsense2, 0), -42);
    let factory = ConfigRecord::factory();
    assert_eq!(record.coefficients(CoeffSet::Vsense1), factory.coefficients(CoeffSet::Vsense1));
}

#[test]
fn erase_fault_leaves_record_untouched() {
    let mut h = boot_with(|flash, _| flash.fail_erase = Some(0x0080));

    let resp = write(&mut h, 3, ConfigValue::Coefficient(5));
    assert_eq!(resp.selector, 3);
    assert!(resp.fault);
    assert_eq!(resp.fault_detail, 0x0080);

    let flash = h.node.store().flash();
    assert_eq!(flash.erases, 1);
    assert_eq!(flash.programs, 0);
    assert_eq!(h.node.store().record(), ConfigRecord::factory());
}

#[test]
fn program_fault_reads_back_as_factory() {
    let mut h = boot();
    write(&mut h, 1, ConfigValue::Coefficient(99));
    assert_eq!(h.node.store().record().coefficient(CoeffSet::Pwm, 0), 99);

    h.node.flash_mut().fail_program = Some(0x0020);
    let resp = write(&mut h, 1, ConfigValue::Coefficient(7));
    assert!(resp.fault);
    assert_eq!(resp.fault_detail, 0x0020);
    assert_eq!(h.node.store().record(), ConfigRecord::factory());

    // Still the factory identity, so the filters remain valid.
    assert_eq!(h.node.system().resets, 0);
}

#[test]
fn program_fault_that_loses_the_identity_resets() {
    let mut h = boot_with(|flash, _| flash.page[0] = 0x2A);
    assert_eq!(h.node.node_id(), 0x2A);

    h.node.flash_mut().fail_program = Some(0x0040);
    deliver(h.node.can_mut(), 0x2A, &ConfigWriteRequest::new(3, ConfigValue::Coefficient(7)))
        .expect("write request accepted");
    let report = h.node.tick();

    let resp = report.config.write.expect("write served");
    assert_eq!(resp.selector, 3);
    assert!(resp.fault);
    assert_eq!(resp.fault_detail, 0x0040);
    assert!(report.config.reset);

    let system = h.node.system();
    assert_eq!(system.delays, [IDENTITY_RESET_DELAY_MS]);
    assert_eq!(system.resets, 1);
    assert_eq!(h.node.store().node_id(), FACTORY_NODE_ID);
    assert_eq!(h.node.node_id(), 0x2A);
}

#[test]
fn unknown_selector_is_rewritten_unchanged() {
    let mut h = boot();
    let resp = write(&mut h, 40, ConfigValue::Coefficient(1234));

    assert_eq!(resp.selector, 40);
    assert!(!resp.fault);
    assert_eq!(h.node.store().flash().erases, 1);
    assert_eq!(h.node.store().flash().programs, 1);
    assert_eq!(h.node.store().record(), ConfigRecord::factory());

    let (resp, len) = read(&mut h, 40);
    assert_eq!(resp.selector, 40);
    assert_eq!(resp.value, Some(ConfigValue::Coefficient(0)));
    assert_eq!(len, 6);
}

#[test]
fn write_stalls_around_flash_operations() {
    let mut h = boot();
    write(&mut h, 4, ConfigValue::Coefficient(1));

    assert_eq!(
        *h.log.borrow(),
        [
            "suspend_watchdog",
            "stop_tick",
            "disable_interrupts",
            "erase",
            "program",
            "enable_interrupts",
            "start_tick",
            "resume_watchdog",
        ]
    );
}

#[test]
fn stall_is_released_after_a_fault() {
    let mut h = boot_with(|flash, _| flash.fail_erase = Some(1));
    write(&mut h, 4, ConfigValue::Coefficient(1));

    let log = h.log.borrow();
    assert_eq!(log.len(), 7);
    assert_eq!(log[3], "erase");
    assert_eq!(log.last(), Some(&"resume_watchdog"));
}

#[test]
fn identity_write_answers_then_resets() {
    let mut h = boot();

    deliver(
        h.node.can_mut(),
        FACTORY_NODE_ID,
        &ConfigWriteRequest::new(0, ConfigValue::NodeId(0x2A)),
    );
    let report = h.node.tick();
    assert!(report.config.reset);

    let sent = take::<ConfigWriteResponse>(h.node.can_mut()).expect("write response sent");
    assert_eq!(sent.msg.selector, 0);
    assert!(!sent.msg.fault);
    assert_eq!(sent.id.src, 0x2A);

    let system = h.node.system();
    assert_eq!(system.delays, [IDENTITY_RESET_DELAY_MS]);
    assert_eq!(system.resets, 1);

    // Filters keep the old identity until the device actually restarts.
    assert_eq!(h.node.node_id(), FACTORY_NODE_ID);
    assert_eq!(h.node.store().node_id(), 0x2A);
}

#[test]
fn failed_identity_write_does_not_reset() {
    let mut h = boot_with(|flash, _| flash.fail_erase = Some(0x10));
    let resp = write(&mut h, 0, ConfigValue::NodeId(0x2A));

    assert!(resp.fault);
    assert_eq!(h.node.system().resets, 0);
    assert!(h.node.system().delays.is_empty());
    assert_eq!(h.node.store().node_id(), FACTORY_NODE_ID);
}

#[test]
fn write_is_served_before_read_in_the_same_tick() {
    let mut h = boot();
    deliver(h.node.can_mut(), 1, &ConfigWriteRequest::new(8, ConfigValue::Coefficient(-5)));
    deliver(h.node.can_mut(), 1, &ConfigReadRequest { selector: 8 });

    let report = h.node.tick();
    assert!(report.config.write.is_some());
    assert_eq!(
        report.config.read.map(|r| r.value),
        Some(Some(ConfigValue::Coefficient(-5)))
    );
}

#[test]
fn requests_for_other_nodes_are_ignored() {
    let mut h = boot();
    assert_eq!(deliver(h.node.can_mut(), 5, &ConfigReadRequest { selector: 0 }), None);

    let report = h.node.tick();
    assert_eq!(report.config.read, None);
    assert!(take::<ConfigReadResponse>(h.node.can_mut()).is_none());
}
