//! 端到端集成测试（Mock 总线）
//!
//! 通过 `MockBus` 观察出站帧、注入入站帧，验证命令编码、监听线程、缓存三者的协作。

use std::thread;
use std::time::{Duration, Instant};
use vesc_can::{MockBus, MockCanAdapter, VescFrame};
use vesc_driver::{CanError, DriverError, Vesc, VescBuilder, VescConfig};
use vesc_protocol::{CommandId, build_extended_id};

fn open(id: u8, ticks: f64) -> (Vesc, MockBus) {
    let (adapter, bus) = MockCanAdapter::new();
    let config = VescConfig::new("mock0", id).with_ticks_per_rotation(ticks);
    (Vesc::new(config, adapter).unwrap(), bus)
}

fn status_frame(command: CommandId, device: u8, data: [u8; 8]) -> VescFrame {
    VescFrame::new_extended(build_extended_id(command, device), &data)
}

fn status1(device: u8, rpm: i32, current_raw: i16, duty_raw: i16) -> VescFrame {
    let mut data = [0u8; 8];
    data[0..4].copy_from_slice(&rpm.to_be_bytes());
    data[4..6].copy_from_slice(&current_raw.to_be_bytes());
    data[6..8].copy_from_slice(&duty_raw.to_be_bytes());
    status_frame(CommandId::Status, device, data)
}

fn status4(device: u8, pid_pos_raw: i16) -> VescFrame {
    let mut data = [0u8; 8];
    data[0..2].copy_from_slice(&250i16.to_be_bytes());
    data[2..4].copy_from_slice(&300i16.to_be_bytes());
    data[4..6].copy_from_slice(&15i16.to_be_bytes());
    data[6..8].copy_from_slice(&pid_pos_raw.to_be_bytes());
    status_frame(CommandId::Status4, device, data)
}

/// 轮询直到条件成立（最多 2 秒）
fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_end_to_end_device_5() {
    let (vesc, bus) = open(5, 0.0);

    vesc.set_power(0.25).unwrap();
    let sent = bus.sent_frames();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, 5);
    assert!(sent[0].is_extended);
    assert_eq!(sent[0].data_slice(), &25_000i32.to_be_bytes());

    bus.inject(status1(5, 1200, 150, 250));
    assert!(wait_until(|| vesc.status().rpm == 1200));

    let status = vesc.status();
    assert_eq!(status.rpm, 1200);
    assert_eq!(status.current, 15.0);
    assert_eq!(status.duty_cycle, 0.25);
    assert!(vesc.is_alive());
    assert_eq!(vesc.is_powered(), (true, 0.25));
    assert!(vesc.is_moving());
}

#[test]
fn test_foreign_and_short_frames_are_ignored() {
    let (vesc, bus) = open(5, 0.0);

    bus.inject(status1(6, 999, 10, 10));
    bus.inject(VescFrame::new_extended(
        build_extended_id(CommandId::Status, 5),
        &[0, 0, 1, 0],
    ));
    bus.inject(VescFrame::new_standard(0x005, &[0, 0, 1, 0, 0, 10, 0, 10]));
    // 最后一帧作为屏障：处理到它时前面的帧都已处理完
    bus.inject(status_frame(CommandId::Pong, 5, [0; 8]));

    assert!(wait_until(|| vesc.metrics().pongs == 1));
    let metrics = vesc.metrics();
    assert_eq!(metrics.rx_frames_total, 4);
    assert_eq!(metrics.rx_frames_foreign, 1);
    assert_eq!(metrics.rx_frames_short, 1);
    assert_eq!(metrics.rx_frames_standard, 1);
    assert_eq!(metrics.status_updates, 0);

    assert_eq!(vesc.status(), Default::default());
    assert!(!vesc.is_alive());
}

#[test]
fn test_liveness_expires() {
    let (vesc, bus) = open(5, 0.0);
    bus.inject(status1(5, 1, 0, 0));
    assert!(wait_until(|| vesc.is_alive()));

    thread::sleep(Duration::from_millis(600));
    assert!(!vesc.is_alive());
    // 过期不会清空数据
    assert_eq!(vesc.status().rpm, 1);
}

#[test]
fn test_position_from_cached_feedback() {
    let (vesc, bus) = open(5, 4.0);
    // pid_pos = 500 / 50 = 10.0，position = 10.0 / 4.0
    bus.inject(status4(5, 500));
    assert!(wait_until(|| vesc.status().pid_pos == 10.0));
    assert_eq!(vesc.position().unwrap(), 2.5);

    // go_for: (2.5 + 1.5) 圈 * 4 tick
    vesc.go_for(60.0, 1.5).unwrap();
    let frame = bus.sent_frames()[0];
    assert_eq!(frame.id, build_extended_id(CommandId::SetPos, 5));
    assert_eq!(frame.data_slice(), &16i32.to_be_bytes());
}

#[test]
fn test_status_families_accumulate() {
    let (vesc, bus) = open(5, 0.0);

    let mut s2 = [0u8; 8];
    s2[0..4].copy_from_slice(&12_345i32.to_be_bytes());
    s2[4..8].copy_from_slice(&(-20_000i32).to_be_bytes());
    let mut s5 = [0u8; 8];
    s5[0..4].copy_from_slice(&(-7i32).to_be_bytes());
    s5[4..6].copy_from_slice(&480i16.to_be_bytes());

    bus.inject(status1(5, 800, -35, 500));
    bus.inject(status_frame(CommandId::Status2, 5, s2));
    bus.inject(status_frame(CommandId::Status5, 5, s5));
    assert!(wait_until(|| vesc.metrics().status_updates == 3));

    let status = vesc.status();
    assert_eq!(status.rpm, 800);
    assert_eq!(status.current, -3.5);
    assert_eq!(status.duty_cycle, 0.5);
    assert_eq!(status.amp_hours, 1.2345);
    assert_eq!(status.amp_hours_charged, -2.0);
    assert_eq!(status.tachometer, -7);
    assert_eq!(status.input_voltage, 48.0);

    let telemetry = vesc.telemetry();
    assert!(telemetry.contains(&("rpm", 800.0)));
    assert!(telemetry.contains(&("input_voltage", 48.0)));
}

#[test]
fn test_close_stops_listener() {
    let (mut vesc, bus) = open(5, 0.0);
    let reader = vesc.status_reader();
    bus.inject(status1(5, 10, 0, 0));
    assert!(wait_until(|| reader.read().rpm == 10));

    vesc.close().unwrap();
    assert!(!vesc.is_listening());

    let calls = bus.receive_calls();
    bus.inject(status1(5, 20, 0, 0));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(reader.read().rpm, 10);
    assert_eq!(bus.receive_calls(), calls);

    assert!(matches!(
        vesc.set_power(0.1),
        Err(DriverError::Can(CanError::Closed))
    ));
}

#[test]
fn test_drop_stops_listener() {
    let (vesc, bus) = open(5, 0.0);
    let reader = vesc.status_reader();
    drop(vesc);

    let calls = bus.receive_calls();
    bus.inject(status1(5, 30, 0, 0));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(bus.receive_calls(), calls);
    assert_eq!(reader.read().rpm, 0);
}

#[test]
fn test_close_interrupts_long_receive() {
    let (adapter, bus) = MockCanAdapter::new();
    let mut vesc = VescBuilder::new()
        .interface("mock0")
        .id(5)
        .receive_timeout(Duration::from_secs(30))
        .build_with_adapter(adapter)
        .unwrap();
    assert!(wait_until(|| bus.receive_calls() >= 1));

    let start = Instant::now();
    vesc.close().unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!vesc.is_listening());
    assert!(bus.is_rx_closed());
    assert_eq!(vesc.metrics().rx_errors, 0);
}

#[test]
fn test_listener_recovers_from_receive_errors() {
    let (vesc, bus) = open(5, 0.0);
    bus.inject_error(CanError::BusOff);
    bus.inject(status1(5, 77, 0, 0));
    assert!(wait_until(|| vesc.status().rpm == 77));
    assert_eq!(vesc.metrics().rx_errors, 1);
    assert!(vesc.is_listening());
}

#[test]
fn test_builder_with_mock_adapter() {
    let (adapter, bus) = MockCanAdapter::new();
    let vesc = VescBuilder::new()
        .interface("mock0")
        .id(12)
        .receive_timeout(Duration::from_millis(1))
        .build_with_adapter(adapter)
        .unwrap();

    vesc.stop().unwrap();
    let ids: Vec<u32> = bus.sent_frames().iter().map(|f| f.id).collect();
    assert_eq!(
        ids,
        vec![
            build_extended_id(CommandId::SetRpm, 12),
            build_extended_id(CommandId::SetCurrentBrake, 12),
        ]
    );
}
