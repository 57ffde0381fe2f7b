//! 遥测状态缓存
//!
//! `TelemetryStatus` 是一个设备连接的最新遥测快照，放在单个互斥锁之后：
//!
//! - [`StatusWriter`]：唯一写端，只由监听线程持有（不可 Clone）
//! - [`StatusReader`]：只读句柄，可任意 Clone 给读者
//!
//! 每次状态帧解码都在同一次加锁内完成字段赋值和时间戳更新，
//! 读者拿到的是完整副本，不会看到同一状态族的新旧字段混杂。
//! 某个状态族不涉及的字段保持原值，快照不会被部分清零。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vesc_protocol::VescFeedback;

/// 存活判定窗口：最后一次状态更新距今小于该值视为存活
pub const LIVENESS_WINDOW: Duration = Duration::from_millis(500);

/// 遥测快照（物理量）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryStatus {
    /// 转速（电气 RPM）
    pub rpm: i32,
    /// 电机电流（A）
    pub current: f64,
    /// 占空比
    pub duty_cycle: f64,
    /// 消耗电量（Ah）
    pub amp_hours: f64,
    /// 回充电量（Ah）
    pub amp_hours_charged: f64,
    /// 消耗能量（Wh）
    pub watt_hours: f64,
    /// 回充能量（Wh）
    pub watt_hours_charged: f64,
    /// MOSFET 温度（°C）
    pub fet_temp: f64,
    /// 电机温度（°C）
    pub motor_temp: f64,
    /// 输入侧电流（A）
    pub current_in: f64,
    /// 位置环反馈值
    pub pid_pos: f64,
    /// 转速计计数
    pub tachometer: i32,
    /// 输入电压（V）
    pub input_voltage: f64,
    /// 最后一次状态帧更新的时间，`None` 表示从未收到
    #[cfg_attr(feature = "serde", serde(skip))]
    pub last_update: Option<Instant>,
}

impl TelemetryStatus {
    /// 应用一个已解码的状态帧，只写该状态族的字段
    ///
    /// 返回是否有字段被更新（Pong 不携带遥测，返回 false）。
    /// 不修改 `last_update`，时间戳由 [`StatusWriter`] 统一写入。
    pub fn apply(&mut self, feedback: &VescFeedback) -> bool {
        match feedback {
            VescFeedback::Status1(s) => {
                self.rpm = s.rpm;
                self.current = s.current();
                self.duty_cycle = s.duty_cycle();
            },
            VescFeedback::Status2(s) => {
                self.amp_hours = s.amp_hours();
                self.amp_hours_charged = s.amp_hours_charged();
            },
            VescFeedback::Status3(s) => {
                self.watt_hours = s.watt_hours();
                self.watt_hours_charged = s.watt_hours_charged();
            },
            VescFeedback::Status4(s) => {
                self.fet_temp = s.fet_temp();
                self.motor_temp = s.motor_temp();
                self.current_in = s.current_in();
                self.pid_pos = s.pid_pos();
            },
            VescFeedback::Status5(s) => {
                self.tachometer = s.tachometer;
                self.input_voltage = s.input_voltage();
            },
            VescFeedback::Pong { .. } => return false,
        }
        true
    }

    /// 以 `now` 为基准判断是否存活
    pub fn is_alive_at(&self, now: Instant) -> bool {
        self.last_update
            .is_some_and(|t| now.saturating_duration_since(t) < LIVENESS_WINDOW)
    }

    /// 是否存活（最近 500ms 内有状态更新）
    pub fn is_alive(&self) -> bool {
        self.is_alive_at(Instant::now())
    }

    /// 按名称列出全部遥测字段，用于诊断输出
    pub fn telemetry(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("rpm", self.rpm as f64),
            ("current", self.current),
            ("duty_cycle", self.duty_cycle),
            ("amp_hours", self.amp_hours),
            ("amp_hours_charged", self.amp_hours_charged),
            ("watt_hours", self.watt_hours),
            ("watt_hours_charged", self.watt_hours_charged),
            ("fet_temp", self.fet_temp),
            ("motor_temp", self.motor_temp),
            ("current_in", self.current_in),
            ("pid_pos", self.pid_pos),
            ("tachometer", self.tachometer as f64),
            ("input_voltage", self.input_voltage),
        ]
    }
}

/// 状态缓存（互斥锁保护的 `TelemetryStatus`）
#[derive(Debug, Default)]
pub struct StatusCache {
    inner: Mutex<TelemetryStatus>,
}

impl StatusCache {
    /// 创建零值缓存，返回唯一写端和一个读端
    pub fn new() -> (StatusWriter, StatusReader) {
        let cache = Arc::new(Self::default());
        (
            StatusWriter {
                cache: cache.clone(),
            },
            StatusReader { cache },
        )
    }
}

/// 缓存写端（监听线程独占）
#[derive(Debug)]
pub struct StatusWriter {
    cache: Arc<StatusCache>,
}

impl StatusWriter {
    /// 在锁内修改字段，然后写入当前时间戳
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TelemetryStatus),
    {
        let mut status = self.cache.inner.lock();
        f(&mut status);
        status.last_update = Some(Instant::now());
    }

    /// 应用一个已解码的入站帧
    ///
    /// 只有状态帧会更新缓存和时间戳，Pong 不修改缓存。返回是否发生了更新。
    pub fn apply(&self, feedback: &VescFeedback) -> bool {
        if matches!(feedback, VescFeedback::Pong { .. }) {
            return false;
        }
        self.update(|status| {
            status.apply(feedback);
        });
        true
    }

    /// 获取与本写端共享同一缓存的读端
    pub fn reader(&self) -> StatusReader {
        StatusReader {
            cache: self.cache.clone(),
        }
    }
}

/// 缓存只读句柄
#[derive(Debug, Clone)]
pub struct StatusReader {
    cache: Arc<StatusCache>,
}

impl StatusReader {
    /// 读取一致的快照副本
    pub fn read(&self) -> TelemetryStatus {
        *self.cache.inner.lock()
    }

    /// 最近 500ms 内是否有状态更新
    pub fn is_alive(&self) -> bool {
        self.cache.inner.lock().is_alive()
    }

    /// 在锁内读取部分字段，避免复制整个快照
    pub fn with<R>(&self, f: impl FnOnce(&TelemetryStatus) -> R) -> R {
        f(&self.cache.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesc_protocol::{StatusFeedback1, StatusFeedback4, StatusFeedback5};

    fn status1(rpm: i32, current_raw: i16, duty_raw: i16) -> VescFeedback {
        VescFeedback::Status1(StatusFeedback1 {
            rpm,
            current_raw,
            duty_raw,
        })
    }

    #[test]
    fn test_default_is_zero_and_dead() {
        let (_writer, reader) = StatusCache::new();
        let status = reader.read();
        assert_eq!(status, TelemetryStatus::default());
        assert!(status.last_update.is_none());
        assert!(!reader.is_alive());
    }

    #[test]
    fn test_apply_status1() {
        let (writer, reader) = StatusCache::new();
        assert!(writer.apply(&status1(1200, 150, 250)));

        let status = reader.read();
        assert_eq!(status.rpm, 1200);
        assert_eq!(status.current, 15.0);
        assert_eq!(status.duty_cycle, 0.25);
        assert!(status.last_update.is_some());
        assert!(reader.is_alive());
    }

    #[test]
    fn test_families_do_not_reset_other_fields() {
        let (writer, reader) = StatusCache::new();
        writer.apply(&status1(-300, -20, -100));
        writer.apply(&VescFeedback::Status4(StatusFeedback4 {
            fet_temp_raw: 355,
            motor_temp_raw: 410,
            current_in_raw: 12,
            pid_pos_raw: 100,
        }));
        writer.apply(&VescFeedback::Status5(StatusFeedback5 {
            tachometer: 99,
            input_voltage_raw: 241,
        }));

        let status = reader.read();
        assert_eq!(status.rpm, -300);
        assert_eq!(status.current, -2.0);
        assert_eq!(status.duty_cycle, -0.1);
        assert_eq!(status.fet_temp, 35.5);
        assert_eq!(status.motor_temp, 41.0);
        assert_eq!(status.current_in, 1.2);
        assert_eq!(status.pid_pos, 2.0);
        assert_eq!(status.tachometer, 99);
        assert_eq!(status.input_voltage, 24.1);
    }

    #[test]
    fn test_pong_does_not_touch_cache() {
        let (writer, reader) = StatusCache::new();
        assert!(!writer.apply(&VescFeedback::Pong { sender: 5 }));
        assert!(reader.read().last_update.is_none());
    }

    #[test]
    fn test_liveness_window() {
        let now = Instant::now();
        let mut status = TelemetryStatus {
            last_update: Some(now),
            ..Default::default()
        };
        assert!(status.is_alive_at(now));
        assert!(status.is_alive_at(now + Duration::from_millis(499)));
        assert!(!status.is_alive_at(now + Duration::from_millis(500)));
        assert!(!status.is_alive_at(now + Duration::from_secs(3)));

        status.last_update = None;
        assert!(!status.is_alive_at(now));
    }

    #[test]
    fn test_goes_stale_after_window() {
        let (writer, reader) = StatusCache::new();
        writer.update(|s| s.rpm = 1);
        assert!(reader.is_alive());
        std::thread::sleep(LIVENESS_WINDOW + Duration::from_millis(50));
        assert!(!reader.is_alive());
    }

    #[test]
    fn test_telemetry_names() {
        let status = TelemetryStatus {
            rpm: 1200,
            tachometer: -4,
            input_voltage: 24.0,
            ..Default::default()
        };
        let telemetry = status.telemetry();
        assert_eq!(telemetry.len(), 13);
        assert_eq!(telemetry[0], ("rpm", 1200.0));
        assert!(telemetry.contains(&("tachometer", -4.0)));
        assert_eq!(telemetry.last(), Some(&("input_voltage", 24.0)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_skips_timestamp() {
        let status = TelemetryStatus {
            rpm: 1200,
            duty_cycle: 0.25,
            last_update: Some(Instant::now()),
            ..Default::default()
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["rpm"], 1200);
        assert_eq!(json["duty_cycle"], 0.25);
        assert!(json.get("last_update").is_none());

        let back: TelemetryStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back.rpm, 1200);
        assert!(back.last_update.is_none());
    }

    #[test]
    fn test_reader_from_writer_shares_cache() {
        let (writer, _reader) = StatusCache::new();
        let reader = writer.reader();
        writer.update(|s| s.tachometer = 42);
        assert_eq!(reader.with(|s| s.tachometer), 42);
    }
}
