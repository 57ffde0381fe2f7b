//! VESC 连接（对外 API）
//!
//! `Vesc` 持有一个设备连接：后台监听线程（独占 RX 半边和缓存写端）、
//! 共享的 TX 半边、缓存读端。命令同步编码并发送，传输错误原样返回。

use crate::config::VescConfig;
use crate::error::DriverError;
use crate::metrics::{ListenerMetrics, MetricsSnapshot};
use crate::pipeline::listener_loop;
use crate::state::{StatusCache, StatusReader, TelemetryStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};
use vesc_can::{CanError, RxAdapter, RxCloser, SplittableAdapter, TxAdapter};
use vesc_protocol::VescCommand;

/// `stop()` 使用的刹车电流（A）
pub const STOP_BRAKE_CURRENT: f64 = 1.0;

/// 关闭时等待监听线程退出的最长时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 等待监听线程退出时的轮询间隔
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 电机能力描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorProperties {
    /// 是否支持位置反馈
    pub position_reporting: bool,
}

/// 带超时的线程 join
trait JoinTimeout: Sized {
    /// 超时返回 `Err(Some(handle))`，线程仍在运行；线程 panic 返回 `Err(None)`
    fn join_timeout(self, timeout: Duration) -> Result<(), Option<Self>>;
}

impl JoinTimeout for JoinHandle<()> {
    fn join_timeout(self, timeout: Duration) -> Result<(), Option<Self>> {
        let deadline = Instant::now() + timeout;
        while !self.is_finished() {
            if Instant::now() >= deadline {
                return Err(Some(self));
            }
            std::thread::sleep(JOIN_POLL_INTERVAL);
        }
        self.join().map_err(|_| None)
    }
}

/// VESC 电调连接
///
/// 通过 [`Vesc::new`]（显式工厂）或 [`VescBuilder`](crate::VescBuilder) 创建。
/// 创建后监听线程立即开始接收；`close()` 或 drop 时先发出退出信号，
/// 再关闭 RX 并等待监听线程结束，最后释放 TX 半边。
///
/// # 线程安全
///
/// `Vesc` 是 `Send + Sync`，命令方法只需 `&self`，可以从多个线程并发调用。
pub struct Vesc {
    config: VescConfig,
    /// TX 半边，`close()` 后为 `None`
    tx: Mutex<Option<Box<dyn TxAdapter + Send>>>,
    reader: StatusReader,
    is_running: Arc<AtomicBool>,
    metrics: Arc<ListenerMetrics>,
    /// 唤醒阻塞中的 `receive`，`close()` 时调用
    rx_closer: Option<Box<dyn RxCloser>>,
    rx_thread: Option<JoinHandle<()>>,
}

impl Vesc {
    /// 创建连接并启动监听线程
    ///
    /// # 参数
    /// - `config`: 连接配置（会先校验）
    /// - `adapter`: 已打开的 CAN 适配器，分离为 RX/TX 两个半边
    ///
    /// # 错误
    /// - `DriverError::Config`: 配置无效
    /// - `DriverError::Can`: 分离适配器失败
    /// - `DriverError::IoThread`: 无法创建监听线程
    pub fn new<C>(config: VescConfig, adapter: C) -> Result<Self, DriverError>
    where
        C: SplittableAdapter,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
    {
        config.validate()?;

        let (rx_adapter, tx_adapter) = adapter.split()?;
        let rx_closer = rx_adapter.closer();
        let (writer, reader) = StatusCache::new();
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(ListenerMetrics::new());

        let device_id = config.id;
        let is_running_rx = is_running.clone();
        let metrics_rx = metrics.clone();
        let rx_thread = std::thread::Builder::new()
            .name(format!("vesc-rx-{}", device_id))
            .spawn(move || {
                listener_loop(rx_adapter, writer, device_id, is_running_rx, metrics_rx);
            })
            .map_err(|e| DriverError::IoThread(format!("failed to spawn listener: {}", e)))?;

        debug!(
            "VESC connection opened on '{}' (ID {})",
            config.interface, device_id
        );

        Ok(Self {
            config,
            tx: Mutex::new(Some(Box::new(tx_adapter))),
            reader,
            is_running,
            metrics,
            rx_closer,
            rx_thread: Some(rx_thread),
        })
    }

    /// 连接配置
    pub fn config(&self) -> &VescConfig {
        &self.config
    }

    /// 设备 ID
    pub fn device_id(&self) -> u8 {
        self.config.id
    }

    // ------------------------------------------------------------------
    // 命令
    // ------------------------------------------------------------------

    /// 编码并发送一条命令
    ///
    /// 校验失败时不会发送任何帧；发送失败时返回传输层的原始错误。
    pub fn send_command(&self, command: VescCommand) -> Result<(), DriverError> {
        let frame = command.encode(self.config.id)?;
        let mut tx = self.tx.lock();
        let tx = tx.as_mut().ok_or(CanError::Closed)?;
        tx.send(frame)?;
        trace!("Sent {:?} as ID=0x{:X}", command, frame.id);
        Ok(())
    }

    /// 设置占空比，范围 [-1.0, 1.0]
    pub fn set_power(&self, duty: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetDuty(duty))
    }

    /// 设置转速（电气 RPM）
    pub fn set_rpm(&self, rpm: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetRpm(rpm))
    }

    /// 设置电机电流（A）
    pub fn set_current(&self, amps: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetCurrent(amps))
    }

    /// 设置刹车电流（A）
    pub fn set_brake_current(&self, amps: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetCurrentBrake(amps))
    }

    /// 设置相对电流，范围 [-1.0, 1.0]
    pub fn set_current_relative(&self, ratio: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetCurrentRelative(ratio))
    }

    /// 设置相对刹车电流，范围 [-1.0, 1.0]
    pub fn set_brake_current_relative(&self, ratio: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetCurrentBrakeRelative(ratio))
    }

    /// 设置目标位置（编码器 tick）
    pub fn set_position(&self, ticks: f64) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetPosition(ticks))
    }

    /// 设置电流限制（A）；`store` 为 true 时写入固件配置
    pub fn set_current_limits(&self, min: f64, max: f64, store: bool) -> Result<(), DriverError> {
        self.send_command(VescCommand::SetCurrentLimits { min, max, store })
    }

    /// 发送 Ping，应答在监听线程中以日志和指标体现
    pub fn ping(&self) -> Result<(), DriverError> {
        self.send_command(VescCommand::Ping)
    }

    /// 转到绝对位置（圈）
    ///
    /// # 错误
    /// - `ConfigError::MissingTicksPerRotation`: 未配置 ticks_per_rotation
    pub fn go_to(&self, revolutions: f64) -> Result<(), DriverError> {
        let ticks = self.config.ticks_per_rotation()?;
        self.set_position(revolutions * ticks)
    }

    /// 从当前位置再转 `revolutions` 圈
    ///
    /// 位置模式下速度由固件的位置环决定，`rpm` 目前不参与编码。
    pub fn go_for(&self, _rpm: f64, revolutions: f64) -> Result<(), DriverError> {
        let current = self.position()?;
        self.go_to(current + revolutions)
    }

    /// 停止：先发 RPM 0，再发刹车电流
    ///
    /// 两条命令都会尝试发送，任一失败都返回错误（优先返回第一个）。
    pub fn stop(&self) -> Result<(), DriverError> {
        let rpm = self.set_rpm(0.0);
        let brake = self.set_brake_current(STOP_BRAKE_CURRENT);
        rpm.and(brake)
    }

    // ------------------------------------------------------------------
    // 状态读取（只读缓存，从不失败，除非缺少配置）
    // ------------------------------------------------------------------

    /// 当前位置（圈）= 缓存的位置反馈 / ticks_per_rotation
    pub fn position(&self) -> Result<f64, DriverError> {
        let ticks = self.config.ticks_per_rotation()?;
        Ok(self.reader.with(|s| s.pid_pos) / ticks)
    }

    /// 是否通电，以及当前占空比
    pub fn is_powered(&self) -> (bool, f64) {
        let duty = self.reader.with(|s| s.duty_cycle);
        (duty != 0.0, duty)
    }

    /// 是否在运动（占空比非零）
    pub fn is_moving(&self) -> bool {
        self.reader.with(|s| s.duty_cycle != 0.0)
    }

    /// 最近 500ms 内是否收到过状态帧
    pub fn is_alive(&self) -> bool {
        self.reader.is_alive()
    }

    /// 遥测快照副本
    pub fn status(&self) -> TelemetryStatus {
        self.reader.read()
    }

    /// 按名称列出全部遥测字段
    pub fn telemetry(&self) -> Vec<(&'static str, f64)> {
        self.reader.read().telemetry()
    }

    pub fn properties(&self) -> MotorProperties {
        MotorProperties {
            position_reporting: true,
        }
    }

    /// 只读缓存句柄，可在其他线程中使用
    pub fn status_reader(&self) -> StatusReader {
        self.reader.clone()
    }

    /// 监听线程指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 监听线程是否仍在运行
    pub fn is_listening(&self) -> bool {
        self.rx_thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // 关闭
    // ------------------------------------------------------------------

    /// 关闭连接（幂等）
    ///
    /// 顺序：置退出标志 → 关闭 RX（唤醒阻塞中的读）→ 等待监听线程结束 →
    /// 释放 TX 半边。之后的命令返回 `CanError::Closed`。
    ///
    /// 监听线程未在超时内退出时保留其句柄，`is_listening()` 仍返回 true，
    /// 再次调用 `close()` 会继续等待。
    ///
    /// # 错误
    /// - `DriverError::IoThread`: 监听线程 panic 或未在超时内退出
    pub fn close(&mut self) -> Result<(), DriverError> {
        // Release: 监听线程看到 false 时，这之前的写入都可见
        self.is_running.store(false, Ordering::Release);

        if let Some(closer) = &self.rx_closer {
            closer.close();
        }

        let result = match self.rx_thread.take() {
            Some(handle) => match handle.join_timeout(JOIN_TIMEOUT) {
                Ok(()) => Ok(()),
                Err(Some(handle)) => {
                    self.rx_thread = Some(handle);
                    Err(DriverError::IoThread(format!(
                        "listener thread did not stop within {:?}",
                        JOIN_TIMEOUT
                    )))
                },
                Err(None) => Err(DriverError::IoThread(
                    "listener thread panicked".to_string(),
                )),
            },
            None => Ok(()),
        };

        if self.tx.lock().take().is_some() {
            debug!("VESC connection closed (ID {})", self.config.id);
        }
        result
    }
}

impl Drop for Vesc {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to shut down VESC listener: {}", e);
        }
    }
}
