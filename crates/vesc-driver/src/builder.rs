//! Builder 模式实现
//!
//! 提供链式构造 `Vesc` 实例的便捷方式。最终都经由 [`Vesc::new`] 创建。

use crate::config::VescConfig;
use crate::error::DriverError;
use crate::vesc::Vesc;
use std::time::Duration;
use vesc_can::SplittableAdapter;

/// Vesc Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use vesc_driver::VescBuilder;
///
/// let vesc = VescBuilder::new()
///     .interface("can0")
///     .id(5)
///     .ticks_per_rotation(4096.0)
///     .build()
///     .unwrap();
/// vesc.set_power(0.25).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct VescBuilder {
    config: VescConfig,
    /// 监听线程的读超时（轮询退出信号的间隔），默认使用适配器的值
    receive_timeout: Option<Duration>,
}

impl Default for VescBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VescBuilder {
    pub fn new() -> Self {
        Self {
            config: VescConfig::new("", 0),
            receive_timeout: None,
        }
    }

    /// 设置 CAN 接口名（必填）
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.config.interface = interface.into();
        self
    }

    /// 设置设备 ID（默认 0）
    pub fn id(mut self, id: u8) -> Self {
        self.config.id = id;
        self
    }

    /// 设置每转 tick 数（位置相关操作需要）
    pub fn ticks_per_rotation(mut self, ticks: f64) -> Self {
        self.config.ticks_per_rotation = ticks;
        self
    }

    /// 整体替换配置（例如从 TOML 文件加载的配置）
    pub fn config(mut self, config: VescConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置读超时
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// 打开 SocketCAN 接口并创建连接
    ///
    /// # Errors
    /// - `DriverError::Config`: 配置无效（在打开接口之前检查）
    /// - `DriverError::Can`: 接口不存在、未启动或无法打开
    #[cfg(target_os = "linux")]
    pub fn build(self) -> Result<Vesc, DriverError> {
        use vesc_can::SocketCanAdapter;
        use vesc_can::socketcan::DEFAULT_READ_TIMEOUT;

        self.config.validate()?;
        let timeout = self.receive_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);
        let adapter = SocketCanAdapter::with_read_timeout(self.config.interface.clone(), timeout)?;
        tracing::info!(
            "Opened SocketCAN interface '{}' for VESC ID {}",
            self.config.interface,
            self.config.id
        );
        Vesc::new(self.config, adapter)
    }

    /// SocketCAN 只存在于 Linux
    #[cfg(not(target_os = "linux"))]
    pub fn build(self) -> Result<Vesc, DriverError> {
        use vesc_can::{CanDeviceError, CanDeviceErrorKind, CanError};

        self.config.validate()?;
        Err(DriverError::Can(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Backend,
            "SocketCAN is only available on Linux",
        ))))
    }

    /// 使用调用方提供的适配器创建连接
    pub fn build_with_adapter<C>(self, mut adapter: C) -> Result<Vesc, DriverError>
    where
        C: SplittableAdapter,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
    {
        self.config.validate()?;
        if let Some(timeout) = self.receive_timeout {
            adapter.set_receive_timeout(timeout);
        }
        Vesc::new(self.config, adapter)
    }
}
