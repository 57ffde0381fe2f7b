//! # VESC CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的收发接口。驱动层只依赖这里定义的 trait，
//! 不关心帧最终经由 SocketCAN 还是测试用的 mock 总线。

use std::time::Duration;
use thiserror::Error;

// 重新导出 vesc-protocol 中的 VescFrame
pub use vesc_protocol::VescFrame;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use self::socketcan::{
    SocketCanAdapter, SocketCanRxAdapter, SocketCanRxCloser, SocketCanTxAdapter,
};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, MockCanAdapter, MockRxAdapter, MockRxCloser, MockTxAdapter};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
    #[error("Adapter closed")]
    Closed,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    NotFound,
    NotUp,
    AccessDenied,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 完整的 CAN 适配器（收发共用一个句柄）
pub trait CanAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<VescFrame, CanError>;
    /// 设置读超时（分离前设置，RX 半边沿用）
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
}

/// 只读半边（监听线程独占）
///
/// `receive` 在读超时到期时返回 `CanError::Timeout`，
/// 调用方借此周期性检查退出信号。
pub trait RxAdapter {
    fn receive(&mut self) -> Result<VescFrame, CanError>;

    /// 关闭句柄，用于从其他线程唤醒阻塞中的 `receive`
    ///
    /// 必须在 RX 半边移交给监听线程之前获取。返回 `None` 时，
    /// 关闭只能等待读超时。
    fn closer(&self) -> Option<Box<dyn RxCloser>> {
        None
    }
}

/// RX 半边的关闭句柄
///
/// `close()` 之后，阻塞中和后续的 `receive` 都应尽快返回错误。
/// 重复调用无副作用。
pub trait RxCloser: Send + Sync {
    fn close(&self);
}

/// 只写半边（命令发送方共享）
pub trait TxAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError>;
}

/// 可分离为独立 RX/TX 半边的适配器
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}
