//! SocketCAN CAN 适配器实现
//!
//! 基于 Linux SocketCAN 子系统。波特率等接口配置由系统工具（`ip link`）完成，
//! 不在应用层设置。
//!
//! ## 特性
//!
//! - 打开前检查接口是否存在且已启动
//! - 短读超时（默认 2ms），使监听线程能及时响应退出信号
//! - 自动过滤错误帧（Bus Off / 缓冲区溢出上报为错误）
//! - 可分离为独立的 RX/TX 半边，供监听线程和命令发送方并发使用

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, VescFrame};
use ::socketcan::{
    CanError as SocketCanError, CanErrorFrame, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, trace, warn};

mod interface_check;
pub mod split;

pub use interface_check::check_interface_status;
pub use split::{SocketCanRxAdapter, SocketCanRxCloser, SocketCanTxAdapter};

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2);

/// SocketCAN 适配器
///
/// # 示例
///
/// ```no_run
/// use vesc_can::{CanAdapter, SocketCanAdapter, VescFrame};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(VescFrame::new_extended(0x0005, &[0, 0, 0x61, 0xA8])).unwrap();
/// let rx_frame = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    read_timeout: Duration,
}

impl SocketCanAdapter {
    /// 打开 SocketCAN 接口
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在、未启动或无法打开
    /// - `CanError::Io`: 系统调用失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        Self::with_read_timeout(interface, DEFAULT_READ_TIMEOUT)
    }

    /// 打开 SocketCAN 接口并指定读超时
    pub fn with_read_timeout(
        interface: impl Into<String>,
        read_timeout: Duration,
    ) -> Result<Self, CanError> {
        let interface = interface.into();

        if !check_interface_status(&interface)? {
            return Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::NotUp,
                format!(
                    "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                    interface, interface
                ),
            )));
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::Device(CanDeviceError::new(
                map_open_error_kind(&e),
                format!("Failed to open CAN interface '{}': {}", interface, e),
            ))
        })?;

        socket.set_read_timeout(read_timeout).map_err(CanError::Io)?;

        trace!(
            "SocketCAN interface '{}' opened (read timeout {:?})",
            interface, read_timeout
        );

        Ok(Self {
            socket,
            interface,
            read_timeout,
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        self.read_timeout = timeout;
        Ok(())
    }
}

fn map_open_error_kind(e: &io::Error) -> CanDeviceErrorKind {
    match e.kind() {
        io::ErrorKind::PermissionDenied => CanDeviceErrorKind::AccessDenied,
        io::ErrorKind::NotFound => CanDeviceErrorKind::NotFound,
        _ => CanDeviceErrorKind::Backend,
    }
}

/// VescFrame -> socketcan::CanFrame
pub(crate) fn to_can_frame(frame: &VescFrame) -> Result<CanFrame, CanError> {
    let data = frame.data_slice();
    let can_frame = if frame.is_extended {
        ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, data))
    } else {
        StandardId::new(frame.id as u16).and_then(|id| CanFrame::new(id, data))
    };
    can_frame.ok_or_else(|| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            format!("Failed to create CAN frame with ID 0x{:X}", frame.id),
        ))
    })
}

/// socketcan::CanFrame -> VescFrame（软件时间戳）
pub(crate) fn from_can_frame(can_frame: &CanFrame) -> VescFrame {
    let mut data = [0u8; 8];
    let frame_data = can_frame.data();
    let len = frame_data.len().min(8);
    data[..len].copy_from_slice(&frame_data[..len]);

    VescFrame {
        id: can_frame.raw_id(),
        data,
        len: len as u8,
        is_extended: can_frame.is_extended(),
        timestamp_us: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0),
    }
}

/// 阻塞读取下一个有效数据帧（错误帧被过滤）
pub(crate) fn read_data_frame(socket: &CanSocket) -> Result<CanFrame, CanError> {
    loop {
        let can_frame = match socket.read_frame() {
            Ok(frame) => frame,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Err(CanError::Timeout);
            },
            Err(e) => return Err(CanError::Io(e)),
        };

        if !can_frame.is_error_frame() {
            return Ok(can_frame);
        }

        match CanErrorFrame::try_from(can_frame) {
            Ok(error_frame) => match SocketCanError::from(error_frame) {
                SocketCanError::BusOff => {
                    error!("CAN Bus Off error detected");
                    return Err(CanError::BusOff);
                },
                SocketCanError::ControllerProblem(problem) => {
                    let problem_str = problem.to_string();
                    if problem_str.to_lowercase().contains("overflow") {
                        error!("CAN Buffer Overflow detected: {}", problem);
                        return Err(CanError::BufferOverflow);
                    }
                    warn!("CAN Controller Problem: {}, ignoring", problem);
                },
                other => warn!("CAN Error Frame received: {}, ignoring", other),
            },
            Err(_) => warn!("Received CAN error frame but failed to parse, ignoring"),
        }
    }
}

/// 发送一个帧（Fire-and-Forget）
pub(crate) fn write_frame(socket: &CanSocket, frame: &VescFrame) -> Result<(), CanError> {
    let can_frame = to_can_frame(frame)?;
    socket.write_frame(&can_frame).map_err(CanError::Io)?;
    trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

impl CanAdapter for SocketCanAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError> {
        write_frame(&self.socket, &frame)
    }

    fn receive(&mut self) -> Result<VescFrame, CanError> {
        let can_frame = read_data_frame(&self.socket)?;
        let frame = from_can_frame(&can_frame);
        trace!(
            "Received CAN frame: ID=0x{:X}, len={}, extended={}",
            frame.id, frame.len, frame.is_extended
        );
        Ok(frame)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }
}

impl crate::SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX 和 TX 适配器
    ///
    /// 两个半边通过 `dup()` 共享同一个打开文件描述。
    /// 严禁在分离后使用 `set_nonblocking()`：该标志会同时影响两个半边，
    /// 超时只能依赖 `SO_RCVTIMEO`。
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx_adapter = SocketCanRxAdapter::new(&self.socket, self.read_timeout)?;
        let tx_adapter = SocketCanTxAdapter::new(self.socket);

        trace!(
            "SocketCanAdapter split into RX and TX adapters (interface: {})",
            self.interface
        );

        Ok((rx_adapter, tx_adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn can_interface_exists(interface: &str) -> bool {
        Command::new("ip")
            .args(["link", "show", interface])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    macro_rules! require_vcan0 {
        () => {{
            if !can_interface_exists("vcan0") {
                eprintln!("Skipping test: vcan0 interface not available");
                return;
            }
            "vcan0"
        }};
    }

    #[test]
    fn test_frame_conversion_extended() {
        let frame = VescFrame::new_extended(0x0905, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let can_frame = to_can_frame(&frame).unwrap();
        assert!(can_frame.is_extended());
        assert_eq!(can_frame.raw_id(), 0x0905);

        let back = from_can_frame(&can_frame);
        assert_eq!(back.id, frame.id);
        assert_eq!(back.data_slice(), frame.data_slice());
        assert!(back.is_extended);
        assert!(back.timestamp_us > 0);
    }

    #[test]
    fn test_frame_conversion_standard() {
        let frame = VescFrame::new_standard(0x123, &[0xAA]);
        let can_frame = to_can_frame(&frame).unwrap();
        assert!(!can_frame.is_extended());
        assert_eq!(from_can_frame(&can_frame).data_slice(), &[0xAA]);
    }

    #[test]
    fn test_open_missing_interface() {
        let err = SocketCanAdapter::new("vescnone0").unwrap_err();
        assert!(matches!(err, CanError::Device(_)), "{:?}", err);
    }

    #[test]
    fn test_vcan_timeout() {
        let interface = require_vcan0!();
        let mut adapter =
            SocketCanAdapter::with_read_timeout(interface, Duration::from_millis(5)).unwrap();
        // vcan0 上没有其他发送方时，应返回超时
        match adapter.receive() {
            Err(CanError::Timeout) | Ok(_) => {},
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
