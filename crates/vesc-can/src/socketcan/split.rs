//! SocketCAN 适配器分离实现
//!
//! RX 半边由监听线程独占，TX 半边由命令发送方共享（外部加锁）。
//! RX 通过 `dup()` 原 socket 的 FD 获得独立句柄。
//!
//! # ⚠️ `dup()` 的共享状态
//!
//! `O_NONBLOCK` 等标志保存在“打开文件描述”中，两个半边共享。
//! 严禁对任一半边调用 `set_nonblocking()`，超时只用 `SO_RCVTIMEO`。

use super::{from_can_frame, read_data_frame, write_frame};
use crate::{CanError, RxAdapter, RxCloser, TxAdapter, VescFrame};
use ::socketcan::{CanFilter, CanSocket, Socket, SocketOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 只读适配器（用于监听线程）
pub struct SocketCanRxAdapter {
    socket: CanSocket,
    read_timeout: Duration,
}

impl SocketCanRxAdapter {
    /// 克隆 socket 并配置读超时与扩展帧过滤器
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 或配置失败
    pub fn new(socket: &CanSocket, read_timeout: Duration) -> Result<Self, CanError> {
        let rx_socket = socket
            .as_fd()
            .try_clone_to_owned()
            .map(CanSocket::from)
            .map_err(|e| {
                CanError::Io(io::Error::other(format!(
                    "Failed to clone SocketCAN socket for RX: {}",
                    e
                )))
            })?;

        rx_socket.set_read_timeout(read_timeout).map_err(|e| {
            CanError::Io(io::Error::other(format!(
                "Failed to set read timeout on RX socket: {}",
                e
            )))
        })?;

        Self::configure_hardware_filters(&rx_socket)?;

        Ok(Self {
            socket: rx_socket,
            read_timeout,
        })
    }

    /// 只接收扩展帧
    ///
    /// 标准帧不属于本协议，在内核里丢弃，减轻繁忙总线上的 CPU 占用。
    /// 设备 ID 不在这里过滤，交由解码器判断。
    fn configure_hardware_filters(socket: &CanSocket) -> Result<(), CanError> {
        let eff_flag = libc::CAN_EFF_FLAG;
        let filters = [CanFilter::new(eff_flag, eff_flag)];

        socket.set_filters(&filters).map_err(|e| {
            CanError::Io(io::Error::other(format!(
                "Failed to set hardware filters: {}",
                e
            )))
        })?;

        trace!("SocketCAN RX filter configured: extended frames only");
        Ok(())
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<VescFrame, CanError> {
        let can_frame = read_data_frame(&self.socket)?;
        let frame = from_can_frame(&can_frame);
        trace!(
            "RX: Received CAN frame: ID=0x{:X}, len={}",
            frame.id, frame.len
        );
        Ok(frame)
    }

    fn closer(&self) -> Option<Box<dyn RxCloser>> {
        match self.socket.as_fd().try_clone_to_owned() {
            Ok(fd) => Some(Box::new(SocketCanRxCloser { fd })),
            Err(e) => {
                warn!("Failed to clone RX socket for shutdown: {}", e);
                None
            },
        }
    }
}

/// SocketCAN RX 关闭句柄
///
/// 持有自己的 FD 副本，RX 半边先被 drop 也不会误关其他 socket。
/// 对同一打开文件描述执行 `shutdown(SHUT_RDWR)`。内核不支持时
/// （部分版本的 CAN_RAW 返回 `EOPNOTSUPP`），阻塞中的读在读超时到期后返回。
pub struct SocketCanRxCloser {
    fd: OwnedFd,
}

impl RxCloser for SocketCanRxCloser {
    fn close(&self) {
        let ret = unsafe { libc::shutdown(self.fd.as_raw_fd(), libc::SHUT_RDWR) };
        if ret != 0 {
            debug!(
                "shutdown() on RX socket failed ({}), waiting for read timeout",
                io::Error::last_os_error()
            );
        }
    }
}

/// 只写适配器（用于命令发送）
pub struct SocketCanTxAdapter {
    socket: CanSocket,
}

impl SocketCanTxAdapter {
    pub fn new(socket: CanSocket) -> Self {
        Self { socket }
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError> {
        write_frame(&self.socket, &frame)
    }
}
