//! 监听线程主循环
//!
//! 状态机只有两个状态：RUNNING 和 STOPPED。
//!
//! - 每轮先检查 `is_running`，为 false 时退出，不再处理任何帧
//! - 读超时（`CanError::Timeout`）只是轮询节拍，静默进入下一轮
//! - 其他接收错误：若同时已请求退出，视为正常关闭；否则告警后继续
//! - 收到的帧交给解码器分类，状态帧写入缓存
//!
//! 监听线程从不关闭传输层。RX 半边随线程结束被 drop。

use crate::metrics::ListenerMetrics;
use crate::state::StatusWriter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use vesc_can::{CanError, RxAdapter, VescFrame};
use vesc_protocol::{ProtocolError, VescFeedback};

/// 接收错误后的退避时间，避免持续故障时刷屏
const RX_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// 监听循环
///
/// # 参数
/// - `rx`: RX 适配器（所有权转移到线程内）
/// - `writer`: 状态缓存的唯一写端
/// - `device_id`: 本连接的设备 ID
/// - `is_running`: 运行标志，置为 false 后循环在下一个轮询点退出
/// - `metrics`: 监听指标
pub fn listener_loop(
    mut rx: impl RxAdapter,
    writer: StatusWriter,
    device_id: u8,
    is_running: Arc<AtomicBool>,
    metrics: Arc<ListenerMetrics>,
) {
    debug!("Listener started for VESC ID {}", device_id);

    loop {
        // Acquire: 看到 false 时，关闭方之前的写入都可见
        if !is_running.load(Ordering::Acquire) {
            trace!("Listener: is_running flag is false, exiting");
            break;
        }

        let frame = match rx.receive() {
            Ok(frame) => {
                metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                frame
            },
            Err(CanError::Timeout) => continue,
            Err(e) => {
                if !is_running.load(Ordering::Acquire) {
                    trace!("Listener: receive error during shutdown ({}), exiting", e);
                    break;
                }
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Error receiving CAN frame: {}", e);
                std::thread::sleep(RX_ERROR_BACKOFF);
                continue;
            },
        };

        handle_frame(&frame, &writer, device_id, &metrics);
    }

    debug!("Listener stopped for VESC ID {}", device_id);
}

/// 分类并处理一个入站帧
///
/// 不属于本设备或格式不对的帧只计数（负载不足额外告警），从不向外报错。
pub fn handle_frame(
    frame: &VescFrame,
    writer: &StatusWriter,
    device_id: u8,
    metrics: &ListenerMetrics,
) {
    match VescFeedback::classify(frame, device_id) {
        Ok(Some(VescFeedback::Pong { sender })) => {
            metrics.pongs.fetch_add(1, Ordering::Relaxed);
            info!("Received PONG from VESC ID {}", sender);
        },
        Ok(Some(feedback)) => {
            writer.apply(&feedback);
            metrics.status_updates.fetch_add(1, Ordering::Relaxed);
            trace!("Status update: {:?}", feedback);
        },
        Ok(None) => {
            metrics.rx_frames_unhandled.fetch_add(1, Ordering::Relaxed);
            trace!("Ignoring unhandled frame ID=0x{:X}", frame.id);
        },
        Err(ProtocolError::NotExtended { .. }) => {
            metrics.rx_frames_standard.fetch_add(1, Ordering::Relaxed);
        },
        Err(ProtocolError::ForeignDevice { .. }) => {
            metrics.rx_frames_foreign.fetch_add(1, Ordering::Relaxed);
        },
        Err(ProtocolError::InvalidLength { actual, .. }) => {
            metrics.rx_frames_short.fetch_add(1, Ordering::Relaxed);
            warn!(
                "not enough data for command {} ({} bytes)",
                (frame.id >> 8) & 0xFF,
                actual
            );
        },
        Err(e) => {
            metrics.rx_frames_unhandled.fetch_add(1, Ordering::Relaxed);
            debug!("Ignoring frame ID=0x{:X}: {}", frame.id, e);
        },
    }
}
