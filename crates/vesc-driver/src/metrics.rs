//! 监听线程指标
//!
//! 原子计数器，监听线程写入，任何线程都可以无锁读取。
//! 计数器只用于观测，不影响任何行为。

use std::sync::atomic::{AtomicU64, Ordering};

/// 监听线程实时指标
///
/// ```rust
/// use vesc_driver::ListenerMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = ListenerMetrics::new();
/// metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// 收到的总帧数
    pub rx_frames_total: AtomicU64,

    /// 标准帧（非本协议，已丢弃）
    pub rx_frames_standard: AtomicU64,

    /// 其他设备的帧（已丢弃）
    pub rx_frames_foreign: AtomicU64,

    /// 负载不足 8 字节的帧（已丢弃并告警）
    pub rx_frames_short: AtomicU64,

    /// 本设备但命令码未知或不处理的帧
    pub rx_frames_unhandled: AtomicU64,

    /// 成功写入缓存的状态帧数
    pub status_updates: AtomicU64,

    /// 收到的 Pong 数
    pub pongs: AtomicU64,

    /// 接收错误次数（不含读超时）
    pub rx_errors: AtomicU64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_standard: self.rx_frames_standard.load(Ordering::Relaxed),
            rx_frames_foreign: self.rx_frames_foreign.load(Ordering::Relaxed),
            rx_frames_short: self.rx_frames_short.load(Ordering::Relaxed),
            rx_frames_unhandled: self.rx_frames_unhandled.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            pongs: self.pongs.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_frames_standard: u64,
    pub rx_frames_foreign: u64,
    pub rx_frames_short: u64,
    pub rx_frames_unhandled: u64,
    pub status_updates: u64,
    pub pongs: u64,
    pub rx_errors: u64,
}

impl MetricsSnapshot {
    /// 被丢弃的帧数（标准帧、其他设备、负载不足）
    pub fn rx_frames_dropped(&self) -> u64 {
        self.rx_frames_standard + self.rx_frames_foreign + self.rx_frames_short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        assert_eq!(ListenerMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = ListenerMetrics::new();
        metrics.rx_frames_total.fetch_add(10, Ordering::Relaxed);
        metrics.rx_frames_foreign.fetch_add(3, Ordering::Relaxed);
        metrics.rx_frames_short.fetch_add(1, Ordering::Relaxed);
        metrics.status_updates.fetch_add(6, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames_total, 10);
        assert_eq!(snapshot.status_updates, 6);
        assert_eq!(snapshot.rx_frames_dropped(), 4);
    }

    #[test]
    fn test_metrics_concurrent() {
        let metrics = Arc::new(ListenerMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.pongs.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().pongs, 4000);
    }
}
