//! Mock CAN 总线（无硬件依赖）
//!
//! 测试通过 [`MockBus`] 句柄观察出站帧、注入入站帧、模拟收发故障；
//! [`MockCanAdapter`] 实现与 SocketCAN 相同的 trait，可直接交给驱动层。
//!
//! ```
//! use vesc_can::{CanAdapter, MockCanAdapter, VescFrame};
//!
//! let (mut adapter, bus) = MockCanAdapter::new();
//! adapter.send(VescFrame::new_extended(0x0005, &[0; 4])).unwrap();
//! assert_eq!(bus.sent_frames().len(), 1);
//! ```

use crate::{
    CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, RxAdapter, RxCloser,
    SplittableAdapter, TxAdapter, VescFrame,
};
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Mock 适配器的默认读超时
pub const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(2);

struct BusInner {
    sent: Mutex<Vec<VescFrame>>,
    inbound_tx: Sender<Result<VescFrame, CanError>>,
    fail_send: AtomicBool,
    receive_calls: AtomicU64,
    /// drop 后 `close_rx` 断开，唤醒阻塞中的 `receive`
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
}

/// 测试侧的总线句柄（可克隆）
#[derive(Clone)]
pub struct MockBus {
    inner: Arc<BusInner>,
}

impl MockBus {
    /// 注入一个入站帧，监听线程下一次 `receive` 时取走
    pub fn inject(&self, frame: VescFrame) {
        let _ = self.inner.inbound_tx.send(Ok(frame));
    }

    /// 注入一次接收错误
    pub fn inject_error(&self, error: CanError) {
        let _ = self.inner.inbound_tx.send(Err(error));
    }

    /// 所有已发送帧的副本（按发送顺序）
    pub fn sent_frames(&self) -> Vec<VescFrame> {
        self.inner.sent.lock().clone()
    }

    /// 已发送帧数量
    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }

    /// 清空发送记录
    pub fn clear_sent(&self) {
        self.inner.sent.lock().clear();
    }

    /// 之后的发送全部失败（`CanError::Device`，Backend）
    pub fn set_fail_send(&self, fail: bool) {
        self.inner.fail_send.store(fail, Ordering::Relaxed);
    }

    /// `receive` 被调用的次数（含超时）
    pub fn receive_calls(&self) -> u64 {
        self.inner.receive_calls.load(Ordering::Relaxed)
    }

    /// RX 是否已被关闭
    pub fn is_rx_closed(&self) -> bool {
        self.inner.close_tx.lock().is_none()
    }
}

fn mock_send(inner: &BusInner, frame: VescFrame) -> Result<(), CanError> {
    if inner.fail_send.load(Ordering::Relaxed) {
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Backend,
            "mock send failure",
        )));
    }
    inner.sent.lock().push(frame);
    Ok(())
}

fn mock_receive(
    inner: &BusInner,
    inbound: &Receiver<Result<VescFrame, CanError>>,
    timeout: Duration,
) -> Result<VescFrame, CanError> {
    inner.receive_calls.fetch_add(1, Ordering::Relaxed);
    select! {
        recv(inbound) -> msg => msg.unwrap_or(Err(CanError::Closed)),
        recv(inner.close_rx) -> _ => Err(CanError::Closed),
        default(timeout) => Err(CanError::Timeout),
    }
}

/// Mock 适配器
pub struct MockCanAdapter {
    inner: Arc<BusInner>,
    inbound: Receiver<Result<VescFrame, CanError>>,
    read_timeout: Duration,
}

impl MockCanAdapter {
    /// 创建适配器及其测试句柄
    pub fn new() -> (Self, MockBus) {
        let (inbound_tx, inbound) = unbounded();
        let (close_tx, close_rx) = bounded(0);
        let inner = Arc::new(BusInner {
            sent: Mutex::new(Vec::new()),
            inbound_tx,
            fail_send: AtomicBool::new(false),
            receive_calls: AtomicU64::new(0),
            close_tx: Mutex::new(Some(close_tx)),
            close_rx,
        });
        let adapter = Self {
            inner: inner.clone(),
            inbound,
            read_timeout: MOCK_READ_TIMEOUT,
        };
        (adapter, MockBus { inner })
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError> {
        mock_send(&self.inner, frame)
    }

    fn receive(&mut self) -> Result<VescFrame, CanError> {
        mock_receive(&self.inner, &self.inbound, self.read_timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl SplittableAdapter for MockCanAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx = MockRxAdapter {
            inner: self.inner.clone(),
            inbound: self.inbound,
            read_timeout: self.read_timeout,
        };
        let tx = MockTxAdapter { inner: self.inner };
        Ok((rx, tx))
    }
}

/// Mock RX 半边
pub struct MockRxAdapter {
    inner: Arc<BusInner>,
    inbound: Receiver<Result<VescFrame, CanError>>,
    read_timeout: Duration,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self) -> Result<VescFrame, CanError> {
        mock_receive(&self.inner, &self.inbound, self.read_timeout)
    }

    fn closer(&self) -> Option<Box<dyn RxCloser>> {
        Some(Box::new(MockRxCloser {
            inner: self.inner.clone(),
        }))
    }
}

/// Mock RX 关闭句柄
pub struct MockRxCloser {
    inner: Arc<BusInner>,
}

impl RxCloser for MockRxCloser {
    fn close(&self) {
        self.inner.close_tx.lock().take();
    }
}

/// Mock TX 半边
pub struct MockTxAdapter {
    inner: Arc<BusInner>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, frame: VescFrame) -> Result<(), CanError> {
        mock_send(&self.inner, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_records_frames() {
        let (mut adapter, bus) = MockCanAdapter::new();
        let frame = VescFrame::new_extended(0x0105, &[0, 0, 0x03, 0xE8]);
        adapter.send(frame).unwrap();
        assert_eq!(bus.sent_frames(), vec![frame]);

        bus.clear_sent();
        assert_eq!(bus.sent_count(), 0);
    }

    #[test]
    fn test_fail_send() {
        let (mut adapter, bus) = MockCanAdapter::new();
        bus.set_fail_send(true);
        let err = adapter.send(VescFrame::new_extended(0x0005, &[0; 4])).unwrap_err();
        assert!(matches!(err, CanError::Device(_)));
        assert_eq!(bus.sent_count(), 0);
    }

    #[test]
    fn test_receive_timeout_then_injected() {
        let (adapter, bus) = MockCanAdapter::new();
        let (mut rx, _tx) = adapter.split().unwrap();

        assert!(matches!(rx.receive(), Err(CanError::Timeout)));

        let frame = VescFrame::new_extended(0x0905, &[1; 8]);
        bus.inject(frame);
        assert_eq!(rx.receive().unwrap(), frame);

        bus.inject_error(CanError::BusOff);
        assert!(matches!(rx.receive(), Err(CanError::BusOff)));
        assert_eq!(bus.receive_calls(), 3);
    }

    #[test]
    fn test_closer_wakes_blocked_receive() {
        let (mut adapter, bus) = MockCanAdapter::new();
        adapter.set_receive_timeout(Duration::from_secs(60));
        let (mut rx, _tx) = adapter.split().unwrap();
        let closer = rx.closer().unwrap();

        let handle = std::thread::spawn(move || rx.receive());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!bus.is_rx_closed());

        let start = std::time::Instant::now();
        closer.close();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(CanError::Closed)), "{:?}", result);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(bus.is_rx_closed());

        // 重复关闭无副作用
        closer.close();
    }

    #[test]
    fn test_split_halves_share_bus() {
        let (adapter, bus) = MockCanAdapter::new();
        let (_rx, mut tx) = adapter.split().unwrap();
        tx.send(VescFrame::new_extended(0x1105, &[0; 4])).unwrap();
        assert_eq!(bus.sent_count(), 1);
    }
}
