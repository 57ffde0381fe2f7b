//! # VESC Protocol
//!
//! VESC 电调 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 命令码定义、29-bit 扩展帧 ID 的构建与拆分
//! - `constants`: 缩放系数与协议常量
//! - `control`: 控制帧构建（命令编码器）
//! - `feedback`: 状态帧解析（遥测解码器）
//!
//! ## 字节序
//!
//! 协议使用大端字节序（网络字节序）。
//!
//! ## 寻址
//!
//! 所有帧均为扩展帧（29-bit ID）：`(command_code << 8) | device_id`。
//! 同一总线上可以挂多个电调，低 8 位用于区分设备。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod ids;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;

/// CAN 2.0 帧的统一抽象
///
/// `VescFrame` 是协议层和硬件层之间的中间抽象：协议层只构建/解析 `VescFrame`，
/// 不依赖底层 CAN 实现（SocketCAN 或测试用的 mock 总线）。
///
/// ```text
/// Protocol Layer (vesc-protocol)
///     ↓ VescCommand::encode() 构建 / VescFeedback::classify() 解析
/// VescFrame (此类型)
///     ↓ 转换逻辑在 CAN 层实现
/// CAN Layer (vesc-can)
/// ```
///
/// # 设计特性
///
/// - **Copy**：固定 8 字节数据，无堆分配
/// - **时间戳**：`timestamp_us` 由适配器填充，0 表示不可用
///
/// # 示例
///
/// ```rust
/// use vesc_protocol::VescFrame;
///
/// let frame = VescFrame::new_extended(0x0905, &[1, 2, 3, 4]);
/// assert_eq!(frame.id(), 0x0905);
/// assert!(frame.is_extended);
/// assert_eq!(frame.data_slice(), &[1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VescFrame {
    /// CAN ID（标准帧 11-bit 或扩展帧 29-bit）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl VescFrame {
    /// 创建标准帧（ID 截取低 11 位）
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32 & STANDARD_ID_MASK, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id & EXTENDED_ID_MASK, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 获取完整数据（8字节固定数组）
    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }
}

use thiserror::Error;

/// 协议错误类型
///
/// 编码侧的错误（`OutOfRange`、`InvalidLength`）属于调用方参数校验错误；
/// 解码侧的错误只用于分类“这不是我们的帧”，驱动层不会把它们上抛给调用者。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown command code: {code}")]
    UnknownCommand { code: u8 },

    #[error("Frame from device {actual}, expected device {expected}")]
    ForeignDevice { expected: u8, actual: u8 },

    #[error("Not an extended frame: ID 0x{id:X}")]
    NotExtended { id: u32 },
}

/// 大端字节序转 i32
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// i32 转大端字节序
pub fn i32_to_bytes_be(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

/// 从 8 字节负载的指定偏移读取大端 i32
#[inline]
pub(crate) fn read_i32_at(data: &[u8; 8], offset: usize) -> i32 {
    bytes_to_i32_be([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// 从 8 字节负载的指定偏移读取大端 i16
#[inline]
pub(crate) fn read_i16_at(data: &[u8; 8], offset: usize) -> i16 {
    bytes_to_i16_be([data[offset], data[offset + 1]])
}
