//! 命令码与 CAN ID 定义
//!
//! VESC 使用 29-bit 扩展帧 ID：
//!
//! ```text
//! Bits 28-16: 0（未使用）
//! Bits 15-8:  命令码（8 bits）
//! Bits 7-0:   设备 ID（8 bits）
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 29-bit 扩展帧 ID 掩码
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// 11-bit 标准帧 ID 掩码
pub const STANDARD_ID_MASK: u32 = 0x7FF;

/// 命令码枚举（`CAN_PACKET_*`）
///
/// 完整列出固件定义的命令码；本库只构建/解析其中一部分，
/// 见 `control` 和 `feedback` 模块。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CommandId {
    SetDuty = 0,
    SetCurrent = 1,
    SetCurrentBrake = 2,
    SetRpm = 3,
    SetPos = 4,
    FillRxBuffer = 5,
    FillRxBufferLong = 6,
    ProcessRxBuffer = 7,
    ProcessShortBuffer = 8,
    Status = 9,
    SetCurrentRel = 10,
    SetCurrentBrakeRel = 11,
    SetCurrentHandbrake = 12,
    SetCurrentHandbrakeRel = 13,
    Status2 = 14,
    Status3 = 15,
    Status4 = 16,
    Ping = 17,
    Pong = 18,
    DetectApplyAllFoc = 19,
    DetectApplyAllFocRes = 20,
    ConfCurrentLimits = 21,
    ConfStoreCurrentLimits = 22,
    ConfCurrentLimitsIn = 23,
    ConfStoreCurrentLimitsIn = 24,
    ConfFocErpms = 25,
    ConfStoreFocErpms = 26,
    Status5 = 27,
}

impl CommandId {
    /// 命令码数值
    #[inline]
    pub fn code(self) -> u8 {
        self.into()
    }

    /// 出站负载宽度（字节）
    ///
    /// 电流限制类配置命令携带两个 32-bit 字段，其余命令为单个 32-bit 字段。
    pub fn payload_len(self) -> usize {
        match self {
            CommandId::ConfCurrentLimits
            | CommandId::ConfStoreCurrentLimits
            | CommandId::ConfCurrentLimitsIn
            | CommandId::ConfStoreCurrentLimitsIn
            | CommandId::ConfFocErpms
            | CommandId::ConfStoreFocErpms => 8,
            _ => 4,
        }
    }
}

/// 构建 29-bit 扩展帧 ID：`(command << 8) | device_id`
#[inline]
pub fn build_extended_id(command: CommandId, device_id: u8) -> u32 {
    ((command.code() as u32) << 8) | device_id as u32
}

/// 拆分扩展帧 ID，返回 `(command_code, device_id)`
///
/// 命令码以原始 `u8` 返回，未知命令码由调用方决定如何处理。
#[inline]
pub fn split_extended_id(id: u32) -> (u8, u8) {
    (((id >> 8) & 0xFF) as u8, (id & 0xFF) as u8)
}
