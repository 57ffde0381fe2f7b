//! 控制帧构建（命令编码器）
//!
//! 把高层电机命令编码为发往指定设备的 [`VescFrame`]。
//! 所有负载均为大端 32-bit 有符号整数（4 字节），
//! 电流限制命令为两个连续的 32-bit 字段（8 字节）。

use crate::constants::*;
use crate::ids::{CommandId, build_extended_id};
use crate::{ProtocolError, VescFrame, i32_to_bytes_be};

/// 电机命令
///
/// 参数均为物理量（比例、安培、RPM、编码器 tick），
/// 缩放与截断由 [`VescCommand::encode`] 完成。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VescCommand {
    /// 占空比，范围 [-1.0, 1.0]
    SetDuty(f64),
    /// 电机电流（A）
    SetCurrent(f64),
    /// 刹车电流（A）
    SetCurrentBrake(f64),
    /// 转速（电气 RPM，截断为 i32）
    SetRpm(f64),
    /// 目标位置（编码器 tick，截断为 i32）
    SetPosition(f64),
    /// 相对电流，范围 [-1.0, 1.0]
    SetCurrentRelative(f64),
    /// 相对刹车电流，范围 [-1.0, 1.0]
    SetCurrentBrakeRelative(f64),
    /// 电流限制（A）；`store` 为 true 时写入固件配置
    SetCurrentLimits { min: f64, max: f64, store: bool },
    /// Ping（零负载），设备以 Pong 应答
    Ping,
}

impl VescCommand {
    /// 命令对应的命令码
    pub fn command_id(&self) -> CommandId {
        match self {
            VescCommand::SetDuty(_) => CommandId::SetDuty,
            VescCommand::SetCurrent(_) => CommandId::SetCurrent,
            VescCommand::SetCurrentBrake(_) => CommandId::SetCurrentBrake,
            VescCommand::SetRpm(_) => CommandId::SetRpm,
            VescCommand::SetPosition(_) => CommandId::SetPos,
            VescCommand::SetCurrentRelative(_) => CommandId::SetCurrentRel,
            VescCommand::SetCurrentBrakeRelative(_) => CommandId::SetCurrentBrakeRel,
            VescCommand::SetCurrentLimits { store: false, .. } => CommandId::ConfCurrentLimits,
            VescCommand::SetCurrentLimits { store: true, .. } => CommandId::ConfStoreCurrentLimits,
            VescCommand::Ping => CommandId::Ping,
        }
    }

    /// 编码为发往 `device_id` 的扩展帧
    ///
    /// 负载宽度由 [`CommandId::payload_len`] 决定。
    ///
    /// # 错误
    /// - `ProtocolError::OutOfRange`: 相对量（占空比、相对电流）超出 [-1.0, 1.0]，
    ///   此时不会生成任何帧
    pub fn encode(&self, device_id: u8) -> Result<VescFrame, ProtocolError> {
        let command = self.command_id();
        let value = match *self {
            VescCommand::SetDuty(duty) => scale_relative("duty cycle", duty)?,
            VescCommand::SetCurrentRelative(ratio) => scale_relative("current ratio", ratio)?,
            VescCommand::SetCurrentBrakeRelative(ratio) => {
                scale_relative("brake current ratio", ratio)?
            },
            VescCommand::SetCurrent(amps) | VescCommand::SetCurrentBrake(amps) => {
                scale_current(amps)
            },
            // as 转换：向零截断，超出 i32 范围时饱和，NaN 为 0
            VescCommand::SetRpm(value) | VescCommand::SetPosition(value) => value as i32,
            VescCommand::SetCurrentLimits { min, max, .. } => {
                let mut payload = [0u8; 8];
                payload[0..4].copy_from_slice(&i32_to_bytes_be(scale_current(min)));
                payload[4..8].copy_from_slice(&i32_to_bytes_be(scale_current(max)));
                return encode_8_bytes(command, device_id, &payload);
            },
            VescCommand::Ping => 0,
        };
        encode_payload(command, device_id, &i32_to_bytes_be(value))
    }
}

/// 校验相对量并按 100000 缩放
///
/// NaN 不在区间内，同样被拒绝。
fn scale_relative(field: &'static str, value: f64) -> Result<i32, ProtocolError> {
    if !(RELATIVE_MIN..=RELATIVE_MAX).contains(&value) {
        return Err(ProtocolError::OutOfRange {
            field,
            value,
            min: RELATIVE_MIN,
            max: RELATIVE_MAX,
        });
    }
    Ok((value * RELATIVE_SCALE).round() as i32)
}

/// 安培 → 毫安
fn scale_current(amps: f64) -> i32 {
    (amps * CURRENT_SCALE).round() as i32
}

/// 按命令的负载宽度构建帧
///
/// # 错误
/// - `ProtocolError::InvalidLength`: `payload.len()` 与 `command.payload_len()` 不符
pub fn encode_payload(
    command: CommandId,
    device_id: u8,
    payload: &[u8],
) -> Result<VescFrame, ProtocolError> {
    let expected = command.payload_len();
    if payload.len() != expected {
        return Err(ProtocolError::InvalidLength {
            expected,
            actual: payload.len(),
        });
    }
    Ok(VescFrame::new_extended(
        build_extended_id(command, device_id),
        payload,
    ))
}

/// 构建 8 字节负载的命令帧
///
/// 供直接拼装负载的调用方使用，负载长度必须恰好为 8，
/// 且 `command` 必须是 8 字节命令。
///
/// # 错误
/// - `ProtocolError::InvalidLength`: `payload.len() != 8`，或命令不是 8 字节命令
pub fn encode_8_bytes(
    command: CommandId,
    device_id: u8,
    payload: &[u8],
) -> Result<VescFrame, ProtocolError> {
    if payload.len() != 8 {
        return Err(ProtocolError::InvalidLength {
            expected: 8,
            actual: payload.len(),
        });
    }
    encode_payload(command, device_id, payload)
}
