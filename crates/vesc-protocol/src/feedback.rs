//! 状态帧结构体定义（遥测解码器）
//!
//! 五种状态帧（Status, Status2..Status5），每种帧携带固定偏移的大端字段。
//! 结构体保存原始整数，通过方法换算为物理量，缩放系数见 `constants` 模块。
//!
//! | 命令码 | 帧 | 布局（8 字节） |
//! |---|---|---|
//! | 9  | Status  | `[RPM:i32][Current:i16][Duty:i16]` |
//! | 14 | Status2 | `[AmpHours:i32][AmpHoursCharged:i32]` |
//! | 15 | Status3 | `[WattHours:i32][WattHoursCharged:i32]` |
//! | 16 | Status4 | `[FetTemp:i16][MotorTemp:i16][CurrentIn:i16][PidPos:i16]` |
//! | 27 | Status5 | `[Tachometer:i32][InputVoltage:i16][保留:2]` |

use crate::constants::*;
use crate::ids::{CommandId, split_extended_id};
use crate::{ProtocolError, VescFrame, read_i16_at, read_i32_at};

/// 校验命令码与负载长度（状态帧通用）
fn check_status_frame(frame: &VescFrame, expected: CommandId) -> Result<(), ProtocolError> {
    let (code, _) = split_extended_id(frame.id);
    if code != expected.code() {
        return Err(ProtocolError::UnknownCommand { code });
    }
    if (frame.len as usize) < STATUS_PAYLOAD_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: STATUS_PAYLOAD_LEN,
            actual: frame.len as usize,
        });
    }
    Ok(())
}

// ============================================================================
// Status 1: 转速 / 电流 / 占空比
// ============================================================================

/// 状态帧 1（命令码 9）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFeedback1 {
    /// Byte 0-3: 转速（电气 RPM）
    pub rpm: i32,
    /// Byte 4-5: 电机电流，单位 0.1 A
    pub current_raw: i16,
    /// Byte 6-7: 占空比，单位 0.001
    pub duty_raw: i16,
}

impl StatusFeedback1 {
    /// 电机电流（A）
    pub fn current(&self) -> f64 {
        self.current_raw as f64 / STATUS_CURRENT_SCALE
    }

    /// 占空比（-1.0 ~ 1.0）
    pub fn duty_cycle(&self) -> f64 {
        self.duty_raw as f64 / STATUS_DUTY_SCALE
    }
}

impl TryFrom<VescFrame> for StatusFeedback1 {
    type Error = ProtocolError;

    fn try_from(frame: VescFrame) -> Result<Self, Self::Error> {
        check_status_frame(&frame, CommandId::Status)?;
        Ok(Self {
            rpm: read_i32_at(&frame.data, 0),
            current_raw: read_i16_at(&frame.data, 4),
            duty_raw: read_i16_at(&frame.data, 6),
        })
    }
}

// ============================================================================
// Status 2: 安时
// ============================================================================

/// 状态帧 2（命令码 14）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFeedback2 {
    /// Byte 0-3: 消耗安时，单位 0.0001 Ah
    pub amp_hours_raw: i32,
    /// Byte 4-7: 回充安时，单位 0.0001 Ah
    pub amp_hours_charged_raw: i32,
}

impl StatusFeedback2 {
    pub fn amp_hours(&self) -> f64 {
        self.amp_hours_raw as f64 / AMP_HOURS_SCALE
    }

    pub fn amp_hours_charged(&self) -> f64 {
        self.amp_hours_charged_raw as f64 / AMP_HOURS_SCALE
    }
}

impl TryFrom<VescFrame> for StatusFeedback2 {
    type Error = ProtocolError;

    fn try_from(frame: VescFrame) -> Result<Self, Self::Error> {
        check_status_frame(&frame, CommandId::Status2)?;
        Ok(Self {
            amp_hours_raw: read_i32_at(&frame.data, 0),
            amp_hours_charged_raw: read_i32_at(&frame.data, 4),
        })
    }
}

// ============================================================================
// Status 3: 瓦时
// ============================================================================

/// 状态帧 3（命令码 15）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFeedback3 {
    /// Byte 0-3: 消耗瓦时，单位 0.0001 Wh
    pub watt_hours_raw: i32,
    /// Byte 4-7: 回充瓦时，单位 0.0001 Wh
    pub watt_hours_charged_raw: i32,
}

impl StatusFeedback3 {
    pub fn watt_hours(&self) -> f64 {
        self.watt_hours_raw as f64 / WATT_HOURS_SCALE
    }

    pub fn watt_hours_charged(&self) -> f64 {
        self.watt_hours_charged_raw as f64 / WATT_HOURS_SCALE
    }
}

impl TryFrom<VescFrame> for StatusFeedback3 {
    type Error = ProtocolError;

    fn try_from(frame: VescFrame) -> Result<Self, Self::Error> {
        check_status_frame(&frame, CommandId::Status3)?;
        Ok(Self {
            watt_hours_raw: read_i32_at(&frame.data, 0),
            watt_hours_charged_raw: read_i32_at(&frame.data, 4),
        })
    }
}

// ============================================================================
// Status 4: 温度 / 输入电流 / PID 位置
// ============================================================================

/// 状态帧 4（命令码 16）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFeedback4 {
    /// Byte 0-1: MOSFET 温度，单位 0.1 °C
    pub fet_temp_raw: i16,
    /// Byte 2-3: 电机温度，单位 0.1 °C
    pub motor_temp_raw: i16,
    /// Byte 4-5: 输入侧电流，单位 0.1 A
    pub current_in_raw: i16,
    /// Byte 6-7: PID 位置反馈，单位 0.02
    pub pid_pos_raw: i16,
}

impl StatusFeedback4 {
    pub fn fet_temp(&self) -> f64 {
        self.fet_temp_raw as f64 / TEMP_SCALE
    }

    pub fn motor_temp(&self) -> f64 {
        self.motor_temp_raw as f64 / TEMP_SCALE
    }

    pub fn current_in(&self) -> f64 {
        self.current_in_raw as f64 / CURRENT_IN_SCALE
    }

    pub fn pid_pos(&self) -> f64 {
        self.pid_pos_raw as f64 / PID_POS_SCALE
    }
}

impl TryFrom<VescFrame> for StatusFeedback4 {
    type Error = ProtocolError;

    fn try_from(frame: VescFrame) -> Result<Self, Self::Error> {
        check_status_frame(&frame, CommandId::Status4)?;
        Ok(Self {
            fet_temp_raw: read_i16_at(&frame.data, 0),
            motor_temp_raw: read_i16_at(&frame.data, 2),
            current_in_raw: read_i16_at(&frame.data, 4),
            pid_pos_raw: read_i16_at(&frame.data, 6),
        })
    }
}

// ============================================================================
// Status 5: 转速计 / 输入电压
// ============================================================================

/// 状态帧 5（命令码 27）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFeedback5 {
    /// Byte 0-3: 转速计计数
    pub tachometer: i32,
    /// Byte 4-5: 输入电压，单位 0.1 V
    pub input_voltage_raw: i16,
}

impl StatusFeedback5 {
    pub fn input_voltage(&self) -> f64 {
        self.input_voltage_raw as f64 / INPUT_VOLTAGE_SCALE
    }
}

impl TryFrom<VescFrame> for StatusFeedback5 {
    type Error = ProtocolError;

    fn try_from(frame: VescFrame) -> Result<Self, Self::Error> {
        check_status_frame(&frame, CommandId::Status5)?;
        Ok(Self {
            tachometer: read_i32_at(&frame.data, 0),
            input_voltage_raw: read_i16_at(&frame.data, 4),
        })
    }
}

// ============================================================================
// 入站帧分类
// ============================================================================

/// 已识别的入站帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VescFeedback {
    Status1(StatusFeedback1),
    Status2(StatusFeedback2),
    Status3(StatusFeedback3),
    Status4(StatusFeedback4),
    Status5(StatusFeedback5),
    /// Ping 应答，不携带遥测数据
    Pong { sender: u8 },
}

impl VescFeedback {
    /// 分类并解析一个入站帧
    ///
    /// # 返回值
    /// - `Ok(Some(_))`: 本设备的状态帧或 Pong
    /// - `Ok(None)`: 本设备的帧，但命令码未知或本库不处理
    /// - `Err(ProtocolError::NotExtended)`: 标准帧，不属于本协议
    /// - `Err(ProtocolError::ForeignDevice)`: 总线上其他设备的帧
    /// - `Err(ProtocolError::InvalidLength)`: 负载不足 8 字节
    ///
    /// 以上错误仅用于分类，调用方应丢弃对应的帧而不是中止。
    pub fn classify(frame: &VescFrame, device_id: u8) -> Result<Option<Self>, ProtocolError> {
        if !frame.is_extended {
            return Err(ProtocolError::NotExtended { id: frame.id });
        }

        let (code, sender) = split_extended_id(frame.id);
        if sender != device_id {
            return Err(ProtocolError::ForeignDevice {
                expected: device_id,
                actual: sender,
            });
        }

        // 所有已识别的命令族都要求 8 字节负载（Pong 按固件行为同样检查）
        if (frame.len as usize) < STATUS_PAYLOAD_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: STATUS_PAYLOAD_LEN,
                actual: frame.len as usize,
            });
        }

        let command = match CommandId::try_from(code) {
            Ok(command) => command,
            Err(_) => return Ok(None),
        };

        let feedback = match command {
            CommandId::Status => Self::Status1(StatusFeedback1::try_from(*frame)?),
            CommandId::Status2 => Self::Status2(StatusFeedback2::try_from(*frame)?),
            CommandId::Status3 => Self::Status3(StatusFeedback3::try_from(*frame)?),
            CommandId::Status4 => Self::Status4(StatusFeedback4::try_from(*frame)?),
            CommandId::Status5 => Self::Status5(StatusFeedback5::try_from(*frame)?),
            CommandId::Pong => Self::Pong { sender },
            _ => return Ok(None),
        };
        Ok(Some(feedback))
    }

    /// 对应的命令码
    pub fn command_id(&self) -> CommandId {
        match self {
            Self::Status1(_) => CommandId::Status,
            Self::Status2(_) => CommandId::Status2,
            Self::Status3(_) => CommandId::Status3,
            Self::Status4(_) => CommandId::Status4,
            Self::Status5(_) => CommandId::Status5,
            Self::Pong { .. } => CommandId::Pong,
        }
    }
}
