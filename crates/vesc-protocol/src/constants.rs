//! 协议常量定义
//!
//! 所有缩放系数集中在这里，编码器和解码器都从这张表取值。
//! 出站：物理量 × 系数 → 整数；入站：整数 ÷ 系数 → 物理量。

// ============================================================================
// 出站（命令）缩放系数
// ============================================================================

/// 占空比 / 相对电流 / 相对刹车电流：比例 × 100000
pub const RELATIVE_SCALE: f64 = 100_000.0;

/// 电流类命令：安培 × 1000（毫安）
pub const CURRENT_SCALE: f64 = 1_000.0;

/// 相对量（占空比、相对电流）允许的下限
pub const RELATIVE_MIN: f64 = -1.0;

/// 相对量（占空比、相对电流）允许的上限
pub const RELATIVE_MAX: f64 = 1.0;

// ============================================================================
// 入站（状态帧）缩放系数
// ============================================================================

/// Status 1：电机电流，0.1 A 分辨率
pub const STATUS_CURRENT_SCALE: f64 = 10.0;

/// Status 1：占空比，0.001 分辨率
pub const STATUS_DUTY_SCALE: f64 = 1_000.0;

/// Status 2：安时（消耗/回充），0.0001 Ah 分辨率
pub const AMP_HOURS_SCALE: f64 = 10_000.0;

/// Status 3：瓦时（消耗/回充），0.0001 Wh 分辨率
pub const WATT_HOURS_SCALE: f64 = 10_000.0;

/// Status 4：MOSFET / 电机温度，0.1 °C 分辨率
pub const TEMP_SCALE: f64 = 10.0;

/// Status 4：输入侧电流，0.1 A 分辨率
pub const CURRENT_IN_SCALE: f64 = 10.0;

/// Status 4：PID 位置反馈，0.02 分辨率
pub const PID_POS_SCALE: f64 = 50.0;

/// Status 5：输入电压，0.1 V 分辨率
pub const INPUT_VOLTAGE_SCALE: f64 = 10.0;

/// 所有状态帧的最小负载长度
pub const STATUS_PAYLOAD_LEN: usize = 8;
