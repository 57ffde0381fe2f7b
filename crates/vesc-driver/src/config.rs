//! 连接配置
//!
//! 由上层应用提供：CAN 接口名、设备 ID、可选的 ticks_per_rotation。
//!
//! ```toml
//! interface = "can0"
//! id = 5
//! ticks_per_rotation = 4096.0
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// VESC 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VescConfig {
    /// CAN 接口名（如 "can0"），必填
    pub interface: String,

    /// 设备 ID（CAN 扩展帧 ID 的低 8 位）
    #[serde(default)]
    pub id: u8,

    /// 每转编码器 tick 数，0 表示未设置
    ///
    /// 只有位置相关操作（`position`、`go_to`、`go_for`）需要。
    #[serde(default)]
    pub ticks_per_rotation: f64,
}

impl VescConfig {
    pub fn new(interface: impl Into<String>, id: u8) -> Self {
        Self {
            interface: interface.into(),
            id,
            ticks_per_rotation: 0.0,
        }
    }

    pub fn with_ticks_per_rotation(mut self, ticks: f64) -> Self {
        self.ticks_per_rotation = ticks;
        self
    }

    /// 校验配置
    ///
    /// # 错误
    /// - `ConfigError::MissingInterface`: 接口名为空
    /// - `ConfigError::InvalidTicksPerRotation`: 负数、NaN 或无穷大
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interface.trim().is_empty() {
            return Err(ConfigError::MissingInterface);
        }
        if !self.ticks_per_rotation.is_finite() || self.ticks_per_rotation < 0.0 {
            return Err(ConfigError::InvalidTicksPerRotation(self.ticks_per_rotation));
        }
        Ok(())
    }

    /// 已设置的 ticks_per_rotation
    ///
    /// # 错误
    /// - `ConfigError::MissingTicksPerRotation`: 值为 0（未设置）
    pub fn ticks_per_rotation(&self) -> Result<f64, ConfigError> {
        if self.ticks_per_rotation == 0.0 {
            return Err(ConfigError::MissingTicksPerRotation);
        }
        Ok(self.ticks_per_rotation)
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
