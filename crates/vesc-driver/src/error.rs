//! 驱动层错误类型定义

use std::path::PathBuf;
use thiserror::Error;
use vesc_can::CanError;
use vesc_protocol::ProtocolError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 传输错误（原样透传，不重试）
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 参数校验错误（未发送任何帧）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 监听线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("need an interface")]
    MissingInterface,

    /// 位置相关操作需要 ticks_per_rotation
    #[error("need ticks_per_rotation")]
    MissingTicksPerRotation,

    #[error("ticks_per_rotation must be a finite, non-negative number, got {0}")]
    InvalidTicksPerRotation(f64),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let msg = DriverError::Can(CanError::BusOff).to_string();
        assert!(msg.contains("CAN") && msg.contains("Bus off"), "{}", msg);

        let msg = DriverError::from(ProtocolError::OutOfRange {
            field: "duty cycle",
            value: 1.5,
            min: -1.0,
            max: 1.0,
        })
        .to_string();
        assert!(msg.contains("duty cycle"), "{}", msg);

        let msg = DriverError::from(ConfigError::MissingTicksPerRotation).to_string();
        assert!(msg.contains("need ticks_per_rotation"), "{}", msg);

        let msg = DriverError::IoThread("spawn failed".to_string()).to_string();
        assert!(msg.contains("IO thread") && msg.contains("spawn failed"));
    }

    #[test]
    fn test_from_can_error_is_verbatim() {
        let driver_error: DriverError = CanError::Closed.into();
        assert!(matches!(driver_error, DriverError::Can(CanError::Closed)));
    }

    #[test]
    fn test_config_io_error_names_path() {
        let err = ConfigError::Io {
            path: PathBuf::from("/etc/vesc.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/etc/vesc.toml"));
    }
}
