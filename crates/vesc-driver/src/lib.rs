//! # VESC Driver
//!
//! VESC 电调的连接层：
//!
//! - 后台监听线程：接收状态帧并写入遥测缓存
//! - 遥测缓存：互斥锁保护的快照，写端唯一、读端可克隆
//! - 命令接口：参数校验 → 编码 → 同步发送
//!
//! ```no_run
//! use vesc_driver::{VescBuilder, VescConfig};
//!
//! let config = VescConfig::load("vesc.toml").unwrap();
//! let vesc = VescBuilder::new().config(config).build().unwrap();
//!
//! vesc.set_power(0.25).unwrap();
//! if vesc.is_alive() {
//!     println!("rpm = {}", vesc.status().rpm);
//! }
//! ```

mod builder;
mod config;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod state;
mod vesc;

pub use builder::VescBuilder;
pub use config::VescConfig;
pub use error::{ConfigError, DriverError};
pub use metrics::{ListenerMetrics, MetricsSnapshot};
pub use pipeline::{handle_frame, listener_loop};
pub use state::{LIVENESS_WINDOW, StatusCache, StatusReader, StatusWriter, TelemetryStatus};
pub use vesc::{MotorProperties, STOP_BRAKE_CURRENT, Vesc};

// 重新导出下层常用类型
pub use vesc_can::{CanError, VescFrame};
pub use vesc_protocol::{ProtocolError, VescCommand, VescFeedback};
