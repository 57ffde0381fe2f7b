//! 命令定义和实现

pub mod monitor;

pub use monitor::MonitorCommand;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;
use vesc_driver::{DriverError, Vesc, VescBuilder, VescConfig};

/// 连接参数（命令行优先于配置文件）
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// CAN 接口（如 can0）
    #[arg(short, long, global = true)]
    pub interface: Option<String>,

    /// 设备 ID
    #[arg(short = 'd', long, global = true)]
    pub id: Option<u8>,

    /// 每转编码器 tick 数（goto 需要）
    #[arg(long, global = true)]
    pub ticks_per_rotation: Option<f64>,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// 合并配置文件与命令行参数，并校验
    pub fn resolve(&self) -> Result<VescConfig> {
        let mut config = match &self.config {
            Some(path) => VescConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => VescConfig::new("", 0),
        };

        if let Some(interface) = &self.interface {
            config.interface = interface.clone();
        }
        if let Some(id) = self.id {
            config.id = id;
        }
        if let Some(ticks) = self.ticks_per_rotation {
            config.ticks_per_rotation = ticks;
        }

        config.validate()?;
        Ok(config)
    }
}

/// 打开连接
pub fn connect(config: VescConfig) -> Result<Vesc> {
    info!(
        "Connecting to VESC ID {} on {}",
        config.id, config.interface
    );
    let vesc = VescBuilder::new()
        .config(config)
        .build()
        .context("failed to open VESC connection")?;
    Ok(vesc)
}

/// 执行单条命令，稍等片刻后报告设备是否在线
pub fn one_shot(
    vesc: &Vesc,
    name: &str,
    op: impl FnOnce() -> std::result::Result<(), DriverError>,
) -> Result<()> {
    op().with_context(|| format!("{} failed", name))?;
    info!("{} sent", name);

    thread::sleep(Duration::from_millis(100));
    if vesc.is_alive() {
        let status = vesc.status();
        println!(
            "rpm={} current={:.1}A duty={:.3} vin={:.1}V",
            status.rpm, status.current, status.duty_cycle, status.input_voltage
        );
    } else {
        println!("no telemetry from VESC ID {} yet", vesc.device_id());
    }
    Ok(())
}

/// 演示序列：占空比 0.25 → RPM 60 → 停止
pub fn demo(vesc: &Vesc) -> Result<()> {
    info!("Setting power");
    vesc.set_power(0.25)?;
    thread::sleep(Duration::from_secs(2));

    info!("Setting RPM");
    vesc.set_rpm(60.0)?;
    thread::sleep(Duration::from_secs(2));

    info!("Stopping");
    vesc.stop()?;
    Ok(())
}

/// 发送 Ping 并等待 Pong
pub fn ping(vesc: &Vesc) -> Result<()> {
    let before = vesc.metrics().pongs;
    vesc.ping()?;

    for _ in 0..50 {
        if vesc.metrics().pongs > before {
            println!("pong from VESC ID {}", vesc.device_id());
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    anyhow::bail!("no pong from VESC ID {} within 500ms", vesc.device_id())
}
