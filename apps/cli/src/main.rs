//! # VESC CLI
//!
//! VESC 电调命令行工具（SocketCAN）。
//!
//! ```bash
//! # 演示：占空比 0.25 → RPM 60 → 停止
//! vesc-cli --interface can0 --id 5 demo
//!
//! # 单条命令
//! vesc-cli --interface can0 --id 5 rpm 1500
//! vesc-cli --config vesc.toml goto 2.5
//!
//! # 监控遥测（Ctrl+C 退出）
//! vesc-cli --interface can0 --id 5 monitor --frequency 5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConnectionArgs, MonitorCommand};

/// VESC CLI - 电调命令行工具
#[derive(Parser, Debug)]
#[command(name = "vesc-cli")]
#[command(about = "Command-line interface for VESC motor controllers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 演示序列：占空比 0.25，2 秒后 RPM 60，再 2 秒后停止
    Demo,

    /// 设置占空比（-1.0 ~ 1.0）
    Power {
        #[arg(allow_negative_numbers = true)]
        duty: f64,
    },

    /// 设置转速（电气 RPM）
    Rpm {
        #[arg(allow_negative_numbers = true)]
        rpm: f64,
    },

    /// 设置电机电流（A）
    Current {
        #[arg(allow_negative_numbers = true)]
        amps: f64,
    },

    /// 设置刹车电流（A）
    Brake { amps: f64 },

    /// 转到绝对位置（圈，需要 ticks_per_rotation）
    Goto {
        #[arg(allow_negative_numbers = true)]
        revolutions: f64,
    },

    /// 停止（RPM 0 + 刹车）
    Stop,

    /// 发送 Ping
    Ping,

    /// 监控遥测
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vesc_cli=info,vesc_driver=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.connection.resolve()?;
    let vesc = commands::connect(config)?;

    match cli.command {
        Commands::Demo => commands::demo(&vesc),
        Commands::Power { duty } => commands::one_shot(&vesc, "power", || vesc.set_power(duty)),
        Commands::Rpm { rpm } => commands::one_shot(&vesc, "rpm", || vesc.set_rpm(rpm)),
        Commands::Current { amps } => {
            commands::one_shot(&vesc, "current", || vesc.set_current(amps))
        },
        Commands::Brake { amps } => {
            commands::one_shot(&vesc, "brake", || vesc.set_brake_current(amps))
        },
        Commands::Goto { revolutions } => {
            commands::one_shot(&vesc, "goto", || vesc.go_to(revolutions))
        },
        Commands::Stop => commands::one_shot(&vesc, "stop", || vesc.stop()),
        Commands::Ping => commands::ping(&vesc),
        Commands::Monitor { args } => args.execute(&vesc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_power() {
        let cli = Cli::try_parse_from(["vesc-cli", "--interface", "can0", "--id", "5", "power", "0.25"])
            .unwrap();
        assert_eq!(cli.connection.interface.as_deref(), Some("can0"));
        assert_eq!(cli.connection.id, Some(5));
        assert!(matches!(cli.command, Commands::Power { duty } if duty == 0.25));
    }

    #[test]
    fn test_parse_negative_rpm() {
        let cli = Cli::try_parse_from(["vesc-cli", "-i", "can0", "rpm", "-1500"]).unwrap();
        assert!(matches!(cli.command, Commands::Rpm { rpm } if rpm == -1500.0));
    }

    #[test]
    fn test_parse_monitor_defaults() {
        let cli = Cli::try_parse_from(["vesc-cli", "-i", "can0", "monitor"]).unwrap();
        match cli.command {
            Commands::Monitor { args } => {
                assert_eq!(args.frequency, 2);
                assert_eq!(args.count, None);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["vesc-cli", "-i", "can0"]).is_err());
    }
}
