//! 遥测监控命令

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use vesc_driver::{MetricsSnapshot, Vesc};

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 刷新频率（Hz）
    #[arg(short, long, default_value_t = 2)]
    pub frequency: u32,

    /// 打印次数后退出（默认直到 Ctrl+C）
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

impl MonitorCommand {
    pub fn execute(&self, vesc: &Vesc) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
            println!("\n收到退出信号，正在关闭...");
        })?;

        println!("📊 监控 VESC ID {} ({} Hz)", vesc.device_id(), self.frequency);
        println!("按 Ctrl+C 停止\n");

        let interval = self.interval();
        let mut iteration = 0u64;
        while running.load(Ordering::SeqCst) {
            iteration += 1;
            print_telemetry(iteration, vesc.is_alive(), &vesc.telemetry(), &vesc.metrics());

            if self.count.is_some_and(|n| iteration >= n) {
                break;
            }
            std::thread::sleep(interval);
        }

        println!("✅ 监控已结束");
        Ok(())
    }

    fn interval(&self) -> Duration {
        if self.frequency > 0 {
            Duration::from_secs_f64(1.0 / self.frequency as f64)
        } else {
            Duration::from_secs(1)
        }
    }
}

fn print_telemetry(
    iteration: u64,
    alive: bool,
    telemetry: &[(&'static str, f64)],
    metrics: &MetricsSnapshot,
) {
    println!(
        "[{}] {}",
        iteration,
        if alive { "alive" } else { "no telemetry" }
    );
    for (name, value) in telemetry {
        println!("  {:<20} {:>12.4}", name, value);
    }
    println!(
        "  frames: total={} status={} dropped={} errors={}\n",
        metrics.rx_frames_total,
        metrics.status_updates,
        metrics.rx_frames_dropped(),
        metrics.rx_errors
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval() {
        let cmd = MonitorCommand {
            frequency: 4,
            count: None,
        };
        assert_eq!(cmd.interval(), Duration::from_millis(250));

        let cmd = MonitorCommand {
            frequency: 0,
            count: Some(1),
        };
        assert_eq!(cmd.interval(), Duration::from_secs(1));
    }
}
