//! # Memory Backpressure
//!
//! Samples system memory on a fixed interval and flips the shared
//! [`PauseFlag`] with hysteresis:
//!
//! ```text
//! used ≥ high  and running  → pause
//! used ≤ low   and paused   → resume
//! otherwise                 → no change
//! ```
//!
//! A sample that can't be read leaves the flag alone.

use std::time::Duration;

use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ReceiptError, Result};
use crate::pipeline::PauseFlag;

/// Default sampling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Pause and resume thresholds in percent of total memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Watermarks {
    high: f32,
    low: f32,
}

impl Watermarks {
    /// ## Errors
    ///
    /// `Config` unless `0 ≤ low < high ≤ 100`.
    pub fn new(high: f32, low: f32) -> Result<Self> {
        if !(0.0..=100.0).contains(&high) || !(0.0..=100.0).contains(&low) {
            return Err(ReceiptError::Config(format!(
                "memory thresholds must be percentages, got high={} low={}",
                high, low
            )));
        }
        if low >= high {
            return Err(ReceiptError::Config(format!(
                "resume threshold ({}%) must be below the pause threshold ({}%)",
                low, high
            )));
        }
        Ok(Self { high, low })
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn low(&self) -> f32 {
        self.low
    }
}

impl Default for Watermarks {
    fn default() -> Self {
        Self {
            high: 80.0,
            low: 70.0,
        }
    }
}

/// Source of memory utilization samples.
pub trait MemoryProbe: Send {
    /// Percent of memory in use, or `None` when it can't be read.
    fn used_percent(&mut self) -> Option<f32>;
}

/// Reads memory through `sysinfo`, falling back to `/proc/meminfo`.
pub struct SystemMemory {
    sys: System,
}

impl SystemMemory {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            sys: System::new_with_specifics(refresh),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemory {
    fn used_percent(&mut self) -> Option<f32> {
        self.sys.refresh_memory();
        used_percent(self.sys.total_memory(), self.sys.available_memory())
            .or_else(|| std::fs::read_to_string("/proc/meminfo").ok().and_then(|s| parse_meminfo(&s)))
    }
}

/// `(total − available) / total × 100`
fn used_percent(total: u64, available: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available);
    Some((used as f64 / total as f64 * 100.0) as f32)
}

/// Utilization from the `MemTotal` and `MemAvailable` lines of `/proc/meminfo`.
pub fn parse_meminfo(contents: &str) -> Option<f32> {
    let field = |name: &str| {
        contents
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
    };
    used_percent(field("MemTotal:")?, field("MemAvailable:")?)
}

/// What a single sample did to the flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Paused(f32),
    Resumed(f32),
    Unchanged,
}

pub struct MemoryMonitor<P: MemoryProbe> {
    probe: P,
    pause: PauseFlag,
    watermarks: Watermarks,
    interval: Duration,
}

impl<P: MemoryProbe> MemoryMonitor<P> {
    pub fn new(probe: P, pause: PauseFlag, watermarks: Watermarks) -> Self {
        Self {
            probe,
            pause,
            watermarks,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Take one sample and update the flag.
    pub fn tick(&mut self) -> Transition {
        let Some(used) = self.probe.used_percent() else {
            debug!("Memory usage unavailable");
            return Transition::Unchanged;
        };

        let paused = self.pause.is_paused();
        if used >= self.watermarks.high && !paused {
            warn!("Memory usage high ({:.1}%), pausing printer", used);
            self.pause.set(true);
            Transition::Paused(used)
        } else if used <= self.watermarks.low && paused {
            info!("Memory usage normal ({:.1}%), resuming printer", used);
            self.pause.set(false);
            Transition::Resumed(used)
        } else {
            Transition::Unchanged
        }
    }

    /// Sample until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        debug!("Memory monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Option<f32>>);

    impl MemoryProbe for Scripted {
        fn used_percent(&mut self) -> Option<f32> {
            self.0.pop_front().flatten()
        }
    }

    fn monitor(samples: &[Option<f32>]) -> (MemoryMonitor<Scripted>, PauseFlag) {
        let pause = PauseFlag::new();
        let probe = Scripted(samples.iter().copied().collect());
        (MemoryMonitor::new(probe, pause.clone(), Watermarks::default()), pause)
    }

    // ========== Hysteresis ==========

    #[test]
    fn test_pause_then_resume() {
        let (mut m, pause) = monitor(&[Some(85.0), Some(75.0), Some(65.0)]);

        assert_eq!(m.tick(), Transition::Paused(85.0));
        assert!(pause.is_paused());

        // between thresholds: stays paused
        assert_eq!(m.tick(), Transition::Unchanged);
        assert!(pause.is_paused());

        assert_eq!(m.tick(), Transition::Resumed(65.0));
        assert!(!pause.is_paused());
    }

    #[test]
    fn test_no_toggle_between_thresholds() {
        let (mut m, pause) = monitor(&[Some(75.0), Some(79.9), Some(70.1)]);
        for _ in 0..3 {
            assert_eq!(m.tick(), Transition::Unchanged);
        }
        assert!(!pause.is_paused());
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let (mut m, pause) = monitor(&[Some(80.0), Some(70.0)]);
        assert_eq!(m.tick(), Transition::Paused(80.0));
        assert_eq!(m.tick(), Transition::Resumed(70.0));
        assert!(!pause.is_paused());
    }

    #[test]
    fn test_unreadable_sample_is_noop() {
        let (mut m, pause) = monitor(&[Some(90.0), None]);
        m.tick();
        assert_eq!(m.tick(), Transition::Unchanged);
        assert!(pause.is_paused());
    }

    // ========== Watermarks ==========

    #[test]
    fn test_watermarks_validation() {
        assert!(Watermarks::new(80.0, 70.0).is_ok());
        assert!(Watermarks::new(70.0, 70.0).is_err());
        assert!(Watermarks::new(60.0, 70.0).is_err());
        assert!(Watermarks::new(120.0, 70.0).is_err());
    }

    // ========== Sampling ==========

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       1000000 kB\nMemFree:         100000 kB\nMemAvailable:    250000 kB\n";
        assert_eq!(parse_meminfo(meminfo), Some(75.0));
        assert_eq!(parse_meminfo("MemTotal: 0 kB\nMemAvailable: 0 kB\n"), None);
        assert_eq!(parse_meminfo("garbage"), None);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (m, pause) = monitor(&[Some(95.0)]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(m.with_interval(Duration::from_millis(5)).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(pause.is_paused());
    }
}
