use std::time::Duration;

use chrono::Local;
use statum::{machine, state};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::navigator::{Navigator, TickReport};
use crate::config::Configuration;
use crate::controller::InputDevice;
use crate::host::Collaborators;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Navigation task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Counters accumulated by the driver loop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    pub skipped: u64,
    pub nudges: u64,
    pub camera_pushes: u64,
    pub external_changes: u64,
    pub button_edges: u64,
}

impl DriverStats {
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        if report.skipped {
            self.skipped += 1;
        }
        if report.nudge.is_some() {
            self.nudges += 1;
        }
        if report.camera_pushed {
            self.camera_pushes += 1;
        }
        if report.external_change {
            self.external_changes += 1;
        }
        self.button_edges += report.button_edges as u64;
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum DriverState {
    Initializing,
    Running,
}

#[machine]
#[derive(Debug)]
pub struct NavigationDriver<S: DriverState> {
    navigator: Navigator,
    device: Box<dyn InputDevice>,
    host: Collaborators,
    tick_interval: Duration,
    started_at: Instant,
}

impl<S: DriverState> NavigationDriver<S> {
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

impl NavigationDriver<Initializing> {
    pub fn create(
        config: &Configuration,
        device: Box<dyn InputDevice>,
        host: Collaborators,
    ) -> Self {
        let tick_interval = config.tick_interval();
        info!(
            "Creating navigation driver at {:.1} Hz ({:?} per tick)",
            config.navigation.tick_rate_hz, tick_interval
        );
        debug!("Navigation configuration: {:?}", config);

        Self::new(
            Navigator::from_config(config),
            device,
            host,
            tick_interval,
            Instant::now(),
        )
    }

    pub fn start(mut self) -> NavigationDriver<Running> {
        self.started_at = Instant::now();
        info!("Navigation driver running");
        self.transition()
    }
}

impl NavigationDriver<Running> {
    /// Milliseconds since the driver started
    pub fn now_ms(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }

    /// Polls the device and runs one navigator tick
    pub fn step(&mut self) -> TickReport {
        let now_ms = self.now_ms();
        self.step_at(now_ms)
    }

    pub fn step_at(&mut self, now_ms: f64) -> TickReport {
        let sample = self.device.poll();
        self.navigator.tick(now_ms, sample, &mut self.host)
    }
}

async fn run_driver_loop(
    mut driver: NavigationDriver<Running>,
    mut shutdown: watch::Receiver<bool>,
) -> DriverStats {
    let period = driver.tick_interval();
    info!("Starting navigation loop with {:?} interval", period);

    let mut interval_timer = tokio::time::interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut total = DriverStats::default();
    let mut window = DriverStats::default();
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Navigation loop stopping after {} ticks", total.ticks);
                    return total;
                }
                continue;
            }
        }

        let report = driver.step();
        total.record(&report);
        window.record(&report);

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Navigator stats: {} ticks ({} skipped), {} nudges, {} camera pushes, {} external changes in {} seconds",
                window.ticks,
                window.skipped,
                window.nudges,
                window.camera_pushes,
                window.external_changes,
                elapsed_seconds
            );
            info!(
                "Average: {:.2} ticks/sec, {} button edges",
                window.ticks as f64 / elapsed_seconds as f64,
                window.button_edges
            );
            window = DriverStats::default();
            last_stats_time = now;
        }
    }
}

/// Owns the spawned navigation task
#[derive(Debug)]
pub struct DriverHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<DriverStats>,
}

impl DriverHandle {
    /// Builds the driver and spawns its loop on the current tokio runtime
    pub fn spawn(
        config: &Configuration,
        device: Box<dyn InputDevice>,
        host: Collaborators,
    ) -> Self {
        let driver = NavigationDriver::create(config, device, host).start();
        let (shutdown, shutdown_rx) = watch::channel(false);

        info!("Spawning navigation task");
        let task = tokio::spawn(run_driver_loop(driver, shutdown_rx));
        debug!("Tokio task spawned with handle: {:?}", task);

        Self { shutdown, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and returns the accumulated statistics
    pub async fn shutdown(self) -> Result<DriverStats, DriverError> {
        if self.shutdown.send(true).is_err() {
            debug!("Navigation task already stopped");
        }
        Ok(self.task.await?)
    }
}
