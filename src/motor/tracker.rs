use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::{
    sync::{mpsc, RwLock},
    time::Instant,
};
use tracing::{debug, info, warn};

use super::models::{FaultRecord, MotorChannel, MotorCommand, MotorSnapshot};

pub const NOMINAL_VOLTAGE: f64 = 220.0;
pub const NOMINAL_CURRENT: f64 = 16.0;
pub const MAX_TEMPERATURE: f64 = 80.0;

pub const MIN_SPEED: f64 = 0.0;
pub const MAX_SPEED: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum MotorError {
    #[error("Speed must be between 0 and 100")]
    SpeedOutOfRange(f64),
}

/// Mean of the voltage, current and temperature efficiency terms, in percent.
///
/// Each electrical term is `(1 - |measured - nominal| / nominal) * 100`; the thermal
/// term is `(1 - temperature / 80) * 100`. The result is not clamped and can fall
/// below zero or exceed 100.
pub fn efficiency(voltage: f64, current: f64, temperature: f64) -> f64 {
    let voltage_term = (1.0 - (voltage - NOMINAL_VOLTAGE).abs() / NOMINAL_VOLTAGE) * 100.0;
    let current_term = (1.0 - (current - NOMINAL_CURRENT).abs() / NOMINAL_CURRENT) * 100.0;
    let temperature_term = (1.0 - temperature / MAX_TEMPERATURE) * 100.0;
    (voltage_term + current_term + temperature_term) / 3.0
}

#[derive(Default)]
struct State {
    snapshot: MotorSnapshot,
    /// Set while running; folded into `snapshot.runtime` on stop.
    running_since: Option<Instant>,
}

impl State {
    fn view(&self) -> MotorSnapshot {
        let mut snapshot = self.snapshot.clone();
        if let Some(since) = self.running_since {
            snapshot.runtime += since.elapsed().as_secs();
        }
        snapshot
    }
}

/// Single owner of the live motor snapshot.
///
/// Clones share the same state. Every mutation happens under the write guard,
/// so channel updates and commands never interleave mid-update.
#[derive(Clone)]
pub struct MotorTracker {
    inner: Arc<RwLock<State>>,
    commands: mpsc::UnboundedSender<MotorCommand>,
}

impl MotorTracker {
    /// Commands emitted by `start`, `stop` and `set_speed` are sent to `commands`.
    pub fn new(commands: mpsc::UnboundedSender<MotorCommand>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(State::default())),
            commands,
        }
    }

    /// Overwrite one channel value and recompute efficiency.
    pub async fn update(&self, channel: MotorChannel, value: f64) {
        let mut state = self.inner.write().await;
        let s = &mut state.snapshot;
        match channel {
            MotorChannel::Voltage => s.voltage = value,
            MotorChannel::Current => s.current = value,
            MotorChannel::Temperature => s.temperature = value,
        }
        s.efficiency = efficiency(s.voltage, s.current, s.temperature);
        debug!(channel = %channel, value, efficiency = s.efficiency, "Motor snapshot updated");
    }

    pub async fn status(&self) -> MotorSnapshot {
        self.inner.read().await.view()
    }

    pub async fn start(&self) {
        {
            let mut state = self.inner.write().await;
            state.snapshot.is_running = true;
            if state.running_since.is_none() {
                state.running_since = Some(Instant::now());
            }
        }
        info!("Motor start requested");
        self.emit(MotorCommand::Start);
    }

    pub async fn stop(&self) {
        {
            let mut state = self.inner.write().await;
            state.snapshot.is_running = false;
            if let Some(since) = state.running_since.take() {
                state.snapshot.runtime += since.elapsed().as_secs();
            }
        }
        info!("Motor stop requested");
        self.emit(MotorCommand::Stop);
    }

    /// Set the target speed. Values outside `[0, 100]` leave the state untouched.
    pub async fn set_speed(&self, speed: f64) -> Result<(), MotorError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(MotorError::SpeedOutOfRange(speed));
        }
        self.inner.write().await.snapshot.speed = speed;
        info!(speed, "Motor speed change requested");
        self.emit(MotorCommand::SetSpeed { speed });
        Ok(())
    }

    /// Fault history. Only a placeholder record exists until fault detection lands.
    pub async fn faults(&self) -> Vec<FaultRecord> {
        vec![FaultRecord {
            id: 1,
            timestamp: Utc::now(),
            kind: "overcurrent".to_owned(),
            description: "Motor current exceeded safe limits".to_owned(),
        }]
    }

    fn emit(&self, command: MotorCommand) {
        if self.commands.send(command).is_err() {
            warn!("Command publisher is gone; motor command dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn tracker() -> (MotorTracker, mpsc::UnboundedReceiver<MotorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MotorTracker::new(tx), rx)
    }

    #[test]
    fn efficiency_at_nominal_is_exactly_100() {
        assert_eq!(efficiency(220.0, 16.0, 0.0), 100.0);
    }

    #[test]
    fn efficiency_at_zero_electrical_and_max_temperature_is_zero() {
        assert_eq!(efficiency(0.0, 0.0, 80.0), 0.0);
    }

    #[test]
    fn efficiency_is_unclamped() {
        assert!(efficiency(660.0, 48.0, 160.0) < 0.0);
        assert!(efficiency(220.0, 16.0, -80.0) > 100.0);
    }

    #[tokio::test]
    async fn fresh_snapshot_is_zeroed() {
        let (t, _rx) = tracker();
        let s = t.status().await;
        assert_eq!(s, MotorSnapshot::default());
    }

    #[tokio::test]
    async fn update_overwrites_channel_and_recomputes_efficiency() {
        let (t, _rx) = tracker();
        t.update(MotorChannel::Voltage, 220.0).await;
        t.update(MotorChannel::Current, 16.0).await;
        t.update(MotorChannel::Temperature, 0.0).await;

        let s = t.status().await;
        assert_eq!(s.voltage, 220.0);
        assert_eq!(s.current, 16.0);
        assert_eq!(s.efficiency, 100.0);

        t.update(MotorChannel::Temperature, 40.0).await;
        let s = t.status().await;
        assert_eq!(s.temperature, 40.0);
        assert_eq!(s.efficiency, efficiency(220.0, 16.0, 40.0));
    }

    #[tokio::test]
    async fn set_speed_accepts_whole_range() {
        let (t, mut rx) = tracker();
        for v in [0.0, 0.5, 25.0, 99.9, 100.0] {
            t.set_speed(v).await.unwrap();
            assert_eq!(t.status().await.speed, v);
            assert_eq!(rx.recv().await, Some(MotorCommand::SetSpeed { speed: v }));
        }
    }

    #[tokio::test]
    async fn set_speed_out_of_range_leaves_state_unchanged() {
        let (t, mut rx) = tracker();
        t.set_speed(30.0).await.unwrap();
        let _ = rx.recv().await;

        for v in [-0.1, 100.01, 250.0, f64::NAN] {
            assert!(matches!(t.set_speed(v).await, Err(MotorError::SpeedOutOfRange(_))));
            assert_eq!(t.status().await.speed, 30.0);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn start_and_stop_toggle_running_and_emit_commands() {
        let (t, mut rx) = tracker();
        t.start().await;
        assert!(t.status().await.is_running);
        assert_eq!(rx.recv().await, Some(MotorCommand::Start));

        t.stop().await;
        assert!(!t.status().await.is_running);
        assert_eq!(rx.recv().await, Some(MotorCommand::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_accumulates_across_runs() {
        let (t, _rx) = tracker();
        t.start().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(t.status().await.runtime, 30);

        t.stop().await;
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(t.status().await.runtime, 30);

        t.start().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        t.stop().await;
        assert_eq!(t.status().await.runtime, 35);
    }

    #[tokio::test]
    async fn commands_are_dropped_without_a_publisher() {
        let (t, rx) = tracker();
        drop(rx);
        t.start().await;
        assert!(t.status().await.is_running);
    }

    #[tokio::test]
    async fn faults_return_placeholder_record() {
        let (t, _rx) = tracker();
        let faults = t.faults().await;
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, "overcurrent");
        assert!(t.status().await.fault_status.is_none());
    }
}
