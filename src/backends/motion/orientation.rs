// SPDX-License-Identifier: GPL-3.0-only

//! Sensor-based device orientation

use super::level::{LevelIndicator, LevelReading};
use crate::config::OrientationConfig;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Physical orientation of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    /// Rotated so the top of the device points left
    LandscapeLeft,
    /// Rotated so the top of the device points right
    LandscapeRight,
}

impl DeviceOrientation {
    pub const ALL: [DeviceOrientation; 4] = [
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
    ];

    /// Clockwise rotation that makes a landscape sensor frame upright
    pub fn rotation_degrees(&self) -> u32 {
        match self {
            DeviceOrientation::Portrait => 90,
            DeviceOrientation::PortraitUpsideDown => 270,
            DeviceOrientation::LandscapeLeft => 0,
            DeviceOrientation::LandscapeRight => 180,
        }
    }

    /// Rotation applied to overlay chrome so it reads upright
    pub fn ui_rotation_degrees(&self) -> f64 {
        match self {
            DeviceOrientation::Portrait => 0.0,
            DeviceOrientation::PortraitUpsideDown => 180.0,
            DeviceOrientation::LandscapeLeft => 90.0,
            DeviceOrientation::LandscapeRight => -90.0,
        }
    }

    pub fn is_landscape(&self) -> bool {
        matches!(
            self,
            DeviceOrientation::LandscapeLeft | DeviceOrientation::LandscapeRight
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceOrientation::Portrait => "portrait",
            DeviceOrientation::PortraitUpsideDown => "portrait-upside-down",
            DeviceOrientation::LandscapeLeft => "landscape-left",
            DeviceOrientation::LandscapeRight => "landscape-right",
        }
    }
}

impl std::fmt::Display for DeviceOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for DeviceOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.display_name() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown orientation '{}'", s))
    }
}

/// Acceleration in g, device coordinates (+y towards the top edge)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub acceleration: Acceleration,
    pub timestamp: Instant,
}

/// Dominant-axis classifier with a dead zone
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    threshold: f64,
    current: DeviceOrientation,
}

impl OrientationEstimator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.abs(),
            current: DeviceOrientation::default(),
        }
    }

    pub fn current(&self) -> DeviceOrientation {
        self.current
    }

    /// Classify a sample, returning the new orientation only on change
    ///
    /// The y axis wins when both axes are past the threshold. Samples where
    /// neither axis is keep the previous value.
    pub fn sample(&mut self, acceleration: Acceleration) -> Option<DeviceOrientation> {
        let Acceleration { x, y, .. } = acceleration;

        let next = if y.abs() > self.threshold {
            if y < 0.0 {
                DeviceOrientation::Portrait
            } else {
                DeviceOrientation::PortraitUpsideDown
            }
        } else if x.abs() > self.threshold {
            if x > 0.0 {
                DeviceOrientation::LandscapeRight
            } else {
                DeviceOrientation::LandscapeLeft
            }
        } else {
            return None;
        };

        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

/// Accelerometer hardware
pub trait MotionSource: Send + 'static {
    /// Whether readings can be produced at all
    fn is_available(&self) -> bool;

    /// Latest reading, None if nothing new is available
    fn read_acceleration(&mut self) -> Option<Acceleration>;
}

/// Motion source for devices without an accelerometer
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableMotion;

impl MotionSource for UnavailableMotion {
    fn is_available(&self) -> bool {
        false
    }

    fn read_acceleration(&mut self) -> Option<Acceleration> {
        None
    }
}

/// Replays queued readings, repeating the last one once the queue drains
///
/// Clones share the queue so tests can push readings while the sampler
/// owns another clone.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMotion {
    queue: Arc<Mutex<(VecDeque<Acceleration>, Option<Acceleration>)>>,
}

impl ScriptedMotion {
    pub fn new(samples: impl IntoIterator<Item = Acceleration>) -> Self {
        let motion = Self::default();
        for sample in samples {
            motion.push(sample);
        }
        motion
    }

    /// Device held upright
    pub fn upright() -> Self {
        Self::new([Acceleration::new(0.0, -1.0, 0.0)])
    }

    /// Device held steadily in one orientation
    pub fn holding(orientation: DeviceOrientation) -> Self {
        let gravity = match orientation {
            DeviceOrientation::Portrait => Acceleration::new(0.0, -1.0, 0.0),
            DeviceOrientation::PortraitUpsideDown => Acceleration::new(0.0, 1.0, 0.0),
            DeviceOrientation::LandscapeLeft => Acceleration::new(-1.0, 0.0, 0.0),
            DeviceOrientation::LandscapeRight => Acceleration::new(1.0, 0.0, 0.0),
        };
        Self::new([gravity])
    }

    pub fn push(&self, sample: Acceleration) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.0.push_back(sample);
    }
}

impl MotionSource for ScriptedMotion {
    fn is_available(&self) -> bool {
        true
    }

    fn read_acceleration(&mut self) -> Option<Acceleration> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let (pending, last) = &mut *queue;
        if let Some(next) = pending.pop_front() {
            *last = Some(next);
        }
        *last
    }
}

/// Periodic accelerometer sampling task
///
/// Publishes the current orientation and level reading through watch
/// channels. The task stops when the sampler is dropped.
pub struct OrientationSampler {
    orientation: watch::Receiver<DeviceOrientation>,
    level: watch::Receiver<LevelReading>,
    task: Option<JoinHandle<()>>,
}

impl OrientationSampler {
    /// Start sampling on the current tokio runtime
    ///
    /// An unavailable source leaves the orientation at portrait forever.
    pub fn start(mut source: Box<dyn MotionSource>, config: &OrientationConfig) -> Self {
        let (orientation_tx, orientation) = watch::channel(DeviceOrientation::default());
        let (level_tx, level) = watch::channel(LevelReading::default());

        if !source.is_available() {
            info!("Motion sensor unavailable, orientation fixed at portrait");
            return Self {
                orientation,
                level,
                task: None,
            };
        }

        let period = config.sample_interval();
        let mut estimator = OrientationEstimator::new(config.threshold);
        let mut indicator = LevelIndicator::new();
        info!(period_ms = period.as_millis() as u64, "Starting orientation sampler");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(acceleration) = source.read_acceleration() else {
                    continue;
                };
                let sample = AccelerationSample {
                    acceleration,
                    timestamp: Instant::now(),
                };

                if let Some(changed) = estimator.sample(sample.acceleration) {
                    debug!(orientation = %changed, "Device orientation changed");
                    orientation_tx.send_replace(changed);
                }

                let reading = indicator.update(&sample, estimator.current());
                level_tx.send_if_modified(|current| {
                    if *current == reading {
                        false
                    } else {
                        *current = reading;
                        true
                    }
                });
            }
        });

        Self {
            orientation,
            level,
            task: Some(task),
        }
    }

    /// Latest orientation snapshot
    pub fn current(&self) -> DeviceOrientation {
        *self.orientation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceOrientation> {
        self.orientation.clone()
    }

    pub fn level(&self) -> watch::Receiver<LevelReading> {
        self.level.clone()
    }

    /// Stream of orientation changes
    pub fn changes(&self) -> impl Stream<Item = DeviceOrientation> + Send + 'static {
        let mut rx = self.orientation.clone();
        async_stream::stream! {
            while rx.changed().await.is_ok() {
                let value = *rx.borrow_and_update();
                yield value;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop sampling; the last published values stay readable
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Orientation sampler stopped");
        }
    }
}

impl Drop for OrientationSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    fn accel(x: f64, y: f64) -> Acceleration {
        Acceleration::new(x, y, 0.0)
    }

    #[test]
    fn test_classification() {
        let mut estimator = OrientationEstimator::new(0.75);
        assert_eq!(estimator.sample(accel(0.0, -1.0)), None);
        assert_eq!(
            estimator.sample(accel(0.9, 0.1)),
            Some(DeviceOrientation::LandscapeRight)
        );
        assert_eq!(
            estimator.sample(accel(-0.9, 0.1)),
            Some(DeviceOrientation::LandscapeLeft)
        );
        assert_eq!(
            estimator.sample(accel(0.0, 0.95)),
            Some(DeviceOrientation::PortraitUpsideDown)
        );
    }

    #[test]
    fn test_dead_zone_suppresses_churn() {
        let mut estimator = OrientationEstimator::new(0.75);
        estimator.sample(accel(0.9, 0.0));

        // Tilted roughly 45 degrees, wobbling around the diagonal
        let mut changes = 0;
        for i in 0..100 {
            let wobble = if i % 2 == 0 { 0.02 } else { -0.02 };
            if estimator
                .sample(accel(0.70 + wobble, -0.70 - wobble))
                .is_some()
            {
                changes += 1;
            }
        }
        assert_eq!(changes, 0);
        assert_eq!(estimator.current(), DeviceOrientation::LandscapeRight);
    }

    #[test]
    fn test_parse_orientation() {
        assert_eq!(
            "Landscape-Left".parse::<DeviceOrientation>(),
            Ok(DeviceOrientation::LandscapeLeft)
        );
        assert!("sideways".parse::<DeviceOrientation>().is_err());
    }

    #[test]
    fn test_holding_classifies_as_requested() {
        for orientation in DeviceOrientation::ALL {
            let mut motion = ScriptedMotion::holding(orientation);
            let mut estimator = OrientationEstimator::new(0.75);
            let reading = motion.read_acceleration().expect("reading");
            estimator.sample(reading);
            assert_eq!(estimator.current(), orientation);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_publishes_changes() {
        let motion = ScriptedMotion::upright();
        let sampler = OrientationSampler::start(
            Box::new(motion.clone()),
            &OrientationConfig::default(),
        );
        let mut changes = Box::pin(sampler.changes());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sampler.current(), DeviceOrientation::Portrait);

        motion.push(accel(-1.0, 0.0));
        let next = changes.next().await;
        assert_eq!(next, Some(DeviceOrientation::LandscapeLeft));
        assert_eq!(sampler.current(), DeviceOrientation::LandscapeLeft);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_sensor_stays_portrait() {
        let sampler =
            OrientationSampler::start(Box::new(UnavailableMotion), &OrientationConfig::default());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!sampler.is_running());
        assert_eq!(sampler.current(), DeviceOrientation::Portrait);
    }
}
