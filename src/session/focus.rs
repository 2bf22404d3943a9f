// SPDX-License-Identifier: GPL-3.0-only

//! Tap-to-focus and focus/exposure lock
//!
//! A tapped focus point is transient and reverts to continuous auto after a
//! few seconds, while a long press turns it into a durable lock. Both share
//! one piece of hardware state, so they are modelled as a single machine:
//!
//! ```text
//!            tap                  long press / lock
//!   Idle ──────────► Focusing ───────────────────► Locked
//!    ▲                  │ timeout / dismiss          │ unlock / dismiss
//!    └──────────────────┴────────────────────────────┘
//! ```
//!
//! [`FocusMachine`] is pure and returns [`FocusEffect`]s. [`FocusController`]
//! owns the timers and forwards effects to a [`FocusActuator`].
//!
//! Every scheduled revert carries a generation number. Anything that cancels
//! the timer bumps the generation, so a timer that fires late finds a stale
//! number and does nothing. A lock arriving at the same instant the revert
//! fired still wins and restores the point.

use crate::backends::camera::{ControlRange, NormalizedPoint};
use crate::config::FocusConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Published focus/exposure state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FocusExposureState {
    /// Continuous auto focus and exposure
    #[default]
    Idle,
    /// Tapped point; reverts at `expires_at` unless the user is dragging
    Focusing {
        point: NormalizedPoint,
        bias: f64,
        expires_at: Option<Instant>,
    },
    /// Held until explicitly released
    Locked { point: NormalizedPoint, bias: f64 },
}

impl FocusExposureState {
    pub fn point(&self) -> Option<NormalizedPoint> {
        match self {
            FocusExposureState::Idle => None,
            FocusExposureState::Focusing { point, .. } | FocusExposureState::Locked { point, .. } => {
                Some(*point)
            }
        }
    }

    pub fn bias(&self) -> f64 {
        match self {
            FocusExposureState::Idle => 0.0,
            FocusExposureState::Focusing { bias, .. } | FocusExposureState::Locked { bias, .. } => {
                *bias
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, FocusExposureState::Locked { .. })
    }
}

/// Hardware or timer action requested by a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusEffect {
    FocusAt(NormalizedPoint),
    SetBias(f64),
    LockHardware,
    RevertToAuto,
    ScheduleRevert { generation: u64, at: Instant },
    CancelRevert,
}

#[derive(Debug, Clone, Copy)]
struct RevertRecord {
    point: NormalizedPoint,
    bias: f64,
    at: Instant,
}

/// Pure focus/exposure state machine
#[derive(Debug, Clone)]
pub struct FocusMachine {
    state: FocusExposureState,
    revert_after: Duration,
    generation: u64,
    dragging: bool,
    last_revert: Option<RevertRecord>,
}

impl FocusMachine {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            state: FocusExposureState::Idle,
            revert_after,
            generation: 0,
            dragging: false,
            last_revert: None,
        }
    }

    pub fn state(&self) -> FocusExposureState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Focus at a point, unlocking first if needed
    pub fn tap(&mut self, point: NormalizedPoint, now: Instant) -> Vec<FocusEffect> {
        self.last_revert = None;
        self.dragging = false;
        let mut effects = Vec::new();
        if self.state.is_locked() {
            effects.push(FocusEffect::RevertToAuto);
        }

        effects.push(FocusEffect::FocusAt(point));
        effects.push(FocusEffect::SetBias(0.0));
        let at = now + self.revert_after;
        self.state = FocusExposureState::Focusing {
            point,
            bias: 0.0,
            expires_at: Some(at),
        };
        effects.push(self.schedule(at));
        effects
    }

    /// Exposure slider grabbed; suspends the revert timer
    pub fn begin_drag(&mut self) -> Vec<FocusEffect> {
        match &mut self.state {
            FocusExposureState::Focusing { expires_at, .. } => {
                self.dragging = true;
                *expires_at = None;
                self.generation += 1;
                vec![FocusEffect::CancelRevert]
            }
            FocusExposureState::Locked { .. } => {
                self.dragging = true;
                Vec::new()
            }
            FocusExposureState::Idle => Vec::new(),
        }
    }

    /// Live bias change, clamped to `range`
    pub fn drag(&mut self, ev: f64, range: ControlRange) -> Vec<FocusEffect> {
        let clamped = range.clamp(ev);
        match &mut self.state {
            FocusExposureState::Focusing { bias, .. } | FocusExposureState::Locked { bias, .. } => {
                *bias = clamped;
                vec![FocusEffect::SetBias(clamped)]
            }
            FocusExposureState::Idle => Vec::new(),
        }
    }

    /// Slider released; re-arms the revert timer unless locked
    pub fn end_drag(&mut self, now: Instant) -> Vec<FocusEffect> {
        if !std::mem::take(&mut self.dragging) {
            return Vec::new();
        }
        let at = now + self.revert_after;
        match &mut self.state {
            FocusExposureState::Focusing { expires_at, .. } => {
                *expires_at = Some(at);
                vec![self.schedule(at)]
            }
            _ => Vec::new(),
        }
    }

    /// Long press: lock the current point and bias
    ///
    /// Only valid while focusing, or at the very instant a revert fired.
    pub fn long_press(&mut self, now: Instant) -> Vec<FocusEffect> {
        match self.state {
            FocusExposureState::Focusing { point, bias, .. } => {
                self.generation += 1;
                self.dragging = false;
                self.state = FocusExposureState::Locked { point, bias };
                vec![FocusEffect::CancelRevert, FocusEffect::LockHardware]
            }
            FocusExposureState::Idle => match self.last_revert.take() {
                Some(record) if now <= record.at => {
                    self.state = FocusExposureState::Locked {
                        point: record.point,
                        bias: record.bias,
                    };
                    vec![
                        FocusEffect::FocusAt(record.point),
                        FocusEffect::SetBias(record.bias),
                        FocusEffect::LockHardware,
                    ]
                }
                _ => Vec::new(),
            },
            FocusExposureState::Locked { .. } => Vec::new(),
        }
    }

    /// Explicit lock; from idle this locks at the frame centre
    pub fn lock(&mut self, now: Instant) -> Vec<FocusEffect> {
        match self.state {
            FocusExposureState::Idle if !self.last_revert.is_some_and(|r| now <= r.at) => {
                self.last_revert = None;
                self.state = FocusExposureState::Locked {
                    point: NormalizedPoint::CENTER,
                    bias: 0.0,
                };
                vec![
                    FocusEffect::FocusAt(NormalizedPoint::CENTER),
                    FocusEffect::LockHardware,
                ]
            }
            _ => self.long_press(now),
        }
    }

    /// Release a lock
    pub fn unlock(&mut self) -> Vec<FocusEffect> {
        self.last_revert = None;
        if self.state.is_locked() {
            self.state = FocusExposureState::Idle;
            self.dragging = false;
            vec![FocusEffect::RevertToAuto]
        } else {
            Vec::new()
        }
    }

    /// The hardware dropped its lock on its own, e.g. after a camera switch
    ///
    /// The device is already in continuous auto, so nothing is sent.
    pub fn lock_lost(&mut self) -> Vec<FocusEffect> {
        if self.state.is_locked() {
            self.last_revert = None;
            self.dragging = false;
            self.state = FocusExposureState::Idle;
        }
        Vec::new()
    }

    /// Tap elsewhere: back to continuous auto from any state
    pub fn dismiss(&mut self) -> Vec<FocusEffect> {
        self.last_revert = None;
        self.dragging = false;
        match self.state {
            FocusExposureState::Idle => Vec::new(),
            FocusExposureState::Focusing { .. } => {
                self.generation += 1;
                self.state = FocusExposureState::Idle;
                vec![FocusEffect::CancelRevert, FocusEffect::RevertToAuto]
            }
            FocusExposureState::Locked { .. } => {
                self.state = FocusExposureState::Idle;
                vec![FocusEffect::RevertToAuto]
            }
        }
    }

    /// A revert timer fired
    pub fn revert_elapsed(&mut self, generation: u64, at: Instant) -> Vec<FocusEffect> {
        if generation != self.generation {
            return Vec::new();
        }
        match self.state {
            FocusExposureState::Focusing {
                point,
                bias,
                expires_at: Some(_),
            } => {
                self.state = FocusExposureState::Idle;
                self.last_revert = Some(RevertRecord { point, bias, at });
                vec![FocusEffect::RevertToAuto]
            }
            _ => Vec::new(),
        }
    }

    fn schedule(&mut self, at: Instant) -> FocusEffect {
        self.generation += 1;
        FocusEffect::ScheduleRevert {
            generation: self.generation,
            at,
        }
    }
}

/// Hardware side of focus and exposure
///
/// Calls must not block; the session queues them on its worker.
pub trait FocusActuator: Send + 'static {
    fn focus_at(&self, point: NormalizedPoint);
    fn set_exposure_bias(&self, ev: f64);
    fn lock_focus_exposure(&self);
    fn revert_to_auto(&self);
}

/// Position of a touch in view points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &ViewPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Detects a press held in place long enough to lock
#[derive(Debug, Clone)]
pub struct LongPressTracker {
    hold: Duration,
    slop: f64,
    press: Option<(ViewPoint, Instant)>,
}

impl LongPressTracker {
    pub fn new(hold: Duration, slop: f64) -> Self {
        Self {
            hold,
            slop,
            press: None,
        }
    }

    pub fn begin(&mut self, position: ViewPoint, now: Instant) {
        self.press = Some((position, now));
    }

    /// Returns false once the press has moved too far to count
    pub fn moved(&mut self, position: ViewPoint) -> bool {
        if let Some((origin, _)) = self.press {
            if origin.distance(&position) > self.slop {
                self.press = None;
            }
        }
        self.press.is_some()
    }

    pub fn end(&mut self) {
        self.press = None;
    }

    pub fn is_armed(&self) -> bool {
        self.press.is_some()
    }

    /// True exactly once when the press has been held long enough
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.press {
            Some((_, started)) if now.duration_since(started) >= self.hold => {
                self.press = None;
                true
            }
            _ => false,
        }
    }
}

struct FocusInner<A> {
    machine: FocusMachine,
    actuator: A,
    bias_range: ControlRange,
    press: LongPressTracker,
    revert_timer: Option<JoinHandle<()>>,
    press_timer: Option<JoinHandle<()>>,
}

/// Drives a [`FocusMachine`] with tokio timers
///
/// Must be used from within a tokio runtime.
pub struct FocusController<A: FocusActuator> {
    inner: Arc<Mutex<FocusInner<A>>>,
    state_tx: Arc<watch::Sender<FocusExposureState>>,
}

impl<A: FocusActuator> Clone for FocusController<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
        }
    }
}

impl<A: FocusActuator> FocusController<A> {
    pub fn new(actuator: A, config: &FocusConfig, bias_range: ControlRange) -> Self {
        let (state_tx, _) = watch::channel(FocusExposureState::Idle);
        Self {
            inner: Arc::new(Mutex::new(FocusInner {
                machine: FocusMachine::new(config.auto_revert()),
                actuator,
                bias_range,
                press: LongPressTracker::new(config.long_press(), config.long_press_slop),
                revert_timer: None,
                press_timer: None,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> FocusExposureState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FocusExposureState> {
        self.state_tx.subscribe()
    }

    /// Exposure bias range of the active device
    pub fn set_bias_range(&self, range: ControlRange) {
        self.lock_inner().bias_range = range;
    }

    pub fn tap(&self, point: NormalizedPoint) {
        self.transition(|m, _| m.tap(point, Instant::now()));
    }

    pub fn begin_drag(&self) {
        self.transition(|m, _| m.begin_drag());
    }

    pub fn drag(&self, ev: f64) {
        self.transition(|m, range| m.drag(ev, range));
    }

    pub fn end_drag(&self) {
        self.transition(|m, _| m.end_drag(Instant::now()));
    }

    pub fn long_press(&self) {
        self.transition(|m, _| m.long_press(Instant::now()));
    }

    pub fn lock(&self) {
        self.transition(|m, _| m.lock(Instant::now()));
    }

    pub fn unlock(&self) {
        self.transition(|m, _| m.unlock());
    }

    pub fn dismiss(&self) {
        self.transition(|m, _| m.dismiss());
    }

    pub fn lock_lost(&self) {
        self.transition(|m, _| m.lock_lost());
    }

    /// Touch down on the preview: focus there and arm the long-press timer
    pub fn press_began(&self, position: ViewPoint, point: NormalizedPoint) {
        self.tap(point);

        let mut inner = self.lock_inner();
        let now = Instant::now();
        inner.press.begin(position, now);
        if let Some(timer) = inner.press_timer.take() {
            timer.abort();
        }

        let controller = self.clone();
        let deadline = now + inner.press.hold;
        inner.press_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let fired = controller.lock_inner().press.fire(Instant::now());
            if fired {
                debug!("Long press detected");
                controller.long_press();
            }
        }));
    }

    /// Touch moved; too much movement cancels the long press
    pub fn press_moved(&self, position: ViewPoint) {
        let mut inner = self.lock_inner();
        if !inner.press.moved(position) {
            if let Some(timer) = inner.press_timer.take() {
                timer.abort();
            }
        }
    }

    pub fn press_ended(&self) {
        let mut inner = self.lock_inner();
        inner.press.end();
        if let Some(timer) = inner.press_timer.take() {
            timer.abort();
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, FocusInner<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition<F>(&self, event: F)
    where
        F: FnOnce(&mut FocusMachine, ControlRange) -> Vec<FocusEffect>,
    {
        let mut inner = self.lock_inner();
        let range = inner.bias_range;
        let effects = event(&mut inner.machine, range);
        self.execute(&mut inner, effects);
    }

    fn execute(&self, inner: &mut FocusInner<A>, effects: Vec<FocusEffect>) {
        for effect in effects {
            match effect {
                FocusEffect::FocusAt(point) => inner.actuator.focus_at(point),
                FocusEffect::SetBias(ev) => inner.actuator.set_exposure_bias(ev),
                FocusEffect::LockHardware => inner.actuator.lock_focus_exposure(),
                FocusEffect::RevertToAuto => inner.actuator.revert_to_auto(),
                FocusEffect::CancelRevert => {
                    if let Some(timer) = inner.revert_timer.take() {
                        timer.abort();
                    }
                }
                FocusEffect::ScheduleRevert { generation, at } => {
                    if let Some(timer) = inner.revert_timer.take() {
                        timer.abort();
                    }
                    let controller = self.clone();
                    inner.revert_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep_until(at).await;
                        controller.transition(|m, _| m.revert_elapsed(generation, at));
                    }));
                }
            }
        }

        let state = inner.machine.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(?state, "Focus state changed");
                *current = state;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Focus(NormalizedPoint),
        Bias(f64),
        Lock,
        Auto,
    }

    #[derive(Clone, Default)]
    struct RecordingActuator {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RecordingActuator {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FocusActuator for RecordingActuator {
        fn focus_at(&self, point: NormalizedPoint) {
            self.calls.lock().unwrap().push(Call::Focus(point));
        }
        fn set_exposure_bias(&self, ev: f64) {
            self.calls.lock().unwrap().push(Call::Bias(ev));
        }
        fn lock_focus_exposure(&self) {
            self.calls.lock().unwrap().push(Call::Lock);
        }
        fn revert_to_auto(&self) {
            self.calls.lock().unwrap().push(Call::Auto);
        }
    }

    fn controller() -> (FocusController<RecordingActuator>, RecordingActuator) {
        let actuator = RecordingActuator::default();
        let controller = FocusController::new(
            actuator.clone(),
            &FocusConfig::default(),
            ControlRange::new(-2.0, 2.0),
        );
        (controller, actuator)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_stale_generation_ignored() {
        let now = Instant::now();
        let mut machine = FocusMachine::new(Duration::from_secs(3));
        let effects = machine.tap(NormalizedPoint::new(0.2, 0.3), now);
        let Some(FocusEffect::ScheduleRevert { generation, at }) = effects.last().copied() else {
            panic!("tap schedules a revert");
        };

        machine.begin_drag();
        assert!(machine.revert_elapsed(generation, at).is_empty());
        assert!(matches!(machine.state(), FocusExposureState::Focusing { .. }));
    }

    #[test]
    fn test_tap_while_locked_unlocks_first() {
        let now = Instant::now();
        let mut machine = FocusMachine::new(Duration::from_secs(3));
        machine.lock(now);
        let effects = machine.tap(NormalizedPoint::new(0.1, 0.1), now);
        assert_eq!(effects[0], FocusEffect::RevertToAuto);
        assert_eq!(effects[2], FocusEffect::SetBias(0.0));
    }

    #[test]
    fn test_lock_wins_tie_with_revert() {
        let now = Instant::now();
        let mut machine = FocusMachine::new(Duration::from_secs(3));
        let point = NormalizedPoint::new(0.7, 0.4);
        let effects = machine.tap(point, now);
        let Some(FocusEffect::ScheduleRevert { generation, at }) = effects.last().copied() else {
            panic!("tap schedules a revert");
        };

        machine.revert_elapsed(generation, at);
        assert_eq!(machine.state(), FocusExposureState::Idle);
        machine.long_press(at);
        assert_eq!(machine.state(), FocusExposureState::Locked { point, bias: 0.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_tap_reverts_after_timeout() {
        let (controller, actuator) = controller();
        let point = NormalizedPoint::new(0.25, 0.75);
        controller.tap(point);
        assert!(matches!(controller.state(), FocusExposureState::Focusing { .. }));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(matches!(controller.state(), FocusExposureState::Focusing { .. }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(controller.state(), FocusExposureState::Idle);
        assert_eq!(
            actuator.calls(),
            vec![Call::Focus(point), Call::Bias(0.0), Call::Auto]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_before_timeout_locks_and_revert_never_fires() {
        let (controller, actuator) = controller();
        let point = NormalizedPoint::new(0.5, 0.2);
        controller.tap(point);
        controller.begin_drag();
        controller.drag(5.0);
        controller.end_drag();

        tokio::time::sleep(Duration::from_secs(2)).await;
        controller.long_press();
        assert_eq!(controller.state(), FocusExposureState::Locked { point, bias: 2.0 });

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert!(controller.state().is_locked());
        assert!(!actuator.calls().contains(&Call::Auto));
        assert_eq!(actuator.calls().last(), Some(&Call::Lock));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_after_revert_has_no_effect() {
        let (controller, _actuator) = controller();
        controller.tap(NormalizedPoint::CENTER);
        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;
        controller.long_press();
        assert_eq!(controller.state(), FocusExposureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dragging_suspends_revert() {
        let (controller, _actuator) = controller();
        controller.tap(NormalizedPoint::CENTER);
        controller.begin_drag();
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert!(matches!(
            controller.state(),
            FocusExposureState::Focusing { expires_at: None, .. }
        ));

        controller.end_drag();
        tokio::time::sleep(Duration::from_millis(3100)).await;
        settle().await;
        assert_eq!(controller.state(), FocusExposureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_press_locks() {
        let (controller, actuator) = controller();
        let point = NormalizedPoint::new(0.3, 0.3);
        controller.press_began(ViewPoint::new(100.0, 100.0), point);
        controller.press_moved(ViewPoint::new(110.0, 105.0));
        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(controller.state(), FocusExposureState::Locked { point, bias: 0.0 });
        assert!(actuator.calls().contains(&Call::Lock));
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_moved_too_far_does_not_lock() {
        let (controller, _actuator) = controller();
        controller.press_began(ViewPoint::new(100.0, 100.0), NormalizedPoint::CENTER);
        controller.press_moved(ViewPoint::new(150.0, 100.0));
        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        assert!(!controller.state().is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_lock_goes_idle_without_hardware_calls() {
        let (controller, actuator) = controller();
        controller.lock();
        let issued = actuator.calls().len();

        controller.lock_lost();
        assert_eq!(controller.state(), FocusExposureState::Idle);
        assert_eq!(actuator.calls().len(), issued);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_from_locked() {
        let (controller, actuator) = controller();
        controller.lock();
        assert_eq!(
            controller.state(),
            FocusExposureState::Locked {
                point: NormalizedPoint::CENTER,
                bias: 0.0
            }
        );
        controller.dismiss();
        assert_eq!(controller.state(), FocusExposureState::Idle);
        assert_eq!(actuator.calls().last(), Some(&Call::Auto));
    }
}
