use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::layout::clamp_percentage;

/// Current state of one lane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneState {
    pub(crate) title: String,
    pub(crate) percentage: f32,
    pub(crate) running: bool,
    pub(crate) just_started: bool,
    pub(crate) just_finished: bool,
}

impl LaneState {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Always within `0..=100`.
    pub fn percentage(&self) -> f32 {
        self.percentage
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// `true` between the lane stopping and the frame that draws its final line.
    pub fn just_finished(&self) -> bool {
        self.just_finished
    }

    fn stop(&mut self) {
        self.running = false;
        self.just_finished = true;
    }
}

/// Fixed table of lanes shared between producers and the render loop.
///
/// Every mutator takes `&self` and may be called from any thread. Each lane
/// sits behind its own lock; lanes never contend with each other. Calls with
/// an out-of-range index do nothing, and so do title and percentage updates
/// to a lane that is not running.
///
/// ```rust
/// use lanebar::LaneRegistry;
///
/// let lanes = LaneRegistry::new(2);
/// lanes.start(0);
/// lanes.set_title(0, "fetch");
/// lanes.set_percentage(0, 140.0);
///
/// let state = lanes.snapshot(0).unwrap();
/// assert_eq!(state.percentage(), 100.0);
/// assert!(!state.running());
/// ```
#[derive(Debug)]
pub struct LaneRegistry {
    lanes: Box<[Mutex<LaneState>]>,
    cancelled: AtomicBool,
}

impl LaneRegistry {
    pub fn new(count: usize) -> Self {
        Self {
            lanes: (0..count).map(|_| Mutex::default()).collect(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Resets the lane to an empty title at 0% and marks it running.
    pub fn start(&self, lane: usize) {
        if let Some(mut state) = self.lock(lane) {
            state.title.clear();
            state.percentage = 0.0;
            state.running = true;
            state.just_started = true;
        }
    }

    pub fn start_all(&self) {
        for lane in 0..self.len() {
            self.start(lane);
        }
    }

    /// Stops the lane and raises its finish edge, keeping its title and
    /// percentage for the final frame. This holds for an idle or already
    /// finished lane too: the next frame draws its line once more.
    pub fn abort(&self, lane: usize) {
        if let Some(mut state) = self.lock(lane) {
            state.stop();
        }
    }

    /// Like [`abort`](Self::abort), but only if the lane is still running.
    /// Returns whether it was.
    pub(crate) fn abort_running(&self, lane: usize) -> bool {
        let Some(mut state) = self.lock_running(lane) else {
            return false;
        };
        state.stop();
        true
    }

    pub fn set_title(&self, lane: usize, title: &str) {
        if let Some(mut state) = self.lock_running(lane) {
            state.title.clear();
            state.title.push_str(title);
        }
    }

    /// Stores `percentage` clamped into `0..=100` (NaN becomes 0). Reaching
    /// 100 stops the lane.
    pub fn set_percentage(&self, lane: usize, percentage: f32) {
        if let Some(mut state) = self.lock_running(lane) {
            state.percentage = clamp_percentage(percentage);
            if state.percentage >= 100.0 {
                state.stop();
            }
        }
    }

    /// Copy of the lane's current state.
    pub fn snapshot(&self, lane: usize) -> Option<LaneState> {
        self.lock(lane).map(|state| state.clone())
    }

    /// Stops rendering for good. Lane updates keep working but are no longer
    /// drawn.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `true` when no lane is running and every finish has been drawn.
    pub fn is_settled(&self) -> bool {
        (0..self.len()).all(|lane| {
            self.lock(lane)
                .is_none_or(|state| !state.running && !state.just_finished)
        })
    }

    /// Consumes the lane's finish edge, passing its final state to `f`.
    /// Returns `None` if the edge was not set.
    pub(crate) fn take_finished<T>(
        &self, lane: usize, f: impl FnOnce(&LaneState) -> T,
    ) -> Option<T> {
        let mut state = self.lock(lane)?;
        if !state.just_finished {
            return None;
        }
        state.just_finished = false;
        Some(f(&state))
    }

    /// Passes the state of a running lane to `f`.
    pub(crate) fn with_running<T>(&self, lane: usize, f: impl FnOnce(&LaneState) -> T) -> Option<T> {
        let state = self.lock_running(lane)?;
        Some(f(&state))
    }

    /// Consumes the lane's start edge.
    pub(crate) fn take_started(&self, lane: usize) -> bool {
        self.lock(lane)
            .is_some_and(|mut state| std::mem::take(&mut state.just_started))
    }

    // Lane state is plain data, so a producer panicking mid-update cannot
    // leave it in a state worth refusing to read.
    fn lock(&self, lane: usize) -> Option<MutexGuard<'_, LaneState>> {
        self.lanes
            .get(lane)
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_running(&self, lane: usize) -> Option<MutexGuard<'_, LaneState>> {
        self.lock(lane).filter(|state| state.running)
    }
}
