use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use flipkit_runtime::{Clock, FrameScheduler, Runtime, RuntimeHandle};

/// Frame scheduler that only records requests; the rule drives frames
/// manually.
#[derive(Default)]
pub struct TestScheduler {
    frame_requested: AtomicBool,
}

impl TestScheduler {
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::AcqRel)
    }
}

impl FrameScheduler for TestScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::Release);
    }
}

/// Manually advanced clock.
pub struct TestClock {
    now_millis: Mutex<f64>,
}

impl TestClock {
    fn advance(&self, millis: f64) -> f64 {
        let mut now = self.now_millis.lock().unwrap();
        *now += millis;
        *now
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> f64 {
        *self.now_millis.lock().unwrap()
    }
}

/// Deterministic driver for engine tests: a runtime on a fake clock whose
/// frames and timers only advance when the test says so.
///
/// The test pumps virtual time; the engine sees frame timestamps and timer
/// deadlines exactly as if a real host loop had run.
pub struct FlipTestRule {
    runtime: Runtime,
    scheduler: Arc<TestScheduler>,
    clock: Arc<TestClock>,
    frame_millis: f64,
}

impl FlipTestRule {
    pub fn new() -> Self {
        Self::with_frame_millis(16.0)
    }

    pub fn with_frame_millis(frame_millis: f64) -> Self {
        let scheduler = Arc::new(TestScheduler::default());
        let clock = Arc::new(TestClock {
            now_millis: Mutex::new(0.0),
        });
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        Self {
            runtime,
            scheduler,
            clock,
            frame_millis,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> &TestScheduler {
        &self.scheduler
    }

    pub fn now_millis(&self) -> f64 {
        self.clock.now_millis()
    }

    /// Advances by one frame interval, firing due timers first and frame
    /// callbacks second, matching a host loop's per-frame order.
    pub fn pump_frame(&self) {
        self.step(self.frame_millis);
    }

    /// Advances virtual time in frame-sized steps.
    pub fn advance_millis(&self, millis: f64) {
        let mut remaining = millis;
        while remaining > 0.0 {
            let step = remaining.min(self.frame_millis);
            self.step(step);
            remaining -= step;
        }
    }

    /// Pumps frames until no timers or frame callbacks remain. Panics after
    /// `max_frames` to catch animations that never settle.
    pub fn run_until_idle(&self, max_frames: usize) {
        let handle = self.runtime.handle();
        for _ in 0..max_frames {
            if !handle.has_pending_work() {
                return;
            }
            self.pump_frame();
        }
        assert!(
            !handle.has_pending_work(),
            "still pending work after {max_frames} frames"
        );
    }

    fn step(&self, millis: f64) {
        let now = self.clock.advance(millis);
        self.scheduler.take_frame_request();
        let handle = self.runtime.handle();
        handle.fire_due_timers(now);
        handle.drain_frame_callbacks(now);
    }
}

impl Default for FlipTestRule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn timers_fire_at_their_virtual_deadline() {
        let rule = FlipTestRule::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        rule.handle().set_timeout(50.0, move || flag.set(true));

        rule.advance_millis(48.0);
        assert!(!fired.get());
        rule.advance_millis(16.0);
        assert!(fired.get());
    }

    #[test]
    fn frame_callbacks_see_the_frame_timestamp() {
        let rule = FlipTestRule::new();
        let seen = Rc::new(Cell::new(0.0));
        let slot = seen.clone();
        rule.handle().register_frame_callback(move |now| slot.set(now));
        rule.pump_frame();
        assert_eq!(seen.get(), 16.0);
    }

    #[test]
    fn run_until_idle_stops_once_queues_drain() {
        let rule = FlipTestRule::new();
        rule.handle().set_timeout(100.0, || {});
        rule.run_until_idle(1_000);
        assert!(!rule.handle().has_pending_work());
    }
}
