//! Shared fixed-timestep loop.
//!
//! One [`Scheduler`] drives every playing animation. Receivers join while
//! playing and leave when paused; the loop requests display frames only while
//! the active set is non-empty and rebaselines its clock whenever it restarts,
//! so an idle gap never turns into a burst of catch-up steps.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::host::{Clock, FrameDriver};
use crate::ids::PlayerId;
use crate::stats::FrameStats;

/// Something the loop advances once per logic cycle.
pub trait TickReceiver {
    /// Logic update with the wall-clock timestamp of the current display frame.
    fn advance(&self, timestamp_ms: f64);

    /// Render pass, run after every receiver has been advanced.
    fn render(&self) {}

    /// Called when the loop drops this receiver without a matching `leave`.
    fn stopped(&self) {}
}

/// What one call to [`Scheduler::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub delta_ms: f64,
    /// Whole fixed steps drained from the accumulator.
    pub steps: u32,
    /// Receivers advanced during this tick.
    pub updated: usize,
    /// Whether another frame was requested.
    pub running: bool,
}

struct SchedulerState {
    active: IndexMap<PlayerId, Rc<dyn TickReceiver>>,
    running: bool,
    last_timestamp: f64,
    accumulator: f64,
    stats: FrameStats,
}

struct SchedulerInner {
    state: RefCell<SchedulerState>,
    timestep_ms: f64,
    clock: Rc<dyn Clock>,
    driver: Rc<dyn FrameDriver>,
}

/// Cloneable handle to the shared loop.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

/// Non-owning handle, for frame callbacks owned by the driver.
#[derive(Clone)]
pub struct WeakScheduler {
    inner: Weak<SchedulerInner>,
}

impl WeakScheduler {
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }
}

impl Scheduler {
    pub fn new(config: &Config, clock: Rc<dyn Clock>, driver: Rc<dyn FrameDriver>) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                state: RefCell::new(SchedulerState {
                    active: IndexMap::new(),
                    running: false,
                    last_timestamp: 0.0,
                    accumulator: 0.0,
                    stats: FrameStats::new(config),
                }),
                timestep_ms: config.fixed_timestep_ms(),
                clock,
                driver,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.inner.clock.now_ms()
    }

    #[inline]
    pub fn timestep_ms(&self) -> f64 {
        self.inner.timestep_ms
    }

    /// Add a receiver to the active set and start the loop if needed.
    /// Joining twice keeps the existing position.
    pub fn join(&self, id: PlayerId, receiver: Rc<dyn TickReceiver>) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.active.contains_key(&id) {
                state.active.insert(id, receiver);
            }
        }
        self.ensure_running();
    }

    /// Remove a receiver. The loop stops at the end of its next tick if the
    /// set is empty.
    pub fn leave(&self, id: PlayerId) -> bool {
        self.inner.state.borrow_mut().active.shift_remove(&id).is_some()
    }

    /// Start the loop when it is stopped and something is active.
    pub fn ensure_running(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.running || state.active.is_empty() {
                return;
            }
            state.running = true;
            state.last_timestamp = self.inner.clock.now_ms();
            state.accumulator = 0.0;
            log::debug!("scheduler started with {} active", state.active.len());
        }
        self.inner.driver.request_frame();
    }

    /// Frame callback.
    ///
    /// Every active receiver is advanced once, with `timestamp_ms`, whenever at
    /// least one full step has accumulated; all whole steps are then drained.
    /// A render pass follows. Receivers that leave mid-tick are skipped.
    pub fn tick(&self, timestamp_ms: f64) -> TickReport {
        let (delta_ms, steps, receivers) = {
            let mut state = self.inner.state.borrow_mut();
            if !state.running {
                return TickReport::default();
            }
            let delta_ms = (timestamp_ms - state.last_timestamp).max(0.0);
            state.last_timestamp = timestamp_ms;
            state.accumulator += delta_ms;
            state.stats.record(delta_ms);

            let step = self.inner.timestep_ms;
            let steps = if step > 0.0 && state.accumulator >= step {
                (state.accumulator / step).floor()
            } else {
                0.0
            };
            state.accumulator -= steps * step;

            let receivers: Vec<(PlayerId, Rc<dyn TickReceiver>)> = state
                .active
                .iter()
                .map(|(id, r)| (*id, Rc::clone(r)))
                .collect();
            (delta_ms, steps as u32, receivers)
        };

        let mut updated = 0;
        if steps > 0 {
            for (id, receiver) in &receivers {
                if self.is_active(*id) {
                    receiver.advance(timestamp_ms);
                    updated += 1;
                }
            }
        }
        for (id, receiver) in &receivers {
            if self.is_active(*id) {
                receiver.render();
            }
        }

        let running = {
            let mut state = self.inner.state.borrow_mut();
            if state.active.is_empty() {
                state.running = false;
                log::debug!("scheduler idle; stopping");
            }
            state.running
        };
        if running {
            self.inner.driver.request_frame();
        }

        TickReport {
            delta_ms,
            steps,
            updated,
            running,
        }
    }

    /// Drop every receiver and stop the loop. Each dropped receiver is told
    /// through [`TickReceiver::stopped`].
    pub fn shutdown(&self) {
        let dropped: Vec<Rc<dyn TickReceiver>> = {
            let mut state = self.inner.state.borrow_mut();
            state.running = false;
            state.accumulator = 0.0;
            state.active.drain(..).map(|(_, r)| r).collect()
        };
        for receiver in dropped {
            receiver.stopped();
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.inner.state.borrow().stats.clone()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().running
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.inner.state.borrow().active.len()
    }

    #[inline]
    pub fn is_active(&self, id: PlayerId) -> bool {
        self.inner.state.borrow().active.contains_key(&id)
    }

    /// Active receivers in join order.
    pub fn active_ids(&self) -> Vec<PlayerId> {
        self.inner.state.borrow().active.keys().copied().collect()
    }
}
