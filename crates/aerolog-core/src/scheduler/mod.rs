//! Cooperative multi-rate scheduler
//!
//! One loop, one monotonic clock read per iteration, four fixed-period tasks
//! checked in priority order. A due task runs to completion before the next
//! one is checked. Nothing sleeps between iterations, and a task that ran
//! long fires once when it returns rather than catching up on missed
//! periods.

mod tasks;

pub use tasks::Task;

use log::{info, trace};

use crate::app_state::{AppState, Board, Peripherals};
use crate::clock::{Millis, MonotonicClock, is_due};
use crate::config::ScheduleConfig;
use crate::startup::{self, BootReport};

/// Tasks that ran on one iteration, in the order they ran.
pub type Dispatched = heapless::Vec<Task, 4>;

/// Period and last-run timestamp of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSlot {
    pub task: Task,
    pub period_ms: Millis,
    pub last_run_ms: Millis,
}

impl TaskSlot {
    pub const fn new(task: Task, period_ms: Millis) -> Self {
        Self {
            task,
            period_ms,
            last_run_ms: 0,
        }
    }

    /// If the task is due at `now`, mark it run and return `true`.
    pub fn poll(&mut self, now: Millis) -> bool {
        if !is_due(now, self.last_run_ms, self.period_ms) {
            return false;
        }
        self.last_run_ms = now;
        true
    }
}

/// Owns the peripherals and the application state, and lends them to one
/// task body at a time.
pub struct Scheduler<'a, B: Board> {
    peripherals: Peripherals<B>,
    state: AppState<'a, B>,
    slots: [TaskSlot; 4],
}

impl<'a, B: Board> Scheduler<'a, B> {
    pub fn new(peripherals: Peripherals<B>, state: AppState<'a, B>, schedule: &ScheduleConfig) -> Self {
        let slots = Task::PRIORITY.map(|task| TaskSlot::new(task, task.period_ms(schedule)));
        for slot in &slots {
            info!("Task {} every {} ms", slot.task.name(), slot.period_ms);
        }

        Self {
            peripherals,
            state,
            slots,
        }
    }

    /// Run the boot sequence. Call once, before the first tick.
    pub fn boot(&mut self) -> BootReport {
        startup::boot(&mut self.peripherals, &mut self.state)
    }

    /// One pass over the task table.
    pub fn tick(&mut self) -> Dispatched {
        let now = self.peripherals.clock.now_ms();
        let mut dispatched = Dispatched::new();

        for slot in &mut self.slots {
            if !slot.poll(now) {
                continue;
            }
            trace!("{} at {} ms", slot.task.name(), now);
            tasks::run(slot.task, &mut self.peripherals, &mut self.state);
            // Capacity equals the number of slots.
            let _ = dispatched.push(slot.task);
        }

        dispatched
    }

    /// Tick forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    pub fn slots(&self) -> &[TaskSlot; 4] {
        &self.slots
    }

    pub fn peripherals(&self) -> &Peripherals<B> {
        &self.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<B> {
        &mut self.peripherals
    }

    pub fn state(&self) -> &AppState<'a, B> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState<'a, B> {
        &mut self.state
    }
}
