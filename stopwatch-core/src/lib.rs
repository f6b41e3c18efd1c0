//! Pure stopwatch logic with no runtime dependencies.
//! Time comes from an injected [`Clock`], so everything here is testable
//! with a [`FakeClock`].

mod clock;

use std::sync::Arc;

pub use clock::{Clock, FakeClock, SystemClock};

/// Display value for a stopwatch that has not run, or was just stopped.
pub const DEFAULT_TIME: &str = "00:00:000";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Paused {
    pub elapsed_ms: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Running {
    pub start_ms: u64,
    /// Time banked before this run began at `start_ms`.
    pub elapsed_ms: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StopwatchState {
    Paused(Paused),
    Running(Running),
}

impl StopwatchState {
    pub fn paused(elapsed_ms: u64) -> Self {
        StopwatchState::Paused(Paused { elapsed_ms })
    }

    pub fn running(start_ms: u64, elapsed_ms: u64) -> Self {
        StopwatchState::Running(Running {
            start_ms,
            elapsed_ms,
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(self, StopwatchState::Running(_))
    }
}

impl Default for StopwatchState {
    fn default() -> Self {
        StopwatchState::Paused(Paused::default())
    }
}

impl From<Paused> for StopwatchState {
    fn from(paused: Paused) -> Self {
        StopwatchState::Paused(paused)
    }
}

impl From<Running> for StopwatchState {
    fn from(running: Running) -> Self {
        StopwatchState::Running(running)
    }
}

pub struct ElapsedTimeCalculator<C: Clock + ?Sized> {
    clock: Arc<C>,
}

impl<C: Clock + ?Sized> Clone for ElapsedTimeCalculator<C> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock + ?Sized> ElapsedTimeCalculator<C> {
    pub fn new(clock: Arc<C>) -> Self {
        Self { clock }
    }

    /// Banked time plus the time since the run started. A clock reading
    /// behind `start_ms` counts as zero.
    pub fn calculate(&self, running: &Running) -> u64 {
        let now = self.clock.now_ms();
        now.saturating_sub(running.start_ms)
            .saturating_add(running.elapsed_ms)
    }

    /// Effective elapsed time of any state: live for `Running`, stored for `Paused`.
    pub fn effective_elapsed(&self, state: &StopwatchState) -> u64 {
        match state {
            StopwatchState::Paused(paused) => paused.elapsed_ms,
            StopwatchState::Running(running) => self.calculate(running),
        }
    }
}

/// Computes the next state for a start or pause intent. Both transitions
/// are idempotent.
pub struct StopwatchStateCalculator<C: Clock + ?Sized> {
    clock: Arc<C>,
    elapsed: ElapsedTimeCalculator<C>,
}

impl<C: Clock + ?Sized> StopwatchStateCalculator<C> {
    pub fn new(clock: Arc<C>, elapsed: ElapsedTimeCalculator<C>) -> Self {
        Self { clock, elapsed }
    }

    /// An already running stopwatch keeps its original start.
    pub fn to_running(&self, state: StopwatchState) -> Running {
        match state {
            StopwatchState::Running(running) => running,
            StopwatchState::Paused(paused) => Running {
                start_ms: self.clock.now_ms(),
                elapsed_ms: paused.elapsed_ms,
            },
        }
    }

    /// Banks the running time.
    pub fn to_paused(&self, state: StopwatchState) -> Paused {
        match state {
            StopwatchState::Paused(paused) => paused,
            StopwatchState::Running(running) => Paused {
                elapsed_ms: self.elapsed.calculate(&running),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TimeFormatter;

impl TimeFormatter {
    /// Format milliseconds as "MM:SS:mmm", or "HH:MM:SS" once an hour has passed.
    pub fn format(&self, ms: u64) -> String {
        let millis = ms % 1000;
        let total_secs = ms / 1000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, mins, secs)
        } else {
            format!("{:02}:{:02}:{:03}", mins, secs, millis)
        }
    }
}

/// Sole owner of one stopwatch's state.
pub struct StopwatchStateHolder<C: Clock + ?Sized> {
    calculator: StopwatchStateCalculator<C>,
    elapsed: ElapsedTimeCalculator<C>,
    formatter: TimeFormatter,
    state: StopwatchState,
}

impl<C: Clock + ?Sized> StopwatchStateHolder<C> {
    pub fn new(clock: Arc<C>) -> Self {
        let elapsed = ElapsedTimeCalculator::new(Arc::clone(&clock));
        let calculator = StopwatchStateCalculator::new(clock, elapsed.clone());
        Self::with_parts(calculator, elapsed, TimeFormatter)
    }

    pub fn with_parts(
        calculator: StopwatchStateCalculator<C>,
        elapsed: ElapsedTimeCalculator<C>,
        formatter: TimeFormatter,
    ) -> Self {
        Self {
            calculator,
            elapsed,
            formatter,
            state: StopwatchState::default(),
        }
    }

    pub fn start(&mut self) {
        self.state = self.calculator.to_running(self.state).into();
    }

    pub fn pause(&mut self) {
        self.state = self.calculator.to_paused(self.state).into();
    }

    /// Unlike `pause`, drops all accumulated time.
    pub fn stop(&mut self) {
        self.state = StopwatchState::default();
    }

    pub fn state(&self) -> StopwatchState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.effective_elapsed(&self.state)
    }

    pub fn render(&self) -> String {
        self.formatter.format(self.elapsed_ms())
    }
}
