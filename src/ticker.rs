use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use stopwatch_core::{Clock, StopwatchStateHolder, DEFAULT_TIME};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::TickerConfig;

type SharedHolder<C> = Arc<Mutex<StopwatchStateHolder<C>>>;

/// Drives one stopwatch: forwards start/pause/stop to its state holder and,
/// while running, samples the holder on a fixed interval and publishes the
/// formatted time.
///
/// Subscribers only ever see the latest sample; a slow reader never holds
/// up the loop. Must be used from inside a tokio runtime.
pub struct StopwatchTicker<C: Clock + ?Sized + 'static> {
    name: String,
    holder: SharedHolder<C>,
    ticker: Arc<watch::Sender<String>>,
    job: Option<CancellationToken>,
    config: TickerConfig,
}

impl<C: Clock + ?Sized + 'static> StopwatchTicker<C> {
    pub fn new(name: impl Into<String>, clock: Arc<C>, config: TickerConfig) -> Self {
        let (ticker, _) = watch::channel(DEFAULT_TIME.to_string());
        Self {
            name: name.into(),
            holder: Arc::new(Mutex::new(StopwatchStateHolder::new(clock))),
            ticker: Arc::new(ticker),
            job: None,
            config,
        }
    }

    pub fn start(&mut self) {
        if !self.is_ticking() {
            self.start_job();
        }
        lock(&self.holder).start();
        log::info!("{}: started", self.name);
    }

    pub fn pause(&mut self) {
        let mut holder = lock(&self.holder);
        holder.pause();
        // Cancel while still holding the lock so the loop can't publish after this
        if let Some(token) = self.job.take() {
            token.cancel();
        }
        log::info!("{}: paused at {} ms", self.name, holder.elapsed_ms());
    }

    pub fn stop(&mut self) {
        let mut holder = lock(&self.holder);
        holder.stop();
        if let Some(token) = self.job.take() {
            token.cancel();
        }
        self.ticker.send_replace(DEFAULT_TIME.to_string());
        log::info!("{}: stopped", self.name);
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.ticker.subscribe()
    }

    /// Most recently published value.
    pub fn current(&self) -> String {
        self.ticker.borrow().clone()
    }

    pub fn is_ticking(&self) -> bool {
        self.job.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn start_job(&mut self) {
        let token = CancellationToken::new();
        tokio::spawn(sample_loop(
            self.name.clone(),
            Arc::clone(&self.holder),
            Arc::clone(&self.ticker),
            token.clone(),
            self.config.tick_interval,
        ));
        self.job = Some(token);
    }
}

impl<C: Clock + ?Sized + 'static> Drop for StopwatchTicker<C> {
    fn drop(&mut self) {
        if let Some(token) = self.job.take() {
            token.cancel();
        }
    }
}

async fn sample_loop<C: Clock + ?Sized>(
    name: String,
    holder: SharedHolder<C>,
    ticker: Arc<watch::Sender<String>>,
    token: CancellationToken,
    interval: Duration,
) {
    log::debug!("{}: sampling every {:?}", name, interval);
    loop {
        {
            let holder = lock(&holder);
            if token.is_cancelled() {
                break;
            }
            let sample = holder.render();
            log::trace!("{}: tick {}", name, sample);
            ticker.send_replace(sample);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    log::debug!("{}: sampling loop finished", name);
}

fn lock<C: Clock + ?Sized>(
    holder: &Mutex<StopwatchStateHolder<C>>,
) -> MutexGuard<'_, StopwatchStateHolder<C>> {
    // The holder's state is a plain value; a panic elsewhere can't leave it torn
    holder.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use stopwatch_core::FakeClock;
    use tokio::time::sleep;

    use super::*;

    const SETTLE: Duration = Duration::from_millis(25);

    fn fixture(clock: &FakeClock) -> StopwatchTicker<FakeClock> {
        StopwatchTicker::new("test", Arc::new(clock.clone()), TickerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_pause_resume_stop() {
        let clock = FakeClock::new(0);
        let mut fixture = fixture(&clock);
        let rx = fixture.subscribe();
        assert_eq!(*rx.borrow(), DEFAULT_TIME);

        fixture.start();
        clock.set(500);
        sleep(SETTLE).await;
        assert_eq!(*rx.borrow(), "00:00:500");

        fixture.pause();
        clock.set(900);
        sleep(SETTLE).await;
        assert_eq!(*rx.borrow(), "00:00:500");

        fixture.start();
        clock.set(1200);
        sleep(SETTLE).await;
        assert_eq!(*rx.borrow(), "00:00:800");

        fixture.stop();
        assert_eq!(*rx.borrow(), DEFAULT_TIME);
        clock.set(5000);
        sleep(SETTLE).await;
        assert_eq!(fixture.current(), DEFAULT_TIME);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_once_per_configured_interval() {
        let clock = FakeClock::new(0);
        let config = TickerConfig {
            tick_interval: Duration::from_millis(100),
        };
        let mut fixture = StopwatchTicker::new("cadence", Arc::new(clock.clone()), config);
        let mut rx = fixture.subscribe();

        fixture.start();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(1050);
        let mut publishes = 0;
        while let Ok(Ok(())) = tokio::time::timeout_at(deadline, rx.changed()).await {
            rx.borrow_and_update();
            publishes += 1;
            clock.advance(100);
        }

        // Ticks at 0, 100, ..., 1000 ms
        assert_eq!(publishes, 11);
        assert_eq!(fixture.current(), "00:01:000");
        fixture.pause();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_start_spawns_one_loop() {
        let clock = FakeClock::new(0);
        let mut fixture = fixture(&clock);
        let mut rx = fixture.subscribe();

        fixture.start();
        fixture.start();
        sleep(SETTLE).await;
        assert!(fixture.is_ticking());

        fixture.pause();
        assert!(!fixture.is_ticking());
        rx.borrow_and_update();

        // An orphaned loop would keep publishing here
        clock.advance(1000);
        sleep(Duration::from_millis(200)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(fixture.current(), "00:00:000");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_before_first_tick_publishes_nothing() {
        let clock = FakeClock::new(0);
        let mut fixture = fixture(&clock);
        let rx = fixture.subscribe();

        fixture.start();
        clock.set(300);
        fixture.pause();
        sleep(SETTLE).await;

        assert!(!rx.has_changed().unwrap());
        assert_eq!(fixture.current(), DEFAULT_TIME);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_paused_clears_display() {
        let clock = FakeClock::new(0);
        let mut fixture = fixture(&clock);
        fixture.start();
        clock.set(2500);
        sleep(SETTLE).await;
        fixture.pause();
        assert_eq!(fixture.current(), "00:02:500");

        fixture.stop();
        assert_eq!(fixture.current(), DEFAULT_TIME);
        assert!(!fixture.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_tickers_share_one_clock() {
        let clock = FakeClock::new(0);
        let shared = Arc::new(clock.clone());
        let mut left = StopwatchTicker::new("left", Arc::clone(&shared), TickerConfig::default());
        let mut right = StopwatchTicker::new("right", shared, TickerConfig::default());

        left.start();
        clock.set(1000);
        right.start();
        clock.set(1500);
        sleep(SETTLE).await;
        assert_eq!(left.current(), "00:01:500");
        assert_eq!(right.current(), "00:00:500");

        left.stop();
        clock.set(2000);
        sleep(SETTLE).await;
        assert_eq!(left.current(), DEFAULT_TIME);
        assert_eq!(right.current(), "00:01:000");
    }
}
