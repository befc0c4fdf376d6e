use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the game loop
#[derive(Clone, Debug)]
pub enum SafariEvent {
    Key(KeyEvent),
    Resize,
    /// One countdown second has passed
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait SafariEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<SafariEvent, RecvTimeoutError>;
}

/// Production event source reading crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<SafariEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too; only presses drive the game
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(SafariEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(SafariEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SafariEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SafariEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for headless tests
pub struct TestEventSource {
    rx: Receiver<SafariEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<SafariEvent>) -> Self {
        Self { rx }
    }
}

impl SafariEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SafariEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the game one event or tick at a time.
///
/// Ticks are paced against a deadline, so a stream of key presses cannot
/// stretch the countdown.
pub struct Runner<E: SafariEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Instant,
}

impl<E: SafariEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    /// Blocks until the next event arrives or the tick deadline passes
    pub fn step(&mut self) -> SafariEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            return self.fire_tick(now);
        }

        match self.event_source.recv_timeout(self.next_tick - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.fire_tick(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.next_tick.saturating_duration_since(Instant::now()));
                self.fire_tick(Instant::now())
            }
        }
    }

    /// Restart tick pacing, e.g. when a fresh countdown is armed
    pub fn reset_tick(&mut self) {
        self.next_tick = Instant::now() + self.ticker.interval();
    }

    fn fire_tick(&mut self, now: Instant) -> SafariEvent {
        self.next_tick = now.max(self.next_tick) + self.ticker.interval();
        SafariEvent::Tick
    }
}
