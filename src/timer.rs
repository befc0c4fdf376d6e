/// What a single one-second tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Not armed; the tick was ignored
    Idle,
    Running { remaining: u32 },
    /// Reached zero on this tick. Delivered once per arming.
    Expired,
}

/// Cancellable per-round countdown driven by an external one-second tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    armed: bool,
    elapsed: u32,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the limit without starting; ticks are ignored until `arm`
    pub fn reset(&mut self, limit_secs: u32) {
        self.remaining = limit_secs;
        self.armed = false;
    }

    /// Start ticking down from the current remaining time.
    /// Arming with nothing left does nothing.
    pub fn arm(&mut self) {
        self.armed = self.remaining > 0;
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Seconds actually counted down since construction
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn tick(&mut self) -> CountdownTick {
        if !self.armed {
            return CountdownTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        self.elapsed += 1;

        if self.remaining == 0 {
            self.armed = false;
            CountdownTick::Expired
        } else {
            CountdownTick::Running {
                remaining: self.remaining,
            }
        }
    }
}
