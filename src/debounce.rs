use std::time::Duration;

use tokio::time::Instant;

/// Quiescence timer. Arming again replaces the previous deadline, so only the
/// most recently scheduled one can ever fire.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consumes the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_pushes_the_deadline_out() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));

        debouncer.arm(start);
        debouncer.arm(start + Duration::from_millis(600));

        assert!(!debouncer.fire(start + Duration::from_millis(1000)));
        assert!(debouncer.fire(start + Duration::from_millis(1600)));
        assert!(!debouncer.fire(start + Duration::from_millis(5000)));
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.arm(start);
        debouncer.cancel();
        assert!(!debouncer.is_armed());
        assert!(!debouncer.fire(start + Duration::from_secs(10)));
    }
}
