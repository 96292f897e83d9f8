/// Quiet period before an edit is reported to the host.
pub const CHANGE_DELAY_MS: f64 = 400.0;

/// Trailing-edge debouncer driven by an external clock. Every `schedule`
/// pushes the deadline back; `fire_due` reports true once the deadline has
/// passed and disarms.
#[derive(Clone, Debug)]
pub struct Debouncer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn fire_due(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(CHANGE_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_schedule_resets_the_deadline() {
        let mut debouncer = Debouncer::new(400.0);
        debouncer.schedule(0.0);
        debouncer.schedule(300.0);
        assert!(!debouncer.fire_due(500.0));
        assert!(debouncer.fire_due(700.0));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire_due(2000.0));
    }

    #[test]
    fn cancel_disarms() {
        let mut debouncer = Debouncer::default();
        debouncer.schedule(10.0);
        debouncer.cancel();
        assert!(!debouncer.fire_due(1000.0));
    }
}
