/// Idle window after the last keystroke before a stop signal goes out.
pub const TYPING_IDLE_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

/// Outbound typing indicator. Keystrokes emit a start signal and re-arm
/// a single idle deadline; the embedding event loop polls the deadline
/// and fires the stop. Deterministic over caller-supplied clocks.
#[derive(Debug)]
pub struct TypingIndicatorController {
    idle_ms: i64,
    deadline: Option<i64>,
    announced: bool,
}

impl Default for TypingIndicatorController {
    fn default() -> Self {
        Self {
            idle_ms: TYPING_IDLE_MS,
            deadline: None,
            announced: false,
        }
    }
}

impl TypingIndicatorController {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_idle_window(idle_ms: i64) -> Self {
        Self {
            idle_ms,
            ..Self::default()
        }
    }

    /// A keystroke landed with the given input content. Returns the start
    /// signal to put on the wire, or `None` when the input is empty or
    /// the channel is down (nothing to announce, nothing armed).
    pub fn keystroke(&mut self, content: &str, connected: bool, now: i64) -> Option<TypingSignal> {
        if content.is_empty() || !connected {
            return None;
        }
        self.deadline = Some(now + self.idle_ms);
        self.announced = true;
        Some(TypingSignal::Start)
    }

    /// Next instant at which `poll` can fire, for event loops that sleep.
    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    /// Fire the stop signal once the idle window has elapsed.
    pub fn poll(&mut self, now: i64) -> Option<TypingSignal> {
        match self.deadline {
            Some(deadline) if now >= deadline && self.announced => {
                self.deadline = None;
                self.announced = false;
                Some(TypingSignal::Stop)
            }
            _ => None,
        }
    }

    /// Screen unmounted or lost focus: drop the timer silently.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.announced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystroke_emits_start_and_arms_the_deadline() {
        let mut typing = TypingIndicatorController::with_idle_window(1_000);
        assert_eq!(typing.keystroke("h", true, 100), Some(TypingSignal::Start));
        assert_eq!(typing.deadline(), Some(1_100));
    }

    #[test]
    fn empty_input_or_disconnected_channel_is_silent() {
        let mut typing = TypingIndicatorController::with_idle_window(1_000);
        assert_eq!(typing.keystroke("", true, 100), None);
        assert_eq!(typing.keystroke("h", false, 100), None);
        assert_eq!(typing.deadline(), None);
        assert_eq!(typing.poll(10_000), None);
    }

    #[test]
    fn further_keystrokes_push_the_stop_out() {
        let mut typing = TypingIndicatorController::with_idle_window(1_000);
        typing.keystroke("h", true, 100);
        typing.keystroke("he", true, 900);
        assert_eq!(typing.poll(1_100), None);
        assert_eq!(typing.poll(1_900), Some(TypingSignal::Stop));
        // stop fires once
        assert_eq!(typing.poll(2_000), None);
    }

    #[test]
    fn cancel_suppresses_the_stop() {
        let mut typing = TypingIndicatorController::with_idle_window(1_000);
        typing.keystroke("h", true, 100);
        typing.cancel();
        assert_eq!(typing.poll(5_000), None);
    }
}
