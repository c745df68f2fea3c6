//! Completion and crash-suspicion detection
//!
//! Consumes the tailed log events and decides when the run is over. The
//! harness announces a finished suite with a marker line; everything else
//! is inferred from silence. A log that stops advancing before the marker
//! can mean a browser crash, a hang in the harness, or a hang in the test
//! itself, so the detector only ever *suspects* a crash.

use super::tailer::TailEvent;

/// Substring the harness writes when the whole suite has run
pub const COMPLETION_MARKER: &str = "Test Suite Finished";

/// Attribution used when the last log line names no test
pub const UNKNOWN_TEST: &str = "Unknown Test";

/// Outcome of observing one tail event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Keep consuming events
    Continue,
    /// The completion marker was seen; terminal
    Completed,
    /// The log stayed silent for the full idle budget; terminal
    IdleTimeout,
}

/// Tracks log activity against the idle-timeout budget
#[derive(Debug)]
pub struct CompletionDetector {
    idle_limit: u32,
    idle_ticks: u32,
    last_line: Option<String>,
}

impl CompletionDetector {
    pub fn new(idle_limit: u32) -> Self {
        Self {
            idle_limit,
            idle_ticks: 0,
            last_line: None,
        }
    }

    /// Feed one tail event. Any line, marker or not, resets the idle
    /// counter; each idle tick spends one unit of the budget.
    pub fn observe(&mut self, event: &TailEvent) -> Detection {
        match event {
            TailEvent::Line(line) => {
                self.idle_ticks = 0;
                self.last_line = Some(line.clone());
                if line.contains(COMPLETION_MARKER) {
                    Detection::Completed
                } else {
                    Detection::Continue
                }
            }
            TailEvent::Idle => {
                self.idle_ticks += 1;
                if self.idle_ticks >= self.idle_limit {
                    Detection::IdleTimeout
                } else {
                    Detection::Continue
                }
            }
        }
    }

    /// Best-effort name of the test that was running when the log went
    /// silent, taken from the last line seen before the timeout.
    pub fn offending_test(&self) -> String {
        self.last_line
            .as_deref()
            .and_then(structured_test_name)
            .unwrap_or(UNKNOWN_TEST)
            .to_string()
    }
}

/// Extract the test name from a structured status line.
///
/// Status lines have the shape `<prefix> | <test> | <detail>...`; the first
/// pipe-delimited field after the prefix names the test. Anything with
/// fewer than three fields is not a status line.
fn structured_test_name(line: &str) -> Option<&str> {
    let mut fields = line.split('|');
    let _prefix = fields.next()?;
    let test = fields.next()?;
    fields.next()?;
    Some(test.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> TailEvent {
        TailEvent::Line(text.to_string())
    }

    #[test]
    fn test_completion_marker_is_terminal() {
        let mut detector = CompletionDetector::new(60);
        assert_eq!(detector.observe(&line("FIREBUG INFO | firebug/test1.js | start")), Detection::Continue);
        assert_eq!(
            detector.observe(&line("FIREBUG INFO | Test Suite Finished | 12 passed")),
            Detection::Completed
        );
    }

    #[test]
    fn test_idle_budget_reached_without_marker() {
        let mut detector = CompletionDetector::new(3);
        assert_eq!(detector.observe(&TailEvent::Idle), Detection::Continue);
        assert_eq!(detector.observe(&TailEvent::Idle), Detection::Continue);
        assert_eq!(detector.observe(&TailEvent::Idle), Detection::IdleTimeout);
    }

    #[test]
    fn test_any_line_resets_idle_counter() {
        let mut detector = CompletionDetector::new(3);
        detector.observe(&TailEvent::Idle);
        detector.observe(&TailEvent::Idle);
        detector.observe(&line("still alive"));
        detector.observe(&TailEvent::Idle);
        detector.observe(&TailEvent::Idle);
        assert_eq!(detector.observe(&TailEvent::Idle), Detection::IdleTimeout);
    }

    #[test]
    fn test_offending_test_from_structured_line() {
        let mut detector = CompletionDetector::new(1);
        detector.observe(&line("FIREBUG INFO |  testFoo.js  | opening panel"));
        assert_eq!(detector.observe(&TailEvent::Idle), Detection::IdleTimeout);
        assert_eq!(detector.offending_test(), "testFoo.js");
    }

    #[test]
    fn test_unstructured_last_line_reports_unknown_test() {
        let mut detector = CompletionDetector::new(1);
        detector.observe(&line("something went sideways"));
        detector.observe(&TailEvent::Idle);
        assert_eq!(detector.offending_test(), UNKNOWN_TEST);
    }

    #[test]
    fn test_two_field_line_is_not_structured() {
        let mut detector = CompletionDetector::new(1);
        detector.observe(&line("FIREBUG INFO | trailing"));
        detector.observe(&TailEvent::Idle);
        assert_eq!(detector.offending_test(), UNKNOWN_TEST);
    }

    #[test]
    fn test_no_lines_at_all_reports_unknown_test() {
        let detector = CompletionDetector::new(1);
        assert_eq!(detector.offending_test(), UNKNOWN_TEST);
    }
}
