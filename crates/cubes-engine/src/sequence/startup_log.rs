use std::rc::Rc;
use std::time::Duration;

use crate::time::TimeSource;

/// Timestamps startup messages relative to the previous one.
pub struct StartupLog {
    clock: Rc<dyn TimeSource>,
    began: Duration,
    last: Option<Duration>,
    lines: Vec<String>,
}

impl StartupLog {
    pub fn new(clock: Rc<dyn TimeSource>) -> Self {
        let began = clock.now();
        Self {
            clock,
            began,
            last: None,
            lines: Vec::new(),
        }
    }

    /// Records `text` and returns the line as displayed.
    ///
    /// The first line has a blank prefix of the same width as the elapsed
    /// prefix of later lines, so messages stay aligned.
    pub fn record(&mut self, text: &str) -> String {
        let now = self.clock.now();
        let line = match self.last {
            None => format!("{:12}{text}", ""),
            Some(last) => {
                let ms = now.saturating_sub(last).as_millis();
                format!("(+{ms:>5} ms) {text}")
            }
        };
        self.last = Some(now);
        self.lines.push(line.clone());
        line
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Time since the log was created.
    pub fn total(&self) -> Duration {
        self.clock.now().saturating_sub(self.began)
    }
}

impl std::fmt::Debug for StartupLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupLog")
            .field("lines", &self.lines.len())
            .finish()
    }
}
