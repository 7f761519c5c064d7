//! Character-by-character text reveal.
//!
//! Blocks arrive pre-rendered as HTML. The typewriter reveals one visible
//! character per interval and treats markup (tags, entities) as atomic so a
//! half-revealed `<em>` never reaches the presentation layer. Tags cost no
//! reveal tick of their own.

use chrono::{DateTime, Duration, Utc};
use storyweave_core::bus::EventBus;
use storyweave_core::event::GameEvent;
use storyweave_core::scheduler::TimerQueue;

/// Paced reveal of one text block.
pub struct Typewriter {
    segments: Vec<String>,
    revealed: usize,
    block_index: usize,
    typing: bool,
    timers: TimerQueue<()>,
}

impl Typewriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            revealed: 0,
            block_index: 0,
            typing: false,
            timers: TimerQueue::new(),
        }
    }

    /// Begins revealing `html`. A non-positive `speed_ms` shows the whole
    /// block at once and completes immediately.
    pub fn start(
        &mut self,
        html: &str,
        block_index: usize,
        speed_ms: i64,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) {
        self.segments = segment(html);
        self.revealed = 0;
        self.block_index = block_index;
        self.timers.clear();

        if speed_ms <= 0 || self.segments.is_empty() {
            self.revealed = self.segments.len();
            self.typing = false;
            bus.publish(&GameEvent::TextComplete { block_index });
            return;
        }

        self.typing = true;
        self.reveal_markup();
        if self.revealed >= self.segments.len() {
            self.finish(bus);
            return;
        }
        self.timers
            .schedule_repeating(now, Duration::milliseconds(speed_ms), ());
    }

    /// Pumps the reveal timers. Publishes `text:complete` when the block
    /// finishes on its own.
    pub fn tick(&mut self, now: DateTime<Utc>, bus: &mut EventBus) {
        while self.typing && self.timers.pop_due(now).is_some() {
            self.revealed += 1;
            self.reveal_markup();
            if self.revealed >= self.segments.len() {
                self.finish(bus);
            }
        }
    }

    /// Reveals the rest of the block immediately. Publishes `text:skip`
    /// followed by `text:complete`. No-op when nothing is typing.
    pub fn skip(&mut self, bus: &mut EventBus) {
        if !self.typing {
            return;
        }
        self.revealed = self.segments.len();
        bus.publish(&GameEvent::TextSkip {
            block_index: self.block_index,
        });
        self.finish(bus);
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// The portion of the block revealed so far.
    #[must_use]
    pub fn visible(&self) -> String {
        self.segments[..self.revealed.min(self.segments.len())].concat()
    }

    // Markup segments are free: swallow any run of them so the next timed
    // reveal lands on a visible character.
    fn reveal_markup(&mut self) {
        while self
            .segments
            .get(self.revealed)
            .is_some_and(|s| s.starts_with('<'))
        {
            self.revealed += 1;
        }
    }

    fn finish(&mut self, bus: &mut EventBus) {
        self.typing = false;
        self.timers.clear();
        bus.publish(&GameEvent::TextComplete {
            block_index: self.block_index,
        });
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Typewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typewriter")
            .field("block_index", &self.block_index)
            .field("revealed", &self.revealed)
            .field("total", &self.segments.len())
            .field("typing", &self.typing)
            .finish()
    }
}

/// Splits HTML into reveal units: each tag and each entity is one unit,
/// every other character stands alone.
fn segment(html: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut tag = String::from(c);
                for t in chars.by_ref() {
                    tag.push(t);
                    if t == '>' {
                        break;
                    }
                }
                out.push(tag);
            }
            '&' => {
                let mut entity = String::from(c);
                while let Some(&t) = chars.peek() {
                    if t == '&' || t == '<' || entity.len() > 8 {
                        break;
                    }
                    entity.push(t);
                    chars.next();
                    if t == ';' {
                        break;
                    }
                }
                out.push(entity);
            }
            _ => out.push(c.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use storyweave_core::clock::Clock;
    use storyweave_core::event::Topic;
    use storyweave_test_support::{EventLog, StepClock};

    use super::*;

    #[test]
    fn test_segment_keeps_tags_and_entities_atomic() {
        let segments = segment("<p>a &amp; b</p>");
        assert_eq!(
            segments,
            vec!["<p>", "a", " ", "&amp;", " ", "b", "</p>"]
        );
    }

    #[test]
    fn test_reveal_is_paced_by_the_clock() {
        // Arrange
        let clock = StepClock::default();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::TextComplete]);
        let mut tw = Typewriter::new();

        // Act
        tw.start("<p>Hi</p>", 0, 10, clock.now(), &mut bus);

        // Assert
        assert!(tw.is_typing());
        assert_eq!(tw.visible(), "<p>");

        clock.advance(Duration::milliseconds(10));
        tw.tick(clock.now(), &mut bus);
        assert_eq!(tw.visible(), "<p>H");

        clock.advance(Duration::milliseconds(10));
        tw.tick(clock.now(), &mut bus);
        assert_eq!(tw.visible(), "<p>Hi</p>");
        assert!(!tw.is_typing());
        assert_eq!(log.topics(), vec![Topic::TextComplete]);
    }

    #[test]
    fn test_skip_reveals_everything_and_publishes_skip_then_complete() {
        // Arrange
        let clock = StepClock::default();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::TextSkip, Topic::TextComplete]);
        let mut tw = Typewriter::new();
        tw.start("Long enough to skip", 2, 18, clock.now(), &mut bus);

        // Act
        tw.skip(&mut bus);

        // Assert
        assert!(!tw.is_typing());
        assert_eq!(tw.visible(), "Long enough to skip");
        assert_eq!(log.topics(), vec![Topic::TextSkip, Topic::TextComplete]);
    }

    #[test]
    fn test_instant_speed_completes_immediately() {
        let clock = StepClock::default();
        let mut bus = EventBus::new();
        let log = EventLog::default();
        log.attach(&mut bus, &[Topic::TextComplete]);
        let mut tw = Typewriter::new();

        tw.start("Whole block", 0, 0, clock.now(), &mut bus);

        assert!(!tw.is_typing());
        assert_eq!(tw.visible(), "Whole block");
        assert_eq!(log.topics(), vec![Topic::TextComplete]);
    }

    #[test]
    fn test_skip_after_completion_is_a_no_op() {
        let clock = StepClock::default();
        let mut bus = EventBus::new();
        let mut tw = Typewriter::new();
        tw.start("x", 0, 0, clock.now(), &mut bus);

        let log = EventLog::default();
        log.attach_all(&mut bus);
        tw.skip(&mut bus);

        assert!(log.topics().is_empty());
    }
}
