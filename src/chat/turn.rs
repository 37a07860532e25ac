use crate::api::StreamEvent;
use crate::models::{GroundingSource, STREAM_FAILURE_MESSAGE};

/// Phase of one in-flight turn. `Idle` is the absence of a `Turn`; a turn is
/// constructed in `Sent` and can only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Sent,
    Streaming,
    Settled,
}

/// A patch for the in-progress model message: full replacement text plus the
/// citation set when one has arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePatch {
    pub content: String,
    pub sources: Option<Vec<GroundingSource>>,
}

/// Reducer for one streamed turn.
///
/// Each `Text` event carries the cumulative response so far, so applying the
/// same event twice yields the same state. Citations are last-write-wins.
/// The generating flag stays up until the turn settles, whether the stream
/// ended normally or failed.
pub struct Turn {
    phase: TurnPhase,
    content: String,
    sources: Option<Vec<GroundingSource>>,
}

impl Turn {
    pub fn begin() -> Self {
        Self {
            phase: TurnPhase::Sent,
            content: String::new(),
            sources: None,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// True from `Sent` through `Streaming`; gates the composer.
    pub fn is_generating(&self) -> bool {
        self.phase != TurnPhase::Settled
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sources(&self) -> Option<&[GroundingSource]> {
        self.sources.as_deref()
    }

    /// Apply one stream event. Returns the patch to store when the visible
    /// message changed. Events after settlement are ignored.
    pub fn apply(&mut self, event: StreamEvent) -> Option<MessagePatch> {
        if self.phase == TurnPhase::Settled {
            return None;
        }
        match event {
            StreamEvent::Text(cumulative) => {
                self.phase = TurnPhase::Streaming;
                self.content = cumulative;
                Some(self.patch())
            }
            StreamEvent::Citations(sources) => {
                self.phase = TurnPhase::Streaming;
                self.sources = Some(sources);
                Some(self.patch())
            }
            StreamEvent::End => {
                self.phase = TurnPhase::Settled;
                None
            }
        }
    }

    /// Settle without an explicit `End` event (stream exhausted).
    pub fn settle(&mut self) {
        self.phase = TurnPhase::Settled;
    }

    /// Settle after a mid-stream failure: the message becomes the fixed
    /// fallback and citations are discarded.
    pub fn fail(&mut self) -> MessagePatch {
        self.phase = TurnPhase::Settled;
        self.content = STREAM_FAILURE_MESSAGE.to_string();
        self.sources = None;
        self.patch()
    }

    fn patch(&self) -> MessagePatch {
        MessagePatch {
            content: self.content.clone(),
            sources: self.sources.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(uri: &str) -> GroundingSource {
        GroundingSource {
            uri: uri.to_string(),
            title: "Untitled".to_string(),
        }
    }

    #[test]
    fn first_chunk_moves_sent_to_streaming() {
        let mut turn = Turn::begin();
        assert_eq!(turn.phase(), TurnPhase::Sent);
        assert!(turn.is_generating());

        let patch = turn.apply(StreamEvent::Text("Hel".to_string())).unwrap();
        assert_eq!(turn.phase(), TurnPhase::Streaming);
        assert_eq!(patch.content, "Hel");
    }

    #[test]
    fn text_events_replace_rather_than_append() {
        let mut turn = Turn::begin();
        turn.apply(StreamEvent::Text("Hel".to_string()));
        let patch = turn.apply(StreamEvent::Text("Hello".to_string())).unwrap();
        assert_eq!(patch.content, "Hello");
        assert_eq!(turn.content(), "Hello");
    }

    #[test]
    fn repeated_identical_text_is_idempotent() {
        let mut turn = Turn::begin();
        let first = turn.apply(StreamEvent::Text("same".to_string())).unwrap();
        let second = turn.apply(StreamEvent::Text("same".to_string())).unwrap();
        assert_eq!(first, second);
        assert_eq!(turn.content(), "same");
    }

    #[test]
    fn citations_are_last_write_wins() {
        let mut turn = Turn::begin();
        turn.apply(StreamEvent::Citations(vec![source("https://a.example")]));
        let patch = turn
            .apply(StreamEvent::Citations(vec![source("https://b.example")]))
            .unwrap();
        assert_eq!(patch.sources.unwrap()[0].uri, "https://b.example");
    }

    #[test]
    fn end_settles_and_releases_the_generating_flag() {
        let mut turn = Turn::begin();
        turn.apply(StreamEvent::Text("done".to_string()));
        assert!(turn.apply(StreamEvent::End).is_none());
        assert_eq!(turn.phase(), TurnPhase::Settled);
        assert!(!turn.is_generating());
        assert_eq!(turn.content(), "done");
    }

    #[test]
    fn failure_before_any_chunk_yields_the_fallback() {
        let mut turn = Turn::begin();
        let patch = turn.fail();
        assert_eq!(patch.content, STREAM_FAILURE_MESSAGE);
        assert!(patch.sources.is_none());
        assert!(!turn.is_generating());
    }

    #[test]
    fn failure_discards_partial_text_and_citations() {
        let mut turn = Turn::begin();
        turn.apply(StreamEvent::Text("partial".to_string()));
        turn.apply(StreamEvent::Citations(vec![source("https://a.example")]));
        let patch = turn.fail();
        assert_eq!(patch.content, STREAM_FAILURE_MESSAGE);
        assert!(patch.sources.is_none());
    }

    #[test]
    fn events_after_settlement_are_ignored() {
        let mut turn = Turn::begin();
        turn.apply(StreamEvent::Text("final".to_string()));
        turn.apply(StreamEvent::End);
        assert!(turn.apply(StreamEvent::Text("late".to_string())).is_none());
        assert_eq!(turn.content(), "final");
    }

    #[test]
    fn settled_content_equals_last_cumulative_chunk() {
        let mut turn = Turn::begin();
        for cumulative in ["a", "ab", "abc"] {
            turn.apply(StreamEvent::Text(cumulative.to_string()));
        }
        turn.settle();
        assert_eq!(turn.content(), "abc");
    }
}
