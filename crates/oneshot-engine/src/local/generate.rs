//! Echo generation executed on the processing loop.

use std::sync::mpsc::Sender;

use super::tokenizer::ByteTokenizer;

/// Why generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishReason {
    Stop,
    Length,
}

impl FinishReason {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
        }
    }

    /// Name used by the native completion framing.
    pub(crate) const fn stop_type(self) -> &'static str {
        match self {
            Self::Stop => "eos",
            Self::Length => "limit",
        }
    }
}

/// A generation request as queued by a handler.
#[derive(Debug, Clone)]
pub(crate) struct GenerationJob {
    /// Text whose words are replayed.
    pub(crate) source: String,
    pub(crate) prompt_tokens: usize,
    /// Maximum number of pieces; `None` means unbounded.
    pub(crate) max_pieces: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GenerationSummary {
    pub(crate) finish: FinishReason,
    pub(crate) prompt_tokens: usize,
    pub(crate) completion_tokens: usize,
    pub(crate) cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GenerationEvent {
    Piece(String),
    Done(GenerationSummary),
}

/// Splits `source` into pieces: the first word bare, later ones space-led.
pub(crate) fn echo_pieces(source: &str) -> Vec<String> {
    source
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            if index == 0 {
                word.to_owned()
            } else {
                format!(" {word}")
            }
        })
        .collect()
}

/// Runs `job`, sending each piece and a final summary on `events`.
///
/// `halted` is polled before every piece.
pub(crate) fn run_generation(
    job: &GenerationJob,
    events: &Sender<GenerationEvent>,
    tokenizer: ByteTokenizer,
    halted: impl Fn() -> bool,
) {
    let mut summary = GenerationSummary {
        finish: FinishReason::Stop,
        prompt_tokens: job.prompt_tokens,
        completion_tokens: 0,
        cancelled: false,
    };
    for (produced, piece) in echo_pieces(&job.source).into_iter().enumerate() {
        if halted() {
            summary.cancelled = true;
            break;
        }
        if job.max_pieces.is_some_and(|max| produced >= max) {
            summary.finish = FinishReason::Length;
            break;
        }
        summary.completion_tokens += tokenizer.encode(&piece, false).len();
        if events.send(GenerationEvent::Piece(piece)).is_err() {
            return;
        }
    }
    let _ = events.send(GenerationEvent::Done(summary));
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use rstest::rstest;

    use super::*;

    fn job(source: &str, max_pieces: Option<usize>) -> GenerationJob {
        GenerationJob {
            source: source.to_owned(),
            prompt_tokens: 4,
            max_pieces,
        }
    }

    fn collect(job: &GenerationJob, halted: impl Fn() -> bool) -> Vec<GenerationEvent> {
        let (tx, rx) = mpsc::channel();
        run_generation(job, &tx, ByteTokenizer, halted);
        drop(tx);
        rx.iter().collect()
    }

    #[test]
    fn pieces_keep_word_spacing() {
        assert_eq!(echo_pieces("  hello   big world "), vec!["hello", " big", " world"]);
    }

    #[rstest]
    #[case(None, 3, FinishReason::Stop)]
    #[case(Some(3), 3, FinishReason::Stop)]
    #[case(Some(2), 2, FinishReason::Length)]
    #[case(Some(0), 0, FinishReason::Length)]
    fn limits_set_finish_reason(
        #[case] max_pieces: Option<usize>,
        #[case] pieces: usize,
        #[case] finish: FinishReason,
    ) {
        let events = collect(&job("a b c", max_pieces), || false);
        assert_eq!(events.len(), pieces + 1);
        match events.last() {
            Some(GenerationEvent::Done(summary)) => {
                assert_eq!(summary.finish, finish);
                assert!(!summary.cancelled);
            }
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn halting_stops_before_the_next_piece() {
        let events = collect(&job("a b c", None), || true);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events.first(),
            Some(GenerationEvent::Done(GenerationSummary { cancelled: true, .. }))
        ));
    }

    #[test]
    fn completion_tokens_count_piece_bytes() {
        let events = collect(&job("ab cd", None), || false);
        let Some(GenerationEvent::Done(summary)) = events.last() else {
            panic!("missing summary");
        };
        assert_eq!(summary.completion_tokens, 5);
    }
}
