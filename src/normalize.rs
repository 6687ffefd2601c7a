//! Removal of reasoning traces from backend answers.
//!
//! Some backends interleave their chain of thought with the answer, wrapped in markers such as
//! `<think>…</think>`. A single forward scan handles every marker pair: text before a marker is
//! kept, the span up to the matching close marker is dropped, an unterminated tag marker drops the
//! rest of the text, and a close marker without an opener is removed on its own. The bare
//! `/think … /think` form uses one token for both ends, so an unmatched one is removed alone.

use std::borrow::Cow;

struct MarkerPair {
    open: &'static str,
    close: &'static str,
    unterminated_drops_rest: bool,
}

const REASONING_MARKERS: &[MarkerPair] = &[
    MarkerPair {
        open: "<thinking>",
        close: "</thinking>",
        unterminated_drops_rest: true,
    },
    MarkerPair {
        open: "<think>",
        close: "</think>",
        unterminated_drops_rest: true,
    },
    MarkerPair {
        open: "[think]",
        close: "[/think]",
        unterminated_drops_rest: true,
    },
    MarkerPair {
        open: "/think",
        close: "/think",
        unterminated_drops_rest: false,
    },
];

enum MarkerKind {
    Open {
        close: &'static str,
        unterminated_drops_rest: bool,
    },
    StrayClose,
}

struct Marker {
    start: usize,
    end: usize,
    kind: MarkerKind,
}

/// Strip reasoning spans from `text`.
///
/// Returns the input borrowed and untouched when no marker is present. Otherwise the remaining
/// text has runs of three or more newlines collapsed to a single blank line and is trimmed.
pub fn strip_reasoning(text: &str) -> Cow<'_, str> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut removed = false;

    while let Some(marker) = next_marker(&lowered, cursor) {
        removed = true;
        kept.push_str(&text[cursor..marker.start]);
        match marker.kind {
            MarkerKind::Open {
                close,
                unterminated_drops_rest,
            } => match lowered[marker.end..].find(close) {
                Some(offset) => cursor = marker.end + offset + close.len(),
                None if unterminated_drops_rest => {
                    cursor = text.len();
                    break;
                }
                None => cursor = marker.end,
            },
            MarkerKind::StrayClose => cursor = marker.end,
        }
    }

    if !removed {
        return Cow::Borrowed(text);
    }

    kept.push_str(&text[cursor..]);
    tracing::debug!(
        original_len = text.len(),
        kept_len = kept.len(),
        "Stripped reasoning trace"
    );
    Cow::Owned(collapse_blank_lines(kept.trim()))
}

fn next_marker(lowered: &str, cursor: usize) -> Option<Marker> {
    let haystack = &lowered[cursor..];
    let mut earliest: Option<Marker> = None;

    for pair in REASONING_MARKERS {
        let candidates = [
            haystack.find(pair.open).map(|offset| Marker {
                start: cursor + offset,
                end: cursor + offset + pair.open.len(),
                kind: MarkerKind::Open {
                    close: pair.close,
                    unterminated_drops_rest: pair.unterminated_drops_rest,
                },
            }),
            haystack.find(pair.close).map(|offset| Marker {
                start: cursor + offset,
                end: cursor + offset + pair.close.len(),
                kind: MarkerKind::StrayClose,
            }),
        ];
        for candidate in candidates.into_iter().flatten() {
            if earliest
                .as_ref()
                .is_none_or(|current| candidate.start < current.start)
            {
                earliest = Some(candidate);
            }
        }
    }

    earliest
}

fn collapse_blank_lines(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut newlines = 0;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        collapsed.push(ch);
    }
    collapsed
}
