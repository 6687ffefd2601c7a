//! Bounded context assembly.
//!
//! Every excerpt is truncated on its own to a character budget so one oversized document never
//! starves the others. Cuts prefer a paragraph break, then sentence-ending punctuation, then a line
//! break, and only fall back to a hard cut when none appears in the trailing fifth of the budget.

use super::types::Excerpt;

/// Default per-excerpt budget in characters.
pub const DEFAULT_EXCERPT_BUDGET: usize = 10_000;

/// Appended to every excerpt that was cut short.
pub const TRUNCATION_MARKER: &str = "\n\n...(content truncated: document exceeds the context budget)";

const BANNER: &str = "Uploaded document content:";

/// Join excerpts into a single context block, truncating each one to `budget` characters.
///
/// Returns an empty string when `excerpts` is empty.
pub fn assemble_context(excerpts: &[Excerpt], budget: usize) -> String {
    if excerpts.is_empty() {
        return String::new();
    }

    let mut block = String::from(BANNER);
    block.push_str("\n\n");

    for (index, excerpt) in excerpts.iter().enumerate() {
        block.push_str(&format!("Document {}: {}", index + 1, excerpt.name));
        if let Some(order) = &excerpt.derived_order {
            block.push_str(&format!(
                " (sorted by {}, {}, {} rows)",
                order.column, order.direction, order.row_count
            ));
        }
        block.push('\n');
        block.push_str(&truncate_excerpt(&excerpt.text, budget));
        block.push_str("\n\n");
    }

    let trimmed = block.trim_end().len();
    block.truncate(trimmed);
    block
}

/// Truncate `text` to at most `budget` characters plus the truncation marker.
///
/// Text within budget is returned verbatim. Otherwise the cut lands on the last paragraph break,
/// else the last sentence ending, else the last line break, provided the kept prefix is longer than
/// 80% of the budget. A hard cut at the budget is the last resort.
pub fn truncate_excerpt(text: &str, budget: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(budget) else {
        return text.to_string();
    };

    let window = &text[..cut];
    let floor = budget * 4 / 5;
    let qualifies = |end: usize| window[..end].chars().count() > floor;

    let kept = match window.rfind("\n\n") {
        Some(paragraph) if qualifies(paragraph) => &window[..paragraph],
        _ => match last_sentence_end(text, cut) {
            Some(end) if qualifies(end) => &window[..end],
            _ => match window.rfind('\n') {
                Some(line) if qualifies(line) => &window[..line],
                _ => window,
            },
        },
    };

    tracing::debug!(
        original_chars = text.chars().count(),
        kept_chars = kept.chars().count(),
        budget,
        "Truncated excerpt"
    );

    let mut truncated = String::with_capacity(kept.len() + TRUNCATION_MARKER.len());
    truncated.push_str(kept);
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Byte offset just past the last sentence ending in `text[..cut]`.
///
/// `.`, `!` and `?` only end a sentence when followed by whitespace or the end of `text`, so
/// decimals like `3.75` and abbreviations inside tokens are not cut points.
fn last_sentence_end(text: &str, cut: usize) -> Option<usize> {
    text[..cut].char_indices().rev().find_map(|(index, ch)| {
        let end = index + ch.len_utf8();
        let ends_sentence = match ch {
            '。' => true,
            '.' | '!' | '?' => text[end..].chars().next().is_none_or(char::is_whitespace),
            _ => false,
        };
        ends_sentence.then_some(end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::types::{DerivedOrder, SortDirection};

    fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    #[test]
    fn short_excerpt_is_verbatim() {
        let text = "Quarterly revenue grew. Costs fell.";
        assert_eq!(truncate_excerpt(text, 100), text);
        assert!(!truncate_excerpt(text, 100).contains(TRUNCATION_MARKER));
    }

    #[test]
    fn excerpt_exactly_at_budget_is_verbatim() {
        let text = "a".repeat(50);
        assert_eq!(truncate_excerpt(&text, 50), text);
    }

    #[test]
    fn prefers_paragraph_break_in_trailing_window() {
        let text = format!("{}\n\n{}", "a".repeat(90), "b".repeat(50));
        let truncated = truncate_excerpt(&text, 100);
        assert_eq!(truncated, format!("{}{}", "a".repeat(90), TRUNCATION_MARKER));
    }

    #[test]
    fn falls_back_to_sentence_ending() {
        let text = format!("{}. {}", "a".repeat(85), "b".repeat(60));
        let truncated = truncate_excerpt(&text, 100);
        assert_eq!(truncated, format!("{}.{}", "a".repeat(85), TRUNCATION_MARKER));
    }

    #[test]
    fn decimal_points_are_not_sentence_endings() {
        let rows: Vec<String> = (0..20).map(|i| format!("S{i:02},3.75")).collect();
        let text = rows.join("\n");
        let truncated = truncate_excerpt(&text, 100);
        let kept = truncated.strip_suffix(TRUNCATION_MARKER).expect("marker");
        assert!(kept.lines().all(|line| line.ends_with("3.75")), "{kept}");
        assert!(kept.ends_with("S10,3.75"), "{kept}");
    }

    #[test]
    fn sentence_ending_at_end_of_window_counts() {
        let text = format!("{}. {}", "a".repeat(99), "b".repeat(20));
        let truncated = truncate_excerpt(&text, 100);
        assert_eq!(truncated, format!("{}.{}", "a".repeat(99), TRUNCATION_MARKER));
    }

    #[test]
    fn ignores_boundaries_before_trailing_window() {
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(200));
        let truncated = truncate_excerpt(&text, 100);
        let kept = truncated.strip_suffix(TRUNCATION_MARKER).expect("marker");
        assert_eq!(char_len(kept), 100);
        assert!(kept.starts_with(&"a".repeat(10)));
    }

    #[test]
    fn hard_cut_respects_multibyte_text() {
        let text = "เกรด".repeat(100);
        let truncated = truncate_excerpt(&text, 50);
        let kept = truncated.strip_suffix(TRUNCATION_MARKER).expect("marker");
        assert_eq!(char_len(kept), 50);
        assert!(char_len(&truncated) <= 50 + char_len(TRUNCATION_MARKER));
    }

    #[test]
    fn truncated_length_never_exceeds_budget_plus_marker() {
        let text = "Sentence one. ".repeat(1_000);
        let truncated = truncate_excerpt(&text, DEFAULT_EXCERPT_BUDGET);
        assert!(char_len(&truncated) <= DEFAULT_EXCERPT_BUDGET + char_len(TRUNCATION_MARKER));
        let kept = truncated.strip_suffix(TRUNCATION_MARKER).expect("marker");
        assert!(kept.ends_with('.'));
    }

    #[test]
    fn empty_excerpt_list_yields_empty_block() {
        assert!(assemble_context(&[], 100).is_empty());
    }

    #[test]
    fn block_includes_banner_and_positional_headers() {
        let excerpts = vec![
            Excerpt::new("notes.txt", "first body"),
            Excerpt::new("grades.csv", "second body"),
        ];
        let block = assemble_context(&excerpts, 100);
        assert!(block.starts_with(BANNER));
        assert!(block.contains("Document 1: notes.txt\nfirst body"));
        assert!(block.contains("Document 2: grades.csv\nsecond body"));
        assert!(!block.ends_with('\n'));
    }

    #[test]
    fn header_mentions_derived_order() {
        let mut excerpt = Excerpt::new("grades.csv", "name,GPA\nA,2.0");
        excerpt.derived_order = Some(DerivedOrder {
            column: "GPA".into(),
            direction: SortDirection::Descending,
            row_count: 1,
        });
        let block = assemble_context(&[excerpt], 100);
        assert!(block.contains("Document 1: grades.csv (sorted by GPA, descending, 1 rows)"));
    }

    #[test]
    fn budget_applies_per_excerpt() {
        let long = "x".repeat(300);
        let excerpts = vec![Excerpt::new("a", long.clone()), Excerpt::new("b", long)];
        let block = assemble_context(&excerpts, 100);
        assert_eq!(block.matches(TRUNCATION_MARKER.trim()).count(), 2);
    }
}
