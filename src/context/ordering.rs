//! Intent-driven ordering of tabular excerpts.
//!
//! Generative models routinely compare decimals as strings (`"1.90" > "2.00"`). When the user asks
//! for a ranking, tables that carry the target column are sorted here instead, and the excerpt is
//! tagged with [`DerivedOrder`] so the prompt can state the order is already applied.
//!
//! Detection is plain keyword matching over English and Thai vocabulary. Anything that does not
//! look like a delimited table with the target column is passed through untouched.

use super::types::{DerivedOrder, Excerpt, SortDirection};

/// Column names sorted on when no override is configured.
pub const DEFAULT_TARGET_COLUMNS: [&str; 2] = ["GPA", "เกรดเฉลี่ย"];

const ORDERING_KEYWORDS: &[&str] = &[
    "sort",
    "order by",
    "rank",
    "ascending",
    "descending",
    "lowest",
    "highest",
    "smallest",
    "largest",
    "เรียง",
    "จัดอันดับ",
    "น้อยไปมาก",
    "มากไปน้อย",
    "ต่ำสุด",
    "สูงสุด",
];

const ASCENDING_CUES: &[&str] = &[
    "ascending",
    "lowest",
    "smallest",
    "low to high",
    "น้อยไปมาก",
    "ต่ำสุด",
];

const DESCENDING_CUES: &[&str] = &[
    "descending",
    "highest",
    "largest",
    "biggest",
    "high to low",
    "มากไปน้อย",
    "สูงสุด",
];

const DELIMITERS: [char; 3] = ['\t', '|', ','];

/// Detect whether `message` asks for rows to be ordered, and in which direction.
///
/// Returns `None` when no ordering keyword is present. Direction follows whichever cue appears
/// first in the message, so "lowest to highest" stays ascending; without a cue it is ascending.
pub fn detect_sort_intent(message: &str) -> Option<SortDirection> {
    let lowered = message.to_lowercase();
    if !ORDERING_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        return None;
    }

    let first_cue = |cues: &[&str]| cues.iter().filter_map(|cue| lowered.find(cue)).min();
    let direction = match (first_cue(DESCENDING_CUES), first_cue(ASCENDING_CUES)) {
        (Some(desc), Some(asc)) if desc < asc => SortDirection::Descending,
        (Some(_), None) => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    Some(direction)
}

/// Sort every tabular excerpt on the first header matching `target_columns` when `message`
/// requests an ordering. Excerpts that cannot be sorted are returned unchanged.
pub fn apply_ordering(
    message: &str,
    excerpts: Vec<Excerpt>,
    target_columns: &[String],
) -> Vec<Excerpt> {
    let Some(direction) = detect_sort_intent(message) else {
        return excerpts;
    };
    tracing::debug!(%direction, excerpts = excerpts.len(), "Ordering intent detected");

    excerpts
        .into_iter()
        .map(|excerpt| match sort_table(&excerpt.text, target_columns, direction) {
            Some((text, order)) => {
                tracing::debug!(
                    name = %excerpt.name,
                    column = %order.column,
                    rows = order.row_count,
                    %direction,
                    "Sorted tabular excerpt"
                );
                Excerpt {
                    text,
                    derived_order: Some(order),
                    ..excerpt
                }
            }
            None => excerpt,
        })
        .collect()
}

/// Sort every delimited table in `text` that carries one of `target_columns`.
///
/// A header may follow free-form lines such as a `Sheet: name` preamble, and one excerpt may hold
/// several tables separated by blank or non-delimited lines. Each table's body is sorted in place;
/// everything else stays byte-for-byte where it was. Rows whose value does not parse as a finite
/// number, or whose cell count differs from the header's, keep their relative order after the
/// sorted rows. Returns `None` when no table had a numeric row to sort.
pub fn sort_table(
    text: &str,
    target_columns: &[String],
    direction: SortDirection,
) -> Option<(String, DerivedOrder)> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    let mut order: Option<DerivedOrder> = None;
    let mut cursor = 0;

    while cursor < lines.len() {
        let Some(header) = parse_header(lines[cursor], target_columns) else {
            cursor += 1;
            continue;
        };

        let mut start = cursor + 1;
        if header.delimiter == '|' && lines.get(start).is_some_and(|line| is_markdown_separator(line)) {
            start += 1;
        }
        let end = lines[start..]
            .iter()
            .position(|line| line.trim().is_empty() || !line.contains(header.delimiter))
            .map_or(lines.len(), |offset| start + offset);

        match rank_rows(&lines[start..end], &header, direction) {
            Some((sorted, ranked)) => {
                lines[start..end].copy_from_slice(&sorted);
                order
                    .get_or_insert_with(|| DerivedOrder {
                        column: header.column.clone(),
                        direction,
                        row_count: 0,
                    })
                    .row_count += ranked;
            }
            None => {
                tracing::debug!(
                    column = %header.column,
                    "No numeric values in target column; leaving table as-is"
                );
            }
        }
        cursor = end.max(cursor + 1);
    }

    let order = order?;
    Some((lines.join("\n"), order))
}

struct Header {
    delimiter: char,
    width: usize,
    index: usize,
    column: String,
}

fn parse_header(line: &str, target_columns: &[String]) -> Option<Header> {
    let delimiter = detect_delimiter(line)?;
    let mut columns = split_cells(line, delimiter);
    if columns.len() < 2 {
        return None;
    }
    let index = find_target_column(&columns, target_columns)?;
    Some(Header {
        delimiter,
        width: columns.len(),
        index,
        column: columns.swap_remove(index),
    })
}

/// Stable-sort `rows` on the header's column. Returns the reordered rows and how many were ranked.
fn rank_rows<'a>(
    rows: &[&'a str],
    header: &Header,
    direction: SortDirection,
) -> Option<(Vec<&'a str>, usize)> {
    let mut ranked = Vec::with_capacity(rows.len());
    let mut unranked = Vec::new();
    for &line in rows {
        let cells = split_cells(line, header.delimiter);
        let value = if cells.len() == header.width {
            parse_number(&cells[header.index])
        } else {
            None
        };
        match value {
            Some(value) => ranked.push((value, line)),
            None => unranked.push(line),
        }
    }
    if ranked.is_empty() {
        return None;
    }

    match direction {
        SortDirection::Ascending => ranked.sort_by(|a, b| a.0.total_cmp(&b.0)),
        SortDirection::Descending => ranked.sort_by(|a, b| b.0.total_cmp(&a.0)),
    }
    let count = ranked.len();
    let sorted = ranked
        .into_iter()
        .map(|(_, line)| line)
        .chain(unranked)
        .collect();
    Some((sorted, count))
}

fn detect_delimiter(header: &str) -> Option<char> {
    let mut best: Option<(char, usize)> = None;
    for delimiter in DELIMITERS {
        let count = header.matches(delimiter).count();
        if count > 0 && best.is_none_or(|(_, seen)| count > seen) {
            best = Some((delimiter, count));
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

/// Split one row into trimmed cells.
///
/// Comma and tab rows follow CSV quoting: a cell opening with `"` runs to the matching quote and
/// `""` inside it is a literal quote. Pipe rows drop the outer pipes of markdown tables.
fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    let line = line.trim();
    if delimiter == '|' {
        let line = line.strip_prefix('|').unwrap_or(line);
        let line = line.strip_suffix('|').unwrap_or(line);
        return line.split('|').map(|cell| cell.trim().to_string()).collect();
    }

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
            }
            ch if ch == delimiter && !quoted => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            ch => cell.push(ch),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn find_target_column(columns: &[String], target_columns: &[String]) -> Option<usize> {
    let targets: Vec<String> = target_columns
        .iter()
        .map(|target| target.trim().to_lowercase())
        .filter(|target| !target.is_empty())
        .collect();

    columns.iter().position(|column| {
        let lowered = column.to_lowercase();
        targets.iter().any(|target| lowered.contains(target.as_str()))
    })
}

fn is_markdown_separator(line: &str) -> bool {
    let cells = split_cells(line, '|');
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':'))
        })
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
