//! Joining per-chunk completions into one document.

use super::CompletionResult;

/// Overlaps shorter than this are left alone; short lines such as `---` or a
/// lone heading repeat legitimately between sections.
const MIN_REPEATED_CHARS: usize = 20;

/// Merge chunk outputs in `chunk_index` order.
///
/// Outputs are separated by a blank line. When a chunk's output opens with
/// the same lines the previous output closed with (the model restating the
/// overlap window), the repeated lines are dropped.
pub fn merge_outputs(results: &[CompletionResult]) -> String {
    let mut ordered: Vec<&CompletionResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.chunk_index);

    let mut merged = String::new();
    for result in ordered {
        if merged.trim().is_empty() {
            merged = result.content.clone();
            continue;
        }

        let next = strip_repeated_lead(&merged, &result.content).trim_start();
        if next.trim().is_empty() {
            continue;
        }

        merged.truncate(merged.trim_end().len());
        merged.push_str("\n\n");
        merged.push_str(next);
    }

    merged
}

/// Return `next` without the leading lines that repeat the tail of `prev`.
fn strip_repeated_lead<'a>(prev: &str, next: &'a str) -> &'a str {
    let prev_tail: Vec<&str> = prev
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    // (trimmed line, byte offset just past it)
    let mut next_lines: Vec<(&str, usize)> = Vec::new();
    let mut offset = 0;
    for raw in next.split_inclusive('\n') {
        offset += raw.len();
        let line = raw.trim();
        if !line.is_empty() {
            next_lines.push((line, offset));
        }
    }

    let max = prev_tail.len().min(next_lines.len());
    for k in (1..=max).rev() {
        let tail = &prev_tail[prev_tail.len() - k..];
        let lead = &next_lines[..k];
        if tail.iter().zip(lead).all(|(a, (b, _))| a == b) {
            let repeated: usize = tail.iter().map(|l| l.len()).sum();
            if repeated >= MIN_REPEATED_CHARS {
                return &next[lead[k - 1].1..];
            }
            break;
        }
    }

    next
}
