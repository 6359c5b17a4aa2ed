// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Diff Engine
//!
//! Computes an ordered alignment between two text buffers as a sequence of
//! [`DiffOp`] fragments.
//!
//! ## Overview
//!
//! The engine trims the common prefix and suffix of the two buffers first
//! and diffs only the remaining middle span. Formatter output is mostly
//! identical to its input, so for a large middle span a coarse
//! line-granularity pass isolates the changed line ranges and the
//! character-level Myers diff runs only inside them. A cleanup pass
//! afterwards merges adjacent fragments of the same kind, absorbs trivial
//! equal runs sandwiched between edits, and slides edit boundaries onto line
//! or word boundaries where several minimal scripts tie.
//!
//! ## Alignment contract
//!
//! Concatenating the fragments of `Equal` + `Delete` ops, in order,
//! reconstructs the original buffer exactly; concatenating `Equal` + `Insert`
//! reconstructs the candidate exactly. Every transformation in this module
//! preserves both properties.
//!
//! ## Resource ceiling
//!
//! Pathological pairs (two buffers sharing almost nothing) would cost
//! quadratic time; [`DiffLimit`] caps the edit distance explored in every
//! Myers search and the engine degrades to a whole-span `Delete` + `Insert`
//! pair when the cap is hit. The degraded script is coarse but still
//! satisfies the alignment contract.

/// One element of an alignment between two buffers.
///
/// Explicitly tagged rather than discriminant-plus-payload so that match
/// exhaustiveness is checked by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Text present in both buffers
    Equal(String),

    /// Text present only in the candidate buffer
    Insert(String),

    /// Text present only in the original buffer
    Delete(String),
}

impl DiffOp {
    /// The text fragment this op carries
    pub fn text(&self) -> &str {
        match self {
            DiffOp::Equal(text) | DiffOp::Insert(text) | DiffOp::Delete(text) => text,
        }
    }

    fn is_equal(&self) -> bool {
        matches!(self, DiffOp::Equal(_))
    }
}

/// Resource ceiling for the diff search.
#[derive(Debug, Clone, Copy)]
pub struct DiffLimit {
    /// Maximum edit distance explored by one Myers search before degrading
    /// to a whole-span `Delete` + `Insert` pair
    pub max_distance: usize,
}

impl Default for DiffLimit {
    fn default() -> Self {
        Self { max_distance: 1024 }
    }
}

/// Middle spans larger than this go through the coarse line pass first so
/// the character search only ever sees the changed regions.
const LINE_PASS_MIN_CHARS: usize = 2048;

/// Compute an alignment between `original` and `candidate` with the default
/// resource ceiling.
pub fn diff(original: &str, candidate: &str) -> Vec<DiffOp> {
    diff_with_limit(original, candidate, DiffLimit::default())
}

/// Compute an alignment between `original` and `candidate`.
///
/// Identical buffers yield a single `Equal` op (or an empty sequence when
/// both buffers are empty); an empty original yields a single `Insert`; an
/// empty candidate a single `Delete`.
pub fn diff_with_limit(original: &str, candidate: &str, limit: DiffLimit) -> Vec<DiffOp> {
    if original == candidate {
        if original.is_empty() {
            return Vec::new();
        }
        return vec![DiffOp::Equal(original.to_owned())];
    }

    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = candidate.chars().collect();

    // Prefix/suffix equality never needs algorithmic discovery
    let prefix = common_prefix_len(&a, &b);
    let suffix = common_suffix_len(&a[prefix..], &b[prefix..]);
    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut ops = Vec::new();
    if prefix > 0 {
        ops.push(DiffOp::Equal(a[..prefix].iter().collect()));
    }
    if mid_a.len() + mid_b.len() > LINE_PASS_MIN_CHARS {
        ops.extend(coarse_line_diff(mid_a, mid_b, limit));
    } else {
        ops.extend(span_diff(mid_a, mid_b, limit));
    }
    if suffix > 0 {
        ops.push(DiffOp::Equal(a[a.len() - suffix..].iter().collect()));
    }

    cleanup(&mut ops);
    ops
}

fn common_prefix_len(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Character-level diff of one changed span. Assumes nothing about the span;
/// handles empties and falls back to a coarse pair when the ceiling is hit.
fn span_diff(a: &[char], b: &[char], limit: DiffLimit) -> Vec<DiffOp> {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Vec::new(),
        (true, false) => return vec![DiffOp::Insert(b.iter().collect())],
        (false, true) => return vec![DiffOp::Delete(a.iter().collect())],
        (false, false) => {}
    }

    match myers_steps(a, b, limit.max_distance) {
        Some(steps) => {
            let mut ops: Vec<DiffOp> = Vec::new();
            for (kind, index) in steps {
                let c = match kind {
                    StepKind::Equal | StepKind::Delete => a[index],
                    StepKind::Insert => b[index],
                };
                match (ops.last_mut(), kind) {
                    (Some(DiffOp::Equal(text)), StepKind::Equal)
                    | (Some(DiffOp::Insert(text)), StepKind::Insert)
                    | (Some(DiffOp::Delete(text)), StepKind::Delete) => text.push(c),
                    (_, StepKind::Equal) => ops.push(DiffOp::Equal(c.to_string())),
                    (_, StepKind::Insert) => ops.push(DiffOp::Insert(c.to_string())),
                    (_, StepKind::Delete) => ops.push(DiffOp::Delete(c.to_string())),
                }
            }
            ops
        }
        // Ceiling hit: degrade gracefully instead of hanging
        None => vec![
            DiffOp::Delete(a.iter().collect()),
            DiffOp::Insert(b.iter().collect()),
        ],
    }
}

/// Coarse pass for large middle spans: align whole lines first, then run the
/// character-level diff only inside each changed block of lines.
fn coarse_line_diff(a: &[char], b: &[char], limit: DiffLimit) -> Vec<DiffOp> {
    let lines_a = split_lines(a);
    let lines_b = split_lines(b);

    let Some(steps) = myers_steps(&lines_a, &lines_b, limit.max_distance) else {
        return vec![
            DiffOp::Delete(a.iter().collect()),
            DiffOp::Insert(b.iter().collect()),
        ];
    };

    let mut ops: Vec<DiffOp> = Vec::new();
    let mut deleted: Vec<char> = Vec::new();
    let mut inserted: Vec<char> = Vec::new();

    let flush = |ops: &mut Vec<DiffOp>, deleted: &mut Vec<char>, inserted: &mut Vec<char>| {
        if deleted.is_empty() && inserted.is_empty() {
            return;
        }
        // Re-trim within the block; changed lines often share indentation
        let prefix = common_prefix_len(deleted, inserted);
        let suffix = common_suffix_len(&deleted[prefix..], &inserted[prefix..]);
        if prefix > 0 {
            ops.push(DiffOp::Equal(deleted[..prefix].iter().collect()));
        }
        ops.extend(span_diff(
            &deleted[prefix..deleted.len() - suffix],
            &inserted[prefix..inserted.len() - suffix],
            limit,
        ));
        if suffix > 0 {
            ops.push(DiffOp::Equal(deleted[deleted.len() - suffix..].iter().collect()));
        }
        deleted.clear();
        inserted.clear();
    };

    for (kind, index) in steps {
        match kind {
            StepKind::Equal => {
                flush(&mut ops, &mut deleted, &mut inserted);
                ops.push(DiffOp::Equal(lines_a[index].iter().collect()));
            }
            StepKind::Delete => deleted.extend_from_slice(lines_a[index]),
            StepKind::Insert => inserted.extend_from_slice(lines_b[index]),
        }
    }
    flush(&mut ops, &mut deleted, &mut inserted);

    ops
}

/// Split into lines, each keeping its terminator. `\r\n` stays one line,
/// as does a lone `\r` or `\n`; a final unterminated segment is its own line.
fn split_lines(text: &[char]) -> Vec<&[char]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < text.len() {
        match text[i] {
            '\n' => {
                i += 1;
                lines.push(&text[start..i]);
                start = i;
            }
            '\r' => {
                i += 1;
                if text.get(i) == Some(&'\n') {
                    i += 1;
                }
                lines.push(&text[start..i]);
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[derive(Clone, Copy, PartialEq)]
enum StepKind {
    Equal,
    Insert,
    Delete,
}

/// Greedy Myers O(ND) search with one furthest-reaching snapshot kept per
/// explored distance, followed by a backtrack from `(n, m)` to `(0, 0)`.
///
/// Returns the edit script in forward order; `Equal`/`Delete` indices point
/// into `a`, `Insert` indices into `b`. Returns `None` when the edit
/// distance exceeds `max_distance`.
fn myers_steps<T: PartialEq>(
    a: &[T],
    b: &[T],
    max_distance: usize,
) -> Option<Vec<(StepKind, usize)>> {
    let n = a.len();
    let m = b.len();

    let max_d = (n + m).min(max_distance);
    let offset = (max_d + 1) as isize;
    // v[k + offset] = furthest x reached on diagonal k
    let mut v = vec![0usize; 2 * max_d + 3];
    let mut trace: Vec<Vec<usize>> = Vec::new();
    let mut distance = None;

    'search: for d in 0..=max_d as isize {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let ki = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[ki - 1] < v[ki + 1]) {
                v[ki + 1]
            } else {
                v[ki - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && a[x] == b[y] {
                x += 1;
                y += 1;
            }
            v[ki] = x;
            if x >= n && y >= m {
                distance = Some(d as usize);
                break 'search;
            }
            k += 2;
        }
    }

    let distance = distance?;

    let mut x = n;
    let mut y = m;
    // Steps come out reversed
    let mut steps: Vec<(StepKind, usize)> = Vec::with_capacity(n + m);

    for d in (1..=distance).rev() {
        let v = &trace[d];
        let k = x as isize - y as isize;
        let di = d as isize;
        let ki = (k + offset) as usize;

        let prev_k = if k == -di || (k != di && v[ki - 1] < v[ki + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = (prev_x as isize - prev_k) as usize;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            steps.push((StepKind::Equal, x));
        }
        if x == prev_x {
            y -= 1;
            steps.push((StepKind::Insert, y));
        } else {
            x -= 1;
            steps.push((StepKind::Delete, x));
        }
    }

    // Distance-zero remainder is a pure diagonal back to the origin
    while x > 0 && y > 0 {
        x -= 1;
        y -= 1;
        steps.push((StepKind::Equal, x));
    }

    steps.reverse();
    Some(steps)
}

/// Absorb an equal run only when both flanking edits are at least twice its
/// length; anything larger is a genuine anchor, not noise.
const ABSORB_MAX_CHARS: usize = 3;

fn cleanup(ops: &mut Vec<DiffOp>) {
    merge_runs(ops);
    while absorb_short_equalities(ops) {
        merge_runs(ops);
    }
    shift_edit_boundaries(ops);
    merge_runs(ops);
}

/// Merge adjacent fragments of the same kind, drop empty fragments, and
/// order each change block as deletes before inserts.
fn merge_runs(ops: &mut Vec<DiffOp>) {
    let drained = std::mem::take(ops);
    let mut deletes = String::new();
    let mut inserts = String::new();

    let flush = |ops: &mut Vec<DiffOp>, deletes: &mut String, inserts: &mut String| {
        if !deletes.is_empty() {
            ops.push(DiffOp::Delete(std::mem::take(deletes)));
        }
        if !inserts.is_empty() {
            ops.push(DiffOp::Insert(std::mem::take(inserts)));
        }
    };

    for op in drained {
        match op {
            DiffOp::Equal(text) => {
                if text.is_empty() {
                    continue;
                }
                flush(ops, &mut deletes, &mut inserts);
                match ops.last_mut() {
                    Some(DiffOp::Equal(prev)) => prev.push_str(&text),
                    _ => ops.push(DiffOp::Equal(text)),
                }
            }
            DiffOp::Delete(text) => deletes.push_str(&text),
            DiffOp::Insert(text) => inserts.push_str(&text),
        }
    }
    flush(ops, &mut deletes, &mut inserts);
}

/// Split short equal runs flanked by substantially longer edits into a
/// delete/insert pair so `merge_runs` folds them into their neighbors.
///
/// Returns true if anything changed.
fn absorb_short_equalities(ops: &mut Vec<DiffOp>) -> bool {
    for i in 1..ops.len().saturating_sub(1) {
        let DiffOp::Equal(text) = &ops[i] else {
            continue;
        };
        if ops[i - 1].is_equal() || ops[i + 1].is_equal() {
            continue;
        }

        let eq_len = text.chars().count();
        let before_len = ops[i - 1].text().chars().count();
        let after_len = ops[i + 1].text().chars().count();
        if eq_len > ABSORB_MAX_CHARS || before_len < eq_len * 2 || after_len < eq_len * 2 {
            continue;
        }

        let text = text.clone();
        ops.splice(i..=i, [DiffOp::Delete(text.clone()), DiffOp::Insert(text)]);
        return true;
    }

    false
}

/// Score the junction between two fragments; higher means a more natural
/// place for an edit boundary.
fn junction_score(left: &[char], right: &[char]) -> u32 {
    match (left.last(), right.first()) {
        // Buffer edge
        (None, _) | (_, None) => 5,
        (Some(&l), Some(&r)) => {
            if l == '\n' || r == '\n' {
                4
            } else if l.is_whitespace() || r.is_whitespace() {
                3
            } else if !l.is_alphanumeric() || !r.is_alphanumeric() {
                2
            } else {
                0
            }
        }
    }
}

/// Slide a single edit sandwiched between two equal runs so its boundaries
/// prefer line breaks and whitespace over the middle of a word.
///
/// Pure rotation of characters between the three fragments; both
/// reconstruction properties are preserved at every step.
fn shift_edit_boundaries(ops: &mut [DiffOp]) {
    let mut i = 1;
    while i + 1 < ops.len() {
        let sliding = !ops[i].is_equal() && ops[i - 1].is_equal() && ops[i + 1].is_equal();
        if !sliding {
            i += 1;
            continue;
        }

        let mut eq1: Vec<char> = ops[i - 1].text().chars().collect();
        let mut edit: Vec<char> = ops[i].text().chars().collect();
        let mut eq2: Vec<char> = ops[i + 1].text().chars().collect();

        // Slide fully left while the edit ends with the previous equal's
        // last character
        while let (Some(&a), Some(&b)) = (eq1.last(), edit.last()) {
            if a != b {
                break;
            }
            eq1.pop();
            edit.pop();
            edit.insert(0, a);
            eq2.insert(0, a);
        }

        // Walk right one character at a time, keeping the best-scoring split
        let mut best = (eq1.clone(), edit.clone(), eq2.clone());
        let mut best_score = junction_score(&eq1, &edit) + junction_score(&edit, &eq2);

        while !edit.is_empty() && !eq2.is_empty() && edit[0] == eq2[0] {
            let c = eq2.remove(0);
            eq1.push(edit.remove(0));
            edit.push(c);

            let score = junction_score(&eq1, &edit) + junction_score(&edit, &eq2);
            if score >= best_score {
                best_score = score;
                best = (eq1.clone(), edit.clone(), eq2.clone());
            }
        }

        let (eq1, edit, eq2) = best;
        ops[i - 1] = DiffOp::Equal(eq1.into_iter().collect());
        ops[i] = match &ops[i] {
            DiffOp::Insert(_) => DiffOp::Insert(edit.into_iter().collect()),
            _ => DiffOp::Delete(edit.into_iter().collect()),
        };
        ops[i + 1] = DiffOp::Equal(eq2.into_iter().collect());

        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original_of(ops: &[DiffOp]) -> String {
        ops.iter()
            .filter_map(|op| match op {
                DiffOp::Equal(text) | DiffOp::Delete(text) => Some(text.as_str()),
                DiffOp::Insert(_) => None,
            })
            .collect()
    }

    fn candidate_of(ops: &[DiffOp]) -> String {
        ops.iter()
            .filter_map(|op| match op {
                DiffOp::Equal(text) | DiffOp::Insert(text) => Some(text.as_str()),
                DiffOp::Delete(_) => None,
            })
            .collect()
    }

    fn assert_alignment(original: &str, candidate: &str, ops: &[DiffOp]) {
        assert_eq!(original_of(ops), original, "original reconstruction");
        assert_eq!(candidate_of(ops), candidate, "candidate reconstruction");
    }

    #[test]
    fn test_identical_buffers() {
        let ops = diff("SELECT 1", "SELECT 1");
        assert_eq!(ops, vec![DiffOp::Equal("SELECT 1".to_string())]);
    }

    #[test]
    fn test_both_empty() {
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn test_empty_original() {
        let ops = diff("", "SELECT 1");
        assert_eq!(ops, vec![DiffOp::Insert("SELECT 1".to_string())]);
    }

    #[test]
    fn test_empty_candidate() {
        let ops = diff("SELECT 1", "");
        assert_eq!(ops, vec![DiffOp::Delete("SELECT 1".to_string())]);
    }

    #[test]
    fn test_pure_insertion() {
        let ops = diff("ac", "abc");
        assert_alignment("ac", "abc", &ops);
        assert!(ops.iter().all(|op| !matches!(op, DiffOp::Delete(_))));
    }

    #[test]
    fn test_pure_deletion() {
        let ops = diff("abc", "ac");
        assert_alignment("abc", "ac", &ops);
        assert!(ops.iter().all(|op| !matches!(op, DiffOp::Insert(_))));
    }

    #[test]
    fn test_disjoint_buffers() {
        let ops = diff("abc", "xyz");
        assert_alignment("abc", "xyz", &ops);
    }

    #[test]
    fn test_formatter_style_change() {
        let original = "select a,b from t where x=1";
        let candidate = "SELECT a, b\nFROM t\nWHERE x = 1";
        assert_alignment(original, candidate, &diff(original, candidate));
    }

    #[test]
    fn test_no_empty_fragments() {
        let ops = diff("select  a", "SELECT a");
        assert!(ops.iter().all(|op| !op.text().is_empty()));
    }

    #[test]
    fn test_no_adjacent_same_kind() {
        let ops = diff("one two three four", "one TWO three FOUR");
        for pair in ops.windows(2) {
            assert_ne!(
                std::mem::discriminant(&pair[0]),
                std::mem::discriminant(&pair[1]),
                "adjacent ops must differ in kind: {pair:?}"
            );
        }
    }

    #[test]
    fn test_unchanged_region_stays_equal() {
        let original = "SELECT a FROM t;\n-- untouched comment\nSELECT b FROM u;";
        let candidate = "SELECT a\nFROM t;\n-- untouched comment\nSELECT b FROM u;";
        let ops = diff(original, candidate);
        assert_alignment(original, candidate, &ops);

        let equal_chars: usize = ops
            .iter()
            .filter(|op| op.is_equal())
            .map(|op| op.text().chars().count())
            .sum();
        assert!(equal_chars > original.len() / 2);
    }

    #[test]
    fn test_limit_falls_back_to_coarse_script() {
        let original: String = (0..200).map(|i| ((i * 7 % 26) as u8 + b'a') as char).collect();
        let candidate: String = (0..200).map(|i| ((i * 11 % 26) as u8 + b'A') as char).collect();

        let ops = diff_with_limit(&original, &candidate, DiffLimit { max_distance: 4 });
        assert_alignment(&original, &candidate, &ops);
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_line_pass_isolates_changed_regions() {
        // Big enough to trigger the coarse line pass, with two changed lines
        // far apart
        let mut original = String::new();
        for i in 0..120 {
            original.push_str(&format!("select col_{i:03} from table_{i:03};\n"));
        }
        let candidate = original
            .replacen("select col_010", "SELECT col_010", 1)
            .replacen("select col_110", "SELECT col_110", 1);

        let ops = diff(&original, &candidate);
        assert_alignment(&original, &candidate, &ops);

        let changed_chars: usize = ops
            .iter()
            .filter(|op| !op.is_equal())
            .map(|op| op.text().chars().count())
            .sum();
        assert!(changed_chars <= 24, "changes should stay local: {changed_chars}");
    }

    #[test]
    fn test_split_lines_endings() {
        let text: Vec<char> = "a\nb\r\nc\rd".chars().collect();
        let lines = split_lines(&text);
        let rendered: Vec<String> = lines.iter().map(|l| l.iter().collect()).collect();
        assert_eq!(rendered, vec!["a\n", "b\r\n", "c\r", "d"]);
    }

    #[test]
    fn test_multibyte_text() {
        let original = "sélect * from tàble";
        let candidate = "SÉLECT *\nFROM tàble";
        assert_alignment(original, candidate, &diff(original, candidate));
    }

    #[test]
    fn test_crlf_normalizing_formatter() {
        let original = "a\r\nb\r\nc";
        let candidate = "a\nb\nc";
        assert_alignment(original, candidate, &diff(original, candidate));
    }

    #[test]
    fn test_boundary_prefers_whitespace() {
        // Either rotation of the inserted word is minimal; cleanup should
        // settle on a split flanked by spaces, not mid-word
        let ops = diff("alpha gamma", "alpha beta gamma");
        assert_alignment("alpha gamma", "alpha beta gamma", &ops);

        let insert = ops
            .iter()
            .find_map(|op| match op {
                DiffOp::Insert(text) => Some(text.as_str()),
                _ => None,
            })
            .expect("one insertion");
        assert!(
            insert == "beta " || insert == " beta",
            "insertion should be a whole word: {insert:?}"
        );
    }

    #[test]
    fn test_short_equality_absorbed() {
        // A one-char anchor between two long rewrites is noise
        let original = "aaaaaaaaXbbbbbbbb";
        let candidate = "ccccccccXdddddddd";
        let ops = diff(original, candidate);
        assert_alignment(original, candidate, &ops);
        assert_eq!(ops.len(), 2, "expected one coarse delete/insert pair: {ops:?}");
    }
}
