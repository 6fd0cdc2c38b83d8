//! Bounded line-level delta between two accessibility snapshots.
//!
//! Snapshots are compared in their canonical text form with a shortest edit
//! script (Myers). Unchanged lines are dropped; every kept line is prefixed with
//! `+ ` or `- ` and both each line and the whole text are length-capped, so the
//! result stays small no matter how large the page is.

use crate::snapshot::AccessibilitySnapshot;

/// Longest payload kept per line, in characters, excluding the prefix.
pub const MAX_LINE_CHARS: usize = 300;

/// Longest diff text, in characters.
pub const MAX_DIFF_CHARS: usize = 3000;

/// Edit distance beyond which the middle section is reported as one
/// remove block followed by one add block instead of a minimal script.
const MAX_EDIT_DISTANCE: usize = 1024;

const ADDED_PREFIX: &str = "+ ";
const REMOVED_PREFIX: &str = "- ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange<'a> {
    Equal(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Line diff of `before` against `after`, in document order.
///
/// Within a changed block removals precede additions.
pub fn diff_lines<'a>(before: &'a str, after: &'a str) -> Vec<LineChange<'a>> {
    let a: Vec<&str> = before.lines().collect();
    let b: Vec<&str> = after.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out: Vec<LineChange<'a>> = a[..prefix].iter().map(|&l| LineChange::Equal(l)).collect();
    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];
    match shortest_edit_script(mid_a, mid_b) {
        Some(script) => out.extend(group_changes(script)),
        None => {
            out.extend(mid_a.iter().map(|&l| LineChange::Removed(l)));
            out.extend(mid_b.iter().map(|&l| LineChange::Added(l)));
        }
    }
    out.extend(a[a.len() - suffix..].iter().map(|&l| LineChange::Equal(l)));
    out
}

/// Myers' O(ND) algorithm. `None` when the edit distance exceeds the cap.
fn shortest_edit_script<'a>(a: &[&'a str], b: &[&'a str]) -> Option<Vec<LineChange<'a>>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    if n == 0 || m == 0 {
        let mut script: Vec<LineChange<'a>> = a.iter().map(|&l| LineChange::Removed(l)).collect();
        script.extend(b.iter().map(|&l| LineChange::Added(l)));
        return Some(script);
    }

    let max = (n + m) as usize;
    let offset = max as isize;
    let idx = |k: isize| (k + offset) as usize;
    let mut v = vec![0isize; 2 * max + 1];
    // trace[d] holds the furthest-reaching x for diagonals -d..=d before round d.
    let mut trace: Vec<Vec<isize>> = Vec::new();

    let mut found = None;
    for d in 0..=max.min(MAX_EDIT_DISTANCE) as isize {
        trace.push(v[idx(-d)..=idx(d)].to_vec());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                found = Some(d);
                break;
            }
            k += 2;
        }
        if found.is_some() {
            break;
        }
    }
    let depth = found?;

    let mut script = Vec::new();
    let (mut x, mut y) = (n, m);
    for d in (0..=depth).rev() {
        let row = &trace[d as usize];
        let at = |k: isize| row[(k + d) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { at(prev_k) };
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            script.push(LineChange::Equal(a[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                script.push(LineChange::Added(b[(y - 1) as usize]));
                y -= 1;
            } else {
                script.push(LineChange::Removed(a[(x - 1) as usize]));
                x -= 1;
            }
        }
    }
    script.reverse();
    Some(script)
}

/// Reorder each run of non-equal changes so removals come first.
fn group_changes(script: Vec<LineChange<'_>>) -> Vec<LineChange<'_>> {
    let mut out = Vec::with_capacity(script.len());
    let mut added = Vec::new();
    for change in script {
        match change {
            LineChange::Equal(_) => {
                out.append(&mut added);
                out.push(change);
            }
            LineChange::Removed(_) => out.push(change),
            LineChange::Added(_) => added.push(change),
        }
    }
    out.append(&mut added);
    out
}

/// Signed, truncated change lines between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    lines: Vec<String>,
}

impl DiffResult {
    pub fn compute(before: &AccessibilitySnapshot, after: &AccessibilitySnapshot) -> Self {
        let before = before.canonical_text();
        let after = after.canonical_text();
        Self::from_changes(&diff_lines(&before, &after))
    }

    pub fn from_changes(changes: &[LineChange<'_>]) -> Self {
        let mut lines = Vec::new();
        let mut used = 0usize;
        for change in changes {
            let (prefix, content) = match change {
                LineChange::Equal(_) => continue,
                LineChange::Added(l) => (ADDED_PREFIX, *l),
                LineChange::Removed(l) => (REMOVED_PREFIX, *l),
            };
            let mut line = String::from(prefix);
            line.extend(content.chars().take(MAX_LINE_CHARS));
            let len = line.chars().count();
            let separator = usize::from(!lines.is_empty());

            if used + separator + len <= MAX_DIFF_CHARS {
                used += separator + len;
                lines.push(line);
                continue;
            }
            let remaining = MAX_DIFF_CHARS.saturating_sub(used + separator);
            if remaining > prefix.len() {
                lines.push(line.chars().take(remaining).collect());
            }
            break;
        }
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}
