//! Array Diff: Edit Distance + Move Detection
//!
//! # Algorithm
//!
//! 1. Build a dynamic-programming edit-distance table over the two arrays,
//!    size `(old+1) × (new+1)`, cost bounded by `O(min·max)`. Aligned
//!    equal elements cost nothing; an insertion or deletion costs 2; a
//!    substitution (a mismatched pair at one alignment point) costs 1 and
//!    is emitted as a delete + add pair at the aligned positions. Weighting
//!    substitution below an insert/delete pair makes positional
//!    replacements (including whole-array rotations) come out as
//!    same-shape delete/add pairs that the move pass can reclassify.
//!
//! 2. Backtrack from the far corner, collecting pure add/delete deltas in
//!    reverse, then restore ascending index order. Values only in the new
//!    array are "added" at their new index; values only in the old array
//!    are "deleted" at their old index; retained elements emit nothing.
//!
//! 3. Pair deleted and added entries that share an equal value,
//!    reclassifying both as a single "moved" delta (`index` → `moved_to`)
//!    and removing them from their lists. The scan tolerates a bounded
//!    number of consecutive failed pairings (default `10×` the smaller
//!    array's length) to keep the pass linear in practice.
//!
//! # Invariant
//!
//! Every old-array element is accounted for in exactly one of
//! {deleted, moved-from}; every new-array element in exactly one of
//! {added, moved-to}. Applying deletions, then additions, then moves to the
//! old array (see [`apply`]) reproduces the new array exactly.

/// Cost of one substitution in the edit-distance table.
const SUBSTITUTE: usize = 1;

/// Cost of one insertion or deletion in the edit-distance table.
const INDEL: usize = 2;

/// Default move-scan budget: this many consecutive failed pairings per
/// smaller-array element before the move pass bails out.
pub const MOVE_SCAN_MULTIPLIER: usize = 10;

/// One unit of change.
///
/// `index` is the old-array position for deletions and move sources, the
/// new-array position for additions. `moved_to` is the new-array position
/// for move targets, `None` for plain additions and deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<T> {
    pub value: T,
    pub index: usize,
    pub moved_to: Option<usize>,
}

impl<T> Delta<T> {
    fn added(value: T, index: usize) -> Self {
        Self {
            value,
            index,
            moved_to: None,
        }
    }

    fn deleted(value: T, index: usize) -> Self {
        Self {
            value,
            index,
            moved_to: None,
        }
    }
}

/// The complete delta script between two arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDelta<T> {
    /// Entries only in the new array, ascending by new index.
    pub added: Vec<Delta<T>>,
    /// Entries only in the old array, ascending by old index.
    pub deleted: Vec<Delta<T>>,
    /// Entries present in both arrays at different positions.
    pub moved: Vec<Delta<T>>,
}

impl<T> ListDelta<T> {
    /// Whether the script contains no changes at all.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.moved.is_empty()
    }
}

/// Compare two arrays by value equality with the default move-scan budget.
pub fn diff<T>(old: &[T], new: &[T]) -> ListDelta<T>
where
    T: Clone + PartialEq,
{
    diff_with_budget(old, new, MOVE_SCAN_MULTIPLIER * old.len().min(new.len()))
}

/// Compare two arrays with an explicit move-scan budget.
///
/// `move_scan_budget` caps the number of consecutive failed delete/add
/// pairings tolerated before the move pass gives up; remaining entries stay
/// classified as plain deletions and additions (the round-trip invariant
/// still holds either way).
pub fn diff_with_budget<T>(old: &[T], new: &[T], move_scan_budget: usize) -> ListDelta<T>
where
    T: Clone + PartialEq,
{
    let rows = old.len();
    let cols = new.len();
    let width = cols + 1;

    // table[i * width + j] is the edit cost between old[..i] and new[..j].
    let mut table = vec![0usize; (rows + 1) * width];
    for j in 1..=cols {
        table[j] = j * INDEL;
    }
    for i in 1..=rows {
        table[i * width] = i * INDEL;
    }
    for i in 1..=rows {
        for j in 1..=cols {
            table[i * width + j] = if old[i - 1] == new[j - 1] {
                table[(i - 1) * width + (j - 1)]
            } else {
                let substitute = table[(i - 1) * width + (j - 1)] + SUBSTITUTE;
                let delete = table[(i - 1) * width + j] + INDEL;
                let insert = table[i * width + (j - 1)] + INDEL;
                substitute.min(delete).min(insert)
            };
        }
    }

    // Backtrack, preferring retained alignment, then substitution.
    let mut added = Vec::new();
    let mut deleted = Vec::new();
    let (mut i, mut j) = (rows, cols);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old[i - 1] == new[j - 1] {
            i -= 1;
            j -= 1;
            continue;
        }
        let here = table[i * width + j];
        if i > 0 && j > 0 && here == table[(i - 1) * width + (j - 1)] + SUBSTITUTE {
            deleted.push(Delta::deleted(old[i - 1].clone(), i - 1));
            added.push(Delta::added(new[j - 1].clone(), j - 1));
            i -= 1;
            j -= 1;
        } else if i > 0 && here == table[(i - 1) * width + j] + INDEL {
            deleted.push(Delta::deleted(old[i - 1].clone(), i - 1));
            i -= 1;
        } else {
            added.push(Delta::added(new[j - 1].clone(), j - 1));
            j -= 1;
        }
    }
    added.reverse();
    deleted.reverse();

    let moved = pair_moves(&mut added, &mut deleted, move_scan_budget);

    ListDelta {
        added,
        deleted,
        moved,
    }
}

/// Reclassify equal-valued delete/add pairs as moves.
///
/// The failure counter is consecutive: it resets on every successful
/// pairing, so well-matched scripts pair fully while pathological ones
/// bail out after `budget` wasted comparisons.
fn pair_moves<T>(
    added: &mut Vec<Delta<T>>,
    deleted: &mut Vec<Delta<T>>,
    budget: usize,
) -> Vec<Delta<T>>
where
    T: Clone + PartialEq,
{
    let mut moved = Vec::new();
    let mut failures = 0usize;

    let mut d = 0;
    while d < deleted.len() {
        let mut paired = false;
        let mut a = 0;
        while a < added.len() {
            if deleted[d].value == added[a].value {
                let from = deleted.remove(d);
                let to = added.remove(a);
                moved.push(Delta {
                    value: from.value,
                    index: from.index,
                    moved_to: Some(to.index),
                });
                paired = true;
                failures = 0;
                break;
            }
            failures += 1;
            if failures > budget {
                return moved;
            }
            a += 1;
        }
        if !paired {
            d += 1;
        }
    }
    moved
}

/// Apply a delta script to `old`, reproducing the array it was diffed
/// against: deletions in descending old index, then additions in ascending
/// new index, then moves. The move phase detaches every moved element
/// before placing them in ascending target order; compound scripts (a
/// whole-array reversal, say) do not converge under one-at-a-time
/// relocation, because un-moved sources still occupy slots the targets are
/// measured against.
///
/// Panics on a malformed script (an index out of bounds); scripts produced
/// by [`diff`] are always well-formed.
pub fn apply<T>(old: &[T], delta: &ListDelta<T>) -> Vec<T>
where
    T: Clone + PartialEq,
{
    let mut work: Vec<T> = old.to_vec();

    for deletion in delta.deleted.iter().rev() {
        work.remove(deletion.index);
    }
    for addition in &delta.added {
        work.insert(addition.index, addition.value.clone());
    }

    let mut pending: Vec<(usize, T)> = Vec::new();
    for relocation in &delta.moved {
        let Some(target) = relocation.moved_to else {
            continue;
        };
        if let Some(position) = work.iter().position(|item| *item == relocation.value) {
            pending.push((target, work.remove(position)));
        }
    }
    pending.sort_by_key(|(target, _)| *target);
    for (target, value) in pending {
        work.insert(target, value);
    }
    work
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
