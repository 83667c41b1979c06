//! Recency ordering shared by load and every write

use std::cmp::Ordering;

use crate::note::Note;

/// Most recent first.
///
/// Notes are ordered by `end_datetime` descending. An open note (no
/// `end_datetime`) counts as more recent than any closed one. Ties, including
/// two open notes, fall back to `identifier` descending so the order is total.
#[must_use]
pub fn recency_cmp(a: &Note, b: &Note) -> Ordering {
    let by_end = match (a.end_datetime(), b.end_datetime()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_end), Some(b_end)) => b_end.cmp(&a_end),
    };
    by_end.then_with(|| b.identifier().cmp(a.identifier()))
}

/// Sort notes in place by [`recency_cmp`].
pub fn sort_by_recency(notes: &mut [Note]) {
    notes.sort_by(recency_cmp);
}
