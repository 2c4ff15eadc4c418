//! Key ranges used by read requests, and the narrowing applied when a read
//! resumes after its last delivered key.

use std::{cmp::Ordering, ops::Bound};

/// A key range with owned bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange<K> {
    /// Start bound (inclusive/exclusive/unbounded).
    pub start: Bound<K>,
    /// End bound (inclusive/exclusive/unbounded).
    pub end: Bound<K>,
}

impl<K> KeyRange<K> {
    /// Create a new range from explicit bounds.
    pub fn new(start: Bound<K>, end: Bound<K>) -> Self {
        Self { start, end }
    }

    /// `[start, end]`, both ends inclusive.
    pub fn closed(start: impl Into<K>, end: impl Into<K>) -> Self {
        Self::new(Bound::Included(start.into()), Bound::Included(end.into()))
    }

    /// `[start, +inf)`.
    pub fn start_at(start: impl Into<K>) -> Self {
        Self::new(Bound::Included(start.into()), Bound::Unbounded)
    }

    /// `(start, +inf)`.
    pub fn after(start: impl Into<K>) -> Self {
        Self::new(Bound::Excluded(start.into()), Bound::Unbounded)
    }
}

impl<K: Ord + Clone> KeyRange<K> {
    /// The part of this range strictly after `key`, or `None` when `key`
    /// already reaches the end of the range.
    ///
    /// A range starting after `key` is returned unchanged; a range containing
    /// `key` restarts at `key` exclusive.
    pub fn resume_after(&self, key: &K) -> Option<Self> {
        let resumed = Bound::Excluded(key.clone());
        if is_empty_range(&resumed, &self.end) {
            return None;
        }
        if cmp_lower(&self.start, &resumed) == Ordering::Less {
            Some(Self::new(resumed, self.end.clone()))
        } else {
            Some(self.clone())
        }
    }
}

// Lower-bound comparator: Included(x) < Excluded(x) < Included(y) if x<y
fn cmp_lower<K: Ord>(a: &Bound<K>, b: &Bound<K>) -> Ordering {
    use Bound as B;
    match (a, b) {
        (B::Unbounded, B::Unbounded) => Ordering::Equal,
        (B::Unbounded, _) => Ordering::Less,
        (_, B::Unbounded) => Ordering::Greater,
        (B::Included(x), B::Included(y)) => x.cmp(y),
        (B::Included(x), B::Excluded(y)) => match x.cmp(y) {
            Ordering::Equal => Ordering::Less,
            other => other,
        },
        (B::Excluded(x), B::Included(y)) => match x.cmp(y) {
            Ordering::Equal => Ordering::Greater,
            other => other,
        },
        (B::Excluded(x), B::Excluded(y)) => x.cmp(y),
    }
}

fn is_empty_range<K: Ord>(start: &Bound<K>, end: &Bound<K>) -> bool {
    use Bound as B;
    match (start, end) {
        (B::Unbounded, _) | (_, B::Unbounded) => false,
        (B::Included(a), B::Included(b)) => a > b,
        (B::Included(a), B::Excluded(b)) => a >= b,
        (B::Excluded(a), B::Included(b)) => a >= b,
        (B::Excluded(a), B::Excluded(b)) => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use bytes::Bytes;

    use super::KeyRange;

    fn key(k: &'static str) -> Bytes {
        Bytes::from_static(k.as_bytes())
    }

    #[test]
    fn resume_inside_range_moves_start() {
        let range = KeyRange::<Bytes>::start_at("a");
        assert_eq!(range.resume_after(&key("a")), Some(KeyRange::after("a")));

        let range = KeyRange::<Bytes>::closed("a", "z");
        assert_eq!(
            range.resume_after(&key("m")),
            Some(KeyRange::new(Bound::Excluded(key("m")), Bound::Included(key("z"))))
        );
    }

    #[test]
    fn resume_past_end_drops_range() {
        assert_eq!(KeyRange::<Bytes>::closed("a", "b").resume_after(&key("b")), None);
        assert_eq!(KeyRange::<Bytes>::closed("a", "b").resume_after(&key("c")), None);
        let half_open =
            KeyRange::<Bytes>::new(Bound::Included(key("a")), Bound::Excluded(key("b")));
        assert_eq!(
            half_open.resume_after(&key("az")),
            Some(KeyRange::new(
                Bound::Excluded(key("az")),
                Bound::Excluded(key("b"))
            ))
        );
        assert_eq!(half_open.resume_after(&key("b")), None);
    }

    #[test]
    fn resume_before_start_keeps_range() {
        let range = KeyRange::<Bytes>::start_at("c");
        assert_eq!(range.resume_after(&key("b")), Some(range.clone()));
        let range = KeyRange::<Bytes>::after("c");
        assert_eq!(range.resume_after(&key("c")), Some(range.clone()));
    }
}
