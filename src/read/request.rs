use bytes::Bytes;

use crate::scan::KeyRange;

/// A row filter, already encoded for the transport. The read path carries it
/// unchanged across attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFilter(Bytes);

impl RowFilter {
    pub fn new(encoded: impl Into<Bytes>) -> Self {
        Self(encoded.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

/// What a read asks for: explicit keys and/or key ranges, an optional filter
/// and an optional row limit. No keys and no ranges means the whole table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadRequest {
    ranges: Vec<KeyRange<Bytes>>,
    keys: Vec<Bytes>,
    filter: Option<RowFilter>,
    limit: Option<u64>,
}

impl ReadRequest {
    /// A full-table read.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, range: KeyRange<Bytes>) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn ranges(self, ranges: impl IntoIterator<Item = KeyRange<Bytes>>) -> Self {
        ranges.into_iter().fold(self, ReadRequest::range)
    }

    pub fn key(mut self, key: impl Into<Bytes>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn keys<K>(self, keys: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<Bytes>,
    {
        keys.into_iter().fold(self, |request, key| request.key(key))
    }

    pub fn filter(self, filter: RowFilter) -> Self {
        ReadRequest {
            filter: Some(filter),
            ..self
        }
    }

    pub fn limit(self, limit: u64) -> Self {
        ReadRequest {
            limit: Some(limit),
            ..self
        }
    }

    pub fn row_ranges(&self) -> &[KeyRange<Bytes>] {
        &self.ranges
    }

    pub fn row_keys(&self) -> &[Bytes] {
        &self.keys
    }

    pub fn row_filter(&self) -> Option<&RowFilter> {
        self.filter.as_ref()
    }

    pub fn rows_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_full_scan(&self) -> bool {
        self.ranges.is_empty() && self.keys.is_empty()
    }

    /// The request that fetches only what is left after `rows_read` rows up to
    /// `last_key` were delivered. `None` means nothing is left to read.
    pub fn resume_after(&self, last_key: Option<&Bytes>, rows_read: u64) -> Option<ReadRequest> {
        let limit = match self.limit {
            Some(limit) if rows_read >= limit => return None,
            Some(limit) => Some(limit - rows_read),
            None => None,
        };
        let Some(last_key) = last_key else {
            return Some(ReadRequest {
                limit,
                ..self.clone()
            });
        };

        let (ranges, keys) = if self.is_full_scan() {
            (
                vec![KeyRange::after(last_key.clone())],
                Vec::new(),
            )
        } else {
            let ranges: Vec<_> = self
                .ranges
                .iter()
                .filter_map(|range| range.resume_after(last_key))
                .collect();
            let keys: Vec<_> = self
                .keys
                .iter()
                .filter(|key| *key > last_key)
                .cloned()
                .collect();
            if ranges.is_empty() && keys.is_empty() {
                return None;
            }
            (ranges, keys)
        };

        Some(ReadRequest {
            ranges,
            keys,
            filter: self.filter.clone(),
            limit,
        })
    }
}
