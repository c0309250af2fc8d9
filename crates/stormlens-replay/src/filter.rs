//! Whitelist filtering for record-stream extraction.

use std::collections::BTreeMap;
use stormlens_protocol::DecodedValue;

/// Field-value whitelist applied to event records.
///
/// A record is accepted if, for at least one filtered field, the record's
/// value equals any accepted value — a logical OR across fields and
/// values. Evaluation stops at the first matching pair, so filters on
/// large streams stay cheap.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    accepted: BTreeMap<String, Vec<DecodedValue>>,
}

impl EventFilter {
    /// Creates an empty filter (accepts nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds accepted values for a field.
    ///
    /// ```rust
    /// use stormlens_replay::EventFilter;
    ///
    /// let filter = EventFilter::new().field("m_playerId", [2i64]);
    /// assert!(!filter.is_empty());
    /// ```
    #[must_use]
    pub fn field<V>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<DecodedValue>,
    {
        self.accepted
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Whether no field has any accepted value.
    pub fn is_empty(&self) -> bool {
        self.accepted.values().all(Vec::is_empty)
    }

    /// Tests a record; the first matching (field, value) pair accepts it
    /// and short-circuits the rest.
    pub fn matches(&self, record: &DecodedValue) -> bool {
        for (name, accepted) in &self.accepted {
            let Some(value) = record.field(name) else {
                continue;
            };
            if accepted.iter().any(|candidate| candidate == value) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(pairs: &[(&str, DecodedValue)]) -> DecodedValue {
        let mut fields = BTreeMap::new();
        for (name, value) in pairs {
            fields.insert((*name).to_owned(), value.clone());
        }
        DecodedValue::Struct(fields)
    }

    #[test]
    fn matches_any_listed_value() {
        let filter = EventFilter::new().field("m_playerId", [1i64, 2]);
        assert!(filter.matches(&record(&[("m_playerId", DecodedValue::Int(2))])));
        assert!(!filter.matches(&record(&[("m_playerId", DecodedValue::Int(3))])));
    }

    #[test]
    fn or_across_fields() {
        let filter = EventFilter::new()
            .field("m_playerId", [7i64])
            .field("_event", ["NNet.Game.SChatMessage"]);
        // Neither field matching rejects; either one matching accepts.
        assert!(filter.matches(&record(&[
            ("m_playerId", DecodedValue::Int(1)),
            ("_event", DecodedValue::Text("NNet.Game.SChatMessage".to_owned())),
        ])));
        assert!(filter.matches(&record(&[("m_playerId", DecodedValue::Int(7))])));
        assert!(!filter.matches(&record(&[("m_playerId", DecodedValue::Int(1))])));
    }

    #[test]
    fn missing_fields_do_not_match() {
        let filter = EventFilter::new().field("m_playerId", [2i64]);
        assert!(!filter.matches(&record(&[("m_recipient", DecodedValue::Int(2))])));
    }

    #[test]
    fn empty_filter_accepts_nothing() {
        let filter = EventFilter::new();
        assert!(filter.is_empty());
        assert!(!filter.matches(&record(&[("m_playerId", DecodedValue::Int(2))])));
    }

    #[test]
    fn values_compare_after_normalization_shape() {
        // Text values filter against normalized records.
        let filter = EventFilter::new().field("m_hero", ["Alarak"]);
        assert!(filter.matches(&record(&[(
            "m_hero",
            DecodedValue::Text("Alarak".to_owned())
        )])));
        // Pre-normalization bytes do not equal text.
        assert!(!filter.matches(&record(&[(
            "m_hero",
            DecodedValue::Bytes(b"Alarak".to_vec())
        )])));
    }
}
