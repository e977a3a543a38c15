//! Ordered, identity-keyed collections of records
//!
//! A record set holds records of one schema in insertion order. Each
//! entry carries an opaque, process-unique identity assigned at
//! insertion and stable for the entry's lifetime. Membership is
//! shared-reference: adding an existing record aliases it rather than
//! cloning, so the same instance may live in several sets at once.

use std::rc::Rc;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::ValidationError;
use super::record::Record;
use super::typedef::ModelSchema;
use super::value::{Input, SharedRecord};
use crate::observability::{Event, Logger, Severity};

/// Opaque, process-unique entry identity.
pub type EntryId = Uuid;

#[derive(Debug, Clone)]
struct Entry {
    id: EntryId,
    record: SharedRecord,
}

/// An ordered, identity-keyed collection of records of one schema.
#[derive(Debug, Clone)]
pub struct RecordSet {
    schema: Arc<ModelSchema>,
    entries: Vec<Entry>,
}

impl RecordSet {
    /// Creates an empty set bound to the given schema.
    pub fn new(schema: Arc<ModelSchema>) -> RecordSet {
        RecordSet {
            schema,
            entries: Vec::new(),
        }
    }

    /// Creates a set and adds the given items.
    pub fn with_items(schema: Arc<ModelSchema>, items: impl Into<Input>) -> RecordSet {
        let mut set = RecordSet::new(schema);
        set.add(items);
        set
    }

    /// The schema this set is bound to.
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry identities in storage order.
    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Record handles in storage order.
    pub fn records(&self) -> impl Iterator<Item = &SharedRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Adds every element of a sequence via [`add_one`](Self::add_one).
    ///
    /// JSON arrays and existing record sets count as sequences;
    /// anything else is a no-op.
    pub fn add(&mut self, items: impl Into<Input>) -> &mut Self {
        match items.into() {
            Input::Json(Value::Array(elements)) => {
                for element in elements {
                    self.add_one(element);
                }
            }
            Input::Set(other) => {
                for record in other.records() {
                    self.add_one(Rc::clone(record));
                }
            }
            _ => {}
        }
        self
    }

    /// Adds one item, assigning a fresh identity.
    ///
    /// An existing record of this set's schema is kept as-is, which
    /// preserves identity equality with every other holder. A record
    /// of a foreign schema is re-modeled from its field data. A JSON
    /// object constructs a fresh record. Sequence-typed and other
    /// non-object-like input is ignored.
    pub fn add_one(&mut self, item: impl Into<Input>) -> Option<EntryId> {
        let record = match item.into() {
            Input::Record(record) => {
                if Arc::ptr_eq(record.borrow().schema(), &self.schema) {
                    record
                } else {
                    let data = Value::Object(record.borrow().get_data());
                    Record::shared(Arc::clone(&self.schema), data)
                }
            }
            Input::Json(raw @ Value::Object(_)) => Record::shared(Arc::clone(&self.schema), raw),
            _ => return None,
        };

        let id = Uuid::new_v4();
        self.entries.push(Entry { id, record });
        Some(id)
    }

    /// Iterates forward, invoking `f(record, identity)` per entry.
    pub fn each<F>(&self, mut f: F)
    where
        F: FnMut(&SharedRecord, EntryId),
    {
        for entry in &self.entries {
            f(&entry.record, entry.id);
        }
    }

    /// Iterates in reverse, invoking `f(record, identity)` per entry.
    pub fn each_right<F>(&self, mut f: F)
    where
        F: FnMut(&SharedRecord, EntryId),
    {
        for entry in self.entries.iter().rev() {
            f(&entry.record, entry.id);
        }
    }

    /// Records at the given positions, in storage order. Positions
    /// outside the set are silently ignored; duplicate positions
    /// yield one match.
    pub fn get_all_by_key(&self, positions: &[usize]) -> Vec<SharedRecord> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, _)| positions.contains(i))
            .map(|(_, e)| Rc::clone(&e.record))
            .collect()
    }

    /// The record at the given position, when exactly one matches.
    pub fn get_by_key(&self, position: usize) -> Option<SharedRecord> {
        unique(self.get_all_by_key(&[position]))
    }

    /// Records with the given identities, in storage order. Unknown
    /// identities are silently ignored.
    pub fn get_all_by_id(&self, ids: &[EntryId]) -> Vec<SharedRecord> {
        self.entries
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(|e| Rc::clone(&e.record))
            .collect()
    }

    /// The record with the given identity, when exactly one matches.
    pub fn get_by_id(&self, id: EntryId) -> Option<SharedRecord> {
        unique(self.get_all_by_id(&[id]))
    }

    /// Every entry aliasing the given record instance, in storage
    /// order. Matching is pointer identity, not structural equality.
    pub fn get_all_by_record(&self, record: &SharedRecord) -> Vec<SharedRecord> {
        self.entries
            .iter()
            .filter(|e| Rc::ptr_eq(&e.record, record))
            .map(|e| Rc::clone(&e.record))
            .collect()
    }

    /// The entry aliasing the given record, when exactly one does.
    /// An instance added twice counts as two matches and yields
    /// `None`.
    pub fn get_by_record(&self, record: &SharedRecord) -> Option<SharedRecord> {
        unique(self.get_all_by_record(record))
    }

    /// Restricts the set, in place, to `count` entries starting at
    /// `offset`.
    ///
    /// `count == 0` empties the set regardless of prior size;
    /// `count >= len` is a no-op; otherwise entries at positions
    /// `[offset, offset + count)` are retained in original order and
    /// the rest are discarded.
    pub fn limit(&mut self, count: usize, offset: usize) -> &mut Self {
        let before = self.entries.len();
        if count == 0 {
            self.entries.clear();
        } else if count >= before {
            return self;
        } else {
            let start = offset.min(before);
            let end = offset.saturating_add(count).min(before);
            let retained: Vec<Entry> = self.entries.drain(start..end).collect();
            self.entries = retained;
        }
        let before = before.to_string();
        let after = self.entries.len().to_string();
        Logger::log(
            Severity::Trace,
            Event::SetTruncated,
            &[
                ("schema", self.schema.name()),
                ("before", &before),
                ("after", &after),
            ],
        );
        self
    }

    /// Removes the entry with the given identity. Returns whether
    /// anything was removed.
    pub fn remove_by_id(&mut self, id: EntryId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// Empties the set. Returns whether anything was actually removed.
    pub fn reset(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let removed = self.entries.len().to_string();
        self.entries.clear();
        Logger::log(
            Severity::Trace,
            Event::SetCleared,
            &[("schema", self.schema.name()), ("removed", &removed)],
        );
        true
    }

    /// Validates every entry in order.
    ///
    /// Failures are re-keyed as `"{positionalIndex}_{nestedKey}"`
    /// (0-based iteration order) and merged. The scan completes
    /// regardless of earlier failures.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if let Err(entry_errors) = entry.record.borrow().validate() {
                errors.merge_prefixed(&index.to_string(), entry_errors);
            }
        }
        errors.into_result()
    }

    /// Field-keyed output of every entry, in storage order.
    pub fn get_data(&self) -> Vec<Map<String, Value>> {
        self.entries
            .iter()
            .map(|e| e.record.borrow().get_data())
            .collect()
    }

    /// Column-keyed output of every entry, in storage order.
    pub fn to_db(&self) -> Vec<Map<String, Value>> {
        self.entries
            .iter()
            .map(|e| e.record.borrow().to_db())
            .collect()
    }
}

impl PartialEq for RecordSet {
    /// Two sets are equal when they are bound to the same schema and
    /// hold the same entries (by identity and aliased instance) in
    /// the same order.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.id == b.id && Rc::ptr_eq(&a.record, &b.record))
    }
}

/// Collapses a match list to its sole element; zero or several
/// matches yield `None`.
fn unique(mut matches: Vec<SharedRecord>) -> Option<SharedRecord> {
    if matches.len() == 1 {
        matches.pop()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::{FieldDescriptor, RuleDescriptor};
    use crate::model::errors::messages;
    use crate::model::value::FieldValue;
    use serde_json::json;

    fn item_schema() -> Arc<ModelSchema> {
        ModelSchema::builder("item")
            .field("sku", FieldDescriptor::string())
            .field("qty", FieldDescriptor::integer().default(json!(1)))
            .build()
            .unwrap()
    }

    fn sample_set() -> RecordSet {
        RecordSet::with_items(
            item_schema(),
            json!([{ "sku": "a" }, { "sku": "b" }, { "sku": "c" }]),
        )
    }

    #[test]
    fn test_add_ignores_non_sequences() {
        let mut set = RecordSet::new(item_schema());
        set.add(json!({ "sku": "a" }));
        set.add(json!("scalar"));
        set.add(json!(null));
        assert!(set.is_empty());

        set.add(json!([{ "sku": "a" }]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_one_ignores_non_object_like() {
        let mut set = RecordSet::new(item_schema());
        assert!(set.add_one(json!([1, 2])).is_none());
        assert!(set.add_one(json!("a")).is_none());
        assert!(set.add_one(json!(7)).is_none());
        assert!(set.add_one(Input::Absent).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_add_one_aliases_own_kind() {
        let schema = item_schema();
        let shared = Record::shared(Arc::clone(&schema), json!({ "sku": "a" }));

        let mut set = RecordSet::new(schema);
        set.add_one(Rc::clone(&shared));

        let stored = set.get_by_key(0).unwrap();
        assert!(Rc::ptr_eq(&stored, &shared));

        // Mutation through the outside handle is visible in the set.
        shared.borrow_mut().set("sku", "z");
        assert_eq!(
            stored.borrow().get("sku"),
            Some(FieldValue::Str("z".into()))
        );
    }

    #[test]
    fn test_add_one_remodels_foreign_kind() {
        let other_schema = ModelSchema::builder("other")
            .field("sku", FieldDescriptor::string())
            .field("extra", FieldDescriptor::string())
            .build()
            .unwrap();
        let foreign = Record::shared(other_schema, json!({ "sku": "a", "extra": "x" }));

        let mut set = RecordSet::new(item_schema());
        set.add_one(Rc::clone(&foreign));

        let stored = set.get_by_key(0).unwrap();
        assert!(!Rc::ptr_eq(&stored, &foreign));
        assert_eq!(stored.borrow().get("sku"), Some(FieldValue::Str("a".into())));
        assert_eq!(stored.borrow().get("extra"), None);
    }

    #[test]
    fn test_identities_are_unique_and_stable() {
        let set = sample_set();
        let ids = set.ids();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);
    }

    #[test]
    fn test_each_and_each_right_order() {
        let set = sample_set();

        let mut forward = Vec::new();
        set.each(|record, _| {
            if let Some(FieldValue::Str(sku)) = record.borrow().get("sku") {
                forward.push(sku);
            }
        });
        assert_eq!(forward, vec!["a", "b", "c"]);

        let mut reverse = Vec::new();
        set.each_right(|record, _| {
            if let Some(FieldValue::Str(sku)) = record.borrow().get("sku") {
                reverse.push(sku);
            }
        });
        assert_eq!(reverse, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_lookup_by_key() {
        let set = sample_set();
        assert!(set.get_by_key(1).is_some());
        assert!(set.get_by_key(9).is_none());

        // Plural form keeps storage order and skips misses.
        let matches = set.get_all_by_key(&[2, 0, 9]);
        assert_eq!(matches.len(), 2);
        assert_eq!(
            matches[0].borrow().get("sku"),
            Some(FieldValue::Str("a".into()))
        );
        assert_eq!(
            matches[1].borrow().get("sku"),
            Some(FieldValue::Str("c".into()))
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let set = sample_set();
        let ids = set.ids();

        let found = set.get_by_id(ids[1]).unwrap();
        assert_eq!(
            found.borrow().get("sku"),
            Some(FieldValue::Str("b".into()))
        );
        assert!(set.get_by_id(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_duplicate_aliases_do_not_count_as_found() {
        let schema = item_schema();
        let shared = Record::shared(Arc::clone(&schema), json!({ "sku": "a" }));

        let mut set = RecordSet::new(schema);
        set.add_one(Rc::clone(&shared));
        assert!(set.get_by_record(&shared).is_some());

        set.add_one(Rc::clone(&shared));
        assert_eq!(set.get_all_by_record(&shared).len(), 2);
        assert!(set.get_by_record(&shared).is_none());
    }

    #[test]
    fn test_limit_zero_empties() {
        let mut set = sample_set();
        set.limit(0, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_limit_at_or_above_size_is_noop() {
        let mut set = sample_set();
        let ids = set.ids();
        set.limit(3, 0);
        assert_eq!(set.ids(), ids);
        set.limit(10, 1);
        assert_eq!(set.ids(), ids);
    }

    #[test]
    fn test_limit_retains_window_in_order() {
        let mut set = sample_set();
        let ids = set.ids();
        set.limit(2, 1);
        assert_eq!(set.ids(), vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_limit_offset_beyond_size_empties() {
        let mut set = sample_set();
        set.limit(1, 9);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_by_id() {
        let mut set = sample_set();
        let ids = set.ids();
        assert!(set.remove_by_id(ids[1]));
        assert_eq!(set.ids(), vec![ids[0], ids[2]]);
        assert!(!set.remove_by_id(ids[1]));
    }

    #[test]
    fn test_reset_reports_whether_anything_removed() {
        let mut set = sample_set();
        assert!(set.reset());
        assert!(set.is_empty());
        assert!(!set.reset());
    }

    #[test]
    fn test_validate_keys_by_position() {
        let schema = ModelSchema::builder("item")
            .field(
                "name",
                FieldDescriptor::string().rule(RuleDescriptor::named("required")),
            )
            .build()
            .unwrap();

        let set = RecordSet::with_items(
            schema,
            json!([{ "name": "ok" }, { "name": null }]),
        );
        let err = set.validate().unwrap_err();

        assert_eq!(err.key_count(), 1);
        assert_eq!(err.errors()["1_name"][0].message, messages::VALUE_REQUIRED);
        assert!(!err.errors().contains_key("0_name"));
    }

    #[test]
    fn test_get_data_and_to_db_preserve_order() {
        let schema = ModelSchema::builder("item")
            .field("sku", FieldDescriptor::string().column("item_sku"))
            .build()
            .unwrap();
        let set = RecordSet::with_items(schema, json!([{ "sku": "a" }, { "sku": "b" }]));

        let data = set.get_data();
        assert_eq!(data[0]["sku"], json!("a"));
        assert_eq!(data[1]["sku"], json!("b"));

        let db = set.to_db();
        assert_eq!(db[0]["item_sku"], json!("a"));
        assert!(!db[0].contains_key("sku"));
    }
}
