use crate::{FieldRecord, FieldValue};

/// Ordered accumulator for captured fields.
///
/// Append order is wire order and is preserved through the decoded output;
/// downstream text emitters rely on it.
///
/// # Examples
/// ```
/// use snifflens_core::{FieldSink, FieldValue};
///
/// let mut sink = FieldSink::new();
/// sink.add("Count", &[], FieldValue::Uint(2));
/// sink.add("SpellId", &[0], FieldValue::Int(118));
/// assert_eq!(sink.records()[1].path, vec![0]);
/// ```
#[derive(Debug, Default)]
pub struct FieldSink {
    records: Vec<FieldRecord>,
}

impl FieldSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, path: &[u32], value: FieldValue) {
        self.records.push(FieldRecord {
            name: name.to_string(),
            path: path.to_vec(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FieldRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_append_order() {
        let mut sink = FieldSink::new();
        sink.add("B", &[], FieldValue::Uint(1));
        sink.add("A", &[], FieldValue::Uint(2));
        let records = sink.into_records();
        assert_eq!(records[0].name, "B");
        assert_eq!(records[1].name, "A");
    }
}
