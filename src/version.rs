use std::fmt;

/// Ordered mapping of version field names to their values.
///
/// Field order follows the `[current_version]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRecord {
    fields: Vec<(String, String)>,
}

impl VersionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Sets an existing field, or appends a new one at the end.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VersionRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = VersionRecord::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

/// Which fields a bump touches and which fields it resets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BumpPolicy {
    /// Highest precedence first.
    pub reset_order: Vec<String>,
    /// Incremented on every bump, whatever field was requested.
    pub auto: Vec<String>,
}

impl BumpPolicy {
    fn precedence(&self, field: &str) -> Option<usize> {
        self.reset_order.iter().position(|name| name == field)
    }

    fn is_auto(&self, field: &str) -> bool {
        self.auto.iter().any(|name| name == field)
    }
}

/// Reported when a bump names a field the record doesn't have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedField {
    pub name: String,
    pub valid: Vec<String>,
}

impl fmt::Display for UnrecognizedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a recognized field name (valid field names: {})",
            self.name,
            self.valid.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    pub record: VersionRecord,
    pub unrecognized: Option<UnrecognizedField>,
}

impl BumpOutcome {
    /// Names of the fields whose value differs from `original`.
    pub fn changed_fields(&self, original: &VersionRecord) -> Vec<String> {
        self.record
            .iter()
            .filter(|(name, value)| original.get(name) != Some(*value))
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Increments a decimal string, e.g. `"3"` becomes `"4"`.
///
/// Returns `None` when the value is not a plain non-negative decimal integer.
pub fn increment(value: &str) -> Option<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let current: u64 = value.parse().ok()?;
    current.checked_add(1).map(|next| next.to_string())
}

/// Applies a bump to a copy of `record`.
///
/// Every `auto` field is incremented, then `requested` (unless it is itself an
/// `auto` field). When the requested field was incremented, every field listed
/// after it in `reset_order` is reset to `"0"`.
pub fn bump(record: &VersionRecord, policy: &BumpPolicy, requested: Option<&str>) -> BumpOutcome {
    let mut next = record.clone();

    for field in &policy.auto {
        if let Some(value) = next.get(field).and_then(increment) {
            next.set(field.as_str(), value);
        }
    }

    let mut unrecognized = None;
    if let Some(field) = requested {
        if !next.contains(field) {
            unrecognized = Some(UnrecognizedField {
                name: field.to_string(),
                valid: record.field_names(),
            });
        } else if !policy.is_auto(field) {
            if let Some(value) = next.get(field).and_then(increment) {
                next.set(field, value);
                if let Some(position) = policy.precedence(field) {
                    for lower in &policy.reset_order[position + 1..] {
                        if next.contains(lower) {
                            next.set(lower.as_str(), "0");
                        }
                    }
                }
            }
        }
    }

    BumpOutcome {
        record: next,
        unrecognized,
    }
}
