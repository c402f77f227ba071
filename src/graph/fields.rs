//! Classification of an entity's fields into lookups and field groups.

use crate::metadata::Field;

/// How a single field shows up in the entity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind<'a> {
    /// Field carrying a `codeField`.
    Lookup(&'a str),
    /// Repeatable field with the labels of its nested lookups.
    Group(&'a str, Vec<&'a str>),
    /// Unlabelled, or neither a lookup nor a group.
    Ignored,
}

/// Classify one field. A labelled `codeField` wins over `allowMany`.
pub fn classify_field(field: &Field) -> FieldKind<'_> {
    let Some(label) = field.display_label() else {
        return FieldKind::Ignored;
    };

    if field.is_lookup() {
        FieldKind::Lookup(label)
    } else if field.is_group() {
        let nested = field
            .fields
            .iter()
            .filter(|nf| nf.is_lookup())
            .filter_map(Field::display_label)
            .collect();
        FieldKind::Group(label, nested)
    } else {
        FieldKind::Ignored
    }
}

/// A field group and its distinct nested lookups, first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub name: String,
    pub lookups: Vec<String>,
}

/// Distinct lookups and field groups of one entity, keyed by display label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldClassification {
    pub direct_lookups: Vec<String>,
    pub field_groups: Vec<FieldGroup>,
}

impl FieldClassification {
    fn add_lookup(&mut self, name: &str) {
        if !self.direct_lookups.iter().any(|l| l == name) {
            self.direct_lookups.push(name.to_string());
        }
    }

    /// Merge into an existing group of the same name, or open a new one.
    fn add_group(&mut self, name: &str, nested: &[&str]) {
        let index = match self.field_groups.iter().position(|g| g.name == name) {
            Some(i) => i,
            None => {
                self.field_groups.push(FieldGroup {
                    name: name.to_string(),
                    lookups: Vec::new(),
                });
                self.field_groups.len() - 1
            }
        };

        let group = &mut self.field_groups[index];
        for lookup in nested {
            if !group.lookups.iter().any(|l| l == lookup) {
                group.lookups.push(lookup.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.direct_lookups.is_empty() && self.field_groups.is_empty()
    }
}

/// Walk an entity's fields, one level into groups.
pub fn classify_fields(fields: &[Field]) -> FieldClassification {
    let mut classification = FieldClassification::default();

    for field in fields {
        match classify_field(field) {
            FieldKind::Lookup(name) => classification.add_lookup(name),
            FieldKind::Group(name, nested) => classification.add_group(name, &nested),
            FieldKind::Ignored => {}
        }
    }

    classification
}
