//! Guid to display-name resolution.

use std::collections::HashMap;

use crate::metadata::BusinessEntity;

/// Map each entity guid to its name, or to the guid itself when unnamed.
///
/// Entities without a guid cannot be referenced and are skipped. A repeated
/// guid takes the name of its last occurrence.
pub fn resolve_entity_names(entities: &[BusinessEntity]) -> HashMap<String, String> {
    let mut names = HashMap::with_capacity(entities.len());
    for entity in entities {
        if let Some(guid) = entity.guid.as_deref() {
            names.insert(guid.to_string(), entity.display_name().to_string());
        }
    }
    names
}
