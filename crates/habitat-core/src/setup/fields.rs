//! Field Registration
//!
//! Turns configured field entries into registered resource fields.

use crate::components::field::ResourceFieldSet;
use crate::config::FieldConfig;

/// Register every valid field from `configs`. Invalid entries are logged and
/// skipped. Returns the number registered.
pub fn register_fields(fields: &mut ResourceFieldSet, configs: &[FieldConfig]) -> usize {
    let mut registered = 0;
    for entry in configs {
        let field = entry.to_field();
        if let Err(e) = field.validate() {
            tracing::warn!("Skipping field '{}': {}", entry.id, e);
            continue;
        }
        if fields.insert(field).is_some() {
            tracing::warn!("Field '{}' defined twice; keeping the later entry", entry.id);
        }
        registered += 1;
    }
    registered
}
