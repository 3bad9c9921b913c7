//! Choice-field exclusivity
//!
//! A FHIR choice element `value[x]` is stored as one slot per allowed type
//! (`valueQuantity`, `valueString`, ...). At most one member of a group, together with
//! its sidecar, is populated at a time. Every write to a member goes through
//! [`Node::set_choice`], which clears the other members in the same call.

use serde_json::Value;

use crate::codec::{bind_value, is_empty_metadata};
use crate::element::Node;
use crate::registry::choice_type_suffix;

impl Node {
    /// Assign a choice member and clear its siblings
    ///
    /// Clears every other member of the group and their sidecars, plus the selected
    /// member's own previous sidecar. Assigning `null` leaves the whole group unset.
    /// A name that is not a choice member is assigned like any other property.
    pub(crate) fn set_choice(&mut self, name: &str, value: Value) {
        let registry = self.registry();
        let Some(index) = registry.slot(name) else {
            tracing::warn!(
                type_name = registry.type_name(),
                property = name,
                "ignoring write to unknown property"
            );
            return;
        };
        let Some(slot) = registry.slot_at(index) else {
            return;
        };
        let property = *slot.property();

        if property.choice_of.is_none() {
            tracing::debug!(
                type_name = registry.type_name(),
                property = name,
                "set_choice on a non-choice property"
            );
        }

        for sibling in registry.choice_siblings(name) {
            self.remove_slot(sibling);
        }
        if let Some(sidecar) = slot.partner() {
            self.remove_slot(sidecar);
        }

        match bind_value(&property, value) {
            Some(bound) => self.insert_slot(index, bound),
            None => {
                self.remove_slot(index);
            }
        }
    }

    /// Populated member of a choice group as `(property name, value)`
    pub fn choice(&self, group: &str) -> Option<(&str, &Value)> {
        let registry = self.registry();
        registry.choice_group(group).find_map(|property| {
            let index = registry.slot(property.name)?;
            let value = self.slot_value(index)?;
            Some((property.name, value))
        })
    }

    /// Type suffix of the populated member (`Quantity` for `valueQuantity`)
    pub fn choice_type(&self, group: &str) -> Option<&str> {
        let (name, _) = self.choice(group)?;
        choice_type_suffix(group, name)
    }

    /// Resolve groups with several populated members after bulk binding
    ///
    /// The first member in registry order wins; a member counts as populated if
    /// its value is set or its sidecar carries metadata.
    pub(crate) fn enforce_choice_exclusivity(&mut self) {
        let registry = self.registry();

        for group in registry.choice_groups() {
            let populated: Vec<&str> = registry
                .choice_group(group)
                .filter(|property| self.member_populated(property.name))
                .map(|property| property.name)
                .collect();

            let Some((kept, dropped)) = populated.split_first() else {
                continue;
            };
            if dropped.is_empty() {
                continue;
            }

            tracing::warn!(
                type_name = registry.type_name(),
                group,
                kept,
                dropped = ?dropped,
                "snapshot populated several members of a choice group"
            );

            for sibling in registry.choice_siblings(kept) {
                self.remove_slot(sibling);
            }
        }
    }

    fn member_populated(&self, name: &str) -> bool {
        let registry = self.registry();
        let Some(index) = registry.slot(name) else {
            return false;
        };
        let sidecar = registry.slot_at(index).and_then(|slot| slot.partner());
        self.slot_value(index).is_some()
            || sidecar
                .and_then(|s| self.slot_value(s))
                .is_some_and(|metadata| !is_empty_metadata(metadata))
    }
}
