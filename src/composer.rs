//! Composition of the full query domain and its lifecycle.
//!
//! The search model owns the base predicate, the facet groups, the
//! search-panel predicate and the date-range filter setting. The
//! composed domain is memoized; it is rebuilt only when the filter
//! setting raises its `active` flag or the group set is replaced.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::domain::{Domain, DomainError};
use crate::field::{EligibleField, FieldDef, eligible_fields};
use crate::filter::{FilterSetting, Granularity, ShiftDirection, ShiftOutcome};
use crate::traits::Clock;

/// One facet group: the domains of its currently active items are
/// OR-combined, and the groups themselves are AND-combined.
#[derive(Debug, Clone, Default)]
pub struct FilterGroup {
    pub active_items: Vec<Domain>,
}

impl FilterGroup {
    pub fn new(active_items: Vec<Domain>) -> Self {
        Self { active_items }
    }
}

/// Combine every predicate source into one domain.
///
/// Term order is fixed: base, date-range predicate, one OR per group,
/// search panel. Empty terms are neutral under AND and contribute
/// nothing; an empty group therefore does not constrain the result.
/// A malformed term aborts the whole call, nothing is partially applied.
pub fn compose(
    base: &Domain,
    date_range: &Domain,
    groups: &[FilterGroup],
    search_panel: &Domain,
    include_base: bool,
    include_search_panel: bool,
) -> Result<Domain, DomainError> {
    let mut terms = Vec::with_capacity(groups.len() + 3);
    if include_base {
        terms.push(base.clone());
    }
    if !date_range.is_empty() {
        terms.push(date_range.clone());
    }
    for group in groups {
        terms.push(Domain::or(&group.active_items)?);
    }
    if include_search_panel {
        terms.push(search_panel.clone());
    }
    Domain::and(&terms)
}

/// Search model: the single owner of query-domain state for one view.
#[derive(Debug, Clone)]
pub struct SearchModel {
    base: Domain,
    groups: Vec<FilterGroup>,
    search_panel: Domain,
    fields: Vec<EligibleField>,
    setting: FilterSetting,
    cached: Option<Domain>,
}

impl SearchModel {
    /// Build a model for a view. `allow_list` restricts the candidate
    /// date fields; `default_field` preselects one of them by name.
    pub fn new(
        base: Domain,
        groups: Vec<FilterGroup>,
        search_panel: Domain,
        field_defs: &[FieldDef],
        allow_list: Option<&[String]>,
        default_field: Option<&str>,
    ) -> Self {
        let fields = eligible_fields(field_defs, allow_list);
        let mut setting = FilterSetting::default();
        if let Some(name) = default_field
            && let Some(index) = fields.iter().position(|f| f.name == name)
        {
            setting.field_index = index;
        }

        Self {
            base,
            groups,
            search_panel,
            fields,
            setting,
            cached: None,
        }
    }

    /// The date fields the range filter may target. Empty when the view
    /// has none; the filter then renders nothing and never commits.
    pub fn fields(&self) -> &[EligibleField] {
        &self.fields
    }

    pub fn setting(&self) -> &FilterSetting {
        &self.setting
    }

    fn selected_field(&self) -> Option<EligibleField> {
        self.fields.get(self.setting.field_index).cloned()
    }

    /// The composed domain in list form, memoized between invalidations.
    ///
    /// Rebuilds when no cache exists or the filter setting was refreshed;
    /// the rebuild consumes the `active` flag. Between invalidations the
    /// returned clause sequence is identical call to call.
    pub fn domain(&mut self) -> Result<Domain, DomainError> {
        if self.cached.is_none() || self.setting.active {
            let composed = compose(
                &self.base,
                &self.setting.predicate,
                &self.groups,
                &self.search_panel,
                true,
                true,
            )?;
            self.setting.active = false;
            tracing::debug!(domain = %composed, "rebuilt composed domain");
            self.cached = Some(composed);
        }

        Ok(self.cached.clone().unwrap_or_default())
    }

    /// Replace the facet groups. This is the external invalidation
    /// signal for group changes.
    pub fn set_groups(&mut self, groups: Vec<FilterGroup>) {
        self.groups = groups;
        self.cached = None;
    }

    // ==================== Date-range filter operations ====================

    /// Shift the range one step and commit. Returns `NoRange` without
    /// touching the domain when no start bound is set.
    pub fn shift(&mut self, direction: ShiftDirection, amount: u32) -> ShiftOutcome {
        let outcome = self.setting.shift(direction, amount);
        if outcome == ShiftOutcome::Shifted {
            self.commit();
        }
        outcome
    }

    /// Switch granularity, snapping the range to the current calendar
    /// period, and commit.
    pub fn set_granularity(&mut self, granularity: Granularity, clock: &dyn Clock) {
        let Some(field) = self.selected_field() else {
            return;
        };
        self.setting.set_granularity(granularity, field.kind, clock);
        self.commit();
    }

    /// Target a different eligible field, resetting the range.
    pub fn select_field(&mut self, index: usize) {
        if index >= self.fields.len() {
            return;
        }
        self.setting = FilterSetting {
            field_index: index,
            active: true,
            ..FilterSetting::default()
        };
    }

    /// Replace one bound with a user-supplied value (no commit).
    pub fn set_bound(&mut self, index: usize, value: Option<chrono::NaiveDateTime>) {
        self.setting.set_bound(index, value);
    }

    /// Rebuild the range predicate from the current bounds. No-op when a
    /// bound is missing or the view has no eligible field.
    pub fn commit(&mut self) {
        let Some(field) = self.selected_field() else {
            return;
        };
        self.setting.apply(&field);
    }

    /// Drop the range filter entirely.
    pub fn clear(&mut self) {
        self.setting = FilterSetting {
            field_index: self.setting.field_index,
            active: true,
            ..FilterSetting::default()
        };
    }

    // ==================== State round trip ====================

    /// Export the filter state as a plain mapping, sufficient to rebuild
    /// identical behavior after breadcrumb navigation.
    pub fn export_state(&self) -> Result<Value> {
        serde_json::to_value(&self.setting).context("Failed to export filter state")
    }

    /// Restore a previously exported filter state.
    pub fn import_state(&mut self, state: Value) -> Result<()> {
        self.setting =
            serde_json::from_value(state).context("Failed to import filter state")?;
        self.cached = None;
        Ok(())
    }
}
