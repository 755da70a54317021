//! The date-range filter setting and its shifting rules.
//!
//! Weekly and monthly views must always present full calendar periods,
//! so every shift or granularity switch realigns both bounds to period
//! boundaries around the shifted start, never around the old end.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Domain, Leaf};
use crate::field::{EligibleField, FieldKind};
use crate::traits::Clock;

/// Calendar unit a date range snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

/// Direction of a range shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Earlier,
    Later,
}

/// Whether a shift changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOutcome {
    Shifted,
    /// Nothing to shift: no start bound is set.
    NoRange,
}

/// Mutable state of the date-range filter.
///
/// The predicate is non-empty exactly when both bounds are set, and then
/// always consists of the two comparison leaves `field >= start` and
/// `field <= end`. `active` is raised whenever the predicate changed and
/// is consumed by the next domain rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSetting {
    pub granularity: Granularity,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub field_index: usize,
    pub predicate: Domain,
    pub active: bool,
}

impl Default for FilterSetting {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            start: None,
            end: None,
            field_index: 0,
            predicate: Domain::empty(),
            active: false,
        }
    }
}

impl FilterSetting {
    /// Shift the range by `amount` units of the current granularity.
    ///
    /// Day granularity offsets both bounds by whole days, keeping the
    /// time of day. Week and month granularity realign: the start moves
    /// to the period start of the shifted anchor, and the end (when one
    /// was set) to the period end of that same anchor. An absent end
    /// stays absent. A shift that would leave the representable calendar
    /// range keeps the bound where it was.
    pub fn shift(&mut self, direction: ShiftDirection, amount: u32) -> ShiftOutcome {
        let Some(start) = self.start else {
            return ShiftOutcome::NoRange;
        };

        match self.granularity {
            Granularity::Day => {
                let delta = match direction {
                    ShiftDirection::Earlier => -Duration::days(i64::from(amount)),
                    ShiftDirection::Later => Duration::days(i64::from(amount)),
                };
                self.start = Some(start.checked_add_signed(delta).unwrap_or(start));
                self.end = self
                    .end
                    .map(|end| end.checked_add_signed(delta).unwrap_or(end));
            }
            Granularity::Week => {
                let delta = match direction {
                    ShiftDirection::Earlier => -Duration::weeks(i64::from(amount)),
                    ShiftDirection::Later => Duration::weeks(i64::from(amount)),
                };
                let anchor = start.checked_add_signed(delta).unwrap_or(start);
                self.start = Some(start_of_week(anchor));
                self.end = self.end.map(|_| end_of_week(anchor));
            }
            Granularity::Month => {
                let anchor = shift_months(start, direction, amount);
                self.start = Some(start_of_month(anchor));
                self.end = self.end.map(|_| end_of_month(anchor));
            }
        }

        ShiftOutcome::Shifted
    }

    /// Switch granularity: reset the range to today, then realign it to
    /// the new calendar period with a zero-amount shift. Datetime fields
    /// get the full-day bounds 00:00:00 and 23:59:59; date fields keep
    /// the bare day (their serialization carries no time anyway).
    pub fn set_granularity(&mut self, granularity: Granularity, kind: FieldKind, clock: &dyn Clock) {
        self.granularity = granularity;

        let today = clock.now();
        match kind {
            FieldKind::Datetime => {
                self.start = Some(today.date().and_time(NaiveTime::MIN));
                self.end = Some(end_of_day(today.date()));
            }
            FieldKind::Date => {
                self.start = Some(today);
                self.end = Some(today);
            }
        }

        self.shift(ShiftDirection::Earlier, 0);
    }

    /// Replace a single bound; used when the user edits an input directly.
    pub fn set_bound(&mut self, index: usize, value: Option<NaiveDateTime>) {
        match index {
            0 => self.start = value,
            _ => self.end = value,
        }
    }

    /// Rebuild the predicate for the targeted field and raise `active`.
    /// No-op unless both bounds are set.
    pub fn apply(&mut self, field: &EligibleField) {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return;
        };

        self.predicate = Domain::from_leaves(vec![
            Leaf::new(
                field.name.clone(),
                ">=",
                json!(field.kind.serialize_bound(start)),
            ),
            Leaf::new(
                field.name.clone(),
                "<=",
                json!(field.kind.serialize_bound(end)),
            ),
        ]);
        self.active = true;
    }

    /// Drop both bounds and the predicate, raising `active` so the next
    /// domain rebuild removes the clause.
    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.predicate = Domain::empty();
        self.active = true;
    }
}

fn shift_months(start: NaiveDateTime, direction: ShiftDirection, amount: u32) -> NaiveDateTime {
    let shifted = match direction {
        ShiftDirection::Earlier => start.checked_sub_months(Months::new(amount)),
        ShiftDirection::Later => start.checked_add_months(Months::new(amount)),
    };
    // Out-of-range dates are unreachable with calendar-scale amounts.
    shifted.unwrap_or(start)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

/// Monday 00:00:00 of the week containing `anchor`.
pub fn start_of_week(anchor: NaiveDateTime) -> NaiveDateTime {
    let offset = i64::from(anchor.date().weekday().num_days_from_monday());
    (anchor.date() - Duration::days(offset)).and_time(NaiveTime::MIN)
}

/// Sunday 23:59:59 of the week containing `anchor`.
pub fn end_of_week(anchor: NaiveDateTime) -> NaiveDateTime {
    end_of_day(start_of_week(anchor).date() + Duration::days(6))
}

/// First day of the month containing `anchor`, at 00:00:00.
pub fn start_of_month(anchor: NaiveDateTime) -> NaiveDateTime {
    anchor
        .date()
        .with_day(1)
        .unwrap_or(anchor.date())
        .and_time(NaiveTime::MIN)
}

/// Last day of the month containing `anchor`, at 23:59:59.
pub fn end_of_month(anchor: NaiveDateTime) -> NaiveDateTime {
    let first = start_of_month(anchor).date();
    let next_month = first
        .checked_add_months(Months::new(1))
        .unwrap_or(first);
    end_of_day(next_month - Duration::days(1))
}
