use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Datelike;
use chrono::Days;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::RankbotError;
use crate::RankbotResult;

/// How often an automated edit may land on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Periodicity {
	/// At most once per calendar day.
	Day,
	/// At most once per ISO week.
	Week,
	/// At most once per two ISO weeks.
	TwoWeeks,
}

/// Edit-restriction policy for one region: a periodicity plus the ISO
/// weekdays (Monday = 1 … Sunday = 7) on which the bot may run at all.
///
/// The policy is pure; who made the last qualifying automated edit is the
/// caller's business, the policy only compares its timestamp against now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditWindow {
	pub once: Periodicity,
	pub days: BTreeSet<u32>,
}

impl EditWindow {
	/// Decide whether an automated edit may run now, given the last
	/// qualifying edit. A denial names the clause that blocked it.
	pub fn check(&self, last_edit: DateTime<Utc>, now: DateTime<Utc>) -> RankbotResult<()> {
		let weekday = now.weekday().number_from_monday();
		if !self.days.contains(&weekday) {
			return Err(restricted(format!(
				"edit cannot be made on that day: {weekday}"
			)));
		}

		let today = now.date_naive();
		let edit_day = last_edit.date_naive();

		match self.once {
			Periodicity::Day => {
				if today == edit_day {
					return Err(restricted(format!("page has been edited today: {today}")));
				}
			}
			Periodicity::Week => {
				check_same_week(edit_day, today)?;
			}
			Periodicity::TwoWeeks => {
				check_same_week(edit_day, today)?;

				if week_start(today) - Days::new(7) == week_start(edit_day) {
					return Err(restricted(format!(
						"page has been edited last week: {}",
						edit_day.iso_week().week()
					)));
				}
			}
		}

		Ok(())
	}

	/// Convenience form of [`check`](Self::check) for callers that only need
	/// the verdict.
	pub fn is_permitted(&self, last_edit: DateTime<Utc>, now: DateTime<Utc>) -> bool {
		self.check(last_edit, now).is_ok()
	}
}

fn check_same_week(edit_day: NaiveDate, today: NaiveDate) -> RankbotResult<()> {
	// Year-aware: week 1 of one year never collides with week 1 of another.
	if today.iso_week() == edit_day.iso_week() {
		return Err(restricted(format!(
			"page has been edited this week: {}",
			today.iso_week().week()
		)));
	}

	Ok(())
}

/// The Monday opening the ISO week `date` falls in.
fn week_start(date: NaiveDate) -> NaiveDate {
	date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn restricted(reason: String) -> RankbotError {
	RankbotError::EditRestricted { reason }
}
