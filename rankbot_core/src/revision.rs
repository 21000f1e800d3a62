use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::RankbotError;
use crate::RankbotResult;

/// One entry of a page's revision history, newest first as delivered by the
/// document store. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
	pub id: u64,
	pub timestamp: DateTime<Utc>,
	pub author: String,
	pub summary: String,
}

/// Walk `history` newest-first and return the first revision satisfying the
/// predicate.
///
/// An empty history and a non-empty history where nothing qualified are
/// distinct failures so diagnostics can tell "page never edited" apart from
/// "no revision was acceptable".
pub fn select_where<'r>(
	page: &str,
	history: &'r [Revision],
	mut predicate: impl FnMut(&Revision) -> bool,
) -> RankbotResult<&'r Revision> {
	if history.is_empty() {
		return Err(RankbotError::EmptyHistory(page.to_string()));
	}

	history
		.iter()
		.find(|revision| predicate(revision))
		.ok_or_else(|| {
			RankbotError::NoQualifyingRevision {
				page: page.to_string(),
				scanned: history.len(),
			}
		})
}

/// The oldest revision still timestamped on or after `cutoff`, used to pin
/// ranking comparisons to a reference point in time.
///
/// When every revision is on or after the cutoff the globally oldest one is
/// returned. When even the newest revision predates the cutoff the newest is
/// returned as the closest available reference. `None` only for an empty
/// history.
pub fn select_by_date(history: &[Revision], cutoff: NaiveDate) -> Option<&Revision> {
	let mut selected = None;

	for revision in history {
		if revision.timestamp.date_naive() < cutoff {
			break;
		}
		selected = Some(revision);
	}

	selected.or_else(|| history.first())
}
