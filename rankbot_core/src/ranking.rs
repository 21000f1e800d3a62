use std::collections::BTreeMap;
use std::fmt::Display;

use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;

use crate::codec::Record;
use crate::template::CompiledTemplate;

/// A countable entity competing for a ranking slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contender {
	/// Short entity code, the ranking's stable identity.
	pub code: String,
	/// Name shown in the rendered row.
	pub name: String,
	/// The count this ranking orders by.
	pub count: u64,
	/// Normalized category labels the entity belongs to.
	pub categories: Vec<String>,
}

/// Admission rules for one ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPolicy {
	/// Minimum count required to appear at all.
	pub threshold: u64,
	/// When set, only contenders carrying this category are admitted.
	pub category: Option<String>,
}

/// Movement of an entry relative to the previous snapshot. Exactly one
/// applies to every ranked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Movement {
	/// Not present in the snapshot.
	New,
	/// Snapshot place was greater than the current one.
	Up,
	/// Snapshot place was less than the current one.
	Down,
	/// Same place as the snapshot.
	Steady,
}

impl Movement {
	/// The marker rendered into the ranking row.
	pub fn marker(self) -> &'static str {
		match self {
			Self::New => "**",
			Self::Up => "++",
			Self::Down => "--",
			Self::Steady => "//",
		}
	}
}

impl Display for Movement {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.marker())
	}
}

/// One row of a computed ranking, in display order within its list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
	pub code: String,
	pub name: String,
	pub count: u64,
	/// Displayed place. `None` for a tie continuation, rendered blank; the
	/// entry shares the place of the tied entry before it in the walk.
	pub place: Option<u32>,
	/// True ordinal in the place walk. Movement comparisons use this, not
	/// the shared displayed place.
	pub ordinal: u32,
	/// `None` when ranking without a snapshot (clean mode renders no
	/// marker).
	pub movement: Option<Movement>,
}

impl RankedEntry {
	/// Build the record for the ranking template: place left-padded to three
	/// columns, count right-padded to seven, movement marker or blank.
	pub fn to_record(&self) -> Record {
		let place = self.place.map(|place| place.to_string()).unwrap_or_default();
		let movement = self.movement.map_or("", Movement::marker);

		Record::from_iter([
			("code", self.code.clone()),
			("name", self.name.clone()),
			("place", format!("{place:<3}")),
			("move", movement.to_string()),
			("count", format!("{:>7}", self.count)),
		])
	}
}

/// A previous ranking's code → place mapping, used only for movement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct Snapshot(BTreeMap<String, u32>);

impl Snapshot {
	/// Read back `{code, place}` pairs from a previous render of the ranking
	/// template. Ordinal dots are stripped from places; a blank place
	/// inherits the previous record's place (tie continuation); a record
	/// missing its code is skipped.
	pub fn parse(text: &str, template: &CompiledTemplate) -> Self {
		let mut places = BTreeMap::new();
		let mut last_place = 1u32;

		for occurrence in template.occurrences(text) {
			let Some(record) = template.captures(occurrence) else {
				continue;
			};
			let Some(code) = record.field("code") else {
				continue;
			};

			let place_text = record.field("place").unwrap_or_default().replace('.', "");
			let place = if place_text.trim().is_empty() {
				last_place
			} else {
				match place_text.trim().parse() {
					Ok(place) => place,
					Err(_) => continue,
				}
			};

			last_place = place;
			places.insert(normalize_code(code), place);
		}

		Self(places)
	}
}

impl FromIterator<(String, u32)> for Snapshot {
	fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Strip the interwiki decoration some schemas leave around the code field.
fn normalize_code(code: &str) -> String {
	code.trim()
		.trim_start_matches("[[w:c:")
		.trim_end_matches("]]")
		.to_string()
}

/// Order contenders into a ranking.
///
/// Admission requires `count >= policy.threshold` and, when a category
/// filter is set, membership in that category. Admitted entries sort by
/// count descending, stably, so tied entries keep their encounter order.
///
/// Places are assigned walking the display order from its tail: the entry
/// with the lowest count gets place 1, an entry with the same count as the
/// previously walked one gets a blank place, every other entry gets the walk
/// ordinal. Movement compares the walk ordinal against the snapshot; with no
/// snapshot every entry's movement is `None`.
pub fn rank(
	contenders: &[Contender],
	policy: &RankPolicy,
	snapshot: Option<&Snapshot>,
) -> Vec<RankedEntry> {
	let mut admitted: Vec<&Contender> = contenders
		.iter()
		.filter(|contender| {
			contender.count >= policy.threshold
				&& policy
					.category
					.as_ref()
					.is_none_or(|category| contender.categories.iter().any(|c| c == category))
		})
		.collect();
	admitted.sort_by_key(|contender| std::cmp::Reverse(contender.count));

	let mut entries = Vec::with_capacity(admitted.len());
	let mut last_count = None;
	let mut ordinal = 0u32;

	for contender in admitted.iter().rev() {
		ordinal += 1;

		let place = if last_count == Some(contender.count) {
			None
		} else {
			Some(ordinal)
		};

		let movement = snapshot.map(|snapshot| {
			match snapshot.get(&contender.code) {
				None => Movement::New,
				Some(&old) if old > ordinal => Movement::Up,
				Some(&old) if old < ordinal => Movement::Down,
				Some(_) => Movement::Steady,
			}
		});

		entries.push(RankedEntry {
			code: contender.code.clone(),
			name: contender.name.clone(),
			count: contender.count,
			place,
			ordinal,
			movement,
		});

		last_count = Some(contender.count);
	}

	entries.reverse();
	entries
}

/// Split display-ordered entries across `columns` columns.
///
/// Column boundaries come from accumulating the fractional column width and
/// truncating, taken from the far end of the slice: the LAST column holds the
/// best ranks, sizes differ by at most one with the remainder landing in the
/// columns holding the best ranks, and concatenating columns from last to
/// first restores display order. The truncation arithmetic is pinned by the
/// tests; resist the urge to re-derive it.
pub fn split_columns<T: Clone>(entries: &[T], columns: usize) -> Vec<Vec<T>> {
	if columns == 0 {
		return vec![];
	}

	let len = entries.len();
	let avg = len as f64 / columns as f64;
	let mut out = Vec::with_capacity(columns);
	let mut last = 0.0_f64;

	while last < len as f64 {
		let start = len - (((last + avg) as usize).min(len));
		let end = len - (last as usize);
		out.push(entries[start..end].to_vec());
		last += avg;
	}

	out
}
