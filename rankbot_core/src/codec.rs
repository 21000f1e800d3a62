use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;

use crate::template::CompiledTemplate;

/// One structured occurrence of a named template, as a field → value map.
///
/// A field that was not present in the source is absent from the map, never
/// an empty string; consumers must keep "missing" and "empty" distinct. A
/// record parsed from a page carries every captured field and round-trips
/// through [`CompiledTemplate::render`]; a record built programmatically only
/// needs the fields its target template declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
pub struct Record(BTreeMap<String, String>);

impl Record {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a field, replacing any existing value.
	pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
		self.insert(field.into(), value.into());
	}

	/// Field value as a `&str`, `None` when absent.
	pub fn field(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// Result of scanning a block of text for records of one type.
#[derive(Debug, Default)]
pub struct ScanOutcome {
	/// Successfully extracted records, in document order.
	pub records: Vec<Record>,
	/// Occurrences whose record boundaries matched, whether or not field
	/// extraction succeeded.
	pub occurrences: usize,
}

impl ScanOutcome {
	/// True when boundaries were found but every occurrence failed
	/// extraction. Callers treat such a revision as unusable and fall back to
	/// an earlier one.
	pub fn is_degenerate(&self) -> bool {
		self.occurrences > 0 && self.records.is_empty()
	}
}

/// Scan `text` for every non-overlapping occurrence of the template.
/// Occurrences that match the record boundaries but fail field extraction
/// are skipped; the scan always runs to the end of the text.
pub fn parse_all(text: &str, template: &CompiledTemplate) -> ScanOutcome {
	parse_all_with(text, template, |_| true)
}

/// Scan with a caller-supplied derivation step, run once per extracted
/// record. The hook may fill in fields computed from others (say, an entity
/// code inferred from an address); returning `false` drops the occurrence
/// without aborting the scan.
pub fn parse_all_with(
	text: &str,
	template: &CompiledTemplate,
	mut derive: impl FnMut(&mut Record) -> bool,
) -> ScanOutcome {
	let mut outcome = ScanOutcome::default();

	for occurrence in template.occurrences(text) {
		outcome.occurrences += 1;

		let Some(mut record) = template.captures(occurrence) else {
			tracing::debug!(
				template = template.name(),
				"occurrence failed field extraction, skipping"
			);
			continue;
		};

		if derive(&mut record) {
			outcome.records.push(record);
		} else {
			tracing::debug!(template = template.name(), "record dropped by derivation");
		}
	}

	outcome
}

/// Render records in the given order, one canonical record per line. Where
/// the result belongs in a page is the region replacer's business, not the
/// codec's.
pub fn render_all<'r>(
	records: impl IntoIterator<Item = &'r Record>,
	template: &CompiledTemplate,
) -> String {
	records
		.into_iter()
		.map(|record| template.render(record))
		.collect::<Vec<_>>()
		.join("\n")
}
