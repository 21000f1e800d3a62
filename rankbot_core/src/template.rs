use std::collections::HashMap;

use regex_lite::Regex;

use crate::RankbotError;
use crate::RankbotResult;
use crate::codec::Record;

/// Capture pattern substituted for placeholders in positional fields.
const POSITIONAL_CAPTURE: &str = ".*?";
/// Capture pattern substituted for placeholders in named fields. Stops at the
/// field separator so a value never swallows the next parameter.
const NAMED_CAPTURE: &str = r"[^\|]*?";

/// Declarative description of a record type: the template name as it appears
/// on the page, followed by its fields in order.
///
/// Schemas come straight from config as a list of strings. The first entry is
/// the template name; every further entry is a field spec, positional unless
/// it contains `=`, in which case it declares a `key = value` parameter.
/// Field specs may embed `%(name)s` placeholders naming the value captured at
/// that spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSchema {
	/// The template name, e.g. `Ranking record`.
	pub name: String,
	/// Ordered field specs. Positional fields match between separators in
	/// declaration order; named fields match anywhere in the record body.
	pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldSpec {
	/// An unnamed field matched by position between `|` separators.
	Positional(Pattern),
	/// A `key = value` parameter line.
	Named { key: String, pattern: Pattern },
}

impl TemplateSchema {
	/// Build a schema from its config form. The list must at least name the
	/// template.
	pub fn from_spec(spec: &[String]) -> RankbotResult<Self> {
		let Some((name, field_specs)) = spec.split_first() else {
			return Err(RankbotError::ConfigParse(
				"template spec is empty, expected at least a template name".into(),
			));
		};

		let fields = field_specs
			.iter()
			.map(|raw| {
				match raw.split_once('=') {
					Some((key, value)) => {
						FieldSpec::Named {
							key: key.trim().to_string(),
							pattern: Pattern::parse(value.trim()),
						}
					}
					None => FieldSpec::Positional(Pattern::parse(raw)),
				}
			})
			.collect();

		Ok(Self {
			name: name.trim().to_string(),
			fields,
		})
	}

	fn positional_fields(&self) -> impl Iterator<Item = &Pattern> {
		self.fields.iter().filter_map(|field| {
			match field {
				FieldSpec::Positional(pattern) => Some(pattern),
				FieldSpec::Named { .. } => None,
			}
		})
	}

	fn named_fields(&self) -> impl Iterator<Item = (&str, &Pattern)> {
		self.fields.iter().filter_map(|field| {
			match field {
				FieldSpec::Named { key, pattern } => Some((key.as_str(), pattern)),
				FieldSpec::Positional(_) => None,
			}
		})
	}
}

/// A field spec split into literal text and `%(name)s` placeholders.
///
/// The same pattern drives both directions: literals are regex-escaped when
/// building a matcher and emitted verbatim when rendering, so one schema
/// string serves as matcher and generator and a parse→render round trip is
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
	segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Field(String),
}

impl Pattern {
	/// Split a raw field spec on its `%(name)s` placeholders. An unterminated
	/// placeholder is kept as literal text.
	pub fn parse(raw: &str) -> Self {
		let mut segments = vec![];
		let mut rest = raw;

		while let Some(index) = rest.find("%(") {
			let (literal, tail) = rest.split_at(index);

			let Some(close) = tail.find(')') else {
				break;
			};

			if !literal.is_empty() {
				segments.push(Segment::Literal(literal.to_string()));
			}

			segments.push(Segment::Field(tail[2..close].to_string()));

			// Drop the printf-style conversion that trails the placeholder.
			let after = &tail[close + 1..];
			rest = after.strip_prefix('s').unwrap_or(after);
		}

		if !rest.is_empty() {
			segments.push(Segment::Literal(rest.to_string()));
		}

		Self { segments }
	}

	/// Names of the placeholders in this pattern, in order.
	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().filter_map(|segment| {
			match segment {
				Segment::Field(name) => Some(name.as_str()),
				Segment::Literal(_) => None,
			}
		})
	}

	/// Append the matching form of this pattern, placeholders resolved to
	/// named non-greedy capture groups.
	fn push_regex(&self, capture: &str, out: &mut String) {
		for segment in &self.segments {
			match segment {
				Segment::Literal(literal) => out.push_str(&regex_lite::escape(literal)),
				Segment::Field(name) => {
					out.push_str("(?P<");
					out.push_str(name);
					out.push('>');
					out.push_str(capture);
					out.push(')');
				}
			}
		}
	}

	/// Append the canonical rendered form, placeholders filled from the
	/// record. Absent fields render as empty.
	fn push_rendered(&self, record: &Record, out: &mut String) {
		for segment in &self.segments {
			match segment {
				Segment::Literal(literal) => out.push_str(literal),
				Segment::Field(name) => {
					if let Some(value) = record.get(name) {
						out.push_str(value);
					}
				}
			}
		}
	}
}

/// A schema compiled into its matcher/generator pair.
///
/// The matcher side has three parts: a boundary scanner that finds record
/// occurrences anywhere in free-form text, one matcher per named field, and a
/// positional matcher covering the record's opening line. The generator is
/// the literal inverse of the matcher, so rendering a parsed record with
/// unmodified fields reproduces the source bytes.
///
/// Compilation never mutates the schema; compile the same schema twice and
/// both artifacts behave identically.
#[derive(Debug)]
pub struct CompiledTemplate {
	name: String,
	schema: TemplateSchema,
	boundary: Regex,
	positional: Option<Regex>,
	named: Vec<(String, Regex)>,
}

fn build_regex(template: &str, pattern: &str) -> RankbotResult<Regex> {
	Regex::new(pattern).map_err(|error| {
		RankbotError::PatternBuild {
			template: template.to_string(),
			reason: error.to_string(),
		}
	})
}

impl CompiledTemplate {
	pub fn compile(schema: &TemplateSchema) -> RankbotResult<Self> {
		let escaped_name = regex_lite::escape(&schema.name);
		let boundary = build_regex(
			&schema.name,
			&format!(r"(?s)\{{\{{\s*{escaped_name}(.*?)\}}\}}"),
		)?;

		let positional_fields: Vec<&Pattern> = schema.positional_fields().collect();
		let named_fields: Vec<(&str, &Pattern)> = schema.named_fields().collect();

		let positional = if positional_fields.is_empty() {
			None
		} else {
			let mut pattern = String::from(r"(?m)^\{\{\s*");
			pattern.push_str(&escaped_name);

			for field in &positional_fields {
				pattern.push_str(r"\s*\|\s*");
				field.push_regex(POSITIONAL_CAPTURE, &mut pattern);
			}

			if named_fields.is_empty() {
				pattern.push_str(r"\s*\}\}");
			} else {
				pattern.push_str(r"\s*$");
			}

			Some(build_regex(&schema.name, &pattern)?)
		};

		let named = named_fields
			.into_iter()
			.map(|(key, field)| {
				let mut pattern = String::from(r"(?m)^\s*\|\s*");
				pattern.push_str(&regex_lite::escape(key));
				pattern.push_str(r"\s*=\s*");
				field.push_regex(NAMED_CAPTURE, &mut pattern);
				pattern.push_str(r"\s*$");

				build_regex(&schema.name, &pattern).map(|regex| (key.to_string(), regex))
			})
			.collect::<RankbotResult<Vec<_>>>()?;

		Ok(Self {
			name: schema.name.clone(),
			schema: schema.clone(),
			boundary,
			positional,
			named,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Iterate the raw text of every non-overlapping occurrence of this
	/// record type in `text`, in document order.
	pub fn occurrences<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> {
		self.boundary.find_iter(text).map(|found| found.as_str())
	}

	/// The matcher covering the record's positional fields. A schema without
	/// positional fields has none; asking for it is a configuration error,
	/// distinct from a text that merely failed to match.
	pub fn positional_matcher(&self) -> RankbotResult<&Regex> {
		self.positional
			.as_ref()
			.ok_or_else(|| RankbotError::NoPositionalFields(self.name.clone()))
	}

	/// Extract a field mapping from one occurrence. Each named-field matcher
	/// runs first, then the positional matcher; captures merge into a single
	/// record. Returns `None` when no matcher captured anything.
	pub fn captures(&self, occurrence: &str) -> Option<Record> {
		let mut record = Record::new();

		for (_, regex) in &self.named {
			if let Some(captures) = regex.captures(occurrence) {
				merge_captures(regex, &captures, &mut record);
			}
		}

		if let Some(regex) = &self.positional {
			if let Some(captures) = regex.captures(occurrence) {
				merge_captures(regex, &captures, &mut record);
			}
		}

		if record.is_empty() { None } else { Some(record) }
	}

	/// Render a record into the canonical text of this template: opening
	/// marker, positional values joined by the field separator, one
	/// `key = value` line per named field, closing marker.
	pub fn render(&self, record: &Record) -> String {
		let mut out = String::from("{{");
		out.push_str(&self.name);

		let mut has_positional = false;
		for field in self.schema.positional_fields() {
			out.push_str(" | ");
			field.push_rendered(record, &mut out);
			has_positional = true;
		}
		if has_positional {
			out.push(' ');
		}

		let mut has_named = false;
		for (key, field) in self.schema.named_fields() {
			out.push_str("\n| ");
			out.push_str(key);
			out.push_str(" = ");
			field.push_rendered(record, &mut out);
			has_named = true;
		}
		if has_named {
			out.push('\n');
		}

		out.push_str("}}");
		out
	}
}

fn merge_captures(regex: &Regex, captures: &regex_lite::Captures<'_>, record: &mut Record) {
	for name in regex.capture_names().flatten() {
		if let Some(value) = captures.name(name) {
			record.insert(name.to_string(), value.as_str().to_string());
		}
	}
}

/// The process-wide template cache: schemas keyed by record-type identifier,
/// compiled lazily and at most once per identifier.
///
/// Injected into whatever needs it rather than living in a global, so tests
/// can seed or clear it freely.
#[derive(Debug, Default)]
pub struct TemplateSet {
	schemas: HashMap<String, TemplateSchema>,
	compiled: HashMap<String, CompiledTemplate>,
}

impl TemplateSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a schema under a record-type identifier, e.g. `list_record`.
	pub fn insert(&mut self, kind: impl Into<String>, schema: TemplateSchema) {
		let kind = kind.into();
		self.compiled.remove(&kind);
		self.schemas.insert(kind, schema);
	}

	/// Build a set from `(identifier, spec list)` pairs as loaded from
	/// config.
	pub fn from_specs<'s>(
		specs: impl IntoIterator<Item = (&'s str, &'s [String])>,
	) -> RankbotResult<Self> {
		let mut set = Self::new();
		for (kind, spec) in specs {
			set.insert(kind, TemplateSchema::from_spec(spec)?);
		}

		Ok(set)
	}

	pub fn schema(&self, kind: &str) -> Option<&TemplateSchema> {
		self.schemas.get(kind)
	}

	/// The compiled template for a record type, building it on first use.
	pub fn compiled(&mut self, kind: &str) -> RankbotResult<&CompiledTemplate> {
		if !self.compiled.contains_key(kind) {
			let Some(schema) = self.schemas.get(kind) else {
				return Err(RankbotError::ConfigParse(format!(
					"no template configured for `{kind}`"
				)));
			};

			let compiled = CompiledTemplate::compile(schema)?;
			self.compiled.insert(kind.to_string(), compiled);
		}

		Ok(&self.compiled[kind])
	}
}
