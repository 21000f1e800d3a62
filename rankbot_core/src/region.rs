use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::RankbotError;
use crate::RankbotResult;

/// A pair of literal marker strings delimiting a replaceable region of a
/// page. Markers are plain substrings, never patterns; only the first
/// occurrence of each marker is honored, so a repeated marker is part of the
/// region content rather than a delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
	/// Literal text opening the region. The marker itself stays in place.
	pub start: String,
	/// Literal text closing the region. The marker itself stays in place.
	pub end: String,
}

impl Tag {
	pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
		Self {
			start: start.into(),
			end: end.into(),
		}
	}
}

/// Which of a [`Tag`]'s markers could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MissingMarker {
	Start,
	End,
	Both,
}

impl Display for MissingMarker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Start => write!(f, "starting tag"),
			Self::End => write!(f, "ending tag"),
			Self::Both => write!(f, "both tags"),
		}
	}
}

/// Locate the span strictly between the first occurrence of `tag.start` and
/// the first occurrence of `tag.end`. Returns byte offsets into `text`.
fn locate(text: &str, tag: &Tag) -> RankbotResult<(usize, usize)> {
	let start = text.find(&tag.start);
	let end = text.find(&tag.end);

	match (start, end) {
		// An end marker sitting before the start marker means the region is
		// not actually delimited; report the end marker as missing.
		(Some(start), Some(end)) if end >= start + tag.start.len() => {
			Ok((start + tag.start.len(), end))
		}
		(Some(_), Some(_)) => {
			Err(RankbotError::TagsNotFound {
				start: tag.start.clone(),
				end: tag.end.clone(),
				missing: MissingMarker::End,
			})
		}
		(start, end) => {
			let missing = match (start, end) {
				(None, None) => MissingMarker::Both,
				(None, Some(_)) => MissingMarker::Start,
				_ => MissingMarker::End,
			};

			Err(RankbotError::TagsNotFound {
				start: tag.start.clone(),
				end: tag.end.clone(),
				missing,
			})
		}
	}
}

/// Extract the content between a tag pair, excluding both markers.
pub fn extract<'t>(text: &'t str, tag: &Tag) -> RankbotResult<&'t str> {
	let (start, end) = locate(text, tag)?;
	Ok(&text[start..end])
}

/// Replace the content between a tag pair, leaving everything up to and
/// including the start marker, and everything from the end marker onward,
/// untouched.
pub fn replace(text: &str, tag: &Tag, content: &str) -> RankbotResult<String> {
	let (start, end) = locate(text, tag)?;
	let mut result = String::with_capacity(start + content.len() + (text.len() - end));
	result.push_str(&text[..start]);
	result.push_str(content);
	result.push_str(&text[end..]);

	Ok(result)
}
