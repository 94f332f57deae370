//! `---` delimited YAML blocks at the top of Markdown notes.

use serde::{Deserialize, Serialize};

use super::{Location, RegionalDate};

/// Everything a note records about itself besides its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
	pub date: RegionalDate,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<Location>,
}

/// Splits `text` into its frontmatter and body, or `None` when it has no frontmatter.
///
/// The opening marker must be the very first line. A single blank line after the closing
/// marker belongs to the separator rather than the body.
pub fn split(text: &str) -> Option<(&str, &str)> {
	let rest = text
		.strip_prefix("---\n")
		.or_else(|| text.strip_prefix("---\r\n"))?;

	let mut offset = 0;
	for line in rest.split_inclusive('\n') {
		if line.trim_end_matches(['\r', '\n']) == "---" {
			let yaml = &rest[..offset];
			let body = &rest[offset + line.len()..];
			let body = body
				.strip_prefix("\r\n")
				.or_else(|| body.strip_prefix('\n'))
				.unwrap_or(body);
			return Some((yaml, body));
		}
		offset += line.len();
	}

	None
}

/// Reads the `tags` list of a note. Notes without frontmatter, or without tags, have none.
///
/// Fails when the frontmatter is not valid YAML or `tags` is not a list of strings.
pub fn extract_tags(text: &str) -> Result<Vec<String>, serde_yaml::Error> {
	#[derive(Deserialize)]
	struct Tags {
		#[serde(default)]
		tags: Option<Vec<String>>,
	}

	let Some((yaml, _)) = split(text) else {
		return Ok(Vec::new());
	};

	if yaml.trim().is_empty() {
		return Ok(Vec::new());
	}

	let Tags { tags } = serde_yaml::from_str(yaml)?;
	Ok(tags.unwrap_or_default())
}
