//! Parsing of story script source text.
//!
//! The line-oriented state machine in [`line`] builds the choice tree while
//! [`req`] and [`effect`] parse the expressions embedded in directive lines.
//! All of it is hand tokenized; malformed input is logged and skipped so a
//! whole batch can always load.

mod context;
mod effect;
mod jump;
mod line;
mod req;

pub(crate) use context::ParseContext;
pub(crate) use effect::{parse_call_text, parse_conditional_effect, parse_effect};
pub(crate) use jump::{add_once, parse_jump};
pub(crate) use line::parse_source;
pub(crate) use req::parse_requirement;

use crate::{call::CallRegistry, error::ParseError, log::Logger, story::Story};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Read stories from a string of story script source.
///
/// Snippet stories (`===snippet_x===`) are included in the returned list;
/// filter on [`Story::is_snippet`] if they are not wanted. Malformed lines
/// are logged and skipped, so this only fails on truly unreadable input.
///
/// # Examples
/// ```
/// use fabula::{read_stories_from_string, CallRegistry, Logger};
///
/// let content = "\
/// ===intro===
/// The shuttle door hisses open.
/// * Step outside
///     A red desert stretches to the horizon.
/// * Stay inside
///     The door closes again.
/// ";
///
/// let mut logger = Logger::default();
/// let registry = CallRegistry::new();
///
/// let stories = read_stories_from_string(content, &registry, &mut logger).unwrap();
///
/// assert_eq!(stories.len(), 1);
/// assert_eq!(stories[0].id(), "intro");
/// ```
pub fn read_stories_from_string(
    content: &str,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Result<Vec<Story>, ParseError> {
    let mut snippets = HashMap::new();
    let mut known_ids = HashSet::new();

    let mut context = ParseContext {
        registry,
        logger,
        snippets: &mut snippets,
        known_ids: &mut known_ids,
    };

    Ok(parse_source(content, "<string>", &mut context))
}

/// Read stories from a single story script file.
///
/// The file name appears in diagnostics; the content is parsed exactly as
/// [`read_stories_from_string`] does. To load a whole directory with the
/// compiled binary cache and batch validation, use
/// [`StoryLibrary::load_dir`][crate::StoryLibrary::load_dir] instead.
pub fn read_stories_from_file<P: AsRef<Path>>(
    path: P,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Result<Vec<Story>, ParseError> {
    let path = path.as_ref();

    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => {
            return Err(ParseError::InvalidFileName {
                path: path.display().to_string(),
            })
        }
    };

    let content = fs::read_to_string(path)?;

    let mut snippets = HashMap::new();
    let mut known_ids = HashSet::new();

    let mut context = ParseContext {
        registry,
        logger,
        snippets: &mut snippets,
        known_ids: &mut known_ids,
    };

    Ok(parse_source(&content, &name, &mut context))
}

/// Split on any of the given separators, scanning left to right.
///
/// At each position the separators are tried in the order given, so longer
/// separators should be listed before their prefixes.
pub(crate) fn split_any<'a>(text: &'a str, separators: &[&str]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut position = 0;

    'scan: while position < text.len() {
        if !text.is_char_boundary(position) {
            position += 1;
            continue;
        }

        for separator in separators {
            if text[position..].starts_with(separator) {
                parts.push(&text[start..position]);
                position += separator.len();
                start = position;
                continue 'scan;
            }
        }

        position += 1;
    }

    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_any_honors_separator_order() {
        assert_eq!(split_any("a || b", &["||", " | "]), vec!["a ", " b"]);
        assert_eq!(split_any("a | b | c", &["||", " | "]), vec!["a", "b", "c"]);
        assert_eq!(split_any("plain", &["||"]), vec!["plain"]);
    }

    #[test]
    fn split_any_splits_conditionals() {
        let parts = split_any("cond ? then : else", &["?", ":"]);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].trim(), "then");
        assert_eq!(parts[2].trim(), "else");
    }
}
