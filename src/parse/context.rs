use crate::{call::CallRegistry, log::Logger, story::Story};

use std::collections::{HashMap, HashSet};

/// Shared state threaded through one batch of source files.
///
/// Snippets accumulate across files and must be defined before any story
/// that references them; story ids are tracked batch-wide so duplicates can
/// be warned about.
pub(crate) struct ParseContext<'a> {
    pub registry: &'a CallRegistry,
    pub logger: &'a mut Logger,
    /// Snippet id (without the `snippet_` prefix) → snippet story.
    pub snippets: &'a mut HashMap<String, Story>,
    /// Every story id seen so far in the batch.
    pub known_ids: &'a mut HashSet<String>,
}
