use crate::{
    consts::CONTINUE_TEXT,
    story::{Effect, Jump, Requirement},
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
/// Index of a choice within its story's arena.
///
/// Ids are assigned in document order during parsing, which makes them the
/// stable per-choice index used for deterministic seeding.
pub struct ChoiceId(pub(crate) usize);

impl ChoiceId {
    /// Position in document order.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
/// A node in a story's tree of choices.
///
/// The entry text of a story is itself a choice with no button text, as are
/// the synthetic continuation pages inserted at page breaks. Children are
/// the only ownership edges; `parent` exists for label resolution and
/// `back` jumps and must never be used to walk ownership.
pub struct Choice {
    /// Stable label (`=label`), present when something jumps here or after
    /// auto-assignment during finalization.
    pub label: Option<String>,
    /// Nesting depth; the entry choice is depth zero.
    pub depth: usize,
    /// Parent in the tree, lookup only.
    pub parent: Option<ChoiceId>,
    /// Text shown on the selection button; `None` means the choice cannot
    /// be offered and is reachable only by jump.
    pub button_text: Option<String>,
    /// Accumulated display text, unprocessed.
    pub text: String,
    /// Guards controlling visibility and enablement.
    pub requirements: Vec<Requirement>,
    /// Mutations, calls and jumps run when the choice executes.
    pub effects: Vec<Effect>,
    /// Child choices in document order.
    pub children: Vec<ChoiceId>,
}

impl Choice {
    pub(crate) fn new() -> Self {
        Choice {
            label: None,
            depth: 0,
            parent: None,
            button_text: None,
            text: String::new(),
            requirements: Vec::new(),
            effects: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Jumps attached to this choice, in document order.
    pub fn jumps(&self) -> impl Iterator<Item = (&Effect, &Jump)> {
        self.effects
            .iter()
            .filter_map(|effect| effect.jump().map(|jump| (effect, jump)))
    }

    pub fn has_jump(&self) -> bool {
        self.effects.iter().any(|effect| effect.is_jump())
    }

    /// Whether any effect invokes the named call.
    pub fn has_call(&self, name: &str) -> bool {
        self.effects.iter().any(|effect| effect.is_call(name))
    }

    /// A synthetic page-break continuation (`...` button).
    ///
    /// The entry choice never counts, which callers enforce by id.
    pub(crate) fn has_continue_text(&self) -> bool {
        self.button_text.as_deref() == Some(CONTINUE_TEXT)
    }

    /// A dead end: no children and nothing that keeps the story going.
    ///
    /// Dead ends under a story declaring an `end` label get an automatic
    /// jump to it during finalization.
    pub fn is_end(&self) -> bool {
        self.children.is_empty() && !self.effects.iter().any(|effect| effect.keeps_story_going())
    }

    pub(crate) fn set_button_text(&mut self, text: &str) {
        let text = text.trim();

        self.button_text = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }
}
