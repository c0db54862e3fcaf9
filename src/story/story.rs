use crate::{
    consts::{END_LABEL, SNIPPET_PREFIX},
    log::{Logger, Warning},
    story::{Choice, ChoiceId, Effect, Requirement, RequirementKind},
};

use std::collections::HashMap;

#[derive(Clone, Debug)]
/// One parsed story: an arena of choices rooted at an entry choice.
///
/// Choices are owned by the arena and addressed by [`ChoiceId`]; the tree
/// structure lives in each choice's `children` vector. The arena preserves
/// document order, which deterministic seeding depends on.
pub struct Story {
    /// Unique id, lowercase.
    id: String,
    /// Id with the author's original casing, for diagnostics.
    display_id: String,
    root: ChoiceId,
    choices: Vec<Choice>,
    /// Label → choice index for jump resolution.
    labels: HashMap<String, ChoiceId>,
    /// Vars this story writes, collected during batch validation.
    pub(crate) declared_vars: Vec<String>,
    next_generated_label: u32,
}

impl Story {
    pub(crate) fn new() -> Self {
        let mut story = Story {
            id: String::new(),
            display_id: String::new(),
            root: ChoiceId(0),
            choices: Vec::new(),
            labels: HashMap::new(),
            declared_vars: Vec::new(),
            next_generated_label: 0,
        };

        story.root = story.push(Choice::new());
        story
    }

    /// Unique lowercase id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id as the author wrote it.
    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    pub(crate) fn set_id(&mut self, raw: &str) {
        self.id = raw.trim().to_lowercase();
        self.display_id = raw.trim().to_string();
    }

    /// Whether this story is a reusable snippet rather than a playable story.
    pub fn is_snippet(&self) -> bool {
        self.id.starts_with(SNIPPET_PREFIX)
    }

    /// Entry choice executed when the story starts.
    pub fn root(&self) -> ChoiceId {
        self.root
    }

    pub(crate) fn set_root(&mut self, id: ChoiceId) {
        self.root = id;
    }

    pub fn choice(&self, id: ChoiceId) -> &Choice {
        &self.choices[id.0]
    }

    pub(crate) fn choice_mut(&mut self, id: ChoiceId) -> &mut Choice {
        &mut self.choices[id.0]
    }

    pub(crate) fn push(&mut self, choice: Choice) -> ChoiceId {
        let id = ChoiceId(self.choices.len());
        self.choices.push(choice);
        id
    }

    /// Number of choices in the arena, including unreachable ones.
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// All choice ids in document order.
    pub fn choice_ids(&self) -> impl Iterator<Item = ChoiceId> {
        (0..self.choices.len()).map(ChoiceId)
    }

    /// Resolve a label to its choice.
    pub fn label_target(&self, label: &str) -> Option<ChoiceId> {
        self.labels.get(&label.trim().to_lowercase()).copied()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_target(label).is_some()
    }

    pub(crate) fn set_label(&mut self, label: &str, id: ChoiceId) {
        self.labels.insert(label.trim().to_lowercase(), id);
    }

    pub(crate) fn remove_label(&mut self, label: &str) {
        self.labels.remove(&label.trim().to_lowercase());
    }

    /// Find a choice by label or by auto-assigned id.
    ///
    /// The arena scan covers auto-assigned ids on freshly parsed stories,
    /// where only authored labels are registered; used by hosts restoring a
    /// saved position.
    pub fn choice_by_any_id(&self, id: &str) -> Option<ChoiceId> {
        let id = id.trim().to_lowercase();

        self.label_target(&id).or_else(|| {
            self.choice_ids()
                .find(|choice_id| self.choice(*choice_id).label.as_deref() == Some(id.as_str()))
        })
    }

    /// Generate a label unique within this story for `back`/`start` jumps.
    pub(crate) fn generate_label(&mut self) -> String {
        let label = format!("choice_{}", self.next_generated_label);
        self.next_generated_label += 1;
        label
    }

    /// A synthetic continuation page; the entry choice never counts.
    pub fn is_continue(&self, id: ChoiceId) -> bool {
        id != self.root && self.choice(id).has_continue_text()
    }

    /// Walk up from a continuation page to the choice that was selected.
    pub(crate) fn last_non_continue(&self, id: ChoiceId) -> ChoiceId {
        let mut current = id;

        while self.is_continue(current) {
            match self.choice(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        current
    }

    /// Ids in depth-first document order from the root.
    pub(crate) fn dfs_order(&self) -> Vec<ChoiceId> {
        let mut order = Vec::with_capacity(self.choices.len());
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.choice(id).children.iter().rev() {
                stack.push(*child);
            }
        }

        order
    }

    /// Whether `target` is reachable from `from` through children or jumps.
    pub(crate) fn reaches(&self, from: ChoiceId, target: ChoiceId) -> bool {
        let mut visited = vec![false; self.choices.len()];
        let mut stack = vec![from];
        visited[from.0] = true;

        while let Some(id) = stack.pop() {
            let choice = self.choice(id);

            let children = choice.children.iter().copied();
            let jumps = choice
                .jumps()
                .filter_map(|(_, jump)| self.label_target(&jump.target));

            for next in children.chain(jumps) {
                if next == target {
                    return true;
                }
                if !visited[next.0] {
                    visited[next.0] = true;
                    stack.push(next);
                }
            }
        }

        false
    }

    /// The first `repeat` requirement on the entry choice, however nested.
    pub(crate) fn repeat_requirement(&self) -> Option<&Requirement> {
        self.choice(self.root)
            .requirements
            .iter()
            .find_map(|req| req.find_kind(&|kind| matches!(kind, RequirementKind::Repeat { .. })))
    }

    /// Finalize a freshly parsed or freshly decoded story.
    ///
    /// Registers authored labels (warning on duplicates, except those of
    /// snippet origin), assigns `storyid_N` ids to unlabelled choices, and
    /// gives every dead end under a declared `end` label a jump to it.
    pub(crate) fn finish(&mut self, logger: &mut Logger) {
        let order = self.dfs_order();

        self.labels.clear();
        for id in order.iter() {
            if let Some(label) = self.choice(*id).label.clone() {
                let key = label.trim().to_lowercase();
                if self.labels.contains_key(&key) && !key.starts_with(SNIPPET_PREFIX) {
                    logger.warn(
                        Warning::DuplicateLabel {
                            label: key.clone(),
                            story: self.id.clone(),
                        },
                        None,
                    );
                }
                self.labels.insert(key, *id);
            }
        }

        for (index, id) in order.iter().enumerate() {
            if self.choice(*id).label.is_none() {
                let label = format!("{}_{}", self.id, index + 1);
                self.choice_mut(*id).label = Some(label);
            }
        }

        if let Some(end) = self.label_target(END_LABEL) {
            for id in order {
                if id == end || !self.choice(id).is_end() {
                    continue;
                }
                if self.reaches(end, id) {
                    continue;
                }
                let source = format!("> {}", END_LABEL);
                self.choice_mut(id)
                    .effects
                    .push(Effect::jump_to(END_LABEL, false, source));
            }
        }
    }

    /// Clone a snippet's tree into this story as a hidden root child.
    ///
    /// The cloned entry loses its button text, takes `target_label` as its
    /// label, and internal jumps to the entry's old label are rewritten.
    /// Returns the cloned entry.
    pub(crate) fn graft_snippet(&mut self, snippet: &Story, target_label: &str) -> ChoiceId {
        let mut mapping = HashMap::new();
        let order = snippet.dfs_order();

        for old_id in order.iter() {
            let mut clone = snippet.choice(*old_id).clone();
            clone.children.clear();
            let new_id = self.push(clone);
            mapping.insert(*old_id, new_id);
        }

        let old_entry_label = snippet.choice(snippet.root).label.clone();

        for old_id in order.iter() {
            let new_id = mapping[old_id];
            let children: Vec<ChoiceId> = snippet.choice(*old_id).children.iter().map(|child| mapping[child]).collect();

            for child in children.iter() {
                self.choice_mut(*child).parent = Some(new_id);
            }
            self.choice_mut(new_id).children = children;

            // rewrite jumps that pointed at the snippet's own entry label
            if let Some(old_label) = &old_entry_label {
                for effect in self.choice_mut(new_id).effects.iter_mut() {
                    if let crate::story::EffectKind::Jump(jump) = &mut effect.kind {
                        if jump.target == *old_label {
                            jump.target = target_label.to_string();
                        }
                    }
                }
            }
        }

        let entry = mapping[&snippet.root];
        let root = self.root;

        self.choice_mut(entry).parent = Some(root);
        self.choice_mut(entry).button_text = None;
        self.choice_mut(entry).label = Some(target_label.to_string());
        self.choice_mut(root).children.push(entry);
        self.set_label(target_label, entry);

        entry
    }

    /// Render the choice tree as an indented outline, for tests and tools.
    pub fn to_outline(&self) -> String {
        let mut text = format!("Story [id={}\n", self.display_id);

        for child in self.choice(self.root).children.clone() {
            self.outline_choice(child, 1, &mut text);
        }

        text.push_str("]");
        text
    }

    fn outline_choice(&self, id: ChoiceId, level: usize, text: &mut String) {
        let choice = self.choice(id);

        for _ in 1..level {
            text.push('\t');
        }
        for _ in 0..level {
            text.push('*');
        }

        text.push_str(&format!(
            " {} ({}) ",
            choice.button_text.as_deref().unwrap_or(""),
            choice.label.as_deref().unwrap_or("")
        ));

        for (_, jump) in choice.jumps() {
            text.push_str(&format!("(jump to {}) ", jump.target));
        }

        let flat = choice.text.replace('\n', " ");
        text.push_str(&format!("- {}\n", flat.trim()));

        for child in choice.children.clone() {
            self.outline_choice(child, level + 1, text);
        }
    }
}
