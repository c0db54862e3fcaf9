use crate::{
    log::Logger,
    story::{Choice, ChoiceId, Effect, Requirement, Story},
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Serialized form of one story: its identity plus the choice tree.
///
/// The arena and label index are rebuilt when the record is turned back
/// into a [`Story`], so only the tree itself is stored.
pub struct StoryRecord {
    pub id: String,
    pub display_id: String,
    pub root: ChoiceRecord,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Serialized form of one choice and, recursively, its subtree.
pub struct ChoiceRecord {
    pub label: Option<String>,
    pub depth: u32,
    pub button_text: Option<String>,
    pub text: String,
    pub requirements: Vec<Requirement>,
    pub effects: Vec<Effect>,
    pub children: Vec<ChoiceRecord>,
}

impl StoryRecord {
    /// Snapshot a story into its serialized form.
    ///
    /// Only choices reachable from the root are captured; orphans from
    /// page-break stripping are dropped here.
    pub fn from_story(story: &Story) -> Self {
        StoryRecord {
            id: story.id().to_string(),
            display_id: story.display_id().to_string(),
            root: ChoiceRecord::from_choice(story, story.root()),
        }
    }

    /// Rebuild a story, re-running finalization on the restored tree.
    pub fn into_story(self, logger: &mut Logger) -> Story {
        let mut story = Story::new();
        story.set_id(&self.display_id);

        let root = story.root();
        self.root.restore(&mut story, root, None);

        if !story.is_snippet() {
            story.finish(logger);
        }

        story
    }
}

impl ChoiceRecord {
    fn from_choice(story: &Story, id: ChoiceId) -> Self {
        let choice = story.choice(id);

        ChoiceRecord {
            label: choice.label.clone(),
            depth: choice.depth as u32,
            button_text: choice.button_text.clone(),
            text: choice.text.clone(),
            requirements: choice.requirements.clone(),
            effects: choice.effects.clone(),
            children: choice
                .children
                .iter()
                .map(|child| ChoiceRecord::from_choice(story, *child))
                .collect(),
        }
    }

    /// Write this record into an already allocated arena slot, then
    /// allocate and restore its children below it.
    fn restore(self, story: &mut Story, id: ChoiceId, parent: Option<ChoiceId>) {
        {
            let choice = story.choice_mut(id);
            choice.label = self.label;
            choice.depth = self.depth as usize;
            choice.parent = parent;
            choice.button_text = self.button_text;
            choice.text = self.text;
            choice.requirements = self.requirements;
            choice.effects = self.effects;
        }

        for child_record in self.children {
            let child = story.push(Choice::new());
            story.choice_mut(id).children.push(child);
            child_record.restore(story, child, Some(id));
        }
    }
}
