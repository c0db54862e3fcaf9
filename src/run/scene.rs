use crate::{
    memory::ValueMap,
    story::{ChoiceId, PortraitSlot, Story},
};

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
/// A card granted during a story, for the host to hand out and show.
pub struct CardGrant {
    pub id: String,
    /// Hidden cards skip the host's result screens.
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq)]
/// A status added or removed during a story.
pub struct StatusChange {
    pub id: String,
    pub remove: bool,
}

#[derive(Clone, Debug, Default)]
/// State of one story execution.
///
/// Created when a story starts and discarded when it ends; per-story vars
/// live here so resetting a story is dropping its scene. The presentation
/// fields are structured instructions for the host to render; the engine
/// assigns them but never interprets them.
pub struct Scene {
    /// Id of the story this scene is executing.
    pub story_id: String,
    /// Per-story-execution variables (`var_` namespace).
    pub vars: ValueMap,
    /// Accumulated display text, fully processed.
    pub text: String,
    /// Choice execution halted on; its children are the next options.
    pub current: Option<ChoiceId>,
    /// Choices the player picked, in order, for undo and logging.
    pub selected: Vec<ChoiceId>,
    /// Current background image id; empty clears it.
    pub background: Option<String>,
    /// Portrait assignments by slot.
    pub portraits: BTreeMap<PortraitSlot, String>,
    /// Current speaker id.
    pub speaker: Option<String>,
    /// Billboard sprite id.
    pub sprite: Option<String>,
    /// Last triggered visual effect id.
    pub vfx: Option<String>,
    /// Cards granted so far.
    pub cards: Vec<CardGrant>,
    /// Status changes so far.
    pub status_changes: Vec<StatusChange>,
}

impl Scene {
    /// Fresh scene for one execution of the given story.
    pub fn for_story(story: &Story) -> Self {
        Scene {
            story_id: story.id().to_string(),
            ..Scene::default()
        }
    }

    pub(crate) fn clear_portraits(&mut self) {
        self.portraits.clear();
    }
}
