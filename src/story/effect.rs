use crate::{
    call::CallRef,
    consts::{
        CALL_ADVANCE_MONTH, CALL_BATTLE, CALL_GO_HOME, CALL_RUN_STORY, CALL_SET_INPUT,
        CALL_SET_NAME,
    },
    story::Requirement,
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
/// Screen position a character portrait is assigned to.
pub enum PortraitSlot {
    Left,
    MidLeft,
    MidRight,
    Right,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Where an assigned value comes from when the effect executes.
pub enum AssignValue {
    /// Literal text, kept verbatim (original casing preserved for
    /// free-text memory values).
    Literal(String),
    /// Copy of a session memory (`mem_` on the right-hand side).
    MemoryRef(String),
    /// Copy of a permanent groundhog (`hog_`).
    GroundhogRef(String),
    /// Copy of a per-story var (`var_`).
    VarRef(String),
    /// Result of a call, re-evaluated at execution time (`call_`).
    Call(CallRef),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// How a key-value write mutates its target.
pub enum WriteOp {
    /// Overwrite with a value.
    Assign(AssignValue),
    /// Add to the stored integer (`x++`, `x-2`, `x += 3`).
    Add(i32),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Redirection of execution to another labelled choice.
pub struct Jump {
    /// Target label, lowercase.
    pub target: String,
    /// `>>`: discard accumulated text when arriving at the target.
    pub skip_text: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// A state mutation, call invocation, jump or presentation instruction.
pub struct Effect {
    pub kind: EffectKind,
    /// Guard from the conditional forms (`~setif`, `~callif`, `>if`).
    pub guard: Option<Requirement>,
    /// Effect run instead when the guard fails.
    pub or_else: Option<Box<Effect>>,
    /// Original statement text for diagnostics.
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// The executed variants of an [`Effect`].
pub enum EffectKind {
    /// Write a session memory (`~set mem_x ...`).
    Memory { key: String, op: WriteOp },
    /// Write a per-story var (`~set var_x ...`).
    Var { key: String, op: WriteOp },
    /// Write a permanent groundhog (`~set hog_x ...`).
    Groundhog { key: String, op: WriteOp },
    /// Mark a story as executed or erase the mark (`~set story_x`).
    StoryFlag { id: String, value: bool },
    /// Invoke a host call for its side effects (`~call name(...)`).
    Call(CallRef),
    /// Move execution to another choice (`>label`).
    Jump(Jump),
    /// Change the background image; empty clears it (`~set bg = x`).
    Background(AssignValue),
    /// Assign a portrait slot; `slot` of `None` clears every slot.
    Portrait {
        slot: Option<PortraitSlot>,
        image: AssignValue,
    },
    /// Set the speaking character; empty clears it (`~set speaker = x`).
    Speaker(AssignValue),
    /// Set the billboard sprite shown before the story starts.
    Sprite(AssignValue),
    /// Grant a card, optionally hidden from result screens.
    Card { id: String, hidden: bool },
    /// Trigger a named visual effect (`~set effect = screenshake`).
    Vfx { id: String },
    /// Add or remove a named status (`~set status = [remove_]x`).
    Status { id: String, remove: bool },
}

impl Effect {
    pub(crate) fn new(kind: EffectKind, source: String) -> Self {
        Effect {
            kind,
            guard: None,
            or_else: None,
            source,
        }
    }

    pub(crate) fn jump_to(target: &str, skip_text: bool, source: String) -> Self {
        Effect::new(
            EffectKind::Jump(Jump {
                target: target.to_string(),
                skip_text,
            }),
            source,
        )
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.kind, EffectKind::Jump(..))
    }

    /// The jump this effect performs, if it is one.
    pub fn jump(&self) -> Option<&Jump> {
        match &self.kind {
            EffectKind::Jump(jump) => Some(jump),
            _ => None,
        }
    }

    /// Whether this effect invokes the named call.
    pub fn is_call(&self, name: &str) -> bool {
        match &self.kind {
            EffectKind::Call(call) => call.name == name.trim().to_lowercase(),
            _ => false,
        }
    }

    /// Whether this effect opens a disruptive host screen.
    ///
    /// Battles, going home and advancing the month all replace the story
    /// view, so pending text must be paged out before they run.
    pub(crate) fn is_disruptive_call(&self) -> bool {
        self.is_call(CALL_BATTLE) || self.is_call(CALL_GO_HOME) || self.is_call(CALL_ADVANCE_MONTH)
    }

    /// Whether this effect keeps a dead-end alive for `is_end` purposes.
    pub(crate) fn keeps_story_going(&self) -> bool {
        self.is_jump()
            || self.is_call(CALL_BATTLE)
            || self.is_call(CALL_RUN_STORY)
            || self.is_call(CALL_ADVANCE_MONTH)
            || self.is_call(CALL_SET_NAME)
            || self.is_call(CALL_SET_INPUT)
    }
}
