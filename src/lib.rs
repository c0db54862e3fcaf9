//! Parser, compiler and interpreter for the *Fabula* story script language.
//!
//! Fabula is a line-oriented scripting language for branching interactive
//! narrative: text files define nested choices, conditional requirements,
//! state mutations and jumps. This crate parses those files into story
//! graphs, optionally compiles them to a compact binary form for fast
//! loading, validates cross-references over a whole batch, and interprets
//! the graphs at play time to produce the text and options shown to a
//! player one step at a time.
//!
//! # Reading a story
//! ```
//! use fabula::{read_stories_from_string, CallRegistry, Logger, MemoryStore, Runner};
//!
//! let content = "\
//! ===shuttle===
//! The shuttle door hisses open.
//! * Step outside
//!     ~set mem_outside
//!     A red desert stretches to the horizon.
//! * Stay in your seat
//!     The recycled air hums.
//! ";
//!
//! let registry = CallRegistry::new();
//! let mut logger = Logger::default();
//! let stories = read_stories_from_string(content, &registry, &mut logger).unwrap();
//!
//! let mut store = MemoryStore::new();
//! let mut runner = Runner::new(&registry, &mut store);
//!
//! let story = &stories[0];
//! let scene = runner.start(story);
//!
//! for choice in runner.visible_choices(story, &scene) {
//!     println!("{}", runner.button_text(story, &scene, choice));
//! }
//! ```
//!
//! # The pieces
//! *   [`read_stories_from_string`] and [`StoryLibrary`] build [`Story`]
//!     graphs from source text; `StoryLibrary::load_dir` adds the compiled
//!     binary cache and batch-wide validation.
//! *   [`MemoryStore`] is the flat key-value state shared with the host:
//!     session memories, permanent groundhogs and the story ledger.
//! *   [`CallRegistry`] is the host's function table; stories invoke its
//!     entries from requirements, effects and templated text.
//! *   [`Runner`] walks a story against the store and registry, producing
//!     a [`Scene`] of accumulated text and presentation instructions.
//! *   [`Logger`] collects every diagnostic; nothing in the pipeline
//!     panics or aborts over malformed content.

mod calendar;
mod call;
mod compile;
mod consts;
mod error;
mod log;
mod memory;
mod parse;
mod run;
mod story;
mod text;

pub use call::{parse_bool_int_string, CallRef, CallRegistry, ValidationContext, Value, ValueKind};
pub use compile::{compile_stories, load_compiled, ChoiceRecord, StoryRecord};
pub use error::{CompileError, MetaData, ParseError, RunError};
pub use log::{LogMessage, Logger, MessageKind, Warning};
pub use memory::{MemoryStore, ValueMap};
pub use parse::{read_stories_from_file, read_stories_from_string};
pub use run::{CardGrant, Runner, Scene, StatusChange};
pub use story::{
    AssignValue, CallOperand, Choice, ChoiceId, Compare, Effect, EffectKind, Jump, PortraitSlot,
    RepeatUnit, Requirement, RequirementKind, SeasonTarget, Story, StoryLibrary, WriteOp,
};
pub use text::Pronouns;

pub mod time {
    //! The in-game calendar: season layout and month arithmetic.
    pub use crate::calendar::{
        age_at, is_season, month_of_game, month_of_year, month_of_year_at, season_at,
        season_start, MONTHS_PER_SEASON, MONTHS_PER_YEAR, SEASONS, STARTING_AGE,
    };
}
