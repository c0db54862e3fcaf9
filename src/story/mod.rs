//! The parsed story graph and its supporting types.

mod choice;
mod effect;
mod library;
mod req;
mod story;

pub use choice::{Choice, ChoiceId};
pub use effect::{AssignValue, Effect, EffectKind, Jump, PortraitSlot, WriteOp};
pub use library::StoryLibrary;
pub use req::{CallOperand, Compare, RepeatUnit, Requirement, RequirementKind, SeasonTarget};
pub use story::Story;
