use crate::error::{MetaData, RunError};

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
/// Log message with optional information about its origin.
pub struct LogMessage {
    /// Logged message.
    pub kind: MessageKind,
    /// Where in the source the message originated from, if known.
    pub meta_data: Option<MetaData>,
}

#[derive(Clone, Debug, PartialEq)]
/// Severity of a logged message.
pub enum MessageKind {
    /// Non-fatal problem; the surrounding content was kept or skipped.
    Warning(Warning),
    /// Problem that aborted one operation (never the whole load or run).
    Error(Warning),
}

#[derive(Clone, Debug, PartialEq)]
/// A detected problem in story content.
pub enum Warning {
    /// A line did not match any known form and was skipped.
    InvalidLine { line: String },
    /// A requirement expression could not be parsed.
    InvalidRequirement { line: String },
    /// A mutation or call statement could not be parsed.
    InvalidEffect { line: String },
    /// A call expression could not be parsed.
    InvalidCall { line: String },
    /// A jump directive could not be parsed.
    InvalidJump { line: String },
    /// Integer comparisons must use `==` or `>=`, never bare `=`.
    EqualsCompareOnInt { line: String },
    /// `age` comparisons use `==`; a bare `=` was promoted.
    AgeEqualsCompare { line: String },
    /// `>=`/`<=` cannot be used against an embedded call.
    RangeCompareToCall { line: String },
    /// `<`/`>` cannot be used against a string or bool value.
    RangeCompareToText { line: String },
    /// The left-hand namespace is not known to the engine.
    UnknownNamespace { line: String },
    /// A label was assigned to a choice that already had one.
    LabelOverwritten { old: String, new: String },
    /// Two choices in one story share a label.
    DuplicateLabel { label: String, story: String },
    /// Two stories in one batch share an id.
    DuplicateStoryId { id: String },
    /// A choice may set its background only once.
    DuplicateBackground { line: String },
    /// Setting a background would clear portraits assigned on the choice.
    BackgroundClearsPortraits { line: String },
    /// A label vanished while stripping a redundant page break.
    RemovedLabel { label: String, story: String },
    /// A second unconditional jump was ignored.
    JumpAlreadyPresent { line: String },
    /// Explicit jumps to the `end` label are redundant and ignored.
    JumpToEndLabel { line: String },
    /// The story's entry choice cannot be shown-but-disabled.
    EntryChoiceDisabled { line: String },
    /// Typographic characters were replaced with plain equivalents.
    InvalidCharacters { line: String },
    /// A `~` in the middle of a line was replaced with `-`.
    StrayTilde { line: String },
    /// Button text long enough that it will be shrunk by most hosts.
    LongButtonText { text: String },
    /// A choice bullet skipped more than one nesting level.
    ChoiceDepthSkip { line: String },
    /// No attachment point matched a choice bullet's nesting level.
    ChoiceDepthNoParent { line: String },
    /// A page break was inserted with nothing to break.
    PageBreakWithoutContent { story: String },
    /// Text resumed on a choice that already had finished text.
    TextResumed { story: String },
    /// A file contained no story header, or the last story had no id.
    NoStoriesInFile { file: String },
    /// A snippet jump target was not defined above the reference.
    SnippetNotFound { target: String },
    /// A `back` jump found no non-continue ancestor to return to.
    BackTargetNotFound { story: String },
    /// A source file was loaded without a compiled counterpart.
    UncompiledStoryFile { file: String },
    /// A jump targets a label that no choice carries.
    DanglingJump { story: String, target: String },
    /// A requirement reads a memory no story ever writes.
    UnknownMemory { story: String, key: String },
    /// A requirement reads a groundhog no story ever writes.
    UnknownGroundhog { story: String, key: String },
    /// A requirement reads a story flag no story sets or declares.
    UnknownStoryFlag { story: String, id: String },
    /// A requirement reads a story var the story never sets.
    UnknownVar { story: String, key: String },
    /// No registered call matched a name and argument signature.
    CallBindingFailed { name: String },
    /// A bound call's return type does not fit its comparison.
    CallReturnMismatch { name: String },
    /// A call's validation hook rejected its arguments.
    CallValidateFailed { name: String },
    /// A call invocation failed at runtime and was skipped.
    CallFailed { name: String },
    /// A templating tag could not be interpreted and was dropped.
    InvalidTemplateTag { tag: String },
    /// A runtime failure that aborted jump resolution or choice execution.
    Runtime(RunError),
}

impl LogMessage {
    pub(crate) fn new(kind: MessageKind, meta_data: Option<MetaData>) -> Self {
        LogMessage { kind, meta_data }
    }

    /// The warning carried by this message, whatever its severity.
    pub fn warning(&self) -> &Warning {
        match &self.kind {
            MessageKind::Warning(warning) => warning,
            MessageKind::Error(warning) => warning,
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match &self.kind {
            MessageKind::Warning(..) => "WARNING",
            MessageKind::Error(..) => "ERROR",
        };

        match &self.meta_data {
            Some(meta_data) => write!(f, "[{}] {}: {}", meta_data, label, self.warning()),
            None => write!(f, "{}: {}", label, self.warning()),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Warning::*;

        match self {
            InvalidLine { line } => write!(f, "invalid story line '{}'", line),
            InvalidRequirement { line } => write!(f, "invalid story requirement '{}'", line),
            InvalidEffect { line } => write!(f, "invalid story set '{}'", line),
            InvalidCall { line } => write!(f, "invalid story call '{}'", line),
            InvalidJump { line } => write!(f, "invalid story jump '{}'", line),
            EqualsCompareOnInt { line } => {
                write!(f, "integer compare needs '==' or '>=', not '=': '{}'", line)
            }
            AgeEqualsCompare { line } => {
                write!(f, "age compare cannot use '=', treating as '==': '{}'", line)
            }
            RangeCompareToCall { line } => write!(
                f,
                "'>=' and '<=' cannot compare against a call, use '>' or '<': '{}'",
                line
            ),
            RangeCompareToText { line } => write!(
                f,
                "'<' and '>' cannot compare against a string or bool: '{}'",
                line
            ),
            UnknownNamespace { line } => write!(f, "unknown namespace in '{}'", line),
            LabelOverwritten { old, new } => {
                write!(f, "choice already labelled '{}', overwriting with '{}'", old, new)
            }
            DuplicateLabel { label, story } => {
                write!(f, "story '{}' declares label '{}' more than once", story, label)
            }
            DuplicateStoryId { id } => write!(f, "a story with id '{}' already exists", id),
            DuplicateBackground { line } => {
                write!(f, "choice already has a background image: '{}'", line)
            }
            BackgroundClearsPortraits { line } => write!(
                f,
                "background change would clear this choice's portraits: '{}'",
                line
            ),
            RemovedLabel { label, story } => write!(
                f,
                "label '{}' was removed with a redundant page break in story '{}'",
                label, story
            ),
            JumpAlreadyPresent { line } => write!(
                f,
                "choice already has an unconditional jump, ignoring '{}'",
                line
            ),
            JumpToEndLabel { line } => write!(
                f,
                "dead ends jump to 'end' on their own, ignoring '{}'",
                line
            ),
            EntryChoiceDisabled { line } => write!(
                f,
                "entry choice cannot use '~ifd', treating as '~if': '{}'",
                line
            ),
            InvalidCharacters { line } => {
                write!(f, "line contains typographic characters: '{}'", line)
            }
            StrayTilde { line } => write!(f, "line contains a stray '~': '{}'", line),
            LongButtonText { text } => write!(f, "long button text: '{}'", text),
            ChoiceDepthSkip { line } => write!(
                f,
                "choice bullet jumps more than one level deep: '{}'",
                line
            ),
            ChoiceDepthNoParent { line } => {
                write!(f, "no parent matches choice bullet depth: '{}'", line)
            }
            PageBreakWithoutContent { story } => write!(
                f,
                "page break with no text, jump or month advance in story '{}'",
                story
            ),
            TextResumed { story } => write!(
                f,
                "text resumed after directives on a choice in story '{}'",
                story
            ),
            NoStoriesInFile { file } => {
                write!(f, "no stories found in file '{}', or the last has no id", file)
            }
            SnippetNotFound { target } => write!(
                f,
                "snippet '{}' is not defined above its first reference",
                target
            ),
            BackTargetNotFound { story } => write!(
                f,
                "no non-continue ancestor found for a 'back' jump in story '{}'",
                story
            ),
            UncompiledStoryFile { file } => write!(
                f,
                "loading uncompiled story file '{}'; compile it for faster loads",
                file
            ),
            DanglingJump { story, target } => {
                write!(f, "story '{}' jumps to missing label '{}'", story, target)
            }
            UnknownMemory { story, key } => {
                write!(f, "story '{}' reads memory '{}' that nothing writes", story, key)
            }
            UnknownGroundhog { story, key } => write!(
                f,
                "story '{}' reads groundhog '{}' that nothing writes",
                story, key
            ),
            UnknownStoryFlag { story, id } => {
                write!(f, "story '{}' checks unknown story flag '{}'", story, id)
            }
            UnknownVar { story, key } => {
                write!(f, "story '{}' reads var '{}' that it never sets", story, key)
            }
            CallBindingFailed { name } => {
                write!(f, "no registered call matches '{}'", name)
            }
            CallReturnMismatch { name } => {
                write!(f, "call '{}' returns a type its comparison cannot use", name)
            }
            CallValidateFailed { name } => {
                write!(f, "call '{}' failed validation", name)
            }
            CallFailed { name } => write!(f, "call '{}' failed and was skipped", name),
            InvalidTemplateTag { tag } => write!(f, "unknown dynamic text rule '{}'", tag),
            Runtime(err) => write!(f, "{}", err),
        }
    }
}
