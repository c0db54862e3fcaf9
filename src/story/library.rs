//! Batches of stories loaded together, and the validation that can only
//! run once the whole batch is in memory.

use crate::{
    call::{CallRegistry, ValidationContext, ValueKind},
    compile,
    consts::{COMPILED_EXTENSION, SNIPPET_PREFIX, SOURCE_EXTENSION},
    error::CompileError,
    log::{Logger, Warning},
    parse::{parse_source, ParseContext},
    story::{
        AssignValue, CallOperand, ChoiceId, Compare, Effect, EffectKind, Requirement,
        RequirementKind, Story, WriteOp,
    },
};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Default)]
/// Every story of a load batch, with the shared lookups built from them.
///
/// Forward references (jump targets, snippets, memory and story-flag
/// names) may span files, so stories are parsed file by file into one
/// library and [`validate`][Self::validate] runs once at the end.
pub struct StoryLibrary {
    stories: Vec<Story>,
    index: HashMap<String, usize>,
    snippets: HashMap<String, Story>,
    known_ids: HashSet<String>,
    known_memories: HashSet<String>,
    known_groundhogs: HashSet<String>,
    known_story_flags: HashSet<String>,
}

impl StoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a string of source into the batch.
    pub fn add_source(
        &mut self,
        content: &str,
        name: &str,
        registry: &CallRegistry,
        logger: &mut Logger,
    ) {
        let mut context = ParseContext {
            registry,
            logger,
            snippets: &mut self.snippets,
            known_ids: &mut self.known_ids,
        };

        let stories = parse_source(content, name, &mut context);

        for story in stories {
            if !story.is_snippet() {
                self.index
                    .insert(story.id().to_string(), self.stories.len());
                self.stories.push(story);
            }
        }
    }

    /// Load every story file in a directory, in file-name order.
    ///
    /// A source file whose compiled neighbor (same name, `.fabc`) is newer
    /// loads from the binary; otherwise the source is parsed and the
    /// binary rewritten. Call [`validate`][Self::validate] afterwards.
    pub fn load_dir(
        &mut self,
        dir: &Path,
        registry: &CallRegistry,
        logger: &mut Logger,
    ) -> Result<(), CompileError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .map_or(false, |extension| extension == SOURCE_EXTENSION)
            })
            .collect();
        paths.sort();

        for path in paths {
            let compiled = path.with_extension(COMPILED_EXTENSION);

            let compiled_is_fresh = match (fs::metadata(&path), fs::metadata(&compiled)) {
                (Ok(source_meta), Ok(compiled_meta)) => {
                    match (source_meta.modified(), compiled_meta.modified()) {
                        (Ok(source_time), Ok(compiled_time)) => compiled_time > source_time,
                        _ => false,
                    }
                }
                _ => false,
            };

            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            if compiled_is_fresh {
                let bytes = fs::read(&compiled)?;
                let stories = compile::load_compiled(&bytes, logger)?;
                self.absorb_compiled(stories, logger);
            } else {
                logger.warn(Warning::UncompiledStoryFile { file: name.clone() }, None);

                let content = fs::read_to_string(&path)?;

                // parse into a scratch list first so the whole file, snippet
                // stories included, lands in the compiled output
                let mut context = ParseContext {
                    registry,
                    logger,
                    snippets: &mut self.snippets,
                    known_ids: &mut self.known_ids,
                };
                let stories = parse_source(&content, &name, &mut context);

                let bytes = compile::compile_stories(&stories)?;
                fs::write(&compiled, bytes)?;

                for story in stories {
                    if !story.is_snippet() {
                        self.index
                            .insert(story.id().to_string(), self.stories.len());
                        self.stories.push(story);
                    }
                }
            }
        }

        Ok(())
    }

    /// Route freshly decoded stories into the batch.
    fn absorb_compiled(&mut self, stories: Vec<Story>, logger: &mut Logger) {
        for mut story in stories {
            if self.known_ids.contains(story.id()) {
                logger.warn(
                    Warning::DuplicateStoryId {
                        id: story.id().to_string(),
                    },
                    None,
                );
            }
            self.known_ids.insert(story.id().to_string());

            if story.is_snippet() {
                let key = story.id()[SNIPPET_PREFIX.len()..].to_string();
                let root = story.root();
                story.choice_mut(root).set_button_text("Continue");
                self.snippets.insert(key, story);
            } else {
                self.index
                    .insert(story.id().to_string(), self.stories.len());
                self.stories.push(story);
            }
        }
    }

    /// Look up a story by id, case-insensitively.
    pub fn story(&self, id: &str) -> Option<&Story> {
        self.index
            .get(&id.trim().to_lowercase())
            .map(|index| &self.stories[*index])
    }

    /// All playable stories in load order.
    pub fn stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.iter()
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Cross-story validation, run once after the whole batch is loaded.
    ///
    /// Resolves forward references (jump targets, call bindings and their
    /// hooks, memory/groundhog/story-flag names against what the batch
    /// writes), strips page breaks that turned out to sit between two
    /// textless choices, and reports everything dangling. Diagnostic only:
    /// content is never removed or disabled.
    pub fn validate(&mut self, registry: &CallRegistry, logger: &mut Logger) {
        self.collect_known_names();
        self.strip_redundant_page_breaks(logger);

        for story in &self.stories {
            for id in story.choice_ids() {
                let choice = story.choice(id);

                for effect in &choice.effects {
                    self.validate_effect(effect, story, registry, logger);
                }
                for req in &choice.requirements {
                    self.validate_requirement(req, story, registry, logger);
                }
            }
        }
    }

    /// Scan every effect for the names it writes; requirements validate
    /// against these sets.
    fn collect_known_names(&mut self) {
        let mut memories = HashSet::new();
        let mut groundhogs = HashSet::new();
        let mut story_flags = HashSet::new();

        for story in &mut self.stories {
            let mut vars = Vec::new();

            for id in story.choice_ids() {
                for effect in &story.choice(id).effects {
                    collect_writes(effect, &mut memories, &mut groundhogs, &mut story_flags, &mut vars);
                }
            }

            story.declared_vars = vars;
        }

        self.known_memories = memories;
        self.known_groundhogs = groundhogs;
        self.known_story_flags = story_flags;
    }

    /// A jump from a textless continuation into a textless choice kept a
    /// page break that turned out to be unnecessary; merge it away. The
    /// target is only known now, so this could not happen while parsing.
    fn strip_redundant_page_breaks(&mut self, logger: &mut Logger) {
        for story in &mut self.stories {
            let mut redundant: Vec<ChoiceId> = Vec::new();

            for id in story.choice_ids() {
                if !story.is_continue(id) || !story.choice(id).text.is_empty() {
                    continue;
                }

                let jumps_to_textless = story.choice(id).jumps().any(|(_, jump)| {
                    story
                        .label_target(&jump.target)
                        .map_or(false, |target| story.choice(target).text.is_empty())
                });

                if jumps_to_textless && !redundant.contains(&id) {
                    redundant.push(id);
                }
            }

            for id in redundant {
                remove_page_break(story, id, logger);
            }
        }
    }

    fn validate_effect(
        &self,
        effect: &Effect,
        story: &Story,
        registry: &CallRegistry,
        logger: &mut Logger,
    ) {
        if let Some(guard) = &effect.guard {
            self.validate_requirement(guard, story, registry, logger);
        }
        if let Some(or_else) = &effect.or_else {
            self.validate_effect(or_else, story, registry, logger);
        }

        let context = ValidationContext {
            story_id: story.id(),
        };

        match &effect.kind {
            EffectKind::Jump(jump) => {
                if story.label_target(&jump.target).is_none() {
                    logger.warn(
                        Warning::DanglingJump {
                            story: story.id().to_string(),
                            target: jump.target.clone(),
                        },
                        None,
                    );
                }
            }
            EffectKind::Call(call) => {
                call.validate(registry, &context, logger);
            }
            EffectKind::Memory { op, .. }
            | EffectKind::Var { op, .. }
            | EffectKind::Groundhog { op, .. } => {
                if let WriteOp::Assign(AssignValue::Call(call)) = op {
                    call.validate(registry, &context, logger);
                }
            }
            _ => {}
        }
    }

    fn validate_requirement(
        &self,
        req: &Requirement,
        story: &Story,
        registry: &CallRegistry,
        logger: &mut Logger,
    ) {
        match &req.kind {
            RequirementKind::All(subs) | RequirementKind::Any(subs) => {
                for sub in subs {
                    self.validate_requirement(sub, story, registry, logger);
                }
            }

            RequirementKind::Memory { key, .. } => {
                if !self.known_memories.contains(key) {
                    logger.warn(
                        Warning::UnknownMemory {
                            story: story.id().to_string(),
                            key: key.clone(),
                        },
                        None,
                    );
                }
            }

            RequirementKind::Groundhog { key, .. } => {
                if !self.known_groundhogs.contains(key) {
                    logger.warn(
                        Warning::UnknownGroundhog {
                            story: story.id().to_string(),
                            key: key.clone(),
                        },
                        None,
                    );
                }
            }

            RequirementKind::Var { key, .. } => {
                if !story.declared_vars.contains(key) {
                    logger.warn(
                        Warning::UnknownVar {
                            story: story.id().to_string(),
                            key: key.clone(),
                        },
                        None,
                    );
                }
            }

            RequirementKind::StoryDone { id, .. } => {
                if !self.index.contains_key(id) && !self.known_story_flags.contains(id) {
                    logger.warn(
                        Warning::UnknownStoryFlag {
                            story: story.id().to_string(),
                            id: id.clone(),
                        },
                        None,
                    );
                }
            }

            RequirementKind::Call { call, cmp, operand } => {
                let context = ValidationContext {
                    story_id: story.id(),
                };
                call.validate(registry, &context, logger);

                if let Some(ret) = registry.return_kind(&call.name, &call.args) {
                    match operand {
                        CallOperand::Call(other) => {
                            other.validate(registry, &context, logger);

                            let other_ret = registry.return_kind(&other.name, &other.args);
                            if other_ret.is_some() && other_ret != Some(ret) {
                                logger.warn(
                                    Warning::CallReturnMismatch {
                                        name: call.name.clone(),
                                    },
                                    None,
                                );
                            }
                        }
                        CallOperand::Literal(value) => {
                            if value.kind() != ret {
                                logger.warn(
                                    Warning::CallReturnMismatch {
                                        name: call.name.clone(),
                                    },
                                    None,
                                );
                            }
                        }
                    }

                    if matches!(cmp, Compare::LessThan | Compare::GreaterThan)
                        && ret != ValueKind::Int
                    {
                        logger.warn(
                            Warning::CallReturnMismatch {
                                name: call.name.clone(),
                            },
                            None,
                        );
                    }
                }
            }

            _ => {}
        }
    }
}

/// Record the names an effect (and its else-chain) writes.
fn collect_writes(
    effect: &Effect,
    memories: &mut HashSet<String>,
    groundhogs: &mut HashSet<String>,
    story_flags: &mut HashSet<String>,
    vars: &mut Vec<String>,
) {
    match &effect.kind {
        EffectKind::Memory { key, .. } => {
            memories.insert(key.clone());
        }
        EffectKind::Groundhog { key, .. } => {
            groundhogs.insert(key.clone());
        }
        EffectKind::StoryFlag { id, .. } => {
            story_flags.insert(id.clone());
        }
        EffectKind::Var { key, .. } => {
            if !vars.contains(key) {
                vars.push(key.clone());
            }
        }
        _ => {}
    }

    if let Some(or_else) = &effect.or_else {
        collect_writes(or_else, memories, groundhogs, story_flags, vars);
    }
}

/// Merge a redundant continuation page into its parent.
fn remove_page_break(story: &mut Story, child: ChoiceId, logger: &mut Logger) {
    let parent = match story.choice(child).parent {
        Some(parent) => parent,
        None => return,
    };

    if story.choice(parent).children.len() != 1 {
        return;
    }

    let requirements = std::mem::replace(&mut story.choice_mut(child).requirements, Vec::new());
    let effects = std::mem::replace(&mut story.choice_mut(child).effects, Vec::new());
    let text = std::mem::replace(&mut story.choice_mut(child).text, String::new());
    let grandchildren = std::mem::replace(&mut story.choice_mut(child).children, Vec::new());
    let label = story.choice_mut(child).label.take();
    story.choice_mut(child).button_text = None;

    {
        let parent_choice = story.choice_mut(parent);
        parent_choice.requirements.extend(requirements);
        parent_choice.effects.extend(effects);
        parent_choice.text.push_str(&text);
        parent_choice.children = grandchildren.clone();
    }

    for grandchild in grandchildren {
        story.choice_mut(grandchild).parent = Some(parent);
    }

    if let Some(label) = label {
        if story.label_target(&label) == Some(child) {
            logger.warn(
                Warning::RemovedLabel {
                    label: label.clone(),
                    story: story.id().to_string(),
                },
                None,
            );
            story.remove_label(&label);
        }
    }
}
