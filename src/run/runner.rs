use crate::{
    call::CallRegistry,
    consts::{JUMP_CHAIN_LIMIT, SNIPPET_PREFIX},
    error::RunError,
    log::{Logger, Warning},
    memory::{MemoryStore, ValueMap},
    run::{eval_requirement, execute_effect, EvalContext, ExecContext, Scene},
    story::{ChoiceId, Jump, RepeatUnit, RequirementKind, Story},
    text::{filter_text, Pronouns},
};

/// The interpreter: executes choices against the memory store and call
/// registry, one explicit context instead of global state.
///
/// A `Runner` borrows the host's store for its lifetime; create one per
/// logical playthrough. Execution is fully synchronous and never fails:
/// malformed content degrades with diagnostics in [`logger`][Self::logger].
///
/// # Examples
/// ```
/// use fabula::{read_stories_from_string, CallRegistry, Logger, MemoryStore, Runner};
///
/// let content = "\
/// ===morning===
/// The kettle whistles.
/// * Pour the tea
///     ~set mem_had_tea
///     Steam curls up from the cup.
/// * Ignore it
/// ";
///
/// let mut logger = Logger::default();
/// let registry = CallRegistry::new();
/// let stories = read_stories_from_string(content, &registry, &mut logger).unwrap();
/// let story = &stories[0];
///
/// let mut store = MemoryStore::new();
/// let mut runner = Runner::new(&registry, &mut store);
///
/// let mut scene = runner.start(story);
/// assert_eq!(scene.text, "The kettle whistles.");
///
/// let choices = runner.visible_choices(story, &scene);
/// runner.choose(story, &mut scene, choices[0]);
///
/// assert_eq!(scene.text, "Steam curls up from the cup.");
/// assert!(runner.store.memories.has("had_tea"));
/// ```
pub struct Runner<'a> {
    pub registry: &'a CallRegistry,
    pub store: &'a mut MemoryStore,
    /// Pronoun branch rendered by `[they|she|he]` tags.
    pub pronouns: Pronouns,
    /// Diagnostics collected while running.
    pub logger: Logger,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a CallRegistry, store: &'a mut MemoryStore) -> Self {
        Runner {
            registry,
            store,
            pronouns: Pronouns::default(),
            logger: Logger::default(),
        }
    }

    /// Whether the story could start right now.
    ///
    /// A story that has already executed needs a `repeat` requirement whose
    /// waiting period has passed; beyond that, every entry requirement must
    /// hold against the current state.
    pub fn can_execute(&mut self, story: &Story) -> bool {
        if self.store.has_story(story.id()) {
            let passed = match story.repeat_requirement() {
                Some(req) => self.repeat_passed(story, req.find_kind(&|kind| {
                    matches!(kind, RequirementKind::Repeat { .. })
                })),
                None => false,
            };

            if !passed {
                return false;
            }
        }

        let vars = ValueMap::new();
        let entry = story.root();

        let requirements = &story.choice(entry).requirements;
        let ctx = EvalContext {
            registry: self.registry,
            store: &*self.store,
            story,
            vars: &vars,
            position: None,
            subject: Some(entry),
        };

        let mut allowed = true;
        for req in requirements {
            if !eval_requirement(req, &ctx, &mut self.logger, false) {
                allowed = false;
                break;
            }
        }

        allowed
    }

    fn repeat_passed(
        &self,
        story: &Story,
        repeat: Option<&crate::story::Requirement>,
    ) -> bool {
        let (unit, count) = match repeat.map(|req| &req.kind) {
            Some(RequirementKind::Repeat { unit, count }) => (*unit, *count),
            _ => return false,
        };

        let last = match self.store.story_month(story.id()) {
            Some(month) if month >= 1 => month,
            _ => return true,
        };

        let months_to_wait = count
            * match unit {
                RepeatUnit::Months => 1,
                RepeatUnit::Seasons => 5,
                RepeatUnit::Years => 21,
            };

        (self.store.month - last).max(0) >= months_to_wait
    }

    /// Start the story: create its scene and execute the entry choice.
    pub fn start(&mut self, story: &Story) -> Scene {
        let mut scene = Scene::for_story(story);
        self.execute(story, &mut scene, story.root());
        scene
    }

    /// Execute a choice the player selected, recording the selection.
    pub fn choose(&mut self, story: &Story, scene: &mut Scene, choice: ChoiceId) {
        scene.selected.push(choice);
        self.execute(story, scene, choice);
    }

    /// Execute a choice: run its effects, accumulate its text and resolve
    /// its jumps, leaving the scene parked on the final choice.
    ///
    /// Jump chains are followed iteratively up to a fixed cap; self-jumps
    /// and overflows abort with a logged error rather than recursing
    /// forever.
    pub fn execute(&mut self, story: &Story, scene: &mut Scene, choice: ChoiceId) {
        let mut current = choice;
        let mut incoming: Option<Jump> = None;

        for _ in 0..JUMP_CHAIN_LIMIT {
            if current.index() >= story.len() {
                self.logger.error(
                    Warning::Runtime(RunError::UnknownChoice {
                        story: story.id().to_string(),
                    }),
                    None,
                );
                return;
            }

            scene.current = Some(current);

            // state changes come before the text that describes them
            for index in 0..story.choice(current).effects.len() {
                let effect = &story.choice(current).effects[index];
                if effect.is_jump() {
                    continue;
                }

                let mut ctx = ExecContext {
                    registry: self.registry,
                    store: &mut *self.store,
                    story,
                    scene: &mut *scene,
                };
                execute_effect(effect, &mut ctx, &mut self.logger);
            }

            // a fresh selection starts the page over; jumped-to text appends
            if incoming.is_none() {
                scene.text.clear();
            }

            let skip_text = incoming.as_ref().map_or(false, |jump| jump.skip_text);
            if !skip_text {
                let ctx = EvalContext {
                    registry: self.registry,
                    store: &*self.store,
                    story,
                    vars: &scene.vars,
                    position: scene.current,
                    subject: None,
                };

                let processed = filter_text(
                    &story.choice(current).text,
                    &ctx,
                    self.pronouns,
                    &mut self.logger,
                    false,
                );

                if scene.text.is_empty() {
                    scene.text = processed;
                } else if !processed.is_empty() {
                    scene.text.push_str("\n\n");
                    scene.text.push_str(&processed);
                }
            }

            match self.resolve_jumps(story, scene, current, &incoming) {
                JumpOutcome::None => return,
                JumpOutcome::Abort => return,
                JumpOutcome::Taken(target, jump) => {
                    current = target;
                    incoming = Some(jump);
                }
            }
        }

        self.logger.error(
            Warning::Runtime(RunError::JumpChainOverflow {
                story: story.id().to_string(),
            }),
            None,
        );
    }

    /// Take the first jump whose guard passes; a failed guard falls through
    /// to its else-jump (which ends resolution) or to the next jump.
    fn resolve_jumps(
        &mut self,
        story: &Story,
        scene: &Scene,
        current: ChoiceId,
        incoming: &Option<Jump>,
    ) -> JumpOutcome {
        let choice = story.choice(current);
        let own_label = choice
            .label
            .as_ref()
            .map(|label| label.trim().to_lowercase());

        for (effect, jump) in choice.jumps() {
            if let Some(previous) = incoming {
                let looping = !jump.target.starts_with(SNIPPET_PREFIX)
                    && (jump.target == previous.target
                        || Some(&jump.target) == own_label.as_ref());

                if looping {
                    self.logger.error(
                        Warning::Runtime(RunError::SelfJump {
                            story: story.id().to_string(),
                            target: jump.target.clone(),
                        }),
                        None,
                    );
                    return JumpOutcome::Abort;
                }
            }

            let mut taken = jump;

            if let Some(guard) = &effect.guard {
                let ctx = EvalContext {
                    registry: self.registry,
                    store: &*self.store,
                    story,
                    vars: &scene.vars,
                    position: scene.current,
                    subject: None,
                };

                if !eval_requirement(guard, &ctx, &mut self.logger, true) {
                    match effect.or_else.as_ref().and_then(|or_else| or_else.jump()) {
                        // the else-jump ends resolution whatever its guard
                        Some(else_jump) => taken = else_jump,
                        None => continue,
                    }
                }
            }

            return match story.label_target(&taken.target) {
                Some(target) => JumpOutcome::Taken(target, taken.clone()),
                None => {
                    self.logger.error(
                        Warning::Runtime(RunError::UnknownJumpTarget {
                            story: story.id().to_string(),
                            target: taken.target.clone(),
                        }),
                        None,
                    );
                    JumpOutcome::Abort
                }
            };
        }

        JumpOutcome::None
    }

    /// Whether a choice may be offered at all.
    ///
    /// Fails on a missing button or any failing hard requirement; soft
    /// (`~ifd`) requirements do not hide, only disable.
    pub fn can_show(&mut self, story: &Story, scene: &Scene, choice: ChoiceId) -> bool {
        if story
            .choice(choice)
            .button_text
            .as_ref()
            .map_or(true, |text| text.is_empty())
        {
            return false;
        }

        self.passes_requirements(story, scene, choice, false)
    }

    /// Whether a visible choice is also clickable.
    pub fn can_choose(&mut self, story: &Story, scene: &Scene, choice: ChoiceId) -> bool {
        self.passes_requirements(story, scene, choice, true)
    }

    fn passes_requirements(
        &mut self,
        story: &Story,
        scene: &Scene,
        choice: ChoiceId,
        soft: bool,
    ) -> bool {
        let ctx = EvalContext {
            registry: self.registry,
            store: &*self.store,
            story,
            vars: &scene.vars,
            position: scene.current,
            subject: Some(choice),
        };

        let mut passes = true;
        for req in story
            .choice(choice)
            .requirements
            .iter()
            .filter(|req| req.show_disabled == soft)
        {
            if !eval_requirement(req, &ctx, &mut self.logger, false) {
                passes = false;
                break;
            }
        }

        passes
    }

    /// Children of the current choice that may be offered to the player.
    pub fn visible_choices(&mut self, story: &Story, scene: &Scene) -> Vec<ChoiceId> {
        let current = match scene.current {
            Some(current) => current,
            None => story.root(),
        };

        story
            .choice(current)
            .children
            .clone()
            .into_iter()
            .filter(|child| self.can_show(story, scene, *child))
            .collect()
    }

    /// A choice's button text, processed through the templating engine.
    pub fn button_text(&mut self, story: &Story, scene: &Scene, choice: ChoiceId) -> String {
        let raw = match &story.choice(choice).button_text {
            Some(text) => text.clone(),
            None => return String::new(),
        };

        let ctx = EvalContext {
            registry: self.registry,
            store: &*self.store,
            story,
            vars: &scene.vars,
            position: scene.current,
            subject: None,
        };

        filter_text(&raw, &ctx, self.pronouns, &mut self.logger, true)
    }

    /// Record in the ledger that the story finished executing this month.
    ///
    /// Call when the playthrough of one story completes; `first` checks and
    /// the repeat gate read this record.
    pub fn mark_executed(&mut self, story: &Story) {
        self.store.set_story(story.id(), true);
    }
}

enum JumpOutcome {
    /// No jump found; the current choice is the new position.
    None,
    /// A jump was taken to the given choice.
    Taken(ChoiceId, Jump),
    /// Resolution failed; execution stops where it is.
    Abort,
}
