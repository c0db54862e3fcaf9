//! Effect execution against the memory store and scene.

use crate::{
    call::CallRegistry,
    log::{Logger, Warning},
    memory::MemoryStore,
    run::{eval_requirement, CardGrant, EvalContext, Scene, StatusChange},
    story::{AssignValue, Effect, EffectKind, Story, WriteOp},
};

/// Mutable state one effect executes against.
pub(crate) struct ExecContext<'a> {
    pub registry: &'a CallRegistry,
    pub store: &'a mut MemoryStore,
    pub story: &'a Story,
    pub scene: &'a mut Scene,
}

impl<'a> ExecContext<'a> {
    fn eval_ctx(&self) -> EvalContext {
        EvalContext {
            registry: self.registry,
            store: self.store,
            story: self.story,
            vars: &self.scene.vars,
            position: self.scene.current,
            subject: None,
        }
    }
}

/// Execute one non-jump effect.
///
/// A guarded effect evaluates its condition first and runs the else-effect
/// on failure. Jumps are resolved by the runner, never here.
pub(crate) fn execute_effect(effect: &Effect, ctx: &mut ExecContext, logger: &mut Logger) {
    if let Some(guard) = &effect.guard {
        if !eval_requirement(guard, &ctx.eval_ctx(), logger, true) {
            if let Some(or_else) = &effect.or_else {
                execute_effect(or_else, ctx, logger);
            }
            return;
        }
    }

    match &effect.kind {
        EffectKind::Memory { key, op } => match op {
            WriteOp::Assign(value) => {
                let value = resolve(value, ctx, logger);
                ctx.store.memories.set(key, &value);
            }
            WriteOp::Add(amount) => ctx.store.memories.increment(key, *amount),
        },

        EffectKind::Var { key, op } => match op {
            WriteOp::Assign(value) => {
                let value = resolve(value, ctx, logger);
                ctx.scene.vars.set(key, &value);
            }
            WriteOp::Add(amount) => ctx.scene.vars.increment(key, *amount),
        },

        EffectKind::Groundhog { key, op } => match op {
            WriteOp::Assign(value) => {
                let value = resolve(value, ctx, logger);
                ctx.store.groundhogs.set(key, &value);
            }
            WriteOp::Add(amount) => ctx.store.groundhogs.increment(key, *amount),
        },

        EffectKind::StoryFlag { id, value } => ctx.store.set_story(id, *value),

        EffectKind::Call(call) => {
            call.invoke(ctx.registry, logger);
        }

        EffectKind::Jump(..) => {
            // jumps belong to the runner's resolution pass
            logger.error(
                Warning::InvalidEffect {
                    line: effect.source.clone(),
                },
                None,
            );
        }

        EffectKind::Background(value) => {
            let value = resolve(value, ctx, logger);

            if ctx.scene.background.as_ref().map_or(false, |bg| !bg.is_empty()) {
                // changing backgrounds dismisses whoever was on screen
                ctx.scene.clear_portraits();
            }
            ctx.scene.background = Some(value);
        }

        EffectKind::Portrait { slot, image } => match slot {
            None => ctx.scene.clear_portraits(),
            Some(slot) => {
                let image = resolve(image, ctx, logger);
                if image.is_empty() {
                    ctx.scene.portraits.remove(slot);
                } else {
                    ctx.scene.portraits.insert(*slot, image);
                }
            }
        },

        EffectKind::Speaker(value) => {
            let value = resolve(value, ctx, logger);
            ctx.scene.speaker = if value.is_empty() { None } else { Some(value) };
        }

        EffectKind::Sprite(value) => {
            let value = resolve(value, ctx, logger);
            ctx.scene.sprite = if value.is_empty() { None } else { Some(value) };
        }

        EffectKind::Card { id, hidden } => ctx.scene.cards.push(CardGrant {
            id: id.clone(),
            hidden: *hidden,
        }),

        EffectKind::Vfx { id } => {
            ctx.scene.vfx = if id == "none" { None } else { Some(id.clone()) };
        }

        EffectKind::Status { id, remove } => ctx.scene.status_changes.push(StatusChange {
            id: id.clone(),
            remove: *remove,
        }),
    }
}

/// Resolve an assigned value at execution time.
fn resolve(value: &AssignValue, ctx: &ExecContext, logger: &mut Logger) -> String {
    match value {
        AssignValue::Literal(text) => text.clone(),
        AssignValue::MemoryRef(key) => ctx.store.memories.get(key).unwrap_or("").to_string(),
        AssignValue::GroundhogRef(key) => ctx.store.groundhogs.get(key).unwrap_or("").to_string(),
        AssignValue::VarRef(key) => ctx.scene.vars.get(key).unwrap_or("").to_string(),
        AssignValue::Call(call) => call
            .invoke(ctx.registry, logger)
            .map(|result| result.to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{call::ValueKind, parse::parse_effect, call::Value};

    struct Fixture {
        registry: CallRegistry,
        store: MemoryStore,
        story: Story,
        scene: Scene,
        logger: Logger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut story = Story::new();
            story.set_id("exectest");
            let scene = Scene::for_story(&story);

            Fixture {
                registry: CallRegistry::new(),
                store: MemoryStore::new(),
                story,
                scene,
                logger: Logger::default(),
            }
        }

        fn run(&mut self, line: &str) {
            let effect = parse_effect(line, &[], &self.registry, &mut self.logger)
                .expect("effect should parse");

            let mut ctx = ExecContext {
                registry: &self.registry,
                store: &mut self.store,
                story: &self.story,
                scene: &mut self.scene,
            };

            execute_effect(&effect, &mut ctx, &mut self.logger);
        }

        fn run_conditional(&mut self, line: &str) {
            let effect = crate::parse::parse_conditional_effect(
                line,
                "exectest",
                &[],
                &self.registry,
                &mut self.logger,
            )
            .expect("effect should parse");

            let mut ctx = ExecContext {
                registry: &self.registry,
                store: &mut self.store,
                story: &self.story,
                scene: &mut self.scene,
            };

            execute_effect(&effect, &mut ctx, &mut self.logger);
        }
    }

    #[test]
    fn increments_start_from_zero() {
        let mut fixture = Fixture::new();

        fixture.run("~set mem_love_mom++");
        assert_eq!(fixture.store.memories.get_int("love_mom"), 1);

        fixture.run("~set mem_love_mom++");
        assert_eq!(fixture.store.memories.get_int("love_mom"), 2);
    }

    #[test]
    fn vars_are_scoped_to_the_scene() {
        let mut fixture = Fixture::new();

        fixture.run("~set var_mood = curious");

        assert_eq!(fixture.scene.vars.get("mood"), Some("curious"));
        assert!(!fixture.store.memories.has("mood"));
    }

    #[test]
    fn indirect_values_copy_between_stores() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("temporary", "kept");

        fixture.run("~set hog_permanent = mem_temporary");

        assert_eq!(fixture.store.groundhogs.get("permanent"), Some("kept"));
    }

    #[test]
    fn call_valued_writes_resolve_each_execution() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .register("mostlove", &[], ValueKind::Text, |_| {
                Some(Value::from("anemone"))
            });

        fixture.run("~set var_bff = call_mostlove()");

        assert_eq!(fixture.scene.vars.get("bff"), Some("anemone"));
    }

    #[test]
    fn guard_failure_runs_the_else_effect() {
        let mut fixture = Fixture::new();

        fixture.run_conditional("~setif mem_missing ? var_mood = good : var_mood = bad");

        assert_eq!(fixture.scene.vars.get("mood"), Some("bad"));
    }

    #[test]
    fn guard_success_skips_the_else_effect() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("present", "true");

        fixture.run_conditional("~setif mem_present ? var_mood = good : var_mood = bad");

        assert_eq!(fixture.scene.vars.get("mood"), Some("good"));
    }

    #[test]
    fn background_changes_clear_portraits() {
        let mut fixture = Fixture::new();

        fixture.run("~set left = marz");
        assert_eq!(fixture.scene.portraits.len(), 1);

        fixture.run("~set bg = garden");
        assert_eq!(fixture.scene.background.as_deref(), Some("garden"));
        assert_eq!(fixture.scene.portraits.len(), 1);

        // the second change finds a background already set and clears
        let effect = parse_effect("~set bg = lab", &[], &fixture.registry, &mut fixture.logger)
            .unwrap();
        let mut ctx = ExecContext {
            registry: &fixture.registry,
            store: &mut fixture.store,
            story: &fixture.story,
            scene: &mut fixture.scene,
        };
        execute_effect(&effect, &mut ctx, &mut fixture.logger);

        assert!(fixture.scene.portraits.is_empty());
    }

    #[test]
    fn story_flags_write_the_ledger() {
        let mut fixture = Fixture::new();
        fixture.store.month = 7;

        fixture.run("~set story_marker");
        assert_eq!(fixture.store.story_month("marker"), Some(7));

        fixture.run("~set story_marker = false");
        assert!(!fixture.store.has_story("marker"));
    }

    #[test]
    fn unknown_calls_are_skipped_with_a_log() {
        let mut fixture = Fixture::new();

        fixture.run("~call hascard(sword)");

        assert!(!fixture.logger.is_empty());
    }
}
