//! Requirement evaluation against the current game state.
//!
//! Evaluation is side-effect free with respect to the memory store: a
//! visibility check may invoke calls (whose host side effects are the
//! host's business) but never writes engine state. Every failure mode
//! degrades to `false` with a logged diagnostic.

use crate::{
    calendar,
    call::{CallRegistry, Value},
    log::{Logger, Warning},
    memory::{MemoryStore, ValueMap},
    story::{
        CallOperand, ChoiceId, Compare, Requirement, RequirementKind, SeasonTarget, Story,
    },
    text::{pick_weighted, random_chance, random_seed},
};

/// Everything requirement evaluation and text filtering read from.
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    pub registry: &'a CallRegistry,
    pub store: &'a MemoryStore,
    pub story: &'a Story,
    pub vars: &'a ValueMap,
    /// Choice execution is currently halted on, whose children are being
    /// offered; random selection weighs its siblings through this.
    pub position: Option<ChoiceId>,
    /// Choice whose own requirement is being evaluated, if any.
    pub subject: Option<ChoiceId>,
}

impl<'a> EvalContext<'a> {
    /// The same context pointed at a different subject choice.
    pub(crate) fn for_subject(&self, subject: ChoiceId) -> EvalContext<'a> {
        EvalContext {
            subject: Some(subject),
            ..*self
        }
    }
}

/// Evaluate a requirement.
///
/// `as_guard` marks evaluation from a conditional effect or jump, where
/// `random` leaves roll an independent weighted coin instead of taking
/// part in sibling selection.
pub(crate) fn eval_requirement(
    req: &Requirement,
    ctx: &EvalContext,
    logger: &mut Logger,
    as_guard: bool,
) -> bool {
    match &req.kind {
        RequirementKind::All(subs) => subs
            .iter()
            .all(|sub| eval_requirement(sub, ctx, logger, false)),

        RequirementKind::Any(subs) => subs
            .iter()
            .any(|sub| eval_requirement(sub, ctx, logger, false)),

        RequirementKind::Memory { key, cmp, value } => {
            compare_map(&ctx.store.memories, key, *cmp, value)
        }

        RequirementKind::Var { key, cmp, value } => compare_map(ctx.vars, key, *cmp, value),

        RequirementKind::Groundhog { key, cmp, value } => {
            compare_map(&ctx.store.groundhogs, key, *cmp, value)
        }

        RequirementKind::StoryDone { id, cmp, months } => {
            if *cmp == Compare::LessThan && *months > 0 && !ctx.store.has_story(id) {
                // `story_x < 5` asks for "happened within 5 months", which
                // a story that never happened cannot satisfy
                return false;
            }

            compare_int(ctx.store.months_since_story(id), *cmp, *months)
        }

        // the waiting period gates story selection, not requirement checks
        RequirementKind::Repeat { .. } => true,

        RequirementKind::Call { call, cmp, operand } => {
            let value = match call.invoke(ctx.registry, logger) {
                Some(value) => value,
                None => return false,
            };

            let operand = match operand {
                CallOperand::Literal(literal) => literal.clone(),
                CallOperand::Call(other) => match other.invoke(ctx.registry, logger) {
                    Some(value) => value,
                    None => return false,
                },
            };

            match cmp {
                Compare::GreaterThan => value.as_int() > operand.as_int(),
                Compare::LessThan => value.as_int() < operand.as_int(),
                Compare::NotEqual => value.to_string() != operand.to_string(),
                Compare::Equal => value.to_string() == operand.to_string(),
            }
        }

        RequirementKind::Random { weight, .. } => {
            eval_random(*weight, ctx, logger, as_guard)
        }

        RequirementKind::Age { cmp, value } => {
            compare_int(calendar::age_at(ctx.store.month), *cmp, *value)
        }

        RequirementKind::Month { cmp, value } => compare_int(ctx.store.month, *cmp, *value),

        RequirementKind::Season { cmp, target } => match target {
            SeasonTarget::Name(name) => {
                let matches = calendar::season_at(ctx.store.month) == name;
                if *cmp == Compare::NotEqual {
                    !matches
                } else {
                    matches
                }
            }
            SeasonTarget::MonthOfYear(month) => {
                compare_int(calendar::month_of_year_at(ctx.store.month), *cmp, *month)
            }
        },

        RequirementKind::Biome { id, cmp } => {
            let current = ctx.store.memories.get("biome").unwrap_or("");
            let matches = current.eq_ignore_ascii_case(id);
            if *cmp == Compare::NotEqual {
                !matches
            } else {
                matches
            }
        }

        RequirementKind::Status { id, cmp } => {
            let has = ctx.store.memories.has(&format!("status_{}", id));
            if *cmp == Compare::NotEqual {
                !has
            } else {
                has
            }
        }
    }
}

/// Weighted random selection among sibling choices.
///
/// All random-gated siblings of the subject are collected (skipping any
/// whose other requirements fail), one is picked with the month-stable
/// seed, and the requirement passes only on the subject's own choice. With
/// fewer than two candidates the coin toss is won by default.
fn eval_random(weight: i32, ctx: &EvalContext, logger: &mut Logger, as_guard: bool) -> bool {
    let seed = random_seed(ctx.story.id(), ctx.store.month, false);

    if as_guard {
        // `~setif random = 3 ? ...`: true 3 times in 4
        return random_chance(weight, weight + 1, &seed);
    }

    let (position, subject) = match (ctx.position, ctx.subject) {
        (Some(position), Some(subject)) => (position, subject),
        _ => {
            // nothing to select between; accept rather than fail
            logger.warn(
                Warning::InvalidTemplateTag {
                    tag: "random".to_string(),
                },
                None,
            );
            return true;
        }
    };

    let mut candidates = Vec::new();
    let mut weights = Vec::new();

    for sibling in &ctx.story.choice(position).children {
        let choice = ctx.story.choice(*sibling);

        if choice.button_text.as_ref().map_or(true, |text| text.trim().is_empty()) {
            continue;
        }

        let mut sibling_weight = None;
        let mut eligible = true;

        for req in &choice.requirements {
            if let RequirementKind::Random { weight, .. } = &req.kind {
                sibling_weight = Some(*weight);
                continue;
            }

            if req.has_nested_random() {
                // random under and/or cannot take part in selection
                eligible = false;
                break;
            }

            if !eval_requirement(req, &ctx.for_subject(*sibling), logger, false) {
                eligible = false;
                break;
            }
        }

        if !eligible {
            continue;
        }

        if let Some(weight) = sibling_weight {
            candidates.push(*sibling);
            weights.push(weight as f32);
        }
    }

    if candidates.len() < 2 {
        return true;
    }

    pick_weighted(&candidates, &weights, &seed) == Some(&subject)
}

/// Comparison against a key-value map.
///
/// Greater/less coerce the stored value to an integer; equality against a
/// bool is a has-key check (unset reads as false), against text a
/// case-insensitive match, and against an int a numeric match.
fn compare_map(map: &ValueMap, key: &str, cmp: Compare, value: &Value) -> bool {
    match cmp {
        Compare::GreaterThan => map.get_int(key) > value.as_int(),
        Compare::LessThan => map.get_int(key) < value.as_int(),
        Compare::Equal | Compare::NotEqual => {
            let matches = match value {
                Value::Int(int_value) => map.get_int(key) == *int_value,
                Value::Bool(bool_value) => map.has(key) == *bool_value,
                Value::Text(text) => map
                    .get(key)
                    .map_or(false, |stored| stored.eq_ignore_ascii_case(text)),
            };

            if cmp == Compare::NotEqual {
                !matches
            } else {
                matches
            }
        }
    }
}

fn compare_int(value: i32, cmp: Compare, target: i32) -> bool {
    match cmp {
        Compare::GreaterThan => value > target,
        Compare::LessThan => value < target,
        Compare::NotEqual => value != target,
        Compare::Equal => value == target,
    }
}
