//! Parser for mutation, call and conditional statements.
//!
//! `~set` lines are tokenized into a target namespace, a write operator and
//! a value; `~call` lines into a name and coerced argument list. The
//! conditional forms `~setif`/`~callif` re-parse their effect portion as an
//! ordinary statement and attach the condition and optional else-effect.

use crate::{
    call::{parse_bool_int_string, CallRef, CallRegistry},
    log::{Logger, Warning},
    parse::{parse_requirement, split_any},
    story::{AssignValue, Effect, EffectKind, PortraitSlot, WriteOp},
};

/// Values that clear a presentation field instead of setting it.
fn is_clear_token(token: &str) -> bool {
    matches!(token, "null" | "false" | "blank" | "clear" | "none" | "broken")
}

/// Parse a `~set ...` or `~call ...` line into an effect.
///
/// `prior` is the list of effects already attached to the current choice,
/// consulted for the one-background-per-choice rule.
pub(crate) fn parse_effect(
    line: &str,
    prior: &[Effect],
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<Effect> {
    let line = line.trim();

    if line.starts_with("~call") {
        let call = parse_call_text(line, registry, logger)?;
        return Some(Effect::new(EffectKind::Call(call), line.to_string()));
    }

    let (left, op, right, right_full) = match split_statement(line) {
        Some(parts) => parts,
        None => {
            // bare write: `~set mem_x` reads as `~set mem_x = true`
            match split_statement(&format!("{} = true", line)) {
                Some(parts) => parts,
                None => {
                    logger.warn(
                        Warning::InvalidEffect {
                            line: line.to_string(),
                        },
                        None,
                    );
                    return None;
                }
            }
        }
    };

    let mut left = left.to_lowercase();
    let mut op = op;
    let mut right = right.to_lowercase();
    let mut right_full = right_full;

    // `~set !mem_x` reads as `~set mem_x = false`
    if left.starts_with('!') {
        if op != "=" || right != "true" {
            logger.warn(
                Warning::InvalidEffect {
                    line: line.to_string(),
                },
                None,
            );
            return None;
        }
        left = left["!".len()..].to_string();
        op = "=".to_string();
        right = "false".to_string();
        right_full = "false".to_string();
    }

    // a `call_` right-hand side supplies the written value at execution time
    let call = if right.starts_with("call_") {
        let text = format!("~call {}", &right_full["call_".len()..]);
        match parse_call_text(&text, registry, logger) {
            Some(call) => Some(call),
            None => {
                logger.warn(
                    Warning::InvalidEffect {
                        line: line.to_string(),
                    },
                    None,
                );
                return None;
            }
        }
    } else {
        None
    };

    let kind = if left == "bg" || left == "image" {
        for effect in prior {
            match effect.kind {
                EffectKind::Background(..) => {
                    logger.warn(
                        Warning::DuplicateBackground {
                            line: line.to_string(),
                        },
                        None,
                    );
                    return None;
                }
                EffectKind::Portrait { .. } => {
                    logger.warn(
                        Warning::BackgroundClearsPortraits {
                            line: line.to_string(),
                        },
                        None,
                    );
                    return None;
                }
                _ => {}
            }
        }

        EffectKind::Background(assign_value(&right, call, is_clear_token(&right)))
    } else if matches!(
        left.as_str(),
        "chara" | "charas" | "left" | "midleft" | "midright" | "right"
    ) {
        let slot = match left.as_str() {
            "left" => Some(PortraitSlot::Left),
            "midleft" => Some(PortraitSlot::MidLeft),
            "midright" => Some(PortraitSlot::MidRight),
            "right" => Some(PortraitSlot::Right),
            _ => None,
        };

        if slot.is_none() && !is_clear_token(&right) {
            // `~set charas` only clears; single slots take sprites
            logger.warn(
                Warning::InvalidEffect {
                    line: line.to_string(),
                },
                None,
            );
            return None;
        }

        EffectKind::Portrait {
            slot,
            image: assign_value(&right, call, is_clear_token(&right)),
        }
    } else if left == "speaker" {
        EffectKind::Speaker(assign_value(&right, call, is_clear_token(&right)))
    } else if left == "sprite" {
        EffectKind::Sprite(assign_value(&right, call, false))
    } else if left == "card" || left == "card_hidden" {
        EffectKind::Card {
            id: right,
            hidden: left == "card_hidden",
        }
    } else if let Some(key) = strip_key(&left, "mem_") {
        let mut op = parse_write_op(&op, &right, line, logger)?;

        // free-text memory values keep the author's casing
        if let WriteOp::Assign(AssignValue::Literal(value)) = &op {
            if !value.is_empty() && value != "true" && value != "false" {
                op = WriteOp::Assign(AssignValue::Literal(right_full.clone()));
            }
        }
        if let Some(call) = call {
            op = WriteOp::Assign(AssignValue::Call(call));
        } else if let WriteOp::Assign(AssignValue::Literal(value)) = &op {
            op = resolve_indirect(value).map(WriteOp::Assign).unwrap_or(op);
        }

        EffectKind::Memory { key, op }
    } else if let Some(key) = strip_key(&left, "var_") {
        let op = keyed_write_op(&op, &right, call, line, logger)?;
        EffectKind::Var { key, op }
    } else if let Some(key) = strip_key(&left, "hog_") {
        let op = keyed_write_op(&op, &right, call, line, logger)?;
        EffectKind::Groundhog { key, op }
    } else if let Some(id) = strip_key(&left, "story_") {
        let value = match right.parse::<bool>() {
            Ok(value) => value,
            Err(_) => {
                logger.warn(
                    Warning::InvalidEffect {
                        line: line.to_string(),
                    },
                    None,
                );
                return None;
            }
        };
        EffectKind::StoryFlag { id, value }
    } else if left == "next" {
        // chained next-story markers were retired from the language
        logger.warn(
            Warning::InvalidEffect {
                line: line.to_string(),
            },
            None,
        );
        return None;
    } else if left == "effect" {
        let id = if right == "null" { "none".to_string() } else { right };
        EffectKind::Vfx { id }
    } else if left == "status" {
        let mut id = right;
        let mut remove = false;

        if let Some(stripped) = id.strip_prefix("remove_") {
            id = stripped.to_string();
            remove = true;
        } else if let Some(stripped) = id.strip_suffix("_remove") {
            id = stripped.to_string();
            remove = true;
        }

        EffectKind::Status { id, remove }
    } else if left.starts_with("skill_") || left.starts_with("love_") {
        // host-domain stat writes are out of engine scope
        logger.warn(
            Warning::UnknownNamespace {
                line: line.to_string(),
            },
            None,
        );
        return None;
    } else {
        logger.warn(
            Warning::InvalidEffect {
                line: line.to_string(),
            },
            None,
        );
        return None;
    };

    Some(Effect::new(kind, line.to_string()))
}

/// Parse `~setif cond ? effect [: elseEffect]` or the `~callif` form.
pub(crate) fn parse_conditional_effect(
    line: &str,
    story_id: &str,
    prior: &[Effect],
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<Effect> {
    let line = line.trim();
    let parts = split_any(line, &["?", ":"]);

    if parts.len() < 2 || parts.len() > 3 {
        logger.warn(
            Warning::InvalidEffect {
                line: line.to_string(),
            },
            None,
        );
        return None;
    }

    let is_call = line.starts_with("~callif");
    let prefix = if is_call { "~call " } else { "~set " };

    let effect_line = format!("{}{}", prefix, parts[1].trim());
    let mut effect = parse_effect(&effect_line, prior, registry, logger)?;

    let condition = parts[0]
        .trim_start_matches("~setif")
        .trim_start_matches("~callif")
        .trim();
    let requirement = parse_requirement(
        &format!("~if {}", condition),
        story_id,
        registry,
        logger,
    )?;
    effect.guard = Some(requirement);

    if parts.len() == 3 {
        let else_line = format!("{}{}", prefix, parts[2].trim());
        let else_effect = parse_effect(&else_line, prior, registry, logger)?;
        effect.or_else = Some(Box::new(else_effect));
    }

    effect.source = line.to_string();
    Some(effect)
}

/// Parse `~call name` / `~call name(arg1, arg2)` into a bound call site.
///
/// Arguments are coerced bool → int → lowercased string. Binding against
/// the registry is best-effort: an unmatched call is logged and kept, and
/// evaluates to its context default at runtime.
pub(crate) fn parse_call_text(
    line: &str,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<CallRef> {
    let rest = line.trim().strip_prefix("~call")?.trim();

    let name: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if name.is_empty() {
        logger.warn(
            Warning::InvalidCall {
                line: line.to_string(),
            },
            None,
        );
        return None;
    }

    let mut args = Vec::new();
    let after_name = rest[name.len()..].trim_start();

    if after_name.starts_with('(') {
        let close = match after_name.rfind(')') {
            Some(close) => close,
            None => {
                logger.warn(
                    Warning::InvalidCall {
                        line: line.to_string(),
                    },
                    None,
                );
                return None;
            }
        };

        let inner = after_name[1..close].trim();
        if !inner.is_empty() {
            for token in inner.split(',') {
                args.push(parse_bool_int_string(token));
            }
        }
    }

    let mut call = CallRef::new(name.to_lowercase(), args, line.trim().to_string());
    call.bind(registry, logger);

    Some(call)
}

/// Split a `~set` line into left target, operator, right token and the
/// full right-hand text (original casing, everything after the last `=`).
fn split_statement(line: &str) -> Option<(String, String, String, String)> {
    let rest = line.trim().strip_prefix("~set")?.trim();
    let chars: Vec<char> = rest.chars().collect();
    let mut position = 0;

    let mut left = String::new();

    if chars.get(position) == Some(&'!') {
        left.push('!');
        position += 1;
    }

    let ident_start = position;
    while position < chars.len() && (chars[position].is_alphanumeric() || chars[position] == '_') {
        left.push(chars[position]);
        position += 1;
    }
    if position == ident_start {
        return None;
    }

    while position < chars.len() && chars[position].is_whitespace() {
        position += 1;
    }

    let mut op = String::new();
    while position < chars.len() && matches!(chars[position], '=' | '+' | '-') {
        op.push(chars[position]);
        position += 1;
    }
    if op.is_empty() {
        return None;
    }

    while position < chars.len() && chars[position].is_whitespace() {
        position += 1;
    }

    let mut right = String::new();
    while position < chars.len()
        && (chars[position].is_alphanumeric() || chars[position] == '_' || chars[position] == '.')
    {
        right.push(chars[position]);
        position += 1;
    }

    if right.is_empty() {
        // `x++` and `x--` tokenize as operator `+`/`-` with itself as value
        if op.len() >= 2 {
            right.push(op.pop().unwrap());
        } else {
            return None;
        }
    }

    let right_full = match line.rfind('=') {
        Some(index) => line[index + 1..].trim().to_string(),
        None => right.clone(),
    };

    Some((left, op, right, right_full))
}

fn strip_key(left: &str, prefix: &str) -> Option<String> {
    let key = left.strip_prefix(prefix)?.trim().to_string();

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Turn an operator and value token into a write operation.
fn parse_write_op(op: &str, right: &str, line: &str, logger: &mut Logger) -> Option<WriteOp> {
    let result = match op {
        "=" | "==" => Some(WriteOp::Assign(AssignValue::Literal(right.to_string()))),
        "+" if right == "+" => Some(WriteOp::Add(1)),
        "-" if right == "-" => Some(WriteOp::Add(-1)),
        "+" | "+=" => right.parse::<i32>().ok().map(WriteOp::Add),
        "-" | "-=" => right.parse::<i32>().ok().map(|amount| WriteOp::Add(-amount)),
        _ => None,
    };

    if result.is_none() {
        logger.warn(
            Warning::InvalidEffect {
                line: line.to_string(),
            },
            None,
        );
    }

    result
}

/// Write operation for `var_`/`hog_` targets: literal values stay
/// lowercased, calls and indirect references resolve at execution time.
fn keyed_write_op(
    op: &str,
    right: &str,
    call: Option<CallRef>,
    line: &str,
    logger: &mut Logger,
) -> Option<WriteOp> {
    let mut op = parse_write_op(op, right, line, logger)?;

    if let Some(call) = call {
        op = WriteOp::Assign(AssignValue::Call(call));
    } else if let WriteOp::Assign(AssignValue::Literal(value)) = &op {
        op = resolve_indirect(value).map(WriteOp::Assign).unwrap_or(op);
    }

    Some(op)
}

/// A written value prefixed `mem_`/`hog_`/`var_` copies from that store.
fn resolve_indirect(value: &str) -> Option<AssignValue> {
    let lowered = value.to_lowercase();

    if let Some(key) = lowered.strip_prefix("mem_") {
        Some(AssignValue::MemoryRef(key.to_string()))
    } else if let Some(key) = lowered.strip_prefix("hog_") {
        Some(AssignValue::GroundhogRef(key.to_string()))
    } else if let Some(key) = lowered.strip_prefix("var_") {
        Some(AssignValue::VarRef(key.to_string()))
    } else {
        None
    }
}

/// Presentation value: the clear tokens become the empty string, calls and
/// indirect references resolve at execution time.
fn assign_value(right: &str, call: Option<CallRef>, clear: bool) -> AssignValue {
    if let Some(call) = call {
        return AssignValue::Call(call);
    }
    if clear {
        return AssignValue::Literal(String::new());
    }

    resolve_indirect(right).unwrap_or_else(|| AssignValue::Literal(right.to_string()))
}
