//! Parser for requirement expressions.
//!
//! Grammar, outermost first: `||`/`|`/`or` splits into an any-of node,
//! `&&`/`&`/`and` into an all-of node, and a leaf is `<name> <op> <value>`
//! with a fallback of appending `= true` for bare checks. There is no
//! further nesting and there are no parentheses; `a and b or c and d` reads
//! as `(a and b) or (c and d)`.

use crate::{
    calendar,
    call::{parse_bool_int_string, CallRegistry, Value, ValueKind},
    log::{Logger, Warning},
    parse::{effect::parse_call_text, split_any},
    story::{CallOperand, Compare, RepeatUnit, Requirement, RequirementKind, SeasonTarget},
};

const OR_SEPARATORS: [&'static str; 4] = ["||", " | ", " or ", " OR "];
const AND_SEPARATORS: [&'static str; 4] = ["&&", " & ", " and ", " AND "];

/// Parse a requirement line or fragment.
///
/// Accepts full `~if`/`~ifd` lines as well as bare fragments produced when
/// splitting compound expressions or re-parsing conditions embedded in
/// jumps, conditional sets and templated text.
pub(crate) fn parse_requirement(
    line: &str,
    story_id: &str,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<Requirement> {
    let source = line.trim().to_string();

    let mut rest = source.as_str();
    let mut show_disabled = false;

    if rest.starts_with("~ifd") {
        show_disabled = true;
        rest = &rest["~ifd".len()..];
    } else if rest.starts_with("~if") {
        rest = &rest["~if".len()..];
    }
    let rest = rest.trim();

    // OR binds loosest, so it splits first; nested ANDs evaluate first
    let or_parts = split_any(rest, &OR_SEPARATORS);
    if or_parts.len() > 1 {
        let subs: Vec<Requirement> = or_parts
            .iter()
            .filter_map(|part| parse_requirement(part, story_id, registry, logger))
            .collect();

        if subs.is_empty() {
            logger.warn(Warning::InvalidRequirement { line: source }, None);
            return None;
        }

        let mut req = Requirement::new(RequirementKind::Any(subs), source);
        req.show_disabled = show_disabled;
        return Some(req);
    }

    let and_parts = split_any(rest, &AND_SEPARATORS);
    if and_parts.len() > 1 {
        let subs: Vec<Requirement> = and_parts
            .iter()
            .filter_map(|part| parse_requirement(part, story_id, registry, logger))
            .collect();

        if subs.is_empty() {
            logger.warn(Warning::InvalidRequirement { line: source }, None);
            return None;
        }

        let mut req = Requirement::new(RequirementKind::All(subs), source);
        req.show_disabled = show_disabled;
        return Some(req);
    }

    parse_leaf(rest, story_id, registry, logger).map(|kind| {
        let mut req = Requirement::new(kind, source);
        req.show_disabled = show_disabled;
        req
    })
}

/// Parse one leaf expression with `~if`/`~ifd` already removed.
fn parse_leaf(
    expr: &str,
    story_id: &str,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<RequirementKind> {
    let (left, compare, right) = match split_comparison(expr) {
        Some(parts) => parts,
        None => {
            // bare boolean check: `mem_x` reads as `mem_x = true`
            let retry = format!("{} = true", expr);
            match split_comparison(&retry) {
                Some(parts) => parts,
                None => {
                    logger.warn(
                        Warning::InvalidRequirement {
                            line: expr.to_string(),
                        },
                        None,
                    );
                    return None;
                }
            }
        }
    };

    let mut left = left.to_lowercase();
    let mut compare = compare;
    let mut right = right.to_lowercase();

    // `!mem_x` reads as `mem_x = false`
    if left.starts_with('!') {
        if compare != "=" || right != "true" {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            return None;
        }
        left = left["!".len()..].to_string();
        right = "false".to_string();
    }

    if left == "age" || left == "year" {
        if compare == "=" {
            logger.warn(
                Warning::AgeEqualsCompare {
                    line: expr.to_string(),
                },
                None,
            );
            compare = "==".to_string();
        }

        let parts: Vec<&str> = right.split('-').collect();

        if parts.len() == 3 {
            // `age >= 15-pollen-mid` is a month-of-game comparison
            let month_expr = format!("month {} {}", compare, right);
            return parse_leaf(&month_expr, story_id, registry, logger);
        }

        if parts.len() == 2 {
            if compare == "==" {
                // `age == 15-pollen` means that age during that season
                let and_expr = format!("age == {} && season == {}", parts[0], parts[1]);
                return parse_requirement(&and_expr, story_id, registry, logger)
                    .map(|req| req.kind);
            } else {
                // other comparisons anchor to the season's first or last month
                let suffix = if compare == "<=" || compare == "=<" || compare == ">" {
                    "-end"
                } else {
                    "-start"
                };
                let month_expr = format!("month {} {}{}", compare, right, suffix);
                return parse_leaf(&month_expr, story_id, registry, logger);
            }
        }

        let (cmp, value) = parse_int_compare(&compare, &right, expr, logger)?;
        return Some(RequirementKind::Age { cmp, value });
    }

    if left == "season" {
        let cmp = parse_simple_compare(&compare).or_else(|| {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            None
        })?;

        let target = if right.contains('-') {
            match calendar::month_of_year(&right) {
                Some(month) => SeasonTarget::MonthOfYear(month),
                None => {
                    logger.warn(
                        Warning::InvalidRequirement {
                            line: expr.to_string(),
                        },
                        None,
                    );
                    return None;
                }
            }
        } else if calendar::is_season(&right) {
            SeasonTarget::Name(right)
        } else {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            return None;
        };

        return Some(RequirementKind::Season { cmp, target });
    }

    if left.starts_with("month") || left.starts_with("week") {
        if compare == "=" {
            logger.warn(
                Warning::EqualsCompareOnInt {
                    line: expr.to_string(),
                },
                None,
            );
            compare = "==".to_string();
        }

        let parts: Vec<&str> = right.split('-').collect();

        if parts.len() == 2 {
            // `month == pollen-2` is a season check, `month == 15-pollen` an age check
            let redirect = if calendar::is_season(parts[0]) {
                format!("season {} {}", compare, right)
            } else {
                format!("age {} {}", compare, right)
            };
            return parse_leaf(&redirect, story_id, registry, logger);
        }

        let resolved = if parts.len() == 3 {
            calendar::month_of_game(&right)
        } else {
            right.parse::<i32>().ok()
        };

        let resolved = match resolved {
            Some(month) => month,
            None => {
                logger.warn(
                    Warning::InvalidRequirement {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
        };

        let (cmp, value) = parse_int_compare(&compare, &resolved.to_string(), expr, logger)?;
        return Some(RequirementKind::Month { cmp, value });
    }

    if let Some(key) = strip_key(&left, "mem_") {
        let (cmp, value) = parse_value_compare(&compare, &right, expr, logger)?;
        return Some(RequirementKind::Memory { key, cmp, value });
    }

    if let Some(key) = strip_key(&left, "var_") {
        let (cmp, value) = parse_value_compare(&compare, &right, expr, logger)?;
        return Some(RequirementKind::Var { key, cmp, value });
    }

    if let Some(key) = strip_key(&left, "hog_") {
        let (cmp, value) = parse_value_compare(&compare, &right, expr, logger)?;
        return Some(RequirementKind::Groundhog { key, cmp, value });
    }

    if left.starts_with("story_") || left.starts_with("first") {
        if left.starts_with("first") {
            // `first` reads as `story_<current story> == false`
            left = format!("story_{}", story_id);
            compare = "==".to_string();
            right = (if right == "false" { "true" } else { "false" }).to_string();
        }

        let id = match strip_key(&left, "story_") {
            Some(id) => id,
            None => {
                logger.warn(
                    Warning::InvalidRequirement {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
        };

        let (cmp, value) = parse_value_compare(&compare, &right, expr, logger)?;

        let (cmp, months) = match value {
            Value::Int(months) => (cmp, months),
            Value::Bool(true) => (Compare::GreaterThan, -1),
            Value::Bool(false) => (Compare::LessThan, 0),
            Value::Text(text) => match text.parse::<bool>() {
                Ok(true) => (Compare::GreaterThan, -1),
                Ok(false) => (Compare::LessThan, 0),
                Err(_) => {
                    logger.warn(
                        Warning::InvalidRequirement {
                            line: expr.to_string(),
                        },
                        None,
                    );
                    return None;
                }
            },
        };

        return Some(RequirementKind::StoryDone { id, cmp, months });
    }

    if left == "repeat_today" {
        // repeat forever on the day of the month this story first played
        let repeat_expr = format!(
            "repeat && !story_{} || story_{} < 1",
            story_id, story_id
        );
        return parse_requirement(&repeat_expr, story_id, registry, logger).map(|req| req.kind);
    }

    if left.starts_with("repeat") {
        let mut count = 0;
        let mut unit = RepeatUnit::Months;

        if left.starts_with("repeat_") {
            count = 1;
            let mut unit_name = left["repeat_".len()..].trim().to_string();
            if !unit_name.ends_with('s') {
                unit_name.push('s');
            }
            if unit_name == "weeks" {
                // months used to be called weeks
                unit_name = "months".to_string();
            }

            unit = match unit_name.as_str() {
                "months" => RepeatUnit::Months,
                "seasons" => RepeatUnit::Seasons,
                "years" => RepeatUnit::Years,
                _ => {
                    logger.warn(
                        Warning::InvalidRequirement {
                            line: expr.to_string(),
                        },
                        None,
                    );
                    return None;
                }
            };
        }

        if !right.is_empty() && right != "true" && right != "false" {
            count = parse_int_loose(&right, 1);
        }

        return Some(RequirementKind::Repeat { unit, count });
    }

    if left.starts_with("call_") {
        let method = left["call_".len()..].trim();
        let call = match parse_call_text(&format!("~call {}", method), registry, logger) {
            Some(call) => call,
            None => {
                logger.warn(
                    Warning::InvalidRequirement {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
        };

        let (cmp, operand) = parse_call_compare(&compare, &right, expr, registry, logger)?;
        return Some(RequirementKind::Call { call, cmp, operand });
    }

    if left.contains("random") {
        let mut weight = parse_int_loose(&right, 0);
        if weight == 0 {
            weight = 1;
        }

        return Some(RequirementKind::Random {
            weight,
            unseeded: left.contains('!'),
        });
    }

    if left == "biome" {
        let cmp = match parse_simple_compare(&compare) {
            Some(cmp) => cmp,
            None => {
                logger.warn(
                    Warning::InvalidRequirement {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
        };
        return Some(RequirementKind::Biome { id: right, cmp });
    }

    if left == "status" {
        let cmp = match parse_simple_compare(&compare) {
            Some(cmp) => cmp,
            None => {
                logger.warn(
                    Warning::InvalidRequirement {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
        };
        return Some(RequirementKind::Status { id: right, cmp });
    }

    // host-domain namespaces from the wider game are out of engine scope
    if left == "job"
        || left == "location"
        || left == "chara"
        || left == "mapspot"
        || left.starts_with("skill_")
        || left.starts_with("love_")
    {
        logger.warn(
            Warning::UnknownNamespace {
                line: expr.to_string(),
            },
            None,
        );
        return None;
    }

    logger.warn(
        Warning::InvalidRequirement {
            line: expr.to_string(),
        },
        None,
    );
    None
}

fn strip_key(left: &str, prefix: &str) -> Option<String> {
    let key = left.strip_prefix(prefix)?.trim().to_lowercase();

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Split a leaf into left operand, comparison operator and right operand.
///
/// The left operand may carry a leading `!`, a parenthesized argument list
/// and a trailing `!` (`random!`); the right operand may carry its own
/// argument list for embedded calls. Extra text after the right operand is
/// ignored.
fn split_comparison(expr: &str) -> Option<(String, String, String)> {
    let expr = expr.trim();
    let chars: Vec<char> = expr.chars().collect();
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

    // optional argument list, taken through the first closing parenthesis
    let mut lookahead = position;
    while lookahead < chars.len() && chars[lookahead].is_whitespace() {
        lookahead += 1;
    }
    if chars.get(lookahead) == Some(&'(') {
        match chars[lookahead..].iter().position(|c| *c == ')') {
            Some(offset) => {
                let end = lookahead + offset;
                left.extend(&chars[position..=end]);
                position = end + 1;
            }
            None => return None,
        }
    }

    if chars.get(position) == Some(&'!') && chars.get(position + 1) != Some(&'=') {
        left.push('!');
        position += 1;
    }

    while position < chars.len() && chars[position].is_whitespace() {
        position += 1;
    }

    let mut compare = String::new();
    while position < chars.len() && matches!(chars[position], '!' | '=' | '<' | '>') {
        compare.push(chars[position]);
        position += 1;
    }
    if compare.is_empty() {
        return None;
    }

    while position < chars.len() && chars[position].is_whitespace() {
        position += 1;
    }

    let mut right = String::new();
    while position < chars.len()
        && (chars[position].is_alphanumeric() || chars[position] == '_' || chars[position] == '-')
    {
        right.push(chars[position]);
        position += 1;
    }
    if right.is_empty() {
        return None;
    }

    let mut lookahead = position;
    while lookahead < chars.len() && chars[lookahead].is_whitespace() {
        lookahead += 1;
    }
    if chars.get(lookahead) == Some(&'(') {
        if let Some(offset) = chars[lookahead..].iter().position(|c| *c == ')') {
            let end = lookahead + offset;
            right.extend(&chars[position..=end]);
        }
    }

    Some((left, compare, right))
}

fn parse_simple_compare(compare: &str) -> Option<Compare> {
    match compare {
        "=" | "==" => Some(Compare::Equal),
        "!" | "!=" | "!==" => Some(Compare::NotEqual),
        _ => None,
    }
}

/// Comparison against a pure integer operand, used for age and month.
///
/// `>=` and `<=` normalize to strict comparisons by adjusting the operand;
/// bare `=` is rejected to force authors to pick `==` or `>=`.
fn parse_int_compare(
    compare: &str,
    right: &str,
    expr: &str,
    logger: &mut Logger,
) -> Option<(Compare, i32)> {
    let value = match right.parse::<i32>() {
        Ok(value) => value,
        Err(_) => {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            return None;
        }
    };

    match compare {
        "==" => Some((Compare::Equal, value)),
        "=" => {
            logger.warn(
                Warning::EqualsCompareOnInt {
                    line: expr.to_string(),
                },
                None,
            );
            None
        }
        "!" | "!=" | "!==" => Some((Compare::NotEqual, value)),
        ">=" | "=>" => Some((Compare::GreaterThan, value - 1)),
        ">" => Some((Compare::GreaterThan, value)),
        "<=" | "=<" => Some((Compare::LessThan, value + 1)),
        "<" => Some((Compare::LessThan, value)),
        _ => {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            None
        }
    }
}

/// Comparison against a bool, int or string operand, used for the
/// key-value namespaces and story history.
fn parse_value_compare(
    compare: &str,
    right: &str,
    expr: &str,
    logger: &mut Logger,
) -> Option<(Compare, Value)> {
    if right.starts_with("call_") {
        // the key-value namespaces compare against literals only
        logger.warn(
            Warning::InvalidRequirement {
                line: expr.to_string(),
            },
            None,
        );
        return None;
    }

    let mut normalized = right.trim().to_lowercase();
    if normalized == "null" || normalized == "blank" || normalized == "broken" || normalized.is_empty()
    {
        // `mem_bff = null` asks whether the memory was never set
        normalized = "false".to_string();
    }

    let mut value = parse_bool_int_string(&normalized);
    let right_is_int = matches!(value, Value::Int(..));

    let cmp = match compare {
        "==" => Compare::Equal,
        "=" => {
            if right_is_int {
                logger.warn(
                    Warning::EqualsCompareOnInt {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
            Compare::Equal
        }
        "!" | "!=" | "!==" => Compare::NotEqual,
        ">=" | "=>" => {
            if let Value::Int(int_value) = &mut value {
                *int_value -= 1;
            }
            Compare::GreaterThan
        }
        ">" => Compare::GreaterThan,
        "<=" | "=<" => {
            if let Value::Int(int_value) = &mut value {
                *int_value += 1;
            }
            Compare::LessThan
        }
        "<" => Compare::LessThan,
        _ => {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            return None;
        }
    };

    if !right_is_int && matches!(cmp, Compare::LessThan | Compare::GreaterThan) {
        logger.warn(
            Warning::RangeCompareToText {
                line: expr.to_string(),
            },
            None,
        );
        return None;
    }

    Some((cmp, value))
}

/// Comparison operand of a `call_` leaf: a literal or another call.
fn parse_call_compare(
    compare: &str,
    right: &str,
    expr: &str,
    registry: &CallRegistry,
    logger: &mut Logger,
) -> Option<(Compare, CallOperand)> {
    let mut right_is_int = false;
    let mut right_is_call = false;

    let mut operand = if right.starts_with("call_") {
        right_is_call = true;

        let call = parse_call_text(
            &format!("~call {}", &right["call_".len()..]),
            registry,
            logger,
        )?;

        match call.ret {
            Some(ValueKind::Int) => right_is_int = true,
            Some(ValueKind::Bool) | Some(ValueKind::Text) | None => {}
            Some(ValueKind::Unit) => {
                logger.warn(
                    Warning::CallReturnMismatch {
                        name: call.name.clone(),
                    },
                    None,
                );
                return None;
            }
        }

        CallOperand::Call(call)
    } else {
        let mut normalized = right.trim().to_lowercase();
        if normalized == "null"
            || normalized == "blank"
            || normalized == "broken"
            || normalized.is_empty()
        {
            normalized = "false".to_string();
        }

        let value = parse_bool_int_string(&normalized);
        right_is_int = matches!(value, Value::Int(..));

        CallOperand::Literal(value)
    };

    let cmp = match compare {
        "==" => Compare::Equal,
        "=" => {
            if right_is_int {
                logger.warn(
                    Warning::EqualsCompareOnInt {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }
            Compare::Equal
        }
        "!" | "!=" | "!==" => Compare::NotEqual,
        ">=" | "=>" | "<=" | "=<" => {
            if right_is_call {
                logger.warn(
                    Warning::RangeCompareToCall {
                        line: expr.to_string(),
                    },
                    None,
                );
                return None;
            }

            let less = compare == "<=" || compare == "=<";
            if let CallOperand::Literal(Value::Int(int_value)) = &mut operand {
                *int_value += if less { 1 } else { -1 };
            }

            if less {
                Compare::LessThan
            } else {
                Compare::GreaterThan
            }
        }
        ">" => Compare::GreaterThan,
        "<" => Compare::LessThan,
        _ => {
            logger.warn(
                Warning::InvalidRequirement {
                    line: expr.to_string(),
                },
                None,
            );
            return None;
        }
    };

    if !right_is_int
        && !right_is_call
        && matches!(cmp, Compare::LessThan | Compare::GreaterThan)
    {
        logger.warn(
            Warning::RangeCompareToText {
                line: expr.to_string(),
            },
            None,
        );
        return None;
    }

    Some((cmp, operand))
}

/// Parse an integer from a token, stripping anything non-numeric first.
pub(crate) fn parse_int_loose(token: &str, default: i32) -> i32 {
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    digits.parse().unwrap_or(default)
}
