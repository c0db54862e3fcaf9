//! The templating engine that turns raw choice text into display text.
//!
//! Tags are processed in a fixed order: `[=expr]` print substitution,
//! `[a|b|c]` pronoun branches, inline `[if cond ? a : b]` conditionals,
//! then `[if]...[elseif]...[else]...[end]` blocks (innermost first, with
//! `random` blocks picking a weighted variant). A final pass normalizes
//! whitespace, strips trailing periods from button text and renders
//! `_emphasis_` markup.

use crate::{
    consts::{CONTINUE_TEXT, FILTER_PASS_LIMIT},
    log::{Logger, Warning},
    parse::{parse_call_text, parse_requirement},
    run::{eval_requirement, EvalContext},
    story::RequirementKind,
    text::{pick_weighted, random_seed, Pronouns},
};

/// Process one block of raw story text into its displayed form.
///
/// `button` applies the extra button-text rules: trailing periods are
/// stripped unless the text is a `...` continuation.
pub(crate) fn filter_text(
    text: &str,
    ctx: &EvalContext,
    pronouns: Pronouns,
    logger: &mut Logger,
    button: bool,
) -> String {
    let mut text = text.to_string();

    if text.contains('[') {
        text = filter_print(text, ctx, pronouns, logger);
        text = filter_pronouns(text, pronouns);
        text = filter_if_inline(text, ctx, logger);
        text = filter_if_block(text, ctx, logger);

        if text.contains('[') {
            logger.warn(
                Warning::InvalidTemplateTag { tag: text.clone() },
                None,
            );
        }
    }

    text = tidy_whitespace(&text);

    if button && text != CONTINUE_TEXT && !text.ends_with("...") && !text.ends_with("...\"") {
        if text.ends_with('.') {
            text.pop();
        }
        text = replace_last(&text, ".\"", "\"");
        text = replace_last(&text, "._", "_");
    }

    filter_emphasis(&text)
}

/// `[=var_x]`, `[=mem_x]`, `[=hog_x]`, `[=call_name(args)]`.
///
/// Substituted values are themselves filtered, so a memory may contain
/// further tags.
fn filter_print(
    mut text: String,
    ctx: &EvalContext,
    pronouns: Pronouns,
    logger: &mut Logger,
) -> String {
    for _ in 0..FILTER_PASS_LIMIT {
        let start = match text.find("[=") {
            Some(start) => start,
            None => break,
        };
        let end = match text[start..].find(']') {
            Some(offset) => start + offset,
            None => break,
        };

        let tag = text[start..=end].to_string();
        let inner = text[start + 2..end].trim().to_lowercase();

        let replacement = if let Some(key) = inner.strip_prefix("var_") {
            ctx.vars.get(key).unwrap_or("").to_string()
        } else if let Some(key) = inner.strip_prefix("mem_") {
            ctx.store.memories.get(key).unwrap_or("").to_string()
        } else if let Some(key) = inner.strip_prefix("hog_") {
            ctx.store.groundhogs.get(key).unwrap_or("").to_string()
        } else if let Some(call) = inner.strip_prefix("call_") {
            match parse_call_text(&format!("~call {}", call), ctx.registry, logger) {
                Some(call) => call
                    .invoke(ctx.registry, logger)
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
                None => String::new(),
            }
        } else {
            logger.warn(Warning::InvalidTemplateTag { tag: tag.clone() }, None);
            String::new()
        };

        let replacement = filter_text(&replacement, ctx, pronouns, logger, false);
        text = replace_all(&text, &tag, &replacement);
    }

    text
}

/// `[they|she|he]` three-way branches; no nested brackets inside.
fn filter_pronouns(mut text: String, pronouns: Pronouns) -> String {
    for _ in 0..FILTER_PASS_LIMIT {
        let mut search = 0;
        let mut replaced = false;

        while let Some(offset) = text[search..].find('[') {
            let start = search + offset;
            let end = match text[start + 1..].find(']') {
                Some(offset) => start + 1 + offset,
                None => break,
            };

            let inner = &text[start + 1..end];

            if inner.contains('[') || inner.starts_with("if ") {
                search = start + 1;
                continue;
            }

            let parts: Vec<&str> = inner.split('|').collect();
            if parts.len() == 3 && parts.iter().all(|part| !part.is_empty()) {
                let branch = parts[pronouns.index()].to_string();
                text.replace_range(start..=end, &branch);
                replaced = true;
                break;
            }

            search = start + 1;
        }

        if !replaced {
            break;
        }
    }

    text
}

/// Inline `[if cond ? then]`, `[if cond : then]`, `[if cond ? then : else]`.
///
/// `[if random : a|b|c]` picks one variant with the month-stable seed
/// (`random!` with a fresh seed every time). A tag immediately followed by
/// `[else...]`/`[end]` is left for the block filter, which owns that form.
fn filter_if_inline(mut text: String, ctx: &EvalContext, logger: &mut Logger) -> String {
    for _ in 0..FILTER_PASS_LIMIT {
        let mut search = 0;
        let mut found = None;

        while let Some(offset) = text[search..].find("[if ") {
            let start = search + offset;
            let end = match text[start..].find(']') {
                Some(offset) => start + offset,
                None => break,
            };

            let segment = &text[start + 4..end];
            if segment.contains('[') {
                search = start + 4;
                continue;
            }

            if segment.contains('?') || segment.contains(':') {
                let after = text[end + 1..].trim_start();
                if after.starts_with("[else") || after.starts_with("[end") {
                    // opener of a block with a leading branch
                    search = start + 4;
                    continue;
                }
                found = Some((start, end));
                break;
            }

            search = start + 4;
        }

        let (start, end) = match found {
            Some(found) => found,
            None => break,
        };

        let segment = text[start + 4..end].to_string();
        let separator = match segment.find(|c| c == '?' || c == ':') {
            Some(separator) => separator,
            None => break,
        };
        let condition = segment[..separator].trim().to_lowercase();
        let rest = &segment[separator + 1..];

        let (then_text, else_text) = match rest.find(':') {
            Some(position) => (&rest[..position], &rest[position + 1..]),
            None => (rest, ""),
        };

        let tag = text[start..=end].to_string();

        let replacement = if condition == "random" || condition == "random!" {
            let variants: Vec<&str> = then_text.split('|').collect();
            let weights = vec![1.0; variants.len()];
            let seed = random_seed(ctx.story.id(), ctx.store.month, condition == "random!");

            pick_weighted(&variants, &weights, &seed)
                .map(|variant| variant.trim().to_string())
                .unwrap_or_default()
        } else {
            match parse_requirement(
                &format!("~if {}", condition),
                ctx.story.id(),
                ctx.registry,
                logger,
            ) {
                Some(req) => {
                    if eval_requirement(&req, ctx, logger, false) {
                        then_text.to_string()
                    } else {
                        else_text.to_string()
                    }
                }
                None => {
                    logger.warn(Warning::InvalidTemplateTag { tag: tag.clone() }, None);
                    String::new()
                }
            }
        };

        text = replace_first(&text, &tag, &replacement);
    }

    text
}

/// Block conditionals, innermost first.
///
/// `[if cond] a [elseif cond] b [else] c [end]` renders the first branch
/// whose condition holds; a first condition containing `random` instead
/// treats every branch as a weighted variant.
fn filter_if_block(mut text: String, ctx: &EvalContext, logger: &mut Logger) -> String {
    for pass in 0..FILTER_PASS_LIMIT {
        // the innermost block is the last opener before the first end tag
        let (end_start, end_len) = match find_end_tag(&text) {
            Some(found) => found,
            None => break,
        };
        let opener = match text[..end_start].rfind("[if ") {
            Some(opener) => opener,
            None => break,
        };
        let opener_close = match text[opener..].find(']') {
            Some(offset) => opener + offset,
            None => break,
        };
        if opener_close > end_start {
            break;
        }

        let header = text[opener + 4..opener_close].to_string();

        // `[if cond : lead]` openers put their first branch in the header
        let (condition, lead) = match header.find(|c| c == '?' || c == ':') {
            Some(position) => (
                header[..position].trim().to_lowercase(),
                header[position + 1..].to_string(),
            ),
            None => (header.trim().to_lowercase(), String::new()),
        };

        let body = format!("{}{}", lead, &text[opener_close + 1..end_start]);
        let full = text[opener..end_start + end_len].to_string();

        let replacement = if condition.contains("random") {
            random_block(&full, pass, ctx, logger)
        } else {
            conditional_block(&condition, &body, &full, ctx, logger)
        };

        text = replace_first(&text, &full, &replacement);
    }

    text
}

fn find_end_tag(text: &str) -> Option<(usize, usize)> {
    let end = text.find("[end]");
    let endif = text.find("[endif]");

    match (end, endif) {
        (Some(end), Some(endif)) if endif < end => Some((endif, "[endif]".len())),
        (Some(end), _) => Some((end, "[end]".len())),
        (None, Some(endif)) => Some((endif, "[endif]".len())),
        (None, None) => None,
    }
}

/// Render an `[if]`-block by evaluating each branch condition in turn.
fn conditional_block(
    condition: &str,
    body: &str,
    full: &str,
    ctx: &EvalContext,
    logger: &mut Logger,
) -> String {
    let req = match parse_requirement(
        &format!("~if {}", condition),
        ctx.story.id(),
        ctx.registry,
        logger,
    ) {
        Some(req) => req,
        None => {
            logger.warn(
                Warning::InvalidTemplateTag {
                    tag: full.to_string(),
                },
                None,
            );
            return String::new();
        }
    };

    // split the body into the first branch and its [else*] continuations
    let mut segments = Vec::new();
    let mut rest = body;

    let first_else = rest.find("[else");
    let first = match first_else {
        Some(position) => &rest[..position],
        None => rest,
    };

    if eval_requirement(&req, ctx, logger, false) {
        return first.to_string();
    }

    rest = match first_else {
        Some(position) => &rest[position..],
        None => return String::new(),
    };

    while let Some(close) = rest.find(']') {
        let tag = &rest["[else".len()..close];
        let after = &rest[close + 1..];

        let (branch, next) = match after.find("[else") {
            Some(position) => (&after[..position], &after[position..]),
            None => (after, ""),
        };

        segments.push((tag.trim().to_string(), branch.to_string()));

        if next.is_empty() {
            break;
        }
        rest = next;
    }

    for (tag, branch) in segments {
        if tag.is_empty() {
            // plain [else]
            return branch;
        }

        let condition = match tag.strip_prefix("if") {
            Some(condition) => condition.trim().to_string(),
            None => continue,
        };

        let req = match parse_requirement(
            &format!("~if {}", condition),
            ctx.story.id(),
            ctx.registry,
            logger,
        ) {
            Some(req) => req,
            None => {
                logger.warn(
                    Warning::InvalidTemplateTag {
                        tag: full.to_string(),
                    },
                    None,
                );
                return String::new();
            }
        };

        if eval_requirement(&req, ctx, logger, false) {
            return branch;
        }
    }

    String::new()
}

/// Render a `[if random]`-flavored block by weighted variant selection.
///
/// Each `[tag] text` pair in the block is a candidate: bare connective
/// tags weigh 1, `random = N` tags weigh N, other conditions gate their
/// candidate, and `cond && random = N` combines both.
fn random_block(full: &str, pass: usize, ctx: &EvalContext, logger: &mut Logger) -> String {
    const CONNECTIVES: [&'static str; 8] =
        ["or if", "else if", "elseif", "if", "or", "else", "|", "||"];

    let mut variants: Vec<String> = Vec::new();
    let mut weights: Vec<f32> = Vec::new();
    let mut ignore_seed = false;

    let mut rest = full;
    while let Some(open) = rest.find('[') {
        let close = match rest[open..].find(']') {
            Some(offset) => open + offset,
            None => break,
        };

        let tag = rest[open + 1..close].trim().to_lowercase();

        let after = &rest[close + 1..];
        let text = match after.find('[') {
            Some(position) => &after[..position],
            None => after,
        };
        let next = &rest[close + 1 + text.len()..];

        let text = text.to_string();
        rest = next;

        if text.is_empty() {
            continue;
        }

        if CONNECTIVES.contains(&tag.as_str()) {
            variants.push(text);
            weights.push(1.0);
            continue;
        }

        let mut condition = tag.clone();
        for connective in CONNECTIVES.iter() {
            if let Some(stripped) = condition.strip_prefix(connective) {
                condition = stripped.to_string();
            }
        }
        let condition = condition.trim();

        let req = match parse_requirement(
            &format!("~if {}", condition),
            ctx.story.id(),
            ctx.registry,
            logger,
        ) {
            Some(req) => req,
            None => {
                logger.warn(
                    Warning::InvalidTemplateTag {
                        tag: tag.clone(),
                    },
                    None,
                );
                continue;
            }
        };

        if let RequirementKind::Random { unseeded: true, .. } = req.kind {
            ignore_seed = true;
        }

        match &req.kind {
            RequirementKind::All(subs) => {
                // `season = quiet && random = 10`
                let mut weight = 1;
                let mut passed = true;

                for sub in subs {
                    if let RequirementKind::Random { weight: w, .. } = &sub.kind {
                        weight = *w;
                        continue;
                    }
                    if !eval_requirement(sub, ctx, logger, false) {
                        passed = false;
                        break;
                    }
                }

                if passed {
                    variants.push(text);
                    weights.push(weight as f32);
                }
            }
            RequirementKind::Random { weight, .. } => {
                variants.push(text);
                weights.push(*weight as f32);
            }
            _ => {
                if eval_requirement(&req, ctx, logger, false) {
                    variants.push(text);
                    weights.push(1.0);
                }
            }
        }
    }

    // nested blocks resolve first; the pass index keeps their seeds apart
    let seed = format!(
        "{}{}",
        random_seed(ctx.story.id(), ctx.store.month, ignore_seed),
        pass
    );

    pick_weighted(&variants, &weights, &seed)
        .cloned()
        .unwrap_or_default()
}

/// Trim the block, collapse runs of blank lines and double spaces.
fn tidy_whitespace(text: &str) -> String {
    let mut text = text.trim().to_string();

    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    while text.contains("  ") {
        text = text.replace("  ", " ");
    }

    text
}

/// `_text_` renders as emphasis markup.
fn filter_emphasis(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('_') {
        let close = match rest[open + 1..].find('_') {
            Some(offset) => open + 1 + offset,
            None => break,
        };

        result.push_str(&rest[..open]);
        result.push_str("<i>");
        result.push_str(rest[open + 1..close].trim_matches('\n'));
        result.push_str("</i>");

        rest = &rest[close + 1..];
    }

    result.push_str(rest);
    result
}

fn replace_first(text: &str, find: &str, replace: &str) -> String {
    match text.find(find) {
        Some(position) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..position]);
            result.push_str(replace);
            result.push_str(&text[position + find.len()..]);
            result
        }
        None => text.to_string(),
    }
}

fn replace_last(text: &str, find: &str, replace: &str) -> String {
    match text.rfind(find) {
        Some(position) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..position]);
            result.push_str(replace);
            result.push_str(&text[position + find.len()..]);
            result
        }
        None => text.to_string(),
    }
}

/// Replace every occurrence, repeating while the pattern reappears.
fn replace_all(text: &str, find: &str, replace: &str) -> String {
    let mut text = text.replace(find, replace);

    if !replace.contains(find) {
        while text.contains(find) {
            text = text.replace(find, replace);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        call::{CallRegistry, Value, ValueKind},
        log::Logger,
        memory::{MemoryStore, ValueMap},
        story::Story,
    };

    struct Fixture {
        registry: CallRegistry,
        store: MemoryStore,
        story: Story,
        vars: ValueMap,
        logger: Logger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut story = Story::new();
            story.set_id("filtertest");

            Fixture {
                registry: CallRegistry::new(),
                store: MemoryStore::new(),
                story,
                vars: ValueMap::new(),
                logger: Logger::default(),
            }
        }

        fn filter(&mut self, text: &str) -> String {
            let ctx = EvalContext {
                registry: &self.registry,
                store: &self.store,
                story: &self.story,
                vars: &self.vars,
                position: None,
                subject: None,
            };

            filter_text(text, &ctx, Pronouns::Neutral, &mut self.logger, false)
        }

        fn filter_button(&mut self, text: &str) -> String {
            let ctx = EvalContext {
                registry: &self.registry,
                store: &self.store,
                story: &self.story,
                vars: &self.vars,
                position: None,
                subject: None,
            };

            filter_text(text, &ctx, Pronouns::Neutral, &mut self.logger, true)
        }
    }

    #[test]
    fn print_substitution_reads_vars_memories_and_groundhogs() {
        let mut fixture = Fixture::new();
        fixture.vars.set("kudos", "12");
        fixture.store.memories.set("bff", "Anemone");
        fixture.store.groundhogs.set("lives", "3");

        assert_eq!(fixture.filter("You have [=var_kudos] kudos."), "You have 12 kudos.");
        assert_eq!(fixture.filter("Best friend: [=mem_bff]."), "Best friend: Anemone.");
        assert_eq!(fixture.filter("Life [=hog_lives]."), "Life 3.");
    }

    #[test]
    fn print_substitution_invokes_calls() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .register("mostlove", &[], ValueKind::Text, |_| {
                Some(Value::from("anemone"))
            });

        assert_eq!(fixture.filter("Dearest: [=call_mostlove]."), "Dearest: anemone.");
    }

    #[test]
    fn substituted_values_are_refiltered() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("nested", "see [=mem_inner]");
        fixture.store.memories.set("inner", "deep");

        assert_eq!(fixture.filter("Note: [=mem_nested]."), "Note: see deep.");
    }

    #[test]
    fn pronoun_branches_pick_by_configured_pronouns() {
        let mut fixture = Fixture::new();

        let ctx = EvalContext {
            registry: &fixture.registry,
            store: &fixture.store,
            story: &fixture.story,
            vars: &fixture.vars,
            position: None,
            subject: None,
        };

        let text = "[They|She|He] waved at [them|her|him].";

        assert_eq!(
            filter_text(text, &ctx, Pronouns::Neutral, &mut fixture.logger, false),
            "They waved at them."
        );
        assert_eq!(
            filter_text(text, &ctx, Pronouns::Feminine, &mut fixture.logger, false),
            "She waved at her."
        );
        assert_eq!(
            filter_text(text, &ctx, Pronouns::Masculine, &mut fixture.logger, false),
            "He waved at him."
        );
    }

    #[test]
    fn inline_conditionals_pick_a_branch() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("brave", "true");

        assert_eq!(
            fixture.filter("You are [if mem_brave ? fearless : afraid]."),
            "You are fearless."
        );
        assert_eq!(
            fixture.filter("You are [if mem_timid ? shy : bold]."),
            "You are bold."
        );
        assert_eq!(fixture.filter("Hi[if mem_timid ? there]."), "Hi.");
    }

    #[test]
    fn unset_memory_renders_the_else_branch() {
        let mut fixture = Fixture::new();

        let rendered = fixture.filter("[if mem_x : Yes][else]No[end]");

        assert_eq!(rendered, "No");
    }

    #[test]
    fn block_conditionals_render_the_first_true_branch() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("mood", "2");

        let text = "[if mem_mood == 1]Gloomy.[elseif mem_mood == 2]Fine.[else]Unknown.[end]";

        assert_eq!(fixture.filter(text), "Fine.");
    }

    #[test]
    fn block_conditionals_fall_through_to_else() {
        let mut fixture = Fixture::new();

        let text = "[if mem_met]Again?[else]First time.[end]";

        assert_eq!(fixture.filter(text), "First time.");
    }

    #[test]
    fn blocks_without_a_true_branch_render_nothing() {
        let mut fixture = Fixture::new();

        let text = "Before.[if mem_met]Again?[elseif mem_other]Other.[end]After.";

        assert_eq!(fixture.filter(text), "Before.After.");
    }

    #[test]
    fn nested_blocks_resolve_inner_first() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("outer", "true");
        fixture.store.memories.set("inner", "true");

        let text = "[if mem_outer]A[if mem_inner]B[end]C[end]";

        assert_eq!(fixture.filter(text), "ABC");
    }

    #[test]
    fn random_inline_variants_are_month_stable() {
        let mut fixture = Fixture::new();
        fixture.store.month = 7;

        let text = "Today you are [if random : hunting dogs|finding water|fixing sparkplugs].";

        let first = fixture.filter(text);
        let second = fixture.filter(text);

        assert_eq!(first, second);
        assert!(!first.contains('['), "tag not consumed: {}", first);
        assert!(!first.contains('|'), "variants not split: {}", first);
    }

    #[test]
    fn random_blocks_pick_among_variants() {
        let mut fixture = Fixture::new();
        fixture.store.month = 3;

        let text = "[if random]one[or]two[or]three[end]";

        let rendered = fixture.filter(text);
        assert!(["one", "two", "three"].contains(&rendered.as_str()));
        assert_eq!(rendered, fixture.filter(text));
    }

    #[test]
    fn random_blocks_respect_gating_conditions() {
        let mut fixture = Fixture::new();

        // the gated branch can never be picked while mem_rainy is unset
        let text = "[if random]sunny[elseif mem_rainy && random = 99]rainy[end]";

        for month in 0..10 {
            fixture.store.month = month;
            assert_eq!(fixture.filter(text), "sunny");
        }
    }

    #[test]
    fn print_runs_before_pronouns_which_run_before_conditionals() {
        let mut fixture = Fixture::new();
        fixture.store.memories.set("met", "true");
        fixture.store.memories.set("name", "Rex");

        // the print tag inside the branch is substituted first, so the
        // conditional picks an already-rendered value
        assert_eq!(
            fixture.filter("[if mem_met ? [=mem_name] : a stranger] nods."),
            "Rex nods."
        );

        // likewise the pronoun tag resolves before the branch is chosen
        assert_eq!(
            fixture.filter("[if mem_met ? [they|she|he] : nobody] nods."),
            "they nods."
        );
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        let mut fixture = Fixture::new();

        assert_eq!(
            fixture.filter("\n\nFirst.\n\n\n\nSecond.  Third.\n\n"),
            "First.\n\nSecond. Third."
        );
    }

    #[test]
    fn button_text_drops_trailing_periods_but_not_ellipses() {
        let mut fixture = Fixture::new();

        assert_eq!(fixture.filter_button("Go home."), "Go home");
        assert_eq!(fixture.filter_button("Well..."), "Well...");
        assert_eq!(fixture.filter_button("..."), "...");
        assert_eq!(fixture.filter_button("\"Stay.\""), "\"Stay\"");
        assert_eq!(fixture.filter_button("Why?"), "Why?");
    }

    #[test]
    fn emphasis_markup_renders_as_italics() {
        let mut fixture = Fixture::new();

        assert_eq!(
            fixture.filter("It was _really_ something."),
            "It was <i>really</i> something."
        );
    }
}
