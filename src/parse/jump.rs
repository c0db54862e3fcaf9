//! Parser for jump directives.
//!
//! `>label` moves execution to a labelled choice; `>>` suppresses the
//! target's text, `>!` suppresses the page break the line parser would
//! otherwise insert, `>>>` is shorthand for a once-only jump back to the
//! decision point, and `>if cond ? a : b` attaches a guard with an optional
//! else-jump. The reserved targets `back` and `start` resolve to generated
//! labels while parsing; `snippet_` targets clone a snippet into the story.

use crate::{
    consts::SNIPPET_PREFIX,
    log::Warning,
    parse::{parse_effect, parse_requirement, split_any, ParseContext},
    story::{ChoiceId, Effect, Story},
    text::random_range_int,
};

/// Parse a `>` jump line against the choice it is attached to.
pub(crate) fn parse_jump(
    story: &mut Story,
    line: &str,
    choice: ChoiceId,
    ctx: &mut ParseContext,
) -> Option<Effect> {
    let line = line.trim();
    let skip_text = line.starts_with(">>");

    let mut target = line
        .trim_matches('>')
        .trim_matches('-')
        .trim_matches('!')
        .trim()
        .to_string();

    let mut guard = None;
    let mut or_else = None;

    if line.trim_matches('>').trim().starts_with("if ") {
        let body = line.trim_matches('>').trim()["if ".len()..].to_string();
        let parts = split_any(&body, &["?", ":"]);

        if parts.len() < 2 || parts.len() > 3 {
            ctx.logger.warn(
                Warning::InvalidJump {
                    line: line.to_string(),
                },
                None,
            );
            return None;
        }

        guard = Some(parse_requirement(
            &format!("~if {}", parts[0].trim()),
            story.id(),
            ctx.registry,
            ctx.logger,
        )?);

        target = parts[1].trim().to_string();

        if parts.len() == 3 {
            let else_line = format!("{}{}", if skip_text { ">> " } else { "> " }, parts[2].trim());
            let else_jump = parse_jump(story, &else_line, choice, ctx)?;
            or_else = Some(Box::new(else_jump));
        }
    }

    if line.starts_with(">>>") {
        // once-only return to the decision point
        target = "backonce".to_string();
    }

    let at_entry = story.choice(choice).parent.is_none();
    if target == "back" && at_entry {
        target = "start".to_string();
    } else if target == "backonce" && at_entry {
        target = "startonce".to_string();
    }

    let mut once = false;
    if target == "startonce" {
        once = true;
        target = "start".to_string();
    } else if target == "backonce" {
        once = true;
        target = "back".to_string();
    }

    if target == "start" {
        let root = story.root();
        if story.choice(root).label.is_none() {
            let label = story.generate_label();
            story.choice_mut(root).label = Some(label.clone());
            story.set_label(&label, root);
        }
        target = story.choice(root).label.clone().unwrap();
    } else if target == "back" {
        // return to the last ancestor where the player made a decision
        let mut back = story.choice(choice).parent;

        for _ in 0..100 {
            let id = match back {
                Some(id) => id,
                None => break,
            };
            let node = story.choice(id);
            if node.children.len() > 1 {
                break;
            }
            if !node.children.is_empty() && !story.is_continue(node.children[0]) {
                break;
            }
            back = node.parent;
        }

        let id = match back {
            Some(id) => id,
            None => {
                ctx.logger.warn(
                    Warning::BackTargetNotFound {
                        story: story.id().to_string(),
                    },
                    None,
                );
                return None;
            }
        };

        if story.choice(id).label.is_none() {
            let label = story.generate_label();
            story.choice_mut(id).label = Some(label.clone());
            story.set_label(&label, id);
        }
        target = story.choice(id).label.clone().unwrap();
    } else if target.to_lowercase().starts_with(SNIPPET_PREFIX) {
        let target_lower = target.to_lowercase();
        let key = &target_lower[SNIPPET_PREFIX.len()..];

        // snippets must be defined above their first reference
        let snippet = match ctx.snippets.get(key) {
            Some(snippet) => snippet.clone(),
            None => {
                ctx.logger.warn(
                    Warning::SnippetNotFound {
                        target: target_lower.clone(),
                    },
                    None,
                );
                return None;
            }
        };

        if !story.has_label(&target_lower) {
            story.graft_snippet(&snippet, &target_lower);
        }
    }

    if once {
        add_once(story, choice, false, false, ctx);
    }

    let mut jump = Effect::jump_to(&target.to_lowercase(), skip_text, line.to_string());
    jump.guard = guard;
    jump.or_else = or_else;

    Some(jump)
}

/// Guard a choice so it can only be taken once.
///
/// Backs both `~once` (and its `once_today`/`once_ever` variants) and the
/// `>>>`/`backonce` jumps. The guard and its companion write use a variable
/// name derived from the story id and the choice's document index, so
/// repeated parses of the same source generate the same name.
pub(crate) fn add_once(
    story: &mut Story,
    choice: ChoiceId,
    once_today: bool,
    once_ever: bool,
    ctx: &mut ParseContext,
) {
    let index = choice.index();
    let seed = format!("once{}-{}", story.id(), index);
    let var_id = format!("once{}", random_range_int(0, 9_999_999, &seed));

    // the guard goes where the player made the decision, above page breaks
    let top = story.last_non_continue(choice);

    let (req_line, set_line) = if once_ever {
        // story flags persist for the rest of the game
        (
            format!("~if !story_{}", var_id),
            format!("~set story_{}", var_id),
        )
    } else if once_today {
        // never happened (-1), or happened in an earlier month (1+)
        (
            format!("~if story_{} != 0", var_id),
            format!("~set story_{}", var_id),
        )
    } else {
        // vars are cleared when the story ends
        (
            format!("~if !var_{}", var_id),
            format!("~set var_{}", var_id),
        )
    };

    if let Some(req) = parse_requirement(&req_line, story.id(), ctx.registry, ctx.logger) {
        story.choice_mut(top).requirements.push(req);
    }
    if let Some(effect) = parse_effect(&set_line, &[], ctx.registry, ctx.logger) {
        story.choice_mut(top).effects.push(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{call::CallRegistry, log::Logger, story::EffectKind};

    use std::collections::{HashMap, HashSet};

    struct Fixture {
        registry: CallRegistry,
        logger: Logger,
        snippets: HashMap<String, Story>,
        known_ids: HashSet<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                registry: CallRegistry::new(),
                logger: Logger::default(),
                snippets: HashMap::new(),
                known_ids: HashSet::new(),
            }
        }

        fn ctx(&mut self) -> ParseContext {
            ParseContext {
                registry: &self.registry,
                logger: &mut self.logger,
                snippets: &mut self.snippets,
                known_ids: &mut self.known_ids,
            }
        }
    }

    fn story_with_child() -> (Story, ChoiceId) {
        let mut story = Story::new();
        story.set_id("test");

        let root = story.root();
        let mut child = crate::story::Choice::new();
        child.parent = Some(root);
        child.depth = 1;
        child.set_button_text("Go on");
        let child = story.push(child);
        story.choice_mut(root).children.push(child);

        (story, child)
    }

    #[test]
    fn plain_jump_keeps_target_text() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        let jump = parse_jump(&mut story, "> question2", child, &mut fixture.ctx()).unwrap();

        let jump = jump.jump().unwrap();
        assert_eq!(jump.target, "question2");
        assert!(!jump.skip_text);
    }

    #[test]
    fn double_marker_skips_target_text() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        let jump = parse_jump(&mut story, ">> question3", child, &mut fixture.ctx()).unwrap();

        assert!(jump.jump().unwrap().skip_text);
    }

    #[test]
    fn start_jump_labels_the_entry_choice() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        let jump = parse_jump(&mut story, ">> start", child, &mut fixture.ctx()).unwrap();

        let target = &jump.jump().unwrap().target;
        assert_eq!(story.label_target(target), Some(story.root()));
    }

    #[test]
    fn back_jump_resolves_to_the_decision_ancestor() {
        let (mut story, first) = story_with_child();

        // a second option makes the root a real decision point
        let mut second = crate::story::Choice::new();
        second.parent = Some(story.root());
        second.depth = 1;
        second.set_button_text("Or not");
        let second = story.push(second);
        let root = story.root();
        story.choice_mut(root).children.push(second);

        // a page break under the first option
        let mut page = crate::story::Choice::new();
        page.parent = Some(first);
        page.set_button_text("...");
        let page = story.push(page);
        story.choice_mut(first).children.push(page);

        let mut fixture = Fixture::new();
        let jump = parse_jump(&mut story, "> back", page, &mut fixture.ctx()).unwrap();

        // the walk passes the page and its single-child parent, stopping at
        // the choice where the player actually decided
        let target = &jump.jump().unwrap().target;
        assert_eq!(story.label_target(target), Some(story.root()));
    }

    #[test]
    fn triple_marker_becomes_a_once_guarded_back_jump() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        let jump = parse_jump(&mut story, ">>> ", child, &mut fixture.ctx()).unwrap();

        // jump goes back to the decision ancestor, here the entry choice
        let target = &jump.jump().unwrap().target;
        assert_eq!(story.label_target(target), Some(story.root()));

        // and the choice gained a once-guard plus its companion write
        assert_eq!(story.choice(child).requirements.len(), 1);
        assert_eq!(story.choice(child).effects.len(), 1);
    }

    #[test]
    fn once_variable_names_are_stable_across_parses() {
        let names: Vec<String> = (0..2)
            .map(|_| {
                let (mut story, child) = story_with_child();
                let mut fixture = Fixture::new();
                add_once(&mut story, child, false, false, &mut fixture.ctx());

                match &story.choice(child).effects[0].kind {
                    EffectKind::Var { key, .. } => key.clone(),
                    other => panic!("expected var effect, got {:?}", other),
                }
            })
            .collect();

        assert_eq!(names[0], names[1]);
        assert!(names[0].starts_with("once"));
    }

    #[test]
    fn conditional_jump_carries_guard_and_else() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        let jump = parse_jump(
            &mut story,
            "> if skill ? label1 : label2",
            child,
            &mut fixture.ctx(),
        );

        // `skill` is not a known namespace, so the guard fails to parse
        assert!(jump.is_none());

        let jump = parse_jump(
            &mut story,
            "> if mem_brave ? label1 : label2",
            child,
            &mut fixture.ctx(),
        )
        .unwrap();

        assert!(jump.guard.is_some());
        assert_eq!(jump.jump().unwrap().target, "label1");
        assert_eq!(
            jump.or_else.as_ref().unwrap().jump().unwrap().target,
            "label2"
        );
    }

    #[test]
    fn snippet_jump_grafts_the_snippet_once() {
        let mut snippet = Story::new();
        snippet.set_id("snippet_doneboss");
        snippet.choice_mut(snippet.root()).text = "The boss nods.".to_string();

        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();
        fixture.snippets.insert("doneboss".to_string(), snippet);

        let before = story.len();
        let jump =
            parse_jump(&mut story, "> snippet_doneboss", child, &mut fixture.ctx()).unwrap();

        assert_eq!(jump.jump().unwrap().target, "snippet_doneboss");
        assert!(story.len() > before);
        assert!(story.has_label("snippet_doneboss"));

        // a second jump reuses the grafted copy
        let len = story.len();
        parse_jump(&mut story, "> snippet_doneboss", child, &mut fixture.ctx()).unwrap();
        assert_eq!(story.len(), len);
    }

    #[test]
    fn unknown_snippets_fail_with_a_warning() {
        let (mut story, child) = story_with_child();
        let mut fixture = Fixture::new();

        assert!(parse_jump(&mut story, "> snippet_missing", child, &mut fixture.ctx()).is_none());
        assert_eq!(fixture.logger.len(), 1);
    }
}
