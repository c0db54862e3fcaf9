//! Tests for reading story script source into story graphs.

use fabula::{
    read_stories_from_file, read_stories_from_string, CallRegistry, EffectKind, Logger, Story,
    Warning, WriteOp,
};

fn read(content: &str) -> (Vec<Story>, Logger) {
    let registry = CallRegistry::new();
    let mut logger = Logger::default();
    let stories = read_stories_from_string(content, &registry, &mut logger).unwrap();

    (stories, logger)
}

fn read_one(content: &str) -> Story {
    let (mut stories, _) = read(content);
    assert_eq!(stories.len(), 1, "expected exactly one story");
    stories.remove(0)
}

#[test]
fn story_ids_are_lowercased_with_display_casing_kept() {
    let story = read_one("\
===ShovelIntro===
Digging practice.
");

    assert_eq!(story.id(), "shovelintro");
    assert_eq!(story.display_id(), "ShovelIntro");
}

#[test]
fn extra_equals_signs_around_the_header_are_tolerated() {
    let story = read_one("\
======= shovelIntro ====
Digging practice.
");

    assert_eq!(story.id(), "shovelintro");
}

#[test]
fn several_stories_parse_from_one_file() {
    let (stories, _) = read("\
===first===
One.

===second===
Two.
");

    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].id(), "first");
    assert_eq!(stories[1].id(), "second");
}

#[test]
fn choice_bullets_nest_by_star_count() {
    let story = read_one("\
===nested===
Pick a door.
* Left door
    A broom closet.
    ** Look closer
        Dusty.
* Right door
    A staircase.
");

    let root = story.choice(story.root());
    assert_eq!(root.children.len(), 2);

    let left = story.choice(root.children[0]);
    assert_eq!(left.button_text.as_deref(), Some("Left door"));
    assert_eq!(left.depth, 1);
    assert_eq!(left.children.len(), 1);

    let closer = story.choice(left.children[0]);
    assert_eq!(closer.button_text.as_deref(), Some("Look closer"));
    assert_eq!(closer.depth, 2);

    let right = story.choice(root.children[1]);
    assert_eq!(right.button_text.as_deref(), Some("Right door"));
    assert_eq!(right.depth, 1);
}

#[test]
fn shallower_bullets_walk_back_up_the_tree() {
    let story = read_one("\
===walkup===
Top.
* One
    ** Two
        *** Three
* One again
");

    let root = story.choice(story.root());
    assert_eq!(root.children.len(), 2);
    assert_eq!(
        story.choice(root.children[1]).button_text.as_deref(),
        Some("One again")
    );
}

#[test]
fn too_deep_bullets_are_clamped_with_a_warning() {
    let (stories, logger) = read("\
===clamped===
Top.
* One
    *** Too deep
");

    let story = &stories[0];
    let one = story.choice(story.root()).children[0];
    let deep = story.choice(one).children[0];

    assert_eq!(story.choice(deep).depth, 2);
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::ChoiceDepthSkip { .. })));
}

#[test]
fn page_breaks_split_text_into_continuation_choices() {
    let story = read_one("\
===paged===
First page.
-
Second page.
");

    let root = story.choice(story.root());
    assert_eq!(root.text, "First page.\n");
    assert_eq!(root.children.len(), 1);

    let page = story.choice(root.children[0]);
    assert_eq!(page.button_text.as_deref(), Some("..."));
    assert_eq!(page.text, "Second page.\n");
}

#[test]
fn blank_lines_become_paragraph_breaks() {
    let story = read_one("\
===paragraphs===
First paragraph.

Second paragraph.
");

    assert_eq!(
        story.choice(story.root()).text,
        "First paragraph.\n\nSecond paragraph.\n"
    );
}

#[test]
fn comments_are_stripped_at_every_level() {
    let story = read_one("\
===commented===
# a line comment
// another line comment
Kept text. // trailing comment
/* a block comment
spanning several lines */
Also kept.
");

    assert_eq!(story.choice(story.root()).text, "Kept text.\nAlso kept.\n");
}

#[test]
fn disabled_files_parse_to_nothing() {
    let (stories, _) = read("\
~disabled
===ghost===
Never seen.
");

    assert!(stories.is_empty());
}

#[test]
fn hidden_choices_have_labels_but_no_buttons() {
    let story = read_one("\
===hidden===
Intro.
* Visible choice
    Something.
*= secret
    Only jumps reach this.
");

    let secret = story.label_target("secret").unwrap();
    assert_eq!(story.choice(secret).button_text, None);
    assert_eq!(story.choice(secret).label.as_deref(), Some("secret"));
}

#[test]
fn unlabelled_choices_get_stable_generated_ids() {
    let story = read_one("\
===autoid===
Intro.
* First
    One.
* Second
    Two.
");

    let root = story.choice(story.root());
    assert_eq!(root.label.as_deref(), Some("autoid_1"));

    let first = story.choice(root.children[0]);
    assert_eq!(first.label.as_deref(), Some("autoid_2"));
}

#[test]
fn dead_ends_jump_to_a_declared_end_label() {
    let story = read_one("\
===ending===
Intro.
* Go left
    You went left.
* Go right
    You went right.
* =end
    It is over.
");

    let end = story.label_target("end").unwrap();

    for index in 0..2 {
        let child = story.choice(story.root()).children[index];

        // the jump lands on the lowest page of each dead-end branch
        let mut cursor = child;
        loop {
            let choice = story.choice(cursor);
            if choice.has_jump() {
                let (_, jump) = choice.jumps().next().unwrap();
                assert_eq!(jump.target, "end");
                assert_eq!(story.label_target(&jump.target), Some(end));
                break;
            }
            assert_eq!(choice.children.len(), 1, "no jump found on the branch");
            cursor = choice.children[0];
        }
    }
}

#[test]
fn jumps_sink_below_page_breaks() {
    let story = read_one("\
===sinking===
Intro.
* Choose
    Some text first.
    > target
* =target
    Landed.
");

    // the jump line forced a page break; the jump sits on the new page
    let choose = story.choice(story.root()).children[0];
    assert!(!story.choice(choose).has_jump());

    let page = story.choice(choose).children[0];
    assert!(story.choice(page).has_jump());
    assert_eq!(story.choice(page).button_text.as_deref(), Some("..."));
}

#[test]
fn skip_text_jumps_do_not_force_a_page_break() {
    let story = read_one("\
===noskip===
Intro.
* Choose
    Some text first.
    >> target
* =target
    Landed.
");

    let choose = story.choice(story.root()).children[0];
    assert!(story.choice(choose).has_jump());
    assert!(story.choice(choose).children.is_empty());
}

#[test]
fn second_unconditional_jumps_are_ignored() {
    let (stories, logger) = read("\
===doubled===
Intro.
* Choose
    >> target
    >> elsewhere
* =target
    Landed.
* =elsewhere
    Never.
");

    let story = &stories[0];
    let choose = story.choice(story.root()).children[0];

    assert_eq!(story.choice(choose).jumps().count(), 1);
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::JumpAlreadyPresent { .. })));
}

#[test]
fn explicit_jumps_to_end_are_dropped() {
    let (stories, logger) = read("\
===endjump===
Intro.
* Done
    Finished.
    > end
* =end
    Over.
");

    let story = &stories[0];
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::JumpToEndLabel { .. })));

    // the automatic dead-end jump still applies
    let done = story.choice(story.root()).children[0];
    assert!(story.choice(done).has_jump());
}

#[test]
fn once_directives_guard_the_decision_choice() {
    let content = "\
===oncetest===
Intro.
* Risky option
    ~once
    It only works once.
* Safe option
    Always here.
";

    let story = read_one(content);
    let risky = story.choice(story.root()).children[0];

    assert_eq!(story.choice(risky).requirements.len(), 1);
    let write = story
        .choice(risky)
        .effects
        .iter()
        .find_map(|effect| match &effect.kind {
            EffectKind::Var { key, op } => Some((key.clone(), op.clone())),
            _ => None,
        })
        .expect("once should write a var");

    assert!(write.0.starts_with("once"));
    assert!(matches!(write.1, WriteOp::Assign(..)));

    // the generated variable name is identical across parses
    let reparsed = read_one(content);
    let reparsed_risky = reparsed.choice(reparsed.root()).children[0];
    let reparsed_key = reparsed
        .choice(reparsed_risky)
        .effects
        .iter()
        .find_map(|effect| match &effect.kind {
            EffectKind::Var { key, .. } => Some(key.clone()),
            _ => None,
        })
        .unwrap();

    assert_eq!(write.0, reparsed_key);
}

#[test]
fn battle_calls_page_out_pending_text() {
    let story = read_one("\
===fight===
A wild beast appears.
~call battle(forest)
");

    let root = story.choice(story.root());
    assert_eq!(root.text, "A wild beast appears.\n");
    assert_eq!(root.children.len(), 1);

    let page = story.choice(root.children[0]);
    assert_eq!(page.button_text.as_deref(), Some("Challenge!"));
    assert!(page.has_call("battle"));
}

#[test]
fn go_home_calls_label_the_page_done() {
    let story = read_one("\
===sleepy===
What a day.
~call gohome()
");

    let page = story.choice(story.choice(story.root()).children[0]);
    assert_eq!(page.button_text.as_deref(), Some("Done"));
}

#[test]
fn snippets_graft_into_later_stories_in_the_batch() {
    let (stories, _) = read("\
===snippet_shrug===
They shrug it off.

===conversation===
An awkward pause.
* Change the subject
    > snippet_shrug
");

    let conversation = stories
        .iter()
        .find(|story| story.id() == "conversation")
        .unwrap();

    let grafted = conversation.label_target("snippet_shrug").unwrap();
    assert_eq!(conversation.choice(grafted).text, "They shrug it off.\n");
    assert_eq!(conversation.choice(grafted).button_text, None);

    // grafts are independent copies, not shared references
    let snippet = stories.iter().find(|story| story.is_snippet()).unwrap();
    assert_eq!(
        snippet.choice(snippet.root()).button_text.as_deref(),
        Some("Continue")
    );
}

#[test]
fn smart_quotes_are_scrubbed_with_a_warning() {
    let (stories, logger) = read(
        "===typographic===\n\u{201C}Hello,\u{201D} she said. It\u{2019}s fine.\n",
    );

    assert_eq!(
        stories[0].choice(stories[0].root()).text,
        "\"Hello,\" she said. It's fine.\n"
    );
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::InvalidCharacters { .. })));
}

#[test]
fn entry_choices_cannot_be_shown_disabled() {
    let (stories, logger) = read("\
===entrycheck===
~ifd mem_whatever
Text.
");

    let story = &stories[0];
    assert!(!story.choice(story.root()).requirements[0].show_disabled);
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::EntryChoiceDisabled { .. })));
}

#[test]
fn files_read_the_same_as_strings() {
    let content = "\
===onfile===
Text from a file.
";

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("onfile.fab");
    std::fs::write(&path, content).unwrap();

    let registry = CallRegistry::new();
    let mut logger = Logger::default();
    let stories = read_stories_from_file(&path, &registry, &mut logger).unwrap();

    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id(), "onfile");

    let missing = read_stories_from_file(dir.path().join("absent.fab"), &registry, &mut logger);
    assert!(missing.is_err());
}

#[test]
fn outlines_render_the_choice_tree() {
    let story = read_one("\
===outlined===
Intro.
* Go
    Gone.
");

    let outline = story.to_outline();

    assert!(outline.contains("outlined"));
    assert!(outline.contains("* Go"));
    assert!(outline.contains("Gone."));
}
