//! Line-oriented parser building story graphs from source text.
//!
//! Each line's first character selects what it is: `===` story headers,
//! `=` labels, `~` directives, `>` jumps, `*` choice bullets, `-` page
//! breaks, comment markers, or plain result text accumulated into the
//! current choice.

use crate::{
    consts::{
        BLOCK_COMMENT_CLOSE, BLOCK_COMMENT_OPEN, CALL_ADVANCE_MONTH, CALL_BATTLE, CALL_GO_HOME,
        CHOICE_MARKER, COMMENT_MARKER, CONTINUE_TEXT, DIRECTIVE_MARKER, END_LABEL, JUMP_MARKER,
        LABEL_MARKER, LINE_COMMENT, MAX_BUTTON_LENGTH, PAGE_BREAK_LINE, SNIPPET_PREFIX,
        STORY_MARKER,
    },
    error::MetaData,
    log::Warning,
    parse::{add_once, parse_conditional_effect, parse_effect, parse_jump, parse_requirement, ParseContext},
    story::{Choice, ChoiceId, Story},
};

/// Characters replaced with plain equivalents before parsing.
const SCRUBBED: [(char, &'static str); 5] = [
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2019}', "'"),
    ('\t', " "),
    ('\u{2014}', "-"),
];

/// Parse one source file's worth of story script.
///
/// Returns every story in document order, snippet stories included (they
/// are also registered with the context for later grafting). `file_name`
/// is only used in diagnostics.
pub(crate) fn parse_source(content: &str, file_name: &str, ctx: &mut ParseContext) -> Vec<Story> {
    let lines: Vec<&str> = content.lines().collect();

    if lines
        .first()
        .map_or(false, |line| line.trim() == "~disabled")
    {
        return Vec::new();
    }

    let mut parser = LineParser {
        story: Story::new(),
        current: ChoiceId(0),
        buffer: String::new(),
        in_text: false,
        stories: Vec::new(),
    };
    parser.current = parser.story.root();

    let mut in_comment = false;

    for (index, raw) in lines.iter().enumerate() {
        let meta = MetaData::new(index);
        let mut line = raw.trim().to_string();

        // blank lines become paragraph breaks inside result text
        if line.is_empty() {
            if parser.in_text && !in_comment && !parser.buffer.is_empty() {
                parser.buffer.push('\n');
            }
            continue;
        }

        let was_in_text = parser.in_text;
        parser.in_text = false;

        if in_comment {
            if line.contains(BLOCK_COMMENT_CLOSE) {
                in_comment = false;
            }
            parser.in_text = was_in_text;
            continue;
        }

        // end-of-line comments
        if !line.starts_with(LINE_COMMENT) {
            if let Some(position) = line.find(LINE_COMMENT) {
                line = line[..position].trim().to_string();
            }
        }

        if SCRUBBED.iter().any(|(c, _)| line.contains(*c)) {
            ctx.logger.warn(
                Warning::InvalidCharacters { line: line.clone() },
                Some(&meta),
            );
            for (find, replace) in SCRUBBED.iter() {
                line = line.replace(*find, replace);
            }
        }

        if !line.starts_with('~') && line.contains('~') {
            ctx.logger
                .warn(Warning::StrayTilde { line: line.clone() }, Some(&meta));
            line = line.replace('~', "-");
        }

        match line.chars().next().unwrap() {
            COMMENT_MARKER => {
                parser.in_text = was_in_text;
            }

            LABEL_MARKER => parser.handle_label(&line, &meta, ctx),

            DIRECTIVE_MARKER => parser.handle_directive(&line, &meta, ctx),

            JUMP_MARKER => parser.handle_jump(&line, &meta, ctx),

            CHOICE_MARKER => parser.handle_bullet(&line, &meta, ctx),

            _ => {
                if line.starts_with(LINE_COMMENT) {
                    parser.in_text = was_in_text;
                } else if line.starts_with(BLOCK_COMMENT_OPEN) {
                    if !line.contains(BLOCK_COMMENT_CLOSE) {
                        in_comment = true;
                    }
                    parser.in_text = was_in_text;
                } else if line == PAGE_BREAK_LINE {
                    parser.add_page_break(ctx);
                } else {
                    parser.append_text(&line, was_in_text, ctx);
                }
            }
        }
    }

    if parser.story.id().is_empty() {
        ctx.logger.warn(
            Warning::NoStoriesInFile {
                file: file_name.to_string(),
            },
            None,
        );
    } else {
        parser.current = parser.finish_choice(parser.current, false, ctx);
        parser.finish_story(ctx);
    }

    parser.stories
}

struct LineParser {
    story: Story,
    current: ChoiceId,
    buffer: String,
    in_text: bool,
    stories: Vec<Story>,
}

impl LineParser {
    /// `===id===` starts a new story; `=label` labels the current choice.
    fn handle_label(&mut self, line: &str, meta: &MetaData, ctx: &mut ParseContext) {
        if line.starts_with(STORY_MARKER) {
            let id = line.trim_matches('=').trim().to_string();

            if !self.story.id().is_empty() {
                self.current = self.finish_choice(self.current, false, ctx);
                self.finish_story(ctx);

                self.story = Story::new();
                self.current = self.story.root();
            }

            if ctx.known_ids.contains(&id.to_lowercase()) {
                ctx.logger.warn(
                    Warning::DuplicateStoryId {
                        id: id.to_lowercase(),
                    },
                    Some(meta),
                );
            }
            ctx.known_ids.insert(id.to_lowercase());
            self.story.set_id(&id);
        } else {
            let label = line.trim_matches('=').trim().to_string();
            let choice = self.story.choice_mut(self.current);

            if let Some(old) = &choice.label {
                ctx.logger.warn(
                    Warning::LabelOverwritten {
                        old: old.clone(),
                        new: label.clone(),
                    },
                    Some(meta),
                );
            }
            choice.label = Some(label);
        }
    }

    /// `~if`, `~ifd`, `~set`, `~call`, `~setif`, `~callif`, `~once`.
    fn handle_directive(&mut self, line: &str, meta: &MetaData, ctx: &mut ParseContext) {
        let line = if line.starts_with("~ ") {
            format!("~{}", line["~".len()..].trim())
        } else {
            line.to_string()
        };

        if line.starts_with("~if once") || line.starts_with("~set once") || line.starts_with("~once")
        {
            if line.ends_with("once_today")
                || line.ends_with("once_week")
                || line.ends_with("once_month")
            {
                add_once(&mut self.story, self.current, true, false, ctx);
            } else if line.ends_with("once_ever") {
                add_once(&mut self.story, self.current, false, true, ctx);
            } else {
                add_once(&mut self.story, self.current, false, false, ctx);
            }
        } else if line.starts_with("~if") {
            let requirement =
                parse_requirement(&line, self.story.id(), ctx.registry, ctx.logger);

            if let Some(mut requirement) = requirement {
                if self.current == self.story.root() && requirement.show_disabled {
                    ctx.logger.warn(
                        Warning::EntryChoiceDisabled { line: line.clone() },
                        Some(meta),
                    );
                    requirement.show_disabled = false;
                }
                self.story
                    .choice_mut(self.current)
                    .requirements
                    .push(requirement);
            }
        } else if line.starts_with("~set ") || line.starts_with("~call ") {
            let effect = match parse_effect(
                &line,
                &self.story.choice(self.current).effects,
                ctx.registry,
                ctx.logger,
            ) {
                Some(effect) => effect,
                None => return,
            };

            // page out pending text before anything that opens another screen
            if effect.is_disruptive_call() && !self.buffer.is_empty() {
                self.add_page_break(ctx);
                self.in_text = false;

                let button = if effect.is_call(CALL_GO_HOME) {
                    "Done"
                } else if effect.is_call(CALL_BATTLE) {
                    "Challenge!"
                } else {
                    "Time Passes"
                };
                self.story
                    .choice_mut(self.current)
                    .set_button_text(button);
            }

            self.story.choice_mut(self.current).effects.push(effect);
        } else if line.starts_with("~setif ") || line.starts_with("~callif ") {
            let effect = parse_conditional_effect(
                &line,
                self.story.id(),
                &self.story.choice(self.current).effects,
                ctx.registry,
                ctx.logger,
            );

            if let Some(effect) = effect {
                self.story.choice_mut(self.current).effects.push(effect);
            }
        } else {
            ctx.logger
                .warn(Warning::InvalidLine { line }, Some(meta));
        }
    }

    /// `>` jump lines.
    fn handle_jump(&mut self, line: &str, meta: &MetaData, ctx: &mut ParseContext) {
        {
            let choice = self.story.choice(self.current);
            let mut jumps = choice.jumps();

            if let Some((first, _)) = jumps.next() {
                if first.guard.is_none() {
                    ctx.logger.warn(
                        Warning::JumpAlreadyPresent {
                            line: line.to_string(),
                        },
                        Some(meta),
                    );
                    return;
                }
            }
        }

        if line
            .trim_matches('>')
            .trim_matches('!')
            .trim()
            .to_lowercase()
            == END_LABEL
        {
            // dead ends jump to `end` on their own
            ctx.logger.warn(
                Warning::JumpToEndLabel {
                    line: line.to_string(),
                },
                Some(meta),
            );
            return;
        }

        // `>` pages pending text out first; `>!`, `>>` and `>if` do not
        let conditional = line.trim_matches('>').trim().starts_with("if ");
        if !line.starts_with(">!") && !line.starts_with(">>") && !conditional && !self.buffer.is_empty()
        {
            self.add_page_break(ctx);
            self.in_text = false;
        }

        let jump = match parse_jump(&mut self.story, line, self.current, ctx) {
            Some(jump) => jump,
            None => {
                ctx.logger.warn(
                    Warning::InvalidJump {
                        line: line.to_string(),
                    },
                    Some(meta),
                );
                return;
            }
        };

        if jump.guard.is_some() && jump.or_else.is_none() {
            // a guarded jump with no else falls through to the next page,
            // so the jump stays here and parsing continues below the break
            let origin = self.current;
            self.add_page_break(ctx);
            self.in_text = false;
            self.story.choice_mut(origin).effects.push(jump);
        } else {
            self.story.choice_mut(self.current).effects.push(jump);
        }
    }

    /// `*` choice bullets; star count is nesting depth.
    fn handle_bullet(&mut self, line: &str, meta: &MetaData, ctx: &mut ParseContext) {
        self.current = self.finish_choice(self.current, false, ctx);

        let depth = line.len() - line.trim_start_matches('*').len();
        let prev = self.current;
        let prev_depth = self.story.choice(prev).depth;

        let (parent, depth) = if depth >= prev_depth + 1 {
            if depth > prev_depth + 1 {
                ctx.logger.warn(
                    Warning::ChoiceDepthSkip {
                        line: line.to_string(),
                    },
                    Some(meta),
                );
            }
            (prev, prev_depth + 1)
        } else {
            // walk up to an ancestor exactly one level shallower
            let mut ancestor = prev;
            loop {
                if depth == self.story.choice(ancestor).depth + 1 {
                    break;
                }
                match self.story.choice(ancestor).parent {
                    Some(parent) => ancestor = parent,
                    None => break,
                }
            }

            let mut depth = depth;
            if depth != self.story.choice(ancestor).depth + 1 {
                ctx.logger.warn(
                    Warning::ChoiceDepthNoParent {
                        line: line.to_string(),
                    },
                    Some(meta),
                );
                depth = self.story.choice(ancestor).depth + 1;
            }
            (ancestor, depth)
        };

        let mut choice = Choice::new();
        choice.parent = Some(parent);
        choice.depth = depth;
        let id = self.story.push(choice);
        self.story.choice_mut(parent).children.push(id);

        let button = line.trim_matches('*').trim().to_string();

        if button.starts_with('=') {
            // `*= label` is a hidden, jump-only choice
            let label = button.trim_matches('=').trim().to_string();
            self.story.choice_mut(id).label = Some(label);
        } else {
            if button.len() > MAX_BUTTON_LENGTH {
                ctx.logger.warn(
                    Warning::LongButtonText {
                        text: button.clone(),
                    },
                    Some(meta),
                );
            }
            self.story.choice_mut(id).set_button_text(&button);
        }

        self.current = id;
    }

    /// Plain result text.
    fn append_text(&mut self, line: &str, was_in_text: bool, ctx: &mut ParseContext) {
        self.in_text = true;

        if !self.buffer.is_empty() && !was_in_text {
            ctx.logger.warn(
                Warning::TextResumed {
                    story: self.story.id().to_string(),
                },
                None,
            );
        }
        self.buffer.push_str(line);

        // conditional tags that own their whole line do not break the flow
        let inline_tag = (line.starts_with("[if") || line.starts_with("[else"))
            && line.ends_with(']')
            && !line.ends_with("[end]");
        if !inline_tag {
            self.buffer.push('\n');
        }
    }

    /// `-` page break: move pending text into the current choice and hang a
    /// `...` continuation under it. Jumps always sink to the lowest page.
    fn add_page_break(&mut self, ctx: &mut ParseContext) {
        if self.buffer.is_empty() {
            if self.story.choice(self.current).has_jump() {
                // a jump-only page needs no further break before the jump
                return;
            }
            if !self.story.choice(self.current).has_call(CALL_ADVANCE_MONTH) {
                ctx.logger.warn(
                    Warning::PageBreakWithoutContent {
                        story: self.story.id().to_string(),
                    },
                    None,
                );
            }
        }

        let current = self.current;

        let mut next = Choice::new();
        next.set_button_text(CONTINUE_TEXT);
        next.depth = self.story.choice(current).depth;
        next.parent = Some(current);
        let next = self.story.push(next);
        self.story.choice_mut(current).children.push(next);

        // jumps move down to the new page; requirements and sets stay
        let mut moved = Vec::new();
        let effects = &mut self.story.choice_mut(current).effects;
        let mut index = 0;
        while index < effects.len() {
            if effects[index].is_jump() {
                moved.push(effects.remove(index));
            } else {
                index += 1;
            }
        }
        self.story.choice_mut(next).effects.extend(moved);

        self.finish_choice(current, false, ctx);
        self.current = next;
    }

    /// Demote a labelled `end` choice into a blank holder with the text on
    /// a continuation page below it.
    fn add_page_break_before(&mut self, id: ChoiceId, ctx: &mut ParseContext) -> ChoiceId {
        let label = self.story.choice(id).label.clone();
        let button = self.story.choice(id).button_text.clone();
        let depth = self.story.choice(id).depth;
        let parent = self.story.choice(id).parent;

        let mut holder = Choice::new();
        holder.label = label;
        holder.button_text = button;
        holder.depth = depth;
        holder.parent = parent;
        let holder = self.story.push(holder);
        self.story.choice_mut(holder).children.push(id);

        if let Some(parent) = parent {
            let children = &mut self.story.choice_mut(parent).children;
            children.retain(|child| *child != id);
            children.push(holder);
        }
        if self.story.root() == id {
            self.story.set_root(holder);
        }

        let demoted = self.story.choice_mut(id);
        demoted.label = None;
        demoted.set_button_text(CONTINUE_TEXT);
        demoted.parent = Some(holder);

        // requirements move up to the holder; sets, jumps and text stay
        let requirements = std::mem::replace(
            &mut self.story.choice_mut(id).requirements,
            Vec::new(),
        );
        self.story
            .choice_mut(holder)
            .requirements
            .extend(requirements);

        self.finish_choice(holder, true, ctx);
        id
    }

    /// Flush pending text into a choice just before moving on.
    ///
    /// Returns the choice parsing continues from, which differs from the
    /// input when an `end` label forces a leading page break.
    fn finish_choice(
        &mut self,
        id: ChoiceId,
        no_page_breaks: bool,
        ctx: &mut ParseContext,
    ) -> ChoiceId {
        if !self.story.choice(id).text.is_empty() && !self.buffer.is_empty() {
            ctx.logger.warn(
                Warning::TextResumed {
                    story: self.story.id().to_string(),
                },
                None,
            );
            let buffer = std::mem::replace(&mut self.buffer, String::new());
            self.story.choice_mut(id).text.push_str(&buffer);
        } else if !self.buffer.is_empty() {
            let buffer = std::mem::replace(&mut self.buffer, String::new());
            self.story.choice_mut(id).text = buffer;
        }

        if self.story.choice(id).text.is_empty() {
            return id;
        }

        if self.story.choice(id).label.as_deref() == Some(END_LABEL) && !no_page_breaks {
            // the end label starts blank; its text moves below a page break
            return self.add_page_break_before(id, ctx);
        }

        id
    }

    /// Finalize the story under construction and queue it for output.
    fn finish_story(&mut self, ctx: &mut ParseContext) {
        let mut story = std::mem::replace(&mut self.story, Story::new());

        if story.is_snippet() {
            let key = story.id()[SNIPPET_PREFIX.len()..].to_string();
            let root = story.root();
            story.choice_mut(root).set_button_text("Continue");

            if ctx.snippets.contains_key(&key) {
                ctx.logger.warn(
                    Warning::DuplicateStoryId {
                        id: story.id().to_string(),
                    },
                    None,
                );
            }
            ctx.snippets.insert(key, story.clone());
        } else {
            story.finish(ctx.logger);
        }

        self.stories.push(story);
    }
}
