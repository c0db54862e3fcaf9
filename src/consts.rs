// Line-start sentinels
pub const STORY_MARKER: &'static str = "===";
pub const LABEL_MARKER: char = '=';
pub const DIRECTIVE_MARKER: char = '~';
pub const JUMP_MARKER: char = '>';
pub const CHOICE_MARKER: char = '*';
pub const PAGE_BREAK_LINE: &'static str = "-";
pub const COMMENT_MARKER: char = '#';
pub const LINE_COMMENT: &'static str = "//";
pub const BLOCK_COMMENT_OPEN: &'static str = "/*";
pub const BLOCK_COMMENT_CLOSE: &'static str = "*/";

// Reserved labels and prefixes
pub const END_LABEL: &'static str = "end";
pub const SNIPPET_PREFIX: &'static str = "snippet_";
pub const CONTINUE_TEXT: &'static str = "...";

// Call names the parser and runtime treat specially
pub const CALL_BATTLE: &'static str = "battle";
pub const CALL_GO_HOME: &'static str = "gohome";
pub const CALL_ADVANCE_MONTH: &'static str = "incrementmonth";
pub const CALL_RUN_STORY: &'static str = "story";
pub const CALL_SET_NAME: &'static str = "setname";
pub const CALL_SET_INPUT: &'static str = "setinputmem";

// Iteration caps guarding against authored loops
pub const JUMP_CHAIN_LIMIT: usize = 100;
pub const FILTER_PASS_LIMIT: usize = 100;

// File extensions for source and compiled story files
pub const SOURCE_EXTENSION: &'static str = "fab";
pub const COMPILED_EXTENSION: &'static str = "fabc";

// Button text warnings fire past this length
pub const MAX_BUTTON_LENGTH: usize = 45;
