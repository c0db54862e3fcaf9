//! Tests for the compiled story cache and its staleness handling.

use fabula::{CallRegistry, Logger, StoryLibrary, Warning};

use std::fs;
use std::thread;
use std::time::Duration;

const SOURCE: &str = "\
===cached===
~set mem_seen
A line of text.
* Onward
    More text.

===snippet_wave===
A small wave.

===caller===
Greetings.
* Wave back
    > snippet_wave
";

#[test]
fn first_load_compiles_and_second_load_reads_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("stories.fab");
    fs::write(&source_path, SOURCE).unwrap();

    // keep the compiled file measurably newer than the source, even on
    // file systems with coarse timestamps
    thread::sleep(Duration::from_millis(1100));

    let registry = CallRegistry::new();

    // first load parses the source and writes the compiled neighbor
    let mut logger = Logger::default();
    let mut library = StoryLibrary::new();
    library.load_dir(dir.path(), &registry, &mut logger).unwrap();
    library.validate(&registry, &mut logger);

    let compiled_path = dir.path().join("stories.fabc");
    assert!(compiled_path.exists());
    assert_eq!(library.len(), 2);
    assert!(logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::UncompiledStoryFile { .. })));

    // second load takes the compiled file and reproduces the same batch
    let mut logger = Logger::default();
    let mut reloaded = StoryLibrary::new();
    reloaded.load_dir(dir.path(), &registry, &mut logger).unwrap();
    reloaded.validate(&registry, &mut logger);

    assert!(!logger
        .iter()
        .any(|message| matches!(message.warning(), Warning::UncompiledStoryFile { .. })));
    assert_eq!(reloaded.len(), 2);

    let original = library.story("cached").unwrap();
    let restored = reloaded.story("cached").unwrap();
    assert_eq!(restored.to_outline(), original.to_outline());

    // snippets grafted at parse time survive the binary round trip
    let caller = reloaded.story("caller").unwrap();
    assert!(caller.has_label("snippet_wave"));
}

#[test]
fn editing_the_source_triggers_recompilation() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("stories.fab");
    fs::write(&source_path, SOURCE).unwrap();

    let registry = CallRegistry::new();

    let mut logger = Logger::default();
    let mut library = StoryLibrary::new();
    library.load_dir(dir.path(), &registry, &mut logger).unwrap();

    let compiled_path = dir.path().join("stories.fabc");
    let first_compiled = fs::read(&compiled_path).unwrap();

    // make sure the rewritten source is measurably newer, even on file
    // systems with coarse timestamps
    thread::sleep(Duration::from_millis(1100));
    fs::write(&source_path, "===changed===\nDifferent text now.\n").unwrap();

    let mut logger = Logger::default();
    let mut library = StoryLibrary::new();
    library.load_dir(dir.path(), &registry, &mut logger).unwrap();

    let second_compiled = fs::read(&compiled_path).unwrap();

    assert_ne!(first_compiled, second_compiled);
    assert!(library.story("changed").is_some());
    assert!(library.story("cached").is_none());
}

#[test]
fn recompiling_identical_source_is_byte_identical() {
    let registry = CallRegistry::new();

    let compile_once = || {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stories.fab"), SOURCE).unwrap();

        let mut logger = Logger::default();
        let mut library = StoryLibrary::new();
        library.load_dir(dir.path(), &registry, &mut logger).unwrap();

        fs::read(dir.path().join("stories.fabc")).unwrap()
    };

    assert_eq!(compile_once(), compile_once());
}
