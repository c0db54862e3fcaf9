//! Compiling stories to a compact binary form and loading them back.
//!
//! One compiled file holds every story of one source file: a small header
//! (magic, format version, story count) followed by one record per story.
//! Records are recursive: a story embeds its choice tree, choices embed
//! their requirements and effects, and everything encodes with `bincode`, which writes
//! strings length-prefixed and options as a single tag byte.
//!
//! Output is deterministic: compiling the same source twice yields
//! byte-identical files, which the modification-time staleness check and
//! content diffing both rely on.

mod record;

pub use record::{ChoiceRecord, StoryRecord};

use crate::{error::CompileError, log::Logger, story::Story};

use std::convert::TryFrom;

const MAGIC: [u8; 4] = *b"FABC";
const VERSION: u32 = 1;

/// Serialize a batch of stories into compiled bytes.
pub fn compile_stories(stories: &[Story]) -> Result<Vec<u8>, CompileError> {
    let mut bytes = Vec::new();

    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(stories.len() as u32).to_le_bytes());

    for story in stories {
        let record = StoryRecord::from_story(story);
        bincode::serialize_into(&mut bytes, &record)?;
    }

    Ok(bytes)
}

/// Deserialize compiled bytes back into finalized stories.
///
/// Finalization (label registration, dead-end jumps) is re-run on every
/// decoded story, so loading a compiled file and parsing its source yield
/// equivalent graphs.
pub fn load_compiled(bytes: &[u8], logger: &mut Logger) -> Result<Vec<Story>, CompileError> {
    if bytes.len() < 12 || bytes[..4] != MAGIC {
        return Err(CompileError::BadMagic);
    }

    let version = u32::from_le_bytes(<[u8; 4]>::try_from(&bytes[4..8]).unwrap());
    if version != VERSION {
        return Err(CompileError::BadVersion {
            found: version,
            expected: VERSION,
        });
    }

    let count = u32::from_le_bytes(<[u8; 4]>::try_from(&bytes[8..12]).unwrap());

    let mut reader = &bytes[12..];
    let mut stories = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let record: StoryRecord = bincode::deserialize_from(&mut reader)?;
        stories.push(record.into_story(logger));
    }

    Ok(stories)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{call::CallRegistry, parse::read_stories_from_string};

    const CONTENT: &str = "\
===gardenIntro===
~if mem_metmom
~set var_mood = curious
A garden stretches out before you.
* Smell the flowers
    ~set mem_smelled++
    The pollen tickles.
    >> start
* Leave
    =end
    You turn away.
";

    fn parse(content: &str) -> Vec<Story> {
        let registry = CallRegistry::new();
        let mut logger = Logger::default();
        read_stories_from_string(content, &registry, &mut logger).unwrap()
    }

    #[test]
    fn compiling_is_deterministic() {
        let first = compile_stories(&parse(CONTENT)).unwrap();
        let second = compile_stories(&parse(CONTENT)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn compiled_stories_round_trip() {
        let stories = parse(CONTENT);
        let bytes = compile_stories(&stories).unwrap();

        let mut logger = Logger::default();
        let loaded = load_compiled(&bytes, &mut logger).unwrap();

        assert_eq!(loaded.len(), stories.len());

        let original = &stories[0];
        let loaded = &loaded[0];

        assert_eq!(loaded.id(), original.id());
        assert_eq!(loaded.display_id(), original.display_id());
        assert_eq!(loaded.to_outline(), original.to_outline());

        let original_root = original.choice(original.root());
        let loaded_root = loaded.choice(loaded.root());

        assert_eq!(loaded_root.requirements, original_root.requirements);
        assert_eq!(loaded_root.effects, original_root.effects);
        assert_eq!(loaded_root.text, original_root.text);
    }

    #[test]
    fn truncated_files_are_rejected() {
        let bytes = compile_stories(&parse(CONTENT)).unwrap();

        let mut logger = Logger::default();

        assert!(matches!(
            load_compiled(&bytes[..2], &mut logger),
            Err(CompileError::BadMagic)
        ));
        assert!(load_compiled(&bytes[..bytes.len() - 4], &mut logger).is_err());
    }

    #[test]
    fn version_mismatches_are_rejected() {
        let mut bytes = compile_stories(&parse(CONTENT)).unwrap();
        bytes[4] = 99;

        let mut logger = Logger::default();

        assert!(matches!(
            load_compiled(&bytes, &mut logger),
            Err(CompileError::BadVersion { found: 99, .. })
        ));
    }
}
