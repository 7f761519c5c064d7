//! Markdown scene ingestion.
//!
//! Each scene is authored as a Markdown file: YAML frontmatter (at least an
//! `id`), text blocks separated by `---` rules, and an optional trailing
//! `### Choices` section of lines shaped like
//! `- Label (requires: a, !b) (sets: c) -> target`. Text blocks are rendered
//! to HTML here, once, at ingestion time.

use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Parser, html};
use serde::Deserialize;
use storyweave_core::error::EngineError;
use storyweave_core::types::{Requirement, SceneId};

use crate::table::StoryTable;
use crate::types::{Choice, Scene};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Frontmatter {
    id: Option<String>,
    bg: Option<String>,
    music: Option<String>,
    chars: Vec<String>,
    set_flags: Vec<String>,
    set_key_flags: Vec<String>,
    clear_flags: Vec<String>,
}

/// Parses one scene source file. `fallback_id` (usually the file stem) is
/// used when the frontmatter has no `id`.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] when the frontmatter is not valid
/// YAML.
pub fn parse_scene(source: &str, fallback_id: &str) -> Result<Scene, EngineError> {
    let (frontmatter, body) = split_frontmatter(source)?;

    let (text_part, choices_part) = split_choices_section(body);
    let text_blocks: Vec<String> = text_part
        .split("\n---\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(render_html)
        .collect();
    let choices = choices_part.map(parse_choices).unwrap_or_default();

    Ok(Scene {
        id: SceneId::new(frontmatter.id.as_deref().unwrap_or(fallback_id)),
        bg: frontmatter.bg,
        music: frontmatter.music,
        chars: frontmatter.chars,
        set_flags: frontmatter.set_flags,
        set_key_flags: frontmatter.set_key_flags,
        clear_flags: frontmatter.clear_flags,
        text_blocks,
        choices,
    })
}

/// Loads every `*.md` file under `dir` (recursively, sorted) into a table.
///
/// # Errors
///
/// Returns [`EngineError::Storage`] on I/O failure and
/// [`EngineError::Validation`] on the first unparsable scene.
pub fn load_story_dir(dir: &Path) -> Result<StoryTable, EngineError> {
    let mut paths = Vec::new();
    collect_markdown(dir, &mut paths)?;
    paths.sort();

    let mut table = StoryTable::new();
    for path in paths {
        let source = fs::read_to_string(&path)
            .map_err(|e| EngineError::Storage(format!("{}: {e}", path.display())))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let scene = parse_scene(&source, &stem)
            .map_err(|e| EngineError::Validation(format!("{}: {e}", path.display())))?;
        tracing::debug!(scene = %scene.id, path = %path.display(), "scene ingested");
        table.insert(scene);
    }
    Ok(table)
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), EngineError> {
    let entries =
        fs::read_dir(dir).map_err(|e| EngineError::Storage(format!("{}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::Storage(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

fn split_frontmatter(source: &str) -> Result<(Frontmatter, &str), EngineError> {
    let Some(rest) = source.strip_prefix("---\n") else {
        return Ok((Frontmatter::default(), source));
    };
    let Some(end) = rest.find("\n---\n") else {
        return Ok((Frontmatter::default(), source));
    };
    let frontmatter: Frontmatter = serde_yaml::from_str(&rest[..end])
        .map_err(|e| EngineError::Validation(format!("frontmatter parse failed: {e}")))?;
    Ok((frontmatter, &rest[end + "\n---\n".len()..]))
}

fn split_choices_section(body: &str) -> (&str, Option<&str>) {
    body.find("### Choices").map_or((body, None), |at| {
        let section = &body[at..];
        let section = section.split_once('\n').map_or("", |(_, rest)| rest);
        (&body[..at], Some(section))
    })
}

fn parse_choices(section: &str) -> Vec<Choice> {
    section
        .lines()
        .filter_map(|line| {
            let line = line.trim().strip_prefix('-')?.trim();
            let (label_part, target) = split_arrow(line)?;

            let (label_part, requires) = extract_annotation(label_part, "requires:");
            let (label_part, sets) = extract_annotation(&label_part, "sets:");

            Some(Choice {
                label: label_part.trim().to_owned(),
                target: (!target.is_empty()).then(|| SceneId::from(target)),
                require_flags: requires.iter().map(|t| Requirement::parse(t)).collect(),
                set_flags: sets,
            })
        })
        .collect()
}

fn split_arrow(line: &str) -> Option<(&str, &str)> {
    let (label, target) = line
        .split_once('→')
        .or_else(|| line.split_once("->"))?;
    Some((label.trim(), target.trim()))
}

/// Strips a `(key: a, b)` annotation out of a label, returning the label
/// without it and the comma-separated values.
fn extract_annotation(label: &str, key: &str) -> (String, Vec<String>) {
    let open = format!("({key}");
    let Some(start) = label.find(&open) else {
        return (label.to_owned(), Vec::new());
    };
    let Some(close) = label[start..].find(')') else {
        return (label.to_owned(), Vec::new());
    };

    let inner = &label[start + open.len()..start + close];
    let values = inner
        .split(',')
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .collect();

    let mut remaining = String::with_capacity(label.len());
    remaining.push_str(&label[..start]);
    remaining.push_str(&label[start + close + 1..]);
    (remaining.trim().to_owned(), values)
}

fn render_html(block: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(block));
    out.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "---\n\
id: forest\n\
bg: forest.jpg\n\
music: calm.ogg\n\
chars: [hero.png]\n\
set_flags:\n\
  - entered_forest\n\
---\n\
The trees close in around you.\n\
\n\
---\n\
Something *moves* in the dark.\n\
\n\
### Choices\n\
- Draw your sword (sets: drew_sword) -> forest_fight\n\
- Run away (requires: saw_path, !injured) -> forest_path\n\
- Stand still → forest_wait\n";

    #[test]
    fn test_parse_scene_reads_frontmatter_blocks_and_choices() {
        // Act
        let scene = parse_scene(SOURCE, "fallback").unwrap();

        // Assert
        assert_eq!(scene.id, SceneId::from("forest"));
        assert_eq!(scene.bg.as_deref(), Some("forest.jpg"));
        assert_eq!(scene.music.as_deref(), Some("calm.ogg"));
        assert_eq!(scene.chars, vec!["hero.png".to_owned()]);
        assert_eq!(scene.set_flags, vec!["entered_forest".to_owned()]);
        assert_eq!(scene.text_blocks.len(), 2);
        assert_eq!(scene.choices.len(), 3);
    }

    #[test]
    fn test_text_blocks_are_rendered_to_html() {
        let scene = parse_scene(SOURCE, "fallback").unwrap();
        assert_eq!(
            scene.text_blocks[1],
            "<p>Something <em>moves</em> in the dark.</p>"
        );
    }

    #[test]
    fn test_choice_annotations_are_parsed_and_stripped() {
        // Act
        let scene = parse_scene(SOURCE, "fallback").unwrap();

        // Assert
        let draw = &scene.choices[0];
        assert_eq!(draw.label, "Draw your sword");
        assert_eq!(draw.target, Some(SceneId::from("forest_fight")));
        assert_eq!(draw.set_flags, vec!["drew_sword".to_owned()]);

        let run = &scene.choices[1];
        assert_eq!(run.require_flags.len(), 2);
        assert_eq!(run.require_flags[0], Requirement::parse("saw_path"));
        assert_eq!(run.require_flags[1], Requirement::parse("!injured"));

        let wait = &scene.choices[2];
        assert_eq!(wait.label, "Stand still");
        assert_eq!(wait.target, Some(SceneId::from("forest_wait")));
    }

    #[test]
    fn test_missing_frontmatter_falls_back_to_file_stem() {
        let scene = parse_scene("Just one block.", "lonely").unwrap();
        assert_eq!(scene.id, SceneId::from("lonely"));
        assert_eq!(scene.text_blocks.len(), 1);
        assert!(scene.is_ending());
    }

    #[test]
    fn test_bad_frontmatter_is_a_validation_error() {
        let source = "---\nid: [unclosed\n---\nbody\n";
        assert!(matches!(
            parse_scene(source, "x"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_load_story_dir_ingests_recursively() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("act1")).unwrap();
        std::fs::write(dir.path().join("intro.md"), "---\nid: intro\n---\nHi.\n").unwrap();
        std::fs::write(
            dir.path().join("act1").join("forest.md"),
            "---\nid: forest\n---\nTrees.\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        // Act
        let table = load_story_dir(dir.path()).unwrap();

        // Assert
        assert_eq!(table.len(), 2);
        assert!(table.contains(&SceneId::from("intro")));
        assert!(table.contains(&SceneId::from("forest")));
    }
}
