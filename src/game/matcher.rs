use aho_corasick::{AhoCorasick, BuildError};
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::PlaceholderKind;

/// Placeholder dictionaries as loaded from `placeholders.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderConfig {
    /// Slots only female players can fill.
    #[serde(default)]
    pub female: Vec<String>,
    /// Slots only male players can fill.
    #[serde(default)]
    pub male: Vec<String>,
    /// Slots anyone can fill.
    #[serde(default)]
    pub common: Vec<String>,
    /// Two placeholders that always get opposite genders. Which one is
    /// female is decided by a coin flip on every command.
    #[serde(default)]
    pub opposite: [String; 2],
}

impl PlaceholderConfig {
    /// Reads the dictionaries from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read placeholders from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid placeholders file {}", path.display()))
    }
}

/// One placeholder occurrence in a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Byte offset of the first byte.
    pub at: usize,
    /// Length in bytes.
    pub len: usize,
    /// Who may fill the slot.
    pub kind: PlaceholderKind,
    /// Zero-based occurrence number within the dictionary it came from.
    pub index: usize,
}

impl PlaceholderMatch {
    /// Byte offset one past the last byte.
    pub fn end(&self) -> usize {
        self.at + self.len
    }
}

/// Compiled placeholder dictionaries.
pub struct PlaceholderMatcher {
    common: AhoCorasick,
    female: AhoCorasick,
    male: AhoCorasick,
    opposite: [String; 2],
}

impl PlaceholderMatcher {
    /// Compiles one automaton per gendered dictionary.
    pub fn new(config: &PlaceholderConfig) -> Result<Self, BuildError> {
        Ok(Self {
            common: AhoCorasick::new(&config.common)?,
            female: AhoCorasick::new(&config.female)?,
            male: AhoCorasick::new(&config.male)?,
            opposite: config.opposite.clone(),
        })
    }

    /// Finds the placeholders of `text`, left to right, without overlaps.
    ///
    /// Every dictionary is searched on its own, then the hits are ordered by
    /// descending start and each hit that ends at or after the start of the
    /// last kept hit is dropped. At equal starts the earlier dictionary wins
    /// (common, female, male, opposite).
    pub fn find_matches<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<PlaceholderMatch> {
        let mut matches = Vec::new();

        append_dictionary_matches(&mut matches, &self.common, text, PlaceholderKind::Any);
        append_dictionary_matches(&mut matches, &self.female, text, PlaceholderKind::Female);
        append_dictionary_matches(&mut matches, &self.male, text, PlaceholderKind::Male);
        self.append_opposite_matches(&mut matches, text, rng);

        // stable, so equal starts keep dictionary order
        matches.sort_by(|a, b| b.at.cmp(&a.at));

        let mut kept = remove_intersected(matches);
        kept.reverse();
        kept
    }

    fn append_opposite_matches<R: Rng + ?Sized>(
        &self,
        matches: &mut Vec<PlaceholderMatch>,
        text: &str,
        rng: &mut R,
    ) {
        let kinds = if rng.gen_bool(0.5) {
            [PlaceholderKind::Male, PlaceholderKind::Female]
        } else {
            [PlaceholderKind::Female, PlaceholderKind::Male]
        };

        for (pattern, kind) in self.opposite.iter().zip(kinds) {
            if pattern.is_empty() {
                continue;
            }
            for (index, (at, found)) in text.match_indices(pattern.as_str()).enumerate() {
                matches.push(PlaceholderMatch {
                    at,
                    len: found.len(),
                    kind,
                    index,
                });
            }
        }
    }
}

fn append_dictionary_matches(
    matches: &mut Vec<PlaceholderMatch>,
    automaton: &AhoCorasick,
    text: &str,
    kind: PlaceholderKind,
) {
    for (index, found) in automaton.find_overlapping_iter(text).enumerate() {
        matches.push(PlaceholderMatch {
            at: found.start(),
            len: found.len(),
            kind,
            index,
        });
    }
}

/// Expects `matches` sorted by descending start.
fn remove_intersected(matches: Vec<PlaceholderMatch>) -> Vec<PlaceholderMatch> {
    let mut kept: Vec<PlaceholderMatch> = Vec::with_capacity(matches.len());
    for candidate in matches {
        match kept.last() {
            // touching counts as intersecting
            Some(last) if candidate.end() >= last.at => continue,
            _ => kept.push(candidate),
        }
    }
    kept
}

/// Replaces every match with a `{label #n}` marker so authors can check a
/// command before it is sent. `matches` must be in left-to-right order.
pub fn render_preview<F>(text: &str, matches: &[PlaceholderMatch], label: F) -> String
where
    F: Fn(PlaceholderKind) -> String,
{
    let mut rendered = text.to_string();
    for found in matches.iter().rev() {
        let marker = format!("{{{} #{}}}", label(found.kind), found.index + 1);
        rendered.replace_range(found.at..found.end(), &marker);
    }
    rendered
}
