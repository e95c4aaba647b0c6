//! Domain rules a structurally valid artifact must still satisfy.
//!
//! The thresholds are policy, not protocol: every rule is configurable
//! through [`ValidationPolicy`].

use llm::word_count;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::schema::{StoryEssence, StoryMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtagonistRule {
    ExactlyOne,
    AtLeastOne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub protagonist: ProtagonistRule,
    pub min_plot_beats: usize,
    /// Require every original character name to appear once as `original_name`
    pub match_character_names: bool,
    pub min_words: usize,
    /// Corrective attempts granted per stage after a semantic rejection
    pub semantic_retries: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            protagonist: ProtagonistRule::ExactlyOne,
            min_plot_beats: 3,
            match_character_names: true,
            min_words: 1000,
            semantic_retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("no characters were extracted")]
    NoCharacters,

    #[error("no character is tagged as the protagonist (set its role to \"Protagonist\")")]
    MissingProtagonist,

    #[error("{} characters are tagged as the protagonist ({}); exactly one is allowed", .0.len(), .0.join(", "))]
    MultipleProtagonists(Vec<String>),

    #[error("only {found} plot beats were extracted; at least {min} are required")]
    TooFewBeats { found: usize, min: usize },

    #[error("{found} characters were mapped but the original story has {expected}; map every character exactly once")]
    CharacterCount { expected: usize, found: usize },

    #[error("{found} plot beats were mapped but the original story has {expected}; keep every beat, in order")]
    BeatCount { expected: usize, found: usize },

    #[error("original character \"{0}\" is missing from mapped_characters")]
    UnmappedCharacter(String),

    #[error("mapped character \"{0}\" does not exist in the original story")]
    UnknownCharacter(String),

    #[error("original character \"{name}\" is mapped {found} times but appears {expected} times in the original story")]
    DuplicateMapping {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("the story has {found} words; at least {min} are required")]
    TooShort { found: usize, min: usize },
}

/// Every rule an artifact broke, rendered as one diagnostic for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for Violations {}

impl Violations {
    fn into_result(self) -> Result<(), Violations> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Occurrences of each normalized name, in first-seen order with the first spelling kept.
fn name_counts<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(String, &'a str, usize)> {
    let mut counts: Vec<(String, &'a str, usize)> = Vec::new();
    for name in names {
        let key = normalize_name(name);
        match counts.iter().position(|(k, _, _)| *k == key) {
            Some(i) => counts[i].2 += 1,
            None => counts.push((key, name, 1)),
        }
    }
    counts
}

fn count_of(counts: &[(String, &str, usize)], key: &str) -> usize {
    counts.iter().find(|(k, _, _)| k == key).map_or(0, |(_, _, n)| *n)
}

impl ValidationPolicy {
    pub fn validate_essence(&self, essence: &StoryEssence) -> Result<(), Violations> {
        let mut violations = Vec::new();

        if essence.characters.is_empty() {
            violations.push(Violation::NoCharacters);
        } else {
            let protagonists: Vec<String> = essence
                .characters
                .iter()
                .filter(|c| c.is_protagonist())
                .map(|c| c.name.clone())
                .collect();

            match (self.protagonist, protagonists.len()) {
                (_, 0) => violations.push(Violation::MissingProtagonist),
                (ProtagonistRule::ExactlyOne, n) if n > 1 => {
                    violations.push(Violation::MultipleProtagonists(protagonists))
                }
                _ => {}
            }
        }

        if essence.plot_beats.len() < self.min_plot_beats {
            violations.push(Violation::TooFewBeats {
                found: essence.plot_beats.len(),
                min: self.min_plot_beats,
            });
        }

        Violations(violations).into_result()
    }

    /// Check the 1:1 correspondence between the map and the essence it came from.
    pub fn validate_map(&self, essence: &StoryEssence, map: &StoryMap) -> Result<(), Violations> {
        let mut violations = Vec::new();

        if map.mapped_characters.len() != essence.characters.len() {
            violations.push(Violation::CharacterCount {
                expected: essence.characters.len(),
                found: map.mapped_characters.len(),
            });
        }
        if map.mapped_plot_beats.len() != essence.plot_beats.len() {
            violations.push(Violation::BeatCount {
                expected: essence.plot_beats.len(),
                found: map.mapped_plot_beats.len(),
            });
        }

        if self.match_character_names {
            let expected = name_counts(essence.characters.iter().map(|c| c.name.as_str()));
            let found = name_counts(map.mapped_characters.iter().map(|m| m.original_name.as_str()));

            for (key, name, wanted) in &expected {
                let mapped = count_of(&found, key);
                if mapped < *wanted {
                    violations.push(Violation::UnmappedCharacter(name.to_string()));
                } else if mapped > *wanted {
                    violations.push(Violation::DuplicateMapping {
                        name: name.to_string(),
                        expected: *wanted,
                        found: mapped,
                    });
                }
            }
            for (key, name, _) in &found {
                if count_of(&expected, key) == 0 {
                    violations.push(Violation::UnknownCharacter(name.to_string()));
                }
            }
        }

        Violations(violations).into_result()
    }

    pub fn validate_prose(&self, text: &str) -> Result<(), Violations> {
        let found = word_count(text);
        if found < self.min_words {
            return Err(Violations(vec![Violation::TooShort {
                found,
                min: self.min_words,
            }]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Character, MappedBeat, MappedCharacter, PlotBeat};

    fn character(name: &str, role: &str) -> Character {
        Character {
            name: name.into(),
            archetype: "Archetype".into(),
            role: role.into(),
            motivation: "Wants something".into(),
            core_trait: String::new(),
        }
    }

    fn essence(characters: Vec<Character>, beats: usize) -> StoryEssence {
        StoryEssence {
            title: "Cinderella".into(),
            logline: String::new(),
            theme: "Kindness".into(),
            themes: vec![],
            characters,
            plot_beats: (0..beats)
                .map(|i| PlotBeat {
                    description: format!("beat {i}"),
                    beat_type: "Setup".into(),
                    emotional_note: String::new(),
                })
                .collect(),
            tone: "Hopeful".into(),
        }
    }

    fn map_for(names: &[&str], beats: usize) -> StoryMap {
        StoryMap {
            new_title: "Riya".into(),
            new_logline: String::new(),
            mapped_characters: names
                .iter()
                .map(|n| MappedCharacter {
                    original_name: n.to_string(),
                    new_name: format!("new {n}"),
                    role: "role".into(),
                    motivation: "motive".into(),
                    description: String::new(),
                })
                .collect(),
            mapped_setting: "Delhi".into(),
            setting_rules: String::new(),
            mapped_plot_beats: (0..beats)
                .map(|i| MappedBeat {
                    beat_type: String::new(),
                    description: format!("scene {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_essence_passes() {
        let e = essence(vec![character("Cinderella", "Protagonist"), character("Stepmother", "Antagonist")], 4);
        assert!(ValidationPolicy::default().validate_essence(&e).is_ok());
    }

    #[test]
    fn test_empty_cast_and_short_plot() {
        let e = essence(vec![], 2);
        let err = ValidationPolicy::default().validate_essence(&e).unwrap_err();
        assert_eq!(
            err.0,
            vec![Violation::NoCharacters, Violation::TooFewBeats { found: 2, min: 3 }]
        );
    }

    #[test]
    fn test_missing_protagonist() {
        let e = essence(vec![character("Stepmother", "Antagonist")], 3);
        let err = ValidationPolicy::default().validate_essence(&e).unwrap_err();
        assert_eq!(err.0, vec![Violation::MissingProtagonist]);
    }

    #[test]
    fn test_protagonist_rule_is_configurable() {
        let e = essence(vec![character("Romeo", "Protagonist"), character("Juliet", "Protagonist")], 3);

        let strict = ValidationPolicy::default();
        assert!(matches!(
            strict.validate_essence(&e).unwrap_err().0[0],
            Violation::MultipleProtagonists(_)
        ));

        let lenient = ValidationPolicy {
            protagonist: ProtagonistRule::AtLeastOne,
            ..ValidationPolicy::default()
        };
        assert!(lenient.validate_essence(&e).is_ok());
    }

    #[test]
    fn test_map_cardinality_mismatch() {
        let e = essence(
            vec![
                character("Cinderella", "Protagonist"),
                character("Stepmother", "Antagonist"),
                character("Prince", "Support"),
                character("Fairy Godmother", "Mentor"),
            ],
            4,
        );
        let m = map_for(&["Cinderella", "Stepmother", "Prince"], 4);

        let err = ValidationPolicy::default().validate_map(&e, &m).unwrap_err();
        assert!(err.0.contains(&Violation::CharacterCount { expected: 4, found: 3 }));
        assert!(err.0.contains(&Violation::UnmappedCharacter("Fairy Godmother".into())));
        assert!(err.to_string().contains("original story has 4"));
    }

    #[test]
    fn test_map_beat_mismatch_and_invented_character() {
        let e = essence(vec![character("Cinderella", "Protagonist")], 4);
        let m = map_for(&["Cinderela"], 3);

        let err = ValidationPolicy::default().validate_map(&e, &m).unwrap_err();
        assert!(err.0.contains(&Violation::BeatCount { expected: 4, found: 3 }));
        assert!(err.0.contains(&Violation::UnknownCharacter("Cinderela".into())));
    }

    #[test]
    fn test_map_must_cover_repeated_names() {
        let e = essence(
            vec![
                character("Cinderella", "Protagonist"),
                character("Stepsister", "Antagonist"),
                character("Stepsister", "Antagonist"),
            ],
            3,
        );

        let skewed = map_for(&["Cinderella", "Stepsister", "Cinderella"], 3);
        let err = ValidationPolicy::default().validate_map(&e, &skewed).unwrap_err();
        assert_eq!(
            err.0,
            vec![
                Violation::DuplicateMapping {
                    name: "Cinderella".into(),
                    expected: 1,
                    found: 2
                },
                Violation::UnmappedCharacter("Stepsister".into()),
            ]
        );

        let exact = map_for(&["Stepsister", "Cinderella", "stepsister"], 3);
        assert!(ValidationPolicy::default().validate_map(&e, &exact).is_ok());
    }

    #[test]
    fn test_map_names_match_loosely() {
        let e = essence(vec![character("Cinderella", "Protagonist")], 3);
        let m = map_for(&[" cinderella "], 3);
        assert!(ValidationPolicy::default().validate_map(&e, &m).is_ok());
    }

    #[test]
    fn test_prose_floor() {
        let policy = ValidationPolicy {
            min_words: 5,
            ..ValidationPolicy::default()
        };
        assert!(policy.validate_prose("one two three four five").is_ok());
        assert_eq!(
            policy.validate_prose("too short").unwrap_err().0,
            vec![Violation::TooShort { found: 2, min: 5 }]
        );
    }
}
