use llm::StructuredOutput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// Open vocabulary: Underdog, Mentor, Villain, Protagonist, ...
    pub archetype: String,
    /// Protagonist, Antagonist, Support, or a free-text description
    pub role: String,
    pub motivation: String,
    #[serde(default)]
    pub core_trait: String,
}

impl Character {
    /// Tagged when `role` or `archetype` is "Protagonist", alone or as one
    /// segment of a `/` or `,` list such as "Hero/Protagonist".
    pub fn is_protagonist(&self) -> bool {
        let tagged = |field: &str| {
            field
                .split(['/', ','])
                .any(|segment| segment.trim().eq_ignore_ascii_case("protagonist"))
        };
        tagged(&self.role) || tagged(&self.archetype)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotBeat {
    pub description: String,
    /// Setup, Conflict, Climax, Resolution, ...
    #[serde(alias = "narrative_function")]
    pub beat_type: String,
    #[serde(default)]
    pub emotional_note: String,
}

/// Setting-independent core of the source story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryEssence {
    pub title: String,
    #[serde(default)]
    pub logline: String,
    pub theme: String,
    #[serde(default)]
    pub themes: Vec<String>,
    pub characters: Vec<Character>,
    pub plot_beats: Vec<PlotBeat>,
    pub tone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedCharacter {
    pub original_name: String,
    pub new_name: String,
    #[serde(alias = "role_in_new_world")]
    pub role: String,
    pub motivation: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedBeat {
    #[serde(default)]
    pub beat_type: String,
    pub description: String,
}

/// Blueprint of the story in the target setting, one entry per original
/// character and beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMap {
    pub new_title: String,
    #[serde(default)]
    pub new_logline: String,
    pub mapped_characters: Vec<MappedCharacter>,
    pub mapped_setting: String,
    #[serde(default)]
    pub setting_rules: String,
    pub mapped_plot_beats: Vec<MappedBeat>,
}

struct EmptyFields(Vec<String>);

impl EmptyFields {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn require(&mut self, field: impl FnOnce() -> String, value: &str) {
        if value.trim().is_empty() {
            self.0.push(field());
        }
    }

    fn finish(self) -> Result<(), String> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(format!("these fields must not be empty: {}", self.0.join(", ")))
        }
    }
}

impl StructuredOutput for StoryEssence {
    const NAME: &'static str = "StoryEssence";

    fn check(&self) -> Result<(), String> {
        let mut empty = EmptyFields::new();
        empty.require(|| "title".into(), &self.title);
        empty.require(|| "theme".into(), &self.theme);
        empty.require(|| "tone".into(), &self.tone);

        for (i, c) in self.characters.iter().enumerate() {
            empty.require(|| format!("characters[{i}].name"), &c.name);
            empty.require(|| format!("characters[{i}].archetype"), &c.archetype);
            empty.require(|| format!("characters[{i}].role"), &c.role);
            empty.require(|| format!("characters[{i}].motivation"), &c.motivation);
        }
        for (i, b) in self.plot_beats.iter().enumerate() {
            empty.require(|| format!("plot_beats[{i}].description"), &b.description);
            empty.require(|| format!("plot_beats[{i}].beat_type"), &b.beat_type);
        }

        empty.finish()
    }
}

impl StructuredOutput for StoryMap {
    const NAME: &'static str = "StoryMap";

    fn check(&self) -> Result<(), String> {
        let mut empty = EmptyFields::new();
        empty.require(|| "new_title".into(), &self.new_title);
        empty.require(|| "mapped_setting".into(), &self.mapped_setting);

        for (i, c) in self.mapped_characters.iter().enumerate() {
            empty.require(|| format!("mapped_characters[{i}].original_name"), &c.original_name);
            empty.require(|| format!("mapped_characters[{i}].new_name"), &c.new_name);
            empty.require(|| format!("mapped_characters[{i}].role"), &c.role);
            empty.require(|| format!("mapped_characters[{i}].motivation"), &c.motivation);
        }
        for (i, b) in self.mapped_plot_beats.iter().enumerate() {
            empty.require(|| format!("mapped_plot_beats[{i}].description"), &b.description);
        }

        empty.finish()
    }
}
