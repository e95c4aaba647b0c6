use crate::schema::{StoryEssence, StoryMap};
use crate::style::Style;

pub use llm::with_feedback;

/// Everything a stage prompt depends on. Rendering is pure and deterministic.
#[derive(Debug, Clone, Copy)]
pub enum PromptInput<'a> {
    Extraction {
        source_text: &'a str,
    },
    Mapping {
        essence: &'a StoryEssence,
        target_context: &'a str,
    },
    Generation {
        map: &'a StoryMap,
        style: Style,
        min_words: usize,
    },
}

pub fn build_prompt(input: PromptInput<'_>) -> String {
    match input {
        PromptInput::Extraction { source_text } => build_extraction_prompt(source_text),
        PromptInput::Mapping {
            essence,
            target_context,
        } => build_mapping_prompt(essence, target_context),
        PromptInput::Generation {
            map,
            style,
            min_words,
        } => build_generation_prompt(map, style, min_words),
    }
}

pub fn build_extraction_prompt(source_text: &str) -> String {
    format!(
        r#"Analyze this story and extract its core elements, described abstractly so they do not depend on the original setting.

STORY:
"{}"

Return a JSON object with exactly this structure:
{{
  "title": "story title",
  "logline": "one sentence summary",
  "theme": "the central theme",
  "themes": ["theme1", "theme2"],
  "tone": "overall tone of the story",
  "characters": [
    {{
      "name": "character name",
      "archetype": "Underdog/Mentor/Villain/etc",
      "role": "Protagonist/Antagonist/Support",
      "motivation": "what drives them",
      "core_trait": "defining personality trait"
    }}
  ],
  "plot_beats": [
    {{
      "description": "what happens (abstract, not setting-specific)",
      "beat_type": "Setup/Conflict/Climax/Resolution",
      "emotional_note": "emotional tone of this moment"
    }}
  ]
}}

RULES:
- Exactly one character has the role "Protagonist"
- List at least 3 plot beats, in the order they happen
- Every field must be filled in
- Return ONLY valid JSON, no markdown, no explanations"#,
        source_text.trim()
    )
}

pub fn build_mapping_prompt(essence: &StoryEssence, target_context: &str) -> String {
    let contract = serde_json::to_string_pretty(essence).unwrap_or_else(|_| format!("{:#?}", essence));

    let names = essence
        .characters
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Reimagine this story in a completely new setting.

ORIGINAL STORY ELEMENTS:
{contract}

TARGET SETTING: "{target}"

Create new character names and roles that fit the target setting.
Translate each plot beat into a concrete scene in the new world.

Return a JSON object with exactly this structure:
{{
  "new_title": "title for the new version",
  "new_logline": "updated one-line summary",
  "mapped_characters": [
    {{
      "original_name": "name from the original story",
      "new_name": "name in new setting",
      "role": "their role in this setting",
      "motivation": "what drives them in this setting",
      "description": "brief character description"
    }}
  ],
  "mapped_setting": "primary location and era of the new world",
  "setting_rules": "how this world works",
  "mapped_plot_beats": [
    {{
      "beat_type": "same beat type as the original beat",
      "description": "the scene in the new setting"
    }}
  ]
}}

RULES:
- "mapped_characters" must contain exactly {character_count} entries, one for each original character:
{names}
- "original_name" must repeat the original name exactly as listed above
- "mapped_plot_beats" must contain exactly {beat_count} entries, in the same order as the original plot beats
- Do not drop, merge, or invent characters or beats
- Return ONLY valid JSON, no markdown, no explanations"#,
        target = target_context.trim(),
        character_count = essence.characters.len(),
        beat_count = essence.plot_beats.len(),
    )
}

fn style_requirements(style: Style) -> &'static str {
    match style {
        Style::Narrative => {
            "- Third person narration\n\
             - Include character thoughts and emotions\n\
             - Vivid descriptions of the setting"
        }
        Style::Screenplay => {
            "- Proper screenplay format (INT./EXT. scene headings)\n\
             - Character names in CAPS before dialogue\n\
             - Action lines and visual descriptions\n\
             - 8-12 scenes"
        }
        Style::Satirical => {
            "- Humorous and ironic tone\n\
             - Exaggerate the absurdities of the setting\n\
             - Witty dialogue\n\
             - Keep the emotional arc intact"
        }
        Style::Epic => {
            "- Grand, mythic language\n\
             - Characters feel larger than life\n\
             - Rich metaphors and imagery\n\
             - Moments of triumph and despair"
        }
    }
}

fn style_opening(style: Style) -> &'static str {
    match style {
        Style::Narrative => "Write a complete story based on this outline.",
        Style::Screenplay => "Write a screenplay based on this outline.",
        Style::Satirical => "Write a satirical comedy based on this outline.",
        Style::Epic => "Write an epic tale based on this outline.",
    }
}

pub fn build_generation_prompt(map: &StoryMap, style: Style, min_words: usize) -> String {
    let mut prompt = String::from(style_opening(style));

    prompt.push_str(&format!("\n\nTITLE: {}\n", map.new_title));
    prompt.push_str(&format!("SETTING: {}\n", map.mapped_setting));
    if !map.setting_rules.trim().is_empty() {
        prompt.push_str(&format!("WORLD RULES: {}\n", map.setting_rules));
    }

    prompt.push_str("\nCHARACTERS:\n");
    for c in &map.mapped_characters {
        let sketch = if c.description.trim().is_empty() {
            &c.motivation
        } else {
            &c.description
        };
        prompt.push_str(&format!("- {} ({}): {}\n", c.new_name, c.role, sketch));
    }

    prompt.push_str("\nPLOT OUTLINE (keep this order):\n");
    for (i, beat) in map.mapped_plot_beats.iter().enumerate() {
        if beat.beat_type.trim().is_empty() {
            prompt.push_str(&format!("{}. {}\n", i + 1, beat.description));
        } else {
            prompt.push_str(&format!("{}. [{}] {}\n", i + 1, beat.beat_type, beat.description));
        }
    }

    prompt.push_str("\nRequirements:\n");
    prompt.push_str(style_requirements(style));
    prompt.push_str(&format!(
        "\n- At least {} words\n- Cover every scene of the outline\n\nOutput only the {}, with no title line or commentary.",
        min_words,
        match style {
            Style::Screenplay => "screenplay",
            _ => "story",
        }
    ));

    prompt
}
