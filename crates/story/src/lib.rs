//! Story artifacts passed between the pipeline stages, the rules they must
//! satisfy, and the prompts that ask a model to produce them.

pub mod prompt;
pub mod schema;
pub mod style;
pub mod validate;

pub use prompt::{PromptInput, build_prompt};
pub use schema::{Character, MappedBeat, MappedCharacter, PlotBeat, StoryEssence, StoryMap};
pub use style::{Style, UnknownStyle};
pub use validate::{ProtagonistRule, ValidationPolicy, Violation, Violations};
