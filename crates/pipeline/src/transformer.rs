use std::future::Future;

use llm::{AdapterError, Completion, CompletionBackend, ModelClient, with_feedback, word_count};
use story::{
    PromptInput, StoryEssence, StoryMap, ValidationPolicy, Violations, build_prompt,
};
use tokio::time::sleep;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{FailureCause, Stage, StageFailure};
use crate::metrics::{StageReport, StageTally, TimedOperation};
use crate::request::TransformationRequest;
use crate::result::PipelineResult;

/// Where a run currently is. Each state owns the artifacts produced so far.
#[derive(Debug)]
enum PipelineState {
    Extracting,
    Mapping {
        essence: StoryEssence,
    },
    Generating {
        essence: StoryEssence,
        map: StoryMap,
    },
    Complete {
        essence: StoryEssence,
        map: StoryMap,
        final_text: String,
    },
}

/// Runs extraction, mapping, and generation in order against one model client.
pub struct Transformer<B> {
    client: ModelClient<B>,
    policy: ValidationPolicy,
}

impl<B: CompletionBackend> Transformer<B> {
    pub fn new(client: ModelClient<B>, policy: ValidationPolicy) -> Self {
        Self { client, policy }
    }

    pub fn from_config(backend: B, config: &PipelineConfig) -> Self {
        let client = ModelClient::new(backend, config.retry.policy())
            .with_schema_attempts(config.schema_attempts)
            .with_request_timeout(config.model.request_timeout());
        Self::new(client, config.validation.clone())
    }

    pub async fn run(&self, request: &TransformationRequest) -> Result<PipelineResult, StageFailure> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, style = %request.style());
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        request: &TransformationRequest,
    ) -> Result<PipelineResult, StageFailure> {
        let client = &self.client;
        let policy = &self.policy;
        let mut stages = Vec::with_capacity(3);
        let mut state = PipelineState::Extracting;

        info!(
            target_context = request.target_context(),
            source_chars = request.source_text().len(),
            "Starting transformation"
        );

        let (essence, map, final_text) = loop {
            state = match state {
                PipelineState::Extracting => {
                    let prompt = build_prompt(PromptInput::Extraction {
                        source_text: request.source_text(),
                    });
                    let (essence, report) = self
                        .run_stage(
                            Stage::Extracting,
                            &prompt,
                            move |prompt: String| async move {
                                client.complete_structured::<StoryEssence>(&prompt).await
                            },
                            |essence: &StoryEssence| policy.validate_essence(essence),
                        )
                        .await?;
                    info!(
                        title = %essence.title,
                        characters = essence.characters.len(),
                        plot_beats = essence.plot_beats.len(),
                        "Extracted story essence"
                    );
                    stages.push(report);
                    PipelineState::Mapping { essence }
                }
                PipelineState::Mapping { essence } => {
                    let prompt = build_prompt(PromptInput::Mapping {
                        essence: &essence,
                        target_context: request.target_context(),
                    });
                    let (map, report) = self
                        .run_stage(
                            Stage::Mapping,
                            &prompt,
                            move |prompt: String| async move {
                                client.complete_structured::<StoryMap>(&prompt).await
                            },
                            |map: &StoryMap| policy.validate_map(&essence, map),
                        )
                        .await?;
                    info!(
                        new_title = %map.new_title,
                        setting = %map.mapped_setting,
                        "Mapped story into target world"
                    );
                    stages.push(report);
                    PipelineState::Generating { essence, map }
                }
                PipelineState::Generating { essence, map } => {
                    let min_words = policy.min_words;
                    let prompt = build_prompt(PromptInput::Generation {
                        map: &map,
                        style: request.style(),
                        min_words,
                    });
                    let (final_text, report) = self
                        .run_stage(
                            Stage::Generating,
                            &prompt,
                            move |prompt: String| async move {
                                client.complete_text(&prompt, min_words).await
                            },
                            |text: &String| policy.validate_prose(text),
                        )
                        .await?;
                    stages.push(report);
                    PipelineState::Complete {
                        essence,
                        map,
                        final_text,
                    }
                }
                PipelineState::Complete {
                    essence,
                    map,
                    final_text,
                } => break (essence, map, final_text),
            };
        };

        let result = PipelineResult {
            run_id,
            source_digest: ingest::source_digest(request.source_text()),
            target_context: request.target_context().to_string(),
            style: request.style(),
            word_count: word_count(&final_text),
            essence,
            map,
            final_text,
            stages,
        };
        info!(
            words = result.word_count,
            model_calls = result.total_model_calls(),
            latency_ms = result.total_latency_ms(),
            "Transformation complete"
        );
        Ok(result)
    }

    /// Call the model until the output passes `validate`, giving the model
    /// the violations as feedback, within the semantic retry budget.
    async fn run_stage<T, F, Fut, V>(
        &self,
        stage: Stage,
        base_prompt: &str,
        call: F,
        validate: V,
    ) -> Result<(T, StageReport), StageFailure>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Completion<T>, AdapterError>>,
        V: Fn(&T) -> Result<(), Violations>,
    {
        info!(stage = %stage, "Stage started");
        let timer = TimedOperation::start();
        let mut tally = StageTally::default();
        let rounds = self.policy.semantic_retries + 1;
        let mut prompt = base_prompt.to_string();
        let mut round = 1;

        loop {
            let completion = call(prompt.clone())
                .await
                .map_err(|e| StageFailure::new(stage, e))?;
            tally.record_completion(completion.attempts, completion.transport_retries);

            match validate(&completion.value) {
                Ok(()) => {
                    let report = tally.finish(stage, &timer);
                    info!(
                        stage = %stage,
                        latency_ms = report.latency_ms,
                        model_calls = report.model_calls,
                        "Stage finished"
                    );
                    return Ok((completion.value, report));
                }
                Err(violations) if round < rounds => {
                    warn!(
                        stage = %stage,
                        attempt = round,
                        max_attempts = rounds,
                        violations = %violations,
                        "Output failed semantic validation, retrying with feedback"
                    );
                    tally.record_semantic_retry();
                    sleep(self.client.retry_policy().backoff_for(round)).await;
                    prompt = with_feedback(base_prompt, &violations.to_string());
                    round += 1;
                }
                Err(violations) => {
                    warn!(stage = %stage, violations = %violations, "Semantic retry budget exhausted");
                    return Err(StageFailure::new(
                        stage,
                        FailureCause::SemanticValidation {
                            attempts: rounds,
                            violations,
                        },
                    ));
                }
            }
        }
    }
}
