//! Operation synthesis pipeline.
//!
//! Stages run strictly in order over one [`GenerationContext`]:
//! root-field search → classification → type filter → root-field selection
//! → type closure → draft → validate/repair.

use std::sync::Arc;

use gqlsearch_core::{
    ChatMessage, Error, LanguageModel, LlmError, MetadataFilter, Result, SearchOptions,
    VectorStore, Validator, keys,
};
use tracing::{debug, info, warn};

use crate::classify::parse_operation_type;
use crate::closure::{discover_types, seed_types};
use crate::config::GenerationConfig;
use crate::context::{GenerationContext, GenerationResult};
use crate::extract::extract_operation;
use crate::prompts;
use crate::select::MatcherChain;

/// Turns a natural-language request into a validated GraphQL operation.
///
/// Holds no per-request state; share it behind an `Arc` and call
/// [`generate`](Self::generate) concurrently.
pub struct OperationGenerator {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
    validator: Arc<dyn Validator>,
    /// Raw SDL handed to the validator
    schema: String,
    matchers: MatcherChain,
    config: GenerationConfig,
}

impl OperationGenerator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
        validator: Arc<dyn Validator>,
        schema: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            llm,
            validator,
            schema: schema.into(),
            matchers: MatcherChain::default(),
            config,
        }
    }

    /// Replace the root-field matcher chain.
    #[must_use]
    pub fn with_matchers(mut self, matchers: MatcherChain) -> Self {
        self.matchers = matchers;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Run the full pipeline for `input`, whose embedding is `embedding`.
    pub async fn generate(&self, input: &str, embedding: Vec<f32>) -> Result<GenerationResult> {
        let mut ctx = GenerationContext::new(input, embedding);
        info!("Generating operation for: {}", input);

        self.find_root_fields(&mut ctx).await?;
        self.classify(&mut ctx).await?;
        Self::filter_by_type(&mut ctx);
        self.select_root_field(&mut ctx).await?;
        self.discover_closure(&mut ctx).await?;
        self.draft_and_validate(ctx).await
    }

    /// Bounded LLM call; `Ok(None)` when the deadline passed.
    async fn complete(
        &self,
        ctx: &mut GenerationContext,
        messages: &[ChatMessage],
    ) -> Result<Option<String>> {
        let options = self.config.completion_options();
        match tokio::time::timeout(self.config.llm_timeout, self.llm.complete(messages, &options))
            .await
        {
            Ok(Ok(answer)) => Ok(Some(answer)),
            Ok(Err(LlmError::Timeout(_))) | Err(_) => {
                ctx.diagnostics.timed_out_calls += 1;
                Ok(None)
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn find_root_fields(&self, ctx: &mut GenerationContext) -> Result<()> {
        let options = SearchOptions::new(self.config.max_root_fields)
            .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true));
        let results = self.store.search(&ctx.embedding, &options).await?;

        let min_score = self.config.min_similarity_score;
        ctx.candidates = results.into_iter().filter(|r| r.score >= min_score).collect();
        ctx.diagnostics.candidate_count = ctx.candidates.len();

        if ctx.candidates.is_empty() {
            return Err(Error::NoRelevantRootFields { min_score });
        }
        debug!("{} root-field candidates", ctx.candidates.len());
        Ok(())
    }

    async fn classify(&self, ctx: &mut GenerationContext) -> Result<()> {
        let messages = prompts::classification_messages(&ctx.input, &ctx.candidates);
        match self.complete(ctx, &messages).await? {
            Some(answer) => {
                ctx.operation_type = parse_operation_type(&answer);
                ctx.diagnostics.classification_answer = Some(answer);
            }
            None => warn!("Classification timed out, assuming query"),
        }
        info!("Operation type: {}", ctx.operation_type);
        Ok(())
    }

    fn filter_by_type(ctx: &mut GenerationContext) {
        let operation_type = ctx.operation_type;
        let matching: Vec<_> = ctx
            .candidates
            .iter()
            .filter(|c| c.document.root_operation_type() == Some(operation_type))
            .cloned()
            .collect();

        if matching.is_empty() {
            warn!(
                "No {} candidates, keeping all {}",
                operation_type,
                ctx.candidates.len()
            );
        } else {
            ctx.candidates = matching;
        }
    }

    async fn select_root_field(&self, ctx: &mut GenerationContext) -> Result<()> {
        let messages =
            prompts::selection_messages(&ctx.input, ctx.operation_type, &ctx.candidates);
        let selected = match self.complete(ctx, &messages).await? {
            Some(answer) => self.matchers.resolve(&answer, &ctx.candidates),
            None => {
                warn!("Root-field selection timed out, using highest score");
                MatcherChain::fallback(&ctx.candidates)
            }
        };

        let (index, tier) = selected
            .or_else(|| MatcherChain::fallback(&ctx.candidates))
            .ok_or_else(|| Error::Other("no root-field candidates to select from".to_string()))?;
        let field = ctx.candidates[index].clone();
        info!(
            "Selected root field {} ({}, score {:.3})",
            field.document.name,
            tier.as_str(),
            field.score
        );
        ctx.diagnostics.selection_tier = tier;
        ctx.root_field = Some(field);
        Ok(())
    }

    async fn discover_closure(&self, ctx: &mut GenerationContext) -> Result<()> {
        let Some(field) = ctx.root_field.as_ref() else {
            return Ok(());
        };
        let seeds = seed_types(&field.document);
        let closure = discover_types(
            self.store.as_ref(),
            &ctx.embedding,
            &seeds,
            self.config.max_documents,
        )
        .await?;

        ctx.diagnostics.closure_size = closure.documents.len();
        ctx.diagnostics.closure_truncated = closure.truncated;
        ctx.closure = closure.documents;
        debug!("Type closure: {} documents", ctx.closure.len());
        Ok(())
    }

    async fn draft_and_validate(&self, mut ctx: GenerationContext) -> Result<GenerationResult> {
        let root_field = ctx
            .root_field
            .clone()
            .ok_or_else(|| Error::Other("no root field selected".to_string()))?
            .document;
        let max_attempts = self.config.attempts();
        let mut errors: Vec<String> = Vec::new();

        for attempt in 1..=max_attempts {
            ctx.attempt = attempt;
            let messages = match &ctx.draft {
                Some(draft) => prompts::repair_messages(
                    &ctx.input,
                    ctx.operation_type,
                    &root_field,
                    &ctx.closure,
                    draft,
                    &errors,
                ),
                None => prompts::generation_messages(
                    &ctx.input,
                    ctx.operation_type,
                    &root_field,
                    &ctx.closure,
                ),
            };

            let Some(answer) = self.complete(&mut ctx, &messages).await? else {
                warn!("Draft attempt {} timed out", attempt);
                continue;
            };
            let draft = extract_operation(&answer);

            let outcome = self.validator.validate(&self.schema, &draft).await?;
            ctx.draft = Some(draft);
            if outcome.valid {
                info!("Operation valid after {} attempt(s)", attempt);
                ctx.diagnostics.last_errors.clear();
                return Ok(finish(ctx, root_field, attempt, true));
            }

            debug!("Attempt {} invalid: {:?}", attempt, outcome.errors);
            errors = outcome.errors;
            ctx.diagnostics.last_errors.clone_from(&errors);
        }

        if ctx.draft.is_none() {
            return Err(LlmError::Timeout(self.config.llm_timeout).into());
        }
        warn!(
            "Operation still invalid after {} attempts: {:?}",
            max_attempts, ctx.diagnostics.last_errors
        );
        Ok(finish(ctx, root_field, max_attempts, false))
    }
}

fn finish(
    ctx: GenerationContext,
    root_field: gqlsearch_core::DeclarationDocument,
    attempts: usize,
    valid: bool,
) -> GenerationResult {
    GenerationResult {
        operation: ctx.draft.unwrap_or_default(),
        operation_type: ctx.operation_type,
        root_field,
        validation_attempts: attempts,
        valid,
        diagnostics: ctx.diagnostics,
    }
}
