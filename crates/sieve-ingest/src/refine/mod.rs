//! Two-tier chunk refinement.
//!
//! Every unit is cleaned by the deterministic [`RuleCleaner`] first. When
//! enhancement is requested and a provider is configured, the provider's
//! output replaces the rule-based text, unless the call fails, times out,
//! returns nothing, or returns too little of the input. In those cases the
//! rule-based text is used and the reason is recorded on the outcome.

mod prompt;
mod rules;

pub use prompt::{PromptTemplate, TEXT_PLACEHOLDER};
pub use rules::RuleCleaner;

use crate::error::{IngestError, IngestResult};
use futures_util::stream::{self, StreamExt};
use sieve_config::Config;
use sieve_core::{is_blank, ObservabilitySink, RefineCounters, RefinementOutcome, TextUnit};
use sieve_llm::{LlmProvider, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stage name reported to the observability sink.
pub const REFINER_STAGE: &str = "chunk_refiner";

pub const REASON_DISABLED: &str = "enhancement disabled";
pub const REASON_NO_PROVIDER: &str = "no enhancement provider configured";
pub const REASON_EMPTY_OUTPUT: &str = "empty output";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MIN_RETENTION_RATIO: f64 = 0.3;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Outcomes of a batch, in input order, plus their tally.
#[derive(Debug, Clone, Default)]
pub struct RefineBatch {
    pub outcomes: Vec<RefinementOutcome>,
    pub counters: RefineCounters,
}

/// Chooses between LLM enhancement and rule-based cleaning per unit.
#[derive(Clone)]
pub struct ChunkRefiner {
    provider: Option<Arc<dyn LlmProvider>>,
    cleaner: RuleCleaner,
    prompt: PromptTemplate,
    timeout: Duration,
    min_retention_ratio: f64,
    max_concurrency: usize,
    use_llm: bool,
}

impl Default for ChunkRefiner {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkRefiner {
    /// A rule-only refiner with default limits.
    pub fn new() -> Self {
        Self {
            provider: None,
            cleaner: RuleCleaner::new(),
            prompt: PromptTemplate::default(),
            timeout: DEFAULT_TIMEOUT,
            min_retention_ratio: DEFAULT_MIN_RETENTION_RATIO,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            use_llm: false,
        }
    }

    /// Build from configuration.
    ///
    /// A provider that cannot be constructed is logged and left out, so
    /// refinement degrades to rule-based cleaning instead of failing.
    pub fn from_config(config: &Config, registry: &ProviderRegistry) -> IngestResult<Self> {
        let prompt = PromptTemplate::load_or_default(config.refiner.prompt_path.as_deref())?;

        let mut refiner = Self::new()
            .with_prompt(prompt)
            .with_timeout(Duration::from_secs(config.llm.timeout_seconds))
            .with_min_retention_ratio(config.refiner.min_retention_ratio)
            .with_max_concurrency(config.refiner.max_concurrency)
            .with_use_llm(config.refiner.use_llm);

        if config.refiner.use_llm {
            match registry.create(&config.llm) {
                Ok(provider) => refiner = refiner.with_provider(provider),
                Err(e) => warn!("LLM refinement unavailable, using rule-based cleaning: {}", e),
            }
        }

        Ok(refiner)
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum share of the rule-cleaned unit (in characters) the enhanced
    /// output must keep.
    pub fn with_min_retention_ratio(mut self, ratio: f64) -> Self {
        self.min_retention_ratio = ratio;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Whether [`transform`](Self::transform) requests enhancement.
    pub fn with_use_llm(mut self, use_llm: bool) -> Self {
        self.use_llm = use_llm;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.name())
    }

    pub fn uses_llm(&self) -> bool {
        self.use_llm
    }

    /// Rule-based cleaning alone. Falls back to the trimmed input when the
    /// rules would leave nothing.
    pub fn rule_clean(&self, text: &str) -> String {
        non_blank_or_original(self.cleaner.clean(text), text)
    }

    /// Rule-based cleaning for one unit. Units cut from source code only
    /// get whitespace cleanup.
    pub fn rule_clean_unit(&self, unit: &TextUnit) -> String {
        if unit.is_code() {
            non_blank_or_original(self.cleaner.clean_code(&unit.text), &unit.text)
        } else {
            self.rule_clean(&unit.text)
        }
    }

    /// Refine one unit. Only an invalid unit is an error; enhancement
    /// failures always end in a fallback outcome.
    pub async fn refine(&self, unit: &TextUnit, use_enhancement: bool) -> IngestResult<RefinementOutcome> {
        unit.validate().map_err(IngestError::InvalidUnit)?;
        Ok(self.refine_valid(unit, use_enhancement).await)
    }

    /// Refine a batch, keeping input order. Every unit is validated before
    /// any provider call is made.
    pub async fn refine_batch(&self, units: &[TextUnit], use_enhancement: bool) -> IngestResult<RefineBatch> {
        for unit in units {
            unit.validate().map_err(IngestError::InvalidUnit)?;
        }

        let outcomes: Vec<RefinementOutcome> = stream::iter(
            units
                .iter()
                .map(|unit| self.refine_valid(unit, use_enhancement)),
        )
        .buffered(self.max_concurrency)
        .collect()
        .await;

        let mut counters = RefineCounters::default();
        for outcome in &outcomes {
            counters.record(outcome.strategy_used);
        }

        Ok(RefineBatch { outcomes, counters })
    }

    /// Refine `units` in place and report the tally under [`REFINER_STAGE`].
    pub async fn transform(
        &self,
        units: Vec<TextUnit>,
        sink: &dyn ObservabilitySink,
    ) -> IngestResult<(Vec<TextUnit>, RefineCounters)> {
        let batch = self.refine_batch(&units, self.use_llm).await?;

        let refined: Vec<TextUnit> = units
            .into_iter()
            .zip(batch.outcomes)
            .map(|(mut unit, outcome)| {
                unit.apply_outcome(outcome);
                unit
            })
            .collect();

        sink.record_stage(REFINER_STAGE, &batch.counters);
        info!(
            "Refined {} units ({} enhanced, {} fallback)",
            refined.len(),
            batch.counters.enhanced_count,
            batch.counters.fallback_count
        );

        Ok((refined, batch.counters))
    }

    async fn refine_valid(&self, unit: &TextUnit, use_enhancement: bool) -> RefinementOutcome {
        let fallback = self.rule_clean_unit(unit);

        let provider = match (&self.provider, use_enhancement) {
            (_, false) => return RefinementOutcome::fallback(fallback, REASON_DISABLED),
            (None, true) => return RefinementOutcome::fallback(fallback, REASON_NO_PROVIDER),
            (Some(provider), true) => provider,
        };

        match self.enhance(provider.as_ref(), &unit.text, &fallback).await {
            Ok(text) => RefinementOutcome::enhanced(text),
            Err(reason) => {
                debug!("Unit {} fell back to rule-based cleaning: {}", unit.id, reason);
                RefinementOutcome::fallback(fallback, reason)
            }
        }
    }

    /// Run the provider. `Err` carries the fallback reason.
    ///
    /// Retention is measured against `baseline`, the rule-cleaned text.
    async fn enhance(&self, provider: &dyn LlmProvider, text: &str, baseline: &str) -> Result<String, String> {
        let prompt = self.prompt.render(text);

        let response = match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
            Err(_) => {
                return Err(format!(
                    "invocation timed out after {}ms",
                    self.timeout.as_millis()
                ))
            }
            Ok(Err(e)) => return Err(format!("invocation error: {}", e)),
            Ok(Ok(response)) => response,
        };

        let output = strip_code_fences(&response.text);
        if is_blank(output) {
            return Err(REASON_EMPTY_OUTPUT.to_string());
        }

        let input_len = baseline.chars().count().max(1);
        let ratio = output.chars().count() as f64 / input_len as f64;
        if ratio < self.min_retention_ratio {
            return Err(format!(
                "output below retention threshold ({:.2} < {:.2})",
                ratio, self.min_retention_ratio
            ));
        }

        Ok(output.to_string())
    }
}

fn non_blank_or_original(cleaned: String, original: &str) -> String {
    if is_blank(&cleaned) {
        original.trim().to_string()
    } else {
        cleaned
    }
}

/// Models sometimes wrap the whole answer in a fenced block.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        // Drop the info string line (e.g. "```markdown")
        let body = match body.find('\n') {
            Some(idx) => &body[idx + 1..],
            None => body,
        };
        return body.trim();
    }
    trimmed
}
