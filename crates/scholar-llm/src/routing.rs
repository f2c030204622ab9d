//! Model id resolution
//!
//! Maps a model id from the request to the provider that serves it.

use regex::Regex;
use scholar_config::ModelFilter;

use crate::error::LlmError;

/// Resolved target for a model request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Provider name (key in config)
    pub provider_name: String,
    /// Model identifier to send to the provider
    pub model_id: String,
    /// Whether the caller named the provider (e.g. `claude/claude-3-haiku`)
    pub explicit_provider: bool,
}

/// Compiled include/exclude patterns of one provider
#[derive(Debug)]
struct CompiledFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl CompiledFilter {
    fn compile(provider: &str, filter: &ModelFilter) -> Result<Self, LlmError> {
        let compile_all = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        LlmError::InvalidRequest(format!("invalid model pattern for provider '{provider}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            include: compile_all(&filter.include)?,
            exclude: compile_all(&filter.exclude)?,
        })
    }

    fn admits(&self, model: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|re| re.is_match(model));
        included && !self.exclude.iter().any(|re| re.is_match(model))
    }
}

/// Model routing table, in provider registration order
#[derive(Debug, Default)]
pub struct ModelRouter {
    providers: Vec<(String, CompiledFilter)>,
}

impl ModelRouter {
    /// Append a provider to the routing table
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` if a pattern does not compile
    pub fn add(&mut self, name: &str, filter: &ModelFilter) -> Result<(), LlmError> {
        let compiled = CompiledFilter::compile(name, filter)?;
        self.providers.push((name.to_owned(), compiled));
        Ok(())
    }

    /// Resolve a model id to a provider and model identifier
    ///
    /// Supports two formats:
    /// - `provider_name/model_name` -- explicit provider selection
    /// - `model_name` -- first provider whose filter admits the model
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` if an explicit provider name is unknown.
    /// Returns `LlmError::ModelNotFound` if no provider serves the model.
    pub fn resolve(&self, model: &str) -> Result<ResolvedModel, LlmError> {
        if let Some((provider_name, model_id)) = model.split_once('/')
            && let Some((_, filter)) = self.providers.iter().find(|(name, _)| name == provider_name)
        {
            if !filter.admits(model_id) {
                return Err(LlmError::ModelNotFound {
                    model: model.to_owned(),
                });
            }

            return Ok(ResolvedModel {
                provider_name: provider_name.to_owned(),
                model_id: model_id.to_owned(),
                explicit_provider: true,
            });
        }

        // Bare ids, and ids whose prefix is not a provider name (e.g. `models/gemini-pro`)
        if let Some((provider_name, _)) = self.providers.iter().find(|(_, filter)| filter.admits(model)) {
            return Ok(ResolvedModel {
                provider_name: provider_name.clone(),
                model_id: model.to_owned(),
                explicit_provider: false,
            });
        }

        match model.split_once('/') {
            Some((provider_name, _)) => Err(LlmError::ProviderNotFound {
                provider: provider_name.to_owned(),
            }),
            None => Err(LlmError::ModelNotFound {
                model: model.to_owned(),
            }),
        }
    }
}
