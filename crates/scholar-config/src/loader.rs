use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus file access
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, a model pattern is not
    /// a valid regex, or a chat default is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_llm_config()?;
        self.validate_chat_config()?;
        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() {
            anyhow::bail!("at least one LLM provider must be configured");
        }

        for (name, provider) in &self.llm.providers {
            for pattern in provider.models.include.iter().chain(&provider.models.exclude) {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid model pattern for provider '{name}': {e}"))?;
            }
        }

        Ok(())
    }

    fn validate_chat_config(&self) -> anyhow::Result<()> {
        let chat = &self.chat;

        if !(0.0..=1.0).contains(&chat.top_p) {
            anyhow::bail!("chat.top_p must be within 0.0..=1.0, got {}", chat.top_p);
        }

        if !(0.0..=2.0).contains(&chat.temperature) {
            anyhow::bail!("chat.temperature must be within 0.0..=2.0, got {}", chat.temperature);
        }

        if chat.max_tokens == 0 {
            anyhow::bail!("chat.max_tokens must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use crate::{Config, DEFAULT_SYSTEM_PROMPT, LlmProviderType};

    const MINIMAL: &str = r#"
[llm.providers.claude]
type = "anthropic"
api_key = "sk-test"
"#;

    #[test]
    fn minimal_config_uses_chat_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.chat.max_tokens, 1024);
        assert!(config.retrieval.is_none());

        let provider = &config.llm.providers["claude"];
        assert!(matches!(provider.provider_type, LlmProviderType::Anthropic));
        assert_eq!(provider.api_key.as_ref().unwrap().expose_secret(), "sk-test");
    }

    #[test]
    fn bedrock_provider_and_retrieval_section() {
        let raw = r#"
[llm.providers.aws]
type = { bedrock = { region = "us-east-1" } }
models.include = ["^anthropic\\."]

[retrieval]
endpoint = "http://localhost:9000"
documents = 5
threshold = 0.4
"#;
        let config = Config::parse(raw).unwrap();

        let LlmProviderType::Bedrock(bedrock) = &config.llm.providers["aws"].provider_type else {
            panic!("expected bedrock provider");
        };
        assert_eq!(bedrock.region, "us-east-1");

        let retrieval = config.retrieval.unwrap();
        assert_eq!(retrieval.documents, 5);
        assert!((retrieval.threshold - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn providers_keep_declaration_order() {
        let raw = r#"
[llm.providers.zeta]
type = "google"

[llm.providers.alpha]
type = "anthropic"
"#;
        let config = Config::parse(raw).unwrap();
        let names: Vec<_> = config.llm.providers.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = Config::parse("").unwrap_err();
        assert!(err.to_string().contains("at least one LLM provider"));
    }

    #[test]
    fn invalid_model_pattern_is_rejected() {
        let raw = r#"
[llm.providers.claude]
type = "anthropic"
models.exclude = ["("]
"#;
        let err = Config::parse(raw).unwrap_err();
        assert!(err.to_string().contains("invalid model pattern for provider 'claude'"));
    }

    #[test]
    fn out_of_range_top_p_is_rejected() {
        let raw = format!("{MINIMAL}\n[chat]\ntop_p = 1.5\n");
        let err = Config::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("chat.top_p"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = format!("{MINIMAL}\n[chat]\nsystem_promt = \"typo\"\n");
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn load_expands_env_placeholders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm.providers.claude]\ntype = \"anthropic\"\napi_key = \"{{{{ env.SCHOLAR_TEST_KEY }}}}\""
        )
        .unwrap();

        temp_env::with_var("SCHOLAR_TEST_KEY", Some("from-env"), || {
            let config = Config::load(file.path()).unwrap();
            let key = config.llm.providers["claude"].api_key.as_ref().unwrap();
            assert_eq!(key.expose_secret(), "from-env");
        });
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(std::path::Path::new("/nonexistent/scholar.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
