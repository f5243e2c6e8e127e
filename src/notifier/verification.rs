//! Contract verification results.
//!
//! A failed verification submitted through the verification form is sent
//! back together with what the subscriber needs to redisplay the form: the
//! field errors, the compiler the form was for and its available versions.

use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::NotifierSettings;
use crate::events::models::{VerificationContext, VerificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compiler {
    Solc,
    Vyper,
}

impl Compiler {
    /// Compiler of the verification form the request came from.
    pub fn from_params(params: &Map<String, Value>) -> Self {
        let is_vyper = params.get("type").and_then(Value::as_str) == Some("vyper")
            || params.contains_key("vyper_contract");

        if is_vyper {
            Compiler::Vyper
        } else {
            Compiler::Solc
        }
    }
}

/// Lookup of the compiler versions offered by the verification form.
#[async_trait]
pub trait CompilerVersions: Send + Sync {
    async fn fetch_versions(&self, compiler: Compiler) -> anyhow::Result<Vec<String>>;
}

/// Versions listed in the configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCompilerVersions {
    solc: Vec<String>,
    vyper: Vec<String>,
}

impl StaticCompilerVersions {
    pub fn new(settings: &NotifierSettings) -> Self {
        Self {
            solc: settings.solc_versions.clone(),
            vyper: settings.vyper_versions.clone(),
        }
    }
}

#[async_trait]
impl CompilerVersions for StaticCompilerVersions {
    async fn fetch_versions(&self, compiler: Compiler) -> anyhow::Result<Vec<String>> {
        Ok(match compiler {
            Compiler::Solc => self.solc.clone(),
            Compiler::Vyper => self.vyper.clone(),
        })
    }
}

/// Compiler versions, or none when the lookup fails.
pub async fn compiler_versions(source: &dyn CompilerVersions, compiler: Compiler) -> Vec<String> {
    match source.fetch_versions(compiler).await {
        Ok(versions) => versions,
        Err(e) => {
            warn!("Failed to fetch {:?} compiler versions: {:#}", compiler, e);
            Vec::new()
        },
    }
}

/// Result payload for a verification submitted through the form.
pub async fn form_result(
    result: VerificationResult,
    context: &VerificationContext,
    versions: &dyn CompilerVersions,
) -> Value {
    match result {
        ok @ VerificationResult::Ok { .. } => json!(ok),
        VerificationResult::Error { errors } => {
            let compiler = Compiler::from_params(&context.params);
            json!({
                "status": "error",
                "errors": errors,
                "form": {
                    "compiler": compiler,
                    "compiler_versions": compiler_versions(versions, compiler).await,
                    "params": context.params,
                },
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnavailableVersions;

    #[async_trait]
    impl CompilerVersions for UnavailableVersions {
        async fn fetch_versions(&self, _compiler: Compiler) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("version list endpoint unreachable")
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn versions() -> StaticCompilerVersions {
        StaticCompilerVersions {
            solc: vec!["v0.8.24+commit.e11b9ed9".to_string()],
            vyper: vec!["0.3.10".to_string()],
        }
    }

    #[test]
    fn test_compiler_selection() {
        assert_eq!(Compiler::from_params(&params(json!({}))), Compiler::Solc);
        assert_eq!(Compiler::from_params(&params(json!({"type": "vyper"}))), Compiler::Vyper);
        assert_eq!(
            Compiler::from_params(&params(json!({"vyper_contract": {}}))),
            Compiler::Vyper
        );
    }

    #[tokio::test]
    async fn test_successful_result_passes_through() {
        let result = VerificationResult::Ok {
            smart_contract: json!({"name": "Token"}),
        };

        let payload = form_result(result, &VerificationContext::default(), &versions()).await;

        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["smart_contract"]["name"], "Token");
    }

    #[tokio::test]
    async fn test_failed_result_carries_form_state() {
        let result = VerificationResult::Error {
            errors: params(json!({"contract_source_code": ["There was an error compiling"]})),
        };
        let context = VerificationContext {
            params: params(json!({"type": "vyper"})),
        };

        let payload = form_result(result, &context, &versions()).await;

        assert_eq!(payload["status"], "error");
        assert_eq!(payload["form"]["compiler"], "vyper");
        assert_eq!(payload["form"]["compiler_versions"], json!(["0.3.10"]));
        assert!(payload["errors"]["contract_source_code"].is_array());
    }

    #[tokio::test]
    async fn test_missing_compiler_versions_default_to_empty() {
        let result = VerificationResult::Error { errors: Map::new() };

        let payload = form_result(result, &VerificationContext::default(), &UnavailableVersions).await;

        assert_eq!(payload["form"]["compiler_versions"], json!([]));
    }
}
