//! Enhancement client
//!
//! Sends partial analyses to the node pool and merges failures into a
//! deterministic local fallback. `enhance` never returns an error: a failed
//! node is marked unhealthy and the fallback result is used instead, so a
//! degraded pool slows nothing down beyond the HTTP timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::config::EnhancementConfig;
use crate::constants::enhancement::ENHANCE_PATH;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::models::{AnalysisResponse, Enhancement, ExploitType};

use super::registry::{EnhancementNode, NodeRegistry};

/// Fallback confidence floor with no corroborating findings
const FALLBACK_BASE_CONFIDENCE: f64 = 0.4;
/// Added per finding at the highest severity present
const FALLBACK_CONFIDENCE_STEP: f64 = 0.1;
/// The fallback never reaches full confidence
const FALLBACK_MAX_CONFIDENCE: f64 = 0.85;

struct PatternRule {
    pattern: &'static str,
    recommendation: &'static str,
}

/// Fixed exploit-class knowledge used when no node is reachable. Pattern
/// names and remediations match what the analyzer itself reports.
static PATTERN_RULES: Lazy<HashMap<ExploitType, PatternRule>> = Lazy::new(|| {
    let mut rules = HashMap::new();
    rules.insert(
        ExploitType::Reentrancy,
        PatternRule {
            pattern: "Reentrancy Attack",
            recommendation: "Implement checks-effects-interactions pattern and use reentrancy guards",
        },
    );
    rules.insert(
        ExploitType::IntegerOverflow,
        PatternRule {
            pattern: "Integer Overflow",
            recommendation: "Use checked arithmetic operations (checked_add, checked_mul, etc.)",
        },
    );
    rules.insert(
        ExploitType::IntegerUnderflow,
        PatternRule {
            pattern: "Integer Underflow",
            recommendation: "Use checked arithmetic operations (checked_add, checked_mul, etc.)",
        },
    );
    rules.insert(
        ExploitType::AuthorityBypass,
        PatternRule {
            pattern: "Authority Bypass",
            recommendation: "Validate authority signatures and implement proper access control",
        },
    );
    rules.insert(
        ExploitType::MissingOwnerCheck,
        PatternRule {
            pattern: "Missing Owner Check",
            recommendation: "Add owner validation checks before performing privileged operations",
        },
    );
    rules.insert(
        ExploitType::MissingSignerCheck,
        PatternRule {
            pattern: "Missing Signer Check",
            recommendation: "Ensure critical accounts are marked as signers and validated",
        },
    );
    rules.insert(
        ExploitType::PdaMismatch,
        PatternRule {
            pattern: "PDA Mismatch",
            recommendation: "Verify PDA derivation matches expected seeds and program ID",
        },
    );
    rules.insert(
        ExploitType::FlashLoanAttack,
        PatternRule {
            pattern: "Flash Loan Attack",
            recommendation: "Implement time-weighted average pricing and multi-block validation",
        },
    );
    rules.insert(
        ExploitType::AccountConfusion,
        PatternRule {
            pattern: "Account Confusion",
            recommendation: "Implement strict account type checking and validation before operations",
        },
    );
    rules.insert(
        ExploitType::SignerBypass,
        PatternRule {
            pattern: "Signer Bypass",
            recommendation: "Verify signer privileges and implement proper authorization checks",
        },
    );
    rules.insert(
        ExploitType::TypeConfusion,
        PatternRule {
            pattern: "Type Confusion",
            recommendation: "Add discriminator fields and validate account types before deserialization",
        },
    );
    rules.insert(
        ExploitType::InsufficientRentExemption,
        PatternRule {
            pattern: "Insufficient Rent Exemption",
            recommendation: "Verify account has sufficient lamports for rent exemption before operations",
        },
    );
    rules.insert(
        ExploitType::OracleManipulation,
        PatternRule {
            pattern: "Oracle Manipulation",
            recommendation: "Validate oracle data freshness and use multiple oracle sources",
        },
    );
    rules.insert(
        ExploitType::DosAttack,
        PatternRule {
            pattern: "DoS Attack",
            recommendation: "Implement rate limiting, account limits, and proper resource management",
        },
    );
    rules.insert(
        ExploitType::ArbitraryCpi,
        PatternRule {
            pattern: "Arbitrary CPI",
            recommendation: "Whitelist allowed programs for CPI and validate program IDs",
        },
    );
    rules.insert(
        ExploitType::BumpSeedCanonical,
        PatternRule {
            pattern: "Non-canonical Bump Seed",
            recommendation: "Use find_program_address and verify bump seed is canonical",
        },
    );
    rules.insert(
        ExploitType::AccountDataMismatch,
        PatternRule {
            pattern: "Account Data Mismatch",
            recommendation: "Validate account data structure matches expected format before parsing",
        },
    );
    rules.insert(
        ExploitType::UncheckedAccountOwnership,
        PatternRule {
            pattern: "Unchecked Account Ownership",
            recommendation: "Verify account owner matches expected program ID before operations",
        },
    );
    rules.insert(
        ExploitType::TokenAccountValidation,
        PatternRule {
            pattern: "Token Account Validation",
            recommendation: "Validate token account owner, mint, and associated token account derivation",
        },
    );
    rules.insert(
        ExploitType::MintAuthorityBypass,
        PatternRule {
            pattern: "Mint Authority Bypass",
            recommendation: "Verify mint/freeze authority before allowing privileged token operations",
        },
    );
    rules.insert(
        ExploitType::FreezeAuthorityBypass,
        PatternRule {
            pattern: "Freeze Authority Bypass",
            recommendation: "Verify mint/freeze authority before allowing privileged token operations",
        },
    );
    rules.insert(
        ExploitType::DuplicateAccountMutable,
        PatternRule {
            pattern: "Duplicate Mutable Accounts",
            recommendation: "Check for duplicate mutable accounts in instruction account list",
        },
    );
    rules.insert(
        ExploitType::AccountReinitialization,
        PatternRule {
            pattern: "Account Reinitialization",
            recommendation: "Check is_initialized flag before initialization and set flag after",
        },
    );
    rules.insert(
        ExploitType::ClosedAccountRevival,
        PatternRule {
            pattern: "Closed Account Revival",
            recommendation: "Zero out account data on close and check discriminator on access",
        },
    );
    rules
});

/// Local enhancement used when no node can serve a request.
///
/// Pure and deterministic: pattern and recommendation strings come from the
/// fixed rule table in exploit order without duplicates; confidence grows
/// with the number of findings at the highest severity present and stays
/// below full confidence; the score echoes the analyzer's.
pub fn fallback_enhancement(analysis: &AnalysisResponse) -> Enhancement {
    let mut patterns: Vec<String> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    for exploit in &analysis.exploits {
        if let Some(rule) = PATTERN_RULES.get(&exploit.exploit_type) {
            if !patterns.iter().any(|p| p == rule.pattern) {
                patterns.push(rule.pattern.to_string());
            }
            if !recommendations.iter().any(|r| r == rule.recommendation) {
                recommendations.push(rule.recommendation.to_string());
            }
        }
    }

    if !analysis.exploits.is_empty() && recommendations.is_empty() {
        recommendations.push("Review code for security best practices".to_string());
    }

    let confidence = match analysis.exploits.iter().map(|e| e.severity).min() {
        Some(top) => {
            let corroborating = analysis
                .exploits
                .iter()
                .filter(|e| e.severity == top)
                .count();
            (FALLBACK_BASE_CONFIDENCE + FALLBACK_CONFIDENCE_STEP * corroborating as f64)
                .min(FALLBACK_MAX_CONFIDENCE)
        }
        None => FALLBACK_BASE_CONFIDENCE,
    };

    Enhancement {
        confidence,
        patterns,
        recommendations,
        score: analysis.risk_score,
    }
}

/// Client for the enhancement node pool
pub struct EnhancementClient {
    registry: Arc<NodeRegistry>,
    client: reqwest::Client,
    metrics: Option<Arc<MetricsState>>,
}

impl EnhancementClient {
    /// Create a new enhancement client over the given pool
    pub fn new(
        registry: Arc<NodeRegistry>,
        config: &EnhancementConfig,
        metrics: Option<Arc<MetricsState>>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.enhance_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            registry,
            client,
            metrics,
        }
    }

    /// Enhance a partial analysis.
    ///
    /// Selects the next healthy node; any failure marks that node unhealthy
    /// and degrades to the local fallback. Infallible by design: the poll
    /// pipeline must keep moving whatever the pool looks like.
    pub async fn enhance(&self, analysis: &AnalysisResponse) -> Enhancement {
        let Some(node) = self.registry.select_healthy() else {
            tracing::debug!("No healthy enhancement nodes, using local fallback");
            self.count_fallback();
            return fallback_enhancement(analysis);
        };

        match self.call_node(&node, analysis).await {
            Ok(enhancement) => enhancement,
            Err(e) => {
                tracing::warn!(
                    node = %node.id,
                    endpoint = %node.endpoint,
                    error = %e,
                    "Enhancement call failed, falling back locally"
                );
                self.registry.mark_unhealthy(&node.id);
                self.count_fallback();
                fallback_enhancement(analysis)
            }
        }
    }

    async fn call_node(
        &self,
        node: &EnhancementNode,
        analysis: &AnalysisResponse,
    ) -> AppResult<Enhancement> {
        let url = format!("{}{}", node.endpoint, ENHANCE_PATH);

        let response = self
            .client
            .post(&url)
            .json(analysis)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("enhance request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "enhancement node returned {}",
                response.status()
            )));
        }

        response
            .json::<Enhancement>()
            .await
            .map_err(|e| AppError::Upstream(format!("enhancement response malformed: {}", e)))
    }

    fn count_fallback(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.enhancement_fallbacks.inc();
        }
    }
}
