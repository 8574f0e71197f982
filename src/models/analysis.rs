//! Analysis models - wire types shared with the Transaction Analyzer
//!
//! Field names and serde casing follow the analyzer's JSON exactly
//! (snake_case fields, snake_case exploit types, lowercase severities).
//! Do not rename fields here without coordinating an analyzer release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for `POST /analyze/transaction`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub signature: String,
    pub network: Option<String>,
}

/// Full response from the analyzer for a single transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Base risk score, 0-100
    pub risk_score: f64,
    pub exploits: Vec<Exploit>,
    pub state_changes: Vec<StateChange>,
    pub simulation_result: SimulationResult,
    pub metadata: AnalysisMetadata,
}

/// A single exploit finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exploit {
    pub exploit_type: ExploitType,
    pub severity: Severity,
    pub description: String,
    pub location: String,
    pub confidence: f64,
    pub remediation: Option<String>,
}

/// Exploit classes the analyzer can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploitType {
    Reentrancy,
    IntegerOverflow,
    IntegerUnderflow,
    AuthorityBypass,
    UnauthorizedAccess,
    AccountConfusion,
    SignerBypass,
    PdaMismatch,
    MissingOwnerCheck,
    MissingSignerCheck,
    ArbitraryCodeExecution,
    FlashLoanAttack,
    PriceManipulation,
    FrontRunning,
    Sandwich,
    TypeConfusion,
    InsufficientRentExemption,
    OracleManipulation,
    DosAttack,
    ArbitraryCpi,
    BumpSeedCanonical,
    AccountDataMismatch,
    MissingRentCheck,
    UncheckedAccountOwnership,
    TokenAccountValidation,
    MintAuthorityBypass,
    FreezeAuthorityBypass,
    DuplicateAccountMutable,
    AccountReinitialization,
    ClosedAccountRevival,
    Unknown,
}

/// Finding severity. Variant order matters: the derived `Ord` puts
/// `Critical` first, so the most severe finding is the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Account state mutation observed during simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub account: String,
    pub field: String,
    pub before: String,
    pub after: String,
    pub suspicious: bool,
}

/// Simulation outcome attached to every analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    pub error: Option<String>,
    pub compute_units_consumed: u64,
    pub logs: Vec<String>,
    pub accounts_accessed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub timestamp: i64,
    pub analysis_duration_ms: u64,
    pub analyzer_version: String,
    pub network: String,
}

/// One entry of the recent-activity feed for a monitored address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub signature: String,
    pub slot: u64,
    pub timestamp: i64,
}

/// Result of an enhancement pass, remote or local fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    /// Trust in this enhancement, 0-1; the local fallback stays below 1
    pub confidence: f64,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
    /// Enhanced risk score, 0-100
    pub score: f64,
}

/// Analyzer response merged with its enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub signature: String,
    pub network: String,
    /// Combined risk score, 0-100
    pub risk_score: f64,
    /// The analyzer's original score, kept for auditability
    pub base_risk_score: f64,
    pub exploits: Vec<Exploit>,
    pub state_changes: Vec<StateChange>,
    pub simulation_result: SimulationResult,
    pub enhancement: Enhancement,
    pub metadata: AnalysisMetadata,
    pub analyzed_at: DateTime<Utc>,
}

impl FullAnalysis {
    /// Merge an analyzer response with an enhancement.
    ///
    /// The combined score is the base pulled toward the enhanced score in
    /// proportion to the enhancement's confidence, clamped to 0-100. A
    /// fallback enhancement echoes the base score, so the combined score
    /// equals the analyzer's.
    pub fn combine(
        signature: impl Into<String>,
        network: impl Into<String>,
        analysis: AnalysisResponse,
        enhancement: Enhancement,
    ) -> Self {
        let base = analysis.risk_score;
        let risk_score =
            (base + (enhancement.score - base) * enhancement.confidence).clamp(0.0, 100.0);

        Self {
            signature: signature.into(),
            network: network.into(),
            risk_score,
            base_risk_score: base,
            exploits: analysis.exploits,
            state_changes: analysis.state_changes,
            simulation_result: analysis.simulation_result,
            enhancement,
            metadata: analysis.metadata,
            analyzed_at: Utc::now(),
        }
    }

    /// Most severe finding present, if any
    pub fn top_severity(&self) -> Option<Severity> {
        self.exploits.iter().map(|e| e.severity).min()
    }
}
