use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Low => "low",
            BudgetTier::Medium => "medium",
            BudgetTier::High => "high",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(DomainError::unrecognized("budget tier", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Data,
    Voice,
    Sms,
    #[default]
    Mixed,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Data => "data",
            UsageType::Voice => "voice",
            UsageType::Sms => "sms",
            UsageType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "data" => Ok(Self::Data),
            "voice" => Ok(Self::Voice),
            "sms" => Ok(Self::Sms),
            "mixed" => Ok(Self::Mixed),
            _ => Err(DomainError::unrecognized("usage type", value)),
        }
    }
}

/// Measured usage, when the caller has it. Missing fields fall back to
/// profile-derived defaults in [`crate::resolution::FeatureVector`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSignals {
    /// Monthly data usage in MB.
    pub avg_data_usage_mb: Option<f64>,
    /// Share of data spent on video, 0.0 - 1.0.
    pub pct_video_usage: Option<f64>,
    /// Average call minutes per month.
    pub avg_call_duration_min: Option<f64>,
    pub avg_sms_count: Option<u32>,
    pub avg_monthly_spend: Option<f64>,
    pub topup_freq: Option<u32>,
    /// Travel propensity, 0.0 - 1.0.
    pub travel_score: Option<f64>,
    pub complaint_count: Option<u32>,
    pub plan_type: Option<String>,
    pub device_brand: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub budget: Option<BudgetTier>,
    pub usage_type: UsageType,
    pub interests: Vec<String>,
    pub signals: UsageSignals,
}

impl UserProfile {
    pub fn new(usage_type: UsageType) -> Self {
        Self { usage_type, ..Self::default() }
    }

    pub fn with_budget(mut self, budget: BudgetTier) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signals(mut self, signals: UsageSignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests.iter().any(|candidate| candidate.trim().eq_ignore_ascii_case(interest))
    }
}

/// Advisory algorithm name supplied by the caller and recorded with history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmHint {
    #[serde(rename = "collaborative")]
    Collaborative,
    #[serde(rename = "content-based")]
    ContentBased,
    #[default]
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl AlgorithmHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmHint::Collaborative => "collaborative",
            AlgorithmHint::ContentBased => "content-based",
            AlgorithmHint::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for AlgorithmHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmHint {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "collaborative" => Ok(Self::Collaborative),
            "content-based" | "content_based" => Ok(Self::ContentBased),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(DomainError::unrecognized("algorithm", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlgorithmHint, BudgetTier, UsageType, UserProfile};

    #[test]
    fn profile_deserializes_with_defaults() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"budget":"low","interests":["Streaming"]}"#)
                .expect("profile should deserialize");

        assert_eq!(profile.budget, Some(BudgetTier::Low));
        assert_eq!(profile.usage_type, UsageType::Mixed);
        assert!(profile.has_interest("streaming"));
        assert!(profile.signals.travel_score.is_none());
    }

    #[test]
    fn algorithm_hint_accepts_both_spellings_of_content_based() {
        assert_eq!("content-based".parse::<AlgorithmHint>(), Ok(AlgorithmHint::ContentBased));
        assert_eq!("content_based".parse::<AlgorithmHint>(), Ok(AlgorithmHint::ContentBased));
        assert!("random".parse::<AlgorithmHint>().is_err());
    }

    #[test]
    fn unknown_budget_tier_is_rejected() {
        let error = "premium".parse::<BudgetTier>().expect_err("premium is not a tier");
        assert!(error.to_string().contains("budget tier"));
    }
}
