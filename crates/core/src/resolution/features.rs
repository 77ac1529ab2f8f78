use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::profile::{BudgetTier, UsageType, UserProfile};
use crate::domain::recommendation::UsedFeatures;

const DEFAULT_DATA_USAGE_MB: f64 = 5_000.0;
const DATA_USER_DATA_USAGE_MB: f64 = 15_000.0;
const DEFAULT_VIDEO_SHARE: f64 = 0.30;
const STREAMING_VIDEO_SHARE: f64 = 0.60;
const DEFAULT_CALL_MINUTES: f64 = 100.0;
const VOICE_USER_CALL_MINUTES: f64 = 500.0;
const DEFAULT_SMS_COUNT: u32 = 50;
const DEFAULT_MONTHLY_SPEND: f64 = 75_000.0;
const LOW_BUDGET_MONTHLY_SPEND: f64 = 50_000.0;
const HIGH_BUDGET_MONTHLY_SPEND: f64 = 150_000.0;
const DEFAULT_TOPUP_FREQ: u32 = 1;
const DEFAULT_TRAVEL_SHARE: f64 = 0.10;
const DEFAULT_DEVICE_BRAND: &str = "Samsung";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanType {
    #[default]
    Prepaid,
    Postpaid,
}

impl PlanType {
    /// Maps free-form plan names onto the two values the classifier accepts.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Prepaid;
        };
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.contains("prepaid") || normalized == "basic" || normalized == "standard" {
            Self::Prepaid
        } else if normalized.contains("postpaid") || normalized == "premium" {
            Self::Postpaid
        } else {
            Self::Prepaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Prepaid => "Prepaid",
            PlanType::Postpaid => "Postpaid",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-shape request body for the external classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_data_usage_gb: f64,
    /// Integer percent, 0 - 100.
    pub pct_video_usage: u32,
    pub avg_call_duration: f64,
    pub sms_freq: u32,
    pub monthly_spend: f64,
    pub topup_freq: u32,
    /// Integer scale, 0 - 100.
    pub travel_score: u32,
    pub complaint_count: u32,
    pub plan_type: PlanType,
    pub device_brand: String,
}

impl FeatureVector {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let signals = &profile.signals;

        let data_usage_mb = data_usage_mb(profile);
        let video_share = signals.pct_video_usage.unwrap_or(if profile.has_interest("streaming") {
            STREAMING_VIDEO_SHARE
        } else {
            DEFAULT_VIDEO_SHARE
        });
        let call_minutes = call_minutes(profile);
        let monthly_spend = signals.avg_monthly_spend.unwrap_or(match profile.budget {
            Some(BudgetTier::Low) => LOW_BUDGET_MONTHLY_SPEND,
            Some(BudgetTier::High) => HIGH_BUDGET_MONTHLY_SPEND,
            Some(BudgetTier::Medium) | None => DEFAULT_MONTHLY_SPEND,
        });
        let plan_name = signals.plan_type.as_deref().unwrap_or(match profile.budget {
            Some(BudgetTier::High) => "premium",
            Some(BudgetTier::Low) => "basic",
            Some(BudgetTier::Medium) | None => "standard",
        });

        Self {
            avg_data_usage_gb: data_usage_mb / 1024.0,
            pct_video_usage: share_to_percent(video_share),
            avg_call_duration: call_minutes,
            sms_freq: signals.avg_sms_count.unwrap_or(DEFAULT_SMS_COUNT),
            monthly_spend,
            topup_freq: signals.topup_freq.unwrap_or(DEFAULT_TOPUP_FREQ),
            travel_score: share_to_percent(signals.travel_score.unwrap_or(DEFAULT_TRAVEL_SHARE)),
            complaint_count: signals.complaint_count.unwrap_or(0),
            plan_type: PlanType::normalize(Some(plan_name)),
            device_brand: signals
                .device_brand
                .clone()
                .filter(|brand| !brand.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEVICE_BRAND.to_string()),
        }
    }

    /// Echo of the inputs worth reporting back with a result.
    pub fn used_features(&self) -> UsedFeatures {
        let data_usage_mb = self.avg_data_usage_gb * 1024.0;
        UsedFeatures {
            avg_data_usage_mb: data_usage_mb,
            user_segment: user_segment(data_usage_mb, self.avg_call_duration, self.monthly_spend)
                .to_string(),
        }
    }
}

fn data_usage_mb(profile: &UserProfile) -> f64 {
    profile.signals.avg_data_usage_mb.unwrap_or(match profile.usage_type {
        UsageType::Data => DATA_USER_DATA_USAGE_MB,
        _ => DEFAULT_DATA_USAGE_MB,
    })
}

fn call_minutes(profile: &UserProfile) -> f64 {
    profile.signals.avg_call_duration_min.unwrap_or(match profile.usage_type {
        UsageType::Voice => VOICE_USER_CALL_MINUTES,
        _ => DEFAULT_CALL_MINUTES,
    })
}

fn share_to_percent(share: f64) -> u32 {
    (share.clamp(0.0, 1.0) * 100.0).round() as u32
}

fn user_segment(data_usage_mb: f64, call_minutes: f64, monthly_spend: f64) -> &'static str {
    if data_usage_mb > 10_000.0 {
        "heavy_data_user"
    } else if call_minutes > 300.0 {
        "heavy_voice_user"
    } else if data_usage_mb < 500.0 && call_minutes < 20.0 && monthly_spend < 30_000.0 {
        "inactive_user"
    } else if data_usage_mb < 2_000.0 && call_minutes < 50.0 {
        "light_user"
    } else {
        "balanced_user"
    }
}
