use serde_json::Value;
use tracing::warn;

use super::policy::ResolutionPolicy;
use crate::domain::catalog::OfferLabel;
use crate::domain::recommendation::{OfferSource, RankedOffer};

const DEFAULT_MESSAGE: &str = "Recommended based on your usage pattern";
const SOCIAL_PROOF_EXPLANATION: &str = "Popular among users with similar usage patterns";
const AGREEMENT_EXPLANATION: &str = "Highly recommended! Both signals agree on this offer.";

/// The reply shapes the classifier is known to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierReply {
    /// `{ primary_offer?, top_offers: [..], confidence_score?, message? }`
    Ranked {
        primary_offer: Option<String>,
        top_offers: Vec<String>,
        confidence: Option<f64>,
        message: Option<String>,
    },
    /// `{ recommendation: { primary_offer, social_proof_offer?, confidence_score? }, message? }`
    Paired {
        primary_offer: Option<String>,
        social_proof_offer: Option<String>,
        confidence: Option<f64>,
        message: Option<String>,
    },
    Unrecognized,
}

impl ClassifierReply {
    pub fn parse(raw: &Value) -> Self {
        let message = string_field(raw, "message");

        if let Some(top_offers) = raw.get("top_offers").and_then(Value::as_array) {
            return Self::Ranked {
                primary_offer: string_field(raw, "primary_offer"),
                top_offers: top_offers
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect(),
                confidence: raw.get("confidence_score").and_then(Value::as_f64),
                message,
            };
        }

        if let Some(recommendation) = raw.get("recommendation").filter(|value| value.is_object()) {
            return Self::Paired {
                primary_offer: string_field(recommendation, "primary_offer"),
                social_proof_offer: string_field(recommendation, "social_proof_offer"),
                confidence: recommendation.get("confidence_score").and_then(Value::as_f64),
                message,
            };
        }

        Self::Unrecognized
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ClassifierReply::Ranked { .. } => "ranked",
            ClassifierReply::Paired { .. } => "paired",
            ClassifierReply::Unrecognized => "unrecognized",
        }
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// Converts any supported classifier reply into one canonical ranked list.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    policy: ResolutionPolicy,
}

impl ResponseNormalizer {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn normalize(&self, raw: &Value) -> Vec<RankedOffer> {
        match ClassifierReply::parse(raw) {
            ClassifierReply::Ranked { primary_offer, top_offers, confidence, message } => {
                self.normalize_ranked(primary_offer, top_offers, confidence, message)
            }
            ClassifierReply::Paired { primary_offer, social_proof_offer, confidence, message } => {
                self.normalize_paired(primary_offer, social_proof_offer, confidence, message)
            }
            ClassifierReply::Unrecognized => {
                warn!(
                    event_name = "resolution.normalizer.unrecognized_reply",
                    "classifier reply matched no known shape"
                );
                Vec::new()
            }
        }
    }

    fn normalize_ranked(
        &self,
        primary_offer: Option<String>,
        top_offers: Vec<String>,
        confidence: Option<f64>,
        message: Option<String>,
    ) -> Vec<RankedOffer> {
        let mut raw_labels = top_offers;
        if let Some(primary) = primary_offer {
            let at_head =
                raw_labels.first().is_some_and(|head| head.trim().eq_ignore_ascii_case(&primary));
            if !at_head {
                raw_labels.insert(0, primary);
            }
        }

        let mut labels: Vec<OfferLabel> = Vec::with_capacity(raw_labels.len());
        for raw_label in &raw_labels {
            if let Some(label) = parse_label(raw_label) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }

        let confidence = self.confidence(confidence);
        let message = message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        labels
            .into_iter()
            .enumerate()
            .map(|(rank, label)| {
                let decayed = confidence * self.policy.rank_decay.powi(rank as i32);
                let explanation = if rank == 0 {
                    format!("{message} (Top recommendation)")
                } else {
                    format!("Alternative recommendation (Rank {})", rank + 1)
                };
                RankedOffer {
                    label,
                    score: decayed.max(self.policy.score_floor).clamp(0.0, 1.0),
                    explanation,
                    rank,
                    source: OfferSource::Classifier,
                }
            })
            .collect()
    }

    fn normalize_paired(
        &self,
        primary_offer: Option<String>,
        social_proof_offer: Option<String>,
        confidence: Option<f64>,
        message: Option<String>,
    ) -> Vec<RankedOffer> {
        let confidence = self.confidence(confidence);
        let primary = primary_offer.as_deref().and_then(parse_label);
        let secondary = social_proof_offer.as_deref().and_then(parse_label);

        let mut offers = Vec::with_capacity(2);
        match (primary, secondary) {
            (Some(primary), Some(secondary)) if primary == secondary => {
                offers.push((
                    primary,
                    (confidence * self.policy.agreement_boost).min(1.0),
                    AGREEMENT_EXPLANATION.to_string(),
                ));
            }
            (primary, secondary) => {
                if let Some(primary) = primary {
                    offers.push((
                        primary,
                        confidence,
                        message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
                    ));
                }
                if let Some(secondary) = secondary {
                    offers.push((
                        secondary,
                        confidence * self.policy.secondary_score_factor,
                        SOCIAL_PROOF_EXPLANATION.to_string(),
                    ));
                }
            }
        }

        offers
            .into_iter()
            .enumerate()
            .map(|(rank, (label, score, explanation))| RankedOffer {
                label,
                score: score.clamp(0.0, 1.0),
                explanation,
                rank,
                source: OfferSource::Classifier,
            })
            .collect()
    }

    /// Missing or non-positive confidence uses the policy default; values above 1 are
    /// percentages.
    fn confidence(&self, raw: Option<f64>) -> f64 {
        let value = raw
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(self.policy.default_confidence);
        let value = if value > 1.0 { value / 100.0 } else { value };
        value.clamp(0.0, 1.0)
    }
}

fn parse_label(raw: &str) -> Option<OfferLabel> {
    match raw.parse::<OfferLabel>() {
        Ok(label) => Some(label),
        Err(_) => {
            warn!(
                event_name = "resolution.normalizer.unknown_label",
                offer_label = raw,
                "dropping offer label outside the known vocabulary"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ClassifierReply, ResponseNormalizer};
    use crate::domain::catalog::OfferLabel;
    use crate::resolution::ResolutionPolicy;

    fn normalizer() -> ResponseNormalizer {
        ResponseNormalizer::new(ResolutionPolicy::default())
    }

    #[test]
    fn parses_both_shapes_and_rejects_others() {
        assert_eq!(ClassifierReply::parse(&json!({"top_offers": []})).shape(), "ranked");
        assert_eq!(
            ClassifierReply::parse(&json!({"recommendation": {"primary_offer": "Data Booster"}}))
                .shape(),
            "paired"
        );
        assert_eq!(ClassifierReply::parse(&json!({"status": "ok"})).shape(), "unrecognized");
        assert_eq!(ClassifierReply::parse(&json!("text")).shape(), "unrecognized");
    }

    #[test]
    fn ranked_reply_decays_by_rank() {
        let offers = normalizer().normalize(&json!({
            "top_offers": ["Data Booster", "Voice Bundle", "Roaming Pass"],
            "confidence_score": 0.9,
            "message": "Based on your usage"
        }));

        assert_eq!(offers.len(), 3);
        assert_eq!(offers[0].label, OfferLabel::DataBooster);
        assert!((offers[0].score - 0.9).abs() < 1e-9);
        assert!((offers[1].score - 0.873).abs() < 1e-9);
        assert!((offers[2].score - 0.9 * 0.97 * 0.97).abs() < 1e-9);
        assert_eq!(offers[0].explanation, "Based on your usage (Top recommendation)");
        assert_eq!(offers[1].explanation, "Alternative recommendation (Rank 2)");
        assert_eq!(offers[2].rank, 2);
    }

    #[test]
    fn ranked_reply_prepends_primary_and_handles_percentages() {
        let offers = normalizer().normalize(&json!({
            "primary_offer": "Roaming Pass",
            "top_offers": ["Data Booster"],
            "confidence_score": 80
        }));

        assert_eq!(offers[0].label, OfferLabel::RoamingPass);
        assert!((offers[0].score - 0.8).abs() < 1e-9);
        assert_eq!(offers[1].label, OfferLabel::DataBooster);
        assert!(offers[0].explanation.starts_with("Recommended based on your usage pattern"));
    }

    #[test]
    fn ranked_scores_never_drop_below_floor() {
        let labels =
            ["General Offer", "Data Booster", "Voice Bundle", "Roaming Pass", "Top-up Promo"];
        let offers =
            normalizer().normalize(&json!({"top_offers": labels, "confidence_score": 0.36}));

        assert_eq!(offers.len(), 5);
        assert!(offers.iter().all(|offer| offer.score >= 0.35));
        assert!(offers.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn unknown_labels_are_dropped_and_ranks_compacted() {
        let offers = normalizer().normalize(&json!({
            "top_offers": ["Mystery Box", "Voice Bundle"],
            "confidence_score": 0.7
        }));

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].label, OfferLabel::VoiceBundle);
        assert_eq!(offers[0].rank, 0);
        assert!((offers[0].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn paired_reply_scores_secondary_lower() {
        let offers = normalizer().normalize(&json!({
            "recommendation": {
                "primary_offer": "Retention Offer",
                "social_proof_offer": "General Offer",
                "confidence_score": 0.6
            },
            "message": "Stay with us"
        }));

        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].explanation, "Stay with us");
        assert!((offers[1].score - 0.51).abs() < 1e-9);
        assert_eq!(offers[1].explanation, "Popular among users with similar usage patterns");
    }

    #[test]
    fn paired_agreement_boosts_single_entry() {
        let offers = normalizer().normalize(&json!({
            "recommendation": {
                "primary_offer": "Data Booster",
                "social_proof_offer": "Data Booster",
                "confidence_score": 0.95
            }
        }));

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].score, 1.0);
        assert!(offers[0].explanation.starts_with("Highly recommended!"));
    }

    #[test]
    fn missing_confidence_defaults_to_half() {
        let offers = normalizer()
            .normalize(&json!({"recommendation": {"primary_offer": "Voice Bundle"}}));
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].score, 0.5);
    }

    #[test]
    fn zero_or_negative_confidence_reads_as_missing() {
        let zero = normalizer().normalize(&json!({
            "recommendation": {"primary_offer": "Voice Bundle", "confidence_score": 0}
        }));
        assert_eq!(zero.len(), 1);
        assert_eq!(zero[0].score, 0.5);

        let negative = normalizer()
            .normalize(&json!({"top_offers": ["Data Booster"], "confidence_score": -0.4}));
        assert_eq!(negative[0].score, 0.5);
    }
}
