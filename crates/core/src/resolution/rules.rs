use std::collections::HashMap;

use tracing::debug;

use super::features::FeatureVector;
use super::policy::ResolutionPolicy;
use crate::domain::catalog::OfferLabel;
use crate::domain::profile::{BudgetTier, UsageType, UserProfile};
use crate::domain::recommendation::{OfferSource, RankedOffer};

const LONG_CALL_MINUTES: f64 = 200.0;
const TRAVELER_SCORE: u32 = 30;
const MIN_FIRED_OFFERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTrigger {
    DataOrStreaming,
    VoiceOrLongCalls,
    Gaming,
    LowBudget,
    HighBudget,
    FewOffers,
    Traveler,
}

#[derive(Debug, Clone, Copy)]
struct RuleSeed {
    trigger: RuleTrigger,
    label: OfferLabel,
    score: f64,
    reason: &'static str,
}

/// Evaluated in order; `FewOffers` looks at what earlier rules produced.
const RULE_SEEDS: &[RuleSeed] = &[
    RuleSeed {
        trigger: RuleTrigger::DataOrStreaming,
        label: OfferLabel::DataBooster,
        score: 0.90,
        reason: "High data usage detected",
    },
    RuleSeed {
        trigger: RuleTrigger::DataOrStreaming,
        label: OfferLabel::StreamingPartnerPack,
        score: 0.85,
        reason: "Perfect for streaming",
    },
    RuleSeed {
        trigger: RuleTrigger::VoiceOrLongCalls,
        label: OfferLabel::VoiceBundle,
        score: 0.88,
        reason: "Frequent calls detected",
    },
    RuleSeed {
        trigger: RuleTrigger::Gaming,
        label: OfferLabel::StreamingPartnerPack,
        score: 0.82,
        reason: "Good for online gaming",
    },
    RuleSeed {
        trigger: RuleTrigger::LowBudget,
        label: OfferLabel::TopUpPromo,
        score: 0.75,
        reason: "Budget-friendly option",
    },
    RuleSeed {
        trigger: RuleTrigger::LowBudget,
        label: OfferLabel::GeneralOffer,
        score: 0.70,
        reason: "Best value package",
    },
    RuleSeed {
        trigger: RuleTrigger::HighBudget,
        label: OfferLabel::FamilyPlanOffer,
        score: 0.80,
        reason: "Premium family package",
    },
    RuleSeed {
        trigger: RuleTrigger::HighBudget,
        label: OfferLabel::DeviceUpgradeOffer,
        score: 0.78,
        reason: "Upgrade to premium device",
    },
    RuleSeed {
        trigger: RuleTrigger::FewOffers,
        label: OfferLabel::GeneralOffer,
        score: 0.70,
        reason: "Popular combo package",
    },
    RuleSeed {
        trigger: RuleTrigger::FewOffers,
        label: OfferLabel::DataBooster,
        score: 0.65,
        reason: "Extra data boost",
    },
    RuleSeed {
        trigger: RuleTrigger::Traveler,
        label: OfferLabel::RoamingPass,
        score: 0.77,
        reason: "Great for travelers",
    },
];

/// Deterministic stand-in for the classifier when it cannot be used.
#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    confidence_cap: f64,
    max_offers: usize,
}

impl RuleBasedScorer {
    pub fn new(policy: &ResolutionPolicy) -> Self {
        Self { confidence_cap: policy.rule_confidence_cap, max_offers: policy.max_rule_offers }
    }

    pub fn score(&self, profile: &UserProfile, features: &FeatureVector) -> Vec<RankedOffer> {
        let mut fired: Vec<&RuleSeed> = Vec::new();
        for seed in RULE_SEEDS {
            let triggered = match seed.trigger {
                RuleTrigger::DataOrStreaming => {
                    profile.usage_type == UsageType::Data || profile.has_interest("streaming")
                }
                RuleTrigger::VoiceOrLongCalls => {
                    profile.usage_type == UsageType::Voice
                        || features.avg_call_duration > LONG_CALL_MINUTES
                }
                RuleTrigger::Gaming => profile.has_interest("gaming"),
                RuleTrigger::LowBudget => profile.budget == Some(BudgetTier::Low),
                RuleTrigger::HighBudget => profile.budget == Some(BudgetTier::High),
                RuleTrigger::FewOffers => {
                    fired.iter().filter(|earlier| earlier.trigger != RuleTrigger::FewOffers).count()
                        < MIN_FIRED_OFFERS
                }
                RuleTrigger::Traveler => {
                    features.travel_score > TRAVELER_SCORE || profile.has_interest("travel")
                }
            };
            if triggered {
                fired.push(seed);
            }
        }

        let mut best: HashMap<OfferLabel, &RuleSeed> = HashMap::new();
        for seed in fired {
            best.entry(seed.label)
                .and_modify(|current| {
                    if seed.score > current.score {
                        *current = seed;
                    }
                })
                .or_insert(seed);
        }

        let mut seeds = best.into_values().collect::<Vec<_>>();
        seeds.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.label.cmp(&b.label)));
        seeds.truncate(self.max_offers);

        let offers = seeds
            .into_iter()
            .enumerate()
            .map(|(rank, seed)| RankedOffer {
                label: seed.label,
                score: seed.score.min(self.confidence_cap).clamp(0.0, 1.0),
                explanation: seed.reason.to_string(),
                rank,
                source: OfferSource::RuleTable,
            })
            .collect::<Vec<_>>();

        debug!(
            event_name = "resolution.rules.scored",
            offer_count = offers.len(),
            "rule table produced offers"
        );
        offers
    }
}
