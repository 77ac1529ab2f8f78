use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogItemId(pub String);

impl CatalogItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product category as stored in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Data,
    Voice,
    Sms,
    Combo,
    Roaming,
    Streaming,
    Device,
    Retention,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Data,
        Category::Voice,
        Category::Sms,
        Category::Combo,
        Category::Roaming,
        Category::Streaming,
        Category::Device,
        Category::Retention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Data => "data",
            Category::Voice => "voice",
            Category::Sms => "sms",
            Category::Combo => "combo",
            Category::Roaming => "roaming",
            Category::Streaming => "streaming",
            Category::Device => "device",
            Category::Retention => "retention",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        // Video-on-demand packs were catalogued as `vod` before streaming existed.
        if normalized == "vod" {
            return Ok(Category::Streaming);
        }
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| DomainError::unrecognized("category", value))
    }
}

/// Offer vocabulary of the external classifier.
///
/// Labels are never stored on a user; they are matched against
/// [`CatalogItem::target_offer`] or mapped onto a [`Category`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OfferLabel {
    #[serde(rename = "Data Booster")]
    DataBooster,
    #[serde(rename = "Voice Bundle")]
    VoiceBundle,
    #[serde(rename = "Roaming Pass")]
    RoamingPass,
    #[serde(rename = "Streaming Partner Pack")]
    StreamingPartnerPack,
    #[serde(rename = "Family Plan Offer")]
    FamilyPlanOffer,
    #[serde(rename = "Device Upgrade Offer")]
    DeviceUpgradeOffer,
    #[serde(rename = "Retention Offer")]
    RetentionOffer,
    #[serde(rename = "Top-up Promo")]
    TopUpPromo,
    #[serde(rename = "General Offer")]
    GeneralOffer,
}

impl OfferLabel {
    pub const ALL: [OfferLabel; 9] = [
        OfferLabel::DataBooster,
        OfferLabel::VoiceBundle,
        OfferLabel::RoamingPass,
        OfferLabel::StreamingPartnerPack,
        OfferLabel::FamilyPlanOffer,
        OfferLabel::DeviceUpgradeOffer,
        OfferLabel::RetentionOffer,
        OfferLabel::TopUpPromo,
        OfferLabel::GeneralOffer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferLabel::DataBooster => "Data Booster",
            OfferLabel::VoiceBundle => "Voice Bundle",
            OfferLabel::RoamingPass => "Roaming Pass",
            OfferLabel::StreamingPartnerPack => "Streaming Partner Pack",
            OfferLabel::FamilyPlanOffer => "Family Plan Offer",
            OfferLabel::DeviceUpgradeOffer => "Device Upgrade Offer",
            OfferLabel::RetentionOffer => "Retention Offer",
            OfferLabel::TopUpPromo => "Top-up Promo",
            OfferLabel::GeneralOffer => "General Offer",
        }
    }

    /// Category used when no catalog item targets this label directly.
    pub fn mapped_category(&self) -> Category {
        match self {
            OfferLabel::VoiceBundle => Category::Voice,
            OfferLabel::DataBooster | OfferLabel::TopUpPromo => Category::Data,
            OfferLabel::RoamingPass => Category::Roaming,
            OfferLabel::StreamingPartnerPack => Category::Streaming,
            OfferLabel::FamilyPlanOffer
            | OfferLabel::RetentionOffer
            | OfferLabel::GeneralOffer => Category::Combo,
            OfferLabel::DeviceUpgradeOffer => Category::Device,
        }
    }
}

impl fmt::Display for OfferLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferLabel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        OfferLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::unrecognized("offer label", value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub category: Category,
    /// Price in whole currency units.
    pub price: i64,
    pub target_offer: Option<OfferLabel>,
    pub purchase_count: u32,
    pub is_active: bool,
}

impl CatalogItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        price: i64,
    ) -> Self {
        Self {
            id: CatalogItemId::new(id),
            name: name.into(),
            category,
            price,
            target_offer: None,
            purchase_count: 0,
            is_active: true,
        }
    }

    pub fn with_target_offer(mut self, label: OfferLabel) -> Self {
        self.target_offer = Some(label);
        self
    }

    pub fn with_purchase_count(mut self, purchase_count: u32) -> Self {
        self.purchase_count = purchase_count;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
