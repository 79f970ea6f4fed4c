use serde::Serialize;

/// Display tier for a deal's heat score. The score itself comes from the
/// deal aggregate and is never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, async_graphql::Enum)]
#[serde(rename_all = "lowercase")]
pub enum HeatTier {
    Hot,
    Warm,
    Neutral,
    Cold,
}

const HOT_THRESHOLD: i64 = 90;
const WARM_THRESHOLD: i64 = 50;

impl HeatTier {
    pub fn from_score(score: i64) -> Self {
        if score >= HOT_THRESHOLD {
            HeatTier::Hot
        } else if score >= WARM_THRESHOLD {
            HeatTier::Warm
        } else if score >= 0 {
            HeatTier::Neutral
        } else {
            HeatTier::Cold
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            HeatTier::Hot => "🔥",
            HeatTier::Warm => "♨️",
            HeatTier::Neutral => "😐",
            HeatTier::Cold => "🧊",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            HeatTier::Hot => "heat-hot",
            HeatTier::Warm => "heat-warm",
            HeatTier::Neutral => "heat-neutral",
            HeatTier::Cold => "heat-cold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeatTier::Hot => "hot",
            HeatTier::Warm => "warm",
            HeatTier::Neutral => "neutral",
            HeatTier::Cold => "cold",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(HeatTier::from_score(90), HeatTier::Hot);
        assert_eq!(HeatTier::from_score(89), HeatTier::Warm);
        assert_eq!(HeatTier::from_score(50), HeatTier::Warm);
        assert_eq!(HeatTier::from_score(49), HeatTier::Neutral);
        assert_eq!(HeatTier::from_score(0), HeatTier::Neutral);
        assert_eq!(HeatTier::from_score(-1), HeatTier::Cold);
    }

    #[test]
    fn extremes() {
        assert_eq!(HeatTier::from_score(i64::MAX), HeatTier::Hot);
        assert_eq!(HeatTier::from_score(i64::MIN), HeatTier::Cold);
    }

    #[test]
    fn each_tier_has_distinct_presentation() {
        let tiers = [HeatTier::Hot, HeatTier::Warm, HeatTier::Neutral, HeatTier::Cold];
        for (i, a) in tiers.iter().enumerate() {
            for b in &tiers[i + 1..] {
                assert_ne!(a.emoji(), b.emoji());
                assert_ne!(a.css_class(), b.css_class());
            }
        }
        assert_eq!(HeatTier::Cold.label(), "cold");
    }
}
