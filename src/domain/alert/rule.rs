//! Alert rule groups and the candidates they produce

use serde::{Deserialize, Serialize};

use super::entity::{Alert, AlertKind};

/// A group of related checks that run together on one schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    Pregnancy,
    Health,
    Capacity,
    Feed,
}

impl AlertRule {
    pub fn all() -> [AlertRule; 4] {
        [Self::Pregnancy, Self::Health, Self::Capacity, Self::Feed]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pregnancy => "pregnancy",
            Self::Health => "health",
            Self::Capacity => "capacity",
            Self::Feed => "feed",
        }
    }

    /// Alert kinds owned by this rule, used for auto-resolution
    pub fn kinds(&self) -> &'static [AlertKind] {
        match self {
            Self::Pregnancy => &[AlertKind::BirthImminent, AlertKind::BirthOverdue],
            Self::Health => &[AlertKind::HealthFollowUp],
            Self::Capacity => &[AlertKind::CageFull, AlertKind::CageNearCapacity],
            Self::Feed => &[AlertKind::LowFeedStock],
        }
    }

    pub fn owns(&self, kind: AlertKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl std::fmt::Display for AlertRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pregnancy" | "prenez" => Ok(Self::Pregnancy),
            "health" | "salud" => Ok(Self::Health),
            "capacity" | "capacidad" => Ok(Self::Capacity),
            "feed" | "alimentos" => Ok(Self::Feed),
            other => Err(format!("unknown alert rule '{}'", other)),
        }
    }
}

/// Outcome of running one rule
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleOutcome {
    pub rule: Option<AlertRule>,
    pub created: Vec<Alert>,
    pub resolved: usize,
}

impl RuleOutcome {
    pub fn for_rule(rule: AlertRule) -> Self {
        Self {
            rule: Some(rule),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_exactly_one_owner() {
        let kinds = [
            AlertKind::BirthImminent,
            AlertKind::BirthOverdue,
            AlertKind::HealthFollowUp,
            AlertKind::CageFull,
            AlertKind::CageNearCapacity,
            AlertKind::LowFeedStock,
        ];

        for kind in kinds {
            let owners = AlertRule::all().iter().filter(|r| r.owns(kind)).count();
            assert_eq!(owners, 1, "{kind} should have one owner");
        }
    }

    #[test]
    fn test_parse_rule_names() {
        assert_eq!("Prenez".parse::<AlertRule>().unwrap(), AlertRule::Pregnancy);
        assert_eq!("capacity".parse::<AlertRule>().unwrap(), AlertRule::Capacity);
        assert!("weather".parse::<AlertRule>().is_err());
    }
}
