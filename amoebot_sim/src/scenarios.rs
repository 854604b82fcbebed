//! Demonstration scenarios exercising the movement protocol.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Idle particles on a line: the first round is a deadlock
    Idle,

    /// A line marching forward by expand, push, pull and contract
    Inchworm,

    /// A token handed from one end of a line to the other
    Relay,

    /// A hexagon of particles making random legal moves
    Jiggle,

    /// A random connected blob making random legal moves
    Blob,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Idle,
            ScenarioId::Inchworm,
            ScenarioId::Relay,
            ScenarioId::Jiggle,
            ScenarioId::Blob,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Idle => "idle",
            ScenarioId::Inchworm => "inchworm",
            ScenarioId::Relay => "relay",
            ScenarioId::Jiggle => "jiggle",
            ScenarioId::Blob => "blob",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Idle => "Idle line, verify deadlock detection after one round",
            ScenarioId::Inchworm => "Line marching east with handovers until every budget is spent",
            ScenarioId::Relay => "Token passed along a line until it reaches the far end",
            ScenarioId::Jiggle => "Hexagon of random movers, verify validity every round",
            ScenarioId::Blob => "Random blob of random movers, verify validity every round",
        }
    }

    /// Returns true if particles move at random.
    pub fn is_randomized(&self) -> bool {
        matches!(self, ScenarioId::Jiggle | ScenarioId::Blob)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" | "dummy" => Ok(ScenarioId::Idle),
            "inchworm" | "march" => Ok(ScenarioId::Inchworm),
            "relay" | "token_relay" | "tokenrelay" => Ok(ScenarioId::Relay),
            "jiggle" | "hexagon" => Ok(ScenarioId::Jiggle),
            "blob" | "random_blob" => Ok(ScenarioId::Blob),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
            assert!(!scenario.description().is_empty());
        }
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!("TOKEN_RELAY".parse::<ScenarioId>(), Ok(ScenarioId::Relay));
        assert_eq!("Hexagon".parse::<ScenarioId>(), Ok(ScenarioId::Jiggle));
        assert!("all".parse::<ScenarioId>().is_err());
    }
}
