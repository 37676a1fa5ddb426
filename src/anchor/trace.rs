//! Structured record of one resolution call

use serde::Serialize;

use super::types::Strategy;

/// What happened when a strategy was tried
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StepOutcome {
    /// The strategy produced the final range
    Anchored { start: usize, end: usize },
    /// The strategy had nothing to work with (e.g. selector absent)
    Skipped { reason: String },
    /// The strategy ran and failed
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub strategy: Strategy,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Number of candidate matches considered (search strategies)
    pub candidates: usize,
    /// Whether candidates came from the whitespace-normalized pass
    pub normalized: bool,
}

/// Per-strategy outcomes of one `Resolver::resolve` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTrace {
    pub steps: Vec<TraceStep>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    /// Strategies that were tried, in order
    pub fn attempted(&self) -> Vec<Strategy> {
        self.steps.iter().map(|s| s.strategy).collect()
    }

    /// Strategy that anchored, if any
    pub fn winner(&self) -> Option<Strategy> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Anchored { .. }))
            .map(|s| s.strategy)
    }

    pub fn step(&self, strategy: Strategy) -> Option<&TraceStep> {
        self.steps.iter().find(|s| s.strategy == strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_serializes_flat() {
        let mut trace = ResolutionTrace::new();
        trace.record(TraceStep {
            strategy: Strategy::Structural,
            outcome: StepOutcome::Skipped {
                reason: "no structural selector".to_string(),
            },
            candidates: 0,
            normalized: false,
        });
        trace.record(TraceStep {
            strategy: Strategy::Position,
            outcome: StepOutcome::Anchored { start: 1, end: 4 },
            candidates: 1,
            normalized: false,
        });

        assert_eq!(trace.winner(), Some(Strategy::Position));
        assert_eq!(trace.attempted(), vec![Strategy::Structural, Strategy::Position]);

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["steps"][0]["outcome"], "skipped");
        assert_eq!(json["steps"][1]["strategy"], "position");
        assert_eq!(json["steps"][1]["start"], 1);
    }
}
