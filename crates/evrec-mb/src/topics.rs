/// Message bus topic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    StationTelemetry,
    StationHealth,
    GridStatus,
    UserContext,
    StationFeatures,
    StationScores,
    StationPredictions,
    Recommendations,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::StationTelemetry => "station.telemetry",
            Topic::StationHealth => "station.health",
            Topic::GridStatus => "grid.status",
            Topic::UserContext => "user.context",
            Topic::StationFeatures => "station.features",
            Topic::StationScores => "station.scores",
            Topic::StationPredictions => "station.predictions",
            Topic::Recommendations => "recommendations",
        }
    }
}
