use crate::pipeline::types::{
    Approach, ConfidenceThresholds, CrossingConfig, CrossingPolicy, DistanceMode, EngineConfig,
    ZoneConfig,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a directory of saved play files into per-play distance results
    Analyze(AnalyzeArgs),
    /// Aggregate a results file into per-player/pitch-type command statistics
    Command(CommandArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing saved play files (*.json)
    #[arg(long, env = "DTOZ_PLAYS_ROOT")]
    pub plays: PathBuf,

    /// Root directory for run output artifacts
    #[arg(long, env = "DTOZ_OUTPUT_ROOT")]
    pub output_root: PathBuf,

    /// Number of plays analyzed in parallel
    #[arg(long, default_value_t = 2)]
    pub workers: usize,

    /// Confidence floor for catcher detections
    #[arg(long, default_value_t = 0.5)]
    pub catcher_conf: f32,

    /// Confidence floor for glove detections
    #[arg(long, default_value_t = 0.5)]
    pub glove_conf: f32,

    /// Confidence floor for ball detections
    #[arg(long, default_value_t = 0.3)]
    pub ball_conf: f32,

    /// Longest detector dropout (frames) bridged by interpolation
    #[arg(long, default_value_t = 4)]
    pub max_gap: usize,

    /// Zone height as a fraction of the catcher box height
    #[arg(long, default_value_t = 0.5)]
    pub zone_height_frac: f32,

    /// Vertical zone-center shift, in catcher box heights
    #[arg(long, default_value_t = 0.0)]
    pub zone_vertical_offset: f32,

    /// Assumed catcher box width in inches (fixes the pixel scale)
    #[arg(long, default_value_t = 34.0)]
    pub catcher_width_in: f32,

    /// How far (frames) the catcher anchor may sit from the crossing
    #[arg(long, default_value_t = 5)]
    pub anchor_tolerance: usize,

    /// Pixel row acting as the home-plate reference plane
    #[arg(long, default_value_t = 600.0)]
    pub plane_y: f32,

    /// Direction the ball approaches the plane from
    #[arg(long, value_enum, default_value_t = Approach::Down)]
    pub approach: Approach,

    /// Tie-break policy for multiple plane crossings
    #[arg(long, value_enum, default_value_t = CrossingPolicy::LastBeforeReversal)]
    pub crossing_policy: CrossingPolicy,

    /// Report signed distances (negative inside the zone)
    #[arg(long, default_value_t = false)]
    pub signed: bool,
}

impl AnalyzeArgs {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            confidence: ConfidenceThresholds {
                catcher: self.catcher_conf,
                glove: self.glove_conf,
                ball: self.ball_conf,
            },
            max_gap: self.max_gap,
            zone: ZoneConfig {
                height_frac: self.zone_height_frac,
                vertical_offset: self.zone_vertical_offset,
                catcher_width_in: self.catcher_width_in,
                anchor_tolerance: self.anchor_tolerance,
                ..ZoneConfig::default()
            },
            crossing: CrossingConfig {
                plane_y: self.plane_y,
                approach: self.approach,
                policy: self.crossing_policy,
            },
            distance_mode: if self.signed {
                DistanceMode::Signed
            } else {
                DistanceMode::Unsigned
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Path to a results.json produced by `analyze`
    #[arg(long)]
    pub results: PathBuf,

    /// Directory for the command report; defaults to the results file's parent
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_args_map_to_config() {
        let cli = Cli::parse_from([
            "distance-to-zone",
            "analyze",
            "--plays",
            "/tmp/plays",
            "--output-root",
            "/tmp/out",
            "--ball-conf",
            "0.25",
            "--max-gap",
            "6",
            "--plane-y",
            "480",
            "--crossing-policy",
            "earliest",
            "--signed",
        ]);

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze subcommand");
        };
        let config = args.engine_config();

        assert_eq!(config.confidence.ball, 0.25);
        assert_eq!(config.max_gap, 6);
        assert_eq!(config.crossing.plane_y, 480.0);
        assert_eq!(config.crossing.policy, CrossingPolicy::Earliest);
        assert_eq!(config.distance_mode, DistanceMode::Signed);
    }
}
