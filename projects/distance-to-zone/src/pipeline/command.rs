// Command analysis: a pure reduction over already-computed play results.
// Groups by (player, pitch type) and describes how consistently pitches land
// relative to the zone. Incomplete plays are skipped, never crashed on, and
// the skip count is reported so completeness stays auditable.

use crate::pipeline::types::PlayResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate command statistics for one (player, pitch type) group.
#[derive(Debug, Clone, Serialize)]
pub struct CommandGroup {
    pub player: Option<String>,
    pub pitch_type: Option<String>,
    pub plays: usize,
    pub mean_distance_in: f32,
    pub std_distance_in: f32,
    pub in_zone_rate: f32,
    /// Mean signed horizontal offset of the crossing from the zone center,
    /// in pixels. Positive = misses to the right.
    pub mean_horizontal_bias_px: f32,
    /// Mean signed vertical offset of the crossing from the zone center, in
    /// pixels. Positive = misses low.
    pub mean_vertical_bias_px: f32,
}

/// Batch-level command report.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub total: usize,
    pub complete: usize,
    pub skipped: usize,
    pub groups: Vec<CommandGroup>,
}

/// Reduce a batch of play results into per-group command statistics.
pub fn analyze(results: &[PlayResult]) -> CommandReport {
    let mut buckets: BTreeMap<(Option<String>, Option<String>), Vec<&PlayResult>> = BTreeMap::new();

    let mut complete = 0;
    for result in results {
        // A play is usable only when a distance was actually computed; the
        // crossing and zone are then present as well.
        if !result.is_complete() {
            continue;
        }
        complete += 1;
        let key = (
            result.metadata.player.clone(),
            result.metadata.pitch_type.clone(),
        );
        buckets.entry(key).or_default().push(result);
    }

    let groups = buckets
        .into_iter()
        .map(|((player, pitch_type), plays)| summarize(player, pitch_type, &plays))
        .collect();

    CommandReport {
        total: results.len(),
        complete,
        skipped: results.len() - complete,
        groups,
    }
}

fn summarize(
    player: Option<String>,
    pitch_type: Option<String>,
    plays: &[&PlayResult],
) -> CommandGroup {
    let n = plays.len() as f32;

    let distances: Vec<f32> = plays.iter().filter_map(|p| p.distance_in).collect();
    let mean = distances.iter().sum::<f32>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / n;

    let in_zone = plays.iter().filter(|p| p.in_zone == Some(true)).count();

    let mut dx_sum = 0.0;
    let mut dy_sum = 0.0;
    for p in plays {
        if let (Some(c), Some(z)) = (p.crossing, p.zone) {
            let (zx, zy) = z.center();
            dx_sum += c.x - zx;
            dy_sum += c.y - zy;
        }
    }

    CommandGroup {
        player,
        pitch_type,
        plays: plays.len(),
        mean_distance_in: mean,
        std_distance_in: variance.sqrt(),
        in_zone_rate: in_zone as f32 / n,
        mean_horizontal_bias_px: dx_sum / n,
        mean_vertical_bias_px: dy_sum / n,
    }
}
