// Result export: one tabular row per play plus a JSON artifact with the full
// structure. The CSV column set is the stable wire contract to downstream
// consumers; absent analytical fields stay empty, never zero.

use crate::pipeline::command::CommandReport;
use crate::pipeline::types::PlayResult;
use anyhow::{Context, Result};
use std::path::Path;

const RESULT_COLUMNS: [&str; 16] = [
    "play_id",
    "game_pk",
    "team",
    "pitch_type",
    "player",
    "date",
    "crossing_frame",
    "crossing_x",
    "crossing_y",
    "zone_top",
    "zone_bottom",
    "zone_left",
    "zone_right",
    "distance_px",
    "distance_in",
    "in_zone",
];

pub fn write_results_csv(path: &Path, results: &[PlayResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create results csv: {}", path.display()))?;

    let mut header: Vec<&str> = RESULT_COLUMNS.to_vec();
    header.extend(["miss_to_glove_px", "flags"]);
    writer.write_record(&header)?;

    for r in results {
        let flags = r
            .flags
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(";");

        writer.write_record([
            r.play_id.clone(),
            opt_str(r.metadata.game_pk),
            r.metadata.team.clone().unwrap_or_default(),
            r.metadata.pitch_type.clone().unwrap_or_default(),
            r.metadata.player.clone().unwrap_or_default(),
            r.metadata
                .date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            opt_f32(r.crossing.map(|c| c.frame)),
            opt_f32(r.crossing.map(|c| c.x)),
            opt_f32(r.crossing.map(|c| c.y)),
            opt_f32(r.zone.map(|z| z.top_y)),
            opt_f32(r.zone.map(|z| z.bottom_y)),
            opt_f32(r.zone.map(|z| z.left_x)),
            opt_f32(r.zone.map(|z| z.right_x)),
            opt_f32(r.distance_px),
            opt_f32(r.distance_in),
            r.in_zone.map(|b| b.to_string()).unwrap_or_default(),
            opt_f32(r.miss_to_glove_px),
            flags,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_results_json(path: &Path, results: &[PlayResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results json: {}", path.display()))
}

pub fn read_results_json(path: &Path) -> Result<Vec<PlayResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results json: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results json: {}", path.display()))
}

pub fn write_command_csv(path: &Path, report: &CommandReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create command csv: {}", path.display()))?;

    writer.write_record([
        "player",
        "pitch_type",
        "plays",
        "mean_distance_in",
        "std_distance_in",
        "in_zone_rate",
        "mean_horizontal_bias_px",
        "mean_vertical_bias_px",
    ])?;

    for g in &report.groups {
        writer.write_record([
            g.player.clone().unwrap_or_default(),
            g.pitch_type.clone().unwrap_or_default(),
            g.plays.to_string(),
            format!("{:.3}", g.mean_distance_in),
            format!("{:.3}", g.std_distance_in),
            format!("{:.3}", g.in_zone_rate),
            format!("{:.3}", g.mean_horizontal_bias_px),
            format!("{:.3}", g.mean_vertical_bias_px),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_command_json(path: &Path, report: &CommandReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write command json: {}", path.display()))
}

fn opt_f32(value: Option<f32>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

fn opt_str<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
