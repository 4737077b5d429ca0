// Markdown rendering of a diagnosis report for download

use std::fmt::Write as _;

use crate::models::DiagnosisReport;

pub fn render_markdown(report: &DiagnosisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Plant Diagnosis Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Report ID:** {}", report.id);
    let _ = writeln!(out, "- **Date:** {}", report.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "- **Plant:** {}", report.plant_name);
    if let Some(location) = &report.location {
        let _ = writeln!(out, "- **Location:** {}", location);
    }
    let _ = writeln!(out, "- **Language:** {}", report.language);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Prediction");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Class:** {}", report.classification.label);
    let _ = writeln!(out, "- **Confidence:** {:.1}%", report.classification.confidence);
    let _ = writeln!(out);

    if let Some(weather) = &report.weather {
        let _ = writeln!(out, "## Weather in {}, {}", weather.location, weather.country);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "- **Temperature:** {}°C (feels like {}°C)",
            weather.temperature_c, weather.feels_like_c
        );
        let _ = writeln!(out, "- **Condition:** {}", weather.condition);
        let _ = writeln!(out, "- **Humidity:** {}%", weather.humidity);
        let _ = writeln!(out, "- **Wind:** {}", weather.wind);
        let _ = writeln!(out, "- **UV Index:** {}", weather.uv_index);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Recommended Actions");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", report.diagnosis.content.trim());
    let _ = writeln!(out);

    let _ = writeln!(out, "## Recovery & Fertilizer Advice");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", report.recovery.content.trim());

    out
}

/// `"{plant}_plant_diagnosis.md"`, safe for a Content-Disposition header
pub fn download_filename(report: &DiagnosisReport) -> String {
    let plant: String = report
        .plant_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let plant = plant.trim_matches('_');
    let plant = if plant.is_empty() { "plant" } else { plant };
    format!("{}_plant_diagnosis.md", plant)
}
