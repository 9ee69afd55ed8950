//! Chart rendering for the synthesized report.
//!
//! Charts are written as PNG files into the output directory and referenced
//! from a markdown fragment. Rendering is best-effort: a chart that fails is
//! left out of the fragment and the report goes on without it.

use super::evidence::Evidence;
use super::plan::Plan;
use chrono::Local;
use image::{ImageResult, Rgb, RgbImage};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_RELEVANCE_BARS: usize = 10;
const MAX_DOMAINS: usize = 6;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([90, 90, 90]);
const HIGH: Rgb<u8> = Rgb([46, 139, 87]);
const MEDIUM: Rgb<u8> = Rgb([255, 165, 0]);
const LOW: Rgb<u8> = Rgb([220, 20, 60]);
const PALETTE: [Rgb<u8>; MAX_DOMAINS] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
];

/// Produces the markdown visuals block spliced into a research report.
pub trait VisualSummary: Send + Sync {
    /// Markdown with image links, or an empty string when there is nothing
    /// to show.
    fn generate_visual_summary(&self, plan: &Plan, evidence: &[Evidence]) -> String;
}

/// Charts disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVisuals;

impl VisualSummary for NoVisuals {
    fn generate_visual_summary(&self, _plan: &Plan, _evidence: &[Evidence]) -> String {
        String::new()
    }
}

/// Renders PNG charts with the `image` crate.
#[derive(Debug, Clone)]
pub struct PngChartGenerator {
    output_dir: PathBuf,
}

impl PngChartGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn chart_path(&self, name: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir.join(format!("{name}_{stamp}.png"))
    }

    fn save(&self, name: &str, image: RgbImage) -> ImageResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.chart_path(name);
        image.save(&path)?;
        debug!(path = %path.display(), "Chart written");
        Ok(path)
    }

    /// Horizontal bars, one per evidence item, longest first.
    fn relevance_chart(&self, evidence: &[Evidence]) -> ImageResult<PathBuf> {
        let shown = &evidence[..evidence.len().min(MAX_RELEVANCE_BARS)];
        let (width, bar_height, gap, margin) = (800u32, 24u32, 8u32, 20u32);
        let height = margin * 2 + shown.len() as u32 * (bar_height + gap);
        let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

        let track = width - margin * 2;
        for (i, item) in shown.iter().enumerate() {
            let y = margin + i as u32 * (bar_height + gap);
            let len = (item.relevance.clamp(0.0, 1.0) * f64::from(track)).round() as u32;
            fill_rect(&mut image, margin, y, len, bar_height, tier_color(item.relevance));
        }
        fill_rect(&mut image, margin, margin / 2, 2, height - margin, AXIS);
        self.save("evidence_relevance", image)
    }

    /// Pie of high / medium / low relevance counts.
    fn distribution_chart(&self, evidence: &[Evidence]) -> ImageResult<PathBuf> {
        let [high, medium, low] = relevance_distribution(evidence);
        let slices = [
            (high as f64, HIGH),
            (medium as f64, MEDIUM),
            (low as f64, LOW),
        ];
        let image = pie(400, &slices);
        self.save("evidence_distribution", image)
    }

    /// Vertical bars for the most frequent source domains.
    fn source_chart(&self, evidence: &[Evidence]) -> ImageResult<PathBuf> {
        let domains = top_domains(evidence, MAX_DOMAINS);
        let (width, height, margin) = (600u32, 400u32, 30u32);
        let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

        let max_count = domains.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);
        let slot = (width - margin * 2) / MAX_DOMAINS as u32;
        let plot_height = height - margin * 2;
        for (i, (_, count)) in domains.iter().enumerate() {
            let bar_height = (*count as u32 * plot_height) / max_count as u32;
            let x = margin + i as u32 * slot + slot / 6;
            let y = height - margin - bar_height;
            fill_rect(&mut image, x, y, slot * 2 / 3, bar_height, PALETTE[i]);
        }
        fill_rect(&mut image, margin, height - margin, width - margin * 2, 2, AXIS);
        self.save("source_distribution", image)
    }
}

impl VisualSummary for PngChartGenerator {
    fn generate_visual_summary(&self, _plan: &Plan, evidence: &[Evidence]) -> String {
        if evidence.is_empty() {
            return String::new();
        }

        let image_link = |alt: &str, result: ImageResult<PathBuf>| match result {
            Ok(path) => Some(format!("![{alt}]({})\n", path.display())),
            Err(e) => {
                warn!(chart = alt, error = %e, "Chart rendering failed, skipping");
                None
            }
        };

        let relevance = image_link("Evidence Relevance", self.relevance_chart(evidence));
        let distribution = image_link("Evidence Distribution", self.distribution_chart(evidence));
        let sources = image_link("Source Distribution", self.source_chart(evidence));

        if relevance.is_none() && distribution.is_none() && sources.is_none() {
            return String::new();
        }

        let mut parts = vec![format!("## Visual Summary\n\n{}", relevance.unwrap_or_default())];
        if let Some(link) = distribution {
            parts.push(format!("\n### Evidence Distribution\n\n{link}"));
        }
        if let Some(link) = sources {
            parts.push(format!("\n### Source Distribution\n\n{link}"));
        }
        parts.join("\n")
    }
}

/// Counts of `[high, medium, low]` relevance: high is at least 0.8, low is
/// below 0.5.
pub fn relevance_distribution(evidence: &[Evidence]) -> [usize; 3] {
    let mut counts = [0; 3];
    for item in evidence {
        let tier = match item.relevance {
            r if r >= 0.8 => 0,
            r if r >= 0.5 => 1,
            _ => 2,
        };
        counts[tier] += 1;
    }
    counts
}

/// Host part of a URL without `www.` or port; `unknown` when there is none.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .filter(|host| !host.is_empty())
                .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Most frequent domains, ties broken alphabetically.
pub fn top_domains(evidence: &[Evidence], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in evidence {
        *counts.entry(domain_of(&item.source_url)).or_default() += 1;
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

fn tier_color(relevance: f64) -> Rgb<u8> {
    match relevance {
        r if r >= 0.8 => HIGH,
        r if r >= 0.5 => MEDIUM,
        _ => LOW,
    }
}

fn fill_rect(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(image.width());
    let y_end = y.saturating_add(h).min(image.height());
    for py in y..y_end {
        for px in x..x_end {
            image.put_pixel(px, py, color);
        }
    }
}

/// Square pie chart, slices clockwise from twelve o'clock.
fn pie(size: u32, slices: &[(f64, Rgb<u8>)]) -> RgbImage {
    let mut image = RgbImage::from_pixel(size, size, BACKGROUND);
    let total: f64 = slices.iter().map(|(v, _)| v).sum();
    if total <= 0.0 {
        return image;
    }

    let center = f64::from(size) / 2.0;
    let radius = center * 0.9;
    for (px, py, pixel) in image.enumerate_pixels_mut() {
        let dx = f64::from(px) + 0.5 - center;
        let dy = f64::from(py) + 0.5 - center;
        if dx.hypot(dy) > radius {
            continue;
        }
        let fraction = ((dy.atan2(dx) + FRAC_PI_2).rem_euclid(TAU)) / TAU;
        let mut cumulative = 0.0;
        for (value, color) in slices {
            cumulative += value / total;
            if fraction <= cumulative {
                *pixel = *color;
                break;
            }
        }
    }
    image
}
