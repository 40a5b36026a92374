use crate::aggregate::{collect_iso3, count_by_iso3, ExclusionList};
use crate::config::MapConfig;
use crate::lookup::CountryLookup;
use crate::types::AppealRecord;
use crate::world::{join_counts, load_world, ShadedCountry};
use ab_glyph::{FontRef, PxScale};
use anyhow::{anyhow, Context, Result};
use geo::Rect;
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

pub const TITLE: &str = "Choropleth Map of Appeals per Country";
pub const LEGEND_LABEL: &str = "Number of Appeals";

/// Space above the map reserved for the title.
pub const TITLE_HEIGHT: u32 = 40;
/// Space under the map reserved for the colour bar, tick labels and legend label.
pub const LEGEND_HEIGHT: u32 = 90;
const BAR_TOP: u32 = 10;
const BAR_HEIGHT: u32 = 20;
const TICK_LENGTH: u32 = 6;
const TICK_LABEL_GAP: u32 = 2;
const LEGEND_LABEL_TOP: u32 = 62;

const TITLE_SCALE: f32 = 22.0;
const TICK_SCALE: f32 = 13.0;
const LABEL_SCALE: f32 = 15.0;

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Flat fill for countries without appeals ("lightgrey").
pub const NO_APPEALS: Rgba<u8> = Rgba([211, 211, 211, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

// viridis sampled at nine evenly spaced stops
const VIRIDIS: [&str; 9] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#fde725",
];

pub enum RenderOutcome {
    /// No appeal carried a country code; nothing was loaded or drawn.
    NoData,
    Rendered(ChoroplethMap),
}

/// Maps lon/lat to pixel space, preserving aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    extent: Rect<f64>,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Fits `extent` into the `width` x `height` box starting at row `top`.
    fn fit(extent: Rect<f64>, width: u32, height: u32, top: u32) -> Self {
        let dx = extent.width().max(f64::EPSILON);
        let dy = extent.height().max(f64::EPSILON);
        let scale = (width as f64 / dx).min(height as f64 / dy);

        Self {
            extent,
            scale,
            offset_x: (width as f64 - dx * scale) / 2.0,
            offset_y: top as f64 + (height as f64 - dy * scale) / 2.0,
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + (lon - self.extent.min().x) * self.scale,
            self.offset_y + (self.extent.max().y - lat) * self.scale,
        )
    }

    /// Lon/lat at the centre of pixel `(px, py)`.
    pub fn unproject(&self, px: u32, py: u32) -> (f64, f64) {
        (
            self.extent.min().x + (px as f64 + 0.5 - self.offset_x) / self.scale,
            self.extent.max().y - (py as f64 + 0.5 - self.offset_y) / self.scale,
        )
    }
}

/// A rendered appeal map plus the data it was drawn from.
pub struct ChoroplethMap {
    pub image: RgbaImage,
    pub counts: BTreeMap<String, u32>,
    pub max_count: u32,
    /// Legend tick values, every integer from 0 to `max_count`.
    pub ticks: Vec<u32>,
    pub projection: Projection,
    pub lookup: CountryLookup,
}

impl ChoroplethMap {
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save(path)
            .with_context(|| format!("Failed to save map to {:?}", path))
    }

    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .context("Failed to encode map as PNG")?;
        Ok(buf.into_inner())
    }
}

/// Counts appeals per country and draws them over the world boundaries.
pub fn render_appeal_density(
    appeals: &[AppealRecord],
    config: &MapConfig,
    exclusions: &ExclusionList,
) -> Result<RenderOutcome> {
    if collect_iso3(appeals).is_empty() {
        tracing::info!("No ISO3 country codes found in the provided data.");
        return Ok(RenderOutcome::NoData);
    }

    let counts = count_by_iso3(appeals, exclusions);
    tracing::info!("Counted appeals for {} countries", counts.len());

    let world = load_world(config)?;
    let countries = join_counts(world, &counts, exclusions);

    draw_choropleth(countries, counts, config).map(RenderOutcome::Rendered)
}

pub fn draw_choropleth(
    countries: Vec<ShadedCountry>,
    counts: BTreeMap<String, u32>,
    config: &MapConfig,
) -> Result<ChoroplethMap> {
    if config.width < 2 || config.height <= TITLE_HEIGHT + LEGEND_HEIGHT {
        return Err(anyhow!(
            "Map size {}x{} is too small, height must exceed {}",
            config.width,
            config.height,
            TITLE_HEIGHT + LEGEND_HEIGHT
        ));
    }

    let font =
        FontRef::try_from_slice(FONT_DATA).map_err(|e| anyhow!("Failed to load font: {}", e))?;

    let lookup = CountryLookup::new(countries);
    let extent = lookup
        .extent()
        .ok_or_else(|| anyhow!("World boundaries contain no drawable shapes"))?;

    let max_count = lookup.countries().iter().map(|c| c.count).max().unwrap_or(0);
    let map_height = config.height - TITLE_HEIGHT - LEGEND_HEIGHT;
    let projection = Projection::fit(extent, config.width, map_height, TITLE_HEIGHT);

    tracing::info!(
        "Drawing {} countries at {}x{}, max count {}",
        lookup.countries().len(),
        config.width,
        config.height,
        max_count
    );

    let mut image: RgbaImage = ImageBuffer::from_pixel(config.width, config.height, BACKGROUND);
    let row_bytes = config.width as usize * 4;

    image
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(TITLE_HEIGHT as usize)
        .take(map_height as usize)
        .for_each(|(py, row)| {
            for (px, pixel) in row.chunks_exact_mut(4).enumerate() {
                let (lon, lat) = projection.unproject(px as u32, py as u32);
                if let Some(country) = lookup.find(lon, lat) {
                    let color = fill_color(country.count, max_count);
                    pixel.copy_from_slice(&color.0);
                }
            }
        });

    draw_centered(&mut image, &font, TITLE_SCALE, 0, TITLE_HEIGHT, TITLE);
    let ticks = draw_legend(&mut image, &font, TITLE_HEIGHT + map_height, max_count);

    Ok(ChoroplethMap {
        image,
        counts,
        max_count,
        ticks,
        projection,
        lookup,
    })
}

/// Zero counts are grey, anything else sits on the viridis scale over `0..=max`.
pub fn fill_color(count: u32, max_count: u32) -> Rgba<u8> {
    if count == 0 {
        return NO_APPEALS;
    }
    viridis(count as f64 / max_count.max(1) as f64)
}

pub fn viridis(t: f64) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let position = t * (VIRIDIS.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(VIRIDIS.len() - 1);
    let frac = position - lower as f64;

    let a = hex_to_rgba(VIRIDIS[lower]);
    let b = hex_to_rgba(VIRIDIS[upper]);
    let mix = |i: usize| (a.0[i] as f64 + (b.0[i] as f64 - a.0[i] as f64) * frac).round() as u8;

    Rgba([mix(0), mix(1), mix(2), 255])
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, 255])
}

/// Draws `text` horizontally centred and vertically centred in rows `top..top + height`.
fn draw_centered(
    image: &mut RgbaImage,
    font: &FontRef,
    scale: f32,
    top: u32,
    height: u32,
    text: &str,
) {
    let scale = PxScale::from(scale);
    let (w, h) = text_size(scale, font, text);
    let x = image.width().saturating_sub(w) / 2;
    let y = top + height.saturating_sub(h) / 2;
    draw_text_mut(image, TEXT_COLOR, x as i32, y as i32, scale, font, text);
}

/// Horizontal colour bar centred under the map, one tick per integer count.
/// Tick labels that would collide with the previous one are left out.
fn draw_legend(
    image: &mut RgbaImage,
    font: &FontRef,
    legend_top: u32,
    max_count: u32,
) -> Vec<u32> {
    let width = image.width();
    let bar_width = (width * 3 / 5).max(2);
    let bar_left = (width - bar_width) / 2;
    let bar_top = legend_top + BAR_TOP;

    for x in 0..bar_width {
        let color = viridis(x as f64 / (bar_width - 1) as f64);
        for y in bar_top..bar_top + BAR_HEIGHT {
            image.put_pixel(bar_left + x, y, color);
        }
    }

    let ticks: Vec<u32> = (0..=max_count).collect();
    let tick_top = bar_top + BAR_HEIGHT;
    let label_top = tick_top + TICK_LENGTH + TICK_LABEL_GAP;
    let tick_scale = PxScale::from(TICK_SCALE);
    let mut last_label_right: Option<u32> = None;

    for &tick in &ticks {
        let x = match max_count {
            0 => bar_left,
            max => bar_left + ((tick as f64 / max as f64) * (bar_width - 1) as f64).round() as u32,
        };
        for y in tick_top..tick_top + TICK_LENGTH {
            image.put_pixel(x, y, TEXT_COLOR);
        }

        let label = tick.to_string();
        let (w, _) = text_size(tick_scale, font, &label);
        let left = x.saturating_sub(w / 2).min(width.saturating_sub(w));
        if last_label_right.is_some_and(|right| left < right + 4) {
            continue;
        }
        draw_text_mut(image, TEXT_COLOR, left as i32, label_top as i32, tick_scale, font, &label);
        last_label_right = Some(left + w);
    }

    draw_centered(
        image,
        font,
        LABEL_SCALE,
        legend_top + LEGEND_LABEL_TOP,
        LEGEND_HEIGHT - LEGEND_LABEL_TOP,
        LEGEND_LABEL,
    );

    ticks
}
