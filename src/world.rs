use crate::aggregate::{normalize_iso3, ExclusionList};
use crate::config::MapConfig;
use crate::fields::Fields;
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

/// One admin-0 feature from the world boundaries dataset.
#[derive(Debug, Clone)]
pub struct CountryShape {
    pub iso3: Option<String>,
    pub name: Option<String>,
    pub continent: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// A country after the left join with the appeal counts.
#[derive(Debug, Clone)]
pub struct ShadedCountry {
    pub shape: CountryShape,
    pub count: u32,
}

pub fn load_world(config: &MapConfig) -> Result<Vec<CountryShape>> {
    tracing::info!("Loading world boundaries from {:?}", config.world);

    let extension = config
        .world
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("World boundaries file has no extension"))?;

    let shapes = match extension.as_str() {
        "shp" => load_shapefile(config)?,
        "json" | "geojson" => {
            let file = File::open(&config.world).with_context(|| {
                format!(
                    "Failed to open GeoJSON file: {:?} (run `go-appeals download-world` to fetch it)",
                    config.world
                )
            })?;
            parse_geojson(BufReader::new(file), config)?
        }
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    tracing::info!("Loaded {} country shapes", shapes.len());

    Ok(shapes)
}

/// Natural Earth marks countries without an assigned code as "-99".
fn clean_code(code: Option<String>) -> Option<String> {
    normalize_iso3(&code?).filter(|c| c != "-99")
}

/// Reads the join code, name and continent of one feature. When the join
/// column holds no usable code the fallback columns are tried in order;
/// Natural Earth leaves `ISO_A3` as "-99" for France and Norway and carries
/// the real code in `ISO_A3_EH`.
fn attributes(
    config: &MapConfig,
    property: impl Fn(&str) -> Option<String>,
) -> (Option<String>, Option<String>, Option<String>) {
    let iso3 = std::iter::once(&config.join_column)
        .chain(&config.fallback_join_columns)
        .find_map(|column| clean_code(property(column.as_str())));

    (
        iso3,
        property(config.name_column.as_str()),
        property(config.continent_column.as_str()),
    )
}

pub fn parse_geojson<R: Read>(reader: R, config: &MapConfig) -> Result<Vec<CountryShape>> {
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut shapes = Vec::new();

    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        let (iso3, name, continent) = match feature.properties.as_ref() {
            Some(props) => {
                let props = Fields::from_map(props);
                attributes(config, |column| props.text_any_case(column))
            }
            None => (None, None, None),
        };

        shapes.push(CountryShape {
            iso3,
            name,
            continent,
            geometry,
        });
    }

    Ok(shapes)
}

/// Text attribute of a dBase record; the column name matches as given,
/// upper-cased or lower-cased.
fn character(record: &shapefile::dbase::Record, column: &str) -> Option<String> {
    let value = record
        .get(column)
        .or_else(|| record.get(&column.to_uppercase()))
        .or_else(|| record.get(&column.to_lowercase()));

    let text = match value {
        Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
        Some(FieldValue::Memo(s)) => Some(s.trim().to_string()),
        _ => None,
    };
    text.filter(|s| !s.is_empty())
}

fn load_shapefile(config: &MapConfig) -> Result<Vec<CountryShape>> {
    let mut reader = Reader::from_path(&config.world)
        .with_context(|| format!("Failed to open Shapefile: {:?}", config.world))?;

    let mut shapes = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        let (iso3, name, continent) = attributes(config, |column| character(&record, column));

        shapes.push(CountryShape {
            iso3,
            name,
            continent,
            geometry,
        });
    }

    Ok(shapes)
}

/// Fetches the world boundaries GeoJSON from `url` and writes it to `path`.
pub async fn download_world(client: &reqwest::Client, url: &str, path: &Path) -> Result<usize> {
    tracing::info!("Downloading world boundaries from {}", url);

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !resp.status().is_success() {
        return Err(anyhow!(
            "Failed to download world boundaries: HTTP {}",
            resp.status()
        ));
    }

    let body = resp.bytes().await?;
    // refuse to save something the loader cannot read
    parse_geojson(body.as_ref(), &MapConfig::default())
        .context("Downloaded world boundaries are not a GeoJSON FeatureCollection")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, &body).with_context(|| format!("Failed to write {:?}", path))?;

    tracing::info!("Saved {} bytes to {:?}", body.len(), path);
    Ok(body.len())
}

/// Left join of the world shapes with the per-code counts. Shapes without a
/// matching code get zero; excluded shapes are dropped from the surface.
pub fn join_counts(
    world: Vec<CountryShape>,
    counts: &BTreeMap<String, u32>,
    exclusions: &ExclusionList,
) -> Vec<ShadedCountry> {
    world
        .into_iter()
        .filter(|shape| !exclusions.excludes_shape(shape.iso3.as_deref(), shape.continent.as_deref()))
        .map(|shape| {
            let count = shape
                .iso3
                .as_ref()
                .and_then(|code| counts.get(code))
                .copied()
                .unwrap_or(0);
            ShadedCountry { shape, count }
        })
        .collect()
}
