use crate::world::ShadedCountry;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
struct CountryIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountryIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Joined countries behind a bounding-box R-tree, for point queries.
pub struct CountryLookup {
    countries: Vec<ShadedCountry>,
    tree: RTree<CountryIndex>,
    extent: Option<Rect<f64>>,
}

impl CountryLookup {
    pub fn new(countries: Vec<ShadedCountry>) -> Self {
        let mut extent: Option<Rect<f64>> = None;

        let items: Vec<CountryIndex> = countries
            .iter()
            .enumerate()
            .filter_map(|(i, country)| {
                let rect = country.shape.geometry.bounding_rect()?;
                extent = Some(match extent {
                    Some(e) => Rect::new(
                        geo::Coord {
                            x: e.min().x.min(rect.min().x),
                            y: e.min().y.min(rect.min().y),
                        },
                        geo::Coord {
                            x: e.max().x.max(rect.max().x),
                            y: e.max().y.max(rect.max().y),
                        },
                    ),
                    None => rect,
                });
                Some(CountryIndex {
                    index: i,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Self {
            countries,
            tree: RTree::bulk_load(items),
            extent,
        }
    }

    pub fn countries(&self) -> &[ShadedCountry] {
        &self.countries
    }

    /// Bounding box of every indexed shape, `None` when nothing is drawable.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.extent
    }

    /// The country whose geometry contains `(lon, lat)`.
    pub fn find(&self, lon: f64, lat: f64) -> Option<&ShadedCountry> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.countries.get(candidate.index))
            .find(|country| country.shape.geometry.contains(&point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::CountryShape;
    use geo::{polygon, MultiPolygon};

    fn country(iso3: &str, x: f64, y: f64) -> ShadedCountry {
        let square = polygon![
            (x: x, y: y),
            (x: x + 10.0, y: y),
            (x: x + 10.0, y: y + 10.0),
            (x: x, y: y + 10.0),
        ];
        ShadedCountry {
            shape: CountryShape {
                iso3: Some(iso3.to_string()),
                name: None,
                continent: None,
                geometry: MultiPolygon::new(vec![square]),
            },
            count: 1,
        }
    }

    #[test]
    fn test_find_and_extent() {
        let lookup = CountryLookup::new(vec![country("FRA", 0.0, 40.0), country("DEU", 10.0, 40.0)]);

        let found = lookup.find(15.0, 45.0).unwrap();
        assert_eq!(found.shape.iso3.as_deref(), Some("DEU"));
        assert!(lookup.find(-5.0, 45.0).is_none());

        let extent = lookup.extent().unwrap();
        assert_eq!(extent.min().x, 0.0);
        assert_eq!(extent.max().x, 20.0);
        assert_eq!(extent.max().y, 50.0);
    }

    #[test]
    fn test_empty_lookup() {
        let lookup = CountryLookup::new(Vec::new());
        assert!(lookup.extent().is_none());
        assert!(lookup.find(0.0, 0.0).is_none());
    }
}
