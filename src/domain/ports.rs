//! Named port catalog and location parsing

use crate::domain::geo::GeoPoint;
use crate::error::{Result, TrackingError};
use rustc_hash::FxHashMap;

/// Ports known without any configuration
const BUILTIN_PORTS: [(&str, GeoPoint); 14] = [
    ("Shanghai", GeoPoint::from_degrees(121.4737, 31.2304)),
    ("Los Angeles", GeoPoint::from_degrees(-118.2437, 34.0522)),
    ("Rotterdam", GeoPoint::from_degrees(4.47917, 51.9225)),
    ("New York", GeoPoint::from_degrees(-74.0060, 40.7128)),
    ("Tokyo", GeoPoint::from_degrees(139.6503, 35.6762)),
    ("Seattle", GeoPoint::from_degrees(-122.3321, 47.6062)),
    ("Singapore", GeoPoint::from_degrees(103.8198, 1.3521)),
    ("Hamburg", GeoPoint::from_degrees(9.9937, 53.5511)),
    ("Busan", GeoPoint::from_degrees(129.0756, 35.1796)),
    ("Hong Kong", GeoPoint::from_degrees(114.1694, 22.3193)),
    ("Antwerp", GeoPoint::from_degrees(4.4025, 51.2194)),
    ("Savannah", GeoPoint::from_degrees(-81.0912, 32.0809)),
    ("Vancouver", GeoPoint::from_degrees(-123.1207, 49.2827)),
    ("Santos", GeoPoint::from_degrees(-46.3336, -23.9608)),
];

/// Lookup table of port names to coordinates.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct PortCatalog {
    ports: FxHashMap<String, (String, GeoPoint)>,
}

impl Default for PortCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        for (name, point) in BUILTIN_PORTS {
            catalog.insert(name, point);
        }
        catalog
    }
}

impl PortCatalog {
    pub fn empty() -> Self {
        Self { ports: FxHashMap::default() }
    }

    /// Add or replace a port
    pub fn insert(&mut self, name: &str, point: GeoPoint) {
        self.ports.insert(name.to_lowercase(), (name.to_string(), point));
    }

    pub fn get(&self, name: &str) -> Option<GeoPoint> {
        self.ports.get(&name.trim().to_lowercase()).map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port names in display form, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ports.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a location given as a port name or as `lon,lat`.
    ///
    /// Explicit coordinates are range-checked; port names must exist.
    pub fn resolve(&self, location: &str) -> Result<GeoPoint> {
        if let Some(point) = self.get(location) {
            return Ok(point);
        }
        match parse_coordinates(location) {
            Some((lon, lat)) => GeoPoint::new(lon, lat),
            None => Err(TrackingError::UnknownPort(location.trim().to_string())),
        }
    }
}

/// Parse `lon,lat` (whitespace tolerant)
fn parse_coordinates(s: &str) -> Option<(f64, f64)> {
    let (lon, lat) = s.split_once(',')?;
    let lon = lon.trim().parse::<f64>().ok()?;
    let lat = lat.trim().parse::<f64>().ok()?;
    Some((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_case_insensitive() {
        let catalog = PortCatalog::default();
        assert_eq!(catalog.len(), BUILTIN_PORTS.len());
        assert_eq!(catalog.get("shanghai"), Some(GeoPoint::from_degrees(121.4737, 31.2304)));
        assert_eq!(catalog.get("  NEW YORK "), Some(GeoPoint::from_degrees(-74.0060, 40.7128)));
        assert_eq!(catalog.get("Atlantis"), None);
    }

    #[test]
    fn test_resolve_coordinates() {
        let catalog = PortCatalog::default();
        assert_eq!(catalog.resolve("10.5, -20.25").unwrap(), GeoPoint::from_degrees(10.5, -20.25));
        assert_eq!(
            catalog.resolve("200,0"),
            Err(TrackingError::InvalidCoordinate { lon: 200.0, lat: 0.0 })
        );
        assert_eq!(catalog.resolve("Atlantis"), Err(TrackingError::UnknownPort("Atlantis".into())));
        assert!(catalog.resolve("1,two").is_err());
    }

    #[test]
    fn test_insert_overrides() {
        let mut catalog = PortCatalog::empty();
        assert!(catalog.is_empty());
        catalog.insert("Piraeus", GeoPoint::from_degrees(23.6470, 37.9420));
        catalog.insert("PIRAEUS", GeoPoint::from_degrees(23.0, 37.0));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("piraeus"), Some(GeoPoint::from_degrees(23.0, 37.0)));
        assert_eq!(catalog.names(), vec!["PIRAEUS"]);
    }
}
