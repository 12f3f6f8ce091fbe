use crate::core::constants::TILE_ERROR_BUDGET;
use crate::core::geo::TileCoord;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown in place of tiles that failed to load
pub const PLACEHOLDER_TILE_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="256" height="256">"##,
    r##"<rect width="100%" height="100%" fill="#f0f0f0"/>"##,
    r##"<text x="50%" y="50%" text-anchor="middle" fill="#999" font-size="12">Map tile unavailable</text>"##,
    "</svg>"
);

/// Data URI form of [`PLACEHOLDER_TILE_SVG`] for surfaces that take a URL
pub fn placeholder_tile_url() -> String {
    let encoded: String = PLACEHOLDER_TILE_SVG
        .chars()
        .map(|c| match c {
            '#' => "%23".to_string(),
            '"' => "'".to_string(),
            '<' => "%3C".to_string(),
            '>' => "%3E".to_string(),
            c => c.to_string(),
        })
        .collect();
    format!("data:image/svg+xml;charset=utf-8,{}", encoded)
}

/// Visual base layer a user can choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapLayerKind {
    Street,
    Satellite,
    Terrain,
}

impl MapLayerKind {
    pub const ALL: [MapLayerKind; 3] = [Self::Street, Self::Satellite, Self::Terrain];
}

impl Default for MapLayerKind {
    fn default() -> Self {
        Self::Street
    }
}

impl fmt::Display for MapLayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Street => "street",
            Self::Satellite => "satellite",
            Self::Terrain => "terrain",
        };
        f.write_str(name)
    }
}

/// One XYZ raster tile source. Immutable once configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileProviderSpec {
    pub name: String,
    /// `{z}`, `{x}`, `{y}` are required; `{s}` and `{r}` are optional
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
    /// Failures inside the error window that push the chain past this provider
    #[serde(default = "default_error_budget")]
    pub error_budget: u32,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

fn default_error_budget() -> u32 {
    TILE_ERROR_BUDGET
}

impl TileProviderSpec {
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        attribution: impl Into<String>,
        max_zoom: u8,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            attribution: attribution.into(),
            max_zoom,
            error_budget: TILE_ERROR_BUDGET,
            subdomains: Vec::new(),
        }
    }

    pub fn with_subdomains(mut self, subdomains: &str) -> Self {
        self.subdomains = subdomains.chars().map(String::from).collect();
        self
    }

    pub fn with_error_budget(mut self, budget: u32) -> Self {
        self.error_budget = budget;
        self
    }

    /// Build a URL for the requested `coord`.
    pub fn tile_url(&self, coord: TileCoord, retina: bool) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
            self.subdomains[idx].as_str()
        };

        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{r}", if retina { "@2x" } else { "" })
    }

    pub fn validate(&self) -> Result<()> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.url_template.contains(placeholder) {
                return Err(MapError::Config(format!(
                    "provider '{}' template lacks {}",
                    self.name, placeholder
                )));
            }
        }
        if self.url_template.contains("{s}") && self.subdomains.is_empty() {
            return Err(MapError::Config(format!(
                "provider '{}' uses {{s}} without subdomains",
                self.name
            )));
        }
        if self.error_budget == 0 {
            return Err(MapError::Config(format!(
                "provider '{}' has a zero error budget",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ordered provider lists, one per layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCatalog {
    pub street: Vec<TileProviderSpec>,
    pub satellite: Vec<TileProviderSpec>,
    pub terrain: Vec<TileProviderSpec>,
}

impl ProviderCatalog {
    pub fn providers(&self, layer: MapLayerKind) -> &[TileProviderSpec] {
        match layer {
            MapLayerKind::Street => &self.street,
            MapLayerKind::Satellite => &self.satellite,
            MapLayerKind::Terrain => &self.terrain,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for layer in MapLayerKind::ALL {
            let providers = self.providers(layer);
            if providers.is_empty() {
                return Err(MapError::Layer(format!("no tile providers for {} layer", layer)));
            }
            providers.iter().try_for_each(TileProviderSpec::validate)?;
        }
        Ok(())
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        let osm = TileProviderSpec::new(
            "OpenStreetMap",
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            "&copy; OpenStreetMap contributors",
            19,
        )
        .with_subdomains("abc");

        let carto = TileProviderSpec::new(
            "CARTO Voyager",
            "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png",
            "&copy; OpenStreetMap contributors &copy; CARTO",
            20,
        )
        .with_subdomains("abcd");

        let esri = TileProviderSpec::new(
            "Esri World Imagery",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            "Tiles &copy; Esri",
            19,
        );

        let topo = TileProviderSpec::new(
            "OpenTopoMap",
            "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            "&copy; OpenStreetMap contributors, SRTM | &copy; OpenTopoMap (CC-BY-SA)",
            17,
        )
        .with_subdomains("abc");

        Self {
            street: vec![osm.clone(), carto],
            satellite: vec![esri],
            terrain: vec![topo, osm],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_substitution() {
        let catalog = ProviderCatalog::default();
        let coord = TileCoord::new(2, 3, 5);

        let carto = &catalog.street[1];
        assert_eq!(
            carto.tile_url(coord, true),
            "https://b.basemaps.cartocdn.com/rastertiles/voyager/5/2/3@2x.png"
        );
        assert_eq!(
            carto.tile_url(coord, false),
            "https://b.basemaps.cartocdn.com/rastertiles/voyager/5/2/3.png"
        );

        // Esri swaps x and y
        assert!(catalog.satellite[0]
            .tile_url(coord, false)
            .ends_with("/tile/5/3/2"));
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = ProviderCatalog::default();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.providers(MapLayerKind::Terrain).len(), 2);
        assert!(catalog.street.iter().all(|p| p.error_budget == 4));
    }

    #[test]
    fn test_validation_failures() {
        let mut catalog = ProviderCatalog::default();
        catalog.satellite.clear();
        assert!(matches!(catalog.validate(), Err(MapError::Layer(_))));

        let broken = TileProviderSpec::new("broken", "https://example.com/{z}/{x}.png", "", 10);
        assert!(broken.validate().is_err());

        let no_subdomains = TileProviderSpec::new("s", "https://{s}.x/{z}/{x}/{y}", "", 10);
        assert!(no_subdomains.validate().is_err());
    }

    #[test]
    fn test_placeholder_is_data_uri() {
        let url = placeholder_tile_url();
        assert!(url.starts_with("data:image/svg+xml"));
        assert!(!url.contains('#'));
    }
}
