//! Self-contained STAC catalog over one run's product set.
//!
//! Layout on disk:
//! ```text
//! <output>/<root_id>/catalog.json
//! <output>/<root_id>/<item_id>/<item_id>.json
//! <output>/<root_id>/<item_id>/<asset files...>
//! ```
//! Assets are moved into their item directory in one pass; no file is ever
//! referenced from two item directories.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::assemble::{DISCLAIMER, EXPERIMENTAL_PREFIX, ProductFiles, ProductSet};
use crate::error::{Error, Result};
use crate::io::EnviHeader;
use crate::types::ProductKind;

pub const STAC_VERSION: &str = "1.0.0";
pub const CATALOG_FILE: &str = "catalog.json";
/// Acquisition timestamps as written by the upstream L1B processor
pub const ACQUISITION_TIME_FORMAT: &str = "%Y-%m-%dt%H:%M:%Sz";

/// Closed polygon ring, first vertex repeated at the end
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub ring: Vec<[f64; 2]>,
}

impl Polygon {
    /// Pair consecutive values of a flat `[x0, y0, x1, y1, ...]` list and close the ring.
    pub fn from_flat(coords: &[f64]) -> std::result::Result<Self, String> {
        if coords.len() % 2 != 0 {
            return Err(format!("odd number of coordinates ({})", coords.len()));
        }
        if coords.len() < 6 {
            return Err(format!("need at least 3 vertices, got {}", coords.len() / 2));
        }
        let mut ring: Vec<[f64; 2]> = coords.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
        ring.push(ring[0]);
        Ok(Self { ring })
    }

    /// `[min_x, min_y, max_x, max_y]`
    pub fn bbox(&self) -> [f64; 4] {
        self.ring.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |b, p| [b[0].min(p[0]), b[1].min(p[1]), b[2].max(p[0]), b[3].max(p[1])],
        )
    }

    pub fn to_geojson(&self) -> Value {
        json!({ "type": "Polygon", "coordinates": [self.ring] })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemProperties {
    pub sensor: String,
    pub description: String,
    pub product: String,
    pub processing_level: String,
}

/// Catalog-relevant fields of one product, parsed from its header and file name
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMeta {
    pub id: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub geometry: Polygon,
    pub collection: String,
    pub properties: ItemProperties,
}

pub fn parse_acquisition_time(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let normalized = value.trim().to_ascii_lowercase();
    NaiveDateTime::parse_from_str(&normalized, ACQUISITION_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("{:?}: {}", value, e))
}

fn parse_flat_coordinates(value: &str) -> std::result::Result<Vec<f64>, String> {
    value
        .replace(['[', ']', '{', '}'], "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| format!("not a number: {:?}", s)))
        .collect()
}

/// Collection id and product token from an item id such as
/// `SISTER_AVNG_L2A_RFL_20200101T120000_001_UNC`.
pub fn collection_and_product(id: &str) -> std::result::Result<(String, String, String, String), String> {
    let tokens: Vec<&str> = id.split('_').collect();
    if tokens.len() < 6 {
        return Err(format!("expected at least 6 '_' tokens, got {}", tokens.len()));
    }
    let project = tokens[0].trim_start_matches(EXPERIMENTAL_PREFIX);
    let (sensor, level, product, crid) = (tokens[1], tokens[2], tokens[3], tokens[5]);
    let collection = format!("{}_{}_{}_{}_{}", project, sensor, level, product, crid);

    let mut product = product.to_string();
    for kind in [ProductKind::Uncertainty, ProductKind::AtmosphericState] {
        if id.ends_with(kind.suffix()) {
            product.push_str(kind.suffix());
        }
    }
    Ok((collection, sensor.to_string(), level.to_string(), product))
}

/// Read acquisition times, footprint and naming tokens from a final product header.
pub fn parse_product_metadata(header_path: &Path) -> Result<ProductMeta> {
    let invalid = |field: &'static str, reason: String| Error::InvalidHeader {
        path: header_path.to_path_buf(),
        field,
        reason,
    };
    let header = EnviHeader::read(header_path)?;
    let id = header_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| invalid("file name", "header path has no file name".into()))?;

    let start_datetime = parse_acquisition_time(header.require("start acquisition time")?)
        .map_err(|e| invalid("start acquisition time", e))?;
    let end_datetime = parse_acquisition_time(header.require("end acquisition time")?)
        .map_err(|e| invalid("end acquisition time", e))?;

    let coords = parse_flat_coordinates(header.require("bounding box")?)
        .map_err(|e| invalid("bounding box", e))?;
    let geometry = Polygon::from_flat(&coords).map_err(|e| invalid("bounding box", e))?;

    let (collection, sensor, processing_level, product) =
        collection_and_product(&id).map_err(|e| invalid("file name", e))?;

    Ok(ProductMeta {
        id,
        start_datetime,
        end_datetime,
        geometry,
        collection,
        properties: ItemProperties {
            sensor,
            description: header.get("description").unwrap_or_default().to_string(),
            product,
            processing_level,
        },
    })
}

/// A file attached to an item. `source` is where the file lives before the
/// catalog is saved; `href` is relative to the item directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub href: String,
    pub source: PathBuf,
}

impl Asset {
    pub fn from_source(source: &Path) -> Self {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            href: format!("./{}", name),
            source: source.to_path_buf(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.href.trim_start_matches("./")
    }

    fn media_type(&self) -> Option<&'static str> {
        let name = self.file_name();
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("json") => Some("application/json"),
            Some("png") => Some("image/png"),
            Some("jpg") => Some("image/jpeg"),
            Some("log") | Some("hdr") => Some("text/plain"),
            Some("bin") => Some("application/octet-stream"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub meta: ProductMeta,
    pub assets: BTreeMap<String, Asset>,
}

pub fn build_item(meta: ProductMeta, assets: Vec<(&str, PathBuf)>) -> CatalogItem {
    let assets = assets
        .into_iter()
        .map(|(key, path)| (key.to_string(), Asset::from_source(&path)))
        .collect();
    CatalogItem { meta, assets }
}

/// Items for every product in `set`; only the reflectance item carries the
/// browse image, run configuration and log.
pub fn items_for_product_set(set: &ProductSet) -> Result<Vec<CatalogItem>> {
    let mut products: Vec<&ProductFiles> = set.products.iter().collect();
    products.sort_by(|a, b| a.header.cmp(&b.header));

    let mut items = Vec::with_capacity(products.len());
    for files in products {
        let meta = parse_product_metadata(&files.header)?;
        let mut assets = vec![
            ("envi_binary", files.binary.clone()),
            ("envi_header", files.header.clone()),
        ];
        if files.metadata.is_file() {
            assets.push(("metadata", files.metadata.clone()));
        }
        if files.kind == ProductKind::Reflectance {
            if let Some(p) = &set.browse {
                assets.push(("browse", p.clone()));
            }
            if let Some(p) = &set.runconfig {
                assets.push(("runconfig", p.clone()));
            }
            if let Some(p) = set.log.as_ref().filter(|p| p.is_file()) {
                assets.push(("log", p.clone()));
            }
        }
        items.push(build_item(meta, assets));
    }
    Ok(items)
}

pub fn catalog_description(experimental: bool) -> String {
    format!(
        "{}This catalog contains the output data products of the reflectance pipeline, \
         including reflectance and reflectance uncertainty. Execution artifacts including \
         the runconfig file and execution log file are included with the reflectance data.",
        if experimental { DISCLAIMER } else { "" }
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub id: String,
    pub description: String,
    pub items: Vec<CatalogItem>,
}

#[derive(Serialize)]
struct Link {
    rel: &'static str,
    href: String,
    #[serde(rename = "type")]
    media_type: &'static str,
}

#[derive(Serialize)]
struct AssetDocument<'a> {
    href: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<&'static str>,
}

#[derive(Serialize)]
struct ItemDocument<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    stac_version: &'static str,
    id: &'a str,
    geometry: Value,
    bbox: [f64; 4],
    properties: Value,
    links: Vec<Link>,
    assets: BTreeMap<&'a str, AssetDocument<'a>>,
    collection: &'a str,
}

#[derive(Serialize)]
struct CatalogDocument<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    stac_version: &'static str,
    description: &'a str,
    links: Vec<Link>,
}

fn json_link(rel: &'static str, href: String) -> Link {
    Link {
        rel,
        href,
        media_type: "application/json",
    }
}

fn item_file_name(id: &str) -> String {
    format!("{}.json", id)
}

fn provenance_stub_name(id: &str) -> String {
    format!("{}.met.json", id)
}

/// Move a file, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

impl CatalogItem {
    fn to_document(&self) -> ItemDocument<'_> {
        let meta = &self.meta;
        let properties = json!({
            "sensor": meta.properties.sensor,
            "description": meta.properties.description,
            "product": meta.properties.product,
            "processing_level": meta.properties.processing_level,
            "datetime": meta.start_datetime,
            "start_datetime": meta.start_datetime,
            "end_datetime": meta.end_datetime,
        });
        ItemDocument {
            kind: "Feature",
            stac_version: STAC_VERSION,
            id: &meta.id,
            geometry: meta.geometry.to_geojson(),
            bbox: meta.geometry.bbox(),
            properties,
            links: vec![
                json_link("root", format!("../{}", CATALOG_FILE)),
                json_link("parent", format!("../{}", CATALOG_FILE)),
            ],
            assets: self
                .assets
                .iter()
                .map(|(k, a)| {
                    (
                        k.as_str(),
                        AssetDocument {
                            href: &a.href,
                            media_type: a.media_type(),
                        },
                    )
                })
                .collect(),
            collection: &meta.collection,
        }
    }
}

impl Catalog {
    /// Check the invariants that must hold before anything is written:
    /// unique item ids, hrefs that resolve inside their item directory,
    /// existing sources, and no target path or source file used twice.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::CatalogConsistency(msg));
        if self.id.is_empty() {
            return fail("catalog id is empty".into());
        }

        let mut ids = HashSet::new();
        let mut targets = HashSet::new();
        let mut sources = HashSet::new();
        for item in &self.items {
            let id = &item.meta.id;
            if id.is_empty() || id.contains('/') {
                return fail(format!("invalid item id {:?}", id));
            }
            if !ids.insert(id.as_str()) {
                return fail(format!("duplicate item id {:?}", id));
            }
            targets.insert(PathBuf::from(id).join(item_file_name(id)));

            for (key, asset) in &item.assets {
                let name = asset.file_name();
                let resolvable = asset.href.starts_with("./")
                    && !name.is_empty()
                    && !name.contains('/')
                    && name != ".."
                    && asset.source.file_name().is_some_and(|n| n == name);
                if !resolvable {
                    return fail(format!("asset {}/{} has unresolvable href {:?}", id, key, asset.href));
                }
                if !asset.source.is_file() {
                    return fail(format!("asset {}/{} source {:?} does not exist", id, key, asset.source));
                }
                if !targets.insert(PathBuf::from(id).join(name)) {
                    return fail(format!("duplicate asset target {}/{}", id, name));
                }
                if !sources.insert(asset.source.as_path()) {
                    return fail(format!("asset source {:?} referenced twice", asset.source));
                }
            }
        }
        Ok(())
    }

    /// Human-readable tree of the catalog
    pub fn describe(&self) -> String {
        let mut out = format!("* <Catalog id={}>\n", self.id);
        for item in &self.items {
            out.push_str(&format!("  * <Item id={}>\n", item.meta.id));
            for (key, asset) in &item.assets {
                out.push_str(&format!("    - {}: {}\n", key, asset.href));
            }
        }
        out
    }

    /// Persist as a self-contained tree under `<output_dir>/<id>/`.
    /// Returns the path of the catalog descriptor.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        self.validate()?;
        info!("Catalog layout:\n{}", self.describe());

        let root = output_dir.join(&self.id);
        fs::create_dir_all(&root)?;

        let mut links = vec![json_link("root", format!("./{}", CATALOG_FILE))];
        for item in &self.items {
            let id = &item.meta.id;
            let item_dir = root.join(id);
            fs::create_dir_all(&item_dir)?;

            for asset in item.assets.values() {
                let target = item_dir.join(asset.file_name());
                move_file(&asset.source, &target)?;
                debug!("Moved {:?} -> {:?}", asset.source, target);
            }

            let item_path = item_dir.join(item_file_name(id));
            fs::write(&item_path, serde_json::to_string_pretty(&item.to_document())?)?;

            let stub = item_dir.join(provenance_stub_name(id));
            if !stub.exists() {
                fs::File::create(&stub)?;
            }
            links.push(json_link("item", format!("./{}/{}", id, item_file_name(id))));
        }

        let doc = CatalogDocument {
            kind: "Catalog",
            id: &self.id,
            stac_version: STAC_VERSION,
            description: &self.description,
            links,
        };
        let catalog_path = root.join(CATALOG_FILE);
        fs::write(&catalog_path, serde_json::to_string_pretty(&doc)?)?;
        info!("Catalog saved to {:?}", catalog_path);
        Ok(catalog_path)
    }
}

/// Assemble and validate a catalog rooted at the reflectance item.
pub fn build_catalog(description: String, items: Vec<CatalogItem>) -> Result<Catalog> {
    let root_id = items
        .iter()
        .find(|i| {
            [ProductKind::Uncertainty, ProductKind::AtmosphericState]
                .iter()
                .all(|k| !i.meta.id.ends_with(k.suffix()))
        })
        .map(|i| i.meta.id.clone())
        .ok_or_else(|| Error::CatalogConsistency("no reflectance item in product set".into()))?;
    if items.len() < 2 {
        warn!("Catalog {} holds only {} item(s)", root_id, items.len());
    }
    let catalog = Catalog {
        id: root_id,
        description,
        items,
    };
    catalog.validate()?;
    Ok(catalog)
}
