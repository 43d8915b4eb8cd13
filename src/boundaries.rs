//! Boundary layer loading and the shared, read-only boundary set
//!
//! The shapefile is parsed exactly once per run into a [`BoundarySet`]:
//! polygon geometries, a fixed attribute schema, the CRS read from the
//! `.prj` sidecar, and a cached bounding rect per boundary. The set is the
//! object shared (behind an `Arc`) with every aggregation worker, so
//! nothing here is mutable after load.

use crate::errors::{Result, ZonalisError};
use geo::BoundingRect;
use geo_types::{MultiPolygon, Rect};
use shapefile::dbase::FieldValue;
use std::fmt;
use std::path::Path;

/// One attribute cell of a boundary record.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Integer(v) => write!(f, "{}", v),
            AttrValue::Boolean(v) => write!(f, "{}", v),
            AttrValue::Null => Ok(()),
        }
    }
}

/// Declared type of one attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Boolean,
}

/// One polygon boundary with its attribute record and cached extent.
#[derive(Debug, Clone)]
pub struct Boundary {
    geometry: MultiPolygon<f64>,
    bbox: Rect<f64>,
    attributes: Vec<AttrValue>,
}

impl Boundary {
    /// Build a boundary, caching its bounding rect. Fails on empty
    /// geometry, which has no extent to aggregate over.
    pub fn new(geometry: MultiPolygon<f64>, attributes: Vec<AttrValue>) -> Result<Self> {
        let bbox = geometry.bounding_rect().ok_or_else(|| {
            ZonalisError::Generic("Boundary geometry is empty".to_string())
        })?;
        Ok(Self {
            geometry,
            bbox,
            attributes,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding rect computed once at load time.
    pub fn bbox(&self) -> &Rect<f64> {
        &self.bbox
    }

    pub fn attributes(&self) -> &[AttrValue] {
        &self.attributes
    }
}

/// Ordered, immutable collection of boundaries sharing one CRS.
///
/// Iteration order is the shapefile record order and defines the row order
/// of every derived table.
#[derive(Debug, Clone)]
pub struct BoundarySet {
    boundaries: Vec<Boundary>,
    fields: Vec<(String, FieldKind)>,
    crs_wkt: String,
}

impl BoundarySet {
    /// Assemble a set from already-built parts. Used by embedders and
    /// tests that construct boundaries programmatically.
    pub fn from_parts(
        fields: Vec<(String, FieldKind)>,
        crs_wkt: String,
        boundaries: Vec<Boundary>,
    ) -> Self {
        Self {
            boundaries,
            fields,
            crs_wkt,
        }
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Boundary> {
        self.boundaries.iter()
    }

    /// Attribute schema fixed at load time.
    pub fn fields(&self) -> &[(String, FieldKind)] {
        &self.fields
    }

    /// Attribute field names in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Coordinate reference system as the raw `.prj` WKT.
    pub fn crs_wkt(&self) -> &str {
        &self.crs_wkt
    }
}

/// Parse a shapefile into a [`BoundarySet`] in a single pass.
///
/// Fails when the shapefile cannot be opened, a shape is not a polygon, a
/// polygon is empty, or the `.prj` CRS sidecar is missing or blank.
pub fn load(shp_path: &Path) -> Result<BoundarySet> {
    let crs_wkt = read_crs(shp_path)?;

    let shapes = shapefile::read_as::<_, shapefile::Polygon, shapefile::dbase::Record>(shp_path)
        .map_err(|e| ZonalisError::boundary_load(shp_path.display(), e.to_string()))?;

    log::info!(
        "Loaded {} boundary features from {}",
        shapes.len(),
        shp_path.display()
    );

    // Schema from the first record; dbase hands fields back as a map, so
    // sorted names give the stable column order the table contract needs.
    let fields = match shapes.first() {
        Some((_, record)) => {
            let mut fields: Vec<(String, FieldKind)> = record
                .clone()
                .into_iter()
                .map(|(name, value)| (name, kind_of(&value)))
                .collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            fields
        }
        None => Vec::new(),
    };

    let mut boundaries = Vec::with_capacity(shapes.len());
    for (index, (shape, record)) in shapes.into_iter().enumerate() {
        let geometry: MultiPolygon<f64> = shape.into();
        let attributes = fields
            .iter()
            .map(|(name, _)| convert_field(record.get(name)))
            .collect();
        let boundary = Boundary::new(geometry, attributes).map_err(|e| {
            ZonalisError::boundary_load(
                shp_path.display(),
                format!("feature {}: {}", index, e),
            )
        })?;
        boundaries.push(boundary);
    }

    Ok(BoundarySet {
        boundaries,
        fields,
        crs_wkt,
    })
}

/// Read the CRS from the `.prj` sidecar next to the shapefile.
fn read_crs(shp_path: &Path) -> Result<String> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = std::fs::read_to_string(&prj_path).map_err(|_| {
        ZonalisError::boundary_load(
            shp_path.display(),
            format!(
                "no coordinate reference system ({} is missing)",
                prj_path.display()
            ),
        )
    })?;
    let wkt = wkt.trim().to_string();
    if wkt.is_empty() {
        return Err(ZonalisError::boundary_load(
            shp_path.display(),
            "coordinate reference system file is empty",
        ));
    }
    Ok(wkt)
}

fn kind_of(value: &FieldValue) -> FieldKind {
    match value {
        FieldValue::Numeric(_) | FieldValue::Float(_) | FieldValue::Double(_) => FieldKind::Number,
        FieldValue::Integer(_) => FieldKind::Integer,
        FieldValue::Logical(_) => FieldKind::Boolean,
        _ => FieldKind::Text,
    }
}

fn convert_field(value: Option<&FieldValue>) -> AttrValue {
    match value {
        Some(FieldValue::Character(Some(s))) => AttrValue::Text(s.clone()),
        Some(FieldValue::Numeric(Some(v))) => AttrValue::Number(*v),
        Some(FieldValue::Float(Some(v))) => AttrValue::Number(f64::from(*v)),
        Some(FieldValue::Double(v)) => AttrValue::Number(*v),
        Some(FieldValue::Integer(v)) => AttrValue::Integer(i64::from(*v)),
        Some(FieldValue::Logical(Some(v))) => AttrValue::Boolean(*v),
        Some(FieldValue::Date(Some(d))) => AttrValue::Text(format!(
            "{:04}-{:02}-{:02}",
            d.year(),
            d.month(),
            d.day()
        )),
        Some(FieldValue::Memo(s)) => AttrValue::Text(s.clone()),
        _ => AttrValue::Null,
    }
}
