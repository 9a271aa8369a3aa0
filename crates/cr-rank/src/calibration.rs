//! Value-typed calibration tables and the store that keys them by `stat` tag.
//!
//! Tables are read eagerly and never mutated afterwards; no file handle is kept
//! once a table has been loaded.

use cr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Attribute holding the statistic-family tag of a table.
pub const STAT_ATTR: &str = "stat";

/// Dense row-major numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NdArrayRepr")]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// On-disk form: a bare list is a 1-D array.
#[derive(Deserialize)]
#[serde(untagged)]
enum NdArrayRepr {
    Flat(Vec<f64>),
    Shaped { shape: Vec<usize>, data: Vec<f64> },
}

impl TryFrom<NdArrayRepr> for NdArray {
    type Error = Error;

    fn try_from(repr: NdArrayRepr) -> Result<Self> {
        match repr {
            NdArrayRepr::Flat(data) => Ok(Self::from_vec(data)),
            NdArrayRepr::Shaped { shape, data } => Self::new(shape, data),
        }
    }
}

impl NdArray {
    /// Create an array, checking that `shape` covers `data` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(Error::Calibration(format!(
                "array shape {shape:?} does not match {} values",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// 1-D array.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { shape: vec![data.len()], data }
    }

    /// Array dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Flat row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

impl From<Vec<f64>> for NdArray {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

/// Scalar table attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Numeric attribute.
    Number(f64),
    /// String attribute.
    Text(String),
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A read-only table of named arrays plus scalar attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationTable {
    #[serde(default)]
    attrs: BTreeMap<String, AttrValue>,
    #[serde(default)]
    arrays: BTreeMap<String, NdArray>,
}

impl CalibrationTable {
    /// Empty table tagged with `stat`.
    pub fn new(stat: impl Into<String>) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert(STAT_ATTR.to_string(), AttrValue::Text(stat.into()));
        Self { attrs, arrays: BTreeMap::new() }
    }

    /// Add (or replace) an array.
    pub fn with_array(mut self, name: impl Into<String>, array: impl Into<NdArray>) -> Self {
        self.arrays.insert(name.into(), array.into());
        self
    }

    /// Add (or replace) a scalar attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Read a table from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The `stat` tag, if present and a string.
    pub fn stat(&self) -> Option<&str> {
        match self.attrs.get(STAT_ATTR) {
            Some(AttrValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn label(&self) -> &str {
        self.stat().unwrap_or("<untagged>")
    }

    /// Look up an array.
    pub fn array(&self, name: &str) -> Result<&NdArray> {
        self.arrays.get(name).ok_or_else(|| {
            Error::Calibration(format!("table '{}' has no array '{name}'", self.label()))
        })
    }

    /// Look up a 1-D array.
    pub fn array_1d(&self, name: &str) -> Result<&[f64]> {
        let arr = self.array(name)?;
        if arr.ndim() != 1 {
            return Err(Error::Calibration(format!(
                "table '{}' array '{name}' must be 1-D, got shape {:?}",
                self.label(),
                arr.shape()
            )));
        }
        Ok(arr.data())
    }

    /// Look up a numeric attribute.
    pub fn attr_f64(&self, name: &str) -> Result<f64> {
        match self.attrs.get(name) {
            Some(AttrValue::Number(v)) => Ok(*v),
            Some(AttrValue::Text(_)) => Err(Error::Calibration(format!(
                "table '{}' attribute '{name}' is not numeric",
                self.label()
            ))),
            None => Err(Error::Calibration(format!(
                "table '{}' has no attribute '{name}'",
                self.label()
            ))),
        }
    }

    /// Look up a string attribute.
    pub fn attr_str(&self, name: &str) -> Result<&str> {
        match self.attrs.get(name) {
            Some(AttrValue::Text(s)) => Ok(s),
            Some(AttrValue::Number(_)) => Err(Error::Calibration(format!(
                "table '{}' attribute '{name}' is not a string",
                self.label()
            ))),
            None => Err(Error::Calibration(format!(
                "table '{}' has no attribute '{name}'",
                self.label()
            ))),
        }
    }
}

/// Calibration tables keyed by their `stat` tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStore {
    tables: BTreeMap<String, CalibrationTable>,
}

impl CalibrationStore {
    /// Store with no tables (enough for the closed-form statistics).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Key tables by their `stat` attribute.
    ///
    /// A table without a string `stat` attribute is an error. When two tables
    /// share a tag the later one wins.
    pub fn from_tables(tables: impl IntoIterator<Item = CalibrationTable>) -> Result<Self> {
        let mut by_tag = BTreeMap::new();
        for (i, table) in tables.into_iter().enumerate() {
            let tag = table
                .stat()
                .ok_or_else(|| {
                    Error::Calibration(format!(
                        "calibration table #{i} lacks a string '{STAT_ATTR}' attribute"
                    ))
                })?
                .to_string();
            if by_tag.insert(tag.clone(), table).is_some() {
                tracing::warn!(stat = %tag, "calibration table replaced by a later one");
            }
        }
        Ok(Self { tables: by_tag })
    }

    /// Read JSON calibration files and key them by `stat`.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut tables = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            tracing::info!(path = %path.display(), "loading calibration table");
            let table = CalibrationTable::from_json_path(path).map_err(|e| match e {
                Error::Io(io) => Error::Io(std::io::Error::new(
                    io.kind(),
                    format!("{}: {io}", path.display()),
                )),
                Error::Json(json) => {
                    Error::Calibration(format!("{}: invalid calibration JSON: {json}", path.display()))
                }
                other => other,
            })?;
            if table.stat().is_none() {
                return Err(Error::Calibration(format!(
                    "{} lacks a string '{STAT_ATTR}' attribute",
                    path.display()
                )));
            }
            tables.push(table);
        }
        let store = Self::from_tables(tables)?;
        tracing::debug!(n_tables = store.len(), "calibration store ready");
        Ok(store)
    }

    /// Table with tag `stat`, if any.
    pub fn get(&self, stat: &str) -> Option<&CalibrationTable> {
        self.tables.get(stat)
    }

    /// Table with tag `stat`, or a calibration error.
    pub fn require(&self, stat: &str) -> Result<&CalibrationTable> {
        self.get(stat).ok_or_else(|| {
            Error::Calibration(format!("no calibration table with stat '{stat}' was supplied"))
        })
    }

    /// All tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Tables with their tags.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CalibrationTable)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the store holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
