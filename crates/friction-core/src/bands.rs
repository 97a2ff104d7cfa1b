//! Ordered severity bands and the classifier that maps a scalar onto them
//!
//! A band covers the scalar range above the previous band's upper bound up to
//! and including its own. Lookup is a binary search over the ascending bounds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound of the last reference band and the reference clamp ceiling
pub const REFERENCE_CEILING: f64 = 0.99;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BandTableError {
    #[error("Band table must contain at least one band")]
    Empty,

    #[error("Band {index} ({label}) has a non-finite upper bound")]
    NonFiniteBound { index: usize, label: String },

    #[error("Band {index} upper bound {bound} is not greater than the previous bound {previous}")]
    NotAscending {
        index: usize,
        previous: f64,
        bound: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub upper_bound: f64,
    pub label: String,
}

impl Band {
    pub fn new(upper_bound: f64, label: impl Into<String>) -> Self {
        Self {
            upper_bound,
            label: label.into(),
        }
    }
}

/// Non-empty band list with finite, strictly ascending upper bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct BandTable {
    bands: Vec<Band>,
    labels: Vec<String>,
}

impl BandTable {
    pub fn new(bands: Vec<Band>) -> Result<Self, BandTableError> {
        if bands.is_empty() {
            return Err(BandTableError::Empty);
        }

        for (index, band) in bands.iter().enumerate() {
            if !band.upper_bound.is_finite() {
                return Err(BandTableError::NonFiniteBound {
                    index,
                    label: band.label.clone(),
                });
            }
            if index > 0 {
                let previous = bands[index - 1].upper_bound;
                if band.upper_bound <= previous {
                    return Err(BandTableError::NotAscending {
                        index,
                        previous,
                        bound: band.upper_bound,
                    });
                }
            }
        }

        let labels = bands.iter().map(|b| b.label.clone()).collect();
        Ok(Self { bands, labels })
    }

    /// Road surface table: Ice up to 0.2 through dry asphalt up to 0.99
    pub fn reference() -> Self {
        let bands = vec![
            Band::new(0.2, "Ice"),
            Band::new(0.4, "Snow (Hard Packed)"),
            Band::new(0.6, "Earth Road (wet)"),
            Band::new(0.8, "Earth Road (dry)"),
            Band::new(REFERENCE_CEILING, "Asphalt (dry)"),
        ];
        Self {
            labels: bands.iter().map(|b| b.label.clone()).collect(),
            bands,
        }
    }

    /// Upper bound of the last band
    pub fn ceiling(&self) -> f64 {
        self.bands[self.bands.len() - 1].upper_bound
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn classify(&self, scalar: f64) -> usize {
        classify(scalar, self)
    }
}

impl TryFrom<Vec<Band>> for BandTable {
    type Error = BandTableError;

    fn try_from(bands: Vec<Band>) -> Result<Self, Self::Error> {
        Self::new(bands)
    }
}

impl From<BandTable> for Vec<Band> {
    fn from(table: BandTable) -> Self {
        table.bands
    }
}

/// Index of the band containing `scalar`
///
/// Returns the first band whose upper bound is at least `scalar`, so a value
/// sitting exactly on a bound belongs to the lower band. Values above every
/// bound saturate to the last band; NaN resolves to band 0.
pub fn classify(scalar: f64, table: &BandTable) -> usize {
    let index = table.bands.partition_point(|band| band.upper_bound < scalar);
    index.min(table.bands.len() - 1)
}
