//! Feature, input frame, prediction and model state type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{SonicError, SonicResult};

/// Column names in the order the model was trained on
pub const FEATURE_COLUMNS: [&str; 4] = ["RHOB", "GR", "NPHI", "PEF"];

/// Unit suffix for the predicted DT value
pub const DT_UNIT: &str = "µs/ft";

/// Display metadata for one input channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureField {
    /// Column name the model expects
    pub name: &'static str,
    /// Form field key
    pub key: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Default value shown in the form
    pub default: f64,
    /// Input step size
    pub step: f64,
}

/// Input channels in model column order
pub const FEATURE_FIELDS: [FeatureField; 4] = [
    FeatureField {
        name: "RHOB",
        key: "rhob",
        label: "RHOB (Density, g/cm³)",
        default: 2.5,
        step: 0.01,
    },
    FeatureField {
        name: "GR",
        key: "gr",
        label: "GR (Gamma Ray, API)",
        default: 50.0,
        step: 0.1,
    },
    FeatureField {
        name: "NPHI",
        key: "nphi",
        label: "NPHI (Neutron Porosity, v/v)",
        default: 0.2,
        step: 0.01,
    },
    FeatureField {
        name: "PEF",
        key: "pef",
        label: "PEF (Photoelectric Factor, b/e)",
        default: 5.0,
        step: 0.1,
    },
];

/// One set of well-log measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Bulk density, g/cm³
    pub rhob: f64,
    /// Gamma ray, API units
    pub gr: f64,
    /// Neutron porosity, fractional
    pub nphi: f64,
    /// Photoelectric factor, barns/electron
    pub pef: f64,
}

impl FeatureVector {
    pub fn new(rhob: f64, gr: f64, nphi: f64, pef: f64) -> Self {
        Self { rhob, gr, nphi, pef }
    }

    /// Values in [`FEATURE_COLUMNS`] order
    pub fn values(&self) -> [f64; 4] {
        [self.rhob, self.gr, self.nphi, self.pef]
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new(
            FEATURE_FIELDS[0].default,
            FEATURE_FIELDS[1].default,
            FEATURE_FIELDS[2].default,
            FEATURE_FIELDS[3].default,
        )
    }
}

/// Named-column tabular input handed to a model's inference entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of values, one entry per column
    pub rows: Vec<Vec<f64>>,
}

impl InputFrame {
    /// Build a frame, checking every row matches the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> SonicResult<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(SonicError::InvalidInput(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Single-row frame in the fixed training column order
    pub fn single(features: &FeatureVector) -> Self {
        Self {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![features.values().to_vec()],
        }
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A predicted DT value with the inputs that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Request identifier
    pub id: Uuid,
    /// Inputs as submitted
    pub features: FeatureVector,
    /// Predicted DT in µs/ft
    pub dt: f64,
    /// When the prediction was made
    pub predicted_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(features: FeatureVector, dt: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            features,
            dt,
            predicted_at: Utc::now(),
        }
    }

    /// DT rendered for display, e.g. `120.35 µs/ft`
    pub fn display_value(&self) -> String {
        format_dt(self.dt)
    }
}

/// Round half away from zero to two decimals and append the unit
pub fn format_dt(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{:.2} {}", rounded, DT_UNIT)
}

/// Lifecycle of the cached model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    /// No load attempted yet
    Unloaded,
    /// Load in progress
    Loading,
    /// Model cached and ready
    Loaded,
    /// Load failed; terminal until invalidated
    Failed,
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Unloaded => write!(f, "Unloaded"),
            ModelState::Loading => write!(f, "Loading"),
            ModelState::Loaded => write!(f, "Loaded"),
            ModelState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_default_matches_fields() {
        let features = FeatureVector::default();
        assert_eq!(features.values(), [2.5, 50.0, 0.2, 5.0]);
    }

    #[test]
    fn test_field_order_matches_columns() {
        let names: Vec<&str> = FEATURE_FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names, FEATURE_COLUMNS);
    }

    #[test]
    fn test_single_row_frame() {
        let frame = InputFrame::single(&FeatureVector::new(2.45, 61.0, 0.31, 3.2));
        assert_eq!(frame.columns, vec!["RHOB", "GR", "NPHI", "PEF"]);
        assert_eq!(frame.rows, vec![vec![2.45, 61.0, 0.31, 3.2]]);
        assert_eq!(frame.row_count(), 1);
        assert_eq!(frame.column_index("NPHI"), Some(2));
        assert_eq!(frame.column_index("DT"), None);
    }

    #[test]
    fn test_frame_rejects_ragged_rows() {
        let err = InputFrame::new(
            vec!["RHOB".to_string(), "GR".to_string()],
            vec![vec![2.5, 50.0], vec![2.5]],
        )
        .unwrap_err();
        assert!(matches!(err, SonicError::InvalidInput(_)));
    }

    #[test]
    fn test_format_dt_rounds_half_up() {
        assert_eq!(format_dt(120.345), "120.35 µs/ft");
        assert_eq!(format_dt(88.0), "88.00 µs/ft");
        assert_eq!(format_dt(0.0), "0.00 µs/ft");
    }

    #[test]
    fn test_prediction_display_and_serde() {
        let prediction = Prediction::new(FeatureVector::default(), 97.126);
        assert_eq!(prediction.display_value(), "97.13 µs/ft");

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["features"]["rhob"], 2.5);
        assert_eq!(json["dt"], 97.126);
    }

    #[test]
    fn test_model_state_display() {
        assert_eq!(ModelState::Loaded.to_string(), "Loaded");
        assert_eq!(
            serde_json::to_string(&ModelState::Failed).unwrap(),
            "\"failed\""
        );
    }
}
