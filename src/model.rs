//! Core data models for the dashboard: the columnar dataset served by the
//! backend, semantic column resolution, and the shared UI state machine.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yew::Reducible;

/// Columnar dataset as returned by the backend query endpoint, shaped
/// `{ "columns": [...], "data": [[...], ...] }`. Rows are positionally
/// aligned with `columns`. Built wholesale by the loader and never mutated
/// afterwards; a reload replaces the whole `Rc` so layer memoization can key
/// on pointer identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    #[serde(rename = "data")]
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Shape check: column names unique, every row exactly as wide as
    /// `columns`. A violation means the payload is malformed.
    pub fn validate(&self) -> Result<(), DatasetError> {
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].contains(col) {
                return Err(DatasetError::DuplicateColumn(col.clone()));
            }
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(DatasetError::RaggedRow {
                    row: i,
                    expected: self.columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetError {
    DuplicateColumn(String),
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::DuplicateColumn(name) => write!(f, "duplicate column \"{name}\""),
            DatasetError::RaggedRow { row, expected, got } => {
                write!(f, "row {row} has {got} values, expected {expected}")
            }
        }
    }
}

/// Positions of the semantic fields the map needs, resolved once per
/// dataset by first exact match over the column names. A missing column is
/// `None`, not an error; every consumer degrades per-field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldIndices {
    pub lat: Option<usize>,
    pub lng: Option<usize>,
    pub name: Option<usize>,
    pub categories: Option<usize>,
}

impl FieldIndices {
    pub fn resolve(columns: &[String]) -> Self {
        let find = |field: &str| columns.iter().position(|c| c == field);
        Self {
            lat: find("lat"),
            lng: find("lng"),
            name: find("name"),
            categories: find("categories"),
        }
    }

    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parses a persisted value; anything unknown falls back to light.
    pub fn from_storage(raw: &str) -> Self {
        match raw {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

/// Shared dashboard state: the active theme, the last successfully loaded
/// dataset and the loading flag. Held in a single `use_reducer` at the top
/// of the component tree and passed down via props.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardState {
    pub theme: Theme,
    pub dataset: Option<Rc<Dataset>>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            dataset: None,
            is_loading: false,
            last_error: None,
        }
    }
}

impl DashboardState {
    pub fn record_count(&self) -> Option<usize> {
        self.dataset.as_ref().map(|d| d.len())
    }
}

#[derive(Clone, Debug)]
pub enum DashboardAction {
    SetTheme(Theme),
    LoadStarted,
    LoadSucceeded(Dataset),
    LoadFailed(String),
}

impl Reducible for DashboardState {
    type Action = DashboardAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        use DashboardAction::*;
        let mut new = (*self).clone();
        match action {
            SetTheme(theme) => {
                // Re-selecting the active theme is a no-op; returning the
                // same Rc keeps subscribers from re-rendering.
                if new.theme == theme {
                    return self;
                }
                new.theme = theme;
            }
            LoadStarted => {
                // At most one in-flight load.
                if new.is_loading {
                    return self;
                }
                new.is_loading = true;
            }
            LoadSucceeded(dataset) => {
                new.dataset = Some(Rc::new(dataset));
                new.is_loading = false;
                new.last_error = None;
            }
            LoadFailed(message) => {
                // Previous dataset stays visible; only the flag and the
                // error readout change.
                new.is_loading = false;
                new.last_error = Some(message);
            }
        }
        Rc::new(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_dataset() -> Dataset {
        Dataset {
            columns: vec![
                "name".to_string(),
                "categories".to_string(),
                "lat".to_string(),
                "lng".to_string(),
            ],
            rows: vec![vec![json!("Cafe X"), json!("Cafe"), json!(24.71), json!(46.68)]],
        }
    }

    #[test]
    fn dataset_decodes_split_orient_payload() {
        let raw = r#"{"columns":["name","lat","lng"],"index":[0],"data":[["A",24.7,46.6]]}"#;
        let ds: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(ds.columns.len(), 3);
        assert_eq!(ds.len(), 1);
        assert!(ds.validate().is_ok());
    }

    #[test]
    fn validate_rejects_ragged_rows() {
        let mut ds = sample_dataset();
        ds.rows.push(vec![json!("short")]);
        assert_eq!(
            ds.validate(),
            Err(DatasetError::RaggedRow {
                row: 1,
                expected: 4,
                got: 1
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_columns() {
        let mut ds = sample_dataset();
        ds.columns.push("lat".to_string());
        for row in &mut ds.rows {
            row.push(json!(0.0));
        }
        assert_eq!(
            ds.validate(),
            Err(DatasetError::DuplicateColumn("lat".to_string()))
        );
    }

    #[test]
    fn resolve_finds_all_known_fields() {
        let ds = sample_dataset();
        let fields = FieldIndices::resolve(&ds.columns);
        assert_eq!(fields.name, Some(0));
        assert_eq!(fields.categories, Some(1));
        assert_eq!(fields.lat, Some(2));
        assert_eq!(fields.lng, Some(3));
        assert!(fields.has_position());
    }

    #[test]
    fn resolve_yields_none_for_missing_fields() {
        let columns = vec!["lat".to_string(), "lng".to_string()];
        let fields = FieldIndices::resolve(&columns);
        assert_eq!(fields.name, None);
        assert_eq!(fields.categories, None);
        assert!(fields.has_position());
    }

    #[test]
    fn theme_storage_round_trip_and_fallback() {
        assert_eq!(Theme::from_storage("dark"), Theme::Dark);
        assert_eq!(Theme::from_storage("light"), Theme::Light);
        assert_eq!(Theme::from_storage("solarized"), Theme::Light);
        assert_eq!(Theme::from_storage(Theme::Dark.as_str()), Theme::Dark);
    }

    #[test]
    fn reselecting_active_theme_returns_same_state() {
        let state = Rc::new(DashboardState::default());
        let after = state.clone().reduce(DashboardAction::SetTheme(Theme::Light));
        assert!(Rc::ptr_eq(&state, &after));

        let dark = after.reduce(DashboardAction::SetTheme(Theme::Dark));
        assert_eq!(dark.theme, Theme::Dark);
    }

    #[test]
    fn load_started_is_gated_while_loading() {
        let state = Rc::new(DashboardState::default()).reduce(DashboardAction::LoadStarted);
        assert!(state.is_loading);
        let again = state.clone().reduce(DashboardAction::LoadStarted);
        assert!(Rc::ptr_eq(&state, &again));
    }

    #[test]
    fn successful_load_replaces_dataset_and_clears_flag() {
        let state = Rc::new(DashboardState::default())
            .reduce(DashboardAction::LoadStarted)
            .reduce(DashboardAction::LoadSucceeded(sample_dataset()));
        assert!(!state.is_loading);
        assert_eq!(state.record_count(), Some(1));
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let state = Rc::new(DashboardState::default())
            .reduce(DashboardAction::LoadSucceeded(sample_dataset()));
        let prior = state.dataset.clone().unwrap();

        let state = state
            .reduce(DashboardAction::LoadStarted)
            .reduce(DashboardAction::LoadFailed("backend unreachable".to_string()));
        assert!(!state.is_loading);
        assert!(Rc::ptr_eq(state.dataset.as_ref().unwrap(), &prior));
        assert_eq!(state.last_error.as_deref(), Some("backend unreachable"));
    }

    #[test]
    fn failed_first_load_leaves_dataset_absent() {
        let state = Rc::new(DashboardState::default())
            .reduce(DashboardAction::LoadStarted)
            .reduce(DashboardAction::LoadFailed("HTTP 500".to_string()));
        assert!(state.dataset.is_none());
        assert!(!state.is_loading);
    }
}
