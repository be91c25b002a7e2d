//! Derives renderable map layers from a loaded dataset: one pickable point
//! layer plus tooltip/click formatting over the resolved columns.

use std::rc::Rc;

use serde_json::Value;

use crate::geo;
use crate::model::{Dataset, FieldIndices};
use crate::state::Viewport;

pub const POI_LAYER_ID: &str = "poi-points";

// Point styling, fixed rather than data-driven: metric radius clamped to a
// device-pixel range.
const FILL_COLOR: [u8; 3] = [255, 140, 0];
const RADIUS_METERS: f64 = 40.0;
const RADIUS_MIN_PX: f64 = 1.0;
const RADIUS_MAX_PX: f64 = 5.0;
const PICK_SLOP_PX: f64 = 3.0;

const MISSING_FIELD: &str = "(unknown)";

fn cell_f64(row: &[Value], idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| row.get(i)).and_then(Value::as_f64)
}

fn cell_text(row: &[Value], idx: Option<usize>) -> Option<String> {
    match idx.and_then(|i| row.get(i))? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Declarative description of the rendered point overlay. Positions are read
/// straight out of the dataset rows, in row order; rows without a usable
/// coordinate pair are skipped by the renderer and by picking.
pub struct PointLayer {
    pub id: &'static str,
    pub pickable: bool,
    dataset: Rc<Dataset>,
    fields: FieldIndices,
}

impl PointLayer {
    fn new(dataset: Rc<Dataset>) -> Self {
        let fields = FieldIndices::resolve(&dataset.columns);
        Self {
            id: POI_LAYER_ID,
            pickable: true,
            dataset,
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Whether the dataset resolved both coordinate columns; without them
    /// the layer draws nothing.
    pub fn has_position_fields(&self) -> bool {
        self.fields.has_position()
    }

    /// `(lng, lat)` of one row, or `None` when a coordinate column is
    /// unresolved or the cell is not numeric.
    pub fn position(&self, row: usize) -> Option<(f64, f64)> {
        let row = self.dataset.rows.get(row)?;
        let lng = cell_f64(row, self.fields.lng)?;
        let lat = cell_f64(row, self.fields.lat)?;
        Some((lng, lat))
    }

    /// Drawn radius in pixels at the given latitude and zoom.
    pub fn radius_px(&self, lat: f64, zoom: f64) -> f64 {
        (RADIUS_METERS / geo::meters_per_pixel(lat, zoom)).clamp(RADIUS_MIN_PX, RADIUS_MAX_PX)
    }

    pub fn fill_style(&self) -> String {
        let [r, g, b] = FILL_COLOR;
        format!("rgb({r},{g},{b})")
    }

    /// Hover text for one row: the name field's value.
    pub fn tooltip(&self, row: usize) -> Option<String> {
        cell_text(self.dataset.rows.get(row)?, self.fields.name)
    }

    /// Text for the click alert. Unresolved or empty fields degrade to a
    /// placeholder instead of faulting.
    pub fn click_message(&self, row: usize) -> String {
        let cells = self.dataset.rows.get(row).map(Vec::as_slice).unwrap_or(&[]);
        let name = cell_text(cells, self.fields.name).unwrap_or_else(|| MISSING_FIELD.to_string());
        let category =
            cell_text(cells, self.fields.categories).unwrap_or_else(|| MISSING_FIELD.to_string());
        format!("Restaurant: {name}\nCategory: {category}")
    }
}

/// A picked point, addressed by layer and row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickedPoint {
    pub layer: usize,
    pub row: usize,
}

/// The full set of derived layers for the current dataset. Pure function of
/// the dataset; rebuilding is cheap and happens only on dataset replacement.
#[derive(Default)]
pub struct LayerSet {
    pub layers: Vec<PointLayer>,
}

impl LayerSet {
    /// An absent dataset, or one without columns or rows, yields the
    /// canonical empty set: nothing to show, distinct from an error.
    pub fn build(dataset: Option<&Rc<Dataset>>) -> Self {
        match dataset {
            Some(ds) if !ds.is_empty() => Self {
                layers: vec![PointLayer::new(ds.clone())],
            },
            _ => Self { layers: Vec::new() },
        }
    }

    pub fn point_count(&self) -> usize {
        self.layers.iter().map(PointLayer::len).sum()
    }

    pub fn tooltip(&self, pick: Option<PickedPoint>) -> Option<String> {
        let pick = pick?;
        self.layers.get(pick.layer)?.tooltip(pick.row)
    }

    pub fn click_message(&self, pick: PickedPoint) -> Option<String> {
        Some(self.layers.get(pick.layer)?.click_message(pick.row))
    }

    /// Screen-space hit test against the drawn radius (plus a small slop).
    /// The closest hit wins; ties keep the lower row index so picking is
    /// deterministic.
    pub fn pick(
        &self,
        viewport: &Viewport,
        width: f64,
        height: f64,
        x: f64,
        y: f64,
    ) -> Option<PickedPoint> {
        let mut best: Option<(f64, PickedPoint)> = None;
        for (li, layer) in self.layers.iter().enumerate() {
            if !layer.pickable {
                continue;
            }
            for row in 0..layer.len() {
                let Some((lng, lat)) = layer.position(row) else {
                    continue;
                };
                let (sx, sy) = viewport.to_screen(lng, lat, width, height);
                let reach = layer.radius_px(lat, viewport.zoom) + PICK_SLOP_PX;
                let d2 = (sx - x) * (sx - x) + (sy - y) * (sy - y);
                if d2 > reach * reach {
                    continue;
                }
                if best.map_or(true, |(bd, _)| d2 < bd) {
                    best = Some((d2, PickedPoint { layer: li, row }));
                }
            }
        }
        best.map(|(_, p)| p)
    }
}

/// Memoizes the derived layers on dataset identity. The position accessor
/// runs per-row per-frame, so the set must stay cache-stable until the
/// dataset `Rc` is actually replaced.
#[derive(Default)]
pub struct LayerCache {
    cached: Option<(Rc<Dataset>, Rc<LayerSet>)>,
}

impl LayerCache {
    pub fn layers_for(&mut self, dataset: Option<&Rc<Dataset>>) -> Rc<LayerSet> {
        match dataset {
            Some(ds) => {
                if let Some((key, set)) = &self.cached {
                    if Rc::ptr_eq(key, ds) {
                        return set.clone();
                    }
                }
                let set = Rc::new(LayerSet::build(Some(ds)));
                self.cached = Some((ds.clone(), set.clone()));
                set
            }
            None => {
                self.cached = None;
                Rc::new(LayerSet::build(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Rc<Dataset> {
        Rc::new(Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    fn riyadh_pois() -> Rc<Dataset> {
        dataset(
            &["name", "categories", "lat", "lng"],
            vec![
                vec![json!("Cafe X"), json!("Cafe"), json!(24.71), json!(46.68)],
                vec![json!("Shawarma Corner"), json!("Fast Food"), json!(24.72), json!(46.70)],
                vec![json!("Najd House"), json!("Arabic"), json!(24.69), json!(46.65)],
            ],
        )
    }

    #[test]
    fn build_produces_one_layer_covering_every_row() {
        let ds = riyadh_pois();
        let set = LayerSet::build(Some(&ds));
        assert_eq!(set.layers.len(), 1);
        assert_eq!(set.point_count(), ds.len());
        assert_eq!(set.layers[0].id, POI_LAYER_ID);
        assert!(set.layers[0].pickable);
    }

    #[test]
    fn absent_or_empty_dataset_yields_nothing_to_show() {
        let none = LayerSet::build(None);
        assert!(none.layers.is_empty());
        assert_eq!(none.tooltip(Some(PickedPoint { layer: 0, row: 0 })), None);

        let empty = dataset(&[], vec![]);
        let set = LayerSet::build(Some(&empty));
        assert!(set.layers.is_empty());
        assert_eq!(set.point_count(), 0);
    }

    #[test]
    fn position_round_trip_and_tooltip() {
        let ds = dataset(
            &["name", "categories", "lat", "lng"],
            vec![vec![json!("Cafe X"), json!("Cafe"), json!(24.71), json!(46.68)]],
        );
        let set = LayerSet::build(Some(&ds));
        let layer = &set.layers[0];
        assert_eq!(layer.position(0), Some((46.68, 24.71)));
        assert_eq!(
            set.tooltip(Some(PickedPoint { layer: 0, row: 0 })),
            Some("Cafe X".to_string())
        );
        assert_eq!(set.tooltip(None), None);
    }

    #[test]
    fn missing_name_and_categories_degrade_gracefully() {
        let ds = dataset(&["lat", "lng"], vec![vec![json!(24.71), json!(46.68)]]);
        let set = LayerSet::build(Some(&ds));
        let layer = &set.layers[0];
        assert_eq!(layer.position(0), Some((46.68, 24.71)));
        assert_eq!(layer.tooltip(0), None);
        assert_eq!(
            layer.click_message(0),
            "Restaurant: (unknown)\nCategory: (unknown)"
        );
    }

    #[test]
    fn missing_coordinates_drop_rows_instead_of_failing() {
        let ds = dataset(
            &["name", "categories"],
            vec![vec![json!("Cafe X"), json!("Cafe")]],
        );
        let set = LayerSet::build(Some(&ds));
        assert_eq!(set.layers[0].position(0), None);
        let vp = Viewport::default();
        assert_eq!(set.pick(&vp, 800.0, 600.0, 400.0, 300.0), None);
    }

    #[test]
    fn non_numeric_coordinate_cells_are_skipped() {
        let ds = dataset(
            &["name", "categories", "lat", "lng"],
            vec![
                vec![json!("Bad"), json!("Cafe"), json!("n/a"), json!(46.68)],
                vec![json!("Good"), json!("Cafe"), json!(24.71), json!(46.68)],
            ],
        );
        let set = LayerSet::build(Some(&ds));
        assert_eq!(set.layers[0].position(0), None);
        assert_eq!(set.layers[0].position(1), Some((46.68, 24.71)));
        // Point count still reflects every row.
        assert_eq!(set.point_count(), 2);
    }

    #[test]
    fn radius_stays_within_pixel_bounds() {
        let ds = riyadh_pois();
        let set = LayerSet::build(Some(&ds));
        let layer = &set.layers[0];
        assert_eq!(layer.radius_px(24.7, 1.0), 1.0);
        assert_eq!(layer.radius_px(24.7, 20.0), 5.0);
        let mid = layer.radius_px(24.7, 17.0);
        assert!(mid > 1.0 && mid < 5.0);
        assert_eq!(layer.fill_style(), "rgb(255,140,0)");
    }

    #[test]
    fn pick_returns_closest_point_with_deterministic_ties() {
        let vp = Viewport::default();
        let (w, h) = (800.0, 600.0);
        let ds = dataset(
            &["name", "categories", "lat", "lng"],
            vec![
                vec![json!("Center"), json!("Cafe"), json!(vp.latitude), json!(vp.longitude)],
                vec![json!("Twin"), json!("Cafe"), json!(vp.latitude), json!(vp.longitude)],
            ],
        );
        let set = LayerSet::build(Some(&ds));
        let hit = set.pick(&vp, w, h, w * 0.5, h * 0.5).unwrap();
        assert_eq!(hit, PickedPoint { layer: 0, row: 0 });
        assert_eq!(set.click_message(hit).unwrap(), "Restaurant: Center\nCategory: Cafe");
        // Far away from any point, nothing is picked.
        assert_eq!(set.pick(&vp, w, h, 20.0, 20.0), None);
    }

    #[test]
    fn layer_cache_is_stable_for_the_same_dataset_reference() {
        let ds = riyadh_pois();
        let mut cache = LayerCache::default();
        let a = cache.layers_for(Some(&ds));
        let b = cache.layers_for(Some(&ds));
        assert!(Rc::ptr_eq(&a, &b));

        // An equal-by-value clone is still a different load.
        let replacement = Rc::new((*ds).clone());
        let c = cache.layers_for(Some(&replacement));
        assert!(!Rc::ptr_eq(&a, &c));

        let empty = cache.layers_for(None);
        assert!(empty.layers.is_empty());
    }
}
