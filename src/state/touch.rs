// Touch gesture bookkeeping for the map canvas: one finger pans, two pinch.
#[derive(Default, Debug, Clone)]
pub struct TouchState {
    pub single_active: bool,
    pub pinch: bool,
    pub start_dist: f64,
    pub start_zoom: f64,
    pub anchor_lng: f64,
    pub anchor_lat: f64,
    pub last_x: f64,
    pub last_y: f64,
}
