use crate::geo;

const MAX_PITCH: f64 = 60.0;

/// Interactive map view state. Local to the canvas, never persisted, and
/// independent of the shared dashboard state.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    /// Degrees; the flat renderer applies pitch as vertical foreshortening.
    pub pitch: f64,
    /// Degrees clockwise from north.
    pub bearing: f64,
    pub panning: bool,
    pub last_x: f64,
    pub last_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        // Initial view over Riyadh.
        Self {
            longitude: 46.6753,
            latitude: 24.7136,
            zoom: 11.0,
            pitch: 0.0,
            bearing: 0.0,
            panning: false,
            last_x: 0.0,
            last_y: 0.0,
        }
    }
}

fn rotate(x: f64, y: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

impl Viewport {
    /// World size in pixels at the current zoom.
    pub fn scale(&self) -> f64 {
        geo::TILE_SIZE * self.zoom.exp2()
    }

    fn pitch_cos(&self) -> f64 {
        self.pitch.to_radians().cos()
    }

    /// Geographic position to canvas pixel, honoring bearing and pitch.
    pub fn to_screen(&self, lng: f64, lat: f64, width: f64, height: f64) -> (f64, f64) {
        let (wx, wy) = geo::project(lng, lat);
        let (cx, cy) = geo::project(self.longitude, self.latitude);
        let s = self.scale();
        let (rx, ry) = rotate((wx - cx) * s, (wy - cy) * s, -self.bearing.to_radians());
        (width * 0.5 + rx, height * 0.5 + ry * self.pitch_cos())
    }

    /// Canvas pixel back to `(lng, lat)`.
    pub fn from_screen(&self, x: f64, y: f64, width: f64, height: f64) -> (f64, f64) {
        let s = self.scale();
        let rx = x - width * 0.5;
        let ry = (y - height * 0.5) / self.pitch_cos();
        let (dx, dy) = rotate(rx, ry, self.bearing.to_radians());
        let (cx, cy) = geo::project(self.longitude, self.latitude);
        geo::unproject(cx + dx / s, cy + dy / s)
    }

    /// Drags the map content by a screen-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let s = self.scale();
        let (wx, wy) = rotate(dx, dy / self.pitch_cos(), self.bearing.to_radians());
        let (cx, cy) = geo::project(self.longitude, self.latitude);
        let (lng, lat) = geo::unproject(cx - wx / s, cy - wy / s);
        self.longitude = geo::wrap_longitude(lng);
        self.latitude = geo::clamp_latitude(lat);
    }

    /// Moves the center so that `(lng, lat)` projects to `(sx, sy)`.
    pub fn set_anchor(&mut self, lng: f64, lat: f64, sx: f64, sy: f64, width: f64, height: f64) {
        let s = self.scale();
        let rx = sx - width * 0.5;
        let ry = (sy - height * 0.5) / self.pitch_cos();
        let (dx, dy) = rotate(rx, ry, self.bearing.to_radians());
        let (wx, wy) = geo::project(lng, lat);
        let (new_lng, new_lat) = geo::unproject(wx - dx / s, wy - dy / s);
        self.longitude = geo::wrap_longitude(new_lng);
        self.latitude = geo::clamp_latitude(new_lat);
    }

    /// Zooms to `target`, keeping the geographic point under the anchor
    /// pixel fixed.
    pub fn set_zoom_anchored(&mut self, target: f64, ax: f64, ay: f64, width: f64, height: f64) {
        let (lng, lat) = self.from_screen(ax, ay, width, height);
        self.zoom = target.clamp(geo::MIN_ZOOM, geo::MAX_ZOOM);
        self.set_anchor(lng, lat, ax, ay, width, height);
    }

    /// Multiplies the map scale by `factor`, anchored at the given pixel.
    pub fn zoom_by(&mut self, factor: f64, ax: f64, ay: f64, width: f64, height: f64) {
        self.set_zoom_anchored(self.zoom + factor.log2(), ax, ay, width, height);
    }

    pub fn rotate_by(&mut self, delta_deg: f64) {
        let mut b = (self.bearing + delta_deg) % 360.0;
        if b >= 180.0 {
            b -= 360.0;
        }
        if b < -180.0 {
            b += 360.0;
        }
        self.bearing = b;
    }

    pub fn tilt_by(&mut self, delta_deg: f64) {
        self.pitch = (self.pitch + delta_deg).clamp(0.0, MAX_PITCH);
    }

    /// Back to the initial view.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 800.0;
    const H: f64 = 600.0;

    #[test]
    fn center_maps_to_canvas_center() {
        let vp = Viewport::default();
        let (x, y) = vp.to_screen(vp.longitude, vp.latitude, W, H);
        assert!((x - W * 0.5).abs() < 1e-9);
        assert!((y - H * 0.5).abs() < 1e-9);
    }

    #[test]
    fn screen_round_trip_with_bearing_and_pitch() {
        let mut vp = Viewport::default();
        vp.rotate_by(35.0);
        vp.tilt_by(30.0);
        let (sx, sy) = vp.to_screen(46.70, 24.70, W, H);
        let (lng, lat) = vp.from_screen(sx, sy, W, H);
        assert!((lng - 46.70).abs() < 1e-9);
        assert!((lat - 24.70).abs() < 1e-9);
    }

    #[test]
    fn pan_moves_center_against_the_drag() {
        let mut vp = Viewport::default();
        let before = vp.longitude;
        // Dragging content to the right brings territory west of the
        // center into view.
        vp.pan_by(100.0, 0.0);
        assert!(vp.longitude < before);
        assert!((vp.latitude - 24.7136).abs() < 1e-9);
    }

    #[test]
    fn anchored_zoom_keeps_cursor_position_fixed() {
        let mut vp = Viewport::default();
        let (ax, ay) = (620.0, 140.0);
        let (lng, lat) = vp.from_screen(ax, ay, W, H);
        vp.zoom_by(2.0, ax, ay, W, H);
        assert!((vp.zoom - 12.0).abs() < 1e-9);
        let (sx, sy) = vp.to_screen(lng, lat, W, H);
        assert!((sx - ax).abs() < 1e-6);
        assert!((sy - ay).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::default();
        vp.set_zoom_anchored(99.0, W * 0.5, H * 0.5, W, H);
        assert_eq!(vp.zoom, geo::MAX_ZOOM);
        vp.set_zoom_anchored(-4.0, W * 0.5, H * 0.5, W, H);
        assert_eq!(vp.zoom, geo::MIN_ZOOM);
    }

    #[test]
    fn tilt_and_bearing_stay_in_range() {
        let mut vp = Viewport::default();
        vp.tilt_by(500.0);
        assert_eq!(vp.pitch, 60.0);
        vp.tilt_by(-500.0);
        assert_eq!(vp.pitch, 0.0);
        vp.rotate_by(270.0);
        assert!(vp.bearing >= -180.0 && vp.bearing < 180.0);
    }

    #[test]
    fn reset_restores_initial_view() {
        let mut vp = Viewport::default();
        vp.pan_by(250.0, -80.0);
        vp.zoom_by(4.0, 10.0, 10.0, W, H);
        vp.rotate_by(90.0);
        vp.reset();
        assert!((vp.longitude - 46.6753).abs() < 1e-12);
        assert!((vp.latitude - 24.7136).abs() < 1e-12);
        assert_eq!(vp.zoom, 11.0);
        assert_eq!(vp.bearing, 0.0);
    }
}
