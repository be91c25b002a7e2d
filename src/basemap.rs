//! Basemap styles and the raster tile cache behind the canvas renderer.

use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::HtmlImageElement;

use crate::geo;
use crate::model::Theme;
use crate::state::Viewport;

const MAX_TILE_LEVEL: u8 = 19;

pub struct BasemapStyle {
    pub id: &'static str,
    /// Raster tile template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: &'static str,
    /// Fill shown beneath tiles that have not arrived yet.
    pub background: &'static str,
    pub attribution: &'static str,
}

pub const LIGHT: BasemapStyle = BasemapStyle {
    id: "positron",
    tile_url: "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
    background: "#fafaf8",
    attribution: "© OpenStreetMap contributors © CARTO",
};

pub const DARK: BasemapStyle = BasemapStyle {
    id: "dark-matter",
    tile_url: "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
    background: "#0e1116",
    attribution: "© OpenStreetMap contributors © CARTO",
};

/// Exactly two supported styles; anything that is not dark renders light.
pub fn style_for(theme: Theme) -> &'static BasemapStyle {
    match theme {
        Theme::Dark => &DARK,
        Theme::Light => &LIGHT,
    }
}

pub fn tile_url(style: &BasemapStyle, z: u8, x: u32, y: u32) -> String {
    style
        .tile_url
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

/// Integer tile level drawn for a fractional viewport zoom.
pub fn tile_level(zoom: f64) -> u8 {
    zoom.floor().clamp(0.0, MAX_TILE_LEVEL as f64) as u8
}

/// Inclusive `(x0, x1, y0, y1)` tile range covering the canvas, from the
/// world bounding box of its four corners (covers rotation and pitch).
pub fn visible_tile_range(
    viewport: &Viewport,
    width: f64,
    height: f64,
    z: u8,
) -> (u32, u32, u32, u32) {
    let n = (1u32 << z) as f64;
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for (sx, sy) in [(0.0, 0.0), (width, 0.0), (0.0, height), (width, height)] {
        let (lng, lat) = viewport.from_screen(sx, sy, width, height);
        let (wx, wy) = geo::project(lng, lat);
        min_x = min_x.min(wx);
        min_y = min_y.min(wy);
        max_x = max_x.max(wx);
        max_y = max_y.max(wy);
    }
    let last = (1u32 << z) - 1;
    let clamp = |v: f64| (v.floor().max(0.0) as u32).min(last);
    (
        clamp(min_x * n),
        clamp(max_x * n),
        clamp(min_y * n),
        clamp(max_y * n),
    )
}

/// Image cache keyed `(z, x, y)` for the active style. Tiles load
/// asynchronously; `redraw` runs when one lands so the canvas fills in.
pub struct TileCache {
    style: &'static BasemapStyle,
    tiles: HashMap<(u8, u32, u32), HtmlImageElement>,
}

impl TileCache {
    pub fn new(style: &'static BasemapStyle) -> Self {
        Self {
            style,
            tiles: HashMap::new(),
        }
    }

    pub fn style(&self) -> &'static BasemapStyle {
        self.style
    }

    /// Switching styles drops every cached tile.
    pub fn set_style(&mut self, style: &'static BasemapStyle) {
        if self.style.id != style.id {
            self.style = style;
            self.tiles.clear();
        }
    }

    /// Returns the tile once its image has decoded; otherwise starts the
    /// fetch and reports `None` for this frame.
    pub fn tile(&mut self, z: u8, x: u32, y: u32, redraw: &Rc<dyn Fn()>) -> Option<HtmlImageElement> {
        let key = (z, x, y);
        if let Some(img) = self.tiles.get(&key) {
            if img.complete() && img.natural_width() > 0 {
                return Some(img.clone());
            }
            return None;
        }
        let Ok(img) = HtmlImageElement::new() else {
            return None;
        };
        img.set_cross_origin(Some("anonymous"));
        let onload = {
            let redraw = redraw.clone();
            Closure::wrap(Box::new(move || redraw()) as Box<dyn FnMut()>)
        };
        img.set_onload(Some(onload.as_ref().unchecked_ref()));
        // One-shot per tile; the browser owns the image from here.
        onload.forget();
        img.set_src(&tile_url(self.style, z, x, y));
        self.tiles.insert(key, img);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_selects_exactly_two_styles() {
        assert_eq!(style_for(Theme::Light).id, "positron");
        assert_eq!(style_for(Theme::Dark).id, "dark-matter");
    }

    #[test]
    fn tile_url_fills_template() {
        assert_eq!(
            tile_url(&LIGHT, 11, 1289, 881),
            "https://basemaps.cartocdn.com/light_all/11/1289/881.png"
        );
    }

    #[test]
    fn tile_level_tracks_floor_of_zoom() {
        assert_eq!(tile_level(11.7), 11);
        assert_eq!(tile_level(0.4), 0);
        assert_eq!(tile_level(25.0), MAX_TILE_LEVEL);
    }

    #[test]
    fn visible_range_covers_the_view_center() {
        let vp = Viewport::default();
        let z = tile_level(vp.zoom);
        let (x0, x1, y0, y1) = visible_tile_range(&vp, 800.0, 600.0, z);
        let n = (1u32 << z) as f64;
        let (wx, wy) = geo::project(vp.longitude, vp.latitude);
        let cx = (wx * n).floor() as u32;
        let cy = (wy * n).floor() as u32;
        assert!(x0 <= cx && cx <= x1);
        assert!(y0 <= cy && cy <= y1);
        // A 800x600 canvas at integer-adjacent zoom needs only a handful of
        // tile columns and rows.
        assert!(x1 - x0 <= 6);
        assert!(y1 - y0 <= 6);
    }
}
