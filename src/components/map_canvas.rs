use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, TouchEvent};
use yew::prelude::*;

use super::camera_controls::CameraControls;
use crate::basemap::{self, TileCache};
use crate::geo;
use crate::layers::{LayerCache, LayerSet, PickedPoint};
use crate::model::{Dataset, Theme};
use crate::state::{TouchState, Viewport};
use crate::util::clog;

const WHEEL_ZOOM_RATE: f64 = 0.002;
const CLICK_TOLERANCE_PX: f64 = 4.0;
const ZOOM_STEP: f64 = 2.0;
const ROTATE_STEP_DEG: f64 = 15.0;
const TILT_STEP_DEG: f64 = 10.0;

#[derive(Properties, PartialEq, Clone)]
pub struct MapCanvasProps {
    pub theme: Theme,
    pub dataset: Option<Rc<Dataset>>,
}

#[derive(Clone, PartialEq)]
struct HoverInfo {
    text: String,
    x: f64,
    y: f64,
}

fn draw_tiles(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    width: f64,
    height: f64,
    cache: &mut TileCache,
    redraw: &Rc<dyn Fn()>,
) {
    let z = basemap::tile_level(vp.zoom);
    let (x0, x1, y0, y1) = basemap::visible_tile_range(vp, width, height, z);
    let s = vp.scale();
    let tile_px = s / (1u32 << z) as f64;

    // Same transform chain as Viewport::to_screen: center, foreshorten,
    // rotate, then world offset.
    ctx.save();
    let _ = ctx.translate(width * 0.5, height * 0.5);
    let _ = ctx.scale(1.0, vp.pitch.to_radians().cos());
    let _ = ctx.rotate(-vp.bearing.to_radians());
    let (cx, cy) = geo::project(vp.longitude, vp.latitude);
    let _ = ctx.translate(-cx * s, -cy * s);
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            if let Some(img) = cache.tile(z, tx, ty, redraw) {
                let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    &img,
                    tx as f64 * tile_px,
                    ty as f64 * tile_px,
                    tile_px,
                    tile_px,
                );
            }
        }
    }
    ctx.restore();
}

fn draw_points(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    width: f64,
    height: f64,
    layers: &LayerSet,
) {
    for layer in &layers.layers {
        ctx.set_fill_style_str(&layer.fill_style());
        for row in 0..layer.len() {
            let Some((lng, lat)) = layer.position(row) else {
                continue;
            };
            let (sx, sy) = vp.to_screen(lng, lat, width, height);
            if sx < -10.0 || sy < -10.0 || sx > width + 10.0 || sy > height + 10.0 {
                continue;
            }
            let r = layer.radius_px(lat, vp.zoom);
            ctx.begin_path();
            ctx.arc(sx, sy, r, 0.0, std::f64::consts::PI * 2.0).ok();
            ctx.fill();
        }
    }
}

#[function_component(MapCanvas)]
pub fn map_canvas(props: &MapCanvasProps) -> Html {
    let canvas_ref = use_node_ref();
    let viewport = use_mut_ref(Viewport::default);
    let layer_cache = use_mut_ref(LayerCache::default);
    let layers = use_mut_ref(|| Rc::new(LayerSet::default()));
    let tile_cache = use_mut_ref(|| TileCache::new(basemap::style_for(Theme::default())));
    let draw_ref = use_mut_ref(|| None::<Rc<dyn Fn()>>);
    let touch_state = use_mut_ref(TouchState::default);
    let rotating = use_mut_ref(|| false);
    let press_at = use_mut_ref(|| None::<(f64, f64)>);
    let hover = use_state_eq(|| None::<HoverInfo>);
    let hover_pick = use_mut_ref(|| None::<PickedPoint>);

    // Rebuild layers only when the dataset reference changes.
    {
        let layer_cache = layer_cache.clone();
        let layers = layers.clone();
        let draw_ref = draw_ref.clone();
        let hover = hover.clone();
        let hover_pick = hover_pick.clone();
        use_effect_with(props.dataset.clone(), move |dataset| {
            let set = layer_cache.borrow_mut().layers_for(dataset.as_ref());
            clog(&format!("layers rebuilt: {} points", set.point_count()));
            for layer in &set.layers {
                if !layer.has_position_fields() {
                    clog(&format!("layer {} has no lat/lng columns", layer.id));
                }
            }
            *layers.borrow_mut() = set;
            *hover_pick.borrow_mut() = None;
            hover.set(None);
            if let Some(f) = &*draw_ref.borrow() {
                f();
            }
            || ()
        });
    }

    // Swap basemap style on theme change; the cache drops its tiles.
    {
        let tile_cache = tile_cache.clone();
        let draw_ref = draw_ref.clone();
        use_effect_with(props.theme, move |theme| {
            tile_cache.borrow_mut().set_style(basemap::style_for(*theme));
            if let Some(f) = &*draw_ref.borrow() {
                f();
            }
            || ()
        });
    }

    {
        let canvas_ref = canvas_ref.clone();
        let viewport = viewport.clone();
        let layers = layers.clone();
        let tile_cache = tile_cache.clone();
        let draw_ref_setup = draw_ref.clone();
        let touch_state = touch_state.clone();
        let rotating = rotating.clone();
        let press_at = press_at.clone();
        let hover = hover.clone();
        let hover_pick = hover_pick.clone();

        use_effect_with((), move |_| {
            let window = web_sys::window().expect("no global `window` exists");
            let canvas: HtmlCanvasElement = canvas_ref
                .cast::<HtmlCanvasElement>()
                .expect("canvas_ref not attached to a canvas element");

            let compute_and_apply_canvas_size = {
                let canvas = canvas.clone();
                move || {
                    let (w, h) = canvas
                        .parent_element()
                        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
                        .map(|el| (el.client_width() as f64, el.client_height() as f64))
                        .unwrap_or((800.0, 600.0));
                    canvas.set_width(w.max(0.0) as u32);
                    canvas.set_height(h.max(0.0) as u32);
                }
            };
            compute_and_apply_canvas_size();

            let draw_closure: Rc<dyn Fn()> = {
                let canvas = canvas.clone();
                let viewport = viewport.clone();
                let layers = layers.clone();
                let tile_cache = tile_cache.clone();
                let draw_ref = draw_ref_setup.clone();
                Rc::new(move || {
                    if !canvas.is_connected() {
                        return;
                    }
                    let ctx = match canvas.get_context("2d").ok().flatten() {
                        Some(c) => match c.dyn_into::<CanvasRenderingContext2d>() {
                            Ok(c) => c,
                            Err(_) => return,
                        },
                        None => return,
                    };
                    let w = canvas.width() as f64;
                    let h = canvas.height() as f64;
                    let vp = viewport.borrow().clone();

                    // Handle for tiles that finish decoding after this frame.
                    let redraw: Rc<dyn Fn()> = {
                        let draw_ref = draw_ref.clone();
                        Rc::new(move || {
                            if let Some(f) = &*draw_ref.borrow() {
                                f();
                            }
                        })
                    };

                    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).ok();
                    ctx.set_fill_style_str(tile_cache.borrow().style().background);
                    ctx.fill_rect(0.0, 0.0, w, h);
                    draw_tiles(&ctx, &vp, w, h, &mut tile_cache.borrow_mut(), &redraw);
                    draw_points(&ctx, &vp, w, h, &layers.borrow());
                })
            };
            *draw_ref_setup.borrow_mut() = Some(draw_closure.clone());
            (draw_closure)();

            // Wheel: zoom anchored at the cursor.
            let wheel_cb = {
                let canvas = canvas.clone();
                let viewport = viewport.clone();
                let draw_ref = draw_ref_setup.clone();
                let hover = hover.clone();
                let hover_pick = hover_pick.clone();
                Closure::wrap(Box::new(move |e: web_sys::WheelEvent| {
                    e.prevent_default();
                    let w = canvas.width() as f64;
                    let h = canvas.height() as f64;
                    let factor = (-e.delta_y() * WHEEL_ZOOM_RATE).exp2();
                    viewport.borrow_mut().zoom_by(
                        factor,
                        e.offset_x() as f64,
                        e.offset_y() as f64,
                        w,
                        h,
                    );
                    *hover_pick.borrow_mut() = None;
                    hover.set(None);
                    if let Some(f) = &*draw_ref.borrow() {
                        f();
                    }
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("wheel", wheel_cb.as_ref().unchecked_ref())
                .unwrap();

            // Mouse down: left starts a pan (and a potential click), right
            // starts a bearing/pitch drag.
            let mousedown_cb = {
                let viewport = viewport.clone();
                let rotating = rotating.clone();
                let press_at = press_at.clone();
                let hover = hover.clone();
                let hover_pick = hover_pick.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    let mut vp = viewport.borrow_mut();
                    vp.last_x = e.client_x() as f64;
                    vp.last_y = e.client_y() as f64;
                    if e.button() == 0 {
                        vp.panning = true;
                        *press_at.borrow_mut() = Some((e.client_x() as f64, e.client_y() as f64));
                    } else if e.button() == 2 {
                        *rotating.borrow_mut() = true;
                    }
                    drop(vp);
                    *hover_pick.borrow_mut() = None;
                    hover.set(None);
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("mousedown", mousedown_cb.as_ref().unchecked_ref())
                .unwrap();

            // Mouse move: pan / rotate while dragging, otherwise hover pick.
            let mousemove_cb = {
                let canvas = canvas.clone();
                let viewport = viewport.clone();
                let layers = layers.clone();
                let rotating = rotating.clone();
                let draw_ref = draw_ref_setup.clone();
                let hover = hover.clone();
                let hover_pick = hover_pick.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    let w = canvas.width() as f64;
                    let h = canvas.height() as f64;
                    let mut vp = viewport.borrow_mut();
                    let dx = e.client_x() as f64 - vp.last_x;
                    let dy = e.client_y() as f64 - vp.last_y;
                    if vp.panning {
                        vp.last_x = e.client_x() as f64;
                        vp.last_y = e.client_y() as f64;
                        vp.pan_by(dx, dy);
                        drop(vp);
                        if let Some(f) = &*draw_ref.borrow() {
                            f();
                        }
                        return;
                    }
                    if *rotating.borrow() {
                        vp.last_x = e.client_x() as f64;
                        vp.last_y = e.client_y() as f64;
                        vp.rotate_by(dx * 0.3);
                        vp.tilt_by(-dy * 0.25);
                        drop(vp);
                        if let Some(f) = &*draw_ref.borrow() {
                            f();
                        }
                        return;
                    }
                    // Hover pick; tooltip anchors at the point itself.
                    let vp = vp.clone();
                    let set = layers.borrow().clone();
                    let pick = set.pick(&vp, w, h, e.offset_x() as f64, e.offset_y() as f64);
                    if pick != *hover_pick.borrow() {
                        *hover_pick.borrow_mut() = pick;
                        let info = pick.and_then(|p| {
                            let text = set.tooltip(Some(p))?;
                            let layer = set.layers.get(p.layer)?;
                            let (lng, lat) = layer.position(p.row)?;
                            let (sx, sy) = vp.to_screen(lng, lat, w, h);
                            Some(HoverInfo {
                                text,
                                x: sx,
                                y: sy,
                            })
                        });
                        hover.set(info);
                    }
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("mousemove", mousemove_cb.as_ref().unchecked_ref())
                .unwrap();

            // Mouse up anywhere ends the drag; a short left drag is a click.
            let mouseup_cb = {
                let canvas = canvas.clone();
                let window_up = window.clone();
                let viewport = viewport.clone();
                let layers = layers.clone();
                let rotating = rotating.clone();
                let press_at = press_at.clone();
                Closure::wrap(Box::new(move |e: web_sys::MouseEvent| {
                    let mut vp = viewport.borrow_mut();
                    let was_panning = vp.panning;
                    vp.panning = false;
                    *rotating.borrow_mut() = false;
                    let vp = vp.clone();
                    let pressed = press_at.borrow_mut().take();
                    if !was_panning {
                        return;
                    }
                    let Some((px, py)) = pressed else { return };
                    let moved = ((e.client_x() as f64 - px).powi(2)
                        + (e.client_y() as f64 - py).powi(2))
                    .sqrt();
                    if moved > CLICK_TOLERANCE_PX {
                        return;
                    }
                    let rect = canvas.get_bounding_client_rect();
                    let x = e.client_x() as f64 - rect.left();
                    let y = e.client_y() as f64 - rect.top();
                    let w = canvas.width() as f64;
                    let h = canvas.height() as f64;
                    let set = layers.borrow().clone();
                    if let Some(pick) = set.pick(&vp, w, h, x, y) {
                        if let Some(msg) = set.click_message(pick) {
                            clog(&format!("picked row {}", pick.row));
                            let _ = window_up.alert_with_message(&msg);
                        }
                    }
                }) as Box<dyn FnMut(_)>)
            };
            window
                .add_event_listener_with_callback("mouseup", mouseup_cb.as_ref().unchecked_ref())
                .unwrap();

            // Right-drag rotates, so keep the context menu away.
            let contextmenu_cb = {
                Closure::wrap(Box::new(move |e: web_sys::Event| {
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback(
                    "contextmenu",
                    contextmenu_cb.as_ref().unchecked_ref(),
                )
                .unwrap();

            // Resize
            let resize_cb = {
                let compute_and_apply_canvas_size = compute_and_apply_canvas_size.clone();
                let draw_ref = draw_ref_setup.clone();
                Closure::wrap(Box::new(move |_e: web_sys::Event| {
                    compute_and_apply_canvas_size();
                    if let Some(f) = &*draw_ref.borrow() {
                        f();
                    }
                }) as Box<dyn FnMut(_)>)
            };
            window
                .add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref())
                .unwrap();

            // Touch: one finger pans, two pinch-zoom around the midpoint.
            let touch_start_cb = {
                let canvas_tc = canvas.clone();
                let viewport_tc = viewport.clone();
                let touch_state_tc = touch_state.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    let rect = canvas_tc.get_bounding_client_rect();
                    let w = canvas_tc.width() as f64;
                    let h = canvas_tc.height() as f64;
                    let touches = e.touches();
                    if touches.length() == 1 {
                        if let Some(t0) = touches.item(0) {
                            let mut ts = touch_state_tc.borrow_mut();
                            ts.single_active = true;
                            ts.pinch = false;
                            ts.last_x = t0.client_x() as f64 - rect.left();
                            ts.last_y = t0.client_y() as f64 - rect.top();
                        }
                    } else if touches.length() >= 2 {
                        if let (Some(t0), Some(t1)) = (touches.item(0), touches.item(1)) {
                            let x0 = t0.client_x() as f64 - rect.left();
                            let y0 = t0.client_y() as f64 - rect.top();
                            let x1 = t1.client_x() as f64 - rect.left();
                            let y1 = t1.client_y() as f64 - rect.top();
                            let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt().max(1.0);
                            let midx = (x0 + x1) * 0.5;
                            let midy = (y0 + y1) * 0.5;
                            let vp = viewport_tc.borrow();
                            let (lng, lat) = vp.from_screen(midx, midy, w, h);
                            let mut ts = touch_state_tc.borrow_mut();
                            ts.pinch = true;
                            ts.single_active = false;
                            ts.start_dist = dist;
                            ts.start_zoom = vp.zoom;
                            ts.anchor_lng = lng;
                            ts.anchor_lat = lat;
                        }
                    }
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback(
                    "touchstart",
                    touch_start_cb.as_ref().unchecked_ref(),
                )
                .ok();

            let touch_move_cb = {
                let canvas_tc = canvas.clone();
                let viewport_tc = viewport.clone();
                let touch_state_tc = touch_state.clone();
                let draw_ref = draw_ref_setup.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    let rect = canvas_tc.get_bounding_client_rect();
                    let w = canvas_tc.width() as f64;
                    let h = canvas_tc.height() as f64;
                    let touches = e.touches();
                    if touches.length() == 1 {
                        if let Some(t0) = touches.item(0) {
                            let cx = t0.client_x() as f64 - rect.left();
                            let cy = t0.client_y() as f64 - rect.top();
                            let mut ts = touch_state_tc.borrow_mut();
                            if ts.single_active {
                                let dx = cx - ts.last_x;
                                let dy = cy - ts.last_y;
                                ts.last_x = cx;
                                ts.last_y = cy;
                                drop(ts);
                                viewport_tc.borrow_mut().pan_by(dx, dy);
                            }
                        }
                    } else if touches.length() >= 2 {
                        if let (Some(t0), Some(t1)) = (touches.item(0), touches.item(1)) {
                            let x0 = t0.client_x() as f64 - rect.left();
                            let y0 = t0.client_y() as f64 - rect.top();
                            let x1 = t1.client_x() as f64 - rect.left();
                            let y1 = t1.client_y() as f64 - rect.top();
                            let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt().max(1.0);
                            let midx = (x0 + x1) * 0.5;
                            let midy = (y0 + y1) * 0.5;
                            let ts = touch_state_tc.borrow().clone();
                            if ts.pinch {
                                let mut vp = viewport_tc.borrow_mut();
                                vp.zoom = (ts.start_zoom + (dist / ts.start_dist).log2())
                                    .clamp(geo::MIN_ZOOM, geo::MAX_ZOOM);
                                vp.set_anchor(ts.anchor_lng, ts.anchor_lat, midx, midy, w, h);
                            }
                        }
                    }
                    if let Some(f) = &*draw_ref.borrow() {
                        f();
                    }
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback(
                    "touchmove",
                    touch_move_cb.as_ref().unchecked_ref(),
                )
                .ok();

            let touch_end_cb = {
                let touch_state_tc = touch_state.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    let left = e.touches().length();
                    let mut ts = touch_state_tc.borrow_mut();
                    if left == 0 {
                        ts.single_active = false;
                        ts.pinch = false;
                    } else if left == 1 {
                        ts.pinch = false;
                        ts.single_active = false;
                    }
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            canvas
                .add_event_listener_with_callback("touchend", touch_end_cb.as_ref().unchecked_ref())
                .ok();
            canvas
                .add_event_listener_with_callback(
                    "touchcancel",
                    touch_end_cb.as_ref().unchecked_ref(),
                )
                .ok();

            let window_clone = window.clone();
            move || {
                let _ = canvas
                    .remove_event_listener_with_callback("wheel", wheel_cb.as_ref().unchecked_ref());
                let _ = canvas.remove_event_listener_with_callback(
                    "mousedown",
                    mousedown_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "mousemove",
                    mousemove_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "contextmenu",
                    contextmenu_cb.as_ref().unchecked_ref(),
                );
                let _ = window_clone.remove_event_listener_with_callback(
                    "mouseup",
                    mouseup_cb.as_ref().unchecked_ref(),
                );
                let _ = window_clone.remove_event_listener_with_callback(
                    "resize",
                    resize_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchstart",
                    touch_start_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchmove",
                    touch_move_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchend",
                    touch_end_cb.as_ref().unchecked_ref(),
                );
                let _ = canvas.remove_event_listener_with_callback(
                    "touchcancel",
                    touch_end_cb.as_ref().unchecked_ref(),
                );
                *draw_ref_setup.borrow_mut() = None;
            }
        });
    }

    // Camera button callbacks share one redraw-after-update pattern.
    let with_viewport = |apply: Rc<dyn Fn(&mut Viewport, f64, f64)>| {
        let viewport = viewport.clone();
        let canvas_ref = canvas_ref.clone();
        let draw_ref = draw_ref.clone();
        Callback::from(move |_| {
            if let Some(canvas) = canvas_ref.cast::<HtmlCanvasElement>() {
                let w = canvas.width() as f64;
                let h = canvas.height() as f64;
                apply(&mut viewport.borrow_mut(), w, h);
            }
            if let Some(f) = &*draw_ref.borrow() {
                f();
            }
        })
    };
    let zoom_in = with_viewport(Rc::new(|vp, w, h| vp.zoom_by(ZOOM_STEP, w * 0.5, h * 0.5, w, h)));
    let zoom_out = with_viewport(Rc::new(|vp, w, h| {
        vp.zoom_by(1.0 / ZOOM_STEP, w * 0.5, h * 0.5, w, h)
    }));
    let rotate_left = with_viewport(Rc::new(|vp, _, _| vp.rotate_by(-ROTATE_STEP_DEG)));
    let rotate_right = with_viewport(Rc::new(|vp, _, _| vp.rotate_by(ROTATE_STEP_DEG)));
    let tilt_up = with_viewport(Rc::new(|vp, _, _| vp.tilt_by(TILT_STEP_DEG)));
    let tilt_down = with_viewport(Rc::new(|vp, _, _| vp.tilt_by(-TILT_STEP_DEG)));
    let reset_view = with_viewport(Rc::new(|vp, _, _| vp.reset()));

    let attribution = basemap::style_for(props.theme).attribution;

    html! {
        <div style="flex:1; position:relative; overflow:hidden;">
            <canvas ref={canvas_ref.clone()} id="map-canvas" style="display:block; width:100%; height:100%;"></canvas>
            <CameraControls
                on_zoom_in={zoom_in}
                on_zoom_out={zoom_out}
                on_rotate_left={rotate_left}
                on_rotate_right={rotate_right}
                on_tilt_up={tilt_up}
                on_tilt_down={tilt_down}
                on_reset={reset_view}
            />
            { if let Some(info) = &*hover {
                html!{ <div style={format!("position:absolute; left:{}px; top:{}px; background:rgba(22,27,34,0.9); color:#fff; padding:3px 8px; border-radius:4px; font-size:12px; pointer-events:none; white-space:nowrap;", info.x + 10.0, info.y - 26.0)}>
                    { info.text.clone() }
                </div> }
            } else { html!{} } }
            <div style="position:absolute; right:4px; bottom:2px; font-size:10px; opacity:0.7; background:rgba(255,255,255,0.6); color:#333; padding:0 4px;">
                { attribution }
            </div>
        </div>
    }
}
