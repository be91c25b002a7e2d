use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct CameraControlsProps {
    pub on_zoom_in: Callback<()>,
    pub on_zoom_out: Callback<()>,
    pub on_rotate_left: Callback<()>,
    pub on_rotate_right: Callback<()>,
    pub on_tilt_up: Callback<()>,
    pub on_tilt_down: Callback<()>,
    pub on_reset: Callback<()>,
}

#[function_component(CameraControls)]
pub fn camera_controls(props: &CameraControlsProps) -> Html {
    let zi = {
        let cb = props.on_zoom_in.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let zo = {
        let cb = props.on_zoom_out.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let rl = {
        let cb = props.on_rotate_left.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let rr = {
        let cb = props.on_rotate_right.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let tu = {
        let cb = props.on_tilt_up.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let td = {
        let cb = props.on_tilt_down.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let rs = {
        let cb = props.on_reset.clone();
        Callback::from(move |_| cb.emit(()))
    };
    html! {<div style="position:absolute; left:12px; bottom:12px; background:rgba(22,27,34,0.9); color:#fff; border:1px solid #30363d; border-radius:8px; padding:8px; display:flex; gap:6px; align-items:center;">
        <button onclick={zo}> {"-"} </button>
        <button onclick={zi}> {"+"} </button>
        <span style="width:8px;"></span>
        <button onclick={rl} title="Rotate left"> {"⟲"} </button>
        <button onclick={rr} title="Rotate right"> {"⟳"} </button>
        <button onclick={tu} title="Tilt up"> {"▲"} </button>
        <button onclick={td} title="Tilt down"> {"▼"} </button>
        <span style="width:8px;"></span>
        <button onclick={rs}> {"Reset view"} </button>
    </div>}
}
