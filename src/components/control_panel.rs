use yew::prelude::*;

use super::overview_chart::OverviewChart;
use crate::model::Theme;

#[derive(Properties, PartialEq, Clone)]
pub struct ControlPanelProps {
    pub theme: Theme,
    pub is_loading: bool,
    pub record_count: Option<usize>,
    pub last_error: Option<String>,
    pub on_select_theme: Callback<Theme>,
    pub on_load: Callback<()>,
}

#[function_component(ControlPanel)]
pub fn control_panel(props: &ControlPanelProps) -> Html {
    let is_dark = props.theme.is_dark();
    let bg = if is_dark { "#333" } else { "#fafafa" };
    let fg = if is_dark { "#fff" } else { "#000" };
    let border = if is_dark { "#555" } else { "#ccc" };
    let section_bg = if is_dark {
        "rgba(255,255,255,0.05)"
    } else {
        "rgba(0,0,0,0.05)"
    };

    let theme_button = |theme: Theme, label: &'static str| {
        let active = props.theme == theme;
        let cb = {
            let select = props.on_select_theme.clone();
            Callback::from(move |_| select.emit(theme))
        };
        let style = format!(
            "flex:1; padding:8px; cursor:pointer; border:{}; background:{}; color:{}; border-radius:4px;",
            if active {
                "2px solid #007bff".to_string()
            } else {
                format!("1px solid {border}")
            },
            if is_dark { "#444" } else { "#fff" },
            if is_dark { "#fff" } else { "#333" },
        );
        html! { <button onclick={cb} style={style}>{ label }</button> }
    };

    let load_cb = {
        let cb = props.on_load.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let load_style = format!(
        "width:100%; margin-top:5px; padding:10px; background:#007bff; color:#fff; border:none; border-radius:4px; cursor:{}; opacity:{};",
        if props.is_loading { "not-allowed" } else { "pointer" },
        if props.is_loading { "0.7" } else { "1" },
    );

    html! {
        <div style={format!("width:350px; border-right:1px solid {border}; padding:20px; overflow-y:auto; background:{bg}; color:{fg}; display:flex; flex-direction:column; gap:20px;")}>
            <h2 style="margin:0;">{"Riyadh Dashboard"}</h2>

            <div style={format!("padding:15px; background:{section_bg}; border-radius:8px;")}>
                <h4 style="margin-top:0;">{"Controls"}</h4>

                <div style="margin-bottom:15px;">
                    <label style="margin-right:10px; font-weight:bold;">{"Theme:"}</label>
                    <div style="display:flex; gap:10px; margin-top:5px;">
                        { theme_button(Theme::Light, "Light") }
                        { theme_button(Theme::Dark, "Dark") }
                    </div>
                </div>

                <div>
                    <label style="margin-right:10px; font-weight:bold;">{"Data Source:"}</label>
                    <button onclick={load_cb} disabled={props.is_loading} style={load_style}>
                        { if props.is_loading { "Loading..." } else { "Load Restaurants from Backend" } }
                    </button>
                </div>

                { if let Some(count) = props.record_count {
                    html!{ <div style="margin-top:10px; font-size:0.9em; color:green;">{ format!("Loaded {count} records.") }</div> }
                } else { html!{} } }
                { if let Some(err) = &props.last_error {
                    html!{ <div style="margin-top:10px; font-size:0.9em; color:#f85149;">{ format!("Last load failed: {err}") }</div> }
                } else { html!{} } }
            </div>

            <div>
                <h4 style="margin-top:0;">{"Overview"}</h4>
                <OverviewChart fg={fg} />
            </div>
        </div>
    }
}
