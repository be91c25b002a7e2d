use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use super::{control_panel::ControlPanel, map_canvas::MapCanvas};
use crate::loader::{self, DATASET_URL};
use crate::model::{DashboardAction, DashboardState, Theme};
use crate::util::clog;

const THEME_STORAGE_KEY: &str = "geo_dashboard_theme";

#[function_component(App)]
pub fn app() -> Html {
    let state = use_reducer(DashboardState::default);

    // Load the persisted theme once; unknown values fall back to light.
    {
        let state = state.clone();
        use_effect_with((), move |_| {
            if let Some(win) = web_sys::window() {
                if let Ok(Some(store)) = win.local_storage() {
                    if let Ok(Some(raw)) = store.get_item(THEME_STORAGE_KEY) {
                        state.dispatch(DashboardAction::SetTheme(Theme::from_storage(&raw)));
                    }
                }
            }
            || ()
        });
    }
    // Persist theme changes.
    {
        use_effect_with(state.theme, move |theme| {
            if let Some(win) = web_sys::window() {
                if let Ok(Some(store)) = win.local_storage() {
                    let _ = store.set_item(THEME_STORAGE_KEY, theme.as_str());
                }
            }
            || ()
        });
    }

    let on_select_theme = {
        let state = state.clone();
        Callback::from(move |theme: Theme| state.dispatch(DashboardAction::SetTheme(theme)))
    };

    let on_load = {
        let state = state.clone();
        Callback::from(move |_| {
            // The disabled button already blocks this path, but the flag is
            // the real gate: at most one load in flight.
            if state.is_loading {
                return;
            }
            state.dispatch(DashboardAction::LoadStarted);
            let state = state.clone();
            spawn_local(async move {
                match loader::fetch_dataset(DATASET_URL).await {
                    Ok(dataset) => {
                        clog(&format!("dataset loaded: {} records", dataset.len()));
                        state.dispatch(DashboardAction::LoadSucceeded(dataset));
                    }
                    Err(err) => {
                        clog(&format!("dataset load failed: {err}"));
                        if let Some(win) = web_sys::window() {
                            let _ = win.alert_with_message(&format!(
                                "Failed to load data from backend ({err}). Make sure the dataset service is running."
                            ));
                        }
                        state.dispatch(DashboardAction::LoadFailed(err.to_string()));
                    }
                }
            });
        })
    };

    html! {
        <div style="display:flex; height:100vh; overflow:hidden;">
            <ControlPanel
                theme={state.theme}
                is_loading={state.is_loading}
                record_count={state.record_count()}
                last_error={state.last_error.clone()}
                on_select_theme={on_select_theme}
                on_load={on_load}
            />
            <MapCanvas theme={state.theme} dataset={state.dataset.clone()} />
        </div>
    }
}
