mod basemap;
mod components;
mod geo;
mod layers;
mod loader;
mod model;
mod state;
mod util;

use components::app::App;

fn main() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
