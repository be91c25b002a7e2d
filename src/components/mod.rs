pub mod app;
pub mod camera_controls;
pub mod control_panel;
pub mod map_canvas;
pub mod overview_chart;
