use yew::prelude::*;

// Static category overview; not derived from the loaded dataset.
const OVERVIEW: [(&str, u32); 4] = [
    ("Fast Food", 12),
    ("Cafe", 8),
    ("Arabic", 20),
    ("Indian", 5),
];
const BAR_COLOR: &str = "rgb(66,135,245)";

#[derive(Properties, PartialEq, Clone)]
pub struct OverviewChartProps {
    pub fg: &'static str,
}

#[function_component(OverviewChart)]
pub fn overview_chart(props: &OverviewChartProps) -> Html {
    let (width, height) = (300.0, 200.0);
    let (margin_x, margin_top, margin_bottom) = (10.0, 10.0, 26.0);
    let plot_h = height - margin_top - margin_bottom;
    let max = OVERVIEW.iter().map(|(_, v)| *v).max().unwrap_or(1) as f64;
    let slot = (width - 2.0 * margin_x) / OVERVIEW.len() as f64;
    let bar_w = slot * 0.6;

    let bars = OVERVIEW.iter().enumerate().map(|(i, (label, value))| {
        let bar_h = plot_h * (*value as f64) / max;
        let x = margin_x + i as f64 * slot + (slot - bar_w) * 0.5;
        let y = margin_top + plot_h - bar_h;
        html! {
            <>
                <rect x={x.to_string()} y={y.to_string()}
                    width={bar_w.to_string()} height={bar_h.to_string()}
                    fill={BAR_COLOR} rx="2" />
                <text x={(x + bar_w * 0.5).to_string()} y={(height - 10.0).to_string()}
                    text-anchor="middle" font-size="10" fill={props.fg}>{ *label }</text>
                <text x={(x + bar_w * 0.5).to_string()} y={(y - 4.0).to_string()}
                    text-anchor="middle" font-size="10" fill={props.fg}>{ value.to_string() }</text>
            </>
        }
    });

    html! {
        <svg width={width.to_string()} height={height.to_string()}
            role="img" aria-label="Restaurants per category">
            { for bars }
        </svg>
    }
}
