//! Demo entry point
//!
//! Parses a dashboard document (a path argument, or the built-in sample),
//! executes its queries against a canned in-process client, and logs the
//! resolved render tree. Useful for eyeballing the whole pipeline without
//! a UI host.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use dash_core::{DateRangePreset, DateRangeValue, InputValue, ThemeBase};
use dash_runtime::{
    DashboardController, DashboardView, Placeholder, RenderNode, StructuralSanitizer,
};

mod demo;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let content = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => {
            info!("no document argument, using the built-in sample");
            demo::SAMPLE_DASHBOARD.to_string()
        }
    };

    let controller = DashboardController::new(Arc::new(demo::DemoClient::default()));
    if let Err(err) = controller.set_content(&content) {
        error!("{err}");
        std::process::exit(1);
    }
    controller.run_initial().await;
    show(&controller);

    // Narrow the date range to demonstrate partial re-execution
    let preset = DateRangePreset::Last30Days;
    let (start, end) = preset.resolve_today();
    let affected = controller
        .set_input(
            "period",
            InputValue::DateRange(DateRangeValue {
                preset,
                range: (start, end),
            }),
        )
        .await;
    if !affected.is_empty() {
        info!(?affected, "re-executed after date range change");
        show(&controller);
    }

    Ok(())
}

fn show(controller: &DashboardController) {
    match controller.render(&StructuralSanitizer, ThemeBase::Light) {
        DashboardView::Ready(dashboard) => {
            info!(
                title = dashboard.title.as_str(),
                inputs = dashboard.inputs.len(),
                "dashboard ready"
            );
            print_nodes(&dashboard.nodes, 0);
        }
        DashboardView::ParseFailed(err) => error!("{err}"),
        DashboardView::Unparsed => {}
    }
}

fn print_nodes(nodes: &[RenderNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            RenderNode::Html(html) => {
                info!("{indent}html ({} bytes)", html.len());
            }
            RenderNode::Grid { cols, children } => {
                info!("{indent}grid cols={cols}");
                print_nodes(children, depth + 1);
            }
            RenderNode::BigValue(payload) => {
                info!("{indent}big value: {} = {}", payload.label, payload.value);
            }
            RenderNode::AxisChart(payload) => {
                info!(
                    "{indent}{:?} chart: {} labels, {} datasets",
                    payload.kind,
                    payload.series.labels.len(),
                    payload.series.datasets.len()
                );
            }
            RenderNode::PieChart(payload) => {
                info!("{indent}pie: {} slices", payload.slices.len());
            }
            RenderNode::DataTable(payload) => {
                info!(
                    "{indent}table: {} columns × {} rows",
                    payload.columns.len(),
                    payload.total_rows
                );
            }
            RenderNode::Placeholder(placeholder) => match placeholder {
                Placeholder::MissingData { kind } => {
                    info!("{indent}placeholder: <{:?}> missing data attribute", kind);
                }
                Placeholder::UnknownQuery { query, .. } => {
                    info!("{indent}placeholder: unknown query \"{query}\"");
                }
                Placeholder::Loading { query } => info!("{indent}placeholder: loading {query}"),
                Placeholder::QueryFailed { query, message } => {
                    info!("{indent}placeholder: {query} failed: {message}");
                }
                Placeholder::Empty { query } => info!("{indent}placeholder: {query} empty"),
            },
        }
    }
}
