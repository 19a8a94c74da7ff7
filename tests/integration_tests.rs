use float_cmp::approx_eq;
use gramexpress::data::DataSource;
use gramexpress::express::{ecdf, histogram, pie, scatter, timeline};
use gramexpress::palette::PLOTLY_COLORS;
use gramexpress::{CallArgs, ErrorCategory, Table};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::process::{Command, Stdio};

const FLOWERS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/flowers.csv");
const TASKS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/tasks.csv");

/// Helper function to run gramexpress with a DSL string and CSV on stdin
fn run_gramexpress(extra: &[&str], dsl: &str, csv_content: &str) -> Result<String, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_gramexpress"))
        .args(extra)
        .arg(dsl)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    // Write CSV to stdin
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(csv_content.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn flowers() -> Table {
    Table::from_csv(File::open(FLOWERS).unwrap()).unwrap()
}

fn y_values(trace: &Value) -> Vec<f64> {
    trace["y"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[test]
fn test_end_to_end_scatter_by_color() {
    let csv = fs::read_to_string(FLOWERS).expect("Failed to read test CSV");
    let result = run_gramexpress(
        &[],
        "df | scatter(x: sepal_length, y: sepal_width, color: species)",
        &csv,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let out: Value = serde_json::from_str(&result.unwrap()).unwrap();

    let data = out["plotly"]["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    let names: Vec<&str> = data.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["setosa", "versicolor", "virginica"]);
    assert_eq!(data[1]["marker"]["color"], json!(PLOTLY_COLORS[1]));
    assert_eq!(out["is_user_set_color"], json!(true));
    assert_eq!(out["mappings"][2]["trace_index"], json!(2));
    assert_eq!(out["mappings"][0]["columns"]["x"], json!("sepal_length"));
    assert_eq!(out["mappings"][0]["partition"]["species"], json!("setosa"));
}

#[test]
fn test_end_to_end_histogram_from_file() {
    let result = run_gramexpress(
        &["--input", FLOWERS, "--format", "pretty", "--no-mappings"],
        "histogram(x: petal_length, nbins: 5)",
        "",
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let text = result.unwrap();
    assert!(text.contains("\n  "), "expected indented output");

    let out: Value = serde_json::from_str(&text).unwrap();
    assert!(out.get("mappings").is_none());
    let trace = &out["plotly"]["data"][0];
    assert_eq!(trace["type"], json!("bar"));
    let total: f64 = y_values(trace).iter().sum();
    assert!(approx_eq!(f64, total, 9.0, ulps = 2));
}

#[test]
fn test_end_to_end_unknown_chart() {
    let csv = fs::read_to_string(FLOWERS).unwrap();
    let result = run_gramexpress(&[], "heatmap(x: sepal_length)", &csv);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown chart"));
}

#[test]
fn test_end_to_end_parse_error() {
    let csv = fs::read_to_string(FLOWERS).unwrap();
    assert!(run_gramexpress(&[], "scatter(x sepal_length", &csv).is_err());
}

#[test]
fn test_end_to_end_missing_column() {
    let csv = fs::read_to_string(FLOWERS).unwrap();
    let result = run_gramexpress(&[], "scatter(x: height, y: sepal_width)", &csv);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("height"));
}

#[test]
fn test_histogram_probability_sums_to_one() {
    let fig = histogram(
        CallArgs::new()
            .with("table", flowers())
            .with("x", "sepal_length")
            .with("histnorm", "probability"),
    )
    .unwrap();
    let total: f64 = y_values(&fig.data[0]).iter().sum();
    assert!(approx_eq!(f64, total, 1.0, epsilon = 1e-9));
}

#[test]
fn test_wide_histogram_tightens_legend() {
    let fig = histogram(
        CallArgs::new()
            .with("table", flowers())
            .with("x", vec!["sepal_length", "petal_length"]),
    )
    .unwrap();
    assert_eq!(fig.data.len(), 2);
    assert_eq!(fig.data[0]["name"], json!("sepal_length"));
    assert_eq!(fig.data[1]["name"], json!("petal_length"));
    assert_eq!(fig.layout["legend"]["tracegroupgap"], json!(0));

    // both candidates share one set of bin edges
    assert_eq!(fig.data[0]["x"], fig.data[1]["x"]);
}

#[test]
fn test_timeline_durations() {
    let tasks = Table::from_csv(File::open(TASKS).unwrap()).unwrap();
    let fig = timeline(
        CallArgs::new()
            .with("table", tasks)
            .with("x_start", "start")
            .with("x_end", "finish")
            .with("y", "task"),
    )
    .unwrap();
    let trace = &fig.data[0];
    assert_eq!(trace["orientation"], json!("h"));
    assert_eq!(trace["x"], json!([172_800_000, 604_800_000, 28_800_000]));
    assert_eq!(trace["base"][0], json!("2024-01-01"));
    assert_eq!(fig.layout["xaxis"]["type"], json!("date"));
}

#[test]
fn test_ecdf_ends_at_one() {
    let fig = ecdf(
        CallArgs::new()
            .with("table", flowers())
            .with("x", "sepal_length")
            .with("color", "species"),
    )
    .unwrap();
    assert_eq!(fig.data.len(), 3);
    for trace in &fig.data {
        let ys = y_values(trace);
        assert!(approx_eq!(f64, *ys.last().unwrap(), 1.0, ulps = 2));
    }
}

#[test]
fn test_pie_colors_are_attached_per_row() {
    let fig = pie(
        CallArgs::new()
            .with("table", flowers())
            .with("names", "species")
            .with("values", "sepal_length")
            .with("color", "species"),
    )
    .unwrap();
    assert_eq!(fig.data.len(), 1);
    let colors = fig.data[0]["marker"]["colors"].as_array().unwrap();
    assert_eq!(colors.len(), 9);
    assert_eq!(colors[0], json!(PLOTLY_COLORS[0]));
    assert_eq!(colors[3], json!(PLOTLY_COLORS[1]));
    assert_eq!(colors[8], json!(PLOTLY_COLORS[2]));
}

#[test]
fn test_pre_partitioned_input() {
    let parts = flowers().partition_by(&["species".to_string()]).unwrap();
    let fig = scatter(
        CallArgs::new()
            .with("table", DataSource::Partitioned(parts))
            .with("x", "sepal_length")
            .with("y", "petal_length"),
    )
    .unwrap();
    assert_eq!(fig.data.len(), 3);
    assert_eq!(fig.data[2]["name"], json!("virginica"));
}

#[test]
fn test_marginals_inside_facets_are_rejected() {
    let err = scatter(
        CallArgs::new()
            .with("table", flowers())
            .with("x", "sepal_length")
            .with("y", "sepal_width")
            .with("facet_col", "species")
            .with("marginal_x", "histogram"),
    )
    .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedComposition);
}

#[test]
fn test_non_table_is_a_type_error() {
    let err = scatter(CallArgs::new().with("table", "flowers.csv").with("x", "a")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Type);
}
