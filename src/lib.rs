pub mod analysis;
pub mod chart;
pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod executor;
pub mod export;
pub mod extract;
pub mod filter;
pub mod formula;
pub mod frequency;
pub mod intent;
pub mod io_utils;
pub mod pivot;
pub mod plan;
pub mod render;
pub mod schema;
pub mod stats;
pub mod table;
pub mod validate;
pub mod workspace;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    chart::{ChartOptions, ChartRequest, JsonChartRenderer},
    cli::{Cli, Commands, InputArgs},
    config::AnalystConfig,
    executor::QueryResult,
    export::ExportFormat,
    io_utils::LoadOptions,
    plan::AggregationKind,
    validate::ValidationRules,
    workspace::Workspace,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_analyst", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Query(args) => handle_query(&args),
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Pivot(args) => handle_pivot(&args),
        Commands::Validate(args) => handle_validate(&args),
        Commands::Export(args) => handle_export(&args),
        Commands::Chart(args) => handle_chart(&args),
        Commands::Preview(args) => handle_preview(&args),
        Commands::Formula(args) => print_json(&formula::suggest(&args.request)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing result")?;
    println!("{rendered}");
    Ok(())
}

/// Loads the config and every input file into a fresh workspace.
fn load_workspace(args: &InputArgs) -> Result<(Workspace, AnalystConfig)> {
    let config = AnalystConfig::load_or_default(args.config.as_deref())
        .with_context(|| format!("Loading config from {:?}", args.config))?;
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        sample_rows: args.sample_rows.unwrap_or(config.sample_rows),
    };
    let mut workspace = Workspace::new();
    for path in &args.inputs {
        workspace
            .load_csv(path, &options)
            .with_context(|| format!("Loading {path:?}"))?;
    }
    debug!(
        "Session {} holds sheet(s) {:?}",
        workspace.session_id(),
        workspace.sheet_names()
    );
    Ok((workspace, config))
}

fn handle_query(args: &cli::QueryArgs) -> Result<()> {
    let (workspace, config) = load_workspace(&args.input)?;
    let result = executor::execute(&workspace, &args.query, args.input.sheet.as_deref(), &config);

    if args.text {
        println!("{}", executor::answer_text(&result, &config));
    } else if args.table {
        match &result {
            Ok(QueryResult::Filter(filtered)) => {
                print!("{}", render::render_records(&filtered.data))
            }
            Ok(QueryResult::TopN(top)) => print!("{}", render::render_records(&top.data)),
            Ok(QueryResult::General(general)) => {
                print!("{}", render::render_records(&general.data_preview))
            }
            _ => println!("{}", executor::answer_text(&result, &config)),
        }
    } else {
        print_json(&executor::respond(&result))?;
    }
    result?;
    Ok(())
}

fn handle_analyze(args: &cli::AnalyzeArgs) -> Result<()> {
    let (workspace, config) = load_workspace(&args.input)?;
    let summary = analysis::summarize_workspace(&workspace, &config)?;
    info!(
        "Analyzed {} sheet(s); {} recommendation(s)",
        summary.overall.total_sheets,
        summary.recommendations.len()
    );
    print_json(&summary)
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let operations = clean::parse_operations(&args.operations)?;
    let (mut workspace, config) = load_workspace(&args.input)?;
    let outcome = clean::clean_sheet(
        &mut workspace,
        args.input.sheet.as_deref(),
        &operations,
        &config,
    )?;
    if let Some(path) = &args.output {
        let sheet = workspace.sheet(&outcome.sheet)?;
        write_output(path, &io_utils::table_to_csv(&sheet.table, b',')?)?;
        info!(
            "Wrote {} cleaned row(s) to {:?}",
            sheet.table.row_count(),
            path
        );
    }
    print_json(&outcome)
}

fn handle_pivot(args: &cli::PivotArgs) -> Result<()> {
    let aggregation = args.aggregation.parse::<AggregationKind>()?;
    let filters = filter::parse_filters(&args.filters)?;
    let (mut workspace, _) = load_workspace(&args.input)?;
    let result = pivot::create_pivot(
        &mut workspace,
        args.input.sheet.as_deref(),
        &args.index,
        &args.values,
        aggregation,
        &filters,
    )?;
    print_json(&result)
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let rules = ValidationRules::load(&args.rules)
        .with_context(|| format!("Loading validation rules from {:?}", args.rules))?;
    let (workspace, _) = load_workspace(&args.input)?;
    let report = validate::validate_sheet(&workspace, args.input.sheet.as_deref(), &rules)?;
    print_json(&report)
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let format = args.format.parse::<ExportFormat>()?;
    let filters = filter::parse_filters(&args.filters)?;
    let (workspace, _) = load_workspace(&args.input)?;
    let result = export::export_sheet(
        &workspace,
        format,
        args.input.sheet.as_deref(),
        &filters,
        args.filename.as_deref(),
    )?;
    match &args.output {
        Some(path) => {
            write_output(path, &result.content)?;
            info!("Export written to {:?}", path);
            Ok(())
        }
        None => print_json(&result),
    }
}

fn handle_chart(args: &cli::ChartArgs) -> Result<()> {
    let request = ChartRequest {
        kind: args.kind.parse()?,
        x_column: args.x_column.clone(),
        y_column: args.y_column.clone(),
        title: args.title.clone(),
        options: ChartOptions {
            color: args.color.clone(),
            grid: args.grid,
            rotation: args.rotation,
        },
    };
    let (mut workspace, _) = load_workspace(&args.input)?;
    let result = chart::create_chart(
        &mut workspace,
        args.input.sheet.as_deref(),
        &request,
        &JsonChartRenderer,
    )?;
    if let Some(path) = &args.output {
        let record = workspace
            .charts
            .get(&result.chart_id)
            .context("Chart missing from registry")?;
        fs::write(path, &record.image).with_context(|| format!("Writing chart to {path:?}"))?;
    }
    print_json(&result)
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let (workspace, _) = load_workspace(&args.input)?;
    let sheet = workspace.resolve_sheet(args.input.sheet.as_deref())?;
    let records = sheet.table.records(Some(args.rows));
    print!("{}", render::render_records(&records));
    info!(
        "Displayed {} row(s) from sheet '{}'",
        records.len(),
        sheet.name
    );
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Writing output to {path:?}"))
}
