//! Entry point for the zonalis application.
//! Handles CLI parsing, configuration validation, and dispatches the
//! aggregation pipeline and table export.

use clap::Parser;

mod cli;

use cli::Args;
use zonalis::config::RawConfig;
use zonalis::export::write_table;
use zonalis::pipeline;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "info" } else { "warn" }),
    )
    .init();

    println!(
        r#"
------------------------------------------------------------------
                             _ _
              _______  _ __ (_) |___
             |_  / _ \| '_ \| | / __|
              / / (_) | | | | | \__ \
             /___\___/|_| |_|_|_|___/
            NetCDF zonal statistics tool
------------------------------------------------------------------
        "#
    );

    let config = RawConfig {
        boundary_source: args.shape_archive,
        raster: args.raster,
        value_var: args.value_var,
        time_var: args.time_var,
        statistics: args.stats,
        all_touched: args.all_touched,
        keep_geometry: args.geometry,
        output_dir: args.output_dir,
        output_file: args.destination,
        output_format: args.output_format,
        num_workers: args.threads,
        skip_failed: args.skip_errors,
    }
    .validate()?;

    let summary = pipeline::run(&config)?;
    for (timestamp, reason) in &summary.skipped {
        println!("⚠️  Skipped time {}: {}", timestamp, reason);
    }
    println!("✅ Aggregated {} records", summary.table.num_records());

    write_table(&summary.table, config.format, config.output_path.as_deref())?;
    if let Some(path) = &config.output_path {
        println!("✅ Saved result to {}", path.display());
    }

    Ok(())
}
