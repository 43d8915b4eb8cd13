//! Comprehensive unit tests for zonalis modules
//!
//! These tests cover the statistic kernels, geotransform math, the pure
//! zonal aggregation, scheduler ordering/failure policies and the merger
//! contract, all without touching the filesystem.

use chrono::{NaiveDate, NaiveDateTime};
use geo_types::{coord, LineString, MultiPolygon, Polygon, Rect};
use ndarray::Array2;
use std::str::FromStr;
use std::sync::Arc;
use zonalis::{
    boundaries::{AttrValue, Boundary, BoundarySet, FieldKind},
    errors::ZonalisError,
    export::OutputFormat,
    geotransform::GeoTransform,
    merge,
    raster::{decode_cf_times, TimeSlice},
    scheduler::{self, SchedulerConfig, WorkerContext},
    zonal::{self, Statistic},
};

fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![Polygon::new(
        LineString::from(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]),
        vec![],
    )])
}

/// North-up 4x4 transform: cell (0, 0) center at (0.5, 3.5), unit cells,
/// nodata sentinel -9999.
fn test_transform() -> GeoTransform {
    GeoTransform::from_axes(
        &[0.5, 1.5, 2.5, 3.5],
        &[3.5, 2.5, 1.5, 0.5],
        Some(-9999.0),
    )
    .expect("valid axes")
}

/// Three disjoint 2x2-cell squares: rows 0-1 cols 0-1, rows 0-1 cols 2-3,
/// rows 2-3 cols 0-1.
fn test_boundaries() -> BoundarySet {
    let fields = vec![("name".to_string(), FieldKind::Text)];
    let boundaries = ["upper_left", "upper_right", "lower_left"]
        .iter()
        .zip([
            square(0.0, 2.0, 2.0, 4.0),
            square(2.0, 2.0, 4.0, 4.0),
            square(0.0, 0.0, 2.0, 2.0),
        ])
        .map(|(name, geometry)| {
            Boundary::new(geometry, vec![AttrValue::Text((*name).to_string())]).unwrap()
        })
        .collect();
    BoundarySet::from_parts(fields, "TESTCRS".to_string(), boundaries)
}

/// 4x4 grid with value row * 4 + col.
fn test_grid() -> Array2<f64> {
    Array2::from_shape_vec((4, 4), (0..16).map(f64::from).collect()).unwrap()
}

fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn test_error_types() {
    let boundary_err = ZonalisError::boundary_load("regions.shp", "no vector layer");
    assert!(format!("{}", boundary_err).contains("regions.shp"));

    let raster_err = ZonalisError::raster_open("drought.nc", "value variable 'x' not found");
    assert!(format!("{}", raster_err).contains("drought.nc"));

    let stat_err = ZonalisError::UnsupportedStatistic {
        name: "variance".to_string(),
    };
    assert!(format!("{}", stat_err).contains("'variance'"));

    let task_err = ZonalisError::worker_task("2000-01-02 00:00:00", "bad grid");
    let rendered = format!("{}", task_err);
    assert!(rendered.contains("2000-01-02"));
    assert!(rendered.contains("bad grid"));

    assert_eq!(
        format!("{}", ZonalisError::EmptyResult),
        "No time slices were processed"
    );
}

#[test]
fn test_statistic_parsing() {
    assert_eq!(Statistic::from_str("min").unwrap(), Statistic::Min);
    assert_eq!(Statistic::from_str("MEAN").unwrap(), Statistic::Mean);
    assert_eq!(Statistic::from_str("majority").unwrap(), Statistic::Mode);
    assert_eq!(
        Statistic::from_str("standard-deviation").unwrap(),
        Statistic::Std
    );

    let parsed = zonal::parse_statistics("mean, min ,mean,count").unwrap();
    assert_eq!(
        parsed,
        vec![Statistic::Mean, Statistic::Min, Statistic::Count]
    );

    let err = zonal::parse_statistics("mean,variance").unwrap_err();
    match err {
        ZonalisError::UnsupportedStatistic { name } => assert_eq!(name, "variance"),
        other => panic!("expected UnsupportedStatistic, got {:?}", other),
    }

    assert!(zonal::parse_statistics("").is_err());
    assert!(zonal::parse_statistics(" , ,").is_err());
}

#[test]
fn test_default_statistics_cover_full_set() {
    let parsed = zonal::parse_statistics(zonalis::config::DEFAULT_STATISTICS).unwrap();
    assert_eq!(parsed, Statistic::ALL.to_vec());
}

#[test]
fn test_output_format_parsing() {
    assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
    assert_eq!(OutputFormat::from_str("TSV").unwrap(), OutputFormat::Tsv);
    assert_eq!(
        OutputFormat::from_str("none").unwrap(),
        OutputFormat::Stdout
    );

    match OutputFormat::from_str("xlsx").unwrap_err() {
        ZonalisError::UnsupportedOutputFormat { format } => assert_eq!(format, "xlsx"),
        other => panic!("expected UnsupportedOutputFormat, got {:?}", other),
    }
}

#[test]
fn test_geotransform_from_axes() {
    let t = test_transform();
    assert_eq!(t.coefficients(), [0.0, 1.0, 0.0, 4.0, 0.0, -1.0]);
    assert_eq!(t.cell_center(0, 0), (0.5, 3.5));
    assert_eq!(t.cell_center(3, 3), (3.5, 0.5));

    // Degenerate axes are rejected
    assert!(GeoTransform::from_axes(&[1.0], &[1.0, 2.0], None).is_err());
    assert!(GeoTransform::from_axes(&[1.0, 1.0], &[1.0, 2.0], None).is_err());
}

#[test]
fn test_geotransform_rejects_nonuniform_axes() {
    // A stretched gap mid-axis would silently mis-georeference every cell
    let err = GeoTransform::from_axes(&[0.0, 1.0, 2.5], &[2.0, 1.0], None).unwrap_err();
    assert!(format!("{}", err).contains("not uniformly spaced"));
    assert!(GeoTransform::from_axes(&[0.0, 1.0], &[3.0, 2.0, 0.5], None).is_err());

    // Tiny float noise within tolerance is still accepted
    assert!(GeoTransform::from_axes(&[0.0, 1.0, 2.0 + 1e-12], &[2.0, 1.0, 0.0], None).is_ok());
}

#[test]
fn test_geotransform_nodata() {
    let t = test_transform();
    assert!(t.is_nodata(-9999.0));
    assert!(t.is_nodata(f64::NAN));
    assert!(!t.is_nodata(0.0));

    let no_sentinel = GeoTransform::new([0.0, 1.0, 0.0, 4.0, 0.0, -1.0], None);
    assert!(!no_sentinel.is_nodata(-9999.0));
    assert!(no_sentinel.is_nodata(f64::NAN));
}

#[test]
fn test_geotransform_window() {
    let t = test_transform();

    // Upper-left quadrant: rows 0..2, cols 0..2
    let extent = Rect::new(coord! { x: 0.0, y: 2.0 }, coord! { x: 2.0, y: 4.0 });
    let (rows, cols) = t.window(&extent, 4, 4).unwrap();
    assert_eq!(rows, 0..2);
    assert_eq!(cols, 0..2);

    // An oversized extent clamps to the grid
    let extent = Rect::new(coord! { x: -10.0, y: -10.0 }, coord! { x: 10.0, y: 10.0 });
    let (rows, cols) = t.window(&extent, 4, 4).unwrap();
    assert_eq!(rows, 0..4);
    assert_eq!(cols, 0..4);

    // A disjoint extent misses entirely
    let extent = Rect::new(coord! { x: 100.0, y: 100.0 }, coord! { x: 101.0, y: 101.0 });
    assert!(t.window(&extent, 4, 4).is_none());
}

#[test]
fn test_median_kernel() {
    assert_eq!(zonal::median(&[1.0, 2.0, 3.0]), 2.0);
    // Even-sized input averages the two central values
    assert_eq!(zonal::median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    assert_eq!(zonal::median(&[5.0]), 5.0);
}

#[test]
fn test_mode_kernel() {
    assert_eq!(zonal::mode(&[1.0, 2.0, 2.0, 3.0]), 2.0);
    // Ties break to the smallest value
    assert_eq!(zonal::mode(&[1.0, 1.0, 2.0, 2.0]), 1.0);
    assert_eq!(zonal::mode(&[3.0, 3.0, 3.0, 7.0, 7.0]), 3.0);
}

#[test]
fn test_compute_basic_statistics() {
    let boundaries = test_boundaries();
    let grid = test_grid();
    let t = test_transform();

    let stats = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Sum,
        Statistic::Count,
        Statistic::Range,
        Statistic::Std,
        Statistic::Median,
        Statistic::Mode,
    ];
    let rows = zonal::compute(&boundaries, grid.view(), &t, &stats, false).unwrap();
    assert_eq!(rows.len(), 3);

    // Upper-left boundary covers values 0, 1, 4, 5
    let row = &rows[0];
    assert_eq!(row[0], Some(0.0)); // min
    assert_eq!(row[1], Some(5.0)); // max
    assert_eq!(row[2], Some(2.5)); // mean
    assert_eq!(row[3], Some(10.0)); // sum
    assert_eq!(row[4], Some(4.0)); // count
    assert_eq!(row[5], Some(5.0)); // range
    let std = row[6].unwrap();
    // Population std of {0, 1, 4, 5} = sqrt(4.25)
    assert!((std - 4.25_f64.sqrt()).abs() < 1e-12);
    assert_eq!(row[7], Some(2.5)); // median
    assert_eq!(row[8], Some(0.0)); // mode of distinct values = smallest

    // Upper-right boundary covers values 2, 3, 6, 7
    assert_eq!(rows[1][3], Some(18.0));
    // Lower-left boundary covers values 8, 9, 12, 13
    assert_eq!(rows[2][3], Some(42.0));
}

#[test]
fn test_compute_all_nodata_is_marked_not_zero() {
    let boundaries = test_boundaries();
    let t = test_transform();

    let mut grid = test_grid();
    // Blank out the upper-left boundary's cells only
    for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        grid[(row, col)] = -9999.0;
    }

    let stats = [Statistic::Mean, Statistic::Count, Statistic::Sum];
    let rows = zonal::compute(&boundaries, grid.view(), &t, &stats, false).unwrap();

    // The row exists and every statistic is the no-data marker
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec![None, None, None]);
    // Other boundaries are unaffected
    assert_eq!(rows[1][1], Some(4.0));
    assert_eq!(rows[2][1], Some(4.0));
}

#[test]
fn test_touch_policy_is_monotonic() {
    // A sliver polygon overlapping one cell corner without containing its
    // center: no cells under the center rule, one under the touch rule.
    let fields = vec![("name".to_string(), FieldKind::Text)];
    let sliver = Boundary::new(
        square(0.0, 0.0, 0.3, 0.3),
        vec![AttrValue::Text("sliver".to_string())],
    )
    .unwrap();
    let set = BoundarySet::from_parts(fields, "TESTCRS".to_string(), vec![sliver]);

    let grid = test_grid();
    let t = test_transform();
    let stats = [Statistic::Count];

    let center_only = zonal::compute(&set, grid.view(), &t, &stats, false).unwrap();
    let touched = zonal::compute(&set, grid.view(), &t, &stats, true).unwrap();

    assert_eq!(center_only[0][0], None);
    assert_eq!(touched[0][0], Some(1.0));

    // And for ordinary boundaries the count never shrinks
    let set = test_boundaries();
    let center_only = zonal::compute(&set, grid.view(), &t, &stats, false).unwrap();
    let touched = zonal::compute(&set, grid.view(), &t, &stats, true).unwrap();
    for (narrow, wide) in center_only.iter().zip(&touched) {
        assert!(wide[0].unwrap_or(0.0) >= narrow[0].unwrap_or(0.0));
    }
}

#[test]
fn test_scheduler_preserves_time_order() {
    let boundaries = Arc::new(test_boundaries());
    let t = test_transform();
    let ctx = WorkerContext::new(
        Arc::clone(&boundaries),
        t,
        vec![Statistic::Mean],
        false,
    );

    let slices: Vec<TimeSlice> = (1..=5)
        .map(|day| TimeSlice {
            timestamp: ts(day),
            grid: test_grid() * f64::from(day),
        })
        .collect();

    let output = scheduler::run(&ctx, slices, &SchedulerConfig::new(Some(4), false)).unwrap();
    let times: Vec<NaiveDateTime> = output.slices.iter().map(|s| s.timestamp).collect();
    assert_eq!(times, (1..=5).map(ts).collect::<Vec<_>>());
    assert!(output.skipped.is_empty());
}

#[test]
fn test_sequential_and_parallel_runs_match() {
    let boundaries = Arc::new(test_boundaries());
    let t = test_transform();
    let stats = vec![
        Statistic::Min,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Std,
    ];
    let ctx = WorkerContext::new(Arc::clone(&boundaries), t, stats.clone(), true);

    let make_slices = || -> Vec<TimeSlice> {
        (1..=8)
            .map(|day| TimeSlice {
                timestamp: ts(day),
                grid: test_grid() + f64::from(day),
            })
            .collect()
    };

    let sequential =
        scheduler::run(&ctx, make_slices(), &SchedulerConfig::sequential()).unwrap();
    let parallel =
        scheduler::run(&ctx, make_slices(), &SchedulerConfig::new(Some(4), false)).unwrap();

    assert_eq!(sequential.slices.len(), parallel.slices.len());
    for (a, b) in sequential.slices.iter().zip(&parallel.slices) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.rows, b.rows);
    }
}

#[test]
fn test_scheduler_aborts_on_task_failure_by_default() {
    let boundaries = Arc::new(test_boundaries());
    let t = test_transform();
    let ctx = WorkerContext::new(Arc::clone(&boundaries), t, vec![Statistic::Mean], false);

    let slices = vec![
        TimeSlice {
            timestamp: ts(1),
            grid: test_grid(),
        },
        // Degenerate grid makes this task fail
        TimeSlice {
            timestamp: ts(2),
            grid: Array2::zeros((0, 0)),
        },
    ];

    let err = scheduler::run(&ctx, slices, &SchedulerConfig::default()).unwrap_err();
    match err {
        ZonalisError::WorkerTask { timestamp, .. } => {
            assert!(timestamp.contains("2000-01-02"));
        }
        other => panic!("expected WorkerTask, got {:?}", other),
    }
}

#[test]
fn test_scheduler_skip_mode_records_failures() {
    let boundaries = Arc::new(test_boundaries());
    let t = test_transform();
    let ctx = WorkerContext::new(Arc::clone(&boundaries), t, vec![Statistic::Mean], false);

    let slices = vec![
        TimeSlice {
            timestamp: ts(1),
            grid: test_grid(),
        },
        TimeSlice {
            timestamp: ts(2),
            grid: Array2::zeros((0, 0)),
        },
        TimeSlice {
            timestamp: ts(3),
            grid: test_grid(),
        },
    ];

    let output = scheduler::run(&ctx, slices, &SchedulerConfig::new(Some(2), true)).unwrap();
    assert_eq!(output.slices.len(), 2);
    assert_eq!(output.slices[0].timestamp, ts(1));
    assert_eq!(output.slices[1].timestamp, ts(3));
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].0, ts(2));
}

#[test]
fn test_merge_row_count_and_order() {
    let boundaries = test_boundaries();
    let t = test_transform();
    let stats = vec![Statistic::Mean];
    let ctx = WorkerContext::new(Arc::new(boundaries.clone()), t, stats.clone(), false);

    let slices: Vec<TimeSlice> = (1..=2)
        .map(|day| TimeSlice {
            timestamp: ts(day),
            grid: test_grid(),
        })
        .collect();
    let output = scheduler::run(&ctx, slices, &SchedulerConfig::sequential()).unwrap();

    let table = merge::merge(&boundaries, &stats, output.slices, false).unwrap();
    assert_eq!(table.num_records(), 6); // 3 boundaries x 2 slices

    // Grouped by timestamp in series order, boundary order within
    let expected_names = ["upper_left", "upper_right", "lower_left"];
    for (i, record) in table.records.iter().enumerate() {
        assert_eq!(record.timestamp, ts(1 + (i / 3) as u32));
        assert_eq!(
            record.attributes[0],
            AttrValue::Text(expected_names[i % 3].to_string())
        );
        assert!(record.geometry.is_none());
    }
}

#[test]
fn test_empty_boundary_set_yields_empty_table() {
    let set = BoundarySet::from_parts(Vec::new(), "TESTCRS".to_string(), Vec::new());
    let t = test_transform();
    let ctx = WorkerContext::new(Arc::new(set.clone()), t, vec![Statistic::Mean], false);

    let slices = vec![TimeSlice {
        timestamp: ts(1),
        grid: test_grid(),
    }];
    let output = scheduler::run(&ctx, slices, &SchedulerConfig::sequential()).unwrap();
    assert_eq!(output.slices.len(), 1);
    assert!(output.slices[0].rows.is_empty());

    // Zero boundaries with a processed slice is a valid 0-row table, not
    // an empty-result failure
    let table = merge::merge(&set, &[Statistic::Mean], output.slices, false).unwrap();
    assert_eq!(table.num_records(), 0);
    assert!(table.field_names.is_empty());
}

#[test]
fn test_merge_empty_fails() {
    let boundaries = test_boundaries();
    let err = merge::merge(&boundaries, &[Statistic::Mean], Vec::new(), false).unwrap_err();
    assert!(matches!(err, ZonalisError::EmptyResult));
}

#[test]
fn test_merge_geometry_retention() {
    let boundaries = test_boundaries();
    let t = test_transform();
    let stats = vec![Statistic::Count];
    let ctx = WorkerContext::new(Arc::new(boundaries.clone()), t, stats.clone(), false);

    let slices = vec![TimeSlice {
        timestamp: ts(1),
        grid: test_grid(),
    }];
    let output = scheduler::run(&ctx, slices, &SchedulerConfig::sequential()).unwrap();

    let table = merge::merge(&boundaries, &stats, output.slices, true).unwrap();
    assert!(table.records.iter().all(|r| r.geometry.is_some()));
}

#[test]
fn test_cf_time_decoding() {
    let days = decode_cf_times(&[0.0, 1.0, 1.5], "days since 2000-01-01").unwrap();
    assert_eq!(days[0], ts(1));
    assert_eq!(days[1], ts(2));
    assert_eq!(
        days[2],
        NaiveDate::from_ymd_opt(2000, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    );

    let hours = decode_cf_times(&[6.0], "hours since 2000-01-01 00:00:00").unwrap();
    assert_eq!(
        hours[0],
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    );

    assert!(decode_cf_times(&[0.0], "fortnights since 2000-01-01").is_err());
    assert!(decode_cf_times(&[0.0], "no-epoch-here").is_err());
}
