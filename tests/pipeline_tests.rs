// tests/pipeline_tests.rs
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use landsat_indices::batch::{run_batch, BatchConfig, Operation};
use landsat_indices::cli::Cli;
use landsat_indices::config::{Period, PipelineConfig, RequestContext};
use landsat_indices::error::Error;
use landsat_indices::processing::anomaly::classify;
use landsat_indices::processing::indices::SpectralIndex;
use landsat_indices::processing::series::{build_series, build_series_named, is_complete, plottable};
use landsat_indices::processing::IndexPipeline;
use landsat_indices::region::StudyRegion;
use landsat_indices::sensor::{SensorGeneration, StandardBand};
use landsat_indices::service::MemoryArchive;
use landsat_indices::utils::cache::{CacheKey, IndexCache};
use landsat_indices::utils::raster::{BandValues, GeoInfo, MultiBandRaster, NODATA};

const SHAPE: (usize, usize) = (10, 10);

fn test_geo() -> GeoInfo {
    GeoInfo::new("", [0.0, 30.0, 0.0, 300.0, 0.0, -30.0])
}

fn values(nir: f64, red: f64) -> BandValues {
    BandValues {
        blue: 0.1,
        green: 0.2,
        red,
        nir,
        swir1: 0.1,
        swir2: 0.05,
    }
}

/// Scene carrying the native band codes of `generation`, uniform values
fn scene(generation: SensorGeneration, px: BandValues) -> MultiBandRaster {
    scene_on(generation, px, SHAPE, test_geo())
}

fn scene_on(generation: SensorGeneration, px: BandValues, shape: (usize, usize), geo: GeoInfo) -> MultiBandRaster {
    let mut raster = MultiBandRaster::new(shape, geo);
    for (band, native) in StandardBand::ALL.iter().zip(generation.native_bands()) {
        raster = raster
            .with_band(*native, vec![px.get(*band) as f32; shape.0 * shape.1])
            .unwrap();
    }
    raster
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add(archive: &mut MemoryArchive, generation: SensorGeneration, day: NaiveDate, cloud: f64, px: BandValues) {
    archive.add_scene(generation.collection_id(), day, cloud, scene(generation, px));
}

/// Archive with usable imagery in 2005 (legacy) and 2015 (modern) only
fn test_archive() -> MemoryArchive {
    let mut archive = MemoryArchive::new();
    // NDVI 0.5
    add(&mut archive, SensorGeneration::Legacy, date(2005, 3, 1), 5.0, values(0.3, 0.1));
    // NDVI 0.6, one summer and one winter scene
    add(&mut archive, SensorGeneration::Modern, date(2015, 2, 10), 10.0, values(0.4, 0.1));
    add(&mut archive, SensorGeneration::Modern, date(2015, 8, 10), 12.0, values(0.4, 0.1));
    // Too cloudy to ever qualify
    add(&mut archive, SensorGeneration::Modern, date(2016, 5, 5), 20.0, values(0.4, 0.1));
    add(&mut archive, SensorGeneration::Modern, date(2017, 5, 5), 85.0, values(0.4, 0.1));
    // Wrong generation for its year
    add(&mut archive, SensorGeneration::Modern, date(2008, 5, 5), 1.0, values(0.4, 0.1));
    archive
}

fn full_region() -> Arc<StudyRegion> {
    Arc::new(StudyRegion::rectangle(0.0, 0.0, 300.0, 300.0).unwrap())
}

fn test_pipeline(archive: MemoryArchive) -> IndexPipeline<MemoryArchive> {
    IndexPipeline::new(archive, full_region(), PipelineConfig::default())
}

#[test]
fn test_composite_filters_scenes() {
    let pipeline = test_pipeline(test_archive());

    assert!(pipeline.composite(2005, Period::Year).unwrap().is_some());
    // cloud cover must be strictly below the threshold
    assert!(pipeline.composite(2016, Period::Year).unwrap().is_none());
    assert!(pipeline.composite(2017, Period::Year).unwrap().is_none());
    // 2008 is served by the legacy collection only
    assert!(pipeline.composite(2008, Period::Year).unwrap().is_none());
    // only the August scene falls in [Jul 1, Dec 28)
    assert!(pipeline.composite(2015, Period::SecondSemester).unwrap().is_some());

    let image = pipeline.composite(2015, Period::Year).unwrap().unwrap();
    assert_eq!(image.band_names(), ["BLUE", "GREEN", "RED", "NIR", "SWIR1", "SWIR2"]);
    assert!((image.band(StandardBand::Nir)[0] - 0.4).abs() < 1e-6);
}

#[test]
fn test_scenes_outside_region_are_ignored() {
    let far_away = Arc::new(StudyRegion::rectangle(1000.0, 1000.0, 2000.0, 2000.0).unwrap());
    let pipeline = IndexPipeline::new(test_archive(), far_away, PipelineConfig::default());
    assert!(pipeline.composite(2005, Period::Year).unwrap().is_none());
}

#[test]
fn test_compute_index_without_imagery() {
    let pipeline = test_pipeline(test_archive());

    let result = pipeline.compute_index(2010, Period::Year, SpectralIndex::NDVI);
    assert!(matches!(result, Err(Error::NoImageryError { year: 2010, .. })));
    assert!(pipeline
        .try_compute_index(2010, Period::Year, SpectralIndex::NDVI)
        .unwrap()
        .is_none());
}

#[test]
fn test_stats_for_year() {
    let pipeline = test_pipeline(test_archive());

    let stats = pipeline.stats(2005, Period::Year, SpectralIndex::NDVI).unwrap();
    assert_eq!(stats.valid_pixels, 100);
    assert!((stats.mean.unwrap() - 0.5).abs() < 1e-5);

    let map = stats.to_map();
    assert!((map["NDVI_min"].unwrap() - 0.5).abs() < 1e-5);
    assert!((map["NDVI_max"].unwrap() - 0.5).abs() < 1e-5);
}

#[test]
fn test_stats_respect_pixel_budget() {
    let config = PipelineConfig {
        max_pixels: 10,
        ..PipelineConfig::default()
    };
    let pipeline = IndexPipeline::new(test_archive(), full_region(), config);

    let result = pipeline.stats(2005, Period::Year, SpectralIndex::NDVI);
    assert!(matches!(result, Err(Error::ReductionLimitExceeded { max_pixels: 10, .. })));
}

#[test]
fn test_cache_reuses_index_images() {
    let cache = Arc::new(IndexCache::new());
    let pipeline = IndexPipeline::with_cache(
        test_archive(),
        full_region(),
        PipelineConfig::default(),
        Arc::clone(&cache),
    );

    let first = pipeline.compute_index(2015, Period::Year, SpectralIndex::EVI).unwrap();
    let second = pipeline.compute_index(2015, Period::Year, SpectralIndex::EVI).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pipeline.cache_size(), 1);

    // A different period is a different key
    pipeline
        .compute_index(2015, Period::FirstSemester, SpectralIndex::EVI)
        .unwrap();
    assert_eq!(cache.len(), 2);
    assert!(cache
        .get(&CacheKey {
            year: 2015,
            index: SpectralIndex::EVI,
            period: Period::FirstSemester,
        })
        .is_some());

    // Failures are not cached
    assert!(pipeline.compute_index(2010, Period::Year, SpectralIndex::EVI).is_err());
    assert_eq!(cache.len(), 2);

    pipeline.clear_cache();
    assert!(cache.is_empty());
}

#[test]
fn test_build_series_with_gaps() {
    let pipeline = test_pipeline(test_archive());

    let series = build_series(&pipeline, SpectralIndex::NDVI, 2000, 2025, Period::Year).unwrap();
    assert_eq!(series.len(), 26);
    assert!(is_complete(&series, 2000, 2025).unwrap());

    let present = plottable(&series);
    assert_eq!(present.len(), 2);
    assert_eq!(present[0].0, 2005);
    assert!((present[0].1 - 0.5).abs() < 1e-5);
    assert_eq!(present[1].0, 2015);
    assert!((present[1].1 - 0.6).abs() < 1e-5);

    assert_eq!(series[16].year, 2016);
    assert_eq!(series[16].value, None);
}

#[test]
fn test_build_series_invalid_input() {
    let pipeline = test_pipeline(test_archive());

    let reversed = build_series(&pipeline, SpectralIndex::NDVI, 2020, 2010, Period::Year);
    assert!(matches!(reversed, Err(Error::InvalidYearRange { .. })));

    let unknown = build_series_named(&pipeline, "XYZ", 2000, 2001, Period::Year);
    assert!(matches!(unknown, Err(Error::UnknownIndexError(_))));

    let single = build_series_named(&pipeline, "gndvi", 2015, 2015, Period::Year).unwrap();
    assert_eq!(single.len(), 1);
    assert!(single[0].value.is_some());
}

#[test]
fn test_series_anomalies() {
    let pipeline = test_pipeline(test_archive());
    let series = build_series(&pipeline, SpectralIndex::NDVI, 2000, 2025, Period::Year).unwrap();

    let anomalies = classify(&series);
    assert_eq!(anomalies.len(), 2);
    // mean 0.55, std 0.05: both years sit exactly one std away
    assert_eq!(anomalies[0].year, 2005);
    assert!((anomalies[0].anomaly + 0.05).abs() < 1e-5);
    assert_eq!(anomalies[0].severity.to_string(), "extreme negative");
    assert_eq!(anomalies[1].year, 2015);
    assert!((anomalies[1].anomaly - 0.05).abs() < 1e-5);
    assert_eq!(anomalies[1].severity.to_string(), "extreme positive");
}

#[test]
fn test_series_value_missing_when_scenes_reduce_to_nothing() {
    let mut archive = test_archive();
    // 2012 has a clear scene whose pixels are all NoData
    let blank = BandValues {
        blue: NODATA as f64,
        green: NODATA as f64,
        red: NODATA as f64,
        nir: NODATA as f64,
        swir1: NODATA as f64,
        swir2: NODATA as f64,
    };
    add(&mut archive, SensorGeneration::Modern, date(2012, 6, 1), 2.0, blank);
    let pipeline = test_pipeline(archive);

    assert!(pipeline.composite(2012, Period::Year).unwrap().is_some());
    let series = build_series(&pipeline, SpectralIndex::NDVI, 2012, 2012, Period::Year).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].value, None);

    // a region that touches the footprint but holds no pixel center
    let sliver = Arc::new(StudyRegion::rectangle(0.0, 0.0, 10.0, 10.0).unwrap());
    let pipeline = IndexPipeline::new(test_archive(), sliver, PipelineConfig::default());

    assert!(pipeline.composite(2015, Period::Year).unwrap().is_some());
    let series = build_series(&pipeline, SpectralIndex::NDVI, 2015, 2015, Period::Year).unwrap();
    assert_eq!(series[0].value, None);
    assert!(classify(&series).is_empty());
}

#[cfg(feature = "gdal")]
#[test]
fn test_lonlat_region_over_utm_scene() {
    use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};

    let utm = SpatialRef::from_epsg(32719).unwrap();
    let mut lonlat = SpatialRef::from_epsg(4326).unwrap();
    lonlat.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

    // 3 km square of 30 m pixels near Arequipa
    let geo = GeoInfo::new(utm.to_wkt().unwrap(), [220000.0, 30.0, 0.0, 8190000.0, 0.0, -30.0]);
    let mut archive = MemoryArchive::new();
    archive.add_scene(
        SensorGeneration::Modern.collection_id(),
        date(2020, 5, 1),
        5.0,
        scene_on(SensorGeneration::Modern, values(0.4, 0.1), (100, 100), geo),
    );

    // inner 1.8 km square, 15 m off the pixel centers, sent to lon/lat
    let mut xs = [220600.0, 222400.0, 222400.0, 220600.0, 220600.0];
    let mut ys = [8187600.0, 8187600.0, 8189400.0, 8189400.0, 8187600.0];
    let mut zs = [0.0; 5];
    CoordTransform::new(&utm, &lonlat)
        .unwrap()
        .transform_coords(&mut xs, &mut ys, &mut zs)
        .unwrap();
    let ring: Vec<String> = xs.iter().zip(&ys).map(|(x, y)| format!("[{x}, {y}]")).collect();
    let geojson = format!(r#"{{"type": "Polygon", "coordinates": [[{}]]}}"#, ring.join(", "));
    let region = StudyRegion::from_geojson_str(&geojson).unwrap();
    assert!(region.bbox()[0] < -71.0 && region.bbox()[1] > -17.0);

    let pipeline = IndexPipeline::new(archive, Arc::new(region), PipelineConfig::default());

    let stats = pipeline.stats(2020, Period::Year, SpectralIndex::NDVI).unwrap();
    assert_eq!(stats.valid_pixels, 60 * 60);

    let series = build_series(&pipeline, SpectralIndex::NDVI, 2020, 2020, Period::Year).unwrap();
    assert!((series[0].value.unwrap() - 0.6).abs() < 1e-5);
}

#[test]
fn test_unreadable_scene_crs_is_an_error() {
    let mut archive = MemoryArchive::new();
    let geo = GeoInfo::new("not a coordinate system", [0.0, 30.0, 0.0, 300.0, 0.0, -30.0]);
    archive.add_scene(
        SensorGeneration::Modern.collection_id(),
        date(2020, 5, 1),
        5.0,
        scene_on(SensorGeneration::Modern, values(0.4, 0.1), SHAPE, geo),
    );
    let lonlat = r#"{"type": "Polygon", "coordinates": [[[-71.6, -16.5], [-71.5, -16.5], [-71.5, -16.4], [-71.6, -16.5]]]}"#;
    let region = Arc::new(StudyRegion::from_geojson_str(lonlat).unwrap());
    let pipeline = IndexPipeline::new(archive, region, PipelineConfig::default());

    // the year must fail loudly rather than come back empty
    let result = build_series(&pipeline, SpectralIndex::NDVI, 2020, 2020, Period::Year);
    assert!(matches!(result, Err(Error::RegionError(_))));
}

#[test]
fn test_compare_continues_after_failure() {
    let mut archive = test_archive();
    // 2020 composite lacks SWIR1 (SR_B6)
    let mut broken = MultiBandRaster::new(SHAPE, test_geo());
    for native in ["SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B7"] {
        broken = broken.with_band(native, vec![0.2; 100]).unwrap();
    }
    archive.add_scene(SensorGeneration::Modern.collection_id(), date(2020, 4, 1), 3.0, broken);

    let pipeline = test_pipeline(archive);
    let ctx = RequestContext::new(SpectralIndex::LSWI, vec![2015, 2020, 2010, 2005], Period::Year);
    let results = pipeline.compare(&ctx);

    assert_eq!(results.iter().map(|r| r.year).collect::<Vec<_>>(), [2015, 2020, 2010, 2005]);
    assert!(results[0].stats.is_some());
    assert!(results[1].error.as_deref().unwrap().contains("SR_B6"));
    assert!(results[2].error.is_some());
    assert!(results[3].stats.is_some());
}

#[test]
fn test_batch_config_parsing() {
    let json = r#"{
        "global": {"cloud_cover_threshold": 15, "float": true},
        "operations": [
            {"type": "map", "index": "savi", "year": 2015, "period": "s1", "output": "savi.tif", "compress": "LZW"},
            {"type": "series", "index": "NDWI", "start": 2000, "end": 2005}
        ]
    }"#;

    let config = BatchConfig::from_json(json).unwrap();
    assert_eq!(config.global.pipeline.cloud_cover_threshold, 15.0);
    assert_eq!(config.global.pipeline.scale, 30.0);
    assert!(config.global.float);
    assert_eq!(config.global.scale_factor, 10000);

    match &config.operations[0] {
        Operation::Map {
            index,
            period,
            overrides,
            ..
        } => {
            assert_eq!(*index, SpectralIndex::SAVI);
            assert_eq!(*period, Period::FirstSemester);
            assert_eq!(overrides.compress.as_deref(), Some("LZW"));
            assert_eq!(overrides.float, None);
        }
        other => panic!("expected a map operation, got {other:?}"),
    }
    assert!(matches!(
        config.operations[1],
        Operation::Series { period: Period::Year, .. }
    ));

    let bad_index = r#"{"operations": [{"type": "stats", "index": "NDBI", "years": [2000]}]}"#;
    assert!(BatchConfig::from_json(bad_index).is_err());
}

#[test]
fn test_batch_continues_after_failure() {
    let pipeline = test_pipeline(test_archive());
    let json = r#"{
        "operations": [
            {"type": "stats", "index": "ndvi", "years": [2005, 2015]},
            {"type": "stats", "index": "ndvi", "years": [2010]},
            {"type": "series", "index": "evi", "start": 2004, "end": 2006},
            {"type": "anomalies", "index": "ndvi", "start": 2000, "end": 2025}
        ]
    }"#;
    let config = BatchConfig::from_json(json).unwrap();

    let report = run_batch(&pipeline, &config);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failed(), 1);
    assert!(!report.outcomes[1].ok);
    assert!(report.outcomes[1].error.is_some());

    let stats = report.outcomes[0].result.as_ref().unwrap();
    assert!(stats["2005"]["NDVI_mean"].as_f64().is_some());

    let series = report.outcomes[2].result.as_ref().unwrap().as_array().unwrap();
    assert_eq!(series.len(), 3);
    assert!(series[0]["value"].is_null());

    let anomalies = report.outcomes[3].result.as_ref().unwrap().as_array().unwrap();
    assert_eq!(anomalies.len(), 2);
}

#[test]
fn test_command_line_flags_override_batch_settings() {
    let config = BatchConfig::from_json(
        r#"{"global": {"cloud_cover_threshold": 15, "scale": 60}, "operations": []}"#,
    )
    .unwrap();

    let cli = Cli::try_parse_from(["landsat-indices", "--cloud-cover", "35", "batch", "-f", "batch.json"]).unwrap();
    let merged = cli.pipeline_config_over(config.global.pipeline.clone());
    assert_eq!(merged.cloud_cover_threshold, 35.0);
    assert_eq!(merged.scale, 60.0);
    assert_eq!(merged.max_pixels, PipelineConfig::default().max_pixels);

    // flags left out keep the batch file's values
    let cli = Cli::try_parse_from(["landsat-indices", "batch", "-f", "batch.json", "--max-pixels", "500"]).unwrap();
    let merged = cli.pipeline_config_over(config.global.pipeline.clone());
    assert_eq!(merged.cloud_cover_threshold, 15.0);
    assert_eq!(merged.max_pixels, 500);

    let plain = Cli::try_parse_from(["landsat-indices", "indices"]).unwrap();
    assert_eq!(plain.pipeline_config(), PipelineConfig::default());
}
