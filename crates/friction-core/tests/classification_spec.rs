//! Band classification properties over the reference and custom tables

use friction_core::{
    classify, Band, BandTable, ChannelMap, IngestionAdapter, SharedStateStore, TelemetryMessage,
};
use std::sync::Arc;

fn custom_table() -> BandTable {
    BandTable::new(vec![
        Band::new(-1.0, "very low"),
        Band::new(0.0, "low"),
        Band::new(2.5, "mid"),
        Band::new(10.0, "high"),
    ])
    .unwrap()
}

#[test]
fn test_classification_is_monotonic() {
    for table in [BandTable::reference(), custom_table()] {
        let samples: Vec<f64> = (-300..=1200).map(|i| i as f64 / 100.0).collect();
        let mut previous = 0;
        for x in samples {
            let band = classify(x, &table);
            assert!(band >= previous, "classify({x}) = {band} < {previous}");
            assert!(band < table.len());
            previous = band;
        }
    }
}

#[test]
fn test_every_bound_routes_to_its_own_band() {
    let table = custom_table();
    for (i, band) in table.bands().iter().enumerate() {
        assert_eq!(classify(band.upper_bound, &table), i);
        if i + 1 < table.len() {
            assert_eq!(classify(band.upper_bound + f64::EPSILON * 8.0, &table), i + 1);
        }
    }
}

#[test]
fn test_classification_is_repeatable() {
    let table = BandTable::reference();
    let first: Vec<usize> = (0..100).map(|i| table.classify(i as f64 / 100.0)).collect();
    let second: Vec<usize> = (0..100).map(|i| table.classify(i as f64 / 100.0)).collect();
    assert_eq!(first, second);
}

#[test]
fn test_wet_road_with_saturation() {
    let table = BandTable::reference();
    let store = Arc::new(SharedStateStore::new(table.ceiling()));
    let adapter = IngestionAdapter::new(store.clone(), ChannelMap::default());

    adapter.on_batch(&[
        TelemetryMessage::new("zEstFriction", 0.55),
        TelemetryMessage::new("zAlphaR", 0.5),
    ]);

    let band = classify(store.read_primary(), &table);
    assert_eq!(band, 2);
    assert_eq!(table.label(band), Some("Earth Road (wet)"));
    assert!(store.read_flag());
}

#[test]
fn test_clamped_write_lands_in_last_band() {
    let table = BandTable::reference();
    let store = SharedStateStore::new(table.ceiling());

    store.write_primary(1.5);
    assert_eq!(store.read_primary(), 0.99);
    assert_eq!(classify(store.read_primary(), &table), table.len() - 1);
}
