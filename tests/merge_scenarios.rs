use gridmerge::merge::{merge_ensemble_with_report, EnsembleMerger, MatchKey};
use gridmerge::{
    merge_ensemble, GridLocations, Location, MergeConfig, MergeError, RealizationSource, RuptureRecord,
    SectionAssociations, Strike, TectonicRegion,
};

fn one_cell_grid() -> GridLocations {
    GridLocations::new(vec![Location::new(34.05, -118.25)])
}

fn single(record: RuptureRecord) -> RealizationSource {
    let mut source = RealizationSource::new(one_cell_grid());
    source.push(record.tectonic_region, record.grid_index, record).unwrap();
    source
}

fn scenario_rupture(rate: f64, lower_depth: f64) -> RuptureRecord {
    RuptureRecord::new(0, TectonicRegion::ActiveShallow, 6.0, rate)
        .with_mechanism(0.0, 90.0, Strike::any())
        .with_depths(0.0, lower_depth)
        .with_length(20.0)
}

#[test]
fn test_two_branch_depth_model_scenario() {
    let a = single(scenario_rupture(0.01, 12.0));
    let b = single(scenario_rupture(0.02, 10.0));

    let (merged, report) =
        merge_ensemble_with_report(&[(a, 0.6), (b, 0.4)], &MergeConfig::default()).unwrap();

    assert_eq!(report.match_key, MatchKey::Core);
    assert_eq!(report.realizations, 2);
    assert_eq!(report.output_ruptures, 1);
    assert_eq!(report.partially_present, 0);

    let cell = merged.cell(TectonicRegion::ActiveShallow, 0);
    assert_eq!(cell.len(), 1);
    let rupture = &cell[0];
    assert!((rupture.rate - 0.014).abs() < 1e-15);
    assert_eq!(rupture.upper_depth, 0.0);
    assert!((rupture.lower_depth - 11.2).abs() < 1e-12);
    assert_eq!(rupture.length, 20.0);
    assert_eq!(rupture.magnitude, 6.0);
    assert_eq!(rupture.rake, 0.0);
    assert_eq!(rupture.dip, 90.0);
    // midpoints differed between branches, so the averaged hypocenter is explicit
    let hypocentral_depth = rupture.hypocentral_depth.unwrap();
    assert!((hypocentral_depth - 5.6).abs() < 1e-12);
    assert_eq!(rupture.hypocentral_das, None);
}

#[test]
fn test_two_pass_streaming_api() {
    let branches = vec![
        (single(scenario_rupture(0.01, 12.0)), 0.6),
        (single(scenario_rupture(0.02, 10.0)), 0.4),
    ];

    let mut merger = EnsembleMerger::new(MergeConfig::default());
    for (source, _) in &branches {
        merger.detect(source).unwrap();
    }
    for (source, weight) in &branches {
        merger.accumulate(source, *weight).unwrap();
    }
    let streamed = merger.finalize().unwrap();

    assert_eq!(streamed, merge_ensemble(&branches, &MergeConfig::default()).unwrap());
}

#[test]
fn test_regions_are_merged_independently() {
    let mut a = RealizationSource::new(one_cell_grid());
    a.push(TectonicRegion::ActiveShallow, 0, RuptureRecord::new(0, TectonicRegion::ActiveShallow, 6.0, 0.01))
        .unwrap();
    a.push(TectonicRegion::SubductionInterface, 0, RuptureRecord::new(0, TectonicRegion::SubductionInterface, 6.0, 0.02))
        .unwrap();
    let mut b = RealizationSource::new(one_cell_grid());
    b.push(TectonicRegion::SubductionInterface, 0, RuptureRecord::new(0, TectonicRegion::SubductionInterface, 6.0, 0.04))
        .unwrap();

    let merged = merge_ensemble(&[(a, 0.5), (b, 0.5)], &MergeConfig::default()).unwrap();

    assert_eq!(merged.cell(TectonicRegion::ActiveShallow, 0)[0].rate, 0.005);
    assert!((merged.cell(TectonicRegion::SubductionInterface, 0)[0].rate - 0.03).abs() < 1e-15);
    assert!((merged.total_rate() - 0.035).abs() < 1e-15);
}

#[test]
fn test_section_association_sets_define_distinct_ruptures() {
    let on_fault = scenario_rupture(0.01, 12.0).with_associations(SectionAssociations::new(vec![101], vec![0.6]));
    let off_fault = scenario_rupture(0.05, 12.0);

    let merged = merge_ensemble(&[(single(on_fault), 0.5), (single(off_fault), 0.5)], &MergeConfig::default())
        .unwrap();

    let cell = merged.cell(TectonicRegion::ActiveShallow, 0);
    assert_eq!(cell.len(), 2);
    assert!(cell[0].associations.is_empty());
    assert_eq!(cell[0].rate, 0.025);
    assert_eq!(cell[1].associations.ids, vec![101]);
    assert_eq!(cell[1].associations.fractions, vec![0.3]);
}

#[test]
fn test_grid_mismatch_is_fatal_before_accumulation() {
    let a = single(scenario_rupture(0.01, 12.0));
    let shifted = RealizationSource::new(GridLocations::new(vec![Location::new(34.05, -118.3)]));

    let err = merge_ensemble(&[(a, 0.5), (shifted, 0.5)], &MergeConfig::default()).unwrap_err();

    assert!(matches!(err, MergeError::GridLocationMismatch { index: 0, .. }));
}

#[test]
fn test_grid_mismatch_during_accumulation() {
    let a = single(scenario_rupture(0.01, 12.0));
    let larger = RealizationSource::new(GridLocations::new(vec![
        Location::new(34.05, -118.25),
        Location::new(34.15, -118.25),
    ]));

    let mut merger = EnsembleMerger::new(MergeConfig::default());
    merger.detect(&a).unwrap();
    merger.accumulate(&a, 1.0).unwrap();

    assert_eq!(
        merger.accumulate(&larger, 1.0).unwrap_err(),
        MergeError::GridSizeMismatch { expected: 1, found: 2 }
    );
}

#[test]
fn test_malformed_associations_report_location_and_index() {
    let good = scenario_rupture(0.01, 12.0);
    let bad = RuptureRecord { magnitude: 6.5, ..good.clone() }
        .with_associations(SectionAssociations::new(vec![5], vec![1.25]));
    let mut source = RealizationSource::new(one_cell_grid());
    source.push(TectonicRegion::ActiveShallow, 0, good).unwrap();
    source.push(TectonicRegion::ActiveShallow, 0, bad).unwrap();

    let err = merge_ensemble(&[(source, 1.0)], &MergeConfig::default()).unwrap_err();

    match err {
        MergeError::MalformedAssociations { region, location, rupture, reason } => {
            assert_eq!(region, TectonicRegion::ActiveShallow);
            assert_eq!(location, 0);
            assert_eq!(rupture, 1);
            assert!(reason.contains("1.25"));
        }
        other => panic!("Expected malformed associations, got {:?}", other),
    }
}

#[test]
fn test_zero_total_weight_is_fatal() {
    let a = single(scenario_rupture(0.01, 12.0));
    let err = merge_ensemble(&[(a.clone(), 0.0), (a, 0.0)], &MergeConfig::default()).unwrap_err();
    assert_eq!(err, MergeError::NonPositiveTotalWeight(0.0));
}

#[test]
fn test_empty_ensemble_is_fatal() {
    let err = merge_ensemble(&[], &MergeConfig::default()).unwrap_err();
    assert_eq!(err, MergeError::NonPositiveTotalWeight(0.0));
}

#[test]
fn test_negative_weight_rejected() {
    let a = single(scenario_rupture(0.01, 12.0));
    let err = merge_ensemble(&[(a, -1.0)], &MergeConfig::default()).unwrap_err();
    assert_eq!(err, MergeError::InvalidWeight(-1.0));
}

#[test]
fn test_merged_source_serializes() {
    let merged = merge_ensemble(&[(single(scenario_rupture(0.01, 12.0)), 1.0)], &MergeConfig::default()).unwrap();
    let json = serde_json::to_string(&merged).unwrap();
    let back: RealizationSource = serde_json::from_str(&json).unwrap();
    assert_eq!(back, merged);
}
