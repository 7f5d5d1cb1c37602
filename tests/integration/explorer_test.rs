use std::path::Path;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use atc_explorer::{
    AgeGroup, AtcLevel, Column, DataSource, DatasetCaches, DatasetLayout, Explorer,
    ExplorerConfig, ExplorerError, Metric, Query, Selection,
};

use crate::utils::{
    PRR_CSV, PUBS_CSV, RX_CSV, SMR_CSV, drugs, metric, present, scratch_dir, write_fixture,
};

/// Configuration rooted at `dir` whose environment fallbacks are never set
fn config(dir: &Path, layout: DatasetLayout) -> ExplorerConfig {
    ExplorerConfig {
        data_dir: dir.to_path_buf(),
        root_dir: dir.to_path_buf(),
        layout,
        drugs: DataSource::new("smr3.csv", "ATC_EXPLORER_TEST_SMR3"),
        adverse_events: DataSource::new("prr3.csv", "ATC_EXPLORER_TEST_PRR3"),
        publications: DataSource::new("pedpubs_atc_merged.csv", "ATC_EXPLORER_TEST_PUBS"),
        prescriptions: DataSource::new("rx_vol_joined_to_umls.csv", "ATC_EXPLORER_TEST_RX"),
        ..ExplorerConfig::default()
    }
}

fn stratified_dir(name: &str) -> TempDir {
    let dir = scratch_dir(name);
    write_fixture(dir.path(), "smr3.csv", SMR_CSV);
    write_fixture(dir.path(), "prr3.csv", PRR_CSV);
    dir
}

#[test]
fn test_open_and_rank_stratified() -> atc_explorer::Result<()> {
    let dir = stratified_dir("explorer_stratified");
    let explorer = Explorer::open(&config(dir.path(), DatasetLayout::Stratified), &DatasetCaches::default())?;

    let selection = Selection::all()
        .with_level(AtcLevel::L1, "N")
        .with_age_group(AgeGroup::Total);
    let result = explorer.run(&Query::new(selection, Metric::Publications))?;

    assert_eq!(result.top_n, 100);
    assert!(result.warning.is_none());
    assert_eq!(
        present(&result.display, Column::DrugName),
        vec!["Methylphenidate", "Sertraline", "Paracetamol"]
    );
    assert_eq!(metric(&result.display, Metric::Publications), vec![210, 85, 0]);
    assert_eq!(
        result.display.columns(),
        vec![
            Column::DrugName,
            Column::AgeGroup,
            Column::Prescriptions,
            Column::Publications
        ]
    );

    let report = explorer.drill_down("Sertraline", None)?;
    assert_eq!(report.rows.num_rows(), 4);
    Ok(())
}

#[test]
fn test_concepts_without_names_rank_separately() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(
        DatasetLayout::Stratified,
        Arc::new(drugs(
            "cui,agegroup,l1_code,pubs\nC1,Total,N,5\nC2,Total,N,8\nC3,Total,J,1\n",
        )?),
    );
    let selection = Selection::all().with_age_group(AgeGroup::Total);
    let result = explorer.run(&Query::new(selection, Metric::Publications))?;

    assert_eq!(result.display.num_rows(), 3);
    assert_eq!(metric(&result.display, Metric::Publications), vec![8, 5, 1]);
    assert_eq!(present(&result.display, Column::Cui), vec!["C2", "C1", "C3"]);
    assert_eq!(result.display.columns().first(), Some(&Column::Cui));
    Ok(())
}

#[test]
fn test_concepts_sharing_a_name_stay_apart() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(
        DatasetLayout::Stratified,
        Arc::new(drugs(
            "cui,drug_name,agegroup,l1_code,pubs\nC1,Insulin,Total,A,5\nC2,Insulin,Total,A,8\n",
        )?),
    );
    let selection = Selection::all().with_age_group(AgeGroup::Total);
    let result = explorer.run(&Query::new(selection, Metric::Publications))?;

    assert_eq!(result.display.num_rows(), 2);
    assert_eq!(metric(&result.display, Metric::Publications), vec![8, 5]);
    assert_eq!(present(&result.display, Column::DrugName), vec!["Insulin", "Insulin"]);
    assert_eq!(result.display.columns().first(), Some(&Column::DrugName));
    Ok(())
}

#[test]
fn test_extra_levels_join_the_results() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(DatasetLayout::Stratified, Arc::new(drugs(SMR_CSV)?));
    let query = Query::new(Selection::all().with_age_group(AgeGroup::Total), Metric::Prescriptions)
        .with_extra_levels([AtcLevel::L1, AtcLevel::L1]);
    let result = explorer.run(&query)?;

    assert_eq!(
        result.display.columns(),
        vec![
            Column::DrugName,
            Column::AgeGroup,
            Column::Prescriptions,
            Column::Publications,
            Column::L1Code,
            Column::L1Name
        ]
    );
    assert_eq!(result.display.value(Column::L1Code, 0), Some("J"));
    assert_eq!(result.display.value(Column::DrugName, 0), Some("Amoxicillin"));
    Ok(())
}

#[test]
fn test_top_n_is_bounded() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(DatasetLayout::Stratified, Arc::new(drugs(SMR_CSV)?));

    let small = explorer.run(&Query::new(Selection::all(), Metric::Publications).with_top_n(3))?;
    assert_eq!(small.top_n, 10);
    assert_eq!(small.ranked.num_rows(), 9);

    let large = explorer.run(&Query::new(Selection::all(), Metric::Publications).with_top_n(50_000))?;
    assert_eq!(large.top_n, 1000);
    Ok(())
}

#[test]
fn test_empty_selection_warns() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(DatasetLayout::Stratified, Arc::new(drugs(SMR_CSV)?));
    let selection = Selection::all()
        .with_level(AtcLevel::L1, "J")
        .with_level(AtcLevel::L2, "J05")
        .with_age_group(AgeGroup::Infant);
    let result = explorer.run(&Query::new(selection, Metric::Publications))?;

    assert!(result.display.is_empty());
    let warning = result.warning.expect("empty result warns");
    assert_eq!(warning.to_string(), "No data for J > J05 — 0-2");
    Ok(())
}

#[test]
fn test_level_choices_cascade() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(DatasetLayout::Stratified, Arc::new(drugs(SMR_CSV)?));
    let selection = Selection::all().with_level(AtcLevel::L1, "N");

    assert_eq!(
        explorer.level_choices(&selection, AtcLevel::L2)?,
        vec!["(all)", "N02", "N06"]
    );
    assert_eq!(
        explorer.level_choices(&Selection::all(), AtcLevel::L1)?,
        vec!["(all)", "J", "M", "N"]
    );

    // A deeper choice does not narrow the level it sits under
    let deeper = selection.with_level(AtcLevel::L2, "N06");
    let labels: Vec<String> = explorer
        .level_options(&deeper, AtcLevel::L2)?
        .iter()
        .map(|option| option.code.clone())
        .collect();
    assert_eq!(labels, vec!["N02", "N06"]);
    Ok(())
}

#[test]
fn test_open_merged_layout() -> atc_explorer::Result<()> {
    let dir = scratch_dir("explorer_merged");
    write_fixture(dir.path(), "pedpubs_atc_merged.csv", PUBS_CSV);
    write_fixture(dir.path(), "rx_vol_joined_to_umls.csv", RX_CSV);

    let caches = DatasetCaches::default();
    let explorer = Explorer::open(&config(dir.path(), DatasetLayout::Merged), &caches)?;
    assert_eq!(caches.drugs.len(), 2);
    assert!(explorer.adverse_events().is_none());

    let result = explorer.run(&Query::new(Selection::all(), Metric::Prescriptions))?;
    assert_eq!(
        present(&result.display, Column::DrugName),
        vec!["amoxicillin", "methylphenidate", "sertraline", "zinc oxide"]
    );
    assert_eq!(metric(&result.display, Metric::Prescriptions), vec![9900, 3400, 2100, 0]);
    assert_eq!(result.display.columns().first(), Some(&Column::Cui));
    assert_eq!(result.display.columns().last(), Some(&Column::Prescriptions));

    let err = explorer.drill_down("sertraline", None).unwrap_err();
    assert!(matches!(err, ExplorerError::Config(_)));
    Ok(())
}

#[test]
fn test_reopen_reuses_cached_tables() -> atc_explorer::Result<()> {
    let dir = stratified_dir("explorer_cache");
    let config = config(dir.path(), DatasetLayout::Stratified);
    let caches = DatasetCaches::default();

    let first = Explorer::open(&config, &caches)?;
    let second = Explorer::open(&config, &caches)?;
    assert!(std::ptr::eq(first.drugs(), second.drugs()));
    assert_eq!(caches.drugs.len(), 1);
    assert_eq!(caches.adverse_events.len(), 1);
    Ok(())
}

#[test]
fn test_missing_source_is_config_error() {
    let dir = scratch_dir("explorer_missing");
    let err = Explorer::open(&config(dir.path(), DatasetLayout::Stratified), &DatasetCaches::default())
        .unwrap_err();
    assert!(matches!(err, ExplorerError::Config(_)));
}

#[test]
fn test_concurrent_queries_share_one_session() -> atc_explorer::Result<()> {
    let explorer = Explorer::new(DatasetLayout::Stratified, Arc::new(drugs(SMR_CSV)?));
    let queries = [
        Query::new(Selection::all(), Metric::Publications),
        Query::new(Selection::all().with_level(AtcLevel::L1, "J"), Metric::Prescriptions),
        Query::new(Selection::all().with_age_group(AgeGroup::Infant), Metric::Publications).ascending(),
    ];
    let expected = queries
        .iter()
        .map(|query| explorer.run(query))
        .collect::<atc_explorer::Result<Vec<_>>>()?;

    let session = &explorer;
    let results = thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|query| scope.spawn(move || session.run(query)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("query thread panicked"))
            .collect::<atc_explorer::Result<Vec<_>>>()
    })?;

    assert_eq!(results, expected);
    Ok(())
}
