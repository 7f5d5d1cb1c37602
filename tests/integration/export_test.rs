use std::fs;

use atc_explorer::export::{to_csv_string, write_csv_file};
use atc_explorer::{AdeQuery, Column, Metric, RowSet, aggregate_and_rank, drill_down};

use crate::utils::{PRR_CSV, SMR_CSV, adverse_events, drugs, scratch_dir};

fn ranked() -> atc_explorer::Result<RowSet> {
    let rows = drugs(SMR_CSV)?;
    let ranked = aggregate_and_rank(
        &rows,
        &[Column::DrugName, Column::AgeGroup],
        Metric::Prescriptions,
        3,
        true,
    )?;
    ranked.project(&[
        Column::DrugName,
        Column::AgeGroup,
        Column::Prescriptions,
        Column::Publications,
    ])
}

#[test]
fn test_header_follows_column_order() -> atc_explorer::Result<()> {
    let csv = to_csv_string(&ranked()?)?;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("drug_name,age_group,prescription_count,publication_count")
    );
    assert_eq!(lines.next(), Some("Amoxicillin,Total,7300,150"));
    assert_eq!(lines.next(), Some("Ibuprofen,Total,6100,95"));
    assert_eq!(lines.next(), Some("Paracetamol,Total,5100,0"));
    assert_eq!(lines.next(), None);
    Ok(())
}

#[test]
fn test_labels_with_commas_are_quoted() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let amoxicillin = aggregate_and_rank(&rows, &[Column::L3Code, Column::L3Name], Metric::Prescriptions, 1, true)?;
    let csv = to_csv_string(&amoxicillin)?;
    assert!(csv.contains("J01C,\"BETA-LACTAM ANTIBACTERIALS, PENICILLINS\",180,9900"));
    Ok(())
}

#[test]
fn test_empty_result_exports_header_only() -> atc_explorer::Result<()> {
    let empty = ranked()?.head(0);
    let csv = to_csv_string(&empty)?;
    assert_eq!(
        csv.trim_end(),
        "drug_name,age_group,prescription_count,publication_count"
    );
    Ok(())
}

#[test]
fn test_adverse_event_export_keeps_nulls_empty() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let report = drill_down(&ade, &AdeQuery::new("Sertraline").with_cui("C1"))?;
    let csv = to_csv_string(&report.view()?)?;

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "age_group,preferred_term,prr,ror,ic,ebgm");
    assert_eq!(lines[1], "Total,Suicidal ideation,3.2,3.5,1.6,2.9");
    assert_eq!(lines[4], "Total,Nausea,,1.2,0.1,");
    Ok(())
}

#[test]
fn test_write_csv_file() -> atc_explorer::Result<()> {
    let dir = scratch_dir("export_file");
    let path = dir.path().join("results.csv");
    let table = ranked()?;

    write_csv_file(&table, &path)?;
    assert_eq!(fs::read_to_string(&path)?, to_csv_string(&table)?);
    Ok(())
}
