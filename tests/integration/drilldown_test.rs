use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use atc_explorer::schema::ade_schema;
use atc_explorer::{AdeColumn, AdeQuery, AdeSet, AgeGroup, drill_down};

use crate::utils::{PRR_CSV, SMR_CSV, adverse_events, drugs, prr};

fn preferred_terms(ade: &AdeSet) -> Vec<&str> {
    (0..ade.num_rows())
        .filter_map(|row| ade.value(AdeColumn::PreferredTerm, row))
        .collect()
}

#[test]
fn test_prr_descending_with_nulls_last() -> atc_explorer::Result<()> {
    let batch = RecordBatch::try_new(
        ade_schema(&[AdeColumn::DrugName, AdeColumn::PreferredTerm, AdeColumn::Prr]),
        vec![
            Arc::new(StringArray::from(vec!["Ibuprofen"; 3])) as ArrayRef,
            Arc::new(StringArray::from(vec!["Rash", "Nausea", "Headache"])) as ArrayRef,
            Arc::new(Float64Array::from(vec![Some(3.2), None, Some(1.1)])) as ArrayRef,
        ],
    )?;
    let ade = AdeSet::try_new(batch)?;

    let report = drill_down(&ade, &AdeQuery::new("Ibuprofen"))?;
    assert_eq!(prr(&report.rows), vec![Some(3.2), Some(1.1), None]);
    assert_eq!(preferred_terms(&report.rows), vec!["Rash", "Headache", "Nausea"]);
    Ok(())
}

#[test]
fn test_all_ages_drill_down_by_cui() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let smr = drugs(SMR_CSV)?;

    let query = AdeQuery::for_drug(&smr, "Sertraline", Some(AgeGroup::Total))?;
    assert_eq!(query.cui.as_deref(), Some("C1"));

    let report = drill_down(&ade, &query)?;
    assert_eq!(report.subject, "Sertraline — All pediatric ages");
    assert_eq!(prr(&report.rows), vec![Some(3.2), Some(2.4), Some(1.1), None]);
    assert!(report.warning().is_none());
    Ok(())
}

#[test]
fn test_cui_match_ignores_same_named_rows() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let smr = drugs(SMR_CSV)?;

    let report = drill_down(&ade, &AdeQuery::for_drug(&smr, "Amoxicillin", None)?)?;
    assert_eq!(preferred_terms(&report.rows), vec!["Diarrhoea"]);
    Ok(())
}

#[test]
fn test_name_fallback_is_case_insensitive() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;

    let report = drill_down(&ade, &AdeQuery::new("amoxicillin"))?;
    assert_eq!(preferred_terms(&report.rows), vec!["Rash", "Diarrhoea"]);

    let infants = drill_down(
        &ade,
        &AdeQuery::new("amoxicillin").with_age_group(AgeGroup::Infant),
    )?;
    assert_eq!(infants.subject, "amoxicillin — 0-2");
    assert_eq!(preferred_terms(&infants.rows), vec!["Diarrhoea"]);
    Ok(())
}

#[test]
fn test_padded_names_still_match() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let smr = drugs(SMR_CSV)?;

    let by_name = drill_down(&ade, &AdeQuery::new(" AMOXICILLIN "))?;
    assert_eq!(preferred_terms(&by_name.rows), vec!["Rash", "Diarrhoea"]);

    let query = AdeQuery::for_drug(&smr, "Sertraline  ", None)?;
    assert_eq!(query.cui.as_deref(), Some("C1"));
    Ok(())
}

#[test]
fn test_empty_drill_down_warns() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let report = drill_down(
        &ade,
        &AdeQuery::new("Ibuprofen")
            .with_cui("C6")
            .with_age_group(AgeGroup::Adolescent),
    )?;

    assert!(report.is_empty());
    let warning = report.warning().expect("empty report warns");
    assert_eq!(warning.to_string(), "No data for Ibuprofen — 11-17");
    Ok(())
}

#[test]
fn test_view_columns() -> atc_explorer::Result<()> {
    let ade = adverse_events(PRR_CSV)?;
    let report = drill_down(&ade, &AdeQuery::new("Ibuprofen").with_cui("C6"))?;
    let view = report.view()?;
    assert_eq!(view.columns(), AdeColumn::VIEW.to_vec());
    assert_eq!(view.num_rows(), 1);
    Ok(())
}
