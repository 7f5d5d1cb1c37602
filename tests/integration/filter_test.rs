use atc_explorer::filter::level_options;
use atc_explorer::{
    AgeGroup, AtcLevel, Column, ExplorerError, Identity, Selection, available_values, cascade,
    filter,
};

use crate::utils::{SMR_CSV, drugs, present};

#[test]
fn test_unrestricted_selection_is_identity() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    assert_eq!(filter(&rows, &Selection::all())?, rows);

    let all_choices = Selection::all()
        .with_level(AtcLevel::L1, "(all)")
        .with_level(AtcLevel::L3, "All");
    assert_eq!(filter(&rows, &all_choices)?, rows);
    Ok(())
}

#[test]
fn test_filter_is_idempotent() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let selection = Selection::all()
        .with_level(AtcLevel::L1, "N")
        .with_age_group(AgeGroup::Total);

    let once = filter(&rows, &selection)?;
    let twice = filter(&once, &selection)?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_every_surviving_row_matches() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let selection = Selection::all()
        .with_level(AtcLevel::L1, "N — NERVOUS SYSTEM")
        .with_level(AtcLevel::L2, "N06");

    let filtered = filter(&rows, &selection)?;
    assert_eq!(filtered.num_rows(), 3);
    assert!(present(&filtered, Column::L1Code).iter().all(|c| c == "N"));
    assert!(present(&filtered, Column::L2Code).iter().all(|c| c == "N06"));
    Ok(())
}

#[test]
fn test_filter_keeps_input_order() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let filtered = filter(&rows, &Selection::all().with_level(AtcLevel::L1, "J"))?;
    assert_eq!(
        present(&filtered, Column::DrugName),
        vec!["Amoxicillin", "Amoxicillin", "Aciclovir"]
    );
    Ok(())
}

#[test]
fn test_child_options_follow_parent_choice() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    assert_eq!(available_values(&rows, AtcLevel::L1), vec!["J", "M", "N"]);

    let nervous = filter(&rows, &Selection::all().with_level(AtcLevel::L1, "N"))?;
    assert_eq!(available_values(&nervous, AtcLevel::L2), vec!["N02", "N06"]);

    let labels: Vec<String> = level_options(&nervous, AtcLevel::L2)?
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(labels, vec!["N02 — ANALGESICS", "N06 — PSYCHOANALEPTICS"]);
    Ok(())
}

#[test]
fn test_cascade_records_options_per_level() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let selection = Selection::all()
        .with_level(AtcLevel::L1, "N")
        .with_level(AtcLevel::L2, "N06")
        .with_age_group(AgeGroup::Adolescent);

    let result = cascade(&rows, &selection)?;
    assert_eq!(result.level_values[0], vec!["J", "M", "N"]);
    assert_eq!(result.level_values[1], vec!["N02", "N06"]);
    assert_eq!(result.level_values[2], vec!["N06A", "N06B"]);
    assert_eq!(result.level_values[3], vec!["N06AB", "N06BA"]);
    assert_eq!(result.drug_options, vec!["Methylphenidate", "Sertraline"]);
    assert_eq!(
        result.age_options,
        vec![AgeGroup::Total, AgeGroup::Infant, AgeGroup::Adolescent]
    );
    assert_eq!(result.hierarchy_rows.num_rows(), 3);
    assert_eq!(present(&result.rows, Column::DrugName), vec!["Sertraline"]);
    Ok(())
}

#[test]
fn test_age_and_identity_filters() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;

    let infants = filter(&rows, &Selection::all().with_age_group(AgeGroup::Infant))?;
    assert_eq!(
        present(&infants, Column::DrugName),
        vec!["Paracetamol", "Amoxicillin"]
    );

    let picked = Selection::all()
        .with_age_group(AgeGroup::Total)
        .with_identities(Identity::DrugName, ["Ibuprofen", "Sertraline"]);
    assert_eq!(
        present(&filter(&rows, &picked)?, Column::DrugName),
        vec!["Sertraline", "Ibuprofen"]
    );

    let by_cui = Selection::all().with_identities(Identity::Cui, ["C5"]);
    assert_eq!(
        present(&filter(&rows, &by_cui)?, Column::DrugName),
        vec!["Aciclovir"]
    );
    Ok(())
}

#[test]
fn test_no_match_is_empty_not_error() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let filtered = filter(&rows, &Selection::all().with_level(AtcLevel::L1, "Z"))?;
    assert!(filtered.is_empty());
    assert_eq!(filtered.columns(), rows.columns());
    Ok(())
}

#[test]
fn test_missing_level_column_is_schema_error() -> atc_explorer::Result<()> {
    let rows = drugs("drug,pubs\nA,1\nB,2\n")?;
    assert!(available_values(&rows, AtcLevel::L1).is_empty());

    let err = filter(&rows, &Selection::all().with_level(AtcLevel::L1, "N")).unwrap_err();
    assert!(matches!(err, ExplorerError::Schema(_)));

    let err = filter(&rows, &Selection::all().with_identities(Identity::Cui, ["C1"])).unwrap_err();
    assert!(matches!(err, ExplorerError::Schema(_)));
    Ok(())
}
