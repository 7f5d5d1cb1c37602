use atc_explorer::{
    Column, ExplorerError, Metric, RankRequest, Selection, aggregate_and_rank, filter, group_sum,
    rank,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::utils::{SMR_CSV, drugs, metric, present};

const RANKING_CSV: &str = "\
drug,age_group,pubs,prescriptions
Ibuprofen,Total,5,100
Cetirizine,Total,8,40
Amoxicillin,Total,8,700
Aciclovir,Total,0,15
Ibuprofen,0-2,1,30
";

#[test]
fn test_top_one_by_publications() -> atc_explorer::Result<()> {
    let rows = drugs("drug,pubs\nIbuprofen,5\nCetirizine,8\n")?;
    let ranked = aggregate_and_rank(&rows, &[Column::DrugName], Metric::Publications, 1, true)?;
    assert_eq!(present(&ranked, Column::DrugName), vec!["Cetirizine"]);
    assert_eq!(metric(&ranked, Metric::Publications), vec![8]);
    Ok(())
}

#[test]
fn test_grouping_ignores_row_order() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let keys = [Column::L1Code, Column::L2Code];
    let expected = group_sum(&rows, &keys)?;

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..8 {
        let mut order: Vec<usize> = (0..rows.num_rows()).collect();
        order.shuffle(&mut rng);
        let shuffled = group_sum(&rows.take(&order)?, &keys)?;

        let mut got: Vec<(String, String, i64, i64)> = (0..shuffled.num_rows())
            .map(|row| {
                (
                    shuffled.value(Column::L1Code, row).unwrap_or_default().to_string(),
                    shuffled.value(Column::L2Code, row).unwrap_or_default().to_string(),
                    metric(&shuffled, Metric::Publications)[row],
                    metric(&shuffled, Metric::Prescriptions)[row],
                )
            })
            .collect();
        let mut want: Vec<(String, String, i64, i64)> = (0..expected.num_rows())
            .map(|row| {
                (
                    expected.value(Column::L1Code, row).unwrap_or_default().to_string(),
                    expected.value(Column::L2Code, row).unwrap_or_default().to_string(),
                    metric(&expected, Metric::Publications)[row],
                    metric(&expected, Metric::Prescriptions)[row],
                )
            })
            .collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }
    Ok(())
}

#[test]
fn test_group_totals_are_preserved() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    let grouped = group_sum(&rows, &[Column::L1Code])?;
    assert_eq!(present(&grouped, Column::L1Code), vec!["N", "J", "M"]);
    assert_eq!(
        grouped.total(Metric::Publications)?,
        rows.total(Metric::Publications)?
    );
    assert_eq!(
        grouped.total(Metric::Prescriptions)?,
        rows.total(Metric::Prescriptions)?
    );
    Ok(())
}

#[test]
fn test_ties_keep_first_appearance_order() -> atc_explorer::Result<()> {
    let rows = drugs(RANKING_CSV)?;
    let totals = filter(
        &rows,
        &Selection::all().with_age_group(atc_explorer::AgeGroup::Total),
    )?;

    let descending = rank(&totals, Metric::Publications, 10, true)?;
    assert_eq!(
        present(&descending, Column::DrugName),
        vec!["Cetirizine", "Amoxicillin", "Ibuprofen", "Aciclovir"]
    );

    let ascending = rank(&totals, Metric::Publications, 10, false)?;
    assert_eq!(
        present(&ascending, Column::DrugName),
        vec!["Aciclovir", "Ibuprofen", "Cetirizine", "Amoxicillin"]
    );
    Ok(())
}

#[test]
fn test_rank_by_prescriptions_across_ages() -> atc_explorer::Result<()> {
    let rows = drugs(RANKING_CSV)?;
    let request = RankRequest::new(vec![Column::DrugName], Metric::Prescriptions, 2);
    let ranked = request.apply(&rows)?;

    assert_eq!(present(&ranked, Column::DrugName), vec!["Amoxicillin", "Ibuprofen"]);
    assert_eq!(metric(&ranked, Metric::Prescriptions), vec![700, 130]);
    assert_eq!(metric(&ranked, Metric::Publications), vec![8, 6]);

    let bottom = request.ascending().apply(&rows)?;
    assert_eq!(present(&bottom, Column::DrugName), vec!["Aciclovir", "Cetirizine"]);
    Ok(())
}

#[test]
fn test_result_never_exceeds_top_n() -> atc_explorer::Result<()> {
    let rows = drugs(SMR_CSV)?;
    for top_n in [0, 1, 3, 100] {
        let ranked = aggregate_and_rank(
            &rows,
            &[Column::DrugName, Column::AgeGroup],
            Metric::Publications,
            top_n,
            true,
        )?;
        assert_eq!(ranked.num_rows(), top_n.min(rows.num_rows()));
    }
    Ok(())
}

#[test]
fn test_metric_is_not_a_group_key() {
    let rows = drugs(RANKING_CSV).unwrap();
    let err = group_sum(&rows, &[Column::Publications]).unwrap_err();
    assert!(matches!(err, ExplorerError::Schema(_)));

    let err = group_sum(&rows, &[Column::L1Code]).unwrap_err();
    assert!(matches!(err, ExplorerError::Schema(_)));
}
