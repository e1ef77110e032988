//! Integration test: frozen feature pipeline

mod common;

use churnpipe::data::ChurnDataset;
use churnpipe::error::ChurnError;
use churnpipe::preprocessing::{
    ChurnPreprocessor, ImputeStrategy, PreprocessingConfig, UnknownCategoryPolicy,
};
use churnpipe::training::{TrainEngine, TrainingConfig};
use polars::prelude::*;

fn fitted_on(df: &DataFrame) -> ChurnPreprocessor {
    let mut preprocessor = ChurnPreprocessor::new(PreprocessingConfig::default());
    preprocessor.fit(df).unwrap();
    preprocessor
}

fn column_index(preprocessor: &ChurnPreprocessor, name: &str) -> usize {
    preprocessor
        .feature_names()
        .unwrap()
        .iter()
        .position(|n| n == name)
        .unwrap()
}

#[test]
fn test_feature_order() {
    let preprocessor = fitted_on(&common::churn_frame(60));
    assert_eq!(
        preprocessor.feature_names().unwrap(),
        &[
            "CreditScore",
            "Gender",
            "Age",
            "Tenure",
            "Balance",
            "NumOfProducts",
            "HasCrCard",
            "IsActiveMember",
            "EstimatedSalary",
            "Geography_France",
            "Geography_Germany",
            "Geography_Spain",
        ]
    );
}

#[test]
fn test_statistics_ignore_test_partition() {
    let rows = common::customers(200);
    let dataset = ChurnDataset::from_frame(&common::to_frame(&rows), "Exited").unwrap();
    let partition = dataset.split(0.2, 42).unwrap();

    // Rewrite every held-out row; the split only depends on the row count
    let mut perturbed = rows.clone();
    for &i in &partition.test_indices {
        let c = &mut perturbed[i];
        c.credit_score = Some(10.0);
        c.age = c.age * 10.0;
        c.balance = 9_999_999.0;
        c.estimated_salary = 0.0;
        c.geography = "Italy".to_string();
    }

    let config = TrainingConfig::default().with_n_estimators(10);
    let engine = TrainEngine::new(config);
    let clean = engine.train_frame(&common::to_frame(&rows)).unwrap();
    let dirty = engine.train_frame(&common::to_frame(&perturbed)).unwrap();

    assert_eq!(clean.preprocessor, dirty.preprocessor);
    assert_eq!(clean.model, dirty.model);
    assert_eq!(dirty.test_transform.unknown.len(), partition.test_indices.len());
}

#[test]
fn test_refit_replaces_statistics() {
    let rows = common::customers(100);
    let mut preprocessor = fitted_on(&common::to_frame(&rows[..50]));
    let first = preprocessor.scalers().unwrap().clone();
    preprocessor.fit(&common::to_frame(&rows[50..])).unwrap();
    assert_ne!(preprocessor.scalers().unwrap(), &first);
}

#[test]
fn test_scaling_maps_training_extremes() {
    let df = common::churn_frame(120);
    let preprocessor = fitted_on(&df);
    let scalers = preprocessor.scalers().unwrap();

    let balance = scalers.minmax.params("Balance").unwrap();
    assert_eq!(scalers.minmax.scale_value("Balance", balance.data_min).unwrap(), 0.0);
    assert_eq!(scalers.minmax.scale_value("Balance", balance.data_max).unwrap(), 1.0);

    let age = scalers.robust.params("Age").unwrap();
    assert_eq!(scalers.robust.scale_value("Age", age.center).unwrap(), 0.0);

    // The transformed training matrix spans exactly [0, 1] on min-max columns
    let output = preprocessor.transform(&df, UnknownCategoryPolicy::Reject).unwrap();
    for name in ["Balance", "EstimatedSalary"] {
        let column = output.features.column(column_index(&preprocessor, name));
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0, "{} min", name);
        assert_eq!(max, 1.0, "{} max", name);
    }
}

#[test]
fn test_missing_credit_score_is_imputed_with_training_mean() {
    let rows = common::customers(50);
    let df = common::to_frame(&rows);
    let preprocessor = fitted_on(&df);

    let present: Vec<f64> = rows.iter().filter_map(|c| c.credit_score).collect();
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let fill = preprocessor.imputer().unwrap().fill_value("CreditScore").unwrap();
    assert!((fill - mean).abs() < 1e-9);

    let output = preprocessor.transform(&df, UnknownCategoryPolicy::Reject).unwrap();
    let missing = rows.iter().filter(|c| c.credit_score.is_none()).count();
    assert_eq!(output.report.imputed, vec![("CreditScore".to_string(), missing)]);
    assert!(output.features.iter().all(|v| v.is_finite()));
}

#[test]
fn test_unimputed_null_fails_transform() {
    let mut rows = common::customers(30);
    let df = common::to_frame(&rows);
    let preprocessor = fitted_on(&df);

    rows[0].age = f64::NAN;
    let err = preprocessor
        .transform(&common::to_frame(&rows[..1]), UnknownCategoryPolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, ChurnError::ValidationError(_)));
}

#[test]
fn test_median_imputation_config() {
    let config = PreprocessingConfig::default().with_imputation("Age", ImputeStrategy::Median);
    let mut rows = common::customers(40);
    rows[3].age = f64::NAN;
    let df = common::to_frame(&rows);

    let mut preprocessor = ChurnPreprocessor::new(config);
    let output = preprocessor.fit_transform(&df).unwrap();
    assert!(output.report.imputed.iter().any(|(c, n)| c == "Age" && *n == 1));
}

#[test]
fn test_unseen_geography_is_all_zero() {
    let mut rows = common::customers(60);
    let preprocessor = fitted_on(&common::to_frame(&rows));
    let width = preprocessor.feature_names().unwrap().len();

    rows[0].geography = "Italy".to_string();
    let frame = common::to_frame(&rows[..1]);

    let output = preprocessor.transform(&frame, UnknownCategoryPolicy::Fallback).unwrap();
    assert_eq!(output.features.ncols(), width);
    for name in ["Geography_France", "Geography_Germany", "Geography_Spain"] {
        assert_eq!(output.features[[0, column_index(&preprocessor, name)]], 0.0);
    }
    assert_eq!(output.report.unknown.len(), 1);
    assert_eq!(output.report.unknown[0].value, "Italy");

    let err = preprocessor
        .transform(&frame, UnknownCategoryPolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, ChurnError::UnknownCategory { .. }));
}

#[test]
fn test_unseen_gender_rejected_under_both_policies() {
    let mut rows = common::customers(60);
    let preprocessor = fitted_on(&common::to_frame(&rows));

    rows[0].gender = "Other".to_string();
    let frame = common::to_frame(&rows[..1]);
    for policy in [UnknownCategoryPolicy::Reject, UnknownCategoryPolicy::Fallback] {
        let err = preprocessor.transform(&frame, policy).unwrap_err();
        assert!(matches!(err, ChurnError::UnknownCategory { ref column, .. } if column == "Gender"));
    }
}

#[test]
fn test_constant_onehot_column_in_partition() {
    let mut rows = common::customers(30);
    for c in &mut rows {
        c.geography = "France".to_string();
    }
    let preprocessor = fitted_on(&common::to_frame(&rows));
    assert_eq!(
        preprocessor.encoders().unwrap().onehot[0].categories(),
        &["France".to_string()]
    );
}

#[test]
fn test_prune_absent_column_is_noop() {
    let df = common::churn_frame(20);
    let mut dataset = ChurnDataset::from_frame(&df, "Exited").unwrap();
    let before = dataset.inputs().width();

    let removed = dataset.drop_columns(&["Unnamed: 0", "id"]).unwrap();
    assert!(removed.is_empty());
    assert_eq!(dataset.inputs().width(), before);

    let removed = dataset.drop_columns(&["Surname", "NotAColumn"]).unwrap();
    assert_eq!(removed, vec!["Surname".to_string()]);
    assert_eq!(dataset.inputs().width(), before - 1);
}

#[test]
fn test_unfitted_transform() {
    let preprocessor = ChurnPreprocessor::default();
    let result = preprocessor.transform(&common::churn_frame(5), UnknownCategoryPolicy::Reject);
    assert!(matches!(result, Err(ChurnError::ModelNotFitted)));
}
