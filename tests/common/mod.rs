//! Shared fixtures for the integration tests
#![allow(dead_code)]

use churnpipe::data::RawRecord;
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

pub const GEOGRAPHIES: [&str; 3] = ["France", "Germany", "Spain"];

/// One raw customer row, including the identifier columns
#[derive(Debug, Clone)]
pub struct Customer {
    pub row_number: i64,
    pub customer_id: i64,
    pub surname: String,
    pub credit_score: Option<f64>,
    pub geography: String,
    pub gender: String,
    pub age: f64,
    pub tenure: i64,
    pub balance: f64,
    pub num_of_products: i64,
    pub has_cr_card: i64,
    pub is_active_member: i64,
    pub estimated_salary: f64,
    pub exited: i64,
}

/// Churn rule of the fixture: older customers, and inactive customers holding
/// many products, leave
pub fn churns(age: f64, is_active_member: i64, num_of_products: i64) -> bool {
    age >= 50.0 || (is_active_member == 0 && num_of_products >= 3)
}

/// Deterministic customers; every tenth credit score is missing
pub fn customers(n: usize) -> Vec<Customer> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    (0..n)
        .map(|i| {
            let age = rng.gen_range(18..=80) as f64;
            let is_active_member = rng.gen_range(0..=1);
            let num_of_products = rng.gen_range(1..=4);
            let balance = if rng.gen_bool(0.3) {
                0.0
            } else {
                (rng.gen_range(10_000.0..200_000.0_f64) * 100.0).round() / 100.0
            };
            Customer {
                row_number: i as i64 + 1,
                customer_id: 15_600_000 + i as i64,
                surname: format!("Surname{}", i),
                credit_score: if i % 10 == 9 {
                    None
                } else {
                    Some(rng.gen_range(350..=850) as f64)
                },
                geography: GEOGRAPHIES[i % 3].to_string(),
                gender: if rng.gen_bool(0.5) { "Male" } else { "Female" }.to_string(),
                age,
                tenure: rng.gen_range(0..=10),
                balance,
                num_of_products,
                has_cr_card: rng.gen_range(0..=1),
                is_active_member,
                estimated_salary: (rng.gen_range(10_000.0..190_000.0_f64) * 100.0).round() / 100.0,
                exited: i64::from(churns(age, is_active_member, num_of_products)),
            }
        })
        .collect()
}

/// Raw training frame with the dataset's column names
pub fn to_frame(rows: &[Customer]) -> DataFrame {
    df!(
        "RowNumber" => rows.iter().map(|c| c.row_number).collect::<Vec<_>>(),
        "CustomerId" => rows.iter().map(|c| c.customer_id).collect::<Vec<_>>(),
        "Surname" => rows.iter().map(|c| c.surname.as_str()).collect::<Vec<_>>(),
        "CreditScore" => rows.iter().map(|c| c.credit_score).collect::<Vec<_>>(),
        "Geography" => rows.iter().map(|c| c.geography.as_str()).collect::<Vec<_>>(),
        "Gender" => rows.iter().map(|c| c.gender.as_str()).collect::<Vec<_>>(),
        "Age" => rows.iter().map(|c| c.age).collect::<Vec<_>>(),
        "Tenure" => rows.iter().map(|c| c.tenure).collect::<Vec<_>>(),
        "Balance" => rows.iter().map(|c| c.balance).collect::<Vec<_>>(),
        "NumOfProducts" => rows.iter().map(|c| c.num_of_products).collect::<Vec<_>>(),
        "HasCrCard" => rows.iter().map(|c| c.has_cr_card).collect::<Vec<_>>(),
        "IsActiveMember" => rows.iter().map(|c| c.is_active_member).collect::<Vec<_>>(),
        "EstimatedSalary" => rows.iter().map(|c| c.estimated_salary).collect::<Vec<_>>(),
        "Exited" => rows.iter().map(|c| c.exited).collect::<Vec<_>>(),
    )
    .unwrap()
}

pub fn churn_frame(n: usize) -> DataFrame {
    to_frame(&customers(n))
}

/// Serving record for a customer; a missing credit score is not representable
pub fn to_record(c: &Customer) -> Option<RawRecord> {
    Some(RawRecord {
        credit_score: c.credit_score?,
        geography: c.geography.clone(),
        gender: c.gender.clone(),
        age: c.age,
        tenure: c.tenure as f64,
        balance: c.balance,
        num_of_products: c.num_of_products as f64,
        has_cr_card: c.has_cr_card == 1,
        is_active_member: c.is_active_member == 1,
        estimated_salary: c.estimated_salary,
    })
}

/// The reference customer used by the end-to-end scenario
pub fn reference_record() -> RawRecord {
    RawRecord {
        credit_score: 650.0,
        geography: "France".to_string(),
        gender: "Female".to_string(),
        age: 40.0,
        tenure: 5.0,
        balance: 50_000.0,
        num_of_products: 2.0,
        has_cr_card: true,
        is_active_member: true,
        estimated_salary: 60_000.0,
    }
}
