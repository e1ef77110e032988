//! Interactive customer form

use crate::data::{columns, numeric_bounds, RawRecord, GENDERS, GEOGRAPHIES};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

/// Terminal theme shared by every prompt
pub fn theme() -> ColorfulTheme {
    ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    }
}

/// Gather the ten raw fields of one customer
pub fn prompt_record(theme: &ColorfulTheme) -> anyhow::Result<RawRecord> {
    Ok(RawRecord {
        credit_score: number(theme, "Credit score", columns::CREDIT_SCORE, 650.0)?,
        geography: choose(theme, "Geography", &GEOGRAPHIES)?,
        gender: choose(theme, "Gender", &GENDERS)?,
        age: number(theme, "Age", columns::AGE, 40.0)?,
        tenure: number(theme, "Tenure (years)", columns::TENURE, 5.0)?,
        balance: number(theme, "Balance", columns::BALANCE, 0.0)?,
        num_of_products: number(theme, "Number of products", columns::NUM_OF_PRODUCTS, 1.0)?,
        has_cr_card: yes_no(theme, "Has credit card")?,
        is_active_member: yes_no(theme, "Is active member")?,
        estimated_salary: number(theme, "Estimated salary", columns::ESTIMATED_SALARY, 50_000.0)?,
    })
}

fn number(theme: &ColorfulTheme, prompt: &str, column: &str, default: f64) -> anyhow::Result<f64> {
    let (min, max) = numeric_bounds(column).unwrap_or((f64::MIN, f64::MAX));
    let value = Input::<f64>::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .validate_with(move |v: &f64| -> Result<(), String> {
            if v.is_finite() && *v >= min && *v <= max {
                Ok(())
            } else if max == f64::MAX {
                Err(format!("must be at least {}", min))
            } else {
                Err(format!("must be between {} and {}", min, max))
            }
        })
        .interact_text()?;
    Ok(value)
}

fn choose(theme: &ColorfulTheme, prompt: &str, options: &[&str]) -> anyhow::Result<String> {
    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact()?;
    Ok(options[idx].to_string())
}

fn yes_no(theme: &ColorfulTheme, prompt: &str) -> anyhow::Result<bool> {
    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&["Yes", "No"])
        .default(0)
        .interact()?;
    Ok(idx == 0)
}
