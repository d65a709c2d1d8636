pub mod eligibility;

#[cfg(test)]
mod eligibility_tests;
