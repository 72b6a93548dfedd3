//! Built-in scenario, bundled with the binary

use super::config::Scenario;
use crate::common::{Error, Result};

const DRIVING_SCHOOL: &str = include_str!("../../scenarios/driving_school.yaml");

/// The scenario run when no file is given
pub fn driving_school() -> Result<Scenario> {
    Scenario::parse(DRIVING_SCHOOL)
        .map_err(|e| Error::Internal(format!("Built-in scenario is invalid: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::config::{Requires, Step};

    #[test]
    fn test_builtin_parses() {
        let scenario = driving_school().unwrap();
        assert_eq!(scenario.checks().count(), 13);
    }

    #[test]
    fn test_builtin_has_fallback_login() {
        let scenario = driving_school().unwrap();
        let attempts = scenario
            .steps
            .iter()
            .find_map(|s| match s {
                Step::Authenticate { attempts } => Some(attempts),
                _ => None,
            })
            .unwrap();
        let names: Vec<_> = attempts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Register User", "Login"]);
        assert!(attempts[0].form);
    }

    #[test]
    fn test_builtin_session_steps_follow_authentication() {
        let scenario = driving_school().unwrap();
        let auth_index = scenario
            .steps
            .iter()
            .position(|s| matches!(s, Step::Authenticate { .. }))
            .unwrap();
        for (i, step) in scenario.steps.iter().enumerate() {
            if let Step::Check(check) = step {
                assert_eq!(check.requires == Requires::Session, i > auth_index);
            }
        }
    }
}
