use crate::aws::RoleArn;

/// Account-id and role-name filters. An empty list does not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    accounts: Vec<String>,
    roles: Vec<String>,
}

impl Selection {
    pub fn new(accounts: Vec<String>, roles: Vec<String>) -> Self {
        Selection { accounts, roles }
    }

    /// Both filters must match when both are set.
    pub fn includes(&self, arn: &RoleArn) -> bool {
        let account_matches =
            self.accounts.is_empty() || self.accounts.iter().any(|a| a == arn.account_id());
        let role_matches =
            self.roles.is_empty() || self.roles.iter().any(|r| r == arn.role_name());

        account_matches && role_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arns() -> Vec<RoleArn> {
        [
            "arn:aws:iam::111111111111:role/Dev",
            "arn:aws:iam::111111111111:role/Ops",
            "arn:aws:iam::222222222222:role/Dev",
        ]
        .iter()
        .map(|arn| RoleArn::parse(arn).unwrap())
        .collect()
    }

    fn selected(selection: &Selection) -> Vec<String> {
        arns()
            .into_iter()
            .filter(|arn| selection.includes(arn))
            .map(|arn| arn.arn().to_string())
            .collect()
    }

    #[test]
    fn test_no_filters_selects_everything() {
        assert_eq!(selected(&Selection::default()).len(), 3);
    }

    #[test]
    fn test_account_filter() {
        let selection = Selection::new(vec![String::from("111111111111")], vec![]);

        assert_eq!(
            selected(&selection),
            vec![
                "arn:aws:iam::111111111111:role/Dev",
                "arn:aws:iam::111111111111:role/Ops"
            ]
        );
    }

    #[test]
    fn test_role_filter() {
        let selection = Selection::new(vec![], vec![String::from("Dev")]);

        assert_eq!(
            selected(&selection),
            vec![
                "arn:aws:iam::111111111111:role/Dev",
                "arn:aws:iam::222222222222:role/Dev"
            ]
        );
    }

    #[test]
    fn test_both_filters_intersect() {
        let selection = Selection::new(
            vec![String::from("222222222222")],
            vec![String::from("Dev"), String::from("Ops")],
        );

        assert_eq!(selected(&selection), vec!["arn:aws:iam::222222222222:role/Dev"]);
    }

    #[test]
    fn test_role_filter_excludes_non_roles() {
        let user = RoleArn::parse("arn:aws:iam::111111111111:user/bob").unwrap();

        assert!(Selection::default().includes(&user));
        assert!(!Selection::new(vec![], vec![String::from("Dev")]).includes(&user));
    }
}
