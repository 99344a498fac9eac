//! Authorization (§4.7.2): a Dataset is visible only if its parent Research
//! is visible, so both search entry points resolve visibility at the
//! Research level first.

use std::collections::BTreeSet;

use common::{HumId, Research, Status};

#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self { user_id: None, is_admin: true }
    }

    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), is_admin: false }
    }
}

/// Whether `research` is visible to `principal`. `include_deleted` only
/// widens visibility for admins who explicitly asked for deleted records.
pub fn is_research_visible(research: &Research, principal: &Principal, include_deleted: bool) -> bool {
    if principal.is_admin {
        return include_deleted || research.status != Status::Deleted;
    }

    if research.status == Status::Published {
        return true;
    }

    match &principal.user_id {
        Some(user_id) => research.uids.iter().any(|uid| uid == user_id),
        None => false,
    }
}

/// Resolves the accessible humId set for a principal out of every Research
/// record in the store (§4.7.2). Returns an empty set rather than erroring
/// when nothing is visible — callers must short-circuit before querying
/// datasets.
pub fn accessible_hum_ids<'a>(
    researches: impl IntoIterator<Item = &'a Research>,
    principal: &Principal,
    include_deleted: bool,
) -> BTreeSet<HumId> {
    researches
        .into_iter()
        .filter(|research| is_research_visible(research, principal, include_deleted))
        .map(|research| research.hum_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BilingualText, BilingualTextValue, HumVersionId};

    fn research(hum_id: &str, status: Status, uids: Vec<&str>) -> Research {
        let hum_id: HumId = hum_id.parse().unwrap();
        Research {
            hum_id: hum_id.clone(),
            url: BilingualText::default(),
            title: BilingualText::default(),
            summary: BilingualTextValue::default(),
            data_provider: Vec::new(),
            research_project: Vec::new(),
            grant: Vec::new(),
            related_publication: Vec::new(),
            controlled_access_user: Vec::new(),
            version_ids: vec![HumVersionId::new(hum_id.clone(), 1)],
            latest_version: HumVersionId::new(hum_id, 1),
            first_release_date: None,
            last_release_date: None,
            status,
            uids: uids.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn anonymous_sees_only_published() {
        let anon = Principal::anonymous();
        assert!(is_research_visible(&research("hum0001", Status::Published, vec![]), &anon, false));
        assert!(!is_research_visible(&research("hum0001", Status::Draft, vec![]), &anon, false));
    }

    #[test]
    fn authenticated_non_admin_also_sees_own_drafts() {
        let user = Principal::authenticated("user-42");
        assert!(is_research_visible(&research("hum0001", Status::Draft, vec!["user-42"]), &user, false));
        assert!(!is_research_visible(&research("hum0001", Status::Draft, vec!["someone-else"]), &user, false));
    }

    #[test]
    fn admin_sees_everything_except_deleted_unless_requested() {
        let admin = Principal::admin();
        assert!(is_research_visible(&research("hum0001", Status::Draft, vec![]), &admin, false));
        assert!(!is_research_visible(&research("hum0001", Status::Deleted, vec![]), &admin, false));
        assert!(is_research_visible(&research("hum0001", Status::Deleted, vec![]), &admin, true));
    }

    #[test]
    fn accessible_hum_ids_filters_the_full_set() {
        let researches = vec![
            research("hum0001", Status::Published, vec![]),
            research("hum0002", Status::Draft, vec![]),
        ];
        let ids = accessible_hum_ids(&researches, &Principal::anonymous(), false);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&"hum0001".parse::<HumId>().unwrap()));
    }
}
