#![allow(dead_code)]

use role_policy::policy::types::{Effect, Grant, Membership, Policy, RoleDocument, RoleSys};
use role_policy::policy::constraint::{
    CONTENT_TYPE_PATH, CREATED_BY_PATH, CURRENT_USER, ENTITY_ID_PATH, SYS_TYPE_PATH,
};
use role_policy::policy::{Constraint, FieldPath};

/// Builder for wire-format policies
pub struct PolicyBuilder {
    effect: Effect,
    actions: Grant,
    children: Vec<Constraint>,
}

impl PolicyBuilder {
    pub fn allow_entries() -> Self {
        Self::new(Effect::Allow, "Entry")
    }

    pub fn deny_entries() -> Self {
        Self::new(Effect::Deny, "Entry")
    }

    pub fn allow_assets() -> Self {
        Self::new(Effect::Allow, "Asset")
    }

    pub fn deny_assets() -> Self {
        Self::new(Effect::Deny, "Asset")
    }

    fn new(effect: Effect, sys_type: &str) -> Self {
        Self {
            effect,
            actions: Grant::All,
            children: vec![Constraint::equals(SYS_TYPE_PATH, sys_type)],
        }
    }

    pub fn actions(mut self, actions: &[&str]) -> Self {
        self.actions = Grant::list(actions.iter().copied());
        self
    }

    pub fn content_type(mut self, id: &str) -> Self {
        self.children.push(Constraint::equals(CONTENT_TYPE_PATH, id));
        self
    }

    pub fn entity_id(mut self, id: &str) -> Self {
        self.children.push(Constraint::equals(ENTITY_ID_PATH, id));
        self
    }

    pub fn own_only(mut self) -> Self {
        self.children
            .push(Constraint::equals(CREATED_BY_PATH, CURRENT_USER));
        self
    }

    /// `path` in the `fields.<field>.<locale>` form, `%` as wildcard.
    pub fn path(mut self, path: &str) -> Self {
        let path = FieldPath::parse(path).expect("Invalid field path in test");
        self.children.push(Constraint::paths(&path));
        self
    }

    pub fn build(self) -> Policy {
        Policy {
            effect: self.effect,
            actions: self.actions,
            constraint: Constraint::And(self.children),
        }
    }
}

/// Builder for role documents
pub struct RoleBuilder {
    name: String,
    id: Option<String>,
    version: Option<u64>,
    policies: Vec<Policy>,
}

impl RoleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            version: None,
            policies: Vec::new(),
        }
    }

    pub fn stored(mut self, id: &str, version: u64) -> Self {
        self.id = Some(id.to_string());
        self.version = Some(version);
        self
    }

    pub fn policy(mut self, policy: PolicyBuilder) -> Self {
        self.policies.push(policy.build());
        self
    }

    pub fn build(self) -> RoleDocument {
        RoleDocument {
            sys: RoleSys {
                id: self.id,
                version: self.version,
                ..RoleSys::default()
            },
            name: self.name,
            description: String::new(),
            permissions: Default::default(),
            policies: Some(self.policies),
            raw_policies: None,
        }
    }
}

/// Builder for memberships
#[derive(Default)]
pub struct MembershipBuilder {
    admin: bool,
    roles: Vec<RoleDocument>,
}

impl MembershipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn role(mut self, role: RoleBuilder) -> Self {
        self.roles.push(role.build());
        self
    }

    pub fn raw_role(mut self, role: RoleDocument) -> Self {
        self.roles.push(role);
        self
    }

    pub fn build(self) -> Membership {
        Membership {
            admin: self.admin,
            roles: self.roles,
        }
    }
}
