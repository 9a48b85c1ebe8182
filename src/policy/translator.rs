//! Translation between wire role documents and the normalized rule model.
//!
//! Only a narrow constraint shape maps onto rules: an `and` whose first child
//! pins `sys.type`, followed by at most one content-type, entity-id,
//! created-by and paths node. A role with any policy outside that shape keeps
//! its raw policies JSON and contributes no rules.

use crate::policy::constraint::{
    Constraint, FieldPath, Pattern, CONTENT_TYPE_PATH, CREATED_BY_PATH, CURRENT_USER,
    ENTITY_ID_PATH, SYS_TYPE_PATH,
};
use crate::policy::types::*;
use serde_json::Value;

/// Normalize a wire role into allow/deny rule collections.
pub fn to_internal(external: &RoleDocument) -> InternalRole {
    let mut role = InternalRole::new(external.name.clone());
    role.id = external.sys.id.clone();
    role.version = external.sys.version;
    role.description = external.description.clone();
    role.permissions = external.permissions.clone();

    let Some(policies) = &external.policies else {
        return role;
    };

    for (index, policy) in policies.iter().enumerate() {
        let Some(rules) = translate_policy(policy) else {
            tracing::debug!(
                role = %external.name,
                policy = index,
                "policy shape not representable as rules, keeping raw JSON"
            );
            role.ui_compatible = false;
            role.policy_string = match &external.raw_policies {
                Some(raw) => serde_json::to_string(raw).ok(),
                None => serde_json::to_string(policies).ok(),
            };
            role.entries = RuleSet::default();
            role.assets = RuleSet::default();
            return role;
        };
        for rule in rules {
            role.push(policy.effect, rule);
        }
    }

    role
}

/// Rebuild the wire document for a normalized role.
pub fn to_external(internal: &InternalRole) -> RoleDocument {
    let (policies, raw_policies) = if internal.ui_compatible {
        let rules: Vec<Policy> = internal
            .entries
            .iter()
            .chain(internal.assets.iter())
            .map(|(effect, rule)| rule_to_policy(effect, rule))
            .collect();
        (Some(rules), None)
    } else {
        match internal.policy_string.as_deref().map(parse_policy_string) {
            Some(Ok((policies, raw))) => (Some(policies), Some(raw)),
            Some(Err(e)) => {
                tracing::warn!(role = %internal.name, error = %e, "stored policy JSON is invalid");
                (None, None)
            }
            None => (None, None),
        }
    };

    RoleDocument {
        sys: RoleSys {
            id: internal.id.clone(),
            version: internal.version,
            ..RoleSys::default()
        },
        name: internal.name.clone(),
        description: internal.description.clone(),
        permissions: internal.permissions.clone(),
        policies,
        raw_policies,
    }
}

fn parse_policy_string(raw: &str) -> Result<(Vec<Policy>, Value), serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    let policies = serde_json::from_value(value.clone())?;
    Ok((policies, value))
}

/// Whether every policy of the document maps losslessly onto rules.
pub fn is_ui_compatible(external: &RoleDocument) -> bool {
    external
        .policies
        .iter()
        .flatten()
        .all(|policy| translate_policy(policy).is_some())
}

fn translate_policy(policy: &Policy) -> Option<Vec<Rule>> {
    let template = parse_constraint(&policy.constraint)?;
    let actions = expand_actions(&policy.actions)?;
    Some(
        actions
            .into_iter()
            .map(|action| Rule {
                action,
                ..template.clone()
            })
            .collect(),
    )
}

/// Parse a constraint into a rule template (action left as `All`).
fn parse_constraint(constraint: &Constraint) -> Option<Rule> {
    let Constraint::And(children) = constraint else {
        return None;
    };
    let (first, rest) = children.split_first()?;
    let entity = match first {
        Constraint::Equals { path, value } if path == SYS_TYPE_PATH => {
            EntityKind::from_sys_type(value)?
        }
        _ => return None,
    };

    let mut rule = Rule::new(Action::All, entity);
    let mut seen = Seen::default();

    for child in rest {
        match child {
            Constraint::Equals { path, value } if path == CONTENT_TYPE_PATH => {
                claim(&mut seen.content_type)?;
                rule.content_type = Pattern::exact(value.as_str());
            }
            Constraint::Equals { path, value } if path == ENTITY_ID_PATH => {
                claim(&mut seen.entity_id)?;
                rule.entity_id = Some(value.clone());
            }
            Constraint::Equals { path, value } if path == CREATED_BY_PATH => {
                claim(&mut seen.scope)?;
                if value != CURRENT_USER {
                    return None;
                }
                rule.scope = Scope::User;
            }
            Constraint::Paths { path } => {
                claim(&mut seen.path)?;
                rule.path = Some(FieldPath::parse(path)?);
            }
            _ => return None,
        }
    }

    Some(rule)
}

#[derive(Default)]
struct Seen {
    content_type: bool,
    entity_id: bool,
    scope: bool,
    path: bool,
}

/// Each optional constraint node may appear once.
fn claim(flag: &mut bool) -> Option<()> {
    if *flag {
        return None;
    }
    *flag = true;
    Some(())
}

/// Expand wire actions into internal actions, collapsing glued pairs.
fn expand_actions(actions: &Grant) -> Option<Vec<Action>> {
    let tokens = match actions {
        Grant::All => return Some(vec![Action::All]),
        Grant::None => return None,
        Grant::Other(_) => return None,
        Grant::List(tokens) if tokens.is_empty() => return None,
        Grant::List(tokens) => tokens,
    };

    let mut expanded: Vec<Action> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let action = if let Some(glued) = Action::glued_from_wire(token) {
            // in a multi-action list both halves of the pair must be present
            let pair = glued.glued_pair()?;
            if tokens.len() > 1 && !pair.iter().all(|half| tokens.iter().any(|t| t == half)) {
                return None;
            }
            glued
        } else if let Some(known) = Action::from_wire(token) {
            known
        } else if tokens.len() == 1 {
            Action::Other(token.clone())
        } else {
            return None;
        };

        if !expanded.contains(&action) {
            expanded.push(action);
        }
    }
    Some(expanded)
}

fn rule_to_policy(effect: Effect, rule: &Rule) -> Policy {
    let mut children = vec![Constraint::equals(SYS_TYPE_PATH, rule.entity.sys_type())];
    if let Some(content_type) = rule.content_type.as_exact() {
        children.push(Constraint::equals(CONTENT_TYPE_PATH, content_type));
    }
    if let Some(entity_id) = &rule.entity_id {
        children.push(Constraint::equals(ENTITY_ID_PATH, entity_id.as_str()));
    }
    if rule.scope == Scope::User {
        children.push(Constraint::equals(CREATED_BY_PATH, CURRENT_USER));
    }
    if let Some(path) = &rule.path {
        children.push(Constraint::paths(path));
    }

    Policy {
        effect,
        actions: rule.action.to_wire(),
        constraint: Constraint::And(children),
    }
}
