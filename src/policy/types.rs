use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::policy::constraint::{Constraint, FieldPath, Pattern, ALL_CTS};
use crate::policy::errors::PolicyError;

// ---------- Wire (external) role document ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// `"all"` or an explicit list, used for policy actions and role permissions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Grant {
    All,
    #[default]
    None,
    List(Vec<String>),
    /// A bare word other than `"all"`; kept as received and never granted.
    Other(String),
}

impl Grant {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Grant::List(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Grant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grant::All => serializer.serialize_str("all"),
            Grant::None => Vec::<String>::new().serialize(serializer),
            Grant::List(items) => items.serialize(serializer),
            Grant::Other(word) => serializer.serialize_str(word),
        }
    }
}

impl<'de> Deserialize<'de> for Grant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Word(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Word(word) if word == "all" => Ok(Grant::All),
            Raw::Word(word) => Ok(Grant::Other(word)),
            Raw::List(items) if items.is_empty() => Ok(Grant::None),
            Raw::List(items) => Ok(Grant::List(items)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub content_model: Grant,
    #[serde(default)]
    pub content_delivery: Grant,
    #[serde(default)]
    pub settings: Grant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub effect: Effect,
    pub actions: Grant,
    pub constraint: Constraint,
}

impl Policy {
    pub fn to_value(&self) -> Value {
        json!({
            "effect": self.effect,
            "actions": self.actions,
            "constraint": self.constraint,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "type", default = "default_role_type")]
    pub kind: String,
}

fn default_role_type() -> String {
    "Role".to_string()
}

impl Default for RoleSys {
    fn default() -> Self {
        Self {
            id: None,
            version: None,
            kind: default_role_type(),
        }
    }
}

/// A role as persisted by the remote repository.
///
/// The policies are kept twice: typed for translation, and as the JSON that
/// was received. Serializing writes the received JSON back when present so
/// keys this crate does not model survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRoleDocument", into = "WireRoleDocument")]
pub struct RoleDocument {
    pub sys: RoleSys,
    pub name: String,
    pub description: String,
    pub permissions: Permissions,
    /// `None` when stored raw JSON could not be parsed back.
    pub policies: Option<Vec<Policy>>,
    /// Policies exactly as received; `None` for documents built in memory.
    pub raw_policies: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct WireRoleDocument {
    #[serde(default)]
    sys: RoleSys,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: Permissions,
    policies: Option<Value>,
}

impl TryFrom<WireRoleDocument> for RoleDocument {
    type Error = serde_json::Error;

    fn try_from(wire: WireRoleDocument) -> Result<Self, Self::Error> {
        let raw_policies = wire.policies.filter(|value| !value.is_null());
        let policies = raw_policies
            .clone()
            .map(serde_json::from_value::<Vec<Policy>>)
            .transpose()?;
        Ok(Self {
            sys: wire.sys,
            name: wire.name,
            description: wire.description,
            permissions: wire.permissions,
            policies,
            raw_policies,
        })
    }
}

impl From<RoleDocument> for WireRoleDocument {
    fn from(doc: RoleDocument) -> Self {
        let policies = match doc.raw_policies {
            Some(raw) => Some(raw),
            None => doc.policies.map(|policies| {
                Value::Array(policies.iter().map(Policy::to_value).collect())
            }),
        };
        Self {
            sys: doc.sys,
            name: doc.name,
            description: doc.description,
            permissions: doc.permissions,
            policies,
        }
    }
}

impl RoleDocument {
    /// A document whose policies could not be rebuilt must not be sent to
    /// the repository.
    pub fn ensure_savable(&self) -> Result<(), PolicyError> {
        if self.policies.is_none() {
            return Err(PolicyError::UnsavablePolicies {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Input to `PolicyEngine::set_membership`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub roles: Vec<RoleDocument>,
}

// ---------- Normalized (internal) rule model ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Entry,
    Asset,
}

impl EntityKind {
    /// Value of `sys.type` on the wire.
    pub fn sys_type(self) -> &'static str {
        match self {
            EntityKind::Entry => "Entry",
            EntityKind::Asset => "Asset",
        }
    }

    pub fn from_sys_type(value: &str) -> Option<Self> {
        match value {
            "Entry" => Some(EntityKind::Entry),
            "Asset" => Some(EntityKind::Asset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Any,
    /// Only entities created by the acting user.
    User,
}

/// Internal action. `Publish` and `Archive` stand for their glued pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    All,
    Read,
    Create,
    Update,
    Delete,
    Publish,
    Archive,
    /// Token this client does not know; never grants anything.
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::All => "all",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Publish => "publish",
            Action::Archive => "archive",
            Action::Other(token) => token,
        }
    }

    /// Known wire tokens that map one-to-one onto an internal action.
    pub fn from_wire(token: &str) -> Option<Self> {
        match token {
            "all" => Some(Action::All),
            "read" => Some(Action::Read),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    /// Wire tokens belonging to a glued pair, mapped to the pair's action.
    pub fn glued_from_wire(token: &str) -> Option<Self> {
        match token {
            "publish" | "unpublish" => Some(Action::Publish),
            "archive" | "unarchive" => Some(Action::Archive),
            _ => None,
        }
    }

    /// Both wire tokens of a glued action.
    pub fn glued_pair(&self) -> Option<[&'static str; 2]> {
        match self {
            Action::Publish => Some(["publish", "unpublish"]),
            Action::Archive => Some(["archive", "unarchive"]),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> Grant {
        match self {
            Action::All => Grant::All,
            other => match other.glued_pair() {
                Some(pair) => Grant::list(pair),
                None => Grant::list([other.as_str()]),
            },
        }
    }

    /// Whether this client understands the action.
    pub fn is_known(&self) -> bool {
        !matches!(self, Action::Other(_))
    }

    /// Whether the action lets a user modify content.
    pub fn grants_update(&self) -> bool {
        matches!(self, Action::Update | Action::All)
    }

    fn from_internal(name: &str) -> Self {
        match name {
            "publish" => Action::Publish,
            "archive" => Action::Archive,
            other => Action::from_wire(other).unwrap_or_else(|| Action::Other(other.to_string())),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Action::from_internal(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub action: Action,
    pub entity: EntityKind,
    pub content_type: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Set for path-scoped rules only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FieldPath>,
    #[serde(default)]
    pub scope: Scope,
}

impl Rule {
    pub fn new(action: Action, entity: EntityKind) -> Self {
        Self {
            action,
            entity,
            content_type: ALL_CTS,
            entity_id: None,
            path: None,
            scope: Scope::Any,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Pattern::exact(content_type);
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_path(mut self, field: Pattern, locale: Pattern) -> Self {
        self.path = Some(FieldPath::new(field, locale));
        self
    }

    pub fn owned_only(mut self) -> Self {
        self.scope = Scope::User;
        self
    }

    pub fn field(&self) -> Option<&Pattern> {
        self.path.as_ref().map(|p| &p.field)
    }

    pub fn locale(&self) -> Option<&Pattern> {
        self.path.as_ref().map(|p| &p.locale)
    }

    pub fn is_path_scoped(&self) -> bool {
        self.path.is_some()
    }

    /// Whether this rule grants/denies editing `field_id` in `locale_code`.
    pub fn covers_field_locale(&self, field_id: &str, locale_code: &str) -> bool {
        self.action.grants_update()
            && self
                .path
                .as_ref()
                .map_or(true, |path| path.covers(field_id, locale_code))
    }
}

/// Ordered allow/deny rules for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub allowed: Vec<Rule>,
    #[serde(default)]
    pub denied: Vec<Rule>,
}

impl RuleSet {
    pub fn push(&mut self, effect: Effect, rule: Rule) {
        match effect {
            Effect::Allow => self.allowed.push(rule),
            Effect::Deny => self.denied.push(rule),
        }
    }

    pub fn get(&self, effect: Effect) -> &[Rule] {
        match effect {
            Effect::Allow => &self.allowed,
            Effect::Deny => &self.denied,
        }
    }

    /// Iterate `(effect, rule)` pairs, allowed rules first.
    pub fn iter(&self) -> impl Iterator<Item = (Effect, &Rule)> {
        self.allowed
            .iter()
            .map(|r| (Effect::Allow, r))
            .chain(self.denied.iter().map(|r| (Effect::Deny, r)))
    }

    /// Keep rules matching `keep`; returns how many were dropped.
    pub fn retain(&mut self, keep: impl Fn(&Rule) -> bool) -> usize {
        let before = self.len();
        self.allowed.retain(|r| keep(r));
        self.denied.retain(|r| keep(r));
        before - self.len()
    }

    pub fn extend(&mut self, other: RuleSet) {
        self.allowed.extend(other.allowed);
        self.denied.extend(other.denied);
    }

    pub fn len(&self) -> usize {
        self.allowed.len() + self.denied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized form of a [`RoleDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Permissions,
    pub ui_compatible: bool,
    /// Raw policies JSON, kept only when `ui_compatible` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_string: Option<String>,
    #[serde(default)]
    pub entries: RuleSet,
    #[serde(default)]
    pub assets: RuleSet,
}

impl InternalRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            version: None,
            name: name.into(),
            description: String::new(),
            permissions: Permissions::default(),
            ui_compatible: true,
            policy_string: None,
            entries: RuleSet::default(),
            assets: RuleSet::default(),
        }
    }

    pub fn rules(&self, entity: EntityKind) -> &RuleSet {
        match entity {
            EntityKind::Entry => &self.entries,
            EntityKind::Asset => &self.assets,
        }
    }

    pub fn rules_mut(&mut self, entity: EntityKind) -> &mut RuleSet {
        match entity {
            EntityKind::Entry => &mut self.entries,
            EntityKind::Asset => &mut self.assets,
        }
    }

    /// Add a rule to the collection matching its entity kind.
    pub fn push(&mut self, effect: Effect, rule: Rule) {
        self.rules_mut(rule.entity).push(effect, rule);
    }

    pub fn rule_count(&self) -> usize {
        self.entries.len() + self.assets.len()
    }
}

// ---------- Catalog summaries ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeSummary {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSummary {
    pub code: String,
}
