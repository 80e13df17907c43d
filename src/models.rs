use clap::ValueEnum;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// How a rule's `condition_value` is compared against a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConditionType {
    Contains,
    Equals,
    Regex,
    #[value(name = "amount_range")]
    AmountRange,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::Regex => "regex",
            Self::AmountRange => "amount_range",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "contains" => Some(Self::Contains),
            "equals" => Some(Self::Equals),
            "regex" => Some(Self::Regex),
            "amount_range" => Some(Self::AmountRange),
            _ => None,
        }
    }
}

/// The transaction text field a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConditionField {
    Description,
    Counterparty,
}

impl ConditionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Counterparty => "counterparty",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "description" => Some(Self::Description),
            "counterparty" => Some(Self::Counterparty),
            _ => None,
        }
    }

    /// Field text, with a missing value read as the empty string.
    pub fn value<'a>(&self, txn: &'a Transaction) -> &'a str {
        let field = match self {
            Self::Description => txn.description.as_deref(),
            Self::Counterparty => txn.counterparty.as_deref(),
        };
        field.unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassificationStatus {
    Pending,
    Classified,
    Manual,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Classified => "classified",
            Self::Manual => "manual",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "classified" => Some(Self::Classified),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl ToSql for ClassificationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ClassificationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Self::parse(raw).ok_or_else(|| {
            FromSqlError::Other(format!("unknown classification status: {raw}").into())
        })
    }
}

/// Category/department/vendor assignment. Each slot is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Targets {
    pub category_id: Option<i64>,
    pub department_id: Option<i64>,
    pub vendor_id: Option<i64>,
}

impl Targets {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.department_id.is_none() && self.vendor_id.is_none()
    }

    /// Copy every non-null slot of `other` over `self`, leaving the rest alone.
    pub fn overlay(&mut self, other: &Targets) {
        if let Some(id) = other.category_id {
            self.category_id = Some(id);
        }
        if let Some(id) = other.department_id {
            self.department_id = Some(id);
        }
        if let Some(id) = other.vendor_id {
            self.vendor_id = Some(id);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub external_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub description: Option<String>,
    pub counterparty: Option<String>,
    pub transaction_date: String,
    pub targets: Targets,
    pub status: ClassificationStatus,
    pub is_active: bool,
    pub split_parent_id: Option<i64>,
}

/// A transaction as entered, before it has an ID or a classification.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub external_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub description: Option<String>,
    pub counterparty: Option<String>,
    pub transaction_date: String,
}

/// A persisted classification rule. The condition triple is kept as stored so
/// rows written with an unsupported type or field still load; such rules
/// simply never match.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub id: i64,
    pub name: String,
    pub priority: i64,
    pub is_active: bool,
    pub condition_type: String,
    pub condition_field: String,
    pub condition_value: String,
    pub targets: Targets,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub priority: i64,
    pub is_active: bool,
    pub condition_type: ConditionType,
    pub condition_field: ConditionField,
    pub condition_value: String,
    pub targets: Targets,
}

/// Partial update for a rule. `Some(None)` on a target clears it.
#[derive(Debug, Clone, Default)]
pub struct RuleChanges {
    pub name: Option<String>,
    pub priority: Option<i64>,
    pub condition_type: Option<ConditionType>,
    pub condition_field: Option<ConditionField>,
    pub condition_value: Option<String>,
    pub category_id: Option<Option<i64>>,
    pub department_id: Option<Option<i64>>,
    pub vendor_id: Option<Option<i64>>,
}

impl RuleChanges {
    pub fn apply_to(&self, rule: &MappingRule) -> MappingRule {
        let mut edited = rule.clone();
        if let Some(name) = &self.name {
            edited.name = name.clone();
        }
        if let Some(priority) = self.priority {
            edited.priority = priority;
        }
        if let Some(kind) = self.condition_type {
            edited.condition_type = kind.as_str().to_string();
        }
        if let Some(field) = self.condition_field {
            edited.condition_field = field.as_str().to_string();
        }
        if let Some(value) = &self.condition_value {
            edited.condition_value = value.clone();
        }
        if let Some(id) = self.category_id {
            edited.targets.category_id = id;
        }
        if let Some(id) = self.department_id {
            edited.targets.department_id = id;
        }
        if let Some(id) = self.vendor_id {
            edited.targets.vendor_id = id;
        }
        edited
    }
}

#[derive(Debug, Clone)]
pub struct AlertSetting {
    pub id: i64,
    pub name: String,
    pub alert_type: String,
    pub condition_type: String,
    pub condition_field: String,
    pub condition_value: String,
    pub severity: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub alert_type: String,
    pub severity: String,
    pub is_read: bool,
    pub related_table: Option<String>,
    pub related_id: Option<i64>,
    pub created_at: String,
}

#[cfg(test)]
impl Transaction {
    pub fn sample(id: i64, amount: f64, description: Option<&str>, counterparty: Option<&str>) -> Self {
        Self {
            id,
            account_id: 1,
            external_id: format!("TXN-{id:06}"),
            amount,
            transaction_type: "debit".to_string(),
            description: description.map(str::to_string),
            counterparty: counterparty.map(str::to_string),
            transaction_date: "2025-03-01 09:00:00".to_string(),
            targets: Targets::default(),
            status: ClassificationStatus::Pending,
            is_active: true,
            split_parent_id: None,
        }
    }
}

#[cfg(test)]
impl MappingRule {
    pub fn sample(
        id: i64,
        priority: i64,
        condition_type: &str,
        condition_field: &str,
        condition_value: &str,
        targets: Targets,
    ) -> Self {
        Self {
            id,
            name: format!("rule {id}"),
            priority,
            is_active: true,
            condition_type: condition_type.to_string(),
            condition_field: condition_field.to_string(),
            condition_value: condition_value.to_string(),
            targets,
        }
    }
}
