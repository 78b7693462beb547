//! Entity profiles: everything that differs between one upload type and another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{headers::AliasTable, reference::ReferenceRule, uniqueness::IdentityRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Registry key, e.g. `salesman`.
    pub label: String,
    /// Human name used in summary messages.
    pub display_name: String,
    /// Table whose catalog entry defines the schema.
    pub table: String,
    /// Table name written into generated `INSERT` statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    /// Headers the upload must carry even when the target column is nullable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceRule>,
}

impl EntityProfile {
    pub fn insert_table(&self) -> &str {
        self.insert_table.as_deref().unwrap_or(&self.table)
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(self.aliases.iter())
    }

    /// File stem used when naming the clean-path script.
    pub fn script_stem(&self) -> String {
        format!("{}_inserts", self.label.replace('-', "_"))
    }

    pub fn salesman() -> Self {
        Self {
            label: "salesman".to_string(),
            display_name: "Salesman".to_string(),
            table: "salesmen".to_string(),
            insert_table: Some("Salesmen".to_string()),
            skip_columns: strings(&["SalesmanKey", "UniqueID", "LastModifiedUTC", "SalesmenGUID"]),
            aliases: pairs(&[
                ("salesperson id", "id"),
                ("first name", "firstname"),
                ("last name", "lastname"),
            ]),
            required_headers: Vec::new(),
            identity: Some(IdentityRule {
                field: "id".to_string(),
                label: "Salesman ID".to_string(),
                existing_query: Some("SELECT id FROM salesmen".to_string()),
                unique_in_batch: true,
            }),
            name_fields: strings(&["firstname", "lastname"]),
            references: Vec::new(),
        }
    }

    pub fn customer_classification() -> Self {
        Self {
            label: "customer-classification".to_string(),
            display_name: "Customer classification".to_string(),
            table: "CustClass".to_string(),
            insert_table: None,
            skip_columns: strings(&["CustClassKey", "MasterClassNamesKey"]),
            aliases: pairs(&[
                ("customerid", "growid"),
                ("customer id", "growid"),
                ("classification name", "classificationname"),
            ]),
            required_headers: strings(&["growid", "classificationname"]),
            identity: None,
            name_fields: Vec::new(),
            references: vec![
                ReferenceRule::Membership {
                    field: "growid".to_string(),
                    label: "GrowID".to_string(),
                    query: "SELECT growid FROM grower".to_string(),
                },
                ReferenceRule::JoinedLookup {
                    field: "classificationname".to_string(),
                    query: "SELECT DISTINCT M.ClassName FROM MasterClassNames M \
                            INNER JOIN CustClass C ON C.MasterClassNamesKey = M.MasterClassNamesKey"
                        .to_string(),
                },
            ],
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::salesman(), Self::customer_classification()]
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn pairs(values: &[(&str, &str)]) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
