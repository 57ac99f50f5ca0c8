use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub stage_id: String,
    pub pipeline_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// The entry stage for newly created deals.
    pub fn first_stage(&self) -> Option<&PipelineStage> {
        self.stages.iter().min_by_key(|stage| stage.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    Company,
    Contact,
}

impl CustomerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Contact => "contact",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "company" => Some(Self::Company),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }
}

/// Result of resolving a free-text customer name against existing records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerMatch {
    pub kind: CustomerKind,
    pub id: String,
    pub name: String,
}

/// Read-only view of existing CRM records, used for dedup matching.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrmSnapshot {
    pub companies: Vec<Company>,
    pub contacts: Vec<Contact>,
    pub pipelines: Vec<Pipeline>,
}

impl CrmSnapshot {
    /// Resolves a free-text customer name: exact match on companies first,
    /// then contacts, then substring containment in either direction.
    /// Paraphrased names ("Acme" for "Acme Corp") still hit the existing
    /// record instead of spawning a duplicate.
    pub fn match_customer(&self, name: &str) -> Option<CustomerMatch> {
        let needle = normalize(name);
        if needle.is_empty() {
            return None;
        }

        let company = |company: &Company| CustomerMatch {
            kind: CustomerKind::Company,
            id: company.id.clone(),
            name: company.name.clone(),
        };
        let contact = |c: &Contact| CustomerMatch {
            kind: CustomerKind::Contact,
            id: c.id.clone(),
            name: c.display_name(),
        };

        if let Some(hit) = self.companies.iter().find(|c| normalize(&c.name) == needle) {
            return Some(company(hit));
        }
        if let Some(hit) = self.contacts.iter().find(|c| normalize(&c.display_name()) == needle) {
            return Some(contact(hit));
        }
        if let Some(hit) = self
            .companies
            .iter()
            .find(|c| contains_either_way(&normalize(&c.name), &needle))
        {
            return Some(company(hit));
        }
        self.contacts
            .iter()
            .find(|c| contains_either_way(&normalize(&c.display_name()), &needle))
            .map(|hit| contact(hit))
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn contains_either_way(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Splits a free-text person name into (first, last) tokens: first token
/// becomes the first name, the remainder joins into the last name.
pub fn split_contact_name(name: &str) -> (String, String) {
    let mut tokens = name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let last = tokens.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CrmSnapshot {
        CrmSnapshot {
            companies: vec![Company {
                id: "co-1".to_string(),
                name: "Acme Corporation".to_string(),
                email: None,
                phone: None,
                website: None,
            }],
            contacts: vec![Contact {
                id: "ct-1".to_string(),
                first_name: "Dana".to_string(),
                last_name: "Reyes".to_string(),
                email: Some("dana@acme.example".to_string()),
                phone: None,
                company_id: Some("co-1".to_string()),
            }],
            pipelines: Vec::new(),
        }
    }

    #[test]
    fn exact_company_match_wins_over_contact_substring() {
        let matched = snapshot().match_customer("acme corporation").expect("match");
        assert_eq!(matched.kind, CustomerKind::Company);
        assert_eq!(matched.id, "co-1");
    }

    #[test]
    fn paraphrased_company_name_matches_by_containment() {
        let matched = snapshot().match_customer("Acme").expect("substring match");
        assert_eq!(matched.id, "co-1");
    }

    #[test]
    fn longer_free_text_matches_contained_record_name() {
        let matched = snapshot().match_customer("Dana Reyes (procurement)").expect("match");
        assert_eq!(matched.kind, CustomerKind::Contact);
        assert_eq!(matched.id, "ct-1");
    }

    #[test]
    fn unknown_and_empty_names_do_not_match() {
        assert_eq!(snapshot().match_customer("Globex"), None);
        assert_eq!(snapshot().match_customer("   "), None);
    }

    #[test]
    fn contact_name_split_uses_first_token_and_remainder() {
        assert_eq!(split_contact_name("Dana Reyes"), ("Dana".to_string(), "Reyes".to_string()));
        assert_eq!(
            split_contact_name("Maria de la Cruz"),
            ("Maria".to_string(), "de la Cruz".to_string())
        );
        assert_eq!(split_contact_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn first_stage_orders_by_position() {
        let pipeline = Pipeline {
            id: "pl-1".to_string(),
            name: "Sales".to_string(),
            stages: vec![
                PipelineStage { id: "st-2".to_string(), name: "Negotiation".to_string(), position: 2 },
                PipelineStage { id: "st-1".to_string(), name: "Qualified".to_string(), position: 1 },
            ],
        };
        assert_eq!(pipeline.first_stage().map(|s| s.id.as_str()), Some("st-1"));
    }
}
