//! Deal naming: corporate email domain first, founder-scoped name otherwise.

use dealscout_extract::domain;
use dealscout_shared::EntityRecord;

/// Canonical CRM organization name for `record`.
///
/// `jane@acme.io` gives `"Acme"`; a personal-provider address or no address
/// gives `"{founder_name}'s Company"`.
pub fn derive_deal_name(record: &EntityRecord, personal_domains: &[String]) -> String {
    let founder_scoped = || format!("{}'s Company", record.founder_name.trim());

    let Some(host) = record
        .founder_email
        .as_deref()
        .filter(|e| e.contains('@'))
        .and_then(domain)
    else {
        return founder_scoped();
    };

    if personal_domains
        .iter()
        .any(|d| d.trim().eq_ignore_ascii_case(&host))
    {
        return founder_scoped();
    }

    match host.split('.').next().map(capitalize) {
        Some(label) if !label.is_empty() => label,
        _ => founder_scoped(),
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscout_shared::PolicyConfig;

    fn record(name: &str, email: Option<&str>) -> EntityRecord {
        EntityRecord {
            founder_name: name.into(),
            founder_email: email.map(String::from),
            company_name: Some("Self-reported Name Inc".into()),
            industry: None,
            stage: None,
            summary: None,
            key_points: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    fn personal() -> Vec<String> {
        PolicyConfig::default().personal_email_domains
    }

    #[test]
    fn corporate_domain_names_the_deal() {
        assert_eq!(derive_deal_name(&record("Jane Doe", Some("jane@acme.io")), &personal()), "Acme");
        assert_eq!(derive_deal_name(&record("Raj", Some("raj@DataForge.ai")), &personal()), "Dataforge");
    }

    #[test]
    fn personal_domain_is_founder_scoped() {
        assert_eq!(
            derive_deal_name(&record("Jane Doe", Some("jane@gmail.com")), &personal()),
            "Jane Doe's Company"
        );
        assert_eq!(
            derive_deal_name(&record("Jane Doe", Some("jane@Outlook.com")), &personal()),
            "Jane Doe's Company"
        );
    }

    #[test]
    fn no_email_is_founder_scoped() {
        assert_eq!(derive_deal_name(&record("Jane Doe", None), &personal()), "Jane Doe's Company");
        assert_eq!(
            derive_deal_name(&record("Jane Doe", Some("not-an-address")), &personal()),
            "Jane Doe's Company"
        );
    }
}
