//! Mail-link parsing and bare address matching.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// Mailbox part of a `mailto:` target: scheme and `?query` stripped.
/// `None` for other schemes or an empty mailbox.
pub fn parse_mailto(target: &str) -> Option<String> {
    let target = target.trim();
    let scheme = target.get(..7)?;
    if !scheme.eq_ignore_ascii_case("mailto:") {
        return None;
    }
    let mailbox = target[7..].split('?').next().unwrap_or_default().trim();
    (!mailbox.is_empty() && mailbox.contains('@')).then(|| mailbox.to_string())
}

/// Every bare address in `text`, in order.
pub fn find_bare_emails(text: &str) -> impl Iterator<Item = &str> {
    EMAIL_RE.find_iter(text).map(|m| m.as_str())
}

/// Local part of an address (everything before the last `@`).
pub fn local_part(address: &str) -> &str {
    address.rsplit_once('@').map_or(address, |(local, _)| local)
}

/// Domain of an address, lowercased.
pub fn domain(address: &str) -> Option<String> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailto_strips_scheme_and_query() {
        assert_eq!(
            parse_mailto("mailto:jane@acme.io?subject=Hi&cc=x@y.com").as_deref(),
            Some("jane@acme.io")
        );
        assert_eq!(parse_mailto("MAILTO:raj@corp.com").as_deref(), Some("raj@corp.com"));
        assert_eq!(parse_mailto("https://acme.io"), None);
        assert_eq!(parse_mailto("mailto:"), None);
        assert_eq!(parse_mailto("mail"), None);
    }

    #[test]
    fn bare_emails_in_order() {
        let found: Vec<_> =
            find_bare_emails("reach adarsh@fund.vc or (jane.doe+vc@acme.io).").collect();
        assert_eq!(found, vec!["adarsh@fund.vc", "jane.doe+vc@acme.io"]);
    }

    #[test]
    fn address_parts() {
        assert_eq!(local_part("Jane@Acme.io"), "Jane");
        assert_eq!(domain("Jane@Acme.IO").as_deref(), Some("acme.io"));
        assert_eq!(domain("no-at-sign"), None);
    }
}
