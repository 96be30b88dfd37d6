//! Static certificate registry for the public verification endpoint.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub code: &'static str,
    pub company: &'static str,
    #[serde(rename = "type")]
    pub certificate_type: &'static str,
    pub issue_date: &'static str,
    pub expiry_date: &'static str,
    pub issuer: &'static str,
    pub status: &'static str,
}

const REGISTRY: &[Certificate] = &[
    Certificate {
        code: "ISO-9001-2024-TR-001",
        company: "ABC Teknoloji A.Ş.",
        certificate_type: "ISO 9001:2015",
        issue_date: "2024-01-15",
        expiry_date: "2027-01-15",
        issuer: "TSE",
        status: "active",
    },
    Certificate {
        code: "ISO-27001-2024-TR-002",
        company: "XYZ Yazılım Ltd.",
        certificate_type: "ISO 27001:2013",
        issue_date: "2024-03-01",
        expiry_date: "2027-03-01",
        issuer: "TSE",
        status: "active",
    },
];

/// Exact, case-sensitive match on the certificate code.
pub fn lookup(code: &str) -> Option<&'static Certificate> {
    REGISTRY.iter().find(|c| c.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_certificate() {
        let cert = lookup("ISO-9001-2024-TR-001").unwrap();
        assert_eq!(cert.company, "ABC Teknoloji A.Ş.");
        assert_eq!(cert.status, "active");
        assert_eq!(cert.issuer, "TSE");
    }

    #[test]
    fn unknown_certificate() {
        assert!(lookup("UNKNOWN-CODE").is_none());
    }

    #[test]
    fn match_is_exact() {
        assert!(lookup("iso-9001-2024-tr-001").is_none());
        assert!(lookup(" ISO-9001-2024-TR-001").is_none());
    }
}
