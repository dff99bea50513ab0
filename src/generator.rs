use std::sync::LazyLock;

use bon::Builder;
use regex::Regex;
use tracing::info;

use crate::bundle::CertificateBundle;
use crate::cert::params::{CertificationRequestInfo, ExtendedKeyUsageOption, Subject, Validity};
use crate::error::{PkiError, Result};
use crate::issuer::Issuer;
use crate::key::KeyGenerator;

/// Validity of issued leaf certificates, in days.
pub const DEFAULT_LEAF_VALIDITY_DAYS: i64 = 365;

const MAX_DNS_NAME_LEN: usize = 253;

/// Dot-separated labels of letters, digits, hyphens and underscores, with an
/// optional leading `*.` wildcard. Labels never start or end with a hyphen.
static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\*\.)?([A-Za-z0-9_]([A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?)(\.[A-Za-z0-9_]([A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?)*$",
    )
    .expect("valid regex")
});

/// Issues leaf certificates for sets of DNS names, signed by `issuer`.
///
/// The leaf subject is `subject` with its common name replaced by the first
/// DNS name. Every call generates a fresh key pair.
///
/// # Example
/// ```no_run
/// # fn demo(root: localca::bundle::CertificateBundle, subject: localca::cert::params::Subject) -> localca::error::Result<()> {
/// use localca::generator::CertificateGenerator;
/// use localca::key::RsaKeyGenerator;
///
/// let generator = CertificateGenerator::new(subject, RsaKeyGenerator::default(), root);
/// let leaf = generator.generate(&["foo.domain.fr", "bar.domain.fr"])?;
/// assert_eq!(leaf.certificate().common_name().as_deref(), Some("foo.domain.fr"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Builder)]
pub struct CertificateGenerator<G> {
    subject: Subject,
    key_generator: G,
    issuer: CertificateBundle,
    #[builder(default = DEFAULT_LEAF_VALIDITY_DAYS)]
    validity_days: i64,
}

impl<G: KeyGenerator> CertificateGenerator<G> {
    pub fn new(subject: Subject, key_generator: G, issuer: CertificateBundle) -> Self {
        Self {
            subject,
            key_generator,
            issuer,
            validity_days: DEFAULT_LEAF_VALIDITY_DAYS,
        }
    }

    pub fn issuer(&self) -> &CertificateBundle {
        &self.issuer
    }

    pub fn validity_days(&self) -> i64 {
        self.validity_days
    }

    /// Issues a certificate whose SAN lists `dns_names` in order, duplicates
    /// included, and whose common name is the first of them.
    ///
    /// The leaf never outlives the issuer; an expired issuer is rejected.
    pub fn generate<N: AsRef<str>>(&self, dns_names: &[N]) -> Result<CertificateBundle> {
        let dns_names: Vec<String> = dns_names.iter().map(|n| n.as_ref().to_string()).collect();
        let Some(common_name) = dns_names.first() else {
            return Err(PkiError::InvalidInput(
                "At least one DNS name is required".to_string(),
            ));
        };
        for name in &dns_names {
            check_dns_name(name)?;
        }
        let validity = self.leaf_validity()?;

        let key = self.key_generator.generate()?;
        let request = CertificationRequestInfo::builder()
            .subject(self.subject.with_common_name(common_name)?)
            .subject_public_key(key.public_key())
            .usages(vec![ExtendedKeyUsageOption::ServerAuth])
            .dns_names(dns_names.clone())
            .build();

        let certificate = self.issuer.issue(&request, validity)?;

        info!(
            common_name = %common_name,
            dns_names = ?dns_names,
            serial = %certificate.serial_number_hex(),
            issuer = %certificate.issuer_name(),
            "issued leaf certificate"
        );
        Ok(CertificateBundle::new(key, certificate))
    }
}

impl<G> CertificateGenerator<G> {
    /// `validity_days` from now, cut short at the issuer's own expiry.
    fn leaf_validity(&self) -> Result<Validity> {
        let mut validity = Validity::for_days(self.validity_days)?;
        let issuer_not_after = self.issuer.certificate().validity().not_after;
        if issuer_not_after <= validity.not_before {
            return Err(PkiError::InvalidInput(format!(
                "Issuer certificate expired at {issuer_not_after}"
            )));
        }
        validity.not_after = validity.not_after.min(issuer_not_after);
        Ok(validity)
    }
}

fn check_dns_name(name: &str) -> Result<()> {
    if name.len() <= MAX_DNS_NAME_LEN && DNS_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PkiError::InvalidInput(format!("Invalid DNS name {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_names() {
        for valid in [
            "foo.domain.fr",
            "localhost",
            "*.domain.fr",
            "my_service.docker",
            "a-b.c-d.example",
            "10.0.0.1",
        ] {
            assert!(check_dns_name(valid).is_ok(), "{valid}");
        }
        for invalid in [
            "",
            "foo..fr",
            "-foo.fr",
            "foo-.fr",
            "foo.*.fr",
            "*",
            "café.fr",
            "foo fr",
            "foo.fr.",
        ] {
            assert!(
                matches!(check_dns_name(invalid), Err(PkiError::InvalidInput(_))),
                "{invalid}"
            );
        }
        let long = format!("{}.fr", vec!["a".repeat(63); 4].join("."));
        assert!(check_dns_name(&long).is_err());
    }
}
