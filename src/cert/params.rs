use std::sync::LazyLock;

use bon::{Builder, bon};
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519::{COMMON_NAME, COUNTRY_NAME, LOCALITY_NAME, ORGANIZATION_NAME, ST};
use der::Tag;
use der::Tagged;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use regex::Regex;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{PkiError, Result};
use crate::key::PublicKey;

static PRINTABLE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\p{Cc}]*\S[^\p{Cc}]*$").expect("valid regex"));

static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));

/// Distinguished-name template used for the root and for every leaf.
///
/// All attributes are required, non-empty and free of control characters; the
/// country is a two-letter upper-case code. Fields are private so a `Subject`
/// cannot change once built. Leaves reuse the template through
/// [`Subject::with_common_name`].
///
/// ```
/// let subject = localca::cert::params::Subject::builder()
///     .organization_name("ACME Inc.")
///     .common_name("ACME Root CA")
///     .country_name("FR")
///     .state_or_province_name("Paris")
///     .locality_name("Paris")
///     .build()
///     .unwrap();
/// assert_eq!(subject.common_name(), "ACME Root CA");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    organization_name: String,
    common_name: String,
    country_name: String,
    state_or_province_name: String,
    locality_name: String,
}

#[bon]
impl Subject {
    #[builder(on(String, into))]
    pub fn new(
        organization_name: String,
        common_name: String,
        country_name: String,
        state_or_province_name: String,
        locality_name: String,
    ) -> Result<Self> {
        check_printable("organizationName", &organization_name)?;
        check_printable("commonName", &common_name)?;
        check_printable("stateOrProvinceName", &state_or_province_name)?;
        check_printable("localityName", &locality_name)?;
        if !COUNTRY_CODE.is_match(&country_name) {
            return Err(PkiError::InvalidInput(format!(
                "countryName must be a two-letter upper-case code, got {country_name:?}"
            )));
        }

        Ok(Self {
            organization_name,
            common_name,
            country_name,
            state_or_province_name,
            locality_name,
        })
    }
}

fn check_printable(attribute: &str, value: &str) -> Result<()> {
    if PRINTABLE_VALUE.is_match(value) {
        Ok(())
    } else {
        Err(PkiError::InvalidInput(format!(
            "{attribute} must be a non-empty printable string, got {value:?}"
        )))
    }
}

impl Subject {
    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    pub fn state_or_province_name(&self) -> &str {
        &self.state_or_province_name
    }

    pub fn locality_name(&self) -> &str {
        &self.locality_name
    }

    /// Returns a copy of this template with the common name replaced.
    pub fn with_common_name(&self, common_name: impl Into<String>) -> Result<Self> {
        let common_name = common_name.into();
        check_printable("commonName", &common_name)?;
        Ok(Self {
            common_name,
            ..self.clone()
        })
    }

    /// Converts the subject to an X.509 name, ordered C, ST, L, O, CN.
    ///
    /// The country is a PrintableString as RFC 5280 requires; every other
    /// attribute is a UTF8String.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        self.encode_x509_name()
            .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    fn encode_x509_name(&self) -> der::Result<RdnSequence> {
        Ok(RdnSequence(vec![
            rdn(COUNTRY_NAME, Any::encode_from(&PrintableStringRef::new(&self.country_name)?)?)?,
            rdn(ST, Any::encode_from(&Utf8StringRef::new(&self.state_or_province_name)?)?)?,
            rdn(LOCALITY_NAME, Any::encode_from(&Utf8StringRef::new(&self.locality_name)?)?)?,
            rdn(
                ORGANIZATION_NAME,
                Any::encode_from(&Utf8StringRef::new(&self.organization_name)?)?,
            )?,
            rdn(COMMON_NAME, Any::encode_from(&Utf8StringRef::new(&self.common_name)?)?)?,
        ]))
    }

    /// Reads a subject back from an X.509 name. Every attribute must be present.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Result<Self> {
        let required = |oid: ObjectIdentifier, attribute: &str| {
            first_value_of(x509dn, oid).ok_or_else(|| {
                PkiError::DecodingError(format!("Name has no {attribute} attribute"))
            })
        };

        Ok(Self {
            organization_name: required(ORGANIZATION_NAME, "organizationName")?,
            common_name: required(COMMON_NAME, "commonName")?,
            country_name: required(COUNTRY_NAME, "countryName")?,
            state_or_province_name: required(ST, "stateOrProvinceName")?,
            locality_name: required(LOCALITY_NAME, "localityName")?,
        })
    }
}

fn rdn(oid: ObjectIdentifier, value: Any) -> der::Result<RelativeDistinguishedName> {
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])?;
    Ok(RelativeDistinguishedName(set))
}

/// Returns the first string value of the attribute `oid` in `name`, if any.
pub fn first_value_of(name: &x509_cert::name::DistinguishedName, oid: ObjectIdentifier) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|attr| attr.oid == oid)
        .find_map(|attr| attribute_string(&attr.value))
}

fn attribute_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::PrintableString => PrintableStringRef::try_from(value)
            .ok()
            .map(|s| s.as_str().to_string()),
        Tag::Utf8String => Utf8StringRef::try_from(value)
            .ok()
            .map(|s| s.as_str().to_string()),
        Tag::Ia5String => Ia5StringRef::try_from(value)
            .ok()
            .map(|s| s.as_str().to_string()),
        _ => None,
    }
}

/// Parameters for issuing an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `usages` - Extended key usages; none means no extension.
/// * `is_ca` - Marks a CA certificate (Basic Constraints CA:true).
/// * `dns_names` - Subject Alternative Name entries, in order.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: Subject,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub dns_names: Vec<String>,
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// The start is truncated to whole seconds, the precision X.509 times carry.
    /// The number of days must be positive.
    pub fn for_days(days: i64) -> Result<Self> {
        if days <= 0 {
            return Err(PkiError::InvalidInput(format!(
                "Validity must be a positive number of days, got {days}"
            )));
        }
        let now = OffsetDateTime::now_utc();
        let now = now.replace_nanosecond(0).unwrap_or(now);
        let not_after = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|seconds| now.checked_add(Duration::seconds(seconds)))
            .ok_or_else(|| PkiError::InvalidInput(format!("Validity of {days} days is out of range")))?;
        Ok(Self {
            not_before: now,
            not_after,
        })
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Subject {
        Subject::builder()
            .organization_name("ACME Inc.")
            .common_name("ACME Root CA")
            .country_name("FR")
            .state_or_province_name("Paris")
            .locality_name("Paris")
            .build()
            .unwrap()
    }

    #[test]
    fn test_subject_rejects_empty_fields() {
        let result = Subject::builder()
            .organization_name("")
            .common_name("ACME Root CA")
            .country_name("FR")
            .state_or_province_name("Paris")
            .locality_name("Paris")
            .build();
        assert!(matches!(result, Err(PkiError::InvalidInput(_))));

        let result = Subject::builder()
            .organization_name("ACME Inc.")
            .common_name("   ")
            .country_name("FR")
            .state_or_province_name("Paris")
            .locality_name("Paris")
            .build();
        assert!(matches!(result, Err(PkiError::InvalidInput(_))));
    }

    #[test]
    fn test_subject_rejects_bad_country() {
        let result = Subject::builder()
            .organization_name("ACME Inc.")
            .common_name("ACME Root CA")
            .country_name("France")
            .state_or_province_name("Paris")
            .locality_name("Paris")
            .build();
        assert!(matches!(result, Err(PkiError::InvalidInput(_))));
    }

    #[test]
    fn test_subject_rejects_control_characters() {
        assert!(matches!(
            acme().with_common_name("foo\nbar"),
            Err(PkiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_with_common_name_keeps_the_rest_of_the_template() {
        let template = acme();
        let leaf = template.with_common_name("foo.domain.fr").unwrap();
        assert_eq!(leaf.common_name(), "foo.domain.fr");
        assert_eq!(leaf.organization_name(), "ACME Inc.");
        assert_eq!(leaf.country_name(), "FR");
        assert_eq!(template.common_name(), "ACME Root CA");
    }

    #[test]
    fn test_x509_name_read_back() {
        let subject = acme();
        let name = subject.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 5);
        assert_eq!(
            first_value_of(&name, COMMON_NAME).as_deref(),
            Some("ACME Root CA")
        );
        assert_eq!(Subject::from_x509_name(&name).unwrap(), subject);
        assert_eq!(
            name.to_string(),
            "CN=ACME Root CA,O=ACME Inc.,L=Paris,ST=Paris,C=FR"
        );
    }

    #[test]
    fn test_from_x509_name_requires_every_attribute() {
        let name = RdnSequence(vec![
            rdn(
                COMMON_NAME,
                Any::encode_from(&Utf8StringRef::new("only a cn").unwrap()).unwrap(),
            )
            .unwrap(),
        ]);
        assert!(matches!(
            Subject::from_x509_name(&name),
            Err(PkiError::DecodingError(_))
        ));
    }

    #[test]
    fn test_validity_for_days() {
        let validity = Validity::for_days(365).unwrap();
        assert_eq!(validity.not_after - validity.not_before, Duration::days(365));
        assert_eq!(validity.not_before.nanosecond(), 0);
    }

    #[test]
    fn test_validity_rejects_non_positive_and_overflowing_days() {
        for days in [0, -1, i64::MAX] {
            assert!(matches!(
                Validity::for_days(days),
                Err(PkiError::InvalidInput(_))
            ));
        }
    }
}
