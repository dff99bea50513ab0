use std::time::SystemTime;

use der::Encode;
use der::asn1::OctetString;
use rand_core::{OsRng, RngCore};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::{PkiError, Result};
use crate::key::PublicKey;

/// Length of generated serial numbers, in bytes.
const SERIAL_NUMBER_LEN: usize = 16;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TbsCertificate {
    /// Certificate serial number, big endian, positive
    pub serial_number: Vec<u8>,
    /// Certificate signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Certificate issuer distinguished name
    pub issuer: Name,
    /// Not before / not after
    pub validity: Validity,
    /// Certificate subject distinguished name
    pub subject: Name,
    /// Subject's public key
    pub subject_public_key: PublicKey,
    /// Certificate extensions
    pub extensions: Vec<ExtensionParam>,
}

/// Draws a fresh positive serial number from the OS random source.
pub fn random_serial_number() -> Result<Vec<u8>> {
    let mut serial = vec![0u8; SERIAL_NUMBER_LEN];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| PkiError::KeyGenerationError(e.to_string()))?;
    // Clear the sign bit and keep the leading octet non-zero so the encoded
    // INTEGER is exactly SERIAL_NUMBER_LEN bytes.
    serial[0] = (serial[0] & 0x7f) | 0x40;
    Ok(serial)
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())
                        .map_err(|e| PkiError::EncodingError(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| PkiError::EncodingError(e.to_string()))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_x509spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    pub fn from_tbs_certificate_inner(inner: &TbsCertificateInner) -> Result<Self> {
        let subject_public_key = PublicKey::from_x509spki(&inner.subject_public_key_info)?;

        let extensions = inner
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect::<Vec<_>>();

        let validity = Validity {
            not_before: inner.validity.not_before.to_system_time().into(),
            not_after: inner.validity.not_after.to_system_time().into(),
        };

        Ok(Self {
            serial_number: inner.serial_number.as_bytes().to_vec(),
            signature_algorithm: SignatureAlgorithm::try_from(&inner.signature)?,
            issuer: inner.issuer.clone(),
            validity,
            subject: inner.subject.clone(),
            subject_public_key,
            extensions,
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))
    }
}

fn to_x509_time(time: time::OffsetDateTime) -> Result<Time> {
    Time::try_from(SystemTime::from(time)).map_err(|e| PkiError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_serial_numbers_are_positive_and_distinct() {
        let first = random_serial_number().unwrap();
        let second = random_serial_number().unwrap();
        assert_eq!(first.len(), SERIAL_NUMBER_LEN);
        assert!(first[0] & 0x80 == 0 && first[0] != 0);
        assert_ne!(first, second);
        let serial = SerialNumber::<x509_cert::certificate::Rfc5280>::new(&first).unwrap();
        assert_eq!(serial.as_bytes(), first.as_slice());
    }
}
