use der::Encode;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificationRequestInfo, ExtensionParam, Validity};
use crate::error::{PkiError, Result};
use crate::key::KeyPair;
use crate::tbs_certificate::{TbsCertificate, random_serial_number};

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer, as it must appear in issued certificates.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// CA requests get critical Basic Constraints (CA:true) and keyCertSign/cRLSign
    /// key usage. Other requests get digitalSignature/keyEncipherment key usage
    /// and no Basic Constraints. Every certificate carries subject and authority
    /// key identifiers and a fresh random serial number.
    ///
    /// # Arguments
    /// * `cert_request` - The certification request information containing details about the certificate to be issued.
    /// * `validity` - The validity window of the issued certificate.
    fn issue(&self, cert_request: &CertificationRequestInfo, validity: Validity) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let signature_algorithm = signing_key.signature_algorithm();

        let mut extensions: Vec<ExtensionParam> = Vec::new();

        if cert_request.is_ca {
            let basic_constraints = BasicConstraints {
                is_ca: true,
                max_path_length: None,
            };
            extensions.push(ExtensionParam::from_extension(basic_constraints, true)?);
            extensions.push(ExtensionParam::from_extension(KeyUsage::ca(), true)?);
        } else {
            extensions.push(ExtensionParam::from_extension(KeyUsage::tls_server(), true)?);
        }

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        if !cert_request.dns_names.is_empty() {
            let subject_alt_name = SubjectAltName {
                names: cert_request.dns_names.clone(),
            };
            extensions.push(ExtensionParam::from_extension(subject_alt_name, false)?);
        }

        let subject_key_id = cert_request
            .subject_public_key
            .key_identifier()
            .map_err(signing_failure)?;
        extensions.push(ExtensionParam::from_extension(
            SubjectKeyIdentifier(subject_key_id),
            false,
        )?);

        let authority_key_id = AuthorityKeyIdentifier {
            key_identifier: signing_key
                .public_key()
                .key_identifier()
                .map_err(signing_failure)?,
        };
        extensions.push(ExtensionParam::from_extension(authority_key_id, false)?);

        let tbs_cert = TbsCertificate {
            serial_number: random_serial_number()?,
            signature_algorithm,
            issuer: self.issuer_name()?,
            validity,
            subject: cert_request.subject.as_x509_name().map_err(signing_failure)?,
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert
            .to_tbs_certificate_inner()
            .map_err(signing_failure)?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| PkiError::SigningError(e.to_string()))?;

        let signature = signing_key.sign_data(&tbs_der)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| PkiError::SigningError(e.to_string()))?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// Encoding failures while building the to-be-signed body are signing failures.
fn signing_failure(err: PkiError) -> PkiError {
    match err {
        PkiError::EncodingError(msg) => PkiError::SigningError(msg),
        other => other,
    }
}

/// Issuer for self-signed certificates: the subject names itself as issuer.
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: Name,
    pub(crate) key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}

impl Certificate {
    /// Creates a new self-signed certificate.
    ///
    /// # Arguments
    /// * `cert_info` - The certification request information.
    /// * `key` - The key pair used to sign the certificate.
    /// * `validity` - The validity window.
    pub fn new_self_signed(
        cert_info: &CertificationRequestInfo,
        key: &KeyPair,
        validity: Validity,
    ) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: cert_info.subject.as_x509_name()?,
            key,
        };
        self_issuer.issue(cert_info, validity)
    }
}
