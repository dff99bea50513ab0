use tracing::{debug, warn};
use x509_cert::name::Name;
use zeroize::Zeroizing;

use crate::cert::Certificate;
use crate::error::{PkiError, Result};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::{ders_to_pem, find_block};
use crate::storage::Storage;

const KEY_SUFFIX: &str = ".key";
const CERTIFICATE_SUFFIX: &str = ".crt";
const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";
const PRIVATE_KEY_PEM_LABEL: &str = "PRIVATE KEY";

/// A private key together with the certificate issued for it.
///
/// Bundles are what the root authority persists and what leaf issuance
/// returns. A bundle with a CA certificate can itself issue certificates.
#[derive(Debug)]
pub struct CertificateBundle {
    key: KeyPair,
    certificate: Certificate,
}

impl CertificateBundle {
    pub fn new(key: KeyPair, certificate: Certificate) -> Self {
        Self { key, certificate }
    }

    pub fn private_key(&self) -> &KeyPair {
        &self.key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn into_parts(self) -> (KeyPair, Certificate) {
        (self.key, self.certificate)
    }

    /// Storage entry names for a bundle saved under `name`.
    pub fn entry_names(name: &str) -> (String, String) {
        (
            format!("{name}{KEY_SUFFIX}"),
            format!("{name}{CERTIFICATE_SUFFIX}"),
        )
    }

    /// Persists the bundle as `<name>.key` (PKCS#8 PEM) and `<name>.crt`.
    ///
    /// Both encodings are produced before anything is written. If either write
    /// fails, both entries are removed so that no half-written bundle remains
    /// under `name`, and the write error is returned.
    pub fn save<S: Storage>(&self, storage: &S, name: &str) -> Result<()> {
        let (key_entry, cert_entry) = Self::entry_names(name);
        let key_pem = self.key.to_pkcs8_pem()?;
        let cert_pem = self.certificate.to_pem()?;

        let written = storage
            .write(&key_entry, key_pem.as_bytes())
            .and_then(|()| storage.write(&cert_entry, cert_pem.as_bytes()));
        if let Err(e) = written {
            if let Err(cleanup) = Self::remove(storage, name) {
                warn!(bundle = name, error = %cleanup, "could not discard partially saved bundle");
            }
            return Err(e);
        }
        debug!(bundle = name, "saved certificate bundle");
        Ok(())
    }

    /// Loads a bundle saved under `name`.
    ///
    /// Only checks that both entries decode; the pairing of key and
    /// certificate is taken on trust.
    pub fn load<S: Storage>(storage: &S, name: &str) -> Result<Self> {
        let (key_entry, cert_entry) = Self::entry_names(name);
        let key_bytes = Zeroizing::new(storage.read(&key_entry)?);
        let cert_bytes = storage.read(&cert_entry)?;

        let key_pem = std::str::from_utf8(&key_bytes)
            .map_err(|e| PkiError::DecodingError(format!("{key_entry}: {e}")))?;
        let cert_pem = std::str::from_utf8(&cert_bytes)
            .map_err(|e| PkiError::DecodingError(format!("{cert_entry}: {e}")))?;

        let key = KeyPair::import_from_pkcs8_pem(key_pem)?;
        let certificate = Certificate::from_pem(cert_pem)?;
        debug!(bundle = name, "loaded certificate bundle");
        Ok(Self { key, certificate })
    }

    /// Loads the bundle saved under `name`, or `None` when neither entry exists.
    ///
    /// A bundle with only one of its two entries is a `DecodingError`.
    pub fn load_if_present<S: Storage>(storage: &S, name: &str) -> Result<Option<Self>> {
        let (key_entry, cert_entry) = Self::entry_names(name);
        match (storage.exists(&key_entry), storage.exists(&cert_entry)) {
            (false, false) => Ok(None),
            (true, true) => Self::load(storage, name).map(Some),
            (has_key, has_cert) => Err(PkiError::DecodingError(format!(
                "Bundle {name} is incomplete: key present = {has_key}, certificate present = {has_cert}"
            ))),
        }
    }

    /// Deletes both entries saved under `name`, returning whether any existed.
    pub fn remove<S: Storage>(storage: &S, name: &str) -> Result<bool> {
        let (key_entry, cert_entry) = Self::entry_names(name);
        let removed_key = storage.remove(&key_entry)?;
        let removed_cert = storage.remove(&cert_entry)?;
        Ok(removed_key || removed_cert)
    }

    /// A single PEM document: the private key block, then the certificate block.
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        let key_der = self.key.to_pkcs8_der()?;
        let cert_der = self.certificate.to_der()?;
        Ok(Zeroizing::new(ders_to_pem(&[
            (PRIVATE_KEY_PEM_LABEL, key_der.as_slice()),
            (CERTIFICATE_PEM_LABEL, cert_der.as_slice()),
        ])))
    }

    /// Parses a document holding exactly one key block and one certificate block,
    /// in any order.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let key_der = Zeroizing::new(find_block(pem_str, PRIVATE_KEY_PEM_LABEL)?);
        let cert_der = find_block(pem_str, CERTIFICATE_PEM_LABEL)?;
        Ok(Self {
            key: KeyPair::import_from_pkcs8_der(&key_der)?,
            certificate: Certificate::from_der(&cert_der)?,
        })
    }
}

impl Issuer for CertificateBundle {
    /// The certificate's subject, copied as encoded.
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.certificate.subject_name().clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}
