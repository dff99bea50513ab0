mod util;

use localca::bundle::CertificateBundle;
use localca::cert::extensions::{BasicConstraints, KeyUsage};
use localca::error::PkiError;
use localca::generator::CertificateGenerator;
use localca::key::{EcdsaP256KeyGenerator, KeyGenerator, KeyPair, RsaKeyGenerator};
use localca::root::{DEFAULT_ROOT_VALIDITY_DAYS, RootCertificateAuthority};
use localca::storage::{LocalDirectory, MemoryStorage, Storage};
use std::cell::Cell;
use time::Duration;

/// Counts how many key pairs were requested.
struct CountingKeyGenerator {
    calls: Cell<usize>,
}

impl KeyGenerator for CountingKeyGenerator {
    fn generate(&self) -> localca::error::Result<KeyPair> {
        self.calls.set(self.calls.get() + 1);
        EcdsaP256KeyGenerator.generate()
    }
}

/// Storage whose first certificate write fails, as a full disk would.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    failed_once: Cell<bool>,
}

impl Storage for FlakyStorage {
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn read(&self, name: &str) -> localca::error::Result<Vec<u8>> {
        self.inner.read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> localca::error::Result<()> {
        if name.ends_with(".crt") && !self.failed_once.replace(true) {
            return Err(PkiError::StorageError("disk full".to_string()));
        }
        self.inner.write(name, bytes)
    }

    fn remove(&self, name: &str) -> localca::error::Result<bool> {
        self.inner.remove(name)
    }
}

#[test]
fn test_root_is_created_once() {
    let storage = MemoryStorage::new();
    let key_generator = CountingKeyGenerator {
        calls: Cell::new(0),
    };
    let root = RootCertificateAuthority::new(&storage, &key_generator, util::acme_subject());

    let first = root.obtain_or_create().unwrap();
    let second = root.obtain_or_create().unwrap();

    assert_eq!(key_generator.calls.get(), 1);
    assert_eq!(
        first.certificate().to_der().unwrap(),
        second.certificate().to_der().unwrap()
    );
    assert_eq!(
        *first.private_key().to_pkcs8_der().unwrap(),
        *second.private_key().to_pkcs8_der().unwrap()
    );
    assert_eq!(storage.names(), vec!["root-ca.crt", "root-ca.key"]);
}

#[test]
fn test_root_certificate_contents() {
    let root = util::rsa_root();
    let cert = root.certificate();

    assert_eq!(cert.subject_name(), cert.issuer_name());
    assert_eq!(
        cert.subject_name().to_string(),
        "CN=ACME Root CA,O=ACME Inc.,L=Paris,ST=Paris,C=FR"
    );
    assert_eq!(cert.subject().unwrap(), util::acme_subject());
    assert_eq!(
        cert.basic_constraints().unwrap(),
        Some(BasicConstraints {
            is_ca: true,
            max_path_length: None,
        })
    );
    assert!(cert.is_ca());
    assert_eq!(cert.extension::<KeyUsage>().unwrap(), Some(KeyUsage::ca()));
    assert!(cert.subject_alt_names().unwrap().is_empty());

    let validity = cert.validity();
    assert_eq!(
        validity.not_after - validity.not_before,
        Duration::days(DEFAULT_ROOT_VALIDITY_DAYS)
    );

    cert.verify(&root.public_key()).unwrap();
}

#[test]
fn test_end_to_end_with_local_directory() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalDirectory::new(dir.path().join("root-ca"));

    let root = RootCertificateAuthority::new(&storage, RsaKeyGenerator::default(), util::acme_subject())
        .obtain_or_create()
        .unwrap();
    assert!(dir.path().join("root-ca").join("root-ca.key").is_file());
    assert!(dir.path().join("root-ca").join("root-ca.crt").is_file());

    let generator = CertificateGenerator::new(util::acme_subject(), RsaKeyGenerator::default(), root);
    let leaf = generator.generate(&["foo.domain.fr"]).unwrap();

    leaf.certificate()
        .verify(&generator.issuer().public_key())
        .unwrap();
    assert_eq!(leaf.certificate().common_name().as_deref(), Some("foo.domain.fr"));

    // A second authority over the same directory loads the same root.
    let reloaded = RootCertificateAuthority::new(&storage, RsaKeyGenerator::default(), util::acme_subject())
        .obtain_or_create()
        .unwrap();
    leaf.certificate().verify(&reloaded.public_key()).unwrap();
}

#[test]
fn test_corrupt_root_is_a_decoding_error() {
    let storage = MemoryStorage::new();
    storage.write("root-ca.key", b"garbage").unwrap();
    storage.write("root-ca.crt", b"garbage").unwrap();

    let result = RootCertificateAuthority::new(&storage, EcdsaP256KeyGenerator, util::acme_subject())
        .obtain_or_create();

    assert!(matches!(result, Err(PkiError::DecodingError(_))));
    assert_eq!(storage.read("root-ca.key").unwrap(), b"garbage");
}

#[test]
fn test_incomplete_root_is_not_overwritten() {
    let storage = MemoryStorage::new();
    let existing = util::ecdsa_root();
    let cert_pem = existing.certificate().to_pem().unwrap();
    storage.write("root-ca.crt", cert_pem.as_bytes()).unwrap();

    let result = RootCertificateAuthority::new(&storage, EcdsaP256KeyGenerator, util::acme_subject())
        .obtain_or_create();

    assert!(matches!(result, Err(PkiError::DecodingError(_))));
    assert!(!storage.exists("root-ca.key"));
    assert_eq!(storage.read("root-ca.crt").unwrap(), cert_pem.as_bytes());
}

#[test]
fn test_builder_options() {
    let storage = MemoryStorage::new();
    let root = RootCertificateAuthority::builder()
        .storage(&storage)
        .key_generator(EcdsaP256KeyGenerator)
        .subject(util::acme_subject())
        .validity_days(30)
        .bundle_name("dev-ca")
        .build();

    let bundle = root.obtain_or_create().unwrap();

    assert_eq!(storage.names(), vec!["dev-ca.crt", "dev-ca.key"]);
    let validity = bundle.certificate().validity();
    assert_eq!(validity.not_after - validity.not_before, Duration::days(30));
    assert_eq!(
        CertificateBundle::load(&storage, "dev-ca").unwrap().certificate(),
        bundle.certificate()
    );
}

#[test]
fn test_invalid_validity_leaves_storage_untouched() {
    let storage = MemoryStorage::new();
    let root = RootCertificateAuthority::builder()
        .storage(&storage)
        .key_generator(EcdsaP256KeyGenerator)
        .subject(util::acme_subject())
        .validity_days(0)
        .build();

    assert!(matches!(
        root.obtain_or_create(),
        Err(PkiError::InvalidInput(_))
    ));
    assert!(storage.names().is_empty());
}

#[test]
fn test_failed_save_does_not_leave_root_incomplete() {
    let storage = FlakyStorage::default();
    let root = RootCertificateAuthority::new(&storage, EcdsaP256KeyGenerator, util::acme_subject());

    assert!(matches!(
        root.obtain_or_create(),
        Err(PkiError::StorageError(msg)) if msg == "disk full"
    ));
    assert!(storage.inner.names().is_empty());

    let bundle = root.obtain_or_create().unwrap();
    assert!(bundle.certificate().is_ca());
    assert_eq!(storage.inner.names(), vec!["root-ca.crt", "root-ca.key"]);
}
