#![allow(dead_code)]

use localca::bundle::CertificateBundle;
use localca::cert::params::Subject;
use localca::key::{EcdsaP256KeyGenerator, RsaKeyGenerator};
use localca::root::RootCertificateAuthority;
use localca::storage::MemoryStorage;

pub const LEAF_DNS_NAMES: [&str; 2] = ["foo.domain.fr", "bar.domain.fr"];

pub fn acme_subject() -> Subject {
    Subject::builder()
        .organization_name("ACME Inc.")
        .common_name("ACME Root CA")
        .country_name("FR")
        .state_or_province_name("Paris")
        .locality_name("Paris")
        .build()
        .unwrap()
}

pub fn rsa_root() -> CertificateBundle {
    let storage = MemoryStorage::new();
    RootCertificateAuthority::new(&storage, RsaKeyGenerator::default(), acme_subject())
        .obtain_or_create()
        .unwrap()
}

pub fn ecdsa_root() -> CertificateBundle {
    let storage = MemoryStorage::new();
    RootCertificateAuthority::new(&storage, EcdsaP256KeyGenerator, acme_subject())
        .obtain_or_create()
        .unwrap()
}
