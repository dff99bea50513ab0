//! # localca - A Local Certificate Authority in Pure Rust
//!
//! localca runs a small, single-level Public Key Infrastructure for local
//! development hosts: a persisted self-signed root Certificate Authority that
//! issues leaf certificates for sets of DNS names. It is built on the
//! RustCrypto crates, without ring or openssl (except for testing).
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 bits by default, larger moduli on request
//! - **ECDSA**: P-256
//!
//! Certificates are signed with SHA-256 using the issuer's key type.
//!
//! ## Key Features
//!
//! - **Idempotent root**: the root is created once, persisted, and loaded back
//! - **Leaf issuance**: the common name is the first DNS name and the Subject
//!   Alternative Name lists every DNS name in order
//! - **Pluggable storage**: a directory on disk or an in-memory map
//! - **Lifecycle events**: issued/removed notifications on an event bus
//!
//! ## Quick Start
//!
//! ### Creating the Root and Issuing a Leaf
//!
//! ```rust,no_run
//! use localca::{
//!     cert::params::Subject,
//!     generator::CertificateGenerator,
//!     key::RsaKeyGenerator,
//!     root::RootCertificateAuthority,
//!     storage::LocalDirectory,
//! };
//!
//! # fn main() -> Result<(), localca::error::PkiError> {
//! let subject = Subject::builder()
//!     .organization_name("ACME Inc.")
//!     .common_name("ACME Root CA")
//!     .country_name("FR")
//!     .state_or_province_name("Paris")
//!     .locality_name("Paris")
//!     .build()?;
//!
//! // Loads ./pki/root-ca.{key,crt}, creating them on the first run
//! let storage = LocalDirectory::new("pki");
//! let root = RootCertificateAuthority::new(&storage, RsaKeyGenerator::default(), subject.clone())
//!     .obtain_or_create()?;
//!
//! let generator = CertificateGenerator::new(subject, RsaKeyGenerator::default(), root);
//! let leaf = generator.generate(&["foo.domain.fr", "bar.domain.fr"])?;
//!
//! leaf.certificate().verify(&generator.issuer().public_key())?;
//! println!("{}", leaf.certificate().to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Per-Container Certificates with Events
//!
//! ```rust,no_run
//! use localca::{
//!     bundle::CertificateBundle,
//!     cert::params::Subject,
//!     events::{Event, EventBus},
//!     generator::CertificateGenerator,
//!     key::EcdsaP256KeyGenerator,
//!     signed::SignedCertificates,
//!     storage::MemoryStorage,
//! };
//!
//! struct Printer;
//!
//! impl EventBus for Printer {
//!     fn dispatch(&self, event: Event) {
//!         println!("{} {}", event.name(), event.to_array());
//!     }
//! }
//!
//! # fn demo(root: CertificateBundle, subject: Subject) -> localca::error::Result<()> {
//! let certificates = SignedCertificates::new(
//!     CertificateGenerator::new(subject, EcdsaP256KeyGenerator, root),
//!     MemoryStorage::new(),
//!     Printer,
//! );
//! certificates.issue("web", &["web.docker"])?;
//! certificates.remove("web")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`error::Result`]; nothing is retried internally.
//!
//! ```rust
//! use localca::{error::PkiError, key::KeyPair};
//!
//! match KeyPair::import_from_pkcs8_pem("invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(PkiError::DecodingError(msg)) => println!("Failed to decode key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Root creation and leaf issuance are reported through [`tracing`]. The
//! library never installs a subscriber and never logs key material.
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, import/export, and signing
//! - [`cert`]: Certificates, subjects, validity and X.509 extensions
//! - [`tbs_certificate`]: The to-be-signed body and serial numbers
//! - [`issuer`]: Certificate issuing
//! - [`bundle`]: A private key paired with its certificate, and its persistence
//! - [`storage`]: Where bundles are persisted
//! - [`root`]: The self-signed root certificate authority
//! - [`generator`]: Leaf certificates for DNS names
//! - [`events`]: Certificate lifecycle events and the event bus
//! - [`signed`]: Per-container certificates tied to the event bus
//! - [`error`]: Error types

pub mod bundle;
pub mod cert;
pub mod error;
pub mod events;
pub mod generator;
pub mod issuer;
pub mod key;
mod pem_utils;
pub mod root;
pub mod signed;
pub mod storage;
pub mod tbs_certificate;
