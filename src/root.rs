use bon::Builder;
use tracing::{debug, info, warn};

use crate::bundle::CertificateBundle;
use crate::cert::Certificate;
use crate::cert::params::{CertificationRequestInfo, Subject, Validity};
use crate::error::Result;
use crate::key::KeyGenerator;
use crate::storage::Storage;

/// Validity of a freshly created root, in days.
pub const DEFAULT_ROOT_VALIDITY_DAYS: i64 = 3650;

/// Name the root bundle is stored under.
pub const DEFAULT_ROOT_BUNDLE_NAME: &str = "root-ca";

/// The self-signed root certificate authority, persisted in `storage`.
///
/// The first call to [`obtain_or_create`](Self::obtain_or_create) against an
/// empty storage creates and saves the root; later calls load it back.
/// Creation is not guarded against concurrent callers: serialize first-time
/// initialization for a given storage location.
///
/// # Example
/// ```no_run
/// use localca::key::RsaKeyGenerator;
/// use localca::root::RootCertificateAuthority;
/// use localca::cert::params::Subject;
/// use localca::storage::LocalDirectory;
///
/// # fn main() -> localca::error::Result<()> {
/// let subject = Subject::builder()
///     .organization_name("ACME Inc.")
///     .common_name("ACME Root CA")
///     .country_name("FR")
///     .state_or_province_name("Paris")
///     .locality_name("Paris")
///     .build()?;
/// let storage = LocalDirectory::new("/var/lib/localca");
/// let root = RootCertificateAuthority::builder()
///     .storage(&storage)
///     .key_generator(RsaKeyGenerator::default())
///     .subject(subject)
///     .validity_days(825)
///     .build()
///     .obtain_or_create()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Builder)]
pub struct RootCertificateAuthority<S, G> {
    storage: S,
    key_generator: G,
    subject: Subject,
    #[builder(default = DEFAULT_ROOT_VALIDITY_DAYS)]
    validity_days: i64,
    #[builder(into, default = DEFAULT_ROOT_BUNDLE_NAME.to_string())]
    bundle_name: String,
}

impl<S: Storage, G: KeyGenerator> RootCertificateAuthority<S, G> {
    pub fn new(storage: S, key_generator: G, subject: Subject) -> Self {
        Self {
            storage,
            key_generator,
            subject,
            validity_days: DEFAULT_ROOT_VALIDITY_DAYS,
            bundle_name: DEFAULT_ROOT_BUNDLE_NAME.to_string(),
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    /// Returns the stored root bundle, creating and saving it first if absent.
    ///
    /// A stored root is returned as is, without regeneration. If only one of
    /// its two entries exists, the stored state is treated as corrupt and left
    /// untouched. A failed save leaves neither entry behind, so a later call
    /// starts over.
    pub fn obtain_or_create(&self) -> Result<CertificateBundle> {
        match CertificateBundle::load_if_present(&self.storage, &self.bundle_name) {
            Ok(Some(bundle)) => {
                debug!(bundle = %self.bundle_name, "loaded existing root certificate authority");
                Ok(bundle)
            }
            Ok(None) => self.create(),
            Err(e) => {
                warn!(bundle = %self.bundle_name, error = %e, "stored root certificate authority is unusable");
                Err(e)
            }
        }
    }

    fn create(&self) -> Result<CertificateBundle> {
        let validity = Validity::for_days(self.validity_days)?;
        let key = self.key_generator.generate()?;
        let request = CertificationRequestInfo::builder()
            .subject(self.subject.clone())
            .subject_public_key(key.public_key())
            .is_ca(true)
            .build();
        let certificate = Certificate::new_self_signed(&request, &key, validity)?;

        let bundle = CertificateBundle::new(key, certificate);
        bundle.save(&self.storage, &self.bundle_name)?;

        info!(
            bundle = %self.bundle_name,
            subject = %bundle.certificate().subject_name(),
            serial = %bundle.certificate().serial_number_hex(),
            validity_days = self.validity_days,
            "created root certificate authority"
        );
        Ok(bundle)
    }
}
