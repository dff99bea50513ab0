use tracing::{debug, info};

use crate::bundle::CertificateBundle;
use crate::error::{PkiError, Result};
use crate::events::{EventBus, SignedCertificateIssued, SignedCertificateRemoved};
use crate::generator::CertificateGenerator;
use crate::key::KeyGenerator;
use crate::storage::Storage;

/// Stored bundle names of container certificates start with this, which keeps
/// them apart from a root bundle kept in the same storage.
pub const CONTAINER_BUNDLE_PREFIX: &str = "signed-";

/// Per-container leaf certificates: issued and stored as
/// `signed-<container>.{key,crt}`, announced on the event bus, and removed
/// when the container goes away.
///
/// Events are only dispatched once storage has succeeded.
#[derive(Debug)]
pub struct SignedCertificates<S, B, G> {
    generator: CertificateGenerator<G>,
    storage: S,
    bus: B,
}

impl<S: Storage, B: EventBus, G: KeyGenerator> SignedCertificates<S, B, G> {
    pub fn new(generator: CertificateGenerator<G>, storage: S, bus: B) -> Self {
        Self {
            generator,
            storage,
            bus,
        }
    }

    pub fn generator(&self) -> &CertificateGenerator<G> {
        &self.generator
    }

    /// Issues a certificate for `dns_names`, stores it under `container_name`
    /// and dispatches [`SignedCertificateIssued`].
    ///
    /// A certificate already stored for the container is replaced.
    pub fn issue<N: AsRef<str>>(
        &self,
        container_name: &str,
        dns_names: &[N],
    ) -> Result<CertificateBundle> {
        let name = bundle_name(container_name)?;
        let bundle = self.generator.generate(dns_names)?;
        bundle.save(&self.storage, &name)?;

        let dns_names: Vec<String> = dns_names.iter().map(|n| n.as_ref().to_string()).collect();
        info!(
            container = container_name,
            dns_names = ?dns_names,
            serial = %bundle.certificate().serial_number_hex(),
            "stored signed certificate"
        );
        self.bus
            .dispatch(SignedCertificateIssued::new(container_name, dns_names).into());
        Ok(bundle)
    }

    /// Loads the certificate stored for `container_name`, if any.
    ///
    /// A bundle missing its key or its certificate is a `DecodingError`.
    pub fn get(&self, container_name: &str) -> Result<Option<CertificateBundle>> {
        CertificateBundle::load_if_present(&self.storage, &bundle_name(container_name)?)
    }

    /// Deletes the certificate stored for `container_name` and dispatches
    /// [`SignedCertificateRemoved`].
    ///
    /// Returns `false`, without dispatching, when nothing was stored.
    pub fn remove(&self, container_name: &str) -> Result<bool> {
        if !CertificateBundle::remove(&self.storage, &bundle_name(container_name)?)? {
            debug!(container = container_name, "no signed certificate to remove");
            return Ok(false);
        }

        info!(container = container_name, "removed signed certificate");
        self.bus
            .dispatch(SignedCertificateRemoved::new(container_name).into());
        Ok(true)
    }
}

fn bundle_name(container_name: &str) -> Result<String> {
    if container_name.trim().is_empty() {
        return Err(PkiError::InvalidInput(
            "Container name must not be empty".to_string(),
        ));
    }
    Ok(format!("{CONTAINER_BUNDLE_PREFIX}{container_name}"))
}
