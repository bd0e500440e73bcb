//! TLS material for the collector connection.
//!
//! PEM input is validated when it is loaded, so a [`TlsConfig`] that exists is
//! always usable by both transports.

use std::fmt;

use crate::Error;

/// Trust roots and optional client identity used to reach the collector.
///
/// The default value trusts the system root CAs and presents no client
/// certificate.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    root_certificates: Option<Vec<u8>>,
    client_identity: Option<ClientIdentity>,
}

impl TlsConfig {
    /// Trust the certificates of a PEM bundle instead of the system roots.
    pub fn with_root_certificates_pem(mut self, pem: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let pem = pem.into();
        let count = count_certificates(&pem)?;
        if count == 0 {
            return Err(Error::InvalidCredentials(
                "no certificate found in root CA bundle".to_string(),
            ));
        }
        self.root_certificates = Some(pem);
        Ok(self)
    }

    /// Present `identity` to the collector.
    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// The PEM encoded root CA bundle, if one was configured.
    pub fn root_certificates(&self) -> Option<&[u8]> {
        self.root_certificates.as_deref()
    }

    /// The client identity, if one was configured.
    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        self.client_identity.as_ref()
    }

    /// Returns true when neither root CAs nor a client identity were loaded.
    pub fn is_empty(&self) -> bool {
        self.root_certificates.is_none() && self.client_identity.is_none()
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("root_certificates", &self.root_certificates.is_some())
            .field("client_identity", &self.client_identity)
            .finish()
    }
}

/// A client certificate chain and its private key, both PEM encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    certificate: Vec<u8>,
    key: Vec<u8>,
}

impl ClientIdentity {
    /// Load a client identity, checking that the certificate PEM holds at least
    /// one certificate and the key PEM holds a private key.
    pub fn from_pem(
        certificate: impl Into<Vec<u8>>,
        key: impl Into<Vec<u8>>,
    ) -> Result<Self, Error> {
        let certificate = certificate.into();
        let key = key.into();

        if count_certificates(&certificate)? == 0 {
            return Err(Error::InvalidCredentials(
                "no certificate found in client certificate".to_string(),
            ));
        }
        match rustls_pemfile::private_key(&mut key.as_slice()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(Error::InvalidCredentials(
                    "no private key found in client key".to_string(),
                ))
            }
            Err(e) => return Err(Error::InvalidCredentials(e.to_string())),
        }

        Ok(ClientIdentity { certificate, key })
    }

    /// The PEM encoded certificate chain.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// The PEM encoded private key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print key material
        f.write_str("ClientIdentity(..)")
    }
}

/// Channel security for the gRPC transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCredentials {
    /// Plaintext HTTP/2.
    Insecure,
    /// TLS with the given trust roots and client identity.
    Tls(TlsConfig),
}

fn count_certificates(pem: &[u8]) -> Result<usize, Error> {
    rustls_pemfile::certs(&mut &pem[..]).try_fold(0, |count, cert| {
        cert.map(|_| count + 1)
            .map_err(|e| Error::InvalidCredentials(e.to_string()))
    })
}
