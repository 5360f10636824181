//! TLS posture probes.

mod certificate;
mod ciphers;
mod connector;
mod probes;

pub(crate) use ciphers::tls_cipher_assessment;
pub(crate) use connector::TlsTarget;
pub(crate) use probes::{default_alpn, tls_alpn, tls_certificate, tls_ocsp, tls_versions};
