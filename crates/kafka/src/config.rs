//! Kafka transport config glue.
//!
//! The layered settings themselves live in `engine_core::config::KafkaConfig`
//! (spec §6); this module only builds the rskafka-facing TLS material, kept
//! separate so a transport change never touches the config schema.

use std::sync::Arc;

use engine_core::config::{KafkaConfig, SecurityProtocol};
use engine_core::error::{Error, Result};

/// Builds the rustls client config used for the SSL/mTLS transport.
///
/// Grounded on `async_consumer.py`'s `create_ssl_context(cafile, certfile,
/// keyfile, password)`: a CA bundle for server verification, plus an
/// optional client certificate/key pair for mutual TLS.
pub fn build_tls_config(config: &KafkaConfig) -> Result<Arc<rustls::ClientConfig>> {
    let mut root_store = rustls::RootCertStore::empty();

    if let Some(cafile) = &config.cafile_path {
        let certs = load_certs(cafile)?;
        for cert in certs {
            root_store
                .add(cert)
                .map_err(|e| Error::configuration(format!("invalid CA cert: {e}")))?;
        }
    } else {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(root_store);

    let tls_config = match (&config.certfile_path, &config.keyfile_path) {
        (Some(certfile), Some(keyfile)) => {
            let certs = load_certs(certfile)?;
            let key = load_private_key(keyfile)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::configuration(format!("invalid client cert/key: {e}")))?
        }
        _ => builder.with_no_client_auth(),
    };

    Ok(Arc::new(tls_config))
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::configuration(format!("failed to open {path}: {e}")))?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::configuration(format!("failed to parse certs in {path}: {e}")))
}

fn load_private_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::configuration(format!("failed to open {path}: {e}")))?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::configuration(format!("failed to parse key in {path}: {e}")))?
        .ok_or_else(|| Error::configuration(format!("no private key found in {path}")))
}

/// Whether transport-level security is required for this deployment.
pub fn requires_tls(config: &KafkaConfig) -> bool {
    matches!(config.security_protocol, SecurityProtocol::Ssl)
}
