//! Host CPU load and TLS certificate gauges, sampled by the scheduler.

use anyhow::{Context, Result, anyhow};
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::System;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

const TLS_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Average load over all cores in percent, measured across one second.
pub async fn sample_cpu_load() -> f32 {
    let mut system = System::new();
    system.refresh_cpu_usage();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_secs(1))).await;
    system.refresh_cpu_usage();
    system.global_cpu_usage()
}

pub async fn record_cpu_load() -> f32 {
    let load = sample_cpu_load().await;
    metrics::gauge!("cpu_load_percentage").set(f64::from(load));
    debug!(cpu_load = load, "CPU load sampled");
    load
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CertificateStatus {
    pub days_until_expiry: f64,
    /// Chain, hostname and validity window all check out
    pub valid: bool,
}

impl CertificateStatus {
    pub const UNREACHABLE: Self = Self {
        days_until_expiry: 0.0,
        valid: false,
    };
}

/// Wraps the WebPKI verifier and remembers its verdict instead of aborting
/// the handshake, so an invalid certificate can still be inspected.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    verdict: Mutex<Option<Result<(), rustls::Error>>>,
}

impl RecordingVerifier {
    fn verified(&self) -> bool {
        self.verdict
            .lock()
            .map(|v| matches!(*v, Some(Ok(()))))
            .unwrap_or(false)
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verdict = self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            .map(|_| ());
        if let Ok(mut slot) = self.verdict.lock() {
            *slot = Some(verdict);
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn days_until(not_after: i64, now: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let seconds = (not_after - now) as f64;
    seconds / SECONDS_PER_DAY
}

/// Connects to `domain:port`, completes a TLS handshake and inspects the
/// leaf certificate.
pub async fn check_certificate(domain: &str, port: u16) -> Result<CertificateStatus> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
        .build()
        .context("Failed to build certificate verifier")?;
    let verifier = Arc::new(RecordingVerifier {
        inner: webpki,
        verdict: Mutex::new(None),
    });

    let config = client_config(provider, Arc::clone(&verifier))?;
    let server_name = ServerName::try_from(domain.to_string())
        .with_context(|| format!("Invalid domain name {domain:?}"))?;

    let tcp = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((domain, port)))
        .await
        .with_context(|| format!("Timed out connecting to {domain}:{port}"))?
        .with_context(|| format!("Failed to connect to {domain}:{port}"))?;

    let stream = tokio::time::timeout(
        CONNECT_TIMEOUT,
        TlsConnector::from(Arc::new(config)).connect(server_name, tcp),
    )
    .await
    .with_context(|| format!("TLS handshake with {domain} timed out"))?
    .with_context(|| format!("TLS handshake with {domain} failed"))?;

    let (_, connection) = stream.get_ref();
    let leaf = connection
        .peer_certificates()
        .and_then(<[CertificateDer<'static>]>::first)
        .ok_or_else(|| anyhow!("No certificates presented by {domain}"))?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| anyhow!("Failed to parse certificate of {domain}: {e}"))?;

    let now = chrono::Utc::now().timestamp();
    let validity = cert.validity();
    let in_window = validity.not_before.timestamp() <= now && now <= validity.not_after.timestamp();

    Ok(CertificateStatus {
        days_until_expiry: days_until(validity.not_after.timestamp(), now),
        valid: in_window && verifier.verified(),
    })
}

fn client_config(
    provider: Arc<CryptoProvider>,
    verifier: Arc<RecordingVerifier>,
) -> Result<ClientConfig> {
    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("Failed to select TLS versions")?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth())
}

/// Checks one domain and publishes `tls_certificate_expiry_days` and
/// `tls_certificate_validity`. Unreachable domains report zero for both.
pub async fn record_certificate(domain: &str, port: u16) -> CertificateStatus {
    let status = match check_certificate(domain, port).await {
        Ok(status) => {
            if !status.valid {
                warn!(domain, "TLS certificate failed validation");
            }
            status
        }
        Err(e) => {
            warn!(domain, error = %format!("{e:#}"), "Certificate check failed");
            CertificateStatus::UNREACHABLE
        }
    };

    metrics::gauge!("tls_certificate_expiry_days", "domain" => domain.to_string())
        .set(status.days_until_expiry);
    metrics::gauge!("tls_certificate_validity", "domain" => domain.to_string())
        .set(if status.valid { 1.0 } else { 0.0 });

    status
}

pub async fn record_certificates(domains: &[String]) {
    for domain in domains {
        record_certificate(domain, TLS_PORT).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_days_until() {
        assert!((days_until(86_400 * 30, 0) - 30.0).abs() < f64::EPSILON);
        assert!((days_until(0, 43_200) + 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cpu_load_is_a_percentage() {
        let load = record_cpu_load().await;
        assert!(load.is_finite());
        assert!(load >= 0.0);
    }

    #[tokio::test]
    async fn test_closed_port_reports_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(check_certificate("localhost", port).await.is_err());
        assert_eq!(
            record_certificate("localhost", port).await,
            CertificateStatus::UNREACHABLE
        );
    }

    #[tokio::test]
    async fn test_non_tls_server_reports_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await.ok();
            }
        });

        assert_eq!(
            record_certificate("localhost", port).await,
            CertificateStatus::UNREACHABLE
        );
    }
}
