use std::{
    fmt,
    fs::File,
    io::BufReader,
    ops::{BitOr, BitOrAssign},
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use tokio_rustls::rustls::pki_types::CertificateDer;

use super::Secret;
use crate::error::CertificateError;

/// Picks the local certificate to present, given the target host and the
/// configured certificates.
pub type CertificateSelectionHook =
    Arc<dyn Fn(&str, &[CertificateDer<'static>]) -> Option<CertificateDer<'static>> + Send + Sync>;

/// Decides whether a remote certificate is accepted, given the policy errors
/// found while verifying it.
pub type CertificateValidationHook =
    Arc<dyn Fn(&CertificateDer<'static>, PolicyErrors) -> bool + Send + Sync>;

/// Set of certificate policy errors a connection is allowed to ignore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PolicyErrors(u8);

impl PolicyErrors {
    pub const NONE: PolicyErrors = PolicyErrors(0);
    pub const REMOTE_CERTIFICATE_NOT_AVAILABLE: PolicyErrors = PolicyErrors(1);
    pub const REMOTE_CERTIFICATE_NAME_MISMATCH: PolicyErrors = PolicyErrors(1 << 1);
    pub const REMOTE_CERTIFICATE_CHAIN_ERRORS: PolicyErrors = PolicyErrors(1 << 2);

    pub fn contains(self, other: PolicyErrors) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PolicyErrors {
    type Output = PolicyErrors;

    fn bitor(self, rhs: PolicyErrors) -> PolicyErrors {
        PolicyErrors(self.0 | rhs.0)
    }
}

impl BitOrAssign for PolicyErrors {
    fn bitor_assign(&mut self, rhs: PolicyErrors) {
        self.0 |= rhs.0
    }
}

impl FromStr for PolicyErrors {
    type Err = String;

    /// Parses a comma separated list of flag names, e.g.
    /// `"RemoteCertificateNameMismatch, RemoteCertificateChainErrors"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|flag| !flag.is_empty())
            .try_fold(PolicyErrors::NONE, |acc, flag| {
                let flag = match flag.to_ascii_lowercase().as_str() {
                    "none" => PolicyErrors::NONE,
                    "remotecertificatenotavailable" => PolicyErrors::REMOTE_CERTIFICATE_NOT_AVAILABLE,
                    "remotecertificatenamemismatch" => PolicyErrors::REMOTE_CERTIFICATE_NAME_MISMATCH,
                    "remotecertificatechainerrors" => PolicyErrors::REMOTE_CERTIFICATE_CHAIN_ERRORS,
                    _ => return Err(format!("unknown policy error '{}'", flag)),
                };
                Ok(acc | flag)
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl FromStr for TlsVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls12" | "tls1.2" => Ok(TlsVersion::Tls12),
            "tls13" | "tls1.3" => Ok(TlsVersion::Tls13),
            other => Err(format!("unknown tls version '{}'", other)),
        }
    }
}

/// TLS settings of a [`crate::ConnectionOptions`].
#[derive(Clone, Default)]
pub struct TlsOptions {
    pub enabled: bool,
    pub server_name: Option<String>,
    pub cert_path: Option<PathBuf>,
    pub cert_passphrase: Option<Secret>,
    pub acceptable_policy_errors: PolicyErrors,
    pub check_certificate_revocation: bool,
    /// Empty means the wrapped library picks.
    pub versions: Vec<TlsVersion>,
    pub certificate_selection_hook: Option<CertificateSelectionHook>,
    pub certificate_validation_hook: Option<CertificateValidationHook>,
    pub certificates: Vec<CertificateDer<'static>>,
}

impl TlsOptions {
    pub fn enabled() -> TlsOptions {
        TlsOptions {
            enabled: true,
            ..TlsOptions::default()
        }
    }

    /// Reads every PEM certificate found at `cert_path` and appends it to
    /// `certificates`. Returns how many were loaded.
    pub fn load_certificates(&mut self) -> Result<usize, CertificateError> {
        let path = self.cert_path.as_ref().ok_or(CertificateError::MissingPath)?;
        let read_error = |source| CertificateError::Read {
            path: path.display().to_string(),
            source,
        };

        let mut reader = BufReader::new(File::open(path).map_err(read_error)?);
        let certificates = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        let loaded = certificates.len();
        self.certificates.extend(certificates);
        Ok(loaded)
    }
}

impl fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsOptions")
            .field("enabled", &self.enabled)
            .field("server_name", &self.server_name)
            .field("cert_path", &self.cert_path)
            .field("cert_passphrase", &self.cert_passphrase)
            .field("acceptable_policy_errors", &self.acceptable_policy_errors)
            .field(
                "check_certificate_revocation",
                &self.check_certificate_revocation,
            )
            .field("versions", &self.versions)
            .field(
                "certificate_selection_hook",
                &self.certificate_selection_hook.is_some(),
            )
            .field(
                "certificate_validation_hook",
                &self.certificate_validation_hook.is_some(),
            )
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// Native TLS configuration handed to the wrapped client libraries.
#[derive(Clone, Default)]
pub struct SslOption {
    pub enabled: bool,
    pub server_name: Option<String>,
    pub cert_path: Option<PathBuf>,
    pub cert_passphrase: Option<Secret>,
    pub acceptable_policy_errors: PolicyErrors,
    pub check_certificate_revocation: bool,
    pub versions: Vec<TlsVersion>,
    pub certificate_selection_callback: Option<CertificateSelectionHook>,
    pub certificate_validation_callback: Option<CertificateValidationHook>,
    pub certs: Vec<CertificateDer<'static>>,
}

impl From<&TlsOptions> for SslOption {
    fn from(tls: &TlsOptions) -> Self {
        SslOption {
            enabled: tls.enabled,
            server_name: tls.server_name.clone(),
            cert_path: tls.cert_path.clone(),
            cert_passphrase: tls.cert_passphrase.clone(),
            acceptable_policy_errors: tls.acceptable_policy_errors,
            check_certificate_revocation: tls.check_certificate_revocation,
            versions: tls.versions.clone(),
            certificate_selection_callback: tls.certificate_selection_hook.clone(),
            certificate_validation_callback: tls.certificate_validation_hook.clone(),
            certs: tls.certificates.clone(),
        }
    }
}

impl fmt::Debug for SslOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslOption")
            .field("enabled", &self.enabled)
            .field("server_name", &self.server_name)
            .field("cert_path", &self.cert_path)
            .field("cert_passphrase", &self.cert_passphrase)
            .field("acceptable_policy_errors", &self.acceptable_policy_errors)
            .field(
                "check_certificate_revocation",
                &self.check_certificate_revocation,
            )
            .field("versions", &self.versions)
            .field("certs", &self.certs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{PolicyErrors, TlsOptions, TlsVersion};
    use crate::error::CertificateError;

    #[test]
    fn policy_errors_parse_flag_list() {
        let errors: PolicyErrors = "RemoteCertificateNameMismatch, RemoteCertificateChainErrors"
            .parse()
            .unwrap();

        assert!(errors.contains(PolicyErrors::REMOTE_CERTIFICATE_NAME_MISMATCH));
        assert!(errors.contains(PolicyErrors::REMOTE_CERTIFICATE_CHAIN_ERRORS));
        assert!(!errors.contains(PolicyErrors::REMOTE_CERTIFICATE_NOT_AVAILABLE));
        assert!("None".parse::<PolicyErrors>().unwrap().is_empty());
        assert!("Whatever".parse::<PolicyErrors>().is_err());
    }

    #[test]
    fn tls_version_parse() {
        assert_eq!(Ok(TlsVersion::Tls12), "Tls12".parse());
        assert_eq!(Ok(TlsVersion::Tls13), "tls1.3".parse());
    }

    #[test]
    fn load_certificates_without_path_fails() {
        let mut tls = TlsOptions::enabled();

        assert!(matches!(
            tls.load_certificates(),
            Err(CertificateError::MissingPath)
        ));
    }

    #[test]
    fn load_certificates_from_pem_file() {
        let path = std::env::temp_dir().join(format!(
            "rabbitmq-named-clients-{}.pem",
            std::process::id()
        ));
        // body is arbitrary DER bytes, rustls-pemfile does not parse it
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "-----BEGIN CERTIFICATE-----").unwrap();
        writeln!(file, "MAMCAQE=").unwrap();
        writeln!(file, "-----END CERTIFICATE-----").unwrap();
        drop(file);

        let mut tls = TlsOptions {
            cert_path: Some(path.clone()),
            ..TlsOptions::enabled()
        };

        assert_eq!(1, tls.load_certificates().unwrap());
        assert_eq!(1, tls.certificates.len());
        assert_eq!(&[0x30, 0x03, 0x02, 0x01, 0x01], &tls.certificates[0][..]);

        std::fs::remove_file(path).unwrap();
    }
}
