//! # Connectivity Prober
//!
//! Best-effort session probe against the cluster's advertised connection
//! endpoint: open a session, then retry one minimal write until it lands.
//!
//! Session establishment is the only terminal failure. Once a session
//! exists, every write failure is classified transient and retried on a
//! short budget, because an unready replica set, unpropagated credentials,
//! and a not-yet-valid TLS chain are indistinguishable from "not converged
//! yet" at this layer.

use crate::checks::Check;
use crate::constants;
use crate::crd::MongoDbCluster;
use crate::error::HarnessError;
use crate::wait::poll_until;
use kube::ResourceExt;
use mongodb::bson::doc;
use mongodb::options::{AuthMechanism, ClientOptions, Credential, Tls, TlsOptions};
use mongodb::Client;
use std::path::PathBuf;
use tracing::{debug, info};

/// Transport security for a probe session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plaintext connection
    #[default]
    Disabled,
    /// TLS-secured connection, optionally pinning a CA bundle
    Enabled {
        /// CA certificate bundle to validate the server chain against
        ca_file: Option<PathBuf>,
    },
}

/// Credentials for a probe session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOptions {
    /// SCRAM mechanism to authenticate with
    pub mechanism: ScramMechanism,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// Supported authentication mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramMechanism {
    /// SCRAM-SHA-256
    Sha256,
    /// SCRAM-SHA-1
    Sha1,
}

/// Enumerated session configuration for the prober.
///
/// The secured and insecure variants are the same primitive with a
/// different [`TlsMode`], so complementary "succeeds with TLS" / "fails
/// without TLS" scenarios stay symmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Credentials; anonymous when absent
    pub auth: Option<AuthOptions>,
    /// Transport security
    pub tls: TlsMode,
}

impl SessionOptions {
    /// SCRAM-SHA-256 credentials, no transport security.
    pub fn scram(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthOptions {
                mechanism: ScramMechanism::Sha256,
                username: username.into(),
                password: password.into(),
            }),
            tls: TlsMode::Disabled,
        }
    }

    /// Same session, TLS required.
    pub fn with_tls(mut self, ca_file: Option<PathBuf>) -> Self {
        self.tls = TlsMode::Enabled { ca_file };
        self
    }

    /// Same session, TLS off.
    pub fn without_tls(mut self) -> Self {
        self.tls = TlsMode::Disabled;
        self
    }

    fn apply(self, options: &mut ClientOptions) {
        if let Some(auth) = self.auth {
            let mechanism = match auth.mechanism {
                ScramMechanism::Sha256 => AuthMechanism::ScramSha256,
                ScramMechanism::Sha1 => AuthMechanism::ScramSha1,
            };
            let mut credential = Credential::default();
            credential.username = Some(auth.username);
            credential.password = Some(auth.password);
            credential.mechanism = Some(mechanism);
            options.credential = Some(credential);
        }
        options.tls = Some(match self.tls {
            TlsMode::Disabled => Tls::Disabled,
            TlsMode::Enabled { ca_file } => {
                let mut tls = TlsOptions::default();
                tls.ca_file_path = ca_file;
                Tls::Enabled(tls)
            }
        });
    }
}

/// Open a session against `uri` and perform one minimal write.
///
/// The whole probe is bounded by the session timeout; inside it, the write
/// is retried on the short write budget with every failure treated as
/// transient.
pub async fn probe(uri: &str, session: SessionOptions) -> Result<(), HarnessError> {
    let probe = async {
        let mut options = ClientOptions::parse(uri).await?;
        options.connect_timeout = Some(constants::CONNECTIVITY_SESSION_TIMEOUT);
        session.apply(&mut options);
        let client = Client::with_options(options).map_err(HarnessError::Session)?;
        debug!(uri, "session established, starting write probe");

        let collection = client
            .database("testing")
            .collection::<mongodb::bson::Document>("numbers");
        poll_until(
            &format!("write probe against {uri}"),
            constants::CONNECTIVITY_WRITE_INTERVAL,
            constants::CONNECTIVITY_WRITE_TIMEOUT,
            || {
                let collection = collection.clone();
                async move {
                    match collection
                        .insert_one(doc! { "name": "pi", "value": 3.14159 })
                        .await
                    {
                        Ok(_) => Ok(true),
                        Err(error) => {
                            debug!(error = %error, "write not accepted yet");
                            Ok(false)
                        }
                    }
                }
            },
        )
        .await
    };
    match tokio::time::timeout(constants::CONNECTIVITY_SESSION_TIMEOUT, probe).await {
        Ok(result) => result,
        Err(_) => Err(HarnessError::Timeout {
            condition: format!("session against {uri}"),
        }),
    }
}

/// A probe with the given session options succeeds.
pub fn connectivity_succeeds(mdb: &MongoDbCluster, session: SessionOptions) -> Check {
    let uri = mdb.mongo_uri();
    Check::new(
        format!("connectivity to {} succeeds", mdb.name_any()),
        move |_ctx| async move {
            probe(&uri, session).await?;
            info!(uri = %uri, "connectivity probe succeeded");
            Ok(())
        },
    )
}

/// A probe with the given session options fails. The complementary half of
/// a TLS toggle scenario: plaintext against a secured cluster must not work.
pub fn connectivity_fails(mdb: &MongoDbCluster, session: SessionOptions) -> Check {
    let uri = mdb.mongo_uri();
    let name = mdb.name_any();
    Check::new(
        format!("connectivity to {name} fails"),
        move |_ctx| async move {
            match probe(&uri, session).await {
                Ok(()) => Err(HarnessError::AssertionFailure {
                    subject: format!("connectivity to {name}"),
                    expected: "probe to fail".to_string(),
                    actual: "probe succeeded".to_string(),
                }),
                Err(_) => Ok(()),
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secured_and_insecure_variants_share_the_same_primitive() {
        let base = SessionOptions::scram("e2e-user", "s3cr3t");
        let secured = base.clone().with_tls(None);
        let insecure = secured.clone().without_tls();

        assert_eq!(secured.auth, base.auth);
        assert_eq!(secured.tls, TlsMode::Enabled { ca_file: None });
        assert_eq!(insecure, base);
    }

    #[test]
    fn session_options_map_onto_driver_options() {
        let mut options = ClientOptions::default();
        SessionOptions::scram("e2e-user", "s3cr3t")
            .with_tls(Some(PathBuf::from("/certs/ca.crt")))
            .apply(&mut options);

        let credential = options.credential.expect("credential set");
        assert_eq!(credential.username.as_deref(), Some("e2e-user"));
        assert_eq!(credential.mechanism, Some(AuthMechanism::ScramSha256));
        match options.tls {
            Some(Tls::Enabled(tls)) => {
                assert_eq!(tls.ca_file_path, Some(PathBuf::from("/certs/ca.crt")));
            }
            other => panic!("expected TLS enabled, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_session_sets_no_credential() {
        let mut options = ClientOptions::default();
        SessionOptions::default().apply(&mut options);
        assert!(options.credential.is_none());
        assert!(matches!(options.tls, Some(Tls::Disabled)));
    }
}
