//! Secret Resolver
//!
//! Resolves `fromSecretRef` indirections into a transient working copy of
//! the sensitive fields. Resolution is all-or-nothing per resource: either
//! every required key is decoded, or the resource fails with a reference
//! error and nothing is handed to rendering.

use crate::crd::{Client, Cluster, SecretRef, User};
use crate::domain::ports::SecretSourceRef;
use crate::error::{Error, Result};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

// =============================================================================
// Resolved Working Copies
// =============================================================================

/// Client with its shared secret resolved
#[derive(Clone, PartialEq)]
pub struct ResolvedClient {
    pub name: String,
    pub ip_address: String,
    pub secret: Option<String>,
}

/// User with credentials resolved
#[derive(Clone, PartialEq)]
pub struct ResolvedUser {
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Certificate material of a cluster
#[derive(Clone, Default, PartialEq)]
pub struct ResolvedCertificate {
    pub private_key_password: Option<String>,
    pub ca: Option<String>,
    pub dh: Option<String>,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl std::fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("name", &self.name)
            .field("ip_address", &self.ip_address)
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

impl std::fmt::Debug for ResolvedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedUser")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

impl std::fmt::Debug for ResolvedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCertificate")
            .field("private_key_password", &redact(&self.private_key_password))
            .field("ca", &self.ca.is_some())
            .field("dh", &self.dh.is_some())
            .field("private_key", &redact(&self.private_key))
            .field("public_key", &self.public_key.is_some())
            .finish()
    }
}

// =============================================================================
// Loaded Secret
// =============================================================================

/// Data of a referenced secret, remembering who referenced it
struct LoadedSecret<'a> {
    kind: &'a str,
    resource: &'a str,
    namespace: String,
    name: String,
    data: BTreeMap<String, ByteString>,
}

impl LoadedSecret<'_> {
    fn malformed(&self, key: &str, reason: &str) -> Error {
        Error::MalformedReference {
            kind: self.kind.to_string(),
            resource: self.resource.to_string(),
            secret_namespace: self.namespace.clone(),
            secret_name: self.name.clone(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Decode one required key as UTF-8 text
    fn decode(&self, key: &str) -> Result<String> {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| self.malformed(key, "key is missing"))?;

        String::from_utf8(value.0.clone())
            .map_err(|_| self.malformed(key, "value is not valid UTF-8"))
    }
}

// =============================================================================
// Secret Resolver
// =============================================================================

/// Resolves secret references of clients, users and cluster certificates
#[derive(Clone)]
pub struct SecretResolver {
    source: SecretSourceRef,
    allow_cross_namespace: bool,
}

impl SecretResolver {
    pub fn new(source: SecretSourceRef) -> Self {
        Self {
            source,
            allow_cross_namespace: true,
        }
    }

    /// Whether references may point at secrets outside the resource's namespace
    pub fn with_cross_namespace(mut self, allow: bool) -> Self {
        self.allow_cross_namespace = allow;
        self
    }

    /// Resolve the shared secret of a client
    pub async fn resolve_client(&self, namespace: &str, client: &Client) -> Result<ResolvedClient> {
        let name = client.name_any();

        let secret = match &client.spec.from_secret_ref {
            Some(reference) => {
                debug!(namespace = %namespace, client = %name, "Found secretRef for client; loading in secret");
                let loaded = self.load(namespace, "Client", &name, reference).await?;
                Some(loaded.decode("secret")?)
            }
            None => client.spec.secret.clone(),
        };

        Ok(ResolvedClient {
            ip_address: client.spec.ip_address.clone(),
            name,
            secret,
        })
    }

    /// Resolve the credentials of a user
    pub async fn resolve_user(&self, namespace: &str, user: &User) -> Result<ResolvedUser> {
        let name = user.name_any();

        let (username, password) = match &user.spec.from_secret_ref {
            Some(reference) => {
                debug!(namespace = %namespace, user = %name, "Found secretRef for user; loading in username/password");
                let loaded = self.load(namespace, "User", &name, reference).await?;
                (Some(loaded.decode("username")?), Some(loaded.decode("password")?))
            }
            None => (user.spec.username.clone(), user.spec.password.clone()),
        };

        Ok(ResolvedUser {
            name,
            username,
            password,
        })
    }

    /// Resolve the certificate material of a cluster
    pub async fn resolve_certificate(&self, namespace: &str, cluster: &Cluster) -> Result<ResolvedCertificate> {
        let name = cluster.name_any();
        let certificate = &cluster.spec.certificate;

        match &certificate.from_secret_ref {
            Some(reference) => {
                debug!(namespace = %namespace, cluster = %name, "Found secretRef for certificate; loading in certificate");
                let loaded = self.load(namespace, "Cluster", &name, reference).await?;
                Ok(ResolvedCertificate {
                    private_key_password: Some(loaded.decode("privateKeyPassword")?),
                    ca: Some(loaded.decode("ca")?),
                    dh: Some(loaded.decode("dh")?),
                    private_key: Some(loaded.decode("privateKey")?),
                    public_key: Some(loaded.decode("publicKey")?),
                })
            }
            None => {
                let inline = certificate.certificates.clone().unwrap_or_default();
                Ok(ResolvedCertificate {
                    private_key_password: certificate.private_key_password.clone(),
                    ca: inline.ca,
                    dh: inline.dh,
                    private_key: inline.private_key,
                    public_key: inline.public_key,
                })
            }
        }
    }

    /// Resolve every client, preserving order; the first failure wins
    pub async fn resolve_clients(&self, namespace: &str, clients: &[Client]) -> Result<Vec<ResolvedClient>> {
        futures::future::try_join_all(clients.iter().map(|c| self.resolve_client(namespace, c))).await
    }

    /// Resolve every user, preserving order; the first failure wins
    pub async fn resolve_users(&self, namespace: &str, users: &[User]) -> Result<Vec<ResolvedUser>> {
        futures::future::try_join_all(users.iter().map(|u| self.resolve_user(namespace, u))).await
    }

    async fn load<'a>(
        &self,
        namespace: &str,
        kind: &'a str,
        resource: &'a str,
        reference: &SecretRef,
    ) -> Result<LoadedSecret<'a>> {
        let secret_namespace = reference.namespace_or(namespace).to_string();
        let not_found = || Error::ReferenceNotFound {
            kind: kind.to_string(),
            resource: resource.to_string(),
            secret_namespace: secret_namespace.clone(),
            secret_name: reference.name.clone(),
        };

        if secret_namespace != namespace && !self.allow_cross_namespace {
            warn!(
                kind = %kind,
                resource = %resource,
                secret_namespace = %secret_namespace,
                "Cross-namespace secret references are disabled"
            );
            return Err(not_found());
        }

        let secret = match self.source.read_secret(&secret_namespace, &reference.name).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                error!(kind = %kind, resource = %resource, secret = %reference.name, "Invalid secretRef");
                return Err(not_found());
            }
            Err(e) => {
                error!(kind = %kind, resource = %resource, secret = %reference.name, error = %e, "Failed to read secretRef");
                return Err(not_found());
            }
        };

        Ok(LoadedSecret {
            kind,
            resource,
            namespace: secret_namespace.clone(),
            name: reference.name.clone(),
            data: secret.data.unwrap_or_default(),
        })
    }
}
