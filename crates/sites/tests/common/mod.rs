//! Recording collaborators for registry tests.
//!
//! Every side-effecting call is appended to a shared [`Journal`] so tests can
//! assert on the exact order of lifecycle steps. Each fake can be told to
//! fail its next calls.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use staticland_sites::{
    CertError, CertRequest, CertificateIssuer, CommandOutput, MemoryStore, ProvisionError,
    RedirectVhost, RegistrySettings, Site, SiteDirectories, SiteRegistry, SslVhost, Store,
    StoreError, VhostConfigurator, VhostError,
};

/// Ordered log of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ============================================================================
// Store
// ============================================================================

pub struct RecordingStore {
    inner: MemoryStore<Site>,
    journal: Journal,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl Store<Site> for RecordingStore {
    async fn save(&self, record: Site) -> Result<Site, StoreError> {
        self.journal.record(format!("store.save {}", record.domain()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.save(record).await
    }

    async fn update(&self, record: Site) -> Result<Site, StoreError> {
        self.journal.record(format!("store.update {}", record.domain()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.update(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.journal.record(format!("store.delete {}", key));
        self.inner.delete(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Site>, StoreError> {
        self.inner.get(key).await
    }

    async fn find(&self, index: &str, value: &str) -> Result<Vec<Site>, StoreError> {
        self.inner.find(index, value).await
    }
}

// ============================================================================
// Directories
// ============================================================================

pub struct FakeDirs {
    journal: Journal,
    pub fail_create: AtomicBool,
    pub fail_destroy: AtomicBool,
}

#[async_trait]
impl SiteDirectories for FakeDirs {
    async fn create(&self, domain: &str) -> Result<(), ProvisionError> {
        self.journal.record(format!("dirs.create {}", domain));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ProvisionError::Create {
                path: PathBuf::from("/srv/sites").join(domain),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(())
    }

    async fn destroy(&self, domain: &str) -> Result<(), ProvisionError> {
        self.journal.record(format!("dirs.destroy {}", domain));
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(ProvisionError::Remove {
                path: PathBuf::from("/srv/sites").join(domain),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Certificates
// ============================================================================

pub struct FakeCerts {
    journal: Journal,
    pub fail: AtomicBool,
    pub requests: Mutex<Vec<CertRequest>>,
}

pub const SECRET_OUTPUT: &str = "account key: s3cr3t";

#[async_trait]
impl CertificateIssuer for FakeCerts {
    async fn create(&self, request: &CertRequest) -> Result<CommandOutput, CertError> {
        self.journal.record(format!("certs.create {}", request.domain));
        self.requests.lock().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(CertError::Failed {
                status: Some(1),
                output: CommandOutput {
                    stdout: String::new(),
                    stderr: SECRET_OUTPUT.to_string(),
                },
            });
        }
        Ok(CommandOutput::default())
    }
}

// ============================================================================
// Vhosts
// ============================================================================

pub struct FakeVhosts {
    journal: Journal,
    pub files: Mutex<BTreeSet<String>>,
    pub fail_ssl: AtomicBool,
    pub fail_remove: AtomicBool,
}

#[async_trait]
impl VhostConfigurator for FakeVhosts {
    async fn ssl(&self, vhost: &SslVhost) -> Result<(), VhostError> {
        self.journal.record(format!("vhosts.ssl {}", vhost.domain));
        if self.fail_ssl.load(Ordering::SeqCst) {
            return Err(VhostError::Reload("nginx: [emerg] bad config".to_string()));
        }
        self.files.lock().insert(vhost.domain.clone());
        Ok(())
    }

    async fn redirect(&self, vhost: &RedirectVhost) -> Result<(), VhostError> {
        self.journal
            .record(format!("vhosts.redirect {} -> {}", vhost.redirect, vhost.domain));
        self.files.lock().insert(vhost.redirect.clone());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, VhostError> {
        Ok(self.files.lock().contains(name))
    }

    async fn remove(&self, name: &str) -> Result<(), VhostError> {
        self.journal.record(format!("vhosts.remove {}", name));
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(VhostError::Remove {
                path: PathBuf::from("/srv/vhosts").join(format!("{}.conf", name)),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        self.files.lock().remove(name);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub registry: SiteRegistry,
    pub journal: Journal,
    pub records: MemoryStore<Site>,
    pub store: Arc<RecordingStore>,
    pub dirs: Arc<FakeDirs>,
    pub certs: Arc<FakeCerts>,
    pub vhosts: Arc<FakeVhosts>,
}

pub fn settings(reserved: &[&str]) -> RegistrySettings {
    RegistrySettings {
        apex_domain: "static.land".to_string(),
        reserved_subdomains: reserved.iter().map(|s| s.to_string()).collect(),
        reload_nginx: true,
        sites_dir: PathBuf::from("/srv/sites"),
        certs_dir: PathBuf::from("/srv/letsencrypt/config"),
    }
}

pub fn harness(reserved: &[&str]) -> Harness {
    let journal = Journal::default();
    let records = MemoryStore::new();

    let store = Arc::new(RecordingStore {
        inner: records.clone(),
        journal: journal.clone(),
        fail_writes: AtomicBool::new(false),
    });
    let dirs = Arc::new(FakeDirs {
        journal: journal.clone(),
        fail_create: AtomicBool::new(false),
        fail_destroy: AtomicBool::new(false),
    });
    let certs = Arc::new(FakeCerts {
        journal: journal.clone(),
        fail: AtomicBool::new(false),
        requests: Mutex::new(Vec::new()),
    });
    let vhosts = Arc::new(FakeVhosts {
        journal: journal.clone(),
        files: Mutex::new(BTreeSet::new()),
        fail_ssl: AtomicBool::new(false),
        fail_remove: AtomicBool::new(false),
    });

    let registry = SiteRegistry::new(
        settings(reserved),
        store.clone(),
        dirs.clone(),
        certs.clone(),
        vhosts.clone(),
    );

    Harness {
        registry,
        journal,
        records,
        store,
        dirs,
        certs,
        vhosts,
    }
}

pub fn owners(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
