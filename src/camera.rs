//! Camera identity and static configuration
//!
//! A [`CameraRef`] identifies one remote camera endpoint. It is created when
//! the configuration is loaded and never mutated afterwards; every other part
//! of the pipeline borrows or clones it.

use std::collections::HashMap;

/// Unique identifier for a camera
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraId(String);

impl CameraId {
    /// Create a new camera ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Immutable reference to a configured camera endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraRef {
    /// Camera identity
    id: CameraId,
    /// Base network address, e.g. "http://192.168.68.67:8889"
    addr: String,
    /// Signaling path appended to the address, e.g. "/cam/whep"
    signaling_path: String,
    /// Direct playback URL for cameras that serve video without WHEP
    direct_url: Option<String>,
}

impl CameraRef {
    /// Default WHEP signaling path used by the camera firmware
    pub const DEFAULT_SIGNALING_PATH: &'static str = "/cam/whep";

    /// Create a camera reference with the default signaling path
    pub fn new(id: impl Into<CameraId>, addr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
            signaling_path: Self::DEFAULT_SIGNALING_PATH.to_string(),
            direct_url: None,
        }
    }

    /// Create a camera reference with a custom signaling path
    pub fn with_signaling_path(
        id: impl Into<CameraId>,
        addr: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
            signaling_path: path.into(),
            direct_url: None,
        }
    }

    /// Create a camera that plays back from a direct URL, skipping WHEP
    ///
    /// Sessions for such cameras connect without negotiating; the
    /// application renders the URL itself.
    pub fn with_direct_url(id: impl Into<CameraId>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: id.into(),
            addr: url.clone(),
            signaling_path: Self::DEFAULT_SIGNALING_PATH.to_string(),
            direct_url: Some(url),
        }
    }

    /// Camera identity
    pub fn id(&self) -> &CameraId {
        &self.id
    }

    /// Base network address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Direct playback URL, if this camera bypasses WHEP
    pub fn direct_url(&self) -> Option<&str> {
        self.direct_url.as_deref()
    }

    /// Full WHEP endpoint URL for this camera
    pub fn whep_url(&self) -> String {
        format!("{}{}", self.addr.trim_end_matches('/'), self.signaling_path)
    }
}

impl std::fmt::Display for CameraRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.addr)
    }
}

impl From<&str> for CameraRef {
    /// Build a reference from a bare address, using the address as the ID
    fn from(addr: &str) -> Self {
        Self::new(addr, addr)
    }
}

/// Static directory of configured cameras
///
/// Loaded once at startup from whatever configuration source the application
/// uses; the pipeline only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct CameraDirectory {
    cameras: HashMap<CameraId, CameraRef>,
}

impl CameraDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from (id, address) pairs
    pub fn from_entries<I, S, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, A)>,
        S: Into<String>,
        A: Into<String>,
    {
        let cameras = entries
            .into_iter()
            .map(|(id, addr)| {
                let camera = CameraRef::new(CameraId::new(id), addr);
                (camera.id().clone(), camera)
            })
            .collect();
        Self { cameras }
    }

    /// Add a camera to the directory
    pub fn insert(&mut self, camera: CameraRef) {
        self.cameras.insert(camera.id().clone(), camera);
    }

    /// Look up a camera by ID
    pub fn get(&self, id: &CameraId) -> Option<&CameraRef> {
        self.cameras.get(id)
    }

    /// Number of configured cameras
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Iterate over all configured cameras
    pub fn iter(&self) -> impl Iterator<Item = &CameraRef> {
        self.cameras.values()
    }
}
