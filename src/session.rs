use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::affine::AffineTransform;
use crate::epsg::Crs;
use crate::gcp::GcpStore;
use crate::image::RasterInfo;
use crate::math::Vec2f;
use crate::rewrite::rewrite;
use crate::tiff::reader::TiffReader;
use crate::Error;

/// What to do with control points whose pixel coordinates fall outside the
/// raster. Extrapolating is legitimate (a landmark just outside a cropped
/// image), so rejection is opt-in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsPolicy {
    Extrapolate,
    Reject,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where uploaded images and georeferenced outputs are stored
    pub image_dir: PathBuf,
    /// The CRS tagged onto outputs. Configuration, never derived from points.
    pub output_crs: Crs,
    pub bounds_policy: BoundsPolicy,
}

impl SessionConfig {
    pub fn new(image_dir: &Path) -> SessionConfig {
        SessionConfig {
            image_dir: image_dir.to_path_buf(),
            output_crs: Crs::Wgs84,
            bounds_policy: BoundsPolicy::Extrapolate,
        }
    }
}

#[derive(Debug)]
enum SessionState {
    NoImage,
    HasImage {
        path: PathBuf,
        info: RasterInfo,
    },
    Georeferenced {
        path: PathBuf,
        info: RasterInfo,
        output: PathBuf,
        transform: AffineTransform,
    },
}

/// One user's georeferencing workflow: upload an image, collect control
/// points, georeference, download.
///
/// State machine: NoImage -> HasImage -> Georeferenced. A failed
/// georeference leaves the state untouched; adding points after a successful
/// one is allowed and only affects the output once georeference is requested
/// again.
#[derive(Debug)]
pub struct Session {
    // The session key as it appears in stored file names, see sanitize_key
    file_key: String,
    config: SessionConfig,
    store: GcpStore,
    state: SessionState,
    last_active: Instant,
}

/// Session keys get spliced into file names under the image dir, so anything
/// that could act as a path separator is replaced
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Session {
    pub fn new(key: &str, config: SessionConfig) -> Session {
        Session {
            file_key: sanitize_key(key),
            config,
            store: GcpStore::new(),
            state: SessionState::NoImage,
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Stores an uploaded image and adopts it as the active source raster.
    /// Any previously collected points and any previous output are dropped.
    ///
    /// The payload is validated on a temporary file and only renamed to the
    /// stored name afterwards: a re-upload of a broken payload under the same
    /// filename must not clobber the currently adopted source.
    pub async fn upload(&mut self, filename: &str, data: Bytes) -> Result<PathBuf, Error> {
        self.touch();
        // Only keep the final path component of whatever the client sent
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| Error::InvalidData(format!("Invalid upload filename {:?}", filename)))?;
        tokio::fs::create_dir_all(&self.config.image_dir).await?;
        // Namespace by session key so two sessions uploading "map.tif" don't
        // clobber each other
        let mut stored_name = std::ffi::OsString::from(format!("{}_", self.file_key));
        stored_name.push(name);
        let path = self.config.image_dir.join(stored_name);

        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(".upload");
        let tmp_path = PathBuf::from(tmp_name);
        tokio::fs::write(&tmp_path, &data).await?;
        let info = match TiffReader::open(&tmp_path).await {
            Ok(reader) => reader.info().clone(),
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&tmp_path, &path).await?;

        self.store.adopt_raster(&path);
        self.state = SessionState::HasImage {
            path: path.clone(),
            info,
        };
        Ok(path)
    }

    /// Appends a control point, returning the new count
    pub fn add_gcp(&mut self, pixel: Vec2f, geo: Vec2f) -> Result<usize, Error> {
        self.touch();
        let info = match &self.state {
            SessionState::NoImage => {
                return Err(Error::NotFound("No image uploaded".to_string()));
            }
            SessionState::HasImage { info, .. } => info,
            SessionState::Georeferenced { info, .. } => info,
        };
        if self.config.bounds_policy == BoundsPolicy::Reject {
            let (w, h) = (info.width as f64, info.height as f64);
            if pixel.x < 0.0 || pixel.x > w || pixel.y < 0.0 || pixel.y > h {
                return Err(Error::PixelOutOfBounds(format!(
                    "Pixel ({}, {}) outside raster of {}x{} pixels",
                    pixel.x, pixel.y, info.width, info.height
                )));
            }
        }
        Ok(self.store.add(pixel, geo))
    }

    pub fn gcp_count(&self) -> usize {
        self.store.count()
    }

    /// Drops collected points but keeps the uploaded image
    pub fn reset_gcps(&mut self) {
        self.touch();
        self.store.reset();
    }

    /// Estimates the transform from the collected points and writes the
    /// georeferenced copy. On any error the session state is unchanged and no
    /// output exists.
    pub async fn georeference(&mut self) -> Result<PathBuf, Error> {
        self.touch();
        let (path, info) = match &self.state {
            SessionState::NoImage => {
                return Err(Error::NotFound("No image uploaded".to_string()));
            }
            SessionState::HasImage { path, info } => (path.clone(), info.clone()),
            SessionState::Georeferenced { path, info, .. } => (path.clone(), info.clone()),
        };
        // Estimate on a snapshot so the live store stays free to mutate
        let snapshot = self.store.snapshot();
        let transform = AffineTransform::from_gcps(&snapshot.gcps)?;

        let output = self
            .config
            .image_dir
            .join(format!("georeferenced_{}.tif", self.file_key));
        rewrite(&path, &output, &transform, self.config.output_crs).await?;

        self.state = SessionState::Georeferenced {
            path,
            info,
            output: output.clone(),
            transform,
        };
        Ok(output)
    }

    /// The georeferenced output, available only after a successful
    /// georeference
    pub fn output(&self) -> Result<&Path, Error> {
        match &self.state {
            SessionState::Georeferenced { output, .. } => Ok(output),
            _ => Err(Error::NotFound(
                "Georeferenced image not found".to_string(),
            )),
        }
    }

    pub fn transform(&self) -> Option<&AffineTransform> {
        match &self.state {
            SessionState::Georeferenced { transform, .. } => Some(transform),
            _ => None,
        }
    }
}

/// Session-keyed map handing out independent `Session`s, so concurrent users
/// never interleave control points or outputs. Sessions are created on first
/// access and reaped either explicitly or by idle time.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> SessionRegistry {
        SessionRegistry {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `key`, creating it if needed. The returned
    /// handle can be locked independently of the registry, so long-running
    /// raster I/O in one session never blocks the others.
    pub async fn session(&self, key: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(key, self.config.clone()))))
            .clone()
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.sessions.lock().await.remove(key).is_some()
    }

    /// Drops sessions idle for longer than `max_idle`. Sessions currently
    /// locked by a request are considered active and kept.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => session.idle_for() <= max_idle,
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
