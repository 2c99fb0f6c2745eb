//! Camera registry: discovered cameras and their control handles.

use std::collections::BTreeMap;

use camrig_client::{BackendClient, ClientResult};
use camrig_models::{CameraDescriptor, CameraPath};
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::activity::ActivityLog;
use crate::capabilities::{fetch_capabilities, Capabilities};
use crate::control::CameraControl;
use crate::metrics::record_capability_failure;

/// One discovered camera.
#[derive(Debug, Clone)]
pub struct RegisteredCamera {
    pub descriptor: CameraDescriptor,
    pub control: CameraControl,
}

/// Cameras known to the session, ordered by camera path.
///
/// An empty registry is the distinguished "no cameras detected" state.
#[derive(Debug, Clone, Default)]
pub struct CameraRegistry {
    cameras: BTreeMap<CameraPath, RegisteredCamera>,
}

impl CameraRegistry {
    /// Discover cameras and fetch every camera's capabilities concurrently.
    ///
    /// A failed capability fetch degrades only that camera to
    /// [`Capabilities::Unknown`]. A failed registry fetch is an error.
    pub async fn load(client: &BackendClient, activity: &ActivityLog) -> ClientResult<Self> {
        let descriptors = client.list_cameras().await?;

        if descriptors.is_empty() {
            info!("No cameras detected");
            activity.info("No cameras detected");
            return Ok(Self::default());
        }

        let fetches = descriptors.iter().map(|(path, descriptor)| async move {
            let capabilities = match fetch_capabilities(client, path).await {
                Ok(caps) => Capabilities::Known(caps),
                Err(e) => {
                    warn!(camera_path = %path, "Capability fetch failed, degrading: {}", e);
                    record_capability_failure();
                    activity.error(format!(
                        "Could not read capabilities of {}: {}",
                        descriptor.friendly_name,
                        e.user_message()
                    ));
                    Capabilities::Unknown
                }
            };
            (path, descriptor, capabilities)
        });

        let cameras = join_all(fetches)
            .await
            .into_iter()
            .map(|(path, descriptor, capabilities)| {
                let control = CameraControl::new(
                    path.clone(),
                    descriptor.friendly_name.clone(),
                    capabilities,
                    client.clone(),
                    activity.clone(),
                );
                (
                    path.clone(),
                    RegisteredCamera {
                        descriptor: descriptor.clone(),
                        control,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        info!(count = cameras.len(), "Loaded camera registry");
        activity.info(format!("Loaded {} camera(s)", cameras.len()));
        Ok(Self { cameras })
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn get(&self, path: &CameraPath) -> Option<&RegisteredCamera> {
        self.cameras.get(path)
    }

    pub fn control(&self, path: &CameraPath) -> Option<CameraControl> {
        self.cameras.get(path).map(|c| c.control.clone())
    }

    /// Find a camera by path or friendly name.
    pub fn find(&self, key: &str) -> Option<&RegisteredCamera> {
        self.cameras
            .get(&CameraPath::from(key))
            .or_else(|| {
                self.cameras
                    .values()
                    .find(|c| c.descriptor.friendly_name == key)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CameraPath, &RegisteredCamera)> {
        self.cameras.iter()
    }

    /// Control handles of every registered camera, in path order.
    pub fn controls(&self) -> Vec<CameraControl> {
        self.cameras.values().map(|c| c.control.clone()).collect()
    }
}
