//! Client side of the external record store.
//!
//! Requests run on a background thread so the UI never waits on the network;
//! the UI drains [`StoreEvent`]s once per frame.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::AnnotationSet;
use crate::persist;

const SESSION_COOKIE: &str = "authToken";

/// Photo row as returned by `GET /photos/{id}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub project_id: Option<String>,
    pub image_file: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Raw stored blob; see [`persist::parse_annotations`].
    #[serde(default)]
    pub annotations: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedProject {
    #[serde(default)]
    pub job_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub site_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub photos: Vec<SharedPhoto>,
    #[serde(default)]
    pub notes: Vec<SharedNote>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPhoto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub image_file: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub annotations: Option<Value>,
    #[serde(default)]
    pub status_at_capture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedNote {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub note_text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id {other}"))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(serde::de::Error::custom(format!("unexpected id {other}"))),
    }
}

/// Operations the editor and viewers need from the record store.
pub trait PhotoStore {
    fn load_photo(&self, photo_id: &str) -> StoreResult<PhotoRecord>;
    /// Replaces the stored blob wholesale.
    fn save_annotations(&self, photo_id: &str, blob: &str) -> StoreResult<()>;
    fn load_shared_project(&self, token: &str) -> StoreResult<SharedProject>;
    fn load_image(&self, image_file: &str) -> StoreResult<DynamicImage>;
}

impl<T: PhotoStore + ?Sized> PhotoStore for Arc<T> {
    fn load_photo(&self, photo_id: &str) -> StoreResult<PhotoRecord> {
        (**self).load_photo(photo_id)
    }

    fn save_annotations(&self, photo_id: &str, blob: &str) -> StoreResult<()> {
        (**self).save_annotations(photo_id, blob)
    }

    fn load_shared_project(&self, token: &str) -> StoreResult<SharedProject> {
        (**self).load_shared_project(token)
    }

    fn load_image(&self, image_file: &str) -> StoreResult<DynamicImage> {
        (**self).load_image(image_file)
    }
}

/// Store reached over the REST API.
pub struct HttpStore {
    client: Client,
    config: StoreConfig,
}

impl HttpStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.session {
            Some(session) => request.header(COOKIE, format!("{SESSION_COOKIE}={session}")),
            None => request,
        }
    }

    fn check(response: Response, what: &str) -> StoreResult<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(what.to_owned()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> StoreResult<T> {
        let response = self.with_session(self.client.get(url)).send()?;
        let bytes = Self::check(response, what)?.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl PhotoStore for HttpStore {
    fn load_photo(&self, photo_id: &str) -> StoreResult<PhotoRecord> {
        let url = format!("{}/photos/{photo_id}", self.config.api_url);
        self.get_json(&url, &format!("photo {photo_id}"))
    }

    fn save_annotations(&self, photo_id: &str, blob: &str) -> StoreResult<()> {
        let url = format!("{}/photos/{photo_id}/annotations", self.config.api_url);
        let body = serde_json::json!({ "annotations": blob });
        let response = self.with_session(self.client.put(url).json(&body)).send()?;
        Self::check(response, &format!("photo {photo_id}"))?;
        Ok(())
    }

    fn load_shared_project(&self, token: &str) -> StoreResult<SharedProject> {
        let url = format!("{}/share/{token}", self.config.api_url);
        self.get_json(&url, "share link")
    }

    fn load_image(&self, image_file: &str) -> StoreResult<DynamicImage> {
        let url = format!("{}/{image_file}", self.config.uploads_url);
        let response = self.with_session(self.client.get(url)).send()?;
        let bytes = Self::check(response, image_file)?.bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

pub enum StoreRequest {
    LoadPhoto { photo_id: String },
    SaveAnnotations {
        photo_id: String,
        annotations: AnnotationSet,
    },
    LoadShared { token: String },
}

/// A shared photo with its blob parsed and its image fetched.
pub struct SharedPhotoView {
    pub photo: SharedPhoto,
    pub annotations: AnnotationSet,
    pub image: Option<DynamicImage>,
}

pub enum StoreEvent {
    PhotoLoaded {
        record: PhotoRecord,
        annotations: AnnotationSet,
        image: DynamicImage,
    },
    /// The set that was persisted, as sent.
    Saved {
        photo_id: String,
        annotations: AnnotationSet,
    },
    SharedLoaded {
        project: SharedProject,
        photos: Vec<SharedPhotoView>,
    },
    Failed {
        action: &'static str,
        error: StoreError,
    },
}

pub struct StoreWorker {
    tx: Sender<StoreRequest>,
    rx: Receiver<StoreEvent>,
    _worker: thread::JoinHandle<()>,
}

impl StoreWorker {
    pub fn spawn<S>(store: S) -> Self
    where
        S: PhotoStore + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<StoreRequest>();
        let (event_tx, event_rx) = mpsc::channel::<StoreEvent>();

        let worker = thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let event = execute(&store, request);
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            tracing::debug!("store worker stopped");
        });

        Self {
            tx: request_tx,
            rx: event_rx,
            _worker: worker,
        }
    }

    /// Queues a request. Returns `false` when the worker has gone away.
    pub fn request(&self, request: StoreRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    pub fn try_recv(&self) -> Option<StoreEvent> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub(crate) fn recv_timeout(&self, timeout: std::time::Duration) -> Option<StoreEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

fn execute<S: PhotoStore>(store: &S, request: StoreRequest) -> StoreEvent {
    match request {
        StoreRequest::LoadPhoto { photo_id } => {
            tracing::info!(%photo_id, "loading photo");
            match load_photo(store, &photo_id) {
                Ok(event) => event,
                Err(error) => failed("load photo", error),
            }
        }
        StoreRequest::SaveAnnotations {
            photo_id,
            annotations,
        } => {
            let blob = match persist::encode(&annotations) {
                Ok(blob) => blob,
                Err(err) => return failed("save annotations", StoreError::Decode(err)),
            };
            match store.save_annotations(&photo_id, &blob) {
                Ok(()) => {
                    tracing::info!(%photo_id, count = annotations.len(), "annotations saved");
                    StoreEvent::Saved {
                        photo_id,
                        annotations,
                    }
                }
                Err(error) => failed("save annotations", error),
            }
        }
        StoreRequest::LoadShared { token } => {
            tracing::info!("loading shared project");
            match load_shared(store, &token) {
                Ok(event) => event,
                Err(error) => failed("load shared project", error),
            }
        }
    }
}

fn load_photo<S: PhotoStore>(store: &S, photo_id: &str) -> StoreResult<StoreEvent> {
    let record = store.load_photo(photo_id)?;
    let image = store.load_image(&record.image_file)?;
    let annotations = persist::parse_annotations(record.annotations.as_ref());
    tracing::info!(%photo_id, count = annotations.len(), "photo loaded");
    Ok(StoreEvent::PhotoLoaded {
        record,
        annotations,
        image,
    })
}

fn load_shared<S: PhotoStore>(store: &S, token: &str) -> StoreResult<StoreEvent> {
    let project = store.load_shared_project(token)?;
    let photos = project
        .photos
        .iter()
        .map(|photo| {
            let image = match store.load_image(&photo.image_file) {
                Ok(image) => Some(image),
                Err(err) => {
                    tracing::warn!(photo_id = %photo.id, error = %err, "shared photo unavailable");
                    None
                }
            };
            SharedPhotoView {
                photo: photo.clone(),
                annotations: persist::parse_annotations(photo.annotations.as_ref()),
                image,
            }
        })
        .collect();
    Ok(StoreEvent::SharedLoaded { project, photos })
}

fn failed(action: &'static str, error: StoreError) -> StoreEvent {
    tracing::error!(action, error = %error, "store request failed");
    StoreEvent::Failed { action, error }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use image::{DynamicImage, RgbaImage};
    use serde_json::Value;

    use super::{PhotoRecord, PhotoStore, SharedProject};
    use crate::error::{StoreError, StoreResult};

    /// Record store kept in process memory.
    #[derive(Default)]
    pub struct MemoryStore {
        pub photos: Mutex<HashMap<String, PhotoRecord>>,
        pub shares: Mutex<HashMap<String, SharedProject>>,
        pub saves: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        pub fn with_photo(photo_id: &str, annotations: Option<Value>) -> Self {
            let store = Self::default();
            store.photos.lock().expect("lock").insert(
                photo_id.to_owned(),
                PhotoRecord {
                    id: photo_id.to_owned(),
                    project_id: Some("p1".to_owned()),
                    image_file: format!("{photo_id}.jpg"),
                    caption: None,
                    annotations,
                },
            );
            store
        }
    }

    impl PhotoStore for MemoryStore {
        fn load_photo(&self, photo_id: &str) -> StoreResult<PhotoRecord> {
            self.photos
                .lock()
                .expect("lock")
                .get(photo_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("photo {photo_id}")))
        }

        fn save_annotations(&self, photo_id: &str, blob: &str) -> StoreResult<()> {
            let mut photos = self.photos.lock().expect("lock");
            let record = photos
                .get_mut(photo_id)
                .ok_or_else(|| StoreError::NotFound(format!("photo {photo_id}")))?;
            record.annotations = Some(Value::String(blob.to_owned()));
            self.saves.lock().expect("lock").push(blob.to_owned());
            Ok(())
        }

        fn load_shared_project(&self, token: &str) -> StoreResult<SharedProject> {
            self.shares
                .lock()
                .expect("lock")
                .get(token)
                .cloned()
                .ok_or_else(|| StoreError::NotFound("share link".to_owned()))
        }

        fn load_image(&self, image_file: &str) -> StoreResult<DynamicImage> {
            if image_file.starts_with("missing") {
                return Err(StoreError::NotFound(image_file.to_owned()));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(40, 30)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::memory::MemoryStore;
    use super::{PhotoRecord, SharedProject, StoreEvent, StoreRequest, StoreWorker};
    use crate::annotation::fixtures::{dimension, text};
    use crate::error::StoreError;
    use crate::model::AnnotationSet;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn photo_record_accepts_numeric_ids_and_string_blob() {
        let record: PhotoRecord = serde_json::from_value(json!({
            "id": 7,
            "projectId": 3,
            "imageFile": "a.jpg",
            "annotations": "[]",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }))
        .expect("record");
        assert_eq!(record.id, "7");
        assert_eq!(record.project_id.as_deref(), Some("3"));
        assert_eq!(record.annotations, Some(json!("[]")));
    }

    #[test]
    fn shared_project_parses_notes_and_dates() {
        let project: SharedProject = serde_json::from_value(json!({
            "jobNumber": "J-100",
            "clientName": "Acme",
            "siteAddress": "1 Main St",
            "status": "active",
            "photos": [{"id": "p", "imageFile": "p.jpg", "caption": null, "createdAt": "2024-03-05T10:00:00.000Z"}],
            "notes": [{"id": "n", "noteText": "Check the vent", "createdAt": "2024-03-05T10:00:00Z"}]
        }))
        .expect("project");
        assert_eq!(project.job_number.as_deref(), Some("J-100"));
        assert_eq!(project.notes[0].note_text, "Check the vent");
        assert!(project.photos[0].created_at.is_some());
    }

    #[test]
    fn later_save_overwrites_earlier_one() {
        let store = Arc::new(MemoryStore::with_photo("42", None));
        let worker = StoreWorker::spawn(Arc::clone(&store));

        let first = AnnotationSet::from(vec![dimension("a", (0.1, 0.1), (0.3, 0.1), "2ft")]);
        let second = AnnotationSet::from(vec![
            text("b", (0.5, 0.5), "Window"),
            dimension("c", (0.2, 0.7), (0.8, 0.7), "12ft"),
        ]);
        for annotations in [first, second.clone()] {
            assert!(worker.request(StoreRequest::SaveAnnotations {
                photo_id: "42".to_owned(),
                annotations,
            }));
            assert!(matches!(
                worker.recv_timeout(WAIT),
                Some(StoreEvent::Saved { .. })
            ));
        }

        worker.request(StoreRequest::LoadPhoto {
            photo_id: "42".to_owned(),
        });
        match worker.recv_timeout(WAIT) {
            Some(StoreEvent::PhotoLoaded { annotations, .. }) => {
                let ids: Vec<&str> = annotations.iter().map(|a| a.id.as_str()).collect();
                assert_eq!(ids, ["b", "c"]);
                assert_eq!(annotations, second);
            }
            _ => panic!("expected loaded photo"),
        }
        assert_eq!(store.saves.lock().expect("lock").len(), 2);
    }

    #[test]
    fn failed_save_reports_and_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::with_photo("42", Some(json!("[]"))));
        let worker = StoreWorker::spawn(Arc::clone(&store));
        worker.request(StoreRequest::SaveAnnotations {
            photo_id: "missing".to_owned(),
            annotations: AnnotationSet::new(),
        });
        match worker.recv_timeout(WAIT) {
            Some(StoreEvent::Failed { action, error }) => {
                assert_eq!(action, "save annotations");
                assert!(matches!(error, StoreError::NotFound(_)));
            }
            _ => panic!("expected failure"),
        }
        assert!(store.saves.lock().expect("lock").is_empty());
    }

    #[test]
    fn shared_project_loads_even_when_a_photo_is_missing() {
        let store = Arc::new(MemoryStore::default());
        let project: SharedProject = serde_json::from_value(json!({
            "jobNumber": "J-7",
            "photos": [
                {"id": "1", "imageFile": "ok.jpg", "annotations": "[{\"id\":\"t\",\"color\":\"#FFFF00\",\"type\":\"text\",\"position\":{\"x\":0.1,\"y\":0.1},\"text\":\"A\"}]"},
                {"id": "2", "imageFile": "missing.jpg"}
            ]
        }))
        .expect("project");
        store
            .shares
            .lock()
            .expect("lock")
            .insert("tok".to_owned(), project);

        let worker = StoreWorker::spawn(Arc::clone(&store));
        worker.request(StoreRequest::LoadShared {
            token: "tok".to_owned(),
        });
        match worker.recv_timeout(WAIT) {
            Some(StoreEvent::SharedLoaded { photos, .. }) => {
                assert_eq!(photos.len(), 2);
                assert_eq!(photos[0].annotations.len(), 1);
                assert!(photos[0].image.is_some());
                assert!(photos[1].image.is_none());
            }
            _ => panic!("expected shared project"),
        }
    }
}
