// API client module: contains a small blocking HTTP client that talks to
// the Synapse REST API. It is intentionally small and synchronous; the
// mirror processes one entry at a time, so there is nothing to overlap.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Default Synapse endpoint; override with `SYNAPSE_BASE_URL`.
const DEFAULT_BASE_URL: &str = "https://repo-prod.prod.sagebase.org";

const FOLDER_TYPE: &str = "org.sagebionetworks.repo.model.Folder";
const FILE_TYPE: &str = "org.sagebionetworks.repo.model.FileEntity";

/// Opaque handle to a remote container (project or folder). Only the id
/// matters when parenting children under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: String,
}

impl FolderHandle {
    pub fn new(id: impl Into<String>) -> Self {
        FolderHandle { id: id.into() }
    }
}

/// Login credentials, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Read `SYNAPSE_USER` and `SYNAPSE_PASSWORD`. A missing variable is
    /// a configuration error and aborts before any remote call is made.
    pub fn from_env() -> Result<Self> {
        let user = std::env::var("SYNAPSE_USER").context("SYNAPSE_USER is not set")?;
        let password = std::env::var("SYNAPSE_PASSWORD").context("SYNAPSE_PASSWORD is not set")?;
        Ok(Credentials { user, password })
    }
}

/// The remote side of the mirror: login plus the create/store primitives
/// the walk needs. Kept behind a trait so tests can record calls without
/// touching the network.
pub trait RemoteStore {
    fn login(&mut self, credentials: &Credentials) -> Result<()>;
    fn get_project(&mut self, project_id: &str) -> Result<FolderHandle>;
    fn create_folder(&mut self, name: &str, parent: &FolderHandle) -> Result<FolderHandle>;
    fn store_file(&mut self, local_file: &Path, parent: &FolderHandle) -> Result<()>;
}

/// Login request payload.
#[derive(Serialize, Debug)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Expected response from the login endpoint.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    session_token: String,
}

/// Entity creation payload shared by folders and files. Fields mirror
/// the Synapse entity model; `dataFileHandleId` is only set for files.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateEntityRequest<'a> {
    name: &'a str,
    parent_id: &'a str,
    concrete_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_file_handle_id: Option<&'a str>,
}

/// The only entity field the uploader cares about is the assigned id.
#[derive(Deserialize, Debug)]
struct EntityResponse {
    id: String,
}

#[derive(Deserialize, Debug)]
struct FileHandleResponse {
    id: String,
}

/// Simple API client that holds a reqwest blocking client, the base URL
/// of the Synapse service and an optional session token obtained at
/// login for subsequent authenticated calls.
#[derive(Clone)]
pub struct SynapseClient {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl SynapseClient {
    /// Create a SynapseClient configured from the environment variable
    /// `SYNAPSE_BASE_URL` or fallback to the production endpoint.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("SYNAPSE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SynapseClient {
            client,
            base_url: base_url.into(),
            session_token: None,
        })
    }

    /// Helper to build the Authorization header map once logged in.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.session_token {
            let val = format!("Bearer {}", t);
            let val = HeaderValue::from_str(&val)
                .context("Session token is not a valid header value")?;
            headers.insert(AUTHORIZATION, val);
        }
        Ok(headers)
    }

    /// POST an entity (folder or file) and return the handle Synapse
    /// assigned to it. `forceVersion=false` keeps re-stores from bumping
    /// entity versions.
    fn create_entity(&self, body: &CreateEntityRequest) -> Result<FolderHandle> {
        let url = format!("{}/repo/v1/entity", &self.base_url);
        debug!("POST {} name={}", url, body.name);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .query(&[("forceVersion", "false")])
            .json(body)
            .send()
            .context("Failed to send entity create request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Entity create failed: {} - {}", status, txt);
        }
        let entity: EntityResponse = res.json().context("Parsing entity response json")?;
        Ok(FolderHandle::new(entity.id))
    }
}

impl RemoteStore for SynapseClient {
    /// Perform login and keep the returned session token for the
    /// remaining calls.
    fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let url = format!("{}/auth/v1/login", &self.base_url);
        debug!("POST {}", url);
        let res = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &credentials.user,
                password: &credentials.password,
            })
            .send()
            .context("Failed to send login request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Login failed: {} - {}", status, txt);
        }
        let resp: LoginResponse = res.json().context("Parsing login response json")?;
        self.session_token = Some(resp.session_token);
        Ok(())
    }

    /// Fetch the project entity so it can serve as the root parent.
    fn get_project(&mut self, project_id: &str) -> Result<FolderHandle> {
        let url = format!("{}/repo/v1/entity/{}", &self.base_url, project_id);
        debug!("GET {}", url);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .context("Failed to send project lookup request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Project lookup failed: {} - {}", status, txt);
        }
        let entity: EntityResponse = res.json().context("Parsing project response json")?;
        Ok(FolderHandle::new(entity.id))
    }

    fn create_folder(&mut self, name: &str, parent: &FolderHandle) -> Result<FolderHandle> {
        self.create_entity(&CreateEntityRequest {
            name,
            parent_id: &parent.id,
            concrete_type: FOLDER_TYPE,
            data_file_handle_id: None,
        })
    }

    /// Upload a file in two steps: push the bytes as multipart/form-data
    /// to get a file handle, then create a FileEntity referencing it
    /// under the given parent.
    fn store_file(&mut self, local_file: &Path, parent: &FolderHandle) -> Result<()> {
        let file = File::open(local_file)
            .with_context(|| format!("Failed to open {}", local_file.display()))?;
        let file_name = local_file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();

        let part = multipart::Part::reader(file).file_name(file_name.clone());
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/file/v1/file", &self.base_url);
        debug!("POST {} file={}", url, file_name);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()
            .context("Failed to send file upload request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("File upload failed: {} - {}", status, txt);
        }
        let handle: FileHandleResponse = res.json().context("Parsing file handle json")?;

        self.create_entity(&CreateEntityRequest {
            name: &file_name,
            parent_id: &parent.id,
            concrete_type: FILE_TYPE,
            data_file_handle_id: Some(&handle.id),
        })?;
        Ok(())
    }
}
