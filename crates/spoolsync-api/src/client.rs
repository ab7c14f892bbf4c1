// Async HTTP client for the bridge service.
//
// The bridge fronts both the Spoolman inventory and the printer's tray
// settings. All endpoints are JSON; errors carry `{ "message": "..." }`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    AssignTrayRequest, BridgeHealth, ErrorResponse, PrinterInfoResponse, SetTrayUuidRequest,
    SettingsResponse, SpoolRecord, SpoolsResponse, TrayCountResponse,
};
use crate::transport::TransportConfig;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the bridge REST API.
///
/// The base URL points at the API root (e.g. `http://bridge.local:8000/api/`);
/// every endpoint is appended as path segments.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BridgeClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base path ends with `/` so endpoint segments append
    /// rather than replace the last component.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(raw.to_owned()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// The normalized API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    /// GET where any non-2xx answer means "absent" rather than failure.
    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%status, "treating non-success response as absent");
            return Ok(None);
        }
        self.handle_response(resp).await.map(Some)
    }

    async fn post_no_response<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<(), Error> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                message: Some(message),
            }) => message,
            _ if raw.trim().is_empty() => status.to_string(),
            _ => raw,
        };

        Error::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Bridge ───────────────────────────────────────────────────────

    /// `GET /` -- bridge status and Spoolman reachability.
    pub async fn health(&self) -> Result<BridgeHealth, Error> {
        self.get(self.base_url.clone()).await
    }

    // ── Inventory ────────────────────────────────────────────────────

    /// `GET /spools` -- the full inventory, keyed by spool id.
    pub async fn list_spools(&self) -> Result<BTreeMap<u32, SpoolRecord>, Error> {
        let resp: SpoolsResponse = self.get(self.endpoint(&["spools"])?).await?;
        Ok(resp.into_map())
    }

    /// `GET /spool/{id}` -- `None` for any non-2xx answer.
    pub async fn get_spool(&self, spool_id: u32) -> Result<Option<SpoolRecord>, Error> {
        let id = spool_id.to_string();
        self.get_optional(self.endpoint(&["spool", &id])?).await
    }

    /// `GET /by-uuid/{uuid}` -- the spool bound to an RFID tag, if any.
    pub async fn spool_by_tray_uuid(&self, tray_uuid: &str) -> Result<Option<SpoolRecord>, Error> {
        self.get_optional(self.endpoint(&["by-uuid", tray_uuid])?)
            .await
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// `GET /settings` -- tray count, assignments, active and locked trays.
    pub async fn get_settings(&self) -> Result<SettingsResponse, Error> {
        self.get(self.endpoint(&["settings"])?).await
    }

    /// `GET /printer-info/trays` -- tray count reported by the hardware.
    pub async fn tray_count(&self) -> Result<u32, Error> {
        let resp: TrayCountResponse = self.get(self.endpoint(&["printer-info", "trays"])?).await?;
        Ok(resp.trays)
    }

    // ── Commits ──────────────────────────────────────────────────────

    /// `POST /tray/{tray}` with `{ spool_id }`. `None` clears the tray.
    pub async fn assign_tray(&self, tray: u8, spool_id: Option<u32>) -> Result<(), Error> {
        let tray = tray.to_string();
        self.post_no_response(
            self.endpoint(&["tray", &tray])?,
            &AssignTrayRequest { spool_id },
        )
        .await
    }

    /// `POST /set-uuid/{spool}` with `{ tray_uuid }`.
    pub async fn set_tray_uuid(&self, spool_id: u32, tray_uuid: &str) -> Result<(), Error> {
        let id = spool_id.to_string();
        self.post_no_response(
            self.endpoint(&["set-uuid", &id])?,
            &SetTrayUuidRequest { tray_uuid },
        )
        .await
    }

    // ── Printer ──────────────────────────────────────────────────────

    /// `GET /printer-info` -- connection flag, merged telemetry, last update.
    pub async fn printer_info(&self) -> Result<PrinterInfoResponse, Error> {
        self.get(self.endpoint(&["printer-info"])?).await
    }
}
