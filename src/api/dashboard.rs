use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{LatestSlot, SlotDataSource};
use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::state::{fallback_label, seconds_in_slot, Bid, BuilderPalette, SlotId, SlotSnapshot};

/// `GET /api/latest-slot`
#[derive(Debug, Deserialize)]
struct LatestResponse {
    slot: SlotId,
    #[serde(default)]
    head_offset: u64,
}

/// `GET /api/slot/{slot}`
#[derive(Debug, Deserialize)]
struct SlotResponse {
    slot: SlotId,
    #[serde(default)]
    bids: Vec<BidRecord>,
    #[serde(default)]
    relays: Vec<String>,
    winning_block_hash: Option<String>,
}

/// One bid as the dashboard API reports it.
#[derive(Debug, Deserialize)]
struct BidRecord {
    timestamp_ms: Option<i64>,
    seconds_in_slot: Option<f64>,
    value_eth: f64,
    builder_pubkey: String,
    builder_label: Option<String>,
    block_hash: Option<String>,
    color: Option<String>,
    #[serde(default)]
    is_winner: bool,
}

/// Slot data over the bids dashboard HTTP API.
pub struct HttpSlotSource {
    client: reqwest::Client,
    base_url: String,
    palette: Mutex<BuilderPalette>,
}

impl HttpSlotSource {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            palette: Mutex::new(BuilderPalette::default()),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        slot: Option<SlotId>,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(slot) = slot {
                return Err(FetchError::NotFound(slot));
            }
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SlotDataSource for HttpSlotSource {
    async fn fetch_latest(&self) -> Result<LatestSlot, FetchError> {
        let latest: LatestResponse = self.get_json("/api/latest-slot", None).await?;
        Ok(LatestSlot {
            slot: latest.slot,
            head_offset: latest.head_offset,
        })
    }

    async fn fetch_snapshot(&self, slot: SlotId) -> Result<SlotSnapshot, FetchError> {
        let path = format!("/api/slot/{}", slot);
        let response: SlotResponse = self.get_json(&path, Some(slot)).await?;

        if response.slot != slot {
            return Err(FetchError::Decode(format!(
                "asked for slot {} but got slot {}",
                slot, response.slot
            )));
        }
        Ok(decode_snapshot(response, &mut self.palette.lock()))
    }
}

/// Turn an API response into a snapshot, filling in what the API left out.
fn decode_snapshot(response: SlotResponse, palette: &mut BuilderPalette) -> SlotSnapshot {
    let slot = response.slot;
    let winning_hash = response.winning_block_hash;

    let bids = response
        .bids
        .into_iter()
        .map(|record| {
            let offset = record
                .seconds_in_slot
                .or_else(|| record.timestamp_ms.map(|ts| seconds_in_slot(slot, ts)))
                .unwrap_or(0.0);

            // Delivered if flagged, or if it carries the delivered block hash
            let is_winning = record.is_winner
                || matches!(
                    (&record.block_hash, &winning_hash),
                    (Some(hash), Some(winner)) if hash == winner
                );

            let color = record
                .color
                .unwrap_or_else(|| palette.color_for(&record.builder_pubkey).to_string());
            let builder_label = record
                .builder_label
                .unwrap_or_else(|| fallback_label(&record.builder_pubkey));

            Bid {
                builder_key: record.builder_pubkey,
                builder_label,
                color,
                value: record.value_eth.max(0.0),
                arrival_offset_secs: offset.max(0.0),
                is_winning,
                block_hash: record.block_hash,
            }
        })
        .collect();

    SlotSnapshot::new(slot, bids, response.relays, winning_hash)
}
