use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ScanStatsError {
    FailedToFetchStats(String),
}

// Field list mirrors the scan site's pool endpoint verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XchScanStats {
    #[serde(rename = "poolInfo")]
    pub pool_info: serde_json::Value,
    #[serde(rename = "farmedBlocks")]
    pub farmed_blocks: Vec<serde_json::Value>,
    #[serde(rename = "capacityBytes")]
    pub capacity_bytes: u64,
    pub farmers: u64,
}

pub struct ScanStatsClient {
    client: Client,
    url: String,
}

impl ScanStatsClient {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::new();
        ScanStatsClient { client, url }
    }

    pub async fn get_stats(&self) -> Result<XchScanStats, ScanStatsError> {
        match self.client.get(&self.url).send().await {
            Ok(res) => {
                let status = res.status();
                if !status.is_success() {
                    let error_body = res
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error body".to_string());
                    return Err(ScanStatsError::FailedToFetchStats(format!(
                        "Status Code: {}.\nError: {}",
                        status, error_body
                    )));
                }

                match res.json::<XchScanStats>().await {
                    Ok(stats) => Ok(stats),
                    Err(e) => {
                        tracing::error!(target: "server_log", "Failed to parse scan stats response.\nError: {:?}", e);
                        Err(ScanStatsError::FailedToFetchStats(format!("{:?}", e)))
                    }
                }
            }
            Err(e) => {
                tracing::error!(target: "server_log", "Failed to fetch stats from scan site.\nError: {:?}", e);
                Err(ScanStatsError::FailedToFetchStats(format!("{:?}", e)))
            }
        }
    }
}
