use std::time::{Duration, Instant};

const DEFAULT_URL: &str = "http://localhost:8000";
const SAMPLES: u64 = 100;

#[derive(serde::Deserialize)]
struct Latest {
    slot: u64,
}

#[derive(serde::Deserialize)]
struct Slot {
    #[serde(default)]
    bids: Vec<serde_json::Value>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let base = std::env::var("SLOT_REPLAY_SOURCE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let base = base.trim_end_matches('/');

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    println!("Connecting to {}...", base);
    let latest: Latest = client
        .get(format!("{}/api/latest-slot", base))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let first = latest.slot.saturating_sub(SAMPLES);
    println!(
        "Live head is {}. Fetching slots {}..{}\n",
        latest.slot, first, latest.slot
    );

    let mut times: Vec<u128> = Vec::new();
    let mut bids = 0;

    for (i, slot) in (first..latest.slot).enumerate() {
        let start = Instant::now();
        let resp = client
            .get(format!("{}/api/slot/{}", base, slot))
            .send()
            .await?;
        if !resp.status().is_success() {
            println!("#{}: slot {} -> {}", i + 1, slot, resp.status());
            continue;
        }
        let body: Slot = resp.json().await?;
        let elapsed = start.elapsed().as_micros();
        times.push(elapsed);
        bids += body.bids.len();

        if i < 5 || (i + 1) % 20 == 0 {
            println!("#{}: slot {} {} bids in {}μs ({}ms)", i + 1, slot, body.bids.len(), elapsed, elapsed / 1000);
        }
    }

    if times.is_empty() {
        anyhow::bail!("no slot could be fetched");
    }

    // Stats
    times.sort();
    let sum: u128 = times.iter().sum();
    let avg = sum / times.len() as u128;
    let min = times[0];
    let max = times[times.len() - 1];
    let median = times[times.len() / 2];
    let p99 = times[(times.len() * 99 / 100).min(times.len() - 1)];

    println!("\n=== SLOT FETCH LATENCY ({} slots, {} bids) ===", times.len(), bids);
    println!("Min:    {}μs ({}ms)", min, min / 1000);
    println!("Max:    {}μs ({}ms)", max, max / 1000);
    println!("Avg:    {}μs ({}ms)", avg, avg / 1000);
    println!("Median: {}μs ({}ms)", median, median / 1000);
    println!("P99:    {}μs ({}ms)", p99, p99 / 1000);
    Ok(())
}
