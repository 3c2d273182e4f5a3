//! Synthetic record generation and batch processing.
//!
//! Records are deliberately padded — nested metadata, tag lists, free
//! text — so that retained batches produce a visible RSS ramp.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tracing::info;

use loadlab_core::epoch_secs;

use crate::AppState;

const CATEGORIES: &[&str] = &["electronics", "clothing", "food", "books", "sports"];
const COUNTRIES: &[&str] = &["US", "UK", "SG", "JP", "AU"];
const CITIES: &[&str] = &["New York", "London", "Singapore", "Tokyo", "Sydney"];
const DEVICE_TYPES: &[&str] = &["mobile", "desktop", "tablet"];

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: u64,
    pub timestamp: u64,
    pub user_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub category: &'static str,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub description: String,
    pub notes: &'static str,
    pub processed_at: u64,
    pub checksum: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub ip_address: String,
    pub user_agent: &'static str,
    pub session_id: String,
    pub device_type: &'static str,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub country: &'static str,
    pub city: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// Generate one processed record.
pub fn generate_record(id: u64, rng: &mut impl Rng) -> Record {
    let amount = (rng.gen_range(10.0..10_000.0) * 100.0_f64).round() / 100.0;
    let tags = (0..rng.gen_range(5..=20))
        .map(|i| format!("tag_{i}"))
        .collect();

    Record {
        id,
        timestamp: epoch_secs(),
        user_id: format!("user_{}", rng.gen_range(1000..=9999)),
        transaction_id: format!("txn_{}", rng.gen_range(100_000..=999_999)),
        amount,
        category: CATEGORIES[rng.gen_range(0..CATEGORIES.len())],
        tags,
        metadata: Metadata {
            ip_address: format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255)
            ),
            user_agent: "Mozilla/5.0 (compatible; DataProcessor/1.0)",
            session_id: format!("sess_{}", rng.gen_range(10_000_000u64..=99_999_999)),
            device_type: DEVICE_TYPES[rng.gen_range(0..DEVICE_TYPES.len())],
            location: Location {
                country: COUNTRIES[rng.gen_range(0..COUNTRIES.len())],
                city: CITIES[rng.gen_range(0..CITIES.len())],
                lat: rng.gen_range(-90.0..90.0),
                lon: rng.gen_range(-180.0..180.0),
            },
        },
        description: format!(
            "Sample transaction description with some random data: {}",
            rng.gen_range(0.0..1.0f64)
        ),
        notes: "Additional notes field with more text to increase memory footprint per record",
        processed_at: epoch_secs(),
        checksum: checksum(id, amount),
    }
}

fn checksum(id: u64, amount: f64) -> u64 {
    (id.wrapping_mul(31).wrapping_add(amount.to_bits())) % 1_000_000
}

/// Result of processing one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_size: usize,
    pub duration_seconds: f64,
    pub total_stored: usize,
}

/// Generate and process a batch, retaining it when configured.
pub fn process_batch(state: &AppState, batch_size: usize) -> BatchResult {
    let t0 = Instant::now();
    info!(batch_size, "starting batch processing");

    let mut rng = rand::thread_rng();
    let batch: Vec<Record> = (0..batch_size as u64)
        .map(|i| generate_record(i, &mut rng))
        .collect();

    let total_stored = if state.config.keep_in_memory {
        let mut store = state.store.write().unwrap_or_else(|e| e.into_inner());
        store.extend(batch);
        let total = store.len();
        drop(store);
        state.metrics.stored_records.set(total as f64);
        info!(total, "records retained in memory");
        total
    } else {
        let store = state.store.read().unwrap_or_else(|e| e.into_inner());
        store.len()
    };

    let duration = t0.elapsed().as_secs_f64();
    state.metrics.processing_time.observe(duration);
    state.metrics.batches_processed.inc();
    state.metrics.records_processed.add(batch_size as u64);
    state.metrics.active_batch_size.set(batch_size as f64);

    info!(secs = duration, "batch processed");

    BatchResult {
        batch_size,
        duration_seconds: (duration * 100.0).round() / 100.0,
        total_stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn test_state(keep: bool) -> AppState {
        AppState::new(Config {
            batch_size: 100,
            processing_interval: 30,
            enabled: true,
            keep_in_memory: keep,
        })
    }

    #[test]
    fn record_shape() {
        let mut rng = rand::thread_rng();
        let record = generate_record(42, &mut rng);

        assert_eq!(record.id, 42);
        assert!(record.amount >= 10.0 && record.amount <= 10_000.0);
        assert!(record.tags.len() >= 5 && record.tags.len() <= 20);
        assert!(CATEGORIES.contains(&record.category));
        assert!(record.checksum < 1_000_000);
        assert!(record.metadata.location.lat >= -90.0 && record.metadata.location.lat <= 90.0);
    }

    #[test]
    fn record_serializes_to_json() {
        let mut rng = rand::thread_rng();
        let record = generate_record(1, &mut rng);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 1);
        assert!(json["metadata"]["location"]["country"].is_string());
    }

    #[test]
    fn batch_grows_the_store_when_retaining() {
        let state = test_state(true);

        let first = process_batch(&state, 50);
        assert_eq!(first.batch_size, 50);
        assert_eq!(first.total_stored, 50);

        let second = process_batch(&state, 25);
        assert_eq!(second.total_stored, 75);

        assert_eq!(state.metrics.batches_processed.get(), 2);
        assert_eq!(state.metrics.records_processed.get(), 75);
        assert_eq!(state.metrics.stored_records.get(), 75.0);
    }

    #[test]
    fn batch_discards_when_not_retaining() {
        let state = test_state(false);

        let result = process_batch(&state, 50);
        assert_eq!(result.total_stored, 0);
        assert!(state.store.read().unwrap().is_empty());
        // Counters still advance.
        assert_eq!(state.metrics.records_processed.get(), 50);
    }
}
