use std::time::Duration;

use time::macros::datetime;
use time::OffsetDateTime;
use watchdog::codec::encode_chunk;
use watchdog::{
    Asset, ChunkData, EngineConfig, ErrorKind, Result, SensorData, Transaction, Watchdog,
    WorldState,
};

const ENERGY: &str = "signal_energy_policy_v1";
const EXAMPLE: &str = "example_policy_v1";
const T0: OffsetDateTime = datetime!(2024-01-01 0:00 UTC);

struct Ledger {
    world: WorldState,
    engine: Watchdog,
    next_tx: u64,
}

impl Ledger {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            world: WorldState::new(),
            engine: Watchdog::new(config),
            next_tx: 0,
        }
    }

    fn run<T>(
        &mut self,
        at: OffsetDateTime,
        body: impl FnOnce(&Watchdog, &mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        self.next_tx += 1;
        let engine = &self.engine;
        self.world
            .execute(format!("tx-{}", self.next_tx), at, |tx| body(engine, tx))
    }
}

fn quiet_chunk(id: &str) -> ChunkData {
    let channel = SensorData::new(vec![0.0; 8], vec![0.0; 8], vec![0.0; 8]);
    ChunkData::new(id, std::array::from_fn(|_| channel.clone()))
}

fn loud_chunk(id: &str) -> ChunkData {
    let mut chunk = quiet_chunk(id);
    chunk.channels[4].y = vec![0.01, -0.01, 0.01, -0.01];
    chunk
}

fn encoded(chunk: &ChunkData) -> String {
    encode_chunk(chunk).expect("encode")
}

fn at_ms(ms: i64) -> OffsetDateTime {
    T0 + time::Duration::milliseconds(ms)
}

#[test]
fn hash_is_stable_across_calls_and_transport() {
    let chunk = loud_chunk("c1");
    let first = chunk.hash().expect("hash");
    assert_eq!(first, chunk.hash().expect("hash again"));
    assert_eq!(first.len(), 64);

    let decoded = watchdog::codec::decode_chunk(&encoded(&chunk)).expect("decode");
    assert_eq!(decoded.hash().expect("hash decoded"), first);
}

#[test]
fn second_add_with_same_id_fails_regardless_of_data() {
    let mut ledger = Ledger::new();
    let data = encoded(&quiet_chunk("c1"));
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &data))
        .expect("first add");

    let other = encoded(&loud_chunk("c1"));
    let err = ledger
        .run(at_ms(1_000), |engine, tx| engine.add_chunk(tx, "c1", &other))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = ledger
        .run(at_ms(2_000), |engine, tx| {
            engine.add_chunk_with_policy(tx, "c1", &other, ENERGY)
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn malformed_input_is_a_decode_error() {
    let mut ledger = Ledger::new();
    for input in ["%%%not base64%%%", "bm90IGpzb24=", ""] {
        let err = ledger
            .run(T0, |engine, tx| engine.add_chunk(tx, "c1", input))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode, "input {input:?}");
    }
    assert!(ledger.world.is_empty());
}

#[test]
fn apply_policy_detects_foreign_data() {
    let mut ledger = Ledger::new();
    let original = quiet_chunk("c1");
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &encoded(&original)))
        .expect("add");

    let mut tampered = original.clone();
    tampered.channels[0].x[3] = 1e-9;
    let err = ledger
        .run(at_ms(500), |engine, tx| {
            engine.apply_policy(tx, "c1", &encoded(&tampered), ENERGY)
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityMismatch);

    let renamed = quiet_chunk("c2");
    let err = ledger
        .run(at_ms(600), |engine, tx| {
            engine.apply_policy(tx, "c1", &encoded(&renamed), ENERGY)
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityMismatch);
}

#[test]
fn apply_policy_anchors_expiry_to_ledger_creation() {
    let mut ledger = Ledger::new();
    let chunk = loud_chunk("c1");
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &encoded(&chunk)))
        .expect("add");
    ledger
        .run(datetime!(2024-01-05 0:00 UTC), |engine, tx| {
            engine.apply_policy(tx, "c1", &encoded(&chunk), ENERGY)
        })
        .expect("apply");

    let asset = ledger
        .run(datetime!(2024-01-05 0:01 UTC), |engine, tx| engine.read_chunk(tx, "c1"))
        .expect("read");
    assert_eq!(asset.applied_policy_id.as_deref(), Some(ENERGY));
    assert_eq!(asset.expiry_period, Some(Duration::from_millis(127_200)));
    assert_eq!(asset.expiry_date, Some(at_ms(127_200)));

    let err = ledger
        .run(datetime!(2024-01-05 0:02 UTC), |engine, tx| {
            engine.update_chunk_expiry_date(tx, "c1")
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoChange);
}

#[test]
fn zero_signal_gets_short_expiry() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy(tx, "c1", &encoded(&quiet_chunk("c1")), ENERGY)
        })
        .expect("add");
    let asset = ledger
        .run(at_ms(1), |engine, tx| engine.read_chunk(tx, "c1"))
        .expect("read");
    assert_eq!(asset.expiry_period, Some(Duration::from_millis(31_800)));
    assert_eq!(asset.expiry_date, None);
}

#[test]
fn update_expiry_date_is_idempotent() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy(tx, "c1", &encoded(&quiet_chunk("c1")), ENERGY)
        })
        .expect("add");

    ledger
        .run(at_ms(10_000), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .expect("first update");
    let err = ledger
        .run(at_ms(20_000), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoChange);

    let asset = ledger
        .run(at_ms(30_000), |engine, tx| engine.read_chunk(tx, "c1"))
        .expect("read");
    assert_eq!(asset.expiry_date, Some(at_ms(31_800)));
}

#[test]
fn update_expiry_date_requires_policy() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &encoded(&quiet_chunk("c1"))))
        .expect("add");
    let err = ledger
        .run(at_ms(1), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotApplied);

    let err = ledger
        .run(at_ms(2), |engine, tx| engine.update_chunk_expiry_date(tx, "ghost"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn expired_chunks_are_capped_at_page_limit() {
    let mut ledger = Ledger::new();
    for n in 0..35 {
        let id = format!("chunk-{n:02}");
        let data = encoded(&quiet_chunk(&id));
        ledger
            .run(T0, |engine, tx| engine.add_chunk_with_policy(tx, &id, &data, ENERGY))
            .expect("add");
        ledger
            .run(at_ms(1), |engine, tx| engine.update_chunk_expiry_date(tx, &id))
            .expect("update");
    }

    let expired = ledger
        .run(datetime!(2024-01-01 1:00 UTC), |engine, tx| {
            engine.get_expired_chunks(tx, "2024-01-01T00:30:00Z")
        })
        .expect("query");
    assert_eq!(expired.len(), 30);
    assert_eq!(expired[0].chunk_id, "chunk-00");
    assert_eq!(expired[29].chunk_id, "chunk-29");
    assert_eq!(ledger.world.open_cursors(), 0);
}

#[test]
fn expired_chunks_exclude_unset_and_boundary_dates() {
    let mut ledger = Ledger::new();
    let add = |ledger: &mut Ledger, id: &str, at: OffsetDateTime, policy: Option<&str>| {
        let data = encoded(&quiet_chunk(id));
        ledger
            .run(at, |engine, tx| match policy {
                Some(policy) => engine.add_chunk_with_policy(tx, id, &data, policy),
                None => engine.add_chunk(tx, id, &data),
            })
            .expect("add");
    };

    // expires at T0 + 31.8s
    add(&mut ledger, "early", T0, Some(ENERGY));
    // expires exactly at the cutoff
    add(&mut ledger, "boundary", at_ms(28_200), Some(ENERGY));
    // policy applied, date never computed
    add(&mut ledger, "pending", T0, Some(ENERGY));
    add(&mut ledger, "plain", T0, None);
    for id in ["early", "boundary"] {
        ledger
            .run(at_ms(40_000), |engine, tx| engine.update_chunk_expiry_date(tx, id))
            .expect("update");
    }

    let expired = ledger
        .run(at_ms(120_000), |engine, tx| {
            engine.get_expired_chunks(tx, "2024-01-01T00:01:00Z")
        })
        .expect("query");
    let ids: Vec<&str> = expired.iter().map(|asset| asset.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["early"]);
}

#[test]
fn expired_chunks_validate_cutoff() {
    let mut ledger = Ledger::new();
    let err = ledger
        .run(T0, |engine, tx| engine.get_expired_chunks(tx, "yesterday"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);

    let err = ledger
        .run(T0, |engine, tx| engine.get_expired_chunks(tx, "2024-01-01T00:00:01Z"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FutureDateRejected);

    let same_instant = ledger
        .run(T0, |engine, tx| engine.get_expired_chunks(tx, "2024-01-01T00:00:00Z"))
        .expect("cutoff equal to now");
    assert!(same_instant.is_empty());
}

#[test]
fn historical_cutoff_returns_empty_list() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy(tx, "c1", &encoded(&quiet_chunk("c1")), ENERGY)
        })
        .expect("add");
    ledger
        .run(at_ms(1), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .expect("update");

    let expired = ledger
        .run(at_ms(3_600_000), |engine, tx| {
            engine.get_expired_chunks(tx, "2014-11-12T11:45:26.371Z")
        })
        .expect("query");
    assert!(expired.is_empty());
}

#[test]
fn delete_if_expired_waits_for_expiry() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy(tx, "c1", &encoded(&quiet_chunk("c1")), ENERGY)
        })
        .expect("add");

    let err = ledger
        .run(at_ms(1_000), |engine, tx| engine.delete_chunk_if_expired(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpiryNotComputed);

    ledger
        .run(at_ms(2_000), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .expect("update");
    let err = ledger
        .run(at_ms(31_799), |engine, tx| engine.delete_chunk_if_expired(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotYetExpired);

    ledger
        .run(at_ms(31_800), |engine, tx| engine.delete_chunk_if_expired(tx, "c1"))
        .expect("delete at expiry");

    let err = ledger
        .run(at_ms(40_000), |engine, tx| engine.read_chunk(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(ledger
        .run(at_ms(40_001), |engine, tx| engine.chunk_existed(tx, "c1"))
        .expect("existed"));
    assert!(!ledger
        .run(at_ms(40_002), |engine, tx| engine.chunk_existed(tx, "never"))
        .expect("never existed"));

    let history = ledger
        .run(at_ms(40_003), |engine, tx| engine.get_chunk_history(tx, "c1"))
        .expect("history");
    let deletes: Vec<bool> = history.iter().map(|entry| entry.is_delete).collect();
    assert_eq!(deletes, vec![false, false, true]);
    assert_eq!(history[0].timestamp, T0);
    assert_eq!(history[2].record, Asset::tombstone("c1"));
}

#[test]
fn deleted_id_cannot_be_registered_again() {
    let mut ledger = Ledger::new();
    let data = encoded(&quiet_chunk("c1"));
    ledger
        .run(T0, |engine, tx| engine.add_chunk_with_policy(tx, "c1", &data, ENERGY))
        .expect("add");
    ledger
        .run(at_ms(1_000), |engine, tx| engine.update_chunk_expiry_date(tx, "c1"))
        .expect("update");
    ledger
        .run(at_ms(60_000), |engine, tx| engine.delete_chunk_if_expired(tx, "c1"))
        .expect("delete");

    let later = datetime!(2024-06-01 0:00 UTC);
    let err = ledger
        .run(later, |engine, tx| engine.add_chunk_with_policy(tx, "c1", &data, ENERGY))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    let err = ledger
        .run(later, |engine, tx| engine.add_chunk(tx, "c1", &data))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    let err = ledger
        .run(later, |engine, tx| {
            engine.add_chunk_with_policy_batch(tx, &["c1"], &[data.as_str()], &[ENERGY])
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = ledger
        .run(later, |engine, tx| engine.read_chunk(tx, "c1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn delete_if_expired_on_absent_id_is_not_found() {
    let mut ledger = Ledger::new();
    let err = ledger
        .run(T0, |engine, tx| engine.delete_chunk_if_expired(tx, "ghost"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn apply_policy_on_absent_id_is_not_found() {
    let mut ledger = Ledger::new();
    let data = encoded(&quiet_chunk("ghost"));
    let err = ledger
        .run(T0, |engine, tx| engine.apply_policy(tx, "ghost", &data, ENERGY))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn apply_policy_with_unknown_policy_changes_nothing() {
    let mut ledger = Ledger::new();
    let data = encoded(&quiet_chunk("c1"));
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &data))
        .expect("add");

    let err = ledger
        .run(at_ms(1), |engine, tx| engine.apply_policy(tx, "c1", &data, "keep_forever_v1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);

    let asset = ledger
        .run(at_ms(2), |engine, tx| engine.read_chunk(tx, "c1"))
        .expect("read");
    assert!(!asset.has_policy());
    assert_eq!(asset.expiry_date, None);
}

#[test]
fn delete_if_expired_requires_policy() {
    let mut ledger = Ledger::new();
    ledger
        .run(T0, |engine, tx| engine.add_chunk(tx, "c1", &encoded(&quiet_chunk("c1"))))
        .expect("add");
    let err = ledger
        .run(datetime!(2030-01-01 0:00 UTC), |engine, tx| {
            engine.delete_chunk_if_expired(tx, "c1")
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyNotApplied);
}

#[test]
fn created_asset_reads_back_unchanged() {
    let mut ledger = Ledger::new();
    let mut asset =
        Asset::new("c7", "f".repeat(64)).with_policy(EXAMPLE, Duration::from_secs(86_400));
    asset.expiry_date = Some(datetime!(2024-01-02 0:00:00.123456789 UTC));

    ledger
        .run(T0, |engine, tx| engine.create_asset(tx, &asset))
        .expect("create");
    let read = ledger
        .run(at_ms(1), |engine, tx| engine.read_asset(tx, "c7"))
        .expect("read");
    assert_eq!(read, asset);
}

#[test]
fn batch_with_mismatched_sizes_creates_nothing() {
    let mut ledger = Ledger::new();
    let data = [encoded(&quiet_chunk("a")), encoded(&quiet_chunk("b"))];
    let err = ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy_batch(tx, &["a", "b"], &data, &[ENERGY])
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);

    for id in ["a", "b"] {
        assert!(!ledger
            .run(at_ms(1), |engine, tx| engine.chunk_existed(tx, id))
            .expect("existed"));
    }
}

#[test]
fn batch_validates_every_entry_before_writing() {
    let mut ledger = Ledger::new();
    let data = [
        encoded(&quiet_chunk("a")),
        encoded(&quiet_chunk("b")),
        "@@@".to_string(),
    ];
    let err = ledger
        .run(T0, |engine, tx| {
            let ids = ["a", "b", "c"];
            let result =
                engine.add_chunk_with_policy_batch(tx, &ids, &data, &[ENERGY, ENERGY, ENERGY]);
            assert_eq!(tx.pending_writes(), 0);
            result
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(ledger.world.is_empty());

    let err = ledger
        .run(at_ms(1), |engine, tx| {
            engine.add_chunk_with_policy_batch(tx, &["a", "a"], &data[..2], &[ENERGY, EXAMPLE])
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(ledger.world.is_empty());
}

#[test]
fn batch_writes_every_entry_with_its_policy() {
    let mut ledger = Ledger::new();
    let data = [encoded(&quiet_chunk("a")), encoded(&loud_chunk("b"))];
    ledger
        .run(T0, |engine, tx| {
            engine.add_chunk_with_policy_batch(tx, &["a", "b"], &data, &[ENERGY, ENERGY])
        })
        .expect("batch");

    let assets = ledger
        .run(at_ms(1), |engine, tx| engine.get_all_assets(tx))
        .expect("all");
    let periods: Vec<Option<Duration>> = assets.iter().map(|asset| asset.expiry_period).collect();
    assert_eq!(
        periods,
        vec![Some(Duration::from_millis(31_800)), Some(Duration::from_millis(127_200))]
    );
}

#[test]
fn failed_transaction_leaves_no_trace() {
    let mut ledger = Ledger::new();
    let data = encoded(&quiet_chunk("c1"));
    let err = ledger
        .run(T0, |engine, tx| {
            engine.add_chunk(tx, "c1", &data)?;
            engine.apply_policy(tx, "c1", &data, ENERGY)
        })
        .unwrap_err();
    // the transaction cannot see its own staged create
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(ledger.world.is_empty());
    assert_eq!(ledger.world.committed_transactions(), 0);
}
