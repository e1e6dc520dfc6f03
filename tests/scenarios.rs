//! End-to-end scenarios against the public API, each a small concrete
//! build-then-query walkthrough rather than a universal property.

use hyperphf::{BuildConfig, Degree, Engine, GovFunction, GovMinimalPerfectHashFunction};

fn peeling_cfg(bucket_size: usize, value_width: u8) -> BuildConfig {
    BuildConfig {
        engine: Engine::Peeling { degree: Degree::Three },
        bucket_size,
        value_width,
        ..Default::default()
    }
}

/// 1. Empty input: build succeeds, `n = 0`, every probe returns the
/// default (observable via a signature check, since with no check
/// enabled every probe would otherwise land on an arbitrary in-range
/// value rather than a reserved sentinel).
#[test]
fn empty_input() {
    let keys: Vec<String> = vec![];
    let mut cfg = peeling_cfg(64, 8);
    cfg.signature_check_bits = 8;
    let f = GovFunction::build(&keys, None, &cfg, 0).unwrap();
    assert_eq!(f.len(), 0);
    assert_eq!(f.get(b"anything"), 0);
    assert_eq!(f.get(b"something else"), 0);
}

/// 2. Tiny MPHF over four keys, no explicit values: ordinals form
/// `{0,1,2,3}`; a non-member key still resolves to something in range
/// (unspecified which) without panicking.
#[test]
fn tiny_mphf() {
    let keys = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(64, 8)).unwrap();
    let mut got: Vec<u64> = keys.iter().map(|k| mphf.get(k.as_bytes()).unwrap()).collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2, 3]);

    let stranger = mphf.get(b"z");
    assert!(stranger.is_none() || stranger.unwrap() < 4);
}

/// 3. Round-trip a small general function: explicit values come back
/// exactly for every build key.
#[test]
fn round_trip_small_function() {
    let keys = vec!["red".to_string(), "green".to_string(), "blue".to_string()];
    let values = vec![7u64, 1, 13];
    let f = GovFunction::build(&keys, Some(&values), &peeling_cfg(64, 4), 0).unwrap();
    assert_eq!(f.get(b"red"), 7);
    assert_eq!(f.get(b"green"), 1);
    assert_eq!(f.get(b"blue"), 13);
}

/// 4. Signed MPHF rejects strangers: build keys form a permutation of
/// `{0,1,2}`, and a large batch of random non-members is rejected with
/// overwhelming probability under a 32-bit check.
#[test]
fn signed_mphf_rejects_strangers() {
    let keys = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
    let mut cfg = peeling_cfg(64, 8);
    cfg.signature_check_bits = 32;
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &cfg).unwrap();

    let mut got: Vec<u64> = keys.iter().map(|k| mphf.get(k.as_bytes()).unwrap()).collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2]);

    let trials = 10_000;
    let mut collisions = 0;
    for i in 0..trials {
        if mphf.get(format!("stranger-{i}").as_bytes()).is_some() {
            collisions += 1;
        }
    }
    assert!(collisions < trials / 100, "{collisions}/{trials} strangers were accepted under a 32-bit check");
}

/// 5. Duplicate keys surface as `DuplicateKey` within the reseed budget.
#[test]
fn duplicate_detection() {
    let keys = vec!["x".to_string(), "y".to_string(), "x".to_string()];
    let err = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(64, 8)).unwrap_err();
    assert!(matches!(err, hyperphf::Error::DuplicateKey));
}

/// 6. Determinism across thread counts 1, 2 and 4: identical artifacts.
#[test]
fn determinism_across_thread_counts() {
    let keys: Vec<String> = (0..1200).map(|i| format!("thread-det-{i}")).collect();
    let base = peeling_cfg(100, 24);

    let mut artifacts = Vec::new();
    for threads in [1usize, 2, 4] {
        let mut cfg = base.clone();
        cfg.threads = Some(threads);
        let mphf = GovMinimalPerfectHashFunction::build(&keys, &cfg).unwrap();
        artifacts.push((mphf.artifact().offset_and_seed.clone(), mphf.artifact().data.as_words().to_vec()));
    }

    for pair in artifacts.windows(2) {
        assert_eq!(pair[0].0, pair[1].0);
        assert_eq!(pair[0].1, pair[1].1);
    }
}
