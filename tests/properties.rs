//! End-to-end property tests against the public API: each test below
//! checks one universal invariant that must hold for every artifact a
//! successful build produces, independent of key set or configuration.

use hyperphf::{BuildConfig, ChdMinimalPerfectHashFunction, Degree, Engine, GovFunction, GovMinimalPerfectHashFunction};

fn words(n: usize, prefix: &str) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}-{i}")).collect()
}

fn peeling_cfg(bucket_size: usize, value_width: u8) -> BuildConfig {
    BuildConfig {
        engine: Engine::Peeling { degree: Degree::Three },
        bucket_size,
        value_width,
        ..Default::default()
    }
}

/// 1. Bijectivity: `{ f(k) : k in S }` is exactly `{0, .., n-1}`.
#[test]
fn bijectivity_of_mphf_core() {
    let keys = words(2000, "bij");
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(128, 32)).unwrap();
    let mut seen = vec![false; keys.len()];
    for k in &keys {
        let v = mphf.get(k.as_bytes()).unwrap() as usize;
        assert!(!seen[v]);
        seen[v] = true;
    }
    assert!(seen.into_iter().all(|s| s));
}

/// 2. Value fidelity: every key with a supplied value maps back to it.
#[test]
fn value_fidelity_for_general_functions() {
    let keys = words(1500, "val");
    let values: Vec<u64> = (0..keys.len()).map(|i| (i as u64).wrapping_mul(2654435761) & 0xFFFF_FFFF).collect();
    let f = GovFunction::build(&keys, Some(&values), &peeling_cfg(128, 32), 0).unwrap();
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(f.get(k.as_bytes()), values[i]);
    }
}

/// 3. `offset_and_seed`'s offset half is non-decreasing across buckets.
#[test]
fn offset_monotonicity() {
    let keys = words(3000, "off");
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(96, 32)).unwrap();
    let offsets: Vec<u64> = mphf.artifact().offset_and_seed.iter().map(|&w| w & ((1u64 << 56) - 1)).collect();
    assert!(offsets.windows(2).all(|w| w[1] >= w[0]));
}

/// 4. Per-bucket capacity: every bucket reserves at least `size + 1`
/// variables (the peeling engine's minimum headroom over a perfect fit).
#[test]
fn per_bucket_capacity_has_headroom() {
    let keys = words(4000, "cap");
    let cfg = peeling_cfg(200, 32);
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &cfg).unwrap();
    let a = mphf.artifact();
    for w in a.offset_and_seed.windows(2) {
        let num_vars = (w[1] & ((1u64 << 56) - 1)) - (w[0] & ((1u64 << 56) - 1));
        assert!(num_vars >= 1, "every allocated bucket reserves at least one variable");
    }
}

/// 5. Peeling implies linearity: after back-substitution, every key's
/// equation (XOR of its `degree` cells) equals its known term — checked
/// here the same way the query path recomputes it, over the public
/// artifact rather than any solver-internal state.
#[test]
fn peeling_implies_linearity() {
    use hyperphf::hash::Signature as _;
    use hyperphf::solve::{seed_for_attempt, variable_indices};

    let keys = words(1000, "lin");
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(96, 32)).unwrap();
    let a = mphf.artifact();

    for k in &keys {
        let sig = hyperphf::hash::hash_sig2(k.as_bytes(), a.global_seed);
        let bucket = hyperphf::hash::bucket_for(sig.0[0], a.multiplier) as usize;
        let word = a.offset_and_seed[bucket];
        let next = a.offset_and_seed[bucket + 1];
        let offset = word & ((1u64 << 56) - 1);
        let num_vars = ((next & ((1u64 << 56) - 1)) - offset) as usize;
        let attempt = (word >> 56) as u8;

        let base_local_seed = hyperphf::hash::mix_seed(a.global_seed, bucket as u64);
        let local_seed = seed_for_attempt(base_local_seed, attempt);
        let h = sig.rehash(local_seed);
        let idx = variable_indices(h, num_vars, a.degree.arity());

        let xor = idx.iter().fold(0u64, |acc, &v| acc ^ a.data.get_range((offset + v as u64) * a.width as u64, a.width));
        let expected = mphf.get(k.as_bytes()).unwrap();
        assert_eq!(xor, expected, "equation for key {k} unsatisfied");
    }
}

/// 6. Determinism: same seed, same input order, any thread count ⇒
/// byte-identical artifact.
#[test]
fn deterministic_across_thread_counts() {
    let keys = words(2500, "det");
    let base = peeling_cfg(150, 32);
    let mut a = base.clone();
    a.threads = Some(1);
    let mut b = base.clone();
    b.threads = Some(4);

    let fa = GovMinimalPerfectHashFunction::build(&keys, &a).unwrap();
    let fb = GovMinimalPerfectHashFunction::build(&keys, &b).unwrap();

    assert_eq!(fa.artifact().offset_and_seed, fb.artifact().offset_and_seed);
    assert_eq!(fa.artifact().data.as_words(), fb.artifact().data.as_words());
}

/// 7. Signature false-positive rate: with a w-bit check enabled, random
/// non-member strings are rejected with overwhelming probability.
#[test]
fn signature_false_positive_rate() {
    let keys = words(1000, "sig");
    let mut cfg = peeling_cfg(128, 32);
    cfg.signature_check_bits = 20;
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &cfg).unwrap();

    for k in &keys {
        assert!(mphf.get(k.as_bytes()).is_some());
    }

    let mut false_positives = 0;
    let trials = 10_000;
    for i in 0..trials {
        if mphf.get(format!("not-a-member-{i}").as_bytes()).is_some() {
            false_positives += 1;
        }
    }
    let rate = false_positives as f64 / trials as f64;
    assert!(rate < 0.01, "false positive rate {rate} too high for a 20-bit check");
}

/// 8. Query idempotence: repeated calls on the same artifact agree.
#[test]
fn query_is_idempotent() {
    let keys = words(500, "idem");
    let mphf = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(64, 16)).unwrap();
    for k in &keys {
        let first = mphf.get(k.as_bytes());
        for _ in 0..5 {
            assert_eq!(mphf.get(k.as_bytes()), first);
        }
    }
}

/// 9. Duplicate detection surfaces within the reseed budget.
#[test]
fn duplicate_key_is_detected() {
    let keys = vec!["x".to_string(), "y".to_string(), "x".to_string()];
    let err = GovMinimalPerfectHashFunction::build(&keys, &peeling_cfg(64, 8)).unwrap_err();
    assert!(matches!(err, hyperphf::Error::DuplicateKey));
}

/// The CHD engine satisfies bijectivity too, independently of peeling.
#[test]
fn chd_bijectivity() {
    let keys = words(2000, "chd-bij");
    let f = ChdMinimalPerfectHashFunction::build(&keys, &BuildConfig::default()).unwrap();
    let mut seen = vec![false; keys.len()];
    for k in &keys {
        let v = f.get(k.as_bytes()) as usize;
        assert!(!seen[v]);
        seen[v] = true;
    }
    assert!(seen.into_iter().all(|s| s));
}
