//! Property-based tests using proptest

use arceager::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random projective tree: every span is cut into segments whose roots
/// attach to the span's head, recursively.
fn random_projective_heads(n: usize, seed: u64) -> Vec<usize> {
    fn attach(heads: &mut [usize], lo: usize, hi: usize, head: usize, rng: &mut StdRng) {
        let mut start = lo;
        while start <= hi {
            let end = rng.gen_range(start..=hi);
            let root = rng.gen_range(start..=end);
            heads[root - 1] = head;
            if root > start {
                attach(heads, start, root - 1, root, rng);
            }
            if root < end {
                attach(heads, root + 1, end, root, rng);
            }
            start = end + 1;
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut heads = vec![0; n];
    let root = rng.gen_range(1..=n);
    if root > 1 {
        attach(&mut heads, 1, root - 1, root, &mut rng);
    }
    if root < n {
        attach(&mut heads, root + 1, n, root, &mut rng);
    }
    heads
}

/// Take up to `choices.len()` random legal transitions from the initial configuration
fn random_walk(arena: &mut StateArena, choices: &[u8]) -> ConfigId {
    let mut cur = arena.initial();
    for &c in choices {
        let legal = arena.legal_actions(cur);
        if legal.is_empty() {
            break;
        }
        let action = legal[c as usize % legal.len()];
        cur = arena.apply(cur, action, DEFAULT_LABEL).unwrap();
    }
    cur
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_action_encoding_roundtrip(
        head in 0usize..=transition::MAX_POSITION,
        modifier in 0usize..=transition::MAX_POSITION,
        label in 0u32..=transition::MAX_LABEL
    ) {
        prop_assume!(head != modifier);
        let action = Action::arc(head, modifier, label);
        let code = action.encode().unwrap();
        prop_assert!(code >= 2);
        prop_assert_eq!(Action::decode(code).unwrap(), action);
    }

    #[test]
    fn test_legality_and_finality(
        n in 0usize..15,
        choices in prop::collection::vec(any::<u8>(), 40)
    ) {
        let mut arena = StateArena::new(n);
        let mut cur = arena.initial();
        let mut steps = 0;
        for &c in &choices {
            let legal = arena.legal_actions(cur);
            // final iff nothing is legal
            prop_assert_eq!(arena.is_final(cur), legal.is_empty());
            if legal.is_empty() {
                break;
            }
            let action = legal[c as usize % legal.len()];
            let next = arena.apply(cur, action, DEFAULT_LABEL).unwrap();
            prop_assert!(arena.buffer(next) >= arena.buffer(cur));
            cur = next;
            steps += 1;
        }
        if arena.is_final(cur) {
            prop_assert_eq!(steps, 2 * n);
        } else {
            prop_assert!(steps < 2 * n);
        }
    }

    #[test]
    fn test_oracle_recall_on_projective_trees(n in 1usize..25, seed in any::<u64>()) {
        let heads = random_projective_heads(n, seed);
        let labels: Vec<LabelId> = (0..n as u32).map(|i| i % 7 + 1).collect();
        let gold = GoldTree::new(heads, labels).unwrap();
        prop_assert!(gold.is_projective());

        let mut arena = StateArena::new(n);
        let init = arena.initial();
        let last = DynamicOracle::new(&gold).trajectory(&mut arena, init).unwrap();
        let mut arcs = arena.arcs(last);
        arcs.sort_by_key(|a| a.modifier);
        prop_assert_eq!(arcs, gold.arcs());
        prop_assert_eq!(arena.history(last).len(), 2 * n);
    }

    #[test]
    fn test_cost_minus_one_iff_illegal(
        n in 1usize..15,
        seed in any::<u64>(),
        choices in prop::collection::vec(any::<u8>(), 0..30)
    ) {
        let gold = GoldTree::unlabeled(random_projective_heads(n, seed)).unwrap();
        let mut arena = StateArena::new(n);
        let cur = random_walk(&mut arena, &choices);
        let costs = DynamicOracle::new(&gold).costs(&arena, cur);
        for (i, action) in ActionType::PRIORITY.iter().enumerate() {
            let signed = costs.to_signed()[i];
            prop_assert_eq!(signed == -1, !arena.is_legal(cur, *action));
            prop_assert!(signed >= -1);
        }
    }

    #[test]
    fn test_oracle_terminates_off_the_gold_path(
        n in 1usize..15,
        seed in any::<u64>(),
        choices in prop::collection::vec(any::<u8>(), 0..30)
    ) {
        let gold = GoldTree::unlabeled(random_projective_heads(n, seed)).unwrap();
        let mut arena = StateArena::new(n);
        let cur = random_walk(&mut arena, &choices);
        let last = DynamicOracle::new(&gold).trajectory(&mut arena, cur).unwrap();
        prop_assert!(arena.is_final(last));
        prop_assert_eq!(arena.history(last).len(), 2 * n);
    }

    #[test]
    fn test_config_json_roundtrip(
        dim_bits in 4u32..24,
        width in 1usize..64,
        lr_milli in 1u32..1000
    ) {
        let lr = lr_milli as f64 / 1000.0;
        let config = ParserConfig::new()
            .with_feature_dim(1 << dim_bits)
            .with_beam_width(width)
            .with_learning_rate(lr);
        let back = ParserConfig::from_json(&config.to_json().unwrap()).unwrap();
        prop_assert_eq!(back, config);
    }
}
