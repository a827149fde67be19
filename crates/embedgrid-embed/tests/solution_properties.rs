//! Accepted solutions respect every capacity, verify the same way twice,
//! and split grouped links into fractions that sum to one.

use std::collections::HashMap;

use embedgrid_core::{EmbedAlgorithm, EmbedgridConfig};
use embedgrid_embed::{lower_bound, strategy_for, verify_embedding};
use embedgrid_topology::generators::{random_network, star_cluster};
use proptest::prelude::*;

fn algorithm() -> impl Strategy<Value = EmbedAlgorithm> {
    prop_oneof![
        Just(EmbedAlgorithm::Greedy),
        Just(EmbedAlgorithm::KBalanced),
        Just(EmbedAlgorithm::Partition),
        Just(EmbedAlgorithm::TwoPhase),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn accepted_solutions_fit_the_substrate(
        algorithm in algorithm(),
        n in 2usize..16,
        p in 0.1f64..0.6,
        seed in any::<u64>(),
        rate in 1u32..400,
        grouped in any::<bool>(),
    ) {
        let v = random_network(n, p, 1, 1000, rate, seed).unwrap();
        let phys = star_cluster(6, 4, 4000, 2, 500, grouped).unwrap();
        let mut config = EmbedgridConfig::default();
        config.embed.algorithm = algorithm;
        config.embed.seed = seed;

        let outcome = strategy_for(&config, None).unwrap().solve(&v, &phys);
        let Some(solution) = outcome.solution else {
            return Ok(());
        };

        let embedding = solution.embedding();
        let first = verify_embedding(&v, &phys, embedding);
        prop_assert_eq!(&first, &Ok(()));
        prop_assert_eq!(verify_embedding(&v, &phys, embedding), first);
        prop_assert!(solution.n_machines_used() >= lower_bound(&v, &phys));

        let mut cores: HashMap<&str, u32> = HashMap::new();
        for (node, machine) in solution.node_mapping() {
            let id = v.lookup(node).unwrap();
            *cores.entry(machine.as_str()).or_default() += v.req_cores(id);
        }
        for (machine, used) in cores {
            let id = phys.lookup(machine).unwrap();
            prop_assert!(used <= phys.cores(id), "{} overloaded", machine);
        }

        for (_, link) in v.links() {
            let (a, b) = (v.name(link.ends[0]), v.name(link.ends[1]));
            if solution.node_info(a) == solution.node_info(b) {
                prop_assert!(solution.link_info(a, b).is_empty());
                continue;
            }
            let total: f64 = solution.link_info(a, b).iter().map(|m| m.fraction).sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "fractions of {}-{} sum to {}", a, b, total);
            for path in solution.path_info(a, b) {
                prop_assert!(!path.hops.is_empty());
            }
        }
    }
}
