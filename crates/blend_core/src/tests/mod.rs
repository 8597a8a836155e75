use super::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;


// --- Shared test helpers ------------------------------------------------

fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn pair_session() -> BlendSession {
    BlendSession::with_components(ComponentSet::from_pairs([("A", 2.0), ("B", 3.0)]).unwrap())
}

/// Between 1 and 12 components with ratios in `[0, 20)`, at least one positive.
fn random_set(rng: &mut impl Rng) -> ComponentSet {
    let count = rng.gen_range(1..=12);
    let mut set = ComponentSet::new();
    for i in 0..count {
        set.push(format!("C{i}"), f64::from(rng.gen_range(0..200_u32)) / 10.0)
            .unwrap();
    }
    if set.total_ratio() <= 0.0 {
        set.set_ratio_value(0, 1.0).unwrap();
    }
    set
}

fn set_target(session: &mut BlendSession, value: &str) {
    session.apply(SessionCommand::SetTargetMass {
        value: value.to_string(),
    });
}

fn masses(results: &[MassLine]) -> Vec<f64> {
    results.iter().map(|line| line.mass).collect()
}
