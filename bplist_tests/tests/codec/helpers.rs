use bplist_types::{Array, Date, Dict, Uid, Value};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

const CHARS: [char; 8] = ['a', 'z', '0', ' ', 'é', '✓', '😀', '\u{7f}'];

pub fn gen_string(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.gen_range(0..=max_len);
    (0..len).filter_map(|_| CHARS.choose(rng)).collect()
}

pub fn gen_scalar(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..10) {
        0 => Value::Null,
        1 => Value::from(rng.gen::<bool>()),
        2 => Value::from(rng.gen_range(-1000i64..1000)),
        3 => Value::from(rng.gen::<i64>()),
        4 => Value::from(rng.gen::<u64>()),
        5 => Value::from(rng.gen_range(-1e9..1e9)),
        6 => {
            let secs = rng.gen_range(-3e9..3e9);
            Value::from(Date::from_plist_secs(secs).unwrap())
        }
        7 => {
            let len = rng.gen_range(0..40);
            Value::from((0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>())
        }
        8 => Value::from(gen_string(rng, 40)),
        _ => Value::from(Uid::from(rng.gen::<u64>() >> rng.gen_range(0..64u32))),
    }
}

/// A tree: no container instance is referenced twice.
pub fn gen_tree(rng: &mut StdRng, depth: usize) -> Value {
    if depth == 0 || rng.gen_bool(0.4) {
        return gen_scalar(rng);
    }
    let width = rng.gen_range(0..20);
    if rng.gen_bool(0.5) {
        (0..width)
            .map(|_| gen_tree(rng, depth - 1))
            .collect::<Array>()
            .into()
    } else {
        let dict = Dict::new();
        for _ in 0..width {
            dict.insert(gen_string(rng, 8), gen_tree(rng, depth - 1));
        }
        dict.into()
    }
}
