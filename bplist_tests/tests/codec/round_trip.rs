use super::helpers::gen_tree;
use anyhow::Result;
use bplist_codec::{decode, encode, EncodeOptions};
use bplist_types::{Dict, PlistError, Value};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn test_random_graphs() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x6270_6c69_7374);

    for opts in [
        EncodeOptions::default(),
        EncodeOptions {
            sort_keys: false,
            ..Default::default()
        },
    ] {
        for _ in 0..200 {
            let pre = gen_tree(&mut rng, 4);
            let buf = encode(&pre, &opts)?;
            let post = decode(&buf)?;
            assert_eq!(pre, post, "\n{:?}\n{:?}\n", pre, buf);
        }
    }
    Ok(())
}

pub fn test_key_order() -> Result<()> {
    let dict = Dict::new();
    for k in ["zeta", "alpha", "mu", "Beta"] {
        dict.insert(k, k.len() as i64);
    }
    let root = Value::from(dict);

    let sorted = decode(&encode(&root, &EncodeOptions::default())?)?;
    assert_eq!(
        vec!["Beta", "alpha", "mu", "zeta"],
        key_strs(&sorted)
    );

    let opts = EncodeOptions {
        sort_keys: false,
        ..Default::default()
    };
    let unsorted = decode(&encode(&root, &opts)?)?;
    assert_eq!(vec!["zeta", "alpha", "mu", "Beta"], key_strs(&unsorted));

    assert_eq!(root, sorted);
    assert_eq!(root, unsorted);
    Ok(())
}

fn key_strs(val: &Value) -> Vec<String> {
    val.as_dict()
        .map(|dict| dict.keys())
        .unwrap_or_default()
        .iter()
        .filter_map(|k| k.as_str().map(String::from))
        .collect()
}

pub fn test_non_string_keys() -> Result<()> {
    let dict = Dict::new();
    dict.insert("kept", 1);
    dict.insert(2.5, "dropped");
    dict.insert(vec![Value::from("also dropped")], 3);
    let root = Value::from(vec![Value::from(dict)]);

    let err = encode(&root, &EncodeOptions::default()).unwrap_err();
    assert!(
        matches!(PlistError::of(&err), Some(PlistError::Type(_))),
        "{err:?}"
    );

    let opts = EncodeOptions {
        skip_keys: true,
        ..Default::default()
    };
    let post = decode(&encode(&root, &opts)?)?;
    let exp = Value::from(vec![Value::from(Dict::from_iter([("kept", 1)]))]);
    assert_eq!(exp, post);
    Ok(())
}
