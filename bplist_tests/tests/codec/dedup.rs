use anyhow::Result;
use bplist_codec::{decode, encode, EncodeOptions, Object, ObjectTable, Trailer};
use bplist_types::{Dict, ScalarKey, Value};

pub fn test_scalar_dedup() -> Result<()> {
    let opts = EncodeOptions::default();
    let same = Value::from("the same text");
    let other = Value::from("the other txt");

    let siblings = Value::from(vec![same.clone(), same.clone()]);
    let table = ObjectTable::flatten(&siblings, &opts)?;
    let str_slots = table
        .objects()
        .iter()
        .filter(|obj| {
            matches!(obj, Object::Scalar(ScalarKey::Str(s)) if &**s == "the same text")
        })
        .count();
    assert_eq!(1, str_slots);
    assert_eq!(2, table.len());

    let deduped_len = encode(&siblings, &opts)?.len();
    let distinct_len = encode(&Value::from(vec![same.clone(), other]), &opts)?.len();
    let separate_len = 2 * encode(&same, &opts)?.len();
    assert!(deduped_len < distinct_len, "{deduped_len} {distinct_len}");
    assert!(deduped_len < separate_len, "{deduped_len} {separate_len}");

    /* Kinds are not conflated. */
    let mixed = Value::from(vec![
        Value::from(1),
        Value::from(1.0),
        Value::from(true),
        Value::from(vec![1u8]),
        Value::from("1"),
    ]);
    let buf = encode(&mixed, &opts)?;
    assert_eq!(6, Trailer::deser(&buf)?.num_objects);
    assert_eq!(mixed, decode(&buf)?);
    Ok(())
}

pub fn test_container_identity() -> Result<()> {
    let opts = EncodeOptions::default();

    let shared = Dict::from_iter([("k", "v")]);
    let lookalike = Dict::from_iter([("k", "v")]);
    let root = Value::from(vec![
        Value::from(shared.clone()),
        Value::from(lookalike),
        Value::from(shared),
    ]);

    let table = ObjectTable::flatten(&root, &opts)?;
    let dict_slots = table
        .objects()
        .iter()
        .filter(|obj| matches!(obj, Object::Dict { .. }))
        .count();
    assert_eq!(2, dict_slots);

    let post = decode(&encode(&root, &opts)?)?;
    assert_eq!(root, post);

    let arr = post.as_array().unwrap();
    let members = arr.to_vec();
    let dicts = members
        .iter()
        .filter_map(|member| member.as_dict())
        .collect::<Vec<_>>();
    assert_eq!(3, dicts.len());
    assert!(dicts[0].ptr_eq(dicts[2]));
    assert!(!dicts[0].ptr_eq(dicts[1]));
    assert_eq!(dicts[0], dicts[1]);

    /* Mutations through one reference site are visible through the other. */
    dicts[0].insert("added", 1);
    assert_eq!(Some(Value::from(1)), dicts[2].get_str("added"));
    assert_eq!(None, dicts[1].get_str("added"));
    Ok(())
}
