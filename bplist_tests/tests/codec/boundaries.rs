use super::helpers::gen_tree;
use anyhow::Result;
use bplist_codec::{
    decode, encode, ByteWidth, EncodeOptions, ObjectTable, Trailer, HEADER_LEN, TRAILER_LEN,
};
use bplist_types::Value;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A root array plus `members_ct` distinct ints.
fn distinct_ints(members_ct: usize) -> Value {
    (0..members_ct as i64).map(Value::from).collect::<Vec<_>>().into()
}

pub fn test_ref_widths() -> Result<()> {
    for (count, exp_ref_size) in [(255usize, 1u8), (256, 2), (65535, 2), (65536, 4)] {
        assert_eq!(exp_ref_size, *ByteWidth::for_count(count as u64));

        let root = distinct_ints(count - 1);
        let buf = encode(&root, &EncodeOptions::default())?;
        let trailer = Trailer::deser(&buf)?;
        assert_eq!(count as u64, trailer.num_objects);
        assert_eq!(exp_ref_size, *trailer.ref_size, "count {count}");
        assert_eq!(root, decode(&buf)?);
    }
    Ok(())
}

pub fn test_offset_widths() -> Result<()> {
    let small = encode(&Value::from(vec![7u8; 200]), &EncodeOptions::default())?;
    assert_eq!(1, *Trailer::deser(&small)?.offset_size);

    /* The offset table itself starts past byte 255. */
    let large = encode(&Value::from(vec![7u8; 300]), &EncodeOptions::default())?;
    let trailer = Trailer::deser(&large)?;
    assert_eq!(2, *trailer.offset_size);
    assert_eq!(1, *trailer.ref_size);
    assert_eq!(Value::from(vec![7u8; 300]), decode(&large)?);
    Ok(())
}

pub fn test_int_boundaries() -> Result<()> {
    let cases = [
        (i64::MAX as i128, 0x13u8),
        (1i128 << 63, 0x14),
        (u64::MAX as i128, 0x14),
        (-1, 0x13),
        (i64::MIN as i128, 0x13),
        (i64::MIN as i128 - 1, 0x14),
    ];
    for (i, exp_tok) in cases {
        let buf = encode(&Value::from(i), &EncodeOptions::default())?;
        assert_eq!(exp_tok, buf[HEADER_LEN], "{i}");
        assert_eq!(Value::from(i), decode(&buf)?);
    }
    Ok(())
}

pub fn test_trailer_exactness() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let opts = EncodeOptions::default();

    for _ in 0..100 {
        let root = gen_tree(&mut rng, 3);
        let buf = encode(&root, &opts)?;
        let table = ObjectTable::flatten(&root, &opts)?;
        let trailer = Trailer::deser(&buf)?;

        assert_eq!(table.len() as u64, trailer.num_objects);
        assert_eq!(table.root() as u64, trailer.root_object);
        assert_eq!(
            ByteWidth::for_count(trailer.num_objects),
            trailer.ref_size
        );
        assert_eq!(
            ByteWidth::for_count(trailer.offset_table_start),
            trailer.offset_size
        );

        let table_len = trailer.num_objects as usize * trailer.offset_size.byte_len();
        assert_eq!(
            buf.len() - TRAILER_LEN - table_len,
            trailer.offset_table_start as usize
        );
    }
    Ok(())
}

pub fn test_lone_true() -> Result<()> {
    let buf = encode(&Value::from(true), &EncodeOptions::default())?;
    assert_eq!(42, buf.len());
    assert_eq!(b"bplist00\x09\x08", &buf[..10]);

    let trailer = Trailer::deser(&buf)?;
    assert_eq!(1, *trailer.offset_size);
    assert_eq!(1, *trailer.ref_size);
    assert_eq!(1, trailer.num_objects);
    assert_eq!(0, trailer.root_object);
    assert_eq!(9, trailer.offset_table_start);
    Ok(())
}
