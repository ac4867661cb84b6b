use super::helpers::gen_tree;
use anyhow::Result;
use bplist_codec::{decode, encode, EncodeOptions, HEADER_LEN};
use bplist_types::{PlistError, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_invalid(buf: &[u8]) {
    match decode(buf) {
        Ok(val) => panic!("Decoded {val:?} from {buf:?}"),
        Err(err) => assert_eq!(Some(&PlistError::InvalidFile), PlistError::of(&err)),
    }
}

fn samples() -> Result<Vec<Vec<u8>>> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut bufs = vec![
        encode(&Value::from(true), &EncodeOptions::default())?,
        encode(&Value::from(vec![Value::Null; 3]), &EncodeOptions::default())?,
    ];
    for _ in 0..50 {
        bufs.push(encode(&gen_tree(&mut rng, 3), &EncodeOptions::default())?);
    }
    Ok(bufs)
}

pub fn test_truncation() -> Result<()> {
    for buf in samples()? {
        assert_invalid(&buf[..buf.len() - 1]);
    }
    Ok(())
}

pub fn test_header_magic() -> Result<()> {
    for buf in samples()? {
        for i in 0..HEADER_LEN {
            let mut bad = buf.clone();
            bad[i] ^= 0xFF;
            assert_invalid(&bad);
        }
    }
    Ok(())
}

/// Damage anywhere may or may not decode, but must never panic.
pub fn test_random_damage() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(99);
    for buf in samples()? {
        for _ in 0..50 {
            let mut bad = buf.clone();
            for _ in 0..rng.gen_range(1..4) {
                let i = rng.gen_range(0..bad.len());
                bad[i] = rng.gen();
            }
            if let Err(err) = decode(&bad) {
                assert_eq!(Some(&PlistError::InvalidFile), PlistError::of(&err));
            }

            let cut = rng.gen_range(0..bad.len());
            let _ = decode(&bad[..cut]);
        }
    }
    Ok(())
}
