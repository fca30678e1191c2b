//! Near-duplicate detection over 64-bit perceptual hashes.
//!
//! Builds an ephemeral in-memory index, stores a handful of fingerprints
//! and queries slightly corrupted copies of them:
//!
//! ```sh
//! cargo run --example near_duplicates
//! ```

use hmsearch::{format_hexhash, parse_hexhash, HmIndex, MemoryStore};

fn main() -> hmsearch::Result<()> {
    // Fingerprints of "images": near-duplicates differ in a few bits.
    let originals = [
        "e1b2c47f00d59a33",
        "e1b2c47f00d59a31", // one bit off the first
        "ffee010203040506",
        "0000000000000000",
    ];

    let mut store = MemoryStore::new();
    HmIndex::init_store(&mut store, 64, 6)?;
    let mut index = HmIndex::from_store(Box::new(store))?;

    for hex in originals {
        index.insert(&parse_hexhash(hex))?;
    }

    let queries = [
        ("e1b2c47f00d59a33", "exact copy"),
        ("e1b2c47f00d59a03", "two bits of noise"),
        ("ffee010203040586", "one bit of noise"),
        ("123456789abcdef0", "unrelated"),
    ];

    for (hex, label) in queries {
        let query = parse_hexhash(hex);
        let mut hits = index.lookup(&query)?;
        hits.sort_by_key(|h| h.distance);

        println!("{hex}  ({label})");
        if hits.is_empty() {
            println!("    no stored hash within distance 6");
        }
        for hit in hits {
            println!("    {}  distance {}", format_hexhash(&hit.hash), hit.distance);
        }
        println!();
    }

    Ok(())
}
