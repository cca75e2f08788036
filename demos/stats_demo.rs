use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use closed_hash::HashTable;
use closed_hash::hash_table::Entry;
use siphasher::sip::SipHasher;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Remove every n-th value after filling, to show chains after erasure.
    #[arg(short = 'r', long = "remove_every", default_value_t = 0)]
    remove_every: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = SipHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table with u64 values...");

    let capacity = table.capacity();
    for i in 0..capacity {
        let value = i as u64;
        match table.entry(hash_u64(value), |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    if table.capacity() != capacity {
        println!("Table grew to {} while filling", table.capacity());
    }
    table.stats().print();

    if args.remove_every > 0 {
        let mut removed = 0;
        for value in (0..capacity as u64).step_by(args.remove_every as usize) {
            if table.remove(hash_u64(value), |&v| v == value).is_some() {
                removed += 1;
            }
        }

        println!();
        println!("Removed {} values", removed);
        table.check_invariants();
        table.stats().print();
    }
}
